//! rivet - an asset pipeline and bundler for web frontends.

mod actor;
mod chunk;
mod classify;
mod cli;
mod config;
mod core;
mod define;
mod embed;
mod graph;
mod logger;
mod output;
mod pipeline;
mod transform;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ProjectConfig;

fn main() -> Result<()> {
    // Before any blocking work
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }

    let config = ProjectConfig::load(&cli)?;

    match &cli.command {
        Commands::Build { .. } => cli::build::run_build(&config),
        Commands::Serve { .. } => cli::serve::run_serve(&config),
        Commands::Inspect { args } => cli::inspect::run_inspect(args, &config),
    }
}
