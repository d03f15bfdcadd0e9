//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::BuildMode;

/// rivet asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Output directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Config file path (default: rivet.toml)
    #[arg(
        short = 'C',
        long,
        global = true,
        default_value = "rivet.toml",
        value_hint = clap::ValueHint::FilePath
    )]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// One-shot production build
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Development build with file watching, dev server and live reload
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable file watching for auto-rebuild
        #[arg(
            short,
            long,
            action = clap::ArgAction::Set,
            num_args = 0..=1,
            default_missing_value = "true",
            require_equals = false
        )]
        watch: Option<bool>,
    },

    /// Print how a resource is classified and which stages it runs through
    #[command(visible_alias = "i")]
    Inspect {
        #[command(flatten)]
        args: InspectArgs,
    },
}

/// Shared build arguments for Build and Serve commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Clean output directory completely before building
    #[arg(short, long)]
    pub clean: bool,

    /// Minify scripts and styles (defaults to on in production)
    #[arg(
        short,
        long,
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = false
    )]
    pub minify: Option<bool>,

    /// Run the advisory checker
    #[arg(
        long,
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = false
    )]
    pub check: Option<bool>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

/// Inspect command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct InspectArgs {
    /// Resource path, relative to the project root
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// Query string, with or without the leading `?`
    #[arg(short, long)]
    pub query: Option<String>,

    /// Importing module
    #[arg(short = 'I', long, value_hint = clap::ValueHint::FilePath)]
    pub issuer: Option<PathBuf>,

    /// Declared MIME type
    #[arg(long)]
    pub mime: Option<String>,

    /// Build mode for the stage chain
    #[arg(short = 'M', long, value_enum, default_value = "production")]
    pub mode: BuildMode,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pub pretty: bool,
}

impl Cli {
    /// Build mode implied by the command.
    pub const fn mode(&self) -> BuildMode {
        match &self.command {
            Commands::Serve { .. } => BuildMode::Development,
            Commands::Build { .. } => BuildMode::Production,
            Commands::Inspect { args } => args.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let cli = Cli::parse_from(["rivet", "build", "--minify=false", "-V"]);
        match cli.command {
            Commands::Build { build_args } => {
                assert_eq!(build_args.minify, Some(false));
                assert!(build_args.verbose);
            }
            _ => panic!("expected build"),
        }
        assert_eq!(cli.config, PathBuf::from("rivet.toml"));
    }

    #[test]
    fn test_parse_serve_watch_flag() {
        let cli = Cli::parse_from(["rivet", "serve", "--port", "3000", "--watch"]);
        assert_eq!(cli.mode(), BuildMode::Development);
        match cli.command {
            Commands::Serve { port, watch, .. } => {
                assert_eq!(port, Some(3000));
                assert_eq!(watch, Some(true));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_inspect() {
        let cli = Cli::parse_from([
            "rivet", "inspect", "src/logo.svg", "--query", "inline", "--mode", "development",
        ]);
        assert_eq!(cli.mode(), BuildMode::Development);
        match cli.command {
            Commands::Inspect { args } => {
                assert_eq!(args.path, PathBuf::from("src/logo.svg"));
                assert_eq!(args.query.as_deref(), Some("inline"));
            }
            _ => panic!("expected inspect"),
        }
    }
}
