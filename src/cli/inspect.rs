//! `rivet inspect`: how one resource would be handled.
//!
//! ```json
//! {
//!   "path": "src/logo.svg",
//!   "query": "inline",
//!   "mode": "production",
//!   "size": 812,
//!   "classification": { "category": "svg", "rule": "svg", "variant": "inline", ... },
//!   "placement": "inline",
//!   "chain": { "source": "bytes", "stages": [ ... ] }
//! }
//! ```

use anyhow::{Context, Result};
use serde::Serialize;

use crate::classify::{ClassificationSummary, OutputStrategy, Request};
use crate::cli::InspectArgs;
use crate::config::ProjectConfig;
use crate::core::BuildMode;
use crate::transform::{Chain, ChainContext, build_chain};
use crate::utils::path::relative_slash;

#[derive(Debug, Serialize)]
pub struct Inspection {
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub mode: BuildMode,
    /// Source size; absent when the file does not exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub classification: ClassificationSummary,
    /// Where the bytes end up, when the strategy alone decides it.
    pub placement: &'static str,
    pub chain: Chain,
}

pub fn run_inspect(args: &InspectArgs, config: &ProjectConfig) -> Result<()> {
    let inspection = inspect(args, config)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&inspection)?
    } else {
        serde_json::to_string(&inspection)?
    };
    println!("{json}");
    Ok(())
}

pub fn inspect(args: &InspectArgs, config: &ProjectConfig) -> Result<Inspection> {
    let path = config.root_join(&args.path);
    let mut req = Request::new(&path);
    if let Some(query) = &args.query {
        req = req.with_query(query);
    }
    if let Some(mime) = &args.mime {
        req = req.with_mime(mime);
    }
    if let Some(issuer) = &args.issuer {
        req = req.with_issuer(config.root_join(issuer));
    }

    let classifier = crate::classify::Classifier::new(&config.root, config.build.inline_limit);
    let class = classifier.classify(&req);
    let ctx = ChainContext {
        path: &req.path,
        query: &req.query,
        minify: config.build.minify(args.mode),
        script_target: &config.build.script_target,
    };
    let chain = build_chain(class.category, class.variant, args.mode, &ctx)
        .with_context(|| format!("no valid chain for {}", args.path.display()))?;

    let size = std::fs::metadata(&path).ok().map(|m| m.len());
    let placement = match (class.strategy(), size) {
        (OutputStrategy::Inline, _) => "inline",
        (OutputStrategy::ExternalFile, _) => "external-file",
        (OutputStrategy::DataUriIfSmall(limit), Some(size)) if size <= limit => "data-uri",
        (OutputStrategy::DataUriIfSmall(_), Some(_)) => "external-file",
        (OutputStrategy::DataUriIfSmall(_), None) => "after-transform",
    };

    Ok(Inspection {
        path: relative_slash(&path, &config.root),
        query: req.query.clone(),
        issuer: req.issuer.as_deref().map(|p| relative_slash(p, &config.root)),
        mode: args.mode,
        size,
        classification: class.summary(),
        placement,
        chain,
    })
}
