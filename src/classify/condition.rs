//! Predicate tree over a classification request.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::utils::path::slash;

/// What is being classified: a resource as seen from its importer.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Absolute resource path. Data URIs use `data:<mime>` here.
    pub path: PathBuf,
    /// Query string without the leading `?`.
    pub query: String,
    /// Declared MIME type, if any.
    pub mime: Option<String>,
    /// Module that imported the resource.
    pub issuer: Option<PathBuf>,
}

impl Request {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = query.trim_start_matches('?').to_string();
        self
    }

    pub fn with_mime(mut self, mime: &str) -> Self {
        self.mime = Some(mime.to_string());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<PathBuf>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }
}

/// Matcher for rules and variants.
///
/// Regexes run against forward-slash paths so `[\\/]`-style patterns and
/// plain `/` both work on every platform.
#[derive(Debug, Clone)]
pub enum Condition {
    Always,
    /// Regex over the resource path.
    Test(Regex),
    /// Regex over the query string.
    Query(Regex),
    /// Regex over the issuer path. Never holds without an issuer.
    Issuer(Regex),
    /// Declared MIME type is one of these (parameters ignored).
    Mime(Vec<String>),
    /// Resource lives under this directory.
    Within(PathBuf),
    Not(Box<Condition>),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    /// Build a `Test` condition. Panics on an invalid pattern, so only use
    /// with literal patterns.
    pub fn test(pattern: &str) -> Self {
        Self::Test(literal_regex(pattern))
    }

    pub fn query(pattern: &str) -> Self {
        Self::Query(literal_regex(pattern))
    }

    pub fn issuer(pattern: &str) -> Self {
        Self::Issuer(literal_regex(pattern))
    }

    pub fn mime(types: &[&str]) -> Self {
        Self::Mime(types.iter().map(|t| t.to_string()).collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Condition) -> Self {
        Self::Not(Box::new(inner))
    }

    pub fn eval(&self, req: &Request) -> bool {
        match self {
            Self::Always => true,
            Self::Test(re) => re.is_match(&slash(&req.path)),
            Self::Query(re) => re.is_match(&req.query),
            Self::Issuer(re) => req
                .issuer
                .as_deref()
                .is_some_and(|issuer| re.is_match(&slash(issuer))),
            Self::Mime(types) => req.mime.as_deref().is_some_and(|mime| {
                let essence = crate::utils::mime::essence(mime);
                types.iter().any(|t| t.eq_ignore_ascii_case(essence))
            }),
            Self::Within(dir) => is_within(&req.path, dir),
            Self::Not(inner) => !inner.eval(req),
            Self::All(all) => all.iter().all(|c| c.eval(req)),
            Self::Any(any) => any.iter().any(|c| c.eval(req)),
        }
    }

    /// Whether the result can differ between importers of the same file.
    pub fn depends_on_issuer(&self) -> bool {
        match self {
            Self::Issuer(_) => true,
            Self::Not(inner) => inner.depends_on_issuer(),
            Self::All(list) | Self::Any(list) => list.iter().any(Self::depends_on_issuer),
            _ => false,
        }
    }
}

fn is_within(path: &Path, dir: &Path) -> bool {
    path.starts_with(dir)
}

fn literal_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in condition pattern")
}
