//! Asset classification.
//!
//! A request `(path, query, mime, issuer)` is matched against an ordered
//! rule table. The first rule whose matcher accepts wins, and within it the
//! first variant whose condition holds. Specificity never matters, only
//! declaration order.
//!
//! ```text
//! logo.svg?inline      -> svg / inline      (Inline)
//! photo.png            -> image / asset     (DataUriIfSmall(4096))
//! Icon.svg from .tsx   -> svg / component   (named ReactComponent)
//! notes.xyz            -> opaque / resource (ExternalFile, with a warning)
//! ```

mod condition;
mod rules;

pub use condition::Request;
pub use rules::{AssetRule, ComponentExport, OutputStrategy, VariantRule, default_rules};

use std::path::Path;

use serde::Serialize;

use crate::core::AssetCategory;

/// Ordered rule table plus the opaque fallback.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<AssetRule>,
    fallback: AssetRule,
}

/// Result of classifying one request.
#[derive(Debug, Clone, Copy)]
pub struct Classification<'r> {
    pub category: AssetCategory,
    pub rule: &'r AssetRule,
    pub variant: &'r VariantRule,
    /// No rule accepted the request; it fell back to the opaque rule.
    pub ambiguous: bool,
}

impl Classification<'_> {
    pub fn strategy(&self) -> OutputStrategy {
        self.variant.strategy
    }

    pub fn summary(&self) -> ClassificationSummary {
        ClassificationSummary {
            category: self.category,
            rule: self.rule.name.clone(),
            variant: self.variant.name.clone(),
            strategy: self.variant.strategy,
            component: self.variant.component,
            compile: self.variant.compile,
            ambiguous: self.ambiguous,
        }
    }
}

/// Owned, serializable view of a [`Classification`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    pub category: AssetCategory,
    pub rule: String,
    pub variant: String,
    pub strategy: OutputStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentExport>,
    pub compile: bool,
    pub ambiguous: bool,
}

impl Classifier {
    /// Built-in rule table for a project rooted at `root`.
    pub fn new(root: &Path, inline_limit: u64) -> Self {
        Self::from_rules(default_rules(root, inline_limit))
    }

    pub fn from_rules(rules: Vec<AssetRule>) -> Self {
        Self {
            rules,
            fallback: rules::opaque_rule(),
        }
    }

    pub fn rules(&self) -> &[AssetRule] {
        &self.rules
    }

    /// Classify a request. Pure and deterministic.
    ///
    /// A rule whose matcher accepts but none of whose variants hold does
    /// not stop the search; the next rule is tried.
    pub fn classify(&self, req: &Request) -> Classification<'_> {
        for rule in &self.rules {
            if !rule.matcher.eval(req) {
                continue;
            }
            if let Some(variant) = rule.variants.iter().find(|v| v.condition.eval(req)) {
                return Classification {
                    category: rule.category,
                    rule,
                    variant,
                    ambiguous: false,
                };
            }
        }

        Classification {
            category: self.fallback.category,
            rule: &self.fallback,
            variant: &self.fallback.variants[0],
            ambiguous: true,
        }
    }
}
