//! Compile-time constants.
//!
//! Bindings are resolved once per build from the mode and `[define]`, then
//! shared read-only by every chain. Substitution runs before the syntax
//! check on the parsed source: only expressions whose whole dotted path is
//! a token are replaced, so strings, template text and comments keep their
//! content, and a locally declared `process` shadows the token.
//!
//! ```text
//! if (import.meta.env.DEV) { ... }   ->   if (true) { ... }      (development)
//!                                    ->   if (false) { ... }     (production)
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use oxc::allocator::Allocator;
use oxc::ast::ast::{Expression, ObjectProperty};
use oxc::ast_visit::{Visit, walk};
use oxc::parser::Parser;
use oxc::semantic::{Scoping, SemanticBuilder};
use oxc::span::{GetSpan, SourceType};
use regex::Regex;
use serde::Serialize;

use crate::config::ProjectConfig;
use crate::core::BuildMode;

/// A token and the JavaScript literal it is replaced with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvBinding {
    pub token: String,
    pub value: String,
}

/// Immutable snapshot of all bindings for one build.
#[derive(Debug)]
pub struct Bindings {
    /// Longest token first.
    bindings: Vec<EnvBinding>,
    pattern: Option<Regex>,
}

fn json(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Resolve the binding snapshot for `mode`.
///
/// User `[define]` entries override built-in tokens of the same name.
pub fn resolve_bindings(mode: BuildMode, config: &ProjectConfig) -> Arc<Bindings> {
    let dev = mode.is_dev();
    let base_url = "/";

    let mut pairs: Vec<(String, String)> = vec![
        ("import.meta.env.MODE".into(), json(mode.name())),
        ("import.meta.env.DEV".into(), dev.to_string()),
        ("import.meta.env.PROD".into(), (!dev).to_string()),
        ("import.meta.env.BASE_URL".into(), json(base_url)),
        ("import.meta.env.ASSET_PREFIX".into(), json("")),
        ("process.env.BASE_URL".into(), json(base_url)),
        ("process.env.ASSET_PREFIX".into(), json("")),
        ("process.env.RUNTIME_ENV".into(), json("web")),
        ("process.env.NODE_ENV".into(), json(mode.name())),
    ];

    for (token, value) in &config.define {
        let literal = value.to_string();
        match pairs.iter_mut().find(|(t, _)| t == token) {
            Some(existing) => existing.1 = literal,
            None => pairs.push((token.clone(), literal)),
        }
    }

    Arc::new(Bindings::new(pairs))
}

impl Bindings {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        let mut bindings: Vec<EnvBinding> = pairs
            .into_iter()
            .map(|(token, value)| EnvBinding { token, value })
            .collect();
        // Longest first so `a.b.c` wins over `a.b`; ties by name for a stable order
        bindings.sort_by(|a, b| b.token.len().cmp(&a.token.len()).then(a.token.cmp(&b.token)));

        let pattern = (!bindings.is_empty())
            .then(|| {
                let alternation = bindings
                    .iter()
                    .map(|b| regex::escape(&b.token))
                    .collect::<Vec<_>>()
                    .join("|");
                Regex::new(&alternation).ok()
            })
            .flatten();

        Self { bindings, pattern }
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.token == token)
            .map(|b| b.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvBinding> {
        self.bindings.iter()
    }

    /// `import.meta.env` as an object literal of its bound keys.
    pub fn import_meta_env(&self) -> String {
        let mut fields: Vec<(&str, &str)> = self
            .bindings
            .iter()
            .filter_map(|b| {
                let key = b.token.strip_prefix("import.meta.env.")?;
                (!key.contains('.')).then_some((key, b.value.as_str()))
            })
            .collect();
        if fields.is_empty() {
            return "({})".to_string();
        }
        fields.sort_unstable();
        let body = fields
            .iter()
            .map(|(key, value)| format!("{}: {value}", json(key)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("({{ {body} }})")
    }

    /// Replace every free occurrence of a token in `text`.
    ///
    /// `x.import.meta.env.DEV` and `import.meta.env.DEVTOOLS` are left
    /// alone since their full paths differ from the token. Source that does
    /// not parse is returned unchanged for the syntax check to report.
    pub fn substitute<'a>(&self, text: &'a str, source_type: SourceType) -> Cow<'a, str> {
        let Some(pattern) = &self.pattern else {
            return Cow::Borrowed(text);
        };
        if !pattern.is_match(text) {
            return Cow::Borrowed(text);
        }

        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, text, source_type).parse();
        if ret.panicked || !ret.errors.is_empty() {
            return Cow::Borrowed(text);
        }
        let semantic = SemanticBuilder::new().build(&ret.program).semantic;
        let mut finder = TokenFinder {
            bindings: self,
            scoping: semantic.scoping(),
            edits: Vec::new(),
        };
        finder.visit_program(&ret.program);
        if finder.edits.is_empty() {
            return Cow::Borrowed(text);
        }

        let mut edits = finder.edits;
        edits.sort_by_key(|(start, _, _)| *start);
        let mut out = String::with_capacity(text.len());
        let mut last = 0usize;
        for (start, end, value) in edits {
            let (start, end) = (start as usize, end as usize);
            if start < last {
                continue;
            }
            out.push_str(&text[last..start]);
            out.push_str(&value);
            last = end;
        }
        out.push_str(&text[last..]);
        Cow::Owned(out)
    }
}

/// Collects the spans of token expressions.
struct TokenFinder<'b> {
    bindings: &'b Bindings,
    scoping: &'b Scoping,
    edits: Vec<(u32, u32, String)>,
}

impl TokenFinder<'_> {
    fn value_of(&self, expr: &Expression<'_>) -> Option<String> {
        let mut path = String::new();
        self.dotted(expr, &mut path)?;
        self.bindings.get(&path).map(str::to_string)
    }

    /// `a.b.c` for identifier, `import.meta` and static member chains.
    fn dotted(&self, expr: &Expression<'_>, out: &mut String) -> Option<()> {
        match expr {
            Expression::Identifier(ident) => {
                let reference = self.scoping.get_reference(ident.reference_id());
                if reference.symbol_id().is_some() {
                    return None;
                }
                out.push_str(ident.name.as_str());
            }
            Expression::MetaProperty(meta) => {
                out.push_str(meta.meta.name.as_str());
                out.push('.');
                out.push_str(meta.property.name.as_str());
            }
            Expression::StaticMemberExpression(member) => {
                self.dotted(&member.object, out)?;
                out.push('.');
                out.push_str(member.property.name.as_str());
            }
            _ => return None,
        }
        Some(())
    }
}

impl<'a> Visit<'a> for TokenFinder<'_> {
    fn visit_expression(&mut self, expr: &Expression<'a>) {
        if let Some(value) = self.value_of(expr) {
            let span = expr.span();
            self.edits.push((span.start, span.end, value));
            return;
        }
        walk::walk_expression(self, expr);
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if prop.shorthand
            && let Expression::Identifier(ident) = &prop.value
            && let Some(value) = self.value_of(&prop.value)
        {
            let edit = format!("{}: {value}", ident.name.as_str());
            self.edits.push((prop.span.start, prop.span.end, edit));
            return;
        }
        walk::walk_object_property(self, prop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn bindings(mode: BuildMode) -> Arc<Bindings> {
        resolve_bindings(mode, &ProjectConfig::with_root(Path::new("/p")))
    }

    fn sub(b: &Bindings, text: &str) -> String {
        b.substitute(text, SourceType::mjs()).into_owned()
    }

    #[test]
    fn test_dev_flag_follows_mode() {
        let src = "if (import.meta.env.DEV) start();";
        assert_eq!(sub(&bindings(BuildMode::Development), src), "if (true) start();");
        assert_eq!(sub(&bindings(BuildMode::Production), src), "if (false) start();");
    }

    #[test]
    fn test_string_tokens_are_json() {
        let b = bindings(BuildMode::Production);
        assert_eq!(
            sub(&b, "const m = process.env.NODE_ENV, r = process.env.RUNTIME_ENV;"),
            r#"const m = "production", r = "web";"#
        );
        assert_eq!(b.get("import.meta.env.BASE_URL"), Some(r#""/""#));
    }

    #[test]
    fn test_identifier_boundaries() {
        let b = bindings(BuildMode::Development);
        assert_eq!(sub(&b, "x.import.meta.env.DEV;"), "x.import.meta.env.DEV;");
        assert_eq!(sub(&b, "import.meta.env.DEVTOOLS;"), "import.meta.env.DEVTOOLS;");
        assert_eq!(sub(&b, "$process.env.NODE_ENV;"), "$process.env.NODE_ENV;");
        assert_eq!(
            sub(&b, "process.env.NODE_ENV.length;"),
            r#""development".length;"#
        );
    }

    #[test]
    fn test_strings_and_comments_untouched() {
        let b = bindings(BuildMode::Production);
        let src = "// process.env.NODE_ENV\nconsole.log(\"process.env.NODE_ENV is\", process.env.NODE_ENV);\n";
        assert_eq!(
            sub(&b, src),
            "// process.env.NODE_ENV\nconsole.log(\"process.env.NODE_ENV is\", \"production\");\n"
        );
        assert_eq!(
            sub(&b, "`mode process.env.NODE_ENV: ${process.env.NODE_ENV}`;"),
            "`mode process.env.NODE_ENV: ${\"production\"}`;"
        );
    }

    #[test]
    fn test_typed_and_jsx_sources() {
        let b = bindings(BuildMode::Development);
        let ts = b.substitute("const dev: boolean = import.meta.env.DEV;", SourceType::ts());
        assert_eq!(ts, "const dev: boolean = true;");
        let tsx = b.substitute("const el = <p>{process.env.RUNTIME_ENV}</p>;", SourceType::tsx());
        assert_eq!(tsx, "const el = <p>{\"web\"}</p>;");
    }

    #[test]
    fn test_local_binding_shadows_token() {
        let b = bindings(BuildMode::Development);
        let src = "const process = { env: {} };\nprocess.env.NODE_ENV;\n";
        assert_eq!(sub(&b, src), src);
    }

    #[test]
    fn test_shorthand_property_keeps_key() {
        let b = Bindings::new(vec![("__VERSION__".into(), r#""1.2.0""#.into())]);
        assert_eq!(
            sub(&b, "export const v = { __VERSION__ };"),
            r#"export const v = { __VERSION__: "1.2.0" };"#
        );
    }

    #[test]
    fn test_unparsable_source_is_unchanged() {
        let b = bindings(BuildMode::Development);
        let src = "const = import.meta.env.DEV;";
        assert!(matches!(b.substitute(src, SourceType::mjs()), Cow::Borrowed(_)));
    }

    #[test]
    fn test_import_meta_env_object() {
        let env = bindings(BuildMode::Production).import_meta_env();
        assert_eq!(
            env,
            r#"({ "ASSET_PREFIX": "", "BASE_URL": "/", "DEV": false, "MODE": "production", "PROD": true })"#
        );
        assert_eq!(Bindings::new(Vec::new()).import_meta_env(), "({})");
    }

    #[test]
    fn test_longest_token_wins() {
        let b = Bindings::new(vec![
            ("A.B".into(), "1".into()),
            ("A.B.C".into(), "2".into()),
        ]);
        assert_eq!(sub(&b, "A.B.C + A.B;"), "2 + 1;");
    }

    #[test]
    fn test_untouched_text_is_borrowed() {
        let b = bindings(BuildMode::Development);
        assert!(matches!(b.substitute("let a = 1;", SourceType::mjs()), Cow::Borrowed(_)));
    }

    #[test]
    fn test_user_define_overrides_and_extends() {
        let mut config = ProjectConfig::with_root(Path::new("/p"));
        config.define.insert("__VERSION__".into(), serde_json::json!("1.2.0"));
        config
            .define
            .insert("process.env.RUNTIME_ENV".into(), serde_json::json!("desktop"));
        let b = resolve_bindings(BuildMode::Production, &config);
        assert_eq!(sub(&b, "__VERSION__;"), r#""1.2.0";"#);
        assert_eq!(b.get("process.env.RUNTIME_ENV"), Some(r#""desktop""#));
    }
}
