//! ES module → registry factory rewrite.
//!
//! A factory body runs as `function (module, exports, require)`. Imports
//! become `require` calls bound to a local, and every reference to an
//! imported binding is rewritten to a property read on that local so
//! bindings stay live across cycles. Exports become getters installed
//! before the body runs.
//!
//! ```text
//! import React, { useState as use } from "react";   const __rivet_0 = require.interop(require("react"));
//! use(1); <React.Fragment/>                     ->  __rivet_0.useState(1); ... __rivet_0.default ...
//! export const a = 1;                               const a = 1;  + getter a -> a
//! export * from "./b";                              require.reexport(exports, require("./b"));
//! ```
//!
//! Factories load as classic scripts, so `import.meta` becomes the
//! per-module `require.meta` and `import.meta.env` the bound env object.
//!
//! CommonJS sources pass through apart from that; their `require("...")`
//! calls are collected as requests.

use oxc::allocator::Allocator;
use oxc::ast::ast::{
    Argument, CallExpression, ExportDefaultDeclaration, ExportDefaultDeclarationKind, Expression,
    IdentifierReference, ImportDeclarationSpecifier, MetaProperty, ModuleExportName,
    ObjectProperty, Statement,
};
use oxc::ast_visit::{Visit, walk};
use oxc::parser::Parser;
use oxc::semantic::{Scoping, SemanticBuilder, SymbolId};
use oxc::span::{GetSpan, Span};
use rustc_hash::{FxHashMap, FxHashSet};

use super::module::{DepKind, DepRequest};
use super::script::ScriptLang;

/// Factory body plus the specifiers it requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Linked {
    pub code: String,
    pub requests: Vec<DepRequest>,
}

/// Rewrite `source` into a registry factory body.
///
/// `meta_env` is the object literal that replaces `import.meta.env`.
pub fn link(source: &str, lang: ScriptLang, meta_env: &str) -> Result<Linked, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, lang.source_type()).parse();
    if let Some(err) = ret.errors.first() {
        return Err(err.to_string());
    }
    let program = ret.program;
    let semantic = SemanticBuilder::new().build(&program).semantic;
    let scoping = semantic.scoping();

    let mut linker = Linker::default();
    for stmt in &program.body {
        linker.statement(stmt, scoping);
    }

    let mut refs = RefRewriter {
        scoping,
        imports: &linker.bindings,
        meta_env,
        edits: Vec::new(),
        requires: Vec::new(),
    };
    refs.visit_program(&program);
    linker.edits.extend(refs.edits);

    let mut requests = linker.requests.clone();
    let mut seen: FxHashSet<String> = requests.iter().map(|r| r.specifier.clone()).collect();
    for spec in refs.requires {
        if seen.insert(spec.clone()) {
            requests.push(DepRequest::new(spec, DepKind::Require));
        }
    }

    if !linker.is_esm {
        return Ok(Linked {
            code: apply_edits(source, linker.edits),
            requests,
        });
    }

    let mut code = String::with_capacity(source.len() + 256);
    code.push_str("Object.defineProperty(exports, \"__esModule\", { value: true });\n");
    if !linker.exports.is_empty() {
        code.push_str("require.define(exports, {");
        for (i, (name, expr)) in linker.exports.iter().enumerate() {
            if i > 0 {
                code.push(',');
            }
            let key = serde_json::Value::String(name.clone());
            code.push_str(&format!(" {key}: () => {expr}"));
        }
        code.push_str(" });\n");
    }
    code.push_str(&apply_edits(source, linker.edits));

    Ok(Linked { code, requests })
}

#[derive(Default)]
struct Linker {
    is_esm: bool,
    next: usize,
    /// Import binding -> expression that reads it.
    bindings: FxHashMap<SymbolId, String>,
    exports: Vec<(String, String)>,
    requests: Vec<DepRequest>,
    edits: Vec<(u32, u32, String)>,
}

impl Linker {
    fn local(&mut self, specifier: &str) -> String {
        let local = format!("__rivet_{}", self.next);
        self.next += 1;
        self.request(specifier);
        local
    }

    fn request(&mut self, specifier: &str) {
        if !self.requests.iter().any(|r| r.specifier == specifier) {
            self.requests.push(DepRequest::new(specifier, DepKind::Import));
        }
    }

    fn statement(&mut self, stmt: &Statement<'_>, scoping: &Scoping) {
        match stmt {
            Statement::ImportDeclaration(decl) => {
                self.is_esm = true;
                if decl.import_kind.is_type() {
                    self.edits.push((decl.span.start, decl.span.end, String::new()));
                    return;
                }
                let spec = decl.source.value.as_str();
                let source = js_string(spec);
                let specifiers = decl.specifiers.as_ref().filter(|s| !s.is_empty());
                let Some(specifiers) = specifiers else {
                    self.request(spec);
                    let call = format!("require({source});");
                    self.edits.push((decl.span.start, decl.span.end, call));
                    return;
                };
                let local = self.local(spec);
                for specifier in specifiers {
                    let (symbol, expr) = match specifier {
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                            (s.local.symbol_id(), format!("{local}.default"))
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                            (s.local.symbol_id(), local.clone())
                        }
                        ImportDeclarationSpecifier::ImportSpecifier(s) => {
                            (s.local.symbol_id(), member(&local, export_name(&s.imported)))
                        }
                    };
                    self.bindings.insert(symbol, expr);
                }
                self.edits.push((
                    decl.span.start,
                    decl.span.end,
                    format!("const {local} = require.interop(require({source}));"),
                ));
            }
            Statement::ExportNamedDeclaration(decl) => {
                self.is_esm = true;
                if decl.export_kind.is_type() {
                    self.edits.push((decl.span.start, decl.span.end, String::new()));
                    return;
                }
                if let Some(declaration) = &decl.declaration {
                    let inner = declaration.span();
                    self.edits.push((decl.span.start, inner.start, String::new()));
                    for name in root_symbols_within(scoping, inner) {
                        self.exports.push((name.clone(), name));
                    }
                    return;
                }
                if let Some(source) = &decl.source {
                    let local = self.local(source.value.as_str());
                    for s in &decl.specifiers {
                        let exported = export_name(&s.exported).to_string();
                        self.exports.push((exported, member(&local, export_name(&s.local))));
                    }
                    let source = js_string(source.value.as_str());
                    self.edits.push((
                        decl.span.start,
                        decl.span.end,
                        format!("const {local} = require.interop(require({source}));"),
                    ));
                    return;
                }
                for s in &decl.specifiers {
                    let exported = export_name(&s.exported).to_string();
                    let read = match &s.local {
                        ModuleExportName::IdentifierReference(ident) => self
                            .import_read(scoping, ident)
                            .unwrap_or_else(|| ident.name.to_string()),
                        other => export_name(other).to_string(),
                    };
                    self.exports.push((exported, read));
                }
                self.edits.push((decl.span.start, decl.span.end, String::new()));
            }
            Statement::ExportAllDeclaration(decl) => {
                self.is_esm = true;
                let spec = decl.source.value.as_str();
                let source = js_string(spec);
                match &decl.exported {
                    Some(name) => {
                        let local = self.local(spec);
                        self.exports.push((export_name(name).to_string(), local.clone()));
                        self.edits.push((
                            decl.span.start,
                            decl.span.end,
                            format!("const {local} = require({source});"),
                        ));
                    }
                    None => {
                        self.request(spec);
                        self.edits.push((
                            decl.span.start,
                            decl.span.end,
                            format!("require.reexport(exports, require({source}));"),
                        ));
                    }
                }
            }
            Statement::ExportDefaultDeclaration(decl) => {
                self.is_esm = true;
                self.export_default(decl);
            }
            _ => {}
        }
    }

    fn export_default(&mut self, decl: &ExportDefaultDeclaration<'_>) {
        let inner = decl.declaration.span();
        let named = match &decl.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(f) => {
                Some(f.id.as_ref().map(|id| id.name.to_string()))
            }
            ExportDefaultDeclarationKind::ClassDeclaration(c) => {
                Some(c.id.as_ref().map(|id| id.name.to_string()))
            }
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => {
                self.edits.push((decl.span.start, decl.span.end, String::new()));
                return;
            }
            _ => None,
        };
        match named {
            Some(Some(name)) => {
                self.edits.push((decl.span.start, inner.start, String::new()));
                self.exports.push(("default".to_string(), name));
            }
            Some(None) => {
                let binding = "const __rivet_default = ".to_string();
                self.edits.push((decl.span.start, inner.start, binding));
                self.edits.push((decl.span.end, decl.span.end, ";".to_string()));
                self.exports.push(("default".to_string(), "__rivet_default".to_string()));
            }
            None => {
                let binding = "const __rivet_default = ".to_string();
                self.edits.push((decl.span.start, inner.start, binding));
                self.exports.push(("default".to_string(), "__rivet_default".to_string()));
            }
        }
    }

    fn import_read(&self, scoping: &Scoping, ident: &IdentifierReference<'_>) -> Option<String> {
        let symbol = scoping.get_reference(ident.reference_id()).symbol_id()?;
        self.bindings.get(&symbol).cloned()
    }
}

/// Rewrites reads of imported bindings outside module declarations and
/// `import.meta`, and collects literal `require("...")` calls.
struct RefRewriter<'s> {
    scoping: &'s Scoping,
    imports: &'s FxHashMap<SymbolId, String>,
    meta_env: &'s str,
    edits: Vec<(u32, u32, String)>,
    requires: Vec<String>,
}

impl RefRewriter<'_> {
    fn read(&self, ident: &IdentifierReference<'_>) -> Option<&String> {
        let symbol = self.scoping.get_reference(ident.reference_id()).symbol_id()?;
        self.imports.get(&symbol)
    }

    fn is_free(&self, ident: &IdentifierReference<'_>) -> bool {
        self.scoping
            .get_reference(ident.reference_id())
            .symbol_id()
            .is_none()
    }
}

fn is_import_meta(meta: &MetaProperty<'_>) -> bool {
    meta.meta.name.as_str() == "import" && meta.property.name.as_str() == "meta"
}

impl<'a> Visit<'a> for RefRewriter<'_> {
    fn visit_statement(&mut self, stmt: &Statement<'a>) {
        match stmt {
            Statement::ImportDeclaration(_) | Statement::ExportAllDeclaration(_) => {}
            Statement::ExportNamedDeclaration(decl) => {
                if let Some(declaration) = &decl.declaration {
                    self.visit_declaration(declaration);
                }
            }
            _ => walk::walk_statement(self, stmt),
        }
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if prop.shorthand
            && let Expression::Identifier(ident) = &prop.value
            && let Some(read) = self.read(ident)
        {
            let edit = format!("{}: {read}", ident.name);
            self.edits.push((prop.span.start, prop.span.end, edit));
            return;
        }
        walk::walk_object_property(self, prop);
    }

    fn visit_expression(&mut self, expr: &Expression<'a>) {
        if let Expression::StaticMemberExpression(member) = expr
            && let Expression::MetaProperty(meta) = &member.object
            && is_import_meta(meta)
            && member.property.name.as_str() == "env"
        {
            let edit = self.meta_env.to_string();
            self.edits.push((member.span.start, member.span.end, edit));
            return;
        }
        walk::walk_expression(self, expr);
    }

    fn visit_meta_property(&mut self, meta: &MetaProperty<'a>) {
        if is_import_meta(meta) {
            self.edits.push((meta.span.start, meta.span.end, "require.meta".to_string()));
        }
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &call.callee
            && callee.name.as_str() == "require"
            && self.is_free(callee)
            && call.arguments.len() == 1
            && let Some(Argument::StringLiteral(spec)) = call.arguments.first()
        {
            self.requires.push(spec.value.to_string());
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        if let Some(read) = self.read(ident) {
            let edit = read.clone();
            self.edits.push((ident.span.start, ident.span.end, edit));
        }
    }
}

fn root_symbols_within(scoping: &Scoping, span: Span) -> Vec<String> {
    let root = scoping.root_scope_id();
    let mut found: Vec<(u32, String)> = scoping
        .symbol_ids()
        .filter(|&id| scoping.symbol_scope_id(id) == root)
        .filter_map(|id| {
            let s = scoping.symbol_span(id);
            (s.start >= span.start && s.end <= span.end)
                .then(|| (s.start, scoping.symbol_name(id).to_string()))
        })
        .collect();
    found.sort();
    found.into_iter().map(|(_, name)| name).collect()
}

fn export_name<'s>(name: &'s ModuleExportName<'_>) -> &'s str {
    match name {
        ModuleExportName::IdentifierName(n) => n.name.as_str(),
        ModuleExportName::IdentifierReference(n) => n.name.as_str(),
        ModuleExportName::StringLiteral(s) => s.value.as_str(),
    }
}

fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// `obj.name`, or `obj["name"]` when `name` is not an identifier.
fn member(object: &str, name: &str) -> String {
    let ident = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if ident { format!("{object}.{name}") } else { format!("{object}[{}]", js_string(name)) }
}

fn apply_edits(source: &str, mut edits: Vec<(u32, u32, String)>) -> String {
    edits.sort_by_key(|(start, end, _)| (*start, *end));
    let mut out = String::with_capacity(source.len());
    let mut last = 0usize;
    for (start, end, text) in edits {
        let (start, end) = (start as usize, end as usize);
        if start < last {
            continue;
        }
        out.push_str(&source[last..start]);
        out.push_str(&text);
        last = end;
    }
    out.push_str(&source[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ENV: &str = "({})";

    fn specs(linked: &Linked) -> Vec<&str> {
        linked.requests.iter().map(|r| r.specifier.as_str()).collect()
    }

    #[test]
    fn test_imports_become_property_reads() {
        let src = "import React, { useState as use } from \"react\";\nconst [n] = use(0);\nexport const el = React.createElement(\"div\", { n });\n";
        let linked = link(src, ScriptLang::Js, NO_ENV).unwrap();
        assert_eq!(specs(&linked), vec!["react"]);
        assert!(linked.code.contains("const __rivet_0 = require.interop(require(\"react\"));"));
        assert!(linked.code.contains("__rivet_0.useState(0)"));
        assert!(linked.code.contains("__rivet_0.default.createElement"));
        assert!(linked.code.contains("\"el\": () => el"));
        assert!(!linked.code.contains("import "));
        assert!(!linked.code.contains("export "));
    }

    #[test]
    fn test_shorthand_property_keeps_key() {
        let src = "import { a } from './a';\nexport const o = { a };\n";
        let linked = link(src, ScriptLang::Js, NO_ENV).unwrap();
        assert!(linked.code.contains("{ a: __rivet_0.a }"));
    }

    #[test]
    fn test_default_exports() {
        let named = link("export default function App() {}\n", ScriptLang::Js, NO_ENV).unwrap();
        assert!(named.code.contains("\"default\": () => App"));
        assert!(named.code.contains("function App() {}"));

        let anon = link("export default () => 1;\n", ScriptLang::Js, NO_ENV).unwrap();
        assert!(anon.code.contains("const __rivet_default = () => 1;"));
        assert!(anon.code.contains("\"default\": () => __rivet_default"));
    }

    #[test]
    fn test_reexports() {
        let src = "export * from './all';\nexport { x as y } from './x';\nexport * as ns from './ns';\n";
        let linked = link(src, ScriptLang::Js, NO_ENV).unwrap();
        assert_eq!(specs(&linked), vec!["./all", "./x", "./ns"]);
        assert!(linked.code.contains("require.reexport(exports, require(\"./all\"));"));
        assert!(linked.code.contains("\"y\": () => __rivet_0.x"));
        assert!(linked.code.contains("\"ns\": () => __rivet_1"));
    }

    #[test]
    fn test_export_list_of_import_stays_live() {
        let src = "import { value } from './v';\nexport { value as current };\n";
        let linked = link(src, ScriptLang::Js, NO_ENV).unwrap();
        assert!(linked.code.contains("\"current\": () => __rivet_0.value"));
    }

    #[test]
    fn test_side_effect_import() {
        let linked = link("import './app.css';\n", ScriptLang::Js, NO_ENV).unwrap();
        assert!(linked.code.contains("require(\"./app.css\");"));
        assert_eq!(specs(&linked), vec!["./app.css"]);
    }

    #[test]
    fn test_commonjs_passes_through() {
        let src = "var a = require('./a');\nmodule.exports = function () { return require(\"b\"); };\nfoo.require('no');\n";
        let linked = link(src, ScriptLang::Unambiguous, NO_ENV).unwrap();
        assert_eq!(linked.code, src);
        assert_eq!(specs(&linked), vec!["./a", "b"]);
        assert!(linked.requests.iter().all(|r| r.kind == DepKind::Require));
    }

    #[test]
    fn test_require_in_comments_and_strings_ignored() {
        let src = "// require('./commented')\n\
                   const s = \"require('./quoted')\";\n\
                   const real = require('./real');\n";
        let linked = link(src, ScriptLang::Unambiguous, NO_ENV).unwrap();
        assert_eq!(specs(&linked), vec!["./real"]);
    }

    #[test]
    fn test_local_require_is_not_a_request() {
        let src = "function require(x) { return x; }\nrequire('./local');\n";
        let linked = link(src, ScriptLang::Unambiguous, NO_ENV).unwrap();
        assert!(linked.requests.is_empty());
    }

    #[test]
    fn test_import_meta_rewritten() {
        let src = "import { a } from './a';\n\
                   export const u = new URL('./x.png', import.meta.url);\n\
                   export const e = import.meta.env;\n\
                   export const m = import.meta.env.CUSTOM;\n";
        let linked = link(src, ScriptLang::Js, "({ \"DEV\": true })").unwrap();
        assert!(!linked.code.contains("import.meta"));
        assert!(linked.code.contains("new URL('./x.png', require.meta.url)"));
        assert!(linked.code.contains("const e = ({ \"DEV\": true });"));
        assert!(linked.code.contains("const m = ({ \"DEV\": true }).CUSTOM;"));

        let plain = link("console.log(import.meta.url);\n", ScriptLang::Js, NO_ENV).unwrap();
        assert_eq!(plain.code, "console.log(require.meta.url);\n");
    }

    #[test]
    fn test_member_access_quotes_non_identifiers() {
        assert_eq!(member("m", "foo"), "m.foo");
        assert_eq!(member("m", "foo-bar"), "m[\"foo-bar\"]");
    }

    #[test]
    fn test_apply_edits_in_order() {
        let edits = vec![(4, 5, "E".into()), (0, 1, "A".into()), (2, 2, "-".into())];
        let out = apply_edits("abcdef", edits);
        assert_eq!(out, "Ab-cdEf");
    }
}
