use std::fs;
use std::path::Path;

use tempfile::TempDir;

use super::*;
use crate::transform::{FailedAt, StageName};

fn write(root: &Path, rel: &str, content: impl AsRef<[u8]>) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project(extra: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "src/index.tsx",
        "import './app.css';\nimport { render } from 'react';\nimport { App } from './App';\nimport photo from './photo.png';\nconsole.log(import.meta.env.DEV);\nrender(App, photo);\n",
    );
    write(
        root,
        "src/App.tsx",
        "import { render } from 'react';\nexport const App = () => render(null);\n",
    );
    write(root, "src/app.css", ".app { color: red; }\n");
    write(root, "src/photo.png", vec![7u8; 10_000]);
    write(root, "node_modules/react/package.json", "{\"main\": \"index.js\"}");
    write(root, "node_modules/react/index.js", "exports.render = function () {};\n");
    write(root, "public/robots.txt", "User-agent: *\n");
    for (rel, content) in extra {
        write(root, rel, content);
    }
    dir
}

fn config(root: &Path) -> ProjectConfig {
    let mut config = ProjectConfig::with_root(root);
    config.check.enable = false;
    config
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join("dist").join(rel)).unwrap()
}

fn js_file(report: &BuildReport, chunk: &str) -> String {
    report
        .written
        .iter()
        .find(|d| d.starts_with(&format!("static/js/{chunk}.")) && d.ends_with(".js"))
        .cloned()
        .unwrap_or_else(|| panic!("no file for chunk {chunk} in {:?}", report.written))
}

#[test]
fn test_production_build_writes_everything() {
    let dir = project(&[]);
    let pipeline = Pipeline::new(&config(dir.path()), BuildMode::Production).unwrap();
    let report = pipeline.build(true).unwrap();

    assert_eq!(report.outcome, BuildOutcome::Complete);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!(!report.is_failed());

    let hash8 = crate::output::ContentHash::of(&[7u8; 10_000]).short();
    assert!(report.written.contains(&format!("static/image/photo.{hash8}.png")));
    assert!(
        report
            .written
            .iter()
            .any(|d| d.starts_with("static/css/index.") && d.ends_with(".css"))
    );
    assert!(report.written.contains(&"robots.txt".to_string()));

    let html = read(dir.path(), "index.html");
    assert!(html.contains(&format!("src=\"./{}\"", js_file(&report, "index"))));
    assert!(html.contains(&format!("src=\"./{}\"", js_file(&report, "lib-react"))));
}

#[test]
fn test_react_shared_by_two_importers_lands_in_lib_react() {
    let dir = project(&[]);
    let pipeline = Pipeline::new(&config(dir.path()), BuildMode::Development).unwrap();
    let report = pipeline.build(true).unwrap();

    let react = read(dir.path(), "static/js/lib-react.js");
    assert!(react.contains("\"node_modules/react/index.js\": [function"));
    let index = read(dir.path(), "static/js/index.js");
    assert!(!index.contains("\"node_modules/react/index.js\": [function"));
    assert!(index.contains("\"src/App.tsx\": [function"));
    assert!(report.conflicts.is_empty());
}

#[test]
fn test_env_dev_per_mode() {
    let dir = project(&[]);
    let mut cfg = config(dir.path());
    cfg.build.minify = Some(false);

    let dev = Pipeline::new(&cfg, BuildMode::Development).unwrap();
    dev.build(true).unwrap();
    let index = read(dir.path(), "static/js/index.js");
    assert!(index.contains("console.log(true)"));
    assert!(!index.contains("import.meta.env.DEV"));

    let prod = Pipeline::new(&cfg, BuildMode::Production).unwrap();
    let report = prod.build(true).unwrap();
    let index = read(dir.path(), &js_file(&report, "index"));
    assert!(index.contains("console.log(false)"));
}

#[test]
fn test_syntax_error_fails_one_file_only() {
    let dir = project(&[("src/App.tsx", "export const App = ( => ;\n")]);
    let pipeline = Pipeline::new(&config(dir.path()), BuildMode::Production).unwrap();
    let report = pipeline.build(true).unwrap();

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, "src/App.tsx");
    assert_eq!(report.errors[0].stage, FailedAt::Stage(StageName::SyntaxParse));
    assert!(report.is_failed());

    // Everything else still emits.
    assert!(report.written.iter().any(|d| d.starts_with("static/image/photo.")));
    let index = read(dir.path(), &js_file(&report, "index"));
    assert!(index.contains("rivet: src/App.tsx: syntax-parse"));
}

#[test]
fn test_production_build_is_idempotent() {
    let dir = project(&[]);
    let cfg = config(dir.path());

    let first = Pipeline::new(&cfg, BuildMode::Production).unwrap().build(true).unwrap();
    let snapshot: Vec<(String, Vec<u8>)> = first
        .written
        .iter()
        .map(|d| (d.clone(), fs::read(dir.path().join("dist").join(d)).unwrap()))
        .collect();

    let second = Pipeline::new(&cfg, BuildMode::Production).unwrap().build(true).unwrap();
    assert_eq!(first.written, second.written);
    for (dest, bytes) in snapshot {
        assert_eq!(fs::read(dir.path().join("dist").join(&dest)).unwrap(), bytes, "{dest}");
    }
}

#[test]
fn test_rebuild_reuses_unchanged_modules() {
    let dir = project(&[]);
    let pipeline = Pipeline::new(&config(dir.path()), BuildMode::Development).unwrap();
    let first = pipeline.build(true).unwrap();
    assert_eq!(first.reused, 0);

    write(dir.path(), "src/App.tsx", "export const App = () => 1;\n");
    let second = pipeline.build(true).unwrap();
    assert_eq!(second.reused, second.modules - 1);
}

#[test]
fn test_naming_collision_fails_without_writing() {
    let dir = project(&[
        (
            "src/index.tsx",
            "import a from './a/logo.png?url';\nimport b from './b/logo.png?url';\nconsole.log(a, b);\n",
        ),
        ("src/a/logo.png", "first"),
        ("src/b/logo.png", "second"),
    ]);
    let pipeline = Pipeline::new(&config(dir.path()), BuildMode::Development).unwrap();
    let report = pipeline.build(true).unwrap();

    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].destination, "static/image/logo.png");
    assert!(report.is_failed());
    assert!(report.written.is_empty());
}

#[test]
fn test_cancel_paths_without_running_chains() {
    let dir = project(&[]);
    let pipeline = Pipeline::new(&config(dir.path()), BuildMode::Development).unwrap();
    pipeline.build(true).unwrap();
    assert_eq!(pipeline.cancel_paths(&[dir.path().join("src/index.tsx")]), 0);
}

#[test]
fn test_cancelled_path_supersedes_build_then_rerun_reuses_the_rest() {
    let dir = project(&[]);
    let pipeline = Pipeline::new(&config(dir.path()), BuildMode::Development).unwrap();
    pipeline.build(true).unwrap();

    write(
        dir.path(),
        "src/App.tsx",
        "import { render } from 'react';\nexport const App = () => render(1);\n",
    );
    // A chain over App.tsx is in flight when the change arrives.
    let app = dir.path().join("src/App.tsx");
    pipeline.inflight.insert(app.clone(), CancelToken::new());
    assert_eq!(pipeline.cancel_paths(std::slice::from_ref(&app)), 1);

    let superseded = pipeline.build(true).unwrap();
    assert_eq!(superseded.outcome, BuildOutcome::Superseded);
    assert!(superseded.is_superseded());
    assert!(!pipeline.inflight.contains_key(&app));

    let rerun = pipeline.build(true).unwrap();
    assert_eq!(rerun.outcome, BuildOutcome::Complete);
    assert!(rerun.errors.is_empty(), "{:?}", rerun.errors);
    assert_eq!(rerun.reused, rerun.modules - 1);
    assert!(read(dir.path(), "static/js/index.js").contains("render(1)"));
}

#[test]
fn test_define_leaves_string_literals_alone() {
    let dir = project(&[(
        "src/App.tsx",
        "export const App = () => console.log(\"process.env.NODE_ENV is\", process.env.NODE_ENV);\n",
    )]);
    let mut cfg = config(dir.path());
    cfg.build.minify = Some(false);
    let pipeline = Pipeline::new(&cfg, BuildMode::Production).unwrap();
    let report = pipeline.build(true).unwrap();

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    let index = read(dir.path(), &js_file(&report, "index"));
    assert!(index.contains("\"process.env.NODE_ENV is\", \"production\""));
}

#[test]
fn test_chunks_parse_as_classic_scripts() {
    let dir = project(&[(
        "src/App.tsx",
        "export const App = () => [new URL('./x.png', import.meta.url).href, import.meta.env];\n",
    )]);
    let pipeline = Pipeline::new(&config(dir.path()), BuildMode::Development).unwrap();
    let report = pipeline.build(true).unwrap();
    assert!(report.errors.is_empty(), "{:?}", report.errors);

    let scripts: Vec<&String> = report.written.iter().filter(|d| d.ends_with(".js")).collect();
    assert!(!scripts.is_empty());
    for dest in scripts {
        let code = read(dir.path(), dest);
        assert!(!code.contains("import.meta"), "{dest}");
        let allocator = oxc::allocator::Allocator::default();
        let ret = oxc::parser::Parser::new(&allocator, &code, oxc::span::SourceType::cjs()).parse();
        assert!(ret.errors.is_empty(), "{dest}: {:?}", ret.errors);
    }
    let index = read(dir.path(), "static/js/index.js");
    assert!(index.contains("require.meta.url"));
    assert!(index.contains("\"MODE\": \"development\""));
}

#[test]
fn test_custom_template() {
    let dir = project(&[(
        "index.html",
        "<!doctype html><html><head><title>Shell</title></head><body><main></main></body></html>",
    )]);
    let pipeline = Pipeline::new(&config(dir.path()), BuildMode::Development).unwrap();
    pipeline.build(true).unwrap();

    let html = read(dir.path(), "index.html");
    assert!(html.contains("<title>Shell</title>"));
    assert!(html.contains("<main></main>"));
    assert!(html.contains("<link rel=\"stylesheet\" href=\"/static/css/index.css\">"));
}
