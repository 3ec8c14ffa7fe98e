//! Integration tests for the cssmod binary.

use camino::{Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
struct JsonDiagnostic {
    #[serde(rename = "type")]
    diagnostic_type: String,
    filename: String,
    start: JsonPosition,
    message: String,
    code: String,
}

#[derive(Debug, Clone, Deserialize)]
struct JsonPosition {
    line: u32,
    column: u32,
}

fn project(files: &[(&str, &str)]) -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    for (path, content) in files {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    (dir, root)
}

fn cssmod(root: &Utf8Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cssmod"))
        .args(args)
        .arg("--root")
        .arg(root.as_str())
        .env_remove("CSSMOD_DEV")
        .env("CSSMOD_LOG", "off")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_transform_prints_module() {
    let (_dir, root) = project(&[(
        "src/button.module.css",
        ".base {\n  color: red;\n}\n.primary {\n  composes: base;\n}\n",
    )]);
    let output = cssmod(&root, &["transform", "src/button.module.css"]);
    assert!(output.status.success(), "{output:?}");

    let js = stdout(&output);
    assert!(js.contains("export const base = "));
    assert!(js.contains("export const primary = "));
    assert!(js.contains("export default {"));
}

#[test]
fn test_transform_emit_css_has_no_composes() {
    let (_dir, root) = project(&[(
        "a.module.css",
        ".base {\n  color: red;\n}\n.primary {\n  composes: base;\n  margin: 0;\n}\n",
    )]);
    let output = cssmod(&root, &["transform", "a.module.css", "--emit", "css"]);
    assert!(output.status.success(), "{output:?}");

    let css = stdout(&output);
    assert!(!css.contains("composes"));
    assert!(!css.contains(".primary"));
    assert!(css.contains("margin: 0;"));
}

#[test]
fn test_transform_dev_names() {
    let (_dir, root) = project(&[("card.module.css", ".title {\n  color: red;\n}\n")]);
    let output = cssmod(&root, &["transform", "card.module.css", "--emit", "css", "--dev"]);
    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).starts_with(".cardmodule_title_"));
}

#[test]
fn test_unknown_class_warning_as_json() {
    let source = ".a {\n  composes: missing;\n  color: red;\n}\n";
    let (_dir, root) = project(&[("a.module.css", source)]);
    let output = cssmod(&root, &["bundle", "--chunk", "main=a.module.css", "--output", "json"]);
    assert!(output.status.success(), "{output:?}");

    let diagnostics: Vec<JsonDiagnostic> = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, "unknown-class");
    assert_eq!(diagnostics[0].diagnostic_type, "Warning");
    assert!(diagnostics[0].filename.ends_with("a.module.css"));
    // Reported at the rule holding the `composes`.
    assert_eq!(diagnostics[0].start.line, 1);
    assert_eq!(diagnostics[0].start.column, 1);
}

#[test]
fn test_fail_on_warnings() {
    let (_dir, root) = project(&[("a.module.css", ".a {\n  composes: missing;\n}\n")]);
    let output = cssmod(&root, &["transform", "a.module.css", "--fail-on-warnings"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_bundle_writes_assets_and_manifest() {
    let (_dir, root) = project(&[
        (
            "src/a.module.css",
            ".title {\n  composes: base from './b.module.css';\n  color: red;\n}\n",
        ),
        ("src/b.module.css", ".base {\n  color: blue;\n}\n"),
        (
            "cssmod.config.json",
            r#"{ "staticDir": "static", "publicPath": "/build", "chunks": { "main": ["src/a.module.css"] } }"#,
        ),
    ]);
    let output = cssmod(&root, &["bundle", "--out-dir", "dist"]);
    assert!(output.status.success(), "{output:?}");

    let manifest = fs::read_to_string(root.join("dist/manifest.json")).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    let url = manifest["main"].as_str().unwrap();
    assert!(url.starts_with("/build/static/main."));

    let file = url.trim_start_matches("/build/");
    let css = fs::read_to_string(root.join("dist").join(file)).unwrap();
    assert!(!css.contains("composes"));
    assert!(css.contains("/*# sourceMappingURL="));
    assert!(root.join("dist").join(format!("{file}.map")).is_file());
}

#[test]
fn test_bundle_without_chunks_fails() {
    let (_dir, root) = project(&[]);
    let output = cssmod(&root, &["bundle"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no chunks to bundle"));
}

#[test]
fn test_syntax_error_is_reported() {
    let (_dir, root) = project(&[("a.module.css", ".a {}\n.b:: {\n  color: red;\n}\n")]);
    let output = cssmod(&root, &["transform", "a.module.css"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("a.module.css"));
}

#[test]
fn test_unsupported_file() {
    let (_dir, root) = project(&[("plain.css", ".a {}\n")]);
    let output = cssmod(&root, &["transform", "plain.css"]);
    assert!(!output.status.success());
}
