//! Integration tests for the command-line interface
//!
//! Runs the built binary against scratch workspaces for apply, status and
//! list.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const ROUTES: &str = "\
const express = require('express');
const router = express.Router();
const { Customer } = require('../models/customer');

module.exports = router;
";

const IMPORT_RULES: &str = r#"
[meta]
name = "customer-schema-import"
target = "routes/customers.js"

[[changes]]
id = "customer-schema-import"

[changes.marker]
identifier = { type = "literal", pattern = "require('../models/customer-schema')", role = "import" }

[[changes.rules]]
id = "exact-import"
anchor = { type = "literal", pattern = "require('../models/customer')", role = "import" }
transform = { type = "replace", text = "require('../models/customer-schema')" }
"#;

/// Workspace with `routes/customers.js` and one rule file in `patches/`.
fn setup_test_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::create_dir_all(dir.path().join("routes")).unwrap();
    fs::write(dir.path().join("routes/customers.js"), ROUTES).unwrap();

    fs::create_dir_all(dir.path().join("patches")).unwrap();
    fs::write(dir.path().join("patches/import.toml"), IMPORT_RULES).unwrap();

    dir
}

fn patcher(workspace: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_anchor-patcher"));
    cmd.current_dir(workspace)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("ANCHOR_PATCHER_WORKSPACE");
    cmd
}

fn run(workspace: &Path, args: &[&str]) -> Output {
    patcher(workspace).args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn routes(workspace: &TempDir) -> String {
    fs::read_to_string(workspace.path().join("routes/customers.js")).unwrap()
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["--help"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("apply"));
    assert!(out.contains("status"));
    assert!(out.contains("list"));
}

#[test]
fn test_apply_basic() {
    let workspace = setup_test_workspace();
    let ws = workspace.path().to_str().unwrap();

    let output = run(workspace.path(), &["apply", "--workspace", ws]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("Workspace:"));
    assert!(out.contains("Loading rules from"));
    assert!(out.contains("customer-schema-import: Applied (rule exact-import)"));
    assert!(out.contains("Summary:"));
    assert!(out.contains("1 applied"));

    assert_eq!(
        routes(&workspace),
        ROUTES.replace(
            "require('../models/customer')",
            "require('../models/customer-schema')"
        )
    );
}

#[test]
fn test_apply_idempotent() {
    let workspace = setup_test_workspace();
    let ws = workspace.path().to_str().unwrap();

    run(workspace.path(), &["apply", "-w", ws]);
    let after_first = routes(&workspace);

    let output = run(workspace.path(), &["apply", "-w", ws]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("customer-schema-import: Already applied"));
    assert!(stdout(&output).contains("1 already applied"));
    assert_eq!(routes(&workspace), after_first);
}

#[test]
fn test_dry_run_does_not_write() {
    let workspace = setup_test_workspace();
    let ws = workspace.path().to_str().unwrap();

    let output = run(workspace.path(), &["apply", "-w", ws, "--dry-run", "--diff"]);
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("DRY RUN"));
    assert!(out.contains("Would apply (rule exact-import)"));
    assert!(out.contains("-const { Customer } = require('../models/customer');"));
    assert!(out.contains("+const { Customer } = require('../models/customer-schema');"));
    assert_eq!(routes(&workspace), ROUTES);
}

#[test]
fn test_skipped_exits_zero() {
    let workspace = setup_test_workspace();
    fs::write(
        workspace.path().join("routes/customers.js"),
        "module.exports = {};\n",
    )
    .unwrap();
    let ws = workspace.path().to_str().unwrap();

    let output = run(workspace.path(), &["apply", "-w", ws]);
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("customer-schema-import: Skipped (no rule matched)"));
    assert!(out.contains("exact-import: anchor not found"));
    assert_eq!(routes(&workspace), "module.exports = {};\n");
}

#[test]
fn test_explicit_target_and_rules() {
    let workspace = setup_test_workspace();
    let ws = workspace.path().to_str().unwrap();
    fs::write(workspace.path().join("other.js"), ROUTES).unwrap();
    let rules = workspace.path().join("patches/import.toml");

    let output = run(
        workspace.path(),
        &["apply", "other.js", "-w", ws, "-r", rules.to_str().unwrap()],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let other = fs::read_to_string(workspace.path().join("other.js")).unwrap();
    assert!(other.contains("require('../models/customer-schema')"));
    assert_eq!(routes(&workspace), ROUTES);
}

#[test]
fn test_workspace_from_env() {
    let workspace = setup_test_workspace();
    let elsewhere = TempDir::new().unwrap();

    let output = patcher(elsewhere.path())
        .env("ANCHOR_PATCHER_WORKSPACE", workspace.path())
        .arg("apply")
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(routes(&workspace).contains("customer-schema"));
}

#[test]
fn test_status_json() {
    let workspace = setup_test_workspace();
    let ws = workspace.path().to_str().unwrap();

    let output = run(workspace.path(), &["status", "-w", ws, "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let entries: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let entry = &entries.as_array().unwrap()[0];
    assert_eq!(entry["change"], "customer-schema-import");
    assert_eq!(entry["outcome"], "applied");
    assert_eq!(entry["rule"], "exact-import");

    // status never writes
    assert_eq!(routes(&workspace), ROUTES);
}

#[test]
fn test_status_report() {
    let workspace = setup_test_workspace();
    let ws = workspace.path().to_str().unwrap();

    let output = run(workspace.path(), &["status", "-w", ws]);
    let out = stdout(&output);
    assert!(out.contains("Patch Status Report"));
    assert!(out.contains("NOT APPLIED"));

    run(workspace.path(), &["apply", "-w", ws]);

    let output = run(workspace.path(), &["status", "-w", ws]);
    let out = stdout(&output);
    assert!(out.contains("APPLIED (1 changes)"));
    assert!(!out.contains("NOT APPLIED"));
    assert!(out.contains("- customer-schema-import"));
}

#[test]
fn test_list() {
    let workspace = setup_test_workspace();
    let ws = workspace.path().to_str().unwrap();

    let output = run(workspace.path(), &["list", "-w", ws]);
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("customer-schema-import"));
    assert!(out.contains("target: routes/customers.js"));
    assert!(out.contains("1. exact-import [replace]"));
}

#[test]
fn test_missing_target_fails() {
    let workspace = setup_test_workspace();
    fs::remove_file(workspace.path().join("routes/customers.js")).unwrap();
    let ws = workspace.path().to_str().unwrap();

    let output = run(workspace.path(), &["apply", "-w", ws]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("file not found"));
}

#[test]
fn test_invalid_rule_file_fails_before_touching_target() {
    let workspace = setup_test_workspace();
    fs::write(
        workspace.path().join("patches/broken.toml"),
        r#"
[[changes]]
id = "broken"
[changes.marker]
identifier = { type = "literal", pattern = "x" }
[[changes.rules]]
id = "r"
anchor = { type = "regex", pattern = "(unclosed" }
transform = { type = "replace", text = "y" }
"#,
    )
    .unwrap();
    let ws = workspace.path().to_str().unwrap();

    let output = run(workspace.path(), &["apply", "-w", ws]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("does not compile"));
    assert_eq!(routes(&workspace), ROUTES);
}

#[test]
fn test_target_outside_workspace_rejected() {
    let workspace = setup_test_workspace();
    let ws = workspace.path().to_str().unwrap();

    let output = run(workspace.path(), &["apply", "../outside.js", "-w", ws]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("outside workspace"));
}

#[test]
fn test_no_patches_dir() {
    let dir = TempDir::new().unwrap();
    let ws = dir.path().to_str().unwrap();

    let output = run(dir.path(), &["apply", "-w", ws]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--rules"));
}
