//! CLI regression tests for the `stencil` binary.
//!
//! These invoke the binary as a subprocess to catch regressions in flag
//! names, exit codes and output formats.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn stencil() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("stencil").expect("stencil binary not built");
    cmd.env_remove("RUST_LOG")
        .env_remove("STENCIL_ENGINE")
        .env_remove("STENCIL_LOG_LEVEL")
        .env_remove("STENCIL_LOG_FORMAT");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    let s = String::from_utf8(output).expect("stdout should be valid UTF-8");
    serde_json::from_str(&s).expect("stdout should be valid JSON")
}

// ---------------------------------------------------------------------------
// stencil validate
// ---------------------------------------------------------------------------

#[test]
fn validate_valid_manifest_exits_zero() {
    stencil()
        .args(["validate", "--manifest"])
        .arg(fixture("blog.yaml"))
        .assert()
        .success()
        .stderr(contains("1 valid, 0 invalid"));
}

#[test]
fn validate_undeclared_param_exits_one() {
    stencil()
        .args(["validate", "--manifest"])
        .arg(fixture("invalid-undeclared-param.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E1060"))
        .stderr(contains("user_id"));
}

#[test]
fn validate_routing_conflict_exits_one() {
    stencil()
        .args(["validate", "--manifest"])
        .arg(fixture("invalid-routing-conflict.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E1010"));
}

#[test]
fn validate_unregistered_dependency_exits_one() {
    stencil()
        .args(["validate", "--manifest"])
        .arg(fixture("invalid-unregistered-dependency.yaml"))
        .assert()
        .failure()
        .stderr(contains("E1071"));
}

#[test]
fn validate_parse_error_exits_one() {
    stencil()
        .args(["validate", "--manifest"])
        .arg(fixture("invalid-parse-error.yaml"))
        .assert()
        .failure()
        .stderr(contains("failed to parse"));
}

#[test]
fn validate_missing_file_exits_one() {
    stencil()
        .args(["validate", "--manifest", "this-file-does-not-exist.yaml"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("failed to read"));
}

#[test]
fn validate_json_format_reports_each_manifest() {
    let v = stdout_json(
        stencil()
            .args(["validate", "--format", "json", "--manifest"])
            .arg(fixture("blog.yaml")),
    );

    assert_eq!(v["summary"]["total"], 1);
    assert_eq!(v["results"][0]["valid"], true);
    assert_eq!(v["results"][0]["routes"], 4);
    assert_eq!(v["results"][0]["dependencies"], serde_json::json!(["db"]));
}

#[test]
fn validate_multiple_manifests_counts_invalid() {
    stencil()
        .args(["validate", "--manifest"])
        .arg(fixture("blog.yaml"))
        .arg(fixture("invalid-routing-conflict.yaml"))
        .assert()
        .failure()
        .stderr(contains("1 valid, 1 invalid"));
}

// ---------------------------------------------------------------------------
// stencil compile
// ---------------------------------------------------------------------------

#[test]
fn compile_writes_artifact() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("app.json");

    stencil()
        .args(["compile", "--manifest"])
        .arg(fixture("blog.yaml"))
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stderr(contains("4 routes"));

    let artifact: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(artifact["artifact_version"], 1);
    assert_eq!(artifact["routes"][1]["path"], "/users/{user_id}");
    assert_eq!(
        artifact["routes"][1]["template"],
        r#"{"message": "Hello", "user_id": "{user_id}"}"#
    );
    assert_eq!(artifact["routes_sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn compile_to_stdout() {
    let v = stdout_json(
        stencil()
            .args(["compile", "--manifest"])
            .arg(fixture("blog.yaml")),
    );
    assert_eq!(v["routes"][2]["path_params"], serde_json::json!(["post_id", "comment_id"]));
}

#[test]
fn compile_invalid_manifest_exits_one() {
    stencil()
        .args(["compile", "--manifest"])
        .arg(fixture("invalid-undeclared-param.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("error:"));
}

// ---------------------------------------------------------------------------
// stencil openapi
// ---------------------------------------------------------------------------

#[test]
fn openapi_document_lists_paths() {
    let v = stdout_json(
        stencil()
            .args(["openapi", "--title", "Blog", "--manifest"])
            .arg(fixture("blog.yaml")),
    );

    assert_eq!(v["openapi"], "3.0.0");
    assert_eq!(v["info"]["title"], "Blog");
    assert_eq!(v["paths"]["/hello"]["get"]["summary"], "Say hello");
    assert_eq!(
        v["paths"]["/users/{user_id}"]["get"]["responses"]["404"]["description"],
        "User not found"
    );
    assert!(v["paths"]["/items"]["post"].get("requestBody").is_some());
}

// ---------------------------------------------------------------------------
// stencil preview
// ---------------------------------------------------------------------------

#[test]
fn preview_substitutes_values() {
    let v = stdout_json(
        stencil()
            .args(["preview", "--manifest"])
            .arg(fixture("blog.yaml"))
            .args([
                "--path",
                "/posts/{post_id}/comments/{comment_id}",
                "--param",
                "post_id=1",
                "--param",
                "comment_id=2",
            ]),
    );

    assert_eq!(
        v,
        serde_json::json!({
            "post_id": "1",
            "comment_id": "2",
            "content": "This is comment 2 on post 1"
        })
    );
}

#[test]
fn preview_unknown_route_exits_one() {
    stencil()
        .args(["preview", "--manifest"])
        .arg(fixture("blog.yaml"))
        .args(["--method", "DELETE", "--path", "/hello"])
        .assert()
        .failure()
        .stderr(contains("no route DELETE /hello"));
}

#[test]
fn preview_rejects_malformed_param() {
    stencil()
        .args(["preview", "--manifest"])
        .arg(fixture("blog.yaml"))
        .args(["--path", "/hello", "--param", "novalue"])
        .assert()
        .failure()
        .stderr(contains("expected name=value"));
}

// ---------------------------------------------------------------------------
// stencil serve
// ---------------------------------------------------------------------------

#[test]
fn serve_dry_run_prints_engine_calls() {
    let v = stdout_json(
        stencil()
            .args(["serve", "--dry-run", "--manifest"])
            .arg(fixture("blog.yaml")),
    );

    let calls: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["call"].as_str().unwrap())
        .collect();
    assert_eq!(
        calls,
        vec![
            "SetLogLevel",
            "SetIncludeDebugData",
            "SetLogLevel",
            "SetIncludeDebugData",
            "SetServerConfig",
            "RegisterMiddleware",
            "RegisterMiddleware",
            "RegisterDependency",
            "RegisterRoute",
            "RegisterRouteWithParams",
            "RegisterRouteWithParams",
            "RegisterRoute",
            "StartServer",
        ]
    );
    assert_eq!(v[4]["bind_address"], ":8000");
    assert_eq!(v[4]["concurrency"], 1024);
}

#[test]
fn serve_missing_engine_exits_one() {
    stencil()
        .args(["serve", "--engine", "/nonexistent/libengine.so", "--manifest"])
        .arg(fixture("blog.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E2001"));
}

#[test]
fn serve_default_engine_is_loaded_from_working_directory() {
    let dir = TempDir::new().unwrap();
    let expected = stencil::default_engine_path();

    stencil()
        .current_dir(dir.path())
        .args(["serve", "--manifest"])
        .arg(fixture("blog.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains(format!(
            "failed to load engine library {}",
            expected.display()
        )));
}

#[test]
fn serve_engine_from_env() {
    stencil()
        .env("STENCIL_ENGINE", "/nonexistent/from-env.so")
        .args(["serve", "--manifest"])
        .arg(fixture("blog.yaml"))
        .assert()
        .failure()
        .stderr(contains("/nonexistent/from-env.so"));
}
