#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ALLOW_LIST: &str = "actions:\n- actions/checkout/v4\nmaintainers:\n- platform\n";

const WIDGET: &str =
    "[widget]\nname = acme/widget\ndescription = demo\nrequested_version = v1.0.0\n";

const TWO: &str = "\
[widget]
name = acme/widget
description = demo
requested_version = v1.0.0

[gadget]
name = acme/gadget
description = second
requested_version = v2.0.0
";

fn intake(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("action-intake").unwrap();
    cmd.current_dir(dir.path())
        .env("INTAKE_ROOT", dir.path())
        .env_remove("GH_ISSUE_TITLE")
        .env_remove("GH_ISSUE_BODY")
        .env_remove("GH_ISSUE_NUMBER")
        .env_remove("GH_ISSUE_AUTHOR")
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn init_project(dir: &TempDir) {
    std::fs::write(allow_list_path(dir), ALLOW_LIST).unwrap();
    std::fs::create_dir_all(dir.path().join("scratch")).unwrap();
}

fn allow_list_path(dir: &TempDir) -> PathBuf {
    dir.path().join("github-actions-allow-list.yml")
}

fn allow_list(dir: &TempDir) -> String {
    std::fs::read_to_string(allow_list_path(dir)).unwrap()
}

fn receipt_path(dir: &TempDir) -> PathBuf {
    dir.path().join("action-request.txt")
}

fn scratch_is_empty(dir: &TempDir) -> bool {
    std::fs::read_dir(dir.path().join("scratch"))
        .unwrap()
        .next()
        .is_none()
}

/// A stand-in for `gh` that only knows the refs listed in `FAKE_GH_KNOWN`
/// and appends every call (and the token it saw) to `FAKE_GH_LOG`.
#[cfg(unix)]
fn fake_gh(dir: &TempDir) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = r#"#!/bin/sh
# repo clone <name> <dest> -- --branch <ref> --depth 1
name="$3"
dest="$4"
ref="$7"
if [ -n "$FAKE_GH_LOG" ]; then
    echo "$name@$ref token=$GH_TOKEN" >> "$FAKE_GH_LOG"
fi
case " $FAKE_GH_KNOWN " in
    *" $name@$ref "*)
        mkdir -p "$dest/.git"
        echo "name: $name" > "$dest/action.yml"
        exit 0
        ;;
esac
echo "Cloning into '$dest'..." >&2
echo "fatal: Remote branch $ref not found in upstream origin" >&2
exit 128
"#;
    let path = dir.path().join("fake-gh");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
fn process(dir: &TempDir, gh: &Path, body: &str, known: &str) -> Command {
    let mut cmd = intake(dir);
    cmd.env("FAKE_GH_KNOWN", known)
        .args(["process", "--number", "7", "--author", "octocat", "--body", body])
        .arg("--oracle-program")
        .arg(gh)
        .args(["--workspace-root", "scratch"]);
    cmd
}

// ---------------------------------------------------------------------------
// action-intake process
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn process_accepts_existing_action() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let gh = fake_gh(&dir);

    process(&dir, &gh, WIDGET, "acme/widget@v1.0.0")
        .assert()
        .success()
        .stdout(predicate::str::contains("Added acme/widget/v1.0.0"))
        .stdout(predicate::str::contains("success:"));

    let doc: serde_yaml::Value = serde_yaml::from_str(&allow_list(&dir)).unwrap();
    let actions: Vec<&str> = doc["actions"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(actions, ["actions/checkout/v4", "acme/widget/v1.0.0"]);
    assert_eq!(doc["maintainers"][0].as_str(), Some("platform"));

    let receipt = std::fs::read_to_string(receipt_path(&dir)).unwrap();
    assert_eq!(
        receipt,
        "Action name: acme/widget\nAction description: demo\nAction version: v1.0.0\n"
    );
    assert!(scratch_is_empty(&dir));
}

#[cfg(unix)]
#[test]
fn process_rejects_missing_version() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let gh = fake_gh(&dir);

    process(&dir, &gh, WIDGET, "acme/widget@v0.9.0")
        .assert()
        .failure()
        .stdout(predicate::str::contains("validation_failure"))
        .stdout(predicate::str::contains("failure:"));

    assert_eq!(allow_list(&dir), ALLOW_LIST);
    assert!(!receipt_path(&dir).exists());
    assert!(scratch_is_empty(&dir));
}

#[cfg(unix)]
#[test]
fn process_second_failure_keeps_allow_list_identical() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let gh = fake_gh(&dir);
    let log = dir.path().join("gh.log");

    process(&dir, &gh, TWO, "acme/widget@v1.0.0")
        .env("FAKE_GH_LOG", &log)
        .assert()
        .failure();

    assert_eq!(allow_list(&dir), ALLOW_LIST);
    assert!(!receipt_path(&dir).exists());
    let calls = std::fs::read_to_string(&log).unwrap();
    assert_eq!(calls.lines().count(), 2);
}

#[cfg(unix)]
#[test]
fn process_merges_batch_in_order() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let gh = fake_gh(&dir);

    process(&dir, &gh, TWO, "acme/widget@v1.0.0 acme/gadget@v2.0.0")
        .assert()
        .success();

    let content = allow_list(&dir);
    let widget = content.find("acme/widget/v1.0.0").unwrap();
    let gadget = content.find("acme/gadget/v2.0.0").unwrap();
    assert!(widget < gadget);
}

#[cfg(unix)]
#[test]
fn process_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let gh = fake_gh(&dir);

    process(&dir, &gh, WIDGET, "acme/widget@v1.0.0")
        .assert()
        .success();
    let first = allow_list(&dir);

    process(&dir, &gh, WIDGET, "acme/widget@v1.0.0")
        .assert()
        .success()
        .stdout(predicate::str::contains("already in the allow-list"));
    assert_eq!(allow_list(&dir), first);
    assert_eq!(first.matches("acme/widget/v1.0.0").count(), 1);
}

#[test]
fn process_empty_body_is_noop() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    intake(&dir)
        .args(["process", "--body", ""])
        .args(["--oracle-program", "/nonexistent/gh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No actions requested"));

    assert_eq!(allow_list(&dir), ALLOW_LIST);
    assert!(!receipt_path(&dir).exists());
}

#[test]
fn process_without_body_is_noop() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    intake(&dir).arg("process").assert().success();
    assert_eq!(allow_list(&dir), ALLOW_LIST);
}

#[test]
fn process_missing_field_fails_with_code() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let body = "[widget]\nname = acme/widget\nrequested_version = v1.0.0\n";

    let output = intake(&dir)
        .args(["--json", "process", "--body", body])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["outcome"]["status"], "failed");
    assert_eq!(report["outcome"]["stage"], "parse");
    assert_eq!(report["outcome"]["code"], "missing_field");
    assert_eq!(allow_list(&dir), ALLOW_LIST);
}

#[cfg(unix)]
#[test]
fn process_reads_issue_from_environment() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let gh = fake_gh(&dir);
    let log = dir.path().join("gh.log");

    let output = intake(&dir)
        .env("GH_ISSUE_BODY", WIDGET)
        .env("GH_ISSUE_NUMBER", "123")
        .env("GH_ISSUE_TITLE", "Allow acme/widget")
        .env("GH_ISSUE_AUTHOR", "octocat")
        .env("GITHUB_TOKEN", "ghp_from_env")
        .env("FAKE_GH_KNOWN", "acme/widget@v1.0.0")
        .env("FAKE_GH_LOG", &log)
        .args(["--json", "process", "--workspace-root", "scratch"])
        .arg("--oracle-program")
        .arg(&gh)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["issue"], "123");
    assert_eq!(report["outcome"]["status"], "completed");
    assert_eq!(report["outcome"]["added"][0], "acme/widget/v1.0.0");

    let calls = std::fs::read_to_string(&log).unwrap();
    assert!(calls.contains("token=ghp_from_env"));
    // The token never reaches stdout or the logs on stderr.
    assert!(!String::from_utf8_lossy(&output.stdout).contains("ghp_from_env"));
    assert!(!String::from_utf8_lossy(&output.stderr).contains("ghp_from_env"));
}

#[cfg(unix)]
#[test]
fn process_body_file() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let gh = fake_gh(&dir);
    std::fs::write(dir.path().join("body.txt"), WIDGET).unwrap();

    intake(&dir)
        .env("FAKE_GH_KNOWN", "acme/widget@v1.0.0")
        .args(["process", "--body-file", "body.txt", "--workspace-root", "scratch"])
        .arg("--oracle-program")
        .arg(&gh)
        .assert()
        .success();
    assert!(allow_list(&dir).contains("acme/widget/v1.0.0"));
}

#[cfg(unix)]
#[test]
fn process_validate_only_leaves_allow_list() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let gh = fake_gh(&dir);

    process(&dir, &gh, WIDGET, "acme/widget@v1.0.0")
        .arg("--validate-only")
        .assert()
        .success()
        .stdout(predicate::str::contains("Validate-only run"));
    assert_eq!(allow_list(&dir), ALLOW_LIST);
    assert!(receipt_path(&dir).exists());
}

#[cfg(unix)]
#[test]
fn process_single_request_mode_rejects_batch() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let gh = fake_gh(&dir);

    process(&dir, &gh, TWO, "acme/widget@v1.0.0 acme/gadget@v2.0.0")
        .args(["--max-requests", "1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("too_many_requests"));
    assert_eq!(allow_list(&dir), ALLOW_LIST);
}

#[cfg(unix)]
#[test]
fn process_honours_config_file() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let gh = fake_gh(&dir);
    std::fs::create_dir_all(dir.path().join(".github")).unwrap();
    std::fs::write(
        dir.path().join(".github/action-intake.yaml"),
        "receipt: null\nmax_requests_per_run: 1\n",
    )
    .unwrap();

    process(&dir, &gh, WIDGET, "acme/widget@v1.0.0")
        .assert()
        .success();
    assert!(!receipt_path(&dir).exists());

    process(&dir, &gh, TWO, "acme/widget@v1.0.0 acme/gadget@v2.0.0")
        .assert()
        .failure();
}

#[test]
fn process_refuses_receipt_over_allow_list() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::create_dir_all(dir.path().join(".github")).unwrap();
    std::fs::write(
        dir.path().join(".github/action-intake.yaml"),
        "receipt: ./github-actions-allow-list.yml\n",
    )
    .unwrap();

    intake(&dir)
        .args(["process", "--body", WIDGET])
        .args(["--oracle-program", "/nonexistent/gh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config has errors"));
    assert_eq!(allow_list(&dir), ALLOW_LIST);

    intake(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] receipt and allow_list"));
}

#[test]
fn process_missing_allow_list_fails() {
    let dir = TempDir::new().unwrap();

    intake(&dir)
        .args(["process", "--body", WIDGET])
        .args(["--oracle-program", "/nonexistent/gh"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("store_load_failure"));
    assert!(!allow_list_path(&dir).exists());
}

#[test]
fn process_unavailable_oracle_is_validation_failure() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    intake(&dir)
        .args(["process", "--body", WIDGET, "--workspace-root", "scratch"])
        .args(["--oracle-program", "/nonexistent/gh"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("validation_failure"));
    assert_eq!(allow_list(&dir), ALLOW_LIST);
    assert!(scratch_is_empty(&dir));
}

// ---------------------------------------------------------------------------
// action-intake parse
// ---------------------------------------------------------------------------

#[test]
fn parse_prints_table() {
    let dir = TempDir::new().unwrap();
    intake(&dir)
        .args(["parse", "--body", TWO])
        .assert()
        .success()
        .stdout(predicate::str::contains("SECTION"))
        .stdout(predicate::str::contains("acme/gadget/v2.0.0"));
}

#[test]
fn parse_json_preserves_order() {
    let dir = TempDir::new().unwrap();
    let output = intake(&dir)
        .args(["parse", "--json", "--body", TWO])
        .output()
        .unwrap();
    assert!(output.status.success());
    let requests: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(requests[0]["section"], "widget");
    assert_eq!(requests[1]["section"], "gadget");
    assert_eq!(requests[1]["version"], "v2.0.0");
}

#[test]
fn parse_without_sections() {
    let dir = TempDir::new().unwrap();
    intake(&dir)
        .args(["parse", "--body", "just some prose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No actions requested"));
}

#[test]
fn parse_reports_missing_field() {
    let dir = TempDir::new().unwrap();
    intake(&dir)
        .args(["parse", "--body", "[widget]\nname = acme/widget\n"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required field 'description'"));
}

// ---------------------------------------------------------------------------
// action-intake list
// ---------------------------------------------------------------------------

#[test]
fn list_shows_entries() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    intake(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("actions/checkout/v4"));
}

#[test]
fn list_contains_checks_membership() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    intake(&dir)
        .args(["list", "--contains", "actions/checkout/v4"])
        .assert()
        .success();
    intake(&dir)
        .args(["list", "--contains", "actions/checkout/v3"])
        .assert()
        .failure();
}

#[test]
fn list_without_allow_list_fails() {
    let dir = TempDir::new().unwrap();
    intake(&dir)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("allow-list not found"));
}

// ---------------------------------------------------------------------------
// action-intake config
// ---------------------------------------------------------------------------

#[test]
fn config_show_defaults() {
    let dir = TempDir::new().unwrap();
    intake(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("allow_list: github-actions-allow-list.yml"))
        .stdout(predicate::str::contains("timeout_seconds: 30"));
}

#[test]
fn config_validate_clean() {
    let dir = TempDir::new().unwrap();
    intake(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No warnings"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("intake.yaml"), "max_requests_per_run: 0\n").unwrap();
    intake(&dir)
        .args(["--config", "intake.yaml", "config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"));
}

#[test]
fn config_rejects_unknown_keys() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("intake.yaml"), "persit: false\n").unwrap();
    intake(&dir)
        .args(["--config", "intake.yaml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}
