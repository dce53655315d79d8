//! CLI integration tests for Botpack.
//!
//! These exercise the full `botpack` binary against a temporary workspace
//! and a path dependency standing in for a fetched package, covering the
//! manifest -> resolve -> store -> lock -> sync pipeline end to end.

use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the `botpack` binary command, isolated from the real user home so
/// tests never touch a developer's actual store or trust file.
fn botpack(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("botpack").unwrap();
    cmd.env("BOTPACK_ROOT", home);
    cmd
}

fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

/// Lay out a minimal skill package at `dir`, fit to be added as a `path`
/// dependency.
fn write_skill_package(dir: &std::path::Path, name: &str, version: &str) {
    fs::create_dir_all(dir.join("skills").join("fetch_web")).unwrap();
    fs::write(
        dir.join("agentpkg.toml"),
        format!(
            r#"agentpkg = 1
name = "{name}"
version = "{version}"

[capabilities]
exec = false
network = false
mcp = false
"#
        ),
    )
    .unwrap();
    fs::write(
        dir.join("skills").join("fetch_web").join("SKILL.md"),
        "---\nid: fetch_web\ndescription: fetch a URL\n---\nBody text.\n",
    )
    .unwrap();
}

/// Lay out a package declaring one MCP server requiring `exec`.
fn write_mcp_package(dir: &std::path::Path, name: &str, version: &str) {
    fs::create_dir_all(dir.join("mcp")).unwrap();
    fs::write(
        dir.join("agentpkg.toml"),
        format!(
            r#"agentpkg = 1
name = "{name}"
version = "{version}"

[capabilities]
exec = true
network = true
mcp = true
"#
        ),
    )
    .unwrap();
    fs::write(
        dir.join("mcp").join("servers.toml"),
        r#"[servers.postgres]
command = "npx"
args = ["-y", "@modelcontextprotocol/server-postgres"]
"#,
    )
    .unwrap();
}

// ============================================================================
// init
// ============================================================================

#[test]
fn test_init_creates_manifest() {
    let tmp = temp_dir();
    let home = temp_dir();

    botpack(home.path())
        .args(["init", "--name", "myws"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let manifest = tmp.path().join("botpack.toml");
    assert!(manifest.is_file());
    let content = fs::read_to_string(manifest).unwrap();
    assert!(content.contains("name = \"myws\""));
}

#[test]
fn test_init_twice_fails() {
    let tmp = temp_dir();
    let home = temp_dir();

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();

    botpack(home.path())
        .arg("init")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

// ============================================================================
// init/add/install/sync (S1)
// ============================================================================

#[test]
fn test_add_install_sync_materializes_skill() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_skill_package(&pkg_dir, "acme-quality-skills", "2.1.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();

    botpack(home.path())
        .args(["add", "acme-quality-skills", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();

    assert!(tmp.path().join("botpack.lock").is_file());

    botpack(home.path())
        .args(["install", "--frozen-lockfile"])
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path())
        .args(["sync", "claude"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let written = tmp
        .path()
        .join(".claude")
        .join("skills")
        .join("acme-quality-skills.fetch_web")
        .join("SKILL.md");
    assert!(written.is_file(), "expected {} to exist", written.display());

    let sync_state = tmp.path().join(".botpack").join("state").join("sync-claude.json");
    assert!(sync_state.is_file());
    let state_content = fs::read_to_string(&sync_state).unwrap();
    assert!(state_content.contains("acme-quality-skills.fetch_web"));
}

#[test]
fn test_sync_is_idempotent() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_skill_package(&pkg_dir, "acme-quality-skills", "1.0.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();
    botpack(home.path())
        .args(["add", "acme-quality-skills", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path()).args(["sync", "claude"]).current_dir(tmp.path()).assert().success();

    let skill_path = tmp
        .path()
        .join(".claude")
        .join("skills")
        .join("acme-quality-skills.fetch_web")
        .join("SKILL.md");
    let modified_before = fs::metadata(&skill_path).unwrap().modified().unwrap();

    botpack(home.path()).args(["sync", "claude"]).current_dir(tmp.path()).assert().success();
    let modified_after = fs::metadata(&skill_path).unwrap().modified().unwrap();
    assert_eq!(modified_before, modified_after);
}

// ============================================================================
// install --frozen-lockfile
// ============================================================================

#[test]
fn test_frozen_lockfile_without_lock_fails() {
    let tmp = temp_dir();
    let home = temp_dir();

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();

    botpack(home.path())
        .args(["install", "--frozen-lockfile"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .code(3);
}

#[test]
fn test_frozen_lockfile_succeeds_when_up_to_date() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_skill_package(&pkg_dir, "acme-quality-skills", "1.0.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();
    botpack(home.path())
        .args(["add", "acme-quality-skills", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path())
        .args(["install", "--frozen-lockfile"])
        .current_dir(tmp.path())
        .assert()
        .success();
}

// ============================================================================
// verify / prune (store integrity)
// ============================================================================

#[test]
fn test_verify_detects_store_corruption() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_skill_package(&pkg_dir, "acme-quality-skills", "1.0.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();
    botpack(home.path())
        .args(["add", "acme-quality-skills", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path()).arg("verify").current_dir(tmp.path()).assert().success();

    // Tamper with the store payload directly.
    let store_v1 = home.path().join("store").join("v1");
    let entry = fs::read_dir(&store_v1)
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.path().is_dir())
        .expect("one store entry");
    let skill_file = entry.path().join("skills").join("fetch_web").join("SKILL.md");
    fs::write(&skill_file, "tampered content").unwrap();

    botpack(home.path())
        .arg("verify")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("acme-quality-skills"));
}

#[test]
fn test_prune_removes_unreferenced_entries() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_skill_package(&pkg_dir, "acme-quality-skills", "1.0.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();
    botpack(home.path())
        .args(["add", "acme-quality-skills", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path())
        .args(["remove", "acme-quality-skills"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let store_v1 = home.path().join("store").join("v1");
    assert!(fs::read_dir(&store_v1).unwrap().next().is_some(), "store entry should survive remove");

    botpack(home.path())
        .arg("prune")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("removed"));

    let remaining: Vec<_> = fs::read_dir(&store_v1)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .collect();
    assert!(remaining.is_empty());
}

#[test]
fn test_prune_dry_run_removes_nothing() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_skill_package(&pkg_dir, "acme-quality-skills", "1.0.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();
    botpack(home.path())
        .args(["add", "acme-quality-skills", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path())
        .args(["prune", "--dry-run"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let store_v1 = home.path().join("store").join("v1");
    assert!(fs::read_dir(&store_v1).unwrap().next().is_some());
}

// ============================================================================
// prefetch
// ============================================================================

#[test]
fn test_prefetch_populates_store_without_syncing() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_skill_package(&pkg_dir, "acme-quality-skills", "1.0.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();

    let manifest_path = tmp.path().join("botpack.toml");
    let manifest = fs::read_to_string(&manifest_path).unwrap();
    let manifest = manifest.replacen(
        "[dependencies]\n",
        &format!(
            "[dependencies]\nacme-quality-skills = {{ path = \"{}\" }}\n",
            pkg_dir.display()
        ),
        1,
    );
    fs::write(&manifest_path, manifest).unwrap();

    botpack(home.path()).arg("prefetch").current_dir(tmp.path()).assert().success();

    let store_v1 = home.path().join("store").join("v1");
    assert!(fs::read_dir(&store_v1).unwrap().next().is_some());
    assert!(!tmp.path().join(".claude").exists());
}

// ============================================================================
// MCP trust gate (S4)
// ============================================================================

#[test]
fn test_mcp_server_blocked_then_allowed_after_trust() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_mcp_package(&pkg_dir, "acme-mcp-pack", "0.3.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();
    botpack(home.path())
        .args(["add", "acme-mcp-pack", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path())
        .args(["sync", "claude"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .code(6);

    assert!(!tmp.path().join(".claude").join("mcp.json").exists());

    botpack(home.path())
        .args(["trust", "acme-mcp-pack", "--allow", "exec"])
        .current_dir(tmp.path())
        .assert()
        .success();
    botpack(home.path())
        .args(["trust", "acme-mcp-pack", "--allow", "mcp"])
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path())
        .args(["sync", "claude"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let mcp_json = tmp.path().join(".claude").join("mcp.json");
    assert!(mcp_json.is_file());
    let content = fs::read_to_string(mcp_json).unwrap();
    assert!(content.contains("acme-mcp-pack/postgres"));
}

#[test]
fn test_audit_reports_withheld_servers() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_mcp_package(&pkg_dir, "acme-mcp-pack", "0.3.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();
    botpack(home.path())
        .args(["add", "acme-mcp-pack", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path())
        .arg("audit")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("acme-mcp-pack/postgres"));
}

// ============================================================================
// list / tree / info / why
// ============================================================================

#[test]
fn test_list_tree_info_why() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_skill_package(&pkg_dir, "acme-quality-skills", "2.1.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();
    botpack(home.path())
        .args(["add", "acme-quality-skills", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path())
        .arg("list")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("acme-quality-skills v2.1.0"));

    botpack(home.path())
        .arg("tree")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("acme-quality-skills"));

    botpack(home.path())
        .args(["info", "acme-quality-skills"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("version: 2.1.0"));

    botpack(home.path())
        .args(["why", "acme-quality-skills"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("acme-quality-skills"));
}

#[test]
fn test_why_unknown_package_fails() {
    let tmp = temp_dir();
    let home = temp_dir();

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();

    botpack(home.path())
        .args(["why", "does-not-exist"])
        .current_dir(tmp.path())
        .assert()
        .failure();
}

// ============================================================================
// remove
// ============================================================================

#[test]
fn test_remove_drops_dependency() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_skill_package(&pkg_dir, "acme-quality-skills", "1.0.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();
    botpack(home.path())
        .args(["add", "acme-quality-skills", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();
    botpack(home.path()).args(["sync", "claude"]).current_dir(tmp.path()).assert().success();

    botpack(home.path())
        .args(["remove", "acme-quality-skills"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let manifest = fs::read_to_string(tmp.path().join("botpack.toml")).unwrap();
    assert!(!manifest.contains("acme-quality-skills"));
}

// ============================================================================
// sync --clean / --dry-run
// ============================================================================

#[test]
fn test_sync_dry_run_writes_nothing() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_skill_package(&pkg_dir, "acme-quality-skills", "1.0.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();
    botpack(home.path())
        .args(["add", "acme-quality-skills", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path())
        .args(["sync", "claude", "--dry-run"])
        .current_dir(tmp.path())
        .assert()
        .success();

    assert!(!tmp.path().join(".claude").exists());
}

#[test]
fn test_sync_clean_removes_stale_output() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_skill_package(&pkg_dir, "acme-quality-skills", "1.0.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();
    botpack(home.path())
        .args(["add", "acme-quality-skills", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();
    botpack(home.path()).args(["sync", "claude"]).current_dir(tmp.path()).assert().success();

    botpack(home.path())
        .args(["remove", "acme-quality-skills"])
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path())
        .args(["sync", "claude", "--clean"])
        .current_dir(tmp.path())
        .assert()
        .success();

    assert!(!tmp
        .path()
        .join(".claude")
        .join("skills")
        .join("acme-quality-skills.fetch_web")
        .exists());
}

// ============================================================================
// catalog / doctor
// ============================================================================

#[test]
fn test_catalog_regenerate_writes_metadata_index() {
    let tmp = temp_dir();
    let home = temp_dir();
    let pkg_dir = tmp.path().join("pkg");
    write_skill_package(&pkg_dir, "acme-quality-skills", "1.0.0");

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();
    botpack(home.path())
        .args(["add", "acme-quality-skills", "--path"])
        .arg(&pkg_dir)
        .current_dir(tmp.path())
        .assert()
        .success();

    botpack(home.path())
        .args(["catalog", "--regenerate"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let catalog_path = tmp.path().join(".botpack").join("catalog.json");
    assert!(catalog_path.is_file());
    let content = fs::read_to_string(catalog_path).unwrap();
    assert!(content.contains("fetch_web"));
}

#[test]
fn test_doctor_runs_clean_on_healthy_workspace() {
    let tmp = temp_dir();
    let home = temp_dir();

    botpack(home.path()).arg("init").current_dir(tmp.path()).assert().success();

    botpack(home.path()).arg("doctor").current_dir(tmp.path()).assert().success();
}

// ============================================================================
// global flags / error reporting
// ============================================================================

#[test]
fn test_no_manifest_found_reports_suggestion() {
    let tmp = temp_dir();
    let home = temp_dir();

    botpack(home.path())
        .arg("list")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("botpack init"));
}

#[test]
fn test_json_error_output_is_structured() {
    let tmp = temp_dir();
    let home = temp_dir();

    botpack(home.path())
        .args(["--json", "list"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"ok\":false"));
}
