use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn base_command(vault: &TempDir, state: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("brain").unwrap();
    cmd.env_remove("OLLAMA_TIMEOUT_MS")
        .env("BRAIN_SESSION_SECRET", "test-secret")
        .env("BRAIN_VAULT_PATH", vault.path())
        .env("BRAIN_STATE_DIR", state.path())
        .env("BRAIN_PROJECT", "default");
    cmd
}

#[test]
fn missing_session_secret_fails_with_helpful_message() {
    let vault = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("brain").unwrap();
    cmd.env_remove("BRAIN_SESSION_SECRET")
        .env("BRAIN_VAULT_PATH", vault.path())
        .env("BRAIN_STATE_DIR", state.path())
        .arg("analyze");

    cmd.assert().failure().stderr(contains("BRAIN_SESSION_SECRET"));
}

#[test]
fn session_create_succeeds_and_prints_in_progress_status() {
    let vault = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    base_command(&vault, &state)
        .args(["session", "create", "trying the new importer"])
        .assert()
        .success()
        .stdout(contains("IN_PROGRESS"));
}

#[test]
fn session_pause_on_unknown_id_fails() {
    let vault = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    base_command(&vault, &state).args(["session", "pause", "does-not-exist"]).assert().failure();
}

#[test]
fn analyze_conform_on_empty_vault_is_clean() {
    let vault = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    base_command(&vault, &state).arg("analyze").assert().success().stdout(contains("no issues found"));
}

#[test]
fn analyze_import_without_source_path_is_rejected() {
    let vault = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    base_command(&vault, &state)
        .args(["analyze", "--mode", "import"])
        .assert()
        .failure()
        .stderr(contains("--source-path"));
}
