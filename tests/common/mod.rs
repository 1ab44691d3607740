//! Shared testing utilities for broker-stack CLI tests.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const FINNHUB_KEY: &str = "finnhub-test-key-7c1d";
pub const CLIENT_SECRET: &str = "cognito-test-secret-93ab";

/// Deployment parameters every stack command needs.
pub const SECRETS: &[(&str, &str)] = &[
    ("FINNHUB_API_KEY", FINNHUB_KEY),
    ("COGNITO_CLIENT_ID", "4j2k5l6m7n8o9p0q1r2s3t4u5v"),
    ("COGNITO_CLIENT_SECRET", CLIENT_SECRET),
    ("DYNAMODB_TABLE_NAME", "broker-data"),
    ("AWS_ACCOUNT_ID", "123456789012"),
];

/// Testing harness providing an isolated project directory for CLI exercises.
#[allow(dead_code)]
pub struct TestContext {
    root: TempDir,
    work_dir: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    /// Create a new isolated environment.
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory for tests");
        let work_dir = root.path().join("work");
        fs::create_dir_all(&work_dir).expect("Failed to create test work directory");
        Self { root, work_dir }
    }

    /// Path to the project directory used for CLI invocations.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Command with every deployment parameter exported.
    pub fn cli(&self) -> Command {
        let mut cmd = self.bare_cli();
        for (key, value) in SECRETS {
            cmd.env(key, value);
        }
        cmd
    }

    /// Command with no deployment parameters in its environment.
    pub fn bare_cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("broker-stack").expect("Failed to locate broker-stack binary");
        cmd.current_dir(&self.work_dir).env_remove("RUST_LOG").env_remove(
            "BROKER_STACK_ENGINE_TOKEN",
        );
        for (key, _) in SECRETS {
            cmd.env_remove(key);
        }
        cmd
    }

    pub fn config_path(&self) -> PathBuf {
        self.work_dir.join("broker-stack.toml")
    }

    pub fn state_path(&self) -> PathBuf {
        self.work_dir.join(".broker-stack").join("state.json")
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.config_path(), content).expect("Failed to write config");
    }

    pub fn read_state(&self) -> String {
        fs::read_to_string(self.state_path()).expect("Failed to read state file")
    }

    /// Apply the stack and assert success.
    pub fn apply(&self) {
        self.cli().arg("apply").assert().success();
    }
}
