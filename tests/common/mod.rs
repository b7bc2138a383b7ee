//! Shared test infrastructure for integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// A scratch working directory that `sci` runs commands in.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Run `sci` with `args` inside the workspace.
    pub fn sci(&self, args: &[&str]) -> anyhow::Result<Output> {
        let output = Command::new(env!("CARGO_BIN_EXE_sci"))
            .args(args)
            .current_dir(self.dir.path())
            .env("SCI_SHELL", "bash")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .output()?;
        Ok(output)
    }

    /// Run `sci` and fail with its stderr unless it succeeds.
    pub fn sci_ok(&self, args: &[&str]) -> anyhow::Result<String> {
        let output = self.sci(args)?;
        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "sci {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Audit each command in order with `sci run`.
    pub fn run_all(&self, commands: &[&str]) -> anyhow::Result<()> {
        for command in commands {
            self.sci_ok(&["run", command])?;
        }
        Ok(())
    }

    pub fn read_json(&self, rel: &str) -> anyhow::Result<serde_json::Value> {
        let text = std::fs::read_to_string(self.join(rel))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Check if bash is available; skip test if not.
pub fn skip_if_bash_missing() -> bool {
    let missing = Command::new("bash")
        .arg("-c")
        .arg("true")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_err();
    if missing {
        eprintln!("Skipping: bash not available");
    }
    missing
}

/// Check if graphviz `dot` is on PATH; skip test if not.
pub fn skip_if_dot_missing() -> bool {
    let missing = which::which("dot").is_err();
    if missing {
        eprintln!("Skipping: graphviz dot not available");
    }
    missing
}
