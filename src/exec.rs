//! Shell execution of the user's command.
//!
//! The command runs to completion through `<shell> -c` in the working
//! directory with stdout and stderr captured. There is no timeout.
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local};
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Execution {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub duration: Duration,
}

impl Execution {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

pub fn run_shell(shell: &str, command_line: &str, cwd: &Path) -> Result<Execution> {
    let start_time = Local::now().fixed_offset();
    let start = Instant::now();
    let output = Command::new(shell)
        .arg("-c")
        .arg(command_line)
        .current_dir(cwd)
        .output()
        .with_context(|| format!("spawn {shell} -c {command_line:?}"))?;
    let duration = start.elapsed();
    let end_time = Local::now().fixed_offset();

    tracing::info!(
        elapsed_ms = duration.as_millis() as u64,
        status = %exit_status_string(&output.status),
        stdout_bytes = output.stdout.len(),
        stderr_bytes = output.stderr.len(),
        "command finished"
    );

    Ok(Execution {
        status: output.status,
        stdout: output.stdout,
        stderr: output.stderr,
        start_time,
        end_time,
        duration,
    })
}

pub fn exit_status_string(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        format!("{code}")
    } else {
        "terminated by signal".to_string()
    }
}
