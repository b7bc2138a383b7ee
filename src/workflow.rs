//! End-to-end operations behind the CLI.
//!
//! `run_and_audit` wraps one shell command with before/after snapshots and
//! writes a sidecar per new file. `write_report` and `graph_dot` read those
//! sidecars back through the resolver.
use crate::audit::{self, output_path_for, read_sidecar, sidecar_path, AuditRecord, Tags};
use crate::classify::{argument_tokens, classify};
use crate::exec::{exit_status_string, run_shell, Execution};
use crate::graph::build_graph;
use crate::render::GraphRenderer;
use crate::report::{render_html, report_rows};
use crate::resolve::{resolve_all_ancestors, resolve_executed_ancestors, ResolvedRecords};
use crate::settings::Settings;
use crate::snapshot::{diff_new_entries, take_snapshot};
use crate::staging::write_atomic_text;
use crate::util::truncate_bytes;
use anyhow::{anyhow, Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_FAILURE_OUTPUT_BYTES: usize = 4_000;

#[derive(Debug)]
pub enum RunOutcome {
    /// An argument is already an output of this exact command.
    Skipped { output: String },
    Audited {
        execution: Execution,
        inputs: Vec<String>,
        outputs: Vec<String>,
        sidecars: Vec<PathBuf>,
    },
}

/// Run `command_line` in `root` and record provenance for every new file.
pub fn run_and_audit(
    settings: &Settings,
    root: &Path,
    command_line: &str,
    force: bool,
) -> Result<RunOutcome> {
    let command_line = command_line.trim();
    if command_line.is_empty() {
        return Err(anyhow!("no command given"));
    }

    let arguments = argument_tokens(command_line);
    let classified = classify(root, &arguments)?;

    if !force {
        if let Some(output) = previous_output(root, &classified.inputs, command_line)? {
            return Ok(RunOutcome::Skipped { output });
        }
    }

    let before = take_snapshot(root).context("snapshot before command")?;
    let execution = run_shell(&settings.shell, command_line, root)?;
    if !execution.success() {
        return Err(anyhow!(
            "command failed with status {}: {}\nSTDERR: {}\nSTDOUT: {}",
            exit_status_string(&execution.status),
            command_line,
            truncate_bytes(&execution.stderr, MAX_FAILURE_OUTPUT_BYTES).trim_end(),
            truncate_bytes(&execution.stdout, MAX_FAILURE_OUTPUT_BYTES).trim_end(),
        ));
    }
    let after = take_snapshot(root).context("snapshot after command")?;
    let outputs = diff_new_entries(&before, &after);

    if outputs.is_empty() {
        tracing::warn!(command = command_line, "command created no new files; nothing audited");
    }

    let record = AuditRecord::new(
        command_line,
        classified.inputs.clone(),
        outputs.clone(),
        Tags::new(execution.start_time, execution.end_time, execution.duration),
    );
    let mut sidecars = Vec::with_capacity(outputs.len());
    for output in &outputs {
        sidecars.push(audit::write_sidecar(&root.join(output), &record)?);
    }
    tracing::info!(
        inputs = classified.inputs.len(),
        outputs = outputs.len(),
        "command audited"
    );

    Ok(RunOutcome::Audited {
        execution,
        inputs: classified.inputs,
        outputs,
        sidecars,
    })
}

/// First existing argument whose sidecar records this exact command line.
fn previous_output(root: &Path, inputs: &[String], command_line: &str) -> Result<Option<String>> {
    for input in inputs {
        let sidecar = sidecar_path(&root.join(input));
        if !sidecar.is_file() {
            continue;
        }
        let record = read_sidecar(&sidecar)?;
        if !record.is_leaf() && record.command_line() == command_line {
            return Ok(Some(input.clone()));
        }
    }
    Ok(None)
}

/// Accept either a sidecar or the output file it describes.
pub fn sidecar_argument(path: &Path) -> PathBuf {
    if audit::is_sidecar(path) {
        path.to_path_buf()
    } else {
        sidecar_path(path)
    }
}

/// Resolve upstream records, failing when the root sidecar itself is absent.
pub fn load_history(sidecar: &Path, include_leaves: bool) -> Result<ResolvedRecords> {
    if !sidecar.is_file() {
        return Err(anyhow!("no audit record found at {}", sidecar.display()));
    }
    if include_leaves {
        resolve_all_ancestors(sidecar)
    } else {
        resolve_executed_ancestors(sidecar)
    }
}

pub fn graph_dot(settings: &Settings, sidecar: &Path) -> Result<String> {
    let records = load_history(sidecar, false)?;
    Ok(build_graph(records.values()).to_dot(&settings.style))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifacts {
    pub dot_path: PathBuf,
    pub svg_path: PathBuf,
    pub html_path: PathBuf,
}

/// Write `<sidecar>.dot`, `<sidecar>.svg` and `<sidecar>.html`.
pub fn write_report(
    settings: &Settings,
    sidecar: &Path,
    renderer: &dyn GraphRenderer,
) -> Result<ReportArtifacts> {
    let records = load_history(sidecar, false)?;
    let artifacts = ReportArtifacts {
        dot_path: with_suffix(sidecar, ".dot"),
        svg_path: with_suffix(sidecar, ".svg"),
        html_path: with_suffix(sidecar, ".html"),
    };

    let dot = build_graph(records.values()).to_dot(&settings.style);
    write_atomic_text(&artifacts.dot_path, &dot)?;

    let svg = renderer
        .render_svg(&dot)
        .with_context(|| format!("render {}", artifacts.dot_path.display()))?;
    write_atomic_text(&artifacts.svg_path, &svg)?;

    let output = output_path_for(sidecar).unwrap_or_else(|| sidecar.to_path_buf());
    let title = sidecar
        .parent()
        .and_then(|base| output.strip_prefix(base).ok())
        .unwrap_or(&output)
        .display()
        .to_string();
    let html = render_html(&title, &report_rows(&records), &svg, &settings.style);
    write_atomic_text(&artifacts.html_path, &html)?;

    tracing::info!(
        records = records.len(),
        html = %artifacts.html_path.display(),
        "report written"
    );
    Ok(artifacts)
}

/// Hand a file to the desktop's default opener.
pub fn open_in_browser(path: &Path) -> Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    let status = Command::new(opener)
        .arg(path)
        .status()
        .with_context(|| format!("spawn {opener}"))?;
    if !status.success() {
        return Err(anyhow!(
            "{opener} {} exited with status {}",
            path.display(),
            exit_status_string(&status)
        ));
    }
    Ok(())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
