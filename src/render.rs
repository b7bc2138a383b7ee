//! Graph layout via an external renderer.
//!
//! The provenance code only produces DOT text; turning it into an image is
//! delegated to whatever implements [`GraphRenderer`].
use crate::util::truncate_bytes;
use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

const MAX_STDERR_BYTES: usize = 2_000;

pub trait GraphRenderer {
    /// Render DOT text to an SVG document.
    fn render_svg(&self, dot: &str) -> Result<String>;
}

/// Renders through the Graphviz `dot` executable.
#[derive(Debug, Clone)]
pub struct GraphvizDot {
    program: PathBuf,
}

impl GraphvizDot {
    /// Locate `command` on `PATH` (or accept it as a path).
    pub fn locate(command: &str) -> Result<Self> {
        let program = which::which(command).with_context(|| {
            format!("locate graphviz executable {command:?} (install graphviz or set SCI_DOT)")
        })?;
        Ok(Self { program })
    }
}

impl GraphRenderer for GraphvizDot {
    fn render_svg(&self, dot: &str) -> Result<String> {
        let start = Instant::now();
        let mut child = Command::new(&self.program)
            .arg("-Tsvg")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn {}", self.program.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(dot.as_bytes())
                .with_context(|| format!("write graph to {}", self.program.display()))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("wait for {}", self.program.display()))?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            dot_bytes = dot.len(),
            svg_bytes = output.stdout.len(),
            "graph rendered"
        );

        if !output.status.success() {
            return Err(anyhow!(
                "{} failed with status {}: {}",
                self.program.display(),
                output.status,
                truncate_bytes(&output.stderr, MAX_STDERR_BYTES).trim()
            ));
        }
        String::from_utf8(output.stdout).context("decode graphviz output as UTF-8")
    }
}
