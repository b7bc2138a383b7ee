//! Process-wide configuration, resolved once from the environment.
//!
//! Values are immutable after startup and passed explicitly to the pieces
//! that need them.
use std::env;

/// Shell used to run audited commands (`<shell> -c <command>`).
pub const SHELL_ENV: &str = "SCI_SHELL";
/// Graphviz executable used to lay out provenance graphs.
pub const DOT_ENV: &str = "SCI_DOT";

const DEFAULT_SHELL: &str = "bash";
const DEFAULT_DOT: &str = "dot";

#[derive(Debug, Clone)]
pub struct Settings {
    pub shell: String,
    pub dot_command: String,
    pub style: ReportStyle,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            shell: env_or(SHELL_ENV, DEFAULT_SHELL),
            dot_command: env_or(DOT_ENV, DEFAULT_DOT),
            style: ReportStyle::default(),
        }
    }
}

/// Presentation constants for graph descriptions and HTML reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportStyle {
    pub node_defaults: String,
    pub command_fill: String,
    pub file_fill: String,
    pub time_cell_background: String,
    pub command_cell_background: String,
    pub stylesheet: String,
    pub version: String,
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self {
            node_defaults: "shape=box, style=filled, fillcolor=lightgrey, fontname=monospace, \
                            penwidth=0, fontsize=11, pad=0"
                .to_string(),
            command_fill: "#CCE2F1".to_string(),
            file_fill: "#FFEEC8".to_string(),
            time_cell_background: "#E6F5FF".to_string(),
            command_cell_background: "#CCE2F1".to_string(),
            stylesheet: DEFAULT_STYLESHEET.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

const DEFAULT_STYLESHEET: &str = "html {
    background: #efefef;
}
body {
    background: white;
    font-family: monospace, courier new;
    font-size: 9pt;
    max-width: 960px;
    margin: 0 auto;
    box-shadow: 2px 2px 10px #ccc;
    padding: 1em;
}
hr {
    border: 2px solid #efefef;
}
table {
    border: none;
}
table td {
    padding: .4em 1em;
    text-align: left;
}
";

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}
