//! CLI argument parsing.
//!
//! Each subcommand maps to one workflow operation; dispatch happens on the
//! closed `Command` enum in `main`.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sci",
    version,
    about = "Record and report provenance of file-producing shell commands",
    after_help = "Examples:\n  sci run 'echo ACGT > seq.txt'\n  sci run rev seq.txt '>' rev.txt\n  sci to-html rev.txt.au\n  sci graph rev.txt.au | dot -Tpng > rev.png\n  sci records rev.txt.au --json\n  sci version",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    ToHtml(ToHtmlArgs),
    Graph(GraphArgs),
    Records(RecordsArgs),
    /// Print the tool name and version
    Version,
}

/// Run a command through the shell and write a sidecar per new file.
#[derive(Args, Debug)]
#[command(about = "Run a command and audit the files it creates")]
pub struct RunArgs {
    /// Run even if an argument is already an output of this exact command
    #[arg(long)]
    pub force: bool,

    /// Working directory to run in and snapshot (defaults to the current one)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Command words, joined with spaces into one shell command line
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl RunArgs {
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// Render the upstream history of an output as an HTML report.
#[derive(Args, Debug)]
#[command(about = "Write an HTML audit report (with provenance graph) for a file")]
pub struct ToHtmlArgs {
    /// Sidecar (`<file>.au`) or the output file it describes
    #[arg(value_name = "AUDIT_FILE")]
    pub audit_file: PathBuf,

    /// Open the report with the desktop's default opener
    #[arg(long)]
    pub open: bool,
}

/// Print the provenance graph of an output in DOT format.
#[derive(Args, Debug)]
#[command(about = "Print the upstream provenance graph as DOT")]
pub struct GraphArgs {
    /// Sidecar (`<file>.au`) or the output file it describes
    #[arg(value_name = "AUDIT_FILE")]
    pub audit_file: PathBuf,
}

/// List the records reachable from an output.
#[derive(Args, Debug)]
#[command(about = "List the audit records upstream of a file")]
pub struct RecordsArgs {
    /// Sidecar (`<file>.au`) or the output file it describes
    #[arg(value_name = "AUDIT_FILE")]
    pub audit_file: PathBuf,

    /// Include leaf placeholders for files no recorded command produced
    #[arg(long)]
    pub all: bool,

    /// Emit a JSON object keyed by sidecar path
    #[arg(long)]
    pub json: bool,
}
