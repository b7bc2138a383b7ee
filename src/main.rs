use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod audit;
mod classify;
mod cli;
mod exec;
mod graph;
mod render;
mod report;
mod resolve;
mod settings;
mod snapshot;
mod staging;
mod util;
mod workflow;

use cli::{Command, GraphArgs, RecordsArgs, RootArgs, RunArgs, ToHtmlArgs};
use render::GraphvizDot;
use settings::Settings;
use workflow::RunOutcome;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);
    let settings = Settings::from_env();

    match args.command {
        Command::Run(args) => cmd_run(&settings, args),
        Command::ToHtml(args) => cmd_to_html(&settings, args),
        Command::Graph(args) => cmd_graph(&settings, args),
        Command::Records(args) => cmd_records(args),
        Command::Version => {
            println!("SciCommander {}", settings.style.version);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn cmd_run(settings: &Settings, args: RunArgs) -> Result<()> {
    let root = match &args.dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("resolve current directory")?,
    };
    let command_line = args.command_line();
    println!(" -> {command_line}");

    match workflow::run_and_audit(settings, &root, &command_line, args.force)? {
        RunOutcome::Skipped { output } => {
            println!(
                "Skipping: {command_line} (output exists: {output} together with audit file: {output}{})",
                audit::SIDECAR_SUFFIX
            );
        }
        RunOutcome::Audited {
            execution,
            inputs,
            outputs,
            sidecars,
        } => {
            print_captured("OUTPUT", &execution.stdout);
            print_captured("ERRORS", &execution.stderr);
            if !inputs.is_empty() {
                println!("Input paths: {}", inputs.join(", "));
            }
            if !outputs.is_empty() {
                println!("New paths: {}", outputs.join(", "));
            }
            for sidecar in &sidecars {
                let shown = sidecar.strip_prefix(&root).unwrap_or(sidecar);
                println!("Wrote audit file {}", shown.display());
            }
        }
    }
    Ok(())
}

fn cmd_to_html(settings: &Settings, args: ToHtmlArgs) -> Result<()> {
    let sidecar = workflow::sidecar_argument(&args.audit_file);
    let renderer = GraphvizDot::locate(&settings.dot_command)?;
    let artifacts = workflow::write_report(settings, &sidecar, &renderer)?;

    println!("Wrote HTML file to {}", artifacts.html_path.display());
    let absolute = absolute_path(&artifacts.html_path)?;
    println!("file://{}", absolute.display());

    if args.open {
        if let Err(err) = workflow::open_in_browser(&artifacts.html_path) {
            tracing::warn!(error = %format!("{err:#}"), "could not open report");
        }
    } else {
        println!("(Open the path above in a browser, or rerun with --open)");
    }
    Ok(())
}

fn cmd_graph(settings: &Settings, args: GraphArgs) -> Result<()> {
    let sidecar = workflow::sidecar_argument(&args.audit_file);
    print!("{}", workflow::graph_dot(settings, &sidecar)?);
    Ok(())
}

fn cmd_records(args: RecordsArgs) -> Result<()> {
    let sidecar = workflow::sidecar_argument(&args.audit_file);
    let records = workflow::load_history(&sidecar, args.all)?;

    if args.json {
        let keyed: BTreeMap<String, &audit::AuditRecord> = records
            .iter()
            .map(|(path, record)| (path.display().to_string(), record))
            .collect();
        let text = serde_json::to_string_pretty(&keyed).context("serialize records")?;
        println!("{text}");
        return Ok(());
    }

    for (path, record) in &records {
        println!("{}\t{}", path.display(), record.command_line());
    }
    Ok(())
}

fn print_captured(label: &str, bytes: &[u8]) {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_end();
    if !text.is_empty() {
        println!("{label}: {text}");
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().context("resolve current directory")?;
    Ok(cwd.join(path))
}
