//! Argument classification into input and output paths.
//!
//! Classification happens before the command runs: an argument naming an
//! existing path is an input, anything else is a prospective output.
use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;

/// Shell redirection and pipe operators. Never paths.
pub const CONTROL_TOKENS: [&str; 7] = [">", ">>", ">>>", "<", "<<", "<<<", "|"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// Partition `tokens` by whether they exist relative to `root`.
///
/// Order is preserved in both lists and repeated tokens repeat. A stat error
/// other than "no such path" is returned rather than guessed at.
pub fn classify(root: &Path, tokens: &[String]) -> Result<Classified> {
    let mut classified = Classified::default();
    for token in tokens.iter().filter(|token| !is_control_token(token)) {
        if path_exists(&root.join(token))
            .with_context(|| format!("stat argument {token:?}"))?
        {
            classified.inputs.push(token.clone());
        } else {
            classified.outputs.push(token.clone());
        }
    }
    tracing::debug!(
        inputs = classified.inputs.len(),
        outputs = classified.outputs.len(),
        "arguments classified"
    );
    Ok(classified)
}

/// Tokens handed to the classifier: the command line's shell words minus
/// the program itself.
pub fn argument_tokens(command_line: &str) -> Vec<String> {
    let words = shell_words::split(command_line).unwrap_or_else(|err| {
        tracing::debug!(%err, "command line is not shell-parseable; splitting on whitespace");
        command_line.split_whitespace().map(str::to_string).collect()
    });
    words.into_iter().skip(1).collect()
}

pub fn is_control_token(token: &str) -> bool {
    CONTROL_TOKENS.contains(&token)
}

fn path_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(err) if means_missing(&err) => Ok(false),
        Err(err) => Err(err),
    }
}

fn means_missing(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::NotFound {
        return true;
    }
    // A path through a regular file, or a name too long to exist.
    matches!(err.raw_os_error(), Some(libc::ENOTDIR) | Some(libc::ENAMETOOLONG))
}
