//! Input front-end: feeds command lines into an [`AlarmSystem`]

use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal};
use std::path::Path;

use colored::Colorize;
use eyre::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::error::AlarmError;
use crate::runtime::AlarmSystem;

const PROMPT: &str = "Alarm> ";

/// Read commands from `input`, a terminal, or piped stdin until end of input
pub fn run(system: &AlarmSystem, input: Option<&Path>) -> Result<usize> {
    if let Some(path) = input {
        debug!(path = %path.display(), "repl::run: reading from file");
        let file = File::open(path).context(format!("Failed to open input {}", path.display()))?;
        return run_lines(system, BufReader::new(file));
    }

    if io::stdin().is_terminal() {
        debug!("repl::run: interactive terminal");
        run_interactive(system)
    } else {
        debug!("repl::run: reading piped stdin");
        run_lines(system, io::stdin().lock())
    }
}

/// Line-edited prompt loop; Ctrl+D ends input, Ctrl+C clears the line
pub fn run_interactive(system: &AlarmSystem) -> Result<usize> {
    let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;
    let mut accepted = 0;

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                accepted += handle(system, &line)?;
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                return Err(eyre::eyre!("Readline error: {}", err));
            }
        }
    }

    Ok(accepted)
}

/// Plain line loop for pipes and files
///
/// Returns the number of accepted requests.
pub fn run_lines<R: BufRead>(system: &AlarmSystem, reader: R) -> Result<usize> {
    let mut accepted = 0;
    for line in reader.lines() {
        let line = line.context("Failed to read input line")?;
        accepted += handle(system, &line)?;
    }
    Ok(accepted)
}

/// Submit one line; user errors are printed and do not stop input
fn handle(system: &AlarmSystem, line: &str) -> Result<usize> {
    match system.handle_line(line) {
        Ok(Some(_)) => Ok(1),
        Ok(None) => Ok(0),
        Err(e) if e.is_user_error() => {
            warn!(%line, error = %e, "repl::handle: request discarded");
            eprintln!("{}", e.to_string().red());
            Ok(0)
        }
        Err(AlarmError::ShuttingDown) => Err(eyre::eyre!("Alarm system is shutting down")),
        Err(e) => Err(e.into()),
    }
}
