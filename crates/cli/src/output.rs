// Rendering of command results and diagnostics.
//
// Results go to stdout, diagnostics to stderr. A terminal gets text, a pipe
// gets one JSON object per line; `--json` always gets JSON.

use folio_engine::{FolioError, RevisionStoreError};
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use crate::exit_code::ExitCode;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

const CONFIG_HINT: &str = "Check .folio/config.toml under the store root and ~/.folio/config.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout: `human_fn` renders it for `Human`, serde for `Json`.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => writeln!(writer, "{}", human_fn(value)),
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    print_diagnostic(format, "error", ANSI_RED, code, message);
}

pub fn print_warning(format: OutputFormat, code: &str, message: &str) {
    print_diagnostic(format, "warning", ANSI_YELLOW, code, message);
}

fn print_diagnostic(format: OutputFormat, label: &str, color: &str, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    let _ = match format {
        OutputFormat::Human => {
            let line = render_human_stderr_line(label, message, io::stderr().is_terminal(), color);
            writeln!(err, "{line}")
        }
        OutputFormat::Json => writeln!(err, "{}", diagnostic_json(label, code, message)),
    };
}

fn diagnostic_json(label: &str, code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({ label: { "code": code, "message": message } })
}

/// Print a command failure with its exit-code label and a next-step hint.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    let message = format!("{error:#}");
    let exit = ExitCode::from_error(error);

    let hint = error.chain().find_map(|cause| {
        let store = match cause.downcast_ref::<FolioError>() {
            Some(FolioError::Store(store)) => store,
            Some(FolioError::UnknownDocument(path)) => {
                return Some(format!("Run: folio history {path} to check it was ever written"));
            }
            Some(FolioError::Configuration(_)) => return Some(CONFIG_HINT.to_string()),
            Some(_) => return None,
            None => cause.downcast_ref::<RevisionStoreError>()?,
        };
        match store {
            RevisionStoreError::UnknownRevision { path, .. }
            | RevisionStoreError::AmbiguousRevision { path, .. } => {
                Some(format!("Run: folio history {path} to list revisions"))
            }
            RevisionStoreError::PathOutsideStore { .. } => {
                Some("Document paths must stay under the store root (see --root)".to_string())
            }
            _ => None,
        }
    });
    let hint = hint.or_else(|| (exit == ExitCode::Config).then(|| CONFIG_HINT.to_string()));

    match hint {
        Some(hint) => (exit.label(), format!("{message}. {hint}")),
        None => (exit.label(), message),
    }
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool, color: &str) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}
