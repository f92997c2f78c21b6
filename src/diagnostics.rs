//! Purpose: Render `utftool` errors and check findings on stderr.
//! Exports: `ColorMode`, `emit_error`, `emit_findings`, `error_json`, `error_text`, `with_default_hint`.
//! Role: Presentation only; the library's `Error` context is rendered, never reinterpreted.
//! Invariants: A terminal stderr gets labelled text; anything else gets one JSON object per line.
//! Invariants: ANSI escapes appear only when the color mode allows them.
use std::error::Error as StdError;
use std::io::{self, IsTerminal};

use clap::ValueEnum;
use serde_json::{Map, Value, json};
use utftable::api::{Error, ErrorKind, ValidationReport, ValidationStatus};

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn enabled(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum Tone {
    Alert,
    Note,
}

fn paint(label: &str, tone: Tone, color: bool) -> String {
    if !color {
        return label.to_string();
    }
    let code = match tone {
        Tone::Alert => "31",
        Tone::Note => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

/// Fills in a remediation hint for error kinds the user can act on.
pub fn with_default_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    let hint = match err.kind() {
        ErrorKind::Io => "Check that the path exists and is readable.",
        ErrorKind::Corrupt | ErrorKind::Truncated => {
            "Container appears damaged. Run `utftool check` for a full report."
        }
        ErrorKind::BadSignature => "Input is not an @UTF table; unpack archives first.",
        ErrorKind::Internal => {
            "Unexpected internal failure. Retry with RUST_BACKTRACE=1 and share the input."
        }
        _ => return err,
    };
    err.with_hint(hint)
}

fn summary(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    let fallback = match err.kind() {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::BadSignature => "not an @UTF container",
        ErrorKind::Truncated => "container is truncated",
        ErrorKind::UnsupportedColumnFlags => "unsupported column flags",
        ErrorKind::UnsupportedValueType => "unsupported value type",
        ErrorKind::Corrupt => "corrupt data",
        ErrorKind::TypeMismatch => "type mismatch",
        ErrorKind::ColumnNotFound => "column not found",
        ErrorKind::NoValue => "column stores no value",
        ErrorKind::RowOutOfRange => "row out of range",
        ErrorKind::Alloc => "allocation failed",
        ErrorKind::Io => "i/o error",
    };
    fallback.to_string()
}

/// Context fields in display order; absent fields are skipped.
fn context(err: &Error) -> Vec<(&'static str, Value)> {
    let mut fields = Vec::new();
    if let Some(hint) = err.hint() {
        fields.push(("hint", json!(hint)));
    }
    if let Some(path) = err.path() {
        fields.push(("path", json!(path.display().to_string())));
    }
    if let Some(column) = err.column() {
        fields.push(("column", json!(column)));
    }
    if let Some(row) = err.row() {
        fields.push(("row", json!(row)));
    }
    if let Some(offset) = err.offset() {
        fields.push(("offset", json!(offset)));
    }
    let causes: Vec<String> = std::iter::successors(err.source(), |source| (*source).source())
        .map(|source| source.to_string())
        .collect();
    if !causes.is_empty() {
        fields.push(("causes", json!(causes)));
    }
    fields
}

pub fn error_json(err: &Error) -> Value {
    let mut body = Map::new();
    body.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    body.insert("message".to_string(), json!(summary(err)));
    for (key, value) in context(err) {
        body.insert(key.to_string(), value);
    }
    json!({ "error": body })
}

pub fn error_text(err: &Error, color: bool) -> String {
    let mut lines = vec![format!("{} {}", paint("error:", Tone::Alert, color), summary(err))];
    for (key, value) in context(err) {
        let (label, text) = match (key, &value) {
            ("causes", Value::Array(items)) => match items.first().and_then(Value::as_str) {
                Some(first) => ("caused by", first.to_string()),
                None => continue,
            },
            (_, Value::String(text)) => (key, text.clone()),
            _ => (key, value.to_string()),
        };
        lines.push(format!("{} {text}", paint(&format!("{label}:"), Tone::Note, color)));
    }
    lines.join("\n")
}

pub fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.enabled(true)));
    } else {
        eprintln!("{}", error_json(err));
    }
}

/// Echoes drift and corruption findings on an interactive stderr.
pub fn emit_findings(report: &ValidationReport, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if !is_tty || report.status == ValidationStatus::Ok {
        return;
    }
    let color = color_mode.enabled(is_tty);
    let label = match report.status {
        ValidationStatus::Corrupt => paint("corrupt:", Tone::Alert, color),
        _ => paint("drift:", Tone::Note, color),
    };
    let path = report
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    for issue in &report.issues {
        eprintln!("{label} {path}: {}", issue.message);
    }
}
