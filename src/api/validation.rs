//! Purpose: Provide a stable, serializable validation report model for containers.
//! Exports: `ValidationReport`, `ValidationStatus`, `ValidationIssue`, `validate_container`.
//! Role: Shared contract for `utftool check` and API users auditing container bytes.
//! Invariants: Corrupt means the container does not decode; Drift means it decodes but
//! its declared layout differs from the layout this codec would write.
//! Invariants: Reports never embed table payloads.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::codec;
use crate::core::error::{Error, ErrorKind};
use crate::core::header::TableHeader;
use crate::core::plan;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Ok,
    Drift,
    Corrupt,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValidationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub table_name: Option<String>,
    pub status: ValidationStatus,
    pub issues: Vec<ValidationIssue>,
    pub issue_count: usize,
    pub remediation_hints: Vec<String>,
}

impl ValidationReport {
    pub fn ok() -> Self {
        Self {
            path: None,
            table_name: None,
            status: ValidationStatus::Ok,
            issues: Vec::new(),
            issue_count: 0,
            remediation_hints: Vec::new(),
        }
    }

    pub fn corrupt(err: &Error) -> Self {
        let mut remediation_hints = vec![
            "Container does not decode. Re-extract it from its source archive.".to_string(),
        ];
        if let Some(hint) = err.hint() {
            remediation_hints.push(hint.to_string());
        }
        Self {
            path: None,
            table_name: None,
            status: ValidationStatus::Corrupt,
            issues: vec![issue_from_error(err)],
            issue_count: 1,
            remediation_hints,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Replaces the issue list; a non-empty list on a decodable container is drift.
    pub fn set_issues(mut self, issues: Vec<ValidationIssue>) -> Self {
        self.issue_count = issues.len();
        self.issues = issues;
        if self.status != ValidationStatus::Corrupt {
            self.status = if self.issue_count == 0 {
                ValidationStatus::Ok
            } else {
                ValidationStatus::Drift
            };
        }
        if self.status == ValidationStatus::Drift {
            self.remediation_hints = vec![
                "Layout differs from the canonical encoding. Decode and re-encode to normalize it."
                    .to_string(),
            ];
        }
        self
    }

    pub fn is_corrupt(&self) -> bool {
        self.status == ValidationStatus::Corrupt
    }
}

/// Decodes `bytes` fully and compares the declared layout with the canonical one.
pub fn validate_container(bytes: &[u8]) -> ValidationReport {
    let header = match codec::read_header(bytes) {
        Ok(header) => header,
        Err(err) => return ValidationReport::corrupt(&err),
    };
    let table = match codec::decode_with_header(bytes, &header) {
        Ok(table) => table,
        Err(err) => return ValidationReport::corrupt(&err),
    };
    let report = ValidationReport::ok().with_table_name(table.name.as_str());
    let planned = match plan::plan_encode(&table) {
        Ok(plan) => plan.header,
        Err(err) => {
            return report.set_issues(vec![issue(
                "not_reencodable",
                format!("decoded table cannot be re-encoded: {err}"),
                None,
            )]);
        }
    };

    let mut issues = layout_drift(&header, &planned);
    if bytes.len() > header.container_len() {
        issues.push(issue(
            "trailing_bytes",
            format!(
                "{} bytes follow the declared container",
                bytes.len() - header.container_len()
            ),
            Some(header.container_len() as u64),
        ));
    }
    report.set_issues(issues)
}

fn layout_drift(declared: &TableHeader, planned: &TableHeader) -> Vec<ValidationIssue> {
    let fields = [
        ("table_size", declared.table_size as u64, planned.table_size as u64, 4),
        ("rows_offset", declared.rows_offset as u64, planned.rows_offset as u64, 10),
        ("strings_offset", declared.strings_offset as u64, planned.strings_offset as u64, 12),
        ("data_offset", declared.data_offset as u64, planned.data_offset as u64, 16),
        ("table_name", declared.table_name as u64, planned.table_name as u64, 20),
    ];
    fields
        .into_iter()
        .filter(|(_, declared, planned, _)| declared != planned)
        .map(|(field, declared, planned, offset)| {
            issue(
                "layout_drift",
                format!("{field} is {declared}, canonical encoding gives {planned}"),
                Some(offset),
            )
        })
        .collect()
}

fn issue(code: &str, message: String, offset: Option<u64>) -> ValidationIssue {
    ValidationIssue {
        code: code.to_string(),
        message,
        column: None,
        row: None,
        offset,
    }
}

fn issue_from_error(err: &Error) -> ValidationIssue {
    ValidationIssue {
        code: issue_code(err.kind()).to_string(),
        message: err.message().unwrap_or("decode failed").to_string(),
        column: err.column().map(str::to_string),
        row: err.row(),
        offset: err.offset(),
    }
}

fn issue_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::BadSignature => "bad_signature",
        ErrorKind::Truncated => "truncated",
        ErrorKind::UnsupportedColumnFlags => "unsupported_column_flags",
        ErrorKind::UnsupportedValueType => "unsupported_value_type",
        ErrorKind::Alloc => "alloc",
        _ => "corrupt",
    }
}
