//! Compliance export rendering.
//!
//! Turns an ordered set of session rows into a CSV or plain-text document with
//! a trailer carrying the query metadata and two fingerprints:
//!
//! - `content_fingerprint` covers the query parameters and the canonical row
//!   lines. Re-exporting the same rows with the same parameters always yields
//!   the same value.
//! - `document_fingerprint` additionally covers the export timestamp and the
//!   informational lock status, identifying one specific issued document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::fingerprint::{canonical_ts, sha256_hex};
use crate::period::PeriodRange;
use crate::types::{DbId, Timestamp};

/// Version tag mixed into export content fingerprints.
const EXPORT_FINGERPRINT_VERSION: &str = "attendance-export.v1";

/// Column header shared by the CSV body and the canonical row material.
pub const CSV_HEADER: &str = "session_id,person_id,check_in_ts,check_out_ts,\
duration_minutes,source,corrected,integrity_hash";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Output format of a compliance export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Text,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "text",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Text => "text/plain; charset=utf-8",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "text" | "txt" => Ok(ExportFormat::Text),
            other => Err(CoreError::Validation(format!(
                "Unknown export format: '{other}'. Valid formats: csv, text"
            ))),
        }
    }
}

/// One exported session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub session_id: DbId,
    pub person_id: DbId,
    pub check_in_ts: Timestamp,
    pub check_out_ts: Option<Timestamp>,
    pub source: String,
    pub corrected: bool,
    pub integrity_hash: String,
}

impl ExportRow {
    fn duration_minutes(&self) -> Option<i64> {
        self.check_out_ts
            .map(|out| (out - self.check_in_ts).num_minutes())
    }

    /// Canonical comma-separated line; also the CSV body line.
    fn canonical_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            self.session_id,
            self.person_id,
            canonical_ts(&self.check_in_ts),
            self.check_out_ts.as_ref().map(canonical_ts).unwrap_or_default(),
            self.duration_minutes()
                .map(|m| m.to_string())
                .unwrap_or_default(),
            self.source,
            self.corrected,
            self.integrity_hash,
        )
    }
}

/// Parameters identifying what was exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportQuery {
    pub org_id: DbId,
    pub project_id: DbId,
    pub range: PeriodRange,
    pub format: ExportFormat,
}

/// A rendered export, ready to be returned as a download.
#[derive(Debug, Clone)]
pub struct ExportDocument {
    pub body: String,
    pub format: ExportFormat,
    pub row_count: usize,
    pub content_fingerprint: String,
    pub document_fingerprint: String,
}

impl ExportDocument {
    pub fn file_name(&self, query: &ExportQuery) -> String {
        format!(
            "attendance-{}-{}-{}.{}",
            query.project_id,
            query.range.start,
            query.range.end,
            self.format.file_extension()
        )
    }
}

// ---------------------------------------------------------------------------
// Fingerprints
// ---------------------------------------------------------------------------

/// Fingerprint over the query parameters and the canonical row lines.
///
/// Independent of the export timestamp. Rows are hashed in the order given,
/// which the caller guarantees is `check_in_ts, id`.
pub fn content_fingerprint(query: &ExportQuery, rows: &[ExportRow]) -> String {
    let mut material = format!(
        "{EXPORT_FINGERPRINT_VERSION}|{}|{}|{}|{}|{}\n{CSV_HEADER}\n",
        query.org_id, query.project_id, query.range.start, query.range.end, query.format,
    );
    for row in rows {
        material.push_str(&row.canonical_line());
        material.push('\n');
    }
    sha256_hex(material.as_bytes())
}

/// Fingerprint binding a content fingerprint to one issued document.
pub fn document_fingerprint(
    content_fingerprint: &str,
    exported_at: &Timestamp,
    period_locked: bool,
) -> String {
    let material = format!(
        "{content_fingerprint}|{}|{period_locked}",
        canonical_ts(exported_at)
    );
    sha256_hex(material.as_bytes())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render an export document.
///
/// `period_locked` is informational only and is reported in the trailer.
pub fn render(
    query: &ExportQuery,
    rows: &[ExportRow],
    exported_at: Timestamp,
    period_locked: bool,
) -> ExportDocument {
    let content_fp = content_fingerprint(query, rows);
    let document_fp = document_fingerprint(&content_fp, &exported_at, period_locked);

    let trailer: Vec<(&str, String)> = vec![
        ("org_id", query.org_id.to_string()),
        ("project_id", query.project_id.to_string()),
        ("period", query.range.to_string()),
        ("format", query.format.to_string()),
        ("row_count", rows.len().to_string()),
        ("period_locked", period_locked.to_string()),
        ("exported_at", canonical_ts(&exported_at)),
        ("content_fingerprint", content_fp.clone()),
        ("document_fingerprint", document_fp.clone()),
    ];

    let body = match query.format {
        ExportFormat::Csv => render_csv(rows, &trailer),
        ExportFormat::Text => render_text(query, rows, &trailer),
    };

    ExportDocument {
        body,
        format: query.format,
        row_count: rows.len(),
        content_fingerprint: content_fp,
        document_fingerprint: document_fp,
    }
}

fn render_csv(rows: &[ExportRow], trailer: &[(&str, String)]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&row.canonical_line());
        out.push('\n');
    }
    for (key, value) in trailer {
        out.push_str(&format!("# {key}={value}\n"));
    }
    out
}

fn render_text(query: &ExportQuery, rows: &[ExportRow], trailer: &[(&str, String)]) -> String {
    let mut out = String::new();
    out.push_str("ATTENDANCE LEDGER EXPORT\n");
    out.push_str(&format!(
        "Project {} / period {}\n\n",
        query.project_id, query.range
    ));
    out.push_str(&format!(
        "{:>10}  {:>10}  {:<27}  {:<27}  {:>8}  {:<21}  {:<9}  {}\n",
        "SESSION", "PERSON", "CHECK-IN", "CHECK-OUT", "MINUTES", "SOURCE", "CORRECTED", "HASH"
    ));
    for row in rows {
        out.push_str(&format!(
            "{:>10}  {:>10}  {:<27}  {:<27}  {:>8}  {:<21}  {:<9}  {}\n",
            row.session_id,
            row.person_id,
            canonical_ts(&row.check_in_ts),
            row.check_out_ts
                .as_ref()
                .map(canonical_ts)
                .unwrap_or_else(|| "(open)".to_string()),
            row.duration_minutes()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string()),
            row.source,
            if row.corrected { "yes" } else { "no" },
            row.integrity_hash,
        ));
    }
    out.push_str("\n--- export metadata ---\n");
    for (key, value) in trailer {
        out.push_str(&format!("{key}: {value}\n"));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
