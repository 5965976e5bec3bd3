//! Structured compiler diagnostics.
//!
//! A [`Diagnostic`] is produced by the [`DiagnosticParser`](crate::parser::DiagnosticParser)
//! from one line of raw compiler output. Before mapping, `line` is a line of the concatenated
//! blob and `path` is whatever the vendor reported (if anything). After mapping, `line` is local
//! to the owning fragment and `path` is that fragment's path.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Error markers keyed by 1-based line number, ready for editor annotation.
pub type ErrorMarkers = BTreeMap<usize, String>;

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// A compile or link error.
    Error,
    /// A warning.
    Warning,
    /// A line that matched no known diagnostic format.
    Unknown,
}

impl DiagnosticSeverity {
    /// Parse a vendor severity word (`ERROR`, `error`, `Warning`, ...).
    pub fn from_vendor(word: &str) -> Self {
        if word.eq_ignore_ascii_case("error") || word.eq_ignore_ascii_case("fatal error") {
            Self::Error
        } else if word.eq_ignore_ascii_case("warning") {
            Self::Warning
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Unknown => "unknown",
        })
    }
}

/// A single diagnostic item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Severity.
    pub severity: DiagnosticSeverity,
    /// 1-based line number, if the format carries one.
    pub line: Option<usize>,
    /// Column, if the format carries one.
    pub column: Option<usize>,
    /// Numeric vendor code (e.g. `1008` for NVIDIA's `C1008`).
    pub code: Option<u32>,
    /// Reported path before mapping; owning fragment path after mapping.
    pub path: Option<String>,
    /// Diagnostic message. For [`DiagnosticSeverity::Unknown`] this is the raw line.
    pub message: String,
}

impl Diagnostic {
    /// A diagnostic for a line no pattern understood.
    pub fn unknown(raw_line: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Unknown,
            line: None,
            column: None,
            code: None,
            path: None,
            message: raw_line.into(),
        }
    }

    /// Returns `true` for error-severity diagnostics.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{path}:")?;
        }
        if let Some(line) = self.line {
            write!(f, "{line}:")?;
            if let Some(column) = self.column {
                write!(f, "{column}:")?;
            }
        }
        if self.path.is_some() || self.line.is_some() {
            f.write_str(" ")?;
        }
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, " C{code:04}")?;
        }
        write!(f, ": {}", self.message)
    }
}
