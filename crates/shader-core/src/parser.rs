//! Compiler log parsing.
//!
//! Drivers report shader diagnostics as free-form text, one diagnostic per line, in a
//! vendor-specific format. [`DiagnosticParser`] tries an ordered list of
//! [`DiagnosticPattern`]s on every line; the first pattern that matches wins. Lines no pattern
//! understands, and lines whose numbers do not fit, become
//! [`DiagnosticSeverity::Unknown`] diagnostics carrying the raw line, so one odd line never hides
//! the rest of the log.
//!
//! Built-in formats:
//!
//! | Name | Example |
//! | --- | --- |
//! | `intel` | `ERROR: 12:4: undeclared identifier` |
//! | `nvidia` | `shader.frag(7) : error C1008: redefinition` |
//! | `mesa` | `0:12(4): error: syntax error` |

use crate::diagnostics::{Diagnostic, DiagnosticSeverity};
use regex::Regex;
use serde::Deserialize;
use std::num::ParseIntError;
use thiserror::Error;

const INTEL_PATTERN: &str = r"^(ERROR|WARNING):\s*(\d+):(\d+):\s*(.*?)\s*$";
const NVIDIA_PATTERN: &str = r"^(.*?)\((\d+)\)\s*:\s*(error|warning)\s*C(\d+)\s*:\s*(.*?)\s*$";
const MESA_PATTERN: &str = r"^(\d+):(\d+)\((\d+)\):\s*(error|warning)\s*:\s*(.*?)\s*$";

#[derive(Debug, Error)]
/// A matched line whose numeric fields could not be read.
pub enum ParseError {
    #[error("invalid {field} '{text}': {source}")]
    /// A numeric capture did not fit its integer type.
    InvalidNumber {
        /// Field name (`line`, `column`, `code`).
        field: &'static str,
        /// Captured text.
        text: String,
        /// Integer parse failure.
        #[source]
        source: ParseIntError,
    },
}

/// Which capture group holds which field. Group `0` is the whole match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureLayout {
    /// Severity word (`error`, `WARNING`, ...).
    pub severity: Option<usize>,
    /// Line number.
    pub line: Option<usize>,
    /// Column.
    pub column: Option<usize>,
    /// Numeric vendor code.
    pub code: Option<usize>,
    /// Reported path / source name.
    pub path: Option<usize>,
    /// Message text.
    pub message: Option<usize>,
}

/// One vendor diagnostic format.
#[derive(Debug, Clone)]
pub struct DiagnosticPattern {
    name: String,
    regex: Regex,
    layout: CaptureLayout,
}

impl DiagnosticPattern {
    /// Compile a custom pattern. The regex should be anchored (`^...$`): it has to describe the
    /// whole line.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        layout: CaptureLayout,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            regex: Regex::new(pattern)?,
            layout,
        })
    }

    fn builtin(name: &str, pattern: &str, layout: CaptureLayout) -> Self {
        Self {
            name: name.to_string(),
            regex: Regex::new(pattern).expect("valid built-in diagnostic pattern"),
            layout,
        }
    }

    /// `SEVERITY: LINE:COLUMN: MESSAGE` (Intel / AMD).
    pub fn intel() -> Self {
        Self::builtin(
            "intel",
            INTEL_PATTERN,
            CaptureLayout {
                severity: Some(1),
                line: Some(2),
                column: Some(3),
                message: Some(4),
                ..CaptureLayout::default()
            },
        )
    }

    /// `PATH(LINE) : severity CCODE: MESSAGE` (NVIDIA).
    pub fn nvidia() -> Self {
        Self::builtin(
            "nvidia",
            NVIDIA_PATTERN,
            CaptureLayout {
                path: Some(1),
                line: Some(2),
                severity: Some(3),
                code: Some(4),
                message: Some(5),
                ..CaptureLayout::default()
            },
        )
    }

    /// `SOURCE:LINE(COLUMN): severity: MESSAGE` (Mesa).
    pub fn mesa() -> Self {
        Self::builtin(
            "mesa",
            MESA_PATTERN,
            CaptureLayout {
                line: Some(2),
                column: Some(3),
                severity: Some(4),
                message: Some(5),
                ..CaptureLayout::default()
            },
        )
    }

    /// Pattern name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capture layout.
    pub fn layout(&self) -> CaptureLayout {
        self.layout
    }

    /// Try this pattern on one line.
    ///
    /// Returns `None` if the line does not match, and an error if it matches but a numeric
    /// field cannot be parsed.
    pub fn apply(&self, line: &str) -> Option<Result<Diagnostic, ParseError>> {
        let caps = self.regex.captures(line)?;
        let text = |group: Option<usize>| {
            group
                .and_then(|g| caps.get(g))
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
        };

        let build = || -> Result<Diagnostic, ParseError> {
            Ok(Diagnostic {
                severity: text(self.layout.severity)
                    .map(DiagnosticSeverity::from_vendor)
                    .unwrap_or(DiagnosticSeverity::Unknown),
                line: parse_number("line", text(self.layout.line))?,
                column: parse_number("column", text(self.layout.column))?,
                code: parse_number("code", text(self.layout.code))?,
                path: text(self.layout.path).map(str::to_string),
                message: text(self.layout.message).unwrap_or_default().to_string(),
            })
        };
        Some(build())
    }
}

fn parse_number<T>(field: &'static str, text: Option<&str>) -> Result<Option<T>, ParseError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    text.map(|t| {
        t.parse::<T>().map_err(|source| ParseError::InvalidNumber {
            field,
            text: t.to_string(),
            source,
        })
    })
    .transpose()
}

/// Turns raw compiler logs into [`Diagnostic`]s.
#[derive(Debug, Clone)]
pub struct DiagnosticParser {
    patterns: Vec<DiagnosticPattern>,
}

impl DiagnosticParser {
    /// A parser with the built-in vendor formats (`intel`, `nvidia`, `mesa`, in that order).
    pub fn new() -> Self {
        Self {
            patterns: vec![
                DiagnosticPattern::intel(),
                DiagnosticPattern::nvidia(),
                DiagnosticPattern::mesa(),
            ],
        }
    }

    /// A parser without any pattern: every line becomes an unknown diagnostic.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Builder-style [`push_pattern`](Self::push_pattern).
    pub fn with_pattern(mut self, pattern: DiagnosticPattern) -> Self {
        self.push_pattern(pattern);
        self
    }

    /// Register a pattern after the existing ones.
    pub fn push_pattern(&mut self, pattern: DiagnosticPattern) {
        self.patterns.push(pattern);
    }

    /// Registered patterns in match order.
    pub fn patterns(&self) -> &[DiagnosticPattern] {
        &self.patterns
    }

    /// Parse a whole log. Empty lines are skipped; whitespace-only lines are not.
    pub fn parse(&self, raw: &str) -> Vec<Diagnostic> {
        raw.split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(|line| self.parse_line(line))
            .collect()
    }

    /// Parse one line.
    pub fn parse_line(&self, line: &str) -> Diagnostic {
        for pattern in &self.patterns {
            match pattern.apply(line) {
                None => continue,
                Some(Ok(diagnostic)) => return diagnostic,
                Some(Err(err)) => {
                    log::debug!("pattern '{}' matched but failed: {err}", pattern.name());
                    return Diagnostic::unknown(line);
                }
            }
        }
        Diagnostic::unknown(line)
    }
}

impl Default for DiagnosticParser {
    fn default() -> Self {
        Self::new()
    }
}
