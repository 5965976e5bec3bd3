//! Mapping blob diagnostics back to fragments.
//!
//! Compilers report lines of the concatenated blob. The mapper finds, for every such line, the
//! last boundary entry at or before it (binary search over the [`BoundaryTable`]); the entry
//! index `b` identifies the fragment (`b / 2`) and whether the line is the fragment's marker
//! (`b` even) or part of its body (`b` odd).

use crate::assembler::BoundaryTable;
use crate::diagnostics::{Diagnostic, DiagnosticSeverity, ErrorMarkers};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// A diagnostic line the boundary table cannot attribute to a fragment.
pub enum MappingError {
    #[error("boundary table is empty")]
    /// Nothing was concatenated.
    NoBoundaries,

    #[error("line {line} is outside the blob (lines {first}..={last})")]
    /// The line lies before the first marker or past the last blob line.
    LineOutOfRange {
        /// Offending line.
        line: usize,
        /// First attributable line.
        first: usize,
        /// Last attributable line.
        last: usize,
    },

    #[error("fragment {file_id} does not exist ({fragment_count} fragments)")]
    /// The table and fragment list disagree.
    FragmentOutOfRange {
        /// Fragment index derived from the table.
        file_id: usize,
        /// Number of fragments supplied.
        fragment_count: usize,
    },
}

/// Where a blob line lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineLocation {
    /// Index of the boundary entry at or before the line.
    pub boundary: usize,
    /// Owning fragment.
    pub fragment: usize,
    /// 1-based line relative to the boundary entry.
    pub local_line: usize,
    /// `true` if the line is the fragment's synthetic marker.
    pub on_marker: bool,
}

/// Locate a 1-based blob `line` in `table`.
pub fn locate(
    table: &BoundaryTable,
    line: usize,
    fragment_count: usize,
) -> Result<LineLocation, MappingError> {
    let entries = table.entries();
    let Some(&first) = entries.first() else {
        return Err(MappingError::NoBoundaries);
    };

    let upper = entries.partition_point(|&entry| entry <= line);
    if upper == 0 || line > table.total_lines() {
        return Err(MappingError::LineOutOfRange {
            line,
            first,
            last: table.total_lines(),
        });
    }

    let boundary = upper - 1;
    let file_id = (boundary - boundary % 2) / 2;
    if file_id >= fragment_count {
        return Err(MappingError::FragmentOutOfRange {
            file_id,
            fragment_count,
        });
    }

    Ok(LineLocation {
        boundary,
        fragment: file_id,
        local_line: line - entries[boundary] + 1,
        on_marker: boundary % 2 == 0,
    })
}

/// A diagnostic attributed to a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedDiagnostic {
    /// Owning fragment index.
    pub fragment: usize,
    /// Line in the concatenated blob.
    pub global_line: usize,
    /// `true` if the compiler complained about the marker line itself.
    pub on_marker: bool,
    /// The diagnostic, with `line` local to the fragment and `path` set to the fragment's path.
    pub diagnostic: Diagnostic,
}

/// One entry of a report, in the order the compiler emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticEntry {
    /// Attributed to a fragment.
    Mapped(MappedDiagnostic),
    /// Without a line, or with a line the table could not attribute.
    Unmapped(Diagnostic),
}

impl DiagnosticEntry {
    /// The underlying diagnostic.
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            Self::Mapped(mapped) => &mapped.diagnostic,
            Self::Unmapped(diagnostic) => diagnostic,
        }
    }
}

/// Mapped diagnostics of one fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentDiagnostics {
    /// Fragment index.
    pub fragment: usize,
    /// Fragment path.
    pub path: String,
    /// Diagnostics in encounter order.
    pub diagnostics: Vec<MappedDiagnostic>,
}

/// Everything the mapper learned from one compiler log.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DiagnosticReport {
    entries: Vec<DiagnosticEntry>,
    groups: Vec<FragmentDiagnostics>,
    blob_markers: ErrorMarkers,
    fragment_count: usize,
}

impl DiagnosticReport {
    /// Every diagnostic in encounter order.
    pub fn entries(&self) -> &[DiagnosticEntry] {
        &self.entries
    }

    /// Iterate the plain diagnostics in encounter order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(DiagnosticEntry::diagnostic)
    }

    /// Per-fragment groups, ordered by each fragment's first diagnostic.
    pub fn groups(&self) -> &[FragmentDiagnostics] {
        &self.groups
    }

    /// Mapped diagnostics of fragment `index` (empty if it has none).
    pub fn for_fragment(&self, index: usize) -> &[MappedDiagnostic] {
        self.groups
            .iter()
            .find(|g| g.fragment == index)
            .map(|g| g.diagnostics.as_slice())
            .unwrap_or(&[])
    }

    /// Diagnostics that were not attributed to any fragment.
    pub fn unmapped(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter_map(|e| match e {
            DiagnosticEntry::Unmapped(d) => Some(d),
            DiagnosticEntry::Mapped(_) => None,
        })
    }

    /// Error markers for the concatenated blob, keyed by blob line.
    pub fn blob_markers(&self) -> &ErrorMarkers {
        &self.blob_markers
    }

    /// Error markers for fragment `index`, keyed by fragment-local line.
    ///
    /// Marker-line diagnostics are left out: they have no body line to point at and are still
    /// visible in [`blob_markers`](Self::blob_markers).
    pub fn fragment_markers(&self, index: usize) -> ErrorMarkers {
        let mut markers = ErrorMarkers::new();
        for mapped in self.for_fragment(index) {
            if mapped.on_marker || !mapped.diagnostic.is_error() {
                continue;
            }
            if let Some(line) = mapped.diagnostic.line {
                markers
                    .entry(line)
                    .or_insert_with(|| mapped.diagnostic.message.clone());
            }
        }
        markers
    }

    /// Number of fragments the report was resolved against.
    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the log was clean.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.count(DiagnosticSeverity::Error)
    }

    /// Number of warning diagnostics.
    pub fn warning_count(&self) -> usize {
        self.count(DiagnosticSeverity::Warning)
    }

    /// Returns `true` if any error diagnostic is present.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn count(&self, severity: DiagnosticSeverity) -> usize {
        self.diagnostics().filter(|d| d.severity == severity).count()
    }
}

/// Resolves parsed diagnostics against a boundary table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticMapper;

impl DiagnosticMapper {
    /// Create a mapper.
    pub fn new() -> Self {
        Self
    }

    /// Attribute `diagnostics` to the fragments listed in `paths` (blob order).
    ///
    /// Mapping failures are logged and the affected diagnostics kept as
    /// [`DiagnosticEntry::Unmapped`].
    pub fn resolve(
        &self,
        diagnostics: Vec<Diagnostic>,
        boundaries: &BoundaryTable,
        paths: &[String],
    ) -> DiagnosticReport {
        let mut report = DiagnosticReport {
            fragment_count: paths.len(),
            ..DiagnosticReport::default()
        };

        for diagnostic in diagnostics {
            let Some(global_line) = diagnostic.line else {
                report.entries.push(DiagnosticEntry::Unmapped(diagnostic));
                continue;
            };

            let location = match locate(boundaries, global_line, paths.len()) {
                Ok(location) => location,
                Err(err) => {
                    log::warn!("cannot map diagnostic '{}': {err}", diagnostic.message);
                    report.entries.push(DiagnosticEntry::Unmapped(diagnostic));
                    continue;
                }
            };

            if diagnostic.is_error() {
                report
                    .blob_markers
                    .entry(global_line)
                    .or_insert_with(|| diagnostic.message.clone());
            }

            let path = &paths[location.fragment];
            let mapped = MappedDiagnostic {
                fragment: location.fragment,
                global_line,
                on_marker: location.on_marker,
                diagnostic: Diagnostic {
                    line: Some(location.local_line),
                    path: Some(path.clone()),
                    ..diagnostic
                },
            };

            match report
                .groups
                .iter_mut()
                .find(|g| g.fragment == location.fragment)
            {
                Some(group) => group.diagnostics.push(mapped.clone()),
                None => report.groups.push(FragmentDiagnostics {
                    fragment: location.fragment,
                    path: path.clone(),
                    diagnostics: vec![mapped.clone()],
                }),
            }
            report.entries.push(DiagnosticEntry::Mapped(mapped));
        }

        report
    }
}
