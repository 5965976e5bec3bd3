//! Per-stage fragment lists and concatenation.
//!
//! A [`StageAssembler`] owns the ordered fragments of one stage. [`StageAssembler::concatenate`]
//! turns them into a single compilation unit (the *blob*) and records a [`BoundaryTable`] that
//! lets diagnostics on blob lines be traced back to fragments.
//!
//! # Blob layout
//!
//! Every fragment contributes one marker line followed by its body:
//!
//! ```text
//! line 1        // [0] common.glsl        <- boundaries[0]
//! line 2        <common.glsl line 1>      <- boundaries[1]
//! ...
//! line L0+2     // [1] main.frag          <- boundaries[2]
//! line L0+3     <main.frag line 1>        <- boundaries[3]
//! ```
//!
//! Entry `2k` is the blob line of fragment `k`'s marker and entry `2k + 1` the blob line of its
//! first body line, so the table has exactly two entries per fragment and is strictly
//! increasing. Bodies always end with a newline; an empty body occupies one empty line.

use crate::config;
use crate::error::{AssemblyError, StoreError};
use crate::fragment::{FragmentKind, SourceFragment};
use crate::mapper::DiagnosticReport;
use crate::stage::StageKind;
use crate::store::BackingStore;
use serde::Serialize;
use shader_core_lang::ShaderLanguage;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// Blob line numbers of every fragment's marker and first body line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundaryTable {
    entries: Vec<usize>,
    total_lines: usize,
}

impl BoundaryTable {
    /// Build a table from raw entries and the blob's line count.
    ///
    /// Callers are expected to pass two strictly increasing entries per fragment; the
    /// [`DiagnosticMapper`](crate::mapper::DiagnosticMapper) rejects lines the table cannot
    /// attribute instead of trusting it blindly.
    pub fn new(entries: Vec<usize>, total_lines: usize) -> Self {
        Self {
            entries,
            total_lines,
        }
    }

    /// Raw entries (1-based blob lines).
    pub fn entries(&self) -> &[usize] {
        &self.entries
    }

    /// Number of entries (`2 * fragment_count`).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of fragments described.
    pub fn fragment_count(&self) -> usize {
        self.entries.len() / 2
    }

    /// Total number of lines in the blob.
    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    /// Blob line of fragment `index`'s marker.
    pub fn marker_line(&self, index: usize) -> Option<usize> {
        self.entries.get(index.checked_mul(2)?).copied()
    }

    /// Blob lines covered by fragment `index`'s body (inclusive range).
    pub fn body_lines(&self, index: usize) -> Option<std::ops::RangeInclusive<usize>> {
        let marker = index.checked_mul(2)?;
        let start = *self.entries.get(marker.checked_add(1)?)?;
        let end = match marker.checked_add(2).and_then(|next| self.entries.get(next)) {
            Some(next_marker) => next_marker - 1,
            None => self.total_lines,
        };
        Some(start..=end)
    }
}

/// The result of concatenating a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Concatenation {
    /// Stage the blob was built for.
    pub stage: StageKind,
    /// Source submitted to the compiler.
    pub blob: String,
    /// Fragment boundaries inside `blob`.
    pub boundaries: BoundaryTable,
    /// Fragment paths in blob order (one per compiled occurrence).
    pub paths: Vec<String>,
}

/// Ordered fragments of one shader stage.
#[derive(Debug)]
pub struct StageAssembler {
    kind: StageKind,
    language: ShaderLanguage,
    fragments: Vec<Box<dyn SourceFragment>>,
    boundaries: Option<BoundaryTable>,
    revision: u64,
}

impl StageAssembler {
    /// Create an empty assembler for `kind` using GLSL markers.
    pub fn new(kind: StageKind) -> Self {
        Self::with_language(kind, ShaderLanguage::glsl())
    }

    /// Create an empty assembler with a specific language configuration.
    pub fn with_language(kind: StageKind, language: ShaderLanguage) -> Self {
        Self {
            kind,
            language,
            fragments: Vec::new(),
            boundaries: None,
            revision: next_revision(),
        }
    }

    /// The stage this assembler builds.
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// The language configuration used for marker lines.
    pub fn language(&self) -> &ShaderLanguage {
        &self.language
    }

    /// Replace the language configuration.
    pub fn set_language(&mut self, language: ShaderLanguage) {
        self.language = language;
        self.touch();
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns `true` if there are no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Revision stamp, renewed by every mutation (including mutable fragment access).
    ///
    /// Stamps are unique across all assemblers of the process, so a replaced assembler never
    /// reuses the stamp of the one it replaced.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// All fragments in compile order.
    pub fn fragments(&self) -> &[Box<dyn SourceFragment>] {
        &self.fragments
    }

    /// Fragment at `index`.
    pub fn fragment(&self, index: usize) -> Option<&dyn SourceFragment> {
        self.fragments.get(index).map(|f| f.as_ref())
    }

    /// Mutable fragment at `index`. Invalidates the boundary table.
    pub fn fragment_mut(&mut self, index: usize) -> Option<&mut Box<dyn SourceFragment>> {
        if index >= self.fragments.len() {
            return None;
        }
        self.touch();
        self.fragments.get_mut(index)
    }

    /// Fragment paths in compile order.
    pub fn paths(&self) -> Vec<String> {
        self.fragments.iter().map(|f| f.path().to_string()).collect()
    }

    /// Returns `true` if a fragment with this path is present.
    pub fn contains_path(&self, path: &str) -> bool {
        self.position_of(path).is_some()
    }

    /// First fragment with this path.
    pub fn fragment_for_path(&self, path: &str) -> Option<&dyn SourceFragment> {
        self.position_of(path).and_then(|index| self.fragment(index))
    }

    /// Index of the first fragment with this path.
    pub fn position_of(&self, path: &str) -> Option<usize> {
        self.fragments.iter().position(|f| f.path() == path)
    }

    /// Boundary table of the last concatenation, if no mutation happened since.
    pub fn boundaries(&self) -> Option<&BoundaryTable> {
        self.boundaries.as_ref()
    }

    /// Append a fragment. The same path may appear more than once; each occurrence is
    /// concatenated and mapped separately.
    pub fn append(&mut self, fragment: Box<dyn SourceFragment>) {
        self.fragments.push(fragment);
        self.touch();
    }

    /// Append a fragment unless its path is already present.
    pub fn append_unique(&mut self, fragment: Box<dyn SourceFragment>) -> Result<(), AssemblyError> {
        if self.contains_path(fragment.path()) {
            return Err(AssemblyError::DuplicateFragment(fragment.path().to_string()));
        }
        self.append(fragment);
        Ok(())
    }

    /// Remove the fragment at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Box<dyn SourceFragment>> {
        if index >= self.fragments.len() {
            return None;
        }
        self.touch();
        Some(self.fragments.remove(index))
    }

    /// Remove the last fragment.
    pub fn pop(&mut self) -> Option<Box<dyn SourceFragment>> {
        let fragment = self.fragments.pop()?;
        self.touch();
        Some(fragment)
    }

    /// Remove every fragment.
    pub fn clear(&mut self) {
        self.fragments.clear();
        self.touch();
    }

    /// Swap the fragment at `index` with its predecessor. No-op at index 0 or out of range.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.fragments.len() {
            return false;
        }
        self.fragments.swap(index - 1, index);
        self.touch();
        true
    }

    /// Swap the fragment at `index` with its successor. No-op at the last index or out of range.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index >= self.fragments.len().saturating_sub(1) {
            return false;
        }
        self.fragments.swap(index, index + 1);
        self.touch();
        true
    }

    /// Concatenate all fragments into one blob and record the boundary table.
    pub fn concatenate(&mut self) -> Concatenation {
        let mut blob = String::new();
        let mut entries = Vec::with_capacity(self.fragments.len() * 2);
        let mut paths = Vec::with_capacity(self.fragments.len());
        let mut next_line = 1usize;

        for (index, fragment) in self.fragments.iter().enumerate() {
            entries.push(next_line);
            blob.push_str(&self.language.marker_line(index, fragment.path()));
            blob.push('\n');
            next_line += 1;

            entries.push(next_line);
            next_line += push_body(&mut blob, fragment.code());
            paths.push(fragment.path().to_string());
        }

        let boundaries = BoundaryTable::new(entries, next_line - 1);
        self.boundaries = Some(boundaries.clone());
        Concatenation {
            stage: self.kind,
            blob,
            boundaries,
            paths,
        }
    }

    /// Hand each fragment the error markers `report` attributes to it.
    ///
    /// Markers are not source text, so this does not invalidate the boundary table. Ignored if
    /// the report was resolved against a different number of fragments.
    pub fn apply_markers(&mut self, report: &DiagnosticReport) {
        if report.fragment_count() != self.fragments.len() {
            log::debug!(
                "{} report covers {} fragments, stage has {}; markers not applied",
                self.kind,
                report.fragment_count(),
                self.fragments.len()
            );
            return;
        }
        for (index, fragment) in self.fragments.iter_mut().enumerate() {
            fragment.set_error_markers(report.fragment_markers(index));
        }
    }

    /// Write the current fragment order as this stage's config file.
    pub fn save_config(
        &self,
        store: &mut dyn BackingStore,
        directory: &str,
        program_name: &str,
    ) -> Result<(), StoreError> {
        config::save_stage_config(store, directory, program_name, self.kind, &self.paths())
    }

    /// Replace the fragment list with the one stored in this stage's config file.
    ///
    /// Every listed fragment is loaded before anything changes; if one fails, the assembler is
    /// left as it was. A missing config file loads nothing and keeps the current list. Returns
    /// the number of fragments loaded.
    pub fn load_config(
        &mut self,
        store: &dyn BackingStore,
        directory: &str,
        program_name: &str,
        flavour: FragmentKind,
    ) -> Result<usize, StoreError> {
        let Some(paths) = config::load_stage_config(store, directory, program_name, self.kind)?
        else {
            return Ok(0);
        };
        let fragments = paths
            .into_iter()
            .map(|path| flavour.open(path, store))
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|err| {
                log::warn!(
                    "{} stage config of '{program_name}' not loaded: {err}",
                    self.kind.tag()
                )
            })?;

        let loaded = fragments.len();
        self.fragments = fragments;
        self.touch();
        Ok(loaded)
    }

    fn touch(&mut self) {
        self.boundaries = None;
        self.revision = next_revision();
    }
}

/// Append `body` (newline-terminated) and return the number of lines it occupies.
fn push_body(blob: &mut String, body: &str) -> usize {
    if body.is_empty() {
        blob.push('\n');
        return 1;
    }
    blob.push_str(body);
    if !body.ends_with('\n') {
        blob.push('\n');
    }
    body.lines().count().max(1)
}
