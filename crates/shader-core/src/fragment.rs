//! Source fragments: named units of shader text.
//!
//! A fragment is a piece of a stage (a shared `.glsl` include, a stage's `main`, ...). Stages are
//! built by concatenating fragments in order. Two flavours exist:
//!
//! - [`PlainFragment`]: read-only preview text; error markers are ignored.
//! - [`EditableFragment`]: text a host edits in place; keeps the error markers of the last
//!   compile so the host can annotate its editor.
//!
//! Both are used through the [`SourceFragment`] trait.

use crate::diagnostics::ErrorMarkers;
use crate::error::StoreError;
use crate::store::BackingStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Filesystem identity of a fragment, derived once from its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentPath {
    path: String,
    folder: String,
    filename: String,
    extension: String,
}

impl FragmentPath {
    /// Split `path` into folder, file stem and extension (with leading dot).
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let p = Path::new(&path);
        let folder = p
            .parent()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let filename = p
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = p
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Self {
            path,
            folder,
            filename,
            extension,
        }
    }

    /// The full path, as given.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parent folder (empty for a bare file name).
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// File name without extension.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Extension including the leading dot, or empty.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// `folder/filename.ext`, the form shown in compile lists and diagnostics.
    pub fn display_path(&self) -> String {
        if self.folder.is_empty() {
            format!("{}{}", self.filename, self.extension)
        } else {
            format!("{}/{}{}", self.folder, self.filename, self.extension)
        }
    }
}

impl fmt::Display for FragmentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Capabilities shared by every fragment flavour.
pub trait SourceFragment: fmt::Debug {
    /// Filesystem identity.
    fn identity(&self) -> &FragmentPath;

    /// Which flavour this fragment is.
    fn kind(&self) -> FragmentKind;

    /// Current text.
    fn code(&self) -> &str;

    /// Replace the text and mark the fragment dirty.
    fn set_code(&mut self, code: String);

    /// Returns `true` if the text has changed since the last load or save.
    fn is_dirty(&self) -> bool;

    /// Reload the text from `store`. On failure the fragment is left untouched.
    fn load(&mut self, store: &dyn BackingStore) -> Result<(), StoreError>;

    /// Write the text to `store`.
    fn save(&mut self, store: &mut dyn BackingStore) -> Result<(), StoreError>;

    /// Assign error markers (fragment-local line numbers) from the last compile.
    fn set_error_markers(&mut self, markers: ErrorMarkers);

    /// Error markers currently attached, if this flavour keeps them.
    fn error_markers(&self) -> Option<&ErrorMarkers>;

    /// Shorthand for `identity().path()`.
    fn path(&self) -> &str {
        self.identity().path()
    }

    /// Shorthand for `identity().folder()`.
    fn folder(&self) -> &str {
        self.identity().folder()
    }

    /// Shorthand for `identity().filename()`.
    fn filename(&self) -> &str {
        self.identity().filename()
    }

    /// Shorthand for `identity().extension()`.
    fn extension(&self) -> &str {
        self.identity().extension()
    }
}

/// Fragment flavour selector, used when fragments are created from paths (stage configs,
/// manifests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentKind {
    /// [`PlainFragment`].
    Plain,
    /// [`EditableFragment`].
    #[default]
    Editable,
}

impl FragmentKind {
    /// Create an empty, unloaded fragment of this flavour.
    pub fn create(self, path: impl Into<String>) -> Box<dyn SourceFragment> {
        match self {
            Self::Plain => Box::new(PlainFragment::new(path)),
            Self::Editable => Box::new(EditableFragment::new(path)),
        }
    }

    /// Create a fragment of this flavour and load it from `store`.
    pub fn open(
        self,
        path: impl Into<String>,
        store: &dyn BackingStore,
    ) -> Result<Box<dyn SourceFragment>, StoreError> {
        let mut fragment = self.create(path);
        fragment.load(store)?;
        Ok(fragment)
    }
}

#[derive(Debug, Clone)]
struct FragmentText {
    identity: FragmentPath,
    code: String,
    dirty: bool,
}

impl FragmentText {
    fn new(path: String, code: String, dirty: bool) -> Self {
        Self {
            identity: FragmentPath::new(path),
            code,
            dirty,
        }
    }

    fn set_code(&mut self, code: String) {
        self.code = code;
        self.dirty = true;
    }

    fn load(&mut self, store: &dyn BackingStore) -> Result<(), StoreError> {
        self.code = store.read(self.identity.path())?;
        self.dirty = false;
        Ok(())
    }

    fn save(&mut self, store: &mut dyn BackingStore) -> Result<(), StoreError> {
        store.write(self.identity.path(), &self.code)?;
        self.dirty = false;
        Ok(())
    }
}

/// A read-only preview fragment.
#[derive(Debug, Clone)]
pub struct PlainFragment {
    text: FragmentText,
}

impl PlainFragment {
    /// Create an empty, unloaded fragment.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            text: FragmentText::new(path.into(), String::new(), false),
        }
    }

    /// Create a fragment from in-memory text. It is dirty until saved.
    pub fn from_code(path: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            text: FragmentText::new(path.into(), code.into(), true),
        }
    }
}

impl SourceFragment for PlainFragment {
    fn identity(&self) -> &FragmentPath {
        &self.text.identity
    }

    fn kind(&self) -> FragmentKind {
        FragmentKind::Plain
    }

    fn code(&self) -> &str {
        &self.text.code
    }

    fn set_code(&mut self, code: String) {
        self.text.set_code(code);
    }

    fn is_dirty(&self) -> bool {
        self.text.dirty
    }

    fn load(&mut self, store: &dyn BackingStore) -> Result<(), StoreError> {
        self.text.load(store)
    }

    fn save(&mut self, store: &mut dyn BackingStore) -> Result<(), StoreError> {
        self.text.save(store)
    }

    fn set_error_markers(&mut self, _markers: ErrorMarkers) {}

    fn error_markers(&self) -> Option<&ErrorMarkers> {
        None
    }
}

/// A fragment edited in place by the host; keeps per-line error markers.
#[derive(Debug, Clone)]
pub struct EditableFragment {
    text: FragmentText,
    markers: ErrorMarkers,
}

impl EditableFragment {
    /// Create an empty, unloaded fragment.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            text: FragmentText::new(path.into(), String::new(), false),
            markers: ErrorMarkers::new(),
        }
    }

    /// Create a fragment from in-memory text. It is dirty until saved.
    pub fn from_code(path: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            text: FragmentText::new(path.into(), code.into(), true),
            markers: ErrorMarkers::new(),
        }
    }
}

impl SourceFragment for EditableFragment {
    fn identity(&self) -> &FragmentPath {
        &self.text.identity
    }

    fn kind(&self) -> FragmentKind {
        FragmentKind::Editable
    }

    fn code(&self) -> &str {
        &self.text.code
    }

    fn set_code(&mut self, code: String) {
        self.text.set_code(code);
    }

    fn is_dirty(&self) -> bool {
        self.text.dirty
    }

    fn load(&mut self, store: &dyn BackingStore) -> Result<(), StoreError> {
        self.text.load(store)
    }

    fn save(&mut self, store: &mut dyn BackingStore) -> Result<(), StoreError> {
        self.text.save(store)
    }

    fn set_error_markers(&mut self, markers: ErrorMarkers) {
        self.markers = markers;
    }

    fn error_markers(&self) -> Option<&ErrorMarkers> {
        Some(&self.markers)
    }
}
