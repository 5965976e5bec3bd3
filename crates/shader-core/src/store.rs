//! Backing store abstraction for shader sources and stage configs.
//!
//! The assembler never touches the filesystem directly. Everything that reads or writes text
//! goes through a [`BackingStore`], so hosts can plug in a real directory ([`FsStore`]), an
//! in-memory map ([`MemoryStore`]), or their own cache.

use crate::error::StoreError;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A single node of a directory enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    /// Full path, usable with [`BackingStore::read`].
    pub path: String,
    /// Nesting depth below the enumerated root (direct children have depth 1).
    pub depth: usize,
    /// `true` for directories, `false` for files.
    pub is_dir: bool,
}

impl StoreEntry {
    /// Last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Text storage used to load and save fragments and stage configs.
pub trait BackingStore {
    /// Read the full text at `path`.
    fn read(&self, path: &str) -> Result<String, StoreError>;

    /// Replace the text at `path`.
    fn write(&mut self, path: &str, content: &str) -> Result<(), StoreError>;

    /// Returns `true` if a file exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Enumerate `root` recursively.
    ///
    /// Entries come in pre-order: at each level directories first, then files, each group
    /// sorted by name. Files are kept only if their extension (with the leading dot) is in
    /// `extensions`; an empty slice keeps every file. Directories are always listed.
    fn list(&self, root: &str, extensions: &[String]) -> Result<Vec<StoreEntry>, StoreError>;
}

#[derive(Debug, Default)]
struct TreeNode {
    is_dir: bool,
    children: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    fn dir() -> Self {
        Self {
            is_dir: true,
            children: BTreeMap::new(),
        }
    }

    fn flatten(&self, prefix: &str, depth: usize, out: &mut Vec<StoreEntry>) {
        let dirs = self.children.iter().filter(|(_, n)| n.is_dir);
        let files = self.children.iter().filter(|(_, n)| !n.is_dir);
        for (name, node) in dirs.chain(files) {
            let path = join(prefix, name);
            out.push(StoreEntry {
                path: path.clone(),
                depth,
                is_dir: node.is_dir,
            });
            if node.is_dir {
                node.flatten(&path, depth + 1, out);
            }
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), name)
    }
}

fn extension_matches(name: &str, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|wanted| wanted.strip_prefix('.').unwrap_or(wanted) == ext)
}

/// A store backed by the local filesystem.
///
/// Relative paths are resolved against `root`; absolute paths are used as-is.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at the process working directory.
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    /// The directory relative paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    fn scan(dir: &Path, extensions: &[String]) -> io::Result<TreeNode> {
        let mut node = TreeNode::dir();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() {
                node.children
                    .insert(name, Self::scan(&entry.path(), extensions)?);
            } else if extension_matches(&name, extensions) {
                node.children.insert(name, TreeNode::default());
            }
        }
        Ok(node)
    }
}

fn io_error(path: &str, source: io::Error) -> StoreError {
    if source.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(path.to_string())
    } else {
        StoreError::Io {
            path: path.to_string(),
            source,
        }
    }
}

impl BackingStore for FsStore {
    fn read(&self, path: &str) -> Result<String, StoreError> {
        fs::read_to_string(self.resolve(path)).map_err(|e| io_error(path, e))
    }

    fn write(&mut self, path: &str, content: &str) -> Result<(), StoreError> {
        fs::write(self.resolve(path), content).map_err(|e| io_error(path, e))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn list(&self, root: &str, extensions: &[String]) -> Result<Vec<StoreEntry>, StoreError> {
        let tree = Self::scan(&self.resolve(root), extensions).map_err(|e| io_error(root, e))?;
        let mut out = Vec::new();
        tree.flatten(root, 1, &mut out);
        Ok(out)
    }
}

/// An in-memory store keyed by exact path strings.
///
/// Directories are implied by `/`-separated file paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    /// Insert or replace a file.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    /// Remove a file, returning its content.
    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.files.remove(path)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if the store holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl BackingStore for MemoryStore {
    fn read(&self, path: &str) -> Result<String, StoreError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn write(&mut self, path: &str, content: &str) -> Result<(), StoreError> {
        self.files.insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn list(&self, root: &str, extensions: &[String]) -> Result<Vec<StoreEntry>, StoreError> {
        let root = root.trim_end_matches('/');
        let mut tree = TreeNode::dir();
        let mut found = false;

        for path in self.files.keys() {
            let rel = if root.is_empty() || root == "." {
                path.as_str()
            } else {
                match path.strip_prefix(root).and_then(|r| r.strip_prefix('/')) {
                    Some(rel) => rel,
                    None => continue,
                }
            };
            found = true;

            let mut segments: Vec<&str> = rel.split('/').filter(|s| !s.is_empty()).collect();
            let Some(file_name) = segments.pop() else {
                continue;
            };
            let mut node = &mut tree;
            for dir in segments {
                node = node
                    .children
                    .entry(dir.to_string())
                    .or_insert_with(TreeNode::dir);
            }
            if extension_matches(file_name, extensions) {
                node.children
                    .entry(file_name.to_string())
                    .or_insert_with(TreeNode::default);
            }
        }

        if !found && !root.is_empty() && root != "." {
            return Err(StoreError::NotFound(root.to_string()));
        }

        let mut out = Vec::new();
        let prefix = if root == "." { "" } else { root };
        tree.flatten(prefix, 1, &mut out);
        Ok(out)
    }
}
