#![warn(missing_docs)]
//! `shader-core-lang` - data-driven language configuration helpers for `shader-core`.
//!
//! This crate intentionally stays lightweight and does **not** depend on any compiler or GPU
//! bindings. It provides small structs that hosts can use to tell the assembler how a shading
//! language spells comments and which files on disk belong to which stage.

/// Comment tokens for a shading language.
///
/// The stage assembler uses these to emit the single-line marker that precedes every fragment
/// in a concatenated blob.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentConfig {
    /// Line comment token (e.g. `//`).
    pub line: Option<String>,
    /// Block comment start token (e.g. `/*`).
    pub block_start: Option<String>,
    /// Block comment end token (e.g. `*/`).
    pub block_end: Option<String>,
}

impl CommentConfig {
    /// Line comments only. Marker lines then never need a closing token.
    pub fn line(token: impl Into<String>) -> Self {
        Self {
            line: Some(token.into()),
            block_start: None,
            block_end: None,
        }
    }

    /// Create a config that supports both line and block comments.
    pub fn line_and_block(
        line: impl Into<String>,
        block_start: impl Into<String>,
        block_end: impl Into<String>,
    ) -> Self {
        Self {
            line: Some(line.into()),
            block_start: Some(block_start.into()),
            block_end: Some(block_end.into()),
        }
    }

    /// Returns `true` if a line comment token is configured.
    pub fn has_line(&self) -> bool {
        self.line.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Returns `true` if both block comment tokens are configured.
    pub fn has_block(&self) -> bool {
        self.block_start.as_deref().is_some_and(|s| !s.is_empty())
            && self.block_end.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Wrap `text` into a comment that fits on a single line.
    ///
    /// Prefers the line comment token; falls back to a block comment. Returns `None` if neither
    /// is configured. Newlines in `text` are replaced with spaces so the result never spans
    /// more than one line.
    pub fn single_line(&self, text: &str) -> Option<String> {
        let text = text.replace(['\r', '\n'], " ");
        if self.has_line() {
            let token = self.line.as_deref().unwrap_or_default();
            return Some(format!("{token} {text}"));
        }
        if self.has_block() {
            let start = self.block_start.as_deref().unwrap_or_default();
            let end = self.block_end.as_deref().unwrap_or_default();
            return Some(format!("{start} {text} {end}"));
        }
        None
    }
}

/// Language configuration used by the shader assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderLanguage {
    /// Human-readable name (e.g. `"GLSL"`).
    pub name: String,
    /// Comment tokens.
    pub comments: CommentConfig,
    /// Extensions (with leading `.`) of files that can be included in any stage.
    pub shared_extensions: Vec<String>,
}

impl ShaderLanguage {
    /// OpenGL Shading Language defaults: `//` and `/* */` comments, `.glsl` shared sources.
    pub fn glsl() -> Self {
        Self {
            name: "GLSL".to_string(),
            comments: CommentConfig::line_and_block("//", "/*", "*/"),
            shared_extensions: vec![".glsl".to_string()],
        }
    }

    /// Build the marker line placed before fragment `index` of a concatenated stage.
    ///
    /// The marker is always exactly one line and never ends with a newline. If the language has
    /// no comment syntax, an empty line is used.
    pub fn marker_line(&self, index: usize, path: &str) -> String {
        self.comments
            .single_line(&format!("[{index}] {path}"))
            .unwrap_or_default()
    }

    /// File extensions accepted for a stage whose own extension is `stage_extension`
    /// (e.g. `".frag"`): the shared extensions plus the stage's.
    pub fn source_extensions(&self, stage_extension: &str) -> Vec<String> {
        let mut out = self.shared_extensions.clone();
        if !out.iter().any(|e| e == stage_extension) {
            out.push(stage_extension.to_string());
        }
        out
    }
}

impl Default for ShaderLanguage {
    fn default() -> Self {
        Self::glsl()
    }
}
