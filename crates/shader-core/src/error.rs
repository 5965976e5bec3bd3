//! Error types, one enum per concern.

use crate::stage::{ProgramShape, StageKind};
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors reported by a [`BackingStore`](crate::store::BackingStore).
pub enum StoreError {
    #[error("not found: {0}")]
    /// The store has no entry at this path.
    NotFound(String),

    #[error("I/O error on '{path}': {source}")]
    /// Reading, writing or enumerating failed.
    Io {
        /// Path the operation was applied to.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors reported by [`ProgramAssembly::link`](crate::program::ProgramAssembly::link).
pub enum LinkError {
    #[error("stage '{0}' has not been compiled since its last change")]
    /// A mandatory stage was never compiled, or was modified after its last compile.
    StageNotCompiled(StageKind),

    #[error("stage '{0}' failed to compile")]
    /// A mandatory stage's last compile failed.
    StageFailed(StageKind),

    #[error("link failed: {log}")]
    /// The driver rejected the link, or reported error diagnostics while linking.
    Rejected {
        /// Raw link log.
        log: String,
    },
}

#[derive(Debug, Error)]
/// Errors produced while building, compiling or driving a shader program.
pub enum AssemblyError {
    #[error("stage '{0}' is not part of this program")]
    /// The program's shape has no slot for this stage.
    StageNotInProgram(StageKind),

    #[error("stage '{0}' has no source fragments")]
    /// Compilation was requested for a stage without fragments.
    EmptyStage(StageKind),

    #[error("fragment '{0}' is already part of this stage")]
    /// A fragment path was added twice through a deduplicating call.
    DuplicateFragment(String),

    #[error("program is not linked")]
    /// The operation requires a successfully linked program.
    NotLinked,

    #[error("no active uniform named '{0}'")]
    /// The linked program has no active uniform with this name.
    UniformNotFound(String),

    #[error(transparent)]
    /// Backing store failure.
    Store(#[from] StoreError),

    #[error(transparent)]
    /// Link failure.
    Link(#[from] LinkError),
}

#[derive(Debug, Error)]
/// Errors produced while reading a program manifest.
pub enum ManifestError {
    #[error("invalid manifest: {0}")]
    /// The YAML could not be deserialized.
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    /// The manifest or one of its fragments could not be read.
    Store(#[from] StoreError),

    #[error("stage '{stage}' is not part of a {shape:?} program")]
    /// The manifest lists fragments for a stage its shape does not have.
    UnknownStage {
        /// Listed stage.
        stage: StageKind,
        /// Declared shape.
        shape: ProgramShape,
    },

    #[error("diagnostic pattern '{name}' does not compile: {source}")]
    /// A custom diagnostic pattern is not a valid regex.
    Pattern {
        /// Pattern name.
        name: String,
        /// Regex compile failure.
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
/// Invalid framebuffer attachment combinations.
pub enum LayoutError {
    #[error("framebuffer already has a depth attachment")]
    /// A second depth (or depth-stencil) attachment was added.
    DuplicateDepth,

    #[error("framebuffer already has a stencil attachment")]
    /// A second stencil (or depth-stencil) attachment was added.
    DuplicateStencil,

    #[error("framebuffer already has a depth-stencil attachment")]
    /// A depth-stencil attachment was added next to an existing depth or stencil attachment.
    DuplicateDepthStencil,

    #[error("attachment is {found:?}, framebuffer is {expected:?}")]
    /// Attachment sizes disagree.
    SizeMismatch {
        /// Size of the existing attachments.
        expected: (u32, u32),
        /// Size of the rejected attachment.
        found: (u32, u32),
    },
}
