#![warn(missing_docs)]
//! Shader Core - headless shader program assembly with fragment-accurate diagnostics
//!
//! # Overview
//!
//! `shader-core` builds GPU shader programs out of many small source files. Each pipeline stage
//! is an ordered list of *fragments* (shared includes, the stage's `main`, ...) that is
//! concatenated into one compilation unit before it is handed to the driver. Drivers report
//! errors against lines of that concatenated text; this crate parses those logs and maps every
//! diagnostic back to the fragment and local line it came from.
//!
//! The crate does not talk to a GPU itself. Compilation goes through the [`GpuCompiler`] trait
//! (see `shader-core-glow` for an OpenGL implementation), and file access goes through
//! [`BackingStore`], so the whole pipeline runs in tests.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  ProgramAssembly (compile / link / uniforms)│  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  DiagnosticParser + DiagnosticMapper        │  ← Log → fragment lines
//! ├─────────────────────────────────────────────┤
//! │  StageAssembler (blob + boundary table)     │  ← Concatenation
//! ├─────────────────────────────────────────────┤
//! │  SourceFragment / stage configs / manifest  │  ← Sources
//! ├─────────────────────────────────────────────┤
//! │  BackingStore (FsStore, MemoryStore)        │  ← Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use shader_core::{
//!     DiagnosticMapper, DiagnosticParser, EditableFragment, StageAssembler, StageKind,
//! };
//!
//! let mut stage = StageAssembler::new(StageKind::Fragment);
//! stage.append(Box::new(EditableFragment::from_code(
//!     "common.glsl",
//!     "#version 330\nuniform float t;\n",
//! )));
//! stage.append(Box::new(EditableFragment::from_code(
//!     "main.frag",
//!     "void main() {\n  gl_FragColor = vec4(x);\n}\n",
//! )));
//!
//! let blob = stage.concatenate();
//! assert_eq!(blob.boundaries.entries(), &[1, 2, 4, 5]);
//!
//! // The driver complains about blob line 6: `main.frag` line 2.
//! let diagnostics = DiagnosticParser::new().parse("ERROR: 6:21: 'x' : undeclared identifier");
//! let report = DiagnosticMapper::new().resolve(diagnostics, &blob.boundaries, &blob.paths);
//!
//! let mapped = &report.for_fragment(1)[0];
//! assert_eq!(mapped.diagnostic.line, Some(2));
//! assert_eq!(mapped.diagnostic.path.as_deref(), Some("main.frag"));
//!
//! stage.apply_markers(&report);
//! let markers = stage.fragment(1).and_then(|f| f.error_markers()).unwrap();
//! assert_eq!(markers[&2], "'x' : undeclared identifier");
//! ```
//!
//! # Module Description
//!
//! - [`store`] - backing store trait and filesystem / in-memory stores
//! - [`fragment`] - source fragments
//! - [`stage`] - stage kinds and program shapes
//! - [`assembler`] - per-stage fragment lists, concatenation, boundary tables
//! - [`config`] - persisted per-stage fragment lists
//! - [`parser`] - vendor compiler log parsing
//! - [`mapper`] - mapping blob lines to fragments
//! - [`program`] - compile / link state machine
//! - [`manifest`] - YAML program manifests
//! - [`framebuffer`] - framebuffer attachment layouts

pub mod assembler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fragment;
pub mod framebuffer;
pub mod manifest;
pub mod mapper;
pub mod parser;
pub mod program;
pub mod stage;
pub mod store;

pub use assembler::{BoundaryTable, Concatenation, StageAssembler};
pub use diagnostics::{Diagnostic, DiagnosticSeverity, ErrorMarkers};
pub use error::{AssemblyError, LayoutError, LinkError, ManifestError, StoreError};
pub use fragment::{EditableFragment, FragmentKind, FragmentPath, PlainFragment, SourceFragment};
pub use framebuffer::{
    AttachmentDescriptor, AttachmentFormat, AttachmentPoint, AttachmentRole, AttachmentStorage,
    FramebufferLayout, RenderContext,
};
pub use manifest::{PatternSpec, ProgramManifest};
pub use mapper::{
    DiagnosticEntry, DiagnosticMapper, DiagnosticReport, FragmentDiagnostics, LineLocation,
    MappedDiagnostic, MappingError,
};
pub use parser::{CaptureLayout, DiagnosticParser, DiagnosticPattern, ParseError};
pub use program::{
    CompileOutput, GpuCompiler, LinkOutput, ProgramAssembly, ProgramState, StageReport,
    UniformValue,
};
pub use stage::{ProgramShape, StageKind, UnknownStage};
pub use store::{BackingStore, FsStore, MemoryStore, StoreEntry};

pub use shader_core_lang;
