//! YAML program manifests.
//!
//! A manifest describes one program: its shape, where its fragments live, and optionally which
//! fragments each stage uses and which extra compiler log formats to recognise.
//!
//! ```yaml
//! name: demo
//! directory: shaders
//! shape: vertex-fragment
//! flavour: plain
//! stages:
//!   fragment:
//!     - common/lighting.glsl
//!     - demo.frag
//! patterns:
//!   - name: angle
//!     regex: '^ERROR: (\d+):(\d+): (.*)$'
//!     captures: { line: 2, message: 3 }
//! ```
//!
//! Stages without an explicit list fall back to their stage config file
//! (`{directory}/{name}_{tag}_shader.config`). Explicit paths are relative to `directory`.

use crate::assembler::StageAssembler;
use crate::config;
use crate::error::ManifestError;
use crate::fragment::FragmentKind;
use crate::parser::{CaptureLayout, DiagnosticParser, DiagnosticPattern};
use crate::program::{GpuCompiler, ProgramAssembly};
use crate::stage::{ProgramShape, StageKind};
use crate::store::BackingStore;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A custom diagnostic format declared in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternSpec {
    /// Pattern name, used in logs.
    pub name: String,
    /// Anchored regular expression.
    pub regex: String,
    /// Capture group assignment.
    #[serde(default)]
    pub captures: CaptureLayout,
}

fn default_true() -> bool {
    true
}

/// A program description loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramManifest {
    /// Program name (also the stem of stage config files).
    pub name: String,
    /// Directory fragments and stage configs live in.
    #[serde(default)]
    pub directory: String,
    /// Program shape.
    pub shape: ProgramShape,
    /// Flavour of fragments created from this manifest.
    #[serde(default)]
    pub flavour: FragmentKind,
    /// Explicit fragment lists, relative to `directory`.
    #[serde(default)]
    pub stages: BTreeMap<StageKind, Vec<String>>,
    /// Extra diagnostic formats, tried after the built-in ones.
    #[serde(default)]
    pub patterns: Vec<PatternSpec>,
    /// Whether the built-in vendor formats are used.
    #[serde(default = "default_true")]
    pub builtin_patterns: bool,
}

impl ProgramManifest {
    /// Parse and validate a manifest.
    pub fn load_from_str(yaml: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_yaml::from_str(yaml)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read, parse and validate a manifest from `store`.
    pub fn load_from_store(store: &dyn BackingStore, path: &str) -> Result<Self, ManifestError> {
        let yaml = store.read(path)?;
        Self::load_from_str(&yaml)
    }

    /// Check that explicit stage lists belong to the shape and custom patterns compile.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if let Some(&stage) = self.stages.keys().find(|&&k| !self.shape.contains(k)) {
            return Err(ManifestError::UnknownStage {
                stage,
                shape: self.shape,
            });
        }
        self.parser().map(|_| ())
    }

    /// Build the diagnostic parser this manifest describes.
    pub fn parser(&self) -> Result<DiagnosticParser, ManifestError> {
        let mut parser = if self.builtin_patterns {
            DiagnosticParser::new()
        } else {
            DiagnosticParser::empty()
        };
        for spec in &self.patterns {
            let pattern = DiagnosticPattern::new(spec.name.as_str(), &spec.regex, spec.captures)
                .map_err(|source| ManifestError::Pattern {
                    name: spec.name.clone(),
                    source,
                })?;
            parser.push_pattern(pattern);
        }
        Ok(parser)
    }

    /// Store path of a manifest-relative fragment path.
    pub fn resolve(&self, path: &str) -> String {
        let directory = self.directory.trim_end_matches('/');
        if directory.is_empty() || path.starts_with('/') {
            path.to_string()
        } else {
            format!("{directory}/{path}")
        }
    }

    /// Fragment paths of `kind` in compile order: the explicit list if present, otherwise the
    /// stage config file's content, otherwise nothing.
    pub fn stage_paths(
        &self,
        store: &dyn BackingStore,
        kind: StageKind,
    ) -> Result<Vec<String>, ManifestError> {
        if !self.shape.contains(kind) {
            return Err(ManifestError::UnknownStage {
                stage: kind,
                shape: self.shape,
            });
        }
        if let Some(paths) = self.stages.get(&kind) {
            return Ok(paths.iter().map(|p| self.resolve(p)).collect());
        }
        Ok(config::load_stage_config(store, &self.directory, &self.name, kind)?.unwrap_or_default())
    }

    /// A stage assembler loaded with `kind`'s fragments.
    pub fn stage_assembler(
        &self,
        store: &dyn BackingStore,
        kind: StageKind,
    ) -> Result<StageAssembler, ManifestError> {
        let mut assembler = StageAssembler::new(kind);
        for path in self.stage_paths(store, kind)? {
            assembler.append(self.flavour.open(path, store)?);
        }
        Ok(assembler)
    }

    /// A program assembly with every stage loaded, using this manifest's diagnostic parser.
    pub fn build<C: GpuCompiler>(
        &self,
        store: &dyn BackingStore,
        compiler: C,
    ) -> Result<ProgramAssembly<C>, ManifestError> {
        let mut program =
            ProgramAssembly::new(self.name.as_str(), self.shape, compiler).with_parser(self.parser()?);
        for &kind in self.shape.stages() {
            let assembler = self.stage_assembler(store, kind)?;
            if let Some(stage) = program.stage_mut(kind) {
                *stage = assembler;
            }
        }
        log::debug!("built program '{}' from manifest", self.name);
        Ok(program)
    }
}
