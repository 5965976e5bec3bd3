//! Program assembly: per-stage compile, link, and uniform pushing.
//!
//! [`ProgramAssembly`] is the builder hosts drive: add fragments to stages, compile stages,
//! link, push uniforms. The GPU side is abstracted by [`GpuCompiler`], so the whole pipeline
//! (including diagnostic mapping) runs headless in tests.
//!
//! # State machine
//!
//! ```text
//! Uninitialized -> Compiling(stage) -> Compiled(stage) -> Linking -> Linked
//!                                                                 \-> LinkFailed
//! ```
//!
//! Compiling any stage drops a previous link: a program is never reported as linked from
//! sources older than its latest compile.

use crate::assembler::{Concatenation, StageAssembler};
use crate::diagnostics::Diagnostic;
use crate::error::{AssemblyError, LinkError, StoreError};
use crate::fragment::{FragmentKind, SourceFragment};
use crate::mapper::{DiagnosticMapper, DiagnosticReport};
use crate::parser::DiagnosticParser;
use crate::stage::{ProgramShape, StageKind};
use crate::store::BackingStore;
use shader_core_lang::ShaderLanguage;
use std::fmt;

/// Result of compiling one stage on the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput<S> {
    /// Compiled stage object, if the driver created one.
    pub handle: Option<S>,
    /// Driver compile status.
    pub success: bool,
    /// Raw info log (empty for a clean compile).
    pub log: String,
}

/// Result of linking a program on the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutput<P> {
    /// Program object, if the driver created one.
    pub program: Option<P>,
    /// Driver link status.
    pub success: bool,
    /// Raw info log.
    pub log: String,
}

/// A uniform value pushed to a linked program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `float`
    Float(f32),
    /// `vec2`
    Vec2([f32; 2]),
    /// `vec3`
    Vec3([f32; 3]),
    /// `vec4`
    Vec4([f32; 4]),
    /// `int` (also samplers)
    Int(i32),
    /// `uint`
    UInt(u32),
    /// `bool`
    Bool(bool),
    /// `mat3`, column-major
    Mat3([f32; 9]),
    /// `mat4`, column-major
    Mat4([f32; 16]),
}

/// The driver-side shader compiler.
pub trait GpuCompiler {
    /// Compiled stage object.
    type Stage;
    /// Linked program object.
    type Program;

    /// Compile `source` as a `kind` stage. Blocking.
    fn compile_stage(&mut self, kind: StageKind, source: &str) -> CompileOutput<Self::Stage>;

    /// Link compiled stages into a program. Blocking.
    fn link_program(&mut self, stages: &[&Self::Stage]) -> LinkOutput<Self::Program>;

    /// Set a uniform on `program`. Returns `false` if the program has no such active uniform.
    fn set_uniform(&mut self, program: &Self::Program, name: &str, value: &UniformValue) -> bool;

    /// Free a stage object that is no longer needed.
    fn release_stage(&mut self, _stage: Self::Stage) {}

    /// Free a program object that is no longer needed.
    fn release_program(&mut self, _program: Self::Program) {}
}

/// Where a program is in its compile/link cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    /// Nothing compiled since creation.
    Uninitialized,
    /// A stage compile is in progress.
    Compiling(StageKind),
    /// The named stage was the last one compiled; not linked.
    Compiled(StageKind),
    /// A link is in progress.
    Linking,
    /// Linked from the latest compiles.
    Linked,
    /// The last link attempt failed.
    LinkFailed,
}

/// Outcome of the last compile of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// The blob and boundary table that were compiled.
    pub concatenation: Concatenation,
    /// `true` if the driver succeeded and reported no errors.
    pub success: bool,
    /// Raw compiler log.
    pub log: String,
    /// Parsed and mapped diagnostics.
    pub report: DiagnosticReport,
    revision: u64,
}

struct CompiledStage<S> {
    handle: Option<S>,
    result: StageReport,
}

struct StageSlot<S> {
    assembler: StageAssembler,
    compiled: Option<CompiledStage<S>>,
}

impl<S> StageSlot<S> {
    fn is_stale(&self) -> bool {
        self.compiled
            .as_ref()
            .is_none_or(|c| c.result.revision != self.assembler.revision())
    }
}

/// A shader program being assembled from per-stage fragment lists.
pub struct ProgramAssembly<C: GpuCompiler> {
    name: String,
    shape: ProgramShape,
    compiler: C,
    parser: DiagnosticParser,
    mapper: DiagnosticMapper,
    stages: Vec<StageSlot<C::Stage>>,
    state: ProgramState,
    program: Option<C::Program>,
    link_log: String,
    link_diagnostics: Vec<Diagnostic>,
}

impl<C: GpuCompiler> ProgramAssembly<C> {
    /// Create an empty program of the given shape.
    pub fn new(name: impl Into<String>, shape: ProgramShape, compiler: C) -> Self {
        let stages = shape
            .stages()
            .iter()
            .map(|&kind| StageSlot {
                assembler: StageAssembler::new(kind),
                compiled: None,
            })
            .collect();
        Self {
            name: name.into(),
            shape,
            compiler,
            parser: DiagnosticParser::new(),
            mapper: DiagnosticMapper::new(),
            stages,
            state: ProgramState::Uninitialized,
            program: None,
            link_log: String::new(),
            link_diagnostics: Vec::new(),
        }
    }

    /// Use a custom diagnostic parser.
    pub fn with_parser(mut self, parser: DiagnosticParser) -> Self {
        self.parser = parser;
        self
    }

    /// Use a custom language configuration for every stage.
    pub fn with_language(mut self, language: ShaderLanguage) -> Self {
        for slot in &mut self.stages {
            slot.assembler.set_language(language.clone());
        }
        self
    }

    /// Program name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Program shape.
    pub fn shape(&self) -> ProgramShape {
        self.shape
    }

    /// Current state.
    pub fn state(&self) -> ProgramState {
        self.state
    }

    /// Returns `true` if the last link succeeded and no stage was recompiled since.
    pub fn is_linked(&self) -> bool {
        self.state == ProgramState::Linked
    }

    /// The diagnostic parser in use.
    pub fn parser(&self) -> &DiagnosticParser {
        &self.parser
    }

    /// The compiler backend.
    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Mutable access to the compiler backend.
    pub fn compiler_mut(&mut self) -> &mut C {
        &mut self.compiler
    }

    /// The linked program object.
    pub fn program(&self) -> Option<&C::Program> {
        self.program.as_ref()
    }

    /// Stage kinds of this program in pipeline order.
    pub fn stage_kinds(&self) -> impl Iterator<Item = StageKind> + '_ {
        self.stages.iter().map(|s| s.assembler.kind())
    }

    /// The assembler of `kind`.
    pub fn stage(&self, kind: StageKind) -> Option<&StageAssembler> {
        self.stages
            .iter()
            .find(|s| s.assembler.kind() == kind)
            .map(|s| &s.assembler)
    }

    /// Mutable assembler of `kind`.
    pub fn stage_mut(&mut self, kind: StageKind) -> Option<&mut StageAssembler> {
        self.stages
            .iter_mut()
            .find(|s| s.assembler.kind() == kind)
            .map(|s| &mut s.assembler)
    }

    /// Append a fragment to a stage.
    pub fn add_stage(
        &mut self,
        kind: StageKind,
        fragment: Box<dyn SourceFragment>,
    ) -> Result<(), AssemblyError> {
        self.stage_mut(kind)
            .ok_or(AssemblyError::StageNotInProgram(kind))?
            .append(fragment);
        Ok(())
    }

    /// Load every stage's fragment list from its config file in `directory`.
    ///
    /// Returns the total number of fragments loaded. Stages without a config file keep their
    /// current fragments.
    pub fn load_configs(
        &mut self,
        store: &dyn BackingStore,
        directory: &str,
        flavour: FragmentKind,
    ) -> Result<usize, StoreError> {
        let mut loaded = 0;
        for slot in &mut self.stages {
            loaded += slot
                .assembler
                .load_config(store, directory, &self.name, flavour)?;
        }
        Ok(loaded)
    }

    /// Save every non-empty stage's fragment list to its config file in `directory`.
    pub fn save_configs(
        &self,
        store: &mut dyn BackingStore,
        directory: &str,
    ) -> Result<(), StoreError> {
        for slot in self.stages.iter().filter(|s| !s.assembler.is_empty()) {
            slot.assembler.save_config(store, directory, &self.name)?;
        }
        Ok(())
    }

    /// Concatenate and compile one stage.
    ///
    /// Returns whether the stage compiled cleanly. Compiler failures are not errors: they are
    /// reported through [`stage_report`](Self::stage_report).
    pub fn compile(&mut self, kind: StageKind) -> Result<bool, AssemblyError> {
        let index = self
            .stages
            .iter()
            .position(|s| s.assembler.kind() == kind)
            .ok_or(AssemblyError::StageNotInProgram(kind))?;
        if self.stages[index].assembler.is_empty() {
            return Err(AssemblyError::EmptyStage(kind));
        }

        self.drop_link();
        self.state = ProgramState::Compiling(kind);

        let concatenation = self.stages[index].assembler.concatenate();
        log::debug!(
            "compiling {} stage of '{}': {} fragments, {} lines",
            kind,
            self.name,
            concatenation.paths.len(),
            concatenation.boundaries.total_lines()
        );

        let output = self.compiler.compile_stage(kind, &concatenation.blob);
        let diagnostics = self.parser.parse(&output.log);
        let report = self.mapper.resolve(
            diagnostics,
            &concatenation.boundaries,
            &concatenation.paths,
        );
        let success = output.success && output.handle.is_some() && !report.has_errors();
        if !success {
            log::debug!(
                "{} stage of '{}' failed: {} errors, {} warnings",
                kind,
                self.name,
                report.error_count(),
                report.warning_count()
            );
        }

        let slot = &mut self.stages[index];
        slot.assembler.apply_markers(&report);
        let revision = slot.assembler.revision();
        let previous = slot.compiled.take().and_then(|c| c.handle);
        slot.compiled = Some(CompiledStage {
            handle: output.handle,
            result: StageReport {
                concatenation,
                success,
                log: output.log,
                report,
                revision,
            },
        });
        if let Some(previous) = previous {
            self.compiler.release_stage(previous);
        }

        self.state = ProgramState::Compiled(kind);
        Ok(success)
    }

    /// Compile every stage in pipeline order. Returns `true` if all compiled cleanly.
    pub fn compile_all(&mut self) -> Result<bool, AssemblyError> {
        let kinds: Vec<StageKind> = self.stage_kinds().collect();
        let mut all = true;
        for kind in kinds {
            all &= self.compile(kind)?;
        }
        Ok(all)
    }

    /// Returns `true` if `kind` was modified after its last compile, or never compiled.
    pub fn is_stale(&self, kind: StageKind) -> bool {
        self.stages
            .iter()
            .find(|s| s.assembler.kind() == kind)
            .is_none_or(StageSlot::is_stale)
    }

    /// Link the latest compiles of every stage.
    pub fn link(&mut self) -> Result<(), LinkError> {
        self.drop_link();

        let precondition = self.stages.iter().find_map(|slot| {
            let kind = slot.assembler.kind();
            if slot.is_stale() {
                return Some(LinkError::StageNotCompiled(kind));
            }
            match &slot.compiled {
                Some(c) if c.result.success && c.handle.is_some() => None,
                _ => Some(LinkError::StageFailed(kind)),
            }
        });
        if let Some(err) = precondition {
            log::debug!("cannot link '{}': {err}", self.name);
            self.state = ProgramState::LinkFailed;
            return Err(err);
        }

        self.state = ProgramState::Linking;
        let handles: Vec<&C::Stage> = self
            .stages
            .iter()
            .filter_map(|s| s.compiled.as_ref()?.handle.as_ref())
            .collect();
        let output = self.compiler.link_program(&handles);

        self.link_diagnostics = self.parser.parse(&output.log);
        self.link_log = output.log;
        let fatal = self.link_diagnostics.iter().any(Diagnostic::is_error);

        match output.program {
            Some(program) if output.success && !fatal => {
                log::info!("linked program '{}'", self.name);
                self.program = Some(program);
                self.state = ProgramState::Linked;
                Ok(())
            }
            program => {
                if let Some(program) = program {
                    self.compiler.release_program(program);
                }
                log::debug!("link of '{}' failed", self.name);
                self.state = ProgramState::LinkFailed;
                Err(LinkError::Rejected {
                    log: self.link_log.clone(),
                })
            }
        }
    }

    /// Push a uniform to the linked program.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), AssemblyError> {
        let Some(program) = self.program.as_ref().filter(|_| self.is_linked()) else {
            return Err(AssemblyError::NotLinked);
        };
        if self.compiler.set_uniform(program, name, &value) {
            Ok(())
        } else {
            Err(AssemblyError::UniformNotFound(name.to_string()))
        }
    }

    /// The last compile of `kind`.
    pub fn stage_report(&self, kind: StageKind) -> Option<&StageReport> {
        self.stages
            .iter()
            .find(|s| s.assembler.kind() == kind)?
            .compiled
            .as_ref()
            .map(|c| &c.result)
    }

    /// Raw log of the last link attempt.
    pub fn link_log(&self) -> &str {
        &self.link_log
    }

    /// Parsed diagnostics of the last link attempt.
    pub fn link_diagnostics(&self) -> &[Diagnostic] {
        &self.link_diagnostics
    }

    /// All raw logs (stages in pipeline order, then link), each under a `[tag]` header.
    pub fn raw_log(&self) -> String {
        let mut out = String::new();
        let sections = self
            .stages
            .iter()
            .filter_map(|s| {
                let compiled = s.compiled.as_ref()?;
                Some((s.assembler.kind().tag(), compiled.result.log.as_str()))
            })
            .chain(std::iter::once(("link", self.link_log.as_str())));
        for (tag, log) in sections {
            if log.trim().is_empty() {
                continue;
            }
            out.push_str(&format!("[{tag}]\n{log}"));
            if !log.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }

    /// Every diagnostic of the last compiles and link, in pipeline then encounter order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.stages
            .iter()
            .filter_map(|s| s.compiled.as_ref())
            .flat_map(|c| c.result.report.diagnostics())
            .chain(self.link_diagnostics.iter())
    }

    /// Release every driver object held by this program.
    pub fn release(&mut self) {
        self.drop_link();
        for slot in &mut self.stages {
            if let Some(handle) = slot.compiled.as_mut().and_then(|c| c.handle.take()) {
                self.compiler.release_stage(handle);
            }
        }
    }

    fn drop_link(&mut self) {
        if let Some(program) = self.program.take() {
            self.compiler.release_program(program);
        }
        self.link_log.clear();
        self.link_diagnostics.clear();
        if self.state == ProgramState::Linked {
            self.state = ProgramState::Uninitialized;
        }
    }
}

impl<C: GpuCompiler> Drop for ProgramAssembly<C> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<C: GpuCompiler> fmt::Debug for ProgramAssembly<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramAssembly")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("state", &self.state)
            .field(
                "stages",
                &self.stages.iter().map(|s| &s.assembler).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
