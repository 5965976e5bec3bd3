use pretty_assertions::assert_eq;
use shader_core::{
    AssemblyError, CompileOutput, EditableFragment, GpuCompiler, LinkError, LinkOutput,
    ProgramAssembly, ProgramShape, ProgramState, StageKind, UniformValue,
};
use std::collections::BTreeMap;

/// A compiler that rejects any blob containing `#error <message>` and reports it on the right
/// blob line, Intel style.
#[derive(Debug, Default)]
struct FakeCompiler {
    next_handle: u32,
    live_stages: Vec<u32>,
    released_programs: Vec<u32>,
    uniforms: BTreeMap<String, UniformValue>,
    link_log: Option<String>,
    compiled_sources: Vec<(StageKind, String)>,
}

impl FakeCompiler {
    fn handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GpuCompiler for FakeCompiler {
    type Stage = u32;
    type Program = u32;

    fn compile_stage(&mut self, kind: StageKind, source: &str) -> CompileOutput<u32> {
        self.compiled_sources.push((kind, source.to_string()));
        let mut log = String::new();
        for (index, line) in source.lines().enumerate() {
            if let Some(message) = line.trim().strip_prefix("#error ") {
                log.push_str(&format!("ERROR: {}:1: {message}\n", index + 1));
            }
        }
        let handle = self.handle();
        self.live_stages.push(handle);
        CompileOutput {
            handle: Some(handle),
            success: log.is_empty(),
            log,
        }
    }

    fn link_program(&mut self, stages: &[&u32]) -> LinkOutput<u32> {
        assert!(stages.iter().all(|s| self.live_stages.contains(*s)));
        match self.link_log.clone() {
            Some(log) => LinkOutput {
                program: None,
                success: false,
                log,
            },
            None => LinkOutput {
                program: Some(self.handle()),
                success: true,
                log: String::new(),
            },
        }
    }

    fn set_uniform(&mut self, _program: &u32, name: &str, value: &UniformValue) -> bool {
        if name.starts_with("u_") {
            self.uniforms.insert(name.to_string(), *value);
            true
        } else {
            false
        }
    }

    fn release_stage(&mut self, stage: u32) {
        self.live_stages.retain(|&s| s != stage);
    }

    fn release_program(&mut self, program: u32) {
        self.released_programs.push(program);
    }
}

fn program() -> ProgramAssembly<FakeCompiler> {
    let mut program = ProgramAssembly::new(
        "demo",
        ProgramShape::VertexFragment,
        FakeCompiler::default(),
    );
    program
        .add_stage(
            StageKind::Vertex,
            Box::new(EditableFragment::from_code("demo.vert", "void main() {}\n")),
        )
        .unwrap();
    program
        .add_stage(
            StageKind::Fragment,
            Box::new(EditableFragment::from_code(
                "common.glsl",
                "#version 330\nout vec4 color;\n",
            )),
        )
        .unwrap();
    program
        .add_stage(
            StageKind::Fragment,
            Box::new(EditableFragment::from_code(
                "demo.frag",
                "void main() {\n  color = vec4(1.0);\n}\n",
            )),
        )
        .unwrap();
    program
}

fn break_fragment_stage(program: &mut ProgramAssembly<FakeCompiler>) {
    program
        .stage_mut(StageKind::Fragment)
        .unwrap()
        .fragment_mut(1)
        .unwrap()
        .set_code("void main() {\n  #error missing semicolon\n}\n".to_string());
}

#[test]
fn test_compile_and_link() {
    let mut program = program();
    assert_eq!(program.state(), ProgramState::Uninitialized);
    assert_eq!(
        program.stage_kinds().collect::<Vec<_>>(),
        vec![StageKind::Vertex, StageKind::Fragment]
    );

    assert!(program.compile_all().unwrap());
    assert_eq!(program.state(), ProgramState::Compiled(StageKind::Fragment));

    program.link().unwrap();
    assert!(program.is_linked());
    assert_eq!(program.program(), Some(&3));
    assert!(program.diagnostics().next().is_none());
    assert_eq!(program.raw_log(), "");

    let (kind, blob) = &program.compiler().compiled_sources[1];
    assert_eq!(*kind, StageKind::Fragment);
    assert!(blob.starts_with("// [0] common.glsl\n#version 330\n"));
}

#[test]
fn test_link_before_compile_fails() {
    let mut program = program();
    assert_eq!(
        program.link(),
        Err(LinkError::StageNotCompiled(StageKind::Vertex))
    );
    assert!(!program.is_linked());

    program.compile(StageKind::Vertex).unwrap();
    assert_eq!(
        program.link(),
        Err(LinkError::StageNotCompiled(StageKind::Fragment))
    );
    assert_eq!(program.state(), ProgramState::LinkFailed);
}

#[test]
fn test_compile_errors_map_to_fragments() {
    let mut program = program();
    break_fragment_stage(&mut program);

    assert!(program.compile(StageKind::Vertex).unwrap());
    assert!(!program.compile(StageKind::Fragment).unwrap());

    let report = program.stage_report(StageKind::Fragment).unwrap();
    assert!(!report.success);
    assert_eq!(report.log, "ERROR: 6:1: missing semicolon\n");
    let mapped = &report.report.for_fragment(1)[0];
    assert_eq!(mapped.diagnostic.line, Some(2));
    assert_eq!(mapped.diagnostic.path.as_deref(), Some("demo.frag"));

    let stage = program.stage(StageKind::Fragment).unwrap();
    let markers = stage.fragment(1).unwrap().error_markers().unwrap();
    assert_eq!(markers.get(&2).map(String::as_str), Some("missing semicolon"));

    assert_eq!(
        program.link(),
        Err(LinkError::StageFailed(StageKind::Fragment))
    );
    assert_eq!(
        program.raw_log(),
        "[frag]\nERROR: 6:1: missing semicolon\n"
    );
    assert_eq!(program.diagnostics().count(), 1);
}

#[test]
fn test_recompiling_unchanged_stage_is_idempotent() {
    let mut program = program();
    break_fragment_stage(&mut program);

    program.compile(StageKind::Fragment).unwrap();
    let first = program.stage_report(StageKind::Fragment).unwrap().clone();
    program.compile(StageKind::Fragment).unwrap();
    let second = program.stage_report(StageKind::Fragment).unwrap();

    assert_eq!(first.report, second.report);
    assert_eq!(first.concatenation, second.concatenation);
    // The replaced stage object was released.
    assert_eq!(program.compiler().live_stages, vec![2]);
}

#[test]
fn test_recompile_drops_the_link() {
    let mut program = program();
    program.compile_all().unwrap();
    program.link().unwrap();
    let linked = *program.program().unwrap();

    program.compile(StageKind::Vertex).unwrap();
    assert!(!program.is_linked());
    assert!(program.program().is_none());
    assert_eq!(program.compiler().released_programs, vec![linked]);
    assert!(matches!(
        program.set_uniform("u_time", UniformValue::Float(1.0)),
        Err(AssemblyError::NotLinked)
    ));

    program.link().unwrap();
    assert!(program.is_linked());
}

#[test]
fn test_edits_after_compile_make_the_stage_stale() {
    let mut program = program();
    program.compile_all().unwrap();
    assert!(!program.is_stale(StageKind::Fragment));

    program
        .stage_mut(StageKind::Fragment)
        .unwrap()
        .move_down(0);
    assert!(program.is_stale(StageKind::Fragment));
    assert_eq!(
        program.link(),
        Err(LinkError::StageNotCompiled(StageKind::Fragment))
    );

    // Swapping in a fresh assembler never reuses an old revision.
    program.compile(StageKind::Fragment).unwrap();
    let stage = program.stage_mut(StageKind::Fragment).unwrap();
    let fragments: Vec<_> = std::iter::from_fn(|| stage.pop()).collect();
    let mut replacement = shader_core::StageAssembler::new(StageKind::Fragment);
    for fragment in fragments.into_iter().rev() {
        replacement.append(fragment);
    }
    *stage = replacement;
    assert!(program.is_stale(StageKind::Fragment));
}

#[test]
fn test_link_rejection_is_reported() {
    let mut program = program();
    program.compile_all().unwrap();
    program.compiler_mut().link_log =
        Some("ERROR: Linking fragment shader: 'color' not written\n".to_string());

    let err = program.link().unwrap_err();
    assert!(matches!(err, LinkError::Rejected { ref log } if log.contains("not written")));
    assert_eq!(program.state(), ProgramState::LinkFailed);
    assert_eq!(program.link_diagnostics().len(), 1);
    assert!(program.raw_log().starts_with("[link]\n"));

    program.compiler_mut().link_log = None;
    program.link().unwrap();
    assert!(program.link_log().is_empty());
}

#[test]
fn test_uniforms_require_a_linked_program() {
    let mut program = program();
    assert!(matches!(
        program.set_uniform("u_time", UniformValue::Float(0.5)),
        Err(AssemblyError::NotLinked)
    ));

    program.compile_all().unwrap();
    program.link().unwrap();
    program
        .set_uniform("u_resolution", UniformValue::Vec2([640.0, 480.0]))
        .unwrap();
    assert!(matches!(
        program.set_uniform("time", UniformValue::Float(0.5)),
        Err(AssemblyError::UniformNotFound(name)) if name == "time"
    ));
    assert_eq!(
        program.compiler().uniforms.get("u_resolution"),
        Some(&UniformValue::Vec2([640.0, 480.0]))
    );
}

#[test]
fn test_stage_errors() {
    let mut program = program();
    assert!(matches!(
        program.compile(StageKind::Geometry),
        Err(AssemblyError::StageNotInProgram(StageKind::Geometry))
    ));
    assert!(matches!(
        program.add_stage(
            StageKind::Compute,
            Box::new(EditableFragment::from_code("a.comp", ""))
        ),
        Err(AssemblyError::StageNotInProgram(StageKind::Compute))
    ));

    program.stage_mut(StageKind::Vertex).unwrap().clear();
    assert!(matches!(
        program.compile(StageKind::Vertex),
        Err(AssemblyError::EmptyStage(StageKind::Vertex))
    ));
}

#[test]
fn test_release_frees_every_handle() {
    let mut program = program();
    program.compile_all().unwrap();
    program.link().unwrap();

    program.release();
    assert!(program.compiler().live_stages.is_empty());
    assert_eq!(program.compiler().released_programs, vec![3]);
    assert!(!program.is_linked());
}
