use pretty_assertions::assert_eq;
use shader_core::{
    Concatenation, DiagnosticEntry, DiagnosticMapper, DiagnosticParser, DiagnosticSeverity,
    EditableFragment, ErrorMarkers, PlainFragment, StageAssembler, StageKind,
};

// Fragment 0 has four lines, fragment 1 five: markers at 1 and 6, bodies 2..=5 and 7..=11.
fn stage() -> (StageAssembler, Concatenation) {
    let mut stage = StageAssembler::new(StageKind::Fragment);
    stage.append(Box::new(EditableFragment::from_code(
        "lib/common.glsl",
        "#version 330\nuniform float t;\nuniform vec2 res;\nout vec4 color;\n",
    )));
    stage.append(Box::new(EditableFragment::from_code(
        "demo.frag",
        "void main() {\n  vec2 uv = gl_FragCoord.xy / res;\n  color = vec4(uv, x, 1.0);\n}\n\n",
    )));
    let blob = stage.concatenate();
    (stage, blob)
}

fn resolve(blob: &Concatenation, log: &str) -> shader_core::DiagnosticReport {
    let diagnostics = DiagnosticParser::new().parse(log);
    DiagnosticMapper::new().resolve(diagnostics, &blob.boundaries, &blob.paths)
}

#[test]
fn test_third_body_line_of_second_fragment() {
    let (_, blob) = stage();
    assert_eq!(blob.boundaries.entries(), &[1, 2, 6, 7]);

    let global = blob.boundaries.entries()[3] + 2;
    let report = resolve(&blob, &format!("ERROR: {global}:17: 'x' : undeclared identifier"));

    assert_eq!(report.len(), 1);
    let mapped = &report.for_fragment(1)[0];
    assert_eq!(mapped.fragment, 1);
    assert_eq!(mapped.global_line, 9);
    assert!(!mapped.on_marker);
    assert_eq!(mapped.diagnostic.line, Some(3));
    assert_eq!(mapped.diagnostic.column, Some(17));
    assert_eq!(mapped.diagnostic.path.as_deref(), Some("demo.frag"));
    assert!(report.for_fragment(0).is_empty());
}

#[test]
fn test_first_and_last_lines_of_a_fragment() {
    let (_, blob) = stage();
    let report = resolve(&blob, "ERROR: 2:1: first\nERROR: 5:1: last\nERROR: 11:1: tail");

    let fragment0: Vec<Option<usize>> = report
        .for_fragment(0)
        .iter()
        .map(|m| m.diagnostic.line)
        .collect();
    assert_eq!(fragment0, vec![Some(1), Some(4)]);
    assert_eq!(report.for_fragment(1)[0].diagnostic.line, Some(5));
}

#[test]
fn test_marker_line_diagnostics_are_flagged() {
    let (mut stage, blob) = stage();
    let report = resolve(&blob, "ERROR: 6:1: unexpected token");

    let mapped = &report.for_fragment(1)[0];
    assert!(mapped.on_marker);
    assert_eq!(mapped.diagnostic.line, Some(1));

    // Visible on the blob, but there is no fragment line to annotate.
    assert_eq!(report.blob_markers().get(&6).map(String::as_str), Some("unexpected token"));
    assert!(report.fragment_markers(1).is_empty());

    stage.apply_markers(&report);
    assert_eq!(stage.fragment(1).unwrap().error_markers(), Some(&ErrorMarkers::new()));
}

#[test]
fn test_nvidia_paths_are_replaced_by_fragment_paths() {
    let (_, blob) = stage();
    let report = resolve(&blob, "0(3) : error C1503: undefined variable \"t\"");

    let mapped = &report.for_fragment(0)[0];
    assert_eq!(mapped.diagnostic.path.as_deref(), Some("lib/common.glsl"));
    assert_eq!(mapped.diagnostic.line, Some(2));
    assert_eq!(mapped.diagnostic.code, Some(1503));
}

#[test]
fn test_unmappable_diagnostics_are_kept() {
    let (_, blob) = stage();
    let report = resolve(&blob, "ERROR: 100:1: past the end\nlinker gibberish\nERROR: 0:0: before");

    assert_eq!(report.len(), 3);
    assert!(report.groups().is_empty());
    let unmapped: Vec<&str> = report.unmapped().map(|d| d.message.as_str()).collect();
    assert_eq!(unmapped, vec!["past the end", "linker gibberish", "before"]);
    assert_eq!(report.error_count(), 2);
    assert!(report.blob_markers().is_empty());
    assert!(matches!(report.entries()[1], DiagnosticEntry::Unmapped(_)));
}

#[test]
fn test_groups_follow_first_encounter() {
    let (_, blob) = stage();
    let report = resolve(
        &blob,
        "WARNING: 8:1: unused\nERROR: 3:1: redefinition\nERROR: 9:1: type mismatch",
    );

    let order: Vec<(usize, &str, usize)> = report
        .groups()
        .iter()
        .map(|g| (g.fragment, g.path.as_str(), g.diagnostics.len()))
        .collect();
    assert_eq!(order, vec![(1, "demo.frag", 2), (0, "lib/common.glsl", 1)]);

    let severities: Vec<DiagnosticSeverity> =
        report.diagnostics().map(|d| d.severity).collect();
    assert_eq!(
        severities,
        vec![
            DiagnosticSeverity::Warning,
            DiagnosticSeverity::Error,
            DiagnosticSeverity::Error
        ]
    );
    assert_eq!(report.warning_count(), 1);
    assert!(report.has_errors());
}

#[test]
fn test_markers_keep_first_error_per_line() {
    let (mut stage, blob) = stage();
    let report = resolve(
        &blob,
        "ERROR: 9:5: first\nERROR: 9:9: second\nWARNING: 10:1: only a warning",
    );

    let mut expected = ErrorMarkers::new();
    expected.insert(3, "first".to_string());
    assert_eq!(report.fragment_markers(1), expected);
    assert_eq!(report.blob_markers().len(), 1);
    assert_eq!(report.blob_markers()[&9], "first");

    stage.apply_markers(&report);
    assert_eq!(stage.fragment(1).unwrap().error_markers(), Some(&expected));
    assert_eq!(stage.fragment(0).unwrap().error_markers(), Some(&ErrorMarkers::new()));
}

#[test]
fn test_plain_fragments_ignore_markers() {
    let mut stage = StageAssembler::new(StageKind::Vertex);
    stage.append(Box::new(PlainFragment::from_code("a.vert", "void main() {}\n")));
    let blob = stage.concatenate();

    let report = resolve(&blob, "ERROR: 2:1: boom");
    assert_eq!(report.fragment_markers(0).len(), 1);
    stage.apply_markers(&report);
    assert!(stage.fragment(0).unwrap().error_markers().is_none());
}

#[test]
fn test_stale_report_is_not_applied() {
    let (mut stage, blob) = stage();
    let report = resolve(&blob, "ERROR: 3:1: boom");
    stage.pop();

    stage.apply_markers(&report);
    assert_eq!(stage.fragment(0).unwrap().error_markers(), Some(&ErrorMarkers::new()));
}

#[test]
fn test_resolving_the_same_log_is_idempotent() {
    let (_, blob) = stage();
    let log = "ERROR: 9:1: a\nWARNING: 3:2: b\nnoise";
    assert_eq!(resolve(&blob, log), resolve(&blob, log));
}
