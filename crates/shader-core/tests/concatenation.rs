use pretty_assertions::assert_eq;
use shader_core::shader_core_lang::{CommentConfig, ShaderLanguage};
use shader_core::{
    AssemblyError, EditableFragment, PlainFragment, SourceFragment, StageAssembler, StageKind,
};

fn fragment(path: &str, code: &str) -> Box<dyn SourceFragment> {
    Box::new(EditableFragment::from_code(path, code))
}

fn three_fragment_stage() -> StageAssembler {
    let mut stage = StageAssembler::new(StageKind::Fragment);
    stage.append(fragment(
        "shaders/common.glsl",
        "#version 330\nuniform float t;\n",
    ));
    stage.append(fragment(
        "shaders/noise.glsl",
        "float noise(vec2 p) {\n  return 0.0;\n}",
    ));
    stage.append(fragment("shaders/main.frag", ""));
    stage
}

#[test]
fn test_boundaries_have_two_increasing_entries_per_fragment() {
    let mut stage = three_fragment_stage();
    let blob = stage.concatenate();

    assert_eq!(blob.boundaries.len(), 6);
    assert_eq!(blob.boundaries.fragment_count(), 3);
    assert!(blob.boundaries.entries().windows(2).all(|w| w[0] < w[1]));
    assert_eq!(blob.boundaries.entries(), &[1, 2, 4, 5, 8, 9]);
    assert_eq!(blob.boundaries.total_lines(), 9);
    assert_eq!(blob.blob.lines().count(), 9);
    assert_eq!(
        blob.paths,
        vec![
            "shaders/common.glsl".to_string(),
            "shaders/noise.glsl".to_string(),
            "shaders/main.frag".to_string(),
        ]
    );
}

#[test]
fn test_blob_layout() {
    let mut stage = three_fragment_stage();
    let blob = stage.concatenate();

    let expected = "\
// [0] shaders/common.glsl
#version 330
uniform float t;
// [1] shaders/noise.glsl
float noise(vec2 p) {
  return 0.0;
}
// [2] shaders/main.frag

";
    assert_eq!(blob.blob, expected);
    assert_eq!(blob.stage, StageKind::Fragment);

    let lines: Vec<&str> = blob.blob.lines().collect();
    for fragment in 0..3 {
        let marker = blob.boundaries.marker_line(fragment).unwrap();
        assert!(lines[marker - 1].starts_with(&format!("// [{fragment}]")));
    }
    assert_eq!(blob.boundaries.body_lines(1), Some(5..=7));
    assert_eq!(blob.boundaries.body_lines(2), Some(9..=9));

    assert_eq!(blob.boundaries.marker_line(3), None);
    assert_eq!(blob.boundaries.body_lines(3), None);
    assert_eq!(blob.boundaries.marker_line(usize::MAX), None);
    assert_eq!(blob.boundaries.body_lines(usize::MAX), None);
}

#[test]
fn test_mutation_invalidates_boundaries() {
    let mut stage = three_fragment_stage();
    assert!(stage.boundaries().is_none());

    let blob = stage.concatenate();
    assert_eq!(stage.boundaries(), Some(&blob.boundaries));
    let revision = stage.revision();

    // Concatenating again is not a mutation.
    let again = stage.concatenate();
    assert_eq!(again, blob);
    assert_eq!(stage.revision(), revision);

    stage
        .fragment_mut(1)
        .unwrap()
        .set_code("float noise(vec2 p) { return 1.0; }\n".to_string());
    assert!(stage.boundaries().is_none());
    assert_ne!(stage.revision(), revision);

    let edited = stage.concatenate();
    assert_eq!(edited.boundaries.entries(), &[1, 2, 4, 5, 6, 7]);
}

#[test]
fn test_reorder_bounds_are_no_ops() {
    let mut stage = three_fragment_stage();
    let before = stage.paths();
    let revision = stage.revision();

    assert!(!stage.move_up(0));
    assert!(!stage.move_down(2));
    assert!(!stage.move_down(7));
    assert!(!stage.move_up(3));
    assert!(!stage.move_up(usize::MAX));
    assert!(!stage.move_down(usize::MAX));
    assert_eq!(stage.paths(), before);
    assert_eq!(stage.revision(), revision);

    assert!(stage.move_down(0));
    assert_eq!(
        stage.paths(),
        vec!["shaders/noise.glsl", "shaders/common.glsl", "shaders/main.frag"]
    );
    assert!(stage.move_up(2));
    assert_eq!(
        stage.paths(),
        vec!["shaders/noise.glsl", "shaders/main.frag", "shaders/common.glsl"]
    );
}

#[test]
fn test_duplicate_paths() {
    let mut stage = StageAssembler::new(StageKind::Vertex);
    stage.append(fragment("common.glsl", "float a;\n"));
    stage.append(fragment("main.vert", "void main() {}\n"));

    let err = stage
        .append_unique(fragment("common.glsl", "float b;\n"))
        .unwrap_err();
    assert!(matches!(err, AssemblyError::DuplicateFragment(path) if path == "common.glsl"));
    assert_eq!(stage.len(), 2);

    // Plain append keeps every occurrence; each one gets its own boundaries.
    stage.append(fragment("common.glsl", "float b;\n"));
    let blob = stage.concatenate();
    assert_eq!(blob.boundaries.fragment_count(), 3);
    assert_eq!(stage.position_of("common.glsl"), Some(0));
    let main = stage.fragment_for_path("main.vert").unwrap();
    assert_eq!((main.filename(), main.extension()), ("main", ".vert"));
    assert_eq!(blob.paths[2], "common.glsl");
}

#[test]
fn test_remove_pop_clear() {
    let mut stage = three_fragment_stage();

    let removed = stage.remove(1).unwrap();
    assert_eq!(removed.path(), "shaders/noise.glsl");
    assert!(stage.remove(5).is_none());
    assert!(!stage.contains_path("shaders/noise.glsl"));

    let popped = stage.pop().unwrap();
    assert_eq!(popped.path(), "shaders/main.frag");
    assert_eq!(stage.len(), 1);

    stage.clear();
    assert!(stage.is_empty());
    assert!(stage.pop().is_none());
    assert!(!stage.move_down(0));

    let blob = stage.concatenate();
    assert!(blob.boundaries.is_empty());
    assert_eq!(blob.boundaries.total_lines(), 0);
    assert_eq!(blob.blob, "");
}

#[test]
fn test_plain_and_editable_fragments_concatenate_alike() {
    let mut stage = StageAssembler::new(StageKind::Compute);
    stage.append(Box::new(PlainFragment::from_code("a.glsl", "x\r\ny\r\n")));
    stage.append(fragment("b.comp", "z"));

    let blob = stage.concatenate();
    assert_eq!(blob.boundaries.entries(), &[1, 2, 4, 5]);
    assert_eq!(blob.boundaries.total_lines(), 5);
    assert!(blob.blob.ends_with("// [1] b.comp\nz\n"));
}

#[test]
fn test_line_comment_only_language_markers() {
    let language = ShaderLanguage {
        name: "preprocessed".to_string(),
        comments: CommentConfig::line("#"),
        shared_extensions: vec![".inc".to_string()],
    };
    let mut stage = StageAssembler::with_language(StageKind::Vertex, language);
    stage.append(fragment("lib.inc", "a\n"));
    stage.append(fragment("main.vert", "b\nc\n"));

    let blob = stage.concatenate();
    assert_eq!(blob.blob, "# [0] lib.inc\na\n# [1] main.vert\nb\nc\n");
    assert_eq!(blob.boundaries.entries(), &[1, 2, 3, 4]);
    assert_eq!(
        stage.language().source_extensions(StageKind::Vertex.extension()),
        vec![".inc", ".vert"]
    );
}
