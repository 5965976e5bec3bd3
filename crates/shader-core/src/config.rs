//! Persisted stage configs.
//!
//! Each (directory, program, stage) triple has one line-oriented text file listing fragment
//! paths in compile order:
//!
//! ```text
//! shaders/demo_frag_shader.config
//! -------------------------------
//! shaders/common/lighting.glsl
//! shaders/demo.frag
//! ```

use crate::error::StoreError;
use crate::stage::StageKind;
use crate::store::BackingStore;

/// Path of the config file for `program_name`'s `kind` stage inside `directory`.
pub fn config_path(directory: &str, program_name: &str, kind: StageKind) -> String {
    let file = format!("{program_name}_{}_shader.config", kind.tag());
    let directory = directory.trim_end_matches('/');
    if directory.is_empty() {
        file
    } else {
        format!("{directory}/{file}")
    }
}

/// Parse config text into fragment paths. Blank lines are skipped; surrounding whitespace and
/// a trailing `\r` are trimmed.
pub fn parse_config(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render fragment paths as config text (one per line, newline-terminated).
pub fn render_config(paths: &[String]) -> String {
    let mut out = String::new();
    for path in paths {
        out.push_str(path);
        out.push('\n');
    }
    out
}

/// Load a stage config. Returns `Ok(None)` if the file does not exist.
pub fn load_stage_config(
    store: &dyn BackingStore,
    directory: &str,
    program_name: &str,
    kind: StageKind,
) -> Result<Option<Vec<String>>, StoreError> {
    let path = config_path(directory, program_name, kind);
    if !store.exists(&path) {
        log::debug!("no stage config at {path}");
        return Ok(None);
    }
    let text = store.read(&path)?;
    Ok(Some(parse_config(&text)))
}

/// Save a stage config, replacing any previous content.
pub fn save_stage_config(
    store: &mut dyn BackingStore,
    directory: &str,
    program_name: &str,
    kind: StageKind,
    paths: &[String],
) -> Result<(), StoreError> {
    let path = config_path(directory, program_name, kind);
    log::debug!("saving {} fragment paths to {path}", paths.len());
    store.write(&path, &render_config(paths))
}
