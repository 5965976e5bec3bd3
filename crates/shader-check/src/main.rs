//! shader-check - headless front end for `shader-core`
//!
//! # Usage
//!
//! ```bash
//! shader-check concat <manifest.yaml> <stage>
//! shader-check map <manifest.yaml> <stage> <compiler-log> [--json]
//! shader-check list <manifest.yaml> <stage>
//! ```
//!
//! The manifest's `directory` and every fragment path are resolved relative to the manifest
//! file. `map` exits with status 1 when the log contains an error diagnostic; usage and I/O
//! problems exit with status 2. Set `RUST_LOG=debug` for pipeline logs.

use shader_core::{
    BackingStore, DiagnosticEntry, DiagnosticMapper, FsStore, ManifestError, ProgramManifest,
    StageKind, StoreError, UnknownStage,
};
use std::env;
use std::path::Path;
use std::process;
use thiserror::Error;

const USAGE: &str = "usage:
  shader-check concat <manifest.yaml> <stage>
  shader-check map <manifest.yaml> <stage> <compiler-log> [--json]
  shader-check list <manifest.yaml> <stage>";

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Stage(#[from] UnknownStage),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot encode report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Concat {
        manifest: String,
        stage: StageKind,
    },
    Map {
        manifest: String,
        stage: StageKind,
        log: String,
        json: bool,
    },
    List {
        manifest: String,
        stage: StageKind,
    },
}

fn parse_args(args: &[String]) -> Result<Command, CliError> {
    let json = args.iter().any(|a| a == "--json");
    let positional: Vec<&str> = args
        .iter()
        .skip(1)
        .map(String::as_str)
        .filter(|a| *a != "--json")
        .collect();

    match positional.as_slice() {
        ["concat", manifest, stage] => Ok(Command::Concat {
            manifest: manifest.to_string(),
            stage: stage.parse()?,
        }),
        ["map", manifest, stage, log] => Ok(Command::Map {
            manifest: manifest.to_string(),
            stage: stage.parse()?,
            log: log.to_string(),
            json,
        }),
        ["list", manifest, stage] => Ok(Command::List {
            manifest: manifest.to_string(),
            stage: stage.parse()?,
        }),
        [] => Err(CliError::Usage("missing command".to_string())),
        [command, ..] => Err(CliError::Usage(format!(
            "unknown command or wrong arguments for '{command}'"
        ))),
    }
}

/// Open a manifest; returns it together with a store rooted at its directory.
fn open_manifest(path: &str) -> Result<(ProgramManifest, FsStore), CliError> {
    let path = Path::new(path);
    let root = path.parent().unwrap_or(Path::new(""));
    let store = FsStore::new(root);
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::Usage(format!("not a file: {}", path.display())))?;
    let manifest = ProgramManifest::load_from_store(&store, &file)?;
    log::debug!("loaded manifest '{}' ({:?})", manifest.name, manifest.shape);
    Ok((manifest, store))
}

/// Run a command. Returns `true` if the output contains error diagnostics.
fn run(command: Command) -> Result<bool, CliError> {
    match command {
        Command::Concat { manifest, stage } => {
            let (manifest, store) = open_manifest(&manifest)?;
            let mut assembler = manifest.stage_assembler(&store, stage)?;
            print!("{}", assembler.concatenate().blob);
            Ok(false)
        }
        Command::Map {
            manifest,
            stage,
            log,
            json,
        } => {
            let (manifest, store) = open_manifest(&manifest)?;
            let raw = FsStore::current_dir().read(&log)?;

            let mut assembler = manifest.stage_assembler(&store, stage)?;
            let blob = assembler.concatenate();
            let diagnostics = manifest.parser()?.parse(&raw);
            let report = DiagnosticMapper::new().resolve(diagnostics, &blob.boundaries, &blob.paths);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for entry in report.entries() {
                    match entry {
                        DiagnosticEntry::Mapped(mapped) if mapped.on_marker => {
                            println!("{} (on fragment marker)", mapped.diagnostic);
                        }
                        entry => println!("{}", entry.diagnostic()),
                    }
                }
                eprintln!(
                    "{} errors, {} warnings",
                    report.error_count(),
                    report.warning_count()
                );
            }
            Ok(report.has_errors())
        }
        Command::List { manifest, stage } => {
            let (manifest, store) = open_manifest(&manifest)?;
            let extensions = shader_core::shader_core_lang::ShaderLanguage::glsl()
                .source_extensions(stage.extension());
            let root = if manifest.directory.is_empty() {
                "."
            } else {
                manifest.directory.as_str()
            };
            for entry in store.list(root, &extensions)? {
                let indent = "  ".repeat(entry.depth.saturating_sub(1));
                let suffix = if entry.is_dir { "/" } else { "" };
                println!("{indent}{}{suffix}", entry.name());
            }
            Ok(false)
        }
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("shader-check: {err}");
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    match run(command) {
        Ok(false) => {}
        Ok(true) => process::exit(1),
        Err(err) => {
            eprintln!("shader-check: {err}");
            process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("shader-check")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_args(&args(&["map", "demo.yaml", "frag", "log.txt", "--json"])).unwrap(),
            Command::Map {
                manifest: "demo.yaml".to_string(),
                stage: StageKind::Fragment,
                log: "log.txt".to_string(),
                json: true,
            }
        );
        assert_eq!(
            parse_args(&args(&["concat", "demo.yaml", "vertex"])).unwrap(),
            Command::Concat {
                manifest: "demo.yaml".to_string(),
                stage: StageKind::Vertex,
            }
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(parse_args(&args(&[])), Err(CliError::Usage(_))));
        assert!(matches!(
            parse_args(&args(&["concat", "demo.yaml"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&args(&["list", "demo.yaml", "pixel"])),
            Err(CliError::Stage(_))
        ));
    }

    #[test]
    fn maps_a_log_end_to_end() {
        let dir = std::env::temp_dir().join(format!("shader-check-{}", process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("shaders")).unwrap();
        std::fs::write(
            dir.join("demo.yaml"),
            "name: demo\ndirectory: shaders\nshape: compute\nstages:\n  compute: [a.glsl, b.comp]\n",
        )
        .unwrap();
        std::fs::write(dir.join("shaders/a.glsl"), "#version 430\n").unwrap();
        std::fs::write(dir.join("shaders/b.comp"), "void main() {\n  oops;\n}\n").unwrap();
        std::fs::write(dir.join("log.txt"), "ERROR: 5:3: 'oops' : undeclared identifier\n")
            .unwrap();

        let manifest = dir.join("demo.yaml").to_string_lossy().into_owned();
        let log = dir.join("log.txt").to_string_lossy().into_owned();
        let found_errors = run(Command::Map {
            manifest: manifest.clone(),
            stage: StageKind::Compute,
            log,
            json: true,
        })
        .unwrap();
        assert!(found_errors);

        assert!(!run(Command::List {
            manifest,
            stage: StageKind::Compute
        })
        .unwrap());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
