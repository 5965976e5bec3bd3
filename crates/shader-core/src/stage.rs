//! Shader stages and program shapes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One phase of the programmable pipeline.
///
/// The declaration order is the pipeline order used when compiling or reporting a whole
/// program (`Vertex` first, `Compute` last).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Vertex shader.
    Vertex,
    /// Tessellation control shader.
    TessControl,
    /// Tessellation evaluation shader.
    TessEval,
    /// Geometry shader.
    Geometry,
    /// Fragment shader.
    Fragment,
    /// Compute shader.
    Compute,
}

impl StageKind {
    /// All stage kinds in pipeline order.
    pub const ALL: [StageKind; 6] = [
        StageKind::Vertex,
        StageKind::TessControl,
        StageKind::TessEval,
        StageKind::Geometry,
        StageKind::Fragment,
        StageKind::Compute,
    ];

    /// Short tag used in config file names and log headers (e.g. `"frag"`).
    pub fn tag(self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::TessControl => "tesc",
            Self::TessEval => "tese",
            Self::Geometry => "geom",
            Self::Fragment => "frag",
            Self::Compute => "comp",
        }
    }

    /// Source file extension for stage-specific files, including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vertex => ".vert",
            Self::TessControl => ".tesc",
            Self::TessEval => ".tese",
            Self::Geometry => ".geom",
            Self::Fragment => ".frag",
            Self::Compute => ".comp",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when a string names no known stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown shader stage '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for StageKind {
    type Err = UnknownStage;

    /// Accepts the short tag (`frag`) or the long name (`fragment`, `tess_control`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let kind = match lower.as_str() {
            "vert" | "vertex" => Self::Vertex,
            "tesc" | "tess_control" | "tesscontrol" => Self::TessControl,
            "tese" | "tess_eval" | "tesseval" => Self::TessEval,
            "geom" | "geometry" => Self::Geometry,
            "frag" | "fragment" => Self::Fragment,
            "comp" | "compute" => Self::Compute,
            _ => return Err(UnknownStage(s.to_string())),
        };
        Ok(kind)
    }
}

/// The combination of stages a program is built from.
///
/// Every stage of a shape is mandatory for linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramShape {
    /// Vertex + fragment.
    VertexFragment,
    /// Vertex + geometry + fragment.
    VertexGeometryFragment,
    /// Vertex + tessellation (control and evaluation) + fragment.
    VertexTessFragment,
    /// Vertex + tessellation + geometry + fragment.
    VertexGeometryTessFragment,
    /// A single compute stage.
    Compute,
}

impl ProgramShape {
    /// Stages of this shape, in pipeline order.
    pub fn stages(self) -> &'static [StageKind] {
        use StageKind::*;
        match self {
            Self::VertexFragment => &[Vertex, Fragment],
            Self::VertexGeometryFragment => &[Vertex, Geometry, Fragment],
            Self::VertexTessFragment => &[Vertex, TessControl, TessEval, Fragment],
            Self::VertexGeometryTessFragment => {
                &[Vertex, TessControl, TessEval, Geometry, Fragment]
            }
            Self::Compute => &[Compute],
        }
    }

    /// Returns `true` if `kind` is one of this shape's stages.
    pub fn contains(self, kind: StageKind) -> bool {
        self.stages().contains(&kind)
    }
}
