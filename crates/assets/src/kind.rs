use crate::error::AssetError;
use crate::format::VertexFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies one kind of geometry. Each kind uploads to at most one GPU buffer.
///
/// The textual form is the kind's name: `cube`, `skybox`, `advanced_skybox`,
/// or the catalog name of an external model such as `eiffel`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MeshKind {
    /// Textured unit cube with per-face normals.
    Cube,
    /// Inward-facing cube for the classic skybox.
    Skybox,
    /// Single clip-space triangle covering the screen at the far plane.
    AdvancedSkybox,
    /// External model resolved through the [`ModelCatalog`](crate::ModelCatalog).
    Model(String),
}

impl MeshKind {
    pub fn model(name: impl Into<String>) -> Self {
        Self::Model(name.into())
    }

    pub fn vertex_format(&self) -> VertexFormat {
        match self {
            Self::Cube | Self::Model(_) => VertexFormat::TEXTURED_LIT,
            Self::Skybox | Self::AdvancedSkybox => VertexFormat::POSITION_ONLY,
        }
    }

    pub fn is_skybox(&self) -> bool {
        matches!(self, Self::Skybox | Self::AdvancedSkybox)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Cube => "cube",
            Self::Skybox => "skybox",
            Self::AdvancedSkybox => "advanced_skybox",
            Self::Model(name) => name,
        }
    }
}

impl fmt::Display for MeshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MeshKind {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cube" => Ok(Self::Cube),
            "skybox" => Ok(Self::Skybox),
            "advanced_skybox" => Ok(Self::AdvancedSkybox),
            name if !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') =>
            {
                Ok(Self::Model(name.to_string()))
            }
            other => Err(AssetError::InvalidMeshKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for MeshKind {
    type Error = AssetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MeshKind> for String {
    fn from(kind: MeshKind) -> Self {
        kind.name().to_string()
    }
}
