use crate::backend::GpuError;
use skyview_assets::AssetError;

/// Errors from building or drawing the scene.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("shader program {program} failed to compile: {message}")]
    ShaderCompile { program: String, message: String },
    #[error("cannot bind mesh {mesh} to program {program}: {reason}")]
    AttributeBind {
        program: String,
        mesh: String,
        reason: String,
    },
    #[error("unknown shader program: {0}")]
    UnknownProgram(String),
    #[error("program {program} samples a {expected} texture but {texture} is {actual}")]
    TextureMismatch {
        program: String,
        texture: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("{cache} cache used after release")]
    Released { cache: &'static str },
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

impl RenderError {
    /// True for failures caused by a missing or broken asset file, which a
    /// scene may choose to skip instead of aborting.
    pub fn is_asset_error(&self) -> bool {
        matches!(self, Self::Asset(_))
    }
}

/// Errors from reading a viewer configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
