use crate::error::ConfigError;
use crate::scene::{AssetPolicy, SceneDescription};
use serde::{Deserialize, Serialize};
use skyview_assets::{ModelCatalog, TextureCatalog};
use skyview_common::Light;
use std::path::{Path, PathBuf};

/// Looked up in the working directory when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "skyview.yaml";

/// Window creation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Skyview".into(),
        }
    }
}

/// Initial camera placement and motion tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub yaw_degrees: f32,
    pub pitch_degrees: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// World units per second.
    pub speed: f32,
    /// Degrees per pixel of mouse motion.
    pub sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 4.0],
            yaw_degrees: -90.0,
            pitch_degrees: 0.0,
            fov_degrees: 50.0,
            near: 0.1,
            far: 100.0,
            speed: 5.0,
            sensitivity: 0.04,
        }
    }
}

/// Viewer configuration, usually read from `skyview.yaml`.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub target_fps: u32,
    pub asset_root: PathBuf,
    pub clear_color: [f32; 4],
    pub camera: CameraConfig,
    pub light: Light,
    pub asset_policy: AssetPolicy,
    pub models: ModelCatalog,
    pub textures: TextureCatalog,
    /// Replaces the built-in landmark scene when present.
    pub scene: Option<SceneDescription>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            target_fps: 60,
            asset_root: PathBuf::from("assets"),
            clear_color: [0.08, 0.16, 0.18, 1.0],
            camera: CameraConfig::default(),
            light: Light::default(),
            asset_policy: AssetPolicy::default(),
            models: ModelCatalog::default(),
            textures: TextureCatalog::default(),
            scene: None,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads `path` when given, else `skyview.yaml` in `dir` if present,
    /// else the defaults.
    pub fn resolve(path: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = dir.join(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(&fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// The scene to build: the configured one or the landmark default.
    pub fn scene_description(&self) -> SceneDescription {
        self.scene.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SkyboxStyle;
    use skyview_assets::MeshKind;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.target_fps, 60);
        assert_eq!(config.asset_policy, AssetPolicy::Skip);
        assert!(config.scene.is_none());
        assert!(config.models.resolve("eiffel").is_some());
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(ViewerConfig::from_yaml_str("").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = "target_fps: 30\nwindow:\n  title: Landmarks\ncamera:\n  speed: 12.5\n";
        let config = ViewerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.target_fps, 30);
        assert_eq!(config.window.title, "Landmarks");
        assert_eq!(config.window.width, 800);
        assert_eq!(config.camera.speed, 12.5);
        assert_eq!(config.camera.fov_degrees, 50.0);
    }

    #[test]
    fn scene_from_yaml() {
        let yaml = r#"
asset_policy: abort
scene:
  skybox: advanced
  objects:
    - name: crate
      mesh: cube
      texture: crate
      position: [1.0, 2.0, 3.0]
    - name: tower
      mesh: pisatower
      texture: pisatower
      scale: [0.5, 0.5, 0.5]
"#;
        let config = ViewerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.asset_policy, AssetPolicy::Abort);
        let scene = config.scene_description();
        assert_eq!(scene.skybox, SkyboxStyle::Advanced);
        assert_eq!(scene.objects.len(), 2);
        assert_eq!(scene.objects[0].mesh, MeshKind::Cube);
        assert_eq!(scene.objects[0].program, "default");
        assert_eq!(scene.objects[1].mesh, MeshKind::model("pisatower"));
        assert_eq!(scene.objects[1].tiling, 1.0);
    }

    #[test]
    fn invalid_mesh_name_is_rejected() {
        let yaml = "scene:\n  objects:\n    - name: bad\n      mesh: \"no such/mesh\"\n";
        assert!(matches!(
            ViewerConfig::from_yaml_str(yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "asset_root: /srv/skyview").unwrap();
        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.asset_root, PathBuf::from("/srv/skyview"));
    }

    #[test]
    fn resolve_falls_back_to_working_directory_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            ViewerConfig::resolve(None, dir.path()).unwrap(),
            ViewerConfig::default()
        );
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "target_fps: 144\n").unwrap();
        assert_eq!(ViewerConfig::resolve(None, dir.path()).unwrap().target_fps, 144);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ViewerConfig::load(&dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
