use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Landmark models shipped with the viewer, relative to the asset root.
const LANDMARK_MODELS: [(&str, &str); 9] = [
    ("eiffel", "objects/Eiffel/10067_Eiffel_Tower_v1_max2010_it1.obj"),
    ("coliseo", "objects/Coliseo/10064_colosseum_v1_Iteration0.obj"),
    ("pisatower", "objects/pisatower/10076_pisa_tower_v1_max2009_it0.obj"),
    ("catedral", "objects/catedral/10086_saint_basil_cathedral_v1_L3.obj"),
    (
        "estatua",
        "objects/10085_egypt_sphinx_V2_L3.123cedbb80cc-eec4-4899-a587-d46dd8eff3b9/10085_egypt_sphinx_iterations-2.obj",
    ),
    (
        "estatua2",
        "objects/Statue_v1_L2.123cc93d694a-81fb-4c81-8a75-7fa010dfa777/12330_Statue_v1_L2.obj",
    ),
    ("bigben", "objects/bigben/10059_big_ben_v2_max2011_it1.obj"),
    ("moai", "objects/moai/10805_Moai_L3.mb.obj"),
    ("cubo", "objects/Cubo/11694_puzzle_cube_v1_L2.obj"),
];

/// Maps model names to OBJ files under the asset root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelCatalog {
    models: BTreeMap<String, PathBuf>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: LANDMARK_MODELS
                .iter()
                .map(|(name, path)| (name.to_string(), PathBuf::from(path)))
                .collect(),
        }
    }
}

impl ModelCatalog {
    pub fn empty() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.models.insert(name.into(), path.into());
    }

    pub fn resolve(&self, name: &str) -> Option<&Path> {
        self.models.get(name).map(PathBuf::as_path)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Where a named texture's pixels live, relative to the asset root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSource {
    /// A single 2D image file.
    Image(PathBuf),
    /// A directory holding six faces named `right left top bottom front back`.
    Cube { dir: PathBuf, extension: String },
}

/// Maps texture names to their sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureCatalog {
    textures: BTreeMap<String, TextureSource>,
}

impl Default for TextureCatalog {
    fn default() -> Self {
        let mut textures = BTreeMap::new();
        textures.insert(
            "crate".to_string(),
            TextureSource::Image(PathBuf::from("textures/img.png")),
        );
        textures.insert(
            "skybox".to_string(),
            TextureSource::Cube {
                dir: PathBuf::from("textures/skybox"),
                extension: "png".into(),
            },
        );
        for (name, _) in LANDMARK_MODELS {
            textures.insert(
                name.to_string(),
                TextureSource::Image(PathBuf::from(format!("textures/{name}.jpg"))),
            );
        }
        Self { textures }
    }
}

impl TextureCatalog {
    pub fn empty() -> Self {
        Self {
            textures: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, source: TextureSource) {
        self.textures.insert(name.into(), source);
    }

    pub fn resolve(&self, name: &str) -> Option<&TextureSource> {
        self.textures.get(name)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
