use crate::catalog::ModelCatalog;
use crate::error::AssetError;
use crate::format::VertexData;
use crate::kind::MeshKind;
use crate::obj;
use std::path::{Path, PathBuf};

const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
];

/// Two counter-clockwise triangles per face: front, right, back, left, top, bottom.
#[rustfmt::skip]
const CUBE_TRIANGLES: [[usize; 3]; 12] = [
    [0, 2, 3], [0, 1, 2],
    [1, 7, 2], [1, 6, 7],
    [6, 5, 4], [4, 7, 6],
    [3, 4, 5], [3, 5, 0],
    [3, 7, 4], [3, 2, 7],
    [0, 6, 1], [0, 5, 6],
];

const CUBE_TEXCOORDS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// Texcoord corners per triangle, remapped so every face reads upright.
#[rustfmt::skip]
const CUBE_TEXCOORD_TRIANGLES: [[usize; 3]; 12] = [
    [0, 2, 3], [0, 1, 2],
    [0, 2, 3], [0, 1, 2],
    [0, 1, 2], [2, 3, 0],
    [2, 3, 0], [2, 0, 1],
    [0, 2, 3], [0, 1, 2],
    [3, 1, 2], [3, 0, 1],
];

/// One normal per face, in the same face order as [`CUBE_TRIANGLES`].
const CUBE_FACE_NORMALS: [[f32; 3]; 6] = [
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 0.0],
    [0.0, 0.0, -1.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
];

/// Clip-space depth of the fullscreen skybox triangle, just inside the far plane.
const ADVANCED_SKYBOX_DEPTH: f32 = 0.9999;

/// Expands an indexed corner list into one entry per triangle vertex.
fn expand<const N: usize>(corners: &[[f32; N]], triangles: &[[usize; 3]]) -> Vec<[f32; N]> {
    triangles
        .iter()
        .flat_map(|triangle| triangle.iter().map(|&i| corners[i]))
        .collect()
}

fn cube_positions() -> Vec<[f32; 3]> {
    expand(&CUBE_CORNERS, &CUBE_TRIANGLES)
}

/// Interleaved cube records: texcoord ++ normal ++ position, 36 vertices.
pub fn cube_vertex_data() -> Vec<f32> {
    let texcoords = expand(&CUBE_TEXCOORDS, &CUBE_TEXCOORD_TRIANGLES);
    let normals = CUBE_FACE_NORMALS.iter().flat_map(|n| std::iter::repeat_n(*n, 6));
    let positions = cube_positions();

    let mut out = Vec::with_capacity(positions.len() * 8);
    for ((t, n), p) in texcoords.iter().zip(normals).zip(positions.iter()) {
        out.extend_from_slice(t);
        out.extend_from_slice(&n);
        out.extend_from_slice(p);
    }
    out
}

/// Cube positions with each vector's components reversed (`x,y,z -> z,y,x`).
///
/// Swapping two axes mirrors the cube, which reverses triangle winding so the
/// faces are front-facing from the inside.
pub fn skybox_vertex_data() -> Vec<f32> {
    cube_positions()
        .into_iter()
        .flat_map(|[x, y, z]| [z, y, x])
        .collect()
}

/// A single triangle in clip space that covers the whole viewport.
pub fn advanced_skybox_vertex_data() -> Vec<f32> {
    let z = ADVANCED_SKYBOX_DEPTH;
    vec![-1.0, -1.0, z, 3.0, -1.0, z, -1.0, 3.0, z]
}

/// Produces vertex records for any [`MeshKind`].
#[derive(Debug, Clone)]
pub struct GeometryLoader {
    asset_root: PathBuf,
    models: ModelCatalog,
}

impl GeometryLoader {
    pub fn new(asset_root: impl Into<PathBuf>, models: ModelCatalog) -> Self {
        Self {
            asset_root: asset_root.into(),
            models,
        }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    pub fn models(&self) -> &ModelCatalog {
        &self.models
    }

    /// Loads and validates the records for `kind`.
    pub fn load(&self, kind: &MeshKind) -> Result<VertexData, AssetError> {
        let floats = match kind {
            MeshKind::Cube => cube_vertex_data(),
            MeshKind::Skybox => skybox_vertex_data(),
            MeshKind::AdvancedSkybox => advanced_skybox_vertex_data(),
            MeshKind::Model(name) => {
                let relative = self
                    .models
                    .resolve(name)
                    .ok_or_else(|| AssetError::UnknownModel(name.clone()))?;
                let path = self.asset_root.join(relative);
                tracing::info!("importing model {name} from {}", path.display());
                obj::import(&path)?
            }
        };
        VertexData::new(kind, floats)
    }
}
