//! Asset side of the viewer: where vertex data and images come from.
//!
//! Every mesh kind resolves to exactly one vertex format and one geometry
//! source. Procedural kinds are computed in place; model kinds are imported
//! from OBJ files under `<asset_root>/objects`. Textures are decoded from
//! files under the asset root.
//!
//! # Invariants
//! - A format's field count always matches its attribute-name count.
//! - Loaded geometry is never empty and always forms whole triangles; any
//!   failure is returned as [`AssetError`] instead of a degenerate buffer.

mod catalog;
mod error;
mod format;
mod geometry;
mod kind;
mod obj;
mod texture;

pub use catalog::{ModelCatalog, TextureCatalog, TextureSource};
pub use error::AssetError;
pub use format::{VertexData, VertexField, VertexFormat};
pub use geometry::{
    GeometryLoader, advanced_skybox_vertex_data, cube_vertex_data, skybox_vertex_data,
};
pub use kind::MeshKind;
pub use texture::{CUBE_FACES, ImageData, TextureDimension, load_texture};
