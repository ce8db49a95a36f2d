use std::path::PathBuf;

/// Errors from loading geometry or images.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to parse OBJ {}: {source}", path.display())]
    ObjParse {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("OBJ {}: vertex index {index} out of range ({vertices} vertices)", path.display())]
    VertexIndex {
        path: PathBuf,
        index: u32,
        vertices: usize,
    },
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("unknown texture: {0}")]
    UnknownTexture(String),
    #[error("invalid mesh kind name {0:?}")]
    InvalidMeshKind(String),
    #[error("invalid vertex format {widths:?}: {reason}")]
    Format { widths: String, reason: String },
    #[error("mesh {kind}: no geometry")]
    EmptyGeometry { kind: String },
    #[error("mesh {kind}: {len} floats is not a whole number of {record_len}-float records")]
    MalformedGeometry {
        kind: String,
        len: usize,
        record_len: usize,
    },
    #[error("mesh {kind}: {vertices} vertices do not form complete triangles")]
    IncompleteTriangles { kind: String, vertices: usize },
    #[error(
        "cube map {}: face {face} is {width}x{height}, expected {expected_width}x{expected_height}",
        dir.display()
    )]
    CubeFaceMismatch {
        dir: PathBuf,
        face: &'static str,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
}
