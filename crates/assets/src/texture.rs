use crate::catalog::TextureSource;
use crate::error::AssetError;
use std::path::Path;

/// Face order of a cube map, matching GPU array layer order (+X, -X, +Y, -Y, +Z, -Z).
pub const CUBE_FACES: [&str; 6] = ["right", "left", "top", "bottom", "front", "back"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureDimension {
    D2,
    Cube,
}

/// Decoded RGBA8 pixels ready for upload. Cube maps store six equally sized
/// layers back to back in [`CUBE_FACES`] order.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub dimension: TextureDimension,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ImageData {
    pub fn layer_count(&self) -> u32 {
        match self.dimension {
            TextureDimension::D2 => 1,
            TextureDimension::Cube => 6,
        }
    }
}

fn decode(path: &Path) -> Result<image::RgbaImage, AssetError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Decodes the pixels for `source`, resolved against `asset_root`.
///
/// 2D images are flipped vertically so that texcoord `(0, 0)` addresses the
/// bottom-left corner, which is the convention of the OBJ files and the cube.
pub fn load_texture(asset_root: &Path, source: &TextureSource) -> Result<ImageData, AssetError> {
    match source {
        TextureSource::Image(relative) => {
            let mut img = decode(&asset_root.join(relative))?;
            image::imageops::flip_vertical_in_place(&mut img);
            Ok(ImageData {
                dimension: TextureDimension::D2,
                width: img.width(),
                height: img.height(),
                rgba: img.into_raw(),
            })
        }
        TextureSource::Cube { dir, extension } => {
            let dir = asset_root.join(dir);
            let mut size = None;
            let mut rgba = Vec::new();
            for face in CUBE_FACES {
                let img = decode(&dir.join(format!("{face}.{extension}")))?;
                let (width, height) = img.dimensions();
                let (expected_width, expected_height) = *size.get_or_insert((width, height));
                if (width, height) != (expected_width, expected_height) {
                    return Err(AssetError::CubeFaceMismatch {
                        dir,
                        face,
                        width,
                        height,
                        expected_width,
                        expected_height,
                    });
                }
                rgba.extend_from_slice(img.as_raw());
            }
            let (width, height) = size.unwrap_or_default();
            Ok(ImageData {
                dimension: TextureDimension::Cube,
                width,
                height,
                rgba,
            })
        }
    }
}
