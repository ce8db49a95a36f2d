use crate::backend::{GpuBackend, TextureHandle};
use crate::error::RenderError;
use skyview_assets::{AssetError, TextureCatalog, TextureDimension, load_texture};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuTexture {
    pub handle: TextureHandle,
    pub dimension: TextureDimension,
}

/// One uploaded texture per name.
#[derive(Debug, Default)]
pub struct TextureCache {
    textures: BTreeMap<String, GpuTexture>,
    released: bool,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<B: GpuBackend + ?Sized>(
        &mut self,
        name: &str,
        catalog: &TextureCatalog,
        asset_root: &Path,
        backend: &mut B,
    ) -> Result<GpuTexture, RenderError> {
        if self.released {
            return Err(RenderError::Released { cache: "texture" });
        }
        if let Some(texture) = self.textures.get(name) {
            return Ok(*texture);
        }

        let source = catalog
            .resolve(name)
            .ok_or_else(|| AssetError::UnknownTexture(name.to_string()))?;
        let image = load_texture(asset_root, source)?;
        let handle = backend.upload_texture(name, &image)?;
        let texture = GpuTexture {
            handle,
            dimension: image.dimension,
        };
        tracing::info!(
            "uploaded texture {name}: {}x{} x{}",
            image.width,
            image.height,
            image.layer_count()
        );
        self.textures.insert(name.to_string(), texture);
        Ok(texture)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn release_all<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.released {
            return;
        }
        for texture in std::mem::take(&mut self.textures).into_values() {
            backend.release_texture(texture.handle);
        }
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;
    use skyview_assets::TextureSource;

    fn catalog_with_image(dir: &Path) -> TextureCatalog {
        image::RgbaImage::new(2, 2).save(dir.join("img.png")).unwrap();
        let mut catalog = TextureCatalog::empty();
        catalog.insert("crate", TextureSource::Image("img.png".into()));
        catalog
    }

    #[test]
    fn textures_are_uploaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog_with_image(dir.path());
        let mut backend = RecordingBackend::new();
        let mut cache = TextureCache::new();

        let a = cache.get("crate", &catalog, dir.path(), &mut backend).unwrap();
        let b = cache.get("crate", &catalog, dir.path(), &mut backend).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.dimension, TextureDimension::D2);
        assert_eq!(backend.texture_upload_count(), 1);
    }

    #[test]
    fn unknown_texture_is_an_asset_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = RecordingBackend::new();
        let mut cache = TextureCache::new();
        let err = cache
            .get("marble", &TextureCatalog::empty(), dir.path(), &mut backend)
            .unwrap_err();
        assert!(err.is_asset_error());
    }

    #[test]
    fn get_after_release_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog_with_image(dir.path());
        let mut backend = RecordingBackend::new();
        let mut cache = TextureCache::new();
        cache.get("crate", &catalog, dir.path(), &mut backend).unwrap();
        cache.release_all(&mut backend);

        assert!(matches!(
            cache.get("crate", &catalog, dir.path(), &mut backend),
            Err(RenderError::Released { cache: "texture" })
        ));
    }
}
