use crate::backend::{BufferHandle, GpuBackend};
use crate::error::RenderError;
use skyview_assets::{GeometryLoader, MeshKind, VertexFormat};
use std::collections::BTreeMap;

/// A vertex buffer resident on the GPU, with what is needed to draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuMesh {
    pub kind: MeshKind,
    pub buffer: BufferHandle,
    pub vertex_count: u32,
    pub format: VertexFormat,
}

/// One vertex buffer per mesh kind.
#[derive(Debug, Default)]
pub struct BufferCache {
    meshes: BTreeMap<MeshKind, GpuMesh>,
    uploads: usize,
    released: bool,
}

impl BufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the buffer for `kind`, loading and uploading it on first use.
    pub fn get<B: GpuBackend + ?Sized>(
        &mut self,
        kind: &MeshKind,
        loader: &GeometryLoader,
        backend: &mut B,
    ) -> Result<GpuMesh, RenderError> {
        if self.released {
            return Err(RenderError::Released { cache: "buffer" });
        }
        if let Some(mesh) = self.meshes.get(kind) {
            tracing::debug!("buffer cache hit for {kind}");
            return Ok(mesh.clone());
        }

        let data = loader.load(kind)?;
        let buffer = backend.upload_vertices(kind.name(), data.as_slice())?;
        self.uploads += 1;

        let mesh = GpuMesh {
            kind: kind.clone(),
            buffer,
            vertex_count: data.vertex_count() as u32,
            format: data.format(),
        };
        tracing::info!(
            "uploaded {kind}: {} vertices ({})",
            mesh.vertex_count,
            mesh.format.widths
        );
        self.meshes.insert(kind.clone(), mesh.clone());
        Ok(mesh)
    }

    /// Number of uploads performed so far.
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Releases every buffer. Later calls are no-ops.
    pub fn release_all<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.released {
            return;
        }
        for (kind, mesh) in std::mem::take(&mut self.meshes) {
            tracing::debug!("releasing buffer for {kind}");
            backend.release_buffer(mesh.buffer);
        }
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;
    use skyview_assets::ModelCatalog;

    fn loader() -> GeometryLoader {
        GeometryLoader::new("assets", ModelCatalog::default())
    }

    #[test]
    fn same_kind_uploads_once() {
        let mut backend = RecordingBackend::new();
        let mut cache = BufferCache::new();
        let loader = loader();

        let a = cache.get(&MeshKind::Cube, &loader, &mut backend).unwrap();
        let b = cache.get(&MeshKind::Cube, &loader, &mut backend).unwrap();

        assert_eq!(a.buffer, b.buffer);
        assert_eq!(a.vertex_count, 36);
        assert_eq!(cache.upload_count(), 1);
        assert_eq!(backend.upload_count(), 1);
    }

    #[test]
    fn distinct_kinds_get_distinct_buffers() {
        let mut backend = RecordingBackend::new();
        let mut cache = BufferCache::new();
        let loader = loader();

        let cube = cache.get(&MeshKind::Cube, &loader, &mut backend).unwrap();
        let sky = cache.get(&MeshKind::Skybox, &loader, &mut backend).unwrap();

        assert_ne!(cube.buffer, sky.buffer);
        assert_eq!(sky.format, VertexFormat::POSITION_ONLY);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failed_load_uploads_nothing() {
        let mut backend = RecordingBackend::new();
        let mut cache = BufferCache::new();
        let err = cache
            .get(&MeshKind::model("atlantis"), &loader(), &mut backend)
            .unwrap_err();

        assert!(err.is_asset_error());
        assert_eq!(backend.upload_count(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn get_after_release_is_an_error() {
        let mut backend = RecordingBackend::new();
        let mut cache = BufferCache::new();
        let loader = loader();
        cache.get(&MeshKind::Cube, &loader, &mut backend).unwrap();

        cache.release_all(&mut backend);
        cache.release_all(&mut backend);

        assert_eq!(backend.release_count(), 1);
        assert!(matches!(
            cache.get(&MeshKind::Cube, &loader, &mut backend),
            Err(RenderError::Released { cache: "buffer" })
        ));
    }
}
