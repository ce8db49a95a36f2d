use crate::backend::{GlobalState, GpuBackend};
use crate::cache::{
    BufferCache, GpuLayout, GpuMesh, GpuTexture, LayoutCache, Program, ProgramCache, TextureCache,
};
use crate::error::RenderError;
use crate::renderable::Renderable;
use crate::shaders::{ShaderLibrary, TextureBinding};
use skyview_assets::{GeometryLoader, MeshKind, TextureCatalog, TextureDimension};
use skyview_common::Transform;

/// Owns the backend and every resource cache.
///
/// Created with [`GraphicsContext::init`], which sets the process-wide raster
/// state once. [`GraphicsContext::teardown`] releases all caches; it also runs
/// on drop, and a second call does nothing.
pub struct GraphicsContext<B: GpuBackend> {
    backend: B,
    loader: GeometryLoader,
    textures_catalog: TextureCatalog,
    library: ShaderLibrary,
    buffers: BufferCache,
    programs: ProgramCache,
    layouts: LayoutCache,
    textures: TextureCache,
    torn_down: bool,
}

/// What a renderable is made of, before any GPU work happens.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableDesc<'a> {
    pub name: &'a str,
    pub mesh: &'a MeshKind,
    pub program: &'a str,
    pub texture: Option<&'a str>,
    pub transform: Transform,
    pub tiling: f32,
}

impl<B: GpuBackend> GraphicsContext<B> {
    pub fn init(
        mut backend: B,
        loader: GeometryLoader,
        textures_catalog: TextureCatalog,
        library: ShaderLibrary,
    ) -> Self {
        backend.set_global_state(GlobalState::default());
        tracing::info!(
            "graphics context ready (assets at {})",
            loader.asset_root().display()
        );
        Self {
            backend,
            loader,
            textures_catalog,
            library,
            buffers: BufferCache::new(),
            programs: ProgramCache::new(),
            layouts: LayoutCache::new(),
            textures: TextureCache::new(),
            torn_down: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn loader(&self) -> &GeometryLoader {
        &self.loader
    }

    pub fn library(&self) -> &ShaderLibrary {
        &self.library
    }

    pub fn mesh(&mut self, kind: &MeshKind) -> Result<GpuMesh, RenderError> {
        self.buffers.get(kind, &self.loader, &mut self.backend)
    }

    pub fn program(&mut self, name: &str) -> Result<Program, RenderError> {
        self.programs.get(name, &self.library, &mut self.backend)
    }

    pub fn layout(&mut self, program: &str, kind: &MeshKind) -> Result<GpuLayout, RenderError> {
        let program = self.program(program)?;
        let mesh = self.mesh(kind)?;
        self.layouts.get(&program, &mesh, &mut self.backend)
    }

    pub fn texture(&mut self, name: &str) -> Result<GpuTexture, RenderError> {
        self.textures.get(
            name,
            &self.textures_catalog,
            self.loader.asset_root(),
            &mut self.backend,
        )
    }

    /// Resolves every resource a renderable needs through the caches.
    ///
    /// The texture must match the program's sampler kind, and a program that
    /// samples a texture must be given one.
    pub fn create_renderable(&mut self, desc: &RenderableDesc<'_>) -> Result<Renderable, RenderError> {
        let program = self.program(desc.program)?;
        let mesh = self.mesh(desc.mesh)?;
        let layout = self.layouts.get(&program, &mesh, &mut self.backend)?;

        let mut textures = Vec::new();
        match (program.texture, desc.texture) {
            (TextureBinding::None, None) => {}
            (binding, Some(name)) => {
                let texture = self.texture(name)?;
                let actual = dimension_name(texture.dimension);
                let expected = binding_name(binding);
                if actual != expected {
                    return Err(RenderError::TextureMismatch {
                        program: program.name,
                        texture: name.to_string(),
                        expected,
                        actual,
                    });
                }
                textures.push(texture.handle);
            }
            (binding, None) => {
                return Err(RenderError::TextureMismatch {
                    program: program.name,
                    texture: "(none)".into(),
                    expected: binding_name(binding),
                    actual: "missing",
                });
            }
        }

        Ok(Renderable {
            name: desc.name.to_string(),
            mesh: desc.mesh.clone(),
            program: program.handle,
            layout: layout.handle,
            buffer: layout.buffer,
            vertex_count: layout.vertex_count,
            textures,
            transform: desc.transform,
            tiling: desc.tiling,
        })
    }

    pub fn begin_frame(&mut self, clear_color: [f32; 4]) -> Result<(), RenderError> {
        Ok(self.backend.begin_frame(clear_color)?)
    }

    pub fn present(&mut self) -> Result<(), RenderError> {
        Ok(self.backend.end_frame()?)
    }

    pub fn abort_frame(&mut self) {
        self.backend.abort_frame();
    }

    /// Cache sizes as (buffers, programs, layouts, textures).
    pub fn cache_sizes(&self) -> (usize, usize, usize, usize) {
        (
            self.buffers.len(),
            self.programs.len(),
            self.layouts.len(),
            self.textures.len(),
        )
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Releases every GPU resource: layouts first, then buffers, programs and
    /// textures. Renderables built from this context must not be drawn afterwards.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.layouts.release_all(&mut self.backend);
        self.buffers.release_all(&mut self.backend);
        self.programs.release_all(&mut self.backend);
        self.textures.release_all(&mut self.backend);
        self.torn_down = true;
        tracing::info!("graphics context torn down");
    }
}

impl<B: GpuBackend> Drop for GraphicsContext<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn binding_name(binding: TextureBinding) -> &'static str {
    match binding {
        TextureBinding::None => "no",
        TextureBinding::D2 => "2d",
        TextureBinding::Cube => "cube",
    }
}

fn dimension_name(dimension: TextureDimension) -> &'static str {
    match dimension {
        TextureDimension::D2 => "2d",
        TextureDimension::Cube => "cube",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{GpuCommand, RecordingBackend};
    use image::RgbaImage;
    use skyview_assets::{ModelCatalog, TextureSource};
    use std::path::Path;

    fn context(root: &Path) -> GraphicsContext<RecordingBackend> {
        let mut catalog = TextureCatalog::empty();
        catalog.insert("checker", TextureSource::Image("checker.png".into()));
        RgbaImage::new(2, 2).save(root.join("checker.png")).unwrap();
        GraphicsContext::init(
            RecordingBackend::new(),
            GeometryLoader::new(root, ModelCatalog::empty()),
            catalog,
            ShaderLibrary::builtin(),
        )
    }

    fn crate_desc(texture: Option<&str>) -> RenderableDesc<'_> {
        RenderableDesc {
            name: "crate",
            mesh: &MeshKind::Cube,
            program: "default",
            texture,
            transform: Transform::default(),
            tiling: 1.0,
        }
    }

    #[test]
    fn init_sets_global_state_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        assert_eq!(
            ctx.backend().commands(),
            &[GpuCommand::SetGlobalState(GlobalState::default())]
        );
    }

    #[test]
    fn renderables_share_cached_resources() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let a = ctx.create_renderable(&crate_desc(Some("checker"))).unwrap();
        let b = ctx.create_renderable(&crate_desc(Some("checker"))).unwrap();

        assert_eq!(a.buffer, b.buffer);
        assert_eq!(a.layout, b.layout);
        assert_eq!(a.textures, b.textures);
        assert_eq!(a.vertex_count, 36);
        assert_eq!(ctx.backend().upload_count(), 1);
        assert_eq!(ctx.backend().compile_count(), 1);
        assert_eq!(ctx.backend().layout_count(), 1);
        assert_eq!(ctx.backend().texture_upload_count(), 1);
        assert_eq!(ctx.cache_sizes(), (1, 1, 1, 1));
    }

    #[test]
    fn missing_texture_for_textured_program_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let err = ctx.create_renderable(&crate_desc(None)).unwrap_err();
        assert!(matches!(err, RenderError::TextureMismatch { actual: "missing", .. }));
    }

    #[test]
    fn flat_texture_on_skybox_program_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let desc = RenderableDesc {
            name: "sky",
            mesh: &MeshKind::Skybox,
            program: "skybox",
            texture: Some("checker"),
            transform: Transform::default(),
            tiling: 1.0,
        };
        let err = ctx.create_renderable(&desc).unwrap_err();
        assert!(matches!(
            err,
            RenderError::TextureMismatch {
                expected: "cube",
                actual: "2d",
                ..
            }
        ));
    }

    #[test]
    fn teardown_releases_in_order_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        ctx.create_renderable(&crate_desc(Some("checker"))).unwrap();
        ctx.backend_mut().clear_log();

        ctx.teardown();
        ctx.teardown();

        let kinds: Vec<_> = ctx
            .backend()
            .commands()
            .iter()
            .map(|c| match c {
                GpuCommand::ReleaseLayout(_) => "layout",
                GpuCommand::ReleaseBuffer(_) => "buffer",
                GpuCommand::ReleaseProgram(_) => "program",
                GpuCommand::ReleaseTexture(_) => "texture",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["layout", "buffer", "program", "texture"]);
        assert_eq!(ctx.backend().live_resources(), 0);
        assert!(matches!(
            ctx.mesh(&MeshKind::Cube),
            Err(RenderError::Released { cache: "buffer" })
        ));
        assert!(matches!(
            ctx.program("default"),
            Err(RenderError::Released { cache: "program" })
        ));
        assert!(matches!(
            ctx.texture("checker"),
            Err(RenderError::Released { cache: "texture" })
        ));
    }
}
