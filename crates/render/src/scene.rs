use crate::backend::GpuBackend;
use crate::context::{GraphicsContext, RenderableDesc};
use crate::error::RenderError;
use crate::renderable::{FrameUniforms, Renderable};
use crate::shaders::ShaderLibrary;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use skyview_assets::MeshKind;
use skyview_common::Transform;

/// Which skybox technique the scene uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkyboxStyle {
    /// Inward-facing cube drawn with the view translation removed.
    #[default]
    Cube,
    /// Fullscreen triangle that reconstructs the view ray per fragment.
    Advanced,
}

impl SkyboxStyle {
    pub fn mesh(self) -> MeshKind {
        match self {
            Self::Cube => MeshKind::Skybox,
            Self::Advanced => MeshKind::AdvancedSkybox,
        }
    }

    pub fn program(self) -> &'static str {
        match self {
            Self::Cube => ShaderLibrary::SKYBOX,
            Self::Advanced => ShaderLibrary::ADVANCED_SKYBOX,
        }
    }
}

/// What to do when an object's asset files are missing or broken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetPolicy {
    /// Leave the object out and keep building.
    #[default]
    Skip,
    /// Fail the whole scene.
    Abort,
}

fn default_program() -> String {
    ShaderLibrary::DEFAULT.to_string()
}

fn default_scale() -> [f32; 3] {
    [1.0; 3]
}

fn default_tiling() -> f32 {
    1.0
}

/// One object placed in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescription {
    pub name: String,
    pub mesh: MeshKind,
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation_degrees: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
    #[serde(default = "default_tiling")]
    pub tiling: f32,
}

impl ObjectDescription {
    /// A default-program object whose texture shares the mesh's name.
    pub fn textured(name: &str, mesh: MeshKind) -> Self {
        Self {
            name: name.to_string(),
            texture: Some(name.to_string()),
            mesh,
            program: default_program(),
            position: [0.0; 3],
            rotation_degrees: [0.0; 3],
            scale: default_scale(),
            tiling: default_tiling(),
        }
    }

    pub fn at(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }

    pub fn rotated(mut self, rotation_degrees: [f32; 3]) -> Self {
        self.rotation_degrees = rotation_degrees;
        self
    }

    pub fn scaled(mut self, scale: f32) -> Self {
        self.scale = [scale; 3];
        self
    }

    pub fn with_texture(mut self, texture: &str) -> Self {
        self.texture = Some(texture.to_string());
        self
    }

    pub fn with_tiling(mut self, tiling: f32) -> Self {
        self.tiling = tiling;
        self
    }

    pub fn transform(&self) -> Transform {
        Transform::from_euler_degrees(
            Vec3::from_array(self.position),
            Vec3::from_array(self.rotation_degrees),
            Vec3::from_array(self.scale),
        )
    }
}

/// The full scene: a skybox plus objects in draw order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub skybox: SkyboxStyle,
    pub skybox_texture: String,
    pub objects: Vec<ObjectDescription>,
}

impl Default for SceneDescription {
    /// The landmark scene: a tiled ground slab, a crate and the landmark
    /// models around it, under the cube skybox.
    fn default() -> Self {
        // Landmark OBJ files are authored Z-up in centimetres.
        let upright = [-90.0, 0.0, 0.0];
        Self {
            skybox: SkyboxStyle::Cube,
            skybox_texture: "skybox".into(),
            objects: vec![
                ObjectDescription {
                    scale: [40.0, 0.1, 40.0],
                    ..ObjectDescription::textured("ground", MeshKind::Cube)
                        .with_texture("crate")
                        .at([0.0, -1.1, 0.0])
                        .with_tiling(40.0)
                },
                ObjectDescription::textured("crate", MeshKind::Cube)
                    .at([0.0, 0.0, -3.0])
                    .rotated([0.0, 45.0, 0.0]),
                ObjectDescription::textured("eiffel", MeshKind::model("eiffel"))
                    .at([0.0, -1.0, -20.0])
                    .rotated(upright)
                    .scaled(0.005),
                ObjectDescription::textured("coliseo", MeshKind::model("coliseo"))
                    .at([20.0, -1.0, -10.0])
                    .rotated(upright)
                    .scaled(0.002),
                ObjectDescription::textured("pisatower", MeshKind::model("pisatower"))
                    .at([-15.0, -1.0, -10.0])
                    .rotated(upright)
                    .scaled(0.01),
                ObjectDescription::textured("catedral", MeshKind::model("catedral"))
                    .at([-20.0, -1.0, 5.0])
                    .rotated(upright)
                    .scaled(0.01),
                ObjectDescription::textured("estatua", MeshKind::model("estatua"))
                    .at([6.0, -1.0, 6.0])
                    .rotated(upright)
                    .scaled(0.01),
                ObjectDescription::textured("estatua2", MeshKind::model("estatua2"))
                    .at([-6.0, -1.0, 6.0])
                    .rotated(upright)
                    .scaled(0.01),
                ObjectDescription::textured("bigben", MeshKind::model("bigben"))
                    .at([15.0, -1.0, 12.0])
                    .rotated(upright)
                    .scaled(0.003),
                ObjectDescription::textured("moai", MeshKind::model("moai"))
                    .at([0.0, -1.0, 12.0])
                    .rotated(upright)
                    .scaled(0.02),
                ObjectDescription::textured("cubo", MeshKind::model("cubo"))
                    .at([3.0, -0.5, -3.0])
                    .rotated(upright)
                    .scaled(0.05),
            ],
        }
    }
}

/// Per-frame draw statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: usize,
    pub vertices: u64,
}

/// Composed scene: the skybox is drawn first, then objects in order.
#[derive(Debug)]
pub struct Scene {
    skybox: Renderable,
    objects: Vec<Renderable>,
    skipped: Vec<String>,
}

impl Scene {
    /// Builds every renderable through the context's caches.
    ///
    /// Asset failures on an object follow `policy`. Shader, binding and GPU
    /// errors always fail the build, as does any failure on the skybox.
    pub fn build<B: GpuBackend>(
        ctx: &mut GraphicsContext<B>,
        desc: &SceneDescription,
        policy: AssetPolicy,
    ) -> Result<Self, RenderError> {
        let skybox_mesh = desc.skybox.mesh();
        let skybox = ctx.create_renderable(&RenderableDesc {
            name: "skybox",
            mesh: &skybox_mesh,
            program: desc.skybox.program(),
            texture: Some(&desc.skybox_texture),
            transform: Transform::default(),
            tiling: 1.0,
        })?;

        let mut objects = Vec::with_capacity(desc.objects.len());
        let mut skipped = Vec::new();
        for object in &desc.objects {
            let built = ctx.create_renderable(&RenderableDesc {
                name: &object.name,
                mesh: &object.mesh,
                program: &object.program,
                texture: object.texture.as_deref(),
                transform: object.transform(),
                tiling: object.tiling,
            });
            match built {
                Ok(renderable) => objects.push(renderable),
                Err(err) if err.is_asset_error() && policy == AssetPolicy::Skip => {
                    tracing::warn!("skipping {}: {err}", object.name);
                    skipped.push(object.name.clone());
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            "scene built: {} objects, {} skipped, {:?} skybox",
            objects.len(),
            skipped.len(),
            desc.skybox
        );
        Ok(Self {
            skybox,
            objects,
            skipped,
        })
    }

    pub fn skybox(&self) -> &Renderable {
        &self.skybox
    }

    pub fn objects(&self) -> &[Renderable] {
        &self.objects
    }

    pub fn object_mut(&mut self, name: &str) -> Option<&mut Renderable> {
        self.objects.iter_mut().find(|r| r.name == name)
    }

    /// Names of objects left out by [`AssetPolicy::Skip`].
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Clears, draws the skybox then every object, and presents. A failed
    /// draw aborts the frame so the next one can start.
    pub fn render<B: GpuBackend>(
        &self,
        ctx: &mut GraphicsContext<B>,
        frame: &FrameUniforms,
        clear_color: [f32; 4],
    ) -> Result<FrameStats, RenderError> {
        ctx.begin_frame(clear_color)?;
        let mut stats = FrameStats::default();
        for renderable in std::iter::once(&self.skybox).chain(&self.objects) {
            if let Err(e) = renderable.render(ctx.backend_mut(), frame) {
                ctx.abort_frame();
                return Err(e.into());
            }
            stats.draws += 1;
            stats.vertices += u64::from(renderable.vertex_count);
        }
        ctx.present()?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GlobalState, GpuError};
    use crate::recording::{GpuCommand, RecordingBackend};
    use image::RgbaImage;
    use skyview_assets::{CUBE_FACES, GeometryLoader, ModelCatalog, TextureCatalog, TextureSource};
    use skyview_common::Light;
    use std::path::Path;

    const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1\n";

    fn write_assets(root: &Path) -> (ModelCatalog, TextureCatalog) {
        RgbaImage::new(2, 2).save(root.join("crate.png")).unwrap();
        let sky = root.join("sky");
        std::fs::create_dir(&sky).unwrap();
        for face in CUBE_FACES {
            RgbaImage::new(4, 4)
                .save(sky.join(format!("{face}.png")))
                .unwrap();
        }
        std::fs::write(root.join("tri.obj"), TRIANGLE_OBJ).unwrap();

        let mut models = ModelCatalog::empty();
        models.insert("tri", "tri.obj");
        models.insert("gone", "missing.obj");
        let mut textures = TextureCatalog::empty();
        textures.insert("crate", TextureSource::Image("crate.png".into()));
        textures.insert(
            "sky",
            TextureSource::Cube {
                dir: "sky".into(),
                extension: "png".into(),
            },
        );
        (models, textures)
    }

    fn context(root: &Path) -> GraphicsContext<RecordingBackend> {
        let (models, textures) = write_assets(root);
        GraphicsContext::init(
            RecordingBackend::new(),
            GeometryLoader::new(root, models),
            textures,
            ShaderLibrary::builtin(),
        )
    }

    fn description(skybox: SkyboxStyle, objects: Vec<ObjectDescription>) -> SceneDescription {
        SceneDescription {
            skybox,
            skybox_texture: "sky".into(),
            objects,
        }
    }

    fn frame() -> FrameUniforms {
        crate::camera::FlyCamera::default().frame_uniforms(&Light::default())
    }

    #[test]
    fn one_frame_draws_skybox_then_objects_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let desc = description(
            SkyboxStyle::Cube,
            vec![
                ObjectDescription::textured("a", MeshKind::Cube).with_texture("crate"),
                ObjectDescription::textured("b", MeshKind::model("tri")).with_texture("crate"),
                ObjectDescription::textured("c", MeshKind::Cube)
                    .with_texture("crate")
                    .at([3.0, 0.0, 0.0]),
            ],
        );
        let scene = Scene::build(&mut ctx, &desc, AssetPolicy::Abort).unwrap();
        let stats = scene.render(&mut ctx, &frame(), [0.0; 4]).unwrap();
        assert_eq!(stats.draws, 4);
        assert_eq!(stats.vertices, 36 + 36 + 3 + 36);

        let commands = ctx.backend().commands();
        let state_sets: Vec<_> = commands
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, GpuCommand::SetGlobalState(_)))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(state_sets, [0]);
        assert_eq!(
            commands[0],
            GpuCommand::SetGlobalState(GlobalState::default())
        );

        let drawn: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                GpuCommand::Draw { layout, .. } => Some(*layout),
                _ => None,
            })
            .collect();
        let expected: Vec<_> = std::iter::once(scene.skybox())
            .chain(scene.objects())
            .map(|r| r.layout)
            .collect();
        assert_eq!(drawn, expected);
        assert!(matches!(commands.last(), Some(GpuCommand::EndFrame)));
    }

    #[test]
    fn shared_mesh_is_uploaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let desc = description(
            SkyboxStyle::Advanced,
            vec![
                ObjectDescription::textured("a", MeshKind::Cube).with_texture("crate"),
                ObjectDescription::textured("b", MeshKind::Cube).with_texture("crate"),
            ],
        );
        let scene = Scene::build(&mut ctx, &desc, AssetPolicy::Abort).unwrap();
        assert_eq!(scene.objects()[0].buffer, scene.objects()[1].buffer);
        // advanced skybox triangle and the cube
        assert_eq!(ctx.backend().upload_count(), 2);
        assert_eq!(ctx.backend().texture_upload_count(), 2);
        assert_eq!(scene.skybox().vertex_count, 3);
    }

    #[test]
    fn skip_policy_drops_only_broken_objects() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let desc = description(
            SkyboxStyle::Cube,
            vec![
                ObjectDescription::textured("a", MeshKind::Cube).with_texture("crate"),
                ObjectDescription::textured("gone", MeshKind::model("gone")).with_texture("crate"),
                ObjectDescription::textured("unknown", MeshKind::model("nowhere"))
                    .with_texture("crate"),
                ObjectDescription::textured("b", MeshKind::Cube).with_texture("no_such_texture"),
            ],
        );
        let scene = Scene::build(&mut ctx, &desc, AssetPolicy::Skip).unwrap();
        let names: Vec<_> = scene.objects().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a"]);
        assert_eq!(scene.skipped(), ["gone", "unknown", "b"]);
    }

    #[test]
    fn abort_policy_propagates_asset_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let desc = description(
            SkyboxStyle::Cube,
            vec![ObjectDescription::textured("gone", MeshKind::model("gone")).with_texture("crate")],
        );
        let err = Scene::build(&mut ctx, &desc, AssetPolicy::Abort).unwrap_err();
        assert!(err.is_asset_error());
    }

    #[test]
    fn failed_draw_does_not_leave_the_frame_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let desc = description(
            SkyboxStyle::Cube,
            vec![ObjectDescription::textured("a", MeshKind::Cube).with_texture("crate")],
        );
        let scene = Scene::build(&mut ctx, &desc, AssetPolicy::Abort).unwrap();
        let texture = scene.objects()[0].textures[0];
        ctx.backend_mut().release_texture(texture);

        for _ in 0..2 {
            let err = scene.render(&mut ctx, &frame(), [0.0; 4]).unwrap_err();
            assert!(matches!(
                err,
                RenderError::Gpu(GpuError::InvalidHandle { kind: "texture", .. })
            ));
        }
        let aborted = ctx
            .backend()
            .commands()
            .iter()
            .filter(|c| matches!(c, GpuCommand::AbortFrame))
            .count();
        assert_eq!(aborted, 2);
    }

    #[test]
    fn shader_errors_are_fatal_even_when_skipping() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let mut object = ObjectDescription::textured("a", MeshKind::Cube).with_texture("crate");
        object.program = "nonexistent".into();
        let desc = description(SkyboxStyle::Cube, vec![object]);
        assert!(matches!(
            Scene::build(&mut ctx, &desc, AssetPolicy::Skip),
            Err(RenderError::UnknownProgram(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        ctx.backend_mut().fail_compilation_of("default");
        let desc = description(
            SkyboxStyle::Cube,
            vec![ObjectDescription::textured("a", MeshKind::Cube).with_texture("crate")],
        );
        assert!(matches!(
            Scene::build(&mut ctx, &desc, AssetPolicy::Skip),
            Err(RenderError::ShaderCompile { .. })
        ));
    }

    #[test]
    fn bind_errors_are_fatal_even_when_skipping() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let mut object = ObjectDescription::textured("a", MeshKind::Cube).with_texture("sky");
        object.program = ShaderLibrary::SKYBOX.into();
        let desc = description(SkyboxStyle::Cube, vec![object]);
        assert!(matches!(
            Scene::build(&mut ctx, &desc, AssetPolicy::Skip),
            Err(RenderError::AttributeBind { .. })
        ));
    }

    #[test]
    fn rendering_after_teardown_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let scene = Scene::build(&mut ctx, &description(SkyboxStyle::Cube, vec![]), AssetPolicy::Abort)
            .unwrap();
        ctx.teardown();
        assert!(matches!(
            scene.render(&mut ctx, &frame(), [0.0; 4]),
            Err(RenderError::Gpu(_))
        ));
        assert!(matches!(
            Scene::build(&mut ctx, &SceneDescription::default(), AssetPolicy::Skip),
            Err(RenderError::Released { .. })
        ));
    }

    #[test]
    fn landmark_scene_lists_every_catalog_model() {
        let desc = SceneDescription::default();
        let catalog = ModelCatalog::default();
        for name in catalog.names() {
            assert!(
                desc.objects.iter().any(|o| o.mesh == MeshKind::model(name)),
                "{name} missing from the landmark scene"
            );
        }
        assert_eq!(desc.skybox_texture, "skybox");
    }
}
