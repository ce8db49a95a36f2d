use crate::error::RenderError;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Uniform block shared by every built-in program. Mirrors `DrawUniforms`.
const UNIFORMS: &str = r#"
struct Uniforms {
    projection: mat4x4<f32>,
    view: mat4x4<f32>,
    model: mat4x4<f32>,
    camera_position: vec4<f32>,
    light_direction: vec4<f32>,
    light_color: vec4<f32>,
    light_terms: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> u: Uniforms;
"#;

/// Lit, textured geometry (Phong with one directional light).
const DEFAULT_SHADER: &str = r#"
@group(1) @binding(0)
var u_texture: texture_2d<f32>;
@group(1) @binding(1)
var u_sampler: sampler;

struct VertexInput {
    @location(0) in_texcoord_0: vec2<f32>,
    @location(1) in_normal: vec3<f32>,
    @location(2) in_position: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) world_position: vec3<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let world = u.model * vec4<f32>(in.in_position, 1.0);
    var out: VertexOutput;
    out.clip_position = u.projection * u.view * world;
    out.uv = in.in_texcoord_0 * u.light_terms.w;
    out.normal = (u.model * vec4<f32>(in.in_normal, 0.0)).xyz;
    out.world_position = world.xyz;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let base = textureSample(u_texture, u_sampler, in.uv).rgb;
    let n = normalize(in.normal);
    let to_light = normalize(u.light_direction.xyz);

    let ambient = u.light_terms.x;
    let diffuse = u.light_terms.y * max(dot(n, to_light), 0.0);
    let to_eye = normalize(u.camera_position.xyz - in.world_position);
    let reflected = reflect(-to_light, n);
    let specular = u.light_terms.z * pow(max(dot(to_eye, reflected), 0.0), 32.0);

    let lit = base * u.light_color.rgb * (ambient + diffuse) + u.light_color.rgb * specular * 0.5;
    return vec4<f32>(lit, 1.0);
}
"#;

/// Cube skybox. `xyww` pins depth to the far plane.
const SKYBOX_SHADER: &str = r#"
@group(1) @binding(0)
var u_texture: texture_cube<f32>;
@group(1) @binding(1)
var u_sampler: sampler;

struct VertexInput {
    @location(0) in_position: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) direction: vec3<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let rotation = mat4x4<f32>(
        vec4<f32>(u.view[0].xyz, 0.0),
        vec4<f32>(u.view[1].xyz, 0.0),
        vec4<f32>(u.view[2].xyz, 0.0),
        vec4<f32>(0.0, 0.0, 0.0, 1.0),
    );
    let clip = u.projection * rotation * vec4<f32>(in.in_position, 1.0);
    var out: VertexOutput;
    out.clip_position = clip.xyww;
    out.direction = in.in_position;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(u_texture, u_sampler, in.direction);
}
"#;

/// Fullscreen-triangle skybox: reconstructs the view ray per fragment.
const ADVANCED_SKYBOX_SHADER: &str = r#"
@group(1) @binding(0)
var u_texture: texture_cube<f32>;
@group(1) @binding(1)
var u_sampler: sampler;

struct VertexInput {
    @location(0) in_position: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(in.in_position, 1.0);
    out.ndc = in.in_position.xy;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let eye_ray = vec3<f32>(in.ndc.x / u.projection[0][0], in.ndc.y / u.projection[1][1], -1.0);
    let rotation = mat3x3<f32>(u.view[0].xyz, u.view[1].xyz, u.view[2].xyz);
    let direction = transpose(rotation) * eye_ray;
    return textureSample(u_texture, u_sampler, direction);
}
"#;

/// Which texture (if any) a program samples from bind group 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureBinding {
    None,
    D2,
    Cube,
}

/// How a program interacts with the depth buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    /// Test `Less` and write depth.
    Standard,
    /// Geometry sits on the far plane: test `LessEqual`, never write.
    FarPlane,
}

/// One vertex input declared by a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramAttribute {
    pub name: String,
    pub location: u32,
    pub components: u32,
}

/// WGSL source for one named program plus its fixed-function needs.
///
/// Every program has `vs_main` and `fs_main` entry points. Vertex inputs are
/// the `@location` arguments of `vs_main`, either direct or struct members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub name: String,
    pub wgsl: Cow<'static, str>,
    pub texture: TextureBinding,
    pub depth: DepthMode,
}

impl ProgramSource {
    pub fn new(
        name: impl Into<String>,
        wgsl: impl Into<Cow<'static, str>>,
        texture: TextureBinding,
        depth: DepthMode,
    ) -> Self {
        Self {
            name: name.into(),
            wgsl: wgsl.into(),
            texture,
            depth,
        }
    }

    /// Parses and validates the module, then reflects the vertex inputs of
    /// `vs_main` sorted by location.
    pub fn attributes(&self) -> Result<Vec<ProgramAttribute>, RenderError> {
        let module = naga::front::wgsl::parse_str(&self.wgsl)
            .map_err(|e| self.compile_error(e.emit_to_string(&self.wgsl)))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| self.compile_error(format!("validation error: {e}")))?;

        let entry = |name: &'static str, stage| {
            module
                .entry_points
                .iter()
                .find(|ep| ep.name == name && ep.stage == stage)
                .ok_or_else(|| self.compile_error(format!("missing entry point `{name}`")))
        };
        let vertex = entry("vs_main", naga::ShaderStage::Vertex)?;
        entry("fs_main", naga::ShaderStage::Fragment)?;

        let mut attributes = Vec::new();
        for argument in &vertex.function.arguments {
            match (&argument.binding, &module.types[argument.ty].inner) {
                (Some(binding), inner) => {
                    attributes.extend(self.located(argument.name.as_deref(), binding, inner)?);
                }
                (None, naga::TypeInner::Struct { members, .. }) => {
                    for member in members {
                        let Some(binding) = &member.binding else {
                            continue;
                        };
                        let inner = &module.types[member.ty].inner;
                        attributes.extend(self.located(member.name.as_deref(), binding, inner)?);
                    }
                }
                (None, _) => {}
            }
        }

        if attributes.is_empty() {
            return Err(self.compile_error("`vs_main` declares no vertex inputs".into()));
        }
        attributes.sort_by_key(|a| a.location);
        Ok(attributes)
    }

    /// Builtins yield `None`; float scalars and vectors become attributes.
    fn located(
        &self,
        name: Option<&str>,
        binding: &naga::Binding,
        inner: &naga::TypeInner,
    ) -> Result<Option<ProgramAttribute>, RenderError> {
        let naga::Binding::Location { location, .. } = binding else {
            return Ok(None);
        };
        let name = name.unwrap_or_default();
        let float =
            |scalar: &naga::Scalar| scalar.kind == naga::ScalarKind::Float && scalar.width == 4;
        let components = match inner {
            naga::TypeInner::Scalar(scalar) if float(scalar) => 1,
            naga::TypeInner::Vector { size, scalar } if float(scalar) => *size as u32,
            _ => {
                return Err(self.compile_error(format!(
                    "vertex input `{name}` at location {location} is not f32 or vecN<f32>"
                )));
            }
        };

        Ok(Some(ProgramAttribute {
            name: name.to_string(),
            location: *location,
            components,
        }))
    }

    fn compile_error(&self, message: String) -> RenderError {
        RenderError::ShaderCompile {
            program: self.name.clone(),
            message,
        }
    }
}

/// Named program sources available to the [`ProgramCache`](crate::ProgramCache).
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    programs: BTreeMap<String, ProgramSource>,
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ShaderLibrary {
    pub const DEFAULT: &'static str = "default";
    pub const SKYBOX: &'static str = "skybox";
    pub const ADVANCED_SKYBOX: &'static str = "advanced_skybox";

    pub fn empty() -> Self {
        Self {
            programs: BTreeMap::new(),
        }
    }

    /// The lit-textured program and both skybox programs.
    pub fn builtin() -> Self {
        let mut library = Self::empty();
        library.insert(ProgramSource::new(
            Self::DEFAULT,
            format!("{UNIFORMS}{DEFAULT_SHADER}"),
            TextureBinding::D2,
            DepthMode::Standard,
        ));
        library.insert(ProgramSource::new(
            Self::SKYBOX,
            format!("{UNIFORMS}{SKYBOX_SHADER}"),
            TextureBinding::Cube,
            DepthMode::FarPlane,
        ));
        library.insert(ProgramSource::new(
            Self::ADVANCED_SKYBOX,
            format!("{UNIFORMS}{ADVANCED_SKYBOX_SHADER}"),
            TextureBinding::Cube,
            DepthMode::FarPlane,
        ));
        library
    }

    pub fn insert(&mut self, source: ProgramSource) {
        self.programs.insert(source.name.clone(), source);
    }

    pub fn get(&self, name: &str) -> Option<&ProgramSource> {
        self.programs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }
}

/// A minimal valid program whose `VertexInput` struct holds `fields`.
#[cfg(test)]
pub(crate) fn test_program(fields: &str) -> String {
    format!(
        "struct VertexInput {{
            {fields}
        }};

        @vertex
        fn vs_main(in: VertexInput) -> @builtin(position) vec4<f32> {{
            return vec4<f32>(0.0, 0.0, 0.0, 1.0);
        }}

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {{
            return vec4<f32>(1.0);
        }}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_program_reflects_lit_attributes() {
        let library = ShaderLibrary::builtin();
        let attrs = library.get("default").unwrap().attributes().unwrap();
        let summary: Vec<_> = attrs
            .iter()
            .map(|a| (a.name.as_str(), a.location, a.components))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("in_texcoord_0", 0, 2),
                ("in_normal", 1, 3),
                ("in_position", 2, 3)
            ]
        );
    }

    #[test]
    fn skybox_programs_take_position_only() {
        let library = ShaderLibrary::builtin();
        for name in [ShaderLibrary::SKYBOX, ShaderLibrary::ADVANCED_SKYBOX] {
            let source = library.get(name).unwrap();
            let attrs = source.attributes().unwrap();
            assert_eq!(attrs.len(), 1);
            assert_eq!(attrs[0].name, "in_position");
            assert_eq!(source.depth, DepthMode::FarPlane);
            assert_eq!(source.texture, TextureBinding::Cube);
        }
    }

    #[test]
    fn missing_entry_point_is_a_compile_error() {
        let source = ProgramSource::new(
            "broken",
            "struct VertexInput { @location(0) p: vec3<f32>, };
            @vertex
            fn vs_main(in: VertexInput) -> @builtin(position) vec4<f32> {
                return vec4<f32>(in.p, 1.0);
            }",
            TextureBinding::None,
            DepthMode::Standard,
        );
        let err = source.attributes().unwrap_err();
        assert!(matches!(err, RenderError::ShaderCompile { program, message }
            if program == "broken" && message.contains("fs_main")));
    }

    #[test]
    fn unsupported_input_type_is_a_compile_error() {
        let source = ProgramSource::new(
            "ints",
            test_program("@location(0) id: u32,"),
            TextureBinding::None,
            DepthMode::Standard,
        );
        assert!(matches!(
            source.attributes(),
            Err(RenderError::ShaderCompile { .. })
        ));
    }

    #[test]
    fn invalid_wgsl_is_a_compile_error() {
        let source = ProgramSource::new(
            "typo",
            "@vertex fn vs_main( -> {",
            TextureBinding::None,
            DepthMode::Standard,
        );
        assert!(matches!(
            source.attributes(),
            Err(RenderError::ShaderCompile { program, .. }) if program == "typo"
        ));
    }

    #[test]
    fn comments_inside_the_input_struct_are_ignored() {
        let source = ProgramSource::new(
            "commented",
            test_program(
                "@location(0) in_position: vec3<f32>, // object space
                // texture coordinates
                @location(1) in_texcoord_0: vec2f,",
            ),
            TextureBinding::None,
            DepthMode::Standard,
        );
        let attrs = source.attributes().unwrap();
        let names: Vec<_> = attrs
            .iter()
            .map(|a| (a.name.as_str(), a.components))
            .collect();
        assert_eq!(names, vec![("in_position", 3), ("in_texcoord_0", 2)]);
    }

    #[test]
    fn braces_before_the_input_struct_do_not_confuse_reflection() {
        let source = ProgramSource::new(
            "helper_first",
            format!(
                "fn helper() -> f32 {{ return 1.0; // see struct VertexInput\n}}\n{}",
                test_program("@location(3) in_position: vec3<f32>,")
            ),
            TextureBinding::None,
            DepthMode::Standard,
        );
        let attrs = source.attributes().unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!((attrs[0].name.as_str(), attrs[0].location), ("in_position", 3));
    }

    #[test]
    fn direct_location_arguments_and_builtins() {
        let source = ProgramSource::new(
            "direct",
            "@vertex
            fn vs_main(@builtin(vertex_index) index: u32, @location(2) weight: f32) -> @builtin(position) vec4<f32> {
                return vec4<f32>(weight, f32(index), 0.0, 1.0);
            }
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return vec4<f32>(1.0);
            }",
            TextureBinding::None,
            DepthMode::Standard,
        );
        let attrs = source.attributes().unwrap();
        assert_eq!(
            attrs,
            vec![ProgramAttribute {
                name: "weight".into(),
                location: 2,
                components: 1,
            }]
        );
    }
}
