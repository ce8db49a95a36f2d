use skyview_assets::{ImageData, TextureDimension};
use skyview_render::{
    BufferHandle, DepthMode, DrawCall, DrawUniforms, GlobalState, GpuBackend, GpuError,
    LayoutDesc, LayoutHandle, ProgramHandle, ProgramSource, TextureBinding, TextureHandle,
};
use std::collections::BTreeMap;
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const UNIFORM_STRIDE: u64 = std::mem::size_of::<DrawUniforms>() as u64;
const INITIAL_DRAW_CAPACITY: u64 = 64;

struct CompiledProgram {
    name: String,
    module: wgpu::ShaderModule,
    texture: TextureBinding,
    depth: DepthMode,
}

struct Pipeline {
    pipeline: wgpu::RenderPipeline,
    buffer: BufferHandle,
    texture: TextureBinding,
}

struct UploadedTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// A draw recorded between `begin_frame` and `end_frame`.
struct PendingDraw {
    layout: LayoutHandle,
    buffer: BufferHandle,
    texture: Option<TextureHandle>,
    vertex_count: u32,
    uniforms: DrawUniforms,
}

struct Frame {
    clear_color: [f32; 4],
    draws: Vec<PendingDraw>,
}

/// Dynamic-offset uniform buffer holding one [`DrawUniforms`] slot per draw.
struct UniformRing {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
}

impl UniformRing {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw_uniforms"),
            size: capacity * UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_uniforms_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(UNIFORM_STRIDE),
                }),
            }],
        });
        Self {
            buffer,
            bind_group,
            capacity,
        }
    }
}

/// [`GpuBackend`] on top of a wgpu device.
///
/// A vertex layout maps to one render pipeline: the buffer's stride and
/// attribute locations, the program's shader module and the raster state
/// baked together. Draws are recorded during the frame and encoded into a
/// single render pass by `end_frame`, against the target attached with
/// [`WgpuBackend::attach_target`].
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,
    global_state: GlobalState,
    uniform_layout: wgpu::BindGroupLayout,
    texture_2d_layout: wgpu::BindGroupLayout,
    texture_cube_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniforms: UniformRing,
    next_id: u32,
    buffers: BTreeMap<u32, wgpu::Buffer>,
    programs: BTreeMap<u32, CompiledProgram>,
    pipelines: BTreeMap<u32, Pipeline>,
    textures: BTreeMap<u32, UploadedTexture>,
    target: Option<wgpu::TextureView>,
    frame: Option<Frame>,
}

impl WgpuBackend {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(UNIFORM_STRIDE),
                },
                count: None,
            }],
        });
        let texture_2d_layout =
            Self::texture_layout(&device, "texture_2d_layout", wgpu::TextureViewDimension::D2);
        let texture_cube_layout =
            Self::texture_layout(&device, "texture_cube_layout", wgpu::TextureViewDimension::Cube);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniforms = UniformRing::new(&device, &uniform_layout, INITIAL_DRAW_CAPACITY);
        let depth_view = Self::create_depth_texture(&device, width, height);

        Self {
            device,
            queue,
            surface_format,
            depth_view,
            global_state: GlobalState::default(),
            uniform_layout,
            texture_2d_layout,
            texture_cube_layout,
            sampler,
            uniforms,
            next_id: 0,
            buffers: BTreeMap::new(),
            programs: BTreeMap::new(),
            pipelines: BTreeMap::new(),
            textures: BTreeMap::new(),
            target: None,
            frame: None,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.depth_view = Self::create_depth_texture(&self.device, width, height);
    }

    /// Sets the color target for the next frame. Taken by `end_frame`.
    pub fn attach_target(&mut self, view: wgpu::TextureView) {
        self.target = Some(view);
    }

    fn texture_layout(
        device: &wgpu::Device,
        label: &str,
        view_dimension: wgpu::TextureViewDimension,
    ) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn depth_state(&self, mode: DepthMode) -> wgpu::DepthStencilState {
        let (depth_write_enabled, depth_compare) = match (self.global_state.depth_test, mode) {
            (false, _) => (false, wgpu::CompareFunction::Always),
            (true, DepthMode::Standard) => (true, wgpu::CompareFunction::Less),
            (true, DepthMode::FarPlane) => (false, wgpu::CompareFunction::LessEqual),
        };
        wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare,
            stencil: Default::default(),
            bias: Default::default(),
        }
    }

    /// Runs `f` inside a validation error scope and reports what it caught.
    fn validated<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<String>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error.map(|e| e.to_string()))
    }

    fn ensure_uniform_capacity(&mut self, draws: u64) {
        if draws <= self.uniforms.capacity {
            return;
        }
        let capacity = draws.next_power_of_two();
        tracing::debug!("growing uniform ring to {capacity} draws");
        self.uniforms = UniformRing::new(&self.device, &self.uniform_layout, capacity);
    }
}

fn vertex_format(components: u32) -> Option<wgpu::VertexFormat> {
    match components {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

fn clear_color(color: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: color[0] as f64,
        g: color[1] as f64,
        b: color[2] as f64,
        a: color[3] as f64,
    }
}

impl GpuBackend for WgpuBackend {
    fn set_global_state(&mut self, state: GlobalState) {
        if !self.pipelines.is_empty() {
            tracing::warn!("raster state changed after pipelines were built");
        }
        self.global_state = state;
    }

    fn upload_vertices(&mut self, label: &str, floats: &[f32]) -> Result<BufferHandle, GpuError> {
        if floats.is_empty() {
            return Err(GpuError::EmptyBuffer(label.to_string()));
        }
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(floats),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = self.allocate();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn compile_program(&mut self, program: &ProgramSource) -> Result<ProgramHandle, GpuError> {
        let (module, error) = self.validated(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&program.name),
                source: wgpu::ShaderSource::Wgsl(program.wgsl.clone()),
            })
        });
        if let Some(message) = error {
            return Err(GpuError::Compile {
                name: program.name.clone(),
                message,
            });
        }
        let id = self.allocate();
        self.programs.insert(
            id,
            CompiledProgram {
                name: program.name.clone(),
                module,
                texture: program.texture,
                depth: program.depth,
            },
        );
        Ok(ProgramHandle(id))
    }

    fn create_layout(&mut self, desc: &LayoutDesc) -> Result<LayoutHandle, GpuError> {
        let program = self
            .programs
            .get(&desc.program.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "program",
                id: desc.program.0,
            })?;
        if !self.buffers.contains_key(&desc.buffer.0) {
            return Err(GpuError::InvalidHandle {
                kind: "buffer",
                id: desc.buffer.0,
            });
        }

        let attributes = desc
            .attributes
            .iter()
            .map(|a| {
                let format = vertex_format(a.components).ok_or_else(|| GpuError::Pipeline {
                    label: desc.label.clone(),
                    message: format!("unsupported attribute width {}", a.components),
                })?;
                Ok(wgpu::VertexAttribute {
                    format,
                    offset: a.offset,
                    shader_location: a.location,
                })
            })
            .collect::<Result<Vec<_>, GpuError>>()?;

        let mut bind_group_layouts = vec![&self.uniform_layout];
        match program.texture {
            TextureBinding::None => {}
            TextureBinding::D2 => bind_group_layouts.push(&self.texture_2d_layout),
            TextureBinding::Cube => bind_group_layouts.push(&self.texture_cube_layout),
        }
        let depth_stencil = self.depth_state(program.depth);
        let cull_mode = self.global_state.cull_back_faces.then_some(wgpu::Face::Back);

        let (pipeline, error) = self.validated(|device| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&desc.label),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&desc.label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &program.module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: desc.stride,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &attributes,
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &program.module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode,
                    ..Default::default()
                },
                depth_stencil: Some(depth_stencil),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        });
        if let Some(message) = error {
            return Err(GpuError::Pipeline {
                label: desc.label.clone(),
                message,
            });
        }

        tracing::debug!("pipeline {} built for program {}", desc.label, program.name);
        let texture = program.texture;
        let id = self.allocate();
        self.pipelines.insert(
            id,
            Pipeline {
                pipeline,
                buffer: desc.buffer,
                texture,
            },
        );
        Ok(LayoutHandle(id))
    }

    fn upload_texture(&mut self, name: &str, image: &ImageData) -> Result<TextureHandle, GpuError> {
        let layers = image.layer_count();
        let expected = image.width as usize * image.height as usize * 4 * layers as usize;
        if expected == 0 || image.rgba.len() != expected {
            return Err(GpuError::InvalidTexture {
                name: name.to_string(),
                reason: format!("{} bytes, expected {expected}", image.rgba.len()),
            });
        }

        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(name),
                size: wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: layers,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &image.rgba,
        );
        let (view_dimension, layout) = match image.dimension {
            TextureDimension::D2 => (wgpu::TextureViewDimension::D2, &self.texture_2d_layout),
            TextureDimension::Cube => (wgpu::TextureViewDimension::Cube, &self.texture_cube_layout),
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(name),
            dimension: Some(view_dimension),
            ..Default::default()
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(name),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let id = self.allocate();
        self.textures.insert(
            id,
            UploadedTexture {
                texture,
                bind_group,
            },
        );
        Ok(TextureHandle(id))
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) -> Result<(), GpuError> {
        if self.frame.is_some() {
            return Err(GpuError::FrameInProgress);
        }
        if self.target.is_none() {
            return Err(GpuError::NoTarget);
        }
        self.frame = Some(Frame {
            clear_color,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), GpuError> {
        let pipeline = self
            .pipelines
            .get(&call.layout.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "layout",
                id: call.layout.0,
            })?;
        if !self.programs.contains_key(&call.program.0) {
            return Err(GpuError::InvalidHandle {
                kind: "program",
                id: call.program.0,
            });
        }
        if !self.buffers.contains_key(&call.buffer.0) || pipeline.buffer != call.buffer {
            return Err(GpuError::InvalidHandle {
                kind: "buffer",
                id: call.buffer.0,
            });
        }
        let texture = call.textures.first().copied();
        if let Some(texture) = texture {
            if !self.textures.contains_key(&texture.0) {
                return Err(GpuError::InvalidHandle {
                    kind: "texture",
                    id: texture.0,
                });
            }
        }
        if pipeline.texture != TextureBinding::None && texture.is_none() {
            return Err(GpuError::InvalidTexture {
                name: format!("layout#{}", call.layout.0),
                reason: "program samples a texture but none was bound".into(),
            });
        }

        let frame = self.frame.as_mut().ok_or(GpuError::NoActiveFrame)?;
        frame.draws.push(PendingDraw {
            layout: call.layout,
            buffer: call.buffer,
            texture,
            vertex_count: call.vertex_count,
            uniforms: call.uniforms,
        });
        Ok(())
    }

    fn abort_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            tracing::warn!("dropping frame with {} recorded draws", frame.draws.len());
        }
        self.target = None;
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        let frame = self.frame.take().ok_or(GpuError::NoActiveFrame)?;
        let target = self.target.take().ok_or(GpuError::NoTarget)?;

        self.ensure_uniform_capacity(frame.draws.len() as u64);
        let slots: Vec<DrawUniforms> = frame.draws.iter().map(|d| d.uniforms).collect();
        if !slots.is_empty() {
            self.queue
                .write_buffer(&self.uniforms.buffer, 0, bytemuck::cast_slice(&slots));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(frame.clear_color)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for (index, draw) in frame.draws.iter().enumerate() {
                // Handles were checked in `draw`; release cannot happen mid-frame.
                let (Some(pipeline), Some(buffer)) = (
                    self.pipelines.get(&draw.layout.0),
                    self.buffers.get(&draw.buffer.0),
                ) else {
                    continue;
                };
                let offset = (index as u64 * UNIFORM_STRIDE) as u32;
                pass.set_pipeline(&pipeline.pipeline);
                pass.set_bind_group(0, &self.uniforms.bind_group, &[offset]);
                if let Some(texture) = draw.texture.and_then(|t| self.textures.get(&t.0)) {
                    pass.set_bind_group(1, &texture.bind_group, &[]);
                }
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..draw.vertex_count, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if let Some(b) = self.buffers.remove(&buffer.0) {
            b.destroy();
        }
    }

    fn release_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program.0);
    }

    fn release_layout(&mut self, layout: LayoutHandle) {
        self.pipelines.remove(&layout.0);
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if let Some(t) = self.textures.remove(&texture.0) {
            t.texture.destroy();
        }
    }
}
