use crate::backend::{
    BufferHandle, DrawCall, GlobalState, GpuBackend, GpuError, LayoutDesc, LayoutHandle,
    ProgramHandle, TextureHandle,
};
use crate::shaders::ProgramSource;
use skyview_assets::ImageData;
use std::collections::BTreeSet;
use std::fmt::Write;

/// One call made against a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    SetGlobalState(GlobalState),
    UploadVertices {
        buffer: BufferHandle,
        label: String,
        floats: usize,
    },
    CompileProgram {
        program: ProgramHandle,
        name: String,
    },
    CreateLayout {
        layout: LayoutHandle,
        desc: LayoutDesc,
    },
    UploadTexture {
        texture: TextureHandle,
        name: String,
        width: u32,
        height: u32,
        layers: u32,
    },
    BeginFrame {
        clear_color: [f32; 4],
    },
    Draw {
        program: ProgramHandle,
        layout: LayoutHandle,
        buffer: BufferHandle,
        vertex_count: u32,
        textures: Vec<TextureHandle>,
    },
    EndFrame,
    AbortFrame,
    ReleaseBuffer(BufferHandle),
    ReleaseProgram(ProgramHandle),
    ReleaseLayout(LayoutHandle),
    ReleaseTexture(TextureHandle),
}

/// Headless backend that validates and records every call.
///
/// Used for tests and dry runs. Handles are validated the way a driver would:
/// drawing with a released or unknown handle is an error.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<GpuCommand>,
    next_id: u32,
    buffers: BTreeSet<u32>,
    programs: BTreeSet<u32>,
    layouts: BTreeSet<u32>,
    textures: BTreeSet<u32>,
    in_frame: bool,
    failing_programs: BTreeSet<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `compile_program` reject the program called `name`.
    pub fn fail_compilation_of(&mut self, name: impl Into<String>) {
        self.failing_programs.insert(name.into());
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn clear_log(&mut self) {
        self.commands.clear();
    }

    pub fn upload_count(&self) -> usize {
        self.count(|c| matches!(c, GpuCommand::UploadVertices { .. }))
    }

    pub fn compile_count(&self) -> usize {
        self.count(|c| matches!(c, GpuCommand::CompileProgram { .. }))
    }

    pub fn layout_count(&self) -> usize {
        self.count(|c| matches!(c, GpuCommand::CreateLayout { .. }))
    }

    pub fn texture_upload_count(&self) -> usize {
        self.count(|c| matches!(c, GpuCommand::UploadTexture { .. }))
    }

    pub fn draw_count(&self) -> usize {
        self.count(|c| matches!(c, GpuCommand::Draw { .. }))
    }

    pub fn release_count(&self) -> usize {
        self.count(|c| {
            matches!(
                c,
                GpuCommand::ReleaseBuffer(_)
                    | GpuCommand::ReleaseProgram(_)
                    | GpuCommand::ReleaseLayout(_)
                    | GpuCommand::ReleaseTexture(_)
            )
        })
    }

    /// Resources created and not yet released.
    pub fn live_resources(&self) -> usize {
        self.buffers.len() + self.programs.len() + self.layouts.len() + self.textures.len()
    }

    pub fn layout_descs(&self) -> Vec<&LayoutDesc> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                GpuCommand::CreateLayout { desc, .. } => Some(desc),
                _ => None,
            })
            .collect()
    }

    /// Human-readable command log, one command per line.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            let _ = match command {
                GpuCommand::SetGlobalState(s) => writeln!(
                    out,
                    "state depth_test={} cull_back_faces={}",
                    s.depth_test, s.cull_back_faces
                ),
                GpuCommand::UploadVertices {
                    buffer,
                    label,
                    floats,
                } => writeln!(out, "upload buffer#{} {label} ({floats} floats)", buffer.0),
                GpuCommand::CompileProgram { program, name } => {
                    writeln!(out, "compile program#{} {name}", program.0)
                }
                GpuCommand::CreateLayout { layout, desc } => writeln!(
                    out,
                    "layout#{} {} stride={} inputs={}",
                    layout.0,
                    desc.label,
                    desc.stride,
                    desc.attributes.len()
                ),
                GpuCommand::UploadTexture {
                    texture,
                    name,
                    width,
                    height,
                    layers,
                } => writeln!(
                    out,
                    "texture#{} {name} {width}x{height} layers={layers}",
                    texture.0
                ),
                GpuCommand::BeginFrame { clear_color } => writeln!(
                    out,
                    "begin frame clear=({:.2}, {:.2}, {:.2}, {:.2})",
                    clear_color[0], clear_color[1], clear_color[2], clear_color[3]
                ),
                GpuCommand::Draw {
                    program,
                    layout,
                    vertex_count,
                    ..
                } => writeln!(
                    out,
                    "  draw program#{} layout#{} vertices={vertex_count}",
                    program.0, layout.0
                ),
                GpuCommand::EndFrame => writeln!(out, "end frame"),
                GpuCommand::AbortFrame => writeln!(out, "abort frame"),
                GpuCommand::ReleaseBuffer(h) => writeln!(out, "release buffer#{}", h.0),
                GpuCommand::ReleaseProgram(h) => writeln!(out, "release program#{}", h.0),
                GpuCommand::ReleaseLayout(h) => writeln!(out, "release layout#{}", h.0),
                GpuCommand::ReleaseTexture(h) => writeln!(out, "release texture#{}", h.0),
            };
        }
        out
    }

    fn count(&self, pred: impl Fn(&GpuCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn check(set: &BTreeSet<u32>, kind: &'static str, id: u32) -> Result<(), GpuError> {
        if set.contains(&id) {
            Ok(())
        } else {
            Err(GpuError::InvalidHandle { kind, id })
        }
    }

    fn release(set: &mut BTreeSet<u32>, kind: &str, id: u32) {
        if !set.remove(&id) {
            tracing::error!("{kind}#{id} released twice or never created");
        }
    }
}

impl GpuBackend for RecordingBackend {
    fn set_global_state(&mut self, state: GlobalState) {
        self.commands.push(GpuCommand::SetGlobalState(state));
    }

    fn upload_vertices(&mut self, label: &str, floats: &[f32]) -> Result<BufferHandle, GpuError> {
        if floats.is_empty() {
            return Err(GpuError::EmptyBuffer(label.to_string()));
        }
        let buffer = BufferHandle(self.allocate());
        self.buffers.insert(buffer.0);
        self.commands.push(GpuCommand::UploadVertices {
            buffer,
            label: label.to_string(),
            floats: floats.len(),
        });
        Ok(buffer)
    }

    fn compile_program(&mut self, program: &ProgramSource) -> Result<ProgramHandle, GpuError> {
        if self.failing_programs.contains(&program.name) {
            return Err(GpuError::Compile {
                name: program.name.clone(),
                message: "rejected by recording backend".into(),
            });
        }
        let handle = ProgramHandle(self.allocate());
        self.programs.insert(handle.0);
        self.commands.push(GpuCommand::CompileProgram {
            program: handle,
            name: program.name.clone(),
        });
        Ok(handle)
    }

    fn create_layout(&mut self, desc: &LayoutDesc) -> Result<LayoutHandle, GpuError> {
        Self::check(&self.programs, "program", desc.program.0)?;
        Self::check(&self.buffers, "buffer", desc.buffer.0)?;
        let layout = LayoutHandle(self.allocate());
        self.layouts.insert(layout.0);
        self.commands.push(GpuCommand::CreateLayout {
            layout,
            desc: desc.clone(),
        });
        Ok(layout)
    }

    fn upload_texture(&mut self, name: &str, image: &ImageData) -> Result<TextureHandle, GpuError> {
        let expected = image.width as usize * image.height as usize * 4 * image.layer_count() as usize;
        if expected == 0 || image.rgba.len() != expected {
            return Err(GpuError::InvalidTexture {
                name: name.to_string(),
                reason: format!("{} bytes, expected {expected}", image.rgba.len()),
            });
        }
        let texture = TextureHandle(self.allocate());
        self.textures.insert(texture.0);
        self.commands.push(GpuCommand::UploadTexture {
            texture,
            name: name.to_string(),
            width: image.width,
            height: image.height,
            layers: image.layer_count(),
        });
        Ok(texture)
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) -> Result<(), GpuError> {
        if self.in_frame {
            return Err(GpuError::FrameInProgress);
        }
        self.in_frame = true;
        self.commands.push(GpuCommand::BeginFrame { clear_color });
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), GpuError> {
        if !self.in_frame {
            return Err(GpuError::NoActiveFrame);
        }
        Self::check(&self.programs, "program", call.program.0)?;
        Self::check(&self.layouts, "layout", call.layout.0)?;
        Self::check(&self.buffers, "buffer", call.buffer.0)?;
        for texture in call.textures {
            Self::check(&self.textures, "texture", texture.0)?;
        }
        self.commands.push(GpuCommand::Draw {
            program: call.program,
            layout: call.layout,
            buffer: call.buffer,
            vertex_count: call.vertex_count,
            textures: call.textures.to_vec(),
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        if !self.in_frame {
            return Err(GpuError::NoActiveFrame);
        }
        self.in_frame = false;
        self.commands.push(GpuCommand::EndFrame);
        Ok(())
    }

    fn abort_frame(&mut self) {
        if self.in_frame {
            self.in_frame = false;
            self.commands.push(GpuCommand::AbortFrame);
        }
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        Self::release(&mut self.buffers, "buffer", buffer.0);
        self.commands.push(GpuCommand::ReleaseBuffer(buffer));
    }

    fn release_program(&mut self, program: ProgramHandle) {
        Self::release(&mut self.programs, "program", program.0);
        self.commands.push(GpuCommand::ReleaseProgram(program));
    }

    fn release_layout(&mut self, layout: LayoutHandle) {
        Self::release(&mut self.layouts, "layout", layout.0);
        self.commands.push(GpuCommand::ReleaseLayout(layout));
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        Self::release(&mut self.textures, "texture", texture.0);
        self.commands.push(GpuCommand::ReleaseTexture(texture));
    }
}
