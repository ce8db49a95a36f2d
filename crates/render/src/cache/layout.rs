use super::buffer::GpuMesh;
use super::program::Program;
use crate::backend::{BoundAttribute, BufferHandle, GpuBackend, LayoutDesc, LayoutHandle};
use crate::error::RenderError;
use skyview_assets::MeshKind;
use std::collections::BTreeMap;

/// A vertex layout: one program's inputs fed from one mesh buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuLayout {
    pub handle: LayoutHandle,
    pub program: String,
    pub buffer: BufferHandle,
    pub vertex_count: u32,
}

/// One layout per (program, mesh kind) pair.
///
/// The same buffer bound to two programs gets two layouts, since each program
/// may place the same attribute at a different location.
#[derive(Debug, Default)]
pub struct LayoutCache {
    layouts: BTreeMap<(String, MeshKind), GpuLayout>,
    released: bool,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<B: GpuBackend + ?Sized>(
        &mut self,
        program: &Program,
        mesh: &GpuMesh,
        backend: &mut B,
    ) -> Result<GpuLayout, RenderError> {
        if self.released {
            return Err(RenderError::Released { cache: "layout" });
        }
        let key = (program.name.clone(), mesh.kind.clone());
        if let Some(layout) = self.layouts.get(&key) {
            return Ok(layout.clone());
        }

        let desc = Self::bind(program, mesh)?;
        let handle = backend.create_layout(&desc)?;
        tracing::info!("bound {} to program {}", mesh.kind, program.name);

        let layout = GpuLayout {
            handle,
            program: program.name.clone(),
            buffer: mesh.buffer,
            vertex_count: mesh.vertex_count,
        };
        self.layouts.insert(key, layout.clone());
        Ok(layout)
    }

    /// Resolves every field of the mesh format against the program's inputs.
    fn bind(program: &Program, mesh: &GpuMesh) -> Result<LayoutDesc, RenderError> {
        let bind_error = |reason: String| RenderError::AttributeBind {
            program: program.name.clone(),
            mesh: mesh.kind.to_string(),
            reason,
        };

        let fields = mesh.format.fields()?;
        let mut attributes = Vec::with_capacity(fields.len());
        for field in &fields {
            let input = program.attribute(field.name).ok_or_else(|| {
                bind_error(format!("attribute {} is not declared by the program", field.name))
            })?;
            if input.components != field.components {
                return Err(bind_error(format!(
                    "attribute {} has {} components in the buffer but {} in the program",
                    field.name, field.components, input.components
                )));
            }
            attributes.push(BoundAttribute {
                location: input.location,
                components: field.components,
                offset: field.offset,
            });
        }

        if let Some(unfed) = program
            .attributes
            .iter()
            .find(|a| !fields.iter().any(|f| f.name == a.name))
        {
            return Err(bind_error(format!(
                "program input {} has no source field in format {:?}",
                unfed.name, mesh.format.widths
            )));
        }

        Ok(LayoutDesc {
            label: format!("{}/{}", program.name, mesh.kind),
            program: program.handle,
            buffer: mesh.buffer,
            stride: mesh.format.stride()?,
            attributes,
        })
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn release_all<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.released {
            return;
        }
        for layout in std::mem::take(&mut self.layouts).into_values() {
            backend.release_layout(layout.handle);
        }
        self.released = true;
    }
}
