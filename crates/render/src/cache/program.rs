use crate::backend::{GpuBackend, GpuError, ProgramHandle};
use crate::error::RenderError;
use crate::shaders::{DepthMode, ProgramAttribute, ShaderLibrary, TextureBinding};
use std::collections::BTreeMap;

/// A compiled program and its reflected vertex inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub name: String,
    pub handle: ProgramHandle,
    pub attributes: Vec<ProgramAttribute>,
    pub texture: TextureBinding,
    pub depth: DepthMode,
}

impl Program {
    pub fn attribute(&self, name: &str) -> Option<&ProgramAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// One compiled program per name.
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: BTreeMap<String, Program>,
    released: bool,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<B: GpuBackend + ?Sized>(
        &mut self,
        name: &str,
        library: &ShaderLibrary,
        backend: &mut B,
    ) -> Result<Program, RenderError> {
        if self.released {
            return Err(RenderError::Released { cache: "program" });
        }
        if let Some(program) = self.programs.get(name) {
            return Ok(program.clone());
        }

        let source = library
            .get(name)
            .ok_or_else(|| RenderError::UnknownProgram(name.to_string()))?;
        let attributes = source.attributes()?;
        let handle = backend
            .compile_program(source)
            .map_err(|e| match e {
                GpuError::Compile { message, .. } => RenderError::ShaderCompile {
                    program: name.to_string(),
                    message,
                },
                other => other.into(),
            })?;

        let program = Program {
            name: name.to_string(),
            handle,
            attributes,
            texture: source.texture,
            depth: source.depth,
        };
        tracing::info!(
            "compiled program {name} ({} inputs)",
            program.attributes.len()
        );
        self.programs.insert(name.to_string(), program.clone());
        Ok(program)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn release_all<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.released {
            return;
        }
        for program in std::mem::take(&mut self.programs).into_values() {
            backend.release_program(program.handle);
        }
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;
    use crate::shaders::ProgramSource;

    #[test]
    fn programs_are_shared_by_name() {
        let mut backend = RecordingBackend::new();
        let mut cache = ProgramCache::new();
        let library = ShaderLibrary::builtin();

        let a = cache.get("default", &library, &mut backend).unwrap();
        let b = cache.get("default", &library, &mut backend).unwrap();
        let sky = cache.get("skybox", &library, &mut backend).unwrap();

        assert_eq!(a.handle, b.handle);
        assert_ne!(a.handle, sky.handle);
        assert_eq!(backend.compile_count(), 2);
        assert!(a.attribute("in_normal").is_some());
    }

    #[test]
    fn unknown_program_is_an_error() {
        let mut backend = RecordingBackend::new();
        let mut cache = ProgramCache::new();
        let err = cache
            .get("toon", &ShaderLibrary::builtin(), &mut backend)
            .unwrap_err();
        assert!(matches!(err, RenderError::UnknownProgram(name) if name == "toon"));
    }

    #[test]
    fn backend_compile_failure_is_a_shader_error() {
        let mut backend = RecordingBackend::new();
        backend.fail_compilation_of("default");
        let mut cache = ProgramCache::new();
        let err = cache
            .get("default", &ShaderLibrary::builtin(), &mut backend)
            .unwrap_err();
        assert!(matches!(err, RenderError::ShaderCompile { program, .. } if program == "default"));
        assert!(cache.is_empty());
    }

    #[test]
    fn reflection_failure_never_reaches_the_backend() {
        let mut library = ShaderLibrary::empty();
        library.insert(ProgramSource::new(
            "headless",
            "fn vs_main() {} fn fs_main() {}",
            TextureBinding::None,
            DepthMode::Standard,
        ));
        let mut backend = RecordingBackend::new();
        let mut cache = ProgramCache::new();

        assert!(cache.get("headless", &library, &mut backend).is_err());
        assert_eq!(backend.compile_count(), 0);
    }

    #[test]
    fn get_after_release_is_an_error() {
        let mut backend = RecordingBackend::new();
        let mut cache = ProgramCache::new();
        let library = ShaderLibrary::builtin();
        cache.get("default", &library, &mut backend).unwrap();
        cache.release_all(&mut backend);

        assert!(matches!(
            cache.get("default", &library, &mut backend),
            Err(RenderError::Released { cache: "program" })
        ));
    }
}
