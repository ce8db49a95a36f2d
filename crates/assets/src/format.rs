use crate::error::AssetError;
use crate::kind::MeshKind;

/// Declared layout of one interleaved vertex record.
///
/// `widths` lists field widths in floats (`"2f 3f 3f"`); `attributes` names the
/// shader input each field feeds, in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexFormat {
    pub widths: &'static str,
    pub attributes: &'static [&'static str],
}

/// One resolved field of a [`VertexFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexField {
    pub name: &'static str,
    /// Width in floats (1..=4).
    pub components: u32,
    /// Offset from the record start, in bytes.
    pub offset: u64,
}

impl VertexFormat {
    /// Texcoord, normal, position. Used by the cube and every imported model.
    pub const TEXTURED_LIT: Self = Self {
        widths: "2f 3f 3f",
        attributes: &["in_texcoord_0", "in_normal", "in_position"],
    };

    /// Position only. Used by both skybox kinds.
    pub const POSITION_ONLY: Self = Self {
        widths: "3f",
        attributes: &["in_position"],
    };

    /// Parses the width string and pairs each width with its attribute name.
    pub fn fields(&self) -> Result<Vec<VertexField>, AssetError> {
        let widths = self
            .widths
            .split_whitespace()
            .map(|token| self.parse_width(token))
            .collect::<Result<Vec<_>, _>>()?;

        if widths.len() != self.attributes.len() {
            return Err(self.invalid(format!(
                "{} fields but {} attribute names",
                widths.len(),
                self.attributes.len()
            )));
        }
        if widths.is_empty() {
            return Err(self.invalid("no fields".into()));
        }

        let mut offset = 0u64;
        Ok(widths
            .into_iter()
            .zip(self.attributes.iter())
            .map(|(components, name)| {
                let field = VertexField {
                    name,
                    components,
                    offset,
                };
                offset += u64::from(components) * std::mem::size_of::<f32>() as u64;
                field
            })
            .collect())
    }

    /// Floats per record.
    pub fn record_len(&self) -> Result<usize, AssetError> {
        Ok(self
            .fields()?
            .iter()
            .map(|f| f.components as usize)
            .sum())
    }

    /// Bytes per record.
    pub fn stride(&self) -> Result<u64, AssetError> {
        Ok((self.record_len()? * std::mem::size_of::<f32>()) as u64)
    }

    fn parse_width(&self, token: &str) -> Result<u32, AssetError> {
        let digits = token
            .strip_suffix('f')
            .ok_or_else(|| self.invalid(format!("field {token:?} is not a float field")))?;
        match digits.parse::<u32>() {
            Ok(n @ 1..=4) => Ok(n),
            _ => Err(self.invalid(format!("field {token:?} must have 1 to 4 components"))),
        }
    }

    fn invalid(&self, reason: String) -> AssetError {
        AssetError::Format {
            widths: self.widths.to_string(),
            reason,
        }
    }
}

/// Flat interleaved vertex records for one mesh kind.
///
/// Construction validates that the data is non-empty, a whole number of
/// records, and a whole number of triangles.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexData {
    format: VertexFormat,
    record_len: usize,
    floats: Vec<f32>,
}

impl VertexData {
    pub fn new(kind: &MeshKind, floats: Vec<f32>) -> Result<Self, AssetError> {
        let format = kind.vertex_format();
        let record_len = format.record_len()?;

        if floats.is_empty() {
            return Err(AssetError::EmptyGeometry {
                kind: kind.to_string(),
            });
        }
        if floats.len() % record_len != 0 {
            return Err(AssetError::MalformedGeometry {
                kind: kind.to_string(),
                len: floats.len(),
                record_len,
            });
        }
        let vertices = floats.len() / record_len;
        if vertices % 3 != 0 {
            return Err(AssetError::IncompleteTriangles {
                kind: kind.to_string(),
                vertices,
            });
        }

        Ok(Self {
            format,
            record_len,
            floats,
        })
    }

    pub fn format(&self) -> VertexFormat {
        self.format
    }

    pub fn record_len(&self) -> usize {
        self.record_len
    }

    pub fn vertex_count(&self) -> usize {
        self.floats.len() / self.record_len
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.floats
    }

    pub fn records(&self) -> std::slice::ChunksExact<'_, f32> {
        self.floats.chunks_exact(self.record_len)
    }
}
