use crate::error::AssetError;
use glam::Vec3;
use std::path::Path;

/// Imports an OBJ file as interleaved texcoord/normal/position records.
///
/// Faces are grouped by material. The group of the lowest material index
/// that has geometry is used; faces without a material are only used when
/// the file has no material groups at all.
pub(crate) fn import(path: &Path) -> Result<Vec<f32>, AssetError> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, materials) =
        tobj::load_obj(path, &options).map_err(|source| AssetError::ObjParse {
            path: path.to_path_buf(),
            source,
        })?;

    if let Err(e) = materials {
        tracing::warn!("materials for {} unavailable: {e}", path.display());
    }

    let Some(selected) = select_material(&models) else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for model in models.iter().filter(|m| m.mesh.material_id == selected) {
        interleave(path, &model.mesh, &mut out)?;
    }

    let groups = models
        .iter()
        .filter_map(|m| m.mesh.material_id)
        .collect::<std::collections::BTreeSet<_>>();
    if groups.len() > 1 {
        tracing::warn!(
            "{} has {} material groups; only material {:?} is loaded",
            path.display(),
            groups.len(),
            selected
        );
    }

    Ok(out)
}

fn select_material(models: &[tobj::Model]) -> Option<Option<usize>> {
    let with_geometry = || models.iter().filter(|m| !m.mesh.indices.is_empty());
    with_geometry()
        .filter_map(|m| m.mesh.material_id)
        .min()
        .map(Some)
        .or_else(|| with_geometry().next().map(|_| None))
}

fn interleave(path: &Path, mesh: &tobj::Mesh, out: &mut Vec<f32>) -> Result<(), AssetError> {
    let vertices = mesh.positions.len() / 3;
    // Faces that mix `vt`/`vn` with bare indices leave these streams short.
    let texcoords = (mesh.texcoords.len() == vertices * 2).then_some(&mesh.texcoords);
    let normals = (mesh.normals.len() == vertices * 3).then_some(&mesh.normals);
    if texcoords.is_none() && !mesh.texcoords.is_empty() {
        tracing::warn!(
            "{}: texcoords missing on some faces, using (0, 0)",
            path.display()
        );
    }
    if normals.is_none() && !mesh.normals.is_empty() {
        tracing::warn!(
            "{}: normals missing on some faces, using face normals",
            path.display()
        );
    }

    let position = |index: u32| {
        let i = index as usize * 3;
        mesh.positions
            .get(i..i + 3)
            .map(Vec3::from_slice)
            .ok_or_else(|| AssetError::VertexIndex {
                path: path.to_path_buf(),
                index,
                vertices,
            })
    };

    for triangle in mesh.indices.chunks_exact(3) {
        let corners = [
            position(triangle[0])?,
            position(triangle[1])?,
            position(triangle[2])?,
        ];
        let face_normal = (corners[1] - corners[0])
            .cross(corners[2] - corners[0])
            .normalize_or_zero();

        for (&index, p) in triangle.iter().zip(corners) {
            let i = index as usize;
            match texcoords.and_then(|t| t.get(i * 2..i * 2 + 2)) {
                Some(uv) => out.extend_from_slice(uv),
                None => out.extend_from_slice(&[0.0, 0.0]),
            }
            match normals.and_then(|n| n.get(i * 3..i * 3 + 3)) {
                Some(n) => out.extend_from_slice(n),
                None => out.extend_from_slice(&face_normal.to_array()),
            }
            out.extend_from_slice(&p.to_array());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const QUAD_WITH_NORMALS: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn quad_is_triangulated_and_interleaved() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "quad.obj", QUAD_WITH_NORMALS);
        let floats = import(&path).unwrap();

        assert_eq!(floats.len(), 6 * 8);
        let first = &floats[..8];
        assert_eq!(&first[0..2], &[0.0, 0.0]);
        assert_eq!(&first[2..5], &[0.0, 0.0, 1.0]);
        assert_eq!(&first[5..8], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_normals_become_face_normals() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "tri.obj",
            "v 0 0 0\nv 0 0 1\nv 1 0 0\nf 1 2 3\n",
        );
        let floats = import(&path).unwrap();

        assert_eq!(floats.len(), 3 * 8);
        for record in floats.chunks_exact(8) {
            assert_eq!(&record[0..2], &[0.0, 0.0]);
            assert_eq!(&record[2..5], &[0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn first_material_group_is_selected() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "two.mtl",
            "newmtl stone\nKd 1 1 1\nnewmtl bronze\nKd 1 0.5 0\n",
        );
        let path = write(
            dir.path(),
            "two.obj",
            "\
mtllib two.mtl
v 0 0 0
v 1 0 0
v 0 1 0
v 5 5 5
v 6 5 5
v 5 6 5
o statue
usemtl bronze
f 4 5 6
o base
usemtl stone
f 1 2 3
",
        );
        let floats = import(&path).unwrap();

        assert_eq!(floats.len(), 3 * 8);
        assert_eq!(&floats[5..8], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn faces_without_texcoords_fall_back_to_origin() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "mixed_vt.obj",
            "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
v 1 0 1
v 0 1 1
vt 0 0
vt 0 0
vt 0 0
f 1/1 2/2 3/3
f 4 5 6
",
        );
        let floats = import(&path).unwrap();

        assert_eq!(floats.len(), 6 * 8);
        for record in floats.chunks_exact(8) {
            assert_eq!(&record[0..2], &[0.0, 0.0]);
            assert_eq!(&record[2..5], &[0.0, 0.0, 1.0]);
        }
        assert_eq!(&floats[8 * 5 + 5..], &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn faces_without_normals_use_face_normals() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "mixed_vn.obj",
            "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
v 1 0 1
v 0 1 1
vn 0 0 1
f 1//1 2//1 3//1
f 4 5 6
",
        );
        let floats = import(&path).unwrap();

        assert_eq!(floats.len(), 6 * 8);
        for record in floats.chunks_exact(8) {
            assert_eq!(&record[2..5], &[0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn file_without_faces_yields_no_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "points.obj", "v 0 0 0\nv 1 0 0\n");
        assert!(import(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = import(Path::new("/definitely/not/here.obj")).unwrap_err();
        assert!(matches!(err, AssetError::ObjParse { .. }));
    }
}
