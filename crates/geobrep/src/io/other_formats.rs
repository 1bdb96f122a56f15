//! Secondary export/import formats (C11): `.obj`/`.stl` mesh-only
//! exporters are implemented; the formats the original source only
//! partially supported (`.smesh`, Feflow, `.mesh`/`.meshb`) are declared
//! here but return [`GeoBrepError::FormatNotImplemented`] so callers get a
//! clear signal instead of a silent no-op.

use crate::builder::Builder;
use crate::error::{GeoBrepError, Result};
use crate::ids::EntityKind;
use crate::mesh_data::MeshData;
use std::io::Write;

/// Writes every Surface's triangulated geometry as a single Wavefront
/// `.obj` mesh (no material, no per-entity grouping beyond `o` markers).
pub fn write_obj(builder: &Builder, out: &mut impl Write) -> Result<()> {
    let mut offset = 0u32;
    for surface_id in builder.graph.entities(EntityKind::Surface) {
        let entity = builder.graph.mesh_entity(surface_id);
        let MeshData::Surface(mesh) = &entity.mesh else {
            continue;
        };
        writeln!(out, "o {}", if entity.name.is_empty() { "surface" } else { &entity.name })?;
        for v in &mesh.vertices {
            writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
        }
        for polygon in &mesh.polygons {
            write!(out, "f")?;
            for &v in polygon {
                write!(out, " {}", v + offset + 1)?;
            }
            writeln!(out)?;
        }
        offset += mesh.vertices.len() as u32;
    }
    Ok(())
}

/// Writes every triangulated Surface as an ASCII STL solid. Non-triangular
/// polygons are skipped (STL has no native n-gon support).
pub fn write_stl(builder: &Builder, solid_name: &str, out: &mut impl Write) -> Result<()> {
    writeln!(out, "solid {solid_name}")?;
    for surface_id in builder.graph.entities(EntityKind::Surface) {
        let entity = builder.graph.mesh_entity(surface_id);
        let MeshData::Surface(mesh) = &entity.mesh else {
            continue;
        };
        for polygon in &mesh.polygons {
            if polygon.len() != 3 {
                continue;
            }
            let [a, b, c] = [
                mesh.vertices[polygon[0] as usize],
                mesh.vertices[polygon[1] as usize],
                mesh.vertices[polygon[2] as usize],
            ];
            let normal = (b - a).cross(&(c - a)).normalize();
            writeln!(out, "  facet normal {} {} {}", normal.x, normal.y, normal.z)?;
            writeln!(out, "    outer loop")?;
            for p in [a, b, c] {
                writeln!(out, "      vertex {} {} {}", p.x, p.y, p.z)?;
            }
            writeln!(out, "    endloop")?;
            writeln!(out, "  endfacet")?;
        }
    }
    writeln!(out, "endsolid {solid_name}")?;
    Ok(())
}

/// Tetgen `.smesh` surface-mesh export. Not implemented: the original
/// source generates `.smesh` only as an intermediate for its Tetgen
/// volume-meshing pipeline, which is out of this crate's scope.
pub fn write_smesh(_builder: &Builder, _out: &mut impl Write) -> Result<()> {
    Err(GeoBrepError::FormatNotImplemented(".smesh"))
}

/// Feflow ASCII mesh export. Not implemented: the original source's
/// Feflow writer is reservoir-simulator-specific property plumbing this
/// crate has no equivalent attribute set for.
pub fn write_feflow(_builder: &Builder, _out: &mut impl Write) -> Result<()> {
    Err(GeoBrepError::FormatNotImplemented("Feflow"))
}

/// Medit `.mesh`/`.meshb` volume-mesh export. Not implemented: the binary
/// `.meshb` variant needs a version-tagged record format this crate does
/// not have a reader for, so both variants are stubbed together.
pub fn write_medit(_builder: &Builder, _out: &mut impl Write) -> Result<()> {
    Err(GeoBrepError::FormatNotImplemented(".mesh/.meshb"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn write_obj_emits_one_vertex_and_face_line_per_surface() {
        let mut builder = Builder::new(1e-6);
        builder.add_surface(
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2]],
        );
        let mut buffer = Vec::new();
        write_obj(&builder, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with('v')).count(), 3);
        assert_eq!(text.lines().filter(|l| l.starts_with('f')).count(), 1);
    }

    #[test]
    fn unimplemented_formats_report_their_name() {
        let builder = Builder::new(1e-6);
        let mut sink = Vec::new();
        let err = write_smesh(&builder, &mut sink).unwrap_err();
        assert!(err.to_string().contains("smesh"));
    }
}
