//! Per-kind mesh storage (C2).
//!
//! A [`crate::entity::MeshEntity`] owns exactly one of these, chosen by its
//! [`crate::ids::EntityKind`]: a [`Corner`] is a single point, a [`Line`] an
//! ordered polyline, a [`Surface`] a polygon soup, a [`Region`] either just
//! its boundary surfaces (no interior mesh) or a tetrahedral volume mesh.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// A single point; the geometry of a Corner entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    pub vertex: Option<Point>,
}

impl Corner {
    pub fn new(vertex: Point) -> Self {
        Corner {
            vertex: Some(vertex),
        }
    }
}

/// An ordered polyline. Edge `i` connects `vertices[i]` to `vertices[i + 1]`;
/// there is no stored edge list, the order of `vertices` *is* the topology.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub vertices: Vec<Point>,
}

impl Line {
    pub fn edge_count(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    pub fn edges(&self) -> impl Iterator<Item = [u32; 2]> + '_ {
        (0..self.edge_count()).map(|i| [i as u32, i as u32 + 1])
    }

    pub fn is_closed(&self) -> bool {
        matches!((self.vertices.first(), self.vertices.last()),
            (Some(a), Some(b)) if a == b && self.vertices.len() > 1)
    }
}

/// A polygon soup: a flat vertex pool plus per-polygon local-index lists.
/// Polygons may be triangles or general n-gons, same as the original
/// source's `SurfaceMesh`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub vertices: Vec<Point>,
    pub polygons: Vec<Vec<u32>>,
}

impl Surface {
    pub fn polygon_vertex_count(&self) -> usize {
        self.polygons.iter().map(Vec::len).sum()
    }

    /// Edges of polygon `p` as ordered (directed) local-vertex pairs.
    pub fn polygon_edges(&self, p: usize) -> impl Iterator<Item = (u32, u32)> + '_ {
        let poly = &self.polygons[p];
        let n = poly.len();
        (0..n).map(move |i| (poly[i], poly[(i + 1) % n]))
    }
}

/// Either just the boundary (an empty `tets`) or a tetrahedral volume mesh.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub vertices: Vec<Point>,
    pub tets: Vec<[u32; 4]>,
}

impl Region {
    pub fn is_meshed(&self) -> bool {
        !self.tets.is_empty()
    }
}

/// The geometry owned by one mesh entity, tagged by its kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MeshData {
    Corner(Corner),
    Line(Line),
    Surface(Surface),
    Region(Region),
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        match self {
            MeshData::Corner(c) => usize::from(c.vertex.is_some()),
            MeshData::Line(l) => l.vertices.len(),
            MeshData::Surface(s) => s.vertices.len(),
            MeshData::Region(r) => r.vertices.len(),
        }
    }

    pub fn vertex(&self, local: usize) -> Option<&Point> {
        match self {
            MeshData::Corner(c) => {
                if local == 0 {
                    c.vertex.as_ref()
                } else {
                    None
                }
            }
            MeshData::Line(l) => l.vertices.get(local),
            MeshData::Surface(s) => s.vertices.get(local),
            MeshData::Region(r) => r.vertices.get(local),
        }
    }

    pub fn vertex_mut(&mut self, local: usize) -> Option<&mut Point> {
        match self {
            MeshData::Corner(c) => {
                if local == 0 {
                    c.vertex.as_mut()
                } else {
                    None
                }
            }
            MeshData::Line(l) => l.vertices.get_mut(local),
            MeshData::Surface(s) => s.vertices.get_mut(local),
            MeshData::Region(r) => r.vertices.get_mut(local),
        }
    }

    pub fn vertices(&self) -> &[Point] {
        match self {
            MeshData::Corner(c) => std::slice::from_ref(c.vertex.as_ref().unwrap_or(&ORIGIN)),
            MeshData::Line(l) => &l.vertices,
            MeshData::Surface(s) => &s.vertices,
            MeshData::Region(r) => &r.vertices,
        }
    }
}

const ORIGIN: Point = Point::new(0.0, 0.0, 0.0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_edges_are_consecutive_pairs() {
        let line = Line {
            vertices: vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(2.0, 0.0, 0.0),
            ],
        };
        let edges: Vec<_> = line.edges().collect();
        assert_eq!(edges, vec![[0, 1], [1, 2]]);
    }

    #[test]
    fn surface_polygon_edges_wrap_around() {
        let surface = Surface {
            vertices: vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
            polygons: vec![vec![0, 1, 2]],
        };
        let edges: Vec<_> = surface.polygon_edges(0).collect();
        assert_eq!(edges, vec![(0, 1), (1, 2), (2, 0)]);
    }

    #[test]
    fn region_without_tets_is_boundary_only() {
        let region = Region::default();
        assert!(!region.is_meshed());
    }
}
