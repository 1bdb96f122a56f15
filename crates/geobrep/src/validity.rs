//! Validity checker (C7).
//!
//! Mirrors the original source's `ValidityCheckMode` bitmask
//! (`geomodel_validity.h`) but never throws: [`check_validity`] always
//! returns a [`ValidityReport`], and callers decide whether a non-empty
//! report is fatal (the `.ml` importer does, via
//! [`crate::error::GeoBrepError::ValidityError`]; an interactive caller
//! might just log it).

use crate::geometry::within;
use crate::graph::EntityGraph;
use crate::ids::{EntityId, EntityKind};

/// Bitmask selecting which families of checks [`check_validity`] runs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ValidityCheckMode(u32);

impl ValidityCheckMode {
    pub const FINITE_EXTENSION: ValidityCheckMode = ValidityCheckMode(1 << 0);
    pub const CONNECTIVITY: ValidityCheckMode = ValidityCheckMode(1 << 1);
    pub const GEOLOGICAL: ValidityCheckMode = ValidityCheckMode(1 << 2);
    pub const SURFACE_LINE_CONFORMITY: ValidityCheckMode = ValidityCheckMode(1 << 3);
    pub const REGION_SURFACE_CONFORMITY: ValidityCheckMode = ValidityCheckMode(1 << 4);
    pub const MESH_ENTITIES: ValidityCheckMode = ValidityCheckMode(1 << 5);
    pub const NON_MANIFOLD_EDGES: ValidityCheckMode = ValidityCheckMode(1 << 6);
    pub const POLYGON_INTERSECTIONS: ValidityCheckMode = ValidityCheckMode(1 << 7);

    pub const TOPOLOGY: ValidityCheckMode = ValidityCheckMode(
        Self::FINITE_EXTENSION.0 | Self::CONNECTIVITY.0 | Self::GEOLOGICAL.0,
    );
    pub const GEOMETRY: ValidityCheckMode = ValidityCheckMode(
        Self::SURFACE_LINE_CONFORMITY.0
            | Self::REGION_SURFACE_CONFORMITY.0
            | Self::MESH_ENTITIES.0
            | Self::NON_MANIFOLD_EDGES.0
            | Self::POLYGON_INTERSECTIONS.0,
    );
    pub const ALL: ValidityCheckMode = ValidityCheckMode(Self::TOPOLOGY.0 | Self::GEOMETRY.0);

    pub const fn contains(self, other: ValidityCheckMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: ValidityCheckMode) -> ValidityCheckMode {
        ValidityCheckMode(self.0 | other.0)
    }
}

impl std::ops::BitOr for ValidityCheckMode {
    type Output = ValidityCheckMode;
    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// One specific invariant violation.
#[derive(Clone, Debug, PartialEq)]
pub struct Violation {
    pub entity: Option<EntityId>,
    pub description: String,
}

/// The outcome of [`check_validity`]: a violation list per check family,
/// so a caller (or the debug-artifact writer, C13) can report exactly
/// which invariant failed where, instead of a single pass/fail bit.
#[derive(Clone, Debug, Default)]
pub struct ValidityReport {
    pub finite_extension: Vec<Violation>,
    pub connectivity: Vec<Violation>,
    pub geological: Vec<Violation>,
    pub surface_line_conformity: Vec<Violation>,
    pub region_surface_conformity: Vec<Violation>,
    pub mesh_entities: Vec<Violation>,
    pub non_manifold_edges: Vec<Violation>,
    pub polygon_intersections: Vec<Violation>,
}

impl ValidityReport {
    pub fn is_valid(&self) -> bool {
        self.total_violations() == 0
    }

    pub fn total_violations(&self) -> usize {
        self.finite_extension.len()
            + self.connectivity.len()
            + self.geological.len()
            + self.surface_line_conformity.len()
            + self.region_surface_conformity.len()
            + self.mesh_entities.len()
            + self.non_manifold_edges.len()
            + self.polygon_intersections.len()
    }

    /// All violations flattened into one sequence, each tagged with the
    /// name of the check family that produced it (used by the debug
    /// artifact writer, C13, to name its per-invariant output files).
    pub fn by_family(&self) -> Vec<(&'static str, &Violation)> {
        let families: [(&'static str, &Vec<Violation>); 8] = [
            ("finite_extension", &self.finite_extension),
            ("connectivity", &self.connectivity),
            ("geological", &self.geological),
            ("surface_line_conformity", &self.surface_line_conformity),
            ("region_surface_conformity", &self.region_surface_conformity),
            ("mesh_entities", &self.mesh_entities),
            ("non_manifold_edges", &self.non_manifold_edges),
            ("polygon_intersections", &self.polygon_intersections),
        ];
        families
            .into_iter()
            .flat_map(|(name, vs)| vs.iter().map(move |v| (name, v)))
            .collect()
    }
}

/// Runs the checks selected by `mode` against `graph`, returning a full
/// report rather than stopping at the first failure. `epsilon` is the
/// model's own colocation tolerance (`Builder`/`SharedVertexIndex`'s,
/// derived per spec.md §4.10 as `diagonal * 1e-6`) — the geometric
/// conformity checks compare against it rather than an unrelated literal,
/// so a model whose bounding-box diagonal isn't ~1.0 is still judged by
/// its own tolerance.
pub fn check_validity(graph: &EntityGraph, mode: ValidityCheckMode, epsilon: f64) -> ValidityReport {
    let mut report = ValidityReport::default();

    if mode.contains(ValidityCheckMode::FINITE_EXTENSION) {
        check_finite_extension(graph, &mut report);
    }
    if mode.contains(ValidityCheckMode::CONNECTIVITY) {
        check_connectivity(graph, &mut report);
    }
    if mode.contains(ValidityCheckMode::GEOLOGICAL) {
        check_geological(graph, &mut report);
    }
    if mode.contains(ValidityCheckMode::SURFACE_LINE_CONFORMITY) {
        check_surface_line_conformity(graph, epsilon, &mut report);
    }
    if mode.contains(ValidityCheckMode::REGION_SURFACE_CONFORMITY) {
        check_region_surface_conformity(graph, epsilon, &mut report);
    }
    if mode.contains(ValidityCheckMode::MESH_ENTITIES) {
        check_mesh_entities(graph, &mut report);
    }
    if mode.contains(ValidityCheckMode::NON_MANIFOLD_EDGES) {
        check_non_manifold_edges(graph, &mut report);
    }
    if mode.contains(ValidityCheckMode::POLYGON_INTERSECTIONS) {
        check_polygon_intersections(graph, &mut report);
    }

    report
}

/// The Universe and every Region must together close off the whole model:
/// every Surface not on the void-of-interest boundary must bound exactly
/// two regions (counting the Universe as one).
fn check_finite_extension(graph: &EntityGraph, report: &mut ValidityReport) {
    for id in graph.entities(EntityKind::Surface) {
        if graph.mesh_entity(id).is_on_voi() {
            continue;
        }
        let sides_used = [graph.find_region(id, true), graph.find_region(id, false)];
        let universe_sides = graph
            .universe()
            .boundaries
            .iter()
            .zip(graph.universe().sides.iter())
            .filter(|(b, _)| **b == id)
            .count();
        let regions_on_both_sides = sides_used.iter().filter(|r| r.is_some()).count() + universe_sides;
        if regions_on_both_sides < 2 {
            report.finite_extension.push(Violation {
                entity: Some(id),
                description: format!("surface is not enclosed on both sides by a region ({regions_on_both_sides}/2)"),
            });
        }
    }
}

/// Every stored boundary/in_boundary/parent/child relation must point at
/// a defined entity of the statically allowed kind, and must be the
/// mirror of a reciprocal relation on the other entity.
fn check_connectivity(graph: &EntityGraph, report: &mut ValidityReport) {
    for id in graph.all_mesh_entities() {
        let entity = graph.mesh_entity(id);
        for &b in &entity.boundaries {
            if !graph.is_defined(b) {
                report.connectivity.push(Violation {
                    entity: Some(id),
                    description: format!("boundary {b} is not defined"),
                });
                continue;
            }
            if !graph.mesh_entity(b).in_boundaries.contains(&id) {
                report.connectivity.push(Violation {
                    entity: Some(id),
                    description: format!("boundary {b} does not list {id} back in its in_boundaries"),
                });
            }
        }
        for &ib in &entity.in_boundaries {
            if !graph.is_defined(ib) {
                report.connectivity.push(Violation {
                    entity: Some(id),
                    description: format!("in_boundary {ib} is not defined"),
                });
            }
        }
        if let Some(parent) = entity.parent
            && !graph.try_geological_entity(parent).is_some_and(|p| p.children.contains(&id))
        {
            report.connectivity.push(Violation {
                entity: Some(id),
                description: format!("parent {parent} does not list {id} back in its children"),
            });
        }
    }
}

/// Every geological entity's children must exist, be of the allowed kind,
/// and point back at their parent.
fn check_geological(graph: &EntityGraph, report: &mut ValidityReport) {
    for id in graph.all_geological_entities() {
        let geol = graph.geological_entity(id);
        if geol.children.is_empty() {
            report.geological.push(Violation {
                entity: Some(id),
                description: "geological entity has no children".to_string(),
            });
        }
        for &child in &geol.children {
            if !graph.is_defined(child) {
                report.geological.push(Violation {
                    entity: Some(id),
                    description: format!("child {child} is not defined"),
                });
                continue;
            }
            if graph.mesh_entity(child).parent != Some(id) {
                report.geological.push(Violation {
                    entity: Some(id),
                    description: format!("child {child} does not point back as its parent"),
                });
            }
        }
    }
}

/// Every Line boundary (its Corners) and Line vertex sequence must agree
/// with the Surfaces it bounds: each Line vertex colocates with some
/// vertex of each Surface claiming it in `in_boundaries`.
fn check_surface_line_conformity(graph: &EntityGraph, epsilon: f64, report: &mut ValidityReport) {
    for line_id in graph.entities(EntityKind::Line) {
        let line = graph.mesh_entity(line_id);
        for &surface_id in &line.in_boundaries {
            let Some(surface) = graph.try_mesh_entity(surface_id) else {
                continue;
            };
            for v in line.mesh.vertices() {
                let conforms = surface.mesh.vertices().iter().any(|sv| within(v, sv, epsilon));
                if !conforms {
                    report.surface_line_conformity.push(Violation {
                        entity: Some(line_id),
                        description: format!("line vertex not found on surface {surface_id}"),
                    });
                }
            }
        }
    }
}

/// Every Surface boundary vertex must have a matching vertex in every
/// Region it bounds.
fn check_region_surface_conformity(graph: &EntityGraph, epsilon: f64, report: &mut ValidityReport) {
    for surface_id in graph.entities(EntityKind::Surface) {
        let surface = graph.mesh_entity(surface_id);
        for &region_id in &surface.in_boundaries {
            let Some(region) = graph.try_mesh_entity(region_id) else {
                continue;
            };
            if region.mesh.vertex_count() == 0 {
                continue;
            }
            for v in surface.mesh.vertices() {
                let conforms = region.mesh.vertices().iter().any(|rv| within(v, rv, epsilon));
                if !conforms {
                    report.region_surface_conformity.push(Violation {
                        entity: Some(surface_id),
                        description: format!("surface vertex not found in region {region_id}"),
                    });
                }
            }
        }
    }
}

/// Per-entity mesh sanity: no empty geometry, no zero-length edges, no
/// zero-area polygons, no degenerate tets.
fn check_mesh_entities(graph: &EntityGraph, report: &mut ValidityReport) {
    use crate::geometry::{orient_tet, segment_length, triangle_area};

    for id in graph.all_mesh_entities() {
        let entity = graph.mesh_entity(id);
        if entity.mesh.vertex_count() == 0 {
            report.mesh_entities.push(Violation {
                entity: Some(id),
                description: "entity has no geometry".to_string(),
            });
            continue;
        }
        match &entity.mesh {
            crate::mesh_data::MeshData::Line(line) => {
                for [a, b] in line.edges() {
                    if segment_length(&line.vertices[a as usize], &line.vertices[b as usize]) < 1e-10 {
                        report.mesh_entities.push(Violation {
                            entity: Some(id),
                            description: format!("degenerate edge [{a}, {b}]"),
                        });
                    }
                }
            }
            crate::mesh_data::MeshData::Surface(surface) => {
                for (p, polygon) in surface.polygons.iter().enumerate() {
                    if polygon.len() < 3 {
                        report.mesh_entities.push(Violation {
                            entity: Some(id),
                            description: format!("polygon {p} has fewer than 3 vertices"),
                        });
                        continue;
                    }
                    let pts: Vec<_> = polygon.iter().map(|&i| surface.vertices[i as usize]).collect();
                    if triangle_area(&pts[0], &pts[1], &pts[pts.len() - 1]) < 1e-12 {
                        report.mesh_entities.push(Violation {
                            entity: Some(id),
                            description: format!("polygon {p} is degenerate"),
                        });
                    }
                }
            }
            crate::mesh_data::MeshData::Region(region) => {
                for (t, tet) in region.tets.iter().enumerate() {
                    let [a, b, c, d] = tet.map(|i| region.vertices[i as usize]);
                    if orient_tet(&a, &b, &c, &d) == 0.0 {
                        report.mesh_entities.push(Violation {
                            entity: Some(id),
                            description: format!("tet {t} is degenerate"),
                        });
                    }
                }
            }
            crate::mesh_data::MeshData::Corner(_) => {}
        }
    }
}

/// A Surface edge is non-manifold when more than two polygon instances of
/// it (in either direction) exist and the surface is not itself on the
/// void-of-interest boundary.
fn check_non_manifold_edges(graph: &EntityGraph, report: &mut ValidityReport) {
    use rustc_hash::FxHashMap;

    for id in graph.entities(EntityKind::Surface) {
        let entity = graph.mesh_entity(id);
        if entity.is_on_voi() {
            continue;
        }
        let crate::mesh_data::MeshData::Surface(surface) = &entity.mesh else {
            continue;
        };
        let mut counts: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        for p in 0..surface.polygons.len() {
            for (a, b) in surface.polygon_edges(p) {
                let key = (a.min(b), a.max(b));
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        for ((a, b), count) in counts {
            if count > 2 {
                report.non_manifold_edges.push(Violation {
                    entity: Some(id),
                    description: format!("edge [{a}, {b}] is shared by {count} polygons"),
                });
            }
        }
    }
}

/// Non-adjacent polygons of the same Surface whose triangles actually cross,
/// found with an `rstar` tree of per-triangle bounding boxes for the broad
/// phase and a separating-axis test for the narrow phase. Polygons are
/// fan-triangulated first so n-gons are handled the same way triangles are.
fn check_polygon_intersections(graph: &EntityGraph, report: &mut ValidityReport) {
    use crate::geometry::{BoundingBox, Point};
    use rstar::primitives::GeomWithData;
    use rstar::{RTree, AABB};

    type Triangle = [Point; 3];
    type IndexedBox = GeomWithData<AABB<[f64; 3]>, usize>;

    fn fan_triangulate(polygon: &[u32]) -> Vec<[u32; 3]> {
        if polygon.len() < 3 {
            return Vec::new();
        }
        (1..polygon.len() - 1)
            .map(|i| [polygon[0], polygon[i], polygon[i + 1]])
            .collect()
    }

    fn aabb_of(tri: &Triangle) -> AABB<[f64; 3]> {
        let mut bbox = BoundingBox::new();
        for p in tri {
            bbox.add_point(p);
        }
        AABB::from_corners(
            [bbox.min().x, bbox.min().y, bbox.min().z],
            [bbox.max().x, bbox.max().y, bbox.max().z],
        )
    }

    fn project(tri: &Triangle, axis: &nalgebra::Vector3<f64>) -> (f64, f64) {
        let d: Vec<f64> = tri.iter().map(|p| p.coords.dot(axis)).collect();
        (d[0].min(d[1]).min(d[2]), d[0].max(d[1]).max(d[2]))
    }

    fn intervals_overlap(a: (f64, f64), b: (f64, f64), epsilon: f64) -> bool {
        a.0 <= b.1 + epsilon && b.0 <= a.1 + epsilon
    }

    /// Separating-axis test over a triangle's face normal and the nine
    /// cross products of edge pairs: eleven candidate axes are necessary
    /// and sufficient to separate two triangles in 3D if any axis does.
    fn triangles_intersect(t1: &Triangle, t2: &Triangle, epsilon: f64) -> bool {
        let edges1 = [t1[1] - t1[0], t1[2] - t1[1], t1[0] - t1[2]];
        let edges2 = [t2[1] - t2[0], t2[2] - t2[1], t2[0] - t2[2]];
        let mut axes = vec![edges1[0].cross(&edges1[1]), edges2[0].cross(&edges2[1])];
        for e1 in &edges1 {
            for e2 in &edges2 {
                let axis = e1.cross(e2);
                if axis.norm_squared() > 1e-20 {
                    axes.push(axis);
                }
            }
        }
        axes.into_iter().all(|axis| {
            intervals_overlap(project(t1, &axis), project(t2, &axis), epsilon)
        })
    }

    for id in graph.entities(EntityKind::Surface) {
        let entity = graph.mesh_entity(id);
        let crate::mesh_data::MeshData::Surface(surface) = &entity.mesh else {
            continue;
        };

        // (triangle, owning polygon index)
        let triangles: Vec<(Triangle, usize)> = surface
            .polygons
            .iter()
            .enumerate()
            .flat_map(|(p, polygon)| {
                fan_triangulate(polygon)
                    .into_iter()
                    .map(move |tri| (tri.map(|i| surface.vertices[i as usize]), p))
            })
            .collect();
        if triangles.len() < 2 {
            continue;
        }

        let tree = RTree::bulk_load(
            triangles
                .iter()
                .enumerate()
                .map(|(i, (tri, _))| IndexedBox::new(aabb_of(tri), i))
                .collect(),
        );

        let mut reported: std::collections::HashSet<(usize, usize)> = std::collections::HashSet::new();
        for (i, (tri, poly_i)) in triangles.iter().enumerate() {
            for candidate in tree.locate_in_envelope_intersecting(&aabb_of(tri)) {
                let j = candidate.data;
                if j <= i {
                    continue;
                }
                let (other, poly_j) = &triangles[j];
                if poly_i == poly_j {
                    continue;
                }
                // Polygons sharing a vertex are expected to touch along
                // that vertex; only a crossing away from a shared vertex
                // is a real self-intersection.
                let shares_vertex = surface.polygons[*poly_i]
                    .iter()
                    .any(|v| surface.polygons[*poly_j].contains(v));
                if shares_vertex {
                    continue;
                }
                if triangles_intersect(tri, other, 1e-9) {
                    let key = (*poly_i.min(poly_j), *poly_i.max(poly_j));
                    if reported.insert(key) {
                        report.polygon_intersections.push(Violation {
                            entity: Some(id),
                            description: format!("polygon {} intersects polygon {}", key.0, key.1),
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::geometry::Point;

    #[test]
    fn empty_graph_is_vacuously_valid() {
        let graph = EntityGraph::new();
        let report = check_validity(&graph, ValidityCheckMode::ALL, 1e-6);
        assert!(report.is_valid());
    }

    #[test]
    fn dangling_boundary_is_flagged_by_connectivity() {
        let mut graph = EntityGraph::new();
        let corner = graph.push_mesh_entity(EntityKind::Corner);
        let line = graph.push_mesh_entity(EntityKind::Line);
        graph.mesh_entity_mut(line).boundaries.push(corner);
        let report = check_validity(&graph, ValidityCheckMode::CONNECTIVITY, 1e-6);
        assert!(!report.is_valid());
        assert_eq!(report.connectivity.len(), 1);
    }

    #[test]
    fn builder_round_tripped_single_triangle_region_is_valid_on_topology() {
        let mut builder = Builder::new(1e-6);
        let corners: Vec<_> = (0..4)
            .map(|i| {
                builder.add_corner(Point::new(i as f64, 0.0, 0.0))
            })
            .collect();
        let _ = corners;
        let report = check_validity(&builder.graph, ValidityCheckMode::GEOLOGICAL, builder.vertices.epsilon());
        assert!(report.is_valid());
    }
}
