//! Repair pipeline (C6): idempotent healing operations a [`Builder`] can
//! run individually or all at once via [`repair`].
//!
//! Each operation is written so that running it twice in a row is a no-op
//! on the second pass — `end_model` relies on that to run the full
//! pipeline unconditionally instead of needing to know in advance what, if
//! anything, is broken.

use crate::attributes::CANONICAL_ID_ATTRIBUTE;
use crate::builder::Builder;
use crate::geometry::{segment_length, triangle_area};
use crate::ids::{EntityKind, NO_ID};
use crate::mesh_data::MeshData;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Bitmask selecting which repair operations [`repair`] runs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RepairMode(u32);

impl RepairMode {
    pub const COLOCATED_VERTICES: RepairMode = RepairMode(1 << 0);
    pub const DEGENERATE_EDGES_AND_POLYGONS: RepairMode = RepairMode(1 << 1);
    pub const LINE_BOUNDARY_ORDER: RepairMode = RepairMode(1 << 2);
    pub const ISOLATED_VERTICES: RepairMode = RepairMode(1 << 3);
    pub const CONTACTS: RepairMode = RepairMode(1 << 4);
    pub const ALL: RepairMode = RepairMode(
        Self::COLOCATED_VERTICES.0
            | Self::DEGENERATE_EDGES_AND_POLYGONS.0
            | Self::LINE_BOUNDARY_ORDER.0
            | Self::ISOLATED_VERTICES.0
            | Self::CONTACTS.0,
    );

    pub const fn contains(self, other: RepairMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for RepairMode {
    type Output = RepairMode;
    fn bitor(self, rhs: Self) -> Self::Output {
        RepairMode(self.0 | rhs.0)
    }
}

/// Counts of what each repair operation actually changed, returned so a
/// caller can decide whether the repair was a no-op (and so tests can
/// assert idempotence directly instead of re-running `check_validity`).
#[derive(Clone, Debug, Default)]
pub struct RepairSummary {
    pub vertices_merged: usize,
    pub degenerate_edges_removed: usize,
    pub degenerate_polygons_removed: usize,
    pub line_boundaries_reordered: usize,
    pub isolated_vertices_removed: usize,
    pub contacts_created: usize,
}

impl RepairSummary {
    pub fn is_noop(&self) -> bool {
        self.vertices_merged == 0
            && self.degenerate_edges_removed == 0
            && self.degenerate_polygons_removed == 0
            && self.line_boundaries_reordered == 0
            && self.isolated_vertices_removed == 0
            && self.contacts_created == 0
    }
}

/// Runs the operations selected by `mode` against `builder`, in the fixed
/// order colocation, degeneracy, line-boundary-order, isolated-vertices,
/// contacts (later steps depend on earlier ones having already run).
pub fn repair(builder: &mut Builder, mode: RepairMode) -> RepairSummary {
    let mut summary = RepairSummary::default();

    if mode.contains(RepairMode::COLOCATED_VERTICES) {
        summary.vertices_merged = merge_colocated_vertices(builder);
    }
    if mode.contains(RepairMode::DEGENERATE_EDGES_AND_POLYGONS) {
        let (edges, polygons) = remove_degenerate_edges_and_polygons(builder);
        summary.degenerate_edges_removed = edges;
        summary.degenerate_polygons_removed = polygons;
    }
    if mode.contains(RepairMode::LINE_BOUNDARY_ORDER) {
        summary.line_boundaries_reordered = fix_line_boundary_order(builder);
    }
    if mode.contains(RepairMode::ISOLATED_VERTICES) {
        summary.isolated_vertices_removed = remove_isolated_vertices(builder);
    }
    if mode.contains(RepairMode::CONTACTS) {
        let before = builder.graph.count(EntityKind::Contact);
        builder.build_contacts();
        summary.contacts_created = builder.graph.count(EntityKind::Contact) - before;
    }

    summary
}

/// Merges vertices within epsilon in the shared vertex index, then
/// remaps every entity's canonical-id attribute column to match. Running
/// this twice is a no-op: the second `merge_colocated` finds nothing left
/// to merge.
fn merge_colocated_vertices(builder: &mut Builder) -> usize {
    let removed = builder.vertices.merge_colocated();
    if removed == 0 {
        return 0;
    }
    let remap = builder.vertices.last_merge_remap().to_vec();
    for id in builder.graph.all_mesh_entities().collect::<Vec<_>>() {
        let entity = builder.graph.mesh_entity_mut(id);
        for local in 0..entity.mesh.vertex_count() {
            if let Some(canonical) = entity.vertex_attributes.get_mut::<u32>(CANONICAL_ID_ATTRIBUTE, local) {
                *canonical = remap[*canonical as usize];
            }
        }
    }
    removed
}

/// Drops zero-length Line edges (by removing one of the two colocated
/// vertices) and zero-area Surface polygons. Idempotent: once no edge or
/// polygon is degenerate, the scan finds nothing to remove.
fn remove_degenerate_edges_and_polygons(builder: &mut Builder) -> (usize, usize) {
    let mut edges_removed = 0;
    let mut polygons_removed = 0;

    for id in builder.graph.entities(EntityKind::Line).collect::<Vec<_>>() {
        let entity = builder.graph.mesh_entity_mut(id);
        let MeshData::Line(line) = &mut entity.mesh else {
            continue;
        };
        let epsilon = builder.vertices.epsilon().max(1e-10);
        let mut kept = vec![true; line.vertices.len()];
        for i in 1..line.vertices.len() {
            if kept[i - 1] && segment_length(&line.vertices[i - 1], &line.vertices[i]) < epsilon {
                kept[i] = false;
                edges_removed += 1;
            }
        }
        if edges_removed > 0 {
            let mut idx = 0;
            line.vertices.retain(|_| {
                let keep = kept[idx];
                idx += 1;
                keep
            });
            entity.vertex_attributes.compact(&kept);
        }
    }

    for id in builder.graph.entities(EntityKind::Surface).collect::<Vec<_>>() {
        let entity = builder.graph.mesh_entity_mut(id);
        let MeshData::Surface(surface) = &mut entity.mesh else {
            continue;
        };
        let before = surface.polygons.len();
        let keep = degenerate_polygon_mask(surface);
        let mut idx = 0;
        surface.polygons.retain(|_| {
            let keep = keep[idx];
            idx += 1;
            keep
        });
        polygons_removed += before - surface.polygons.len();
    }

    (edges_removed, polygons_removed)
}

/// Per-polygon keep/drop decision for a Surface's current polygon list —
/// the read-only half of degenerate-polygon removal (spec.md §5's second
/// named parallelism knob). With the `rayon` feature this scans polygons
/// with `par_iter`; the caller still applies the resulting mask with a
/// single-threaded `retain` since mutating `surface.polygons` itself is
/// not parallel-safe.
fn degenerate_polygon_mask(surface: &crate::mesh_data::Surface) -> Vec<bool> {
    let classify = |polygon: &Vec<u32>| -> bool {
        if polygon.len() < 3 {
            return false;
        }
        let pts: Vec<_> = polygon.iter().map(|&i| surface.vertices[i as usize]).collect();
        triangle_area(&pts[0], &pts[1], &pts[pts.len() - 1]) >= 1e-15
    };
    #[cfg(feature = "rayon")]
    {
        surface.polygons.par_iter().map(classify).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        surface.polygons.iter().map(classify).collect()
    }
}

/// A Line's `boundaries` (its end Corners) should list the start corner
/// first, the end corner second, matching vertex order. Swaps them back
/// into order if a previous edit left them reversed.
fn fix_line_boundary_order(builder: &mut Builder) -> usize {
    let mut fixed = 0;
    for id in builder.graph.entities(EntityKind::Line).collect::<Vec<_>>() {
        let entity = builder.graph.mesh_entity(id);
        let MeshData::Line(line) = &entity.mesh else {
            continue;
        };
        if line.vertices.len() < 2 || entity.boundaries.len() != 2 {
            continue;
        }
        let epsilon = builder.vertices.epsilon().max(1e-10);
        let first = line.vertices[0];
        let start_corner = entity.boundaries[0];
        let start_point = builder.graph.mesh_entity(start_corner).mesh.vertex(0).copied();
        if let Some(start_point) = start_point
            && !crate::geometry::within(&first, &start_point, epsilon)
        {
            builder.graph.mesh_entity_mut(id).boundaries.swap(0, 1);
            fixed += 1;
        }
    }
    fixed
}

/// Removes canonical vertices with zero occurrences (left behind after a
/// deletion or a merge). Idempotent: a vertex index with no dangling
/// vertex left has nothing to compact.
fn remove_isolated_vertices(builder: &mut Builder) -> usize {
    let keep: Vec<bool> = (0..builder.vertices.len() as u32)
        .map(|c| !builder.vertices.occurrences(c).is_empty())
        .collect();
    let removed = keep.iter().filter(|k| !**k).count();
    if removed == 0 {
        return 0;
    }
    let remap = builder.vertices.erase_vertices(&keep);
    for id in builder.graph.all_mesh_entities().collect::<Vec<_>>() {
        let entity = builder.graph.mesh_entity_mut(id);
        for local in 0..entity.mesh.vertex_count() {
            if let Some(canonical) = entity.vertex_attributes.get_mut::<u32>(CANONICAL_ID_ATTRIBUTE, local) {
                let new_id = remap[*canonical as usize];
                debug_assert_ne!(new_id, NO_ID, "occurrence pointed at a vertex erase_vertices dropped");
                *canonical = new_id;
            }
        }
    }
    removed
}
