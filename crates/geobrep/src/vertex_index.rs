//! Shared vertex index (C4): the canonical point set that unifies vertices
//! duplicated across entity meshes, backed by an `rstar` kd-tree for
//! epsilon-tolerance colocation lookups.
//!
//! Every mesh entity vertex is tagged with its canonical id via the
//! [`crate::attributes::CANONICAL_ID_ATTRIBUTE`] attribute; this module
//! owns the other direction — canonical id to the list of `(entity, local)`
//! occurrences that share it.

use crate::attributes::CANONICAL_ID_ATTRIBUTE;
use crate::geometry::{within, Point};
use crate::graph::EntityGraph;
use crate::ids::{EntityId, EntityKind, NO_ID};
use rstar::primitives::GeomWithData;
use rstar::RTree;

type IndexedPoint = GeomWithData<[f64; 3], u32>;

fn to_array(p: &Point) -> [f64; 3] {
    [p.x, p.y, p.z]
}

/// One `(entity, local vertex index)` occurrence of a canonical vertex.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Occurrence {
    pub entity: EntityId,
    pub local: u32,
}

/// The shared, deduplicated vertex set of a whole model.
#[derive(Clone, Debug)]
pub struct SharedVertexIndex {
    points: Vec<Point>,
    occurrences: Vec<Vec<Occurrence>>,
    tree: RTree<IndexedPoint>,
    epsilon: f64,
    dirty: bool,
    last_merge_remap: Vec<u32>,
}

impl SharedVertexIndex {
    pub fn new(epsilon: f64) -> Self {
        SharedVertexIndex {
            points: Vec::new(),
            occurrences: Vec::new(),
            tree: RTree::new(),
            epsilon,
            dirty: false,
            last_merge_remap: Vec::new(),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, canonical: u32) -> &Point {
        &self.points[canonical as usize]
    }

    pub fn occurrences(&self, canonical: u32) -> &[Occurrence] {
        &self.occurrences[canonical as usize]
    }

    fn rebuild_tree(&mut self) {
        self.tree = RTree::bulk_load(
            self.points
                .iter()
                .enumerate()
                .map(|(i, p)| IndexedPoint::new(to_array(p), i as u32))
                .collect(),
        );
        self.dirty = false;
    }

    fn ensure_fresh(&mut self) {
        if self.dirty {
            self.rebuild_tree();
        }
    }

    /// Canonical id of the closest existing point within `epsilon` of
    /// `point`, if any.
    pub fn lookup(&mut self, point: &Point) -> Option<u32> {
        self.ensure_fresh();
        let arr = to_array(point);
        self.tree
            .nearest_neighbor(&arr)
            .filter(|candidate| within(&self.points[candidate.data as usize], point, self.epsilon))
            .map(|candidate| candidate.data)
    }

    /// Inserts `point` as a brand new canonical vertex, returning its id.
    /// Does not check for colocation with existing points; callers that
    /// want deduplication should `lookup` first.
    pub fn add_point(&mut self, point: Point) -> u32 {
        let id = self.points.len() as u32;
        self.points.push(point);
        self.occurrences.push(Vec::new());
        self.dirty = true;
        id
    }

    /// `lookup`s first and only calls `add_point` if nothing is close
    /// enough; the common entry point used by the builder and the `.ml`
    /// reader when appending a vertex that might already exist.
    pub fn find_or_add_point(&mut self, point: Point) -> u32 {
        if let Some(existing) = self.lookup(&point) {
            existing
        } else {
            self.add_point(point)
        }
    }

    /// Rewrites every occurrence's entity id through `remap`, dropping the
    /// occurrence if `remap` returns `None` (its entity was deleted). Used
    /// by [`crate::builder::Builder::delete_entities`] after
    /// [`crate::graph::EntityGraph::remove_entities`] has compacted entity
    /// storage and renumbered ids out from under this index.
    pub fn remap_entities(&mut self, remap: impl Fn(EntityId) -> Option<EntityId>) {
        for occurrences in &mut self.occurrences {
            occurrences.retain_mut(|occ| match remap(occ.entity) {
                Some(new_entity) => {
                    occ.entity = new_entity;
                    true
                }
                None => false,
            });
        }
    }

    pub fn attach_occurrence(&mut self, canonical: u32, entity: EntityId, local: u32) {
        self.occurrences[canonical as usize].push(Occurrence { entity, local });
    }

    pub fn detach_occurrence(&mut self, canonical: u32, entity: EntityId, local: u32) {
        self.occurrences[canonical as usize].retain(|o| !(o.entity == entity && o.local == local));
    }

    /// Moves `canonical`'s point, keeping every occurrence pointed at the
    /// same canonical id (callers wanting a merge with another canonical
    /// vertex should use [`merge_colocated`] instead).
    pub fn update_point(&mut self, canonical: u32, new_point: Point) {
        self.points[canonical as usize] = new_point;
        self.dirty = true;
    }

    /// Merges every pair of canonical vertices within `epsilon` of each
    /// other into one, relocating occurrences and compacting ids. Returns
    /// the number of canonical vertices removed.
    pub fn merge_colocated(&mut self) -> usize {
        self.ensure_fresh();
        let n = self.points.len();
        let mut union_find: Vec<u32> = (0..n as u32).collect();
        fn find(uf: &mut [u32], mut x: u32) -> u32 {
            while uf[x as usize] != x {
                uf[x as usize] = uf[uf[x as usize] as usize];
                x = uf[x as usize];
            }
            x
        }
        for i in 0..n {
            let arr = to_array(&self.points[i]);
            for neighbor in self.tree.locate_within_distance(arr, self.epsilon * self.epsilon) {
                let j = neighbor.data as usize;
                if j != i && within(&self.points[i], &self.points[j], self.epsilon) {
                    let ri = find(&mut union_find, i as u32);
                    let rj = find(&mut union_find, j as u32);
                    if ri != rj {
                        union_find[ri.max(rj) as usize] = ri.min(rj);
                    }
                }
            }
        }
        let roots: Vec<u32> = (0..n as u32).map(|i| find(&mut union_find, i)).collect();
        let mut new_occurrences = vec![Vec::new(); n];
        for (old, &root) in roots.iter().enumerate() {
            let occ = std::mem::take(&mut self.occurrences[old]);
            new_occurrences[root as usize].extend(occ);
        }
        let mut keep = vec![false; n];
        for &root in &roots {
            keep[root as usize] = true;
        }
        let mut remap = vec![NO_ID; n];
        let mut next = 0u32;
        let mut compacted_points = Vec::new();
        let mut compacted_occurrences = Vec::new();
        for i in 0..n {
            if keep[i] {
                remap[i] = next;
                next += 1;
                compacted_points.push(self.points[i]);
                compacted_occurrences.push(std::mem::take(&mut new_occurrences[i]));
            }
        }
        let removed = n - compacted_points.len();
        self.points = compacted_points;
        self.occurrences = compacted_occurrences;
        self.dirty = true;
        self.last_merge_remap = remap;
        removed
    }

    /// The canonical-id remap produced by the most recent
    /// [`merge_colocated`] call: `remap[old] == new`, or `NO_ID` if `old`
    /// was removed as a duplicate of a smaller id. Builder uses this to
    /// update every entity's `CANONICAL_ID_ATTRIBUTE` column after a merge.
    pub fn last_merge_remap(&self) -> &[u32] {
        &self.last_merge_remap
    }

    /// Drops the canonical vertices for which `keep[canonical]` is
    /// `false`, compacting ids. Returns the `old -> new` remap (`NO_ID`
    /// for removed ids), mirroring [`last_merge_remap`].
    pub fn erase_vertices(&mut self, keep: &[bool]) -> Vec<u32> {
        debug_assert_eq!(keep.len(), self.points.len());
        let mut remap = vec![NO_ID; keep.len()];
        let mut next = 0u32;
        let mut points = Vec::new();
        let mut occurrences = Vec::new();
        for (i, &k) in keep.iter().enumerate() {
            if k {
                remap[i] = next;
                next += 1;
                points.push(self.points[i]);
                occurrences.push(self.occurrences[i].clone());
            }
        }
        self.points = points;
        self.occurrences = occurrences;
        self.dirty = true;
        remap
    }

    /// Rebuilds this index, and every mesh entity's
    /// [`CANONICAL_ID_ATTRIBUTE`] column, purely from `graph`'s stored
    /// geometry. Does not assume the attribute columns already exist — the
    /// native JSON format (C10) does not carry them, so the importer
    /// derives them here the same way [`crate::builder::Builder`]'s
    /// geometry setters do at construction time.
    pub fn rebuild_from_geometry(&mut self, graph: &mut EntityGraph) {
        self.points.clear();
        self.occurrences.clear();
        self.dirty = true;
        for kind in EntityKind::ALL.into_iter().filter(|k| k.is_mesh_entity()) {
            for id in graph.entities(kind) {
                let vertex_count = graph.mesh_entity(id).mesh.vertex_count();
                for local in 0..vertex_count {
                    let point = *graph.mesh_entity(id).mesh.vertex(local).expect("local < vertex_count");
                    let canonical = self.find_or_add_point(point);
                    let entity = graph.mesh_entity_mut(id);
                    entity.vertex_attributes.push_default_row();
                    entity.vertex_attributes.set(CANONICAL_ID_ATTRIBUTE, local, canonical);
                    self.attach_occurrence(canonical, id, local as u32);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_or_add_deduplicates_within_epsilon() {
        let mut index = SharedVertexIndex::new(1e-6);
        let a = index.find_or_add_point(Point::new(0.0, 0.0, 0.0));
        let b = index.find_or_add_point(Point::new(0.0, 0.0, 1e-9));
        let c = index.find_or_add_point(Point::new(1.0, 0.0, 0.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn attach_and_detach_occurrence() {
        let mut index = SharedVertexIndex::new(1e-6);
        let id = index.add_point(Point::new(0.0, 0.0, 0.0));
        let entity = EntityId::new(EntityKind::Corner, 0);
        index.attach_occurrence(id, entity, 0);
        assert_eq!(index.occurrences(id).len(), 1);
        index.detach_occurrence(id, entity, 0);
        assert!(index.occurrences(id).is_empty());
    }

    #[test]
    fn merge_colocated_unions_duplicate_points() {
        let mut index = SharedVertexIndex::new(1e-6);
        let a = index.add_point(Point::new(0.0, 0.0, 0.0));
        let b = index.add_point(Point::new(0.0, 0.0, 1e-9));
        index.attach_occurrence(a, EntityId::new(EntityKind::Corner, 0), 0);
        index.attach_occurrence(b, EntityId::new(EntityKind::Corner, 1), 0);
        let removed = index.merge_colocated();
        assert_eq!(removed, 1);
        assert_eq!(index.len(), 1);
        assert_eq!(index.occurrences(0).len(), 2);
    }
}
