//! The Builder (C5): the sole mutator of an [`EntityGraph`] and its
//! [`SharedVertexIndex`]. Three layers, innermost first: topology
//! primitives that enforce [`EntityKind`]'s typing tables, geometry
//! setters, and closure operations that find-or-create instead of
//! blindly appending.

use crate::closure::dependency_closure;
use crate::error::{programmer_error, Result};
use crate::geometry::{within, BoundingBox, Point};
use crate::graph::{remap_id, EntityGraph};
use crate::ids::{EntityId, EntityKind, GeologicalFeature};
use crate::mesh_data::{Corner, Line, MeshData, Region, Surface};
use crate::repair::{repair, RepairMode};
use crate::vertex_index::SharedVertexIndex;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

/// Owns the graph and vertex index being built; every topology or geometry
/// mutation in this crate goes through one of its methods.
pub struct Builder {
    pub graph: EntityGraph,
    pub vertices: SharedVertexIndex,
}

impl Builder {
    pub fn new(epsilon: f64) -> Self {
        Builder {
            graph: EntityGraph::new(),
            vertices: SharedVertexIndex::new(epsilon),
        }
    }

    // ---- topology primitives -------------------------------------------

    /// Records `child.boundaries += parent_side... ` no: records that
    /// `bounded` is bounded by `boundary` (`boundary` appears in
    /// `bounded.boundaries`, `bounded` appears in `boundary.in_boundaries`).
    /// `side` is only meaningful when `bounded.kind == Region`.
    pub fn add_boundary(&mut self, bounded: EntityId, boundary: EntityId, side: Option<bool>) {
        let expected = bounded.kind.boundary_type();
        if programmer_error(
            expected == Some(boundary.kind),
            "boundary kind does not match the bounded entity's boundary_type",
            false,
        ) {
            return;
        }
        let bounded_entity = self.graph.mesh_entity_mut(bounded);
        bounded_entity.boundaries.push(boundary);
        if bounded.kind == EntityKind::Region {
            bounded_entity.sides.push(side.unwrap_or(true));
        }
        self.graph.mesh_entity_mut(boundary).in_boundaries.push(bounded);
    }

    /// Sets `child`'s geological parent, recording the reciprocal child
    /// membership on `parent`.
    pub fn set_parent(&mut self, child: EntityId, parent: EntityId) {
        if programmer_error(
            child.kind.parent_type() == Some(parent.kind),
            "parent kind does not match the child's parent_type",
            false,
        ) {
            return;
        }
        self.graph.mesh_entity_mut(child).parent = Some(parent);
        self.graph.geological_entity_mut(parent).children.push(child);
    }

    /// Adds `surface` to the Universe's boundary on `side`.
    pub fn add_universe_boundary(&mut self, surface: EntityId, side: bool) {
        debug_assert_eq!(surface.kind, EntityKind::Surface);
        self.graph.universe_mut().boundaries.push(surface);
        self.graph.universe_mut().sides.push(side);
    }

    /// Creates a new, empty mesh entity of `kind`, the generic form of
    /// [`add_corner`](Self::add_corner)/[`add_line`](Self::add_line)/
    /// [`add_surface`](Self::add_surface)/[`add_region`](Self::add_region)
    /// for callers (the `.ml` reader, `copy_macro_topology`) that need to
    /// create an entity before its geometry is known.
    pub fn create_entity(&mut self, kind: EntityKind) -> EntityId {
        if kind.is_mesh_entity() {
            self.graph.push_mesh_entity(kind)
        } else {
            self.graph.push_geological_entity(kind)
        }
    }

    /// Replaces the boundary at position `index` of `bounded`'s boundary
    /// list with `replacement`, keeping both sides' `in_boundaries`
    /// consistent (detaching the old boundary, attaching the new one).
    /// Used by repair passes (e.g. [`LineBoundaryOrder`](crate::repair::RepairMode::LINE_BOUNDARY_ORDER))
    /// that need to fix one slot without re-running the whole topology
    /// wiring sequence.
    pub fn set_boundary(&mut self, bounded: EntityId, index: usize, replacement: EntityId, side: Option<bool>) {
        let expected = bounded.kind.boundary_type();
        if programmer_error(
            expected == Some(replacement.kind),
            "replacement kind does not match the bounded entity's boundary_type",
            false,
        ) {
            return;
        }
        let Some(old) = self.graph.mesh_entity(bounded).boundaries.get(index).copied() else {
            programmer_error(false, "set_boundary index out of range", ());
            return;
        };
        self.graph.mesh_entity_mut(old).in_boundaries.retain(|&id| id != bounded);
        let bounded_entity = self.graph.mesh_entity_mut(bounded);
        bounded_entity.boundaries[index] = replacement;
        if bounded.kind == EntityKind::Region
            && let (Some(slot), Some(side)) = (bounded_entity.sides.get_mut(index), side)
        {
            *slot = side;
        }
        self.graph.mesh_entity_mut(replacement).in_boundaries.push(bounded);
    }

    /// Deletes every entity in `to_delete` — which must already be a
    /// dependency-closed set, see [`crate::closure::dependency_closure`] —
    /// compacting entity storage and the shared vertex index's occurrence
    /// lists to match. The only way entities leave the graph (`spec.md`
    /// §3's "deletion is only via the Builder and only through dependency
    /// closure").
    pub fn delete_entities(&mut self, to_delete: &FxHashSet<EntityId>) {
        let remap = self.graph.remove_entities(to_delete);
        self.vertices.remap_entities(|id| remap_id(&remap, id));
    }

    /// Computes the dependency closure of `seeds` and deletes it in one
    /// step — the common case of "delete this entity and everything that
    /// would be left dangling".
    pub fn delete_entity_closure(&mut self, seeds: impl IntoIterator<Item = EntityId>) -> FxHashSet<EntityId> {
        let closure = dependency_closure(&self.graph, seeds);
        self.delete_entities(&closure);
        closure
    }

    // ---- geometry setters ------------------------------------------------

    /// Creates a new Corner at `point`, unconditionally (no deduplication;
    /// see [`find_or_create_corner`] for the deduplicating variant).
    pub fn add_corner(&mut self, point: Point) -> EntityId {
        let id = self.graph.push_mesh_entity(EntityKind::Corner);
        self.graph.mesh_entity_mut(id).mesh = MeshData::Corner(Corner::new(point));
        let canonical = self.vertices.find_or_add_point(point);
        self.bind_canonical(id, 0, canonical);
        id
    }

    /// Creates a new Line through `points`, in order.
    pub fn add_line(&mut self, points: Vec<Point>) -> EntityId {
        let id = self.graph.push_mesh_entity(EntityKind::Line);
        for (local, p) in points.iter().enumerate() {
            let canonical = self.vertices.find_or_add_point(*p);
            self.bind_canonical(id, local, canonical);
        }
        self.graph.mesh_entity_mut(id).mesh = MeshData::Line(Line { vertices: points });
        id
    }

    /// Creates a new Surface from a flat vertex pool and per-polygon
    /// local-index lists.
    pub fn add_surface(&mut self, vertices: Vec<Point>, polygons: Vec<Vec<u32>>) -> EntityId {
        let id = self.graph.push_mesh_entity(EntityKind::Surface);
        for (local, p) in vertices.iter().enumerate() {
            let canonical = self.vertices.find_or_add_point(*p);
            self.bind_canonical(id, local, canonical);
        }
        self.graph.mesh_entity_mut(id).mesh = MeshData::Surface(Surface { vertices, polygons });
        id
    }

    /// Creates a new boundary-only Region (no interior mesh); callers add
    /// its boundary surfaces with [`add_boundary`].
    pub fn add_region(&mut self) -> EntityId {
        self.graph.push_mesh_entity(EntityKind::Region)
    }

    /// Creates a new, childless geological entity (Contact, Interface or
    /// Layer); callers populate it with [`set_parent`] calls from the mesh
    /// entity side.
    pub fn create_geological_entity(&mut self, kind: EntityKind) -> EntityId {
        debug_assert!(kind.is_geological_entity());
        self.graph.push_geological_entity(kind)
    }

    /// Creates a new Region with an interior tetrahedral mesh, computing
    /// each tet's `volume`/`centroid` cell attributes from its geometry
    /// (`spec.md` §8 scenario 6).
    pub fn add_meshed_region(&mut self, vertices: Vec<Point>, tets: Vec<[u32; 4]>) -> EntityId {
        let id = self.graph.push_mesh_entity(EntityKind::Region);
        for (local, p) in vertices.iter().enumerate() {
            let canonical = self.vertices.find_or_add_point(*p);
            self.bind_canonical(id, local, canonical);
        }
        let cell_geometry: Vec<(f64, [f64; 3])> = tets
            .iter()
            .map(|&[a, b, c, d]| {
                let pts = [vertices[a as usize], vertices[b as usize], vertices[c as usize], vertices[d as usize]];
                let volume = crate::geometry::signed_tet_volume(&pts[0], &pts[1], &pts[2], &pts[3]).abs();
                let centroid = crate::geometry::barycenter(&pts);
                (volume, [centroid.x, centroid.y, centroid.z])
            })
            .collect();
        self.graph.mesh_entity_mut(id).mesh = MeshData::Region(Region { vertices, tets });
        let entity = self.graph.mesh_entity_mut(id);
        for (volume, centroid) in cell_geometry {
            entity.cell_attributes.push_default_row();
            let row = entity.cell_attributes.len() - 1;
            entity.cell_attributes.set(crate::attributes::CELL_VOLUME_ATTRIBUTE, row, volume);
            entity.cell_attributes.set(crate::attributes::CELL_CENTROID_ATTRIBUTE, row, centroid);
        }
        id
    }

    fn bind_canonical(&mut self, entity: EntityId, local: usize, canonical: u32) {
        let mesh_entity = self.graph.mesh_entity_mut(entity);
        mesh_entity.vertex_attributes.push_default_row();
        mesh_entity
            .vertex_attributes
            .set(crate::attributes::CANONICAL_ID_ATTRIBUTE, local, canonical);
        self.vertices.attach_occurrence(canonical, entity, local as u32);
    }

    // ---- closure operations ----------------------------------------------

    /// Returns the Corner at `point` if one already exists within the
    /// vertex index's epsilon, otherwise creates one.
    pub fn find_or_create_corner(&mut self, point: Point) -> EntityId {
        if let Some(canonical) = self.vertices.lookup(&point) {
            for occ in self.vertices.occurrences(canonical) {
                if occ.entity.kind == EntityKind::Corner {
                    return occ.entity;
                }
            }
        }
        self.add_corner(point)
    }

    /// Returns an existing Line whose vertex sequence matches `points`
    /// (forwards or backwards) within epsilon, otherwise creates one and
    /// wires its boundary Corners via [`find_or_create_corner`].
    pub fn find_or_create_line(&mut self, points: Vec<Point>) -> EntityId {
        let epsilon = self.vertices.epsilon();
        for id in self.graph.entities(EntityKind::Line) {
            let entity = self.graph.mesh_entity(id);
            let MeshData::Line(line) = &entity.mesh else {
                continue;
            };
            if line.vertices.len() != points.len() {
                continue;
            }
            let forward = line.vertices.iter().zip(points.iter()).all(|(a, b)| within(a, b, epsilon));
            let backward = line
                .vertices
                .iter()
                .rev()
                .zip(points.iter())
                .all(|(a, b)| within(a, b, epsilon));
            if forward || backward {
                return id;
            }
        }
        let id = self.add_line(points.clone());
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            let start = self.find_or_create_corner(*first);
            self.add_boundary(id, start, None);
            if !within(first, last, epsilon) {
                let end = self.find_or_create_corner(*last);
                self.add_boundary(id, end, None);
            }
        }
        id
    }

    /// Returns the Contact whose `in_boundaries` already equals the sorted,
    /// deduplicated `interfaces` set, creating one if none matches — the
    /// idempotent counterpart to [`build_contacts`](Self::build_contacts)
    /// for callers wiring up one Line at a time instead of rebuilding all
    /// Contacts from scratch.
    pub fn find_or_create_contact(&mut self, mut interfaces: Vec<EntityId>) -> EntityId {
        interfaces.sort();
        interfaces.dedup();
        for id in self.graph.entities(EntityKind::Contact) {
            if self.graph.geological_entity(id).in_boundaries.as_slice() == interfaces.as_slice() {
                return id;
            }
        }
        let contact = self.graph.push_geological_entity(EntityKind::Contact);
        let geol = self.graph.geological_entity_mut(contact);
        geol.in_boundaries = interfaces.into();
        geol.geological_feature = GeologicalFeature::Strati;
        contact
    }

    /// Groups every Line by the set of Interfaces its in-boundary Surfaces
    /// belong to, creating one Contact geological entity per distinct set
    /// (the original source's `build_contacts`).
    pub fn build_contacts(&mut self) {
        let mut groups: FxHashMap<Vec<EntityId>, Vec<EntityId>> = FxHashMap::default();
        for line_id in self.graph.entities(EntityKind::Line) {
            let entity = self.graph.mesh_entity(line_id);
            let mut interfaces: Vec<EntityId> = entity
                .in_boundaries
                .iter()
                .filter_map(|&surface| self.graph.mesh_entity(surface).parent)
                .collect();
            interfaces.sort();
            interfaces.dedup();
            groups.entry(interfaces).or_default().push(line_id);
        }
        for (interfaces, lines) in groups {
            if interfaces.is_empty() {
                continue;
            }
            let contact = self.graph.push_geological_entity(EntityKind::Contact);
            for line in lines {
                self.set_parent(line, contact);
            }
            let geol = self.graph.geological_entity_mut(contact);
            geol.in_boundaries = interfaces.into();
            geol.geological_feature = GeologicalFeature::Strati;
        }
    }

    /// Copies every entity of every kind from `source` into this builder's
    /// graph — boundaries, in_boundaries, sides, parent/children and the
    /// Universe's own boundary list — without copying any geometry (mesh
    /// entities come out with an empty `mesh`, ready for a fresh geometry
    /// pass). `self.graph` must be empty when called: entities are pushed
    /// in `source`'s own per-kind order, so the ids line up one-to-one and
    /// the returned map is the identity — callers keep it around for the
    /// same reason `delete_entities`/`remap_id` return an explicit table
    /// rather than asserting ids never change (the original source's
    /// `copy_macro_topology`, used to reuse one model's macroscopic
    /// grouping while retetrahedralizing its interior from scratch).
    ///
    /// The per-entity copy is embarrassingly parallel (`spec.md` §5): with
    /// the `rayon` feature, cloning each kind's relation lists out of
    /// `source` runs with `into_par_iter`; applying them to `self.graph`
    /// stays sequential (it is the only mutator of the destination).
    pub fn copy_macro_topology(&mut self, source: &EntityGraph) -> FxHashMap<EntityId, EntityId> {
        debug_assert!(
            EntityKind::ALL.iter().all(|&kind| self.graph.count(kind) == 0),
            "copy_macro_topology requires an empty destination graph"
        );
        let mut remap = FxHashMap::default();
        for kind in EntityKind::ALL {
            for index in 0..source.count(kind) as u32 {
                self.create_entity(kind);
                remap.insert(EntityId::new(kind, index), EntityId::new(kind, index));
            }
        }

        for kind in [EntityKind::Corner, EntityKind::Line, EntityKind::Surface, EntityKind::Region] {
            let indices: Vec<u32> = (0..source.count(kind) as u32).collect();
            #[cfg(feature = "rayon")]
            let copies: Vec<_> = indices
                .into_par_iter()
                .map(|index| source.mesh_entity(EntityId::new(kind, index)).clone())
                .collect();
            #[cfg(not(feature = "rayon"))]
            let copies: Vec<_> = indices
                .into_iter()
                .map(|index| source.mesh_entity(EntityId::new(kind, index)).clone())
                .collect();
            for (index, src) in copies.into_iter().enumerate() {
                let id = EntityId::new(kind, index as u32);
                let dst = self.graph.mesh_entity_mut(id);
                dst.name = src.name;
                dst.geological_feature = src.geological_feature;
                dst.parent = src.parent;
                dst.boundaries = src.boundaries;
                dst.sides = src.sides;
                dst.in_boundaries = src.in_boundaries;
            }
        }
        for kind in [EntityKind::Contact, EntityKind::Interface, EntityKind::Layer] {
            let indices: Vec<u32> = (0..source.count(kind) as u32).collect();
            #[cfg(feature = "rayon")]
            let copies: Vec<_> = indices
                .into_par_iter()
                .map(|index| source.geological_entity(EntityId::new(kind, index)).clone())
                .collect();
            #[cfg(not(feature = "rayon"))]
            let copies: Vec<_> = indices
                .into_iter()
                .map(|index| source.geological_entity(EntityId::new(kind, index)).clone())
                .collect();
            for (index, src) in copies.into_iter().enumerate() {
                let id = EntityId::new(kind, index as u32);
                let dst = self.graph.geological_entity_mut(id);
                dst.name = src.name;
                dst.geological_feature = src.geological_feature;
                dst.children = src.children;
                dst.in_boundaries = src.in_boundaries;
            }
        }
        *self.graph.universe_mut() = source.universe().clone();
        remap
    }

    /// Finalizes the model: derives an epsilon from the accumulated
    /// bounding box if one was never set explicitly, runs the full repair
    /// pipeline, and rebuilds the vertex index from the (now repaired)
    /// entity geometry. Idempotent, matching `Repair::All`'s idempotence.
    pub fn end_model(&mut self) -> Result<()> {
        if self.vertices.epsilon() <= 0.0 {
            let mut bbox = BoundingBox::new();
            for id in self.graph.all_mesh_entities() {
                for p in self.graph.mesh_entity(id).mesh.vertices() {
                    bbox.add_point(p);
                }
            }
            self.vertices.set_epsilon(crate::geometry::epsilon_from_diagonal(bbox.diagonal()));
        }
        repair(self, RepairMode::ALL);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_corner_registers_a_canonical_vertex() {
        let mut builder = Builder::new(1e-6);
        let id = builder.add_corner(Point::new(1.0, 2.0, 3.0));
        assert_eq!(id.kind, EntityKind::Corner);
        assert_eq!(builder.vertices.len(), 1);
    }

    #[test]
    fn find_or_create_corner_deduplicates() {
        let mut builder = Builder::new(1e-6);
        let a = builder.find_or_create_corner(Point::new(0.0, 0.0, 0.0));
        let b = builder.find_or_create_corner(Point::new(0.0, 0.0, 0.0));
        assert_eq!(a, b);
        assert_eq!(builder.graph.count(EntityKind::Corner), 1);
    }

    #[test]
    fn add_boundary_sets_reciprocal_in_boundaries() {
        let mut builder = Builder::new(1e-6);
        let corner = builder.add_corner(Point::new(0.0, 0.0, 0.0));
        let line = builder.add_line(vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0)]);
        builder.add_boundary(line, corner, None);
        assert!(builder.graph.mesh_entity(line).boundaries.contains(&corner));
        assert!(builder.graph.mesh_entity(corner).in_boundaries.contains(&line));
    }

    #[test]
    fn build_contacts_groups_lines_by_interface_set() {
        let mut builder = Builder::new(1e-6);
        let surface = builder.add_surface(
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2]],
        );
        let interface = builder.graph.push_geological_entity(EntityKind::Interface);
        builder.set_parent(surface, interface);
        let line = builder.add_line(vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0)]);
        builder.add_boundary(surface, line, None);
        builder.build_contacts();
        assert_eq!(builder.graph.count(EntityKind::Contact), 1);
        assert_eq!(builder.graph.mesh_entity(line).parent.unwrap().kind, EntityKind::Contact);
    }

    #[test]
    fn find_or_create_contact_reuses_a_matching_interface_set() {
        let mut builder = Builder::new(1e-6);
        let a = builder.graph.push_geological_entity(EntityKind::Interface);
        let b = builder.graph.push_geological_entity(EntityKind::Interface);
        let first = builder.find_or_create_contact(vec![b, a]);
        let second = builder.find_or_create_contact(vec![a, b]);
        assert_eq!(first, second);
        assert_eq!(builder.graph.count(EntityKind::Contact), 1);
    }

    #[test]
    fn create_entity_dispatches_to_mesh_or_geological_storage() {
        let mut builder = Builder::new(1e-6);
        let corner = builder.create_entity(EntityKind::Corner);
        assert_eq!(corner.kind, EntityKind::Corner);
        assert_eq!(builder.graph.count(EntityKind::Corner), 1);
        let layer = builder.create_entity(EntityKind::Layer);
        assert_eq!(layer.kind, EntityKind::Layer);
        assert_eq!(builder.graph.count(EntityKind::Layer), 1);
    }

    #[test]
    fn set_boundary_rewires_both_directions_and_drops_the_old_one() {
        let mut builder = Builder::new(1e-6);
        let a = builder.add_corner(Point::new(0.0, 0.0, 0.0));
        let b = builder.add_corner(Point::new(1.0, 0.0, 0.0));
        let c = builder.add_corner(Point::new(2.0, 0.0, 0.0));
        let line = builder.add_line(vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0)]);
        builder.add_boundary(line, a, None);
        builder.add_boundary(line, b, None);

        builder.set_boundary(line, 1, c, None);

        assert_eq!(builder.graph.mesh_entity(line).boundaries[1], c);
        assert!(builder.graph.mesh_entity(c).in_boundaries.contains(&line));
        assert!(!builder.graph.mesh_entity(b).in_boundaries.contains(&line));
    }

    #[test]
    fn delete_entities_compacts_storage_and_drops_dangling_relations() {
        let mut builder = Builder::new(1e-6);
        let corner_a = builder.add_corner(Point::new(0.0, 0.0, 0.0));
        let corner_b = builder.add_corner(Point::new(1.0, 0.0, 0.0));
        let line_a = builder.add_line(vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0)]);
        builder.add_boundary(line_a, corner_a, None);
        builder.add_boundary(line_a, corner_b, None);
        let corner_c = builder.add_corner(Point::new(5.0, 5.0, 5.0));

        // corner_a is Corner#0; deleting it should shift corner_b/corner_c
        // down by one and drop line_a's now-dangling boundary slot.
        let closure = FxHashSet::from_iter([corner_a]);
        builder.delete_entities(&closure);

        assert_eq!(builder.graph.count(EntityKind::Corner), 2);
        assert!(!builder.graph.mesh_entity(line_a).boundaries.contains(&corner_a));
        assert_eq!(builder.graph.mesh_entity(line_a).boundaries.len(), 1);
        let _ = corner_c;
    }

    #[test]
    fn copy_macro_topology_preserves_ids_and_relations() {
        let mut source = Builder::new(1e-6);
        let corner = source.add_corner(Point::new(0.0, 0.0, 0.0));
        let line = source.add_line(vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0)]);
        source.add_boundary(line, corner, None);
        let contact = source.create_geological_entity(EntityKind::Contact);
        source.set_parent(line, contact);

        let mut dest = Builder::new(1e-6);
        let remap = dest.copy_macro_topology(&source.graph);

        assert_eq!(remap.get(&corner), Some(&corner));
        assert_eq!(remap.get(&line), Some(&line));
        assert!(dest.graph.mesh_entity(line).boundaries.contains(&corner));
        assert!(dest.graph.mesh_entity(corner).in_boundaries.contains(&line));
        assert_eq!(dest.graph.mesh_entity(line).parent, Some(contact));
        assert!(dest.graph.geological_entity(contact).children.contains(&line));
        assert!(matches!(dest.graph.mesh_entity(line).mesh, MeshData::Line(_)));
        assert!(dest.graph.mesh_entity(line).mesh.vertices().is_empty());
    }

    #[test]
    fn delete_entity_closure_removes_an_unshared_triangle_entirely() {
        let mut builder = Builder::new(1e-6);
        let pts = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
        ];
        let corners: Vec<_> = pts.iter().map(|p| builder.add_corner(*p)).collect();
        let lines: Vec<_> = (0..3)
            .map(|i| {
                let line = builder.add_line(vec![pts[i], pts[(i + 1) % 3]]);
                builder.add_boundary(line, corners[i], None);
                builder.add_boundary(line, corners[(i + 1) % 3], None);
                line
            })
            .collect();
        let surface = builder.add_surface(pts.to_vec(), vec![vec![0, 1, 2]]);
        for &line in &lines {
            builder.add_boundary(surface, line, None);
        }

        builder.delete_entity_closure([surface]);

        assert_eq!(builder.graph.count(EntityKind::Surface), 0);
        assert_eq!(builder.graph.count(EntityKind::Line), 0);
        assert_eq!(builder.graph.count(EntityKind::Corner), 0);
        // remap_entities only drops occurrences of deleted entities; the
        // canonical points themselves are reclaimed by repair's isolated-
        // vertex pass, not by delete_entities itself.
        for canonical in 0..builder.vertices.len() as u32 {
            assert!(builder.vertices.occurrences(canonical).is_empty());
        }
    }
}
