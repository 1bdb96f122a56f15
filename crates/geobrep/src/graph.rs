//! The entity graph (C3): seven ordered sequences of entities plus the
//! Universe, addressed by [`EntityId`] in O(1).
//!
//! `EntityGraph` itself never mutates topology — that's
//! [`crate::builder::Builder`]'s job — it only stores and looks up.

use crate::entity::{GeologicalEntity, MeshEntity, Universe};
use crate::ids::{EntityId, EntityKind, NO_ID};
use crate::mesh_data::{Corner, Line, MeshData, Region, Surface};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Per-kind `old index -> new index` table produced by
/// [`EntityGraph::remove_entities`], `None` for an index that was deleted.
pub type EntityRemap = FxHashMap<EntityKind, Vec<Option<u32>>>;

/// Applies an [`EntityRemap`] to a single id, returning `None` if `id`
/// names a deleted entity.
pub fn remap_id(remap: &EntityRemap, id: EntityId) -> Option<EntityId> {
    remap
        .get(&id.kind)
        .and_then(|table| table.get(id.index as usize))
        .copied()
        .flatten()
        .map(|index| EntityId::new(id.kind, index))
}

/// The full B-Rep entity graph of a geological model.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntityGraph {
    corners: Vec<MeshEntity>,
    lines: Vec<MeshEntity>,
    surfaces: Vec<MeshEntity>,
    regions: Vec<MeshEntity>,
    contacts: Vec<GeologicalEntity>,
    interfaces: Vec<GeologicalEntity>,
    layers: Vec<GeologicalEntity>,
    universe: Universe,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn mesh_vec(&self, kind: EntityKind) -> &Vec<MeshEntity> {
        match kind {
            EntityKind::Corner => &self.corners,
            EntityKind::Line => &self.lines,
            EntityKind::Surface => &self.surfaces,
            EntityKind::Region => &self.regions,
            _ => panic!("{kind} is not a mesh entity kind"),
        }
    }

    fn mesh_vec_mut(&mut self, kind: EntityKind) -> &mut Vec<MeshEntity> {
        match kind {
            EntityKind::Corner => &mut self.corners,
            EntityKind::Line => &mut self.lines,
            EntityKind::Surface => &mut self.surfaces,
            EntityKind::Region => &mut self.regions,
            _ => panic!("{kind} is not a mesh entity kind"),
        }
    }

    fn geol_vec(&self, kind: EntityKind) -> &Vec<GeologicalEntity> {
        match kind {
            EntityKind::Contact => &self.contacts,
            EntityKind::Interface => &self.interfaces,
            EntityKind::Layer => &self.layers,
            _ => panic!("{kind} is not a geological entity kind"),
        }
    }

    fn geol_vec_mut(&mut self, kind: EntityKind) -> &mut Vec<GeologicalEntity> {
        match kind {
            EntityKind::Contact => &mut self.contacts,
            EntityKind::Interface => &mut self.interfaces,
            EntityKind::Layer => &mut self.layers,
            _ => panic!("{kind} is not a geological entity kind"),
        }
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        if kind.is_mesh_entity() {
            self.mesh_vec(kind).len()
        } else {
            self.geol_vec(kind).len()
        }
    }

    pub fn mesh_entity(&self, id: EntityId) -> &MeshEntity {
        &self.mesh_vec(id.kind)[id.index as usize]
    }

    pub fn mesh_entity_mut(&mut self, id: EntityId) -> &mut MeshEntity {
        &mut self.mesh_vec_mut(id.kind)[id.index as usize]
    }

    pub fn try_mesh_entity(&self, id: EntityId) -> Option<&MeshEntity> {
        self.mesh_vec(id.kind).get(id.index as usize)
    }

    pub fn geological_entity(&self, id: EntityId) -> &GeologicalEntity {
        &self.geol_vec(id.kind)[id.index as usize]
    }

    pub fn geological_entity_mut(&mut self, id: EntityId) -> &mut GeologicalEntity {
        &mut self.geol_vec_mut(id.kind)[id.index as usize]
    }

    pub fn try_geological_entity(&self, id: EntityId) -> Option<&GeologicalEntity> {
        self.geol_vec(id.kind).get(id.index as usize)
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn universe_mut(&mut self) -> &mut Universe {
        &mut self.universe
    }

    pub fn entities(&self, kind: EntityKind) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.count(kind) as u32).map(move |i| EntityId::new(kind, i))
    }

    pub fn all_mesh_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        EntityKind::ALL
            .into_iter()
            .filter(|k| k.is_mesh_entity())
            .flat_map(move |k| self.entities(k))
    }

    pub fn all_geological_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        EntityKind::ALL
            .into_iter()
            .filter(|k| k.is_geological_entity())
            .flat_map(move |k| self.entities(k))
    }

    /// Appends a new mesh entity of `kind` with empty geometry, returning
    /// its freshly assigned id. Only [`crate::builder::Builder`] calls this.
    pub(crate) fn push_mesh_entity(&mut self, kind: EntityKind) -> EntityId {
        let index = self.mesh_vec(kind).len() as u32;
        let id = EntityId::new(kind, index);
        let mesh = match kind {
            EntityKind::Corner => MeshData::Corner(Corner::default()),
            EntityKind::Line => MeshData::Line(Line::default()),
            EntityKind::Surface => MeshData::Surface(Surface::default()),
            EntityKind::Region => MeshData::Region(Region::default()),
            _ => unreachable!(),
        };
        self.mesh_vec_mut(kind).push(MeshEntity::new(id, mesh));
        id
    }

    pub(crate) fn push_geological_entity(&mut self, kind: EntityKind) -> EntityId {
        let index = self.geol_vec(kind).len() as u32;
        self.geol_vec_mut(kind).push(GeologicalEntity {
            id_index: index,
            ..GeologicalEntity::default()
        });
        EntityId::new(kind, index)
    }

    /// The region on `side` of `surface`, if the surface bounds exactly one
    /// region on that side (`NO_ID`-typed sentinel id if none, asserted
    /// against in debug builds if more than one claims the same side).
    pub fn find_region(&self, surface: EntityId, side: bool) -> Option<EntityId> {
        debug_assert_eq!(surface.kind, EntityKind::Surface);
        let mut found = None;
        for region_id in self.entities(EntityKind::Region) {
            let region = self.mesh_entity(region_id);
            for (b, &s) in region.boundaries.iter().zip(region.sides.iter()) {
                if *b == surface && s == side {
                    debug_assert!(found.is_none(), "surface claimed by two regions on one side");
                    found = Some(region_id);
                }
            }
        }
        found
    }

    /// Every entity whose geological feature marks it as lying on the
    /// void/model-boundary (`is_on_voi` in the original source).
    pub fn entities_on_voi(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.all_mesh_entities()
            .filter(move |id| self.mesh_entity(*id).is_on_voi())
    }

    /// `true` if `id` refers to a real, stored entity (not the `NO_ID`
    /// sentinel and within bounds).
    pub fn is_defined(&self, id: EntityId) -> bool {
        id.index != NO_ID
            && (if id.kind.is_mesh_entity() {
                (id.index as usize) < self.mesh_vec(id.kind).len()
            } else {
                (id.index as usize) < self.geol_vec(id.kind).len()
            })
    }

    /// Removes every entity in `to_delete`, compacting each kind's storage
    /// and remapping every surviving relation (`boundaries`/`in_boundaries`/
    /// `parent`/`children`, the Universe's boundary list) to the new
    /// indices. `to_delete` is expected to already be a dependency-closed
    /// set (see [`crate::closure::dependency_closure`]); a relation into a
    /// deleted entity that `to_delete` did NOT close over is silently
    /// dropped rather than left dangling, matching invariant 1's
    /// bidirectionality requirement — the caller is responsible for having
    /// computed a correct closure.
    ///
    /// Only [`crate::builder::Builder::delete_entities`] calls this.
    pub(crate) fn remove_entities(&mut self, to_delete: &FxHashSet<EntityId>) -> EntityRemap {
        let mut remap: EntityRemap = FxHashMap::default();
        for kind in EntityKind::ALL {
            let count = self.count(kind);
            let mut table = vec![None; count];
            let mut next = 0u32;
            for i in 0..count as u32 {
                if !to_delete.contains(&EntityId::new(kind, i)) {
                    table[i as usize] = Some(next);
                    next += 1;
                }
            }
            remap.insert(kind, table);
        }

        for kind in EntityKind::ALL.into_iter().filter(|k| k.is_mesh_entity()) {
            let old = std::mem::take(self.mesh_vec_mut(kind));
            let mut new_vec = Vec::with_capacity(old.len());
            for (i, mut entity) in old.into_iter().enumerate() {
                let id = EntityId::new(kind, i as u32);
                if to_delete.contains(&id) {
                    continue;
                }
                entity.id = remap_id(&remap, id).expect("surviving entity must remap");
                let sides = std::mem::take(&mut entity.sides);
                let mut kept_sides = Vec::with_capacity(sides.len());
                let mut new_boundaries = crate::entity::RelationList::new();
                for (b, side) in entity.boundaries.iter().zip(
                    sides
                        .into_iter()
                        .map(Some)
                        .chain(std::iter::repeat(None)),
                ) {
                    if let Some(new_b) = remap_id(&remap, *b) {
                        new_boundaries.push(new_b);
                        if let Some(side) = side {
                            kept_sides.push(side);
                        }
                    }
                }
                entity.boundaries = new_boundaries;
                entity.sides = kept_sides;
                entity.in_boundaries =
                    entity.in_boundaries.iter().filter_map(|id| remap_id(&remap, *id)).collect();
                entity.parent = entity.parent.and_then(|p| remap_id(&remap, p));
                new_vec.push(entity);
            }
            *self.mesh_vec_mut(kind) = new_vec;
        }

        for kind in EntityKind::ALL.into_iter().filter(|k| k.is_geological_entity()) {
            let old = std::mem::take(self.geol_vec_mut(kind));
            let mut new_vec = Vec::with_capacity(old.len());
            for (i, mut entity) in old.into_iter().enumerate() {
                let id = EntityId::new(kind, i as u32);
                if to_delete.contains(&id) {
                    continue;
                }
                entity.id_index = remap_id(&remap, id).expect("surviving entity must remap").index;
                entity.children =
                    entity.children.iter().filter_map(|id| remap_id(&remap, *id)).collect();
                entity.in_boundaries =
                    entity.in_boundaries.iter().filter_map(|id| remap_id(&remap, *id)).collect();
                new_vec.push(entity);
            }
            *self.geol_vec_mut(kind) = new_vec;
        }

        let universe = std::mem::take(&mut self.universe);
        let mut new_boundaries = crate::entity::RelationList::new();
        let mut new_sides = Vec::new();
        for (b, side) in universe.boundaries.iter().zip(universe.sides.iter()) {
            if let Some(new_b) = remap_id(&remap, *b) {
                new_boundaries.push(new_b);
                new_sides.push(*side);
            }
        }
        self.universe = Universe {
            boundaries: new_boundaries,
            sides: new_sides,
        };

        remap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushing_entities_assigns_sequential_indices() {
        let mut graph = EntityGraph::new();
        let c0 = graph.push_mesh_entity(EntityKind::Corner);
        let c1 = graph.push_mesh_entity(EntityKind::Corner);
        assert_eq!(c0.index, 0);
        assert_eq!(c1.index, 1);
        assert_eq!(graph.count(EntityKind::Corner), 2);
    }

    #[test]
    fn find_region_matches_boundary_and_side() {
        let mut graph = EntityGraph::new();
        let surface = graph.push_mesh_entity(EntityKind::Surface);
        let region = graph.push_mesh_entity(EntityKind::Region);
        graph.mesh_entity_mut(region).boundaries.push(surface);
        graph.mesh_entity_mut(region).sides.push(true);
        assert_eq!(graph.find_region(surface, true), Some(region));
        assert_eq!(graph.find_region(surface, false), None);
    }
}
