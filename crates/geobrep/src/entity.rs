//! Entity records (C2/C3): the per-entity relations and geometry that an
//! [`crate::graph::EntityGraph`] stores one of per `(kind, index)`.
//!
//! Mesh entities (Corner/Line/Surface/Region) carry geometry and sit on
//! both sides of the boundary relation; geological entities (Contact/
//! Interface/Layer) carry none and exist purely to aggregate mesh entities
//! under `children`.

use crate::attributes::AttributeManager;
use crate::ids::{EntityId, GeologicalFeature};
use crate::mesh_data::MeshData;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Most entities are bounded by, or bound, only a handful of others
/// (a Surface sits between exactly two Regions; a Corner closes off a
/// few Lines) — inline storage for the common case, the same shape the
/// original source's `compute_neighbours_graph` adjacency lists use.
pub type RelationList = SmallVec<[EntityId; 2]>;

/// A Corner, Line, Surface or Region.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeshEntity {
    pub id: EntityId,
    pub name: String,
    pub geological_feature: GeologicalFeature,
    /// This entity's parent geological entity (a Line's Contact, a
    /// Surface's Interface, a Region's Layer), if any.
    pub parent: Option<EntityId>,
    /// Entities of `id.kind.boundary_type()` that bound this one.
    pub boundaries: RelationList,
    /// For a Region's `boundaries` only: `sides[i]` is `true` when the
    /// region lies on the positive side of `boundaries[i]`'s orientation.
    /// Empty for every other kind.
    pub sides: Vec<bool>,
    /// Entities of `id.kind.in_boundary_type()` this one bounds.
    pub in_boundaries: RelationList,
    pub mesh: MeshData,
    /// Not carried by the native JSON format (C-native): rebuilt from
    /// scratch by [`crate::vertex_index::SharedVertexIndex::rebuild_from_geometry`]
    /// on read, since it is itself derived from the shared vertex index.
    #[serde(skip)]
    pub vertex_attributes: AttributeManager,
    /// One row per cell (a Region's `tets`); empty for every other kind.
    /// `spec.md` §9 names vertex/edge/polygon/cell as the four subelement
    /// attribute kinds an entity may carry — this is the cell one, kept
    /// separate from `vertex_attributes` rather than folded into it since
    /// the two grow on different counters (`mesh.vertex_count()` versus
    /// `region.tets.len()`).
    #[serde(skip)]
    pub cell_attributes: AttributeManager,
}

impl MeshEntity {
    pub fn new(id: EntityId, mesh: MeshData) -> Self {
        MeshEntity {
            id,
            name: String::new(),
            geological_feature: GeologicalFeature::default(),
            parent: None,
            boundaries: RelationList::new(),
            sides: Vec::new(),
            in_boundaries: RelationList::new(),
            mesh,
            vertex_attributes: AttributeManager::new(),
            cell_attributes: AttributeManager::new(),
        }
    }

    pub fn is_on_voi(&self) -> bool {
        self.geological_feature.is_on_voi()
    }
}

/// A Contact, Interface or Layer: a pure grouping of mesh entities.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GeologicalEntity {
    pub id_index: u32,
    pub name: String,
    pub geological_feature: GeologicalFeature,
    pub children: RelationList,
    /// Only populated for Contact entities, whose `in_boundary_type` is
    /// Interface — see `DESIGN.md` for why this is the one geological
    /// entity with a non-empty `in_boundaries`.
    pub in_boundaries: RelationList,
}

/// The Universe: the unbounded exterior region, addressed outside the
/// normal `Region` index space because it never owns an interior mesh and
/// is not subject to dependency-closure deletion.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Universe {
    pub boundaries: RelationList,
    pub sides: Vec<bool>,
}

impl GeologicalFeature {
    /// Whether this feature marks an entity as part of the model's
    /// void/exterior boundary (`is_on_voi` in the original source).
    pub const fn is_on_voi(self) -> bool {
        matches!(
            self,
            GeologicalFeature::Voi | GeologicalFeature::StratiVoi | GeologicalFeature::FaultVoi
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{EntityId, EntityKind};
    use crate::mesh_data::{Corner, MeshData};

    #[test]
    fn fresh_mesh_entity_has_no_relations() {
        let id = EntityId::new(EntityKind::Corner, 0);
        let entity = MeshEntity::new(id, MeshData::Corner(Corner::default()));
        assert!(entity.boundaries.is_empty());
        assert!(entity.in_boundaries.is_empty());
        assert!(entity.parent.is_none());
    }

    #[test]
    fn voi_features_report_on_voi() {
        assert!(GeologicalFeature::Voi.is_on_voi());
        assert!(GeologicalFeature::StratiVoi.is_on_voi());
        assert!(!GeologicalFeature::Strati.is_on_voi());
    }
}
