//! Per-entity attribute storage (C2).
//!
//! `spec.md` §9 models the attribute system as "a per-entity map from name
//! to a typed column; the column's element type is statically known at the
//! binding site" rather than the original source's runtime-typed
//! `GEO::Attribute`. [`AttributeManager`] is one such map; an entity owns
//! one per subelement kind it has (vertex/edge/polygon/cell), and lifetime
//! of a binding is tied to the owning entity — dropping the entity drops
//! the manager and every column in it.

use rustc_hash::FxHashMap;
use std::any::Any;

trait Column: Any {
    fn len(&self) -> usize;
    fn push_default(&mut self);
    fn retain_mask(&mut self, keep: &[bool]);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static + Clone + Default> Column for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }
    fn push_default(&mut self) {
        self.push(T::default());
    }
    fn retain_mask(&mut self, keep: &[bool]) {
        let mut it = keep.iter();
        self.retain(|_| *it.next().unwrap_or(&true));
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A map from attribute name to a column of `len()` values, one per
/// subelement of the entity that owns this manager.
#[derive(Default)]
pub struct AttributeManager {
    columns: FxHashMap<String, Box<dyn Column>>,
    len: usize,
}

impl AttributeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subelements (vertices/edges/polygons/cells) this manager
    /// tracks attributes for. All columns are kept at this length.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grows every column by one default-valued entry; called whenever the
    /// owning entity appends a subelement.
    pub fn push_default_row(&mut self) {
        self.len += 1;
        for column in self.columns.values_mut() {
            column.push_default();
        }
    }

    /// Removes rows for which `keep[row]` is `false`. `keep.len()` must
    /// equal `self.len()`.
    pub fn compact(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.len);
        self.len = keep.iter().filter(|k| **k).count();
        for column in self.columns.values_mut() {
            column.retain_mask(keep);
        }
    }

    /// Binds (creating if absent) a typed column named `name`. Subsequent
    /// `get`/`get_mut` calls with a different `T` return `None` rather than
    /// panicking, so a caller that mismatches the binding site's type just
    /// sees an absent attribute.
    pub fn bind<T: 'static + Clone + Default>(&mut self, name: &str) {
        self.columns
            .entry(name.to_string())
            .or_insert_with(|| Box::new(vec![T::default(); self.len]) as Box<dyn Column>);
    }

    pub fn has(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn unbind(&mut self, name: &str) {
        self.columns.remove(name);
    }

    pub fn get<T: 'static>(&self, name: &str, row: usize) -> Option<&T> {
        self.columns
            .get(name)?
            .as_any()
            .downcast_ref::<Vec<T>>()?
            .get(row)
    }

    pub fn get_mut<T: 'static>(&mut self, name: &str, row: usize) -> Option<&mut T> {
        self.columns
            .get_mut(name)?
            .as_any_mut()
            .downcast_mut::<Vec<T>>()?
            .get_mut(row)
    }

    pub fn set<T: 'static + Clone + Default>(&mut self, name: &str, row: usize, value: T) {
        self.bind::<T>(name);
        if let Some(slot) = self.get_mut::<T>(name, row) {
            *slot = value;
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Name of the attribute binding every mesh-entity vertex's canonical id in
/// the shared vertex index (C4) — the Rust analogue of the original
/// source's `model_vertex_id` attribute name constant.
pub const CANONICAL_ID_ATTRIBUTE: &str = "canonical_id";

/// Name of a Region's per-cell volume attribute, bound on its
/// `cell_attributes` manager once [`crate::builder::Builder::add_meshed_region`]
/// computes it.
pub const CELL_VOLUME_ATTRIBUTE: &str = "volume";

/// Name of a Region's per-cell centroid attribute, stored as `[f64; 3]`
/// rather than [`crate::geometry::Point`] so the column's element type
/// needs nothing beyond `Clone + Default`, alongside
/// [`CELL_VOLUME_ATTRIBUTE`].
pub const CELL_CENTROID_ATTRIBUTE: &str = "centroid";

/// Pools every Region's per-cell `cell_attributes` into one manager, the
/// cross-region analogue of what [`crate::vertex_index::SharedVertexIndex`]
/// does for vertices (`spec.md` §8 scenario 6: "transfer attributes from
/// Regions to unified cell attribute manager"). `cells[i]` names the
/// `(Region, local cell index)` unified row `i` came from.
pub struct UnifiedCellAttributes {
    pub manager: AttributeManager,
    pub cells: Vec<(crate::ids::EntityId, u32)>,
}

impl UnifiedCellAttributes {
    /// Builds a unified manager from every Region in `graph`, copying
    /// [`CELL_VOLUME_ATTRIBUTE`]/[`CELL_CENTROID_ATTRIBUTE`] from each
    /// Region's own `cell_attributes` in tet order. A Region with no
    /// bound cell attributes (e.g. a boundary-only Region) contributes no
    /// rows.
    pub fn from_regions(graph: &crate::graph::EntityGraph) -> Self {
        let mut manager = AttributeManager::new();
        let mut cells = Vec::new();
        for region_id in graph.entities(crate::ids::EntityKind::Region) {
            let region = graph.mesh_entity(region_id);
            let crate::mesh_data::MeshData::Region(mesh) = &region.mesh else {
                continue;
            };
            for local in 0..mesh.tets.len() {
                manager.push_default_row();
                let row = manager.len() - 1;
                if let Some(&volume) = region.cell_attributes.get::<f64>(CELL_VOLUME_ATTRIBUTE, local) {
                    manager.set(CELL_VOLUME_ATTRIBUTE, row, volume);
                }
                if let Some(&centroid) = region.cell_attributes.get::<[f64; 3]>(CELL_CENTROID_ATTRIBUTE, local) {
                    manager.set(CELL_CENTROID_ATTRIBUTE, row, centroid);
                }
                cells.push((region_id, local as u32));
            }
        }
        UnifiedCellAttributes { manager, cells }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_get_set_round_trip() {
        let mut mgr = AttributeManager::new();
        mgr.push_default_row();
        mgr.push_default_row();
        mgr.bind::<f64>("volume");
        mgr.set("volume", 1, 3.5f64);
        assert_eq!(mgr.get::<f64>("volume", 0), Some(&0.0));
        assert_eq!(mgr.get::<f64>("volume", 1), Some(&3.5));
    }

    #[test]
    fn mismatched_type_returns_none_not_panic() {
        let mut mgr = AttributeManager::new();
        mgr.push_default_row();
        mgr.bind::<f64>("x");
        assert_eq!(mgr.get::<i32>("x", 0), None);
    }

    #[test]
    fn compact_keeps_columns_aligned_with_len() {
        let mut mgr = AttributeManager::new();
        for i in 0..4 {
            mgr.push_default_row();
            mgr.set("idx", i, i as u32);
        }
        mgr.compact(&[true, false, true, false]);
        assert_eq!(mgr.len(), 2);
        assert_eq!(mgr.get::<u32>("idx", 0), Some(&0));
        assert_eq!(mgr.get::<u32>("idx", 1), Some(&2));
    }
}
