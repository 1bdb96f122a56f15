//! Dependency closure (C8): given a set of entities slated for deletion,
//! computes every other entity that would be left dangling or
//! unreferenced and must be deleted alongside them.
//!
//! A boundary entity joins the closure once *every* entity in its
//! `in_boundaries` is already in the closure (nothing outside the
//! deletion still needs it); a geological entity joins once every one of
//! its `children` is in the closure. Both conditions are evaluated to a
//! fixpoint, since adding one entity can make another eligible.

use crate::graph::EntityGraph;
use crate::ids::{EntityId, EntityKind};
use itertools::Itertools;
use petgraph::algo::kosaraju_scc;
use petgraph::graphmap::UnGraphMap;
use rustc_hash::FxHashSet;

/// Expands `seeds` into the full set of entities that must be deleted
/// together to leave the graph consistent.
pub fn dependency_closure(
    graph: &EntityGraph,
    seeds: impl IntoIterator<Item = EntityId>,
) -> FxHashSet<EntityId> {
    let mut closure: FxHashSet<EntityId> = seeds.into_iter().collect();
    let mut changed = true;

    while changed {
        changed = false;
        let frontier: Vec<EntityId> = closure
            .iter()
            .filter(|id| id.kind.is_mesh_entity())
            .copied()
            .collect();

        for id in frontier {
            let entity = graph.mesh_entity(id);

            for &boundary in &entity.boundaries {
                if closure.contains(&boundary) {
                    continue;
                }
                // A Surface still referenced by the Universe's own
                // boundary list (spec.md §4.8's "counting Universe" side
                // of the rule) is not orphaned even when every Region
                // occupant is already in the closure.
                if boundary.kind == EntityKind::Surface && graph.universe().boundaries.contains(&boundary) {
                    continue;
                }
                let boundary_entity = graph.mesh_entity(boundary);
                let orphaned = boundary_entity
                    .in_boundaries
                    .iter()
                    .all(|in_bound| closure.contains(in_bound));
                if orphaned {
                    closure.insert(boundary);
                    changed = true;
                }
            }

            if let Some(parent) = entity.parent
                && !closure.contains(&parent)
            {
                let geol = graph.geological_entity(parent);
                if geol.children.iter().all(|child| closure.contains(child)) {
                    closure.insert(parent);
                    changed = true;
                }
            }
        }
    }

    closure
}

/// Groups Regions into connected components by shared-Surface adjacency
/// (two Regions are adjacent when some Surface bounds both), the way the
/// original source's `compute_connected_components` groups mesh elements
/// by shared links. A model split across several disjoint volumes shows up
/// here as more than one component; [`dependency_closure`] answers a
/// different question (what must go with a deletion) and does not
/// subsume this.
pub fn region_connected_components(graph: &EntityGraph) -> Vec<Vec<EntityId>> {
    let mut adjacency: UnGraphMap<EntityId, ()> = UnGraphMap::new();
    for region in graph.entities(EntityKind::Region) {
        adjacency.add_node(region);
    }
    for surface in graph.entities(EntityKind::Surface) {
        let regions: Vec<EntityId> = graph
            .mesh_entity(surface)
            .in_boundaries
            .iter()
            .copied()
            .filter(|id| id.kind == EntityKind::Region)
            .collect();
        for (a, b) in regions.into_iter().tuple_combinations() {
            adjacency.add_edge(a, b, ());
        }
    }
    kosaraju_scc(&adjacency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::geometry::Point;
    use crate::ids::EntityKind;

    /// A single standalone triangle Surface bounded by three Lines bounded
    /// by three Corners, with no other entity referencing any of them:
    /// deleting the Surface must cascade all the way down, and up through
    /// its Interface parent.
    #[test]
    fn closure_cascades_down_through_unshared_boundaries_and_up_through_parent() {
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
        let interface = builder.graph.push_geological_entity(EntityKind::Interface);
        builder.set_parent(surface, interface);

        let closure = dependency_closure(&builder.graph, [surface]);

        assert!(closure.contains(&surface));
        for line in &lines {
            assert!(closure.contains(line));
        }
        for corner in &corners {
            assert!(closure.contains(corner));
        }
        assert!(closure.contains(&interface));
    }

    /// A Corner shared by two Lines is not pulled into the closure of just
    /// one of them.
    #[test]
    fn shared_boundary_entity_is_not_pulled_into_a_partial_closure() {
        let mut builder = Builder::new(1e-6);
        let shared = builder.add_corner(Point::new(0.0, 0.0, 0.0));
        let other_end_a = builder.add_corner(Point::new(1.0, 0.0, 0.0));
        let other_end_b = builder.add_corner(Point::new(-1.0, 0.0, 0.0));
        let line_a = builder.add_line(vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0)]);
        let line_b = builder.add_line(vec![Point::new(0.0, 0.0, 0.0), Point::new(-1.0, 0.0, 0.0)]);
        builder.add_boundary(line_a, shared, None);
        builder.add_boundary(line_a, other_end_a, None);
        builder.add_boundary(line_b, shared, None);
        builder.add_boundary(line_b, other_end_b, None);

        let closure = dependency_closure(&builder.graph, [line_a]);
        assert!(closure.contains(&line_a));
        assert!(closure.contains(&other_end_a));
        assert!(!closure.contains(&shared));
        assert!(!closure.contains(&line_b));
    }

    /// A Surface bounding a Region on one side and the Universe on the
    /// other is not orphaned when that Region is deleted: the Universe
    /// still references it, so `in_boundaries` being all-in-closure is not
    /// the whole story.
    #[test]
    fn surface_attached_to_the_universe_is_never_orphaned() {
        let mut builder = Builder::new(1e-6);
        let surface = builder.add_surface(
            vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0)],
            vec![vec![0, 1, 2]],
        );
        let region = builder.add_region();
        builder.add_boundary(region, surface, Some(true));
        builder.add_universe_boundary(surface, false);

        let closure = dependency_closure(&builder.graph, [region]);

        assert!(closure.contains(&region));
        assert!(!closure.contains(&surface));
    }

    #[test]
    fn two_regions_sharing_a_surface_form_one_component() {
        let mut builder = Builder::new(1e-6);
        let surface = builder.add_surface(
            vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0)],
            vec![vec![0, 1, 2]],
        );
        let lower = builder.add_region();
        let upper = builder.add_region();
        builder.add_boundary(lower, surface, Some(true));
        builder.add_boundary(upper, surface, Some(false));
        let isolated = builder.add_region();

        let components = region_connected_components(&builder.graph);
        assert_eq!(components.len(), 2);
        let shared_component = components.iter().find(|c| c.contains(&lower)).unwrap();
        assert!(shared_component.contains(&upper));
        assert!(!shared_component.contains(&isolated));
    }
}
