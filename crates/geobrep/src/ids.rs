//! Entity identifier algebra (C1).
//!
//! An entity id is a `(kind, index)` pair. [`EntityKind`] carries the static
//! typing tables that say which kind may bound, be bounded by, parent, or
//! child which other kind — the rules a [`crate::builder::Builder`] enforces
//! on every topology primitive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven entity kinds, partitioned into mesh entities (carry geometry)
/// and geological entities (pure aggregation).
///
/// Declaration order is the order used for `(kind, index)` comparisons, so
/// ids sort first by kind in this sequence.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Corner = 0,
    Line,
    Surface,
    Region,
    Contact,
    Interface,
    Layer,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Corner,
        EntityKind::Line,
        EntityKind::Surface,
        EntityKind::Region,
        EntityKind::Contact,
        EntityKind::Interface,
        EntityKind::Layer,
    ];

    pub const fn is_mesh_entity(self) -> bool {
        matches!(
            self,
            EntityKind::Corner | EntityKind::Line | EntityKind::Surface | EntityKind::Region
        )
    }

    pub const fn is_geological_entity(self) -> bool {
        !self.is_mesh_entity()
    }

    /// The kind that may be this kind's `parent`, or `None` if parenting is
    /// not allowed for this kind.
    pub const fn parent_type(self) -> Option<EntityKind> {
        use EntityKind::*;
        match self {
            Line => Some(Contact),
            Surface => Some(Interface),
            Region => Some(Layer),
            Corner | Contact | Interface | Layer => None,
        }
    }

    /// The kind that may be this kind's `child`, or `None`.
    pub const fn child_type(self) -> Option<EntityKind> {
        use EntityKind::*;
        match self {
            Contact => Some(Line),
            Interface => Some(Surface),
            Layer => Some(Region),
            Corner | Line | Surface | Region => None,
        }
    }

    /// The kind that may appear in this kind's `boundaries`, or `None`.
    ///
    /// Geological entities have no boundary relation of their own: the
    /// table in the specification lists their aggregated members under
    /// `boundaries` and `children` alike, but only `children` is stored —
    /// see `DESIGN.md` for the resolved ambiguity.
    pub const fn boundary_type(self) -> Option<EntityKind> {
        use EntityKind::*;
        match self {
            Line => Some(Corner),
            Surface => Some(Line),
            Region => Some(Surface),
            Corner | Contact | Interface | Layer => None,
        }
    }

    /// The kind that may appear in this kind's `in_boundaries`, or `None`.
    pub const fn in_boundary_type(self) -> Option<EntityKind> {
        use EntityKind::*;
        match self {
            Corner => Some(Line),
            Line => Some(Surface),
            Surface => Some(Region),
            Contact => Some(Interface),
            Region | Interface | Layer => None,
        }
    }

    pub const fn parent_allowed(self) -> bool {
        self.parent_type().is_some()
    }

    pub const fn child_allowed(self) -> bool {
        self.child_type().is_some()
    }

    pub const fn boundary_allowed(self) -> bool {
        self.boundary_type().is_some()
    }

    pub const fn in_boundary_allowed(self) -> bool {
        self.in_boundary_type().is_some()
    }

    pub const fn name(self) -> &'static str {
        use EntityKind::*;
        match self {
            Corner => "Corner",
            Line => "Line",
            Surface => "Surface",
            Region => "Region",
            Contact => "Contact",
            Interface => "Interface",
            Layer => "Layer",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sentinel index used where the specification speaks of `NO_ID`.
///
/// The idiomatic Rust surface prefers `Option<EntityId>` everywhere an
/// id may be absent; this constant exists so code that needs the raw
/// sentinel (debug formatting, the `.ml` writer) can recognize it.
pub const NO_ID: u32 = u32::MAX;

/// A strongly typed `(kind, index)` handle into an [`crate::graph::EntityGraph`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub kind: EntityKind,
    pub index: u32,
}

impl EntityId {
    pub const fn new(kind: EntityKind, index: u32) -> Self {
        EntityId { kind, index }
    }

    pub const fn is_defined(self) -> bool {
        self.index != NO_ID
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind.name(), self.index)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Geological feature tag carried by any entity (`GEOL_FEATURE` in the
/// original source); `NoGeol` is the default.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub enum GeologicalFeature {
    #[default]
    NoGeol,
    Strati,
    Fault,
    Voi,
    StratiFault,
    StratiVoi,
    FaultVoi,
}

impl GeologicalFeature {
    /// Parses the `GEOLOGICAL_FEATURE` token used in Gocad `.ml` files.
    pub fn parse(token: &str) -> Option<Self> {
        use GeologicalFeature::*;
        Some(match token {
            "stratigraphic" | "top" | "none" => Strati,
            "fault" => Fault,
            "boundary" | "voi" => Voi,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_tables_match_the_relation_matrix() {
        assert_eq!(EntityKind::Corner.boundary_type(), None);
        assert_eq!(EntityKind::Line.boundary_type(), Some(EntityKind::Corner));
        assert_eq!(EntityKind::Surface.boundary_type(), Some(EntityKind::Line));
        assert_eq!(EntityKind::Region.boundary_type(), Some(EntityKind::Surface));

        assert_eq!(EntityKind::Corner.in_boundary_type(), Some(EntityKind::Line));
        assert_eq!(EntityKind::Line.in_boundary_type(), Some(EntityKind::Surface));
        assert_eq!(EntityKind::Surface.in_boundary_type(), Some(EntityKind::Region));
        assert_eq!(EntityKind::Region.in_boundary_type(), None);

        assert_eq!(EntityKind::Line.parent_type(), Some(EntityKind::Contact));
        assert_eq!(EntityKind::Surface.parent_type(), Some(EntityKind::Interface));
        assert_eq!(EntityKind::Region.parent_type(), Some(EntityKind::Layer));

        assert_eq!(EntityKind::Contact.child_type(), Some(EntityKind::Line));
        assert_eq!(EntityKind::Interface.child_type(), Some(EntityKind::Surface));
        assert_eq!(EntityKind::Layer.child_type(), Some(EntityKind::Region));
    }

    #[test]
    fn ids_order_by_kind_then_index() {
        let a = EntityId::new(EntityKind::Corner, 5);
        let b = EntityId::new(EntityKind::Line, 0);
        assert!(a < b);
        let c = EntityId::new(EntityKind::Corner, 7);
        assert!(a < c);
    }

    #[test]
    fn no_id_is_the_max_u32() {
        let undefined = EntityId::new(EntityKind::Corner, NO_ID);
        assert!(!undefined.is_defined());
    }
}
