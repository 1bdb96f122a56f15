//! Shared geometric primitives: the point type and the epsilon-aware
//! colocation predicate used throughout C4/C6/C7 in place of `vec3`
//! operator `==` (see `spec.md` §9's design note on `within(epsilon)`).

use nalgebra::Point3;
use robust::{orient3d, Coord3D};

/// A model-space point. Always 3D: the specification's Corner/Line/Surface/
/// Region geometry is inherently 3D, matching the original source's `vec3`.
pub type Point = Point3<f64>;

/// Returns whether two points are within `epsilon` of each other.
///
/// Replaces the original source's `vec3::operator==`; used by the shared
/// vertex index (C4) and the validity checker (C7) for every colocation
/// test so there is exactly one place that defines "the same point".
pub fn within(a: &Point, b: &Point, epsilon: f64) -> bool {
    nalgebra::distance(a, b) <= epsilon
}

/// Derives the model-wide colocation tolerance from a bounding-box
/// diagonal, the convention used by the `.ml` reader (C10) and by
/// `Builder::end_model` when no epsilon was set explicitly.
pub fn epsilon_from_diagonal(diagonal: f64) -> f64 {
    diagonal * 1e-6
}

/// Axis-aligned bounding box accumulator, used to derive `epsilon` and by
/// the validity checker's finite-extension check.
#[derive(Copy, Clone, Debug)]
pub struct BoundingBox {
    min: Point,
    max: Point,
    empty: bool,
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox {
            min: Point::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            empty: true,
        }
    }
}

impl BoundingBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point(&mut self, p: &Point) {
        self.empty = false;
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn diagonal(&self) -> f64 {
        if self.empty {
            0.0
        } else {
            nalgebra::distance(&self.min, &self.max)
        }
    }

    pub fn min(&self) -> Point {
        self.min
    }

    pub fn max(&self) -> Point {
        self.max
    }
}

/// Barycenter (unweighted average) of a set of points. Panics if empty,
/// mirroring the original's `ringmesh_assert` on non-empty element lists.
pub fn barycenter(points: &[Point]) -> Point {
    assert!(!points.is_empty(), "barycenter of an empty point set");
    let mut acc = nalgebra::Vector3::zeros();
    for p in points {
        acc += p.coords;
    }
    Point::from(acc / points.len() as f64)
}

/// Length of the segment `[a, b]`.
pub fn segment_length(a: &Point, b: &Point) -> f64 {
    nalgebra::distance(a, b)
}

/// Area of a (possibly non-planar) triangle via the cross product.
pub fn triangle_area(a: &Point, b: &Point, c: &Point) -> f64 {
    0.5 * (b - a).cross(&(c - a)).norm()
}

/// Signed volume of the tetrahedron `(a, b, c, d)`, used for cell-size
/// measurement. Floating-point only; see [`orient_tet`] for the
/// exact-sign variant used where round-off could flip a geometrically
/// zero volume's sign.
pub fn signed_tet_volume(a: &Point, b: &Point, c: &Point, d: &Point) -> f64 {
    (b - a).cross(&(c - a)).dot(&(d - a)) / 6.0
}

fn to_coord3d(p: &Point) -> Coord3D<f64> {
    Coord3D { x: p.x, y: p.y, z: p.z }
}

/// Exact-sign orientation predicate for the tetrahedron `(a, b, c, d)`
/// (Shewchuk's adaptive-precision `orient3d`, via the `robust` crate).
/// Zero means the four points are exactly coplanar, not just close to it
/// under some epsilon — the test the mesh-entity validity check (C7)
/// uses for degenerate tets instead of thresholding [`signed_tet_volume`].
pub fn orient_tet(a: &Point, b: &Point, c: &Point, d: &Point) -> f64 {
    orient3d(to_coord3d(a), to_coord3d(b), to_coord3d(c), to_coord3d(d))
}
