//! Geometric primitives and metrics.
//!
//! This module provides the hexahedron input primitive, triangle and
//! tetrahedron measurement helpers, and thin wrappers over the `robust`
//! exact predicates with sign conventions fixed to positive-volume
//! tetrahedra.

use nalgebra::{Matrix3, Point3, Vector3};
use robust::Coord3D;

use crate::error::{MeshError, MeshResult};

#[inline]
fn coord(p: &Point3<f64>) -> Coord3D<f64> {
    Coord3D {
        x: p.x,
        y: p.y,
        z: p.z,
    }
}

/// Exact orientation test.
///
/// Returns a positive value when `d` lies on the counter-clockwise side of
/// triangle `(a, b, c)`, i.e. when the tetrahedron `(a, b, c, d)` has
/// positive signed volume; negative on the other side; zero when coplanar.
#[inline]
pub fn orient(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    // robust::orient3d is positive when d lies *below* the CCW plane, which
    // is the negated signed-volume convention.
    -robust::orient3d(coord(a), coord(b), coord(c), coord(d))
}

/// Exact circumsphere test for a positive-volume tetrahedron `(a, b, c, d)`.
///
/// Returns a positive value when `e` lies strictly inside the circumsphere,
/// negative when outside, zero when on the sphere.
#[inline]
pub fn in_sphere(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
    e: &Point3<f64>,
) -> f64 {
    // robust::insphere expects the tetrahedron in robust::orient3d-positive
    // order; swapping two vertices converts from our positive-volume order.
    robust::insphere(coord(a), coord(c), coord(b), coord(d), coord(e))
}

/// Signed volume of the tetrahedron `(a, b, c, d)`.
///
/// Positive when `d` lies on the counter-clockwise side of `(a, b, c)`.
#[inline]
pub fn tet_volume(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    (b - a).cross(&(c - a)).dot(&(d - a)) / 6.0
}

/// Circumcenter of the tetrahedron `(a, b, c, d)`.
///
/// Returns `None` for degenerate (near-coplanar) tetrahedra.
pub fn tet_circumcenter(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> Option<Point3<f64>> {
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;

    let m = Matrix3::from_rows(&[ab.transpose(), ac.transpose(), ad.transpose()]);
    let rhs = Vector3::new(
        ab.norm_squared() * 0.5,
        ac.norm_squared() * 0.5,
        ad.norm_squared() * 0.5,
    );

    let inv = m.try_inverse()?;
    let offset = inv * rhs;
    if !offset.iter().all(|x| x.is_finite()) {
        return None;
    }
    Some(a + offset)
}

/// Circumradius of the tetrahedron, or `f64::INFINITY` when degenerate.
pub fn tet_circumradius(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> f64 {
    match tet_circumcenter(a, b, c, d) {
        Some(center) => (center - a).norm(),
        None => f64::INFINITY,
    }
}

/// Radius-ratio quality of the tetrahedron `(a, b, c, d)`.
///
/// Defined as `3 * inradius / circumradius`, which is 1.0 for a regular
/// tetrahedron and approaches 0.0 for slivers. Returns 0.0 for degenerate
/// (zero-volume) tetrahedra.
pub fn tet_quality(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    let volume = tet_volume(a, b, c, d).abs();
    if volume < f64::MIN_POSITIVE {
        return 0.0;
    }

    let area = Triangle::new(*a, *c, *b).area()
        + Triangle::new(*a, *b, *d).area()
        + Triangle::new(*b, *c, *d).area()
        + Triangle::new(*a, *d, *c).area();
    if area < f64::MIN_POSITIVE {
        return 0.0;
    }

    let inradius = 3.0 * volume / area;
    let circumradius = tet_circumradius(a, b, c, d);
    if !circumradius.is_finite() || circumradius < f64::MIN_POSITIVE {
        return 0.0;
    }

    (3.0 * inradius / circumradius).clamp(0.0, 1.0)
}

/// Longest edge of the tetrahedron `(a, b, c, d)`.
pub fn tet_max_edge(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    let edges = [
        (b - a).norm(),
        (c - a).norm(),
        (d - a).norm(),
        (c - b).norm(),
        (d - b).norm(),
        (d - c).norm(),
    ];
    edges.iter().cloned().fold(0.0, f64::max)
}

/// Test whether the open segment `(p, q)` crosses the interior of triangle
/// `(a, b, c)`, using exact orientation tests only.
pub fn segment_crosses_triangle(
    p: &Point3<f64>,
    q: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> bool {
    let sp = orient(a, b, c, p);
    let sq = orient(a, b, c, q);
    // Endpoints must lie strictly on opposite sides of the triangle plane.
    if sp == 0.0 || sq == 0.0 || (sp > 0.0) == (sq > 0.0) {
        return false;
    }

    // The segment must pass strictly inside the three side planes.
    let s1 = orient(p, q, a, b);
    let s2 = orient(p, q, b, c);
    let s3 = orient(p, q, c, a);
    if s1 == 0.0 || s2 == 0.0 || s3 == 0.0 {
        return false;
    }
    (s1 > 0.0) == (s2 > 0.0) && (s2 > 0.0) == (s3 > 0.0)
}

/// A triangle with concrete vertex positions.
///
/// Winding is counter-clockwise when viewed from the side the normal
/// points toward.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Compute the (unnormalized) face normal via cross product.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Compute the unit face normal, or `None` for degenerate triangles.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len_sq = n.norm_squared();
        if len_sq > f64::EPSILON {
            Some(n / len_sq.sqrt())
        } else {
            None
        }
    }

    /// Area of the triangle.
    #[inline]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Centroid of the triangle.
    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::new(
            (self.v0.x + self.v1.x + self.v2.x) / 3.0,
            (self.v0.y + self.v1.y + self.v2.y) / 3.0,
            (self.v0.z + self.v1.z + self.v2.z) / 3.0,
        )
    }
}

/// A hexahedral cell primitive used as the structured mesher's domain.
///
/// Vertices must be supplied in a fixed winding order: the four "bottom"
/// vertices counter-clockwise about the local +w axis, then the four
/// corresponding "top" vertices in the same order. The primitive is
/// immutable once the 8th vertex has been added.
#[derive(Debug, Clone, Default)]
pub struct Hexahedron {
    vertices: Vec<Point3<f64>>,
}

impl Hexahedron {
    /// Create an empty hexahedron awaiting its 8 vertices.
    pub fn new() -> Self {
        Self {
            vertices: Vec::with_capacity(8),
        }
    }

    /// Create a hexahedron directly from its 8 corners.
    pub fn from_corners(corners: [Point3<f64>; 8]) -> Self {
        Self {
            vertices: corners.to_vec(),
        }
    }

    /// Create an axis-aligned box hexahedron from opposite corners.
    pub fn axis_aligned(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self::from_corners([
            Point3::new(min.x, min.y, min.z),
            Point3::new(max.x, min.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(min.x, max.y, min.z),
            Point3::new(min.x, min.y, max.z),
            Point3::new(max.x, min.y, max.z),
            Point3::new(max.x, max.y, max.z),
            Point3::new(min.x, max.y, max.z),
        ])
    }

    /// Add the next vertex in winding order.
    ///
    /// Fails with `InvalidTopology` if the hexahedron already has 8
    /// vertices; the primitive does not permit mutation once complete.
    pub fn add_vertex(&mut self, vertex: Point3<f64>) -> MeshResult<()> {
        if self.vertices.len() >= 8 {
            return Err(MeshError::InvalidTopology {
                details: "hexahedron already has 8 vertices".into(),
            });
        }
        self.vertices.push(vertex);
        Ok(())
    }

    /// Number of vertices supplied so far.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Whether all 8 vertices have been supplied.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.vertices.len() == 8
    }

    /// The 8 corners in winding order.
    ///
    /// Fails with `InvalidTopology` if fewer than 8 vertices were supplied.
    pub fn corners(&self) -> MeshResult<[Point3<f64>; 8]> {
        if !self.is_complete() {
            return Err(MeshError::InvalidTopology {
                details: format!(
                    "hexahedron has {} of 8 required vertices",
                    self.vertices.len()
                ),
            });
        }
        let mut corners = [Point3::origin(); 8];
        corners.copy_from_slice(&self.vertices);
        Ok(corners)
    }
}
