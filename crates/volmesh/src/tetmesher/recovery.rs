//! Boundary recovery for the constrained tetrahedralization.
//!
//! After the boundary nodes are inserted, some constraint faces may be
//! absent from the triangulation (typically because a quad diagonal flipped
//! or an edge pierces the face). Recovery works in two tiers: local edge
//! removal that re-tetrahedralizes the ring around an offending edge with a
//! fan anchored at a constraint vertex, and a Steiner fallback that splits
//! the constraint face at its centroid. Every local operation is committed
//! only if all replacement tetrahedra are strictly positive.

use nalgebra::Point3;
use tracing::debug;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{orient, segment_crosses_triangle};

use super::triangulation::Triangulation;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RecoveryStats {
    pub edge_removals: usize,
    pub steiner_splits: usize,
}

#[inline]
fn sorted_key(face: &[u32; 3]) -> [u32; 3] {
    let mut key = *face;
    key.sort_unstable();
    key
}

fn face_is_present(triangulation: &Triangulation, face: &[u32; 3]) -> bool {
    triangulation.face_set().contains(&sorted_key(face))
}

/// Approximate proximity test between segments `ab` and `cd`, used only to
/// pick edge-removal candidates; incorrect picks are rejected later by the
/// exact validity checks.
fn segments_approx_cross(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> bool {
    let d1 = b - a;
    let d2 = d - c;
    let r = a - c;
    let la = d1.norm_squared();
    let lb = d2.norm_squared();
    if la == 0.0 || lb == 0.0 {
        return false;
    }
    let f = d2.dot(&r);
    let e = d1.dot(&r);
    let k = d1.dot(&d2);
    let denom = la * lb - k * k;
    let (s, t) = if denom.abs() < 1e-30 {
        return false;
    } else {
        (
            (k * f - e * lb) / denom,
            (la * f - k * e) / denom,
        )
    };
    const MARGIN: f64 = 1e-6;
    if !(MARGIN..=1.0 - MARGIN).contains(&s) || !(MARGIN..=1.0 - MARGIN).contains(&t) {
        return false;
    }
    let p1 = a + d1 * s;
    let p2 = c + d2 * t;
    let scale = la.sqrt().max(lb.sqrt());
    (p1 - p2).norm() < 1e-9 * scale.max(1.0)
}

/// Find an edge of the current triangulation whose segment crosses the
/// interior of the given constraint triangle.
fn find_edge_piercing_face(triangulation: &Triangulation, face: &[u32; 3]) -> Option<(u32, u32)> {
    let a = *triangulation.point(face[0]);
    let b = *triangulation.point(face[1]);
    let c = *triangulation.point(face[2]);
    for id in triangulation.alive_tets() {
        let v = triangulation.tet(id).vertices;
        for i in 0..4 {
            for j in (i + 1)..4 {
                let (p, q) = (v[i], v[j]);
                if face.contains(&p) || face.contains(&q) {
                    continue;
                }
                if segment_crosses_triangle(
                    triangulation.point(p),
                    triangulation.point(q),
                    &a,
                    &b,
                    &c,
                ) {
                    return Some((p, q));
                }
            }
        }
    }
    None
}

/// Find an edge of the current triangulation that blocks the missing
/// constraint edge `(a, b)` by crossing its segment.
fn find_edge_blocking_edge(triangulation: &Triangulation, a: u32, b: u32) -> Option<(u32, u32)> {
    let pa = *triangulation.point(a);
    let pb = *triangulation.point(b);
    for id in triangulation.alive_tets() {
        let v = triangulation.tet(id).vertices;
        for i in 0..4 {
            for j in (i + 1)..4 {
                let (p, q) = (v[i], v[j]);
                if p == a || p == b || q == a || q == b {
                    continue;
                }
                if segments_approx_cross(&pa, &pb, triangulation.point(p), triangulation.point(q)) {
                    return Some((p, q));
                }
            }
        }
    }
    None
}

/// Remove edge `(a, b)` by re-tetrahedralizing its ring with a fan anchored
/// at `apex`, which must be a link vertex. Commits only when every
/// replacement tetrahedron is strictly positive and the removed edge's
/// endpoints lie strictly on opposite sides of every fan triangle.
fn try_remove_edge(triangulation: &mut Triangulation, a: u32, b: u32, apex: u32) -> bool {
    let Some((ring, mut link)) = triangulation.ring_around_edge(a, b) else {
        return false;
    };
    if ring.len() < 3 {
        return false;
    }
    let Some(pos) = link.iter().position(|&w| w == apex) else {
        return false;
    };
    link.rotate_left(pos);

    let pa = *triangulation.point(a);
    let pb = *triangulation.point(b);
    let p_apex = *triangulation.point(apex);

    let mut new_tets: Vec<[u32; 4]> = Vec::with_capacity(2 * (link.len() - 2));
    let mut side_b = 0.0f64;
    for i in 1..link.len() - 1 {
        let (u, v) = (link[i], link[i + 1]);
        let pu = *triangulation.point(u);
        let pv = *triangulation.point(v);
        let sa = orient(&p_apex, &pu, &pv, &pa);
        let sb = orient(&p_apex, &pu, &pv, &pb);
        if sa == 0.0 || sb == 0.0 || sa.signum() == sb.signum() {
            return false;
        }
        if side_b == 0.0 {
            side_b = sb.signum();
        } else if sb.signum() != side_b {
            return false;
        }
        if sb > 0.0 {
            new_tets.push([apex, u, v, b]);
            new_tets.push([apex, v, u, a]);
        } else {
            new_tets.push([apex, v, u, b]);
            new_tets.push([apex, u, v, a]);
        }
    }

    triangulation.replace_tets(&ring, &new_tets);
    true
}

/// Split the missing constraint edge `(a, b)` at its midpoint.
///
/// The midpoint lies on every edge that crosses `(a, b)`, so inserting it
/// absorbs the ring around the crossing edge and subdivides both segments
/// at once. Every constraint face sharing the edge is replaced by two
/// subfaces with the original winding.
fn split_constraint_edge(
    triangulation: &mut Triangulation,
    constraints: &mut Vec<[u32; 3]>,
    a: u32,
    b: u32,
) -> MeshResult<()> {
    let midpoint = nalgebra::center(triangulation.point(a), triangulation.point(b));
    let mid = triangulation.add_point(midpoint);
    triangulation.insert(mid)?;

    let mut subfaces: Vec<[u32; 3]> = Vec::new();
    constraints.retain(|face| {
        let along = (0..3).find(|&i| {
            let (u, v) = (face[i], face[(i + 1) % 3]);
            (u, v) == (a, b) || (u, v) == (b, a)
        });
        let Some(i) = along else {
            return true;
        };
        let (u, v, w) = (face[i], face[(i + 1) % 3], face[(i + 2) % 3]);
        subfaces.push([u, mid, w]);
        subfaces.push([mid, v, w]);
        false
    });
    constraints.extend(subfaces);
    Ok(())
}

/// Split a constraint face at its centroid, inserting the point into the
/// triangulation and replacing the face by its three subfaces in the
/// constraint list.
fn steiner_split(
    triangulation: &mut Triangulation,
    constraints: &mut Vec<[u32; 3]>,
    face: [u32; 3],
) -> MeshResult<()> {
    let centroid = Point3::from(
        (triangulation.point(face[0]).coords
            + triangulation.point(face[1]).coords
            + triangulation.point(face[2]).coords)
            / 3.0,
    );
    let mid = triangulation.add_point(centroid);
    triangulation.insert(mid)?;

    if let Some(pos) = constraints.iter().position(|f| *f == face) {
        constraints.swap_remove(pos);
    }
    constraints.push([face[0], face[1], mid]);
    constraints.push([face[1], face[2], mid]);
    constraints.push([face[2], face[0], mid]);
    Ok(())
}

/// Drive the triangulation toward boundary conformity.
///
/// Each attempt re-checks every constraint face. A face with a missing
/// constraint edge is recovered by removing the crossing edge, or, when no
/// removal is valid, by splitting the constraint edge at its midpoint. A
/// face whose edges all exist but whose interior is pierced gets the
/// piercing edge removed, with a centroid Steiner split as the last resort.
/// The constraint list is updated in place as splits refine it.
pub(crate) fn recover_boundary(
    triangulation: &mut Triangulation,
    constraints: &mut Vec<[u32; 3]>,
    max_attempts: usize,
) -> MeshResult<RecoveryStats> {
    let mut stats = RecoveryStats::default();

    for attempt in 0..max_attempts {
        let faces = triangulation.face_set();
        let missing: Vec<[u32; 3]> = constraints
            .iter()
            .copied()
            .filter(|f| !faces.contains(&sorted_key(f)))
            .collect();
        if missing.is_empty() {
            return Ok(stats);
        }
        debug!(
            target: "volmesh::tetmesher",
            attempt,
            missing = missing.len(),
            "boundary recovery pass"
        );

        for face in missing {
            // An earlier split in this pass may have replaced the face.
            if !constraints.contains(&face) || face_is_present(triangulation, &face) {
                continue;
            }

            let edges = triangulation.edge_set();
            let mut progressed = false;
            for (e0, e1) in [
                (face[0], face[1]),
                (face[1], face[2]),
                (face[2], face[0]),
            ] {
                let key = if e0 < e1 { (e0, e1) } else { (e1, e0) };
                if edges.contains(&key) {
                    continue;
                }
                let removed = find_edge_blocking_edge(triangulation, e0, e1)
                    .is_some_and(|(p, q)| {
                        try_remove_edge(triangulation, p, q, e0)
                            || try_remove_edge(triangulation, p, q, e1)
                    });
                if removed {
                    stats.edge_removals += 1;
                } else {
                    split_constraint_edge(triangulation, constraints, e0, e1)?;
                    stats.steiner_splits += 1;
                }
                progressed = true;
                break;
            }
            if progressed {
                continue;
            }

            if let Some((p, q)) = find_edge_piercing_face(triangulation, &face) {
                if face.iter().any(|&apex| try_remove_edge(triangulation, p, q, apex)) {
                    stats.edge_removals += 1;
                    continue;
                }
            }

            steiner_split(triangulation, constraints, face)?;
            stats.steiner_splits += 1;
        }
    }

    let faces = triangulation.face_set();
    let still_missing = constraints
        .iter()
        .filter(|f| !faces.contains(&sorted_key(f)))
        .count();
    if still_missing == 0 {
        Ok(stats)
    } else {
        Err(MeshError::BoundaryRecovery {
            missing_faces: still_missing,
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangulate(points: Vec<Point3<f64>>) -> Triangulation {
        let count = points.len();
        let mut triangulation = Triangulation::new(points);
        for id in 0..count as u32 {
            triangulation.insert(id).unwrap();
        }
        triangulation
    }

    #[test]
    fn test_recovery_noop_when_faces_exist() {
        let mut triangulation = triangulate(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]);
        let mut constraints = vec![[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
        let stats = recover_boundary(&mut triangulation, &mut constraints, 5).unwrap();
        assert_eq!(stats.edge_removals, 0);
        assert_eq!(stats.steiner_splits, 0);
    }

    #[test]
    fn test_recovers_both_quad_diagonals() {
        // A flat quad extruded by two off-plane points; constraints request
        // a specific diagonal of the quad, which the Delaunay triangulation
        // may not contain.
        let mut triangulation = triangulate(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
            Point3::new(0.5, 0.5, -1.0),
        ]);
        for diagonal_faces in [
            vec![[0u32, 1, 2], [0, 2, 3]],
            vec![[0u32, 1, 3], [1, 2, 3]],
        ] {
            let mut constraints = diagonal_faces.clone();
            recover_boundary(&mut triangulation, &mut constraints, 10).unwrap();
            let faces = triangulation.face_set();
            for face in &diagonal_faces {
                let mut key = *face;
                key.sort_unstable();
                assert!(faces.contains(&key), "face {:?} must be recovered", face);
            }
        }
    }

    #[test]
    fn test_constraint_edge_split_subdivides_sharing_faces() {
        let mut triangulation = triangulate(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
            Point3::new(0.5, 0.5, -1.0),
        ]);
        let mut constraints = vec![[0u32, 1, 2], [2, 3, 0]];
        split_constraint_edge(&mut triangulation, &mut constraints, 0, 2).unwrap();

        let mid = triangulation.point_count() as u32 - 1;
        assert_eq!(*triangulation.point(mid), Point3::new(0.5, 0.5, 0.0));
        assert_eq!(constraints.len(), 4);
        // Both faces sharing the edge split along it, winding preserved.
        assert!(constraints.contains(&[2, mid, 1]));
        assert!(constraints.contains(&[mid, 0, 1]));
        assert!(constraints.contains(&[0, mid, 3]));
        assert!(constraints.contains(&[mid, 2, 3]));
    }

    #[test]
    fn test_recovers_lattice_box_boundary() {
        // The extracted boundary of a 2x2x2 tet-split unit box: coplanar
        // cospherical lattice points whose surface diagonals the Delaunay
        // triangulation is free to flip.
        use crate::boundary::extract_boundary;
        use crate::geometry::Hexahedron;
        use crate::hexmesher::{structured_mesh, HexSplit};

        let domain =
            Hexahedron::axis_aligned(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let grid = structured_mesh(&domain, 2, 2, 2, HexSplit::Tetrahedra).unwrap();
        let surface = extract_boundary(&grid, 1e-6).unwrap();

        let mut triangulation = Triangulation::new(surface.nodes().to_vec());
        for id in 0..surface.node_count() as u32 {
            triangulation.insert(id).unwrap();
        }
        let mut constraints: Vec<[u32; 3]> = surface
            .elements()
            .iter()
            .map(|element| {
                let n = element.nodes();
                [n[0], n[1], n[2]]
            })
            .collect();

        recover_boundary(&mut triangulation, &mut constraints, 10).unwrap();

        let faces = triangulation.face_set();
        for face in &constraints {
            assert!(
                faces.contains(&sorted_key(face)),
                "constraint face {:?} must conform",
                face
            );
        }
    }

    #[test]
    fn test_segment_proximity_candidates() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 1.0, 0.0);
        let c = Point3::new(1.0, 0.0, 0.0);
        let d = Point3::new(0.0, 1.0, 0.0);
        assert!(segments_approx_cross(&a, &b, &c, &d));

        let e = Point3::new(2.0, 0.0, 0.0);
        let f = Point3::new(3.0, 1.0, 0.0);
        assert!(!segments_approx_cross(&a, &b, &e, &f));

        // Skew segments that pass at a distance.
        let g = Point3::new(0.0, 1.0, 0.5);
        let h = Point3::new(1.0, 0.0, 0.5);
        assert!(!segments_approx_cross(&a, &b, &g, &h));
    }
}
