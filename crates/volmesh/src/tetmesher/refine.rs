//! Interior carving and quality refinement.
//!
//! Once the triangulation conforms to the boundary, the constraint surface
//! separates the domain interior from the super-tetrahedron exterior. The
//! exterior is flood-filled from the tetrahedra touching the super vertices
//! without crossing constraint faces; everything unreached is interior.
//! Refinement then inserts circumcenters of interior tetrahedra that are
//! too large or too badly shaped, re-establishing boundary conformity after
//! each pass, until the violations are gone or the configured bounds are
//! reached.

use hashbrown::HashSet;
use nalgebra::Point3;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{tet_circumcenter, tet_max_edge, tet_quality};

use super::recovery;
use super::triangulation::{Triangulation, INVALID};
use super::TetMesherParams;

const MAX_INSERTIONS_PER_PASS: usize = 256;

pub(crate) fn constraint_keys(constraints: &[[u32; 3]]) -> HashSet<[u32; 3]> {
    constraints
        .iter()
        .map(|f| {
            let mut key = *f;
            key.sort_unstable();
            key
        })
        .collect()
}

/// Ids of the live tetrahedra inside the constraint surface, in index
/// order. Fails if the flood fill leaks through the boundary, which means
/// the constraint surface does not separate the domain.
pub(crate) fn interior_tets(
    triangulation: &Triangulation,
    constraints: &HashSet<[u32; 3]>,
) -> MeshResult<Vec<u32>> {
    let mut outside = vec![false; triangulation.slot_count()];
    let mut queue: Vec<u32> = Vec::new();
    for id in triangulation.alive_tets() {
        if triangulation
            .tet(id)
            .vertices
            .iter()
            .any(|&v| triangulation.is_super_vertex(v))
        {
            outside[id as usize] = true;
            queue.push(id);
        }
    }

    while let Some(id) = queue.pop() {
        for i in 0..4 {
            let neighbor = triangulation.tet(id).neighbors[i];
            if neighbor == INVALID || outside[neighbor as usize] {
                continue;
            }
            if constraints.contains(&triangulation.tet(id).face_key(i)) {
                continue;
            }
            outside[neighbor as usize] = true;
            queue.push(neighbor);
        }
    }

    let interior: Vec<u32> = triangulation
        .alive_tets()
        .filter(|&id| !outside[id as usize])
        .collect();

    for &id in &interior {
        if triangulation
            .tet(id)
            .vertices
            .iter()
            .any(|&v| triangulation.is_super_vertex(v))
        {
            return Err(MeshError::DegenerateInput {
                details: "boundary surface does not separate interior from exterior".into(),
            });
        }
    }
    Ok(interior)
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RefineOutcome {
    pub passes: usize,
    pub inserted: usize,
    pub violations_remaining: usize,
}

struct Candidate {
    tet: u32,
    snapshot: [u32; 4],
    circumcenter: Point3<f64>,
}

/// Measure size and quality violations over the interior tetrahedra.
///
/// The per-tetrahedron measurements are independent and run in parallel;
/// the result keeps index order so the subsequent insertions stay
/// deterministic.
fn measure_violations(
    triangulation: &Triangulation,
    interior: &[u32],
    params: &TetMesherParams,
) -> Vec<Candidate> {
    interior
        .par_iter()
        .filter_map(|&id| {
            let vertices = triangulation.tet(id).vertices;
            let [a, b, c, d] = vertices;
            let (pa, pb, pc, pd) = (
                triangulation.point(a),
                triangulation.point(b),
                triangulation.point(c),
                triangulation.point(d),
            );
            let oversized = tet_max_edge(pa, pb, pc, pd) > params.max_element_size;
            let misshapen = tet_quality(pa, pb, pc, pd) < params.quality_threshold;
            if !oversized && !misshapen {
                return None;
            }
            tet_circumcenter(pa, pb, pc, pd).map(|circumcenter| Candidate {
                tet: id,
                snapshot: vertices,
                circumcenter,
            })
        })
        .collect()
}

/// Insert circumcenters of violating interior tetrahedra until the mesh
/// meets the size and quality targets or a configured bound (element
/// budget, pass limit) stops the process. Running out of budget is normal
/// termination; the remaining violation count is reported in the outcome.
pub(crate) fn refine(
    triangulation: &mut Triangulation,
    constraints: &mut Vec<[u32; 3]>,
    params: &TetMesherParams,
) -> MeshResult<RefineOutcome> {
    let mut outcome = RefineOutcome::default();

    loop {
        let keys = constraint_keys(constraints);
        let interior = interior_tets(triangulation, &keys)?;
        let candidates = measure_violations(triangulation, &interior, params);
        outcome.violations_remaining = candidates.len();

        if candidates.is_empty()
            || outcome.passes >= params.max_refine_passes
            || triangulation.alive_count() >= params.element_budget
        {
            break;
        }
        outcome.passes += 1;

        let mut inserted_this_pass = 0;
        for candidate in candidates {
            if triangulation.alive_count() >= params.element_budget
                || inserted_this_pass >= MAX_INSERTIONS_PER_PASS
            {
                break;
            }
            // Earlier insertions may have retriangulated this slot.
            if !triangulation.is_alive(candidate.tet)
                || triangulation.tet(candidate.tet).vertices != candidate.snapshot
            {
                continue;
            }
            let Ok(located) = triangulation.locate(&candidate.circumcenter) else {
                continue;
            };
            let located_tet = triangulation.tet(located);
            if located_tet
                .vertices
                .iter()
                .any(|&v| triangulation.is_super_vertex(v))
            {
                continue;
            }
            let too_close = located_tet.vertices.iter().any(|&v| {
                (triangulation.point(v) - candidate.circumcenter).norm() < params.tolerance
            });
            if too_close {
                continue;
            }
            let point_id = triangulation.add_point(candidate.circumcenter);
            triangulation.insert(point_id)?;
            inserted_this_pass += 1;
            outcome.inserted += 1;
        }

        debug!(
            target: "volmesh::tetmesher",
            pass = outcome.passes,
            inserted = inserted_this_pass,
            tets = triangulation.alive_count(),
            "refinement pass"
        );
        if inserted_this_pass == 0 {
            break;
        }

        // Insertions near the boundary can knock out constraint faces.
        recovery::recover_boundary(triangulation, constraints, params.max_recovery_attempts)?;
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::tet_volume;

    fn triangulate(points: Vec<Point3<f64>>) -> Triangulation {
        let count = points.len();
        let mut triangulation = Triangulation::new(points);
        for id in 0..count as u32 {
            triangulation.insert(id).unwrap();
        }
        triangulation
    }

    fn unit_tet_setup() -> (Triangulation, Vec<[u32; 3]>) {
        let triangulation = triangulate(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]);
        let constraints = vec![[0u32, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
        (triangulation, constraints)
    }

    #[test]
    fn test_interior_is_the_single_tet() {
        let (triangulation, constraints) = unit_tet_setup();
        let keys = constraint_keys(&constraints);
        let interior = interior_tets(&triangulation, &keys).unwrap();
        assert_eq!(interior.len(), 1);
        let [a, b, c, d] = triangulation.tet(interior[0]).vertices;
        let volume = tet_volume(
            triangulation.point(a),
            triangulation.point(b),
            triangulation.point(c),
            triangulation.point(d),
        );
        assert!((volume - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_interior_without_constraints() {
        let (triangulation, _) = unit_tet_setup();
        let keys = HashSet::new();
        let interior = interior_tets(&triangulation, &keys).unwrap();
        assert!(interior.is_empty(), "flood fill must reach everything");
    }

    fn interior_volume(triangulation: &Triangulation, constraints: &[[u32; 3]]) -> f64 {
        let keys = constraint_keys(constraints);
        interior_tets(triangulation, &keys)
            .unwrap()
            .iter()
            .map(|&id| {
                let [a, b, c, d] = triangulation.tet(id).vertices;
                tet_volume(
                    triangulation.point(a),
                    triangulation.point(b),
                    triangulation.point(c),
                    triangulation.point(d),
                )
            })
            .sum()
    }

    #[test]
    fn test_refine_conserves_cube_volume() {
        let mut points = Vec::new();
        for z in [0.0, 1.0] {
            for y in [0.0, 1.0] {
                for x in [0.0, 1.0] {
                    points.push(Point3::new(x, y, z));
                }
            }
        }
        let mut triangulation = triangulate(points);
        let mut constraints: Vec<[u32; 3]> = vec![
            [0, 2, 3], [0, 3, 1],
            [4, 5, 7], [4, 7, 6],
            [0, 1, 5], [0, 5, 4],
            [2, 6, 7], [2, 7, 3],
            [0, 4, 6], [0, 6, 2],
            [1, 3, 7], [1, 7, 5],
        ];
        recovery::recover_boundary(&mut triangulation, &mut constraints, 10).unwrap();

        let params = TetMesherParams {
            element_budget: 10_000,
            max_element_size: 0.9,
            quality_threshold: 0.0,
            tolerance: 1e-6,
            max_recovery_attempts: 10,
            max_refine_passes: 12,
        };
        let before = interior_volume(&triangulation, &constraints);
        assert!((before - 1.0).abs() < 1e-9);

        let outcome = refine(&mut triangulation, &mut constraints, &params).unwrap();
        assert!(outcome.inserted > 0, "face diagonals exceed the size target");

        let after = interior_volume(&triangulation, &constraints);
        assert!((after - 1.0).abs() < 1e-9, "refinement must conserve volume");
    }

    #[test]
    fn test_budget_exhaustion_terminates_normally() {
        let (mut triangulation, mut constraints) = unit_tet_setup();
        let params = TetMesherParams {
            element_budget: 4,
            max_element_size: 0.05,
            quality_threshold: 0.0,
            tolerance: 1e-6,
            max_recovery_attempts: 10,
            max_refine_passes: 12,
        };
        let outcome = refine(&mut triangulation, &mut constraints, &params).unwrap();
        assert!(outcome.violations_remaining > 0);
    }
}
