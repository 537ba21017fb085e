//! Delaunay-based tetrahedral meshing of a closed surface.
//!
//! The mesher runs in five phases: validate and weld the input surface
//! (quads are split into triangles on intake), insert its nodes into an
//! incremental Delaunay triangulation, recover the surface triangles as
//! triangulation faces, carve away everything outside the surface, and
//! refine the interior until the size and quality targets are met (or a
//! configured bound stops the process).
//!
//! The pipeline is deterministic: the same surface and parameters always
//! produce the same tetrahedral mesh.
//!
//! # Examples
//!
//! ```no_run
//! use nalgebra::Point3;
//! use volmesh::{extract_boundary, structured_mesh, Hexahedron, HexSplit};
//! use volmesh::tetmesher::{generate, TetMesherParams};
//!
//! let domain = Hexahedron::axis_aligned(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
//! let grid = structured_mesh(&domain, 8, 8, 8, HexSplit::Tetrahedra)?;
//! let surface = extract_boundary(&grid, 1e-3)?;
//!
//! let params = TetMesherParams::new(0.125, 0.1, 1e-3);
//! let result = generate(&surface, &params)?;
//! println!("{} tetrahedra", result.mesh.element_count());
//! # Ok::<(), volmesh::MeshError>(())
//! ```

mod recovery;
mod refine;
mod triangulation;

use hashbrown::HashMap;
use tracing::{debug, info};

use crate::error::{MeshError, MeshResult};
use crate::mesh::{weld_nodes, Element, ElementKind, Mesh};
use crate::tracing_ext::OperationTimer;

use triangulation::Triangulation;

/// Parameters controlling the tetrahedral mesher.
#[derive(Debug, Clone, Copy)]
pub struct TetMesherParams {
    /// Upper bound on the number of tetrahedra kept live in the working
    /// triangulation. Reaching it stops refinement; it is not an error.
    pub element_budget: usize,
    /// Target upper bound on tetrahedron edge length.
    pub max_element_size: f64,
    /// Minimum acceptable shape quality in `[0, 1)` (normalized radius
    /// ratio; 1 is the regular tetrahedron).
    pub quality_threshold: f64,
    /// Geometric tolerance for node welding and duplicate rejection.
    pub tolerance: f64,
    /// Maximum boundary recovery sweeps before giving up.
    pub max_recovery_attempts: usize,
    /// Maximum refinement passes.
    pub max_refine_passes: usize,
}

impl Default for TetMesherParams {
    fn default() -> Self {
        Self {
            element_budget: 100_000,
            max_element_size: f64::INFINITY,
            quality_threshold: 0.0,
            tolerance: 1e-6,
            max_recovery_attempts: 10,
            max_refine_passes: 8,
        }
    }
}

impl TetMesherParams {
    /// Parameters with the given size target, quality threshold and
    /// tolerance, and default bounds otherwise.
    pub fn new(max_element_size: f64, quality_threshold: f64, tolerance: f64) -> Self {
        Self {
            max_element_size,
            quality_threshold,
            tolerance,
            ..Self::default()
        }
    }

    fn validate(&self) -> MeshResult<()> {
        if self.element_budget == 0 {
            return Err(MeshError::invalid_argument(
                "element_budget",
                "must be at least 1",
            ));
        }
        if !(self.max_element_size > 0.0) {
            return Err(MeshError::invalid_argument(
                "max_element_size",
                format!("must be positive, got {}", self.max_element_size),
            ));
        }
        if !(0.0..1.0).contains(&self.quality_threshold) {
            return Err(MeshError::invalid_argument(
                "quality_threshold",
                format!("must be in [0, 1), got {}", self.quality_threshold),
            ));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(MeshError::invalid_argument(
                "tolerance",
                format!("must be positive and finite, got {}", self.tolerance),
            ));
        }
        if self.max_recovery_attempts == 0 {
            return Err(MeshError::invalid_argument(
                "max_recovery_attempts",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Output of [`generate`]: the tetrahedral mesh plus run statistics.
#[derive(Debug)]
pub struct TetMesherResult {
    /// The generated tetrahedral mesh.
    pub mesh: Mesh,
    /// Number of welded surface nodes the mesh was seeded with.
    pub boundary_nodes: usize,
    /// Points inserted by quality/size refinement.
    pub interior_points: usize,
    /// Constraint faces split during boundary recovery.
    pub steiner_splits: usize,
    /// Edge removal operations committed during boundary recovery.
    pub edge_removals: usize,
    /// Refinement passes executed.
    pub refine_passes: usize,
    /// Size/quality violations left when refinement stopped. Nonzero means
    /// a bound (element budget or pass limit) was reached first.
    pub violations_remaining: usize,
}

/// Generate a tetrahedral mesh of the volume enclosed by a closed surface.
///
/// The surface must consist of triangles and/or quads, be closed and
/// manifold within `params.tolerance`, and enclose a positive volume
/// (outward winding). Quads are split into two triangles along a fixed
/// diagonal on intake, so reruns stay identical. Boundary recovery may add
/// Steiner points on the surface; those points always lie on the input
/// faces, so the output boundary is geometrically identical to the input
/// surface.
///
/// # Errors
///
/// - [`MeshError::InvalidArgument`] for out-of-range parameters or an
///   empty surface.
/// - [`MeshError::InvalidTopology`] if the surface contains volume
///   elements.
/// - [`MeshError::OpenSurface`] / [`MeshError::NonManifoldMesh`] if the
///   surface does not bound a volume.
/// - [`MeshError::DegenerateInput`] for inverted or zero-volume surfaces.
/// - [`MeshError::BoundaryRecovery`] if conformity cannot be reached
///   within `params.max_recovery_attempts`.
pub fn generate(surface: &Mesh, params: &TetMesherParams) -> MeshResult<TetMesherResult> {
    params.validate()?;
    let _timer = OperationTimer::new("tetrahedral meshing");

    if surface.is_empty() {
        return Err(MeshError::invalid_argument(
            "surface",
            "surface mesh has no elements",
        ));
    }
    if let Some(element) = surface
        .elements()
        .iter()
        .find(|e| e.kind().dimension() != 2)
    {
        return Err(MeshError::InvalidTopology {
            details: format!(
                "tetrahedral meshing requires a surface of triangles or quads, found a {}",
                element.kind().name()
            ),
        });
    }

    let topology = crate::adjacency::SurfaceTopology::build(surface, params.tolerance)?;
    topology.ensure_closed()?;

    let enclosed = surface.enclosed_volume();
    if enclosed <= 0.0 {
        return Err(MeshError::DegenerateInput {
            details: format!(
                "surface encloses non-positive volume {enclosed}; it is inverted or flat"
            ),
        });
    }

    let (points, remap) = weld_nodes(surface.nodes(), params.tolerance);
    let boundary_nodes = points.len();
    let mut constraints: Vec<[u32; 3]> = Vec::with_capacity(2 * surface.element_count());
    for element in surface.elements() {
        let nodes = element.nodes();
        let triangles: &[[usize; 3]] = match element.kind() {
            ElementKind::Triangle => &[[0, 1, 2]],
            _ => &[[0, 1, 2], [0, 2, 3]],
        };
        for triangle in triangles {
            let face = [
                remap[nodes[triangle[0]] as usize],
                remap[nodes[triangle[1]] as usize],
                remap[nodes[triangle[2]] as usize],
            ];
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                return Err(MeshError::DegenerateInput {
                    details: "a surface face collapsed under the welding tolerance".into(),
                });
            }
            constraints.push(face);
        }
    }

    debug!(
        target: "volmesh::tetmesher",
        boundary_nodes,
        constraint_faces = constraints.len(),
        enclosed_volume = enclosed,
        "seeding triangulation"
    );

    let mut triangulation = Triangulation::new(points);
    for id in 0..boundary_nodes as u32 {
        triangulation.insert(id)?;
    }

    let recovery_stats =
        recovery::recover_boundary(&mut triangulation, &mut constraints, params.max_recovery_attempts)?;
    let refine_outcome = refine::refine(&mut triangulation, &mut constraints, params)?;

    let keys = refine::constraint_keys(&constraints);
    let interior = refine::interior_tets(&triangulation, &keys)?;
    if interior.is_empty() {
        return Err(MeshError::DegenerateInput {
            details: "the surface encloses no tetrahedra".into(),
        });
    }

    let mut mesh = Mesh::with_capacity(triangulation.point_count(), interior.len());
    let mut local: HashMap<u32, u32> = HashMap::with_capacity(triangulation.point_count());
    for &id in &interior {
        let mut nodes = [0u32; 4];
        for (slot, &vertex) in triangulation.tet(id).vertices.iter().enumerate() {
            let node = *local
                .entry(vertex)
                .or_insert_with(|| mesh.add_node(*triangulation.point(vertex)));
            nodes[slot] = node;
        }
        mesh.add_element(Element::tetrahedron(nodes))?;
    }
    mesh.set_source(surface.id());

    info!(
        target: "volmesh::tetmesher",
        tetrahedra = mesh.element_count(),
        nodes = mesh.node_count(),
        edge_removals = recovery_stats.edge_removals,
        steiner_splits = recovery_stats.steiner_splits,
        refine_passes = refine_outcome.passes,
        violations_remaining = refine_outcome.violations_remaining,
        "tetrahedral mesh generated"
    );

    Ok(TetMesherResult {
        mesh,
        boundary_nodes,
        interior_points: refine_outcome.inserted,
        steiner_splits: recovery_stats.steiner_splits,
        edge_removals: recovery_stats.edge_removals,
        refine_passes: refine_outcome.passes,
        violations_remaining: refine_outcome.violations_remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::extract_boundary;
    use crate::geometry::Hexahedron;
    use crate::hexmesher::{structured_mesh, HexSplit};
    use nalgebra::Point3;

    fn unit_tet_surface() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_node(Point3::new(0.0, 0.0, 0.0));
        mesh.add_node(Point3::new(1.0, 0.0, 0.0));
        mesh.add_node(Point3::new(0.0, 1.0, 0.0));
        mesh.add_node(Point3::new(0.0, 0.0, 1.0));
        // Outward-wound faces of the corner tetrahedron.
        mesh.add_element(Element::triangle([0, 2, 1])).unwrap();
        mesh.add_element(Element::triangle([0, 1, 3])).unwrap();
        mesh.add_element(Element::triangle([1, 2, 3])).unwrap();
        mesh.add_element(Element::triangle([0, 3, 2])).unwrap();
        mesh
    }

    fn box_surface(divisions: usize) -> Mesh {
        let domain =
            Hexahedron::axis_aligned(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let grid = structured_mesh(
            &domain,
            divisions,
            divisions,
            divisions,
            HexSplit::Tetrahedra,
        )
        .unwrap();
        extract_boundary(&grid, 1e-6).unwrap()
    }

    #[test]
    fn test_single_tetrahedron_domain() {
        let surface = unit_tet_surface();
        let result = generate(&surface, &TetMesherParams::default()).unwrap();
        assert!(result.mesh.element_count() >= 1);
        assert!(
            (result.mesh.volume() - 1.0 / 6.0).abs() < 1e-9,
            "meshed volume {} must match the domain",
            result.mesh.volume()
        );
        assert_eq!(result.boundary_nodes, 4);
        assert_eq!(result.violations_remaining, 0);
    }

    #[test]
    fn test_box_volume_is_conserved() {
        let surface = box_surface(2);
        let result = generate(&surface, &TetMesherParams::default()).unwrap();
        assert!(
            (result.mesh.volume() - 1.0).abs() < 1e-9,
            "meshed volume {} must equal the box volume",
            result.mesh.volume()
        );
        // Every tetrahedron is stored positively oriented, so the volume
        // sum above only balances if none are inverted.
        let boundary = extract_boundary(&result.mesh, 1e-6).unwrap();
        assert!((boundary.enclosed_volume() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_nodes_lie_on_input_surface() {
        let surface = box_surface(2);
        let result = generate(&surface, &TetMesherParams::default()).unwrap();
        let boundary = extract_boundary(&result.mesh, 1e-6).unwrap();
        for node in boundary.nodes() {
            let on_box = [node.x, node.y, node.z]
                .iter()
                .any(|&c| c.abs() < 1e-9 || (c - 1.0).abs() < 1e-9);
            assert!(on_box, "boundary node {:?} must lie on the box surface", node);
        }
    }

    #[test]
    fn test_refinement_reduces_element_size() {
        let surface = unit_tet_surface();
        let params = TetMesherParams {
            max_element_size: 0.6,
            max_refine_passes: 16,
            ..TetMesherParams::default()
        };
        let result = generate(&surface, &params).unwrap();
        assert!((result.mesh.volume() - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_surface_is_rejected() {
        let mut mesh = Mesh::new();
        mesh.add_node(Point3::new(0.0, 0.0, 0.0));
        mesh.add_node(Point3::new(1.0, 0.0, 0.0));
        mesh.add_node(Point3::new(0.0, 1.0, 0.0));
        mesh.add_node(Point3::new(0.0, 0.0, 1.0));
        mesh.add_element(Element::triangle([0, 2, 1])).unwrap();
        mesh.add_element(Element::triangle([0, 1, 3])).unwrap();
        let err = generate(&mesh, &TetMesherParams::default()).unwrap_err();
        assert!(matches!(err, MeshError::OpenSurface { .. }));
    }

    #[test]
    fn test_inverted_surface_is_rejected() {
        let surface = unit_tet_surface();
        let mut inverted = Mesh::new();
        for node in surface.nodes() {
            inverted.add_node(*node);
        }
        for element in surface.elements() {
            let n = element.nodes();
            inverted
                .add_element(Element::triangle([n[0], n[2], n[1]]))
                .unwrap();
        }
        let err = generate(&inverted, &TetMesherParams::default()).unwrap_err();
        assert!(matches!(err, MeshError::DegenerateInput { .. }));
    }

    #[test]
    fn test_volume_elements_are_rejected() {
        let mut mesh = Mesh::new();
        mesh.add_node(Point3::new(0.0, 0.0, 0.0));
        mesh.add_node(Point3::new(1.0, 0.0, 0.0));
        mesh.add_node(Point3::new(0.0, 1.0, 0.0));
        mesh.add_node(Point3::new(0.0, 0.0, 1.0));
        mesh.add_element(Element::tetrahedron([0, 1, 2, 3])).unwrap();
        let err = generate(&mesh, &TetMesherParams::default()).unwrap_err();
        assert!(matches!(err, MeshError::InvalidTopology { .. }));
    }

    #[test]
    fn test_quad_surface_is_meshed() {
        // The quad boundary of a structured hex grid, fed in directly.
        let domain =
            Hexahedron::axis_aligned(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let grid = structured_mesh(&domain, 2, 2, 2, HexSplit::Hexahedra).unwrap();
        let surface = extract_boundary(&grid, 1e-6).unwrap();
        assert_eq!(surface.count_kind(crate::ElementKind::Quad), 24);

        let result = generate(&surface, &TetMesherParams::default()).unwrap();
        assert!(
            (result.mesh.volume() - 1.0).abs() < 1e-9,
            "meshed volume {} must equal the box volume",
            result.mesh.volume()
        );
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let surface = unit_tet_surface();
        for params in [
            TetMesherParams {
                element_budget: 0,
                ..TetMesherParams::default()
            },
            TetMesherParams {
                max_element_size: 0.0,
                ..TetMesherParams::default()
            },
            TetMesherParams {
                quality_threshold: 1.0,
                ..TetMesherParams::default()
            },
            TetMesherParams {
                tolerance: 0.0,
                ..TetMesherParams::default()
            },
        ] {
            let err = generate(&surface, &params).unwrap_err();
            assert!(matches!(err, MeshError::InvalidArgument { .. }));
        }
    }

    #[test]
    fn test_deterministic_output() {
        let surface = box_surface(2);
        let params = TetMesherParams::default();
        let first = generate(&surface, &params).unwrap();
        let second = generate(&surface, &params).unwrap();
        assert_eq!(first.mesh.node_count(), second.mesh.node_count());
        assert_eq!(first.mesh.element_count(), second.mesh.element_count());
        for (a, b) in first.mesh.nodes().iter().zip(second.mesh.nodes()) {
            assert_eq!(a, b);
        }
        for (a, b) in first.mesh.elements().iter().zip(second.mesh.elements()) {
            assert_eq!(a.nodes(), b.nodes());
        }
    }

    #[test]
    fn test_result_records_provenance() {
        let surface = unit_tet_surface();
        let result = generate(&surface, &TetMesherParams::default()).unwrap();
        assert_eq!(result.mesh.source(), Some(surface.id()));
    }
}
