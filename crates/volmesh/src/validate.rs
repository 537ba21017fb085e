//! Mesh validation and reporting.

use nalgebra::Point3;
use tracing::{debug, info, warn};

use crate::adjacency::{MeshAdjacency, SurfaceTopology};
use crate::mesh::{ElementKind, Mesh};

/// Validation report for a mesh.
#[derive(Debug, Clone)]
pub struct MeshReport {
    /// Total node count.
    pub node_count: usize,

    /// Total element count.
    pub element_count: usize,

    /// Element counts by kind, in declaration order of [`ElementKind`].
    pub kind_counts: [(ElementKind, usize); 4],

    /// Highest element dimension present (0 for an empty mesh).
    pub dimension: usize,

    /// Bounding box as (min_corner, max_corner).
    pub bounds: Option<(Point3<f64>, Point3<f64>)>,

    /// Dimensions (x, y, z).
    pub dimensions: Option<(f64, f64, f64)>,

    /// Summed volume of the volume elements.
    pub volume: f64,

    /// Summed area of the surface elements.
    pub surface_area: f64,

    /// Number of boundary faces (faces used by exactly one volume element).
    /// Zero for meshes without volume elements.
    pub boundary_face_count: usize,

    /// For surface meshes: number of edges used by exactly one face.
    pub open_edge_count: usize,

    /// For surface meshes: number of edges used by more than two faces.
    pub non_manifold_edge_count: usize,

    /// Number of NaN or infinite node coordinates.
    pub invalid_coordinate_count: usize,
}

impl MeshReport {
    /// Check if the mesh passes basic validity checks.
    pub fn is_valid(&self) -> bool {
        self.node_count > 0 && self.element_count > 0 && self.invalid_coordinate_count == 0
    }

    /// For surface meshes: whether the surface bounds a volume.
    pub fn is_closed_surface(&self) -> bool {
        self.dimension == 2 && self.open_edge_count == 0 && self.non_manifold_edge_count == 0
    }
}

impl std::fmt::Display for MeshReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mesh Report:")?;
        writeln!(f, "  Nodes: {}", self.node_count)?;
        writeln!(f, "  Elements: {}", self.element_count)?;
        for (kind, count) in &self.kind_counts {
            if *count > 0 {
                writeln!(f, "    {}: {}", kind.name(), count)?;
            }
        }

        if let Some((min, max)) = &self.bounds {
            writeln!(
                f,
                "  Bounds: [{:.1}, {:.1}, {:.1}] to [{:.1}, {:.1}, {:.1}]",
                min.x, min.y, min.z, max.x, max.y, max.z
            )?;
        }
        if let Some((dx, dy, dz)) = &self.dimensions {
            writeln!(f, "  Dimensions: {:.1} x {:.1} x {:.1}", dx, dy, dz)?;
        }

        match self.dimension {
            3 => {
                writeln!(f, "  Volume: {:.4}", self.volume)?;
                writeln!(f, "  Boundary Faces: {}", self.boundary_face_count)?;
            }
            2 => {
                writeln!(f, "  Surface Area: {:.4}", self.surface_area)?;
                writeln!(
                    f,
                    "  Closed: {} (open edges: {}, non-manifold edges: {})",
                    if self.is_closed_surface() { "yes" } else { "NO" },
                    self.open_edge_count,
                    self.non_manifold_edge_count
                )?;
            }
            _ => {}
        }

        if self.invalid_coordinate_count > 0 {
            writeln!(
                f,
                "  Invalid Coordinates: {}",
                self.invalid_coordinate_count
            )?;
        }
        Ok(())
    }
}

/// Validate a mesh and return a report.
///
/// The report covers both surface and volume meshes: for a surface mesh the
/// edge topology is checked for closure, for a volume mesh the boundary
/// face count is reported. Problems are logged as warnings but never fail
/// the call.
pub fn validate_mesh(mesh: &Mesh, tolerance: f64) -> MeshReport {
    let bounds = mesh.bounds();
    let dimensions = bounds.map(|(min, max)| (max.x - min.x, max.y - min.y, max.z - min.z));

    let kind_counts = [
        (ElementKind::Triangle, mesh.count_kind(ElementKind::Triangle)),
        (ElementKind::Quad, mesh.count_kind(ElementKind::Quad)),
        (
            ElementKind::Tetrahedron,
            mesh.count_kind(ElementKind::Tetrahedron),
        ),
        (
            ElementKind::Hexahedron,
            mesh.count_kind(ElementKind::Hexahedron),
        ),
    ];
    let dimension = mesh
        .elements()
        .iter()
        .map(|e| e.kind().dimension())
        .max()
        .unwrap_or(0);

    let invalid_coordinate_count = mesh
        .nodes()
        .iter()
        .flat_map(|p| [p.x, p.y, p.z])
        .filter(|c| !c.is_finite())
        .count();

    let mut boundary_face_count = 0;
    let mut open_edge_count = 0;
    let mut non_manifold_edge_count = 0;
    match dimension {
        3 => {
            let adjacency = MeshAdjacency::build(mesh);
            boundary_face_count = adjacency
                .iter()
                .filter(|(_, uses)| uses.len() == 1)
                .count();
        }
        2 => match SurfaceTopology::build(mesh, tolerance) {
            Ok(topology) => {
                open_edge_count = topology.boundary_edge_count();
                non_manifold_edge_count = topology.non_manifold_edge_count();
            }
            Err(err) => {
                warn!(target: "volmesh::validate", %err, "surface topology check failed");
            }
        },
        _ => {}
    }

    let report = MeshReport {
        node_count: mesh.node_count(),
        element_count: mesh.element_count(),
        kind_counts,
        dimension,
        bounds,
        dimensions,
        volume: mesh.volume(),
        surface_area: mesh.surface_area(),
        boundary_face_count,
        open_edge_count,
        non_manifold_edge_count,
        invalid_coordinate_count,
    };

    if report.invalid_coordinate_count > 0 {
        warn!(
            target: "volmesh::validate",
            count = report.invalid_coordinate_count,
            "mesh contains NaN or infinite coordinates"
        );
    }
    if report.dimension == 2 && !report.is_closed_surface() {
        warn!(
            target: "volmesh::validate",
            open_edges = report.open_edge_count,
            non_manifold_edges = report.non_manifold_edge_count,
            "surface does not bound a volume"
        );
    }
    debug!(target: "volmesh::validate", "{}", report);

    report
}

/// Log a one-line summary of a validation report.
pub fn log_validation(report: &MeshReport) {
    info!(
        target: "volmesh::validate",
        nodes = report.node_count,
        elements = report.element_count,
        dimension = report.dimension,
        volume = report.volume,
        "mesh validated"
    );
    if report.dimension == 2 {
        if report.is_closed_surface() {
            info!(target: "volmesh::validate", "surface is closed and manifold");
        } else {
            warn!(
                target: "volmesh::validate",
                open_edges = report.open_edge_count,
                "surface is open"
            );
        }
    }
}
