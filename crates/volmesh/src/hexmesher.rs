//! Structured hexahedral meshing of a hexahedral domain.
//!
//! The mesher subdivides a [`Hexahedron`] into a regular `nu x nv x nw`
//! lattice of cells by trilinear interpolation of the 8 corners, and emits
//! either one hexahedral element per cell or the canonical 6-tetrahedron
//! split of each cell.

use nalgebra::Point3;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{tet_volume, Hexahedron};
use crate::mesh::{Element, Mesh};
use crate::tracing_ext::OperationTimer;

/// How lattice cells are turned into elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexSplit {
    /// One hexahedral element per lattice cell.
    Hexahedra,
    /// Six tetrahedra per lattice cell (Kuhn decomposition).
    Tetrahedra,
}

/// The Kuhn 6-tetrahedron decomposition of a hexahedral cell, in local
/// corner indices.
///
/// Every tetrahedron shares the cell's main diagonal (corner 0 to corner
/// 6). Because the diagonal of each shared lattice face then always runs
/// from the face's minimum corner to its maximum one, neighboring cells
/// agree on face diagonals and the decomposition is crack-free without any
/// parity alternation. Tetrahedra are listed in positive-volume order for
/// a right-handed cell.
pub const HEX_TO_TETS: [[usize; 4]; 6] = [
    [0, 1, 2, 6],
    [0, 5, 1, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 4, 5, 6],
    [0, 7, 4, 6],
];

#[inline]
fn trilinear(corners: &[Point3<f64>; 8], u: f64, v: f64, w: f64) -> Point3<f64> {
    let weights = [
        (1.0 - u) * (1.0 - v) * (1.0 - w),
        u * (1.0 - v) * (1.0 - w),
        u * v * (1.0 - w),
        (1.0 - u) * v * (1.0 - w),
        (1.0 - u) * (1.0 - v) * w,
        u * (1.0 - v) * w,
        u * v * w,
        (1.0 - u) * v * w,
    ];
    let mut p = Point3::origin();
    for (corner, weight) in corners.iter().zip(weights) {
        p.coords += corner.coords * weight;
    }
    p
}

fn check_subdivision(name: &'static str, value: usize) -> MeshResult<()> {
    if value < 1 {
        return Err(MeshError::invalid_argument(
            name,
            format!("subdivision count must be >= 1, got {}", value),
        ));
    }
    Ok(())
}

/// Generate a structured mesh of the given hexahedral domain.
///
/// `nu`, `nv`, `nw` are the subdivision counts along the three local axes;
/// each must be at least 1 or the call fails with `InvalidArgument` before
/// any mesh is constructed. The output has `(nu+1)(nv+1)(nw+1)` nodes and
/// `nu*nv*nw` hexahedra or `6*nu*nv*nw` tetrahedra depending on `split`.
pub fn structured_mesh(
    hexahedron: &Hexahedron,
    nu: usize,
    nv: usize,
    nw: usize,
    split: HexSplit,
) -> MeshResult<Mesh> {
    check_subdivision("nu", nu)?;
    check_subdivision("nv", nv)?;
    check_subdivision("nw", nw)?;
    let corners = hexahedron.corners()?;

    let _timer = OperationTimer::new("structured_mesh");

    let nx = nu + 1;
    let ny = nv + 1;
    let nz = nw + 1;
    let node_total = nx * ny * nz;

    // Lattice nodes, index-ordered (i fastest, then j, then k) so the
    // parallel evaluation collects into the same ordering a sequential
    // loop would produce.
    let nodes: Vec<Point3<f64>> = (0..node_total)
        .into_par_iter()
        .map(|index| {
            let i = index % nx;
            let j = (index / nx) % ny;
            let k = index / (nx * ny);
            trilinear(
                &corners,
                i as f64 / nu as f64,
                j as f64 / nv as f64,
                k as f64 / nw as f64,
            )
        })
        .collect();

    let element_total = match split {
        HexSplit::Hexahedra => nu * nv * nw,
        HexSplit::Tetrahedra => 6 * nu * nv * nw,
    };
    let mut mesh = Mesh::with_capacity(node_total, element_total);
    mesh.set_nodes(nodes);

    let node_at = |i: usize, j: usize, k: usize| (i + j * nx + k * nx * ny) as u32;

    for k in 0..nw {
        for j in 0..nv {
            for i in 0..nu {
                let cell = [
                    node_at(i, j, k),
                    node_at(i + 1, j, k),
                    node_at(i + 1, j + 1, k),
                    node_at(i, j + 1, k),
                    node_at(i, j, k + 1),
                    node_at(i + 1, j, k + 1),
                    node_at(i + 1, j + 1, k + 1),
                    node_at(i, j + 1, k + 1),
                ];
                match split {
                    HexSplit::Hexahedra => {
                        mesh.add_element(Element::hexahedron(cell))?;
                    }
                    HexSplit::Tetrahedra => {
                        for tet in &HEX_TO_TETS {
                            let mut nodes =
                                [cell[tet[0]], cell[tet[1]], cell[tet[2]], cell[tet[3]]];
                            // The canonical table is positive for right-handed
                            // cells; a skewed input hexahedron can invert an
                            // individual tetrahedron, which a node swap fixes
                            // without changing its face set.
                            let volume = tet_volume(
                                mesh.node(nodes[0]),
                                mesh.node(nodes[1]),
                                mesh.node(nodes[2]),
                                mesh.node(nodes[3]),
                            );
                            if volume < 0.0 {
                                nodes.swap(1, 2);
                            }
                            mesh.add_element(Element::tetrahedron(nodes))?;
                        }
                    }
                }
            }
        }
    }

    debug!(
        target: "volmesh::hexmesher",
        nu, nv, nw,
        nodes = mesh.node_count(),
        elements = mesh.element_count(),
        "structured mesh generated"
    );
    Ok(mesh)
}
