//! Boundary extraction: recover the surface of a volumetric mesh.
//!
//! Every element face is enumerated under its canonical (sorted) key; faces
//! used by exactly one element lie on the domain boundary, faces used by two
//! are interior, and any other count is a non-manifold defect. Boundary
//! faces are glued into a new, independent surface mesh with nodes welded
//! within a coincidence tolerance and the outward winding preserved from the
//! source elements.

use hashbrown::HashMap;
use tracing::{debug, info};

use crate::adjacency::{MeshAdjacency, SurfaceTopology};
use crate::error::{MeshError, MeshResult};
use crate::mesh::{weld_nodes, Element, Mesh};
use crate::tracing_ext::OperationTimer;

/// Extract the boundary surface of a volumetric mesh.
///
/// The output is a new mesh of triangles and/or quads with outward winding,
/// welded within `tolerance`, renumbered, and independent of the source
/// (provenance is recorded as an opaque source id only). The source mesh is
/// left untouched.
///
/// Fails with `NonManifoldMesh` if any face is shared by more than two
/// elements, and with `OpenSurface` if the surviving faces do not form a
/// closed 2-manifold.
///
/// Running the extractor on an already-extracted surface mesh is the
/// identity on its face set: each 2D element reports itself as its single
/// face, so every face is a boundary face.
pub fn extract_boundary(mesh: &Mesh, tolerance: f64) -> MeshResult<Mesh> {
    let _timer = OperationTimer::new("extract_boundary");

    let adjacency = MeshAdjacency::build(mesh);
    let boundary = adjacency.boundary_faces()?;

    // Outward winding comes from the owning element's face table, not the
    // canonical key.
    let mut faces: Vec<Vec<u32>> = Vec::with_capacity(boundary.len());
    for (_, face_use) in &boundary {
        let element = &mesh.elements()[face_use.element as usize];
        let face = element
            .faces()
            .nth(face_use.local_face as usize)
            .ok_or_else(|| MeshError::InvalidTopology {
                details: "adjacency refers to a face index past the element's face table".into(),
            })?;
        faces.push(face);
    }

    // Collect referenced nodes in first-use order, weld, renumber.
    let mut local_of: HashMap<u32, u32> = HashMap::new();
    let mut points = Vec::new();
    for face in &faces {
        for &node in face {
            local_of.entry(node).or_insert_with(|| {
                points.push(*mesh.node(node));
                (points.len() - 1) as u32
            });
        }
    }
    let (welded, remap) = weld_nodes(&points, tolerance);

    let mut surface = Mesh::with_capacity(welded.len(), faces.len());
    surface.set_nodes(welded);
    surface.set_source(mesh.id());

    let mut collapsed = 0usize;
    for face in &faces {
        let mapped: Vec<u32> = face
            .iter()
            .map(|&node| remap[local_of[&node] as usize])
            .collect();

        // Welding can collapse face edges: a quad with one collapsed edge
        // degrades to a triangle, and anything left with fewer than 3
        // distinct nodes carries no area and is dropped.
        let mut cycle: Vec<u32> = Vec::with_capacity(mapped.len());
        for &node in &mapped {
            if cycle.last() != Some(&node) {
                cycle.push(node);
            }
        }
        if cycle.len() > 1 && cycle.first() == cycle.last() {
            cycle.pop();
        }
        let mut distinct = cycle.clone();
        distinct.sort_unstable();
        distinct.dedup();

        let element = match (cycle.len(), distinct.len()) {
            (3, 3) => Element::triangle([cycle[0], cycle[1], cycle[2]]),
            (4, 4) => Element::quad([cycle[0], cycle[1], cycle[2], cycle[3]]),
            _ => {
                collapsed += 1;
                continue;
            }
        };
        surface.add_element(element)?;
    }
    if collapsed > 0 {
        debug!(
            target: "volmesh::boundary",
            collapsed,
            "dropped faces collapsed by welding"
        );
    }

    // The extractor's contract is a closed 2-manifold output.
    SurfaceTopology::build(&surface, tolerance)?.ensure_closed()?;

    info!(
        target: "volmesh::boundary",
        source_elements = mesh.element_count(),
        boundary_faces = surface.element_count(),
        nodes = surface.node_count(),
        "boundary extracted"
    );
    Ok(surface)
}

/// Rebuild face connectivity metadata for an extracted surface.
///
/// The raw face list produced by [`extract_boundary`] carries no adjacency;
/// this regenerates edge-to-face connectivity (within its own tolerance) so
/// downstream consumers can query neighboring faces.
pub fn generate_faces(surface: &Mesh, tolerance: f64) -> MeshResult<SurfaceTopology> {
    SurfaceTopology::build(surface, tolerance)
}
