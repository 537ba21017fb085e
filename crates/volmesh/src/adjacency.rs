//! Derived mesh adjacency, rebuilt on demand.
//!
//! Faces are keyed by their sorted node-index tuple so matching is
//! orientation-independent: a face shared by two elements appears under one
//! key regardless of each element's local winding.

use hashbrown::HashMap;
use rayon::prelude::*;

use crate::error::{MeshError, MeshResult};
use crate::mesh::Mesh;

/// Canonical (sorted) key for a face of up to 4 nodes.
///
/// Unused slots are padded with `u32::MAX`, which can never collide with a
/// real node index of a smaller face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceKey {
    nodes: [u32; 4],
    len: u8,
}

impl FaceKey {
    /// Build the canonical key for a face given in any winding.
    pub fn new(face: &[u32]) -> Self {
        debug_assert!((3..=4).contains(&face.len()));
        let mut nodes = [u32::MAX; 4];
        nodes[..face.len()].copy_from_slice(face);
        nodes[..face.len()].sort_unstable();
        Self {
            nodes,
            len: face.len() as u8,
        }
    }

    /// The sorted node indices of this face.
    #[inline]
    pub fn nodes(&self) -> &[u32] {
        &self.nodes[..self.len as usize]
    }
}

/// Canonical (sorted) key for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKey(u32, u32);

impl EdgeKey {
    /// Build the canonical key for an edge given in any direction.
    #[inline]
    pub fn new(a: u32, b: u32) -> Self {
        if a < b {
            EdgeKey(a, b)
        } else {
            EdgeKey(b, a)
        }
    }
}

/// One occurrence of a face on an element.
#[derive(Debug, Clone, Copy)]
pub struct FaceUse {
    /// Index of the element in the mesh's element sequence.
    pub element: u32,
    /// Local face index within that element's face table.
    pub local_face: u8,
}

/// Face-to-element adjacency for a volumetric (or mixed) mesh.
#[derive(Debug)]
pub struct MeshAdjacency {
    faces: HashMap<FaceKey, Vec<FaceUse>>,
}

impl MeshAdjacency {
    /// Enumerate every element face and group the occurrences by canonical
    /// key. Face enumeration is done in parallel; the merge is sequential
    /// and index-ordered, so the result is deterministic.
    pub fn build(mesh: &Mesh) -> Self {
        let uses: Vec<(FaceKey, FaceUse)> = mesh
            .elements()
            .par_iter()
            .enumerate()
            .flat_map_iter(|(element_index, element)| {
                element
                    .faces()
                    .enumerate()
                    .map(move |(local_face, face)| {
                        (
                            FaceKey::new(&face),
                            FaceUse {
                                element: element_index as u32,
                                local_face: local_face as u8,
                            },
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut faces: HashMap<FaceKey, Vec<FaceUse>> = HashMap::with_capacity(uses.len());
        for (key, face_use) in uses {
            faces.entry(key).or_default().push(face_use);
        }
        Self { faces }
    }

    /// Number of distinct faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Occurrences of a given face, if present.
    pub fn uses(&self, key: &FaceKey) -> Option<&[FaceUse]> {
        self.faces.get(key).map(|v| v.as_slice())
    }

    /// Iterate all faces with their occurrence lists.
    pub fn iter(&self) -> impl Iterator<Item = (&FaceKey, &[FaceUse])> {
        self.faces.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Faces used by exactly one element, sorted by (element, local face)
    /// of their single use so the order is stable.
    ///
    /// Fails with `NonManifoldMesh` if any face is used by more than two
    /// elements.
    pub fn boundary_faces(&self) -> MeshResult<Vec<(FaceKey, FaceUse)>> {
        let mut boundary = Vec::new();
        for (key, uses) in &self.faces {
            match uses.len() {
                1 => boundary.push((*key, uses[0])),
                2 => {}
                count => {
                    return Err(MeshError::NonManifoldMesh {
                        face: key.nodes().to_vec(),
                        count,
                    });
                }
            }
        }
        boundary.sort_by_key(|(_, u)| (u.element, u.local_face));
        Ok(boundary)
    }
}

/// Edge-to-face connectivity for a surface mesh.
///
/// This is the `generateFaces` step: the raw face list of an extracted
/// boundary carries no adjacency, so consumers that need to walk from a
/// face to its neighbors rebuild it here, within a coincidence tolerance
/// (nodes closer than the tolerance are treated as one).
#[derive(Debug)]
pub struct SurfaceTopology {
    /// Remap from mesh node index to welded node class.
    node_class: Vec<u32>,
    /// Welded-edge key -> faces (element indices) using that edge.
    edges: HashMap<EdgeKey, Vec<u32>>,
    /// Per-face neighbor lists (element indices), edge-ordered.
    neighbors: Vec<Vec<u32>>,
    boundary_edge_count: usize,
    non_manifold_edge_count: usize,
}

impl SurfaceTopology {
    /// Build edge adjacency for a surface mesh (triangles and quads).
    ///
    /// Fails with `InvalidTopology` if the mesh contains volume elements.
    pub fn build(mesh: &Mesh, tolerance: f64) -> MeshResult<Self> {
        for (index, element) in mesh.elements().iter().enumerate() {
            if element.kind().dimension() != 2 {
                return Err(MeshError::InvalidTopology {
                    details: format!(
                        "surface topology requires 2D elements, but element {} is a {}",
                        index,
                        element.kind().name()
                    ),
                });
            }
        }

        let (_, node_class) = crate::mesh::weld_nodes(mesh.nodes(), tolerance);

        let mut edges: HashMap<EdgeKey, Vec<u32>> = HashMap::new();
        for (index, element) in mesh.elements().iter().enumerate() {
            let nodes = element.nodes();
            for i in 0..nodes.len() {
                let a = node_class[nodes[i] as usize];
                let b = node_class[nodes[(i + 1) % nodes.len()] as usize];
                edges.entry(EdgeKey::new(a, b)).or_default().push(index as u32);
            }
        }

        let mut boundary_edge_count = 0;
        let mut non_manifold_edge_count = 0;
        for uses in edges.values() {
            match uses.len() {
                1 => boundary_edge_count += 1,
                2 => {}
                _ => non_manifold_edge_count += 1,
            }
        }

        let mut neighbors = vec![Vec::new(); mesh.element_count()];
        for uses in edges.values() {
            if uses.len() == 2 {
                neighbors[uses[0] as usize].push(uses[1]);
                neighbors[uses[1] as usize].push(uses[0]);
            }
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }

        Ok(Self {
            node_class,
            edges,
            neighbors,
            boundary_edge_count,
            non_manifold_edge_count,
        })
    }

    /// Faces adjacent to the given face across shared manifold edges.
    pub fn neighbors(&self, face: u32) -> &[u32] {
        &self.neighbors[face as usize]
    }

    /// Welded equivalence class of a mesh node.
    #[inline]
    pub fn node_class(&self, node: u32) -> u32 {
        self.node_class[node as usize]
    }

    /// Number of edges used by exactly one face.
    #[inline]
    pub fn boundary_edge_count(&self) -> usize {
        self.boundary_edge_count
    }

    /// Number of edges used by more than two faces.
    #[inline]
    pub fn non_manifold_edge_count(&self) -> usize {
        self.non_manifold_edge_count
    }

    /// Number of distinct (welded) edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether every edge is shared by exactly two faces.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.boundary_edge_count == 0 && self.non_manifold_edge_count == 0
    }

    /// Fail with `OpenSurface` unless the surface is a closed 2-manifold.
    pub fn ensure_closed(&self) -> MeshResult<()> {
        if self.is_closed() {
            Ok(())
        } else {
            Err(MeshError::OpenSurface {
                open_edges: self.boundary_edge_count + self.non_manifold_edge_count,
            })
        }
    }
}
