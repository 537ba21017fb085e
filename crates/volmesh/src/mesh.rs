//! Core mesh container types.
//!
//! A [`Mesh`] owns an ordered node sequence (insertion order = index) and an
//! ordered element sequence. It is populated by exactly one generator and is
//! treated as immutable once generation completes; derived adjacency is
//! rebuilt on demand by [`crate::adjacency`] rather than stored here.

use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use nalgebra::Point3;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{tet_volume, Triangle};

/// Opaque identifier for a mesh, used only for provenance tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(u64);

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

impl MeshId {
    fn next() -> Self {
        MeshId(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The shape of a mesh element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Triangle,
    Quad,
    Tetrahedron,
    Hexahedron,
}

/// Outward-wound face tables, indexed by local node position.
///
/// Volume kinds list every face with outward orientation (counter-clockwise
/// seen from outside the element). Surface kinds list the element itself as
/// its single face, so a surface mesh can be passed back through the
/// boundary extractor as a degenerate "volume".
const TRIANGLE_FACES: &[&[usize]] = &[&[0, 1, 2]];
const QUAD_FACES: &[&[usize]] = &[&[0, 1, 2, 3]];
const TETRAHEDRON_FACES: &[&[usize]] = &[
    &[1, 2, 3], // opposite node 0
    &[0, 3, 2], // opposite node 1
    &[0, 1, 3], // opposite node 2
    &[0, 2, 1], // opposite node 3
];
const HEXAHEDRON_FACES: &[&[usize]] = &[
    &[0, 3, 2, 1], // bottom (w-)
    &[4, 5, 6, 7], // top (w+)
    &[0, 1, 5, 4], // front (v-)
    &[1, 2, 6, 5], // right (u+)
    &[2, 3, 7, 6], // back (v+)
    &[3, 0, 4, 7], // left (u-)
];

impl ElementKind {
    /// Number of nodes of this element shape.
    #[inline]
    pub fn node_count(&self) -> usize {
        match self {
            ElementKind::Triangle => 3,
            ElementKind::Quad => 4,
            ElementKind::Tetrahedron => 4,
            ElementKind::Hexahedron => 8,
        }
    }

    /// Topological dimension of this element shape.
    #[inline]
    pub fn dimension(&self) -> usize {
        match self {
            ElementKind::Triangle | ElementKind::Quad => 2,
            ElementKind::Tetrahedron | ElementKind::Hexahedron => 3,
        }
    }

    /// Faces of this element shape as local node index tuples, outward wound.
    #[inline]
    pub fn faces(&self) -> &'static [&'static [usize]] {
        match self {
            ElementKind::Triangle => TRIANGLE_FACES,
            ElementKind::Quad => QUAD_FACES,
            ElementKind::Tetrahedron => TETRAHEDRON_FACES,
            ElementKind::Hexahedron => HEXAHEDRON_FACES,
        }
    }

    /// Human-readable shape name.
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Triangle => "triangle",
            ElementKind::Quad => "quad",
            ElementKind::Tetrahedron => "tetrahedron",
            ElementKind::Hexahedron => "hexahedron",
        }
    }
}

/// A mesh element: an ordered tuple of node indices with a shape tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    kind: ElementKind,
    nodes: [u32; 8],
}

impl Element {
    fn new(kind: ElementKind, node_ids: &[u32]) -> Self {
        debug_assert_eq!(node_ids.len(), kind.node_count());
        let mut nodes = [0u32; 8];
        nodes[..node_ids.len()].copy_from_slice(node_ids);
        Self { kind, nodes }
    }

    /// Create a triangle element.
    #[inline]
    pub fn triangle(nodes: [u32; 3]) -> Self {
        Self::new(ElementKind::Triangle, &nodes)
    }

    /// Create a quadrilateral element.
    #[inline]
    pub fn quad(nodes: [u32; 4]) -> Self {
        Self::new(ElementKind::Quad, &nodes)
    }

    /// Create a tetrahedral element (positive-volume node order).
    #[inline]
    pub fn tetrahedron(nodes: [u32; 4]) -> Self {
        Self::new(ElementKind::Tetrahedron, &nodes)
    }

    /// Create a hexahedral element (bottom quad counter-clockwise, then top).
    #[inline]
    pub fn hexahedron(nodes: [u32; 8]) -> Self {
        Self::new(ElementKind::Hexahedron, &nodes)
    }

    /// The element's shape tag.
    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// The element's node indices, in connectivity order.
    #[inline]
    pub fn nodes(&self) -> &[u32] {
        &self.nodes[..self.kind.node_count()]
    }

    /// Iterate the element's faces as global node index tuples, outward wound.
    pub fn faces(&self) -> impl Iterator<Item = Vec<u32>> + '_ {
        self.kind
            .faces()
            .iter()
            .map(move |face| face.iter().map(|&local| self.nodes[local]).collect())
    }
}

/// A volumetric or surface mesh: nodes plus element connectivity.
#[derive(Debug, Clone)]
pub struct Mesh {
    id: MeshId,
    source: Option<MeshId>,
    nodes: Vec<Point3<f64>>,
    elements: Vec<Element>,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            id: MeshId::next(),
            source: None,
            nodes: Vec::new(),
            elements: Vec::new(),
        }
    }

    /// Create an empty mesh with pre-allocated capacity.
    pub fn with_capacity(node_count: usize, element_count: usize) -> Self {
        Self {
            id: MeshId::next(),
            source: None,
            nodes: Vec::with_capacity(node_count),
            elements: Vec::with_capacity(element_count),
        }
    }

    /// This mesh's opaque identifier.
    #[inline]
    pub fn id(&self) -> MeshId {
        self.id
    }

    /// Identifier of the mesh this one was derived from, if any.
    ///
    /// Provenance only; never a live reference. An extracted surface outlives
    /// and is fully independent of its source volume mesh.
    #[inline]
    pub fn source(&self) -> Option<MeshId> {
        self.source
    }

    pub(crate) fn set_source(&mut self, source: MeshId) {
        self.source = Some(source);
    }

    /// Append a node, returning its index.
    #[inline]
    pub fn add_node(&mut self, position: Point3<f64>) -> u32 {
        let index = self.nodes.len() as u32;
        self.nodes.push(position);
        index
    }

    pub(crate) fn set_nodes(&mut self, nodes: Vec<Point3<f64>>) {
        debug_assert!(self.nodes.is_empty());
        self.nodes = nodes;
    }

    /// Append an element after checking the container invariants:
    /// every referenced node must exist, and no element may reference the
    /// same node twice.
    pub fn add_element(&mut self, element: Element) -> MeshResult<u32> {
        let element_index = self.elements.len();
        let node_count = self.nodes.len();
        let ids = element.nodes();

        for &node_index in ids {
            if node_index as usize >= node_count {
                return Err(MeshError::InvalidNodeIndex {
                    element_index,
                    node_index,
                    node_count,
                });
            }
        }
        for (i, &a) in ids.iter().enumerate() {
            if ids[i + 1..].contains(&a) {
                return Err(MeshError::InvalidTopology {
                    details: format!(
                        "element {} ({}) references node {} more than once",
                        element_index,
                        element.kind().name(),
                        a
                    ),
                });
            }
        }

        self.elements.push(element);
        Ok(element_index as u32)
    }

    /// Number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of elements.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Whether the mesh has no nodes or no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() || self.elements.is_empty()
    }

    /// Node position by index.
    #[inline]
    pub fn node(&self, index: u32) -> &Point3<f64> {
        &self.nodes[index as usize]
    }

    /// All node positions, insertion order.
    #[inline]
    pub fn nodes(&self) -> &[Point3<f64>] {
        &self.nodes
    }

    /// All elements, insertion order.
    #[inline]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Axis-aligned bounding box as `(min_corner, max_corner)`, or `None`
    /// for a mesh with no nodes.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.nodes.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.nodes[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some((min, max))
    }

    /// Total measure of the mesh's volume elements: the sum of hexahedron
    /// and tetrahedron volumes. Surface elements contribute nothing.
    pub fn volume(&self) -> f64 {
        self.elements
            .iter()
            .map(|element| match element.kind() {
                ElementKind::Tetrahedron => {
                    let n = element.nodes();
                    tet_volume(
                        self.node(n[0]),
                        self.node(n[1]),
                        self.node(n[2]),
                        self.node(n[3]),
                    )
                }
                ElementKind::Hexahedron => {
                    // Split into the 6-tet decomposition for measurement.
                    let n = element.nodes();
                    crate::hexmesher::HEX_TO_TETS
                        .iter()
                        .map(|t| {
                            tet_volume(
                                self.node(n[t[0]]),
                                self.node(n[t[1]]),
                                self.node(n[t[2]]),
                                self.node(n[t[3]]),
                            )
                        })
                        .sum()
                }
                _ => 0.0,
            })
            .sum()
    }

    /// Signed volume enclosed by a surface mesh, via the divergence
    /// theorem. Positive for outward-wound closed surfaces. Quads are
    /// fan-split into two triangles; volume elements contribute nothing.
    pub fn enclosed_volume(&self) -> f64 {
        let mut volume = 0.0;
        let mut add = |a: u32, b: u32, c: u32| {
            let v0 = self.node(a).coords;
            let v1 = self.node(b).coords;
            let v2 = self.node(c).coords;
            volume += v0.dot(&v1.cross(&v2));
        };
        for element in &self.elements {
            let n = element.nodes();
            match element.kind() {
                ElementKind::Triangle => add(n[0], n[1], n[2]),
                ElementKind::Quad => {
                    add(n[0], n[1], n[2]);
                    add(n[0], n[2], n[3]);
                }
                _ => {}
            }
        }
        volume / 6.0
    }

    /// Total area of the mesh's surface elements, with quads fan-split.
    pub fn surface_area(&self) -> f64 {
        self.elements
            .iter()
            .map(|e| {
                let n = e.nodes();
                match e.kind() {
                    ElementKind::Triangle => {
                        Triangle::new(*self.node(n[0]), *self.node(n[1]), *self.node(n[2])).area()
                    }
                    ElementKind::Quad => {
                        Triangle::new(*self.node(n[0]), *self.node(n[1]), *self.node(n[2])).area()
                            + Triangle::new(*self.node(n[0]), *self.node(n[2]), *self.node(n[3]))
                                .area()
                    }
                    _ => 0.0,
                }
            })
            .sum()
    }

    /// Count elements of a given kind.
    pub fn count_kind(&self, kind: ElementKind) -> usize {
        self.elements.iter().filter(|e| e.kind() == kind).count()
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn position_to_cell(p: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
        (p.z / cell_size).floor() as i64,
    )
}

/// Cluster points closer than `epsilon` into a single representative.
///
/// Returns the deduplicated points (first-seen order) and a remap table from
/// old indices to new ones. Uses a spatial hash with the cluster
/// representative being the smallest original index, so the result is
/// deterministic regardless of parallelism elsewhere.
pub fn weld_nodes(points: &[Point3<f64>], epsilon: f64) -> (Vec<Point3<f64>>, Vec<u32>) {
    if points.is_empty() {
        return (Vec::new(), Vec::new());
    }
    if epsilon <= 0.0 {
        return (points.to_vec(), (0..points.len() as u32).collect());
    }

    let cell_size = epsilon * 2.0;
    let mut spatial_hash: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, p) in points.iter().enumerate() {
        spatial_hash
            .entry(position_to_cell(p, cell_size))
            .or_default()
            .push(idx as u32);
    }

    // representative[i] = smallest index in i's cluster
    let mut representative: Vec<u32> = (0..points.len() as u32).collect();
    for (idx, p) in points.iter().enumerate() {
        let idx = idx as u32;
        if representative[idx as usize] != idx {
            continue;
        }
        let cell = position_to_cell(p, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let neighbor = (cell.0 + dx, cell.1 + dy, cell.2 + dz);
                    let Some(candidates) = spatial_hash.get(&neighbor) else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= idx || representative[other as usize] != other {
                            continue;
                        }
                        if (p - points[other as usize]).norm() < epsilon {
                            representative[other as usize] = idx;
                        }
                    }
                }
            }
        }
    }

    // Resolve transitive merges (A->B, B->C => A->C).
    for i in 0..representative.len() {
        let mut target = representative[i];
        while representative[target as usize] != target {
            target = representative[target as usize];
        }
        representative[i] = target;
    }

    // Compact representatives into a dense index space, first-seen order.
    let mut remap = vec![u32::MAX; points.len()];
    let mut welded = Vec::new();
    for i in 0..points.len() {
        let rep = representative[i] as usize;
        if remap[rep] == u32::MAX {
            remap[rep] = welded.len() as u32;
            welded.push(points[rep]);
        }
        remap[i] = remap[rep];
    }

    (welded, remap)
}
