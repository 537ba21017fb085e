//! Incremental tetrahedral triangulation (Bowyer–Watson).
//!
//! The working structure keeps a flat tetrahedron pool with per-face
//! neighbor links and tombstone slots reused through a free list. All
//! orientation and circumsphere decisions go through the exact predicates
//! in [`crate::geometry`]; degenerate configurations (cospherical lattice
//! points) are handled by enlarging the insertion cavity until every new
//! tetrahedron is strictly positive, so no symbolic perturbation is needed.

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{in_sphere, orient};

pub(crate) const INVALID: u32 = u32::MAX;

/// Outward face opposite each local vertex of a positive tetrahedron.
pub(crate) const OPPOSITE_FACE: [[usize; 3]; 4] = [[1, 2, 3], [0, 3, 2], [0, 1, 3], [0, 2, 1]];

/// A tetrahedron in the pool: vertex ids plus the neighbor across the face
/// opposite each vertex (`INVALID` on the outer hull).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Tet {
    pub vertices: [u32; 4],
    pub neighbors: [u32; 4],
}

impl Tet {
    #[inline]
    pub fn has_vertex(&self, v: u32) -> bool {
        self.vertices.contains(&v)
    }

    #[inline]
    pub fn local_index_of(&self, v: u32) -> Option<usize> {
        self.vertices.iter().position(|&x| x == v)
    }

    /// Global vertex ids of the outward face opposite local vertex `i`.
    #[inline]
    pub fn face(&self, i: usize) -> [u32; 3] {
        let f = OPPOSITE_FACE[i];
        [self.vertices[f[0]], self.vertices[f[1]], self.vertices[f[2]]]
    }

    /// Canonical (sorted) key of the face opposite local vertex `i`.
    #[inline]
    pub fn face_key(&self, i: usize) -> [u32; 3] {
        let mut key = self.face(i);
        key.sort_unstable();
        key
    }
}

/// Incremental Delaunay-style tetrahedralization of a point set inside an
/// enclosing super-tetrahedron.
pub(crate) struct Triangulation {
    points: Vec<Point3<f64>>,
    tets: Vec<Tet>,
    alive: Vec<bool>,
    free: Vec<u32>,
    alive_count: usize,
    hint: u32,
    super_base: u32,
}

impl Triangulation {
    /// Build the initial super-tetrahedron around the given points.
    ///
    /// The points are stored with their indices unchanged; the four super
    /// vertices are appended after them.
    pub fn new(mut points: Vec<Point3<f64>>) -> Self {
        let (center, radius) = enclosing_sphere(&points);
        let scale = 16.0 * radius + 1.0;

        let super_base = points.len() as u32;
        let apex = center + nalgebra::Vector3::new(0.0, 0.0, 3.0 * scale);
        let base = [
            center + nalgebra::Vector3::new(-2.5 * scale, -1.5 * scale, -scale),
            center + nalgebra::Vector3::new(2.5 * scale, -1.5 * scale, -scale),
            center + nalgebra::Vector3::new(0.0, 2.5 * scale, -scale),
        ];
        points.extend_from_slice(&base);
        points.push(apex);

        // Base triangle counter-clockwise seen from the apex: positive tet.
        let first = Tet {
            vertices: [super_base, super_base + 1, super_base + 2, super_base + 3],
            neighbors: [INVALID; 4],
        };

        Self {
            points,
            tets: vec![first],
            alive: vec![true],
            free: Vec::new(),
            alive_count: 1,
            hint: 0,
            super_base,
        }
    }

    #[inline]
    pub fn point(&self, id: u32) -> &Point3<f64> {
        &self.points[id as usize]
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Append a new point (e.g. a Steiner point), returning its id.
    pub fn add_point(&mut self, p: Point3<f64>) -> u32 {
        let id = self.points.len() as u32;
        self.points.push(p);
        id
    }

    #[inline]
    pub fn is_super_vertex(&self, v: u32) -> bool {
        v >= self.super_base && v < self.super_base + 4
    }

    #[inline]
    pub fn tet(&self, id: u32) -> &Tet {
        &self.tets[id as usize]
    }

    #[inline]
    pub fn is_alive(&self, id: u32) -> bool {
        self.alive[id as usize]
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.tets.len()
    }

    #[inline]
    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Iterate ids of live tetrahedra in index order.
    pub fn alive_tets(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.tets.len() as u32).filter(move |&id| self.alive[id as usize])
    }

    fn kill(&mut self, id: u32) {
        debug_assert!(self.alive[id as usize]);
        self.alive[id as usize] = false;
        self.alive_count -= 1;
        self.free.push(id);
    }

    fn make_tet(&mut self, vertices: [u32; 4]) -> u32 {
        let tet = Tet {
            vertices,
            neighbors: [INVALID; 4],
        };
        if let Some(id) = self.free.pop() {
            self.tets[id as usize] = tet;
            self.alive[id as usize] = true;
            self.alive_count += 1;
            id
        } else {
            self.tets.push(tet);
            self.alive.push(true);
            self.alive_count += 1;
            (self.tets.len() - 1) as u32
        }
    }

    fn tet_contains(&self, id: u32, p: &Point3<f64>) -> bool {
        let tet = &self.tets[id as usize];
        (0..4).all(|i| {
            let [a, b, c] = tet.face(i);
            orient(self.point(a), self.point(b), self.point(c), p) <= 0.0
        })
    }

    /// Find a live tetrahedron containing `p` by walking from the last
    /// touched tetrahedron, with a linear scan as the degenerate fallback.
    pub fn locate(&self, p: &Point3<f64>) -> MeshResult<u32> {
        let mut current = if self.alive[self.hint as usize] {
            self.hint
        } else {
            self.alive_tets().next().ok_or_else(|| MeshError::DegenerateInput {
                details: "triangulation has no live tetrahedra".into(),
            })?
        };

        let max_steps = 4 * self.tets.len() + 16;
        let mut steps = 0;
        'walk: while steps < max_steps {
            steps += 1;
            let tet = &self.tets[current as usize];
            for i in 0..4 {
                let [a, b, c] = tet.face(i);
                if orient(self.point(a), self.point(b), self.point(c), p) > 0.0 {
                    let neighbor = tet.neighbors[i];
                    if neighbor == INVALID {
                        return Err(MeshError::DegenerateInput {
                            details: "point lies outside the triangulation domain".into(),
                        });
                    }
                    current = neighbor;
                    continue 'walk;
                }
            }
            return Ok(current);
        }

        // The walk can cycle on degenerate configurations; fall back to an
        // exhaustive scan.
        self.alive_tets()
            .find(|&id| self.tet_contains(id, p))
            .ok_or_else(|| MeshError::DegenerateInput {
                details: "point lies outside the triangulation domain".into(),
            })
    }

    fn circumsphere_contains(&self, id: u32, p: &Point3<f64>) -> bool {
        let [a, b, c, d] = self.tets[id as usize].vertices;
        in_sphere(
            self.point(a),
            self.point(b),
            self.point(c),
            self.point(d),
            p,
        ) > 0.0
    }

    /// Insert an already-stored point into the triangulation.
    ///
    /// Standard Bowyer–Watson: collect the connected set of tetrahedra whose
    /// circumsphere contains the point, then enlarge that cavity until every
    /// boundary face sees the point strictly (which keeps every refill
    /// tetrahedron strictly positive even for cospherical inputs), carve the
    /// cavity out, and fan the point to the cavity boundary.
    pub fn insert(&mut self, point_id: u32) -> MeshResult<()> {
        let p = self.points[point_id as usize];
        let start = self.locate(&p)?;

        let mut cavity: HashSet<u32> = HashSet::new();
        cavity.insert(start);
        let mut queue = vec![start];
        while let Some(id) = queue.pop() {
            for i in 0..4 {
                let neighbor = self.tets[id as usize].neighbors[i];
                if neighbor == INVALID || cavity.contains(&neighbor) {
                    continue;
                }
                if self.circumsphere_contains(neighbor, &p) {
                    cavity.insert(neighbor);
                    queue.push(neighbor);
                }
            }
        }

        // Enlarge until star-shaped with respect to p: every boundary face
        // (wound outward from its cavity tet) must see p strictly on its
        // inner side.
        let boundary = 'grow: loop {
            let members: Vec<u32> = {
                let mut m: Vec<u32> = cavity.iter().copied().collect();
                m.sort_unstable();
                m
            };
            let mut boundary: Vec<([u32; 3], u32, u32)> = Vec::new();
            for &id in &members {
                for i in 0..4 {
                    let neighbor = self.tets[id as usize].neighbors[i];
                    if neighbor != INVALID && cavity.contains(&neighbor) {
                        continue;
                    }
                    let [a, b, c] = self.tets[id as usize].face(i);
                    if orient(self.point(a), self.point(b), self.point(c), &p) >= 0.0 {
                        if neighbor == INVALID {
                            return Err(MeshError::DegenerateInput {
                                details: "insertion cavity reached the outer hull".into(),
                            });
                        }
                        cavity.insert(neighbor);
                        continue 'grow;
                    }
                    boundary.push(([a, b, c], neighbor, id));
                }
            }
            break boundary;
        };

        // Remember which face of each external neighbor pointed into the
        // cavity before the cavity tets die.
        let mut external_fix: Vec<(u32, usize)> = Vec::with_capacity(boundary.len());
        for &(_, external, cavity_tet) in &boundary {
            if external == INVALID {
                external_fix.push((INVALID, 0));
            } else {
                let j = self.tets[external as usize]
                    .neighbors
                    .iter()
                    .position(|&n| n == cavity_tet)
                    .ok_or_else(|| MeshError::InvalidTopology {
                        details: "neighbor links are out of sync across the cavity boundary"
                            .into(),
                    })?;
                external_fix.push((external, j));
            }
        }

        for &id in cavity.iter() {
            self.kill(id);
        }

        // Fan the point to every boundary face. Faces are outward from the
        // cavity, so (f0, f2, f1, p) is positively oriented.
        let mut edge_link: HashMap<(u32, u32), (u32, usize)> = HashMap::new();
        let mut last = INVALID;
        for (face_index, &([f0, f1, f2], _, _)) in boundary.iter().enumerate() {
            let new_tet = self.make_tet([f0, f2, f1, point_id]);
            last = new_tet;

            let (external, j) = external_fix[face_index];
            self.tets[new_tet as usize].neighbors[3] = external;
            if external != INVALID {
                self.tets[external as usize].neighbors[j] = new_tet;
            }

            // Faces through p: opposite local i (i < 3) is the face made of
            // p and the two remaining face vertices.
            let verts = self.tets[new_tet as usize].vertices;
            for i in 0..3 {
                let (u, v) = match i {
                    0 => (verts[1], verts[2]),
                    1 => (verts[0], verts[2]),
                    _ => (verts[0], verts[1]),
                };
                let key = if u < v { (u, v) } else { (v, u) };
                match edge_link.remove(&key) {
                    Some((other_tet, other_face)) => {
                        self.tets[new_tet as usize].neighbors[i] = other_tet;
                        self.tets[other_tet as usize].neighbors[other_face] = new_tet;
                    }
                    None => {
                        edge_link.insert(key, (new_tet, i));
                    }
                }
            }
        }
        debug_assert!(edge_link.is_empty(), "cavity boundary must close");

        self.hint = last;
        Ok(())
    }

    /// Sorted-triple keys of every face of every live tetrahedron.
    pub fn face_set(&self) -> HashSet<[u32; 3]> {
        let mut faces = HashSet::with_capacity(self.alive_count * 2);
        for id in self.alive_tets() {
            for i in 0..4 {
                faces.insert(self.tets[id as usize].face_key(i));
            }
        }
        faces
    }

    /// Sorted-pair keys of every edge of every live tetrahedron.
    pub fn edge_set(&self) -> HashSet<(u32, u32)> {
        let mut edges = HashSet::with_capacity(self.alive_count * 6);
        for id in self.alive_tets() {
            let v = self.tets[id as usize].vertices;
            for i in 0..4 {
                for j in (i + 1)..4 {
                    let key = if v[i] < v[j] { (v[i], v[j]) } else { (v[j], v[i]) };
                    edges.insert(key);
                }
            }
        }
        edges
    }

    /// The ordered ring of tetrahedra around edge `(a, b)`, together with
    /// the link cycle `w_0..w_{n-1}` such that ring tet `i` has vertex set
    /// `{a, b, w_i, w_{i+1 mod n}}`. Returns `None` if the edge is absent
    /// or its ring is open (touches the hull).
    pub fn ring_around_edge(&self, a: u32, b: u32) -> Option<(Vec<u32>, Vec<u32>)> {
        let start = self
            .alive_tets()
            .find(|&id| self.tets[id as usize].has_vertex(a) && self.tets[id as usize].has_vertex(b))?;

        let others: Vec<u32> = self.tets[start as usize]
            .vertices
            .iter()
            .copied()
            .filter(|&v| v != a && v != b)
            .collect();
        let (mut enter, mut exit) = (others[0], others[1]);

        let mut ring = Vec::new();
        let mut link = Vec::new();
        let mut current = start;
        loop {
            ring.push(current);
            link.push(enter);

            // Leave across the face that drops the entering link vertex.
            let local = self.tets[current as usize].local_index_of(enter)?;
            let next = self.tets[current as usize].neighbors[local];
            if next == INVALID {
                return None;
            }
            if next == start {
                break;
            }
            let new_vertex = self.tets[next as usize]
                .vertices
                .iter()
                .copied()
                .find(|&v| v != a && v != b && v != exit)?;
            enter = exit;
            exit = new_vertex;
            current = next;
        }
        Some((ring, link))
    }

    /// Replace a set of tetrahedra with new ones and relink all neighbor
    /// pointers from scratch. Used by boundary recovery, where the local
    /// surgery is rare enough that a full rebuild is the simplest safe
    /// option.
    pub fn replace_tets(&mut self, old: &[u32], new_tets: &[[u32; 4]]) {
        for &id in old {
            self.kill(id);
        }
        let mut last = INVALID;
        for &vertices in new_tets {
            last = self.make_tet(vertices);
        }
        self.rebuild_neighbors();
        if last != INVALID {
            self.hint = last;
        } else {
            let fallback = self.alive_tets().next();
            if let Some(id) = fallback {
                self.hint = id;
            }
        }
    }

    /// Recompute every neighbor pointer from the live tetrahedron set.
    pub fn rebuild_neighbors(&mut self) {
        let ids: Vec<u32> = self.alive_tets().collect();
        for &id in &ids {
            self.tets[id as usize].neighbors = [INVALID; 4];
        }
        let mut faces: HashMap<[u32; 3], (u32, usize)> = HashMap::with_capacity(ids.len() * 2);
        for &id in &ids {
            for i in 0..4 {
                let key = self.tets[id as usize].face_key(i);
                match faces.remove(&key) {
                    Some((other, other_face)) => {
                        self.tets[id as usize].neighbors[i] = other;
                        self.tets[other as usize].neighbors[other_face] = id;
                    }
                    None => {
                        faces.insert(key, (id, i));
                    }
                }
            }
        }
    }
}

fn enclosing_sphere(points: &[Point3<f64>]) -> (Point3<f64>, f64) {
    if points.is_empty() {
        return (Point3::origin(), 1.0);
    }
    let mut min = points[0];
    let mut max = points[0];
    for p in &points[1..] {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        min.z = min.z.min(p.z);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
        max.z = max.z.max(p.z);
    }
    let center = nalgebra::center(&min, &max);
    let radius = (max - min).norm() * 0.5;
    (center, radius.max(1.0e-6))
}
