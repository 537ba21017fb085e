//! Structured and unstructured volumetric mesh generation.
//!
//! This crate builds volume meshes from simple geometric domains: a
//! structured hexahedral (or tetrahedral) grid over a hexahedron, boundary
//! surface extraction from any volume mesh, and Delaunay-based tetrahedral
//! meshing of the region enclosed by a closed triangle surface.
//!
//! # Features
//!
//! - **Structured meshing**: Subdivide a hexahedron into a regular grid of
//!   hexahedra, or split every cell into six tetrahedra
//! - **Boundary extraction**: Collect the faces used by exactly one volume
//!   element into a new, welded, outward-wound surface mesh
//! - **Surface topology**: Edge adjacency, closure and manifoldness checks
//!   with a geometric welding tolerance
//! - **Tetrahedral meshing**: Constrained Delaunay meshing of a closed
//!   surface with boundary recovery, size control and quality refinement
//! - **Export**: Gmsh MSH 2.2 ASCII output
//!
//! # Coordinate System and Winding
//!
//! The library uses a right-handed coordinate system. Surface faces are
//! wound counter-clockwise when viewed from outside, so normals point
//! outward by the right-hand rule; volume elements are stored with
//! positive signed volume.
//!
//! # Quick Start
//!
//! The classic pipeline meshes a box, extracts its boundary, and remeshes
//! the enclosed volume with tetrahedra:
//!
//! ```no_run
//! use nalgebra::Point3;
//! use volmesh::{extract_boundary, structured_mesh, Hexahedron, HexSplit};
//! use volmesh::tetmesher::{generate, TetMesherParams};
//! use volmesh::export::write_msh;
//!
//! let domain = Hexahedron::axis_aligned(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
//!
//! // 8x8x8 structured grid, split into tetrahedra.
//! let grid = structured_mesh(&domain, 8, 8, 8, HexSplit::Tetrahedra)?;
//!
//! // The outer surface of the grid.
//! let surface = extract_boundary(&grid, 1e-3)?;
//!
//! // Unstructured tetrahedral mesh of the enclosed volume.
//! let params = TetMesherParams::new(0.125, 0.1, 1e-3);
//! let result = generate(&surface, &params)?;
//!
//! // The library serializes to any writer; the caller owns the file.
//! let file = std::fs::File::create("box.msh")?;
//! write_msh(&result.mesh, file)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Error Handling
//!
//! Operations return [`MeshResult<T>`], which is `Result<T, MeshError>`.
//! Every error carries a stable `VMESH-XXXX` code (see [`ErrorCode`]):
//!
//! ```
//! use volmesh::{generate_faces, Mesh, MeshError};
//!
//! let empty = Mesh::new();
//! match generate_faces(&empty, 1e-6) {
//!     Ok(topology) => println!("{} edges", topology.edge_count()),
//!     Err(MeshError::InvalidTopology { details }) => println!("bad input: {details}"),
//!     Err(e) => println!("{} [{}]", e, e.code().as_str()),
//! }
//! ```

mod boundary;
mod error;
mod hexmesher;

pub mod adjacency;
pub mod export;
pub mod geometry;
pub mod mesh;
pub mod tetmesher;
pub mod tracing_ext;
pub mod validate;

// Re-export core types at crate root
pub use error::{ErrorCode, MeshError, MeshResult};
pub use geometry::{Hexahedron, Triangle};
pub use mesh::{weld_nodes, Element, ElementKind, Mesh, MeshId};

// Re-export the pipeline operations
pub use adjacency::{EdgeKey, FaceKey, FaceUse, MeshAdjacency, SurfaceTopology};
pub use boundary::{extract_boundary, generate_faces};
pub use hexmesher::{structured_mesh, HexSplit, HEX_TO_TETS};
pub use tetmesher::{generate, TetMesherParams, TetMesherResult};
pub use validate::{log_validation, validate_mesh, MeshReport};
