//! Error types for mesh generation with machine-readable codes.
//!
//! Each error carries a unique code in the format `VMESH-XXXX`:
//! - `VMESH-1xxx`: input errors (malformed primitives, bad parameters)
//! - `VMESH-2xxx`: topology errors (non-manifold, open surfaces)
//! - `VMESH-3xxx`: meshing failures (boundary recovery exhausted)
//! - `VMESH-4xxx`: export errors
//!
//! A failing operation never returns a partial mesh; the inputs it was
//! given remain valid and untouched.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Machine-readable error codes for mesh operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Input errors (1xxx)
    /// VMESH-1101: Malformed primitive input (wrong vertex count, repeated node).
    InvalidTopology = 1101,
    /// VMESH-1102: Out-of-range scalar or count parameter.
    InvalidArgument = 1102,
    /// VMESH-1103: Element references a node that does not exist.
    InvalidNodeIndex = 1103,

    // Topology errors (2xxx)
    /// VMESH-2201: A face is shared by more than two elements.
    NonManifoldMesh = 2201,
    /// VMESH-2202: An extracted surface does not close (unmatched edges).
    OpenSurface = 2202,
    /// VMESH-2203: Degenerate meshing input (open, self-crossing, or zero volume).
    DegenerateInput = 2203,

    // Meshing failures (3xxx)
    /// VMESH-3301: Boundary conformity could not be recovered within bounds.
    BoundaryRecovery = 3301,

    // Export errors (4xxx)
    /// VMESH-4401: Serialization to a writer failed.
    IoWrite = 4401,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `VMESH-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidTopology => "VMESH-1101",
            ErrorCode::InvalidArgument => "VMESH-1102",
            ErrorCode::InvalidNodeIndex => "VMESH-1103",
            ErrorCode::NonManifoldMesh => "VMESH-2201",
            ErrorCode::OpenSurface => "VMESH-2202",
            ErrorCode::DegenerateInput => "VMESH-2203",
            ErrorCode::BoundaryRecovery => "VMESH-3301",
            ErrorCode::IoWrite => "VMESH-4401",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while building, extracting, or remeshing meshes.
#[derive(Debug, Error, Diagnostic)]
pub enum MeshError {
    /// Malformed primitive or element input.
    #[error("invalid topology: {details}")]
    #[diagnostic(
        code(volmesh::input::topology),
        help("Check vertex ordering and that the primitive received its full vertex set.")
    )]
    InvalidTopology { details: String },

    /// Out-of-range scalar or count parameter.
    #[error("invalid argument `{name}`: {details}")]
    #[diagnostic(
        code(volmesh::input::argument),
        help("See the parameter documentation for the accepted range.")
    )]
    InvalidArgument { name: &'static str, details: String },

    /// Element references a node outside the mesh's node sequence.
    #[error(
        "invalid node index: element {element_index} references node {node_index}, but mesh only has {node_count} nodes"
    )]
    #[diagnostic(code(volmesh::input::node_index))]
    InvalidNodeIndex {
        element_index: usize,
        node_index: u32,
        node_count: usize,
    },

    /// A face is shared by more than two elements.
    #[error("non-manifold mesh: face {face:?} is shared by {count} elements")]
    #[diagnostic(
        code(volmesh::topology::non_manifold),
        help("Boundary extraction requires every interior face to be shared by exactly two elements.")
    )]
    NonManifoldMesh { face: Vec<u32>, count: usize },

    /// A surface that must close has unmatched edges.
    #[error("open surface: {open_edges} edge(s) are not shared by exactly two faces")]
    #[diagnostic(
        code(volmesh::topology::open_surface),
        help("The source volume mesh may have cracks; try a larger coincidence tolerance.")
    )]
    OpenSurface { open_edges: usize },

    /// Meshing input is degenerate (open, self-crossing, or encloses no volume).
    #[error("degenerate input: {details}")]
    #[diagnostic(
        code(volmesh::topology::degenerate),
        help("The boundary surface must be closed, outward-oriented, and enclose a positive volume.")
    )]
    DegenerateInput { details: String },

    /// Boundary conformity could not be achieved within the configured bounds.
    #[error(
        "boundary recovery failed: {missing_faces} constraint face(s) unrecovered after {attempts} attempt(s)"
    )]
    #[diagnostic(
        code(volmesh::tetmesher::recovery),
        help("Raise max_recovery_attempts or the element budget, or coarsen the boundary surface.")
    )]
    BoundaryRecovery {
        missing_faces: usize,
        attempts: usize,
    },

    /// Serialization to a writer failed.
    #[error("failed to write mesh")]
    #[diagnostic(code(volmesh::export::write))]
    IoWrite {
        #[source]
        source: std::io::Error,
    },
}

impl MeshError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeshError::InvalidTopology { .. } => ErrorCode::InvalidTopology,
            MeshError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            MeshError::InvalidNodeIndex { .. } => ErrorCode::InvalidNodeIndex,
            MeshError::NonManifoldMesh { .. } => ErrorCode::NonManifoldMesh,
            MeshError::OpenSurface { .. } => ErrorCode::OpenSurface,
            MeshError::DegenerateInput { .. } => ErrorCode::DegenerateInput,
            MeshError::BoundaryRecovery { .. } => ErrorCode::BoundaryRecovery,
            MeshError::IoWrite { .. } => ErrorCode::IoWrite,
        }
    }

    pub(crate) fn invalid_argument(name: &'static str, details: impl Into<String>) -> Self {
        MeshError::InvalidArgument {
            name,
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let err = MeshError::OpenSurface { open_edges: 4 };
        assert_eq!(err.code(), ErrorCode::OpenSurface);
        assert_eq!(err.code().as_str(), "VMESH-2202");
    }

    #[test]
    fn test_error_display() {
        let err = MeshError::InvalidNodeIndex {
            element_index: 3,
            node_index: 42,
            node_count: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("element 3"));
        assert!(msg.contains("node 42"));
        assert!(msg.contains("10 nodes"));
    }
}
