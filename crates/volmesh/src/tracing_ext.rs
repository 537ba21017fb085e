//! Tracing helpers for mesh operations.
//!
//! Enable output by initializing a subscriber in the application:
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//!
//! // Set RUST_LOG=volmesh=debug for detailed output.
//! ```

use std::time::Instant;
use tracing::{debug, info};

/// A performance timer that logs the operation duration on drop.
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
}

impl OperationTimer {
    /// Create a new operation timer.
    pub fn new(name: &'static str) -> Self {
        debug!(target: "volmesh::timing", operation = name, "starting operation");
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        info!(
            target: "volmesh::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", self.elapsed_ms()),
            "operation completed"
        );
    }
}

/// Log the current state of a mesh at debug level.
pub fn log_mesh_stats(mesh: &crate::Mesh, context: &str) {
    let (min, max) = mesh.bounds().unwrap_or_default();
    let dims = max - min;
    debug!(
        target: "volmesh::mesh_state",
        context = context,
        nodes = mesh.node_count(),
        elements = mesh.element_count(),
        dimensions = format!("{:.3} x {:.3} x {:.3}", dims.x, dims.y, dims.z),
        "mesh state"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::new("test_operation");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.elapsed_ms() >= 5.0);
    }

    #[test]
    fn test_log_mesh_stats_empty_mesh() {
        // Must not panic on an empty mesh.
        log_mesh_stats(&crate::Mesh::new(), "test");
    }
}
