//! Subcommand implementations.

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use nalgebra::Point3;
use tracing::info;
use volmesh::export::write_msh;
use volmesh::Mesh;

pub mod hex;
pub mod tetmesh;

/// Write a mesh to a `.msh` file. All file handling lives in the CLI; the
/// library only serializes to writers.
pub(crate) fn write_msh_file(mesh: &Mesh, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_msh(mesh, file).with_context(|| format!("failed to write {}", path.display()))?;
    info!(
        target: "volmesh_cli::export",
        path = %path.display(),
        nodes = mesh.node_count(),
        elements = mesh.element_count(),
        "wrote Gmsh mesh"
    );
    Ok(())
}

/// Turn the `--min`/`--max` triples into box corners, rejecting empty or
/// inverted boxes.
pub(crate) fn parse_box(min: &[f64], max: &[f64]) -> Result<(Point3<f64>, Point3<f64>)> {
    let min = Point3::new(min[0], min[1], min[2]);
    let max = Point3::new(max[0], max[1], max[2]);
    if !(min.x < max.x && min.y < max.y && min.z < max.z) {
        bail!(
            "box corners must satisfy min < max on every axis, got {:?} and {:?}",
            min,
            max
        );
    }
    Ok((min, max))
}
