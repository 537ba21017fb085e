//! volmesh tetmesh command - the full meshing pipeline.
//!
//! Builds a structured tetrahedral grid of the box, extracts its boundary
//! surface, remeshes the enclosed volume with the Delaunay tetrahedral
//! mesher, and writes the result as a Gmsh `.msh` file.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use volmesh::tetmesher::{generate, TetMesherParams};
use volmesh::{extract_boundary, structured_mesh, validate_mesh, HexSplit, Hexahedron};

use crate::Cli;

#[allow(clippy::too_many_arguments)]
pub fn run(
    output: &Path,
    min: &[f64],
    max: &[f64],
    nu: usize,
    nv: usize,
    nw: usize,
    max_size: f64,
    quality: f64,
    tolerance: f64,
    budget: usize,
    cli: &Cli,
) -> Result<()> {
    let (min, max) = super::parse_box(min, max)?;
    let domain = Hexahedron::axis_aligned(min, max);

    let grid = structured_mesh(&domain, nu, nv, nw, HexSplit::Tetrahedra)
        .context("failed to generate the seed grid")?;
    let surface =
        extract_boundary(&grid, tolerance).context("failed to extract the boundary surface")?;

    let params = TetMesherParams {
        element_budget: budget,
        ..TetMesherParams::new(max_size, quality, tolerance)
    };
    let result = generate(&surface, &params).context("tetrahedral meshing failed")?;

    if !cli.quiet {
        println!("{}", "Tetrahedral Mesh".bold().underline());
        println!(
            "  {}: {} boundary nodes, {} interior points",
            "Input".cyan(),
            result.boundary_nodes,
            result.interior_points
        );
        println!(
            "  {}: {} edge removals, {} Steiner splits, {} refinement passes",
            "Recovery".cyan(),
            result.edge_removals,
            result.steiner_splits,
            result.refine_passes
        );
        if result.violations_remaining > 0 {
            println!(
                "  {}: {} size/quality violations left (budget reached)",
                "Warning".yellow(),
                result.violations_remaining
            );
        }
        print!("{}", validate_mesh(&result.mesh, tolerance));
    }

    super::write_msh_file(&result.mesh, output)?;
    if !cli.quiet {
        println!("  {}: {}", "Wrote".green(), output.display());
    }
    Ok(())
}
