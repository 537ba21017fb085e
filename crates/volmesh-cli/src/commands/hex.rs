//! volmesh hex command - structured mesh of an axis-aligned box.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use volmesh::{structured_mesh, validate_mesh, HexSplit, Hexahedron};

use crate::Cli;

#[allow(clippy::too_many_arguments)]
pub fn run(
    output: &Path,
    min: &[f64],
    max: &[f64],
    nu: usize,
    nv: usize,
    nw: usize,
    tets: bool,
    cli: &Cli,
) -> Result<()> {
    let (min, max) = super::parse_box(min, max)?;
    let domain = Hexahedron::axis_aligned(min, max);
    let split = if tets {
        HexSplit::Tetrahedra
    } else {
        HexSplit::Hexahedra
    };

    let mesh = structured_mesh(&domain, nu, nv, nw, split)
        .context("failed to generate the structured mesh")?;

    if !cli.quiet {
        println!("{}", "Structured Mesh".bold().underline());
        println!("  {}: {}x{}x{} cells", "Grid".cyan(), nu, nv, nw);
        print!("{}", validate_mesh(&mesh, 1e-9));
    }

    super::write_msh_file(&mesh, output)?;
    if !cli.quiet {
        println!("  {}: {}", "Wrote".green(), output.display());
    }
    Ok(())
}
