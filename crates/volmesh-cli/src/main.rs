//! volmesh-cli: Command-line driver for the volmesh meshing pipeline.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=volmesh=info` - Basic operation logging
//! - `RUST_LOG=volmesh=debug` - Detailed progress logging
//! - `RUST_LOG=volmesh::timing=debug` - Performance timing
//! - `RUST_LOG=debug` - All debug output
//!
//! # Example
//!
//! ```bash
//! # Structured 8x8x8 hex grid of the unit box
//! volmesh hex -o box.msh
//!
//! # The full pipeline: tet grid, boundary extraction, tet remeshing
//! RUST_LOG=volmesh=info volmesh tetmesh --max-size 0.125 -o box.msh
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{hex, tetmesh};

/// volmesh - structured and unstructured volume mesh generation.
///
/// Generate hexahedral grids and Delaunay tetrahedral meshes of box
/// domains and write them as Gmsh `.msh` files.
#[derive(Parser)]
#[command(name = "volmesh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a structured mesh of an axis-aligned box
    Hex {
        /// Output .msh file path
        #[arg(short, long)]
        output: PathBuf,

        /// Minimum box corner (x y z)
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"],
              default_values_t = [0.0, 0.0, 0.0], allow_negative_numbers = true)]
        min: Vec<f64>,

        /// Maximum box corner (x y z)
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"],
              default_values_t = [1.0, 1.0, 1.0], allow_negative_numbers = true)]
        max: Vec<f64>,

        /// Subdivisions along the u axis
        #[arg(long, default_value = "8")]
        nu: usize,

        /// Subdivisions along the v axis
        #[arg(long, default_value = "8")]
        nv: usize,

        /// Subdivisions along the w axis
        #[arg(long, default_value = "8")]
        nw: usize,

        /// Split each cell into six tetrahedra instead of keeping hexahedra
        #[arg(long)]
        tets: bool,
    },

    /// Run the full pipeline: structured tet grid, boundary extraction,
    /// Delaunay tetrahedral remeshing of the enclosed volume
    Tetmesh {
        /// Output .msh file path
        #[arg(short, long)]
        output: PathBuf,

        /// Minimum box corner (x y z)
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"],
              default_values_t = [0.0, 0.0, 0.0], allow_negative_numbers = true)]
        min: Vec<f64>,

        /// Maximum box corner (x y z)
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"],
              default_values_t = [1.0, 1.0, 1.0], allow_negative_numbers = true)]
        max: Vec<f64>,

        /// Subdivisions of the seed grid along each axis
        #[arg(long, default_value = "8")]
        nu: usize,

        #[arg(long, default_value = "8")]
        nv: usize,

        #[arg(long, default_value = "8")]
        nw: usize,

        /// Target maximum tetrahedron edge length
        #[arg(long, default_value = "0.125")]
        max_size: f64,

        /// Minimum shape quality in [0, 1)
        #[arg(long, default_value = "0.1")]
        quality: f64,

        /// Geometric tolerance for welding and boundary checks
        #[arg(long, default_value = "1e-3")]
        tolerance: f64,

        /// Element budget for the refinement stage
        #[arg(long, default_value = "9999")]
        budget: usize,
    },
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over the -v flags.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "volmesh=info",
            2 => "volmesh=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Hex {
            output,
            min,
            max,
            nu,
            nv,
            nw,
            tets,
        } => hex::run(output, min, max, *nu, *nv, *nw, *tets, &cli),
        Commands::Tetmesh {
            output,
            min,
            max,
            nu,
            nv,
            nw,
            max_size,
            quality,
            tolerance,
            budget,
        } => tetmesh::run(
            output, min, max, *nu, *nv, *nw, *max_size, *quality, *tolerance, *budget, &cli,
        ),
    };

    if let Err(e) = &result {
        if !cli.quiet {
            let mesh_err = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<volmesh::MeshError>());
            if let Some(mesh_err) = mesh_err {
                eprintln!("{}: {}", "Error".red().bold(), mesh_err);
                eprintln!("  {}: {}", "Code".cyan(), mesh_err.code().as_str());
                if let Some(help) = miette::Diagnostic::help(mesh_err) {
                    eprintln!("  {}: {}", "Help".green(), help);
                }
            } else {
                eprintln!("{}: {}", "Error".red().bold(), e);
                for cause in e.chain().skip(1) {
                    eprintln!("  {}: {}", "Caused by".yellow(), cause);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
