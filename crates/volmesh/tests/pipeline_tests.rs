//! End-to-end tests of the meshing pipeline: structured grid, boundary
//! extraction, Delaunay tetrahedral remeshing, Gmsh export.

use nalgebra::Point3;
use volmesh::export::write_msh;
use volmesh::tetmesher::{generate, TetMesherParams};
use volmesh::{
    extract_boundary, structured_mesh, validate_mesh, ElementKind, HexSplit, Hexahedron,
};

fn unit_box() -> Hexahedron {
    Hexahedron::axis_aligned(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
}

#[test]
fn test_hex_grid_pipeline_counts() {
    // The reference scenario: an 8x8x8 hex grid of the unit box.
    let grid = structured_mesh(&unit_box(), 8, 8, 8, HexSplit::Hexahedra).unwrap();
    assert_eq!(grid.node_count(), 9 * 9 * 9);
    assert_eq!(grid.element_count(), 8 * 8 * 8);

    let surface = extract_boundary(&grid, 1e-3).unwrap();
    assert_eq!(surface.count_kind(ElementKind::Quad), 6 * 8 * 8);
    assert_eq!(surface.node_count(), 9 * 9 * 9 - 7 * 7 * 7);

    let report = validate_mesh(&surface, 1e-3);
    assert!(report.is_closed_surface());
}

#[test]
fn test_hex_grid_quad_boundary_remeshes_end_to_end() {
    // The reference scenario carried through the whole pipeline: the
    // 384-quad boundary of the 8x8x8 hex grid, remeshed directly.
    let grid = structured_mesh(&unit_box(), 8, 8, 8, HexSplit::Hexahedra).unwrap();
    let surface = extract_boundary(&grid, 1e-3).unwrap();
    assert_eq!(surface.count_kind(ElementKind::Quad), 384);

    let params = TetMesherParams {
        element_budget: 9999,
        ..TetMesherParams::new(0.125, 0.1, 1e-3)
    };
    let result = generate(&surface, &params).unwrap();

    assert!(
        (result.mesh.volume() - 1.0).abs() < 1e-9,
        "tet mesh volume {} must equal the box volume",
        result.mesh.volume()
    );
    assert_eq!(
        result.mesh.count_kind(ElementKind::Tetrahedron),
        result.mesh.element_count()
    );

    let boundary = extract_boundary(&result.mesh, 1e-6).unwrap();
    assert!((boundary.enclosed_volume() - 1.0).abs() < 1e-9);
    for node in boundary.nodes() {
        let on_box = [node.x, node.y, node.z]
            .iter()
            .any(|&c| c.abs() < 1e-9 || (c - 1.0).abs() < 1e-9);
        assert!(on_box, "boundary node {:?} must lie on a box face", node);
    }
}

#[test]
fn test_tet_grid_boundary_encloses_box() {
    let grid = structured_mesh(&unit_box(), 4, 4, 4, HexSplit::Tetrahedra).unwrap();
    assert_eq!(grid.element_count(), 6 * 4 * 4 * 4);
    assert!((grid.volume() - 1.0).abs() < 1e-12);

    let surface = extract_boundary(&grid, 1e-3).unwrap();
    assert!((surface.enclosed_volume() - 1.0).abs() < 1e-12);
}

#[test]
fn test_full_remeshing_pipeline() {
    // Structured tet grid -> boundary -> unstructured tet mesh, as the
    // original box workflow does.
    let grid = structured_mesh(&unit_box(), 3, 3, 3, HexSplit::Tetrahedra).unwrap();
    let surface = extract_boundary(&grid, 1e-3).unwrap();

    let params = TetMesherParams {
        element_budget: 9999,
        ..TetMesherParams::new(0.75, 0.05, 1e-3)
    };
    let result = generate(&surface, &params).unwrap();

    // The remeshed volume must fill the box exactly.
    assert!(
        (result.mesh.volume() - 1.0).abs() < 1e-9,
        "tet mesh volume {} must equal the box volume",
        result.mesh.volume()
    );
    assert_eq!(
        result.mesh.count_kind(ElementKind::Tetrahedron),
        result.mesh.element_count()
    );

    // Its boundary is closed and geometrically the box surface.
    let boundary = extract_boundary(&result.mesh, 1e-6).unwrap();
    assert!((boundary.enclosed_volume() - 1.0).abs() < 1e-9);
    for node in boundary.nodes() {
        let on_box = [node.x, node.y, node.z]
            .iter()
            .any(|&c| c.abs() < 1e-9 || (c - 1.0).abs() < 1e-9);
        assert!(on_box, "boundary node {:?} must lie on a box face", node);
    }
}

#[test]
fn test_pipeline_on_skewed_domain() {
    // A non-axis-aligned hexahedron exercises the trilinear map and the
    // orientation handling end to end.
    let mut corners = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(2.0, 0.1, 0.0),
        Point3::new(2.2, 1.9, 0.2),
        Point3::new(0.1, 2.0, 0.1),
        Point3::new(0.2, 0.1, 1.5),
        Point3::new(2.1, 0.0, 1.6),
        Point3::new(2.3, 2.0, 1.7),
        Point3::new(0.0, 2.1, 1.4),
    ];
    // Keep the hexahedron convex-ish but irregular.
    corners[6].z += 0.1;
    let domain = Hexahedron::from_corners(corners);

    let grid = structured_mesh(&domain, 3, 3, 3, HexSplit::Tetrahedra).unwrap();
    let grid_volume = grid.volume();
    assert!(grid_volume > 0.0);

    let surface = extract_boundary(&grid, 1e-6).unwrap();
    let result = generate(&surface, &TetMesherParams::default()).unwrap();
    assert!(
        (result.mesh.volume() - grid_volume).abs() < 1e-9 * grid_volume.max(1.0),
        "remeshed volume {} must match the grid volume {}",
        result.mesh.volume(),
        grid_volume
    );
}

#[test]
fn test_exported_msh_is_consistent() {
    let grid = structured_mesh(&unit_box(), 2, 2, 2, HexSplit::Hexahedra).unwrap();
    let mut buffer = Vec::new();
    write_msh(&grid, &mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();

    let lines: Vec<&str> = text.lines().collect();
    let nodes_at = lines.iter().position(|&l| l == "$Nodes").unwrap();
    let node_count: usize = lines[nodes_at + 1].parse().unwrap();
    assert_eq!(node_count, grid.node_count());

    let elements_at = lines.iter().position(|&l| l == "$Elements").unwrap();
    let element_count: usize = lines[elements_at + 1].parse().unwrap();
    assert_eq!(element_count, grid.element_count());

    // Hexahedra carry Gmsh type 5 and 8 one-based node ids.
    let first_element: Vec<&str> = lines[elements_at + 2].split_whitespace().collect();
    assert_eq!(first_element[1], "5");
    assert_eq!(first_element.len(), 5 + 8);
    for id in &first_element[5..] {
        let id: usize = id.parse().unwrap();
        assert!(id >= 1 && id <= node_count);
    }
}

#[test]
fn test_surface_roundtrip_through_extractor() {
    // Extracting the boundary of a surface mesh returns the surface itself
    // (2D elements are their own single face).
    let grid = structured_mesh(&unit_box(), 2, 2, 2, HexSplit::Hexahedra).unwrap();
    let surface = extract_boundary(&grid, 1e-6).unwrap();
    let again = extract_boundary(&surface, 1e-6).unwrap();
    assert_eq!(again.element_count(), surface.element_count());
    assert_eq!(again.node_count(), surface.node_count());
}
