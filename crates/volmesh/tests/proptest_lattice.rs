//! Property-based tests for the structured mesher.
//!
//! Run with: cargo test -p volmesh -- proptest

use nalgebra::Point3;
use proptest::prelude::*;
use volmesh::{extract_boundary, structured_mesh, validate_mesh, ElementKind, HexSplit, Hexahedron};

fn arb_box() -> impl Strategy<Value = (Point3<f64>, Point3<f64>)> {
    (
        prop::array::uniform3(-10.0..10.0f64),
        prop::array::uniform3(0.1..10.0f64),
    )
        .prop_map(|([x, y, z], [dx, dy, dz])| {
            (
                Point3::new(x, y, z),
                Point3::new(x + dx, y + dy, z + dz),
            )
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_hex_grid_counts(
        (min, max) in arb_box(),
        nu in 1usize..=4,
        nv in 1usize..=4,
        nw in 1usize..=4,
    ) {
        let domain = Hexahedron::axis_aligned(min, max);
        let mesh = structured_mesh(&domain, nu, nv, nw, HexSplit::Hexahedra).unwrap();

        prop_assert_eq!(mesh.node_count(), (nu + 1) * (nv + 1) * (nw + 1));
        prop_assert_eq!(mesh.element_count(), nu * nv * nw);

        let expected = (max.x - min.x) * (max.y - min.y) * (max.z - min.z);
        prop_assert!((mesh.volume() - expected).abs() < 1e-9 * expected.max(1.0));
    }

    #[test]
    fn prop_tet_split_fills_the_box(
        (min, max) in arb_box(),
        nu in 1usize..=4,
        nv in 1usize..=4,
        nw in 1usize..=4,
    ) {
        let domain = Hexahedron::axis_aligned(min, max);
        let mesh = structured_mesh(&domain, nu, nv, nw, HexSplit::Tetrahedra).unwrap();

        prop_assert_eq!(mesh.element_count(), 6 * nu * nv * nw);
        prop_assert_eq!(mesh.count_kind(ElementKind::Tetrahedron), mesh.element_count());

        let expected = (max.x - min.x) * (max.y - min.y) * (max.z - min.z);
        prop_assert!((mesh.volume() - expected).abs() < 1e-9 * expected.max(1.0));
    }

    #[test]
    fn prop_boundary_is_closed(
        (min, max) in arb_box(),
        nu in 1usize..=4,
        nv in 1usize..=4,
        nw in 1usize..=4,
        tets in any::<bool>(),
    ) {
        let domain = Hexahedron::axis_aligned(min, max);
        let split = if tets { HexSplit::Tetrahedra } else { HexSplit::Hexahedra };
        let mesh = structured_mesh(&domain, nu, nv, nw, split).unwrap();

        let surface = extract_boundary(&mesh, 1e-9).unwrap();
        let report = validate_mesh(&surface, 1e-9);
        prop_assert!(report.is_closed_surface());

        if !tets {
            // Every outer cell face becomes exactly one quad.
            prop_assert_eq!(
                surface.count_kind(ElementKind::Quad),
                2 * (nu * nv + nv * nw + nw * nu)
            );
        }

        let expected = (max.x - min.x) * (max.y - min.y) * (max.z - min.z);
        prop_assert!((surface.enclosed_volume() - expected).abs() < 1e-9 * expected.max(1.0));
    }
}
