//! Gmsh MSH 2.2 (ASCII) export.
//!
//! The 2.2 format is the lowest common denominator read by every Gmsh
//! release and most downstream solvers. Nodes and elements are written
//! 1-based; elements carry a physical and an elementary tag, grouped by
//! element kind, with matching `$PhysicalNames` entries for every kind
//! present in the mesh. Serialization targets any [`io::Write`](Write);
//! opening files is the caller's concern.

use std::io::{BufWriter, Write};

use crate::error::{MeshError, MeshResult};
use crate::mesh::{ElementKind, Mesh};

/// Gmsh element type id for each shape.
fn gmsh_type(kind: ElementKind) -> u32 {
    match kind {
        ElementKind::Triangle => 2,
        ElementKind::Quad => 3,
        ElementKind::Tetrahedron => 4,
        ElementKind::Hexahedron => 5,
    }
}

/// Write a mesh to a writer in Gmsh MSH 2.2 ASCII format.
pub fn write_msh<W: Write>(mesh: &Mesh, writer: W) -> MeshResult<()> {
    let mut out = BufWriter::new(writer);
    let io_err = |source: std::io::Error| MeshError::IoWrite { source };

    writeln!(out, "$MeshFormat").map_err(io_err)?;
    writeln!(out, "2.2 0 8").map_err(io_err)?;
    writeln!(out, "$EndMeshFormat").map_err(io_err)?;

    // One physical group per element kind, numbered in kind order.
    const KINDS: [ElementKind; 4] = [
        ElementKind::Triangle,
        ElementKind::Quad,
        ElementKind::Tetrahedron,
        ElementKind::Hexahedron,
    ];
    let mut group_of = [0u32; 4];
    let mut groups: Vec<ElementKind> = Vec::new();
    for kind in KINDS {
        if mesh.count_kind(kind) > 0 {
            groups.push(kind);
            group_of[kind as usize] = groups.len() as u32;
        }
    }
    if !groups.is_empty() {
        writeln!(out, "$PhysicalNames").map_err(io_err)?;
        writeln!(out, "{}", groups.len()).map_err(io_err)?;
        for (index, kind) in groups.iter().enumerate() {
            writeln!(
                out,
                "{} {} \"{}\"",
                kind.dimension(),
                index + 1,
                kind.name()
            )
            .map_err(io_err)?;
        }
        writeln!(out, "$EndPhysicalNames").map_err(io_err)?;
    }

    writeln!(out, "$Nodes").map_err(io_err)?;
    writeln!(out, "{}", mesh.node_count()).map_err(io_err)?;
    for (index, node) in mesh.nodes().iter().enumerate() {
        writeln!(out, "{} {} {} {}", index + 1, node.x, node.y, node.z).map_err(io_err)?;
    }
    writeln!(out, "$EndNodes").map_err(io_err)?;

    writeln!(out, "$Elements").map_err(io_err)?;
    writeln!(out, "{}", mesh.element_count()).map_err(io_err)?;
    for (index, element) in mesh.elements().iter().enumerate() {
        let kind = element.kind();
        let group = group_of[kind as usize];
        write!(out, "{} {} 2 {group} {group}", index + 1, gmsh_type(kind)).map_err(io_err)?;
        for &node in element.nodes() {
            write!(out, " {}", node + 1).map_err(io_err)?;
        }
        writeln!(out).map_err(io_err)?;
    }
    writeln!(out, "$EndElements").map_err(io_err)?;

    out.flush().map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Element;
    use nalgebra::Point3;

    fn mixed_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_node(Point3::new(0.0, 0.0, 0.0));
        mesh.add_node(Point3::new(1.0, 0.0, 0.0));
        mesh.add_node(Point3::new(0.0, 1.0, 0.0));
        mesh.add_node(Point3::new(0.0, 0.0, 1.0));
        mesh.add_element(Element::triangle([0, 1, 2])).unwrap();
        mesh.add_element(Element::tetrahedron([0, 1, 2, 3])).unwrap();
        mesh
    }

    #[test]
    fn test_msh_structure() {
        let mesh = mixed_mesh();
        let mut buffer = Vec::new();
        write_msh(&mesh, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "$MeshFormat");
        assert_eq!(lines[1], "2.2 0 8");
        assert_eq!(lines[2], "$EndMeshFormat");

        let nodes_at = lines.iter().position(|&l| l == "$Nodes").unwrap();
        assert_eq!(lines[nodes_at + 1], "4");
        assert_eq!(lines[nodes_at + 2], "1 0 0 0");
        assert_eq!(lines[nodes_at + 6], "$EndNodes");

        let elements_at = lines.iter().position(|&l| l == "$Elements").unwrap();
        assert_eq!(lines[elements_at + 1], "2");
        // id type tag-count physical elementary nodes...
        assert_eq!(lines[elements_at + 2], "1 2 2 1 1 1 2 3");
        assert_eq!(lines[elements_at + 3], "2 4 2 2 2 1 2 3 4");
        assert_eq!(lines[elements_at + 4], "$EndElements");
    }

    #[test]
    fn test_physical_names_cover_kinds() {
        let mesh = mixed_mesh();
        let mut buffer = Vec::new();
        write_msh(&mesh, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("$PhysicalNames"));
        assert!(text.contains("2 1 \"triangle\""));
        assert!(text.contains("3 2 \"tetrahedron\""));
    }

    #[test]
    fn test_empty_mesh_has_no_physical_names() {
        let mesh = Mesh::new();
        let mut buffer = Vec::new();
        write_msh(&mesh, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(!text.contains("$PhysicalNames"));
        assert!(text.contains("$Nodes\n0\n$EndNodes"));
    }
}
