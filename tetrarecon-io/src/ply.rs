//! PLY format support

use crate::ScanData;
use ply_rs::{
    parser::Parser,
    ply::{
        Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
        ScalarType,
    },
    writer::Writer,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tetrarecon_core::{Error, Point3f, Result, TriangleMesh, Vector3f};

pub struct PlyReader;
pub struct PlyWriter;

impl PlyReader {
    /// Read vertex positions, plus normals when every vertex has `nx ny nz`
    ///
    /// Elements after `vertex` are never parsed.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<ScanData> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let corrupt = |e: std::io::Error| {
            Error::MalformedInput(format!("{:?}: corrupt PLY payload: {}", path.as_ref(), e))
        };

        let parser = Parser::<DefaultElement>::new();
        let header = parser.read_header(&mut reader).map_err(corrupt)?;

        // Payloads are laid out in header order
        let mut vertices = None;
        for (name, element) in &header.elements {
            let payload = parser
                .read_payload_for_element(&mut reader, element, &header)
                .map_err(corrupt)?;
            if name == "vertex" {
                vertices = Some(payload);
                break;
            }
        }
        let vertices = vertices
            .ok_or_else(|| Error::MalformedInput("PLY file has no vertex element".to_string()))?;

        let mut points = Vec::with_capacity(vertices.len());
        let mut normals = Vec::with_capacity(vertices.len());
        let mut has_normals = true;

        for vertex in &vertices {
            let x = extract_property_value(vertex, "x")?;
            let y = extract_property_value(vertex, "y")?;
            let z = extract_property_value(vertex, "z")?;
            points.push(Point3f::new(x, y, z));

            if has_normals {
                match (
                    extract_property_value(vertex, "nx"),
                    extract_property_value(vertex, "ny"),
                    extract_property_value(vertex, "nz"),
                ) {
                    (Ok(nx), Ok(ny), Ok(nz)) => normals.push(Vector3f::new(nx, ny, nz)),
                    _ => has_normals = false,
                }
            }
        }

        let normals = if has_normals && !normals.is_empty() {
            Some(normals)
        } else {
            None
        };
        Ok(ScanData::new(points, normals))
    }
}

impl PlyWriter {
    /// Write points (and normals) as binary little endian PLY
    pub fn write_points<P: AsRef<Path>>(
        path: P,
        points: &[Point3f],
        normals: Option<&[Vector3f]>,
    ) -> Result<()> {
        let mut ply = binary_ply();
        ply.header
            .elements
            .add(vertex_element_def(points.len(), normals.is_some()));
        ply.payload
            .insert("vertex".to_string(), vertex_payload(points, normals));

        write_ply(path, &mut ply)
    }

    /// Write a triangle mesh as ASCII PLY
    ///
    /// ply-rs writes the element count as every binary list length, so
    /// face lists only survive the ASCII encoding.
    pub fn write_mesh<P: AsRef<Path>>(path: P, mesh: &TriangleMesh) -> Result<()> {
        let mut ply = Ply::<DefaultElement>::new();
        ply.header.encoding = Encoding::Ascii;
        let normals = mesh
            .normals
            .as_deref()
            .filter(|n| n.len() == mesh.vertices.len());

        ply.header
            .elements
            .add(vertex_element_def(mesh.vertices.len(), normals.is_some()));

        let mut face_element = ElementDef::new("face".to_string());
        face_element.count = mesh.faces.len();
        face_element.properties.add(PropertyDef::new(
            "vertex_indices".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::Int),
        ));
        ply.header.elements.add(face_element);

        ply.payload
            .insert("vertex".to_string(), vertex_payload(&mesh.vertices, normals));

        let mut faces = Vec::with_capacity(mesh.faces.len());
        for face in &mesh.faces {
            let indices = face
                .iter()
                .map(|&i| {
                    i32::try_from(i).map_err(|_| {
                        Error::MalformedInput(format!("vertex index {} exceeds PLY int range", i))
                    })
                })
                .collect::<Result<Vec<i32>>>()?;
            let mut element = DefaultElement::new();
            element.insert("vertex_indices".to_string(), Property::ListInt(indices));
            faces.push(element);
        }
        ply.payload.insert("face".to_string(), faces);

        write_ply(path, &mut ply)
    }
}

fn binary_ply() -> Ply<DefaultElement> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::BinaryLittleEndian;
    ply
}

fn write_ply<P: AsRef<Path>>(path: P, ply: &mut Ply<DefaultElement>) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    Writer::new().write_ply(&mut writer, ply)?;
    writer.flush()?;
    Ok(())
}

fn vertex_element_def(count: usize, with_normals: bool) -> ElementDef {
    let mut element = ElementDef::new("vertex".to_string());
    element.count = count;
    let mut names = vec!["x", "y", "z"];
    if with_normals {
        names.extend(["nx", "ny", "nz"]);
    }
    for name in names {
        element.properties.add(PropertyDef::new(
            name.to_string(),
            PropertyType::Scalar(ScalarType::Float),
        ));
    }
    element
}

fn vertex_payload(points: &[Point3f], normals: Option<&[Vector3f]>) -> Vec<DefaultElement> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut element = DefaultElement::new();
            element.insert("x".to_string(), Property::Float(p.x));
            element.insert("y".to_string(), Property::Float(p.y));
            element.insert("z".to_string(), Property::Float(p.z));
            if let Some(n) = normals.and_then(|n| n.get(i)) {
                element.insert("nx".to_string(), Property::Float(n.x));
                element.insert("ny".to_string(), Property::Float(n.y));
                element.insert("nz".to_string(), Property::Float(n.z));
            }
            element
        })
        .collect()
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        Some(Property::Short(val)) => Ok(*val as f32),
        Some(Property::UShort(val)) => Ok(*val as f32),
        _ => Err(Error::MalformedInput(format!(
            "Property '{}' not found or invalid type",
            name
        ))),
    }
}
