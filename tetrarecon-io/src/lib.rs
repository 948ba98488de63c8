//! I/O operations for point clouds and meshes
//! 
//! Point files are selected by extension:
//!
//! | extension              | content                         |
//! |------------------------|---------------------------------|
//! | `.xyz`, `.pts`, `.3d`  | ASCII points                    |
//! | `.nor`                 | ASCII points with normals       |
//! | `.ply`                 | PLY points, optional normals    |
//!
//! Meshes are written as ASCII PLY.

pub mod ascii;
pub mod ply;

pub use ascii::{AsciiLayout, AsciiReader, AsciiWriter};
pub use ply::{PlyReader, PlyWriter};

use std::path::Path;
use tetrarecon_core::{Error, Point3f, Result, TriangleMesh, Vector3f};
use tracing::info;

/// Raw scan content: positions plus normals when the file carries them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanData {
    pub points: Vec<Point3f>,
    pub normals: Option<Vec<Vector3f>>,
}

impl ScanData {
    pub fn new(points: Vec<Point3f>, normals: Option<Vec<Vector3f>>) -> Self {
        Self { points, normals }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// File formats understood by [`read_points`] and [`write_points`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointFormat {
    /// Whitespace separated `x y z` rows
    Ascii,
    /// Whitespace separated `x y z nx ny nz` rows
    AsciiWithNormals,
    /// Binary little endian PLY on write, any PLY encoding on read
    Ply,
}

impl PointFormat {
    /// Detect the format from a file extension (case-insensitive)
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());
        match ext.as_deref() {
            Some("xyz") | Some("pts") | Some("3d") => Ok(PointFormat::Ascii),
            Some("nor") => Ok(PointFormat::AsciiWithNormals),
            Some("ply") => Ok(PointFormat::Ply),
            _ => Err(Error::UnsupportedFormat(format!(
                "Unsupported point cloud format: {:?}",
                path.extension()
            ))),
        }
    }
}

/// Auto-detect format and read points (and normals where present)
pub fn read_points<P: AsRef<Path>>(path: P) -> Result<ScanData> {
    let path = path.as_ref();
    let format = PointFormat::from_path(path)?;
    let data = match format {
        PointFormat::Ascii => AsciiReader::read(path, AsciiLayout::Points)?,
        PointFormat::AsciiWithNormals => AsciiReader::read(path, AsciiLayout::PointsWithNormals)?,
        PointFormat::Ply => PlyReader::read(path)?,
    };
    info!(
        "Loaded {} points from {:?} (format: {:?}, normals: {})",
        data.len(),
        path,
        format,
        data.normals.is_some()
    );
    Ok(data)
}

/// Auto-detect format and write points
///
/// `.nor` requires normals; `.ply` writes them when given; plain ASCII formats
/// ignore them.
pub fn write_points<P: AsRef<Path>>(
    path: P,
    points: &[Point3f],
    normals: Option<&[Vector3f]>,
) -> Result<()> {
    let path = path.as_ref();
    let format = PointFormat::from_path(path)?;
    if let Some(normals) = normals {
        if normals.len() != points.len() {
            return Err(Error::MalformedInput(format!(
                "{} normals supplied for {} points",
                normals.len(),
                points.len()
            )));
        }
    }
    match format {
        PointFormat::Ascii => AsciiWriter::write(path, points, None)?,
        PointFormat::AsciiWithNormals => {
            let normals = normals.ok_or_else(|| {
                Error::MalformedInput(format!("{:?} requires normals", path))
            })?;
            AsciiWriter::write(path, points, Some(normals))?
        }
        PointFormat::Ply => PlyWriter::write_points(path, points, normals)?,
    }
    info!("Saved {} points to {:?} (format: {:?})", points.len(), path, format);
    Ok(())
}

/// Write a triangle mesh; only `.ply` is supported
pub fn write_mesh<P: AsRef<Path>>(path: P, mesh: &TriangleMesh) -> Result<()> {
    let path = path.as_ref();
    match PointFormat::from_path(path)? {
        PointFormat::Ply => PlyWriter::write_mesh(path, mesh)?,
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "Meshes cannot be written as {:?}",
                other
            )))
        }
    }
    info!(
        "Saved mesh with {} vertices and {} faces to {:?}",
        mesh.vertex_count(),
        mesh.face_count(),
        path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(PointFormat::from_path("scan.xyz").unwrap(), PointFormat::Ascii);
        assert_eq!(PointFormat::from_path("scan.pts").unwrap(), PointFormat::Ascii);
        assert_eq!(PointFormat::from_path("scan.3d").unwrap(), PointFormat::Ascii);
        assert_eq!(PointFormat::from_path("scan.NOR").unwrap(), PointFormat::AsciiWithNormals);
        assert_eq!(PointFormat::from_path("dir/scan.ply").unwrap(), PointFormat::Ply);
        assert!(matches!(
            PointFormat::from_path("scan.obj"),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(PointFormat::from_path("scan").is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = read_points("/definitely/not/here.xyz");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_nor_requires_normals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.nor");
        let points = vec![Point3f::new(0.0, 0.0, 0.0)];
        assert!(matches!(
            write_points(&path, &points, None),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn test_mismatched_normals_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.ply");
        let points = vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0)];
        let normals = vec![Vector3f::z()];
        assert!(write_points(&path, &points, Some(normals.as_slice())).is_err());
    }

    #[test]
    fn test_mesh_requires_ply() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = TriangleMesh::new();
        assert!(matches!(
            write_mesh(dir.path().join("mesh.xyz"), &mesh),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
