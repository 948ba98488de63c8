//! ASCII point formats (`.xyz`, `.pts`, `.3d`, `.nor`)
//!
//! One point per row, columns separated by whitespace or commas. Rows starting
//! with `#` are comments. A leading row holding a single integer is taken as a
//! point count and skipped. Columns beyond the ones the layout needs (intensity,
//! color) are ignored.

use crate::ScanData;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tetrarecon_core::{Error, Point3f, Result, Vector3f};
use tracing::debug;

/// Column layout of an ASCII point file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsciiLayout {
    /// `x y z`
    Points,
    /// `x y z nx ny nz`
    PointsWithNormals,
}

impl AsciiLayout {
    /// Minimum number of numeric columns per row
    pub fn columns(&self) -> usize {
        match self {
            AsciiLayout::Points => 3,
            AsciiLayout::PointsWithNormals => 6,
        }
    }
}

/// ASCII point reader
pub struct AsciiReader;

impl AsciiReader {
    /// Read an ASCII point file from disk
    pub fn read<P: AsRef<Path>>(path: P, layout: AsciiLayout) -> Result<ScanData> {
        let file = File::open(path)?;
        Self::parse(BufReader::new(file), layout)
    }

    /// Parse ASCII point rows from any buffered reader
    pub fn parse<R: BufRead>(reader: R, layout: AsciiLayout) -> Result<ScanData> {
        let mut points = Vec::new();
        let mut normals = Vec::new();
        let mut skipped_count_line = false;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let tokens: Vec<&str> = split_columns(trimmed).collect();
            if points.is_empty() && !skipped_count_line && tokens.len() == 1 {
                if tokens[0].parse::<usize>().is_ok() {
                    skipped_count_line = true;
                    continue;
                }
            }

            let values = parse_row(&tokens, layout.columns(), line_num + 1)?;
            points.push(Point3f::new(values[0], values[1], values[2]));
            if layout == AsciiLayout::PointsWithNormals {
                normals.push(Vector3f::new(values[3], values[4], values[5]));
            }
        }

        debug!("Parsed {} ASCII rows ({:?})", points.len(), layout);
        let normals = match layout {
            AsciiLayout::Points => None,
            AsciiLayout::PointsWithNormals => Some(normals),
        };
        Ok(ScanData::new(points, normals))
    }
}

/// ASCII point writer
pub struct AsciiWriter;

impl AsciiWriter {
    /// Write points, and normals when given, one row per point
    pub fn write<P: AsRef<Path>>(
        path: P,
        points: &[Point3f],
        normals: Option<&[Vector3f]>,
    ) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(&mut writer, points, normals)?;
        writer.flush()?;
        Ok(())
    }

    /// Write rows to any writer
    pub fn write_to<W: Write>(
        writer: &mut W,
        points: &[Point3f],
        normals: Option<&[Vector3f]>,
    ) -> Result<()> {
        match normals {
            Some(normals) => {
                for (p, n) in points.iter().zip(normals) {
                    writeln!(writer, "{} {} {} {} {} {}", p.x, p.y, p.z, n.x, n.y, n.z)?;
                }
            }
            None => {
                for p in points {
                    writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
                }
            }
        }
        Ok(())
    }
}

fn split_columns(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
}

fn parse_row(tokens: &[&str], needed: usize, line_num: usize) -> Result<Vec<f32>> {
    if tokens.len() < needed {
        return Err(Error::MalformedInput(format!(
            "line {}: expected at least {} columns, found {}",
            line_num,
            needed,
            tokens.len()
        )));
    }
    tokens[..needed]
        .iter()
        .map(|t| {
            t.parse::<f32>().map_err(|e| {
                Error::MalformedInput(format!("line {}: invalid number '{}': {}", line_num, t, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    #[test]
    fn test_parse_points_with_comments_and_count() {
        let input = "# scanner export\n3\n0 0 0\n1.5,2.5,3.5\n\n-1 -2 -3 42 7\n";
        let data = AsciiReader::parse(Cursor::new(input), AsciiLayout::Points).unwrap();
        assert_eq!(data.len(), 3);
        assert!(data.normals.is_none());
        assert_relative_eq!(data.points[1].y, 2.5);
        assert_relative_eq!(data.points[2].z, -3.0);
    }

    #[test]
    fn test_parse_points_with_normals() {
        let input = "0 0 0 0 0 1\n1 0 0 0 1 0\n";
        let data = AsciiReader::parse(Cursor::new(input), AsciiLayout::PointsWithNormals).unwrap();
        let normals = data.normals.unwrap();
        assert_eq!(normals.len(), 2);
        assert_eq!(normals[1], Vector3f::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_short_row_is_malformed() {
        let input = "0 0 0\n1 2\n";
        let err = AsciiReader::parse(Cursor::new(input), AsciiLayout::Points).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(ref m) if m.contains("line 2")));

        let input = "0 0 0\n";
        assert!(AsciiReader::parse(Cursor::new(input), AsciiLayout::PointsWithNormals).is_err());
    }

    #[test]
    fn test_bad_number_is_malformed() {
        let input = "0 zero 0\n";
        assert!(matches!(
            AsciiReader::parse(Cursor::new(input), AsciiLayout::Points),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn test_write_then_parse() {
        let points = vec![Point3f::new(0.25, -1.0, 3.0), Point3f::new(4.0, 5.0, 6.5)];
        let normals = vec![Vector3f::x(), Vector3f::z()];
        let mut buffer = Vec::new();
        AsciiWriter::write_to(&mut buffer, &points, Some(normals.as_slice())).unwrap();

        let data =
            AsciiReader::parse(Cursor::new(buffer), AsciiLayout::PointsWithNormals).unwrap();
        assert_eq!(data.points, points);
        assert_eq!(data.normals.unwrap(), normals);
    }
}
