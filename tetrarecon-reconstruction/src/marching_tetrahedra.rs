//! Marching tetrahedra isosurface extraction
//!
//! Every grid cell is split into the six tetrahedra of
//! [`TETRAEDER_DEFINITION_TABLE`] and each tetrahedron is triangulated from its
//! 16-way configuration. Corners at or below the iso level are inside.
//!
//! Vertices are shared between cells through [`VertexKey`]s. A crossing on a
//! lattice edge is named by the smallest `(cube, edge)` pair under which any
//! cell touching that edge knows it, so every cell derives the same key. A
//! crossing that lands exactly on a lattice corner is named by the corner.
//! Positions are always interpolated from the lexicographically smaller
//! endpoint, which makes them bit-identical no matter which cell computes them.

use crate::grid::VolumetricGrid;
use crate::tetraeder_tables::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tetrarecon_algorithms::parallel::parallel_map;
use tetrarecon_core::{Error, Point3f, Result, TriangleMesh};
use tracing::{debug, info};

/// Canonical name of a lattice edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    /// Lattice index of the naming cube
    pub cube: [i64; 3],
    /// Cube edge id in `0..19`
    pub edge: u8,
}

impl EdgeKey {
    /// Smallest name of `edge` among `cube` and the neighbors sharing it
    pub fn canonical(cube: [i64; 3], edge: usize) -> Self {
        let mut key = EdgeKey {
            cube,
            edge: edge as u8,
        };
        for k in 0..3 {
            let neighbor = TETRAEDER_NEIGHBOR_TABLE[edge][k];
            let shared = TETRAEDER_VERTEX_NB_TABLE[edge][k];
            if neighbor < 0 || shared < 0 {
                break;
            }
            let offset = neighbor_offset(neighbor as usize);
            let candidate = EdgeKey {
                cube: [cube[0] + offset[0], cube[1] + offset[1], cube[2] + offset[2]],
                edge: shared as u8,
            };
            key = key.min(candidate);
        }
        key
    }
}

/// Identity of an output vertex shared by every cell that produces it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexKey {
    /// The surface passes exactly through a lattice corner
    Corner([i64; 3]),
    /// The surface crosses a lattice edge strictly between its corners
    Edge(EdgeKey),
}

/// Configuration for marching tetrahedra
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Isosurface level (scalar value to extract)
    pub iso_level: f32,
    /// Whether to compute area-weighted vertex normals
    pub compute_normals: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            iso_level: 0.0,
            compute_normals: true,
        }
    }
}

impl ExtractionConfig {
    pub fn with_iso_level(mut self, iso_level: f32) -> Self {
        self.iso_level = iso_level;
        self
    }

    pub fn with_compute_normals(mut self, compute_normals: bool) -> Self {
        self.compute_normals = compute_normals;
        self
    }
}

/// Counters collected during extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Cells with eight finite corner values
    pub cells_visited: usize,
    /// Cells skipped because a corner value is not finite
    pub cells_skipped: usize,
    /// Tetrahedra with at least one triangle
    pub active_tetrahedra: usize,
    /// Triangles in the output mesh
    pub triangles: usize,
    /// Triangles dropped because two of their vertices coincide
    pub degenerate_triangles: usize,
    /// Vertices in the output mesh
    pub vertices: usize,
    /// Vertex lookups answered by a vertex another cell already created
    pub vertex_reuses: usize,
}

/// Triangles of one cell over cell-local vertices
#[derive(Debug, Clone, Default)]
pub struct CellPolygons {
    /// Cell-local vertices, each listed once
    pub vertices: Vec<(VertexKey, Point3f)>,
    /// Triangles indexing into `vertices`
    pub triangles: Vec<[usize; 3]>,
    pub active_tetrahedra: usize,
    pub degenerate_triangles: usize,
}

impl CellPolygons {
    fn vertex(&mut self, key: VertexKey, position: Point3f) -> usize {
        match self.vertices.iter().position(|(k, _)| *k == key) {
            Some(idx) => idx,
            None => {
                self.vertices.push((key, position));
                self.vertices.len() - 1
            }
        }
    }
}

fn lattice_corner(cube: [i64; 3], corner: usize) -> [i64; 3] {
    let o = CUBE_CORNER_OFFSETS[corner];
    [cube[0] + o[0], cube[1] + o[1], cube[2] + o[2]]
}

/// Triangulate one cube cell
///
/// `values` and `positions` follow the cube corner numbering; `cube` is the
/// cell's lattice index. Inside corners are those with `value <= iso_level`.
pub fn polygonize_cell(
    cube: [i64; 3],
    values: &[f32; 8],
    positions: &[Point3f; 8],
    iso_level: f32,
) -> CellPolygons {
    let mut cell = CellPolygons::default();

    for (t, tet) in TETRAEDER_DEFINITION_TABLE.iter().enumerate() {
        let configuration = tetrahedron_configuration(tet.map(|c| values[c]), iso_level);
        let mut active = false;

        for triangle in configuration_triangles(configuration) {
            active = true;
            let corners = triangle.map(|local_edge| {
                let [a, b] = TETRAEDER_EDGES[local_edge];
                let (ca, cb) = (tet[a], tet[b]);
                let cube_edge = TETRAEDER_INTERSECTION_TABLE[t][local_edge];
                let (key, position) = crossing(cube, cube_edge, ca, cb, values, positions, iso_level);
                cell.vertex(key, position)
            });

            if corners[0] == corners[1] || corners[1] == corners[2] || corners[0] == corners[2] {
                cell.degenerate_triangles += 1;
            } else {
                cell.triangles.push(corners);
            }
        }
        cell.active_tetrahedra += active as usize;
    }
    cell
}

/// Key and position of the iso crossing on the edge between two cube corners
fn crossing(
    cube: [i64; 3],
    cube_edge: usize,
    ca: usize,
    cb: usize,
    values: &[f32; 8],
    positions: &[Point3f; 8],
    iso_level: f32,
) -> (VertexKey, Point3f) {
    let (la, lb) = (lattice_corner(cube, ca), lattice_corner(cube, cb));
    let (lo, hi, llo, lhi) = if la <= lb { (ca, cb, la, lb) } else { (cb, ca, lb, la) };

    let denominator = values[hi] - values[lo];
    let t = if denominator != 0.0 {
        (iso_level - values[lo]) / denominator
    } else {
        0.0
    };

    if t <= 0.0 {
        (VertexKey::Corner(llo), positions[lo])
    } else if t >= 1.0 {
        (VertexKey::Corner(lhi), positions[hi])
    } else {
        let position = positions[lo] + (positions[hi] - positions[lo]) * t;
        (VertexKey::Edge(EdgeKey::canonical(cube, cube_edge)), position)
    }
}

/// Marching tetrahedra extractor
pub struct MarchingTetrahedra {
    config: ExtractionConfig,
}

impl MarchingTetrahedra {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Corner values and world positions of a cell, `None` when a value is not finite
    fn cell_corners(&self, grid: &VolumetricGrid, cell: [usize; 3]) -> Option<([f32; 8], [Point3f; 8])> {
        let mut values = [0.0f32; 8];
        let mut positions = [Point3f::origin(); 8];
        for (corner, offset) in CUBE_CORNER_OFFSETS.iter().enumerate() {
            let (x, y, z) = (
                cell[0] + offset[0] as usize,
                cell[1] + offset[1] as usize,
                cell[2] + offset[2] as usize,
            );
            let value = grid.get_value(x, y, z)?;
            if !value.is_finite() {
                return None;
            }
            values[corner] = value;
            positions[corner] = grid.grid_to_world(x, y, z);
        }
        Some((values, positions))
    }

    /// Extract the isosurface of a grid
    ///
    /// Cells are triangulated in parallel and merged in cell order, so vertex
    /// and face indices do not depend on scheduling. An empty mesh is not an
    /// error here.
    pub fn extract(&self, grid: &VolumetricGrid) -> Result<(TriangleMesh, ExtractionReport)> {
        let start = Instant::now();
        let iso_level = self.config.iso_level;
        if !iso_level.is_finite() {
            return Err(Error::InvalidConfig(format!("iso level {} is not finite", iso_level)));
        }

        let cells = grid.cells();
        let cell_results: Vec<Option<CellPolygons>> = parallel_map(&cells, |&cell| {
            let (values, positions) = self.cell_corners(grid, cell)?;
            let cube = cell.map(|c| c as i64);
            Some(polygonize_cell(cube, &values, &positions, iso_level))
        });
        debug!("Triangulated {} cells in {:?}", cells.len(), start.elapsed());

        let mut report = ExtractionReport::default();
        let mut vertex_index: HashMap<VertexKey, usize> = HashMap::new();
        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        for result in cell_results {
            let Some(cell) = result else {
                report.cells_skipped += 1;
                continue;
            };
            report.cells_visited += 1;
            report.active_tetrahedra += cell.active_tetrahedra;
            report.degenerate_triangles += cell.degenerate_triangles;

            let known = vertices.len();
            let global: Vec<usize> = cell
                .vertices
                .iter()
                .map(|(key, position)| {
                    *vertex_index.entry(*key).or_insert_with(|| {
                        vertices.push(*position);
                        vertices.len() - 1
                    })
                })
                .collect();
            report.vertex_reuses += cell.vertices.len() - (vertices.len() - known);

            faces.extend(cell.triangles.iter().map(|tri| tri.map(|local| global[local])));
        }

        report.vertices = vertices.len();
        report.triangles = faces.len();

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if self.config.compute_normals && !mesh.is_empty() {
            mesh.compute_vertex_normals();
        }

        info!(
            "Marching tetrahedra: {} vertices, {} triangles ({} cells, {} skipped, {} degenerate dropped) in {:?}",
            report.vertices,
            report.triangles,
            report.cells_visited,
            report.cells_skipped,
            report.degenerate_triangles,
            start.elapsed()
        );
        Ok((mesh, report))
    }
}

/// Convenience function for basic marching tetrahedra
///
/// Fails when the grid holds no isosurface at `iso_level`.
pub fn marching_tetrahedra(grid: &VolumetricGrid, iso_level: f32) -> Result<TriangleMesh> {
    let extractor = MarchingTetrahedra::new(ExtractionConfig::default().with_iso_level(iso_level));
    let (mesh, _) = extractor.extract(grid)?;
    if mesh.is_empty() {
        return Err(Error::Algorithm(
            "No isosurface found at specified level".to_string(),
        ));
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::create_sphere_volume;
    use std::collections::HashSet;
    use tetrarecon_core::Vector3f;

    fn unit_cell_positions(cube: [i64; 3]) -> [Point3f; 8] {
        CUBE_CORNER_OFFSETS.map(|o| {
            Point3f::new(
                (cube[0] + o[0]) as f32,
                (cube[1] + o[1]) as f32,
                (cube[2] + o[2]) as f32,
            )
        })
    }

    fn grid_from(dimensions: [usize; 3], f: impl Fn(&Point3f) -> f32 + Sync + Send) -> VolumetricGrid {
        VolumetricGrid::from_fn(dimensions, [1.0; 3], Point3f::origin(), f).unwrap()
    }

    fn face_normal(mesh: &TriangleMesh, face: &[usize; 3]) -> Vector3f {
        let [a, b, c] = face.map(|i| mesh.vertices[i]);
        (b - a).cross(&(c - a))
    }

    #[test]
    fn test_uniform_cells_emit_nothing() {
        let positions = unit_cell_positions([0, 0, 0]);
        assert!(polygonize_cell([0, 0, 0], &[1.0; 8], &positions, 0.0).triangles.is_empty());
        assert!(polygonize_cell([0, 0, 0], &[-1.0; 8], &positions, 0.0).triangles.is_empty());
    }

    #[test]
    fn test_single_inside_corner() {
        // Corner 6 belongs only to the last tetrahedron
        let mut values = [1.0f32; 8];
        values[6] = -1.0;
        let cell = polygonize_cell([0, 0, 0], &values, &unit_cell_positions([0, 0, 0]), 0.0);
        assert_eq!(cell.active_tetrahedra, 1);
        assert_eq!(cell.triangles.len(), 1);
        assert_eq!(cell.vertices.len(), 3);
        assert_eq!(cell.degenerate_triangles, 0);
    }

    #[test]
    fn test_two_inside_corners_form_a_quad() {
        // Corners 2 and 6 share only tetrahedron 5 (its corners 0 and 2)
        let mut values = [1.0f32; 8];
        values[2] = -1.0;
        values[6] = -1.0;
        let positions = unit_cell_positions([0, 0, 0]);
        let tet = TETRAEDER_DEFINITION_TABLE[5];
        let config = tetrahedron_configuration(tet.map(|c| values[c]), 0.0);
        assert_eq!(config, 0b0101);
        assert_eq!(configuration_triangles(config).count(), 2);

        let cell = polygonize_cell([0, 0, 0], &values, &positions, 0.0);
        assert!(cell.triangles.len() >= 2);
        assert!(cell.vertices.iter().all(|(key, _)| matches!(key, VertexKey::Edge(_))));
    }

    #[test]
    fn test_interpolated_position() {
        let mut values = [1.0f32; 8];
        values[0] = -3.0;
        let cell = polygonize_cell([0, 0, 0], &values, &unit_cell_positions([0, 0, 0]), 0.0);
        // Crossing on edge 0-1 sits at t = 3/4
        assert!(cell
            .vertices
            .iter()
            .any(|(_, p)| (p - Point3f::new(0.75, 0.0, 0.0)).norm() < 1e-6));
    }

    #[test]
    fn test_edge_keys_agree_across_neighbors() {
        for edge in 0..19 {
            let key = EdgeKey::canonical([5, 5, 5], edge);
            for k in 0..3 {
                let neighbor = TETRAEDER_NEIGHBOR_TABLE[edge][k];
                if neighbor < 0 {
                    continue;
                }
                let offset = neighbor_offset(neighbor as usize);
                let other = EdgeKey::canonical(
                    [5 + offset[0], 5 + offset[1], 5 + offset[2]],
                    TETRAEDER_VERTEX_NB_TABLE[edge][k] as usize,
                );
                assert_eq!(key, other, "edge {}", edge);
            }
        }
    }

    #[test]
    fn test_shared_face_vertices_match() {
        // Two cells along x, surface crossing their shared face x = 1
        let f = |p: &Point3f| p.y + 0.7 * p.z + 0.3 * p.x - 0.9;
        let left_values = unit_cell_positions([0, 0, 0]).map(|p| f(&p));
        let right_values = unit_cell_positions([1, 0, 0]).map(|p| f(&p));
        let left = polygonize_cell([0, 0, 0], &left_values, &unit_cell_positions([0, 0, 0]), 0.0);
        let right = polygonize_cell([1, 0, 0], &right_values, &unit_cell_positions([1, 0, 0]), 0.0);

        let on_face = |cell: &CellPolygons| -> HashSet<VertexKey> {
            cell.vertices
                .iter()
                .filter(|(_, p)| p.x == 1.0)
                .map(|(k, _)| *k)
                .collect()
        };
        let left_keys = on_face(&left);
        assert!(!left_keys.is_empty());
        assert_eq!(left_keys, on_face(&right));

        for (key, position) in &left.vertices {
            if let Some((_, other)) = right.vertices.iter().find(|(k, _)| k == key) {
                assert_eq!(position, other);
            }
        }

        let grid = grid_from([3, 2, 2], f);
        let (mesh, report) = MarchingTetrahedra::new(ExtractionConfig::default()).extract(&grid).unwrap();
        assert_eq!(report.cells_visited, 2);
        assert!(report.vertex_reuses >= left_keys.len());
        let positions: HashSet<[u32; 3]> = mesh
            .vertices
            .iter()
            .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
            .collect();
        assert_eq!(positions.len(), mesh.vertex_count());
    }

    #[test]
    fn test_surface_on_lattice_plane_inside_below() {
        // x = 1 corners sit exactly on the iso level and count as inside
        let grid = grid_from([3, 2, 2], |p| p.x - 1.0);
        let (mesh, report) = MarchingTetrahedra::new(ExtractionConfig::default()).extract(&grid).unwrap();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(report.degenerate_triangles, 6);
        assert!(mesh.vertices.iter().all(|p| p.x == 1.0));
        for face in &mesh.faces {
            assert!(face_normal(&mesh, face).x > 0.0);
        }
    }

    #[test]
    fn test_surface_on_lattice_plane_inside_above() {
        let grid = grid_from([3, 2, 2], |p| 1.0 - p.x);
        let (mesh, report) = MarchingTetrahedra::new(ExtractionConfig::default()).extract(&grid).unwrap();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(report.degenerate_triangles, 6);
        for face in &mesh.faces {
            assert!(face_normal(&mesh, face).x < 0.0);
        }
    }

    #[test]
    fn test_nan_cells_are_skipped() {
        let mut grid = grid_from([3, 2, 2], |p| p.x - 0.5);
        grid.set_value(2, 0, 0, f32::NAN).unwrap();
        let (mesh, report) = MarchingTetrahedra::new(ExtractionConfig::default()).extract(&grid).unwrap();
        assert_eq!(report.cells_skipped, 1);
        assert_eq!(report.cells_visited, 1);
        assert!(!mesh.is_empty());
    }

    #[test]
    fn test_closed_sphere() {
        let grid = create_sphere_volume(Point3f::origin(), 0.77, [16, 16, 16], [2.0, 2.0, 2.0]).unwrap();
        let (mesh, report) = MarchingTetrahedra::new(ExtractionConfig::default()).extract(&grid).unwrap();

        assert!(mesh.is_closed());
        assert_eq!(report.triangles, mesh.face_count());
        assert_eq!(report.vertices, mesh.vertex_count());

        let directed: HashSet<(usize, usize)> = mesh
            .faces
            .iter()
            .flat_map(|f| [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])])
            .collect();
        assert_eq!(directed.len(), 3 * mesh.face_count());
        for &(a, b) in &directed {
            assert!(directed.contains(&(b, a)), "edge {}-{} has no opposite", a, b);
        }

        let voxel = 2.0 / 15.0;
        for p in &mesh.vertices {
            assert!((p.coords.norm() - 0.77).abs() < voxel);
        }
        for face in &mesh.faces {
            let centroid = (mesh.vertices[face[0]].coords + mesh.vertices[face[1]].coords + mesh.vertices[face[2]].coords) / 3.0;
            assert!(face_normal(&mesh, face).dot(&centroid) > 0.0);
        }
        let normals = mesh.normals.as_ref().unwrap();
        assert_eq!(normals.len(), mesh.vertex_count());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let grid = create_sphere_volume(Point3f::new(0.1, -0.2, 0.05), 0.6, [12, 12, 12], [2.0; 3]).unwrap();
        let extractor = MarchingTetrahedra::new(ExtractionConfig::default().with_compute_normals(false));
        let (a, _) = extractor.extract(&grid).unwrap();
        let (b, _) = extractor.extract(&grid).unwrap();
        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.faces, b.faces);
        assert!(a.normals.is_none());
    }

    #[test]
    fn test_iso_level_shifts_surface() {
        let grid = create_sphere_volume(Point3f::origin(), 0.5, [16, 16, 16], [2.0; 3]).unwrap();
        let mesh = marching_tetrahedra(&grid, 0.2).unwrap();
        for p in &mesh.vertices {
            assert!((p.coords.norm() - 0.7).abs() < 2.0 / 15.0);
        }
        assert!(marching_tetrahedra(&grid, 10.0).is_err());
    }
}
