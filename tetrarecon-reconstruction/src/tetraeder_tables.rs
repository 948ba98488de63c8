//! Lookup tables for marching tetrahedra
//!
//! A cube cell is split into six tetrahedra. Each tetrahedron is classified by
//! which of its four corners lie inside the surface, giving a configuration
//! index in `0..16` that selects up to two triangles over the tetrahedron's
//! six edges.
//!
//! Cube corners are numbered
//!
//! ```text
//! 0:(0,0,0) 1:(1,0,0) 2:(1,1,0) 3:(0,1,0)
//! 4:(0,0,1) 5:(1,0,1) 6:(1,1,1) 7:(0,1,1)
//! ```
//!
//! and the 19 lattice edges a cube owns (12 cube edges, 6 face diagonals and
//! the body diagonal) are listed in [`CUBE_EDGE_CORNERS`]. Neighbor cubes of
//! the surrounding 3x3x3 block are addressed by `9·(dx+1) + 3·(dy+1) + (dz+1)`,
//! so 13 is the cube itself.

/// Lattice offset of each cube corner
pub const CUBE_CORNER_OFFSETS: [[i64; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// Corner pair of every cube edge id
pub const CUBE_EDGE_CORNERS: [[usize; 2]; 19] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [0, 3],
    [4, 5],
    [5, 6],
    [6, 7],
    [4, 7],
    [0, 4],
    [1, 5],
    [3, 7],
    [2, 6],
    // face diagonals
    [1, 4],
    [2, 7],
    [3, 4],
    [2, 5],
    [1, 3],
    [5, 7],
    // body diagonal
    [2, 4],
];

/// Local corner pair of every tetrahedron edge
pub const TETRAEDER_EDGES: [[usize; 2]; 6] = [[0, 1], [1, 3], [0, 3], [0, 2], [1, 2], [2, 3]];

/// Triangles per configuration, as local edge ids, `-1` terminated
pub const TETRAEDER_TABLE: [[i8; 7]; 16] = [
    [-1, -1, -1, -1, -1, -1, -1],
    [0, 3, 2, -1, -1, -1, -1],
    [0, 1, 4, -1, -1, -1, -1],
    [2, 1, 3, 3, 1, 4, -1],
    [3, 4, 5, -1, -1, -1, -1],
    [2, 0, 5, 5, 0, 4, -1],
    [3, 0, 1, 3, 1, 5, -1],
    [2, 1, 5, -1, -1, -1, -1],
    [2, 5, 1, -1, -1, -1, -1],
    [3, 1, 0, 3, 5, 1, -1],
    [2, 5, 0, 5, 4, 0, -1],
    [3, 5, 4, -1, -1, -1, -1],
    [2, 3, 1, 3, 4, 1, -1],
    [0, 4, 1, -1, -1, -1, -1],
    [0, 2, 3, -1, -1, -1, -1],
    [-1, -1, -1, -1, -1, -1, -1],
];

/// Cube corners of each tetrahedron, all positively oriented
pub const TETRAEDER_DEFINITION_TABLE: [[usize; 4]; 6] = [
    [0, 1, 3, 4],
    [3, 1, 2, 4],
    [4, 2, 3, 7],
    [1, 5, 2, 4],
    [4, 5, 2, 7],
    [2, 5, 6, 7],
];

/// Cube edge id of each (tetrahedron, local edge)
pub const TETRAEDER_INTERSECTION_TABLE: [[usize; 6]; 6] = [
    [0, 12, 8, 3, 16, 14],
    [16, 12, 14, 2, 1, 18],
    [18, 13, 7, 14, 2, 10],
    [9, 4, 12, 1, 15, 18],
    [4, 17, 7, 18, 15, 13],
    [15, 17, 13, 11, 5, 6],
];

/// Neighbor cubes sharing each cube edge, `-1` padded
pub const TETRAEDER_NEIGHBOR_TABLE: [[i8; 3]; 19] = [
    [12, 10, 9],
    [22, 12, 21],
    [16, 12, 15],
    [4, 3, 12],
    [14, 10, 11],
    [23, 22, 14],
    [14, 16, 17],
    [4, 5, 14],
    [4, 1, 10],
    [22, 19, 10],
    [4, 7, 16],
    [22, 25, 16],
    [10, -1, -1],
    [16, -1, -1],
    [4, -1, -1],
    [22, -1, -1],
    [12, -1, -1],
    [14, -1, -1],
    [-1, -1, -1],
];

/// Edge id the shared edge has in the matching [`TETRAEDER_NEIGHBOR_TABLE`] cube
pub const TETRAEDER_VERTEX_NB_TABLE: [[i8; 3]; 19] = [
    [4, 2, 6],
    [3, 5, 7],
    [0, 6, 4],
    [1, 5, 7],
    [0, 6, 2],
    [3, 7, 1],
    [2, 4, 0],
    [5, 1, 3],
    [9, 11, 10],
    [8, 10, 11],
    [11, 9, 8],
    [10, 8, 9],
    [13, -1, -1],
    [12, -1, -1],
    [15, -1, -1],
    [14, -1, -1],
    [17, -1, -1],
    [16, -1, -1],
    [-1, -1, -1],
];

/// Lattice offset of a neighbor index in `0..27`
pub const fn neighbor_offset(neighbor: usize) -> [i64; 3] {
    [
        (neighbor / 9) as i64 - 1,
        ((neighbor / 3) % 3) as i64 - 1,
        (neighbor % 3) as i64 - 1,
    ]
}

/// Configuration index of one tetrahedron, bit `i` set when corner `i` is inside
pub fn tetrahedron_configuration(values: [f32; 4], iso_level: f32) -> u8 {
    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v <= iso_level)
        .fold(0u8, |acc, (i, _)| acc | (1 << i))
}

/// Triangles of a configuration as local edge triples
pub fn configuration_triangles(configuration: u8) -> impl Iterator<Item = [usize; 3]> {
    let row = TETRAEDER_TABLE[configuration as usize & 0x0f];
    (0..2)
        .map(move |t| [row[3 * t], row[3 * t + 1], row[3 * t + 2]])
        .take_while(|tri| tri[0] >= 0)
        .map(|tri| tri.map(|e| e as usize))
}
