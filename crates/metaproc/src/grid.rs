//! Spatial bucketing of place coordinates.

use sha1::{Digest, Sha1};

/// Cell index of one coordinate: `trunc(c / grid_size) + sign(c)`, where
/// the sign is `-1` for negative input and `+1` otherwise. There is no
/// cell 0; the cells either side of the origin are 1 and -1.
pub fn to_grid(coordinate: f64, grid_size: f64) -> i64 {
    let sign = if coordinate < 0.0 { -1 } else { 1 };
    (coordinate / grid_size).trunc() as i64 + sign
}

pub fn grid_cell(x: f64, y: f64, z: f64, grid_size: f64) -> (i64, i64, i64) {
    (to_grid(x, grid_size), to_grid(y, grid_size), to_grid(z, grid_size))
}

/// Hex SHA-1 of `"{cx}-{cy}-{cz}"`.
pub fn grid_cell_hash(x: f64, y: f64, z: f64, grid_size: f64) -> String {
    let (cx, cy, cz) = grid_cell(x, y, z, grid_size);
    let mut hasher = Sha1::new();
    hasher.update(format!("{cx}-{cy}-{cz}").as_bytes());
    hex::encode(hasher.finalize())
}
