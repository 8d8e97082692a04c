//! Block coordinates and face directions.
//!
//! The host world is a grid of integer block positions. The core never
//! inspects world geometry; it only stores positions as opaque link
//! endpoints and computes the straight-line distance for the link range
//! check.

use serde::{Deserialize, Serialize};

/// An integer block coordinate in the host world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    /// The zero/origin sentinel. A link address pointing here is invalid
    /// (it is the default value of an unconfigured link).
    pub const ORIGIN: Self = Self { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Squared euclidean distance, in whole blocks. Wide intermediate
    /// math so diagonally opposite world corners cannot overflow.
    pub fn distance_sq(self, other: Self) -> u128 {
        let dx = i128::from(self.x) - i128::from(other.x);
        let dy = i128::from(self.y) - i128::from(other.y);
        let dz = i128::from(self.z) - i128::from(other.z);
        (dx * dx + dy * dy + dz * dz) as u128
    }

    /// Straight-line distance truncated to whole blocks (integer square
    /// root of the squared distance, saturating at `u32::MAX`). This is
    /// the value compared against the configured maximum link distance.
    pub fn distance(self, other: Self) -> u32 {
        (self.distance_sq(other) as f64).sqrt() as u32
    }
}

impl core::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// A block face, used to select which directional power sample a relay
/// reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Face {
    Down = 0,
    Up = 1,
    North = 2,
    South = 3,
    West = 4,
    East = 5,
}

impl Face {
    pub const COUNT: usize = 6;

    pub const ALL: [Face; Face::COUNT] = [
        Face::Down,
        Face::Up,
        Face::North,
        Face::South,
        Face::West,
        Face::East,
    ];

    /// Index into per-face sample arrays.
    pub const fn index(self) -> usize {
        self as usize
    }
}
