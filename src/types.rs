use crate::blocks::coords::mod16;
use serde::{Deserialize, Serialize};
use std::io;

pub type Result<T> = std::result::Result<T, crate::error::NotecraftError>;

/// Absolute block position in a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighbouring position one step towards `direction`
    pub fn relative(&self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.normal();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn chunk_x(&self) -> i32 {
        self.x >> 4
    }

    pub fn chunk_z(&self) -> i32 {
        self.z >> 4
    }

    /// X inside the owning chunk, 0-15
    pub fn local_x(&self) -> i32 {
        mod16(self.x)
    }

    /// Z inside the owning chunk, 0-15
    pub fn local_z(&self) -> i32 {
        mod16(self.z)
    }
}

/// Block face, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub fn from_id(id: i32) -> io::Result<Self> {
        match id {
            0 => Ok(Direction::Down),
            1 => Ok(Direction::Up),
            2 => Ok(Direction::North),
            3 => Ok(Direction::South),
            4 => Ok(Direction::West),
            5 => Ok(Direction::East),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid block face: {}", id),
            )),
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Direction::Down => 0,
            Direction::Up => 1,
            Direction::North => 2,
            Direction::South => 3,
            Direction::West => 4,
            Direction::East => 5,
        }
    }

    pub fn normal(&self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hand {
    MainHand,
    OffHand,
}

impl Hand {
    pub fn from_id(id: i32) -> io::Result<Self> {
        match id {
            0 => Ok(Hand::MainHand),
            1 => Ok(Hand::OffHand),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid hand: {}", id),
            )),
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Hand::MainHand => 0,
            Hand::OffHand => 1,
        }
    }
}

/// Axis-aligned box in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, min_z: f64, max_x: f64, max_y: f64, max_z: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            min_z: min_z.min(max_z),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
            max_z: min_z.max(max_z),
        }
    }

    /// The full cell occupied by a block
    pub fn of_block(pos: BlockPos) -> Self {
        let (x, y, z) = (pos.x as f64, pos.y as f64, pos.z as f64);
        Self::new(x, y, z, x + 1.0, y + 1.0, z + 1.0)
    }

    /// Box centered horizontally on a point, growing upwards from it
    pub fn around_feet(x: f64, y: f64, z: f64, width: f64, height: f64) -> Self {
        let half = width / 2.0;
        Self::new(x - half, y, z - half, x + half, y + height, z + half)
    }

    /// Overlap test. Boxes that only share a face do not intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
            && self.min_z < other.max_z
            && self.max_z > other.min_z
    }
}
