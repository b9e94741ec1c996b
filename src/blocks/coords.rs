use crate::error::NotecraftError;
use crate::types::Result;
use std::fmt;

const X_BIT_POS: u32 = 0;
const X_BIT_SIZE: u32 = 4;
const Z_BIT_POS: u32 = 4;
const Z_BIT_SIZE: u32 = 4;
const Y_SIGN_BIT_POS: u32 = 8;
const Y_BIT_POS: u32 = 9;
const Y_BIT_SIZE: u32 = 23;

/// Largest y a packed coordinate can hold, 2^23 - 1
pub const MAX_Y: i32 = 0x7F_FFFF;
/// Smallest y a packed coordinate can hold
pub const MIN_Y: i32 = -MAX_Y;

/// Modulo that is never negative
pub fn mod16(a: i32) -> i32 {
    a.rem_euclid(16)
}

/// Chunk-local position packed into 32 bits: `[x:4][z:4][ySign:1][yMagnitude:23]`, lowest
/// bits first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackedCoordinate(i32);

impl PackedCoordinate {
    pub fn pack(x: i32, y: i32, z: i32) -> Result<Self> {
        if !(0..=15).contains(&x) {
            return Err(NotecraftError::CoordinateError(format!(
                "X value {} is out of range! Must be 0 <= x <= 15.",
                x
            )));
        }
        if !(0..=15).contains(&z) {
            return Err(NotecraftError::CoordinateError(format!(
                "Z value {} is out of range! Must be 0 <= z <= 15.",
                z
            )));
        }
        if !(MIN_Y..=MAX_Y).contains(&y) {
            return Err(NotecraftError::CoordinateError(format!(
                "Y value {} is out of range! Must be {} <= y <= {}",
                y, MIN_Y, MAX_Y
            )));
        }

        let x_packed = (x as u32 & ((1 << X_BIT_SIZE) - 1)) << X_BIT_POS;
        let z_packed = (z as u32 & ((1 << Z_BIT_SIZE) - 1)) << Z_BIT_POS;
        let y_packed = (y.unsigned_abs() & ((1 << Y_BIT_SIZE) - 1)) << Y_BIT_POS;
        let sign_packed = ((y < 0) as u32) << Y_SIGN_BIT_POS;

        Ok(Self((x_packed | z_packed | y_packed | sign_packed) as i32))
    }

    /// Any 32-bit value unpacks to something
    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn unpack(self) -> (i32, i32, i32) {
        (self.x(), self.y(), self.z())
    }

    pub fn x(self) -> i32 {
        ((self.0 as u32 >> X_BIT_POS) & ((1 << X_BIT_SIZE) - 1)) as i32
    }

    pub fn z(self) -> i32 {
        ((self.0 as u32 >> Z_BIT_POS) & ((1 << Z_BIT_SIZE) - 1)) as i32
    }

    pub fn y(self) -> i32 {
        let magnitude = ((self.0 as u32 >> Y_BIT_POS) & ((1 << Y_BIT_SIZE) - 1)) as i32;
        if (self.0 as u32 >> Y_SIGN_BIT_POS) & 1 == 0 {
            magnitude
        } else {
            -magnitude
        }
    }

    /// Lowercase hex of the unsigned bits, no leading zeros. Used as the persistent key.
    pub fn to_hex(self) -> String {
        format!("{:x}", self.0 as u32)
    }

    /// Parses a key written by [`PackedCoordinate::to_hex`].
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.is_empty() || hex.len() > 8 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(hex, 16)
            .ok()
            .map(|raw| Self(raw as i32))
    }
}

impl fmt::Display for PackedCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Packs chunk-local coordinates into a 32-bit key.
pub fn pack(x: i32, y: i32, z: i32) -> Result<i32> {
    PackedCoordinate::pack(x, y, z).map(PackedCoordinate::raw)
}

/// Inverse of [`pack`]. Total over every `i32`.
pub fn unpack(packed: i32) -> (i32, i32, i32) {
    PackedCoordinate::from_raw(packed).unpack()
}
