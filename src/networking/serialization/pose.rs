//! Fixed-layout pose decoding for object and terse updates
//!
//! Terse (ImprovedTerseObjectUpdate) avatar data comes in two fixed sizes:
//!
//! ```text
//! 30 bytes                         60 bytes
//! ofs  0  local id       u32       ofs  0  local id        u32
//! ofs  4  position       3 x f32   ofs  4  header/padding  18 bytes
//! ofs 16  velocity       3 x u16   ofs 22  position        3 x f32
//! ofs 22  rotation       4 x u16   ofs 34  velocity        3 x u16
//!                                  ofs 40  acceleration    3 x u16
//!                                  ofs 46  rotation        4 x u16
//!                                  ofs 54  rotation vel.   3 x u16
//! ```
//!
//! All multi-byte values are little-endian.

use crate::networking::{NetworkError, NetworkResult};
use crate::world::LocalEntityId;
use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Quat, Vec3};
use std::io::Cursor;

pub const COMPACT_UPDATE_30_LEN: usize = 30;
pub const COMPACT_UPDATE_60_LEN: usize = 60;

/// Minimum ObjectData length that carries a position
pub const OBJECT_DATA_MIN_LEN: usize = 28;
const OBJECT_DATA_POSITION_OFFSET: u64 = 16;

/// Scale applied to packed velocity and rotation velocity
pub const VELOCITY_SCALE: f32 = 128.0;

/// Decoded terse update. Fields absent from the 30-byte form are zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompactUpdate {
    pub local_id: LocalEntityId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub rotation: Quat,
    pub rotation_velocity: Vec3,
}

/// Extract the position from an ObjectUpdate ObjectData block.
/// Short (legacy or partial) blocks carry no position and yield `None`.
pub fn decode_full_update_position(object_data: &[u8]) -> Option<Vec3> {
    if object_data.len() < OBJECT_DATA_MIN_LEN {
        return None;
    }
    let mut cursor = Cursor::new(object_data);
    cursor.set_position(OBJECT_DATA_POSITION_OFFSET);
    read_vector(&mut cursor).ok()
}

/// Decode either terse layout, picked by buffer length
pub fn decode_compact_update(bytes: &[u8]) -> NetworkResult<CompactUpdate> {
    match bytes.len() {
        COMPACT_UPDATE_30_LEN => decode_compact_update_30(bytes),
        COMPACT_UPDATE_60_LEN => decode_compact_update_60(bytes),
        actual => Err(NetworkError::InvalidBufferLength {
            expected: COMPACT_UPDATE_30_LEN,
            actual,
        }),
    }
}

pub fn decode_compact_update_30(bytes: &[u8]) -> NetworkResult<CompactUpdate> {
    check_len(bytes, COMPACT_UPDATE_30_LEN)?;
    let mut cursor = Cursor::new(bytes);

    let local_id = cursor.read_u32::<LittleEndian>()?;
    let position = read_vector(&mut cursor)?;
    let velocity = read_packed_vector(&mut cursor, VELOCITY_SCALE)?;
    let rotation = read_packed_quaternion(&mut cursor)?;
    debug_assert!(cursor.position() as usize <= COMPACT_UPDATE_30_LEN);

    Ok(CompactUpdate {
        local_id,
        position,
        velocity,
        acceleration: Vec3::ZERO,
        rotation,
        rotation_velocity: Vec3::ZERO,
    })
}

pub fn decode_compact_update_60(bytes: &[u8]) -> NetworkResult<CompactUpdate> {
    check_len(bytes, COMPACT_UPDATE_60_LEN)?;
    let mut cursor = Cursor::new(bytes);

    let local_id = cursor.read_u32::<LittleEndian>()?;
    cursor.set_position(22);
    let position = read_vector(&mut cursor)?;
    let velocity = read_packed_vector(&mut cursor, VELOCITY_SCALE)?;
    let acceleration = read_packed_vector(&mut cursor, 1.0)?;
    let rotation = read_packed_quaternion(&mut cursor)?;
    let rotation_velocity = read_packed_vector(&mut cursor, VELOCITY_SCALE)?;
    debug_assert!(cursor.position() as usize <= COMPACT_UPDATE_60_LEN);

    Ok(CompactUpdate {
        local_id,
        position,
        velocity,
        acceleration,
        rotation,
        rotation_velocity,
    })
}

/// Positions outside `[-bound, bound]` on any axis, or non-finite, are rejected
pub fn is_valid_position(position: Vec3, bound: f32) -> bool {
    position.is_finite() && position.abs().max_element() <= bound
}

/// Map a quantized u16 onto [-1, 1)
pub fn u16_to_unit(value: u16) -> f32 {
    value as f32 / 32768.0 - 1.0
}

/// Decode 6 bytes (3 x u16) into a vector, scaled
pub fn unpack_vector(bytes: &[u8], scale: f32) -> NetworkResult<Vec3> {
    read_packed_vector(&mut Cursor::new(bytes), scale)
}

/// Decode 8 bytes (4 x u16) into a unit quaternion
pub fn unpack_quaternion(bytes: &[u8]) -> NetworkResult<Quat> {
    read_packed_quaternion(&mut Cursor::new(bytes))
}

fn check_len(bytes: &[u8], expected: usize) -> NetworkResult<()> {
    if bytes.len() < expected {
        return Err(NetworkError::InvalidBufferLength { expected, actual: bytes.len() });
    }
    Ok(())
}

fn read_vector(cursor: &mut Cursor<&[u8]>) -> NetworkResult<Vec3> {
    let x = cursor.read_f32::<LittleEndian>()?;
    let y = cursor.read_f32::<LittleEndian>()?;
    let z = cursor.read_f32::<LittleEndian>()?;
    Ok(Vec3::new(x, y, z))
}

fn read_packed_vector(cursor: &mut Cursor<&[u8]>, scale: f32) -> NetworkResult<Vec3> {
    let x = u16_to_unit(cursor.read_u16::<LittleEndian>()?);
    let y = u16_to_unit(cursor.read_u16::<LittleEndian>()?);
    let z = u16_to_unit(cursor.read_u16::<LittleEndian>()?);
    Ok(Vec3::new(x, y, z) * scale)
}

fn read_packed_quaternion(cursor: &mut Cursor<&[u8]>) -> NetworkResult<Quat> {
    let x = u16_to_unit(cursor.read_u16::<LittleEndian>()?);
    let y = u16_to_unit(cursor.read_u16::<LittleEndian>()?);
    let z = u16_to_unit(cursor.read_u16::<LittleEndian>()?);
    let w = u16_to_unit(cursor.read_u16::<LittleEndian>()?);

    let raw = Quat::from_xyzw(x, y, z, w);
    let length = raw.length();
    if length.is_finite() && length > f32::EPSILON {
        return Ok(raw / length);
    }

    // Degenerate encoding: rebuild w from the vector part
    let xyz = Vec3::new(x, y, z);
    let xyz = if xyz.length_squared() > 1.0 { xyz.normalize() } else { xyz };
    let w = (1.0 - xyz.length_squared()).max(0.0).sqrt();
    Ok(Quat::from_xyzw(xyz.x, xyz.y, xyz.z, w).normalize())
}
