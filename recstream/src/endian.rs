//! Little-endian accessors over plain byte slices.
//!
//! These are for callers that already hold a record in memory and only need
//! to pick fields out of it (or poke them in) at known offsets. Every accessor
//! is bounds-checked; nothing here panics on short input.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

#[inline]
fn field(data: &[u8], offset: usize, width: usize) -> Result<&[u8]> {
    match offset.checked_add(width) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => Err(Error::end_of_input(
            width,
            data.len().saturating_sub(offset),
        )),
    }
}

#[inline]
fn field_mut(data: &mut [u8], offset: usize, width: usize) -> Result<&mut [u8]> {
    let len = data.len();
    match offset.checked_add(width) {
        Some(end) if end <= len => Ok(&mut data[offset..end]),
        _ => Err(Error::BufferOverrun {
            needed: width,
            remaining: len.saturating_sub(offset),
        }),
    }
}

/// Read the byte at `offset`.
#[inline]
pub fn get_u8(data: &[u8], offset: usize) -> Result<u8> {
    Ok(field(data, offset, 1)?[0])
}

/// Read the byte at `offset` as signed.
#[inline]
pub fn get_i8(data: &[u8], offset: usize) -> Result<i8> {
    Ok(get_u8(data, offset)? as i8)
}

/// Read a little-endian `u16` at `offset`.
#[inline]
pub fn get_u16(data: &[u8], offset: usize) -> Result<u16> {
    Ok(LittleEndian::read_u16(field(data, offset, 2)?))
}

/// Read a little-endian `i16` at `offset`.
#[inline]
pub fn get_i16(data: &[u8], offset: usize) -> Result<i16> {
    Ok(LittleEndian::read_i16(field(data, offset, 2)?))
}

/// Reads four bytes as an unsigned value.
#[inline]
pub fn get_u32(data: &[u8], offset: usize) -> Result<u32> {
    Ok(LittleEndian::read_u32(field(data, offset, 4)?))
}

/// Read a little-endian `i32` at `offset`.
#[inline]
pub fn get_i32(data: &[u8], offset: usize) -> Result<i32> {
    Ok(LittleEndian::read_i32(field(data, offset, 4)?))
}

/// Read a little-endian `u64` at `offset`.
#[inline]
pub fn get_u64(data: &[u8], offset: usize) -> Result<u64> {
    Ok(LittleEndian::read_u64(field(data, offset, 8)?))
}

/// Read a little-endian `i64` at `offset`.
#[inline]
pub fn get_i64(data: &[u8], offset: usize) -> Result<i64> {
    Ok(LittleEndian::read_i64(field(data, offset, 8)?))
}

/// Read a little-endian `f32` at `offset`.
#[inline]
pub fn get_f32(data: &[u8], offset: usize) -> Result<f32> {
    Ok(f32::from_bits(get_u32(data, offset)?))
}

/// Reinterprets eight bytes as an IEEE-754 binary64 bit pattern.
#[inline]
pub fn get_f64(data: &[u8], offset: usize) -> Result<f64> {
    Ok(f64::from_bits(get_u64(data, offset)?))
}

/// Write the byte at `offset`.
#[inline]
pub fn put_u8(data: &mut [u8], offset: usize, value: u8) -> Result<()> {
    field_mut(data, offset, 1)?[0] = value;
    Ok(())
}

/// Write `value` as a little-endian `u16` at `offset`.
#[inline]
pub fn put_u16(data: &mut [u8], offset: usize, value: u16) -> Result<()> {
    LittleEndian::write_u16(field_mut(data, offset, 2)?, value);
    Ok(())
}

/// Write `value` as a little-endian `i16` at `offset`.
#[inline]
pub fn put_i16(data: &mut [u8], offset: usize, value: i16) -> Result<()> {
    LittleEndian::write_i16(field_mut(data, offset, 2)?, value);
    Ok(())
}

/// Write `value` as a little-endian `u32` at `offset`.
#[inline]
pub fn put_u32(data: &mut [u8], offset: usize, value: u32) -> Result<()> {
    LittleEndian::write_u32(field_mut(data, offset, 4)?, value);
    Ok(())
}

/// Write `value` as a little-endian `i32` at `offset`.
#[inline]
pub fn put_i32(data: &mut [u8], offset: usize, value: i32) -> Result<()> {
    LittleEndian::write_i32(field_mut(data, offset, 4)?, value);
    Ok(())
}

/// Write `value` as a little-endian `u64` at `offset`.
#[inline]
pub fn put_u64(data: &mut [u8], offset: usize, value: u64) -> Result<()> {
    LittleEndian::write_u64(field_mut(data, offset, 8)?, value);
    Ok(())
}

/// Write `value` as a little-endian `i64` at `offset`.
#[inline]
pub fn put_i64(data: &mut [u8], offset: usize, value: i64) -> Result<()> {
    LittleEndian::write_i64(field_mut(data, offset, 8)?, value);
    Ok(())
}

/// Write `value` as a little-endian `f32` at `offset`.
#[inline]
pub fn put_f32(data: &mut [u8], offset: usize, value: f32) -> Result<()> {
    put_u32(data, offset, value.to_bits())
}

/// Write `value` as a little-endian `f64` at `offset`.
#[inline]
pub fn put_f64(data: &mut [u8], offset: usize, value: f64) -> Result<()> {
    put_u64(data, offset, value.to_bits())
}
