use crate::{SerializedError, SerializedResult};
use std::convert::TryInto;

/// True when writing big-endian data on this host requires a byte swap.
pub fn host_needs_swap_for_big_endian() -> bool {
    cfg!(target_endian = "little")
}

/// Cursor over a byte slice with a byte-swap flag chosen once at
/// construction (from the file's endian flag), not re-detected per field.
/// Every read is bounds-checked and fails with a decode error rather than
/// panicking, so corrupt or adversarial files are rejected cheaply.
pub struct EndianReader<'a> {
    data: &'a [u8],
    position: usize,
    swap: bool,
}

impl<'a> EndianReader<'a> {
    pub fn new(
        data: &'a [u8],
        swap: bool,
    ) -> Self {
        EndianReader {
            data,
            position: 0,
            swap,
        }
    }

    pub fn swaps(&self) -> bool {
        self.swap
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position == self.data.len()
    }

    pub fn seek(
        &mut self,
        position: usize,
    ) -> SerializedResult<()> {
        if position > self.data.len() {
            return Err(SerializedError::Corrupt(format!(
                "seek to {} past end of {}-byte buffer",
                position,
                self.data.len()
            )));
        }
        self.position = position;
        Ok(())
    }

    pub fn read_bytes(
        &mut self,
        len: usize,
    ) -> SerializedResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(SerializedError::Corrupt(format!(
                "read of {} bytes at offset {} past end of {}-byte buffer",
                len,
                self.position,
                self.data.len()
            )));
        }
        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// NUL-terminated string. Strings are never byte-swapped.
    pub fn read_cstr(&mut self) -> SerializedResult<String> {
        let start = self.position;
        let terminator = self.data[start..].iter().position(|&b| b == 0).ok_or_else(|| {
            SerializedError::Corrupt(format!("unterminated string at offset {}", start))
        })?;
        let bytes = &self.data[start..start + terminator];
        self.position = start + terminator + 1;
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            SerializedError::Corrupt(format!("invalid utf-8 string at offset {}", start))
        })
    }

    pub fn align(
        &mut self,
        alignment: usize,
    ) -> SerializedResult<()> {
        let aligned = (self.position + alignment - 1) / alignment * alignment;
        let aligned = aligned.min(self.data.len());
        if aligned < self.position {
            return Err(SerializedError::Corrupt("alignment underflow".to_string()));
        }
        self.position = aligned;
        Ok(())
    }

    pub fn read_u8(&mut self) -> SerializedResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_bool(&mut self) -> SerializedResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> SerializedResult<u16> {
        let bytes: [u8; 2] = self.read_bytes(2)?.try_into().unwrap();
        let value = u16::from_ne_bytes(bytes);
        Ok(if self.swap { value.swap_bytes() } else { value })
    }

    pub fn read_u32(&mut self) -> SerializedResult<u32> {
        let bytes: [u8; 4] = self.read_bytes(4)?.try_into().unwrap();
        let value = u32::from_ne_bytes(bytes);
        Ok(if self.swap { value.swap_bytes() } else { value })
    }

    pub fn read_u64(&mut self) -> SerializedResult<u64> {
        let bytes: [u8; 8] = self.read_bytes(8)?.try_into().unwrap();
        let value = u64::from_ne_bytes(bytes);
        Ok(if self.swap { value.swap_bytes() } else { value })
    }

    pub fn read_i16(&mut self) -> SerializedResult<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> SerializedResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> SerializedResult<i64> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> SerializedResult<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> SerializedResult<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }
}

/// Append-only writer mirroring [`EndianReader`].
pub struct EndianWriter {
    data: Vec<u8>,
    swap: bool,
}

impl EndianWriter {
    pub fn new(swap: bool) -> Self {
        EndianWriter {
            data: Vec::default(),
            swap,
        }
    }

    /// Writer whose multi-byte output is big-endian on disk regardless of
    /// the host, for the always-big-endian file header.
    pub fn for_big_endian_disk() -> Self {
        EndianWriter::new(host_needs_swap_for_big_endian())
    }

    pub fn swaps(&self) -> bool {
        self.swap
    }

    pub fn position(&self) -> usize {
        self.data.len()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn write_bytes(
        &mut self,
        bytes: &[u8],
    ) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_cstr(
        &mut self,
        value: &str,
    ) {
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
    }

    /// Pads with zeroes up to the alignment boundary. Padding bytes are not
    /// semantically meaningful.
    pub fn align(
        &mut self,
        alignment: usize,
    ) {
        while self.data.len() % alignment != 0 {
            self.data.push(0);
        }
    }

    pub fn write_u8(
        &mut self,
        value: u8,
    ) {
        self.data.push(value);
    }

    pub fn write_bool(
        &mut self,
        value: bool,
    ) {
        self.data.push(value as u8);
    }

    pub fn write_u16(
        &mut self,
        value: u16,
    ) {
        let value = if self.swap { value.swap_bytes() } else { value };
        self.data.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn write_u32(
        &mut self,
        value: u32,
    ) {
        let value = if self.swap { value.swap_bytes() } else { value };
        self.data.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn write_u64(
        &mut self,
        value: u64,
    ) {
        let value = if self.swap { value.swap_bytes() } else { value };
        self.data.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn write_i16(
        &mut self,
        value: i16,
    ) {
        self.write_u16(value as u16);
    }

    pub fn write_i32(
        &mut self,
        value: i32,
    ) {
        self.write_u32(value as u32);
    }

    pub fn write_i64(
        &mut self,
        value: i64,
    ) {
        self.write_u64(value as u64);
    }

    pub fn write_f32(
        &mut self,
        value: f32,
    ) {
        self.write_u32(value.to_bits());
    }

    pub fn write_f64(
        &mut self,
        value: f64,
    ) {
        self.write_u64(value.to_bits());
    }
}
