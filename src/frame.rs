use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Byte order of every multi-byte field on disk.
type Endian = LittleEndian;

/// Flag byte of an entry that was padded during repair.
pub const FLAG_INCOMPLETE: u8 = 0x01;
/// Flag byte written after a fully appended entry.
pub const FLAG_COMPLETE: u8 = 0x02;
/// Value observed when the flag byte was never written.
pub const FLAG_ABSENT: u8 = 0x00;

pub const FLAG_LEN: usize = 1;

/// Width of the size header that prefixes every frame.
///
/// On-disk frame layout:
///
/// [Size: 2 or 4]
/// [Payload: Size]
/// [Flag: 1]
///
/// The width is derived once from `max_payload_size` and stays fixed for
/// the lifetime of a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderWidth {
  U16,
  U32,
}

impl HeaderWidth {
  pub fn for_max_payload(max_payload_size: u64) -> Result<Self> {
    if max_payload_size <= u16::MAX as u64 {
      Ok(HeaderWidth::U16)
    } else if max_payload_size <= u32::MAX as u64 {
      Ok(HeaderWidth::U32)
    } else {
      Err(Error::InvalidArgument(format!(
        "max_payload_size {} does not fit a 32-bit size header",
        max_payload_size
      )))
    }
  }

  pub const fn len(self) -> usize {
    match self {
      HeaderWidth::U16 => 2,
      HeaderWidth::U32 => 4,
    }
  }

  /// Largest size this header can carry.
  pub const fn max_size(self) -> u64 {
    match self {
      HeaderWidth::U16 => u16::MAX as u64,
      HeaderWidth::U32 => u32::MAX as u64,
    }
  }

  /// Total on-disk length of a frame holding `payload_len` bytes.
  pub const fn frame_len(self, payload_len: usize) -> u64 {
    (self.len() + payload_len + FLAG_LEN) as u64
  }

  /// Writes `size` into `buf`, which must be exactly `self.len()` bytes.
  pub fn encode(self, size: usize, buf: &mut [u8]) -> Result<()> {
    if size as u64 > self.max_size() {
      return Err(Error::InvalidArgument(format!(
        "size {} does not fit a {}-byte header",
        size,
        self.len()
      )));
    }
    match self {
      HeaderWidth::U16 => Endian::write_u16(buf, size as u16),
      HeaderWidth::U32 => Endian::write_u32(buf, size as u32),
    }
    Ok(())
  }

  /// Reads a size back out of a fully populated header buffer.
  pub fn decode(self, buf: &[u8]) -> usize {
    match self {
      HeaderWidth::U16 => Endian::read_u16(buf) as usize,
      HeaderWidth::U32 => Endian::read_u32(buf) as usize,
    }
  }
}

/// Serializes one complete frame onto the end of `out`.
pub fn encode_frame(width: HeaderWidth, payload: &[u8], out: &mut Vec<u8>) -> Result<u64> {
  let mut header = [0u8; 4];
  let header = &mut header[..width.len()];
  width.encode(payload.len(), header)?;

  out.extend_from_slice(header);
  out.extend_from_slice(payload);
  out.push(FLAG_COMPLETE);

  Ok(width.frame_len(payload.len()))
}
