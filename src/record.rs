use std::fmt;

use crate::frame::HeaderWidth;

/// One decoded frame together with its position in the log.
///
/// During traversal the log hands every callback the same `Record`, refilled
/// in place for each frame. The borrow only lives for one callback
/// invocation; call `.clone()` to keep a record around. Cloning copies just
/// the payload bytes, not the scratch capacity behind them.
pub struct Record {
  offset: u64,
  size: usize,
  bytes: Vec<u8>,
  complete: bool,
  width: HeaderWidth,
}

impl Record {
  pub(crate) fn with_capacity(width: HeaderWidth, capacity: usize) -> Self {
    Self {
      offset: 0,
      size: 0,
      bytes: Vec::with_capacity(capacity),
      complete: false,
      width,
    }
  }

  /// Byte position of the frame, relative to the start of the log.
  pub fn offset(&self) -> u64 {
    self.offset
  }

  /// Payload length as recorded in the frame header.
  pub fn size(&self) -> usize {
    self.size
  }

  pub fn payload(&self) -> &[u8] {
    &self.bytes[..self.size]
  }

  /// False for entries whose append never finished and were padded by repair,
  /// or for a torn tail observed through a direct read.
  pub fn is_complete(&self) -> bool {
    self.complete
  }

  /// Length of the whole frame on disk (header + payload + flag).
  pub fn frame_len(&self) -> u64 {
    self.width.frame_len(self.size)
  }

  pub fn into_payload(mut self) -> Vec<u8> {
    self.bytes.truncate(self.size);
    self.bytes
  }

  /// Prepares the record for decoding a new frame at `offset`.
  pub(crate) fn reset(&mut self, offset: u64) {
    self.offset = offset;
    self.size = 0;
    self.complete = false;
  }

  /// Sets the payload length and returns the buffer the payload is read into.
  /// The buffer is zeroed so bytes missing from a torn frame read as zeros,
  /// matching what repair writes to disk.
  pub(crate) fn payload_buf(&mut self, size: usize) -> &mut [u8] {
    self.size = size;
    if self.bytes.len() < size {
      self.bytes.resize(size, 0);
    }
    let buf = &mut self.bytes[..size];
    buf.fill(0);
    buf
  }

  pub(crate) fn set_complete(&mut self, complete: bool) {
    self.complete = complete;
  }
}

impl Clone for Record {
  fn clone(&self) -> Self {
    Self {
      offset: self.offset,
      size: self.size,
      bytes: self.payload().to_vec(),
      complete: self.complete,
      width: self.width,
    }
  }
}

impl PartialEq for Record {
  fn eq(&self, other: &Self) -> bool {
    self.offset == other.offset
      && self.complete == other.complete
      && self.width == other.width
      && self.payload() == other.payload()
  }
}

impl Eq for Record {}

impl fmt::Debug for Record {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Record")
      .field("offset", &self.offset)
      .field("size", &self.size)
      .field("complete", &self.complete)
      .field("payload", &self.payload())
      .finish()
  }
}

impl fmt::Display for Record {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{{offset: {}, size: {}, complete: {}, bytes: {:?}}}",
      self.offset,
      self.size,
      self.complete,
      self.payload()
    )
  }
}
