use std::io::{self, Read, Seek, Write};
use std::sync::Arc;

use tracing::warn;

use crate::error::{Error, Result};
use crate::frame::{FLAG_ABSENT, FLAG_COMPLETE, FLAG_INCOMPLETE, FLAG_LEN, HeaderWidth};
use crate::record::Record;
use crate::reducer::Reducer;
use crate::stream::FrameStream;

/// Returned by traversal callbacks to keep going or stop early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
  #[default]
  Continue,
  /// Stop after the current record. Not an error.
  Cutoff,
}

impl Flow {
  pub fn is_cutoff(self) -> bool {
    self == Flow::Cutoff
  }

  /// Cutoff if either side asks for it.
  pub fn or(self, other: Flow) -> Flow {
    if self.is_cutoff() || other.is_cutoff() {
      Flow::Cutoff
    } else {
      Flow::Continue
    }
  }
}

/// Byte accounting for a single decode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Decoded {
  /// Bytes of the frame physically present in the stream.
  pub present: u64,
  /// Bytes needed to make the frame full length. Non-zero only for a torn tail.
  pub missing: u64,
}

impl Decoded {
  pub fn is_end(&self) -> bool {
    self.present == 0 && self.missing == 0
  }
}

/// A torn tail frame that a traversal padded out to full length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RepairedTail {
  pub offset: u64,
  pub frame_len: u64,
}

impl RepairedTail {
  pub fn end(&self) -> u64 {
    self.offset + self.frame_len
  }
}

/// Decoding and repair state owned by a log: the stream plus the scratch
/// buffers reused by every scan.
pub(crate) struct Engine<S> {
  stream: FrameStream<S>,
  width: HeaderWidth,
  read_only: bool,
  header: [u8; 4],
  shared: Record,
}

impl<S: Read + Write + Seek> Engine<S> {
  pub fn new(stream: FrameStream<S>, width: HeaderWidth, max_payload_size: u64, read_only: bool) -> Self {
    let capacity = max_payload_size.min(u16::MAX as u64) as usize;
    Self {
      stream,
      width,
      read_only,
      header: [0u8; 4],
      shared: Record::with_capacity(width, capacity),
    }
  }

  /// Decodes the single frame at `offset` into a fresh record. Never repairs.
  /// Returns `None` when the stream holds no bytes at `offset`.
  pub fn read_at(&mut self, offset: u64) -> Result<Option<Record>> {
    self.stream.seek(offset).map_err(Error::UnexpectedRead)?;

    let mut record = Record::with_capacity(self.width, 0);
    let decoded = decode_frame(
      &mut self.stream,
      self.width,
      &mut self.header,
      &mut record,
      offset,
    )?;

    if decoded.is_end() {
      return Ok(None);
    }
    Ok(Some(record))
  }

  /// Scans every frame from offset 0, feeding each one to `reducer`.
  ///
  /// A torn final frame is padded on disk and ends the scan; the padded
  /// frame is not delivered to the reducer in this call and shows up as an
  /// incomplete record on the next scan or read.
  pub fn traverse<R: Reducer>(&mut self, reducer: &mut R) -> Result<Option<RepairedTail>> {
    let mut offset = 0u64;
    self.stream.seek(0).map_err(Error::UnexpectedRead)?;

    loop {
      let decoded = decode_frame(
        &mut self.stream,
        self.width,
        &mut self.header,
        &mut self.shared,
        offset,
      )?;

      if decoded.missing > 0 {
        let tail = RepairedTail {
          offset,
          frame_len: self.shared.frame_len(),
        };

        if self.read_only {
          warn!(target: "foldlog", "Torn entry at offset {} is missing {} bytes; read-only log left as is", offset, decoded.missing);
          return Ok(None);
        }

        warn!(target: "foldlog", "Torn entry at offset {} is missing {} bytes. Completing it as incomplete.", offset, decoded.missing);
        self.repair(offset + decoded.present, decoded.missing)?;
        return Ok(Some(tail));
      }

      if decoded.is_end() {
        return Ok(None);
      }

      if reducer.step(&self.shared)?.is_cutoff() {
        return Ok(None);
      }

      offset += self.shared.frame_len();
    }
  }

  /// Pads a torn frame: `missing` zero bytes, the last one replaced by the
  /// incomplete flag. `at` is the logical position right after the bytes
  /// that made it to disk.
  fn repair(&mut self, at: u64, missing: u64) -> Result<()> {
    let failed = |source: io::Error| Error::RepairFailed {
      offset: at,
      source: Arc::new(source),
    };

    let len = usize::try_from(missing)
      .map_err(|_| failed(io::Error::new(io::ErrorKind::InvalidInput, "torn entry too large to complete")))?;
    let mut padding = vec![0u8; len];
    padding[len - 1] = FLAG_INCOMPLETE;

    self.stream.seek(at).map_err(failed)?;
    self.stream.write_all(&padding).map_err(failed)?;
    self.stream.flush().map_err(failed)?;
    Ok(())
  }

  /// Writes already-encoded frames at logical offset `at` and flushes them.
  pub fn write_at(&mut self, at: u64, frames: &[u8]) -> io::Result<()> {
    self.stream.seek(at)?;
    self.stream.write_all(frames)?;
    self.stream.flush()
  }

  #[cfg(test)]
  pub fn stream_mut(&mut self) -> &mut S {
    self.stream.inner_mut()
  }
}

/// Reads one frame at the stream's current position into `record`.
///
/// Short reads are retried until the frame is complete or the stream runs
/// out. Bytes that never arrived are counted in `missing` instead of being
/// treated as an error, so a torn tail can be repaired by the caller.
pub(crate) fn decode_frame<S: Read + Write + Seek>(
  stream: &mut FrameStream<S>,
  width: HeaderWidth,
  header: &mut [u8; 4],
  record: &mut Record,
  offset: u64,
) -> Result<Decoded> {
  record.reset(offset);

  // 1. Size header
  let header = &mut header[..width.len()];
  header.fill(0);
  let header_read = stream.read_full(header).map_err(Error::UnexpectedRead)?;
  if header_read == 0 {
    return Ok(Decoded { present: 0, missing: 0 });
  }

  // A partial header decodes with its absent high bytes as zero, which is
  // exactly what repair writes for them. The size is bounded by the header
  // width only: `max_payload_size` limits appends, and a log written under
  // a larger limit stays readable.
  let size = width.decode(header);

  // 2. Payload, only if the header arrived whole
  let payload = record.payload_buf(size);
  let payload_read = if header_read == width.len() {
    stream.read_full(payload).map_err(Error::UnexpectedRead)?
  } else {
    0
  };

  // 3. Flag byte, only if the payload arrived whole
  let mut flag = [FLAG_ABSENT; FLAG_LEN];
  let flag_read = if payload_read == size {
    stream.read_full(&mut flag).map_err(Error::UnexpectedRead)?
  } else {
    0
  };

  record.set_complete(flag[0] == FLAG_COMPLETE);

  let missing = (width.len() - header_read) + (size - payload_read) + (FLAG_LEN - flag_read);
  let present = header_read + payload_read + flag_read;

  Ok(Decoded {
    present: present as u64,
    missing: missing as u64,
  })
}
