use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};

/// The byte stream a log lives in, addressed by logical offsets.
///
/// Logical offset 0 maps to `base_offset` in the underlying stream. Reads go
/// through a buffer; writes bypass it and land at the current position, so a
/// write must always follow a `seek` (which drops any buffered bytes).
pub(crate) struct FrameStream<S> {
  reader: BufReader<S>,
  base_offset: u64,
}

impl<S: Read + Write + Seek> FrameStream<S> {
  pub fn new(inner: S, base_offset: u64, buffer_size: usize) -> Self {
    Self {
      reader: BufReader::with_capacity(buffer_size, inner),
      base_offset,
    }
  }

  /// Positions the stream at a logical offset.
  pub fn seek(&mut self, offset: u64) -> io::Result<()> {
    let target = self
      .base_offset
      .checked_add(offset)
      .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "offset overflows stream position"))?;
    self.reader.seek(SeekFrom::Start(target))?;
    Ok(())
  }

  /// Fills `buf` as far as the stream allows, retrying short reads.
  /// Returns the number of bytes read; less than `buf.len()` means the
  /// stream ran out.
  pub fn read_full(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
      match self.reader.read(&mut buf[filled..]) {
        Ok(0) => break,
        Ok(n) => filled += n,
        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
        Err(e) => return Err(e),
      }
    }
    Ok(filled)
  }

  /// Writes at the position set by the preceding `seek`.
  pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
    self.reader.get_mut().write_all(bytes)
  }

  pub fn flush(&mut self) -> io::Result<()> {
    self.reader.get_mut().flush()
  }

  #[cfg(test)]
  pub fn inner(&self) -> &S {
    self.reader.get_ref()
  }

  #[cfg(test)]
  pub fn inner_mut(&mut self) -> &mut S {
    self.reader.get_mut()
  }
}
