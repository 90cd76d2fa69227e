use crate::error::{Error, Result};

/// Default upper bound on a single entry's payload (fits a 2-byte header).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u64 = 65535;

/// Largest payload size a 4-byte header can describe.
pub const MAX_SUPPORTED_PAYLOAD_SIZE: u64 = u32::MAX as u64;

#[derive(Debug, Clone)]
pub struct LogOptions {
  /// Upper bound on a single entry's payload length in bytes.
  /// Also selects the on-disk header width: 2 bytes up to 65535,
  /// 4 bytes beyond that.
  /// Default: 65535.
  pub max_payload_size: u64,

  /// Byte position in the underlying stream where the log begins.
  /// Everything before it is left untouched, so the log can live
  /// behind a custom file header.
  /// Default: 0.
  pub base_offset: u64,

  /// Unix permission bits used when `Log::open_path` creates the file.
  /// Default: 0o644.
  pub permissions: u32,

  /// Open the file without write access. Appends are rejected and a
  /// torn tail is reported but never repaired.
  /// Default: false.
  pub read_only: bool,

  /// Capacity of the buffer used for sequential scans.
  /// Default: 64 KB.
  pub read_buffer_size: usize,
}

impl Default for LogOptions {
  fn default() -> Self {
    Self {
      max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
      base_offset: 0,
      permissions: 0o644,
      read_only: false,
      read_buffer_size: 64 * 1024, // 64 KB
    }
  }
}

impl LogOptions {
  pub fn new(max_payload_size: u64) -> Self {
    Self {
      max_payload_size,
      ..Default::default()
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.max_payload_size < 1 {
      return Err(Error::InvalidArgument("max_payload_size must be at least 1".into()));
    }
    if self.max_payload_size > MAX_SUPPORTED_PAYLOAD_SIZE {
      return Err(Error::InvalidArgument(format!(
        "max_payload_size {} needs more than a 4-byte header",
        self.max_payload_size
      )));
    }
    if self.read_buffer_size == 0 {
      return Err(Error::InvalidArgument("read_buffer_size must be at least 1".into()));
    }
    Ok(())
  }
}
