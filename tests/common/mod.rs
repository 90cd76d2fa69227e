use foldlog::{Log, LogOptions};
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
  pub log: Log,
  // The TempDir guard must be kept alive to prevent premature deletion of the directory.
  pub _dir: TempDir,
  pub path: PathBuf,
}

impl TestEnv {
  pub fn new(options: LogOptions) -> Self {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.aof");

    let log = Log::open_path(&path, options).unwrap();

    Self { log, _dir: dir, path }
  }

  pub fn with_default() -> Self {
    Self::new(LogOptions::default())
  }

  /// Drops the open log and opens the same file again.
  #[allow(dead_code)]
  pub fn reopen(self, options: LogOptions) -> Self {
    let TestEnv { log, _dir, path } = self;
    drop(log);
    let log = Log::open_path(&path, options).unwrap();
    Self { log, _dir, path }
  }
}

/// On-disk length of a frame with a 2-byte header.
#[allow(dead_code)]
pub fn frame_len(payload_len: usize) -> u64 {
  2 + payload_len as u64 + 1
}
