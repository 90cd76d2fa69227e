use std::io;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
  /// Failure creating or opening the underlying file.
  #[error("I/O Error: {0}")]
  Io(#[from] io::Error),

  #[error("Invalid argument: {0}")]
  InvalidArgument(String),

  #[error("Entry of {size} bytes exceeds max payload size of {max} bytes")]
  ExceedsMaxSize { size: usize, max: u64 },

  #[error("Unexpected error reading log: {0}")]
  UnexpectedRead(#[source] io::Error),

  /// Shared so the log can keep it as its close cause.
  #[error("Unexpected error writing log: {0}")]
  UnexpectedWrite(#[source] Arc<io::Error>),

  #[error("Failed to complete torn entry at offset {offset}: {source}")]
  RepairFailed {
    offset: u64,
    #[source]
    source: Arc<io::Error>,
  },

  #[error("Log closed")]
  Closed,

  #[error("Log was opened read-only")]
  ReadOnly,

  /// A caller error raised from inside a traversal callback.
  #[error("Traversal aborted: {0}")]
  Aborted(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wraps an arbitrary error so a traversal callback can abort with it.
  /// The original error is reachable through `source()` or by downcasting.
  pub fn abort<E>(err: E) -> Self
  where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
  {
    Error::Aborted(err.into())
  }

  /// Returns true for write-path failures, which leave the log closed.
  pub fn is_fatal(&self) -> bool {
    matches!(self, Error::UnexpectedWrite(_) | Error::RepairFailed { .. })
  }

  /// Clones a fatal error. Other kinds may carry an unclonable source and
  /// yield `None`.
  pub(crate) fn try_clone_fatal(&self) -> Option<Error> {
    match self {
      Error::UnexpectedWrite(e) => Some(Error::UnexpectedWrite(Arc::clone(e))),
      Error::RepairFailed { offset, source } => Some(Error::RepairFailed {
        offset: *offset,
        source: Arc::clone(source),
      }),
      _ => None,
    }
  }
}
