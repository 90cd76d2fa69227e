use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::config::LogOptions;
use crate::error::{Error, Result};
use crate::fold::{Engine, Flow};
use crate::frame::{self, HeaderWidth};
use crate::record::Record;
use crate::reducer::{Filter, FilterMap, Fold, ForEach, Map, Reducer, SizeScan};
use crate::stream::FrameStream;

struct OpenLog<S> {
  engine: Engine<S>,
  /// Logical size: where the next append goes.
  size: u64,
  /// Encoding buffer for appends, reused across calls.
  frames: Vec<u8>,
}

enum State<S> {
  Open(OpenLog<S>),
  /// Terminal. `cause` holds the write failure that forced the close, if any.
  Closed { cause: Option<Error> },
}

impl<S> State<S> {
  fn open_mut(&mut self) -> Result<&mut OpenLog<S>> {
    match self {
      State::Open(log) => Ok(log),
      State::Closed { .. } => Err(Error::Closed),
    }
  }

  /// Drops the stream after a write-path failure.
  fn fail(&mut self, err: &Error) {
    error!(target: "foldlog", "Write failure, closing log: {}", err);
    *self = State::Closed {
      cause: err.try_clone_fatal(),
    };
  }
}

/// An append-only log of length-prefixed records stored in a single stream.
///
/// Every operation takes one exclusive lock for its full duration, so a
/// traversal never interleaves with an append. Traversal callbacks run with
/// that lock held: calling back into the same log from inside one deadlocks.
pub struct Log<S = File> {
  options: LogOptions,
  width: HeaderWidth,
  state: Mutex<State<S>>,
}

impl Log<File> {
  /// Opens (or creates) a log file with default options.
  pub fn open_path_default(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_path(path, LogOptions::default())
  }

  /// Opens (or creates) a log file. `read_only` and `permissions` only
  /// affect how the file itself is opened.
  pub fn open_path(path: impl AsRef<Path>, options: LogOptions) -> Result<Self> {
    options.validate()?;

    let mut open_opts = OpenOptions::new();
    open_opts.read(true);
    if !options.read_only {
      open_opts.write(true).create(true);
      #[cfg(unix)]
      {
        use std::os::unix::fs::OpenOptionsExt;
        open_opts.mode(options.permissions);
      }
    }

    let file = open_opts.open(path.as_ref())?;
    Self::open(file, options)
  }
}

impl<S: Read + Write + Seek> Log<S> {
  /// Opens a log over `stream`, scanning it once to find the logical size.
  /// A torn final entry left by an interrupted append is completed on disk
  /// and marked incomplete; that is routine recovery, not an error.
  pub fn open(stream: S, options: LogOptions) -> Result<Self> {
    options.validate()?;
    let width = HeaderWidth::for_max_payload(options.max_payload_size)?;

    let stream = FrameStream::new(stream, options.base_offset, options.read_buffer_size);
    let mut engine = Engine::new(stream, width, options.max_payload_size, options.read_only);

    let mut scan = SizeScan::default();
    let repaired = engine.traverse(&mut scan)?;
    let scanned = scan.finish();

    // The repaired frame is not handed to the scan, but it does occupy disk.
    let size = repaired.map_or(scanned, |tail| tail.end());

    debug!(target: "foldlog", "Opened log: size={} header_width={} repaired={}", size, width.len(), repaired.is_some());

    Ok(Self {
      options,
      width,
      state: Mutex::new(State::Open(OpenLog {
        engine,
        size,
        frames: Vec::new(),
      })),
    })
  }

  /// Closes the log and releases the stream. Every later call fails with
  /// `Error::Closed`.
  pub fn close(&self) -> Result<()> {
    let mut state = self.state.lock();
    state.open_mut()?;
    *state = State::Closed { cause: None };
    debug!(target: "foldlog", "Closed log");
    Ok(())
  }

  pub fn is_closed(&self) -> bool {
    matches!(*self.state.lock(), State::Closed { .. })
  }

  /// The write failure that closed the log, if it was not closed explicitly.
  pub fn close_cause(&self) -> Option<Error> {
    match &*self.state.lock() {
      State::Closed { cause } => cause.as_ref().and_then(Error::try_clone_fatal),
      State::Open(_) => None,
    }
  }

  /// Logical size in bytes, which is also the offset of the next append.
  pub fn size(&self) -> Result<u64> {
    Ok(self.state.lock().open_mut()?.size)
  }

  pub fn header_width(&self) -> HeaderWidth {
    self.width
  }

  pub fn options(&self) -> &LogOptions {
    &self.options
  }

  /// Largest payload `append` accepts. Reads are not limited by it.
  pub fn max_payload_size(&self) -> u64 {
    self.options.max_payload_size
  }

  /// Appends one entry and returns its offset.
  pub fn append(&self, payload: &[u8]) -> Result<u64> {
    let offsets = self.append_bulk(&[payload])?;
    Ok(offsets[0])
  }

  /// Appends a batch of entries with a single write and flush. Returns the
  /// offset of each entry, in input order.
  ///
  /// Every entry is validated before anything is written. A write or flush
  /// failure closes the log, since the stream is then in an unknown state.
  pub fn append_bulk<P: AsRef<[u8]>>(&self, payloads: &[P]) -> Result<Vec<u64>> {
    let mut state = self.state.lock();
    let log = state.open_mut()?;

    if self.options.read_only {
      return Err(Error::ReadOnly);
    }
    if payloads.is_empty() {
      return Err(Error::InvalidArgument("cannot append an empty batch".into()));
    }

    // 1. Validate and encode the whole batch
    log.frames.clear();
    let mut offsets = Vec::with_capacity(payloads.len());
    let mut written = 0u64;

    for payload in payloads {
      let payload = payload.as_ref();
      if payload.is_empty() {
        return Err(Error::InvalidArgument("cannot append an empty entry".into()));
      }
      if payload.len() as u64 > self.options.max_payload_size {
        return Err(Error::ExceedsMaxSize {
          size: payload.len(),
          max: self.options.max_payload_size,
        });
      }

      offsets.push(log.size + written);
      written += frame::encode_frame(self.width, payload, &mut log.frames)?;
    }

    // 2. Write + flush once
    let at = log.size;
    if let Err(e) = log.engine.write_at(at, &log.frames) {
      let err = Error::UnexpectedWrite(Arc::new(e));
      state.fail(&err);
      return Err(err);
    }

    log.size += written;
    Ok(offsets)
  }

  /// Reads the entry at `offset` without scanning the rest of the log.
  ///
  /// Returns `None` if no bytes exist at `offset`. A torn entry is returned
  /// as incomplete with whatever bytes are present; reads never repair.
  pub fn read(&self, offset: u64) -> Result<Option<Record>> {
    let mut state = self.state.lock();
    let log = state.open_mut()?;

    if offset > log.size {
      return Err(Error::InvalidArgument(format!(
        "offset {} is past the end of the log ({})",
        offset, log.size
      )));
    }

    log.engine.read_at(offset)
  }

  /// Runs a reducer over every entry from offset 0, stopping early on cutoff.
  ///
  /// The reducer keeps what it accumulated even when the traversal fails,
  /// so callers can inspect partial results afterwards.
  pub fn traverse<R: Reducer>(&self, reducer: &mut R) -> Result<()> {
    let mut state = self.state.lock();
    let log = state.open_mut()?;

    match log.engine.traverse(reducer) {
      Ok(Some(tail)) => {
        log.size = log.size.max(tail.end());
        Ok(())
      }
      Ok(None) => Ok(()),
      Err(err @ Error::RepairFailed { .. }) => {
        state.fail(&err);
        Err(err)
      }
      Err(err) => Err(err),
    }
  }

  pub fn for_each<F>(&self, f: F) -> Result<()>
  where
    F: FnMut(&Record) -> Result<Flow>,
  {
    let mut reducer = ForEach::new(f);
    self.traverse(&mut reducer)?;
    reducer.finish();
    Ok(())
  }

  pub fn map<T, F>(&self, f: F) -> Result<Vec<T>>
  where
    F: FnMut(&Record) -> Result<(T, Flow)>,
  {
    let mut reducer = Map::new(f);
    self.traverse(&mut reducer)?;
    Ok(reducer.finish())
  }

  /// Returns owned copies of the entries `pred` selects.
  pub fn filter<F>(&self, pred: F) -> Result<Vec<Record>>
  where
    F: FnMut(&Record) -> Result<(bool, Flow)>,
  {
    let mut reducer = Filter::new(pred);
    self.traverse(&mut reducer)?;
    Ok(reducer.finish())
  }

  pub fn filter_map<T, P, M>(&self, pred: P, map: M) -> Result<Vec<T>>
  where
    P: FnMut(&Record) -> Result<(bool, Flow)>,
    M: FnMut(&Record) -> Result<(T, Flow)>,
  {
    let mut reducer = FilterMap::new(pred, map);
    self.traverse(&mut reducer)?;
    Ok(reducer.finish())
  }

  pub fn fold<A, F>(&self, init: A, f: F) -> Result<A>
  where
    F: FnMut(&mut A, &Record) -> Result<Flow>,
  {
    let mut reducer = Fold::new(init, f);
    self.traverse(&mut reducer)?;
    Ok(reducer.finish())
  }
}
