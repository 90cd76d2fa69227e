//! # foldlog
//!
//! `foldlog` is an append-only record log kept in a single file: a sequence
//! of length-prefixed entries with append, random reads by byte offset, and
//! fold-style full scans.
//!
//! ## Key Features
//!
//! * **Simple Framing**: `[size][payload][flag]`, with a 2 or 4 byte
//!   little-endian size header chosen from the configured max payload size.
//! * **Crash Recovery**: An append interrupted mid-write leaves a torn final
//!   entry. The next scan pads it to full length and flags it incomplete,
//!   so the file is always a well-formed sequence of frames.
//! * **Fold-Powered Scans**: `for_each`, `map`, `filter`, `filter_map` and
//!   `fold` are all built on one traversal, with early cutoff.
//! * **Embeddable**: A `base_offset` lets the log live behind a custom header
//!   in any `Read + Write + Seek` stream.
//!
//! ## Example
//!
//! ```no_run
//! use foldlog::{Flow, Log};
//!
//! # fn main() -> foldlog::Result<()> {
//! let log = Log::open_path_default("events.aof")?;
//!
//! let offset = log.append(b"first entry")?;
//! let offsets = log.append_bulk(&[b"second".as_slice(), b"third".as_slice()])?;
//!
//! let entry = log.read(offset)?.expect("just appended");
//! assert_eq!(entry.payload(), b"first entry");
//!
//! let sizes = log.map(|e| Ok((e.size(), Flow::Continue)))?;
//! assert_eq!(sizes.len(), 1 + offsets.len());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod fold;
mod frame;
mod log;
mod record;
mod reducer;
mod stream;

pub use config::{DEFAULT_MAX_PAYLOAD_SIZE, LogOptions, MAX_SUPPORTED_PAYLOAD_SIZE};
pub use error::{Error, Result};
pub use fold::Flow;
pub use frame::{FLAG_COMPLETE, FLAG_INCOMPLETE, HeaderWidth};
pub use log::Log;
pub use record::Record;
pub use reducer::{Filter, FilterMap, Fold, ForEach, Map, Reducer};
