mod common;
use common::{TestEnv, frame_len};
use foldlog::{Error, Flow, HeaderWidth, Log, LogOptions};
use std::io::Cursor;

#[test]
fn test_single_append_read() {
  let env = TestEnv::with_default();

  let off1 = env.log.append(b"item_1").unwrap();
  let off2 = env.log.append(b"item_2").unwrap();

  // First entry starts the log, the second follows its frame.
  assert_eq!(off1, 0);
  assert_eq!(off2, frame_len(6));

  let rec1 = env.log.read(off1).unwrap().expect("Item 1 not found");
  let rec2 = env.log.read(off2).unwrap().expect("Item 2 not found");

  assert_eq!(rec1.payload(), b"item_1");
  assert_eq!(rec2.payload(), b"item_2");
  assert!(rec1.is_complete() && rec2.is_complete());
  assert_eq!(rec2.offset(), off2);
}

#[test]
fn test_bulk_write_read() {
  let env = TestEnv::with_default();

  let batch: Vec<&[u8]> = vec![b"b_1", b"b_2_", b"b_3__"];
  let offsets = env.log.append_bulk(&batch).unwrap();

  assert_eq!(offsets, vec![0, frame_len(3), frame_len(3) + frame_len(4)]);

  // Random access check
  let rec = env.log.read(offsets[1]).unwrap().unwrap();
  assert_eq!(rec.payload(), b"b_2_");

  // Append single after batch
  let off = env.log.append(b"b_4").unwrap();
  assert_eq!(off, frame_len(3) + frame_len(4) + frame_len(5));
  assert_eq!(env.log.size().unwrap(), off + frame_len(3));
}

#[test]
fn test_restart_consistency() {
  let env = TestEnv::with_default();
  env.log.append(b"persistent_data").unwrap();
  let size_before = env.log.size().unwrap();

  let env = env.reopen(LogOptions::default());

  // Size is recovered by scanning
  assert_eq!(env.log.size().unwrap(), size_before);
  let rec = env.log.read(0).unwrap().expect("Data lost on restart");
  assert_eq!(rec.payload(), b"persistent_data");

  // Offsets continue after the existing data
  let off = env.log.append(b"new_data").unwrap();
  assert_eq!(off, size_before);
}

#[test]
fn test_reopen_with_smaller_max() {
  let env = TestEnv::with_default();
  let big = vec![0x5Au8; 200];
  env.log.append(&big).unwrap();
  let off_small = env.log.append(b"s").unwrap();
  let size_before = env.log.size().unwrap();

  // Same two-byte header, lower append limit.
  let env = env.reopen(LogOptions::new(100));
  assert_eq!(env.log.header_width(), HeaderWidth::U16);
  assert_eq!(env.log.max_payload_size(), 100);
  assert_eq!(env.log.size().unwrap(), size_before);

  let rec = env.log.read(0).unwrap().unwrap();
  assert_eq!(rec.payload(), big.as_slice());
  assert!(rec.is_complete());

  let sizes = env.log.map(|r| Ok((r.size(), Flow::Continue))).unwrap();
  assert_eq!(sizes, vec![200, 1]);
  assert_eq!(env.log.read(off_small).unwrap().unwrap().payload(), b"s");

  // The lower limit still applies to new entries.
  assert!(matches!(
    env.log.append(&big),
    Err(Error::ExceedsMaxSize { size: 200, max: 100 })
  ));
  assert_eq!(env.log.append(&[1u8; 100]).unwrap(), size_before);
}

#[test]
fn test_rejection_boundaries() {
  let mut opts = LogOptions::default();
  opts.max_payload_size = 10;
  let env = TestEnv::new(opts);

  assert!(matches!(env.log.append(b""), Err(Error::InvalidArgument(_))));
  assert!(matches!(
    env.log.append(&[7u8; 11]),
    Err(Error::ExceedsMaxSize { size: 11, max: 10 })
  ));
  assert_eq!(env.log.append(&[7u8; 10]).unwrap(), 0);

  let size = env.log.size().unwrap();
  assert!(matches!(env.log.read(size + 1), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_invalid_config() {
  let res = Log::open(Cursor::new(Vec::new()), LogOptions::new(0));
  assert!(matches!(res, Err(Error::InvalidArgument(_))));

  let res = Log::open(Cursor::new(Vec::new()), LogOptions::new(u32::MAX as u64 + 1));
  assert!(matches!(res, Err(Error::InvalidArgument(_))));
}

#[test]
fn test_wide_header() {
  let opts = LogOptions::new(100_000);
  let log = Log::open(Cursor::new(Vec::new()), opts).unwrap();
  assert_eq!(log.header_width(), HeaderWidth::U32);

  let big = vec![0xABu8; 70_000];
  let off1 = log.append(&big).unwrap();
  let off2 = log.append(b"tail").unwrap();
  assert_eq!(off2, off1 + 4 + 70_000 + 1);

  let rec = log.read(off1).unwrap().unwrap();
  assert_eq!(rec.size(), 70_000);
  assert_eq!(rec.payload(), big.as_slice());
  assert_eq!(log.read(off2).unwrap().unwrap().payload(), b"tail");
}

#[test]
fn test_base_offset_preserves_prefix() {
  let prefix = b"MAGICHDR".to_vec();
  let mut opts = LogOptions::default();
  opts.base_offset = prefix.len() as u64;

  let log = Log::open(Cursor::new(prefix), opts).unwrap();
  assert_eq!(log.size().unwrap(), 0);
  assert_eq!(log.append(b"abc").unwrap(), 0);
  assert_eq!(log.append(b"de").unwrap(), frame_len(3));
  let rec = log.read(frame_len(3)).unwrap().unwrap();
  assert_eq!(rec.payload(), b"de");
  assert_eq!(rec.offset(), frame_len(3));
}

#[test]
fn test_read_only_reopen() {
  let env = TestEnv::with_default();
  env.log.append(b"alpha").unwrap();
  env.log.append(b"beta").unwrap();

  let mut opts = LogOptions::default();
  opts.read_only = true;
  let env = env.reopen(opts);

  let payloads = env.log.map(|r| Ok((r.payload().to_vec(), Flow::Continue))).unwrap();
  assert_eq!(payloads, vec![b"alpha".to_vec(), b"beta".to_vec()]);
  assert!(matches!(env.log.append(b"gamma"), Err(Error::ReadOnly)));
}

#[cfg(unix)]
#[test]
fn test_permissions_applied_on_create() {
  use std::os::unix::fs::PermissionsExt;

  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("perm.aof");
  let mut opts = LogOptions::default();
  opts.permissions = 0o600;

  let _log = Log::open_path(&path, opts).unwrap();
  let mode = std::fs::metadata(&path).unwrap().permissions().mode();
  assert_eq!(mode & 0o777, 0o600);
}
