use foldlog::{Flow, Log, LogOptions};
use proptest::prelude::*;
use std::fs::OpenOptions;
use std::path::Path;
use tempfile::TempDir;

// --- The Model ---
// A simple reference implementation: the list of entries in append order,
// each with its expected payload and completeness.
#[derive(Debug, Clone, PartialEq)]
struct ModelEntry {
  payload: Vec<u8>,
  complete: bool,
}

type Model = Vec<ModelEntry>;

// --- The Actions ---
#[derive(Debug, Clone)]
enum Action {
  Append { data: Vec<u8> },
  AppendBulk { batch: Vec<Vec<u8>> },
  Restart,
  /// Simulates a crash mid-append: chops bytes off the last frame, then reopens.
  Tear { chop_seed: u64 },
}

// --- The Strategy ---
fn action_strategy() -> impl Strategy<Value = Action> {
  prop_oneof![
    4 => prop::collection::vec(any::<u8>(), 1..64)
      .prop_map(|d| Action::Append { data: d }),

    3 => prop::collection::vec(prop::collection::vec(any::<u8>(), 1..32), 1..8)
      .prop_map(|b| Action::AppendBulk { batch: b }),

    1 => Just(Action::Restart),

    1 => any::<u64>().prop_map(|s| Action::Tear { chop_seed: s }),
  ]
}

// --- The Helpers ---
fn frame_len(payload_len: usize) -> u64 {
  2 + payload_len as u64 + 1
}

fn model_size(model: &Model) -> u64 {
  model.iter().map(|e| frame_len(e.payload.len())).sum()
}

fn chop_file(path: &Path, chop: u64) {
  let file = OpenOptions::new().write(true).open(path).unwrap();
  let len = file.metadata().unwrap().len();
  file.set_len(len - chop).unwrap();
}

// --- The Test Execution ---
proptest! {
  #![proptest_config(ProptestConfig::with_cases(50))]

  #[test]
  fn fuzz_log_consistency(actions in prop::collection::vec(action_strategy(), 1..60)) {
    // 1. Setup
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fuzz.aof");

    let mut log = Log::open_path(&path, LogOptions::default()).unwrap();
    let mut model: Model = Vec::new();

    // 2. Execute Actions
    for action in actions {
      match action {
        Action::Append { data } => {
          let expected = model_size(&model);
          let off = log.append(&data).unwrap();
          prop_assert_eq!(off, expected, "Offset mismatch");
          model.push(ModelEntry { payload: data, complete: true });
        },

        Action::AppendBulk { batch } => {
          let mut expected = model_size(&model);
          let offsets = log.append_bulk(&batch).unwrap();
          for (off, data) in offsets.iter().zip(&batch) {
            prop_assert_eq!(*off, expected, "Bulk offset mismatch");
            expected += frame_len(data.len());
          }
          model.extend(batch.into_iter().map(|payload| ModelEntry { payload, complete: true }));
        },

        Action::Restart => {
          drop(log);
          log = Log::open_path(&path, LogOptions::default()).unwrap();
        },

        Action::Tear { chop_seed } => {
          let Some(last) = model.last_mut() else { continue };
          let flen = frame_len(last.payload.len());
          // Leave at least one byte of the frame behind.
          let chop = 1 + chop_seed % (flen - 1);
          let kept = (flen - chop) as usize;

          drop(log);
          chop_file(&path, chop);
          log = Log::open_path(&path, LogOptions::default()).unwrap();

          // Bytes that never made it back are zero after repair. Payloads are
          // shorter than 256 bytes, so a lone low header byte still carries
          // the full size.
          let payload_kept = kept.saturating_sub(2).min(last.payload.len());
          for b in &mut last.payload[payload_kept..] {
            *b = 0;
          }
          last.complete = false;
        },
      }

      // 3. Continuous Verification
      prop_assert_eq!(log.size().unwrap(), model_size(&model));
      if let Some(last) = model.last() {
        let tip = model_size(&model) - frame_len(last.payload.len());
        let rec = log.read(tip).unwrap().expect("tip entry missing");
        prop_assert_eq!(rec.payload(), last.payload.as_slice(), "Data mismatch at tip");
      }
    }

    // 4. Final Full Verification
    let seen = log
      .map(|r| Ok((ModelEntry { payload: r.payload().to_vec(), complete: r.is_complete() }, Flow::Continue)))
      .unwrap();
    prop_assert_eq!(seen, model);
  }
}
