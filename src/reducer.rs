//! Reducers plug into the log's traversal engine. Each one sees every record
//! in order, may stop the scan early with `Flow::Cutoff`, and yields an
//! accumulated result once the scan is over.
//!
//! Records are borrowed from the log's scratch space and are only valid for
//! the duration of one `step`. Reducers that keep records clone them.

use crate::error::Result;
use crate::fold::Flow;
use crate::record::Record;

mod sealed {
  pub trait Sealed {}
}

/// The contract every reducer implements. Sealed: the set of reducers is
/// closed, use [`Fold`] for anything custom.
pub trait Reducer: sealed::Sealed {
  type Output;

  /// Consumes one record. An error aborts the traversal and is returned to
  /// the caller unchanged.
  fn step(&mut self, record: &Record) -> Result<Flow>;

  /// Returns whatever was accumulated, including after an aborted scan.
  fn finish(self) -> Self::Output;
}

/// Calls a function for every record.
pub struct ForEach<F> {
  f: F,
}

impl<F> ForEach<F>
where
  F: FnMut(&Record) -> Result<Flow>,
{
  pub fn new(f: F) -> Self {
    Self { f }
  }
}

impl<F> sealed::Sealed for ForEach<F> {}

impl<F> Reducer for ForEach<F>
where
  F: FnMut(&Record) -> Result<Flow>,
{
  type Output = ();

  fn step(&mut self, record: &Record) -> Result<Flow> {
    (self.f)(record)
  }

  fn finish(self) {}
}

/// Collects one value per record.
pub struct Map<F, T> {
  f: F,
  values: Vec<T>,
}

impl<F, T> Map<F, T>
where
  F: FnMut(&Record) -> Result<(T, Flow)>,
{
  pub fn new(f: F) -> Self {
    Self { f, values: Vec::new() }
  }

  pub fn values(&self) -> &[T] {
    &self.values
  }
}

impl<F, T> sealed::Sealed for Map<F, T> {}

impl<F, T> Reducer for Map<F, T>
where
  F: FnMut(&Record) -> Result<(T, Flow)>,
{
  type Output = Vec<T>;

  fn step(&mut self, record: &Record) -> Result<Flow> {
    let (value, flow) = (self.f)(record)?;
    self.values.push(value);
    Ok(flow)
  }

  fn finish(self) -> Vec<T> {
    self.values
  }
}

/// Keeps owned copies of the records a predicate selects.
pub struct Filter<F> {
  pred: F,
  records: Vec<Record>,
}

impl<F> Filter<F>
where
  F: FnMut(&Record) -> Result<(bool, Flow)>,
{
  pub fn new(pred: F) -> Self {
    Self {
      pred,
      records: Vec::new(),
    }
  }

  pub fn records(&self) -> &[Record] {
    &self.records
  }
}

impl<F> sealed::Sealed for Filter<F> {}

impl<F> Reducer for Filter<F>
where
  F: FnMut(&Record) -> Result<(bool, Flow)>,
{
  type Output = Vec<Record>;

  fn step(&mut self, record: &Record) -> Result<Flow> {
    let (include, flow) = (self.pred)(record)?;
    if include {
      self.records.push(record.clone());
    }
    Ok(flow)
  }

  fn finish(self) -> Vec<Record> {
    self.records
  }
}

/// Maps only the records a predicate selects. Stops if either the predicate
/// or the mapping asks for a cutoff.
pub struct FilterMap<P, M, T> {
  pred: P,
  map: M,
  values: Vec<T>,
}

impl<P, M, T> FilterMap<P, M, T>
where
  P: FnMut(&Record) -> Result<(bool, Flow)>,
  M: FnMut(&Record) -> Result<(T, Flow)>,
{
  pub fn new(pred: P, map: M) -> Self {
    Self {
      pred,
      map,
      values: Vec::new(),
    }
  }

  pub fn values(&self) -> &[T] {
    &self.values
  }
}

impl<P, M, T> sealed::Sealed for FilterMap<P, M, T> {}

impl<P, M, T> Reducer for FilterMap<P, M, T>
where
  P: FnMut(&Record) -> Result<(bool, Flow)>,
  M: FnMut(&Record) -> Result<(T, Flow)>,
{
  type Output = Vec<T>;

  fn step(&mut self, record: &Record) -> Result<Flow> {
    let (include, pred_flow) = (self.pred)(record)?;
    if !include {
      return Ok(pred_flow);
    }
    let (value, map_flow) = (self.map)(record)?;
    self.values.push(value);
    Ok(pred_flow.or(map_flow))
  }

  fn finish(self) -> Vec<T> {
    self.values
  }
}

/// Threads a caller-seeded accumulator through every record.
pub struct Fold<F, A> {
  f: F,
  acc: A,
}

impl<F, A> Fold<F, A>
where
  F: FnMut(&mut A, &Record) -> Result<Flow>,
{
  pub fn new(init: A, f: F) -> Self {
    Self { f, acc: init }
  }

  pub fn value(&self) -> &A {
    &self.acc
  }
}

impl<F, A> sealed::Sealed for Fold<F, A> {}

impl<F, A> Reducer for Fold<F, A>
where
  F: FnMut(&mut A, &Record) -> Result<Flow>,
{
  type Output = A;

  fn step(&mut self, record: &Record) -> Result<Flow> {
    (self.f)(&mut self.acc, record)
  }

  fn finish(self) -> A {
    self.acc
  }
}

/// Sums on-disk frame lengths. Run once at open time to find where the next
/// append goes.
#[derive(Debug, Default)]
pub(crate) struct SizeScan {
  size: u64,
}

impl sealed::Sealed for SizeScan {}

impl Reducer for SizeScan {
  type Output = u64;

  fn step(&mut self, record: &Record) -> Result<Flow> {
    self.size += record.frame_len();
    Ok(Flow::Continue)
  }

  fn finish(self) -> u64 {
    self.size
  }
}
