//! Tests for the library. Shared fixtures live here; the tests themselves are
//! split by area.

mod config;
mod reshape;
mod store;

use ndarray::{ArrayD, IxDyn};

use crate::prelude::*;

/// Installs a logger that plays well with the test harness.
fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

/// A fast spectroscopic dimension.
fn bias() -> Dimension {
  return Dimension::new("Bias", "V", vec![-1.0, -0.5, 0.0, 0.5, 1.0]).unwrap();
}

/// A slow spectroscopic dimension.
fn cycle() -> Dimension {
  return Dimension::new("Cycle", "", vec![0.0, 1.0, 2.0]).unwrap();
}

/// Dimensions with the given sizes and distinct, exactly representable
/// values.
fn dims_of(sizes: &[usize]) -> Vec<Dimension> {
  return sizes.iter()
    .enumerate()
    .map(|(i, n)| {
      let values = (0..*n).map(|k| (i as f64) * 100.0 + (k as f64) * 0.25);
      return Dimension::new(format!("Dim_{}", i), "um", values.collect())
        .unwrap();
    })
    .collect();
}

/// A [rows, cols] array holding `row * cols + col`.
fn counting(rows: usize, cols: usize) -> ArrayD<f64> {
  return ArrayD::from_shape_fn(IxDyn(&[rows, cols]), |ix| {
    return (ix[0] * cols + ix[1]) as f64;
  });
}

/// Writes a 4-position, 5x3-step main dataset under a new group.
fn write_sample(store: &mut MemoryStore) -> (NodeId, MainDataset) {
  let root = store.root();
  let group = store.create_group(root, "Measurement_000").unwrap();
  let x = Dimension::new("X", "um", vec![0.0, 1.5, 3.0, 4.5]).unwrap();
  let new = NewMain::new(
    "Raw_Data",
    "Current",
    "nA",
    vec![x].into(),
    vec![bias(), cycle()].into()
  );
  let main = write_main_dataset(
    store,
    group,
    counting(4, 15).into(),
    new,
    &WriteOptions::default()
  ).unwrap();
  return (group, main);
}
