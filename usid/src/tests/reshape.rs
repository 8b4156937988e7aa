use ndarray::IxDyn;

use crate::config::AxisOrder;
use crate::prelude::*;
use crate::reshape::{POSITIONS, SPECTRAL_STEP};
use crate::tests::*;

/// Options with a given axis order.
fn opts(axis_order: AxisOrder) -> ReshapeOptions {
  return ReshapeOptions { axis_order };
}

/// The spectroscopic ancillary of the bias/cycle scenario.
fn bias_cycle() -> Ancillary {
  return Ancillary::from_dimensions(
    &[bias(), cycle()],
    Orientation::Spectroscopic
  ).unwrap();
}

/// A position ancillary with the given sizes, fastest first.
fn positions(sizes: &[usize]) -> Ancillary {
  return Ancillary::from_dimensions(&dims_of(sizes), Orientation::Position)
    .unwrap();
}

#[test]
fn test_to_nd_scenario() {
  init_logger();
  let main = MainArray::from(counting(4, 15));
  let pos = positions(&[4]);
  let spec = bias_cycle();
  let nd = to_nd(
    &main,
    Some((&pos).into()),
    Some((&spec).into()),
    &ReshapeOptions::default()
  ).unwrap();
  assert_eq!(nd.status, ReshapeStatus::Complete);
  assert_eq!(nd.array.shape(), &[4, 3, 5]);
  assert_eq!(nd.labels, vec!["Dim_0", "Cycle", "Bias"]);
  let array = nd.array.materialize();
  for p in 0..4 {
    for c in 0..3 {
      for b in 0..5 {
        let expected = (p * 15 + c * 5 + b) as f64;
        assert_eq!(array[IxDyn(&[p, c, b])], expected);
      }
    }
  }
  // same data, axes in stored order
  let stored = to_nd(
    &main,
    Some((&pos).into()),
    Some((&spec).into()),
    &opts(AxisOrder::AsStored)
  ).unwrap();
  assert_eq!(stored.status, ReshapeStatus::Complete);
  assert_eq!(stored.array.shape(), &[4, 5, 3]);
  assert_eq!(stored.labels, vec!["Dim_0", "Bias", "Cycle"]);
  let array = stored.array.materialize();
  assert_eq!(array[IxDyn(&[2, 4, 1])], (2 * 15 + 5 + 4) as f64);
}

#[test]
fn test_to_nd_two_position_dims() {
  let main = MainArray::from(counting(6, 15));
  let pos = positions(&[2, 3]);
  let spec = bias_cycle();
  let nd = to_nd(
    &main,
    Some((&pos).into()),
    Some((&spec).into()),
    &ReshapeOptions::default()
  ).unwrap();
  assert_eq!(nd.array.shape(), &[3, 2, 3, 5]);
  assert_eq!(nd.labels, vec!["Dim_1", "Dim_0", "Cycle", "Bias"]);
  let array = nd.array.materialize();
  for y in 0..3 {
    for x in 0..2 {
      let expected = ((x + 2 * y) * 15 + 2 * 5 + 3) as f64;
      assert_eq!(array[IxDyn(&[y, x, 2, 3])], expected);
    }
  }
}

#[test]
fn test_round_trip() {
  init_logger();
  let spec = bias_cycle();
  for sizes in [&[4][..], &[2, 3], &[2, 2, 3]] {
    let pos = positions(sizes);
    let n_pos: usize = sizes.iter().product();
    let flat = counting(n_pos, 15);
    let main = MainArray::from(flat.clone());
    for order in [AxisOrder::SlowToFast, AxisOrder::AsStored] {
      let nd = to_nd(
        &main,
        Some((&pos).into()),
        Some((&spec).into()),
        &opts(order)
      ).unwrap();
      assert_eq!(nd.status, ReshapeStatus::Complete);
      let back = to_2d(
        &nd.array,
        Some((&pos).into()),
        Some((&spec).into()),
        &opts(order)
      ).unwrap();
      assert_eq!(back.array.materialize(), flat);
      assert_eq!(&back.position_indices, pos.indices());
      assert_eq!(&back.spectroscopic_indices, spec.indices());
    }
  }
}

#[test]
fn test_eager_and_deferred_agree() {
  let pos = positions(&[2, 3]);
  let spec = bias_cycle();
  let eager = MainArray::from(counting(6, 15));
  let deferred = MainArray::deferred(vec![6, 15], |i| i as f64);
  assert!(deferred.is_deferred());
  for order in [AxisOrder::SlowToFast, AxisOrder::AsStored] {
    let run = |main: &MainArray<f64>| {
      let nd = to_nd(
        main,
        Some((&pos).into()),
        Some((&spec).into()),
        &opts(order)
      ).unwrap();
      let flat = to_2d(
        &nd.array,
        Some((&pos).into()),
        Some((&spec).into()),
        &opts(order)
      ).unwrap();
      return (nd.array.materialize(), flat.array.materialize());
    };
    let (eager_nd, eager_flat) = run(&eager);
    let (lazy_nd, lazy_flat) = run(&deferred);
    assert_eq!(eager_nd, lazy_nd);
    assert_eq!(eager_flat, lazy_flat);
    assert_eq!(lazy_flat, counting(6, 15));
  }
}

#[test]
fn test_degraded_reshapes() {
  init_logger();
  // 5 steps that claim 2 x 3 dimensions
  let odd = IndexMatrix::from_row_slice(2, 5, &[
    0, 1, 0, 1, 0,
    0, 0, 1, 1, 2,
  ]);
  let pos = positions(&[4]);
  let main = MainArray::from(counting(4, 5));
  let nd = to_nd(
    &main,
    Some((&pos).into()),
    Some(GroupIndices::new(&odd)),
    &ReshapeOptions::default()
  ).unwrap();
  assert_eq!(nd.status, ReshapeStatus::PositionsOnly);
  assert_eq!(nd.array.shape(), &[4, 5]);
  assert_eq!(nd.labels, vec!["Position Dimension 0", SPECTRAL_STEP]);
  // same thing on the position side
  let odd_pos = odd.transpose();
  let main = MainArray::from(counting(5, 15));
  let spec = bias_cycle();
  let nd = to_nd(
    &main,
    Some(GroupIndices::new(&odd_pos)),
    Some((&spec).into()),
    &ReshapeOptions::default()
  ).unwrap();
  assert_eq!(nd.status, ReshapeStatus::Unchanged);
  assert_eq!(nd.array.shape(), &[5, 15]);
  assert_eq!(nd.labels, vec![POSITIONS, SPECTRAL_STEP]);
  assert_eq!(nd.array.materialize(), counting(5, 15));
}

#[test]
fn test_to_nd_malformed() {
  let spec = bias_cycle();
  let pos = positions(&[4]);
  let cube = MainArray::deferred(vec![4, 3, 5], |i| i as f64);
  assert!(matches!(
    to_nd(&cube, None, None, &ReshapeOptions::default()),
    Err(UsidError::TypeMismatch { .. })
  ));
  // 3 rows, but 4 positions
  let main = MainArray::from(counting(3, 15));
  assert!(matches!(
    to_nd(
      &main,
      Some((&pos).into()),
      Some((&spec).into()),
      &ReshapeOptions::default()
    ),
    Err(UsidError::ShapeMismatch { .. })
  ));
  let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
  let main = MainArray::from(counting(4, 15));
  assert!(to_nd(
    &main,
    None,
    Some(GroupIndices::labelled(spec.indices(), &labels)),
    &ReshapeOptions::default()
  ).is_err());
}

#[test]
fn test_to_nd_missing_side() {
  let spec = bias_cycle();
  let main = MainArray::from(counting(4, 15));
  let nd = to_nd(
    &main,
    None,
    Some((&spec).into()),
    &ReshapeOptions::default()
  ).unwrap();
  assert_eq!(nd.array.shape(), &[4, 3, 5]);
  assert_eq!(nd.labels[0], "Position Dimension 0");
  let nd = to_nd(&main, None, None, &ReshapeOptions::default()).unwrap();
  assert_eq!(nd.status, ReshapeStatus::Complete);
  assert_eq!(nd.array.shape(), &[4, 15]);
  assert_eq!(nd.labels, vec!["Position Dimension 0", "Spectral Dimension 0"]);
}

#[test]
fn test_to_2d_synthesizes() {
  init_logger();
  let spec = bias_cycle();
  let pos = positions(&[4]);
  let cube = MainArray::from(counting(4, 15)).reshape(&[4, 3, 5]).unwrap();
  // positions made up from the leading axis
  let flat = to_2d(
    &cube,
    None,
    Some((&spec).into()),
    &ReshapeOptions::default()
  ).unwrap();
  assert_eq!(flat.array.materialize(), counting(4, 15));
  assert_eq!(
    flat.position_indices,
    make_indices_matrix(&[4], Orientation::Position).unwrap()
  );
  // spectroscopic dimensions made up from the trailing axes
  let flat = to_2d(
    &cube,
    Some((&pos).into()),
    None,
    &ReshapeOptions::default()
  ).unwrap();
  assert_eq!(flat.array.materialize(), counting(4, 15));
  assert_eq!(&flat.spectroscopic_indices, spec.indices());
  assert!(to_2d(&cube, None, None, &ReshapeOptions::default()).is_err());
}

#[test]
fn test_to_2d_shapes() {
  let spec = bias_cycle();
  // a single position, squeezed out of the N-D array
  let single = Ancillary::from_dimensions(
    &[Dimension::with_size("X", "um", 1).unwrap()],
    Orientation::Position
  ).unwrap();
  let squeezed = MainArray::from(counting(1, 15)).reshape(&[3, 5]).unwrap();
  let flat = to_2d(
    &squeezed,
    Some((&single).into()),
    Some((&spec).into()),
    &ReshapeOptions::default()
  ).unwrap();
  assert_eq!(flat.array.shape(), &[1, 15]);
  assert_eq!(flat.array.materialize(), counting(1, 15));
  // right number of elements, wrong layout
  let pos = positions(&[4]);
  let wrong = MainArray::from(counting(4, 15)).reshape(&[4, 5, 3]).unwrap();
  assert!(matches!(
    to_2d(
      &wrong,
      Some((&pos).into()),
      Some((&spec).into()),
      &ReshapeOptions::default()
    ),
    Err(UsidError::ShapeMismatch { .. })
  ));
  // wrong number of elements
  let small = MainArray::from(counting(3, 15)).reshape(&[3, 3, 5]).unwrap();
  assert!(to_2d(
    &small,
    Some((&pos).into()),
    Some((&spec).into()),
    &ReshapeOptions::default()
  ).is_err());
}

#[test]
fn test_sizes_too_large_to_count() {
  init_logger();
  // twenty dimensions of ten steps each, squeezed into ten columns
  let huge = IndexMatrix::from_fn(20, 10, |_, c| c as u32);
  let main = MainArray::from(counting(1, 10));
  let nd = to_nd(
    &main,
    None,
    Some(GroupIndices::new(&huge)),
    &ReshapeOptions::default()
  ).unwrap();
  assert_eq!(nd.status, ReshapeStatus::PositionsOnly);
  assert_eq!(nd.array.shape(), &[1, 10]);
  assert_eq!(nd.labels, vec!["Position Dimension 0", SPECTRAL_STEP]);
  assert!(to_2d(
    &main,
    None,
    Some(GroupIndices::new(&huge)),
    &ReshapeOptions::default()
  ).is_err());
}
