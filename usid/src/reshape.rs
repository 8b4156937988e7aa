//! This module implements the conversion between the flat 2-D form of a main
//! dataset and its N-dimensional interpretation.
//!
//! Going to N-D, each dimension group's index matrix tells how many steps
//! each dimension has and which one varies fastest; the flat array is then
//! reshaped so that every dimension gets its own axis. When the index
//! matrices don't describe a full Cartesian product, the conversion degrades
//! gracefully instead of failing (see `ReshapeStatus`).

use std::fmt::Display;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::ancillary::builder::{checked_product, make_indices_matrix};
use crate::ancillary::order::{cardinalities, sort_order};
use crate::ancillary::{Ancillary, IndexMatrix};
use crate::array::MainArray;
use crate::config::{AxisOrder, ReshapeOptions};
use crate::dimension::Orientation;
use crate::error::{UsidError, UsidResult};

/// Label of the single axis spectroscopic steps collapse into.
pub const SPECTRAL_STEP: &str = "Spectral_Step";

/// Label of the single axis positions collapse into.
pub const POSITIONS: &str = "Positions";

/// How far an N-D conversion got. The degraded outcomes are legitimate
/// results, not errors.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReshapeStatus {
  /// Every dimension has its own axis.
  Complete,
  /// Position dimensions have their own axes; spectroscopic steps were kept
  /// in a single trailing axis.
  PositionsOnly,
  /// Nothing could be done; the array is the original 2-D one.
  Unchanged
}

impl Display for ReshapeStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return write!(f, "{}", match self {
      Self::Complete => "complete",
      Self::PositionsOnly => "positions only",
      Self::Unchanged => "unchanged",
    });
  }
}

/// The N-D view of a main dataset.
#[derive(Clone, Debug)]
pub struct NdView<T> {
  /// The reshaped data.
  pub array: MainArray<T>,
  /// How far the reshape got.
  pub status: ReshapeStatus,
  /// One name per axis of `array`.
  pub labels: Vec<String>
}

/// The flat view of N-D data, with the index matrices that describe it.
#[derive(Clone, Debug)]
pub struct FlatView<T> {
  /// The [positions, spectral steps] array.
  pub array: MainArray<T>,
  /// Position indices, one row per position.
  pub position_indices: IndexMatrix,
  /// Spectroscopic indices, one row per dimension.
  pub spectroscopic_indices: IndexMatrix
}

/// An index matrix, in persisted orientation, plus optional dimension names.
#[derive(Copy, Clone, Debug)]
pub struct GroupIndices<'a> {
  /// The index matrix.
  pub indices: &'a IndexMatrix,
  /// The dimension names; defaults are used when absent.
  pub labels: Option<&'a [String]>
}

impl<'a> GroupIndices<'a> {
  /// Indices without names.
  pub fn new(indices: &'a IndexMatrix) -> Self {
    return Self { indices, labels: None };
  }

  /// Indices with names.
  pub fn labelled(indices: &'a IndexMatrix, labels: &'a [String]) -> Self {
    return Self { indices, labels: Some(labels) };
  }
}

impl<'a> From<&'a Ancillary> for GroupIndices<'a> {
  fn from(value: &'a Ancillary) -> Self {
    return Self::labelled(value.indices(), value.labels());
  }
}

/// A dimension group, as the reshape engine sees it.
struct Group {
  /// Index matrix with one row per dimension.
  rows: IndexMatrix,
  /// Dimension names, in row order.
  labels: Vec<String>,
  /// Rows from fastest to slowest.
  order: Vec<usize>,
  /// Distinct steps of each row.
  sizes: Vec<usize>,
  /// Whether the group was made up rather than given; made-up groups always
  /// lay their axes out slowest first.
  synthetic: bool
}

impl Group {
  /// A group from given indices.
  fn provided(g: &GroupIndices, orientation: Orientation) -> UsidResult<Self> {
    let rows = match orientation {
      Orientation::Spectroscopic => g.indices.clone(),
      Orientation::Position => g.indices.transpose(),
    };
    if rows.is_empty() {
      return Err(UsidError::shape_mismatch(
        format!("{} indices", orientation),
        "index matrix is empty"
      ));
    }
    let labels = match g.labels {
      Some(l) if l.len() == rows.nrows() => l.to_vec(),
      Some(l) => return Err(UsidError::shape_mismatch(
        format!("{} labels", orientation),
        format!("{} labels for {} dimensions", l.len(), rows.nrows())
      )),
      None => (0..rows.nrows()).map(|i| orientation.default_label(i)).collect(),
    };
    let order = sort_order(&rows);
    let sizes = cardinalities(&rows);
    return Ok(Self { rows, labels, order, sizes, synthetic: false });
  }

  /// A made-up group with the given sizes, slowest first.
  fn synthesized(
    slow_to_fast: &[usize],
    orientation: Orientation
  ) -> UsidResult<Self> {
    let sizes: Vec<usize> = slow_to_fast.iter().rev().copied().collect();
    let rows = make_indices_matrix(&sizes, Orientation::Spectroscopic)?;
    let labels = (0..sizes.len())
      .map(|i| orientation.default_label(i))
      .collect();
    let order = (0..sizes.len()).collect();
    return Ok(Self { rows, labels, order, sizes, synthetic: true });
  }

  /// The number of dimensions.
  fn ndims(&self) -> usize {
    return self.rows.nrows();
  }

  /// The number of steps in the index matrix.
  fn steps(&self) -> usize {
    return self.rows.ncols();
  }

  /// The number of steps a full Cartesian product would have; `None` when
  /// that many can't even be counted.
  fn product(&self) -> Option<usize> {
    return checked_product(&self.sizes);
  }

  /// Whether the index matrix is a full Cartesian product of its dimensions.
  fn is_full(&self) -> bool {
    return self.product() == Some(self.steps());
  }

  /// Rows from slowest to fastest.
  fn slow_to_fast(&self) -> Vec<usize> {
    return self.order.iter().rev().copied().collect();
  }

  /// The row behind each axis of this group in an N-D view.
  fn axis_rows(&self, axis_order: AxisOrder) -> Vec<usize> {
    if self.synthetic || axis_order == AxisOrder::SlowToFast {
      return self.slow_to_fast();
    }
    return (0..self.ndims()).collect();
  }

  /// The size of each axis of this group in an N-D view.
  fn axis_sizes(&self, axis_order: AxisOrder) -> Vec<usize> {
    return self.axis_rows(axis_order).iter().map(|r| self.sizes[*r]).collect();
  }

  /// The name of each axis of this group in an N-D view.
  fn axis_labels(&self, axis_order: AxisOrder) -> Vec<String> {
    return self.axis_rows(axis_order)
      .iter()
      .map(|r| self.labels[*r].clone())
      .collect();
  }

  /// The index matrix in persisted orientation.
  fn persisted(&self, orientation: Orientation) -> IndexMatrix {
    return match orientation {
      Orientation::Spectroscopic => self.rows.clone(),
      Orientation::Position => self.rows.transpose(),
    };
  }
}

/// The axis permutation that takes axes laid out as rows `from` to axes laid
/// out as rows `to`, with every axis shifted by `offset`.
fn permutation(from: &[usize], to: &[usize], offset: usize) -> Vec<usize> {
  return to.iter()
    .map(|row| offset + from.iter().position(|r| r == row).unwrap_or(0))
    .collect();
}

/// Checks that an array is 2-D, returning its shape.
fn flat_shape<T: Clone + 'static>(
  main: &MainArray<T>
) -> UsidResult<(usize, usize)> {
  return match main.shape() {
    [rows, cols] => Ok((*rows, *cols)),
    other => Err(UsidError::type_mismatch(
      "main array",
      format!("a 2-D array, got shape {:?}", other)
    )),
  };
}

/// Reshapes a flat [positions, spectral steps] array into one axis per
/// dimension. Position axes come first, then spectroscopic ones; within each
/// group the axes are laid out as `options.axis_order` says.
///
/// A missing index matrix is replaced by a single dimension stepping through
/// every row (or column). When the spectroscopic indices don't describe a
/// full Cartesian product of their dimensions, the spectral steps stay in one
/// axis; when the position indices don't either, the array is returned as it
/// was. Malformed input (a main array that isn't 2-D, indices with a number
/// of steps that doesn't match it, mislabelled indices) is an error.
pub fn to_nd<T: Clone + 'static>(
  main: &MainArray<T>,
  pos: Option<GroupIndices>,
  spec: Option<GroupIndices>,
  options: &ReshapeOptions
) -> UsidResult<NdView<T>> {
  let (n_pos, n_spec) = flat_shape(main)?;
  let pos = match pos {
    Some(g) => Group::provided(&g, Orientation::Position)?,
    None => Group::synthesized(&[n_pos], Orientation::Position)?,
  };
  let spec = match spec {
    Some(g) => Group::provided(&g, Orientation::Spectroscopic)?,
    None => Group::synthesized(&[n_spec], Orientation::Spectroscopic)?,
  };
  if pos.steps() != n_pos {
    return Err(UsidError::shape_mismatch(
      "position indices",
      format!("{} positions for {} rows", pos.steps(), n_pos)
    ));
  }
  if spec.steps() != n_spec {
    return Err(UsidError::shape_mismatch(
      "spectroscopic indices",
      format!("{} steps for {} columns", spec.steps(), n_spec)
    ));
  }
  let axis_order = options.axis_order;
  let np = pos.ndims();
  let pos_natural = pos.slow_to_fast();
  let pos_wanted = pos.axis_rows(axis_order);
  let mut labels = pos.axis_labels(axis_order);

  if pos.is_full() && spec.is_full() {
    let mut shape = pos.axis_sizes(AxisOrder::SlowToFast);
    shape.extend(spec.axis_sizes(AxisOrder::SlowToFast));
    let mut axes = permutation(&pos_natural, &pos_wanted, 0);
    axes.extend(permutation(
      &spec.slow_to_fast(),
      &spec.axis_rows(axis_order),
      np
    ));
    let array = main.reshape(&shape)?.permute(&axes)?;
    labels.extend(spec.axis_labels(axis_order));
    debug!("reshaped {:?} into {:?}", main.shape(), array.shape());
    return Ok(NdView { array, status: ReshapeStatus::Complete, labels });
  }

  if pos.is_full() {
    warn!(
      "spectroscopic dimensions {:?} don't account for {} steps, keeping \
      them in one axis",
      spec.labels,
      n_spec
    );
    let mut shape = pos.axis_sizes(AxisOrder::SlowToFast);
    shape.push(n_spec);
    let mut axes = permutation(&pos_natural, &pos_wanted, 0);
    axes.push(np);
    let array = main.reshape(&shape)?.permute(&axes)?;
    labels.push(SPECTRAL_STEP.to_string());
    return Ok(NdView { array, status: ReshapeStatus::PositionsOnly, labels });
  }

  warn!(
    "position dimensions {:?} don't account for {} positions, leaving the \
    array as it is",
    pos.labels,
    n_pos
  );
  return Ok(NdView {
    array: main.clone(),
    status: ReshapeStatus::Unchanged,
    labels: vec![POSITIONS.to_string(), SPECTRAL_STEP.to_string()]
  });
}

/// Flattens N-D data back into [positions, spectral steps], the inverse of
/// `to_nd`. At least one of the index matrices must be given; the axes of the
/// missing group are whatever is left of the array's axes (slowest first),
/// and its indices are built from their sizes.
///
/// If one whole group has a single step, its axes may be missing from the
/// array altogether.
pub fn to_2d<T: Clone + 'static>(
  nd: &MainArray<T>,
  pos: Option<GroupIndices>,
  spec: Option<GroupIndices>,
  options: &ReshapeOptions
) -> UsidResult<FlatView<T>> {
  let shape = nd.shape().to_vec();
  let provided_pos = pos
    .map(|g| Group::provided(&g, Orientation::Position))
    .transpose()?;
  let provided_spec = spec
    .map(|g| Group::provided(&g, Orientation::Spectroscopic))
    .transpose()?;
  let (pos, spec) = match (provided_pos, provided_spec) {
    (Some(p), Some(s)) => (p, s),
    (Some(p), None) => {
      let rest = &shape[p.ndims().min(shape.len())..];
      let sizes: &[usize] = if rest.is_empty() { &[1] } else { rest };
      let s = Group::synthesized(sizes, Orientation::Spectroscopic)?;
      (p, s)
    },
    (None, Some(s)) => {
      let lead = &shape[..shape.len().saturating_sub(s.ndims())];
      let sizes: &[usize] = if lead.is_empty() { &[1] } else { lead };
      let p = Group::synthesized(sizes, Orientation::Position)?;
      (p, s)
    },
    (None, None) => return Err(UsidError::shape_mismatch(
      "ancillaries",
      "need position or spectroscopic indices to flatten N-D data"
    )),
  };
  for (group, name) in [(&pos, "position"), (&spec, "spectroscopic")] {
    if !group.is_full() {
      return Err(UsidError::shape_mismatch(
        format!("{} indices", name),
        format!(
          "{} steps are not a full product of sizes {:?}",
          group.steps(),
          group.sizes
        )
      ));
    }
  }

  let axis_order = options.axis_order;
  let (n_pos, n_spec) = (pos.steps(), spec.steps());
  if n_pos.checked_mul(n_spec) != Some(nd.len()) {
    return Err(UsidError::shape_mismatch(
      "N-D array",
      format!(
        "{} elements, but the dimensions make for {} x {}",
        nd.len(),
        n_pos,
        n_spec
      )
    ));
  }
  let pos_sizes = pos.axis_sizes(axis_order);
  let spec_sizes = spec.axis_sizes(axis_order);
  let mut expected = pos_sizes.clone();
  expected.extend(spec_sizes.iter().copied());
  let full = if shape == expected {
    nd.clone()
  } else if (n_pos == 1 && shape == spec_sizes)
    || (n_spec == 1 && shape == pos_sizes) {
    debug!("restoring squeezed axes of {:?} to {:?}", shape, expected);
    nd.reshape(&expected)?
  } else {
    return Err(UsidError::shape_mismatch(
      "N-D array",
      format!("shape {:?} where {:?} was expected", shape, expected)
    ));
  };

  let mut axes = permutation(
    &pos.axis_rows(axis_order),
    &pos.slow_to_fast(),
    0
  );
  axes.extend(permutation(
    &spec.axis_rows(axis_order),
    &spec.slow_to_fast(),
    pos.ndims()
  ));
  let array = full.permute(&axes)?.reshape(&[n_pos, n_spec])?;
  return Ok(FlatView {
    array,
    position_indices: pos.persisted(Orientation::Position),
    spectroscopic_indices: spec.persisted(Orientation::Spectroscopic)
  });
}
