//! This module defines ancillaries: the index/value matrix pairs that describe
//! one dimension group of a main dataset, along with the labels, units and
//! region labels that name their dimensions.
//!
//! Matrices are kept in their persisted orientation. For spectroscopic
//! ancillaries that means one row per dimension and one column per step; for
//! position ancillaries it is the transpose. Algorithms that want one layout
//! regardless go through `Ancillary::dims_as_rows()`.

pub mod builder;
pub mod order;
pub mod reduce;
pub mod unit_values;

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::{DMatrix, Scalar};
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::dimension::{Dimension, Orientation};
use crate::error::{UsidError, UsidResult};
use crate::store::{AxisSlice, RegionSlice};

/// Integer tick indices, one entry per (dimension, step).
pub type IndexMatrix = DMatrix<u32>;

/// Tick values, same shape as the matching `IndexMatrix`.
pub type ValueMatrix = DMatrix<f64>;

/// Label of the dummy dimension left behind when every dimension is dropped.
pub const SINGLE_STEP: &str = "Single_Step";

/// Units of the dummy dimension.
pub const ARBITRARY_UNITS: &str = "a. u.";

/// Works out the region label of each dimension: its row of a spectroscopic
/// matrix, or its column of a position matrix.
pub fn aux_slicing<S: AsRef<str>>(
  names: &[S],
  orientation: Orientation
) -> UsidResult<BTreeMap<String, RegionSlice>> {
  if names.is_empty() {
    return Err(UsidError::shape_mismatch(
      "dimension names",
      "at least one name is required to build region labels"
    ));
  }
  let mut regions: BTreeMap<String, RegionSlice> = BTreeMap::new();
  for (i, name) in names.iter().enumerate() {
    let this = AxisSlice::Range { start: i, end: i + 1 };
    let region = match orientation {
      Orientation::Spectroscopic => {
        RegionSlice { rows: this, cols: AxisSlice::All }
      },
      Orientation::Position => RegionSlice { rows: AxisSlice::All, cols: this },
    };
    if regions.insert(name.as_ref().to_string(), region).is_some() {
      return Err(UsidError::NameConflict(format!(
        "region \"{}\" named twice",
        name.as_ref()
      )));
    }
  }
  return Ok(regions);
}

/// Converts a 2-D array into a matrix. Fails on any other rank.
pub fn matrix_from_array<T: Scalar + Copy>(
  array: &ArrayD<T>
) -> UsidResult<DMatrix<T>> {
  if array.ndim() != 2 {
    return Err(UsidError::type_mismatch(
      "matrix",
      format!("a 2-D array, got shape {:?}", array.shape())
    ));
  }
  let flat: Vec<T> = array.iter().copied().collect();
  return Ok(DMatrix::from_row_slice(array.shape()[0], array.shape()[1], &flat));
}

/// Converts a matrix into a 2-D array.
pub fn matrix_to_array<T: Scalar + Copy>(matrix: &DMatrix<T>) -> ArrayD<T> {
  let (r, c) = matrix.shape();
  return ArrayD::from_shape_fn(IxDyn(&[r, c]), |ix| matrix[(ix[0], ix[1])]);
}

/// An index/value matrix pair describing one dimension group.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Ancillary {
  /// Which group this is.
  orientation: Orientation,
  /// The index matrix, in persisted orientation.
  indices: IndexMatrix,
  /// The value matrix, in persisted orientation.
  values: ValueMatrix,
  /// One name per dimension.
  labels: Vec<String>,
  /// One unit string per dimension.
  units: Vec<String>,
  /// Dimensions known to be only partially sampled.
  incomplete: Vec<String>
}

impl Ancillary {
  /// Assembles an ancillary from matrices in persisted orientation, checking
  /// that everything fits together.
  pub fn new(
    orientation: Orientation,
    indices: IndexMatrix,
    values: ValueMatrix,
    labels: Vec<String>,
    units: Vec<String>
  ) -> UsidResult<Self> {
    if indices.shape() != values.shape() {
      return Err(UsidError::shape_mismatch(
        format!("{} ancillary", orientation),
        format!(
          "indices are {:?} but values are {:?}",
          indices.shape(),
          values.shape()
        )
      ));
    }
    let ndims = match orientation {
      Orientation::Position => indices.ncols(),
      Orientation::Spectroscopic => indices.nrows(),
    };
    if ndims == 0 || indices.is_empty() {
      return Err(UsidError::shape_mismatch(
        format!("{} ancillary", orientation),
        "matrices must not be empty"
      ));
    }
    if labels.len() != ndims {
      return Err(UsidError::shape_mismatch(
        format!("{} labels", orientation),
        format!("{} labels for {} dimensions", labels.len(), ndims)
      ));
    }
    if units.len() != ndims {
      return Err(UsidError::shape_mismatch(
        format!("{} units", orientation),
        format!("{} units for {} dimensions", units.len(), ndims)
      ));
    }
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for label in labels.iter() {
      if !seen.insert(label) {
        return Err(UsidError::NameConflict(format!(
          "{} label \"{}\" appears more than once",
          orientation,
          label
        )));
      }
    }
    return Ok(Self {
      orientation,
      indices,
      values,
      labels,
      units,
      incomplete: Vec::new()
    });
  }

  /// Assembles an ancillary from matrices with one row per dimension,
  /// transposing them if the orientation asks for it.
  pub fn from_dims_as_rows(
    orientation: Orientation,
    indices: IndexMatrix,
    values: ValueMatrix,
    labels: Vec<String>,
    units: Vec<String>
  ) -> UsidResult<Self> {
    return match orientation {
      Orientation::Spectroscopic => {
        Self::new(orientation, indices, values, labels, units)
      },
      Orientation::Position => Self::new(
        orientation,
        indices.transpose(),
        values.transpose(),
        labels,
        units
      ),
    };
  }

  /// Builds the ancillary for a list of dimensions, the first one varying
  /// fastest.
  pub fn from_dimensions(
    dims: &[Dimension],
    orientation: Orientation
  ) -> UsidResult<Self> {
    return builder::build_from_dimensions(dims, orientation);
  }

  /// The 1x1 ancillary of a group with nothing in it.
  pub fn single_step(orientation: Orientation) -> Self {
    return Self {
      orientation,
      indices: IndexMatrix::zeros(1, 1),
      values: ValueMatrix::zeros(1, 1),
      labels: vec![SINGLE_STEP.to_string()],
      units: vec![ARBITRARY_UNITS.to_string()],
      incomplete: Vec::new()
    };
  }

  /// Flags some dimensions as incomplete. Names must be among the labels.
  pub fn with_incomplete<S: AsRef<str>>(
    mut self,
    names: &[S]
  ) -> UsidResult<Self> {
    for name in names {
      let name = name.as_ref();
      self.label_index(name)?;
      if !self.incomplete.iter().any(|n| n == name) {
        self.incomplete.push(name.to_string());
      }
    }
    return Ok(self);
  }

  /// The orientation.
  pub fn orientation(&self) -> Orientation {
    return self.orientation;
  }

  /// The index matrix, in persisted orientation.
  pub fn indices(&self) -> &IndexMatrix {
    return &self.indices;
  }

  /// The value matrix, in persisted orientation.
  pub fn values(&self) -> &ValueMatrix {
    return &self.values;
  }

  /// The dimension names.
  pub fn labels(&self) -> &[String] {
    return &self.labels;
  }

  /// The dimension units.
  pub fn units(&self) -> &[String] {
    return &self.units;
  }

  /// Dimensions flagged as incomplete.
  pub fn incomplete(&self) -> &[String] {
    return &self.incomplete;
  }

  /// The number of dimensions.
  pub fn num_dims(&self) -> usize {
    return self.labels.len();
  }

  /// The number of steps, i.e. rows or columns of the main array.
  pub fn num_steps(&self) -> usize {
    return match self.orientation {
      Orientation::Position => self.indices.nrows(),
      Orientation::Spectroscopic => self.indices.ncols(),
    };
  }

  /// Both matrices with one row per dimension.
  pub fn dims_as_rows(&self) -> (IndexMatrix, ValueMatrix) {
    return match self.orientation {
      Orientation::Spectroscopic => (self.indices.clone(), self.values.clone()),
      Orientation::Position => {
        (self.indices.transpose(), self.values.transpose())
      },
    };
  }

  /// Where a dimension sits among the labels.
  pub fn label_index(&self, name: &str) -> UsidResult<usize> {
    return self.labels.iter()
      .position(|l| l == name)
      .ok_or_else(|| UsidError::UnknownDimension(name.to_string()));
  }

  /// The region label of every dimension.
  pub fn regions(&self) -> UsidResult<BTreeMap<String, RegionSlice>> {
    return aux_slicing(&self.labels, self.orientation);
  }

  /// Rows of `dims_as_rows()`, fastest-varying first.
  pub fn sort_order(&self) -> Vec<usize> {
    return order::sort_order(&self.dims_as_rows().0);
  }

  /// The number of distinct indices of each dimension, in label order.
  pub fn cardinalities(&self) -> Vec<usize> {
    return order::cardinalities(&self.dims_as_rows().0);
  }

  /// Recovers the dimensions this ancillary was built from, in label order.
  pub fn dimensions(&self) -> UsidResult<Vec<Dimension>> {
    let mut unit_values = unit_values::get_unit_values(self)?;
    let mut dims: Vec<Dimension> = Vec::with_capacity(self.num_dims());
    for (label, units) in self.labels.iter().zip(self.units.iter()) {
      let values = unit_values.remove(label)
        .ok_or_else(|| UsidError::UnknownDimension(label.clone()))?;
      dims.push(Dimension::new(label.as_str(), units.as_str(), values)?);
    }
    return Ok(dims);
  }
}
