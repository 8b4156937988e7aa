//! Building index and value matrices out of dimensions, and recovering
//! indices from values alone.

use std::collections::HashMap;

use ndarray::ArrayD;

use crate::ancillary::*;
use crate::dimension::{validate_dimensions, Dimension, Orientation};
use crate::error::{UsidError, UsidResult};

/// The product of some sizes, or `None` if it doesn't fit in a `usize`.
pub fn checked_product(sizes: &[usize]) -> Option<usize> {
  return sizes.iter().try_fold(1usize, |acc, s| acc.checked_mul(*s));
}

/// Builds the index matrix of a Cartesian product of dimensions with the given
/// sizes. Dimension 0 changes every step, dimension i every
/// `sizes[0] * ... * sizes[i-1]` steps.
pub fn make_indices_matrix(
  sizes: &[usize],
  orientation: Orientation
) -> UsidResult<IndexMatrix> {
  if sizes.is_empty() {
    return Err(UsidError::shape_mismatch(
      "dimension sizes",
      "at least one dimension is required"
    ));
  }
  if let Some(i) = sizes.iter().position(|s| *s == 0) {
    return Err(UsidError::shape_mismatch(
      format!("size of dimension {}", i),
      "dimensions must have at least one step"
    ));
  }
  if sizes.iter().any(|s| *s > u32::MAX as usize) {
    return Err(UsidError::type_mismatch(
      "dimension sizes",
      "sizes that fit in 32 bits"
    ));
  }
  let total = checked_product(sizes).ok_or_else(|| {
    return UsidError::shape_mismatch(
      "dimension sizes",
      format!("{:?} make more steps than can be addressed", sizes)
    );
  })?;
  // every partial product divides `total`, so none of these overflow
  let strides: Vec<usize> = sizes.iter()
    .scan(1usize, |acc, s| {
      let stride = *acc;
      *acc *= s;
      return Some(stride);
    })
    .collect();
  let rows = IndexMatrix::from_fn(sizes.len(), total, |r, c| {
    return ((c / strides[r]) % sizes[r]) as u32;
  });
  return Ok(match orientation {
    Orientation::Spectroscopic => rows,
    Orientation::Position => rows.transpose(),
  });
}

/// Builds index and value matrices from per-dimension tick values.
pub fn build_ind_val_matrices(
  values: &[Vec<f64>],
  orientation: Orientation
) -> UsidResult<(IndexMatrix, ValueMatrix)> {
  if values.is_empty() {
    return Err(UsidError::shape_mismatch(
      format!("{} values", orientation),
      "at least one dimension is required"
    ));
  }
  for (i, v) in values.iter().enumerate() {
    if v.is_empty() {
      return Err(UsidError::shape_mismatch(
        format!("values of dimension {}", i),
        "dimensions must have at least one step"
      ));
    }
    if v.iter().any(|x| !x.is_finite()) {
      return Err(UsidError::type_mismatch(
        format!("values of dimension {}", i),
        "finite numbers"
      ));
    }
  }
  let sizes: Vec<usize> = values.iter().map(|v| v.len()).collect();
  let inds = make_indices_matrix(&sizes, Orientation::Spectroscopic)?;
  let vals = ValueMatrix::from_fn(inds.nrows(), inds.ncols(), |r, c| {
    return values[r][inds[(r, c)] as usize];
  });
  return Ok(match orientation {
    Orientation::Spectroscopic => (inds, vals),
    Orientation::Position => (inds.transpose(), vals.transpose()),
  });
}

/// Builds a full ancillary from dimensions.
pub fn build_from_dimensions(
  dims: &[Dimension],
  orientation: Orientation
) -> UsidResult<Ancillary> {
  validate_dimensions(dims, orientation)?;
  let values: Vec<Vec<f64>> = dims.iter()
    .map(|d| d.values().to_vec())
    .collect();
  let (inds, vals) =
    build_ind_val_matrices(&values, Orientation::Spectroscopic)?;
  return Ancillary::from_dims_as_rows(
    orientation,
    inds,
    vals,
    dims.iter().map(|d| d.name().to_string()).collect(),
    dims.iter().map(|d| d.units().to_string()).collect()
  );
}

/// Hashable key for a float; both zeros map to the same key.
fn float_key(x: f64) -> u64 {
  if x == 0.0 {
    return 0.0f64.to_bits();
  }
  return x.to_bits();
}

/// Infers indices from a value matrix: each dimension's values are ranked by
/// the order in which they first show up.
pub fn indices_from_values(
  values: &ValueMatrix,
  orientation: Orientation
) -> IndexMatrix {
  let rows = match orientation {
    Orientation::Spectroscopic => values.clone(),
    Orientation::Position => values.transpose(),
  };
  let mut inds = IndexMatrix::zeros(rows.nrows(), rows.ncols());
  for r in 0..rows.nrows() {
    let mut ranks: HashMap<u64, u32> = HashMap::new();
    for c in 0..rows.ncols() {
      let next = ranks.len() as u32;
      inds[(r, c)] = *ranks.entry(float_key(rows[(r, c)])).or_insert(next);
    }
  }
  return match orientation {
    Orientation::Spectroscopic => inds,
    Orientation::Position => inds.transpose(),
  };
}

/// Same as `indices_from_values`, starting from an array, which must be 2-D.
pub fn indices_from_value_array(
  values: &ArrayD<f64>,
  orientation: Orientation
) -> UsidResult<IndexMatrix> {
  let matrix = matrix_from_array(values)?;
  return Ok(indices_from_values(&matrix, orientation));
}
