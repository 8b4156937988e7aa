//! Recovering the tick values of each dimension from a tiled index matrix.
//!
//! A regular dimension's index row is the same tile repeated end to end. The
//! tile starts wherever the index hits its minimum after a jump; consecutive
//! minima mean the dimension is oversampled and are folded into one tile.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::debug;

use crate::ancillary::{Ancillary, IndexMatrix, ValueMatrix};
use crate::dimension::Orientation;
use crate::error::{UsidError, UsidResult};

/// Unit values of one dimension, given its index and value rows.
pub fn unit_values_for_row(
  name: &str,
  inds: &[u32],
  vals: &[f64]
) -> UsidResult<Vec<f64>> {
  if inds.len() != vals.len() {
    return Err(UsidError::shape_mismatch(
      format!("dimension {}", name),
      format!("{} indices but {} values", inds.len(), vals.len())
    ));
  }
  let min = match inds.iter().min() {
    Some(m) => *m,
    None => return Err(UsidError::shape_mismatch(
      format!("dimension {}", name),
      "no steps"
    )),
  };
  let starts: Vec<usize> = inds.iter().positions(|i| *i == min).collect();
  if starts[0] != 0 {
    return Err(UsidError::irregular(
      name,
      format!("indices start at {} instead of their minimum", inds[0])
    ));
  }
  let jumps: Vec<usize> = starts.iter()
    .tuple_windows()
    .map(|(a, b)| b - a)
    .filter(|gap| *gap != 1)
    .unique()
    .collect();
  if jumps.len() > 1 {
    return Err(UsidError::irregular(
      name,
      format!("tiles start at uneven intervals {:?}", jumps)
    ));
  }
  // a tile starts at 0 and after every jump
  let tile_starts: Vec<usize> = std::iter::once(0)
    .chain(
      starts.iter()
        .tuple_windows()
        .filter(|(a, b)| *b - *a != 1)
        .map(|(_, b)| *b)
    )
    .collect();
  let tile_len = match tile_starts.get(1) {
    Some(second) => *second,
    None => inds.len(),
  };
  if inds.len() % tile_len != 0 {
    return Err(UsidError::irregular(
      name,
      format!("{} steps do not split into tiles of {}", inds.len(), tile_len)
    ));
  }
  let first = &inds[..tile_len];
  if let Some(bad) = inds.chunks(tile_len).position(|tile| tile != first) {
    return Err(UsidError::irregular(
      name,
      format!("tile {} differs from the first one", bad)
    ));
  }
  let changes = std::iter::once(0)
    .chain((1..tile_len).filter(|p| first[*p] != first[p - 1]));
  let unit: Vec<f64> = changes.map(|p| vals[p]).collect();
  debug!(
    "dimension {}: {} tiles of {}, {} unit values",
    name,
    inds.len() / tile_len,
    tile_len,
    unit.len()
  );
  return Ok(unit);
}

/// Unit values of every row of a dims-as-rows pair.
fn unit_values_of_rows(
  inds: &IndexMatrix,
  vals: &ValueMatrix,
  labels: &[String]
) -> UsidResult<BTreeMap<String, Vec<f64>>> {
  if inds.shape() != vals.shape() {
    return Err(UsidError::shape_mismatch(
      "ancillary",
      format!(
        "indices are {:?} but values are {:?}",
        inds.shape(),
        vals.shape()
      )
    ));
  }
  if labels.len() != inds.nrows() {
    return Err(UsidError::shape_mismatch(
      "labels",
      format!("{} labels for {} dimensions", labels.len(), inds.nrows())
    ));
  }
  let mut out: BTreeMap<String, Vec<f64>> = BTreeMap::new();
  for (r, label) in labels.iter().enumerate() {
    let irow: Vec<u32> = inds.row(r).iter().copied().collect();
    let vrow: Vec<f64> = vals.row(r).iter().copied().collect();
    out.insert(label.clone(), unit_values_for_row(label, &irow, &vrow)?);
  }
  return Ok(out);
}

/// Unit values of every dimension of an ancillary, keyed by label. Refuses
/// ancillaries with dimensions flagged as incomplete.
pub fn get_unit_values(
  anc: &Ancillary
) -> UsidResult<BTreeMap<String, Vec<f64>>> {
  if let Some(name) = anc.incomplete().first() {
    return Err(UsidError::irregular(
      name.as_str(),
      "flagged as incomplete, cannot recover unit values"
    ));
  }
  let (inds, vals) = anc.dims_as_rows();
  return unit_values_of_rows(&inds, &vals, anc.labels());
}

/// Unit values of some dimensions of an ancillary. Every dimension is still
/// checked for regularity.
pub fn get_unit_values_for<S: AsRef<str>>(
  anc: &Ancillary,
  names: &[S]
) -> UsidResult<BTreeMap<String, Vec<f64>>> {
  for name in names {
    anc.label_index(name.as_ref())?;
  }
  let mut all = get_unit_values(anc)?;
  all.retain(|k, _| names.iter().any(|n| n.as_ref() == k));
  return Ok(all);
}

/// Unit values from bare matrices in persisted orientation. Without an
/// orientation it is guessed from the shape; without labels the default ones
/// are used.
pub fn get_unit_values_raw(
  inds: &IndexMatrix,
  vals: &ValueMatrix,
  labels: Option<&[String]>,
  orientation: Option<Orientation>
) -> UsidResult<BTreeMap<String, Vec<f64>>> {
  let orientation = orientation
    .unwrap_or_else(|| Orientation::guess(inds.nrows(), inds.ncols()));
  let (inds, vals) = match orientation {
    Orientation::Spectroscopic => (inds.clone(), vals.clone()),
    Orientation::Position => (inds.transpose(), vals.transpose()),
  };
  let labels: Vec<String> = match labels {
    Some(l) => l.to_vec(),
    None => (0..inds.nrows()).map(|i| orientation.default_label(i)).collect(),
  };
  return unit_values_of_rows(&inds, &vals, &labels);
}
