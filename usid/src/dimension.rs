//! This module defines dimensions -- a named axis with units and the ordered
//! values it steps through -- and the two orientations a group of dimensions
//! can be stored in.

use std::collections::BTreeSet;
use std::fmt::Display;

use clap::ValueEnum;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::error::{UsidError, UsidResult};

/// The two orthogonal dimension groups of a main dataset.
#[derive(
  Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
  Hash, ValueEnum
)]
#[clap(rename_all = "snake_case")]
pub enum Orientation {
  /// Outer, slowly-sampled dimensions. One matrix row per main-array row,
  /// one column per dimension.
  Position,
  /// Inner dimensions sampled at every position. One matrix row per
  /// dimension, one column per main-array column.
  Spectroscopic
}

impl Display for Orientation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return write!(f, "{}", self.base_name());
  }
}

impl Orientation {
  /// Returns both orientations, position first.
  pub const fn all() -> &'static [Self] {
    return &[Self::Position, Self::Spectroscopic];
  }

  /// The name ancillary arrays of this orientation are prefixed with.
  pub const fn base_name(&self) -> &'static str {
    return match self {
      Self::Position => "Position",
      Self::Spectroscopic => "Spectroscopic",
    };
  }

  /// Label given to the i-th dimension when nothing better is known.
  pub fn default_label(&self, i: usize) -> String {
    return match self {
      Self::Position => format!("Position Dimension {}", i),
      Self::Spectroscopic => format!("Spectral Dimension {}", i),
    };
  }

  /// Guesses the orientation of an ancillary matrix from its shape: fewer
  /// rows than columns means spectroscopic. Only meant for ingestion of
  /// untagged matrices; everything past that boundary carries an explicit
  /// orientation.
  pub fn guess(rows: usize, cols: usize) -> Self {
    if rows < cols {
      return Self::Spectroscopic;
    }
    return Self::Position;
  }
}

/// A named axis, its units, and the values it takes, in order. Immutable once
/// built.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Dimension {
  /// The name, unique within its group.
  name: String,
  /// The physical units of the values.
  units: String,
  /// The tick values.
  values: Vec<f64>
}

impl Display for Dimension {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return write!(
      f,
      "{} ({}): {} steps",
      self.name,
      self.units,
      self.values.len()
    );
  }
}

impl Dimension {
  /// Creates a dimension from explicit tick values.
  pub fn new<N: Into<String>, U: Into<String>>(
    name: N,
    units: U,
    values: Vec<f64>
  ) -> UsidResult<Self> {
    let name = name.into().trim().to_string();
    let units = units.into().trim().to_string();
    if name.is_empty() {
      return Err(UsidError::type_mismatch("name", "a non-empty string"));
    }
    if values.is_empty() {
      return Err(UsidError::shape_mismatch(
        format!("values of {}", name),
        "a dimension needs at least one value"
      ));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
      return Err(UsidError::type_mismatch(
        format!("values of {}", name),
        format!("finite numbers, found {}", bad)
      ));
    }
    return Ok(Self { name, units, values });
  }

  /// Creates a dimension stepping through `0..size`.
  pub fn with_size<N: Into<String>, U: Into<String>>(
    name: N,
    units: U,
    size: usize
  ) -> UsidResult<Self> {
    return Self::new(name, units, (0..size).map(|x| x as f64).collect());
  }

  /// Creates a dimension from an array of values, which must be 1-D.
  pub fn from_array<N: Into<String>, U: Into<String>>(
    name: N,
    units: U,
    values: &ArrayD<f64>
  ) -> UsidResult<Self> {
    let name = name.into();
    if values.ndim() != 1 {
      return Err(UsidError::type_mismatch(
        format!("values of {}", name),
        format!("a 1-D array, got shape {:?}", values.shape())
      ));
    }
    return Self::new(name, units, values.iter().copied().collect());
  }

  /// The name of the dimension.
  pub fn name(&self) -> &str {
    return &self.name;
  }

  /// The units of the dimension.
  pub fn units(&self) -> &str {
    return &self.units;
  }

  /// The tick values, in order.
  pub fn values(&self) -> &[f64] {
    return &self.values;
  }

  /// The number of ticks.
  pub fn len(&self) -> usize {
    return self.values.len();
  }

  /// Always false; dimensions can't be empty. Here to keep clippy happy.
  pub fn is_empty(&self) -> bool {
    return self.values.is_empty();
  }
}

/// Checks that a group of dimensions is usable: at least one dimension, and
/// no repeated names.
pub fn validate_dimensions(
  dims: &[Dimension],
  orientation: Orientation
) -> UsidResult<()> {
  if dims.is_empty() {
    return Err(UsidError::shape_mismatch(
      format!("{} dimensions", orientation),
      "at least one dimension is required"
    ));
  }
  let mut seen: BTreeSet<&str> = BTreeSet::new();
  for d in dims {
    if !seen.insert(d.name()) {
      return Err(UsidError::NameConflict(format!(
        "{} dimension \"{}\" appears more than once",
        orientation,
        d.name()
      )));
    }
  }
  return Ok(());
}
