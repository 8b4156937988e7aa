//! This module implements the error type shared by every fallible operation in
//! the crate, plus the list of structural invariants a main dataset can break.

use std::error::Error;
use std::fmt::Display;

use crate::store::AncillaryRole;

/// Shorthand for results carrying a `UsidError`.
pub type UsidResult<T> = Result<T, UsidError>;

/// The structural invariants of a main dataset, in the order they're checked.
/// The strict validator reports the first one that doesn't hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MainInvariant {
  /// The object is a container, not an array.
  NotAnArray,
  /// The array isn't two-dimensional.
  NotTwoDimensional {
    /// The shape we found.
    shape: Vec<usize>
  },
  /// One of the four ancillary links is absent or dangling.
  MissingLink(AncillaryRole),
  /// A link resolves to something that isn't an array.
  AncillaryNotAnArray(AncillaryRole),
  /// A linked ancillary isn't two-dimensional.
  AncillaryNotTwoDimensional {
    /// The role of the offending ancillary.
    role: AncillaryRole,
    /// Its shape.
    shape: Vec<usize>
  },
  /// A mandatory attribute is absent.
  MissingAttribute(&'static str),
  /// A mandatory attribute is present but isn't a single string.
  NonScalarAttribute(&'static str),
  /// The position indices and values don't fit each other or the main rows.
  PositionShape {
    /// Shape of the position indices.
    indices: Vec<usize>,
    /// Shape of the position values.
    values: Vec<usize>,
    /// Shape of the main array.
    main: Vec<usize>
  },
  /// The spectroscopic indices and values don't fit each other or the main
  /// columns.
  SpectroscopicShape {
    /// Shape of the spectroscopic indices.
    indices: Vec<usize>,
    /// Shape of the spectroscopic values.
    values: Vec<usize>,
    /// Shape of the main array.
    main: Vec<usize>
  }
}

impl Display for MainInvariant {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return match self {
      Self::NotAnArray => write!(f, "object is a container, not an array"),
      Self::NotTwoDimensional { shape } => {
        write!(f, "array has shape {:?}, expected 2-D", shape)
      },
      Self::MissingLink(role) => write!(f, "no resolvable {} link", role),
      Self::AncillaryNotAnArray(role) => {
        write!(f, "{} link does not point to an array", role)
      },
      Self::AncillaryNotTwoDimensional { role, shape } => write!(
        f,
        "{} has shape {:?}, expected 2-D",
        role,
        shape
      ),
      Self::MissingAttribute(name) => {
        write!(f, "mandatory attribute \"{}\" is missing", name)
      },
      Self::NonScalarAttribute(name) => {
        write!(f, "attribute \"{}\" should be a single string", name)
      },
      Self::PositionShape { indices, values, main } => write!(
        f,
        "position indices {:?} and values {:?} do not fit main shape {:?}",
        indices,
        values,
        main
      ),
      Self::SpectroscopicShape { indices, values, main } => write!(
        f,
        "spectroscopic indices {:?} and values {:?} do not fit main shape {:?}",
        indices,
        values,
        main
      ),
    };
  }
}

/// Everything that can go wrong when building, reshaping, validating or
/// reducing data.
#[derive(Clone, Debug, PartialEq)]
pub enum UsidError {
  /// An input had the wrong kind or rank.
  TypeMismatch {
    /// The offending field.
    field: String,
    /// What was expected of it.
    expected: String
  },
  /// Sizes of inputs don't agree.
  ShapeMismatch {
    /// The offending field.
    field: String,
    /// What didn't line up.
    reason: String
  },
  /// A name is already taken (or reserved).
  NameConflict(String),
  /// A dimension name isn't among the known labels.
  UnknownDimension(String),
  /// A dimension can't be decomposed into identical tiles.
  IrregularDimension {
    /// The dimension's name.
    dimension: String,
    /// Why it was refused.
    reason: String
  },
  /// A main dataset invariant doesn't hold.
  StructuralInvariantViolation(MainInvariant),
  /// A store lookup came up empty.
  MissingNode(String),
  /// Configuration couldn't be read or parsed.
  Config(String)
}

impl UsidError {
  /// Builds a `TypeMismatch`.
  pub fn type_mismatch<F: Into<String>, E: Into<String>>(
    field: F,
    expected: E
  ) -> Self {
    return Self::TypeMismatch {
      field: field.into(),
      expected: expected.into()
    };
  }

  /// Builds a `ShapeMismatch`.
  pub fn shape_mismatch<F: Into<String>, R: Into<String>>(
    field: F,
    reason: R
  ) -> Self {
    return Self::ShapeMismatch {
      field: field.into(),
      reason: reason.into()
    };
  }

  /// Builds an `IrregularDimension`.
  pub fn irregular<D: Into<String>, R: Into<String>>(
    dimension: D,
    reason: R
  ) -> Self {
    return Self::IrregularDimension {
      dimension: dimension.into(),
      reason: reason.into()
    };
  }
}

impl From<MainInvariant> for UsidError {
  fn from(value: MainInvariant) -> Self {
    return Self::StructuralInvariantViolation(value);
  }
}

impl Display for UsidError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return match self {
      Self::TypeMismatch { field, expected } => {
        write!(f, "type mismatch in {}: expected {}", field, expected)
      },
      Self::ShapeMismatch { field, reason } => {
        write!(f, "shape mismatch in {}: {}", field, reason)
      },
      Self::NameConflict(name) => write!(f, "name conflict: {}", name),
      Self::UnknownDimension(name) => write!(f, "unknown dimension: {}", name),
      Self::IrregularDimension { dimension, reason } => {
        write!(f, "dimension {} is irregular: {}", dimension, reason)
      },
      Self::StructuralInvariantViolation(inv) => {
        write!(f, "not a main dataset: {}", inv)
      },
      Self::MissingNode(what) => write!(f, "no such object: {}", what),
      Self::Config(msg) => write!(f, "bad configuration: {}", msg),
    };
  }
}

impl Error for UsidError {}
