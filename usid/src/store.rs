//! This module defines the hierarchical array store the crate persists data
//! into: groups, arrays, typed attributes, typed links between arrays, and
//! named region labels inside 2-D arrays.
//!
//! The store itself is a collaborator; the crate only talks to it through the
//! `ArrayStore` trait. An in-memory implementation lives in `memory`.

pub mod memory;

use std::collections::BTreeMap;
use std::fmt::Display;
use std::ops::Range;

use clap::ValueEnum;
use derive_more::From;
use ndarray::{ArrayD, Axis, Slice};
use num::{NumCast, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::dimension::Orientation;
use crate::error::{UsidError, UsidResult};

/// Identifies an object inside a store.
#[derive(
  Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
  Hash
)]
pub struct NodeId(pub usize);

impl Display for NodeId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return write!(f, "#{}", self.0);
  }
}

/// The kinds of objects a store holds.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeKind {
  /// A container of other objects.
  Group,
  /// An n-dimensional array.
  Array
}

/// A free-form attribute value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, From)]
pub enum AttrValue {
  /// A boolean.
  Bool(bool),
  /// An integer.
  Int(i64),
  /// A float.
  Float(f64),
  /// A string.
  Str(String),
  /// An array of integers.
  Ints(Vec<i64>),
  /// An array of floats.
  Floats(Vec<f64>),
  /// An array of strings.
  Strs(Vec<String>)
}

impl From<&str> for AttrValue {
  fn from(value: &str) -> Self {
    return Self::Str(value.to_string());
  }
}

/// The `units` attribute: a single string on main datasets, one string per
/// dimension on ancillaries.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Units {
  /// One unit string.
  Scalar(String),
  /// One unit string per dimension.
  PerDimension(Vec<String>)
}

/// The attributes of an object. The ones the data model relies upon get typed
/// fields; anything else the caller wants to keep goes into `extras`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Attributes {
  /// The physical quantity held by a main dataset.
  pub quantity: Option<String>,
  /// The units, see `Units`.
  pub units: Option<Units>,
  /// Dimension names of an ancillary, in row (or column) order.
  pub labels: Option<Vec<String>>,
  /// Dimensions that were not fully sampled.
  pub incomplete_dimensions: Option<Vec<String>>,
  /// Everything else.
  pub extras: BTreeMap<String, AttrValue>
}

impl Attributes {
  /// Names that can't go in the extras bag, because they're typed fields or
  /// link roles.
  pub const RESERVED: &'static [&'static str] = &[
    "quantity",
    "units",
    "labels",
    "incomplete_dimensions",
    "Position_Indices",
    "Position_Values",
    "Spectroscopic_Indices",
    "Spectroscopic_Values",
  ];

  /// Inserts a free-form attribute, refusing reserved names.
  pub fn insert_extra<K: Into<String>, V: Into<AttrValue>>(
    &mut self,
    key: K,
    value: V
  ) -> UsidResult<()> {
    let key = key.into();
    if Self::RESERVED.contains(&key.as_str()) {
      return Err(UsidError::NameConflict(format!(
        "attribute \"{}\" is reserved",
        key
      )));
    }
    self.extras.insert(key, value.into());
    return Ok(());
  }

  /// Returns the units as a single string, if they are one.
  pub fn scalar_units(&self) -> Option<&str> {
    return match &self.units {
      Some(Units::Scalar(u)) => Some(u),
      _ => None,
    };
  }

  /// Returns per-dimension units, if present.
  pub fn dimension_units(&self) -> Option<&[String]> {
    return match &self.units {
      Some(Units::PerDimension(u)) => Some(u),
      _ => None,
    };
  }
}

/// The four links that connect a main dataset to its ancillaries.
#[derive(
  Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
  Hash
)]
pub enum AncillaryRole {
  /// Position indices.
  PositionIndices,
  /// Position values.
  PositionValues,
  /// Spectroscopic indices.
  SpectroscopicIndices,
  /// Spectroscopic values.
  SpectroscopicValues
}

impl Display for AncillaryRole {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return write!(f, "{}", self.name());
  }
}

impl AncillaryRole {
  /// All roles, in the order they're validated.
  pub const fn all() -> &'static [Self] {
    return &[
      Self::PositionIndices,
      Self::PositionValues,
      Self::SpectroscopicIndices,
      Self::SpectroscopicValues,
    ];
  }

  /// The fixed name of the link.
  pub const fn name(&self) -> &'static str {
    return match self {
      Self::PositionIndices => "Position_Indices",
      Self::PositionValues => "Position_Values",
      Self::SpectroscopicIndices => "Spectroscopic_Indices",
      Self::SpectroscopicValues => "Spectroscopic_Values",
    };
  }

  /// The (indices, values) roles for an orientation.
  pub const fn for_orientation(o: Orientation) -> (Self, Self) {
    return match o {
      Orientation::Position => (Self::PositionIndices, Self::PositionValues),
      Orientation::Spectroscopic => {
        (Self::SpectroscopicIndices, Self::SpectroscopicValues)
      },
    };
  }

  /// The orientation of the ancillary this role points to.
  pub const fn orientation(&self) -> Orientation {
    return match self {
      Self::PositionIndices | Self::PositionValues => Orientation::Position,
      _ => Orientation::Spectroscopic,
    };
  }

  /// Whether this role points to an index matrix.
  pub const fn is_indices(&self) -> bool {
    return matches!(self, Self::PositionIndices | Self::SpectroscopicIndices);
  }
}

/// Element types an array can be persisted as.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Dtype {
  /// Unsigned 32-bit integers; index matrices.
  U32,
  /// Signed 64-bit integers.
  I64,
  /// Single-precision floats; value matrices.
  F32,
  /// Double-precision floats.
  F64
}

/// Scalars that can live in an `ArrayData`.
pub trait StoreElement: Copy + NumCast + ToPrimitive + 'static {
  /// The matching dtype.
  const DTYPE: Dtype;

  /// Wraps an array of this type.
  fn wrap(array: ArrayD<Self>) -> ArrayData;
}

impl StoreElement for u32 {
  const DTYPE: Dtype = Dtype::U32;
  fn wrap(array: ArrayD<Self>) -> ArrayData { return ArrayData::U32(array); }
}

impl StoreElement for i64 {
  const DTYPE: Dtype = Dtype::I64;
  fn wrap(array: ArrayD<Self>) -> ArrayData { return ArrayData::I64(array); }
}

impl StoreElement for f32 {
  const DTYPE: Dtype = Dtype::F32;
  fn wrap(array: ArrayD<Self>) -> ArrayData { return ArrayData::F32(array); }
}

impl StoreElement for f64 {
  const DTYPE: Dtype = Dtype::F64;
  fn wrap(array: ArrayD<Self>) -> ArrayData { return ArrayData::F64(array); }
}

/// Converts every element of an array, failing on anything that doesn't fit.
fn cast_array<S, T>(array: &ArrayD<S>) -> UsidResult<ArrayD<T>>
where S: StoreElement + std::fmt::Debug, T: StoreElement {
  let mut out: Vec<T> = Vec::with_capacity(array.len());
  for x in array.iter() {
    match num::cast::<S, T>(*x) {
      Some(v) => out.push(v),
      None => return Err(UsidError::type_mismatch(
        "array element",
        format!("a value representable as {:?}, got {:?}", T::DTYPE, x)
      )),
    }
  }
  return ArrayD::from_shape_vec(array.raw_dim(), out)
    .map_err(|e| UsidError::shape_mismatch("array", e.to_string()));
}

/// The contents of an array, tagged with its dtype.
#[derive(Clone, Debug, PartialEq, From)]
pub enum ArrayData {
  /// u32 elements.
  U32(ArrayD<u32>),
  /// i64 elements.
  I64(ArrayD<i64>),
  /// f32 elements.
  F32(ArrayD<f32>),
  /// f64 elements.
  F64(ArrayD<f64>)
}

impl ArrayData {
  /// The element type.
  pub fn dtype(&self) -> Dtype {
    return match self {
      Self::U32(_) => Dtype::U32,
      Self::I64(_) => Dtype::I64,
      Self::F32(_) => Dtype::F32,
      Self::F64(_) => Dtype::F64,
    };
  }

  /// The shape.
  pub fn shape(&self) -> &[usize] {
    return match self {
      Self::U32(a) => a.shape(),
      Self::I64(a) => a.shape(),
      Self::F32(a) => a.shape(),
      Self::F64(a) => a.shape(),
    };
  }

  /// The number of axes.
  pub fn ndim(&self) -> usize {
    return self.shape().len();
  }

  /// Converts the contents to an array of `T`.
  pub fn to_array<T: StoreElement>(&self) -> UsidResult<ArrayD<T>> {
    return match self {
      Self::U32(a) => cast_array(a),
      Self::I64(a) => cast_array(a),
      Self::F32(a) => cast_array(a),
      Self::F64(a) => cast_array(a),
    };
  }

  /// Converts the contents to another dtype.
  pub fn cast(&self, dtype: Dtype) -> UsidResult<Self> {
    if dtype == self.dtype() {
      return Ok(self.clone());
    }
    return match dtype {
      Dtype::U32 => self.to_array::<u32>().map(Self::U32),
      Dtype::I64 => self.to_array::<i64>().map(Self::I64),
      Dtype::F32 => self.to_array::<f32>().map(Self::F32),
      Dtype::F64 => self.to_array::<f64>().map(Self::F64),
    };
  }

  /// Copies out a rectangular region of a 2-D array.
  pub fn region(&self, region: &RegionSlice) -> UsidResult<Self> {
    if self.ndim() != 2 {
      return Err(UsidError::type_mismatch(
        "region source",
        format!("a 2-D array, got shape {:?}", self.shape())
      ));
    }
    let (rows, cols) = region.resolve((self.shape()[0], self.shape()[1]))?;
    /// Slices one array along both axes.
    fn cut<T: Clone>(
      a: &ArrayD<T>,
      rows: &Range<usize>,
      cols: &Range<usize>
    ) -> ArrayD<T> {
      return a
        .slice_axis(Axis(0), Slice::from(rows.clone()))
        .slice_axis(Axis(1), Slice::from(cols.clone()))
        .to_owned();
    }
    return Ok(match self {
      Self::U32(a) => Self::U32(cut(a, &rows, &cols)),
      Self::I64(a) => Self::I64(cut(a, &rows, &cols)),
      Self::F32(a) => Self::F32(cut(a, &rows, &cols)),
      Self::F64(a) => Self::F64(cut(a, &rows, &cols)),
    });
  }
}

/// A selection along one axis of a region label.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AxisSlice {
  /// The whole axis.
  All,
  /// A half-open range.
  Range {
    /// First included index.
    start: usize,
    /// First excluded index.
    end: usize
  }
}

impl AxisSlice {
  /// Resolves against an axis length.
  pub fn resolve(&self, len: usize) -> UsidResult<Range<usize>> {
    return match self {
      Self::All => Ok(0..len),
      Self::Range { start, end } if start < end && *end <= len => {
        Ok(*start..*end)
      },
      Self::Range { start, end } => Err(UsidError::shape_mismatch(
        "region",
        format!("range {}..{} does not fit an axis of {}", start, end, len)
      )),
    };
  }
}

/// A named rectangular sub-selection inside a 2-D array.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegionSlice {
  /// Selection along the rows.
  pub rows: AxisSlice,
  /// Selection along the columns.
  pub cols: AxisSlice
}

impl RegionSlice {
  /// Resolves both axes against a 2-D shape.
  pub fn resolve(
    &self,
    shape: (usize, usize)
  ) -> UsidResult<(Range<usize>, Range<usize>)> {
    return Ok((self.rows.resolve(shape.0)?, self.cols.resolve(shape.1)?));
  }
}

/// Compression filters a store may apply.
#[derive(
  Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ValueEnum
)]
#[clap(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Compression {
  /// Deflate.
  Gzip,
  /// LZF.
  Lzf
}

/// Storage hints passed along when creating an array.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Storage {
  /// Chunk shape; must have one entry per axis.
  pub chunks: Option<Vec<usize>>,
  /// Compression filter.
  pub compression: Option<Compression>
}

impl Storage {
  /// Checks the hints against the shape of the array they'll be applied to.
  pub fn validate(&self, shape: &[usize]) -> UsidResult<()> {
    if let Some(chunks) = &self.chunks {
      if chunks.len() != shape.len() || chunks.iter().any(|c| *c == 0) {
        return Err(UsidError::shape_mismatch(
          "chunks",
          format!("{:?} does not suit an array of shape {:?}", chunks, shape)
        ));
      }
    }
    return Ok(());
  }
}

/// Provenance written next to newly created main datasets.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BookKeeping {
  /// When the data was written, formatted by the caller.
  pub timestamp: String,
  /// Version of the writer.
  pub version: String,
  /// The machine the data was written on.
  pub machine_id: String,
  /// The platform the data was written on.
  pub platform: String
}

impl BookKeeping {
  /// Book-keeping for this crate on the current platform.
  pub fn here<T: Into<String>, M: Into<String>>(
    timestamp: T,
    machine_id: M
  ) -> Self {
    return Self {
      timestamp: timestamp.into(),
      version: env!("CARGO_PKG_VERSION").to_string(),
      machine_id: machine_id.into(),
      platform: format!(
        "{}-{}",
        std::env::consts::OS,
        std::env::consts::ARCH
      ),
    };
  }

  /// Writes the fields into an attribute set.
  pub fn apply(&self, attrs: &mut Attributes) -> UsidResult<()> {
    attrs.insert_extra("timestamp", self.timestamp.as_str())?;
    attrs.insert_extra("usid_version", self.version.as_str())?;
    attrs.insert_extra("machine_id", self.machine_id.as_str())?;
    attrs.insert_extra("platform", self.platform.as_str())?;
    return Ok(());
  }
}

/// A hierarchical array store. Mutations take `&mut self`, so a store sees one
/// structural change at a time.
pub trait ArrayStore {
  /// The root group.
  fn root(&self) -> NodeId;

  /// The kind of an object.
  fn kind(&self, node: NodeId) -> UsidResult<NodeKind>;

  /// The name of an object.
  fn name(&self, node: NodeId) -> UsidResult<String>;

  /// The parent of an object; `None` for the root.
  fn parent(&self, node: NodeId) -> UsidResult<Option<NodeId>>;

  /// The children of a group, in creation order.
  fn children(&self, node: NodeId) -> UsidResult<Vec<NodeId>>;

  /// Looks up a child by name.
  fn child(&self, parent: NodeId, name: &str) -> Option<NodeId>;

  /// Creates a group.
  fn create_group(&mut self, parent: NodeId, name: &str)
    -> UsidResult<NodeId>;

  /// Creates an array.
  fn create_array(
    &mut self,
    parent: NodeId,
    name: &str,
    data: ArrayData,
    storage: &Storage
  ) -> UsidResult<NodeId>;

  /// Removes an object (and, for groups, everything below it). Links that
  /// pointed to it are left dangling.
  fn remove(&mut self, node: NodeId) -> UsidResult<()>;

  /// The shape of an array.
  fn shape(&self, node: NodeId) -> UsidResult<Vec<usize>>;

  /// Reads a whole array.
  fn read(&self, node: NodeId) -> UsidResult<ArrayData>;

  /// Reads a rectangular region of a 2-D array.
  fn read_region(&self, node: NodeId, region: &RegionSlice)
    -> UsidResult<ArrayData> {
    return self.read(node)?.region(region);
  }

  /// The attributes of an object.
  fn attributes(&self, node: NodeId) -> UsidResult<Attributes>;

  /// Replaces the attributes of an object.
  fn write_attributes(&mut self, node: NodeId, attrs: Attributes)
    -> UsidResult<()>;

  /// Links `source` to `target` under a role, replacing any previous link.
  fn link(&mut self, source: NodeId, role: AncillaryRole, target: NodeId)
    -> UsidResult<()>;

  /// Removes a link.
  fn unlink(&mut self, source: NodeId, role: AncillaryRole) -> UsidResult<()>;

  /// Follows a link; `None` when absent or dangling.
  fn resolve(&self, source: NodeId, role: AncillaryRole) -> Option<NodeId>;

  /// Adds a named region label to a 2-D array.
  fn write_region(&mut self, node: NodeId, name: &str, region: RegionSlice)
    -> UsidResult<()>;

  /// The region labels of an array.
  fn regions(&self, node: NodeId)
    -> UsidResult<BTreeMap<String, RegionSlice>>;

  /// The slash-separated path of an object, for messages.
  fn path(&self, node: NodeId) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
      match (self.name(n), self.parent(n)) {
        (Ok(name), Ok(parent)) => {
          if parent.is_some() { parts.push(name); }
          current = parent;
        },
        _ => return format!("<{}>", node),
      }
    }
    parts.reverse();
    return format!("/{}", parts.join("/"));
  }

  /// Looks up a child by name, failing when absent.
  fn require_child(&self, parent: NodeId, name: &str) -> UsidResult<NodeId> {
    return self.child(parent, name).ok_or_else(|| UsidError::MissingNode(
      format!("{}/{}", self.path(parent).trim_end_matches('/'), name)
    ));
  }
}

/// Finds every array named `name` at or below `parent`.
pub fn find_dataset<S: ArrayStore + ?Sized>(
  store: &S,
  parent: NodeId,
  name: &str
) -> UsidResult<Vec<NodeId>> {
  let mut found: Vec<NodeId> = Vec::new();
  let mut pending: Vec<NodeId> = vec![parent];
  while let Some(node) = pending.pop() {
    for child in store.children(node)? {
      match store.kind(child)? {
        NodeKind::Group => pending.push(child),
        NodeKind::Array => if store.name(child)? == name { found.push(child) },
      }
    }
  }
  found.sort();
  return Ok(found);
}
