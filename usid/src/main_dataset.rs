//! This module implements the main dataset: a 2-D array in a store, linked to
//! the four ancillaries that describe its rows and columns. It provides the
//! standard way of writing one (which always yields a valid main dataset) and
//! a handle for reading one back.

pub mod validate;

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::ancillary::builder::checked_product;
use crate::ancillary::reduce::reduce_ancillary;
use crate::ancillary::unit_values::get_unit_values;
use crate::ancillary::*;
use crate::array::{DeferredArray, MainArray};
use crate::config::{ReshapeOptions, WriteOptions};
use crate::dimension::{Dimension, Orientation};
use crate::error::{MainInvariant, UsidError, UsidResult};
use crate::main_dataset::validate::check_main;
use crate::reshape::{to_2d, to_nd, FlatView, NdView};
use crate::store::*;

/// Where the ancillaries of a new main dataset come from.
#[derive(Clone, Debug)]
pub enum AncillarySource {
  /// Build and write new ones from these dimensions, fastest first.
  Dimensions(Vec<Dimension>),
  /// Reuse ancillaries already in the store.
  Existing {
    /// The index array.
    indices: NodeId,
    /// The value array.
    values: NodeId
  }
}

impl From<Vec<Dimension>> for AncillarySource {
  fn from(value: Vec<Dimension>) -> Self {
    return Self::Dimensions(value);
  }
}

/// Everything needed to write a main dataset, apart from its data.
#[derive(Clone, Debug)]
pub struct NewMain {
  /// Name of the main array.
  pub name: String,
  /// The physical quantity measured.
  pub quantity: String,
  /// Its units.
  pub units: String,
  /// Position ancillaries.
  pub position: AncillarySource,
  /// Spectroscopic ancillaries.
  pub spectroscopic: AncillarySource,
  /// Further attributes for the main array.
  pub extras: BTreeMap<String, AttrValue>,
  /// Provenance, if wanted.
  pub book_keeping: Option<BookKeeping>
}

impl NewMain {
  /// A main dataset description without extras or book-keeping.
  pub fn new<N: Into<String>, Q: Into<String>, U: Into<String>>(
    name: N,
    quantity: Q,
    units: U,
    position: AncillarySource,
    spectroscopic: AncillarySource
  ) -> Self {
    return Self {
      name: name.into(),
      quantity: quantity.into(),
      units: units.into(),
      position,
      spectroscopic,
      extras: BTreeMap::new(),
      book_keeping: None
    };
  }

  /// Adds a free-form attribute.
  pub fn with_extra<K: Into<String>, V: Into<AttrValue>>(
    mut self,
    key: K,
    value: V
  ) -> Self {
    self.extras.insert(key.into(), value.into());
    return self;
  }

  /// Adds book-keeping.
  pub fn with_book_keeping(mut self, book_keeping: BookKeeping) -> Self {
    self.book_keeping = Some(book_keeping);
    return self;
  }
}

/// Converts an ancillary's matrices into arrays in their persisted dtypes.
fn ancillary_arrays(anc: &Ancillary) -> UsidResult<(ArrayData, ArrayData)> {
  let inds = ArrayData::U32(matrix_to_array(anc.indices()));
  let vals = ArrayData::F64(matrix_to_array(anc.values())).cast(Dtype::F32)?;
  return Ok((inds, vals));
}

/// The index and value array names for a base name, which may or may not end
/// in `_`.
fn ancillary_names(prefix: &str) -> (String, String) {
  let base = prefix.strip_suffix('_').unwrap_or(prefix);
  return (format!("{}_Indices", base), format!("{}_Values", base));
}

/// Fails with a `NameConflict` if any of the names is taken under `parent`.
fn check_free<A: ArrayStore + ?Sized>(
  store: &A,
  parent: NodeId,
  names: &[&str]
) -> UsidResult<()> {
  for name in names {
    if store.child(parent, name).is_some() {
      return Err(UsidError::NameConflict(format!(
        "{}/{} already exists",
        store.path(parent).trim_end_matches('/'),
        name
      )));
    }
  }
  return Ok(());
}

/// Writes an ancillary pair as `<base>_Indices` and `<base>_Values` under a
/// group, with labels, units and one region label per dimension. Refuses to
/// overwrite anything.
pub fn write_ancillary<A: ArrayStore + ?Sized>(
  store: &mut A,
  parent: NodeId,
  anc: &Ancillary,
  prefix: &str
) -> UsidResult<(NodeId, NodeId)> {
  let (inds_name, vals_name) = ancillary_names(prefix);
  check_free(store, parent, &[inds_name.as_str(), vals_name.as_str()])?;
  let regions = anc.regions()?;
  let (inds_data, vals_data) = ancillary_arrays(anc)?;
  let mut attrs = Attributes {
    labels: Some(anc.labels().to_vec()),
    units: Some(Units::PerDimension(anc.units().to_vec())),
    ..Default::default()
  };
  if !anc.incomplete().is_empty() {
    attrs.incomplete_dimensions = Some(anc.incomplete().to_vec());
  }
  let storage = Storage::default();
  let inds = store.create_array(parent, &inds_name, inds_data, &storage)?;
  let vals = store.create_array(parent, &vals_name, vals_data, &storage)?;
  for node in [inds, vals] {
    store.write_attributes(node, attrs.clone())?;
    for (name, region) in regions.iter() {
      store.write_region(node, name, region.clone())?;
    }
  }
  debug!(
    "wrote {} ancillary {:?} as {}",
    anc.orientation(),
    anc.labels(),
    store.path(inds)
  );
  return Ok((inds, vals));
}

/// Builds the ancillary pair for some dimensions and writes it, see
/// `write_ancillary`.
pub fn write_ind_val_dsets<A: ArrayStore + ?Sized>(
  store: &mut A,
  parent: NodeId,
  dims: &[Dimension],
  orientation: Orientation,
  prefix: &str
) -> UsidResult<(NodeId, NodeId)> {
  let anc = Ancillary::from_dimensions(dims, orientation)?;
  return write_ancillary(store, parent, &anc, prefix);
}

/// Reads an ancillary pair back. Without an orientation, it's guessed from
/// the shape of the indices. Missing labels get default names; missing units
/// are left empty.
pub fn read_ancillary<A: ArrayStore + ?Sized>(
  store: &A,
  indices: NodeId,
  values: NodeId,
  orientation: Option<Orientation>
) -> UsidResult<Ancillary> {
  let inds = matrix_from_array(&store.read(indices)?.to_array::<u32>()?)?;
  let vals = matrix_from_array(&store.read(values)?.to_array::<f64>()?)?;
  let orientation = orientation
    .unwrap_or_else(|| Orientation::guess(inds.nrows(), inds.ncols()));
  let ndims = match orientation {
    Orientation::Position => inds.ncols(),
    Orientation::Spectroscopic => inds.nrows(),
  };
  let attrs = store.attributes(indices)?;
  let labels = attrs.labels.clone().unwrap_or_else(|| {
    return (0..ndims).map(|i| orientation.default_label(i)).collect();
  });
  let units = match &attrs.units {
    Some(Units::PerDimension(u)) => u.clone(),
    Some(Units::Scalar(u)) => vec![u.clone(); ndims],
    None => vec![String::new(); ndims],
  };
  let anc = Ancillary::new(orientation, inds, vals, labels, units)?;
  return match &attrs.incomplete_dimensions {
    Some(names) => anc.with_incomplete(names.as_slice()),
    None => Ok(anc),
  };
}

/// Links an array to its four ancillaries, then checks that the result is a
/// valid main dataset. If it isn't, the links are taken away again.
pub fn link_as_main<A: ArrayStore + ?Sized>(
  store: &mut A,
  main: NodeId,
  position: (NodeId, NodeId),
  spectroscopic: (NodeId, NodeId)
) -> UsidResult<()> {
  let targets = [position.0, position.1, spectroscopic.0, spectroscopic.1];
  for (role, target) in AncillaryRole::all().iter().zip(targets) {
    store.link(main, *role, target)?;
  }
  if let Err(e) = check_main(store, main) {
    for role in AncillaryRole::all() {
      store.unlink(main, *role)?;
    }
    return Err(e);
  }
  return Ok(());
}

/// Checks existing ancillaries against the main array before reusing them.
fn check_existing<A: ArrayStore + ?Sized>(
  store: &A,
  indices: NodeId,
  values: NodeId,
  orientation: Orientation,
  main_shape: &[usize]
) -> UsidResult<()> {
  let inds = store.shape(indices)?;
  let vals = store.shape(values)?;
  let fits = inds.len() == 2 && inds == vals && match orientation {
    Orientation::Position => inds[0] == main_shape[0],
    Orientation::Spectroscopic => inds[1] == main_shape[1],
  };
  if !fits {
    return Err(match orientation {
      Orientation::Position => MainInvariant::PositionShape {
        indices: inds,
        values: vals,
        main: main_shape.to_vec()
      },
      Orientation::Spectroscopic => MainInvariant::SpectroscopicShape {
        indices: inds,
        values: vals,
        main: main_shape.to_vec()
      },
    }.into());
  }
  return Ok(());
}

/// Checks that dimensions account for exactly `steps` steps.
fn check_dimensions(
  dims: &[Dimension],
  orientation: Orientation,
  steps: usize
) -> UsidResult<()> {
  let sizes: Vec<usize> = dims.iter().map(|d| d.len()).collect();
  if checked_product(&sizes) != Some(steps) {
    return Err(UsidError::shape_mismatch(
      format!("{} dimensions", orientation),
      format!("sizes {:?} don't make {} steps", sizes, steps)
    ));
  }
  return Ok(());
}

/// Writes a main dataset: its ancillaries (unless existing ones are reused),
/// the 2-D data, its attributes and the links between them. Everything is
/// checked before anything is written, and the result is checked again
/// before returning.
pub fn write_main_dataset<A: ArrayStore + ?Sized>(
  store: &mut A,
  parent: NodeId,
  data: ArrayData,
  new: NewMain,
  options: &WriteOptions
) -> UsidResult<MainDataset> {
  let shape = data.shape().to_vec();
  if shape.len() != 2 {
    return Err(UsidError::type_mismatch(
      "main data",
      format!("a 2-D array, got shape {:?}", shape)
    ));
  }
  let mut name = new.name.trim().to_string();
  if name.is_empty() {
    return Err(UsidError::type_mismatch("name", "a non-empty string"));
  }
  if name.contains('-') {
    let fixed = name.replace('-', "_");
    warn!("main dataset name {} contains '-', using {}", name, fixed);
    name = fixed;
  }
  let quantity = new.quantity.trim().to_string();
  if quantity.is_empty() {
    return Err(UsidError::type_mismatch("quantity", "a non-empty string"));
  }
  let units = new.units.trim().to_string();
  if units.is_empty() {
    return Err(UsidError::type_mismatch("units", "a non-empty string"));
  }
  if store.child(parent, &name).is_some() {
    return Err(UsidError::NameConflict(format!(
      "{}/{} already exists",
      store.path(parent).trim_end_matches('/'),
      name
    )));
  }
  let storage = options.main_storage();
  storage.validate(&shape)?;

  let mut attrs = Attributes {
    quantity: Some(quantity),
    units: Some(Units::Scalar(units)),
    ..Default::default()
  };
  for (key, value) in new.extras {
    attrs.insert_extra(key, value)?;
  }
  if let Some(bk) = &new.book_keeping {
    bk.apply(&mut attrs)?;
  }

  let groups = [
    (Orientation::Position, &new.position, &options.position_prefix, shape[0]),
    (
      Orientation::Spectroscopic,
      &new.spectroscopic,
      &options.spectroscopic_prefix,
      shape[1]
    ),
  ];
  // check both groups before writing either
  let mut pending: Vec<Ancillary> = Vec::new();
  let mut new_names: Vec<String> = Vec::new();
  for (orientation, source, prefix, steps) in groups.iter() {
    match source {
      AncillarySource::Dimensions(dims) => {
        check_dimensions(dims, *orientation, *steps)?;
        pending.push(Ancillary::from_dimensions(dims, *orientation)?);
        let (inds, vals) = ancillary_names(prefix);
        for name in [inds, vals] {
          if new_names.contains(&name) {
            return Err(UsidError::NameConflict(format!(
              "position and spectroscopic ancillaries would both be {}",
              name
            )));
          }
          check_free(store, parent, &[name.as_str()])?;
          new_names.push(name);
        }
      },
      AncillarySource::Existing { indices, values } => {
        check_existing(store, *indices, *values, *orientation, &shape)?;
      },
    }
  }
  let mut pending = pending.into_iter();
  let mut written: Vec<(NodeId, NodeId)> = Vec::with_capacity(2);
  for (_, source, prefix, _) in groups.iter() {
    let pair = match source {
      AncillarySource::Existing { indices, values } => (*indices, *values),
      AncillarySource::Dimensions(_) => match pending.next() {
        Some(anc) => write_ancillary(store, parent, &anc, prefix)?,
        None => return Err(UsidError::MissingNode(
          "ancillary built for writing".to_string()
        )),
      },
    };
    written.push(pair);
  }

  let main = store.create_array(parent, &name, data, &storage)?;
  store.write_attributes(main, attrs)?;
  link_as_main(store, main, written[0], written[1])?;
  info!("wrote main dataset {} with shape {:?}", store.path(main), shape);
  return MainDataset::open(store, main);
}

/// Drops dimensions from an existing ancillary pair and writes the result
/// next to it, as `<prefix>_Indices` and `<prefix>_Values`. Without an
/// explicit orientation, it is guessed from the shape, which fails for square
/// matrices. The default prefix is the orientation's base name.
pub fn write_reduced_anc_dsets<A: ArrayStore + ?Sized, S: AsRef<str>>(
  store: &mut A,
  parent: NodeId,
  indices: NodeId,
  values: NodeId,
  drop: &[S],
  orientation: Option<Orientation>,
  prefix: Option<&str>
) -> UsidResult<(NodeId, NodeId)> {
  let orientation = match orientation {
    Some(o) => o,
    None => match store.shape(indices)?.as_slice() {
      [rows, cols] if rows == cols => return Err(UsidError::type_mismatch(
        store.path(indices),
        "an explicit orientation for a square ancillary"
      )),
      [rows, cols] => Orientation::guess(*rows, *cols),
      other => return Err(UsidError::type_mismatch(
        store.path(indices),
        format!("a 2-D array, got shape {:?}", other)
      )),
    },
  };
  let anc = read_ancillary(store, indices, values, Some(orientation))?;
  let reduced = reduce_ancillary(&anc, drop)?;
  let prefix = prefix.unwrap_or(orientation.base_name());
  return write_ancillary(store, parent, &reduced, prefix);
}

/// A main dataset read back from a store. Holds its ancillaries in memory;
/// the data itself is read on request.
#[derive(Clone, Debug)]
pub struct MainDataset {
  /// The main array.
  node: NodeId,
  /// The physical quantity.
  quantity: String,
  /// Its units.
  units: String,
  /// Position ancillary.
  position: Ancillary,
  /// Spectroscopic ancillary.
  spectroscopic: Ancillary,
  /// The ancillary arrays, by role.
  links: BTreeMap<AncillaryRole, NodeId>
}

impl MainDataset {
  /// Opens a main dataset, failing with the first broken invariant if the
  /// node isn't one.
  pub fn open<A: ArrayStore + ?Sized>(
    store: &A,
    node: NodeId
  ) -> UsidResult<Self> {
    check_main(store, node)?;
    let mut links: BTreeMap<AncillaryRole, NodeId> = BTreeMap::new();
    for role in AncillaryRole::all() {
      let target = store.resolve(node, *role)
        .ok_or(MainInvariant::MissingLink(*role))?;
      links.insert(*role, target);
    }
    let attrs = store.attributes(node)?;
    let quantity = attrs.quantity.clone()
      .ok_or(MainInvariant::MissingAttribute("quantity"))?;
    let units = attrs.scalar_units()
      .ok_or(MainInvariant::NonScalarAttribute("units"))?
      .to_string();
    let read = |o: Orientation| {
      let (inds, vals) = AncillaryRole::for_orientation(o);
      return read_ancillary(store, links[&inds], links[&vals], Some(o));
    };
    let position = read(Orientation::Position)?;
    let spectroscopic = read(Orientation::Spectroscopic)?;
    return Ok(Self { node, quantity, units, position, spectroscopic, links });
  }

  /// The main array.
  pub fn node(&self) -> NodeId {
    return self.node;
  }

  /// The physical quantity.
  pub fn quantity(&self) -> &str {
    return &self.quantity;
  }

  /// The units of the quantity.
  pub fn units(&self) -> &str {
    return &self.units;
  }

  /// One of the ancillaries.
  pub fn ancillary(&self, orientation: Orientation) -> &Ancillary {
    return match orientation {
      Orientation::Position => &self.position,
      Orientation::Spectroscopic => &self.spectroscopic,
    };
  }

  /// The array behind a link.
  pub fn ancillary_node(&self, role: AncillaryRole) -> Option<NodeId> {
    return self.links.get(&role).copied();
  }

  /// The shape of the flat data, [positions, spectral steps].
  pub fn shape(&self) -> (usize, usize) {
    return (self.position.num_steps(), self.spectroscopic.num_steps());
  }

  /// Reads the flat data.
  pub fn read<T: StoreElement, A: ArrayStore + ?Sized>(
    &self,
    store: &A
  ) -> UsidResult<MainArray<T>> {
    return Ok(MainArray::Eager(store.read(self.node)?.to_array::<T>()?));
  }

  /// Reads the flat data behind a deferred array: reshapes, permutations and
  /// slices of the result are composed lazily instead of copying the data.
  /// Elements are still converted to `T` up front, so a dtype that doesn't
  /// fit fails here.
  pub fn read_deferred<T: StoreElement, A: ArrayStore + ?Sized>(
    &self,
    store: &A
  ) -> UsidResult<MainArray<T>> {
    let data = store.read(self.node)?.to_array::<T>()?;
    return Ok(MainArray::Deferred(DeferredArray::new(data)));
  }

  /// Reads the data and reshapes it into one axis per dimension.
  pub fn to_nd<T: StoreElement, A: ArrayStore + ?Sized>(
    &self,
    store: &A,
    options: &ReshapeOptions
  ) -> UsidResult<NdView<T>> {
    let flat = self.read::<T, A>(store)?;
    return to_nd(
      &flat,
      Some((&self.position).into()),
      Some((&self.spectroscopic).into()),
      options
    );
  }

  /// Flattens N-D data shaped like this dataset's `to_nd` output.
  pub fn to_2d<T: Clone + 'static>(
    &self,
    nd: &MainArray<T>,
    options: &ReshapeOptions
  ) -> UsidResult<FlatView<T>> {
    return to_2d(
      nd,
      Some((&self.position).into()),
      Some((&self.spectroscopic).into()),
      options
    );
  }

  /// The unit values of every dimension in a group.
  pub fn unit_values(
    &self,
    orientation: Orientation
  ) -> UsidResult<BTreeMap<String, Vec<f64>>> {
    return get_unit_values(self.ancillary(orientation));
  }

  /// The dimensions of a group, fastest first.
  pub fn dimensions(
    &self,
    orientation: Orientation
  ) -> UsidResult<Vec<Dimension>> {
    return self.ancillary(orientation).dimensions();
  }

  /// A group's ancillary with some dimensions dropped.
  pub fn reduce<S: AsRef<str>>(
    &self,
    orientation: Orientation,
    drop: &[S]
  ) -> UsidResult<Ancillary> {
    return reduce_ancillary(self.ancillary(orientation), drop);
  }
}
