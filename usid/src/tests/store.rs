use ndarray::{ArrayD, IxDyn};

use crate::prelude::*;
use crate::store::*;
use crate::tests::*;

/// A region covering the given rows and every column.
fn rows(start: usize, end: usize) -> RegionSlice {
  return RegionSlice {
    rows: AxisSlice::Range { start, end },
    cols: AxisSlice::All
  };
}

#[test]
fn test_hierarchy() {
  init_logger();
  let mut store = MemoryStore::new();
  let root = store.root();
  let group = store.create_group(root, "Measurement_000").unwrap();
  let inner = store.create_group(group, "Channel_000").unwrap();
  let data = store.create_array(
    inner,
    "Raw_Data",
    counting(2, 3).into(),
    &Storage::default()
  ).unwrap();
  assert_eq!(store.kind(group).unwrap(), NodeKind::Group);
  assert_eq!(store.kind(data).unwrap(), NodeKind::Array);
  assert_eq!(store.path(data), "/Measurement_000/Channel_000/Raw_Data");
  assert_eq!(store.path(root), "/");
  assert_eq!(store.parent(data).unwrap(), Some(inner));
  assert_eq!(store.parent(root).unwrap(), None);
  assert_eq!(store.children(group).unwrap(), vec![inner]);
  assert_eq!(store.child(inner, "Raw_Data"), Some(data));
  assert_eq!(store.shape(data).unwrap(), vec![2, 3]);
  assert_eq!(store.read(data).unwrap(), ArrayData::F64(counting(2, 3)));
  assert!(matches!(
    store.require_child(root, "Nope"),
    Err(UsidError::MissingNode(_))
  ));
  assert!(matches!(
    store.create_group(group, "Channel_000"),
    Err(UsidError::NameConflict(_))
  ));
  assert!(store.create_group(group, "").is_err());
  assert!(store.create_group(group, "a/b").is_err());
  assert!(matches!(
    store.create_group(data, "Child"),
    Err(UsidError::TypeMismatch { .. })
  ));
  assert!(store.read(group).is_err());
  let other = store.create_group(root, "Measurement_001").unwrap();
  let copy = store.create_array(
    other,
    "Raw_Data",
    counting(1, 1).into(),
    &Storage::default()
  ).unwrap();
  let found = find_dataset(&store, root, "Raw_Data").unwrap();
  assert_eq!(found, vec![data, copy]);
  assert_eq!(find_dataset(&store, other, "Raw_Data").unwrap(), vec![copy]);
}

#[test]
fn test_remove_and_links() {
  let mut store = MemoryStore::new();
  let root = store.root();
  let group = store.create_group(root, "G").unwrap();
  let a = store.create_array(
    group,
    "A",
    counting(2, 2).into(),
    &Storage::default()
  ).unwrap();
  let b = store.create_array(
    root,
    "B",
    counting(2, 2).into(),
    &Storage::default()
  ).unwrap();
  store.link(b, AncillaryRole::PositionIndices, a).unwrap();
  assert_eq!(store.resolve(b, AncillaryRole::PositionIndices), Some(a));
  assert_eq!(store.resolve(b, AncillaryRole::PositionValues), None);
  // removing a group takes its children with it and leaves the link dangling
  store.remove(group).unwrap();
  assert!(matches!(store.read(a), Err(UsidError::MissingNode(_))));
  assert_eq!(store.child(root, "G"), None);
  assert_eq!(store.resolve(b, AncillaryRole::PositionIndices), None);
  assert!(store.link(b, AncillaryRole::PositionValues, a).is_err());
  store.unlink(b, AncillaryRole::PositionIndices).unwrap();
  assert!(matches!(
    store.unlink(b, AncillaryRole::PositionIndices),
    Err(UsidError::MissingNode(_))
  ));
  assert!(store.remove(root).is_err());
  // the name can be reused once removed
  store.create_group(root, "G").unwrap();
}

#[test]
fn test_regions_and_storage() {
  let mut store = MemoryStore::new();
  let root = store.root();
  let storage = Storage { chunks: Some(vec![2, 5]), compression: None };
  let data = store.create_array(
    root,
    "Data",
    counting(4, 5).into(),
    &storage
  ).unwrap();
  assert_eq!(store.storage(data).unwrap(), &storage);
  let bad = Storage { chunks: Some(vec![2]), compression: None };
  let rejected = store.create_array(root, "Bad", counting(4, 5).into(), &bad);
  assert!(rejected.is_err());
  store.write_region(data, "Top", rows(0, 2)).unwrap();
  assert!(store.write_region(data, "Outside", rows(3, 6)).is_err());
  assert!(store.write_region(data, "Empty", rows(2, 2)).is_err());
  let regions = store.regions(data).unwrap();
  assert_eq!(regions.len(), 1);
  let top = store.read_region(data, &regions["Top"]).unwrap();
  assert_eq!(top, ArrayData::F64(counting(2, 5)));
  let cube = ArrayD::<u32>::zeros(IxDyn(&[2, 2, 2]));
  let cube = store.create_array(
    root,
    "Cube",
    cube.into(),
    &Storage::default()
  ).unwrap();
  assert!(store.write_region(cube, "Any", rows(0, 1)).is_err());
}

#[test]
fn test_array_data() {
  let ints: ArrayD<i64> = ArrayD::from_shape_vec(IxDyn(&[3]), vec![0, 7, 42])
    .unwrap();
  let data = ArrayData::from(ints);
  assert_eq!(data.dtype(), Dtype::I64);
  assert_eq!(data.ndim(), 1);
  let floats = data.cast(Dtype::F32).unwrap();
  assert_eq!(floats.dtype(), Dtype::F32);
  let back = floats.to_array::<u32>().unwrap();
  assert_eq!(back.as_slice(), Some(&[0, 7, 42][..]));
  let negative = ArrayData::from(
    ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0f64, -1.0]).unwrap()
  );
  assert!(matches!(
    negative.cast(Dtype::U32),
    Err(UsidError::TypeMismatch { .. })
  ));
  assert!(negative.region(&rows(0, 1)).is_err());
}

#[test]
fn test_attributes() {
  let mut attrs = Attributes::default();
  attrs.insert_extra("operator", "somebody").unwrap();
  attrs.insert_extra("gain", 2.5).unwrap();
  attrs.insert_extra("averages", 16i64).unwrap();
  assert_eq!(attrs.extras["gain"], AttrValue::Float(2.5));
  assert_eq!(attrs.extras["operator"], AttrValue::Str("somebody".into()));
  for reserved in ["quantity", "labels", "Spectroscopic_Values"] {
    assert!(matches!(
      attrs.insert_extra(reserved, true),
      Err(UsidError::NameConflict(_))
    ));
  }
  attrs.units = Some(Units::Scalar("nA".into()));
  assert_eq!(attrs.scalar_units(), Some("nA"));
  assert_eq!(attrs.dimension_units(), None);
  let book = BookKeeping::here("2024-01-01 00:00:00", "bench-3");
  book.apply(&mut attrs).unwrap();
  assert_eq!(attrs.extras["machine_id"], AttrValue::Str("bench-3".into()));
  assert_eq!(
    attrs.extras["usid_version"],
    AttrValue::Str(env!("CARGO_PKG_VERSION").into())
  );
  assert!(attrs.extras.contains_key("platform"));
}

#[test]
fn test_roles() {
  for role in AncillaryRole::all() {
    let (inds, vals) = AncillaryRole::for_orientation(role.orientation());
    assert!(*role == inds || *role == vals);
    assert_eq!(role.is_indices(), *role == inds);
    assert!(Attributes::RESERVED.contains(&role.name()));
  }
  let role = AncillaryRole::SpectroscopicValues;
  assert_eq!(role.to_string(), "Spectroscopic_Values");
}
