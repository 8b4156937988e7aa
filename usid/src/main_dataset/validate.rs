//! Checking whether an array in a store is a well-formed main dataset.

use log::debug;

use crate::error::{MainInvariant, UsidResult};
use crate::store::*;

/// Checks every invariant of a main dataset, in order, failing on the first
/// one that doesn't hold. A node that doesn't exist is a `MissingNode` error.
pub fn check_main<A: ArrayStore + ?Sized>(
  store: &A,
  node: NodeId
) -> UsidResult<()> {
  if store.kind(node)? != NodeKind::Array {
    return Err(MainInvariant::NotAnArray.into());
  }
  let shape = store.shape(node)?;
  if shape.len() != 2 {
    return Err(MainInvariant::NotTwoDimensional { shape }.into());
  }
  let mut anc_shapes: Vec<Vec<usize>> = Vec::with_capacity(4);
  for role in AncillaryRole::all() {
    let target = store.resolve(node, *role)
      .ok_or(MainInvariant::MissingLink(*role))?;
    if store.kind(target)? != NodeKind::Array {
      return Err(MainInvariant::AncillaryNotAnArray(*role).into());
    }
    let anc_shape = store.shape(target)?;
    if anc_shape.len() != 2 {
      return Err(MainInvariant::AncillaryNotTwoDimensional {
        role: *role,
        shape: anc_shape
      }.into());
    }
    anc_shapes.push(anc_shape);
  }
  let attrs = store.attributes(node)?;
  if attrs.quantity.is_none() {
    return Err(MainInvariant::MissingAttribute("quantity").into());
  }
  match attrs.units {
    None => return Err(MainInvariant::MissingAttribute("units").into()),
    Some(Units::PerDimension(_)) => {
      return Err(MainInvariant::NonScalarAttribute("units").into());
    },
    Some(Units::Scalar(_)) => {},
  }
  let (pos_inds, pos_vals) = (&anc_shapes[0], &anc_shapes[1]);
  if pos_inds != pos_vals || pos_inds[0] != shape[0] {
    return Err(MainInvariant::PositionShape {
      indices: pos_inds.clone(),
      values: pos_vals.clone(),
      main: shape
    }.into());
  }
  let (spec_inds, spec_vals) = (&anc_shapes[2], &anc_shapes[3]);
  if spec_inds != spec_vals || spec_inds[1] != shape[1] {
    return Err(MainInvariant::SpectroscopicShape {
      indices: spec_inds.clone(),
      values: spec_vals.clone(),
      main: shape
    }.into());
  }
  return Ok(());
}

/// Whether a node is a main dataset. Never fails; anything wrong, including
/// the node not existing, just makes it false.
pub fn is_main<A: ArrayStore + ?Sized>(store: &A, node: NodeId) -> bool {
  return match check_main(store, node) {
    Ok(()) => true,
    Err(e) => {
      debug!("{} is not a main dataset: {}", store.path(node), e);
      false
    },
  };
}

/// Every main dataset at or below a group.
pub fn find_all_main<A: ArrayStore + ?Sized>(
  store: &A,
  parent: NodeId
) -> UsidResult<Vec<NodeId>> {
  let mut found: Vec<NodeId> = Vec::new();
  let mut pending: Vec<NodeId> = vec![parent];
  while let Some(node) = pending.pop() {
    for child in store.children(node)? {
      match store.kind(child)? {
        NodeKind::Group => pending.push(child),
        NodeKind::Array => if is_main(store, child) { found.push(child) },
      }
    }
  }
  found.sort();
  return Ok(found);
}
