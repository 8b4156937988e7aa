//! Working out which dimension varies fastest, and how many steps each one
//! has. All functions take index matrices with one row per dimension.

use std::cmp::Reverse;

use itertools::Itertools;

use crate::ancillary::IndexMatrix;
use crate::error::{UsidError, UsidResult};

/// Counts, for each row, how many times the index changes between adjacent
/// steps.
pub fn transition_counts(indices: &IndexMatrix) -> Vec<usize> {
  return indices.row_iter()
    .map(|row| row.iter().tuple_windows().filter(|(a, b)| a != b).count())
    .collect();
}

/// Orders rows from fastest-varying to slowest. Rows that change equally
/// often keep their relative order.
pub fn sort_order(indices: &IndexMatrix) -> Vec<usize> {
  let counts = transition_counts(indices);
  let mut order: Vec<usize> = (0..counts.len()).collect();
  order.sort_by_key(|i| Reverse(counts[*i]));
  return order;
}

/// The number of distinct indices in each row.
pub fn cardinalities(indices: &IndexMatrix) -> Vec<usize> {
  return indices.row_iter()
    .map(|row| row.iter().unique().count())
    .collect();
}

/// The number of distinct indices in each row, optionally reordered. The
/// order must be a permutation of the row numbers.
pub fn dimensionality(
  indices: &IndexMatrix,
  order: Option<&[usize]>
) -> UsidResult<Vec<usize>> {
  let cards = cardinalities(indices);
  let order = match order {
    Some(o) => o,
    None => return Ok(cards),
  };
  let sorted: Vec<usize> = order.iter().copied().sorted().collect();
  if sorted != (0..cards.len()).collect::<Vec<usize>>() {
    return Err(UsidError::shape_mismatch(
      "sort order",
      format!(
        "{:?} is not a permutation of the {} dimension rows",
        order,
        cards.len()
      )
    ));
  }
  return Ok(order.iter().map(|i| cards[*i]).collect());
}
