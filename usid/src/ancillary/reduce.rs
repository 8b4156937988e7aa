//! Dropping dimensions from an ancillary. The dropped dimensions are fixed at
//! their first tick, not aggregated.

use log::debug;

use crate::ancillary::Ancillary;
use crate::error::UsidResult;

/// Removes the named dimensions. The result keeps only the steps where every
/// dropped dimension sits at its minimum index; dropping everything leaves a
/// single-step ancillary.
pub fn reduce_ancillary<S: AsRef<str>>(
  anc: &Ancillary,
  drop: &[S]
) -> UsidResult<Ancillary> {
  let mut dropped: Vec<usize> = Vec::with_capacity(drop.len());
  for name in drop {
    let row = anc.label_index(name.as_ref())?;
    if !dropped.contains(&row) {
      dropped.push(row);
    }
  }
  if dropped.is_empty() {
    return Ok(anc.clone());
  }
  if dropped.len() == anc.num_dims() {
    debug!("every {} dimension dropped", anc.orientation());
    return Ok(Ancillary::single_step(anc.orientation()));
  }
  let (inds, vals) = anc.dims_as_rows();
  let mins: Vec<u32> = dropped.iter()
    .map(|r| inds.row(*r).iter().copied().min().unwrap_or(0))
    .collect();
  let keep_cols: Vec<usize> = (0..inds.ncols())
    .filter(|c| {
      return dropped.iter()
        .zip(mins.iter())
        .all(|(r, m)| inds[(*r, *c)] == *m);
    })
    .collect();
  let keep_rows: Vec<usize> = (0..inds.nrows())
    .filter(|r| !dropped.contains(r))
    .collect();
  debug!(
    "reduced {} ancillary from {} to {} dimensions, {} to {} steps",
    anc.orientation(),
    inds.nrows(),
    keep_rows.len(),
    inds.ncols(),
    keep_cols.len()
  );
  let inds = inds.select_rows(keep_rows.iter())
    .select_columns(keep_cols.iter());
  let vals = vals.select_rows(keep_rows.iter())
    .select_columns(keep_cols.iter());
  let labels = keep_rows.iter().map(|r| anc.labels()[*r].clone()).collect();
  let units = keep_rows.iter().map(|r| anc.units()[*r].clone()).collect();
  let incomplete: Vec<&String> = anc.incomplete().iter()
    .filter(|name| keep_rows.iter().any(|r| anc.labels()[*r] == **name))
    .collect();
  return Ancillary::from_dims_as_rows(
    anc.orientation(),
    inds,
    vals,
    labels,
    units
  )?.with_incomplete(incomplete.as_slice());
}
