//! This library implements a convention for storing N-dimensional measurement
//! data as a flat 2-D array plus two pairs of index/value tables, and the
//! algorithms that move data between the flat form and its N-dimensional
//! interpretation.
//!
//! Rows of the flat array are "positions", the outer dimensions; columns are
//! "spectroscopic" steps, the inner dimensions sampled at every position.
//! Each group gets an index matrix and a value matrix (an "ancillary") that
//! say which tick of which dimension every row or column corresponds to.
//!
//! The library never does numerical analysis on the data, only its
//! structural organisation. Persistence goes through the `ArrayStore` trait;
//! `MemoryStore` is an in-memory implementation of it.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![allow(clippy::needless_return)]

pub mod ancillary;
pub mod array;
pub mod config;
pub mod dimension;
pub mod error;
pub mod main_dataset;
pub mod reshape;
pub mod store;

/// Everything needed for day-to-day use.
pub mod prelude {
  pub use crate::ancillary::builder::{
    build_ind_val_matrices,
    indices_from_value_array,
    indices_from_values,
    make_indices_matrix
  };
  pub use crate::ancillary::order::{dimensionality, sort_order};
  pub use crate::ancillary::reduce::reduce_ancillary;
  pub use crate::ancillary::unit_values::{
    get_unit_values,
    get_unit_values_for,
    get_unit_values_raw
  };
  pub use crate::ancillary::{
    aux_slicing,
    Ancillary,
    IndexMatrix,
    ValueMatrix
  };
  pub use crate::array::MainArray;
  pub use crate::config::{AxisOrder, ReshapeOptions, UsidConfig, WriteOptions};
  pub use crate::dimension::{Dimension, Orientation};
  pub use crate::error::{MainInvariant, UsidError, UsidResult};
  pub use crate::main_dataset::validate::{check_main, find_all_main, is_main};
  pub use crate::main_dataset::{
    link_as_main,
    read_ancillary,
    write_ind_val_dsets,
    write_main_dataset,
    write_reduced_anc_dsets,
    AncillarySource,
    MainDataset,
    NewMain
  };
  pub use crate::reshape::{
    to_2d,
    to_nd,
    GroupIndices,
    NdView,
    ReshapeStatus
  };
  pub use crate::store::memory::MemoryStore;
  pub use crate::store::{
    AncillaryRole,
    ArrayData,
    ArrayStore,
    Attributes,
    BookKeeping,
    NodeId
  };
}

#[cfg(test)]
mod tests;
