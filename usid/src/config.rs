//! This module implements the options that steer reshaping and writing. They
//! can be embedded in a host program's command line, or loaded from TOML.

use std::fmt::Display;
use std::path::Path;

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::error::{UsidError, UsidResult};
use crate::store::{Compression, Storage};

/// How the axes of each dimension group are laid out in an N-D view.
#[derive(
  Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ValueEnum
)]
#[clap(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AxisOrder {
  /// Slowest-varying dimension first, fastest last. This is the order a
  /// row-major reshape produces.
  SlowToFast,
  /// Same order as the rows of the index matrices.
  AsStored
}

impl Default for AxisOrder {
  fn default() -> Self {
    return Self::SlowToFast;
  }
}

impl Display for AxisOrder {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return write!(f, "{}", match self {
      Self::SlowToFast => "slow_to_fast",
      Self::AsStored => "as_stored",
    });
  }
}

/// Options for going between flat and N-D forms.
#[derive(
  Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Args
)]
#[serde(default)]
pub struct ReshapeOptions {
  /// Axis layout of each dimension group.
  #[arg(long, value_enum, default_value_t)]
  pub axis_order: AxisOrder
}

/// Options for writing main datasets and ancillaries.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Args)]
#[serde(default)]
pub struct WriteOptions {
  /// Base name of position ancillaries.
  #[arg(long, default_value = "Position_")]
  pub position_prefix: String,
  /// Base name of spectroscopic ancillaries.
  #[arg(long, default_value = "Spectroscopic_")]
  pub spectroscopic_prefix: String,
  /// Chunk shape for the main array.
  #[arg(long, value_delimiter = ',')]
  pub chunks: Option<Vec<usize>>,
  /// Compression for the main array.
  #[arg(long, value_enum)]
  pub compression: Option<Compression>
}

impl Default for WriteOptions {
  fn default() -> Self {
    return Self {
      position_prefix: "Position_".to_string(),
      spectroscopic_prefix: "Spectroscopic_".to_string(),
      chunks: None,
      compression: None
    };
  }
}

impl WriteOptions {
  /// Storage hints for the main array.
  pub fn main_storage(&self) -> Storage {
    return Storage {
      chunks: self.chunks.clone(),
      compression: self.compression
    };
  }
}

/// Everything configurable, as read from a TOML file:
///
/// ```toml
/// [reshape]
/// axis_order = "as_stored"
///
/// [write]
/// position_prefix = "Pos_"
/// compression = "gzip"
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UsidConfig {
  /// Reshape options.
  pub reshape: ReshapeOptions,
  /// Write options.
  pub write: WriteOptions
}

impl UsidConfig {
  /// Parses a TOML document. Missing keys take their defaults.
  pub fn from_toml_str(contents: &str) -> UsidResult<Self> {
    return toml::from_str(contents)
      .map_err(|e| UsidError::Config(e.to_string()));
  }

  /// Reads and parses a TOML file.
  pub fn from_file<P: AsRef<Path>>(path: P) -> UsidResult<Self> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
      .map_err(|e| UsidError::Config(format!("{}: {}", path.display(), e)))?;
    return Self::from_toml_str(&contents);
  }
}
