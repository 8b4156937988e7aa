use clap::Parser;

use crate::prelude::*;
use crate::store::{Compression, Storage};

/// A host program embedding the options.
#[derive(Parser, Debug)]
struct Host {
  /// Reshape options.
  #[command(flatten)]
  reshape: ReshapeOptions,
  /// Write options.
  #[command(flatten)]
  write: WriteOptions
}

#[test]
fn test_defaults() {
  let config = UsidConfig::default();
  assert_eq!(config.reshape.axis_order, AxisOrder::SlowToFast);
  assert_eq!(config.write.position_prefix, "Position_");
  assert_eq!(config.write.spectroscopic_prefix, "Spectroscopic_");
  assert_eq!(config.write.main_storage(), Storage::default());
  assert_eq!(UsidConfig::from_toml_str("").unwrap(), config);
}

#[test]
fn test_toml() {
  let config = UsidConfig::from_toml_str(r#"
    [reshape]
    axis_order = "as_stored"

    [write]
    position_prefix = "Pos_"
    chunks = [2, 15]
    compression = "gzip"
  "#).unwrap();
  assert_eq!(config.reshape.axis_order, AxisOrder::AsStored);
  assert_eq!(config.write.position_prefix, "Pos_");
  assert_eq!(config.write.spectroscopic_prefix, "Spectroscopic_");
  let storage = config.write.main_storage();
  assert_eq!(storage.chunks, Some(vec![2, 15]));
  assert_eq!(storage.compression, Some(Compression::Gzip));
  let bad = UsidConfig::from_toml_str("[reshape]\naxis_order = \"sideways\"");
  assert!(matches!(bad, Err(UsidError::Config(_))));
  let missing = UsidConfig::from_file("/nonexistent/usid.toml");
  assert!(matches!(missing, Err(UsidError::Config(_))));
}

#[test]
fn test_command_line() {
  let host = Host::parse_from(["host"]);
  assert_eq!(host.reshape, ReshapeOptions::default());
  assert_eq!(host.write, WriteOptions::default());
  let host = Host::parse_from([
    "host",
    "--axis-order", "as_stored",
    "--spectroscopic-prefix", "Spec_",
    "--chunks", "4,5",
    "--compression", "lzf"
  ]);
  assert_eq!(host.reshape.axis_order, AxisOrder::AsStored);
  assert_eq!(host.write.spectroscopic_prefix, "Spec_");
  assert_eq!(host.write.chunks, Some(vec![4, 5]));
  assert_eq!(host.write.compression, Some(Compression::Lzf));
  assert!(Host::try_parse_from(["host", "--axis-order", "diagonal"]).is_err());
}
