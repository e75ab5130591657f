//! Block-id command implementation.

use std::path::PathBuf;

use keystone_canonical::block_id;

use crate::error::CliError;
use crate::input;
use crate::output::Report;

/// Hashes the input bytes exactly as read; they are never canonicalized.
pub fn run(input: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let bytes = input::read_bytes(input.as_ref())?;
    Report::new()
        .field("block_id", block_id(&bytes).to_hex())
        .field("size", bytes.len().to_string())
        .print(json)
}
