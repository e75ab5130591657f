//! Validate command implementation.

use std::path::PathBuf;

use keystone_canonical::{object_id, Codec};

use crate::error::CliError;
use crate::input;
use crate::output::Report;

pub fn run(codec: &Codec, input: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let bytes = input::read_hex(input.as_ref())?;
    let value = codec.decode(&bytes)?;

    Report::new()
        .field("value", value.to_string())
        .field("object_id", object_id(&bytes).to_hex())
        .field("verdict", "ok")
        .print(json)
}
