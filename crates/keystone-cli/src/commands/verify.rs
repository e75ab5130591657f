//! Verify command implementation.

use std::path::PathBuf;

use keystone_canonical::Codec;
use keystone_core::{check, PublicKey, SignatureError};

use crate::error::CliError;
use crate::input;
use crate::output::Report;

pub fn run(
    codec: &Codec,
    input: Option<PathBuf>,
    public_key: &str,
    signature: &str,
    json: bool,
) -> Result<(), CliError> {
    let public_key = PublicKey::from_hex(public_key)?;
    let signature = hex::decode(signature.trim()).map_err(|_| SignatureError::InvalidSignature)?;

    let description = input::read_text(input.as_ref())?;
    let canonical = codec.canonicalize_json(&description)?;
    check(&canonical.bytes, &signature, &public_key)?;

    Report::new()
        .field("object_id", canonical.object_id.to_hex())
        .field("public_key", public_key.to_hex())
        .field("verdict", "ok")
        .print(json)
}
