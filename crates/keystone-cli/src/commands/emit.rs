//! Emit command implementation.

use std::path::PathBuf;

use keystone_canonical::{Codec, IngestionError};
use keystone_core::{sign, SecretKey};
use keystone_vectors::{
    check_vector, generate_vector, ConformanceVector, VectorError, VectorId, VectorInput,
};

use crate::error::CliError;
use crate::input;
use crate::output::{outcome_report, Report};

pub fn run(
    codec: &Codec,
    input: Option<PathBuf>,
    key: Option<PathBuf>,
    expect: Option<PathBuf>,
    vector_id: Option<String>,
    publish_test_key: bool,
    json: bool,
) -> Result<(), CliError> {
    // a signed vector carries its seed so anyone can reproduce the signature
    if vector_id.is_some() && key.is_some() && !publish_test_key {
        return Err(CliError::Usage(
            "--vector-id with --key writes the secret seed into the vector; \
             pass --publish-test-key if the key is a published test key"
                .to_string(),
        ));
    }

    let description = input::read_text(input.as_ref())?;

    if let Some(path) = expect {
        return compare(codec, &description, &path, json);
    }

    let secret_seed = key.as_deref().map(input::read_secret).transpose()?;

    if let Some(id) = vector_id {
        let id = VectorId::parse(id)?;
        let vector = generate_vector(
            id,
            description_input(&description)?,
            secret_seed.as_ref().map(|seed| seed.as_str()),
            codec,
        )?;
        println!("{}", serde_json::to_string_pretty(&vector)?);
        return Ok(());
    }

    let canonical = codec.canonicalize_json(&description)?;
    let mut report = Report::new()
        .field("canonical_hex", hex::encode(&canonical.bytes))
        .field("object_id", canonical.object_id.to_hex());
    if let Some(seed) = &secret_seed {
        let secret = SecretKey::from_hex(seed)?;
        let signature = sign(&canonical.bytes, &secret);
        report = report
            .field("public_key", signature.key_id().to_hex())
            .field("signature", signature.to_hex());
    }
    report.field("verdict", "ok").print(json)
}

/// Re-derives the vector in `path` from `description` instead of its own input.
fn compare(
    codec: &Codec,
    description: &str,
    path: &std::path::Path,
    json: bool,
) -> Result<(), CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut vector: ConformanceVector = serde_json::from_str(&text).map_err(VectorError::from)?;
    vector.input = description_input(description)?;

    let outcome = check_vector(&vector, codec).map_err(|mismatch| VectorError::Mismatch {
        id: vector.id.to_string(),
        mismatch,
    })?;
    outcome_report(&outcome.actual)
        .field("vector", outcome.id.to_string())
        .print(json)
}

fn description_input(description: &str) -> Result<VectorInput, CliError> {
    VectorInput::description(description).map_err(|err| match err {
        VectorError::Json(e) => CliError::Ingestion(IngestionError::Parse(e)),
        other => CliError::Vector(other),
    })
}
