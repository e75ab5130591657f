//! Output formatting utilities.

use keystone_vectors::Expectation;
use serde_json::{Map, Value};

use crate::error::CliError;

/// Key/value result of a command, rendered as `key: value` lines or JSON.
#[derive(Debug, Default)]
pub struct Report {
    fields: Vec<(&'static str, String)>,
}

impl Report {
    /// Empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    pub fn field(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((key, value.into()));
        self
    }

    /// Formats as `key: value` lines.
    pub fn to_text(&self) -> String {
        self.fields
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats as a pretty JSON object.
    pub fn to_json(&self) -> Result<String, CliError> {
        let object: Map<String, Value> = self
            .fields
            .iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.clone())))
            .collect();
        Ok(serde_json::to_string_pretty(&Value::Object(object))?)
    }

    /// Prints to stdout in the requested format.
    pub fn print(&self, json: bool) -> Result<(), CliError> {
        if json {
            println!("{}", self.to_json()?);
        } else {
            println!("{}", self.to_text());
        }
        Ok(())
    }
}

/// Report of a reproduced vector outcome.
pub fn outcome_report(outcome: &Expectation) -> Report {
    let report = match outcome {
        Expectation::Accept(accept) => {
            let mut report = Report::new()
                .field("canonical_hex", accept.canonical_hex.clone())
                .field("object_id", accept.object_id.to_hex());
            if let Some(sig) = &accept.signature {
                report = report
                    .field("public_key", sig.public_key.to_hex())
                    .field("signature", sig.signature.clone());
            }
            report
        }
        Expectation::Reject(reject) => {
            let mut report = Report::new().field("reason", reject.reason.clone());
            if let Some(path) = &reject.path {
                report = report.field("path", path.clone());
            }
            if let Some(offset) = reject.offset {
                report = report.field("offset", offset.to_string());
            }
            report
        }
        Expectation::Block(block) => Report::new().field("block_id", block.block_id.to_hex()),
    };
    report.field("verdict", outcome.verdict())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_keeps_field_order() {
        let report = Report::new().field("verdict", "ok").field("object_id", "ab");
        assert_eq!(report.to_text(), "verdict: ok\nobject_id: ab");
    }

    #[test]
    fn json_is_an_object_of_strings() {
        let report = Report::new().field("verdict", "ok");
        let parsed: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(parsed["verdict"], "ok");
    }
}
