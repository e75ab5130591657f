//! Conformance vectors for Keystone canonical encoding.
//!
//! A conformance vector pins one input to one outcome: the canonical bytes,
//! object id and optional signature an implementation must produce, or the
//! rejection it must report. Published vectors are immutable; a changed rule
//! is published as a new vector under a new protocol version that supersedes
//! the old one.
//!
//! ```rust
//! use keystone_canonical::Codec;
//! use keystone_vectors::{check_vector, generate_vector, VectorId, VectorInput};
//!
//! let codec = Codec::default();
//! let input = VectorInput::description(r#"{"b": 1, "a": 0}"#)?;
//! let vector = generate_vector(VectorId::parse("map-basic")?, input, None, &codec)?;
//! assert!(check_vector(&vector, &codec).is_ok());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]

/// Generating and checking vectors.
pub mod check;
/// Error types for vector operations.
pub mod errors;
/// Reading and writing fixture files.
pub mod file;
/// Validated identifiers.
pub mod identifiers;
/// Vector data model.
pub mod model;

pub use check::{check_set, check_vector, generate_vector, SetReport, VectorMismatch, VectorOutcome};
pub use errors::VectorError;
pub use file::VectorFile;
pub use identifiers::VectorId;
pub use model::{
    AcceptExpectation, BlockExpectation, ConformanceVector, Expectation, RejectExpectation,
    SignatureExpectation, VectorInput, VectorSet,
};
