use keystone_canonical::{CanonicalizationError, IngestionError, ProfileError, Rejection};
use keystone_core::SignatureError;
use keystone_vectors::VectorError;
use thiserror::Error;

/// Exit code for I/O and other failures.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for usage errors.
pub const EXIT_USAGE: i32 = 2;
/// Exit code when a description cannot be ingested.
pub const EXIT_INGESTION: i32 = 3;
/// Exit code when bytes are not canonical.
pub const EXIT_REJECTED: i32 = 4;
/// Exit code when a signature does not verify.
pub const EXIT_SIGNATURE: i32 = 5;
/// Exit code when a conformance vector does not reproduce.
pub const EXIT_MISMATCH: i32 = 6;

/// Errors surfaced by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// Reading input failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File or `stdin`.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Arguments are valid individually but not together.
    #[error("{0}")]
    Usage(String),
    /// Input is present but unusable, e.g. bad hex.
    #[error("{0}")]
    Input(String),
    /// Requested protocol version is not supported.
    #[error("{0}")]
    Profile(#[from] ProfileError),
    /// Description could not be ingested.
    #[error("ingestion failed ({}): {0}", .0.code())]
    Ingestion(#[from] IngestionError),
    /// Bytes are not canonical.
    #[error("non-canonical input: {0}")]
    Rejected(#[from] Rejection),
    /// Signature did not verify or a key is malformed.
    #[error("{0}")]
    Signature(#[from] SignatureError),
    /// Vector file could not be read or written.
    #[error("{0}")]
    Vector(#[from] VectorError),
    /// Some vectors in a checked set did not reproduce.
    #[error("{failed} of {checked} vectors failed")]
    VectorsFailed {
        /// Failed count.
        failed: usize,
        /// Checked count.
        checked: usize,
    },
    /// Output could not be rendered.
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Read { .. } | CliError::Input(_) | CliError::Output(_) => EXIT_FAILURE,
            CliError::Usage(_) | CliError::Profile(_) => EXIT_USAGE,
            CliError::Ingestion(_) => EXIT_INGESTION,
            CliError::Rejected(_) => EXIT_REJECTED,
            CliError::Signature(_) => EXIT_SIGNATURE,
            CliError::Vector(VectorError::Mismatch { .. }) => EXIT_MISMATCH,
            CliError::Vector(VectorError::PatternMismatch { .. }) => EXIT_USAGE,
            CliError::Vector(_) => EXIT_FAILURE,
            CliError::VectorsFailed { .. } => EXIT_MISMATCH,
        }
    }
}

impl From<CanonicalizationError> for CliError {
    fn from(err: CanonicalizationError) -> Self {
        match err {
            CanonicalizationError::Ingestion(e) => CliError::Ingestion(e),
            CanonicalizationError::Rejected(r) => CliError::Rejected(r),
        }
    }
}
