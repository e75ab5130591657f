//! Keystone CLI - canonical encoding, hashing, signing and conformance vectors.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use keystone_canonical::{Codec, CURRENT_PROTOCOL_VERSION};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod input;
mod output;

use commands::{block_id, check, emit, validate, verify};
use error::CliError;

#[derive(Parser)]
#[command(name = "keystone")]
#[command(about = "Keystone canonical encoding and conformance vector tool")]
struct Cli {
    /// Protocol version whose rules apply
    #[arg(long, global = true, default_value_t = CURRENT_PROTOCOL_VERSION)]
    protocol_version: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonicalize a JSON description and print its bytes, id and signature
    Emit {
        /// Input JSON file (or stdin if not provided)
        input: Option<PathBuf>,
        /// File holding a hex Ed25519 secret seed to sign with
        #[arg(long, conflicts_with = "expect")]
        key: Option<PathBuf>,
        /// Compare the result against the vector in FILE
        #[arg(long, value_name = "FILE")]
        expect: Option<PathBuf>,
        /// Print the result as a conformance vector with this id
        #[arg(long, value_name = "ID", conflicts_with = "expect")]
        vector_id: Option<String>,
        /// Write the --key seed into the vector; only for published test keys
        #[arg(long, requires = "vector_id")]
        publish_test_key: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Strictly decode hex-encoded canonical bytes
    Validate {
        /// Input hex file (or stdin if not provided)
        input: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the block id of raw bytes
    BlockId {
        /// Input file (or stdin if not provided)
        input: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a signature over the canonical bytes of a JSON description
    Verify {
        /// Input JSON file (or stdin if not provided)
        input: Option<PathBuf>,
        /// Signer's public key, hex
        #[arg(long)]
        public_key: String,
        /// Signature, hex
        #[arg(long)]
        signature: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check conformance vector files
    Check {
        /// Vector files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("KEYSTONE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let codec = Codec::for_version(cli.protocol_version)?;
    tracing::debug!(profile = %codec.profile().name(), "codec ready");

    match cli.command {
        Commands::Emit {
            input,
            key,
            expect,
            vector_id,
            publish_test_key,
            json,
        } => emit::run(&codec, input, key, expect, vector_id, publish_test_key, json),
        Commands::Validate { input, json } => validate::run(&codec, input, json),
        Commands::BlockId { input, json } => block_id::run(input, json),
        Commands::Verify {
            input,
            public_key,
            signature,
            json,
        } => verify::run(&codec, input, &public_key, &signature, json),
        Commands::Check { files, json } => check::run(&codec, &files, json),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
