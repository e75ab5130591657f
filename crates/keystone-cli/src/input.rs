//! Reading command input from a file or stdin.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::error::CliError;

fn label(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdin".to_string())
}

/// Reads raw bytes from `path`, or stdin when absent.
pub fn read_bytes(path: Option<&PathBuf>) -> Result<Vec<u8>, CliError> {
    let path = path.map(PathBuf::as_path);
    let result = match path {
        Some(p) => std::fs::read(p),
        None => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer).map(|_| buffer)
        }
    };
    result.map_err(|source| CliError::Read {
        path: label(path),
        source,
    })
}

/// Reads UTF-8 text from `path`, or stdin when absent.
pub fn read_text(path: Option<&PathBuf>) -> Result<String, CliError> {
    let bytes = read_bytes(path)?;
    String::from_utf8(bytes).map_err(|_| {
        CliError::Input(format!(
            "{} is not valid UTF-8",
            label(path.map(PathBuf::as_path))
        ))
    })
}

/// Reads hex from `path`, or stdin when absent. Whitespace is ignored.
pub fn read_hex(path: Option<&PathBuf>) -> Result<Vec<u8>, CliError> {
    let text = read_text(path)?;
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|e| CliError::Input(format!("invalid hex input: {}", e)))
}

/// Reads a secret seed file. The contents never leave zeroizing storage.
pub fn read_secret(path: &Path) -> Result<Zeroizing<String>, CliError> {
    let text = std::fs::read_to_string(path)
        .map(Zeroizing::new)
        .map_err(|source| CliError::Read {
            path: path.display().to_string(),
            source,
        })?;
    Ok(Zeroizing::new(text.trim().to_string()))
}
