use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::errors::VectorError;
use crate::model::VectorSet;

/// Reads and writes vector fixture files.
pub struct VectorFile;

impl VectorFile {
    /// Loads and validates a fixture file.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError`] if the file cannot be read, is not a vector
    /// set, or breaks id uniqueness or supersession rules.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<VectorSet, VectorError> {
        let text = fs::read_to_string(path.as_ref())?;
        let set: VectorSet = serde_json::from_str(&text)?;
        set.validate()?;
        tracing::debug!(path = %path.as_ref().display(), vectors = set.vectors.len(), "loaded vector file");
        Ok(set)
    }

    /// Writes a new fixture file.
    ///
    /// Published files are immutable, so an existing file is never replaced.
    pub fn save<P: AsRef<Path>>(path: P, set: &VectorSet) -> Result<(), VectorError> {
        set.validate()?;
        let path = path.as_ref();
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(VectorError::AlreadyExists(path.to_path_buf()))
            }
            Err(err) => return Err(err.into()),
        };
        let mut text = serde_json::to_string_pretty(set)?;
        text.push('\n');
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}
