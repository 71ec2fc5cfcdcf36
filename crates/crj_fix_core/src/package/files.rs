//! Filesystem operations on the output package, each one logged.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::Path;

use log::info;

use crate::error::CoreError;

pub fn create_dir(path: &Path) -> Result<(), CoreError> {
    info!("Creating directory: '{}'", path.display());
    fs::create_dir_all(path).map_err(|e| CoreError::io("create directory", path, e))
}

/// Removes `path` and everything under it; a missing directory is not an error.
pub fn delete_dir(path: &Path) -> Result<(), CoreError> {
    if !path.exists() {
        return Ok(());
    }
    info!("Deleting directory: '{}'", path.display());
    fs::remove_dir_all(path).map_err(|e| CoreError::io("delete directory", path, e))
}

pub fn copy_file(source: &Path, destination: &Path) -> Result<(), CoreError> {
    info!(
        "Copying file: From '{}' to '{}'",
        source.display(),
        destination.display()
    );
    fs::copy(source, destination)
        .map(|_| ())
        .map_err(|e| CoreError::io("copy", source, e))
}

pub fn write_file(path: &Path, contents: &str) -> Result<(), CoreError> {
    info!("Writing file: '{}'", path.display());
    fs::write(path, contents.as_bytes()).map_err(|e| CoreError::io("write", path, e))
}

pub fn append_file(path: &Path, contents: &str) -> Result<(), CoreError> {
    info!("Applying patch to '{}'", path.display());
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| CoreError::io("open", path, e))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| CoreError::io("append to", path, e))
}
