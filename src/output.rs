// Copyright 2025 Cornell University
// released under MIT License

use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::errors::GenerateError;
use crate::ir::HarnessSpec;

/// `<entity>_tb.vhd`, used when no output path is given.
pub fn default_output_path(spec: &HarnessSpec) -> PathBuf {
    PathBuf::from(format!("{}.vhd", spec.testbench_name()))
}

/// Writes `contents` to `path` through a temporary file in the same
/// directory, so `path` either keeps its old contents or gets all of the new
/// ones.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), GenerateError> {
    let output_err = |source| GenerateError::Output {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(output_err)?;
    debug!("staging output in {}", tmp.path().display());
    tmp.write_all(contents.as_bytes()).map_err(output_err)?;
    tmp.flush().map_err(output_err)?;
    tmp.persist(path).map_err(|e| output_err(e.error))?;
    Ok(())
}
