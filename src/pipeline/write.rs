//! Output directory writes.

use std::fs;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use rayon::prelude::*;

use super::report::BuildError;
use crate::output::OutputArtifact;

/// Create the output directory, removing it first when `clean` is set.
pub fn prepare_output(dir: &Path, clean: bool) -> Result<(), BuildError> {
    if clean && dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| BuildError::Io(dir.to_path_buf(), e))?;
    }
    fs::create_dir_all(dir).map_err(|e| BuildError::Io(dir.to_path_buf(), e))
}

/// Write one file, skipping it when the bytes on disk already match.
pub fn write_file(dest: &Path, bytes: &[u8]) -> Result<bool, BuildError> {
    if fs::read(dest).is_ok_and(|existing| existing == bytes) {
        return Ok(false);
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::Io(parent.to_path_buf(), e))?;
    }
    fs::write(dest, bytes).map_err(|e| BuildError::Io(dest.to_path_buf(), e))?;
    Ok(true)
}

/// Write every artifact under `dir` in parallel.
pub fn write_artifacts(dir: &Path, artifacts: &[OutputArtifact]) -> Result<(), BuildError> {
    artifacts.par_iter().try_for_each(|artifact| {
        write_file(&dir.join(&artifact.destination), &artifact.bytes).map(|_| ())
    })
}

/// Copy `public` into the output root verbatim. Returns the copied
/// destinations, relative and `/`-separated.
pub fn copy_public(public: &Path, dir: &Path) -> Result<Vec<String>, BuildError> {
    if !public.is_dir() {
        return Ok(Vec::new());
    }

    let files: Vec<PathBuf> = WalkDir::new(public)
        .sort(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .collect();

    files
        .par_iter()
        .map(|src| {
            let rel = src.strip_prefix(public).unwrap_or(src);
            let bytes = fs::read(src).map_err(|e| BuildError::Io(src.clone(), e))?;
            write_file(&dir.join(rel), &bytes)?;
            Ok(crate::utils::path::slash(rel))
        })
        .collect()
}
