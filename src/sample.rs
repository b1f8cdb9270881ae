//! Random sample manifests
//!
//! Picks a subset of a directory's images and writes their paths to
//! `<directory>-<count>.txt`, ready to be fed back as a manifest source.

use crate::error::{Error, Result};
use crate::store::{Source, list_files};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

/// Path of the manifest generated for `dir` and `count`
pub fn sample_manifest_path(dir: &Path, count: usize) -> PathBuf {
    let base = dir.as_os_str().to_string_lossy();
    let base = base.trim_end_matches(['/', '\\']);
    PathBuf::from(format!("{base}-{count}.txt"))
}

/// Write a manifest of `count` distinct images chosen at random from `dir`.
pub fn write_sample_manifest<R: Rng + ?Sized>(
    dir: &Path,
    count: usize,
    rng: &mut R,
) -> Result<PathBuf> {
    let files = list_files(&Source::Directory(dir.to_path_buf()))?;
    if count > files.len() {
        return Err(Error::Config(format!(
            "Requested {count} samples but {} holds only {} images",
            dir.display(),
            files.len()
        )));
    }

    let mut contents = String::new();
    for index in rand::seq::index::sample(rng, files.len(), count) {
        contents.push_str(&files[index].to_string_lossy());
        contents.push('\n');
    }

    let path = sample_manifest_path(dir, count);
    fs::write(&path, contents)
        .map_err(|e| Error::Report(format!("Unable to create {}: {e}", path.display())))?;

    tracing::info!(manifest = %path.display(), count, "Wrote sample manifest");
    Ok(path)
}
