//! Input file listing and image loading

use crate::error::{Error, Result};
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions picked up from an input directory (matched exactly)
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpeg", "jpg", "bmp"];

/// Where the list of images comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Every image file directly inside a directory
    Directory(PathBuf),
    /// A text file listing one image path per line
    Manifest(PathBuf),
}

impl Source {
    /// Path of the directory or manifest
    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(path) | Self::Manifest(path) => path,
        }
    }

    /// Short name identifying the input in report file names.
    ///
    /// The directory's own name, or the manifest's file stem.
    pub fn label(&self) -> String {
        let name = match self {
            Self::Directory(path) => path.file_name(),
            Self::Manifest(path) => path.file_stem(),
        };
        name.map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "input".to_string())
    }
}

/// True for a regular file carrying one of [`IMAGE_EXTENSIONS`]
pub fn is_image_file(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_file()
        && entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e))
            .unwrap_or(false)
}

/// List the images to process, in processing order.
///
/// Directory entries are sorted by file name; manifest order is kept as written.
pub fn list_files(source: &Source) -> Result<Vec<PathBuf>> {
    match source {
        Source::Directory(dir) => list_directory(dir),
        Source::Manifest(path) => read_manifest(path),
    }
}

fn list_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Source(format!(
            "Input directory {} does not exist",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            Error::Source(format!("Failed to list {}: {e}", dir.display()))
        })?;
        if is_image_file(&entry) {
            files.push(entry.into_path());
        }
    }

    tracing::debug!(dir = %dir.display(), count = files.len(), "Listed input directory");
    Ok(files)
}

fn read_manifest(path: &Path) -> Result<Vec<PathBuf>> {
    let contents = fs::read_to_string(path).map_err(|e| {
        Error::Source(format!("Unable to open input file {}: {e}", path.display()))
    })?;

    let files: Vec<PathBuf> = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(PathBuf::from)
        .collect();

    tracing::debug!(manifest = %path.display(), count = files.len(), "Read manifest");
    Ok(files)
}

/// Open and decode one image file.
///
/// Any failure, including an image without pixels, is [`Error::InvalidImage`].
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let image = image::ImageReader::open(path)
        .map_err(|e| Error::InvalidImage(format!("{}: {e}", path.display())))?
        .with_guessed_format()
        .map_err(|e| Error::InvalidImage(format!("{}: {e}", path.display())))?
        .decode()
        .map_err(|e| Error::InvalidImage(format!("{}: {e}", path.display())))?;

    ensure_has_pixels(&image, path)?;
    Ok(image)
}

/// Reject a decoded image with zero width or height.
pub fn ensure_has_pixels(image: &DynamicImage, path: &Path) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::InvalidImage(format!(
            "{}: image has no pixels ({}x{})",
            path.display(),
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// Last path component, used as the file's display name.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
