use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Accepted extensions. Matching is exact, so `Jpg` is not picked up.
pub const JPEG_EXTENSIONS: [&str; 4] = ["JPG", "jpg", "JPEG", "jpeg"];

/// An original still found in the working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl SourceImage {
    /// Basename used to key the image in the timestamp cache
    pub fn file_name(&self) -> &std::ffi::OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }
}

pub fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| JPEG_EXTENSIONS.contains(&ext))
}

/// List the JPEG files directly inside `dir`, oldest first.
///
/// Ties on modification time fall back to file name order.
pub fn find_images(dir: &Path) -> Result<Vec<SourceImage>> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if !entry.file_type().is_file() || !is_jpeg(entry.path()) {
            continue;
        }
        let modified = entry
            .metadata()
            .with_context(|| format!("reading metadata of {}", entry.path().display()))?
            .modified()
            .with_context(|| format!("reading modification time of {}", entry.path().display()))?;
        images.push(SourceImage {
            path: entry.into_path(),
            modified,
        });
    }

    if images.is_empty() {
        return Err(anyhow!("No jpg files found in current directory"));
    }

    images.sort_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then_with(|| a.file_name().cmp(b.file_name()))
    });
    tracing::debug!(count = images.len(), dir = %dir.display(), "discovered images");
    Ok(images)
}
