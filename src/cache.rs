//! Reuse of previously stamped frames across runs.
//!
//! The cache is a side directory holding one stamped copy per source image,
//! keyed by basename. Validity is checked by presence only: a stamped file
//! whose content is stale or corrupt is still trusted. Any missing file
//! invalidates the whole directory so stale and fresh frames never mix.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::discovery::SourceImage;

/// What was found on disk before stamping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    /// The cache directory does not exist
    Missing,
    /// The directory exists but some stamped copies are absent
    Incomplete { missing: Vec<PathBuf> },
    /// Every source image has a stamped copy
    Valid,
}

/// Location of the stamped copy of `image` inside `cache_dir`
pub fn stamped_path(cache_dir: &Path, image: &SourceImage) -> PathBuf {
    cache_dir.join(image.file_name())
}

pub fn resolve(cache_dir: &Path, images: &[SourceImage]) -> CacheState {
    if !cache_dir.is_dir() {
        return CacheState::Missing;
    }
    let missing: Vec<PathBuf> = images
        .iter()
        .map(|img| stamped_path(cache_dir, img))
        .filter(|p| !p.is_file())
        .collect();
    if missing.is_empty() {
        CacheState::Valid
    } else {
        CacheState::Incomplete { missing }
    }
}

/// Bring the cache directory into a state ready for this run.
///
/// Returns the state observed beforehand; stamping is needed unless it was
/// [`CacheState::Valid`].
pub fn prepare(cache_dir: &Path, images: &[SourceImage]) -> Result<CacheState> {
    let state = resolve(cache_dir, images);
    match &state {
        CacheState::Missing => {
            tracing::debug!(dir = %cache_dir.display(), "creating timestamp cache");
            fs::create_dir_all(cache_dir)
                .with_context(|| format!("creating cache dir {}", cache_dir.display()))?;
        }
        CacheState::Incomplete { missing } => {
            tracing::info!(
                dir = %cache_dir.display(),
                missing = missing.len(),
                "timestamp cache incomplete, discarding"
            );
            fs::remove_dir_all(cache_dir)
                .with_context(|| format!("removing stale cache dir {}", cache_dir.display()))?;
            fs::create_dir_all(cache_dir)
                .with_context(|| format!("recreating cache dir {}", cache_dir.display()))?;
        }
        CacheState::Valid => {
            tracing::debug!(dir = %cache_dir.display(), "reusing timestamp cache");
        }
    }
    Ok(state)
}

impl CacheState {
    pub fn needs_stamping(&self) -> bool {
        !matches!(self, CacheState::Valid)
    }
}

/// Removes the cache directory on drop when cleanup was requested
pub struct CacheCleanup {
    dir: PathBuf,
    enabled: bool,
}

impl CacheCleanup {
    pub fn new(dir: PathBuf, enabled: bool) -> Self {
        Self { dir, enabled }
    }
}

impl Drop for CacheCleanup {
    fn drop(&mut self) {
        if self.enabled && self.dir.exists() {
            if let Err(e) = fs::remove_dir_all(&self.dir) {
                tracing::warn!(dir = %self.dir.display(), error = %e, "failed to remove cache dir");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn sources(dir: &Path, names: &[&str]) -> Vec<SourceImage> {
        names
            .iter()
            .map(|n| {
                let path = dir.join(n);
                fs::write(&path, b"src").unwrap();
                SourceImage {
                    path,
                    modified: SystemTime::UNIX_EPOCH,
                }
            })
            .collect()
    }

    #[test]
    fn absent_directory_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let images = sources(dir.path(), &["a.jpg"]);
        let cache = dir.path().join("timestamped");
        assert_eq!(resolve(&cache, &images), CacheState::Missing);

        let state = prepare(&cache, &images).unwrap();
        assert!(state.needs_stamping());
        assert!(cache.is_dir());
    }

    #[test]
    fn every_copy_present_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let images = sources(dir.path(), &["a.jpg", "b.JPG"]);
        let cache = dir.path().join("timestamped");
        fs::create_dir(&cache).unwrap();
        for img in &images {
            fs::write(stamped_path(&cache, img), b"stamped").unwrap();
        }

        let state = prepare(&cache, &images).unwrap();
        assert_eq!(state, CacheState::Valid);
        assert!(!state.needs_stamping());
        assert_eq!(fs::read(cache.join("a.jpg")).unwrap(), b"stamped");
    }

    #[test]
    fn one_missing_copy_wipes_the_whole_directory() {
        let dir = tempfile::tempdir().unwrap();
        let images = sources(dir.path(), &["a.jpg", "b.jpg", "c.jpg"]);
        let cache = dir.path().join("timestamped");
        fs::create_dir(&cache).unwrap();
        fs::write(cache.join("a.jpg"), b"old").unwrap();
        fs::write(cache.join("c.jpg"), b"old").unwrap();
        fs::write(cache.join("leftover.jpg"), b"old").unwrap();

        let state = prepare(&cache, &images).unwrap();
        assert_eq!(
            state,
            CacheState::Incomplete {
                missing: vec![cache.join("b.jpg")]
            }
        );
        assert!(cache.is_dir());
        assert_eq!(fs::read_dir(&cache).unwrap().count(), 0);
    }

    #[test]
    fn extra_files_do_not_invalidate() {
        let dir = tempfile::tempdir().unwrap();
        let images = sources(dir.path(), &["a.jpg"]);
        let cache = dir.path().join("timestamped");
        fs::create_dir(&cache).unwrap();
        fs::write(cache.join("a.jpg"), b"x").unwrap();
        fs::write(cache.join("gone.jpg"), b"x").unwrap();
        assert_eq!(resolve(&cache, &images), CacheState::Valid);
    }

    #[test]
    fn cleanup_guard_only_removes_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("timestamped");
        fs::create_dir(&cache).unwrap();
        drop(CacheCleanup::new(cache.clone(), false));
        assert!(cache.exists());
        drop(CacheCleanup::new(cache.clone(), true));
        assert!(!cache.exists());
    }
}
