use anyhow::{anyhow, Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// A file that is deleted when the guard goes out of scope
pub struct TempFileGuard {
    path: PathBuf,
}

impl TempFileGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Ordered (frame, display seconds) pairs for ffmpeg's concat demuxer
#[derive(Debug, Clone, PartialEq)]
pub struct FrameManifest {
    pub entries: Vec<(PathBuf, f64)>,
}

impl FrameManifest {
    /// Every frame shown for `1 / fps` seconds
    pub fn uniform<I, P>(frames: I, fps: u32) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        if fps == 0 {
            return Err(anyhow!("fps must be positive"));
        }
        let duration = 1.0 / fps as f64;
        let entries = frames.into_iter().map(|p| (p.into(), duration)).collect();
        Ok(Self { entries })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Text in the concat demuxer format: `file '<path>'` then `duration <secs>`
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (path, duration) in &self.entries {
            let _ = writeln!(out, "file '{}'", quote_path(path));
            let _ = writeln!(out, "duration {}", duration);
        }
        out
    }

    /// Write to a uniquely named `filelist_<hex>.txt` inside `dir`
    pub fn write_unique(&self, dir: &Path) -> Result<TempFileGuard> {
        let name = format!("filelist_{}.txt", uuid::Uuid::new_v4().simple());
        let guard = TempFileGuard::new(dir.join(name));
        fs::write(guard.path(), self.render())
            .with_context(|| format!("writing frame list {}", guard.path().display()))?;
        tracing::debug!(path = %guard.path().display(), frames = self.len(), "wrote frame list");
        Ok(guard)
    }
}

// Inside single quotes a literal ' has to be closed, escaped and reopened.
fn quote_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}
