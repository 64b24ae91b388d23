//! # timelapse - still images to video
//!
//! `timelapse` turns the JPEG stills in a directory into a single video by
//! handing ffmpeg a concat frame list. Frames can optionally be stamped with
//! their capture (modification) time first; stamped copies are kept in a
//! side directory and reused on later runs while they are complete.
//!
//! ## Example
//!
//! ```no_run
//! use timelapse::{RunConfig, RunContext, Timelapse};
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = RunContext::new(std::env::current_dir()?, RunConfig {
//!     fps: 24,
//!     add_timestamps: true,
//!     ..RunConfig::default()
//! });
//! let summary = Timelapse::new().create(&ctx, |progress| {
//!     println!("{}/{} ({:.1}%)", progress.completed, progress.total, progress.percentage);
//! })?;
//! println!("{} frames -> {}", summary.frames, summary.output.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Cache validity
//!
//! The stamp cache is trusted when every source image has a file of the same
//! name in it. Contents are never inspected, so a stamped copy with the wrong
//! text survives until the cache is removed (`--clean-cache`) or a file goes
//! missing and the directory is rebuilt.

pub mod args;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod encoder;
pub mod font;
pub mod manifest;
pub mod stamp;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub use config::AppConfig;
pub use encoder::EncodeError;

use cache::{CacheCleanup, CacheState};
use encoder::Encoder;
use font::StampFont;
use manifest::FrameManifest;

/// Progress information for the stamping phase
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Frames stamped so far
    pub completed: usize,
    pub total: usize,
    /// Percentage complete (0.0 to 100.0)
    pub percentage: f64,
    pub message: String,
}

impl Progress {
    pub fn stamping_frames(completed: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            (completed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        Self {
            completed,
            total,
            percentage,
            message: format!("Timestamping frame {} of {}", completed, total),
        }
    }
}

/// Options for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub fps: u32,
    pub output: PathBuf,
    pub add_timestamps: bool,
    /// Delete the stamp cache once the encode attempt is over
    pub clean_cache: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            fps: args::DEFAULT_FPS,
            output: PathBuf::from(args::DEFAULT_OUTPUT),
            add_timestamps: false,
            clean_cache: false,
        }
    }
}

/// Where a run operates and with which options
#[derive(Debug, Clone)]
pub struct RunContext {
    pub work_dir: PathBuf,
    pub config: RunConfig,
}

impl RunContext {
    pub fn new(work_dir: impl Into<PathBuf>, config: RunConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            config,
        }
    }
}

/// What a finished run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    /// Frames stamped during this run (0 when the cache was reused)
    pub stamped: usize,
    pub cache_reused: bool,
    pub output: PathBuf,
}

/// Builds timelapse videos with a given application configuration
pub struct Timelapse {
    config: AppConfig,
}

impl Timelapse {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn cache_dir(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.config.stamp.cache_dir)
    }

    /// Discover, optionally stamp, and encode the images in `ctx.work_dir`.
    ///
    /// The frame list is removed on every exit path, and so is the cache
    /// directory when `clean_cache` is set and timestamps were requested.
    pub fn create<F>(&self, ctx: &RunContext, on_progress: F) -> Result<RunSummary>
    where
        F: FnMut(Progress),
    {
        let run = &ctx.config;
        let images = discovery::find_images(&ctx.work_dir)?;

        let mut stamped = 0;
        let mut cache_reused = false;
        let mut _cache_guard = None;
        let frames: Vec<PathBuf> = if run.add_timestamps {
            let cache_dir = self.cache_dir(&ctx.work_dir);
            let state = cache::prepare(&cache_dir, &images)?;
            _cache_guard = Some(CacheCleanup::new(cache_dir.clone(), run.clean_cache));

            match &state {
                CacheState::Valid => cache_reused = true,
                CacheState::Incomplete { missing } => tracing::warn!(
                    missing = missing.len(),
                    "timestamp cache incomplete, regenerating all frames"
                ),
                CacheState::Missing => {}
            }
            if state.needs_stamping() {
                let font = StampFont::load(&self.config.stamp);
                stamped = match stamp::stamp_all(&images, &cache_dir, &font, &self.config.stamp, on_progress) {
                    Ok(n) => n,
                    // A half-filled cache would pass the presence check on the next run.
                    Err(e) => {
                        if let Err(rm) = std::fs::remove_dir_all(&cache_dir) {
                            tracing::warn!(dir = %cache_dir.display(), error = %rm, "failed to discard partial cache");
                        }
                        return Err(e);
                    }
                };
            }

            // Paths relative to the frame list, which lives in the working directory.
            let rel_cache = Path::new(&self.config.stamp.cache_dir);
            images.iter().map(|img| rel_cache.join(img.file_name())).collect()
        } else {
            images.iter().map(|img| PathBuf::from(img.file_name())).collect()
        };

        let manifest = FrameManifest::uniform(frames, run.fps)?;
        let list = manifest.write_unique(&ctx.work_dir)?;
        let list_name = list
            .path()
            .file_name()
            .map(PathBuf::from)
            .context("frame list has no file name")?;

        let encoder = Encoder::new(self.config.encoder.clone());
        encoder
            .run(&ctx.work_dir, &list_name, &run.output)
            .context("encoding timelapse")?;

        tracing::info!(output = %run.output.display(), frames = manifest.len(), "encode finished");
        Ok(RunSummary {
            frames: manifest.len(),
            stamped,
            cache_reused,
            output: run.output.clone(),
        })
    }
}

impl Default for Timelapse {
    fn default() -> Self {
        Self::new()
    }
}
