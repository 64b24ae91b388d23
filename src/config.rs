use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// File name looked up in the working directory and the app data directory.
pub const CONFIG_FILE_NAME: &str = "timelapse.json";

/// Settings for the external ffmpeg encoder
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EncoderConfig {
    /// Program name or path used to launch ffmpeg
    pub ffmpeg_path: String,
    /// Output frame size passed to `-s:v`
    pub resolution: String,
    pub codec: String,
    pub crf: u8,
    pub pix_fmt: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            resolution: "1440x1080".to_string(),
            codec: "libx264".to_string(),
            crf: 17,
            pix_fmt: "yuv420p".to_string(),
        }
    }
}

impl EncoderConfig {
    pub fn ffmpeg_cmd(&self) -> &str {
        &self.ffmpeg_path
    }
}

/// Settings for drawing capture times onto frames
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StampConfig {
    /// Explicit TrueType font, tried before the system font search
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
    /// Distance in pixels from the bottom and right edges
    pub padding: u32,
    pub jpeg_quality: u8,
    /// Side directory (relative to the working directory) holding stamped copies
    pub cache_dir: String,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size: 36.0,
            padding: 20,
            jpeg_quality: 95,
            cache_dir: "timestamped".to_string(),
        }
    }
}

/// Application configuration loaded from `timelapse.json`
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub encoder: EncoderConfig,
    pub stamp: StampConfig,
}

impl AppConfig {
    /// Parse and validate a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: AppConfig = serde_json::from_str(text).context("parsing config json")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        let stamp = &self.stamp;
        if !(1..=100).contains(&stamp.jpeg_quality) {
            return Err(anyhow!(
                "stamp.jpeg_quality must be between 1 and 100, got {}",
                stamp.jpeg_quality
            ));
        }
        if !(stamp.font_size.is_finite() && stamp.font_size > 0.0) {
            return Err(anyhow!("stamp.font_size must be positive, got {}", stamp.font_size));
        }
        let mut components = Path::new(&stamp.cache_dir).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(anyhow!(
                    "stamp.cache_dir must be a single directory name, got '{}'",
                    stamp.cache_dir
                ))
            }
        }
        parse_resolution(&self.encoder.resolution)?;
        if self.encoder.ffmpeg_path.trim().is_empty() {
            return Err(anyhow!("encoder.ffmpeg_path cannot be empty"));
        }
        Ok(())
    }
}

/// Split a `WIDTHxHEIGHT` string into its dimensions
pub fn parse_resolution(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| anyhow!("resolution must look like 1440x1080, got '{}'", s))?;
    let w: u32 = w.parse().with_context(|| format!("bad resolution width in '{}'", s))?;
    let h: u32 = h.parse().with_context(|| format!("bad resolution height in '{}'", s))?;
    if w == 0 || h == 0 {
        return Err(anyhow!("resolution dimensions must be non-zero, got '{}'", s));
    }
    Ok((w, h))
}

/// Candidate config locations, most specific first
pub fn config_search_paths(work_dir: &Path) -> Vec<PathBuf> {
    let mut tried = vec![work_dir.join(CONFIG_FILE_NAME)];
    if let Some(mut d) = dirs::data_dir() {
        d.push("timelapse");
        d.push(CONFIG_FILE_NAME);
        tried.push(d);
    }
    tried
}

/// Look for a config next to the images, then in app support, then fall back to defaults
pub fn load_config(work_dir: &Path) -> Result<AppConfig> {
    for p in config_search_paths(work_dir) {
        if p.is_file() {
            tracing::debug!(path = %p.display(), "loading config");
            return AppConfig::from_file(&p);
        }
    }
    Ok(AppConfig::default())
}
