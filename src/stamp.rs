use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::ffi::OsString;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::cache::stamped_path;
use crate::config::StampConfig;
use crate::discovery::SourceImage;
use crate::font::TextRenderer;
use crate::Progress;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const OUTLINE: Rgb<u8> = Rgb([0, 0, 0]);
const FILL: Rgb<u8> = Rgb([255, 255, 255]);
const OUTLINE_OFFSETS: [(i32, i32); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

/// Render a modification time in the local time zone
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIMESTAMP_FORMAT).to_string()
}

/// Top-left corner for a text box anchored `padding` px from the bottom-right edges
pub fn stamp_position(img_w: u32, img_h: u32, text_w: u32, text_h: u32, padding: u32) -> (i32, i32) {
    let x = img_w as i64 - text_w as i64 - padding as i64;
    let y = img_h as i64 - text_h as i64 - padding as i64;
    (x as i32, y as i32)
}

/// Draw `text` onto a copy of `src` and write it as JPEG to `dst`
pub fn stamp_image<R: TextRenderer + ?Sized>(src: &Path, dst: &Path, text: &str, renderer: &R, cfg: &StampConfig) -> Result<()> {
    let mut img = image::open(src)
        .with_context(|| format!("opening {}", src.display()))?
        .to_rgb8();

    let (text_w, text_h) = renderer.measure(text);
    let (x, y) = stamp_position(img.width(), img.height(), text_w, text_h, cfg.padding);
    for (dx, dy) in OUTLINE_OFFSETS {
        renderer.draw(&mut img, x + dx, y + dy, text, OUTLINE);
    }
    renderer.draw(&mut img, x, y, text, FILL);

    // Written beside the final name and renamed, so a failed write never leaves `dst` behind.
    let tmp = partial_path(dst);
    let written = write_jpeg(&img, &tmp, cfg.jpeg_quality).and_then(|()| {
        fs::rename(&tmp, dst).with_context(|| format!("moving {} into place", dst.display()))
    });
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

fn partial_path(dst: &Path) -> PathBuf {
    let mut name = dst.file_name().map(OsString::from).unwrap_or_default();
    name.push(".partial");
    dst.with_file_name(name)
}

fn write_jpeg(img: &RgbImage, path: &Path, quality: u8) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(img)
        .with_context(|| format!("writing {}", path.display()))?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

/// Stamp every image into `cache_dir`, one at a time.
///
/// `on_progress` fires after each frame. The first failure stops the run.
pub fn stamp_all<R, F>(images: &[SourceImage], cache_dir: &Path, renderer: &R, cfg: &StampConfig, mut on_progress: F) -> Result<usize>
where
    R: TextRenderer + ?Sized,
    F: FnMut(Progress),
{
    let total = images.len();
    on_progress(Progress::stamping_frames(0, total));
    for (i, image) in images.iter().enumerate() {
        let dst = stamped_path(cache_dir, image);
        let text = format_timestamp(image.modified);
        stamp_image(&image.path, &dst, &text, renderer, cfg)
            .with_context(|| format!("timestamping {}", image.path.display()))?;
        tracing::debug!(src = %image.path.display(), stamp = %text, "stamped frame");
        on_progress(Progress::stamping_frames(i + 1, total));
    }
    Ok(total)
}
