use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::StampConfig;

/// Something that can measure and paint a single line of text
pub trait TextRenderer {
    /// Width and height in pixels of the rendered line
    fn measure(&self, text: &str) -> (u32, u32);

    /// Paint `text` with its top-left corner at (`x`, `y`). Pixels outside the image are dropped.
    fn draw(&self, img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>);
}

/// Preferred font file names, in search order
pub const PREFERRED_FONTS: &[&str] = &[
    "Arial.ttf",
    "arial.ttf",
    "DejaVuSans.ttf",
    "LiberationSans-Regular.ttf",
    "Helvetica.ttf",
];

fn font_dirs() -> Vec<PathBuf> {
    let mut dirs_list = Vec::new();
    if let Some(d) = dirs::font_dir() {
        dirs_list.push(d);
    }
    for d in [
        "/Library/Fonts",
        "/System/Library/Fonts",
        "/System/Library/Fonts/Supplemental",
        "C:\\Windows\\Fonts",
        "/usr/share/fonts/truetype/msttcorefonts",
        "/usr/share/fonts/truetype/dejavu",
        "/usr/share/fonts/truetype/liberation",
        "/usr/share/fonts/TTF",
        "/usr/share/fonts/dejavu",
    ] {
        dirs_list.push(PathBuf::from(d));
    }
    dirs_list
}

fn blend(px: &mut Rgb<u8>, color: Rgb<u8>, coverage: f32) {
    let c = coverage.clamp(0.0, 1.0);
    for i in 0..3 {
        let v = px[i] as f32 * (1.0 - c) + color[i] as f32 * c;
        px[i] = v.round() as u8;
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    blend(img.get_pixel_mut(x as u32, y as u32), color, coverage);
}

pub struct TrueTypeFont {
    font: FontVec,
    scale: PxScale,
    source: PathBuf,
}

impl TrueTypeFont {
    pub fn from_file(path: &Path, size: f32) -> anyhow::Result<Self> {
        let data = fs::read(path)?;
        let font = FontVec::try_from_vec(data)
            .map_err(|e| anyhow::anyhow!("invalid font {}: {}", path.display(), e))?;
        Ok(Self {
            font,
            scale: PxScale::from(size),
            source: path.to_path_buf(),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl TextRenderer for TrueTypeFont {
    fn measure(&self, text: &str) -> (u32, u32) {
        let scaled = self.font.as_scaled(self.scale);
        let mut width = 0.0f32;
        let mut prev = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        let height = scaled.ascent() - scaled.descent();
        (width.ceil() as u32, height.ceil() as u32)
    }

    fn draw(&self, img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        let scaled = self.font.as_scaled(self.scale);
        let baseline = y as f32 + scaled.ascent();
        let mut caret = x as f32;
        let mut prev = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(p) = prev {
                caret += scaled.kern(p, id);
            }
            let glyph = id.with_scale_and_position(self.scale, point(caret, baseline));
            caret += scaled.h_advance(id);
            prev = Some(id);

            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                let (ox, oy) = (bounds.min.x as i64, bounds.min.y as i64);
                outlined.draw(|gx, gy, coverage| {
                    put(img, ox + gx as i64, oy + gy as i64, color, coverage);
                });
            }
        }
    }
}

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

fn glyph_rows(c: char) -> [u8; 7] {
    match c {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        ':' => [0, 0b01100, 0b01100, 0, 0b01100, 0b01100, 0],
        _ => [0; 7],
    }
}

/// Built-in 5x7 block font covering the characters of a timestamp.
///
/// Anything outside digits, `-` and `:` renders as a blank cell.
#[derive(Debug, Clone, Copy)]
pub struct BitmapFont {
    scale: u32,
}

impl BitmapFont {
    /// Pick an integer scale whose cap height roughly matches a TrueType font of `size` px
    pub fn for_size(size: f32) -> Self {
        let scale = (size * 0.7 / GLYPH_H as f32).round().max(1.0) as u32;
        Self { scale }
    }

    fn advance(&self) -> u32 {
        (GLYPH_W + 1) * self.scale
    }
}

impl TextRenderer for BitmapFont {
    fn measure(&self, text: &str) -> (u32, u32) {
        let n = text.chars().count() as u32;
        let width = (n * self.advance()).saturating_sub(self.scale);
        (width, GLYPH_H * self.scale)
    }

    fn draw(&self, img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        let s = self.scale as i64;
        for (i, c) in text.chars().enumerate() {
            let cell_x = x as i64 + i as i64 * self.advance() as i64;
            for (row, bits) in glyph_rows(c).iter().enumerate() {
                for col in 0..GLYPH_W {
                    if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                        continue;
                    }
                    let px = cell_x + col as i64 * s;
                    let py = y as i64 + row as i64 * s;
                    for dy in 0..s {
                        for dx in 0..s {
                            put(img, px + dx, py + dy, color, 1.0);
                        }
                    }
                }
            }
        }
    }
}

/// Font files to try, the configured one first
pub fn candidate_fonts(cfg: &StampConfig) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(p) = &cfg.font_path {
        candidates.push(p.clone());
    }
    for dir in font_dirs() {
        for name in PREFERRED_FONTS {
            candidates.push(dir.join(name));
        }
    }
    candidates
}

/// The font actually used for stamping this run
pub enum StampFont {
    TrueType(TrueTypeFont),
    Bitmap(BitmapFont),
}

impl StampFont {
    /// Use the configured font, then a system font, then the built-in bitmap font
    pub fn load(cfg: &StampConfig) -> Self {
        for path in candidate_fonts(cfg).iter().filter(|p| p.is_file()) {
            match TrueTypeFont::from_file(path, cfg.font_size) {
                Ok(font) => {
                    tracing::debug!(font = %font.source().display(), "using truetype font");
                    return StampFont::TrueType(font);
                }
                Err(e) => tracing::warn!(font = %path.display(), error = %e, "could not load font"),
            }
        }

        tracing::warn!("no truetype font found, falling back to built-in bitmap font");
        StampFont::Bitmap(BitmapFont::for_size(cfg.font_size))
    }
}

impl TextRenderer for StampFont {
    fn measure(&self, text: &str) -> (u32, u32) {
        match self {
            StampFont::TrueType(f) => f.measure(text),
            StampFont::Bitmap(f) => f.measure(text),
        }
    }

    fn draw(&self, img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        match self {
            StampFont::TrueType(f) => f.draw(img, x, y, text, color),
            StampFont::Bitmap(f) => f.draw(img, x, y, text, color),
        }
    }
}
