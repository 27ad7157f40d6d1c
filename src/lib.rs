//! Minimalist PNG reader.
//!
//! Every color type, bit depth and the Adam7 layout decode to a grid of
//! normalized RGBA colors.
//!
//! ```rust,no_run
//! use micro_png_reader::read_png;
//!
//! let image = read_png("tmp/test.png").expect("can't load test.png");
//!
//! println!("{} x {}", image.width(), image.height());
//!
//! if let Some(grid) = image.pixels() {
//!     let _pixel = grid.get(0, 0); // Option<Color>, channels in 0.0 ..= 1.0
//! }
//! ```

use std::collections::HashMap;
use std::fs;

use thiserror::Error;

mod adam7;
mod ancillary;
mod assemble;
mod bits;
mod chunk;
mod filter;
mod header;
mod inflate;

#[cfg(test)]
mod fixture;

pub use adam7::{plan, Pass};
pub use bits::BitReader;
pub use filter::Filter;
pub use header::{ColorType, Header, Interlace};

use ancillary::Ancillary;

/// RGB + Alpha 8 bits.
pub type RGBA = (u8, u8, u8, u8);

/// RGB + Alpha 16 bits.
pub type RGBA16 = (u16, u16, u16, u16);

/// Default memory guard: 16384 x 16384 pixels.
pub const MAX_PIXELS: u64 = 1 << 28;

/// Decoding errors. Only [FormatError::UnsupportedChunkLayout] is
/// recoverable; it is never returned from a read, it shows up in
/// [Image::warnings].
#[derive(PartialEq, Debug, Clone, Error)]
pub enum FormatError {
    #[error("header broken")]
    BadSignature,

    #[error("bad crc in {chunk_type} chunk")]
    ChecksumMismatch { chunk_type: String },

    #[error("invalid {field} in IHDR: {value}")]
    InvalidHeaderField { field: &'static str, value: u32 },

    #[error("IHDR must come first and only once, got {chunk_type}")]
    MisplacedHeader { chunk_type: String },

    #[error("no IDAT chunk before IEND")]
    MissingPixelData,

    #[error("truncated {chunk_type} chunk")]
    Truncated { chunk_type: String },

    #[error("zlib IDAT: {0}")]
    Decompression(String),

    #[error("image data too short: exp {expected} got {got}")]
    ShortImageData { expected: usize, got: usize },

    #[error("bad filter: {0}")]
    BadFilter(u8),

    #[error("indexed image without PLTE chunk")]
    MissingPalette,

    #[error("palette index {index} out of {len} entries")]
    PaletteIndex { index: u16, len: usize },

    #[error("image too large: {width} x {height}")]
    ImageTooLarge { width: u32, height: u32 },

    #[error("{chunk_type} ignored: {reason}")]
    UnsupportedChunkLayout { chunk_type: String, reason: String },

    #[error("I/O error: {0}")]
    Io(String),
}

/// Normalized color, every channel within `0.0 ..= 1.0`.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
/// Channels are clamped to `0.0 ..= 1.0`.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: a.clamp(0.0, 1.0)
        }
    }

/// Normalize raw samples against `max`, the largest value at the sample depth.
    pub fn from_samples(r: u16, g: u16, b: u16, a: u16, max: u16) -> Self {
        let m = max as f32;

        Self::new(r as f32 / m, g as f32 / m, b as f32 / m, a as f32 / m)
    }

    pub fn to_rgba16(&self) -> RGBA16 {
        let q = |v: f32| (v * 65535.0).round() as u16;

        (q(self.r), q(self.g), q(self.b), q(self.a))
    }

    pub fn to_rgba8(&self) -> RGBA {
        let q = |v: f32| (v * 255.0).round() as u8;

        (q(self.r), q(self.g), q(self.b), q(self.a))
    }
}

/// Decoded pixels, row-major, top to bottom. Read-only once decoded.
#[derive(PartialEq, Debug, Clone)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl PixelGrid {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::default(); width * height]
        }
    }

    pub(crate) fn set(&mut self, x: usize, y: usize, color: Color) {
        self.pixels[y * self.width + x] = color;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        }
        else {
            None
        }
    }

/// All pixels, row after row.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Color]> {
        self.pixels.chunks(self.width)
    }

/// Flat RGBA 8 bit buffer, the layout texture uploads expect.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|c| {
            let (r, g, b, a) = c.to_rgba8();
            [r, g, b, a]
        }).collect()
    }
}

/// Image structure.
#[derive(PartialEq, Debug, Clone)]
pub struct Image {
    header: Header,
    gamma: f32,
    background: Option<Color>,
    meta: HashMap<String, String>,
    pixels: Option<PixelGrid>,
    warnings: Vec<FormatError>,
}

impl Image {
/// IHDR contents.
    pub fn header(&self) -> &Header {
        &self.header
    }

/// Color type getter.
    pub fn color_type(&self) -> ColorType {
        self.header.color_type
    }

/// Image width getter.
    pub fn width(&self) -> usize {
        self.header.width as usize
    }

/// Image height getter.
    pub fn height(&self) -> usize {
        self.header.height as usize
    }

    pub fn bit_depth(&self) -> u8 {
        self.header.bit_depth
    }

    pub fn interlace(&self) -> Interlace {
        self.header.interlace
    }

/// File gamma, 1.0 without a gAMA chunk. A gAMA chunk after the image data
/// is ignored.
    pub fn gamma(&self) -> f32 {
        self.gamma
    }

/// bKGD color. Metadata only, pixels are not composited against it.
/// Always opaque, a palette entry's tRNS alpha is not carried over.
    pub fn background(&self) -> Option<Color> {
        self.background
    }

/// Image metadata getter (tEXt and zTXt).
    pub fn meta(&self) -> &HashMap<String, String> {
        &self.meta
    }

/// Decoded grid. `None` when parsing stopped at an unknown critical chunk
/// before any image data.
    pub fn pixels(&self) -> Option<&PixelGrid> {
        self.pixels.as_ref()
    }

/// Recoverable problems met while reading.
    pub fn warnings(&self) -> &[FormatError] {
        &self.warnings
    }

/// Image data getter - RGB + Alpha 16 bits, one vector per row.
    pub fn data(&self) -> Vec<Vec<RGBA16>> {
        self.pixels.as_ref().map(|grid| {
            grid.rows().map(|row| row.iter().map(|c| c.to_rgba16()).collect()).collect()
        }).unwrap_or_default()
    }
}

/// Reader settings.
///
/// # Example
///
/// ```rust,no_run
///    use micro_png_reader::PNGReader;
///
///    let image = PNGReader::new()
///        .set_gamma(false)
///        .set_max_pixels(Some(4096 * 4096))
///        .read("tmp/foo.png")
///        .unwrap();
/// ```
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct PNGReader {
    gamma: bool,
    max_pixels: Option<u64>,
    text: bool,
}

impl Default for PNGReader {
    fn default() -> Self {
        Self {
            gamma: true,
            max_pixels: Some(MAX_PIXELS),
            text: true
        }
    }
}

fn warn(warnings: &mut Vec<FormatError>, res: Result<(), FormatError>) {
    if let Err(e) = res {
        log::warn!("{e}");
        warnings.push(e);
    }
}

impl PNGReader {
    pub fn new() -> Self {
        Self::default()
    }

/// Apply gAMA correction.
    pub fn set_gamma(mut self, gamma: bool) -> Self {
        self.gamma = gamma;
        self
    }

/// Refuse images with more pixels than this. `None` lifts the limit.
    pub fn set_max_pixels(mut self, max_pixels: Option<u64>) -> Self {
        self.max_pixels = max_pixels;
        self
    }

/// Collect tEXt and zTXt metadata.
    pub fn set_text(mut self, text: bool) -> Self {
        self.text = text;
        self
    }

/// Decode PNG from memory.
    pub fn read_u8(&self, buf: &[u8]) -> Result<Image, FormatError> {
        let mut offs = chunk::check_signature(buf)?;

        let first = chunk::get_chunk(buf, offs)?;

        if &first.tag != b"IHDR" {
            return Err(FormatError::MisplacedHeader { chunk_type: first.name() })
        }

        offs += first.size();

        let header = header::Header::parse(first.payload)?;

        if let Some(max) = self.max_pixels {
            if header.pixels() > max {
                return Err(FormatError::ImageTooLarge { width: header.width, height: header.height })
            }
        }

        log::debug!("{} x {}, {:?} {} bits, {:?}",
            header.width, header.height, header.color_type, header.bit_depth, header.interlace);

        let mut aux = Ancillary::default();
        let mut warnings: Vec<FormatError> = Vec::new();

        let mut idat: Vec<u8> = Vec::new();
        let mut prev_idat = false;
        let mut pixels: Option<PixelGrid> = None;

        loop {
            let chunk = chunk::get_chunk(buf, offs)?;

            offs += chunk.size();

            if prev_idat && pixels.is_none() && &chunk.tag != b"IDAT" {
                pixels = Some(self.decode(&header, &aux, &idat)?);
                idat = Vec::new();
            }

            match &chunk.tag {
                b"IHDR" => return Err(FormatError::MisplacedHeader { chunk_type: chunk.name() }),
                b"IDAT" => {
                    if pixels.is_some() {
                        warn(&mut warnings, Err(FormatError::UnsupportedChunkLayout {
                            chunk_type: chunk.name(),
                            reason: "image data already decoded".to_string()
                        }));
                    }
                    else {
                        idat.extend(chunk.payload);
                        prev_idat = true;
                    }
                },
                b"PLTE" | b"tRNS" | b"gAMA" if pixels.is_some() => {
                    warn(&mut warnings, Err(FormatError::UnsupportedChunkLayout {
                        chunk_type: chunk.name(),
                        reason: "after image data".to_string()
                    }));
                },
                b"PLTE" => warn(&mut warnings, aux.palette(&header, &chunk)),
                b"IEND" => {
                    if !prev_idat {
                        return Err(FormatError::MissingPixelData)
                    }

                    break
                },
                _ if chunk.is_ancillary() => warn(&mut warnings, aux.handle(&header, &chunk, self.text)),
                _ => {
                    log::info!("unknown critical chunk {}, stop reading", chunk.name());
                    break
                }
            }
        }

        Ok(Image {
            header,
            gamma: aux.gamma.unwrap_or(1.0),
            background: aux.background,
            meta: aux.meta,
            pixels,
            warnings
        })
    }

/// Read png file.
    pub fn read(&self, fname: &str) -> Result<Image, FormatError> {
        let buf = fs::read(fname).map_err(|e| FormatError::Io(format!("{fname}: {e}")))?;

        self.read_u8(&buf)
    }

    fn decode(&self, header: &Header, aux: &Ancillary, idat: &[u8]) -> Result<PixelGrid, FormatError> {
        let passes = adam7::plan(header.width as usize, header.height as usize, header.interlace);

        log::debug!("{} pass(es), {} compressed bytes", passes.len(), idat.len());

        let expected = adam7::planned_bytes(&passes, header.bits_per_pixel())
            .ok_or(FormatError::ImageTooLarge { width: header.width, height: header.height })?;

        let unpacked = inflate::inflate(idat, expected)?;
        let unfiltered = filter::unfilter(unpacked, &passes, header.bits_per_pixel())?;

        let gamma = if self.gamma { aux.gamma } else { None };

        assemble::assemble(&unfiltered, header, &passes, aux, gamma)
    }
}

/// Decode PNG. For explanations see [read_png].
pub fn read_png_u8(buf: &[u8]) -> Result<Image, FormatError> {
    PNGReader::new().read_u8(buf)
}

/// Read png file with default settings.
///
/// # Arguments
///
/// * `fname` - input filename,
///
/// # Example
///
/// ```rust,no_run
/// use micro_png_reader::*;
///
/// let image = read_png("tmp/test.png").expect("can't load test.png");
///
/// println!("{} x {}", image.width(), image.height());
///
/// let data = image.data();
///
/// (0 .. image.height()).for_each(|y| {
///   (0 .. image.width()).for_each(|x| {
///     let _pixel = data[y][x]; // (u16, u16, u16, u16)
///   });
/// });
/// ```
pub fn read_png(fname: &str) -> Result<Image, FormatError> {
    PNGReader::new().read(fname)
}
