//! header
//!
//! IHDR parsing and validation.

use crate::FormatError;

const IHDR_LEN: usize = 13;

const MAX_DIMENSION: u32 = 0x7fff_ffff;

/// Color type.
#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum ColorType {
/// Grayscale without Alpha, 1, 2, 4, 8 or 16 bits.
    GRAY,
/// RGB, 8 or 16 bits per channel.
    RGB,
/// Indexed mode, 1, 2, 4 or 8 bits per index.
    NDX,
/// Grayscale with Alpha, 8 or 16 bits per channel.
    GRAYA,
/// RGB + Alpha, 8 or 16 bits per channel.
    RGBA
}

impl ColorType {
/// Map the IHDR color type byte.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ColorType::GRAY),
            2 => Some(ColorType::RGB),
            3 => Some(ColorType::NDX),
            4 => Some(ColorType::GRAYA),
            6 => Some(ColorType::RGBA),
            _ => None
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ColorType::GRAY => 0,
            ColorType::RGB => 2,
            ColorType::NDX => 3,
            ColorType::GRAYA => 4,
            ColorType::RGBA => 6,
        }
    }

/// Samples stored per pixel.
    pub fn channels(self) -> usize {
        match self {
            ColorType::GRAY | ColorType::NDX => 1,
            ColorType::GRAYA => 2,
            ColorType::RGB => 3,
            ColorType::RGBA => 4,
        }
    }

/// Bit depths allowed for this color type.
    pub fn depths(self) -> &'static [u8] {
        match self {
            ColorType::GRAY => &[1, 2, 4, 8, 16],
            ColorType::NDX => &[1, 2, 4, 8],
            ColorType::RGB | ColorType::GRAYA | ColorType::RGBA => &[8, 16],
        }
    }

/// Color types carrying their own alpha channel.
    pub fn has_alpha(self) -> bool {
        matches!(self, ColorType::GRAYA | ColorType::RGBA)
    }

    pub fn is_gray(self) -> bool {
        matches!(self, ColorType::GRAY | ColorType::GRAYA)
    }
}

/// Interlace method.
#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum Interlace {
/// Scanlines stored top to bottom.
    None,
/// Seven pass progressive layout.
    Adam7
}

/// Validated IHDR contents. Compression and filter methods are always 0 and
/// are not kept.
#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub struct Header {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: ColorType,
    pub interlace: Interlace,
}

fn invalid(field: &'static str, value: u32) -> FormatError {
    FormatError::InvalidHeaderField { field, value }
}

fn be_u32(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}

impl Header {
/// Parse and validate an IHDR payload.
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() != IHDR_LEN {
            return Err(invalid("length", data.len() as u32))
        }

        let width = be_u32(&data[0 .. 4]);
        let height = be_u32(&data[4 .. 8]);
        let depth = data[8];
        let color = data[9];
        let compression = data[10];
        let filter = data[11];
        let ilace = data[12];

        if width == 0 || width > MAX_DIMENSION {
            return Err(invalid("width", width))
        }

        if height == 0 || height > MAX_DIMENSION {
            return Err(invalid("height", height))
        }

        let color_type = ColorType::from_code(color)
            .ok_or_else(|| invalid("color type", color as u32))?;

        if !color_type.depths().contains(&depth) {
            return Err(invalid("bit depth", depth as u32))
        }

        if compression != 0 {
            return Err(invalid("compression method", compression as u32))
        }

        if filter != 0 {
            return Err(invalid("filter method", filter as u32))
        }

        let interlace = match ilace {
            0 => Interlace::None,
            1 => Interlace::Adam7,
            i => return Err(invalid("interlace method", i as u32))
        };

        Ok(Self {
            width,
            height,
            bit_depth: depth,
            color_type,
            interlace
        })
    }

    pub fn bits_per_pixel(&self) -> usize {
        self.bit_depth as usize * self.color_type.channels()
    }

/// Left-neighbour distance used by the Sub, Avg and Paeth filters.
    pub fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel() / 8).max(1)
    }

/// Largest value a sample of this depth can hold.
    pub fn sample_max(&self) -> u16 {
        ((1_u32 << self.bit_depth) - 1) as u16
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}
