//! ancillary
//!
//! Palette and ancillary chunk handlers. Every error returned from here is
//! recoverable: the chunk is dropped and decoding carries on.

use std::collections::HashMap;
use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::chunk::Chunk;
use crate::{Color, ColorType, FormatError, Header, RGBA};

const MAX_PALETTE: usize = 256;

const GAMMA_SCALE: f32 = 100_000.0;

/// Largest inflated zTXt text kept.
const MAX_TEXT: u64 = 1 << 20;

/// Color key from a tRNS chunk. Palette transparency is written straight into
/// the palette instead.
#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum Transparency {
    Gray(u16),
    RGB(u16, u16, u16)
}

/// Everything collected from PLTE and the ancillary chunks.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Ancillary {
    pub palette: Vec<RGBA>,
    pub transparency: Option<Transparency>,
    pub background: Option<Color>,
    pub gamma: Option<f32>,
    pub meta: HashMap<String, String>,
}

fn unsupported(chunk: &Chunk, reason: impl Into<String>) -> FormatError {
    FormatError::UnsupportedChunkLayout {
        chunk_type: chunk.name(),
        reason: reason.into()
    }
}

fn be_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|b| *b as char).collect()
}

impl Ancillary {
/// PLTE handler.
    pub fn palette(&mut self, header: &Header, chunk: &Chunk) -> Result<(), FormatError> {
        let data = chunk.payload;

        if header.color_type.is_gray() {
            return Err(unsupported(chunk, "palette not allowed for grayscale images"))
        }

        if data.len() % 3 != 0 {
            return Err(unsupported(chunk, format!("length {} not divisible by 3", data.len())))
        }

        if data.len() / 3 > MAX_PALETTE {
            return Err(unsupported(chunk, format!("{} entries", data.len() / 3)))
        }

        self.palette = data.chunks_exact(3).map(|rgb| (rgb[0], rgb[1], rgb[2], 0xff)).collect();

        Ok(())
    }

/// Dispatch an ancillary chunk. Unknown ones are skipped.
    pub fn handle(&mut self, header: &Header, chunk: &Chunk, text: bool) -> Result<(), FormatError> {
        match &chunk.tag {
            b"gAMA" => self.gamma(chunk),
            b"bKGD" => self.background(header, chunk),
            b"tRNS" => self.transparency(header, chunk),
            b"tEXt" if text => self.text(chunk),
            b"zTXt" if text => self.ztext(chunk),
            b"pHYs" | b"sRGB" => {
                log::trace!("{} read and ignored", chunk.name());
                Ok(())
            },
            _ => {
                log::trace!("skipping {} ({} bytes)", chunk.name(), chunk.payload.len());
                Ok(())
            }
        }
    }

    fn gamma(&mut self, chunk: &Chunk) -> Result<(), FormatError> {
        let data = chunk.payload;

        if data.len() != 4 {
            return Err(unsupported(chunk, format!("length {}", data.len())))
        }

        let raw = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);

        if raw == 0 {
            return Err(unsupported(chunk, "zero gamma"))
        }

        self.gamma = Some(raw as f32 / GAMMA_SCALE);

        Ok(())
    }

    fn background(&mut self, header: &Header, chunk: &Chunk) -> Result<(), FormatError> {
        let data = chunk.payload;
        let max = header.sample_max();

        let color = match header.color_type {
            ColorType::NDX => {
                if data.len() != 1 {
                    return Err(unsupported(chunk, format!("length {}", data.len())))
                }

                let (r, g, b, _) = *self.palette.get(data[0] as usize)
                    .ok_or_else(|| unsupported(chunk, format!("palette index {} out of range", data[0])))?;

                Color::from_samples(r as u16, g as u16, b as u16, 0xff, 0xff)
            },
            ColorType::GRAY | ColorType::GRAYA => {
                if data.len() != 2 {
                    return Err(unsupported(chunk, format!("length {}", data.len())))
                }

                let g = be_u16(data, 0);

                Color::from_samples(g, g, g, max, max)
            },
            ColorType::RGB | ColorType::RGBA => {
                if data.len() != 6 {
                    return Err(unsupported(chunk, format!("length {}", data.len())))
                }

                Color::from_samples(be_u16(data, 0), be_u16(data, 2), be_u16(data, 4), max, max)
            }
        };

        self.background = Some(color);

        Ok(())
    }

    fn transparency(&mut self, header: &Header, chunk: &Chunk) -> Result<(), FormatError> {
        let data = chunk.payload;

        match header.color_type {
            ColorType::GRAY => {
                if data.len() != 2 {
                    return Err(unsupported(chunk, format!("length {}", data.len())))
                }

                self.transparency = Some(Transparency::Gray(be_u16(data, 0)));
            },
            ColorType::RGB => {
                if data.len() != 6 {
                    return Err(unsupported(chunk, format!("length {}", data.len())))
                }

                self.transparency = Some(Transparency::RGB(be_u16(data, 0), be_u16(data, 2), be_u16(data, 4)));
            },
            ColorType::NDX => {
                if self.palette.is_empty() {
                    return Err(unsupported(chunk, "transparency before palette"))
                }

                if data.len() > self.palette.len() {
                    return Err(unsupported(chunk, format!(
                        "{} alpha values for {} palette entries", data.len(), self.palette.len()
                    )))
                }

                self.palette.iter_mut().zip(data.iter()).for_each(|(entry, alpha)| {
                    entry.3 = *alpha;
                });
            },
            ColorType::GRAYA | ColorType::RGBA =>
                return Err(unsupported(chunk, "color type already has an alpha channel"))
        }

        Ok(())
    }

    fn text(&mut self, chunk: &Chunk) -> Result<(), FormatError> {
        let data = chunk.payload;

        let sep = data.iter().position(|b| *b == 0)
            .ok_or_else(|| unsupported(chunk, "missing keyword separator"))?;

        self.meta.insert(latin1(&data[.. sep]), latin1(&data[sep + 1 ..]));

        Ok(())
    }

    fn ztext(&mut self, chunk: &Chunk) -> Result<(), FormatError> {
        let data = chunk.payload;

        let sep = data.iter().position(|b| *b == 0)
            .ok_or_else(|| unsupported(chunk, "missing keyword separator"))?;

        match data.get(sep + 1) {
            Some(0) => (),
            Some(m) => return Err(unsupported(chunk, format!("bad compression: {m}"))),
            None => return Err(unsupported(chunk, "missing compression method"))
        }

        let mut deco = ZlibDecoder::new(&data[sep + 2 ..]).take(MAX_TEXT + 1);
        let mut unpacked: Vec<u8> = Vec::new();

        if let Err(e) = deco.read_to_end(&mut unpacked) {
            return Err(unsupported(chunk, format!("zlib: {e}")))
        }

        if unpacked.len() as u64 > MAX_TEXT {
            return Err(unsupported(chunk, format!("text over {MAX_TEXT} bytes")))
        }

        self.meta.insert(latin1(&data[.. sep]), latin1(&unpacked));

        Ok(())
    }
}
