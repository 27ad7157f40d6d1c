//! assemble
//!
//! Turns unfiltered scanlines into the final grid of normalized colors.

use crate::adam7::Pass;
use crate::ancillary::{Ancillary, Transparency};
use crate::bits::BitReader;
use crate::{Color, ColorType, FormatError, Header, PixelGrid};

/// Gamma correction of one channel: `value ^ power`, `power` being `1 / gamma`.
pub fn apply_gamma(value: f32, power: f32) -> f32 {
    value.powf(power)
}

struct Assembler<'a> {
    header: &'a Header,
    aux: &'a Ancillary,
    power: Option<f32>,
    max: u16,
}

impl Assembler<'_> {
    fn sample(&self, br: &mut BitReader) -> Result<u16, FormatError> {
        br.read_bits(self.header.bit_depth).ok_or(FormatError::ShortImageData {
            expected: br.position() + 1,
            got: br.position()
        })
    }

    fn next_pixel(&self, br: &mut BitReader) -> Result<Color, FormatError> {
        let max = self.max;

        let mut color = match self.header.color_type {
            ColorType::GRAY => {
                let g = self.sample(br)?;
                let mut c = Color::from_samples(g, g, g, max, max);

                if self.aux.transparency == Some(Transparency::Gray(g)) {
                    c.a = 0.0;
                }

                c
            },
            ColorType::RGB => {
                let r = self.sample(br)?;
                let g = self.sample(br)?;
                let b = self.sample(br)?;
                let mut c = Color::from_samples(r, g, b, max, max);

                if self.aux.transparency == Some(Transparency::RGB(r, g, b)) {
                    c.a = 0.0;
                }

                c
            },
            ColorType::NDX => {
                let index = self.sample(br)?;
                let (r, g, b, a) = *self.aux.palette.get(index as usize).ok_or(FormatError::PaletteIndex {
                    index,
                    len: self.aux.palette.len()
                })?;

                Color::from_samples(r as u16, g as u16, b as u16, a as u16, 0xff)
            },
            ColorType::GRAYA => {
                let g = self.sample(br)?;
                let a = self.sample(br)?;

                Color::from_samples(g, g, g, a, max)
            },
            ColorType::RGBA => {
                let r = self.sample(br)?;
                let g = self.sample(br)?;
                let b = self.sample(br)?;
                let a = self.sample(br)?;

                Color::from_samples(r, g, b, a, max)
            }
        };

        if let Some(power) = self.power {
            color.r = apply_gamma(color.r, power);
            color.g = apply_gamma(color.g, power);
            color.b = apply_gamma(color.b, power);
        }

        Ok(color)
    }
}

/// Read every pixel of every pass and scatter it into a fresh grid.
///
/// `gamma` is the file gamma; `None` leaves channels untouched.
pub fn assemble(data: &[u8], header: &Header, passes: &[Pass], aux: &Ancillary, gamma: Option<f32>)
    -> Result<PixelGrid, FormatError> {

    if header.color_type == ColorType::NDX && aux.palette.is_empty() {
        return Err(FormatError::MissingPalette)
    }

    let asm = Assembler {
        header,
        aux,
        power: gamma.map(|g| 1.0 / g),
        max: header.sample_max()
    };

    let mut grid = PixelGrid::new(header.width as usize, header.height as usize);
    let mut br = BitReader::new(data);

    for pass in passes {
        for line in 0 .. pass.rows {
            let y = pass.row(line);

            for n in 0 .. pass.cols {
                grid.set(pass.col(n), y, asm.next_pixel(&mut br)?);
            }

            br.skip_to_next_byte();
        }
    }

    Ok(grid)
}
