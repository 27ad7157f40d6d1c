//! filter
//!
//! Scanline unfiltering. Reconstruction happens in place: filter bytes are
//! squeezed out and every scanline is rebuilt from the one above it in the
//! same pass.

use crate::adam7::{planned_bytes, Pass};
use crate::FormatError;

/// Filter mode.
#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum Filter {
/// No filter.
    None,
/// Pixel on left filter.
    Sub,
/// Pixel above filter.
    Up,
/// Average of pixel above and pixel on left.
    Avg,
/// Paeth filter.
    Paeth
}

impl Filter {
    pub fn from_byte(mode: u8) -> Result<Self, FormatError> {
        match mode {
            0 => Ok(Filter::None),
            1 => Ok(Filter::Sub),
            2 => Ok(Filter::Up),
            3 => Ok(Filter::Avg),
            4 => Ok(Filter::Paeth),
            e => Err(FormatError::BadFilter(e))
        }
    }
}

pub fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i32 + b as i32 - c as i32;
    let pa = (p - a as i32).abs();
    let pb = (p - b as i32).abs();
    let pc = (p - c as i32).abs();

    if pa <= pb && pa <= pc {
        a
    }
    else if pb <= pc {
        b
    }
    else {
        c
    }
}

/// Predictor for one byte given its left, up and up-left neighbours.
pub fn png_rev(left: u8, up: u8, corner: u8, est: Filter) -> u8 {
    match est {
        Filter::None => 0,
        Filter::Sub => left,
        Filter::Up => up,
        Filter::Avg => ((left as u16 + up as u16) >> 1) as u8,
        Filter::Paeth => paeth(left, up, corner)
    }
}

/// Undo filtering for all passes.
///
/// `data` holds, pass after pass, one filter byte plus the packed scanline
/// for every scanline. The returned buffer holds the reconstructed scanlines
/// only. Bytes past the planned geometry are dropped.
pub fn unfilter(mut data: Vec<u8>, passes: &[Pass], bits_per_pixel: usize) -> Result<Vec<u8>, FormatError> {
    let bpp = (bits_per_pixel / 8).max(1);

    let expected = planned_bytes(passes, bits_per_pixel).unwrap_or(usize::MAX);

    if data.len() < expected {
        return Err(FormatError::ShortImageData { expected, got: data.len() })
    }

    if data.len() > expected {
        log::debug!("ignoring {} trailing bytes of image data", data.len() - expected);
    }

    let mut src = 0;
    let mut dst = 0;

    for pass in passes {
        let stride = pass.scanline_bytes(bits_per_pixel);

        for line in 0 .. pass.rows {
            let est = Filter::from_byte(data[src])?;

            data.copy_within(src + 1 .. src + 1 + stride, dst);
            src += stride + 1;

            if est != Filter::None {
                let first = line == 0;

                (dst .. dst + stride).for_each(|ox| {
                    let x = ox - dst;

                    let left = if x < bpp { 0 } else { data[ox - bpp] };
                    let up = if first { 0 } else { data[ox - stride] };
                    let corner = if first || x < bpp { 0 } else { data[ox - stride - bpp] };

                    data[ox] = data[ox].wrapping_add(png_rev(left, up, corner, est));
                });
            }

            dst += stride;
        }
    }

    data.truncate(dst);

    Ok(data)
}
