//! fixture
//!
//! Test-only PNG stream builder: chunk framing, zlib, forward filters,
//! sample packing and Adam7 splitting.

use std::io::Write;

use crc32fast::Hasher;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::chunk::SIGNATURE;
use crate::filter::{png_rev, Filter};

/// Pass number (1 .. 7) of every pixel in an 8x8 tile.
pub const ADAM_7: [usize; 64] = [
    1, 6, 4, 6, 2, 6, 4, 6,
    7, 7, 7, 7, 7, 7, 7, 7,
    5, 6, 5, 6, 5, 6, 5, 6,
    7, 7, 7, 7, 7, 7, 7, 7,
    3, 6, 4, 6, 3, 6, 4, 6,
    7, 7, 7, 7, 7, 7, 7, 7,
    5, 6, 5, 6, 5, 6, 5, 6,
    7, 7, 7, 7, 7, 7, 7, 7
];

const ADAM_7_SZ: usize = 8;

/// Frame `data` (tag + payload) as a chunk.
pub fn png_chunk(data: &[u8]) -> Vec<u8> {
    let mut res: Vec<u8> = vec![];
    res.extend((data.len() as u32 - 4_u32).to_be_bytes());
    res.extend(data);

    let mut crc = Hasher::new();
    crc.update(data);
    res.extend((crc.finalize()).to_be_bytes());

    res
}

pub fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut data = tag.to_vec();
    data.extend(payload);
    png_chunk(&data)
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut e = ZlibEncoder::new(Vec::new(), Compression::default());

    e.write_all(data).expect("compress");
    e.finish().expect("zlib flush")
}

pub fn ihdr_payload(width: u32, height: u32, depth: u8, color: u8, ilace: u8) -> Vec<u8> {
    let mut res: Vec<u8> = Vec::new();
    res.extend(width.to_be_bytes());
    res.extend(height.to_be_bytes());
    res.extend([depth, color, 0, 0, ilace]);
    res
}

pub fn ihdr(width: u32, height: u32, depth: u8, color: u8, ilace: u8) -> Vec<u8> {
    chunk(b"IHDR", &ihdr_payload(width, height, depth, color, ilace))
}

pub fn iend() -> Vec<u8> {
    chunk(b"IEND", &[])
}

/// Signature followed by the given chunks.
pub fn png(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut res = SIGNATURE.to_vec();
    chunks.iter().for_each(|c| res.extend(c));
    res
}

/// Pack samples MSB-first, padding the last byte with zero bits.
pub fn pack_samples(samples: &[u16], depth: u8) -> Vec<u8> {
    let mut res: Vec<u8> = Vec::new();
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;

    samples.iter().for_each(|s| {
        acc = (acc << depth) | *s as u32;
        bits += depth as u32;

        while bits >= 8 {
            bits -= 8;
            res.push((acc >> bits) as u8);
            acc &= (1 << bits) - 1;
        }
    });

    if bits > 0 {
        res.push((acc << (8 - bits)) as u8);
    }

    res
}

/// Apply a filter forward to one scanline; the filter byte leads the result.
pub fn filter_line(est: Filter, line: &[u8], above: Option<&[u8]>, bpp: usize) -> Vec<u8> {
    let mut res: Vec<u8> = vec![est as u8];

    (0 .. line.len()).for_each(|x| {
        let left = if x < bpp { 0 } else { line[x - bpp] };
        let up = above.map(|a| a[x]).unwrap_or(0);
        let corner = if x < bpp { 0 } else { above.map(|a| a[x - bpp]).unwrap_or(0) };

        res.push(line[x].wrapping_sub(png_rev(left, up, corner, est)));
    });

    res
}

/// Split an image of per-pixel samples into packed scanlines, grouped by pass.
/// Empty passes are dropped, the same way the writer side skips them.
pub fn scanlines(pixels: &[Vec<Vec<u16>>], depth: u8, adam_7: bool) -> Vec<Vec<Vec<u8>>> {
    let passes = if adam_7 { 1 ..= 7 } else { 0 ..= 0 };

    passes.map(|a| {
        pixels.iter().enumerate().filter_map(|(y, row)| {
            let samples: Vec<u16> = row.iter().enumerate().filter(|(x, _)| {
                !adam_7 || ADAM_7[(x % ADAM_7_SZ) + ADAM_7_SZ * (y % ADAM_7_SZ)] == a
            }).flat_map(|(_, pix)| pix.iter().copied()).collect();

            if samples.is_empty() {
                None
            }
            else {
                Some(pack_samples(&samples, depth))
            }
        }).collect::<Vec<Vec<u8>>>()
    }).filter(|pass| !pass.is_empty()).collect()
}

/// Filter every scanline with `est`; the first scanline of a pass sees no row above.
pub fn filter_passes(passes: &[Vec<Vec<u8>>], est: Filter, bpp: usize) -> Vec<u8> {
    let mut res: Vec<u8> = Vec::new();

    passes.iter().for_each(|pass| {
        let mut above: Option<&[u8]> = None;

        pass.iter().for_each(|line| {
            res.extend(filter_line(est, line, above, bpp));
            above = Some(&line[..]);
        });
    });

    res
}

/// Complete file: IHDR, `extra` chunks, one IDAT per `split` bytes, IEND.
pub fn encode(width: u32, height: u32, depth: u8, color: u8, adam_7: bool,
    pixels: &[Vec<Vec<u16>>], est: Filter, extra: &[Vec<u8>], split: usize) -> Vec<u8> {

    let channels = pixels[0][0].len();
    let bpp = (depth as usize * channels / 8).max(1);

    let stream = filter_passes(&scanlines(pixels, depth, adam_7), est, bpp);
    let packed = zlib(&stream);

    let mut chunks = vec![ihdr(width, height, depth, color, adam_7 as u8)];
    chunks.extend(extra.iter().cloned());
    packed.chunks(split.max(1)).for_each(|part| chunks.push(chunk(b"IDAT", part)));
    chunks.push(iend());

    png(&chunks)
}
