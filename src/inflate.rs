//! inflate
//!
//! zlib stream adapter for the concatenated IDAT payload.

use flate2::{Decompress, FlushDecompress, Status};

use crate::FormatError;

/// Output is drained this many bytes at a time.
pub const CHUNK_SIZE: usize = 4096;

/// Inflate a complete zlib stream. The output size is not known up front;
/// the stream is drained until it reports its end. At most `limit` bytes are
/// kept, the rest is decompressed and dropped.
pub fn inflate(raw: &[u8], limit: usize) -> Result<Vec<u8>, FormatError> {
    let mut deco = Decompress::new(true);
    let mut out = [0_u8; CHUNK_SIZE];
    let mut unpacked: Vec<u8> = Vec::with_capacity(limit.min(raw.len().saturating_mul(2)));

    loop {
        let consumed = deco.total_in() as usize;
        let produced = deco.total_out();

        let status = deco.decompress(&raw[consumed ..], &mut out, FlushDecompress::None)
            .map_err(|e| FormatError::Decompression(e.to_string()))?;

        let got = (deco.total_out() - produced) as usize;
        let room = limit - unpacked.len();

        unpacked.extend_from_slice(&out[.. got.min(room)]);

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                if got == 0 && deco.total_in() as usize == consumed {
                    return Err(FormatError::Decompression(format!(
                        "stream ended early after {} of {} bytes", consumed, raw.len()
                    )))
                }
            }
        }
    }

    if deco.total_out() > unpacked.len() as u64 {
        log::debug!("ignoring {} trailing bytes of image data", deco.total_out() - unpacked.len() as u64);
    }

    log::debug!("IDAT: {} -> {} bytes", raw.len(), unpacked.len());

    Ok(unpacked)
}
