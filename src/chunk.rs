//! chunk
//!
//! Signature check and chunk framing: length, tag, payload, CRC.

use crc32fast::Hasher;

use crate::FormatError;

pub const SIGNATURE: [u8; 8] = *b"\x89\x50\x4e\x47\x0d\x0a\x1a\x0a";

/// Length, tag and CRC.
const FRAMING: usize = 12;

/// One CRC-verified chunk borrowed from the input buffer.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub tag: [u8; 4],
    pub payload: &'a [u8],
}

impl Chunk<'_> {
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.tag).to_string()
    }

/// Bit 5 of the first tag byte (lower case letter) marks ancillary chunks.
    pub fn is_ancillary(&self) -> bool {
        self.tag[0] & 0x20 != 0
    }

/// Bytes taken in the stream, framing included.
    pub fn size(&self) -> usize {
        self.payload.len() + FRAMING
    }
}

/// Verify the signature and return the offset of the first chunk.
pub fn check_signature(buf: &[u8]) -> Result<usize, FormatError> {
    if buf.len() < SIGNATURE.len() || buf[.. SIGNATURE.len()] != SIGNATURE {
        return Err(FormatError::BadSignature)
    }

    Ok(SIGNATURE.len())
}

/// Read the chunk starting at `offs` and verify its CRC.
pub fn get_chunk(buf: &[u8], offs: usize) -> Result<Chunk<'_>, FormatError> {
    let inp = buf.get(offs ..).unwrap_or(&[]);

    let truncated = || FormatError::Truncated {
        chunk_type: String::from_utf8_lossy(inp.get(4 .. 8).unwrap_or(&[])).to_string()
    };

    if inp.len() < FRAMING {
        return Err(truncated())
    }

    let length = u32::from_be_bytes([inp[0], inp[1], inp[2], inp[3]]) as usize;

    let end = length.checked_add(FRAMING).ok_or_else(truncated)?;

    if inp.len() < end {
        return Err(truncated())
    }

    let mut tag = [0_u8; 4];
    tag.copy_from_slice(&inp[4 .. 8]);

    let mut crc = Hasher::new();
    crc.update(&inp[4 .. 8 + length]);
    let crc_got = crc.finalize().to_be_bytes();

    let chunk = Chunk {
        tag,
        payload: &inp[8 .. 8 + length]
    };

    if crc_got != inp[8 + length .. end] {
        return Err(FormatError::ChecksumMismatch { chunk_type: chunk.name() })
    }

    log::trace!("{} / {}", chunk.name(), length);

    Ok(chunk)
}
