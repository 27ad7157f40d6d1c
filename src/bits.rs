//! bits
//!
//! MSB-first bit cursor used to pull packed samples out of unfiltered scanlines.

/// Bit cursor over a byte slice.
///
/// Samples are packed most significant bit first, so the first bit read
/// becomes the most significant bit of the returned value.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    bit: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, bit: 0 }
    }

/// Read `count` bits (at most 16). Returns `None` once the buffer runs dry.
    pub fn read_bits(&mut self, count: u8) -> Option<u16> {
        debug_assert!(count <= 16);

        let mut out: u16 = 0;

        for _ in 0 .. count {
            let byte = *self.data.get(self.pos)?;
            let bit = (byte >> (7 - self.bit)) & 1;

            out = (out << 1) | bit as u16;

            self.bit += 1;

            if self.bit == 8 {
                self.bit = 0;
                self.pos += 1;
            }
        }

        Some(out)
    }

/// Drop the rest of a partially consumed byte.
    pub fn skip_to_next_byte(&mut self) {
        if self.bit != 0 {
            self.bit = 0;
            self.pos += 1;
        }
    }

/// Current byte index.
    pub fn position(&self) -> usize {
        self.pos
    }
}
