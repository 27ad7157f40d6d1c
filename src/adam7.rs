//! adam7
//!
//! Pass geometry shared by the unfilter engine and the pixel assembler.

use crate::Interlace;

/// Start row, start column, row step, column step for the seven Adam7 passes.
pub const ADAM_7_PASSES: [(usize, usize, usize, usize); 7] = [
    (0, 0, 8, 8),
    (0, 4, 8, 8),
    (4, 0, 8, 4),
    (0, 2, 4, 4),
    (2, 0, 4, 2),
    (0, 1, 2, 2),
    (1, 0, 2, 1)
];

/// One sub-scan of the image. A non-interlaced image is a single pass with
/// unit steps.
#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub struct Pass {
/// 0 .. 6 for Adam7, 0 otherwise.
    pub index: usize,
    pub start_row: usize,
    pub start_col: usize,
    pub row_step: usize,
    pub col_step: usize,
/// Scanlines in this pass.
    pub rows: usize,
/// Pixels per scanline.
    pub cols: usize,
}

impl Pass {
/// Packed byte width of one scanline, filter byte excluded.
    pub fn scanline_bytes(&self, bits_per_pixel: usize) -> usize {
        (self.cols * bits_per_pixel).div_ceil(8)
    }

/// Filtered size of the whole pass, one filter byte per scanline included.
/// `None` when it does not fit in `usize`.
    pub fn filtered_bytes(&self, bits_per_pixel: usize) -> Option<usize> {
        self.cols.checked_mul(bits_per_pixel)?
            .div_ceil(8)
            .checked_add(1)?
            .checked_mul(self.rows)
    }

/// Image row of the `line`-th scanline of this pass.
    pub fn row(&self, line: usize) -> usize {
        self.start_row + line * self.row_step
    }

/// Image column of the `n`-th pixel of a scanline.
    pub fn col(&self, n: usize) -> usize {
        self.start_col + n * self.col_step
    }
}

fn hits(extent: usize, start: usize, step: usize) -> usize {
    if extent > start {
        (extent - start).div_ceil(step)
    }
    else {
        0
    }
}

/// Size of the filtered stream for all passes.
pub fn planned_bytes(passes: &[Pass], bits_per_pixel: usize) -> Option<usize> {
    passes.iter().try_fold(0_usize, |total, pass| total.checked_add(pass.filtered_bytes(bits_per_pixel)?))
}

/// Plan the passes for an image. Passes hitting no pixel are left out.
pub fn plan(width: usize, height: usize, interlace: Interlace) -> Vec<Pass> {
    match interlace {
        Interlace::None => vec![Pass {
            index: 0,
            start_row: 0,
            start_col: 0,
            row_step: 1,
            col_step: 1,
            rows: height,
            cols: width
        }],
        Interlace::Adam7 => ADAM_7_PASSES.iter().enumerate().map(|(index, (start_row, start_col, row_step, col_step))| {
            Pass {
                index,
                start_row: *start_row,
                start_col: *start_col,
                row_step: *row_step,
                col_step: *col_step,
                rows: hits(height, *start_row, *row_step),
                cols: hits(width, *start_col, *col_step)
            }
        }).filter(|pass| pass.rows > 0 && pass.cols > 0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::ADAM_7;
    use proptest::prelude::*;

    #[test]
    pub fn test_single_pass() {
        let passes = plan(133, 193, Interlace::None);

        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].rows, 193);
        assert_eq!(passes[0].cols, 133);
        assert_eq!(passes[0].scanline_bytes(1), 17);
        assert_eq!(passes[0].scanline_bytes(24), 399);
        assert_eq!(passes[0].filtered_bytes(24), Some(193 * 400));
    }

    #[test]
    pub fn test_adam7_8x8() {
        let dims: Vec<(usize, usize)> = plan(8, 8, Interlace::Adam7).iter().map(|p| (p.rows, p.cols)).collect();

        assert_eq!(dims, vec![(1, 1), (1, 1), (1, 2), (2, 2), (2, 4), (4, 4), (4, 8)]);
    }

    #[test]
    pub fn test_adam7_tiny() {
        // 1x1 only hits the first pass
        let one = plan(1, 1, Interlace::Adam7);

        assert_eq!(one.len(), 1);
        assert_eq!(one[0].index, 0);

        // 3 wide, 1 high: passes 0, 3 (col 2) and 5 (col 1)
        let indices: Vec<usize> = plan(3, 1, Interlace::Adam7).iter().map(|p| p.index).collect();

        assert_eq!(indices, vec![0, 3, 5]);
    }

    #[test]
    pub fn test_adam7_odd() {
        let passes = plan(133, 193, Interlace::Adam7);

        let dims: Vec<(usize, usize)> = passes.iter().map(|p| (p.rows, p.cols)).collect();

        assert_eq!(dims, vec![(25, 17), (25, 17), (24, 34), (49, 33), (48, 67), (97, 66), (96, 133)]);
    }

    #[test]
    pub fn test_planned_bytes() {
        assert_eq!(planned_bytes(&plan(8, 8, Interlace::Adam7), 8), Some(2 + 2 + 3 + 2 * 3 + 2 * 5 + 4 * 5 + 4 * 9));
        assert_eq!(planned_bytes(&plan(3, 2, Interlace::None), 2), Some(4));

        let huge = plan(0x7fff_ffff, 0x7fff_ffff, Interlace::None);

        assert_eq!(huge[0].filtered_bytes(64), None);
        assert_eq!(planned_bytes(&huge, 64), None);
        assert_eq!(planned_bytes(&plan(0x7fff_ffff, 0x7fff_ffff, Interlace::Adam7), 64), None);
    }

    #[test]
    pub fn test_matches_pattern() {
        let (w, h) = (19, 13);

        plan(w, h, Interlace::Adam7).iter().for_each(|pass| {
            (0 .. pass.rows).for_each(|line| {
                (0 .. pass.cols).for_each(|n| {
                    let (x, y) = (pass.col(n), pass.row(line));

                    assert!(x < w && y < h);
                    assert_eq!(ADAM_7[(x % 8) + 8 * (y % 8)], pass.index + 1);
                });
            });
        });
    }

    proptest! {
        #[test]
        fn prop_passes_cover_grid_once(width in 1_usize .. 40, height in 1_usize .. 40) {
            let mut seen = vec![0_u8; width * height];

            for pass in plan(width, height, Interlace::Adam7) {
                for line in 0 .. pass.rows {
                    for n in 0 .. pass.cols {
                        let (x, y) = (pass.col(n), pass.row(line));

                        prop_assert!(x < width && y < height);
                        seen[y * width + x] += 1;
                    }
                }
            }

            prop_assert!(seen.iter().all(|count| *count == 1));
        }
    }
}
