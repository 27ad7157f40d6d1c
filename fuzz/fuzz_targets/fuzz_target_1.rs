#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(image) = micro_png_reader::read_png_u8(data) {
        if let Some(grid) = image.pixels() {
            assert_eq!(grid.pixels().len(), image.width() * image.height());
        }
    }
});
