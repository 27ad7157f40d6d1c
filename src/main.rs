use std::process::ExitCode;

use clap::Parser;
use micro_png_reader::PNGReader;

/// Print what a PNG file holds.
#[derive(Parser, Default, Debug)]
#[clap(author, about, version)]
struct Options {
    /// Input PNG file.
    file: String,

    /// Leave samples as stored, ignoring gAMA.
    #[clap(long)]
    no_gamma: bool,

    /// Dump every pixel as 8 bit RGBA.
    #[clap(long)]
    pixels: bool,
}

fn main() -> ExitCode {
    env_logger::init();

    let opts = Options::parse();

    let image = match PNGReader::new().set_gamma(!opts.no_gamma).read(&opts.file) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("{}: {e}", opts.file);
            return ExitCode::FAILURE
        }
    };

    println!("{} x {}, {:?} {} bits, {:?}",
        image.width(), image.height(), image.color_type(), image.bit_depth(), image.interlace());
    println!("gamma: {}", image.gamma());

    if let Some(bg) = image.background() {
        println!("background: {:?}", bg.to_rgba8());
    }

    let mut keys: Vec<&String> = image.meta().keys().collect();
    keys.sort();

    keys.iter().for_each(|k| println!("{k}: {}", image.meta()[*k]));

    image.warnings().iter().for_each(|w| println!("warning: {w}"));

    match image.pixels() {
        None => println!("no pixel data"),
        Some(grid) if opts.pixels => {
            grid.rows().enumerate().for_each(|(y, row)| {
                let line: Vec<String> = row.iter().map(|c| {
                    let (r, g, b, a) = c.to_rgba8();
                    format!("{r:02x}{g:02x}{b:02x}{a:02x}")
                }).collect();

                println!("{y:5}: {}", line.join(" "));
            });
        },
        Some(_) => ()
    }

    ExitCode::SUCCESS
}
