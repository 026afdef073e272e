//! Encodes text as pixel colours: three UTF-8 bytes per pixel, printed as
//! hex colour codes and saved as a one-row PNG that can be placed on the
//! canvas as a zone template.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use image::imageops::{self, FilterType};
use image::RgbImage;

#[derive(Parser, Debug)]
#[command(name = "text2rgb", version, about = "convert text to colour codes and an image")]
struct Cli {
    /// The text to convert. Prompted for when absent.
    text: Option<String>,

    /// Scale the image up this much before saving it.
    #[arg(short, long, default_value_t = 1)]
    scale: u32,

    /// Directory the image is written to.
    #[arg(long, default_value = "images/ignore")]
    out_dir: PathBuf,
}

/// UTF-8 bytes padded with zeroes to a whole number of pixels. Always pads
/// at least one byte so the terminator survives decoding.
fn encode(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    let pad = 3 - bytes.len() % 3;
    bytes.extend(std::iter::repeat(0).take(pad));
    bytes
}

/// Remove non-alphanumeric characters.
fn sanitise_filename(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).collect()
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read input")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ensure!(cli.scale >= 1, "scale must be at least 1");

    let text = match cli.text {
        Some(text) => text,
        None => prompt("Text: ")?,
    };

    let encoded = encode(&text);
    for pixel in encoded.chunks_exact(3) {
        println!("{:02x}{:02x}{:02x}", pixel[0], pixel[1], pixel[2]);
    }

    let width = (encoded.len() / 3) as u32;
    let image = RgbImage::from_raw(width, 1, encoded).context("text produced no pixels")?;
    let image = if cli.scale == 1 {
        image
    } else {
        imageops::resize(
            &image,
            width * cli.scale,
            cli.scale,
            FilterType::Nearest,
        )
    };

    let image_name = format!("{}-utf-8,{}x,(,).png", sanitise_filename(&text), cli.scale);
    let image_path = cli.out_dir.join(image_name);
    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("failed to create {}", cli.out_dir.display()))?;
    println!("Writing image to \"{}\".", image_path.display());
    image
        .save(&image_path)
        .with_context(|| format!("failed to save {}", image_path.display()))?;
    println!("Done!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_pads_to_whole_pixels() {
        assert_eq!(encode("ab").len(), 3);
        assert_eq!(encode("abc").len(), 6);
        assert_eq!(encode("abcd").len(), 6);
        assert_eq!(&encode("ab")[..2], b"ab");
        assert_eq!(encode("ab")[2], 0);
    }

    #[test]
    fn sanitise_strips_punctuation() {
        assert_eq!(sanitise_filename("https://a.b c!"), "httpsabc");
    }
}
