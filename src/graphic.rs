//! Bitmap to `^GFA` conversion.
//!
//! Source images are resampled to the exact dot size of the element, turned
//! into 8-bit luma, reduced to one bit per pixel and packed MSB first with
//! black as `1`. The result feeds the `^GFA` graphic field command.

use std::borrow::Cow;
use std::fmt::Write;
use std::path::Path;

use image::imageops::{self, BiLevel, FilterType};
use image::{GrayImage, Luma, RgbaImage};
use log::debug;

use crate::{error::EmitError, Matrix};

/// How grayscale is reduced to black and white.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dithering {
    /// Floyd–Steinberg error diffusion. Needed for photos and logos with
    /// gradients.
    #[default]
    FloydSteinberg,
    /// Plain step filter: luma below the threshold prints black.
    /// Works fine when the original data is already monochrome.
    Threshold(u8),
}

/// A packed 1-bit image ready for `^GFA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicField {
    bytes_per_row: u32,
    height: u32,
    rows: Matrix,
}

impl GraphicField {
    /// Pack a grayscale image that is already strictly black (0) and white.
    ///
    /// Any pixel that is not 255 is considered black, and rows are padded
    /// with white bits up to a whole byte.
    pub fn from_bilevel(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let bytes_per_row = (width + 7) / 8;

        let mut rows: Matrix = Vec::with_capacity(height as usize);
        for y in 0..height {
            let mut row = vec![0u8; bytes_per_row as usize];
            for x in 0..width {
                let Luma([luma]) = *image.get_pixel(x, y);
                if luma < u8::MAX {
                    row[(x / 8) as usize] |= 0x80 >> (x % 8);
                }
            }
            rows.push(row);
        }

        GraphicField {
            bytes_per_row,
            height,
            rows,
        }
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.bytes_per_row
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total payload size, `bytes_per_row * height`.
    pub fn total_bytes(&self) -> u32 {
        self.bytes_per_row * self.height
    }

    pub fn rows(&self) -> &Matrix {
        &self.rows
    }

    /// Uppercase hex of every row, two characters per byte.
    pub fn hex_data(&self) -> String {
        let mut hex = String::with_capacity(self.total_bytes() as usize * 2);
        for row in &self.rows {
            push_hex(&mut hex, row);
        }
        hex
    }

    /// Hex data with ZPL ASCII compression applied.
    ///
    /// Character runs become repeat counts (`G`..`Y` for 1..19, `g`..`z` for
    /// multiples of 20), trailing zeros or ones collapse to `,` or `!`, and a
    /// row equal to the previous one becomes `:`.
    pub fn compressed_hex_data(&self) -> String {
        let mut out = String::new();
        let mut previous: Option<String> = None;
        let mut row_hex = String::with_capacity(self.bytes_per_row as usize * 2);

        for row in &self.rows {
            row_hex.clear();
            push_hex(&mut row_hex, row);

            if previous.as_deref() == Some(row_hex.as_str()) {
                out.push(':');
                continue;
            }
            compress_row(&mut out, &row_hex);
            previous = Some(row_hex.clone());
        }
        out
    }
}

fn push_hex(out: &mut String, bytes: &[u8]) {
    for byte in bytes {
        // Writing into a String cannot fail.
        let _ = write!(out, "{:02X}", byte);
    }
}

fn compress_row(out: &mut String, hex: &str) {
    let bytes = hex.as_bytes();
    let mut end = bytes.len();

    let tail = match bytes.last() {
        Some(b'0') => Some((b'0', ',')),
        Some(b'F') => Some((b'F', '!')),
        _ => None,
    };
    if let Some((fill, _)) = tail {
        while end > 0 && bytes[end - 1] == fill {
            end -= 1;
        }
    }

    let mut i = 0;
    while i < end {
        let c = bytes[i];
        let mut run = 1;
        while i + run < end && bytes[i + run] == c {
            run += 1;
        }
        push_run(out, run, c as char);
        i += run;
    }

    if let Some((_, marker)) = tail {
        out.push(marker);
    }
}

const MAX_RUN: usize = 419;

fn push_run(out: &mut String, mut run: usize, c: char) {
    while run > 0 {
        let chunk = run.min(MAX_RUN);
        if chunk > 1 {
            let high = chunk / 20;
            let low = chunk % 20;
            if high > 0 {
                out.push((b'g' + (high - 1) as u8) as char);
            }
            if low > 0 {
                out.push((b'G' + (low - 1) as u8) as char);
            }
        }
        out.push(c);
        run -= chunk;
    }
}

/// Pick the image bytes for an element: embedded data wins over a path.
pub fn load_source<'a>(
    data: Option<&'a [u8]>,
    path: Option<&str>,
) -> Result<Cow<'a, [u8]>, EmitError> {
    if let Some(data) = data.filter(|d| !d.is_empty()) {
        return Ok(Cow::Borrowed(data));
    }
    match path.filter(|p| !p.is_empty()) {
        Some(path) => std::fs::read(path)
            .map(Cow::Owned)
            .map_err(|source| EmitError::ImageRead {
                path: Path::new(path).to_path_buf(),
                source,
            }),
        None => Err(EmitError::NoImageSource),
    }
}

/// Decode, resample and reduce an encoded image to a [`GraphicField`].
pub fn encode_image(
    bytes: &[u8],
    width_dots: u32,
    height_dots: u32,
    dithering: Dithering,
) -> Result<GraphicField, EmitError> {
    if width_dots == 0 || height_dots == 0 {
        return Err(EmitError::EmptyImage {
            width: width_dots,
            height: height_dots,
        });
    }

    let source = image::load_from_memory(bytes)?;
    debug!(
        "encoding {}x{} image into {}x{} dots ({:?})",
        source.width(),
        source.height(),
        width_dots,
        height_dots,
        dithering
    );

    let resized = imageops::resize(
        &source.to_rgba8(),
        width_dots,
        height_dots,
        FilterType::Lanczos3,
    );
    let mut gray = luma_on_white(&resized);
    reduce(&mut gray, dithering);

    Ok(GraphicField::from_bilevel(&gray))
}

/// Reduce grayscale in place to strictly 0 or 255.
pub fn reduce(gray: &mut GrayImage, dithering: Dithering) {
    match dithering {
        Dithering::FloydSteinberg => imageops::dither(gray, &BiLevel),
        Dithering::Threshold(threshold) => {
            for pixel in gray.pixels_mut() {
                pixel.0[0] = if pixel.0[0] < threshold { 0 } else { u8::MAX };
            }
        }
    }
}

/// Composite onto white paper and convert to ITU-R 601-2 luma.
fn luma_on_white(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let a = u32::from(a);
        let over_white = |c: u8| (u32::from(c) * a + 255 * (255 - a) + 127) / 255;
        let luma = (over_white(r) * 19595 + over_white(g) * 38470 + over_white(b) * 7471 + 0x8000)
            >> 16;
        Luma([luma.min(255) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba};
    use std::io::Cursor;

    fn png(image: RgbaImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        png(RgbaImage::from_pixel(width, height, Rgba(rgba)))
    }

    #[test]
    fn all_black_16x8() {
        let field = encode_image(&solid(16, 8, [0, 0, 0, 255]), 16, 8, Dithering::default()).unwrap();
        assert_eq!(field.bytes_per_row(), 2);
        assert_eq!(field.total_bytes(), 16);

        let hex = field.hex_data();
        assert_eq!(hex.len(), 32);
        assert!(hex.as_bytes().chunks(2).all(|pair| pair == b"FF"));
    }

    #[test]
    fn all_white_is_zero_bits() {
        let field = encode_image(
            &solid(16, 8, [255, 255, 255, 255]),
            16,
            8,
            Dithering::FloydSteinberg,
        )
        .unwrap();
        assert_eq!(field.hex_data(), "0".repeat(32));
    }

    #[test]
    fn rows_are_padded_to_whole_bytes() {
        let field = encode_image(&solid(10, 3, [0, 0, 0, 255]), 10, 3, Dithering::Threshold(128)).unwrap();
        assert_eq!(field.bytes_per_row(), 2);
        assert_eq!(field.total_bytes(), 6);
        assert_eq!(field.hex_data(), "FFC0FFC0FFC0");
    }

    #[test]
    fn source_is_resampled_to_target() {
        let field = encode_image(&solid(4, 2, [0, 0, 0, 255]), 24, 5, Dithering::default()).unwrap();
        assert_eq!(field.bytes_per_row(), 3);
        assert_eq!(field.height(), 5);
        assert_eq!(field.hex_data(), "F".repeat(30));
    }

    #[test]
    fn transparent_pixels_print_as_paper() {
        let field = encode_image(&solid(8, 2, [0, 0, 0, 0]), 8, 2, Dithering::default()).unwrap();
        assert_eq!(field.hex_data(), "0000");
    }

    #[test]
    fn packing_is_msb_first_with_black_set() {
        let mut gray = GrayImage::from_pixel(8, 1, Luma([255]));
        gray.put_pixel(0, 0, Luma([0]));
        gray.put_pixel(6, 0, Luma([0]));
        let field = GraphicField::from_bilevel(&gray);
        assert_eq!(field.rows(), &vec![vec![0b1000_0010]]);
        assert_eq!(field.hex_data(), "82");
    }

    #[test]
    fn threshold_step_filter() {
        let mut gray = GrayImage::from_fn(4, 1, |x, _| Luma([[10, 127, 128, 250][x as usize]]));
        reduce(&mut gray, Dithering::Threshold(128));
        let values: Vec<u8> = gray.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 0, 255, 255]);
    }

    #[test]
    fn dithering_follows_gray_level() {
        let mut gray = GrayImage::from_fn(64, 16, |x, _| Luma([(x * 4) as u8]));
        reduce(&mut gray, Dithering::FloydSteinberg);
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));

        let black_in = |xs: std::ops::Range<u32>| {
            let mut count = 0;
            for y in 0..16 {
                for x in xs.clone() {
                    if gray.get_pixel(x, y).0[0] == 0 {
                        count += 1;
                    }
                }
            }
            count
        };
        let dark_side = black_in(0..16);
        let light_side = black_in(48..64);
        assert!(dark_side > light_side, "{} <= {}", dark_side, light_side);
        assert!(light_side > 0 || dark_side > 0);
    }

    #[test]
    fn undecodable_bytes_are_an_error() {
        let err = encode_image(b"not an image", 8, 8, Dithering::default()).unwrap_err();
        assert!(matches!(err, EmitError::ImageDecode(_)));
    }

    #[test]
    fn empty_target_is_an_error() {
        let err = encode_image(&solid(4, 4, [0, 0, 0, 255]), 0, 4, Dithering::default()).unwrap_err();
        assert!(matches!(err, EmitError::EmptyImage { width: 0, height: 4 }));
    }

    #[test]
    fn compression_collapses_runs_and_rows() {
        let mut gray = GrayImage::from_pixel(32, 3, Luma([255]));
        for x in 0..8 {
            gray.put_pixel(x, 0, Luma([0]));
            gray.put_pixel(x, 1, Luma([0]));
        }
        let field = GraphicField::from_bilevel(&gray);
        assert_eq!(field.hex_data(), "FF000000FF00000000000000");
        assert_eq!(field.compressed_hex_data(), "HF,:,");
    }

    #[test]
    fn compression_of_black_tail_and_long_runs() {
        let mut out = String::new();
        compress_row(&mut out, "0AFFFF");
        assert_eq!(out, "0A!");

        let mut out = String::new();
        compress_row(&mut out, &format!("{}1", "A".repeat(45)));
        assert_eq!(out, "hKA1");

        let mut out = String::new();
        push_run(&mut out, 420, 'C');
        assert_eq!(out, "zYCC");
    }

    #[test]
    fn source_prefers_embedded_bytes() {
        let data = [1u8, 2, 3];
        let source = load_source(Some(&data[..]), Some("/does/not/exist.png")).unwrap();
        assert_eq!(&*source, &data);

        assert!(matches!(load_source(None, None), Err(EmitError::NoImageSource)));
        assert!(matches!(
            load_source(Some(&[][..]), Some("")),
            Err(EmitError::NoImageSource)
        ));
        assert!(matches!(
            load_source(None, Some("/does/not/exist.png")),
            Err(EmitError::ImageRead { .. })
        ));
    }

    #[test]
    fn source_reads_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, solid(8, 8, [0, 0, 0, 255])).unwrap();

        let bytes = load_source(None, path.to_str()).unwrap();
        let field = encode_image(&bytes, 8, 8, Dithering::default()).unwrap();
        assert_eq!(field.hex_data(), "FF".repeat(8));
    }
}
