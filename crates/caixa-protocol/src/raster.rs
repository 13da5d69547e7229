//! Raster bitmap packing and band transfer.
//!
//! A receipt graphic is transferred as packed 1-bit-per-pixel rows: MSB is the
//! leftmost pixel, bit 1 means "ink". Rows are sent in bands of at most
//! [`BAND_ROWS`] pixel-rows through the dialect's bitmap-transfer command
//! (`GS v 0`), each band prefixed by its byte-width (LSB, MSB) and row count.

use crate::commands::GS;
use crate::error::{ProtocolError, Result};
use bytes::BufMut;
use image::{DynamicImage, GrayImage, imageops::FilterType};

/// Maximum pixel-rows per transfer band.
pub const BAND_ROWS: u32 = 24;

/// Default luma threshold: pixels darker than this receive ink.
pub const DEFAULT_THRESHOLD: u8 = 128;

/// Number of addressable dots across the paper.
///
/// Paper width in millimetres times dots-per-inch, divided by 25.4, floored
/// to a byte-aligned pixel count (print heads address whole bytes of dots).
///
/// # Examples
///
/// ```
/// use caixa_protocol::addressable_width_px;
///
/// assert_eq!(addressable_width_px(80, 203), 632);
/// assert_eq!(addressable_width_px(58, 203), 456);
/// ```
pub fn addressable_width_px(paper_width_mm: u32, dpi: u32) -> u32 {
    let dots = (f64::from(paper_width_mm) * f64::from(dpi) / 25.4).floor() as u32;
    dots / 8 * 8
}

/// Convert an arbitrary image into a grayscale bitmap no wider than
/// `max_width_px`, preserving aspect ratio.
///
/// # Errors
///
/// Returns [`ProtocolError::EmptyImage`] for zero-sized input.
pub fn prepare_raster(image: &DynamicImage, max_width_px: u32) -> Result<GrayImage> {
    if image.width() == 0 || image.height() == 0 || max_width_px == 0 {
        return Err(ProtocolError::EmptyImage);
    }

    if image.width() <= max_width_px {
        return Ok(image.to_luma8());
    }

    let height = (u64::from(image.height()) * u64::from(max_width_px) / u64::from(image.width()))
        .max(1) as u32;
    Ok(image
        .resize_exact(max_width_px, height, FilterType::Triangle)
        .to_luma8())
}

/// Pack a grayscale bitmap into banded `GS v 0` transfer commands.
///
/// Pixels with luma strictly below `threshold` are inked. Rows are padded
/// with blank bits up to the next byte boundary, so the payload is exactly
/// `ceil(width / 8) * height` bytes across all bands, plus one 8-byte header
/// per band.
///
/// # Errors
///
/// Returns [`ProtocolError::EmptyImage`] for zero-sized input.
pub fn encode_raster(image: &GrayImage, threshold: u8) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ProtocolError::EmptyImage);
    }

    let bytes_per_row = width.div_ceil(8) as usize;
    let mut buf = Vec::with_capacity(bytes_per_row * height as usize + 64);

    let mut band_start = 0u32;
    while band_start < height {
        let rows = (height - band_start).min(BAND_ROWS);

        // GS v 0 m xL xH yL yH — byte-width then row count, LSB first.
        buf.extend_from_slice(&[GS, 0x76, 0x30, 0x00]);
        buf.put_u16_le(bytes_per_row as u16);
        buf.put_u16_le(rows as u16);

        for y in band_start..band_start + rows {
            let mut byte = 0u8;
            for x in 0..width {
                if image.get_pixel(x, y).0[0] < threshold {
                    byte |= 0x80 >> (x % 8);
                }
                if x % 8 == 7 {
                    buf.push(byte);
                    byte = 0;
                }
            }
            if width % 8 != 0 {
                buf.push(byte);
            }
        }

        band_start += rows;
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Parse an encoded band stream back into (bytes_per_row, rows, payload)
    /// triples for assertions.
    fn decode_bands(mut bytes: &[u8]) -> Vec<(u16, u16, Vec<u8>)> {
        let mut bands = Vec::new();
        while !bytes.is_empty() {
            assert_eq!(&bytes[..4], &[0x1D, 0x76, 0x30, 0x00]);
            let x = u16::from_le_bytes([bytes[4], bytes[5]]);
            let y = u16::from_le_bytes([bytes[6], bytes[7]]);
            let len = x as usize * y as usize;
            bands.push((x, y, bytes[8..8 + len].to_vec()));
            bytes = &bytes[8 + len..];
        }
        bands
    }

    fn checkerboard(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        })
    }

    #[test]
    fn test_payload_length() {
        let image = checkerboard(64, 50);
        let bytes = encode_raster(&image, DEFAULT_THRESHOLD).unwrap();
        let bands = decode_bands(&bytes);

        // 50 rows → bands of 24, 24, 2.
        let rows: Vec<u16> = bands.iter().map(|(_, y, _)| *y).collect();
        assert_eq!(rows, vec![24, 24, 2]);

        let payload: usize = bands.iter().map(|(_, _, d)| d.len()).sum();
        assert_eq!(payload, (64 / 8) * 50);
    }

    #[test]
    fn test_bit_packing_msb_first() {
        // Single row: ink on pixel 0 only → 0b1000_0000.
        let mut image = GrayImage::from_pixel(8, 1, Luma([255u8]));
        image.put_pixel(0, 0, Luma([0u8]));

        let bytes = encode_raster(&image, DEFAULT_THRESHOLD).unwrap();
        let bands = decode_bands(&bytes);
        assert_eq!(bands[0].2, vec![0x80]);
    }

    #[test]
    fn test_row_padding_to_byte_boundary() {
        // 10 px wide → 2 bytes per row, last 6 bits blank.
        let image = GrayImage::from_pixel(10, 3, Luma([0u8]));
        let bytes = encode_raster(&image, DEFAULT_THRESHOLD).unwrap();
        let bands = decode_bands(&bytes);
        assert_eq!(bands[0].0, 2);
        assert_eq!(bands[0].2[0], 0xFF);
        assert_eq!(bands[0].2[1], 0b1100_0000);
    }

    #[test]
    fn test_roundtrip_pixels() {
        let image = checkerboard(32, 30);
        let bytes = encode_raster(&image, DEFAULT_THRESHOLD).unwrap();
        let bands = decode_bands(&bytes);

        let mut y_base = 0u32;
        for (bytes_per_row, rows, data) in bands {
            for row in 0..u32::from(rows) {
                for x in 0..32u32 {
                    let byte = data[(row * u32::from(bytes_per_row) + x / 8) as usize];
                    let inked = byte & (0x80 >> (x % 8)) != 0;
                    let source_dark = image.get_pixel(x, y_base + row).0[0] < DEFAULT_THRESHOLD;
                    assert_eq!(inked, source_dark, "pixel ({x}, {})", y_base + row);
                }
            }
            y_base += u32::from(rows);
        }
        assert_eq!(y_base, 30);
    }

    #[test]
    fn test_prepare_raster_downscales() {
        let image = DynamicImage::new_rgb8(1280, 640);
        let gray = prepare_raster(&image, 576).unwrap();
        assert_eq!(gray.width(), 576);
        assert_eq!(gray.height(), 288);
    }

    #[test]
    fn test_prepare_raster_keeps_small_images() {
        let image = DynamicImage::new_rgb8(100, 40);
        let gray = prepare_raster(&image, 576).unwrap();
        assert_eq!(gray.dimensions(), (100, 40));
    }

    #[test]
    fn test_empty_image_rejected() {
        let image = GrayImage::new(0, 0);
        assert!(matches!(
            encode_raster(&image, DEFAULT_THRESHOLD),
            Err(ProtocolError::EmptyImage)
        ));
    }

    #[test]
    fn test_addressable_width_byte_aligned() {
        for (mm, dpi) in [(80u32, 203u32), (58, 203), (80, 180), (48, 203)] {
            assert_eq!(addressable_width_px(mm, dpi) % 8, 0);
        }
    }
}
