use super::ImageTransformer;
use anyhow::{Context, Result, anyhow};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};
use std::io::Cursor;

/// Normalizes uploads with the `image` crate.
///
/// Orientation comes from the EXIF `Orientation` tag (via `kamadak-exif`) and is
/// baked into the pixels before the width cap is applied, so the cap bounds the
/// upright width. Re-encoding writes neither EXIF nor ICC data, which strips
/// any embedded color profile.
pub struct ImageCrateTransformer {
    jpeg_quality: u8,
}

impl Default for ImageCrateTransformer {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

impl ImageCrateTransformer {
    pub fn with_jpeg_quality(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }
}

impl ImageTransformer for ImageCrateTransformer {
    fn normalize(&self, bytes: &[u8], extension: &str, max_width: u32) -> Result<Vec<u8>> {
        let format = match extension {
            "png" => ImageFormat::Png,
            "jpg" => ImageFormat::Jpeg,
            other => return Err(anyhow!("Cannot normalize '{}' images", other)),
        };

        let img = image::load_from_memory_with_format(bytes, format)
            .context("Failed to decode image")?;

        let img = apply_orientation(img, read_orientation(bytes));
        let img = cap_width(img, max_width);

        let mut out = Cursor::new(Vec::new());
        match format {
            ImageFormat::Jpeg => {
                let img = match img.color() {
                    ColorType::L8 | ColorType::Rgb8 => img,
                    _ => DynamicImage::ImageRgb8(img.to_rgb8()),
                };
                img.write_to(&mut out, ImageOutputFormat::Jpeg(self.jpeg_quality))
            }
            _ => img.write_to(&mut out, ImageOutputFormat::Png),
        }
        .context("Failed to encode image")?;

        Ok(out.into_inner())
    }
}

/// EXIF orientation (1-8); 1 when absent or unreadable.
pub(crate) fn read_orientation(bytes: &[u8]) -> u32 {
    exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()
        .and_then(|exif| {
            exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .filter(|o| (1..=8).contains(o))
        .unwrap_or(1)
}

pub(crate) fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(), // transpose
        6 => img.rotate90(),
        7 => img.rotate270().fliph(), // transverse
        8 => img.rotate270(),
        _ => img,
    }
}

/// Shrinks to `max_width` preserving aspect ratio. Never upscales.
pub(crate) fn cap_width(img: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_width {
        return img;
    }

    let new_height = ((height as f64 * max_width as f64 / width as f64).round() as u32).max(1);
    img.resize_exact(max_width, new_height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
            Luma([(x + 10 * y) as u8])
        }))
    }

    fn encode(img: &DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn crc32(bytes: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for &byte in bytes {
            crc ^= byte as u32;
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
            }
        }
        !crc
    }

    /// zlib stream holding `data` in a single stored block.
    fn zlib_stored(data: &[u8]) -> Vec<u8> {
        let (mut a, mut b) = (1u32, 0u32);
        for &byte in data {
            a = (a + byte as u32) % 65521;
            b = (b + a) % 65521;
        }

        let len = data.len() as u16;
        let mut out = vec![0x78, 0x01, 0x01];
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(!len).to_le_bytes());
        out.extend_from_slice(data);
        out.extend_from_slice(&((b << 16) | a).to_be_bytes());
        out
    }

    const FAKE_PROFILE: &[u8] = b"display profile that should not survive";

    /// Inserts an iCCP chunk right after IHDR.
    fn with_png_icc(png: &[u8]) -> Vec<u8> {
        let mut data = b"Display P3\0\0".to_vec();
        data.extend(zlib_stored(FAKE_PROFILE));

        let mut body = b"iCCP".to_vec();
        body.extend(&data);

        let mut chunk = (data.len() as u32).to_be_bytes().to_vec();
        chunk.extend(&body);
        chunk.extend(crc32(&body).to_be_bytes());

        // signature (8) + IHDR length, type, data and crc (25)
        let mut out = png[..33].to_vec();
        out.extend(chunk);
        out.extend(&png[33..]);
        out
    }

    /// Inserts an APP2 ICC_PROFILE segment right after SOI.
    fn with_jpeg_icc(jpeg: &[u8]) -> Vec<u8> {
        let mut payload = b"ICC_PROFILE\0".to_vec();
        payload.extend([1, 1]);
        payload.extend(FAKE_PROFILE);

        let mut out = jpeg[..2].to_vec();
        out.extend([0xFF, 0xE2]);
        out.extend(((payload.len() + 2) as u16).to_be_bytes());
        out.extend(payload);
        out.extend(&jpeg[2..]);
        out
    }

    #[test]
    fn test_cap_width_shrinks_wide_images() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(2000, 1000));
        let capped = cap_width(img, 1024);
        assert_eq!(capped.dimensions(), (1024, 512));
    }

    #[test]
    fn test_cap_width_never_upscales() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        assert_eq!(cap_width(img, 1024).dimensions(), (640, 480));

        let img = DynamicImage::ImageRgb8(RgbImage::new(1024, 3000));
        assert_eq!(cap_width(img, 1024).dimensions(), (1024, 3000));
    }

    #[test]
    fn test_cap_width_keeps_one_pixel_rows() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(5000, 1));
        assert_eq!(cap_width(img, 1024).dimensions(), (1024, 1));
    }

    #[test]
    fn test_orientation_swaps_dimensions() {
        for (orientation, expected) in [
            (1, (3, 2)),
            (2, (3, 2)),
            (3, (3, 2)),
            (4, (3, 2)),
            (5, (2, 3)),
            (6, (2, 3)),
            (7, (2, 3)),
            (8, (2, 3)),
        ] {
            let oriented = apply_orientation(gradient(3, 2), orientation);
            assert_eq!(oriented.dimensions(), expected, "orientation {}", orientation);
        }
    }

    #[test]
    fn test_orientation_pixel_mapping() {
        let src = gradient(3, 2);
        let px = |img: &DynamicImage, x, y| img.get_pixel(x, y).0[0];

        // 6: rotate 90 CW, top-left of the source ends up top-right
        let rotated = apply_orientation(src.clone(), 6);
        assert_eq!(px(&rotated, 1, 0), px(&src, 0, 0));
        assert_eq!(px(&rotated, 0, 0), px(&src, 0, 1));

        // 5: transpose
        let transposed = apply_orientation(src.clone(), 5);
        for (x, y) in [(0, 0), (1, 0), (0, 2), (1, 2)] {
            assert_eq!(px(&transposed, x, y), px(&src, y, x));
        }

        // 7: transverse
        let transversed = apply_orientation(src.clone(), 7);
        for (x, y) in [(0, 0), (1, 0), (0, 2), (1, 2)] {
            assert_eq!(px(&transversed, x, y), px(&src, 2 - y, 1 - x));
        }
    }

    #[test]
    fn test_read_orientation_defaults_to_upright() {
        assert_eq!(read_orientation(b""), 1);
        let png = encode(&gradient(4, 4), ImageOutputFormat::Png);
        assert_eq!(read_orientation(&png), 1);
    }

    #[test]
    fn test_normalize_png_round_trip() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1500, 300, Rgb([10, 200, 30])));
        let png = encode(&img, ImageOutputFormat::Png);

        let out = ImageCrateTransformer::default()
            .normalize(&png, "png", 1024)
            .unwrap();
        let decoded = image::load_from_memory_with_format(&out, ImageFormat::Png).unwrap();
        assert_eq!(decoded.dimensions(), (1024, 205));
    }

    #[test]
    fn test_normalize_strips_png_color_profile() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 16, Rgb([200, 100, 50])));
        let png = with_png_icc(&encode(&img, ImageOutputFormat::Png));
        assert!(contains(&png, b"iCCP"));
        assert!(contains(&png, FAKE_PROFILE));

        let out = ImageCrateTransformer::default()
            .normalize(&png, "png", 1024)
            .unwrap();
        assert!(!contains(&out, b"iCCP"));
        assert!(!contains(&out, FAKE_PROFILE));

        let decoded = image::load_from_memory_with_format(&out, ImageFormat::Png).unwrap();
        assert_eq!(decoded.dimensions(), (32, 16));
    }

    #[test]
    fn test_normalize_strips_jpeg_color_profile() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 16, Rgb([200, 100, 50])));
        let jpeg = with_jpeg_icc(&encode(&img, ImageOutputFormat::Jpeg(90)));
        assert!(contains(&jpeg, b"ICC_PROFILE"));

        let out = ImageCrateTransformer::default()
            .normalize(&jpeg, "jpg", 1024)
            .unwrap();
        assert!(!contains(&out, b"ICC_PROFILE"));
        assert!(!contains(&out, FAKE_PROFILE));
        assert_eq!(&out[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let transformer = ImageCrateTransformer::default();
        assert!(transformer.normalize(b"\xFF\xD8\xFF\xE0", "jpg", 1024).is_err());
        assert!(transformer.normalize(b"whatever", "gif", 1024).is_err());
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([120, 40, 200])));
        let jpeg = encode(&img, ImageOutputFormat::Jpeg(85));

        let transformer = ImageCrateTransformer::with_jpeg_quality(80);
        let first = transformer.normalize(&jpeg, "jpg", 1024).unwrap();
        let second = transformer.normalize(&jpeg, "jpg", 1024).unwrap();
        assert_eq!(first, second);
    }
}
