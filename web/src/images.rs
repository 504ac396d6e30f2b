
use std::io::Cursor;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine as _;
use image::{ImageFormat, ImageOutputFormat};
use tracing::{debug, error};

use crate::errors::ProxyError;

/// Re-encodes image bodies from the processing server into base64 for the
/// gateway. Only jpeg, png and gif are accepted.
pub struct ImageProcess {}

impl ImageProcess {
    pub fn new() -> Arc<Self> {
        let this = Self {};
        Arc::new(this)
    }

    pub fn encode_body(&self, content_type: &str, data: &[u8]) -> Result<String, ProxyError> {
        self.reencode(content_type, data).map_err(|error| {
            error!("image body encoding error: {:#}", error);
            error!("image body encoding trace: {:?}", error);
            ProxyError::EncodingFailed(format!("{:#}", error))
        })
    }

    fn reencode(&self, content_type: &str, data: &[u8]) -> Result<String> {
        let declared = Self::declared_format(content_type)?;
        let detected = image::guess_format(data).context("unrecognized image data")?;
        if detected != declared {
            debug!("declared {:?} but detected {:?}, using detected format", declared, detected);
        }
        let image = image::load_from_memory_with_format(data, detected).context("decoding image")?;
        let mut buffer = Cursor::new(Vec::with_capacity(data.len()));
        image
            .write_to(&mut buffer, ImageOutputFormat::from(detected))
            .context("encoding image")?;
        let encoded = Base64.encode(buffer.into_inner());
        Ok(encoded)
    }

    // "image/jpeg; charset=binary" -> Jpeg
    fn declared_format(content_type: &str) -> Result<ImageFormat> {
        let mime = content_type.split(';').next().unwrap_or_default().trim().to_lowercase();
        let subtype = mime.split_once('/').map(|(_, subtype)| subtype).unwrap_or_default();
        match subtype {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "gif" => Ok(ImageFormat::Gif),
            _ => Err(anyhow!("unsupported content type {:?}", content_type)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage, RgbaImage};

    fn sample(format: ImageFormat) -> Vec<u8> {
        let rgb = RgbImage::from_fn(17, 9, |x, y| Rgb([(x * 15) as u8, (y * 28) as u8, 128]));
        let image = match format {
            ImageFormat::Gif => DynamicImage::ImageRgba8(DynamicImage::ImageRgb8(rgb).to_rgba8()),
            _ => DynamicImage::ImageRgb8(rgb),
        };
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageOutputFormat::from(format)).unwrap();
        buffer.into_inner()
    }

    fn decode(encoded: &str) -> (ImageFormat, DynamicImage) {
        let bytes = Base64.decode(encoded).unwrap();
        let format = image::guess_format(&bytes).unwrap();
        (format, image::load_from_memory(&bytes).unwrap())
    }

    #[test]
    fn round_trip_preserves_format_and_dimensions() {
        let process = ImageProcess::new();
        for (content_type, format) in [
            ("image/jpeg", ImageFormat::Jpeg),
            ("image/png", ImageFormat::Png),
            ("image/gif", ImageFormat::Gif),
        ] {
            let encoded = process.encode_body(content_type, &sample(format)).unwrap();
            let (decoded_format, decoded) = decode(&encoded);
            assert_eq!(decoded_format, format, "{content_type}");
            assert_eq!(decoded.dimensions(), (17, 9), "{content_type}");
        }
    }

    #[test]
    fn detected_format_wins_over_declared() {
        let process = ImageProcess::new();
        let encoded = process.encode_body("image/jpeg", &sample(ImageFormat::Png)).unwrap();
        let (format, _) = decode(&encoded);
        assert_eq!(format, ImageFormat::Png);
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        let process = ImageProcess::new();
        assert!(process.encode_body("IMAGE/PNG; charset=binary", &sample(ImageFormat::Png)).is_ok());
    }

    #[test]
    fn unsupported_subtype_is_rejected() {
        let process = ImageProcess::new();
        let result = process.encode_body("image/webp", &sample(ImageFormat::Png));
        assert!(matches!(result, Err(ProxyError::EncodingFailed(_))));
        let result = process.encode_body("application/json", b"{}");
        assert!(matches!(result, Err(ProxyError::EncodingFailed(_))));
    }

    #[test]
    fn non_image_and_truncated_input_fail() {
        let process = ImageProcess::new();
        let result = process.encode_body("image/png", b"definitely not an image");
        assert!(matches!(result, Err(ProxyError::EncodingFailed(_))));

        let png = sample(ImageFormat::Png);
        let result = process.encode_body("image/png", &png[..png.len() / 2]);
        assert!(matches!(result, Err(ProxyError::EncodingFailed(_))));

        let result = process.encode_body("image/gif", &[]);
        assert!(matches!(result, Err(ProxyError::EncodingFailed(_))));
    }

    #[test]
    fn rgba_png_keeps_alpha_channel() {
        let rgba = RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 40]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .unwrap();
        let encoded = ImageProcess::new().encode_body("image/png", buffer.get_ref()).unwrap();
        let (_, decoded) = decode(&encoded);
        assert_eq!(decoded.get_pixel(0, 0), image::Rgba([10, 20, 30, 40]));
    }
}
