//! In-process image conversion.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::types::{ConversionRequest, MediaFamily};
use crate::{Converter, Error, Result};

/// Converter for raster image formats.
///
/// Decodes the input in memory, flattens it to three-channel RGB (alpha is
/// dropped), and re-encodes in the target format. No subprocess is involved;
/// the CPU-bound work runs on the blocking pool.
pub struct ImageConverter;

impl ImageConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Converter for ImageConverter {
    fn family(&self) -> MediaFamily {
        MediaFamily::Image
    }

    async fn convert(&self, input: Bytes, request: &ConversionRequest) -> Result<Bytes> {
        let target = request.output_format.clone();
        debug!(output_format = %target, "converting image");

        tokio::task::spawn_blocking(move || encode_image(&input, &target))
            .await
            .map_err(|e| Error::encode_failed(format!("image task panicked: {}", e)))?
    }
}

/// Decode, normalize to RGB, and re-encode in the target format.
fn encode_image(data: &[u8], target: &str) -> Result<Bytes> {
    let format = ImageFormat::from_extension(target)
        .ok_or_else(|| Error::encode_failed(format!("no image encoder for '{}'", target)))?;

    let img = image::load_from_memory(data).map_err(|e| Error::decode_failed(e.to_string()))?;

    // Flatten to three channels so formats without alpha (jpeg, bmp) encode.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, format)
        .map_err(|e| Error::encode_failed(e.to_string()))?;

    Ok(Bytes::from(out.into_inner()))
}
