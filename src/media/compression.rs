// ABOUTME: Downscales uploads to a maximum edge length and re-encodes them as JPEG
// ABOUTME: Decoding and encoding run on the blocking pool so request tasks are not stalled
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use tokio::task;

use super::{CompressedImage, CompressionError, ImageCompressor};
use crate::config::ImageConfig;

/// MIME type of everything this compressor produces
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Resize-and-re-encode compressor
#[derive(Debug, Clone, Copy)]
pub struct JpegCompressor {
    max_dimension: u32,
    quality: u8,
}

impl JpegCompressor {
    /// Create a compressor
    #[must_use]
    pub fn new(max_dimension: u32, quality: u8) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    /// Build from configuration
    #[must_use]
    pub fn from_config(config: &ImageConfig) -> Self {
        Self::new(config.max_dimension, config.jpeg_quality)
    }

    /// Synchronous compression
    ///
    /// # Errors
    ///
    /// Returns an error when decoding or encoding fails
    pub fn compress_blocking(&self, bytes: &[u8]) -> Result<CompressedImage, CompressionError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| CompressionError::Decode(e.to_string()))?;

        let (width, height) = decoded.dimensions();
        let resized = if width > self.max_dimension || height > self.max_dimension {
            decoded.resize(self.max_dimension, self.max_dimension, FilterType::Triangle)
        } else {
            decoded
        };

        let flattened = flatten_onto_white(&resized);
        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.quality)
            .encode_image(&DynamicImage::ImageRgb8(flattened))
            .map_err(|e| CompressionError::Encode(e.to_string()))?;

        Ok(CompressedImage {
            bytes: encoded,
            content_type: JPEG_CONTENT_TYPE.to_owned(),
        })
    }
}

/// JPEG has no alpha channel; blend transparent pixels against white
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend =
            |channel: u8| (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8;
        flattened.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    flattened
}

#[async_trait]
impl ImageCompressor for JpegCompressor {
    async fn compress(
        &self,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<CompressedImage, CompressionError> {
        let compressor = *self;
        let owned = bytes.to_vec();
        task::spawn_blocking(move || compressor.compress_blocking(&owned))
            .await
            .map_err(|e| CompressionError::Task(e.to_string()))?
    }
}
