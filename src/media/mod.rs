// ABOUTME: Image preprocessing applied to uploads before vision calls and storage
// ABOUTME: ImageCompressor seam plus the JPEG downscaling implementation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

/// JPEG downscaling compressor
pub mod compression;

use async_trait::async_trait;
use thiserror::Error;

pub use compression::JpegCompressor;

/// Compression failure; callers fall back to the original bytes
#[derive(Debug, Error)]
pub enum CompressionError {
    /// Input could not be decoded as an image
    #[error("could not decode image: {0}")]
    Decode(String),
    /// Re-encoding failed
    #[error("could not encode image: {0}")]
    Encode(String),
    /// Worker thread failed
    #[error("compression task failed: {0}")]
    Task(String),
}

/// Bytes ready for the vision call and for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    /// Encoded image
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub content_type: String,
}

/// Shrinks uploaded images
#[async_trait]
pub trait ImageCompressor: Send + Sync {
    /// Compress one image
    ///
    /// # Errors
    ///
    /// Returns an error when the input cannot be decoded or re-encoded
    async fn compress(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<CompressedImage, CompressionError>;
}
