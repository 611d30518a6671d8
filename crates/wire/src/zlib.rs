//! Zlib packet compression context.
//!
//! Payloads at or above the negotiated threshold are deflated at a fixed
//! level; smaller payloads pass through untouched. Level semantics follow
//! the classic zlib constants: `-1` is the library-default sentinel, `0`
//! stores without compressing, `9` compresses hardest.

use crate::error::{Result, WireError};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Sentinel for the zlib default level.
pub const DEFAULT_COMPRESSION: i32 = -1;
/// Lowest valid level; stores without compressing.
pub const NO_COMPRESSION: i32 = 0;
/// Highest valid level.
pub const BEST_COMPRESSION: i32 = 9;

/// Check whether `level` is acceptable for a compressor: either the default
/// sentinel or within the valid zlib range.
pub fn is_valid_level(level: i32) -> bool {
    level == DEFAULT_COMPRESSION || (NO_COMPRESSION..=BEST_COMPRESSION).contains(&level)
}

/// Compression context holding the negotiated threshold and level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionContext {
    threshold: usize,
    level: u32,
}

impl CompressionContext {
    pub fn new(threshold: usize, level: u32) -> Self {
        Self { threshold, level }
    }

    /// Whether a payload of `data_len` bytes should be compressed.
    pub fn should_compress(&self, data_len: usize) -> bool {
        data_len >= self.threshold
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Deflate `data` at the configured level.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| WireError::compression_error(&format!("zlib compression failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| WireError::compression_error(&format!("zlib compression failed: {}", e)))
    }

    /// Inflate `data`, checking the result against the announced size.
    pub fn decompress(&self, data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data).take(expected_size as u64 + 1);
        let mut output = Vec::with_capacity(expected_size);
        decoder.read_to_end(&mut output).map_err(|e| {
            WireError::compression_error(&format!("zlib decompression failed: {}", e))
        })?;
        if output.len() != expected_size {
            return Err(WireError::compression_error(&format!(
                "zlib decompression size mismatch: expected {}, got {}",
                expected_size,
                output.len()
            )));
        }
        Ok(output)
    }
}
