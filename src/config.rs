//! Encode and decode options.

use crate::types::cube::CubeError;
use crate::types::threshold::ThresholdSpec;

pub const DEFAULT_TRUNCATE: u32 = 5;
pub const DEFAULT_COMPRESSION: u32 = 9;
pub const DEFAULT_PRECISION: usize = 5;

/// Upper bound for both `truncate` and `precision`.
pub const MAX_DIGITS: u32 = 15;
pub const MAX_COMPRESSION: u32 = 9;

/// Options for CUBE → archive conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeOptions {
    pub threshold: ThresholdSpec,
    /// Decimals of `log10|v|` kept in the archive.
    pub truncate: u32,
    /// Gzip level.
    pub compression: u32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            threshold: ThresholdSpec::none(),
            truncate: DEFAULT_TRUNCATE,
            compression: DEFAULT_COMPRESSION,
        }
    }
}

impl EncodeOptions {
    pub fn validate(&self) -> Result<(), CubeError> {
        if self.truncate > MAX_DIGITS {
            return Err(CubeError::Configuration(format!(
                "truncation digits must be 0..={MAX_DIGITS}, got {}",
                self.truncate
            )));
        }
        if self.compression > MAX_COMPRESSION {
            return Err(CubeError::Configuration(format!(
                "compression level must be 0..={MAX_COMPRESSION}, got {}",
                self.compression
            )));
        }
        Ok(())
    }
}

/// Options for archive → CUBE conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Mantissa decimals written per volumetric value.
    pub precision: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}

impl DecodeOptions {
    pub fn validate(&self) -> Result<(), CubeError> {
        if self.precision > MAX_DIGITS as usize {
            return Err(CubeError::Configuration(format!(
                "precision must be 0..={MAX_DIGITS}, got {}",
                self.precision
            )));
        }
        Ok(())
    }
}
