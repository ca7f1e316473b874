//! Thresholding policy applied to volumetric samples before the log transform.

use super::cube::CubeError;

/// Clamp band `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

/// Which comparison the band is applied with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdMode {
    /// Samples pass through unchanged.
    None,
    /// Band applies to `|v|`, sign preserved.
    Absolute(Band),
    /// Band applies to `v` itself.
    Signed(Band),
}

/// Thresholding mode plus the clip-to-zero switch.
///
/// `clip_to_zero` chooses whether magnitudes that fall short of the band
/// collapse to exactly zero or are raised to the nearer bound. It has no
/// effect when the mode is [`ThresholdMode::None`] or when a signed band
/// straddles zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSpec {
    pub mode: ThresholdMode,
    pub clip_to_zero: bool,
}

impl Default for ThresholdSpec {
    fn default() -> Self {
        Self::none()
    }
}

impl ThresholdSpec {
    pub fn none() -> Self {
        Self {
            mode: ThresholdMode::None,
            clip_to_zero: false,
        }
    }

    /// Absolute-value thresholding with explicit bounds.
    pub fn absolute(min: f64, max: f64, clip_to_zero: bool) -> Result<Self, CubeError> {
        let band = validate_band(min, max, false)?;
        Ok(Self {
            mode: ThresholdMode::Absolute(band),
            clip_to_zero,
        })
    }

    /// Signed thresholding with explicit bounds.
    pub fn signed(min: f64, max: f64, clip_to_zero: bool) -> Result<Self, CubeError> {
        let band = validate_band(min, max, true)?;
        Ok(Self {
            mode: ThresholdMode::Signed(band),
            clip_to_zero,
        })
    }

    /// Band derived as `[isovalue / factor, isovalue * factor]`.
    ///
    /// The derived band goes through the same checks as explicit bounds, so a
    /// negative isovalue (which inverts the band) is rejected in both modes.
    pub fn from_isofactor(
        isovalue: f64,
        factor: f64,
        signed: bool,
        clip_to_zero: bool,
    ) -> Result<Self, CubeError> {
        if isovalue == 0.0 {
            return Err(CubeError::Configuration(
                "'isovalue' cannot be zero".to_string(),
            ));
        }
        if !(factor > 1.0) {
            return Err(CubeError::Configuration(format!(
                "'factor' must be greater than one, got {factor}"
            )));
        }
        if !signed && isovalue < 0.0 {
            return Err(CubeError::Configuration(
                "negative 'isovalue' in absolute thresholding mode".to_string(),
            ));
        }

        let min = isovalue / factor;
        let max = isovalue * factor;
        if signed {
            Self::signed(min, max, clip_to_zero)
        } else {
            Self::absolute(min, max, clip_to_zero)
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.mode, ThresholdMode::None)
    }

    /// Apply the policy to a single sample.
    pub fn apply(&self, v: f64) -> f64 {
        match self.mode {
            ThresholdMode::None => v,
            ThresholdMode::Absolute(band) => clamp_absolute(v, band, self.clip_to_zero),
            ThresholdMode::Signed(band) => clamp_signed(v, band, self.clip_to_zero),
        }
    }
}

fn validate_band(min: f64, max: f64, signed: bool) -> Result<Band, CubeError> {
    if !(min < max) {
        return Err(CubeError::Configuration(format!(
            "'max' ({max}) is not greater than 'min' ({min})"
        )));
    }
    if !signed && min < 0.0 {
        return Err(CubeError::Configuration(format!(
            "negative 'min' ({min}) in absolute thresholding mode"
        )));
    }
    Ok(Band { min, max })
}

/// Magnitude clamp. An exact zero counts as positive when raised to `min`.
fn clamp_absolute(v: f64, band: Band, clip_to_zero: bool) -> f64 {
    let a = v.abs();
    if a > band.max {
        band.max.copysign(v)
    } else if a < band.min {
        if clip_to_zero {
            0.0
        } else if v < 0.0 {
            -band.min
        } else {
            band.min
        }
    } else {
        v
    }
}

fn clamp_signed(v: f64, band: Band, clip_to_zero: bool) -> f64 {
    if band.min > 0.0 {
        if v < band.min {
            if clip_to_zero {
                0.0
            } else {
                band.min
            }
        } else if v > band.max {
            band.max
        } else {
            v
        }
    } else if band.max < 0.0 {
        if v > band.max {
            if clip_to_zero {
                0.0
            } else {
                band.max
            }
        } else if v < band.min {
            band.min
        } else {
            v
        }
    } else if v < band.min {
        band.min
    } else if v > band.max {
        band.max
    } else {
        v
    }
}
