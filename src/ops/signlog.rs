//! Sign/log decomposition of volumetric samples.
//!
//! Each sample `v` is stored as `sign(v)` and `log10(|v|)`. Thresholding is
//! applied to `v` before the split, and signs are taken from the thresholded
//! value, so a sample clipped to zero stores a zero sign.

use ndarray::{ArrayD, Zip};

use crate::types::cube::SampleArrays;
use crate::types::threshold::ThresholdSpec;

/// Split `values` into signs and log magnitudes, reusing its buffer for the
/// logarithms.
///
/// Zero samples (after thresholding) store sign 0 and log magnitude 0.
pub fn decompose(mut values: ArrayD<f64>, threshold: &ThresholdSpec) -> SampleArrays {
    if threshold.is_active() {
        values.mapv_inplace(|v| threshold.apply(v));
    }

    let signs = values.mapv(sign_of);
    values.mapv_inplace(log_magnitude);

    log::debug!(
        "decomposed {} samples ({:?}), {} zero",
        values.len(),
        threshold.mode,
        signs.iter().filter(|&&s| s == 0).count()
    );

    SampleArrays {
        signs,
        log_magnitude: values,
    }
}

/// Rebuild samples as `sign * 10^log_magnitude`.
///
/// Positions with sign 0 come back as exactly `0.0` whatever their stored
/// log magnitude.
pub fn recompose(samples: &SampleArrays) -> ArrayD<f64> {
    Zip::from(&samples.signs)
        .and(&samples.log_magnitude)
        .map_collect(|&s, &lg| match s {
            0 => 0.0,
            s => f64::from(s) * 10f64.powf(lg),
        })
}

fn sign_of(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// `log10(|v|)`, with zero mapped to 0 and any `-inf` forced to 0.
fn log_magnitude(v: f64) -> f64 {
    let a = if v == 0.0 { 1.0 } else { v.abs() };
    let lg = a.log10();
    if lg == f64::NEG_INFINITY {
        0.0
    } else {
        lg
    }
}
