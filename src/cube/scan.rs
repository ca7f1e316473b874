//! Scientific-notation scanner for the volumetric block.
//!
//! Matches `-?D.D*[eEdD][+-]D+` anywhere in the text, leftmost first and
//! without overlap, so values run together or split across lines arbitrarily
//! are all picked up in order. Fortran `D` exponents are accepted.

use ndarray::{ArrayD, IxDyn};

use crate::types::cube::{CubeError, Dims, Field};

/// Lazy iterator over the scientific-notation literals in a text.
pub struct SciTokens<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SciTokens<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    /// Length of the literal starting at `start`, if one does.
    fn match_at(&self, start: usize) -> Option<usize> {
        let b = self.bytes;
        let mut i = start;
        if b.get(i) == Some(&b'-') {
            i += 1;
        }
        if !b.get(i)?.is_ascii_digit() {
            return None;
        }
        i += 1;
        if *b.get(i)? != b'.' {
            return None;
        }
        i += 1;
        while b.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if !matches!(*b.get(i)?, b'e' | b'E' | b'd' | b'D') {
            return None;
        }
        i += 1;
        if !matches!(*b.get(i)?, b'+' | b'-') {
            return None;
        }
        i += 1;
        let exp_start = i;
        while b.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
        Some(i - start)
    }
}

impl<'a> Iterator for SciTokens<'a> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        while self.pos < self.bytes.len() {
            let start = self.pos;
            if let Some(len) = self.match_at(start) {
                self.pos = start + len;
                return Some(literal_value(&self.bytes[start..start + len]));
            }
            self.pos += 1;
        }
        None
    }
}

/// Value of a matched literal. The grammar guarantees it parses once a
/// Fortran exponent marker is normalised.
fn literal_value(literal: &[u8]) -> f64 {
    let text: String = literal
        .iter()
        .map(|&c| match c {
            b'd' | b'D' => 'e',
            other => other as char,
        })
        .collect();
    text.parse().unwrap_or(f64::NAN)
}

/// Shortest possible literal, `0.e+0`.
const MIN_LITERAL_LEN: usize = 5;

/// Read exactly `dims.count()` samples from `input` into a row-major grid.
pub fn scan_samples(input: &str, dims: &Dims) -> Result<ArrayD<f64>, CubeError> {
    let count = dims.count()?;
    let mut tokens = SciTokens::new(input);
    let mut values = Vec::with_capacity(count.min(input.len() / MIN_LITERAL_LEN));
    for _ in 0..count {
        let v = tokens.next().ok_or(CubeError::PrematureExhaustion {
            field: Field::LogData,
        })?;
        values.push(v);
    }
    if tokens.next().is_some() {
        return Err(CubeError::SuperfluousData {
            field: Field::LogData,
        });
    }

    ArrayD::from_shape_vec(IxDyn(dims.as_slice()), values).map_err(|e| {
        CubeError::Configuration(format!("sample grid reshape failed: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<f64> {
        SciTokens::new(text).collect()
    }

    #[test]
    fn picks_literals_across_lines() {
        let values = scan("  1.00000E-01 -2.50000E+00\n  3.0e+01\n-4.E-02\n");
        assert_eq!(values, vec![0.1, -2.5, 30.0, -0.04]);
    }

    #[test]
    fn accepts_fortran_exponents() {
        assert_eq!(scan("1.5D+02 -2.0d-01"), vec![150.0, -0.2]);
    }

    #[test]
    fn skips_non_matching_text() {
        // Plain decimals, integers and unsigned exponents are not literals.
        assert_eq!(scan("1.0 42 1.0e5 x"), Vec::<f64>::new());
    }

    #[test]
    fn leftmost_match_inside_longer_number() {
        // Only one digit may precede the point, so the match starts late.
        assert_eq!(scan("12.5E+01"), vec![25.0]);
    }

    #[test]
    fn adjacent_literals() {
        assert_eq!(scan("1.0E+00-2.0E+00"), vec![1.0, -2.0]);
    }

    #[test]
    fn three_digit_exponent() {
        assert_eq!(scan(" -7.457E+103"), vec![-7.457e103]);
    }

    #[test]
    fn exact_count_enforced() {
        let dims = Dims(vec![1, 2, 2]);
        let grid = scan_samples("1.0E+00 2.0E+00\n3.0E+00 4.0E+00\n", &dims).unwrap();
        assert_eq!(grid.shape(), &[1, 2, 2]);
        assert_eq!(grid[&[0, 1, 0][..]], 3.0);

        let err = scan_samples("1.0E+00 2.0E+00 3.0E+00", &dims).unwrap_err();
        assert!(matches!(
            err,
            CubeError::PrematureExhaustion {
                field: Field::LogData
            }
        ));

        let err = scan_samples("1.0E+00 2.0E+00 3.0E+00 4.0E+00 5.0E+00", &dims).unwrap_err();
        assert!(matches!(
            err,
            CubeError::SuperfluousData {
                field: Field::LogData
            }
        ));
    }

    #[test]
    fn huge_grid_with_little_data_is_exhaustion() {
        let dims = Dims(vec![100_000, 100_000, 100_000]);
        let err = scan_samples("  1.00000E+00\n", &dims).unwrap_err();
        assert!(matches!(
            err,
            CubeError::PrematureExhaustion {
                field: Field::LogData
            }
        ));

        let dims = Dims(vec![4_000_000_000, 4_000_000_000, 4_000_000_000]);
        let err = scan_samples("  1.00000E+00\n", &dims).unwrap_err();
        assert_eq!(err.field(), Some(Field::LogData));
    }
}
