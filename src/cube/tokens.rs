//! Line and field readers for the CUBE header.
//!
//! Every header field is read with [`Fields::next_field`] and closed with
//! [`Fields::expect_exhausted`], so each line must carry exactly the number
//! of values its field calls for.

use std::str::FromStr;

use crate::types::cube::{CubeError, Field};

/// Sequential reader over the lines of a CUBE text.
///
/// Line terminators (`\n` or `\r\n`) are stripped. The unread tail stays
/// available through [`LineReader::remainder`] for the volumetric scanner.
pub struct LineReader<'a> {
    rest: &'a str,
    line_no: usize,
}

impl<'a> LineReader<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            rest: input,
            line_no: 0,
        }
    }

    /// Next line, or `PrematureExhaustion` naming `field` at end of input.
    pub fn next_line(&mut self, field: Field) -> Result<&'a str, CubeError> {
        if self.rest.is_empty() {
            return Err(CubeError::PrematureExhaustion { field });
        }
        let (line, rest) = match self.rest.find('\n') {
            Some(i) => (&self.rest[..i], &self.rest[i + 1..]),
            None => (self.rest, ""),
        };
        self.rest = rest;
        self.line_no += 1;
        Ok(line.strip_suffix('\r').unwrap_or(line))
    }

    /// Next line split into whitespace-delimited fields.
    pub fn next_fields(&mut self, field: Field) -> Result<Fields<'a>, CubeError> {
        self.next_line(field).map(Fields::new)
    }

    /// Number of lines consumed so far.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Everything not yet consumed.
    pub fn remainder(&self) -> &'a str {
        self.rest
    }
}

/// Whitespace-delimited fields of one line.
pub struct Fields<'a> {
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            inner: line.split_whitespace(),
        }
    }

    /// Next raw token, or `PrematureExhaustion` naming `field`.
    pub fn next_field(&mut self, field: Field) -> Result<&'a str, CubeError> {
        self.inner
            .next()
            .ok_or(CubeError::PrematureExhaustion { field })
    }

    /// Next token parsed as `T`.
    pub fn next_parsed<T: FromStr>(&mut self, field: Field) -> Result<T, CubeError> {
        let token = self.next_field(field)?;
        parse_token(token, field)
    }

    /// Next `N` tokens parsed as floats.
    pub fn next_floats<const N: usize>(&mut self, field: Field) -> Result<[f64; N], CubeError> {
        let mut out = [0.0; N];
        for slot in out.iter_mut() {
            *slot = self.next_parsed(field)?;
        }
        Ok(out)
    }

    /// Raw next token, without any exhaustion error.
    pub fn try_next(&mut self) -> Option<&'a str> {
        self.inner.next()
    }

    /// Fail with `SuperfluousData` if any token remains.
    pub fn expect_exhausted(mut self, field: Field) -> Result<(), CubeError> {
        match self.inner.next() {
            Some(_) => Err(CubeError::SuperfluousData { field }),
            None => Ok(()),
        }
    }
}

pub(crate) fn parse_token<T: FromStr>(token: &str, field: Field) -> Result<T, CubeError> {
    token.parse().map_err(|_| CubeError::InvalidNumber {
        field,
        token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_strip_terminators() {
        let mut lines = LineReader::new("one\r\ntwo\nthree");
        assert_eq!(lines.next_line(Field::Comment1).unwrap(), "one");
        assert_eq!(lines.next_line(Field::Comment2).unwrap(), "two");
        assert_eq!(lines.remainder(), "three");
        assert_eq!(lines.next_line(Field::Origin).unwrap(), "three");
        assert_eq!(lines.line_no(), 3);

        let err = lines.next_line(Field::XAxis).unwrap_err();
        assert!(matches!(
            err,
            CubeError::PrematureExhaustion {
                field: Field::XAxis
            }
        ));
    }

    #[test]
    fn blank_lines_are_lines() {
        let mut lines = LineReader::new("\n\nx\n");
        assert_eq!(lines.next_line(Field::Comment1).unwrap(), "");
        assert_eq!(lines.next_line(Field::Comment2).unwrap(), "");
        assert_eq!(lines.next_line(Field::Origin).unwrap(), "x");
        assert!(lines.next_line(Field::Origin).is_err());
    }

    #[test]
    fn fields_exact_count() {
        let mut fields = Fields::new("  1.0   2.0 3.0 ");
        let xyz: [f64; 3] = fields.next_floats(Field::Origin).unwrap();
        assert_eq!(xyz, [1.0, 2.0, 3.0]);
        assert!(fields.expect_exhausted(Field::Origin).is_ok());
    }

    #[test]
    fn fields_short_and_long() {
        let mut fields = Fields::new("1.0 2.0");
        let err = fields.next_floats::<3>(Field::Origin).unwrap_err();
        assert!(matches!(
            err,
            CubeError::PrematureExhaustion {
                field: Field::Origin
            }
        ));

        let mut fields = Fields::new("1.0 2.0 3.0 4.0");
        fields.next_floats::<3>(Field::Origin).unwrap();
        let err = fields.expect_exhausted(Field::Origin).unwrap_err();
        assert!(matches!(
            err,
            CubeError::SuperfluousData {
                field: Field::Origin
            }
        ));
    }

    #[test]
    fn bad_number_names_token() {
        let mut fields = Fields::new("abc");
        let err = fields.next_parsed::<i64>(Field::Natoms).unwrap_err();
        match err {
            CubeError::InvalidNumber { field, token } => {
                assert_eq!(field, Field::Natoms);
                assert_eq!(token, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
