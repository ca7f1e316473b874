//! Column encodings: byte packing, fixed-point scaling and delta coding.
//!
//! A dataset records the encodings it went through in application order.
//! Decoding walks that list backwards.

use super::error::ArchiveError;
use super::msgpack::{map, MsgVal};

const TYPE_I8: i64 = 1;
const TYPE_I64: i64 = 7;
const TYPE_F64: i64 = 33;

/// Largest scaled magnitude accepted by fixed-point encoding.
const FIXED_POINT_LIMIT: f64 = 9.0e18;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Encoding {
    ByteArray { type_code: i64 },
    FixedPoint { factor: f64 },
    Delta { origin: i64 },
}

impl Encoding {
    pub(crate) fn to_msg(self) -> MsgVal {
        match self {
            Encoding::ByteArray { type_code } => map(vec![
                ("kind", MsgVal::Str("ByteArray".into())),
                ("type", MsgVal::Int(type_code)),
            ]),
            Encoding::FixedPoint { factor } => map(vec![
                ("kind", MsgVal::Str("FixedPoint".into())),
                ("factor", MsgVal::F64(factor)),
            ]),
            Encoding::Delta { origin } => map(vec![
                ("kind", MsgVal::Str("Delta".into())),
                ("origin", MsgVal::Int(origin)),
            ]),
        }
    }

    pub(crate) fn from_msg(value: &MsgVal) -> Result<Self, ArchiveError> {
        let kind = value
            .get("kind")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ArchiveError::InvalidFormat("encoding missing 'kind'".into()))?;

        match kind {
            "ByteArray" => {
                let type_code = value
                    .get("type")
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| ArchiveError::InvalidFormat("ByteArray missing 'type'".into()))?;
                Ok(Encoding::ByteArray { type_code })
            }
            "FixedPoint" => {
                let factor = value
                    .get("factor")
                    .and_then(|v| v.as_f64())
                    .ok_or_else(|| {
                        ArchiveError::InvalidFormat("FixedPoint missing 'factor'".into())
                    })?;
                if !(factor.is_finite() && factor > 0.0) {
                    return Err(ArchiveError::InvalidFormat(format!(
                        "FixedPoint factor {factor} is not positive"
                    )));
                }
                Ok(Encoding::FixedPoint { factor })
            }
            "Delta" => {
                let origin = value.get("origin").and_then(|v| v.as_i64()).unwrap_or(0);
                Ok(Encoding::Delta { origin })
            }
            other => Err(ArchiveError::InvalidFormat(format!(
                "unsupported encoding: {other}"
            ))),
        }
    }
}

/// A column at some stage of the encoding chain.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColData {
    Bytes(Vec<u8>),
    I8(Vec<i8>),
    I64(Vec<i64>),
    F64(Vec<f64>),
}

impl ColData {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ColData::Bytes(_) => "bytes",
            ColData::I8(_) => "int8",
            ColData::I64(_) => "int64",
            ColData::F64(_) => "float64",
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Pack a typed column into little-endian bytes.
pub(crate) fn encode_byte_array(data: &ColData) -> Result<(Vec<u8>, Encoding), ArchiveError> {
    let (bytes, type_code) = match data {
        ColData::I8(v) => (v.iter().map(|&x| x as u8).collect(), TYPE_I8),
        ColData::I64(v) => (v.iter().flat_map(|x| x.to_le_bytes()).collect(), TYPE_I64),
        ColData::F64(v) => (v.iter().flat_map(|x| x.to_le_bytes()).collect(), TYPE_F64),
        ColData::Bytes(_) => {
            return Err(ArchiveError::Encode("column is already packed".into()));
        }
    };
    Ok((bytes, Encoding::ByteArray { type_code }))
}

/// Scale by `factor` and round to integers.
///
/// Returns `None` if any value is non-finite or too large once scaled.
pub(crate) fn encode_fixed_point(values: &[f64], factor: f64) -> Option<(Vec<i64>, Encoding)> {
    let ints = values
        .iter()
        .map(|&v| {
            let scaled = (v * factor).round();
            (scaled.is_finite() && scaled.abs() < FIXED_POINT_LIMIT).then_some(scaled as i64)
        })
        .collect::<Option<Vec<i64>>>()?;
    Some((ints, Encoding::FixedPoint { factor }))
}

/// Replace each value with its difference from the previous one.
pub(crate) fn encode_delta_i64(values: &mut [i64]) -> Encoding {
    let origin = values.first().copied().unwrap_or(0);
    for i in (1..values.len()).rev() {
        values[i] = values[i].wrapping_sub(values[i - 1]);
    }
    if let Some(first) = values.first_mut() {
        *first = 0;
    }
    Encoding::Delta { origin }
}

pub(crate) fn encode_delta_i8(values: &mut [i8]) -> Encoding {
    let origin = values.first().copied().unwrap_or(0);
    for i in (1..values.len()).rev() {
        values[i] = values[i].wrapping_sub(values[i - 1]);
    }
    if let Some(first) = values.first_mut() {
        *first = 0;
    }
    Encoding::Delta {
        origin: origin as i64,
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Undo `encodings` (listed in application order) on a packed column.
pub(crate) fn decode_chain(data: ColData, encodings: &[Encoding]) -> Result<ColData, ArchiveError> {
    let mut current = data;
    for enc in encodings.iter().rev() {
        current = decode_step(current, enc)?;
    }
    Ok(current)
}

fn decode_step(data: ColData, enc: &Encoding) -> Result<ColData, ArchiveError> {
    match (enc, data) {
        (Encoding::ByteArray { type_code }, ColData::Bytes(bytes)) => {
            decode_byte_array(&bytes, *type_code)
        }
        (Encoding::FixedPoint { factor }, ColData::I64(ints)) => Ok(ColData::F64(
            ints.into_iter().map(|v| v as f64 / factor).collect(),
        )),
        (Encoding::Delta { origin }, ColData::I64(mut ints)) => {
            if let Some(first) = ints.first_mut() {
                *first = first.wrapping_add(*origin);
            }
            for i in 1..ints.len() {
                ints[i] = ints[i].wrapping_add(ints[i - 1]);
            }
            Ok(ColData::I64(ints))
        }
        (Encoding::Delta { origin }, ColData::I8(mut ints)) => {
            if let Some(first) = ints.first_mut() {
                *first = first.wrapping_add(*origin as i8);
            }
            for i in 1..ints.len() {
                ints[i] = ints[i].wrapping_add(ints[i - 1]);
            }
            Ok(ColData::I8(ints))
        }
        (enc, data) => Err(ArchiveError::InvalidFormat(format!(
            "{:?} cannot decode a {} column",
            enc,
            data.kind()
        ))),
    }
}

fn decode_byte_array(bytes: &[u8], type_code: i64) -> Result<ColData, ArchiveError> {
    let width = match type_code {
        TYPE_I8 => 1,
        TYPE_I64 | TYPE_F64 => 8,
        other => {
            return Err(ArchiveError::InvalidFormat(format!(
                "unsupported ByteArray type: {other}"
            )))
        }
    };
    if bytes.len() % width != 0 {
        return Err(ArchiveError::InvalidFormat(format!(
            "ByteArray length {} is not a multiple of {width}",
            bytes.len()
        )));
    }

    let chunk8 = |c: &[u8]| {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(c);
        buf
    };
    Ok(match type_code {
        TYPE_I8 => ColData::I8(bytes.iter().map(|&b| b as i8).collect()),
        TYPE_I64 => ColData::I64(
            bytes
                .chunks_exact(8)
                .map(|c| i64::from_le_bytes(chunk8(c)))
                .collect(),
        ),
        _ => ColData::F64(
            bytes
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes(chunk8(c)))
                .collect(),
        ),
    })
}
