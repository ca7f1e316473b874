//! Lightweight MessagePack value tree, decoder and write helpers.

use std::io::{Cursor, Read};

use super::error::ArchiveError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MsgVal {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<MsgVal>),
    Map(Vec<(MsgVal, MsgVal)>),
}

impl MsgVal {
    pub(crate) fn as_str(&self) -> Option<&str> {
        match self {
            MsgVal::Str(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            MsgVal::Int(v) => Some(*v),
            MsgVal::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            MsgVal::F64(v) => Some(*v),
            MsgVal::F32(v) => Some(*v as f64),
            MsgVal::Int(v) => Some(*v as f64),
            MsgVal::Uint(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub(crate) fn as_array(&self) -> Option<&[MsgVal]> {
        match self {
            MsgVal::Array(a) => Some(a),
            _ => None,
        }
    }

    pub(crate) fn as_bin(&self) -> Option<&[u8]> {
        match self {
            MsgVal::Bin(b) => Some(b),
            _ => None,
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&MsgVal> {
        match self {
            MsgVal::Map(pairs) => pairs.iter().find_map(|(k, v)| match k {
                MsgVal::Str(s) if s == key => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

pub(crate) fn decode_msgpack(data: &[u8]) -> Result<MsgVal, ArchiveError> {
    let mut cursor = Cursor::new(data);
    let value = read_value(&mut cursor)?;
    if (cursor.position() as usize) != data.len() {
        return Err(ArchiveError::InvalidFormat(format!(
            "{} trailing bytes after msgpack document",
            data.len() - cursor.position() as usize
        )));
    }
    Ok(value)
}

fn read_bytes<const N: usize>(rd: &mut Cursor<&[u8]>) -> Result<[u8; N], ArchiveError> {
    let mut buf = [0u8; N];
    rd.read_exact(&mut buf)
        .map_err(|e| ArchiveError::InvalidFormat(format!("msgpack read {N} bytes: {e}")))?;
    Ok(buf)
}

macro_rules! be {
    ($rd:expr, $t:ty) => {
        <$t>::from_be_bytes(read_bytes($rd)?)
    };
}

/// Big-endian length prefix of `N` bytes, bounded by the remaining input.
fn read_len<const N: usize>(rd: &mut Cursor<&[u8]>) -> Result<usize, ArchiveError> {
    let len = read_bytes::<N>(rd)?
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);
    checked_len(rd, len)
}

/// Every element takes at least one byte, so no length can exceed what is left.
fn checked_len(rd: &Cursor<&[u8]>, len: usize) -> Result<usize, ArchiveError> {
    let remaining = rd.get_ref().len().saturating_sub(rd.position() as usize);
    if len > remaining {
        return Err(ArchiveError::InvalidFormat(format!(
            "msgpack length {len} exceeds remaining {remaining} bytes"
        )));
    }
    Ok(len)
}

#[derive(Debug, Clone, Copy)]
enum Container {
    Str,
    Bin,
    Array,
    Map,
}

fn read_value(rd: &mut Cursor<&[u8]>) -> Result<MsgVal, ArchiveError> {
    use rmp::Marker;

    let marker = rmp::decode::read_marker(rd)
        .map_err(|e| ArchiveError::InvalidFormat(format!("msgpack marker: {e:?}")))?;
    if let Some(value) = read_scalar(rd, marker)? {
        return Ok(value);
    }

    let (kind, len) = match marker {
        Marker::FixStr(n) => (Container::Str, checked_len(rd, n as usize)?),
        Marker::Str8 => (Container::Str, read_len::<1>(rd)?),
        Marker::Str16 => (Container::Str, read_len::<2>(rd)?),
        Marker::Str32 => (Container::Str, read_len::<4>(rd)?),
        Marker::Bin8 => (Container::Bin, read_len::<1>(rd)?),
        Marker::Bin16 => (Container::Bin, read_len::<2>(rd)?),
        Marker::Bin32 => (Container::Bin, read_len::<4>(rd)?),
        Marker::FixArray(n) => (Container::Array, checked_len(rd, n as usize)?),
        Marker::Array16 => (Container::Array, read_len::<2>(rd)?),
        Marker::Array32 => (Container::Array, read_len::<4>(rd)?),
        Marker::FixMap(n) => (Container::Map, checked_len(rd, n as usize)?),
        Marker::Map16 => (Container::Map, read_len::<2>(rd)?),
        Marker::Map32 => (Container::Map, read_len::<4>(rd)?),
        other => {
            return Err(ArchiveError::InvalidFormat(format!(
                "unsupported msgpack marker: {other:?}"
            )));
        }
    };

    match kind {
        Container::Str => String::from_utf8(take(rd, len)?)
            .map(MsgVal::Str)
            .map_err(|e| ArchiveError::InvalidFormat(format!("msgpack string utf8: {e}"))),
        Container::Bin => take(rd, len).map(MsgVal::Bin),
        Container::Array => (0..len)
            .map(|_| read_value(rd))
            .collect::<Result<_, _>>()
            .map(MsgVal::Array),
        Container::Map => (0..len)
            .map(|_| Ok::<_, ArchiveError>((read_value(rd)?, read_value(rd)?)))
            .collect::<Result<_, _>>()
            .map(MsgVal::Map),
    }
}

/// Nil, booleans and numbers; `None` for container markers.
fn read_scalar(
    rd: &mut Cursor<&[u8]>,
    marker: rmp::Marker,
) -> Result<Option<MsgVal>, ArchiveError> {
    use rmp::Marker;

    let value = match marker {
        Marker::Null => MsgVal::Nil,
        Marker::True => MsgVal::Bool(true),
        Marker::False => MsgVal::Bool(false),
        Marker::FixPos(v) => MsgVal::Uint(v.into()),
        Marker::FixNeg(v) => MsgVal::Int(v.into()),
        Marker::U8 => MsgVal::Uint(be!(rd, u8).into()),
        Marker::U16 => MsgVal::Uint(be!(rd, u16).into()),
        Marker::U32 => MsgVal::Uint(be!(rd, u32).into()),
        Marker::U64 => MsgVal::Uint(be!(rd, u64)),
        Marker::I8 => MsgVal::Int(be!(rd, i8).into()),
        Marker::I16 => MsgVal::Int(be!(rd, i16).into()),
        Marker::I32 => MsgVal::Int(be!(rd, i32).into()),
        Marker::I64 => MsgVal::Int(be!(rd, i64)),
        Marker::F32 => MsgVal::F32(be!(rd, f32)),
        Marker::F64 => MsgVal::F64(be!(rd, f64)),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn take(rd: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>, ArchiveError> {
    let mut buf = vec![0u8; len];
    rd.read_exact(&mut buf)
        .map_err(|e| ArchiveError::InvalidFormat(format!("msgpack read {len} bytes: {e}")))?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

pub(crate) fn encode_msgpack(value: &MsgVal) -> Result<Vec<u8>, ArchiveError> {
    let mut out = Vec::new();
    write_value(&mut out, value)?;
    Ok(out)
}

fn encode_err<E: std::fmt::Display>(e: E) -> ArchiveError {
    ArchiveError::Encode(e.to_string())
}

fn write_value(out: &mut Vec<u8>, value: &MsgVal) -> Result<(), ArchiveError> {
    use rmp::encode;

    match value {
        MsgVal::Nil => encode::write_nil(out).map_err(encode_err)?,
        MsgVal::Bool(b) => encode::write_bool(out, *b).map_err(encode_err)?,
        MsgVal::Int(v) => {
            encode::write_sint(out, *v).map_err(encode_err)?;
        }
        MsgVal::Uint(v) => {
            encode::write_uint(out, *v).map_err(encode_err)?;
        }
        MsgVal::F32(v) => encode::write_f32(out, *v).map_err(encode_err)?,
        MsgVal::F64(v) => encode::write_f64(out, *v).map_err(encode_err)?,
        MsgVal::Str(s) => encode::write_str(out, s).map_err(encode_err)?,
        MsgVal::Bin(b) => encode::write_bin(out, b).map_err(encode_err)?,
        MsgVal::Array(items) => {
            encode::write_array_len(out, len_u32(items.len())?).map_err(encode_err)?;
            for item in items {
                write_value(out, item)?;
            }
        }
        MsgVal::Map(pairs) => {
            encode::write_map_len(out, len_u32(pairs.len())?).map_err(encode_err)?;
            for (k, v) in pairs {
                write_value(out, k)?;
                write_value(out, v)?;
            }
        }
    }
    Ok(())
}

fn len_u32(len: usize) -> Result<u32, ArchiveError> {
    u32::try_from(len).map_err(|_| ArchiveError::Encode(format!("length {len} exceeds u32")))
}

/// Build a string-keyed map.
pub(crate) fn map(pairs: Vec<(&str, MsgVal)>) -> MsgVal {
    MsgVal::Map(
        pairs
            .into_iter()
            .map(|(k, v)| (MsgVal::Str(k.to_string()), v))
            .collect(),
    )
}
