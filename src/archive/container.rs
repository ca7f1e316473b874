//! `.cubez` container: a gzipped MessagePack document of named datasets.
//!
//! ```text
//! { "format": "CUBEZ", "version": 1,
//!   "datasets": [ { "name", "shape", "text" | ("data", "encoding") }, ... ] }
//! ```

use std::io::{Read, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{ArrayD, IxDyn};

use super::encoding::{
    decode_chain, encode_byte_array, encode_delta_i64, encode_delta_i8, encode_fixed_point,
    ColData, Encoding,
};
use super::error::ArchiveError;
use super::msgpack::{decode_msgpack, encode_msgpack, map, MsgVal};

pub const FORMAT_NAME: &str = "CUBEZ";
pub const FORMAT_VERSION: i64 = 1;

/// Contents of one named dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetValue {
    Text(String),
    Int8(ArrayD<i8>),
    Int64(ArrayD<i64>),
    Float64(ArrayD<f64>),
}

impl DatasetValue {
    pub fn kind(&self) -> &'static str {
        match self {
            DatasetValue::Text(_) => "text",
            DatasetValue::Int8(_) => "int8",
            DatasetValue::Int64(_) => "int64",
            DatasetValue::Float64(_) => "float64",
        }
    }

    fn shape(&self) -> &[usize] {
        match self {
            DatasetValue::Text(_) => &[],
            DatasetValue::Int8(a) => a.shape(),
            DatasetValue::Int64(a) => a.shape(),
            DatasetValue::Float64(a) => a.shape(),
        }
    }
}

/// Storage filters for a dataset.
///
/// `truncate` rounds float data to that many decimals before storage;
/// `delta` stores successive differences of integer data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filters {
    pub truncate: Option<u32>,
    pub delta: bool,
}

impl Filters {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn delta() -> Self {
        Self {
            truncate: None,
            delta: true,
        }
    }

    pub fn truncated(decimals: u32) -> Self {
        Self {
            truncate: Some(decimals),
            delta: true,
        }
    }
}

/// Accumulates datasets and serializes them into a compressed archive.
pub struct ArchiveWriter {
    compression: u32,
    names: Vec<String>,
    datasets: Vec<MsgVal>,
}

impl ArchiveWriter {
    /// `compression` is a gzip level, 0 to 9.
    pub fn new(compression: u32) -> Self {
        Self {
            compression: compression.min(9),
            names: Vec::new(),
            datasets: Vec::new(),
        }
    }

    pub fn add(
        &mut self,
        name: &str,
        value: &DatasetValue,
        filters: Filters,
    ) -> Result<(), ArchiveError> {
        if self.names.iter().any(|n| n == name) {
            return Err(ArchiveError::Encode(format!("duplicate dataset '{name}'")));
        }

        let shape = MsgVal::Array(
            value
                .shape()
                .iter()
                .map(|&d| MsgVal::Uint(d as u64))
                .collect(),
        );
        let mut entry = vec![("name", MsgVal::Str(name.to_string())), ("shape", shape)];

        match value {
            DatasetValue::Text(text) => entry.push(("text", MsgVal::Str(text.clone()))),
            other => {
                let (bytes, encodings) = encode_column(name, other, filters)?;
                entry.push(("data", MsgVal::Bin(bytes)));
                entry.push((
                    "encoding",
                    MsgVal::Array(encodings.into_iter().map(Encoding::to_msg).collect()),
                ));
            }
        }

        self.names.push(name.to_string());
        self.datasets.push(map(entry));
        Ok(())
    }

    /// Serialize and gzip everything added so far.
    pub fn finish(self) -> Result<Vec<u8>, ArchiveError> {
        let root = map(vec![
            ("format", MsgVal::Str(FORMAT_NAME.into())),
            ("version", MsgVal::Int(FORMAT_VERSION)),
            ("datasets", MsgVal::Array(self.datasets)),
        ]);
        let packed = encode_msgpack(&root)?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.compression));
        encoder.write_all(&packed)?;
        let out = encoder.finish()?;
        log::debug!(
            "archive: {} datasets, {} bytes packed, {} bytes gzipped (level {})",
            self.names.len(),
            packed.len(),
            out.len(),
            self.compression
        );
        Ok(out)
    }
}

fn encode_column(
    name: &str,
    value: &DatasetValue,
    filters: Filters,
) -> Result<(Vec<u8>, Vec<Encoding>), ArchiveError> {
    let mut encodings = Vec::new();

    let column = match value {
        DatasetValue::Int8(a) => {
            let mut v: Vec<i8> = a.iter().copied().collect();
            if filters.delta {
                encodings.push(encode_delta_i8(&mut v));
            }
            ColData::I8(v)
        }
        DatasetValue::Int64(a) => {
            let mut v: Vec<i64> = a.iter().copied().collect();
            if filters.delta {
                encodings.push(encode_delta_i64(&mut v));
            }
            ColData::I64(v)
        }
        DatasetValue::Float64(a) => {
            let v: Vec<f64> = a.iter().copied().collect();
            match filters.truncate {
                Some(decimals) => {
                    let factor = 10f64.powi(decimals as i32);
                    match encode_fixed_point(&v, factor) {
                        Some((mut ints, fp)) => {
                            encodings.push(fp);
                            if filters.delta {
                                encodings.push(encode_delta_i64(&mut ints));
                            }
                            ColData::I64(ints)
                        }
                        None => {
                            log::warn!(
                                "dataset '{name}' has values outside fixed-point range, storing untruncated"
                            );
                            ColData::F64(v)
                        }
                    }
                }
                None => ColData::F64(v),
            }
        }
        DatasetValue::Text(_) => {
            return Err(ArchiveError::Encode(format!(
                "dataset '{name}' is text, not a column"
            )))
        }
    };

    let (bytes, byte_array) = encode_byte_array(&column)?;
    encodings.push(byte_array);
    Ok((bytes, encodings))
}

/// A decoded archive: named datasets in write order.
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    datasets: Vec<(String, DatasetValue)>,
}

impl Archive {
    /// Decode archive bytes, gzipped or not.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let data = decompress_if_gzip(bytes)?;
        let root = decode_msgpack(&data)?;

        match root.get("format").and_then(|v| v.as_str()) {
            Some(FORMAT_NAME) => {}
            Some(other) => {
                return Err(ArchiveError::InvalidFormat(format!(
                    "unexpected format tag '{other}'"
                )))
            }
            None => return Err(ArchiveError::InvalidFormat("missing format tag".into())),
        }
        let version = root.get("version").and_then(|v| v.as_i64());
        if version != Some(FORMAT_VERSION) {
            return Err(ArchiveError::InvalidFormat(format!(
                "unsupported version {version:?}"
            )));
        }

        let entries = root
            .get("datasets")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ArchiveError::InvalidFormat("missing datasets".into()))?;

        let datasets = entries
            .iter()
            .map(decode_dataset)
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("archive: decoded {} datasets", datasets.len());
        Ok(Self { datasets })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().map(|(n, _)| n.as_str())
    }

    pub fn get(&self, name: &str) -> Result<&DatasetValue, ArchiveError> {
        self.datasets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| ArchiveError::MissingDataset(name.to_string()))
    }

    pub fn text(&self, name: &str) -> Result<&str, ArchiveError> {
        match self.get(name)? {
            DatasetValue::Text(s) => Ok(s),
            other => Err(wrong_kind(name, "text", other)),
        }
    }

    pub fn int8(&self, name: &str) -> Result<&ArrayD<i8>, ArchiveError> {
        match self.get(name)? {
            DatasetValue::Int8(a) => Ok(a),
            other => Err(wrong_kind(name, "int8", other)),
        }
    }

    pub fn int64(&self, name: &str) -> Result<&ArrayD<i64>, ArchiveError> {
        match self.get(name)? {
            DatasetValue::Int64(a) => Ok(a),
            other => Err(wrong_kind(name, "int64", other)),
        }
    }

    pub fn float64(&self, name: &str) -> Result<&ArrayD<f64>, ArchiveError> {
        match self.get(name)? {
            DatasetValue::Float64(a) => Ok(a),
            other => Err(wrong_kind(name, "float64", other)),
        }
    }
}

fn wrong_kind(name: &str, expected: &'static str, found: &DatasetValue) -> ArchiveError {
    ArchiveError::WrongKind {
        name: name.to_string(),
        expected,
        found: found.kind(),
    }
}

fn decompress_if_gzip(bytes: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    if bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b {
        let mut decoder = flate2::read::GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| ArchiveError::InvalidFormat(format!("gzip decompression failed: {e}")))?;
        Ok(out)
    } else {
        Ok(bytes.to_vec())
    }
}

fn decode_dataset(entry: &MsgVal) -> Result<(String, DatasetValue), ArchiveError> {
    let name = entry
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ArchiveError::InvalidFormat("dataset missing 'name'".into()))?
        .to_string();

    if let Some(text) = entry.get("text") {
        let text = text.as_str().ok_or_else(|| {
            ArchiveError::InvalidFormat(format!("dataset '{name}' text is not a string"))
        })?;
        return Ok((name, DatasetValue::Text(text.to_string())));
    }

    let shape = entry
        .get("shape")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ArchiveError::InvalidFormat(format!("dataset '{name}' missing 'shape'")))?
        .iter()
        .map(|d| d.as_i64().and_then(|d| usize::try_from(d).ok()))
        .collect::<Option<Vec<usize>>>()
        .ok_or_else(|| ArchiveError::InvalidFormat(format!("dataset '{name}' has a bad shape")))?;

    let data = entry
        .get("data")
        .and_then(|v| v.as_bin())
        .ok_or_else(|| ArchiveError::InvalidFormat(format!("dataset '{name}' missing 'data'")))?;

    let encodings = entry
        .get("encoding")
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            ArchiveError::InvalidFormat(format!("dataset '{name}' missing 'encoding'"))
        })?
        .iter()
        .map(Encoding::from_msg)
        .collect::<Result<Vec<_>, _>>()?;

    let column = decode_chain(ColData::Bytes(data.to_vec()), &encodings)?;
    let value = match column {
        ColData::I8(v) => DatasetValue::Int8(reshape(&name, &shape, v)?),
        ColData::I64(v) => DatasetValue::Int64(reshape(&name, &shape, v)?),
        ColData::F64(v) => DatasetValue::Float64(reshape(&name, &shape, v)?),
        ColData::Bytes(_) => {
            return Err(ArchiveError::InvalidFormat(format!(
                "dataset '{name}' has no ByteArray encoding"
            )))
        }
    };
    Ok((name, value))
}

fn reshape<T>(name: &str, shape: &[usize], values: Vec<T>) -> Result<ArrayD<T>, ArchiveError> {
    let expected: usize = shape.iter().product();
    let found = values.len();
    ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|_| {
        ArchiveError::InvalidFormat(format!(
            "dataset '{name}' has {found} values, shape {shape:?} needs {expected}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array<T: Clone>(shape: &[usize], values: &[T]) -> ArrayD<T> {
        ArrayD::from_shape_vec(IxDyn(shape), values.to_vec()).unwrap()
    }

    #[test]
    fn mixed_datasets_round_trip() {
        let signs = array(&[2, 2, 1], &[1i8, -1, 0, 1]);
        let logs = array(&[2, 2, 1], &[-1.234564, 2.0, 0.0, -7.5]);
        let geom = array(&[1, 5], &[6.0, 6.0, 0.0, -1.5, 0.25]);
        let natoms = array(&[], &[-3i64]);

        let mut w = ArchiveWriter::new(9);
        w.add("COMMENT1", &DatasetValue::Text(" title".into()), Filters::none())
            .unwrap();
        w.add("NATOMS", &DatasetValue::Int64(natoms.clone()), Filters::none())
            .unwrap();
        w.add("GEOM", &DatasetValue::Float64(geom.clone()), Filters::none())
            .unwrap();
        w.add("SIGNS", &DatasetValue::Int8(signs.clone()), Filters::delta())
            .unwrap();
        w.add("LOGDATA", &DatasetValue::Float64(logs), Filters::truncated(5))
            .unwrap();
        let bytes = w.finish().unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);

        let archive = Archive::from_bytes(&bytes).unwrap();
        assert_eq!(
            archive.names().collect::<Vec<_>>(),
            vec!["COMMENT1", "NATOMS", "GEOM", "SIGNS", "LOGDATA"]
        );
        assert_eq!(archive.text("COMMENT1").unwrap(), " title");
        assert_eq!(archive.int64("NATOMS").unwrap(), &natoms);
        assert_eq!(archive.float64("GEOM").unwrap(), &geom);
        assert_eq!(archive.int8("SIGNS").unwrap(), &signs);

        let logs = archive.float64("LOGDATA").unwrap();
        assert_eq!(logs.shape(), &[2, 2, 1]);
        let logs: Vec<f64> = logs.iter().copied().collect();
        assert_eq!(logs, vec![-1.23456, 2.0, 0.0, -7.5]);
    }

    #[test]
    fn truncation_falls_back_for_non_finite() {
        let logs = array(&[3], &[1.0, f64::INFINITY, -2.0]);
        let mut w = ArchiveWriter::new(1);
        w.add("LOGDATA", &DatasetValue::Float64(logs.clone()), Filters::truncated(5))
            .unwrap();
        let archive = Archive::from_bytes(&w.finish().unwrap()).unwrap();
        assert_eq!(archive.float64("LOGDATA").unwrap(), &logs);
    }

    #[test]
    fn empty_arrays_round_trip() {
        let ids = ArrayD::<i64>::zeros(IxDyn(&[0]));
        let mut w = ArchiveWriter::new(0);
        w.add("DSET_IDS", &DatasetValue::Int64(ids.clone()), Filters::delta())
            .unwrap();
        let archive = Archive::from_bytes(&w.finish().unwrap()).unwrap();
        assert_eq!(archive.int64("DSET_IDS").unwrap(), &ids);
    }

    #[test]
    fn accessor_errors() {
        let mut w = ArchiveWriter::new(6);
        w.add("COMMENT2", &DatasetValue::Text(String::new()), Filters::none())
            .unwrap();
        assert!(w
            .add("COMMENT2", &DatasetValue::Text("again".into()), Filters::none())
            .is_err());
        let archive = Archive::from_bytes(&w.finish().unwrap()).unwrap();

        assert!(matches!(
            archive.get("ORIGIN"),
            Err(ArchiveError::MissingDataset(name)) if name == "ORIGIN"
        ));
        assert!(matches!(
            archive.int8("COMMENT2"),
            Err(ArchiveError::WrongKind { expected: "int8", found: "text", .. })
        ));
    }

    #[test]
    fn rejects_foreign_documents() {
        assert!(Archive::from_bytes(b"").is_err());
        assert!(Archive::from_bytes(b"\x1f\x8bnot gzip").is_err());

        let doc = map(vec![
            ("format", MsgVal::Str("BCIF".into())),
            ("version", MsgVal::Int(1)),
            ("datasets", MsgVal::Array(vec![])),
        ]);
        let err = Archive::from_bytes(&encode_msgpack(&doc).unwrap()).unwrap_err();
        assert!(err.to_string().contains("BCIF"));

        let doc = map(vec![
            ("format", MsgVal::Str(FORMAT_NAME.into())),
            ("version", MsgVal::Int(2)),
            ("datasets", MsgVal::Array(vec![])),
        ]);
        assert!(Archive::from_bytes(&encode_msgpack(&doc).unwrap()).is_err());
    }

    #[test]
    fn rejects_shape_mismatch() {
        let (bytes, ba) = encode_byte_array(&ColData::I64(vec![1, 2, 3])).unwrap();
        let doc = map(vec![
            ("format", MsgVal::Str(FORMAT_NAME.into())),
            ("version", MsgVal::Int(FORMAT_VERSION)),
            (
                "datasets",
                MsgVal::Array(vec![map(vec![
                    ("name", MsgVal::Str("NATOMS".into())),
                    ("shape", MsgVal::Array(vec![MsgVal::Uint(2)])),
                    ("data", MsgVal::Bin(bytes)),
                    ("encoding", MsgVal::Array(vec![ba.to_msg()])),
                ])]),
            ),
        ]);
        let err = Archive::from_bytes(&encode_msgpack(&doc).unwrap()).unwrap_err();
        assert!(err.to_string().contains("NATOMS"));
    }
}
