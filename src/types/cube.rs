//! Data types for Gaussian CUBE volumetric files.

use std::fmt;

use ndarray::ArrayD;

use crate::archive::ArchiveError;

/// Named fields of a CUBE file.
///
/// The same names label parse errors and the datasets of a `.cubez` archive,
/// so a failure message always points at the archive entry it would have
/// populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Comment1,
    Comment2,
    Natoms,
    Origin,
    XAxis,
    YAxis,
    ZAxis,
    Geom,
    NumDsets,
    DsetIds,
    Signs,
    LogData,
}

impl Field {
    /// Every field, in archive write order.
    pub const ALL: [Field; 12] = [
        Field::Comment1,
        Field::Comment2,
        Field::Natoms,
        Field::Origin,
        Field::XAxis,
        Field::YAxis,
        Field::ZAxis,
        Field::Geom,
        Field::NumDsets,
        Field::DsetIds,
        Field::Signs,
        Field::LogData,
    ];

    /// The three axis fields, in file order.
    pub const AXES: [Field; 3] = [Field::XAxis, Field::YAxis, Field::ZAxis];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Comment1 => "COMMENT1",
            Field::Comment2 => "COMMENT2",
            Field::Natoms => "NATOMS",
            Field::Origin => "ORIGIN",
            Field::XAxis => "XAXIS",
            Field::YAxis => "YAXIS",
            Field::ZAxis => "ZAXIS",
            Field::Geom => "GEOM",
            Field::NumDsets => "NUM_DSETS",
            Field::DsetIds => "DSET_IDS",
            Field::Signs => "SIGNS",
            Field::LogData => "LOGDATA",
        }
    }

}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One grid axis: signed voxel count and step vector.
///
/// A negative voxel count flags Angstrom units. Only the magnitude sizes the
/// grid; the sign is carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSpec {
    pub voxel_count: i64,
    pub direction: [f64; 3],
}

impl AxisSpec {
    /// Number of grid points along this axis.
    pub fn points(&self) -> usize {
        self.voxel_count.unsigned_abs() as usize
    }
}

/// One line of the geometry block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeomAtom {
    pub atomic_number: f64,
    pub charge: f64,
    pub position: [f64; 3],
}

impl GeomAtom {
    /// The five values in file order.
    pub fn to_row(&self) -> [f64; 5] {
        [
            self.atomic_number,
            self.charge,
            self.position[0],
            self.position[1],
            self.position[2],
        ]
    }

    pub fn from_row(row: [f64; 5]) -> Self {
        Self {
            atomic_number: row[0],
            charge: row[1],
            position: [row[2], row[3], row[4]],
        }
    }
}

/// Dataset index block of an orbital file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbitalInfo {
    pub dataset_ids: Vec<i64>,
}

impl OrbitalInfo {
    pub fn dataset_count(&self) -> usize {
        self.dataset_ids.len()
    }
}

/// Everything in a CUBE file ahead of the volumetric block.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeHeader {
    pub comment1: String,
    pub comment2: String,
    /// Signed atom count as written; negative marks an orbital file.
    pub atom_count: i64,
    pub origin: [f64; 3],
    pub axes: [AxisSpec; 3],
    /// `|atom_count|` entries.
    pub geometry: Vec<GeomAtom>,
    /// Present iff `atom_count` is negative.
    pub orbitals: Option<OrbitalInfo>,
}

impl CubeHeader {
    pub fn is_orbital(&self) -> bool {
        self.atom_count < 0
    }

    /// Number of geometry lines.
    pub fn natoms(&self) -> usize {
        self.atom_count.unsigned_abs() as usize
    }

    /// Grid shape: the three axis lengths, plus the dataset count for
    /// orbital files (even when it is one).
    pub fn dims(&self) -> Dims {
        let mut shape: Vec<usize> = self.axes.iter().map(AxisSpec::points).collect();
        if let Some(orb) = &self.orbitals {
            shape.push(orb.dataset_count());
        }
        Dims(shape)
    }
}

/// Shape of the volumetric grid, `x, y, z[, dataset]`, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dims(pub Vec<usize>);

impl Dims {
    /// Total number of samples.
    ///
    /// A grid too large to index can never be filled, so overflow reports the
    /// volumetric block as exhausted.
    pub fn count(&self) -> Result<usize, CubeError> {
        self.0
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(CubeError::PrematureExhaustion {
                field: Field::LogData,
            })
    }

    /// Length of the fastest-varying axis.
    pub fn innermost(&self) -> usize {
        self.0.last().copied().unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

/// Sign/log decomposition of a volumetric grid.
///
/// `log_magnitude` is filler wherever `signs` is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleArrays {
    pub signs: ArrayD<i8>,
    pub log_magnitude: ArrayD<f64>,
}

/// Errors that can occur while parsing, configuring or archiving a CUBE file.
#[derive(Debug, thiserror::Error)]
pub enum CubeError {
    #[error("Data prematurely exhausted at '{field}'")]
    PrematureExhaustion { field: Field },

    #[error("Superfluous values in '{field}' dataset")]
    SuperfluousData { field: Field },

    #[error("invalid number {token:?} in '{field}'")]
    InvalidNumber { field: Field, token: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CubeError {
    /// The field a parse error refers to, if any.
    pub fn field(&self) -> Option<Field> {
        match self {
            CubeError::PrematureExhaustion { field }
            | CubeError::SuperfluousData { field }
            | CubeError::InvalidNumber { field, .. } => Some(*field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn axis(n: i64) -> AxisSpec {
        AxisSpec {
            voxel_count: n,
            direction: [0.0; 3],
        }
    }

    #[test]
    fn field_names_are_distinct() {
        let names: HashSet<&str> = Field::ALL.iter().map(|f| f.as_str()).collect();
        assert_eq!(names.len(), Field::ALL.len());
        assert_eq!(Field::DsetIds.to_string(), "DSET_IDS");
    }

    #[test]
    fn dims_use_axis_magnitudes() {
        let header = CubeHeader {
            comment1: String::new(),
            comment2: String::new(),
            atom_count: 1,
            origin: [0.0; 3],
            axes: [axis(-3), axis(4), axis(-5)],
            geometry: vec![],
            orbitals: None,
        };
        assert_eq!(header.dims(), Dims(vec![3, 4, 5]));
        assert_eq!(header.dims().count().unwrap(), 60);
        assert_eq!(header.dims().innermost(), 5);
    }

    #[test]
    fn oversized_grid_count_is_exhaustion() {
        let dims = Dims(vec![4_000_000_000, 4_000_000_000, 4_000_000_000]);
        assert!(matches!(
            dims.count(),
            Err(CubeError::PrematureExhaustion {
                field: Field::LogData
            })
        ));
        assert_eq!(Dims(vec![3, 0, 5]).count().unwrap(), 0);
    }

    #[test]
    fn orbital_dims_gain_dataset_axis() {
        let header = CubeHeader {
            comment1: String::new(),
            comment2: String::new(),
            atom_count: -2,
            origin: [0.0; 3],
            axes: [axis(2), axis(2), axis(2)],
            geometry: vec![],
            orbitals: Some(OrbitalInfo {
                dataset_ids: vec![7],
            }),
        };
        assert!(header.is_orbital());
        assert_eq!(header.natoms(), 2);
        assert_eq!(header.dims(), Dims(vec![2, 2, 2, 1]));
    }

    #[test]
    fn error_messages_name_the_field() {
        let err = CubeError::PrematureExhaustion {
            field: Field::Origin,
        };
        assert_eq!(err.to_string(), "Data prematurely exhausted at 'ORIGIN'");
        let err = CubeError::SuperfluousData {
            field: Field::Origin,
        };
        assert_eq!(err.to_string(), "Superfluous values in 'ORIGIN' dataset");
        assert_eq!(err.field(), Some(Field::Origin));
    }
}
