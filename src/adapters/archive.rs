//! Marshalling between the CUBE model and `.cubez` archive datasets.
//!
//! Every header field maps 1:1 onto a named dataset. Only `SIGNS` and
//! `LOGDATA` are stored with filters.

use ndarray::{Array1, ArrayD, IxDyn};

use crate::archive::{Archive, ArchiveError, ArchiveWriter, DatasetValue, Filters};
use crate::types::cube::{
    AxisSpec, CubeError, CubeHeader, Field, GeomAtom, OrbitalInfo, SampleArrays,
};

/// Serialize a header and its sample arrays into archive bytes.
///
/// `truncate` is the number of decimals kept in `LOGDATA`; `compression` the
/// gzip level.
pub fn cube_to_archive(
    header: &CubeHeader,
    samples: &SampleArrays,
    truncate: u32,
    compression: u32,
) -> Result<Vec<u8>, CubeError> {
    let mut w = ArchiveWriter::new(compression);

    w.add(
        Field::Comment1.as_str(),
        &DatasetValue::Text(header.comment1.clone()),
        Filters::none(),
    )?;
    w.add(
        Field::Comment2.as_str(),
        &DatasetValue::Text(header.comment2.clone()),
        Filters::none(),
    )?;
    w.add(
        Field::Natoms.as_str(),
        &DatasetValue::Int64(ArrayD::from_elem(IxDyn(&[]), header.atom_count)),
        Filters::none(),
    )?;
    w.add(
        Field::Origin.as_str(),
        &DatasetValue::Float64(vector(&header.origin[..])),
        Filters::none(),
    )?;

    for (field, axis) in Field::AXES.iter().zip(&header.axes) {
        let row = [
            axis.voxel_count as f64,
            axis.direction[0],
            axis.direction[1],
            axis.direction[2],
        ];
        w.add(
            field.as_str(),
            &DatasetValue::Float64(vector(&row[..])),
            Filters::none(),
        )?;
    }

    let geom: Vec<f64> = header.geometry.iter().flat_map(GeomAtom::to_row).collect();
    let geom = ArrayD::from_shape_vec(IxDyn(&[header.geometry.len(), 5]), geom)
        .map_err(|e| CubeError::Configuration(format!("geometry block reshape failed: {e}")))?;
    w.add(
        Field::Geom.as_str(),
        &DatasetValue::Float64(geom),
        Filters::none(),
    )?;

    let ids: &[i64] = header
        .orbitals
        .as_ref()
        .map(|o| o.dataset_ids.as_slice())
        .unwrap_or(&[]);
    w.add(
        Field::NumDsets.as_str(),
        &DatasetValue::Int64(ArrayD::from_elem(IxDyn(&[]), ids.len() as i64)),
        Filters::none(),
    )?;
    w.add(
        Field::DsetIds.as_str(),
        &DatasetValue::Int64(vector(ids)),
        Filters::none(),
    )?;

    w.add(
        Field::Signs.as_str(),
        &DatasetValue::Int8(samples.signs.clone()),
        Filters::delta(),
    )?;
    w.add(
        Field::LogData.as_str(),
        &DatasetValue::Float64(samples.log_magnitude.clone()),
        Filters::truncated(truncate),
    )?;

    Ok(w.finish()?)
}

/// Rebuild a header and sample arrays from archive bytes.
pub fn archive_to_cube(bytes: &[u8]) -> Result<(CubeHeader, SampleArrays), CubeError> {
    let archive = Archive::from_bytes(bytes)?;

    let atom_count = scalar(&archive, Field::Natoms)?;
    let origin = floats::<3>(&archive, Field::Origin)?;

    let mut axes = [AxisSpec {
        voxel_count: 0,
        direction: [0.0; 3],
    }; 3];
    for (axis, field) in axes.iter_mut().zip(Field::AXES) {
        let [count, dx, dy, dz] = floats::<4>(&archive, field)?;
        *axis = AxisSpec {
            voxel_count: count.round() as i64,
            direction: [dx, dy, dz],
        };
    }

    let geom = archive.float64(Field::Geom.as_str())?;
    let flat: Vec<f64> = geom.iter().copied().collect();
    if flat.len() % 5 != 0 {
        return Err(invalid(Field::Geom, "rows must hold 5 values"));
    }
    let geometry = flat
        .chunks_exact(5)
        .map(|c| GeomAtom::from_row([c[0], c[1], c[2], c[3], c[4]]))
        .collect();

    let orbitals = if atom_count < 0 {
        let ids: Vec<i64> = archive
            .int64(Field::DsetIds.as_str())?
            .iter()
            .copied()
            .collect();
        let count = scalar(&archive, Field::NumDsets)?;
        if count != ids.len() as i64 {
            return Err(invalid(
                Field::DsetIds,
                &format!("{} ids for NUM_DSETS {count}", ids.len()),
            ));
        }
        Some(OrbitalInfo { dataset_ids: ids })
    } else {
        None
    };

    let header = CubeHeader {
        comment1: archive.text(Field::Comment1.as_str())?.to_string(),
        comment2: archive.text(Field::Comment2.as_str())?.to_string(),
        atom_count,
        origin,
        axes,
        geometry,
        orbitals,
    };

    let signs = archive.int8(Field::Signs.as_str())?.clone();
    let log_magnitude = archive.float64(Field::LogData.as_str())?.clone();
    let dims = header.dims();
    if signs.shape() != dims.as_slice() {
        return Err(invalid(
            Field::Signs,
            &format!(
                "shape {:?} differs from header grid {:?}",
                signs.shape(),
                dims.as_slice()
            ),
        ));
    }
    if signs.shape() != log_magnitude.shape() {
        return Err(invalid(
            Field::LogData,
            &format!(
                "shape {:?} differs from SIGNS {:?}",
                log_magnitude.shape(),
                signs.shape()
            ),
        ));
    }

    log::debug!(
        "archive read: {} atoms, grid {:?}",
        header.natoms(),
        signs.shape()
    );
    Ok((
        header,
        SampleArrays {
            signs,
            log_magnitude,
        },
    ))
}

fn vector<T: Clone>(values: &[T]) -> ArrayD<T> {
    Array1::from(values.to_vec()).into_dyn()
}

fn invalid(field: Field, reason: &str) -> CubeError {
    ArchiveError::InvalidFormat(format!("dataset '{field}': {reason}")).into()
}

fn scalar(archive: &Archive, field: Field) -> Result<i64, CubeError> {
    archive
        .int64(field.as_str())?
        .iter()
        .next()
        .copied()
        .ok_or_else(|| invalid(field, "empty scalar"))
}

fn floats<const N: usize>(archive: &Archive, field: Field) -> Result<[f64; N], CubeError> {
    let values = archive.float64(field.as_str())?;
    if values.len() != N {
        return Err(invalid(
            field,
            &format!("expected {N} values, found {}", values.len()),
        ));
    }
    let mut out = [0.0; N];
    for (slot, &v) in out.iter_mut().zip(values.iter()) {
        *slot = v;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(orbitals: Option<OrbitalInfo>) -> CubeHeader {
        let atom_count = if orbitals.is_some() { -2 } else { 2 };
        CubeHeader {
            comment1: " water".into(),
            comment2: " density".into(),
            atom_count,
            origin: [-5.0, -4.5, 0.125],
            axes: [
                AxisSpec {
                    voxel_count: 2,
                    direction: [0.5, 0.0, 0.0],
                },
                AxisSpec {
                    voxel_count: -1,
                    direction: [0.0, 0.5, 0.0],
                },
                AxisSpec {
                    voxel_count: 2,
                    direction: [0.0, 0.0, 0.5],
                },
            ],
            geometry: vec![
                GeomAtom {
                    atomic_number: 8.0,
                    charge: 8.0,
                    position: [0.0, 0.0, 0.2],
                },
                GeomAtom {
                    atomic_number: 1.0,
                    charge: 1.0,
                    position: [0.0, 1.4, -0.9],
                },
            ],
            orbitals,
        }
    }

    fn samples(shape: &[usize]) -> SampleArrays {
        let n: usize = shape.iter().product();
        let signs: Vec<i8> = (0..n).map(|i| [1, -1, 0][i % 3]).collect();
        let logs: Vec<f64> = (0..n)
            .map(|i| if i % 3 == 2 { 0.0 } else { -3.0 + 0.25 * i as f64 })
            .collect();
        SampleArrays {
            signs: ArrayD::from_shape_vec(IxDyn(shape), signs).unwrap(),
            log_magnitude: ArrayD::from_shape_vec(IxDyn(shape), logs).unwrap(),
        }
    }

    #[test]
    fn plain_cube_round_trip() {
        let header = sample_header(None);
        let data = samples(header.dims().as_slice());
        let bytes = cube_to_archive(&header, &data, 5, 9).unwrap();
        let (h, s) = archive_to_cube(&bytes).unwrap();
        assert_eq!(h, header);
        assert_eq!(s, data);
    }

    #[test]
    fn orbital_cube_round_trip() {
        let header = sample_header(Some(OrbitalInfo {
            dataset_ids: vec![3, 4, 5],
        }));
        let data = samples(header.dims().as_slice());
        assert_eq!(data.signs.shape(), &[2, 1, 2, 3]);
        let bytes = cube_to_archive(&header, &data, 5, 4).unwrap();
        let (h, s) = archive_to_cube(&bytes).unwrap();
        assert_eq!(h.orbitals, header.orbitals);
        assert_eq!(s.signs, data.signs);
    }

    #[test]
    fn non_orbital_stores_empty_index() {
        let header = sample_header(None);
        let data = samples(header.dims().as_slice());
        let bytes = cube_to_archive(&header, &data, 5, 9).unwrap();
        let archive = Archive::from_bytes(&bytes).unwrap();
        assert_eq!(scalar(&archive, Field::NumDsets).unwrap(), 0);
        assert_eq!(archive.int64("DSET_IDS").unwrap().len(), 0);
        assert_eq!(
            archive.names().collect::<Vec<_>>(),
            Field::ALL.iter().map(|f| f.as_str()).collect::<Vec<_>>()
        );
        let yaxis = archive.float64("YAXIS").unwrap();
        assert_eq!(yaxis.iter().next(), Some(&-1.0));
    }

    #[test]
    fn log_data_truncated_to_requested_decimals() {
        let header = sample_header(None);
        let mut data = samples(header.dims().as_slice());
        data.log_magnitude[&[0, 0, 0][..]] = -1.234567;
        let bytes = cube_to_archive(&header, &data, 2, 9).unwrap();
        let (_, s) = archive_to_cube(&bytes).unwrap();
        let v = s.log_magnitude[&[0, 0, 0][..]];
        assert!((v - -1.23).abs() < 1e-12, "{v}");
    }

    #[test]
    fn sample_shape_must_match_header_grid() {
        let header = sample_header(None);
        let scalar_samples = SampleArrays {
            signs: ArrayD::from_elem(IxDyn(&[]), 1),
            log_magnitude: ArrayD::from_elem(IxDyn(&[]), 0.5),
        };
        let bytes = cube_to_archive(&header, &scalar_samples, 5, 9).unwrap();
        let err = archive_to_cube(&bytes).unwrap_err();
        assert!(matches!(err, CubeError::Archive(ArchiveError::InvalidFormat(_))));
        assert!(err.to_string().contains("SIGNS"), "{err}");

        let transposed = samples(&[2, 2, 1]);
        let bytes = cube_to_archive(&header, &transposed, 5, 9).unwrap();
        assert!(archive_to_cube(&bytes).is_err());
    }

    #[test]
    fn missing_dataset_is_reported() {
        let mut w = ArchiveWriter::new(9);
        w.add("COMMENT1", &DatasetValue::Text(String::new()), Filters::none())
            .unwrap();
        let err = archive_to_cube(&w.finish().unwrap()).unwrap_err();
        assert!(err.to_string().contains("NATOMS"), "{err}");
    }
}
