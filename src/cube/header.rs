//! CUBE header parser.
//!
//! Layout, one item per line unless noted:
//! 1. two free-text comment lines
//! 2. `NATOMS  OX OY OZ` (negative NATOMS marks an orbital file)
//! 3. three axis lines `N  DX DY DZ` (negative N marks Angstrom units)
//! 4. `|NATOMS|` geometry lines `Z  CHARGE  X Y Z`
//! 5. orbital files only: `NUM_DSETS ID ID ...`, where the ids may wrap
//!    onto further lines

use super::tokens::{parse_token, LineReader};
use crate::types::cube::{AxisSpec, CubeError, CubeHeader, Field, GeomAtom, OrbitalInfo};

/// Parse the header, leaving `lines` positioned at the volumetric block.
pub fn parse_header(lines: &mut LineReader<'_>) -> Result<CubeHeader, CubeError> {
    let comment1 = lines.next_line(Field::Comment1)?.to_string();
    let comment2 = lines.next_line(Field::Comment2)?.to_string();

    let mut fields = lines.next_fields(Field::Origin)?;
    let atom_count: i64 = fields.next_parsed(Field::Natoms)?;
    let origin = fields.next_floats::<3>(Field::Origin)?;
    fields.expect_exhausted(Field::Origin)?;

    let mut axes = [AxisSpec {
        voxel_count: 0,
        direction: [0.0; 3],
    }; 3];
    for (axis, field) in axes.iter_mut().zip(Field::AXES) {
        *axis = parse_axis(lines, field)?;
    }

    let natoms = atom_count.unsigned_abs() as usize;
    let mut geometry = Vec::new();
    for _ in 0..natoms {
        let mut fields = lines.next_fields(Field::Geom)?;
        let row = fields.next_floats::<5>(Field::Geom)?;
        fields.expect_exhausted(Field::Geom)?;
        geometry.push(GeomAtom::from_row(row));
    }

    let orbitals = if atom_count < 0 {
        Some(parse_orbital_info(lines)?)
    } else {
        None
    };

    log::debug!(
        "parsed CUBE header: {} atoms, axes {:?}, orbital={}",
        natoms,
        axes.map(|a| a.voxel_count),
        orbitals.is_some()
    );

    Ok(CubeHeader {
        comment1,
        comment2,
        atom_count,
        origin,
        axes,
        geometry,
        orbitals,
    })
}

fn parse_axis(lines: &mut LineReader<'_>, field: Field) -> Result<AxisSpec, CubeError> {
    let mut fields = lines.next_fields(field)?;
    let voxel_count: i64 = fields.next_parsed(field)?;
    let direction = fields.next_floats::<3>(field)?;
    fields.expect_exhausted(field)?;
    Ok(AxisSpec {
        voxel_count,
        direction,
    })
}

/// Dataset count followed by that many ids, read across as many lines as it
/// takes. A token that is not an integer before the count is met means the
/// id list ran out and the volumetric block has started.
fn parse_orbital_info(lines: &mut LineReader<'_>) -> Result<OrbitalInfo, CubeError> {
    let mut fields = lines.next_fields(Field::DsetIds)?;
    let count: usize = fields.next_parsed(Field::NumDsets)?;

    let mut dataset_ids = Vec::new();
    while dataset_ids.len() < count {
        match fields.try_next() {
            Some(token) => {
                let id = parse_token::<i64>(token, Field::DsetIds).map_err(|_| {
                    CubeError::PrematureExhaustion {
                        field: Field::DsetIds,
                    }
                })?;
                dataset_ids.push(id);
            }
            None => fields = lines.next_fields(Field::DsetIds)?,
        }
    }
    fields.expect_exhausted(Field::DsetIds)?;

    Ok(OrbitalInfo { dataset_ids })
}
