//! CUBE text writer.

use std::fmt::Write;

use ndarray::ArrayD;

use crate::types::cube::{AxisSpec, CubeHeader};

/// Values per line in the orbital id block and the volumetric block.
const VALUES_PER_LINE: usize = 6;

/// Render a header and its volumetric grid as CUBE text.
///
/// Volumetric values are written in row-major order, six to a line, with an
/// extra break at the end of every innermost-axis row. Row length comes from
/// the header's grid shape.
pub fn render_cube(header: &CubeHeader, values: &ArrayD<f64>, precision: usize) -> String {
    let mut out = String::new();
    write_header(&mut out, header);

    let innermost = header.dims().innermost();
    for (i, &v) in values.iter().enumerate() {
        out.push_str(&exp_format(v, precision));
        let k = i.checked_rem(innermost).unwrap_or(i);
        if k % VALUES_PER_LINE == VALUES_PER_LINE - 1 || k + 1 == innermost {
            out.push('\n');
        }
    }

    out.push_str("\n\n");
    out
}

/// Everything up to the volumetric block.
pub fn write_header(out: &mut String, header: &CubeHeader) {
    out.push_str(&header.comment1);
    out.push('\n');
    out.push_str(&header.comment2);
    out.push('\n');

    push_count_line(out, header.atom_count, &header.origin);
    for AxisSpec {
        voxel_count,
        direction,
    } in &header.axes
    {
        push_count_line(out, *voxel_count, direction);
    }

    for atom in &header.geometry {
        push_count_line(
            out,
            atom.atomic_number as i64,
            &[
                atom.charge,
                atom.position[0],
                atom.position[1],
                atom.position[2],
            ],
        );
    }

    if let Some(orb) = &header.orbitals {
        let tokens = std::iter::once(orb.dataset_count() as i64)
            .chain(orb.dataset_ids.iter().copied());
        let mut on_line = 0;
        for token in tokens {
            let _ = write!(out, "   {token}");
            on_line += 1;
            if on_line == VALUES_PER_LINE {
                out.push('\n');
                on_line = 0;
            }
        }
        if on_line > 0 {
            out.push('\n');
        }
    }
}

/// `%5d` followed by `% 1.6f` values, three spaces apart.
fn push_count_line(out: &mut String, count: i64, values: &[f64]) {
    let _ = write!(out, "{count:5}");
    for &v in values {
        out.push_str("   ");
        out.push_str(&fixed6(v));
    }
    out.push('\n');
}

/// Six-decimal fixed point with a blank in place of a plus sign.
fn fixed6(v: f64) -> String {
    let s = format!("{v:.6}");
    if s.starts_with('-') {
        s
    } else {
        format!(" {s}")
    }
}

/// One volumetric value: a separating blank, a sign column (blank or `-`),
/// one digit, `precision` decimals, `E`, signed exponent of at least two
/// digits.
///
/// `exp_format(0.0183, 5)` is `"  1.83000E-02"`.
pub fn exp_format(val: f64, precision: usize) -> String {
    let sign = if val.is_sign_negative() { "-" } else { " " };
    if val.is_nan() {
        return "  NAN".to_string();
    }
    if val.is_infinite() {
        return format!(" {sign}INF");
    }

    let s = format!("{:.*E}", precision, val.abs());
    let Some((mantissa, exp)) = s.split_once('E') else {
        return format!(" {sign}{s}");
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    let mut out = String::with_capacity(precision + 10);
    out.push(' ');
    out.push_str(sign);
    out.push_str(mantissa);
    if precision == 0 {
        out.push('.');
    }
    let _ = write!(
        out,
        "E{}{:02}",
        if exp < 0 { '-' } else { '+' },
        exp.unsigned_abs()
    );
    out
}
