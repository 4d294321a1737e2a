//! Text encodings for vector values stored as document strings.
//!
//! The runtime parses points, quaternions and colors from `|`-separated
//! strings. Floats use C `%.10g` formatting so that values written here read
//! back identically on the runtime side.

use super::math::{Quat, Vec3, Vec4};

/// Significant digits used for float components.
pub const FLOAT_PRECISION: usize = 10;

/// Format a float the way C `printf("%.*g", precision, value)` does.
pub fn format_g(value: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Rust's `{:e}` rounds to the requested digits before choosing the
    // exponent, which is the exponent %g bases its style decision on.
    let sci = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

/// Strip trailing fractional zeros and a dangling decimal point.
fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn join_floats(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| format_g(*v as f64, FLOAT_PRECISION))
        .collect::<Vec<_>>()
        .join("|")
}

/// `x|y|z` string for a Point3F.
pub fn point3f_string(p: Vec3) -> String {
    join_floats(&[p.x, p.y, p.z])
}

/// `x|y|z` string from double components (bounding sphere centers).
pub fn point3d_string(x: f64, y: f64, z: f64) -> String {
    [x, y, z]
        .iter()
        .map(|v| format_g(*v, FLOAT_PRECISION))
        .collect::<Vec<_>>()
        .join("|")
}

/// `w|x|y|z` string for a Quaternion.
pub fn quaternion_string(q: Quat) -> String {
    join_floats(&[q.w, q.x, q.y, q.z])
}

/// Convert a unit-range component to a byte, clamping and truncating.
#[inline]
pub fn unorm8(value: f32) -> u8 {
    (value as f64 * 255.0).clamp(0.0, 255.0) as u8
}

/// `r|g|b|a` string for a ColorRGBA8.
pub fn color_rgba8_string(color: Vec4) -> String {
    format!(
        "{}|{}|{}|{}",
        unorm8(color.x),
        unorm8(color.y),
        unorm8(color.z),
        unorm8(color.w)
    )
}

/// `r|g|b|255` string for an opaque ColorRGBA8.
pub fn color_rgb8_string(color: Vec3) -> String {
    color_rgba8_string(color.extend(1.0))
}
