//! Binary size strings such as `"25.63Gi"`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::CapacityError;

/// Bytes in one GiB.
pub const GIB: f64 = 1_073_741_824.0;

lazy_static! {
    static ref SIZE_RE: Regex =
        Regex::new(r"(?i)^([0-9]+(?:\.[0-9]+)?)(ti|gi|mi)$").expect("size regex is valid");
}

/// Parse a `Ti`/`Gi`/`Mi` size string (suffix case-insensitive) into GiB.
///
/// Any other suffix, an empty string, a non-positive value, or a value whose
/// byte count would not fit in an `i64` is rejected.
pub fn parse_size_to_gib(value: &str) -> Result<f64, CapacityError> {
    parse_size(value, false)
}

/// Like [`parse_size_to_gib`] but accepts an explicit zero, for aggregate
/// requirements where "nothing" is a legitimate answer.
pub fn parse_requirement_to_gib(value: &str) -> Result<f64, CapacityError> {
    parse_size(value, true)
}

fn parse_size(value: &str, allow_zero: bool) -> Result<f64, CapacityError> {
    let trimmed = value.trim();
    let invalid = || CapacityError::InvalidSize(value.to_string());

    let caps = SIZE_RE.captures(trimmed).ok_or_else(invalid)?;
    let number: f64 = caps[1].parse().map_err(|_| invalid())?;
    let multiplier = match caps[2].to_ascii_lowercase().as_str() {
        "ti" => 1024.0,
        "gi" => 1.0,
        "mi" => 1.0 / 1024.0,
        _ => return Err(invalid()),
    };

    let gib = number * multiplier;
    #[allow(clippy::cast_precision_loss)]
    let max_bytes = i64::MAX as f64;
    if gib < 0.0 || (gib == 0.0 && !allow_zero) || gib * GIB > max_bytes {
        return Err(invalid());
    }
    Ok(gib)
}

/// Convert GiB to whole bytes, rounding up.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn gib_to_bytes(gib: f64) -> u64 {
    (gib * GIB).ceil().max(0.0) as u64
}
