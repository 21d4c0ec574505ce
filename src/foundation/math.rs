pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Round `v` to the nearest even integer, never below 2.
pub(crate) fn round_even(v: f64) -> u32 {
    let half = (v / 2.0).round().max(1.0);
    (half as u32) * 2
}

/// Clamp into `[0, 1]`, mapping NaN to 0.
pub(crate) fn unit_clamp(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
