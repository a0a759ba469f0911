//! Conversion between brightness percentages and the bridge's brightness codes.
//!
//! The remote encodes 26 brightness levels in the upper five bits of the
//! brightness byte, split over two bands: levels 0 to 16 count down from
//! code 16, levels 19 to 25 count down from code 31. The low three bits carry
//! the zone. Levels 17 and 18 have no code and saturate to 0xFF, which
//! covers the zone bits as well.

/// Number of brightness steps between 0 % and 100 %.
pub const LEVELS: u8 = 25;

/// Percentages above 100 are treated as 100.
pub fn percent_to_device_code(percent: u8) -> u8 {
    let percent = percent.min(100) as f64;
    let level = (percent / 100.0 * LEVELS as f64).round() as i32;

    let code = if (0..24).contains(&(16 - level)) {
        16 - level
    } else {
        50 - level
    };

    (code << 3).min(u8::MAX as i32) as u8
}

pub fn device_code_to_percent(code: u8) -> u8 {
    // firmware dead zone
    let code = if code > 0xA0 && code < 0xC8 { 0xC8 } else { code };

    let level = (code >> 3) as i32;
    let level = if level < LEVELS as i32 {
        16 - level
    } else {
        50 - level
    };

    (level as f64 / LEVELS as f64 * 100.0).ceil().clamp(0.0, 100.0) as u8
}
