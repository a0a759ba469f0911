use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use palette::Srgb;
use serde::{Deserialize, Serialize};

/// Position of pure red on the bridge's 256-step hue wheel.
pub const WHEEL_RED_OFFSET: i32 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Reflects the color across the red axis of the hue circle (hue `h`
    /// becomes `360 - h`) by exchanging the green and blue channels.
    ///
    /// The bridge's hue wheel turns the opposite way round from HSV, so every
    /// conversion to or from a wheel index goes through this reflection.
    pub const fn mirrored(self) -> Self {
        Rgb {
            r: self.r,
            g: self.b,
            b: self.g,
        }
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from(tuple: (u8, u8, u8)) -> Self {
        Rgb::new(tuple.0, tuple.1, tuple.2)
    }
}

impl From<Rgb> for (u8, u8, u8) {
    fn from(rgb: Rgb) -> Self {
        (rgb.r, rgb.g, rgb.b)
    }
}

impl From<Srgb<u8>> for Rgb {
    fn from(color: Srgb<u8>) -> Self {
        let (r, g, b) = color.into_components();
        Rgb::new(r, g, b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Accepts CSS color names (`"orange"`) and hex notation (`"#ff8000"`, `"f80"`).
impl FromStr for Rgb {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(named) = palette::named::from_str(&s.to_lowercase()) {
            return Ok(named.into());
        }
        Srgb::<u8>::from_str(s)
            .map(Rgb::from)
            .map_err(|_| anyhow!("Invalid color: {}", s))
    }
}

/// A color in HSV space with integer components.
///
/// `h` is in degrees `[0, 360)`, `s` and `v` are percentages `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u16,
    pub s: u8,
    pub v: u8,
}

pub fn rgb_to_hsv(rgb: Rgb) -> Hsv {
    let r = rgb.r as f64 / 255.0;
    let g = rgb.g as f64 / 255.0;
    let b = rgb.b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;

    let s = if max == 0.0 { 0.0 } else { d / max };
    let sector = if max == min {
        0.0
    } else if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    Hsv {
        h: ((sector * 60.0).round() as u16) % 360,
        s: (s * 100.0).round() as u8,
        v: (max * 100.0).round() as u8,
    }
}

/// Maps an HSV hue in degrees onto the bridge's hue wheel.
///
/// The wheel counts downwards from red at [`WHEEL_RED_OFFSET`].
pub fn hsv_to_milight_hue(h: u16) -> u8 {
    let step = (h as f64 / 360.0 * 255.0).floor() as i32;
    (256 + WHEEL_RED_OFFSET - step).rem_euclid(256) as u8
}

/// The wheel index the bridge uses for `rgb`.
pub fn rgb_to_milight_hue(rgb: Rgb) -> u8 {
    hsv_to_milight_hue(rgb_to_hsv(rgb.mirrored()).h)
}

/// Fully saturated color for a wheel index, as reported by the bridge.
pub fn milight_index_to_rgb(index: u8) -> Rgb {
    let c1 = ((index as f64 / 255.0 * 359.0) % 360.0).floor() as i32 - 36;
    let hue = if c1 <= 0 { c1.abs() } else { 360 - c1 };
    hsv_to_rgb(hue as f64, 100.0, 100.0).mirrored()
}

/// Sector based HSV to RGB conversion.
///
/// `h` is clamped to `[0, 360]`, `s` and `v` to `[0, 100]`.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb {
    let h = h.clamp(0.0, 360.0);
    let s = s.clamp(0.0, 100.0) / 100.0;
    let v = v.clamp(0.0, 100.0) / 100.0;

    if s == 0.0 {
        let grey = channel(v);
        return Rgb::new(grey, grey, grey);
    }

    let h = h / 60.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    // h == 360 lands on sector 6, which is sector 0 again
    let (r, g, b) = match i as u8 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    Rgb::new(channel(r), channel(g), channel(b))
}

fn channel(x: f64) -> u8 {
    (x * 255.0).round().clamp(0.0, 255.0) as u8
}
