//! sRGB ↔ OKLab conversions, interpolation and distance
//!
//! OKLab is the perceptual space used by every strategy: Euclidean distance
//! approximates perceived difference and linear mixes stay free of the grey
//! dip that sRGB blending produces. `L` is in [0, 1].
//!
//! Converting back to sRGB never fails: out-of-gamut channels are clamped
//! and counted in a process-wide diagnostic counter.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tint_common::Rgb;

/// Channel overshoot (in 8-bit units) tolerated before a conversion counts as clipped
const CLIP_TOLERANCE: f64 = 0.5;

/// Chroma below which a color is treated as achromatic (hue undefined)
const ACHROMATIC_CHROMA: f64 = 1e-7;

static CLIPPED_CONVERSIONS: AtomicU64 = AtomicU64::new(0);

/// OKLab perceptual color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oklab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

/// Cylindrical OKLab: lightness, chroma, hue in degrees [0, 360)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oklch {
    pub l: f64,
    pub c: f64,
    pub h: f64,
}

impl Oklab {
    pub const fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }

    pub fn to_lch(self) -> Oklch {
        let c = (self.a * self.a + self.b * self.b).sqrt();
        // atan2(0, 0) is meaningless for greys
        let h = if c < ACHROMATIC_CHROMA {
            0.0
        } else {
            normalize_hue(self.b.atan2(self.a).to_degrees())
        };
        Oklch { l: self.l, c, h }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.l, self.a, self.b]
    }
}

impl Oklch {
    pub const fn new(l: f64, c: f64, h: f64) -> Self {
        Self { l, c, h }
    }

    pub fn to_lab(self) -> Oklab {
        let h = self.h.to_radians();
        Oklab {
            l: self.l,
            a: self.c * h.cos(),
            b: self.c * h.sin(),
        }
    }
}

/// Wrap any angle into [0, 360)
pub fn normalize_hue(degrees: f64) -> f64 {
    let h = degrees.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if h >= 360.0 {
        0.0
    } else {
        h
    }
}

fn srgb_component_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_component_to_srgb(c: f64) -> f64 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// sRGB → OKLab
pub fn to_perceptual(rgb: Rgb) -> Oklab {
    let r = srgb_component_to_linear(rgb.r as f64 / 255.0);
    let g = srgb_component_to_linear(rgb.g as f64 / 255.0);
    let b = srgb_component_to_linear(rgb.b as f64 / 255.0);

    let l_ = (0.4122214708 * r + 0.5363325363 * g + 0.0514459929 * b).cbrt();
    let m_ = (0.2119034982 * r + 0.6806995451 * g + 0.1073969566 * b).cbrt();
    let s_ = (0.0883024619 * r + 0.2817188376 * g + 0.6299787005 * b).cbrt();

    Oklab {
        l: 0.2104542553 * l_ + 0.7936177850 * m_ - 0.0040720468 * s_,
        a: 1.9779984951 * l_ - 2.4285922050 * m_ + 0.4505937099 * s_,
        b: 0.0259040371 * l_ + 0.7827717662 * m_ - 0.8086757660 * s_,
    }
}

/// sRGB → OKLCh
pub fn to_perceptual_lch(rgb: Rgb) -> Oklch {
    to_perceptual(rgb).to_lch()
}

/// OKLab → sRGB, clamping out-of-gamut channels
pub fn to_rgb(lab: Oklab) -> Rgb {
    to_rgb_checked(lab).0
}

/// OKLab → sRGB, also reporting whether any channel had to be clamped
pub fn to_rgb_checked(lab: Oklab) -> (Rgb, bool) {
    let l_ = lab.l + 0.3963377774 * lab.a + 0.2158037573 * lab.b;
    let m_ = lab.l - 0.1055613458 * lab.a - 0.0638541728 * lab.b;
    let s_ = lab.l - 0.0894841775 * lab.a - 1.2914855480 * lab.b;

    let l = l_ * l_ * l_;
    let m = m_ * m_ * m_;
    let s = s_ * s_ * s_;

    let linear = [
        4.0767416621 * l - 3.3077115913 * m + 0.2309699292 * s,
        -1.2684380046 * l + 2.6097574011 * m - 0.3413193965 * s,
        -0.0041960863 * l - 0.7034186147 * m + 1.7076147010 * s,
    ];

    let mut clipped = false;
    let mut channels = [0u8; 3];
    for (out, value) in channels.iter_mut().zip(linear) {
        let scaled = linear_component_to_srgb(value) * 255.0;
        if !scaled.is_finite() {
            clipped = true;
            *out = 0;
            continue;
        }
        if !(-CLIP_TOLERANCE..=255.0 + CLIP_TOLERANCE).contains(&scaled) {
            clipped = true;
        }
        *out = scaled.round().clamp(0.0, 255.0) as u8;
    }

    if clipped {
        CLIPPED_CONVERSIONS.fetch_add(1, Ordering::Relaxed);
    }
    (Rgb::new(channels[0], channels[1], channels[2]), clipped)
}

/// OKLCh → sRGB, clamping out-of-gamut channels
pub fn lch_to_rgb(lch: Oklch) -> Rgb {
    to_rgb(lch.to_lab())
}

/// Linear interpolation in OKLab, `t` clamped to [0, 1]
pub fn lerp(p1: Oklab, p2: Oklab, t: f64) -> Oklab {
    let t = t.clamp(0.0, 1.0);
    Oklab {
        l: p1.l + (p2.l - p1.l) * t,
        a: p1.a + (p2.a - p1.a) * t,
        b: p1.b + (p2.b - p1.b) * t,
    }
}

/// Interpolation in OKLCh along the shorter hue arc, `t` clamped to [0, 1]
pub fn lerp_lch(p1: Oklch, p2: Oklch, t: f64) -> Oklch {
    let t = t.clamp(0.0, 1.0);
    let mut delta = normalize_hue(p2.h - p1.h);
    if delta > 180.0 {
        delta -= 360.0;
    }
    Oklch {
        l: p1.l + (p2.l - p1.l) * t,
        c: p1.c + (p2.c - p1.c) * t,
        h: normalize_hue(p1.h + delta * t),
    }
}

/// Euclidean OKLab distance (ΔE_OK)
pub fn distance(p1: Oklab, p2: Oklab) -> f64 {
    let dl = p1.l - p2.l;
    let da = p1.a - p2.a;
    let db = p1.b - p2.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// Weighted mean of OKLab colors; `None` when the total weight is not positive
pub fn weighted_mean(colors: &[(Oklab, f64)]) -> Option<Oklab> {
    let total: f64 = colors.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    let mut acc = Oklab::new(0.0, 0.0, 0.0);
    for (color, weight) in colors {
        let w = weight.max(0.0) / total;
        acc.l += color.l * w;
        acc.a += color.a * w;
        acc.b += color.b * w;
    }
    Some(acc)
}

/// Number of sRGB conversions that needed clamping since process start
pub fn clipped_conversions() -> u64 {
    CLIPPED_CONVERSIONS.load(Ordering::Relaxed)
}
