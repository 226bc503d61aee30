//! RGB to HSV / CIELAB pixel conversions in 8-bit integer conventions.
//!
//! The conventions match what mainstream vision toolkits use for 8-bit
//! images, because the profile range constants were tuned against them:
//!
//! - HSV: hue in half-degrees [0, 180), saturation and value in [0, 255].
//! - Lab: L scaled by 255/100, a and b offset by +128, computed from the
//!   D65 XYZ matrix without sRGB gamma linearization.

/// Convert one RGB pixel to 8-bit HSV.
pub fn rgb_to_hsv8(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as i32;
    let g = rgb[1] as i32;
    let b = rgb[2] as i32;
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = v - min;

    if v == 0 || delta == 0 {
        return [0, 0, v as u8];
    }

    let s = ((255 * delta + v / 2) / v) as u8;

    let df = delta as f32;
    let mut h = if v == r {
        60.0 * (g - b) as f32 / df
    } else if v == g {
        120.0 + 60.0 * (b - r) as f32 / df
    } else {
        240.0 + 60.0 * (r - g) as f32 / df
    };
    if h < 0.0 {
        h += 360.0;
    }
    let mut h8 = (h / 2.0).round() as u16;
    if h8 >= 180 {
        h8 = 0;
    }

    [h8 as u8, s, v as u8]
}

/// Convert one 8-bit HSV pixel back to RGB.
pub fn hsv8_to_rgb(hsv: [u8; 3]) -> [u8; 3] {
    let h = hsv[0] as f32 * 2.0;
    let s = hsv[1] as f32 / 255.0;
    let v = hsv[2] as f32 / 255.0;

    let c = v * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    let to8 = |f: f32| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to8(r1), to8(g1), to8(b1)]
}

// D65 reference white for the XYZ normalization below.
const XN: f32 = 0.950456;
const ZN: f32 = 1.088754;

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > 0.008856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

/// Convert one RGB pixel to 8-bit CIELAB.
pub fn rgb_to_lab8(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;

    let x = 0.412453 * r + 0.357580 * g + 0.180423 * b;
    let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
    let z = 0.019334 * r + 0.119193 * g + 0.950227 * b;

    let l = if y > 0.008856 {
        116.0 * y.cbrt() - 16.0
    } else {
        903.3 * y
    };
    let fy = lab_f(y);
    let a = 500.0 * (lab_f(x / XN) - fy);
    let bb = 200.0 * (fy - lab_f(z / ZN));

    let clamp8 = |f: f32| f.round().clamp(0.0, 255.0) as u8;
    [
        clamp8(l * 255.0 / 100.0),
        clamp8(a + 128.0),
        clamp8(bb + 128.0),
    ]
}
