use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

use crate::analytics::kpi::{Band, Quadrant};

// ---------------------------------------------------------------------------
// Categorical palette
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.65, 0.5);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

// ---------------------------------------------------------------------------
// Diverging scale: red (bad) → yellow → green (good)
// ---------------------------------------------------------------------------

const LOW: (u8, u8, u8) = (0xd7, 0x30, 0x27);
const MID: (u8, u8, u8) = (0xff, 0xff, 0xbf);
const HIGH: (u8, u8, u8) = (0x1a, 0x98, 0x50);

fn linear((r, g, b): (u8, u8, u8)) -> LinSrgb {
    Srgb::new(r, g, b).into_format::<f32>().into_linear()
}

/// Colour for `t` in `[0, 1]`, interpolated in linear RGB.
pub fn diverging(t: f64) -> Color32 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) as f32 } else { 0.5 };
    let mixed = if t < 0.5 {
        linear(LOW).mix(linear(MID), t * 2.0)
    } else {
        linear(MID).mix(linear(HIGH), (t - 0.5) * 2.0)
    };
    to_color32(Srgb::from_linear(mixed))
}

/// Colour for a value on `[min, max]`; missing values are grey.
pub fn score_color(value: Option<f64>, min: f64, max: f64) -> Color32 {
    match value {
        Some(v) if max > min => diverging((v - min) / (max - min)),
        Some(_) => diverging(0.5),
        None => Color32::GRAY,
    }
}

pub fn band_color(band: Band) -> Color32 {
    match band {
        Band::Good => diverging(1.0),
        Band::Warning => Color32::from_rgb(0xf4, 0xa5, 0x82),
        Band::Critical => diverging(0.0),
        Band::Neutral => Color32::from_rgb(0x43, 0x93, 0xc3),
        Band::NoData => Color32::GRAY,
    }
}

pub fn quadrant_color(quadrant: Quadrant) -> Color32 {
    match quadrant {
        Quadrant::Healthy => diverging(1.0),
        Quadrant::Critical => diverging(0.0),
        Quadrant::Watch => Color32::from_rgb(0xfd, 0xae, 0x61),
    }
}

/// Segment colours in chart order: detractors, passives, promoters.
pub const SEGMENT_COLORS: [Color32; 3] = [
    Color32::from_rgb(0xd7, 0x30, 0x27),
    Color32::from_rgb(0xbd, 0xbd, 0xbd),
    Color32::from_rgb(0x1a, 0x98, 0x50),
];

/// Sentiment colours in `Sentiment::ALL` order: positive, neutral, negative.
pub const SENTIMENT_COLORS: [Color32; 3] = [SEGMENT_COLORS[2], SEGMENT_COLORS[1], SEGMENT_COLORS[0]];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        let p = generate_palette(4);
        assert_eq!(p.len(), 4);
        assert_ne!(p[0], p[1]);
    }

    #[test]
    fn diverging_endpoints() {
        assert_eq!(diverging(0.0), Color32::from_rgb(0xd7, 0x30, 0x27));
        assert_eq!(diverging(1.0), Color32::from_rgb(0x1a, 0x98, 0x50));
        assert_eq!(diverging(-3.0), diverging(0.0));
        assert_eq!(score_color(Some(1.0), -1.0, 1.0), diverging(1.0));
        assert_eq!(score_color(None, -1.0, 1.0), Color32::GRAY);
    }
}
