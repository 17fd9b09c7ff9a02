use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Country colours
// ---------------------------------------------------------------------------

/// One colour per selected country, stable for a given selection.
#[derive(Debug, Clone, Default)]
pub struct CountryColors {
    mapping: BTreeMap<String, Color32>,
}

impl CountryColors {
    pub fn new(countries: &[String]) -> Self {
        let mapping = countries
            .iter()
            .cloned()
            .zip(generate_palette(countries.len()))
            .collect();
        CountryColors { mapping }
    }

    pub fn color_for(&self, iso_code: &str) -> Color32 {
        self.mapping
            .get(iso_code)
            .copied()
            .unwrap_or(Color32::GRAY)
    }
}

// ---------------------------------------------------------------------------
// Heatmap gradient
// ---------------------------------------------------------------------------

/// Viridis anchor colours, dark to bright.
const VIRIDIS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

/// Colour for a value at `t` in `[0, 1]` on a viridis-like ramp.
pub fn heat_color(t: f64) -> Color32 {
    let t = t.clamp(0.0, 1.0) as f32;
    let segments = (VIRIDIS.len() - 1) as f32;
    let pos = t * segments;
    let i = (pos.floor() as usize).min(VIRIDIS.len() - 2);
    let local = pos - i as f32;

    let anchor = |(r, g, b): (u8, u8, u8)| -> LinSrgb {
        Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0).into_linear()
    };
    let mixed = anchor(VIRIDIS[i]).mix(anchor(VIRIDIS[i + 1]), local);
    let rgb: Srgb = Srgb::from_linear(mixed);
    to_color32(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_distinct_colours() {
        let colours = generate_palette(4);
        assert_eq!(colours.len(), 4);
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert_ne!(colours[i], colours[j]);
            }
        }
    }

    #[test]
    fn unknown_country_is_gray() {
        let colors = CountryColors::new(&["USA".to_string()]);
        assert_ne!(colors.color_for("USA"), Color32::GRAY);
        assert_eq!(colors.color_for("XXX"), Color32::GRAY);
    }

    #[test]
    fn ramp_endpoints_match_anchors() {
        let lo = heat_color(0.0);
        let hi = heat_color(1.0);
        assert!((lo.r() as i32 - 68).abs() <= 1 && (lo.b() as i32 - 84).abs() <= 1);
        assert!((hi.r() as i32 - 253).abs() <= 1 && (hi.g() as i32 - 231).abs() <= 1);
    }
}
