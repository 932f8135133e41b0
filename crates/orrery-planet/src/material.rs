//! Flat per-body surface color.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for color construction.
#[derive(Debug, Error, PartialEq)]
pub enum ColorError {
    #[error("color component {channel} = {value} is outside [0, 1]")]
    OutOfRange { channel: &'static str, value: f32 },
}

/// RGBA color with every component in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f32; 4]", into = "[f32; 4]")]
pub struct MaterialColor([f32; 4]);

impl MaterialColor {
    pub const WHITE: Self = Self([1.0, 1.0, 1.0, 1.0]);

    /// Build a color, rejecting NaN and components outside `[0, 1]`.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Result<Self, ColorError> {
        for (channel, value) in [("red", r), ("green", g), ("blue", b), ("alpha", a)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ColorError::OutOfRange { channel, value });
            }
        }
        Ok(Self([r, g, b, a]))
    }

    pub fn rgba(&self) -> [f32; 4] {
        self.0
    }

    /// The color repeated once per vertex, four floats each.
    pub fn per_vertex(&self, vertex_count: usize) -> Vec<f32> {
        self.0.repeat(vertex_count)
    }
}

impl TryFrom<[f32; 4]> for MaterialColor {
    type Error = ColorError;

    fn try_from([r, g, b, a]: [f32; 4]) -> Result<Self, Self::Error> {
        Self::new(r, g, b, a)
    }
}

impl From<MaterialColor> for [f32; 4] {
    fn from(color: MaterialColor) -> Self {
        color.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_vertex_replicates_once_per_vertex() {
        let color = MaterialColor::new(0.2, 0.4, 0.6, 1.0).unwrap();
        let data = color.per_vertex(3);
        assert_eq!(data.len(), 12);
        for chunk in data.chunks(4) {
            assert_eq!(chunk, &[0.2, 0.4, 0.6, 1.0]);
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(
            MaterialColor::new(1.5, 0.0, 0.0, 1.0),
            Err(ColorError::OutOfRange {
                channel: "red",
                value: 1.5
            })
        );
        assert!(MaterialColor::new(0.0, 0.0, -0.1, 1.0).is_err());
        assert!(MaterialColor::new(0.0, f32::NAN, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_ron_round_trip_validates() {
        let color = MaterialColor::new(0.1, 0.2, 0.3, 0.4).unwrap();
        let text = ron::to_string(&color).unwrap();
        let back: MaterialColor = ron::from_str(&text).unwrap();
        assert_eq!(back, color);

        let invalid: Result<MaterialColor, _> = ron::from_str("(2.0, 0.0, 0.0, 1.0)");
        assert!(invalid.is_err());
    }
}
