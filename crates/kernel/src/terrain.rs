//! Noise sample to terrain class, marker and color.

use chunkworld_common::WorldConfig;
use std::collections::BTreeMap;

/// Result of classifying one noise sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainClass<'a> {
    /// 1-based class index, always in `[1, class_count]`.
    pub index: u32,
    pub marker: &'a str,
    pub color: u32,
}

/// Buckets noise samples into terrain classes and resolves each class to a
/// marker and a color, falling back to the configured defaults.
#[derive(Debug, Clone)]
pub struct TerrainClassifier {
    markers: BTreeMap<u32, String>,
    colors: BTreeMap<u32, u32>,
    default_marker: String,
    default_color: u32,
}

impl TerrainClassifier {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            markers: config.marker_map.clone(),
            colors: config.color_map.clone(),
            default_marker: config.default_marker.clone(),
            default_color: config.default_color,
        }
    }

    /// Number of equal-width slices the normalized range is split into.
    pub fn class_count(&self) -> u32 {
        self.markers.len().max(1) as u32
    }

    /// Map a sample in `[-1, 1]` to a class index in `[1, class_count]`.
    ///
    /// A sample of exactly `1.0` lands on the upper slice edge and is clamped
    /// to the last class. Samples outside the range (and NaN) clamp the same way.
    pub fn index(&self, sample: f64) -> u32 {
        let n = self.class_count();
        let t = (sample + 1.0) * 0.5;
        let slice = 1.0 / f64::from(n);
        let raw = (t / slice).floor();
        if raw.is_nan() || raw < 0.0 {
            return 1;
        }
        (raw as u32).saturating_add(1).min(n)
    }

    pub fn marker(&self, index: u32) -> &str {
        self.markers
            .get(&index)
            .map_or(self.default_marker.as_str(), String::as_str)
    }

    pub fn color(&self, index: u32) -> u32 {
        self.colors.get(&index).copied().unwrap_or(self.default_color)
    }

    pub fn classify(&self, sample: f64) -> TerrainClass<'_> {
        let index = self.index(sample);
        TerrainClass {
            index,
            marker: self.marker(index),
            color: self.color(index),
        }
    }
}
