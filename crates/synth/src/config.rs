//! Configuration types for track synthesis and chart generation.

use serde::{Deserialize, Serialize};
use stride_tracks::models::DEFAULT_ELEVATION_M;

/// Relative pace noise per pace-inconsistency level (fraction of the target pace).
pub const PACE_NOISE_STEPS: [f64; 4] = [0.05, 0.15, 0.30, 0.50];

/// Absolute speed noise per pace-inconsistency level, in km/h or mph.
pub const SPEED_NOISE_STEPS: [f64; 4] = [1.0, 3.0, 6.0, 10.0];

/// Relative heart-rate noise per heart-rate-variability level.
pub const HR_NOISE_STEPS: [f64; 3] = [0.02, 0.05, 0.10];

/// How the document start time is written at the top of a synthesized GPX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataTimeTag {
    /// Bare `<metadate>` element, as earlier exports wrote it and some
    /// importers still look for.
    #[default]
    Legacy,
    /// Standard GPX 1.1 `<metadata><time>`.
    Standard,
}

/// Configuration for GPX synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Value of the `creator` attribute on the root element.
    pub creator: String,

    pub metadata_time_tag: MetadataTimeTag,

    /// Elevation written for points without elevation data, in meters.
    pub default_elevation_m: f64,

    /// Range (seconds) each segment takes at minimum, so that near-duplicate
    /// points still get strictly increasing timestamps.
    pub min_segment_seconds: (f64, f64),

    /// Relative heart-rate noise contributed by each variability level.
    pub hr_noise_per_level: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            creator: "StravaGPXGenerator".to_string(),
            metadata_time_tag: MetadataTimeTag::Legacy,
            default_elevation_m: DEFAULT_ELEVATION_M,
            min_segment_seconds: (1.0, 2.0),
            hr_noise_per_level: 0.05,
        }
    }
}

/// Configuration for synthetic chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub pace_steps: [f64; 4],
    pub speed_steps: [f64; 4],
    pub hr_steps: [f64; 3],
    /// Lower bound on the number of samples per series.
    pub min_samples: usize,
    /// Samples per distance unit once the route is long enough.
    pub samples_per_unit: f64,
    /// Upper bound on the number of samples per series.
    pub max_samples: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            pace_steps: PACE_NOISE_STEPS,
            speed_steps: SPEED_NOISE_STEPS,
            hr_steps: HR_NOISE_STEPS,
            min_samples: 20,
            samples_per_unit: 5.0,
            max_samples: 1000,
        }
    }
}

/// Everything the `stride` binary reads from its `--config` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrideConfig {
    pub synth: SynthConfig,
    pub chart: ChartConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: StrideConfig =
            serde_json::from_str(r#"{"synth": {"metadata_time_tag": "standard"}}"#).unwrap();
        assert_eq!(config.synth.metadata_time_tag, MetadataTimeTag::Standard);
        assert_eq!(config.synth.creator, "StravaGPXGenerator");
        assert_eq!(config.synth.min_segment_seconds, (1.0, 2.0));
        assert_eq!(config.chart, ChartConfig::default());
    }

    #[test]
    fn test_default_tag_is_legacy() {
        assert_eq!(SynthConfig::default().metadata_time_tag, MetadataTimeTag::Legacy);
    }
}
