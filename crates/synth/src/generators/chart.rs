//! Synthetic pace and heart-rate series for the activity preview charts.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::Serialize;
use tracing::debug;

use stride_tracks::models::{ActivityProfile, TrackPoint, Units};

use crate::config::ChartConfig;

/// How values of a series are rendered on the chart axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "units")]
pub enum ValueFormat {
    /// Minutes per distance unit, shown as `m:ss`.
    Pace,
    /// Distance units per hour, shown with one decimal and the unit suffix.
    Speed(Units),
    /// Whole beats per minute.
    Bpm,
}

impl ValueFormat {
    pub fn format(self, value: f64) -> String {
        match self {
            ValueFormat::Pace => {
                let total = (value.max(0.0) * 60.0).round() as u64;
                format!("{}:{:02}", total / 60, total % 60)
            }
            ValueFormat::Speed(units) => format!("{value:.1} {}", units.speed_label()),
            ValueFormat::Bpm => format!("{}", value.round()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
    pub label: String,
    pub format: ValueFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    /// Pace for foot activities, speed for cycling.
    pub pace: ChartSeries,
    pub heart_rate: ChartSeries,
}

/// Generates noisy preview series around the profile's target pace and
/// heart rate.
#[derive(Debug, Clone, Default)]
pub struct ChartSeriesGenerator {
    config: ChartConfig,
}

impl ChartSeriesGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ChartConfig) -> Self {
        Self { config }
    }

    /// Number of samples drawn for a route of `distance` units.
    pub fn sample_count(&self, distance: f64) -> usize {
        let scaled = (distance * self.config.samples_per_unit).floor();
        let scaled = if scaled.is_finite() && scaled > 0.0 { scaled as usize } else { 0 };
        let ceiling = self.config.max_samples.max(self.config.min_samples);
        scaled.clamp(self.config.min_samples, ceiling)
    }

    /// `None` when the route has fewer than two points.
    pub fn generate(
        &self,
        points: &[TrackPoint],
        distance: f64,
        profile: &ActivityProfile,
        rng: &mut impl Rng,
    ) -> Option<ChartData> {
        if points.len() < 2 {
            return None;
        }

        let n = self.sample_count(distance);
        let labels = distance_labels(distance, n, profile.units);
        let noise = Uniform::new_inclusive(-1.0, 1.0);
        let inconsistency = profile.pace_inconsistency.index();

        let pace = if profile.activity_type.is_speed_based() {
            let speed = profile.pace.speed();
            let step = self.config.speed_steps[inconsistency];
            ChartSeries {
                labels: labels.clone(),
                data: (0..n)
                    .map(|_| (speed + noise.sample(rng) * step).max(0.0))
                    .collect(),
                label: format!("Speed ({})", profile.units.speed_label()),
                format: ValueFormat::Speed(profile.units),
            }
        } else {
            let minutes_per_km = profile.seconds_per_km() / 60.0;
            let step = self.config.pace_steps[inconsistency];
            ChartSeries {
                labels: labels.clone(),
                data: (0..n)
                    .map(|_| (minutes_per_km * (1.0 + noise.sample(rng) * step)).max(0.0))
                    .collect(),
                label: format!("Pace ({})", profile.pace_format),
                format: ValueFormat::Pace,
            }
        };

        let hr_range = profile.config().hr_range;
        let hr_step = self.config.hr_steps[profile.hr_variability.index()];
        let avg_hr = f64::from(profile.avg_heart_rate);
        let heart_rate = ChartSeries {
            labels,
            data: (0..n)
                .map(|_| {
                    let hr = (avg_hr * (1.0 + noise.sample(rng) * hr_step)).round() as i32;
                    f64::from(hr.clamp(hr_range.min, hr_range.max))
                })
                .collect(),
            label: "Heart Rate (bpm)".to_string(),
            format: ValueFormat::Bpm,
        };

        debug!(samples = n, "Generated chart series");

        Some(ChartData { pace, heart_rate })
    }
}

/// Evenly spaced cumulative distances, e.g. `"2.5 km"`.
fn distance_labels(distance: f64, n: usize, units: Units) -> Vec<String> {
    let step = distance / n as f64;
    (1..=n)
        .map(|i| format!("{:.1} {}", step * i as f64, units.distance_label()))
        .collect()
}
