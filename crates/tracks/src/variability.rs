//! Coefficient-of-variation classification of heart-rate and pace samples.
//!
//! Raw sample series are reduced to the same ordinal slider levels the
//! activity form uses, so an imported track can seed the synthesizer.

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::geo_metrics::distance_meters;
use crate::models::{HrVariability, PaceInconsistency, TrackPoint};

/// Fewer samples than this are considered statistically unreliable.
pub const MIN_SAMPLES: usize = 10;

/// Upper CV bound (inclusive) for heart-rate levels 0 and 1; anything above is level 2.
pub const HR_VARIABILITY_THRESHOLDS: [f64; 2] = [0.03, 0.075];

/// Upper CV bound (inclusive) for pace levels 0..=2; anything above is level 3.
pub const PACE_INCONSISTENCY_THRESHOLDS: [f64; 3] = [0.10, 0.225, 0.40];

/// Segments shorter than this carry no meaningful pace.
pub const MIN_SEGMENT_METERS: f64 = 1.0;

/// Population coefficient of variation. `None` for empty input or a non-positive mean.
pub fn coefficient_of_variation(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    if mean <= 0.0 || !mean.is_finite() {
        return None;
    }

    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt() / mean)
}

/// Maps the CV of `samples` to the first ordinal whose threshold it does not
/// exceed; the ordinal after the last threshold catches everything else.
///
/// Returns `None` when there are fewer than [`MIN_SAMPLES`] samples or the CV
/// is undefined.
pub fn classify_coefficient_of_variation(samples: &[f64], thresholds: &[f64]) -> Option<usize> {
    if samples.len() < MIN_SAMPLES {
        return None;
    }

    let cv = coefficient_of_variation(samples)?;
    let level = thresholds
        .iter()
        .position(|threshold| cv <= *threshold)
        .unwrap_or(thresholds.len());
    Some(level)
}

/// Heart-rate variability level for a series of readings.
///
/// `None` when no sample carries a reading; [`HrVariability::Moderate`] when
/// there are readings but too few to classify.
pub fn classify_heart_rate(heart_rates: &[Option<i32>]) -> Option<HrVariability> {
    let valid: Vec<f64> = heart_rates
        .iter()
        .filter_map(|hr| hr.filter(|v| *v > 0))
        .map(f64::from)
        .collect();

    if valid.is_empty() {
        return None;
    }

    let level = classify_coefficient_of_variation(&valid, &HR_VARIABILITY_THRESHOLDS)
        .and_then(|level| HrVariability::from_level(level as u8));

    match level {
        Some(level) => Some(level),
        None => {
            warn!(
                samples = valid.len(),
                "Limited heart rate data, using default variability"
            );
            Some(HrVariability::Moderate)
        }
    }
}

/// Per-segment pace in seconds per km.
///
/// Only segments with timestamps at both ends and at least
/// [`MIN_SEGMENT_METERS`] of travel contribute.
pub fn segment_paces(points: &[TrackPoint], timestamps: &[Option<OffsetDateTime>]) -> Vec<f64> {
    points
        .windows(2)
        .zip(timestamps.windows(2))
        .filter_map(|(pair, times)| {
            let (Some(t0), Some(t1)) = (times[0], times[1]) else {
                return None;
            };
            let meters = distance_meters(pair[0], pair[1]);
            if meters <= MIN_SEGMENT_METERS {
                return None;
            }
            let seconds = (t1 - t0).as_seconds_f64();
            Some(seconds / (meters / 1000.0))
        })
        .collect()
}

/// Pace inconsistency level for a series of segment paces.
///
/// With no usable segment the track is assumed steady; with a handful the
/// moderate level is used.
pub fn classify_pace(paces: &[f64]) -> PaceInconsistency {
    if paces.is_empty() {
        warn!("No valid pace segments found, assuming steady pace");
        return PaceInconsistency::Steady;
    }

    match classify_coefficient_of_variation(paces, &PACE_INCONSISTENCY_THRESHOLDS)
        .and_then(|level| PaceInconsistency::from_level(level as u8))
    {
        Some(level) => {
            debug!(segments = paces.len(), ?level, "Classified pace inconsistency");
            level
        }
        None => {
            warn!(
                segments = paces.len(),
                "Limited pace data, using default inconsistency"
            );
            PaceInconsistency::Moderate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use time::macros::datetime;

    fn split(mean: i32, delta: i32) -> Vec<Option<i32>> {
        (0..10)
            .map(|i| Some(if i % 2 == 0 { mean - delta } else { mean + delta }))
            .collect()
    }

    #[test]
    fn test_cv_basics() {
        assert_eq!(coefficient_of_variation(&[]), None);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), None);
        assert_eq!(coefficient_of_variation(&[5.0, 5.0, 5.0]), Some(0.0));
        let cv = coefficient_of_variation(&[90.0, 110.0]).unwrap();
        assert!((cv - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_heart_rate_threshold_boundaries() {
        // CV exactly 0.03, 0.05 and 0.10
        assert_eq!(classify_heart_rate(&split(100, 3)), Some(HrVariability::Low));
        assert_eq!(classify_heart_rate(&split(100, 5)), Some(HrVariability::Moderate));
        assert_eq!(classify_heart_rate(&split(100, 10)), Some(HrVariability::High));
    }

    #[test]
    fn test_heart_rate_defaults() {
        assert_eq!(classify_heart_rate(&[None, Some(0), Some(-1)]), None);
        // Few readings, wildly different: still the default
        let few = vec![Some(60), Some(190), Some(75), None, Some(0)];
        assert_eq!(classify_heart_rate(&few), Some(HrVariability::Moderate));
    }

    #[test]
    fn test_heart_rate_ignores_missing_readings() {
        let mut samples = split(150, 1);
        samples.extend([None, Some(0), None]);
        assert_eq!(classify_heart_rate(&samples), Some(HrVariability::Low));
    }

    #[test]
    fn test_pace_levels() {
        let steady: Vec<f64> = (0..12).map(|i| 300.0 + f64::from(i % 2)).collect();
        assert_eq!(classify_pace(&steady), PaceInconsistency::Steady);

        let moderate: Vec<f64> = (0..10).map(|i| if i % 2 == 0 { 240.0 } else { 360.0 }).collect();
        assert_eq!(classify_pace(&moderate), PaceInconsistency::Moderate);

        let variable: Vec<f64> = (0..10).map(|i| if i % 2 == 0 { 210.0 } else { 390.0 }).collect();
        assert_eq!(classify_pace(&variable), PaceInconsistency::Variable);

        let erratic: Vec<f64> = (0..10).map(|i| if i % 2 == 0 { 100.0 } else { 500.0 }).collect();
        assert_eq!(classify_pace(&erratic), PaceInconsistency::Erratic);
    }

    #[test]
    fn test_pace_insufficient_segments() {
        let five = [200.0, 900.0, 310.0, 50.0, 1200.0];
        assert_eq!(classify_pace(&five), PaceInconsistency::Moderate);
        assert_eq!(classify_pace(&[]), PaceInconsistency::Steady);
    }

    #[test]
    fn test_segment_paces_skip_short_and_untimed_segments() {
        let start = datetime!(2024-06-01 06:00 UTC);
        let points = [
            TrackPoint::new(0.0, 0.0),
            TrackPoint::new(0.001, 0.0),       // ~111 m
            TrackPoint::new(0.001, 0.0000001), // ~1 cm
            TrackPoint::new(0.002, 0.0),       // ~111 m, but untimed
            TrackPoint::new(0.003, 0.0),
        ];
        let timestamps = [
            Some(start),
            Some(start + Duration::seconds(30)),
            Some(start + Duration::seconds(31)),
            None,
            Some(start + Duration::seconds(90)),
        ];

        let paces = segment_paces(&points, &timestamps);
        assert_eq!(paces.len(), 1);
        let expected = 30.0 / (distance_meters(points[0], points[1]) / 1000.0);
        assert!((paces[0] - expected).abs() < 1e-9);
    }
}
