//! Geodesic distance, elevation gain and pace/duration math.
//!
//! All mile/kilometer conversions go through [`KM_PER_MILE`]; the reciprocal
//! is derived from it rather than written out as a second literal.

use serde::Serialize;

use crate::models::{ActivityType, PaceFormat, PaceValue, TrackPoint, Units};

/// Mean earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub const KM_PER_MILE: f64 = 1.60934;
pub const MILES_PER_KM: f64 = 1.0 / KM_PER_MILE;

/// Great-circle distance between two points in meters.
pub fn distance_meters(a: TrackPoint, b: TrackPoint) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

pub fn km_to_units(km: f64, units: Units) -> f64 {
    match units {
        Units::Km => km,
        Units::Mi => km / KM_PER_MILE,
    }
}

pub fn units_to_km(value: f64, units: Units) -> f64 {
    match units {
        Units::Km => value,
        Units::Mi => value * KM_PER_MILE,
    }
}

/// Length of the polyline through `points` in `units`. Zero for fewer than two points.
pub fn route_distance(points: &[TrackPoint], units: Units) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    let meters: f64 = points
        .windows(2)
        .map(|pair| distance_meters(pair[0], pair[1]))
        .sum();

    km_to_units(meters / 1000.0, units)
}

/// Sum of positive elevation deltas, rounded to whole meters.
pub fn elevation_gain(elevations: &[f64]) -> u32 {
    if elevations.len() < 2 {
        return 0;
    }

    let gain: f64 = elevations
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|delta| *delta > 0.0)
        .sum();

    gain.round() as u32
}

/// Target effort expressed as seconds per kilometer.
///
/// Cycling reads the effort as a speed in `units`; everything else reads it as
/// time per `pace_format` distance unit. Returns 0 for a non-positive speed.
pub fn seconds_per_km(
    activity_type: ActivityType,
    pace: PaceValue,
    units: Units,
    pace_format: PaceFormat,
) -> f64 {
    if activity_type.is_speed_based() {
        let speed_kmh = units_to_km(pace.speed(), units);
        if speed_kmh > 0.0 { 3600.0 / speed_kmh } else { 0.0 }
    } else {
        let seconds = pace.total_seconds();
        match pace_format {
            PaceFormat::MinPerKm => seconds,
            PaceFormat::MinPerMi => seconds * KM_PER_MILE,
        }
    }
}

/// Display strings and raw duration for the stats panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaceAndDuration {
    pub pace_display: String,
    pub duration_display: String,
    pub duration_seconds: f64,
}

/// Pace (or speed) display and expected duration for covering `distance`
/// (in `units`) at the given effort.
pub fn pace_and_duration(
    distance: f64,
    activity_type: ActivityType,
    pace: PaceValue,
    units: Units,
    pace_format: PaceFormat,
) -> PaceAndDuration {
    let distance_km = units_to_km(distance, units);
    let duration_seconds = distance_km * seconds_per_km(activity_type, pace, units, pace_format);

    let pace_display = if activity_type.is_speed_based() {
        format!("{} {}", pace.speed(), units.speed_label())
    } else {
        let (minutes, seconds) = match pace {
            PaceValue::Pace { minutes, seconds } => (minutes, seconds),
            PaceValue::Speed(_) => {
                let total = pace.total_seconds().round() as u32;
                (total / 60, total % 60)
            }
        };
        format!("{minutes}:{seconds:02} {pace_format}")
    };

    PaceAndDuration {
        pace_display,
        duration_display: format_duration(duration_seconds),
        duration_seconds,
    }
}

/// Formats seconds as zero-padded `HH:MM:SS`, truncating fractions.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
