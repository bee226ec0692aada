//! Timed track synthesis from a hand-drawn route.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::Serialize;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};
use tracing::info;

use stride_tracks::errors::TrackError;
use stride_tracks::geo_metrics::distance_meters;
use stride_tracks::models::{ActivityProfile, TrackPoint};

use crate::config::SynthConfig;
use crate::errors::SynthError;
use crate::gpx::generate_gpx;

/// One synthesized track point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedPoint {
    pub point: TrackPoint,
    /// Meters, rounded to millimeters.
    pub elevation: f64,
    /// Seconds since the start of the activity.
    pub elapsed_seconds: f64,
    /// Start instant plus elapsed time, at millisecond precision.
    pub timestamp: OffsetDateTime,
    pub heart_rate: i32,
}

/// A fully timed track, ready to be written as GPX.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedTrack {
    pub start: OffsetDateTime,
    pub points: Vec<SynthesizedPoint>,
}

impl SynthesizedTrack {
    pub fn duration_seconds(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.elapsed_seconds)
    }

    pub fn end(&self) -> OffsetDateTime {
        self.points.last().map_or(self.start, |p| p.timestamp)
    }
}

/// Builds GPX documents with realistic timing and heart rate from a route
/// and an activity profile.
///
/// Route length and minimum distance are the caller's responsibility (see
/// `Route::validate_for_export`); the only check performed here is that the
/// profile's date and start time form a valid instant.
#[derive(Debug, Clone, Default)]
pub struct GpxSynthesizer {
    config: SynthConfig,
}

impl GpxSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SynthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Start instant from the profile's `date` and `start_time`, read as UTC.
    pub fn start_instant(profile: &ActivityProfile) -> Result<OffsetDateTime, TrackError> {
        let date = Date::parse(profile.date.trim(), format_description!("[year]-[month]-[day]"))
            .map_err(|_| TrackError::invalid_date_or_time())?;

        let start_time = profile.start_time.trim();
        let time = Time::parse(start_time, format_description!("[hour]:[minute]:[second]"))
            .or_else(|_| Time::parse(start_time, format_description!("[hour]:[minute]")))
            .map_err(|_| TrackError::invalid_date_or_time())?;

        Ok(PrimitiveDateTime::new(date, time).assume_utc())
    }

    /// Assigns a timestamp, elevation and heart rate to every route point.
    ///
    /// Each segment takes the time the target pace implies for its length, but
    /// never less than a small random minimum, so timestamps strictly increase.
    pub fn synthesize_points(
        &self,
        route_points: &[TrackPoint],
        elevations: &[f64],
        profile: &ActivityProfile,
        rng: &mut impl Rng,
    ) -> Result<SynthesizedTrack, TrackError> {
        let start = Self::start_instant(profile)?;
        let seconds_per_km = profile.seconds_per_km();
        let hr_range = profile.config().hr_range;
        let hr_amplitude =
            f64::from(profile.hr_variability.level()) * self.config.hr_noise_per_level;
        let noise = Uniform::new_inclusive(-1.0, 1.0);

        let mut points = Vec::with_capacity(route_points.len());
        let mut elapsed_seconds = 0.0;

        for (i, &point) in route_points.iter().enumerate() {
            if i > 0 {
                let segment_meters = distance_meters(route_points[i - 1], point);
                let calculated = (segment_meters / 1000.0) * seconds_per_km;
                let minimum = sample_range(rng, self.config.min_segment_seconds);
                elapsed_seconds += calculated.max(minimum);
            }

            let elevation = elevations
                .get(i)
                .copied()
                .filter(|e| e.is_finite())
                .unwrap_or(self.config.default_elevation_m);

            let hr_noise = noise.sample(rng) * hr_amplitude;
            let heart_rate = (f64::from(profile.avg_heart_rate) * (1.0 + hr_noise)).round() as i32;

            let elapsed_ms = (elapsed_seconds * 1000.0).round() as i64;
            let timestamp = start
                .checked_add(Duration::milliseconds(elapsed_ms))
                .ok_or_else(TrackError::activity_out_of_range)?;
            points.push(SynthesizedPoint {
                point,
                elevation: (elevation * 1000.0).round() / 1000.0,
                elapsed_seconds: elapsed_ms as f64 / 1000.0,
                timestamp,
                heart_rate: heart_rate.clamp(hr_range.min, hr_range.max),
            });
        }

        Ok(SynthesizedTrack { start, points })
    }

    /// Synthesizes a complete GPX 1.1 document for the route.
    pub fn generate(
        &self,
        route_points: &[TrackPoint],
        elevations: &[f64],
        profile: &ActivityProfile,
        rng: &mut impl Rng,
    ) -> Result<String, SynthError> {
        let track = self.synthesize_points(route_points, elevations, profile, rng)?;

        info!(
            points = track.points.len(),
            duration_minutes = (track.duration_seconds() / 60.0).round(),
            "Synthesized GPX track"
        );

        generate_gpx(&track, &profile.name, &profile.description, &self.config)
    }
}

/// Uniform sample from `[min, max)`, or `min` for an empty range.
fn sample_range(rng: &mut impl Rng, (min, max): (f64, f64)) -> f64 {
    if max > min { rng.gen_range(min..max) } else { min }
}
