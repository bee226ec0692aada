use std::fmt;

use geo::{BoundingRect, LineString, Rect};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::errors::RouteError;
use crate::geo_metrics;

/// Elevation used whenever a point has no usable elevation reading.
pub const DEFAULT_ELEVATION_M: f64 = 10.0;

/// Minimum route length accepted for export, in meters.
pub const MIN_EXPORT_DISTANCE_M: f64 = 100.0;

/// A single recorded or drawn position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
}

impl TrackPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// An ordered series of points with parallel per-point sensor arrays.
///
/// `elevations`, `timestamps` and `heart_rates` are either empty (entirely
/// unknown) or exactly as long as `points`. A heart rate of `None` or `<= 0`
/// means "no reading".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub points: Vec<TrackPoint>,
    #[serde(default)]
    pub elevations: Vec<f64>,
    #[serde(default, with = "rfc3339_vec")]
    pub timestamps: Vec<Option<OffsetDateTime>>,
    #[serde(default)]
    pub heart_rates: Vec<Option<i32>>,
}

impl Route {
    pub fn from_points(points: Vec<TrackPoint>) -> Self {
        Self {
            points,
            ..Default::default()
        }
    }

    pub fn with_elevations(mut self, elevations: Vec<f64>) -> Self {
        self.elevations = elevations;
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Elevation at `index`, falling back to [`DEFAULT_ELEVATION_M`].
    pub fn elevation_at(&self, index: usize) -> f64 {
        self.elevations
            .get(index)
            .copied()
            .filter(|e| e.is_finite())
            .unwrap_or(DEFAULT_ELEVATION_M)
    }

    /// Heart-rate samples that carry an actual reading.
    pub fn valid_heart_rates(&self) -> Vec<i32> {
        self.heart_rates
            .iter()
            .filter_map(|hr| hr.filter(|v| *v > 0))
            .collect()
    }

    /// Total length in kilometers.
    pub fn distance_km(&self) -> f64 {
        geo_metrics::route_distance(&self.points, Units::Km)
    }

    /// Geographic bounds of the route, `None` for an empty route.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        let line: LineString<f64> = self.points.iter().map(|p| (p.lon, p.lat)).collect();
        line.bounding_rect()
    }

    /// True when every populated parallel array matches the point count.
    pub fn is_consistent(&self) -> bool {
        let n = self.points.len();
        [
            self.elevations.len(),
            self.timestamps.len(),
            self.heart_rates.len(),
        ]
        .iter()
        .all(|&len| len == 0 || len == n)
    }

    /// Checks the rules a route must satisfy before a GPX is synthesized from it.
    pub fn validate_for_export(&self) -> Result<(), RouteError> {
        if self.points.len() < 2 {
            return Err(RouteError::TooFewPoints(self.points.len()));
        }
        let meters = self.distance_km() * 1000.0;
        if meters < MIN_EXPORT_DISTANCE_M {
            return Err(RouteError::TooShort(meters));
        }
        Ok(())
    }
}

mod rfc3339_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use time::OffsetDateTime;

    #[derive(Serialize, Deserialize)]
    #[serde(transparent)]
    struct Wrapped(#[serde(with = "time::serde::rfc3339::option")] Option<OffsetDateTime>);

    pub fn serialize<S: Serializer>(
        values: &[Option<OffsetDateTime>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let wrapped: Vec<Wrapped> = values.iter().copied().map(Wrapped).collect();
        wrapped.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Option<OffsetDateTime>>, D::Error> {
        let wrapped = Vec::<Wrapped>::deserialize(deserializer)?;
        Ok(wrapped.into_iter().map(|w| w.0).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Running,
    Walking,
    Hiking,
    Cycling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaceType {
    Pace,
    Speed,
}

/// Inclusive numeric range used by the activity table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange<T> {
    pub min: T,
    pub max: T,
}

/// Fixed per-activity tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActivityConfig {
    pub pace_type: PaceType,
    /// Minutes per unit for pace activities, speed for cycling.
    pub pace_range: ValueRange<f64>,
    pub hr_range: ValueRange<i32>,
    pub elevation_factor: f64,
    pub routing_profile: &'static str,
}

const RUNNING: ActivityConfig = ActivityConfig {
    pace_type: PaceType::Pace,
    pace_range: ValueRange { min: 3.0, max: 8.0 },
    hr_range: ValueRange { min: 120, max: 180 },
    elevation_factor: 1.0,
    routing_profile: "foot",
};

const CYCLING: ActivityConfig = ActivityConfig {
    pace_type: PaceType::Speed,
    pace_range: ValueRange {
        min: 15.0,
        max: 45.0,
    },
    hr_range: ValueRange { min: 110, max: 170 },
    elevation_factor: 0.8,
    routing_profile: "cycling",
};

const WALKING: ActivityConfig = ActivityConfig {
    pace_type: PaceType::Pace,
    pace_range: ValueRange {
        min: 8.0,
        max: 15.0,
    },
    hr_range: ValueRange { min: 80, max: 140 },
    elevation_factor: 1.2,
    routing_profile: "foot",
};

const HIKING: ActivityConfig = ActivityConfig {
    pace_type: PaceType::Pace,
    pace_range: ValueRange {
        min: 10.0,
        max: 20.0,
    },
    hr_range: ValueRange { min: 90, max: 160 },
    elevation_factor: 1.5,
    routing_profile: "foot",
};

impl ActivityType {
    pub fn config(self) -> &'static ActivityConfig {
        match self {
            ActivityType::Running => &RUNNING,
            ActivityType::Cycling => &CYCLING,
            ActivityType::Walking => &WALKING,
            ActivityType::Hiking => &HIKING,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Running => "running",
            ActivityType::Walking => "walking",
            ActivityType::Hiking => "hiking",
            ActivityType::Cycling => "cycling",
        }
    }

    pub fn is_speed_based(self) -> bool {
        self.config().pace_type == PaceType::Speed
    }

    /// Guesses the activity type from keywords in an imported file name.
    pub fn detect_from_file_name(file_name: &str) -> Option<Self> {
        const KEYWORDS: [(&[&str], ActivityType); 4] = [
            (&["run", "jog"], ActivityType::Running),
            (&["walk"], ActivityType::Walking),
            (&["bike", "cycle"], ActivityType::Cycling),
            (&["hike"], ActivityType::Hiking),
        ];

        let name = file_name.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(words, _)| words.iter().any(|w| name.contains(w)))
            .map(|(_, activity)| *activity)
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Km,
    Mi,
}

impl Units {
    pub fn distance_label(self) -> &'static str {
        match self {
            Units::Km => "km",
            Units::Mi => "mi",
        }
    }

    pub fn speed_label(self) -> &'static str {
        match self {
            Units::Km => "km/h",
            Units::Mi => "mph",
        }
    }

    pub fn pace_format(self) -> PaceFormat {
        match self {
            Units::Km => PaceFormat::MinPerKm,
            Units::Mi => PaceFormat::MinPerMi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaceFormat {
    #[default]
    #[serde(rename = "min/km")]
    MinPerKm,
    #[serde(rename = "min/mi")]
    MinPerMi,
}

impl PaceFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PaceFormat::MinPerKm => "min/km",
            PaceFormat::MinPerMi => "min/mi",
        }
    }
}

impl fmt::Display for PaceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target effort: a pace (time per distance unit) or, for cycling, a speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaceValue {
    Pace { minutes: u32, seconds: u32 },
    Speed(f64),
}

impl PaceValue {
    pub const fn pace(minutes: u32, seconds: u32) -> Self {
        PaceValue::Pace { minutes, seconds }
    }

    /// Seconds per distance unit. A speed is inverted into the equivalent pace.
    pub fn total_seconds(self) -> f64 {
        match self {
            PaceValue::Pace { minutes, seconds } => {
                f64::from(minutes) * 60.0 + f64::from(seconds)
            }
            PaceValue::Speed(speed) if speed > 0.0 => 3600.0 / speed,
            PaceValue::Speed(_) => 0.0,
        }
    }

    /// Distance units per hour. A pace is inverted into the equivalent speed.
    pub fn speed(self) -> f64 {
        match self {
            PaceValue::Speed(speed) => speed,
            PaceValue::Pace { .. } => {
                let seconds = self.total_seconds();
                if seconds > 0.0 { 3600.0 / seconds } else { 0.0 }
            }
        }
    }
}

/// Minutes and seconds per kilometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pace {
    pub minutes: u32,
    pub seconds: u32,
}

impl Pace {
    pub fn from_seconds_per_km(seconds_per_km: f64) -> Self {
        let total = seconds_per_km.max(0.0).round() as u32;
        Self {
            minutes: total / 60,
            seconds: total % 60,
        }
    }
}

/// Slider level controlling how noisy the pace is (0 = steady, 3 = erratic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PaceInconsistency {
    #[default]
    Steady = 0,
    Moderate = 1,
    Variable = 2,
    Erratic = 3,
}

/// Slider level controlling how noisy the heart rate is (0 = low, 2 = high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HrVariability {
    Low = 0,
    #[default]
    Moderate = 1,
    High = 2,
}

macro_rules! ordinal_conversions {
    ($ty:ident, [$($level:literal => $variant:ident),+ $(,)?]) => {
        impl $ty {
            pub fn level(self) -> u8 {
                self as u8
            }

            pub fn index(self) -> usize {
                self as usize
            }

            pub fn from_level(level: u8) -> Option<Self> {
                match level {
                    $($level => Some($ty::$variant),)+
                    _ => None,
                }
            }
        }

        impl TryFrom<u8> for $ty {
            type Error = String;

            fn try_from(level: u8) -> Result<Self, Self::Error> {
                $ty::from_level(level)
                    .ok_or_else(|| format!("{} level out of range: {level}", stringify!($ty)))
            }
        }

        impl From<$ty> for u8 {
            fn from(value: $ty) -> u8 {
                value.level()
            }
        }
    };
}

ordinal_conversions!(PaceInconsistency, [0 => Steady, 1 => Moderate, 2 => Variable, 3 => Erratic]);
ordinal_conversions!(HrVariability, [0 => Low, 1 => Moderate, 2 => High]);

/// Target parameters for a synthesized activity, as entered in the activity form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Wall-clock start, `HH:MM` or `HH:MM:SS`. Interpreted as UTC.
    pub start_time: String,
    pub activity_type: ActivityType,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub pace_format: PaceFormat,
    pub pace: PaceValue,
    pub avg_heart_rate: i32,
    #[serde(default)]
    pub pace_inconsistency: PaceInconsistency,
    #[serde(default)]
    pub hr_variability: HrVariability,
}

impl Default for ActivityProfile {
    fn default() -> Self {
        Self {
            name: "Afternoon Run".to_string(),
            description: "A great run today!".to_string(),
            date: "2024-01-01".to_string(),
            start_time: "08:00".to_string(),
            activity_type: ActivityType::Running,
            units: Units::Km,
            pace_format: PaceFormat::MinPerKm,
            pace: PaceValue::pace(5, 30),
            avg_heart_rate: 150,
            pace_inconsistency: PaceInconsistency::Moderate,
            hr_variability: HrVariability::Moderate,
        }
    }
}

impl ActivityProfile {
    /// Profile with the default pace and heart rate for `activity_type`.
    pub fn for_activity(activity_type: ActivityType) -> Self {
        let config = activity_type.config();
        let pace = if activity_type.is_speed_based() {
            PaceValue::Speed(25.0)
        } else {
            let minutes = ((config.pace_range.min + config.pace_range.max) / 2.0).round();
            PaceValue::pace(minutes as u32, 30)
        };
        let avg_heart_rate =
            (f64::from(config.hr_range.min + config.hr_range.max) / 2.0).round() as i32;

        Self {
            activity_type,
            pace,
            avg_heart_rate,
            ..Default::default()
        }
    }

    /// Switches distance units; the pace format follows.
    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self.pace_format = units.pace_format();
        self
    }

    pub fn config(&self) -> &'static ActivityConfig {
        self.activity_type.config()
    }

    /// Average pace the synthesizer spaces points by, in seconds per km.
    pub fn seconds_per_km(&self) -> f64 {
        geo_metrics::seconds_per_km(self.activity_type, self.pace, self.units, self.pace_format)
    }

    /// Copies every value an imported GPX provided onto this profile.
    pub fn apply_metadata(&mut self, metadata: &ActivityMetadata) {
        self.name = metadata.name.clone();
        self.description = metadata.description.clone();

        let start = metadata.start_time;
        self.date = format!(
            "{:04}-{:02}-{:02}",
            start.year(),
            u8::from(start.month()),
            start.day()
        );
        self.start_time = format!("{:02}:{:02}", start.hour(), start.minute());

        if let Some(pace) = metadata.pace {
            self.pace = PaceValue::pace(pace.minutes, pace.seconds);
        }
        if let Some(hr) = metadata.avg_heart_rate {
            self.avg_heart_rate = hr;
        }
        if let Some(hr_variability) = metadata.hr_variability {
            self.hr_variability = hr_variability;
        }
        self.pace_inconsistency = metadata.pace_inconsistency;
    }

    /// Download name for a GPX built from this profile.
    pub fn export_file_name(&self) -> String {
        format!("{}_{}.gpx", self.name.replace(' ', "_"), self.activity_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingAccuracy {
    Low,
    Medium,
    High,
}

impl TimingAccuracy {
    pub fn from_point_count(point_count: usize) -> Self {
        if point_count > 100 {
            TimingAccuracy::High
        } else if point_count > 20 {
            TimingAccuracy::Medium
        } else {
            TimingAccuracy::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuality {
    pub point_count: usize,
    pub has_detailed_timing: bool,
    pub has_heart_rate_data: bool,
    pub timing_accuracy: TimingAccuracy,
}

/// Caveats worth surfacing to the user after an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityWarning {
    LimitedTiming { point_count: usize },
    ModerateTiming { point_count: usize },
    NoHeartRate,
    LimitedHeartRate { samples: usize },
}

impl fmt::Display for QualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityWarning::LimitedTiming { point_count } => write!(
                f,
                "Limited timing data ({point_count} points); pace variability may be inaccurate"
            ),
            QualityWarning::ModerateTiming { point_count } => write!(
                f,
                "Moderate timing data ({point_count} points); variability values are estimates"
            ),
            QualityWarning::NoHeartRate => {
                f.write_str("No heart rate data found; using default heart rate variability")
            }
            QualityWarning::LimitedHeartRate { samples } => write!(
                f,
                "Limited heart rate data ({samples} samples); HR variability may be inaccurate"
            ),
        }
    }
}

/// Activity summary derived from an imported GPX document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetadata {
    pub name: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    /// Kilometers.
    pub distance: Option<f64>,
    /// Seconds.
    pub duration: Option<f64>,
    pub pace: Option<Pace>,
    pub avg_heart_rate: Option<i32>,
    /// Number of heart-rate samples carrying a reading.
    #[serde(default)]
    pub heart_rate_samples: usize,
    pub hr_variability: Option<HrVariability>,
    pub pace_inconsistency: PaceInconsistency,
    pub data_quality: Option<DataQuality>,
}

impl ActivityMetadata {
    pub const DEFAULT_NAME: &'static str = "Imported Activity";
    pub const DEFAULT_DESCRIPTION: &'static str = "Imported from GPX file";

    /// Metadata for a document that yielded no usable track.
    pub fn empty(start_time: OffsetDateTime) -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            description: Self::DEFAULT_DESCRIPTION.to_string(),
            start_time,
            distance: None,
            duration: None,
            pace: None,
            avg_heart_rate: None,
            heart_rate_samples: 0,
            hr_variability: None,
            pace_inconsistency: PaceInconsistency::Steady,
            data_quality: None,
        }
    }

    pub fn quality_warnings(&self) -> Vec<QualityWarning> {
        let Some(quality) = self.data_quality else {
            return Vec::new();
        };

        let mut warnings = Vec::new();
        match quality.timing_accuracy {
            TimingAccuracy::Low => warnings.push(QualityWarning::LimitedTiming {
                point_count: quality.point_count,
            }),
            TimingAccuracy::Medium => warnings.push(QualityWarning::ModerateTiming {
                point_count: quality.point_count,
            }),
            TimingAccuracy::High => {}
        }

        if !quality.has_heart_rate_data {
            warnings.push(QualityWarning::NoHeartRate);
        } else if self.heart_rate_samples < crate::variability::MIN_SAMPLES {
            warnings.push(QualityWarning::LimitedHeartRate {
                samples: self.heart_rate_samples,
            });
        }
        warnings
    }
}
