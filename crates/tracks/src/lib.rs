//! GPX track ingestion and route metrics for stride.
//!
//! This crate turns GPX documents into a normalized [`models::Route`] plus
//! derived [`models::ActivityMetadata`], and computes the route metrics the
//! activity form displays (distance, elevation gain, pace and duration).
//!
//! Everything here is a pure function of its inputs: no I/O, no randomness.
//!
//! ```rust,ignore
//! use stride_tracks::prelude::*;
//!
//! let parsed = GpxParser::parse(&gpx_text);
//! if parsed.route.is_empty() {
//!     // surface "no track points found" to the user
//! }
//! let km = route_distance(&parsed.route.points, Units::Km);
//! ```

pub mod errors;
pub mod geo_metrics;
pub mod gpx_parser;
pub mod models;
pub mod variability;
mod xml_tree;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::errors::{RouteError, TrackError};
    pub use crate::geo_metrics::{
        PaceAndDuration, distance_meters, elevation_gain, format_duration, pace_and_duration,
        route_distance, seconds_per_km,
    };
    pub use crate::gpx_parser::{GpxParser, ParsedGpx};
    pub use crate::models::{
        ActivityConfig, ActivityMetadata, ActivityProfile, ActivityType, DataQuality,
        HrVariability, Pace, PaceFormat, PaceInconsistency, PaceValue, QualityWarning, Route,
        TimingAccuracy, TrackPoint, Units,
    };
    pub use crate::variability::{classify_heart_rate, classify_pace, segment_paces};
}
