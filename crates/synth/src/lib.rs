//! Activity synthesis for stride.
//!
//! Turns a hand-drawn route plus a target [`ActivityProfile`] into a
//! fully timed GPX document, and produces the noisy pace and heart-rate
//! series shown in the activity preview.
//!
//! All randomness is drawn from a caller-supplied [`rand::Rng`], so seeded
//! generators give reproducible output.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rand::SeedableRng;
//! use stride_synth::prelude::*;
//!
//! let route = Route::from_points(points).with_elevations(elevations);
//! route.validate_for_export()?;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let gpx = GpxSynthesizer::new().generate(&route.points, &route.elevations, &profile, &mut rng)?;
//! ```
//!
//! [`ActivityProfile`]: stride_tracks::models::ActivityProfile

pub mod config;
pub mod errors;
pub mod generators;
pub mod gpx;

pub use errors::SynthError;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::config::{ChartConfig, MetadataTimeTag, StrideConfig, SynthConfig};
    pub use crate::errors::SynthError;
    pub use crate::generators::{
        ChartData, ChartSeries, ChartSeriesGenerator, GpxSynthesizer, SynthesizedPoint,
        SynthesizedTrack, ValueFormat,
    };
    pub use crate::gpx::generate_gpx;
    pub use stride_tracks::prelude::*;
}
