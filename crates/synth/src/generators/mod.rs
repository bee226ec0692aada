//! Generators for synthesized activity data.
//!
//! - [`GpxSynthesizer`]: timed GPX tracks from a route and an activity profile
//! - [`ChartSeriesGenerator`]: noisy pace and heart-rate preview series

pub mod chart;
pub mod track;

pub use chart::{ChartData, ChartSeries, ChartSeriesGenerator, ValueFormat};
pub use track::{GpxSynthesizer, SynthesizedPoint, SynthesizedTrack};
