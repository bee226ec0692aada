//! GPX import: track points, sensor data and derived activity metadata.
//!
//! Parsing never fails. A document that is not well-formed XML, or that holds
//! no usable track points, yields an empty [`Route`] with default metadata;
//! callers treat `route.is_empty()` as "no track found".
//!
//! Values that GPX writers place in different spots (track name, start time,
//! heart rate) are looked up through ordered source lists, first hit wins.

use time::OffsetDateTime;
use time::format_description::well_known::{Iso8601, Rfc3339};
use tracing::{debug, warn};

use crate::geo_metrics;
use crate::models::{
    ActivityMetadata, DataQuality, DEFAULT_ELEVATION_M, Pace, PaceInconsistency, Route,
    TimingAccuracy, TrackPoint, Units,
};
use crate::variability;
use crate::xml_tree::{self, Element};

/// `(parent, child)` element pairs tried in order for the activity name.
pub const NAME_SOURCES: [(&str, &str); 2] = [("trk", "name"), ("metadata", "name")];

/// `(parent, child)` element pairs tried in order for the description.
pub const DESCRIPTION_SOURCES: [(&str, &str); 2] = [("metadata", "desc"), ("trk", "desc")];

/// Tag some writers (including ours, by default) use for the document time.
pub const LEGACY_METADATA_TIME_TAG: &str = "metadate";

/// Where an activity start time may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTimeSource {
    /// `<metadata><time>`
    MetadataTime,
    /// Top-level `<metadate>` element.
    LegacyMetadataTag,
    /// Timestamp of the first track point.
    FirstPoint,
}

pub const START_TIME_SOURCES: [StartTimeSource; 3] = [
    StartTimeSource::MetadataTime,
    StartTimeSource::LegacyMetadataTag,
    StartTimeSource::FirstPoint,
];

impl StartTimeSource {
    fn resolve(self, doc: &Element, route: &Route) -> Option<OffsetDateTime> {
        match self {
            StartTimeSource::MetadataTime => doc
                .find_child_of("metadata", "time")
                .and_then(|e| parse_timestamp(e.text())),
            StartTimeSource::LegacyMetadataTag => doc
                .find(|e| e.local_name() == LEGACY_METADATA_TIME_TAG)
                .and_then(|e| parse_timestamp(e.text())),
            StartTimeSource::FirstPoint => route.timestamps.first().copied().flatten(),
        }
    }
}

/// Where a track point's heart rate may be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartRateSource {
    /// A prefixed extension element such as `<gpxtpx:hr>`.
    NamespacedExtension,
    /// An unprefixed `<hr>` directly under `<trkpt>`.
    Bare,
    /// `<extensions><TrackPointExtension><hr>`, matched by local names.
    NestedExtension,
}

pub const HEART_RATE_SOURCES: [HeartRateSource; 3] = [
    HeartRateSource::NamespacedExtension,
    HeartRateSource::Bare,
    HeartRateSource::NestedExtension,
];

impl HeartRateSource {
    fn locate(self, trkpt: &Element) -> Option<&Element> {
        match self {
            HeartRateSource::NamespacedExtension => {
                trkpt.find(|e| e.prefix().is_some() && e.local_name() == "hr")
            }
            HeartRateSource::Bare => trkpt.children.iter().find(|e| e.name == "hr"),
            HeartRateSource::NestedExtension => {
                trkpt.path(&["extensions", "TrackPointExtension", "hr"])
            }
        }
    }
}

/// Result of importing a GPX document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGpx {
    pub route: Route,
    pub metadata: ActivityMetadata,
}

impl ParsedGpx {
    fn empty(now: OffsetDateTime) -> Self {
        Self {
            route: Route::default(),
            metadata: ActivityMetadata::empty(now),
        }
    }
}

pub struct GpxParser;

impl GpxParser {
    /// Parses a GPX document, using the current time where no start time is recorded.
    pub fn parse(content: &str) -> ParsedGpx {
        Self::parse_at(content, OffsetDateTime::now_utc())
    }

    /// Parses a GPX document with an explicit "now" for the start-time fallback.
    pub fn parse_at(content: &str, now: OffsetDateTime) -> ParsedGpx {
        let doc = match xml_tree::parse(content) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Malformed GPX document: {e}");
                return ParsedGpx::empty(now);
            }
        };

        let route = Self::extract_route(&doc);
        let metadata = Self::extract_metadata(&doc, &route, now);

        debug!(
            points = route.len(),
            name = %metadata.name,
            "Parsed GPX document"
        );

        ParsedGpx { route, metadata }
    }

    fn extract_route(doc: &Element) -> Route {
        let mut route = Route::default();

        for trkpt in doc.descendants().filter(|e| e.local_name() == "trkpt") {
            let (Some(lat), Some(lon)) = (
                parse_coordinate(trkpt.attribute("lat")),
                parse_coordinate(trkpt.attribute("lon")),
            ) else {
                debug!(
                    lat = ?trkpt.attribute("lat"),
                    lon = ?trkpt.attribute("lon"),
                    "Skipping track point without numeric coordinates"
                );
                continue;
            };

            let elevation = trkpt
                .child("ele")
                .and_then(|e| e.text().parse::<f64>().ok())
                .filter(|e| e.is_finite())
                .unwrap_or(DEFAULT_ELEVATION_M);

            let timestamp = trkpt
                .child("time")
                .and_then(|e| parse_timestamp(e.text()));

            let heart_rate = HEART_RATE_SOURCES
                .iter()
                .find_map(|source| source.locate(trkpt))
                .and_then(|e| parse_leading_int(e.text()));

            route.points.push(TrackPoint::new(lat, lon));
            route.elevations.push(elevation);
            route.timestamps.push(timestamp);
            route.heart_rates.push(heart_rate);
        }

        route
    }

    fn extract_metadata(doc: &Element, route: &Route, now: OffsetDateTime) -> ActivityMetadata {
        let mut metadata = ActivityMetadata::empty(now);

        if let Some(name) = first_text(doc, &NAME_SOURCES) {
            metadata.name = name;
        }
        if let Some(description) = first_text(doc, &DESCRIPTION_SOURCES) {
            metadata.description = description;
        }
        if let Some(start) = START_TIME_SOURCES
            .iter()
            .find_map(|source| source.resolve(doc, route))
        {
            metadata.start_time = start;
        }

        if let (true, Some(Some(first)), Some(Some(last))) = (
            route.len() > 1,
            route.timestamps.first(),
            route.timestamps.last(),
        ) {
            let duration = (*last - *first).as_seconds_f64();
            let distance = geo_metrics::route_distance(&route.points, Units::Km);

            metadata.duration = Some(duration);
            metadata.distance = Some(distance);
            if distance > 0.0 {
                metadata.pace = Some(Pace::from_seconds_per_km(duration / distance));
            }
            metadata.data_quality = Some(DataQuality {
                point_count: route.len(),
                has_detailed_timing: route.len() > 100,
                has_heart_rate_data: route.heart_rates.iter().any(|hr| hr.is_some_and(|v| v > 0)),
                timing_accuracy: TimingAccuracy::from_point_count(route.len()),
            });
        }

        let valid_heart_rates = route.valid_heart_rates();
        metadata.heart_rate_samples = valid_heart_rates.len();
        if !valid_heart_rates.is_empty() {
            let sum: f64 = valid_heart_rates.iter().copied().map(f64::from).sum();
            metadata.avg_heart_rate = Some((sum / valid_heart_rates.len() as f64).round() as i32);
        }
        metadata.hr_variability = variability::classify_heart_rate(&route.heart_rates);

        metadata.pace_inconsistency = if metadata.pace.is_some() && route.timestamps.len() > 5 {
            let paces = variability::segment_paces(&route.points, &route.timestamps);
            variability::classify_pace(&paces)
        } else {
            debug!("Insufficient timing data for pace variability, assuming steady pace");
            PaceInconsistency::Steady
        };

        metadata
    }
}

/// Text of the first `(parent, child)` source present with non-empty content.
fn first_text(doc: &Element, sources: &[(&str, &str)]) -> Option<String> {
    sources
        .iter()
        .filter_map(|(parent, child)| doc.find_child_of(parent, child))
        .map(|e| e.text())
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

fn parse_coordinate(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parses an RFC 3339 timestamp, falling back to general ISO 8601.
pub fn parse_timestamp(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();
    OffsetDateTime::parse(text, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(text, &Iso8601::DEFAULT))
        .ok()
}

/// Integer value of the leading digits, e.g. `"148.6"` reads as 148.
fn parse_leading_int(text: &str) -> Option<i32> {
    let text = text.trim();
    let digits_end = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(text.len(), |(i, _)| i);
    text[..digits_end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HrVariability;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2030-01-01 12:00 UTC);

    fn trkpt(lat: f64, lon: f64, extra: &str) -> String {
        format!(r#"<trkpt lat="{lat}" lon="{lon}">{extra}</trkpt>"#)
    }

    fn document(metadata: &str, track_extra: &str, points: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1"
     xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
  {metadata}
  <trk>{track_extra}<trkseg>{}</trkseg></trk>
</gpx>"#,
            points.join("\n")
        )
    }

    fn timed_points(count: usize, seconds_apart: i64) -> Vec<String> {
        let start = datetime!(2024-06-01 06:00 UTC);
        (0..count)
            .map(|i| {
                let t = start + time::Duration::seconds(seconds_apart * i as i64);
                trkpt(
                    40.0 + 0.001 * i as f64,
                    -105.0,
                    &format!(
                        "<ele>{}</ele><time>{}</time>",
                        1600 + i,
                        t.format(&Rfc3339).unwrap()
                    ),
                )
            })
            .collect()
    }

    #[test]
    fn test_parse_points_and_defaults() {
        let points = vec![
            trkpt(45.5, -122.5, "<ele>100.5</ele><time>2024-01-01T00:00:00Z</time>"),
            trkpt(45.51, -122.51, "<ele>abc</ele>"),
        ];
        let parsed = GpxParser::parse_at(&document("", "", &points), NOW);

        assert_eq!(parsed.route.len(), 2);
        assert_eq!(parsed.route.points[0], TrackPoint::new(45.5, -122.5));
        assert_eq!(parsed.route.elevations, vec![100.5, DEFAULT_ELEVATION_M]);
        assert_eq!(
            parsed.route.timestamps,
            vec![Some(datetime!(2024-01-01 0:00 UTC)), None]
        );
        assert_eq!(parsed.route.heart_rates, vec![None, None]);
        assert!(parsed.route.is_consistent());

        assert_eq!(parsed.metadata.name, ActivityMetadata::DEFAULT_NAME);
        assert_eq!(parsed.metadata.description, ActivityMetadata::DEFAULT_DESCRIPTION);
        assert_eq!(parsed.metadata.start_time, datetime!(2024-01-01 0:00 UTC));
        // Last point has no time: nothing derived
        assert_eq!(parsed.metadata.duration, None);
        assert_eq!(parsed.metadata.data_quality, None);
        assert_eq!(parsed.metadata.pace_inconsistency, PaceInconsistency::Steady);
    }

    #[test]
    fn test_points_without_coordinates_are_skipped() {
        let points = vec![
            r#"<trkpt lat="x" lon="1.0"/>"#.to_string(),
            r#"<trkpt lon="1.0"/>"#.to_string(),
            trkpt(1.0, 2.0, ""),
        ];
        let parsed = GpxParser::parse_at(&document("", "", &points), NOW);
        assert_eq!(parsed.route.points, vec![TrackPoint::new(1.0, 2.0)]);
        assert_eq!(parsed.metadata.start_time, NOW);
    }

    #[test]
    fn test_heart_rate_sources() {
        let namespaced = trkpt(
            1.0,
            1.0,
            "<extensions><gpxtpx:TrackPointExtension><gpxtpx:hr>142</gpxtpx:hr>\
             </gpxtpx:TrackPointExtension></extensions>",
        );
        let bare = trkpt(1.0, 1.0, "<hr>133</hr>");
        let nested = trkpt(
            1.0,
            1.0,
            r#"<extensions><TrackPointExtension xmlns="urn:tpx"><hr>128.7</hr></TrackPointExtension></extensions>"#,
        );
        let other_prefix = trkpt(
            1.0,
            1.0,
            "<extensions><ns3:TrackPointExtension><ns3:hr>150</ns3:hr>\
             </ns3:TrackPointExtension></extensions>",
        );
        let missing = trkpt(1.0, 1.0, "<extensions><cad>80</cad></extensions>");

        let parsed = GpxParser::parse_at(
            &document("", "", &[namespaced, bare, nested, other_prefix, missing]),
            NOW,
        );
        assert_eq!(
            parsed.route.heart_rates,
            vec![Some(142), Some(133), Some(128), Some(150), None]
        );
    }

    #[test]
    fn test_each_heart_rate_source_matches_its_own_layout() {
        let matches = |content: String| -> Vec<HeartRateSource> {
            let point = xml_tree::parse(&content).unwrap();
            HEART_RATE_SOURCES
                .into_iter()
                .filter(|source| source.locate(&point).is_some())
                .collect()
        };

        assert_eq!(
            matches(trkpt(
                1.0,
                1.0,
                "<extensions><gpxtpx:TrackPointExtension><gpxtpx:hr>142</gpxtpx:hr>\
                 </gpxtpx:TrackPointExtension></extensions>",
            )),
            vec![HeartRateSource::NamespacedExtension]
        );
        assert_eq!(
            matches(trkpt(1.0, 1.0, "<hr>133</hr>")),
            vec![HeartRateSource::Bare]
        );
        assert_eq!(
            matches(trkpt(
                1.0,
                1.0,
                "<extensions><TrackPointExtension><hr>128</hr></TrackPointExtension></extensions>",
            )),
            vec![HeartRateSource::NestedExtension]
        );

        // Unprefixed and outside the known layouts
        assert!(matches(trkpt(1.0, 1.0, "<extensions><hr>99</hr></extensions>")).is_empty());
    }

    #[test]
    fn test_namespaced_heart_rate_wins_over_bare() {
        let both = trkpt(
            1.0,
            1.0,
            "<hr>90</hr><extensions><gpxtpx:hr>160</gpxtpx:hr></extensions>",
        );
        let parsed = GpxParser::parse_at(&document("", "", &[both]), NOW);
        assert_eq!(parsed.route.heart_rates, vec![Some(160)]);
    }

    #[test]
    fn test_name_and_description_chains() {
        let points = vec![trkpt(1.0, 1.0, "")];

        let both = document(
            "<metadata><name>Meta Name</name><desc>Meta Desc</desc></metadata>",
            "<name>Track Name</name><desc>Track Desc</desc>",
            &points,
        );
        let parsed = GpxParser::parse_at(&both, NOW);
        assert_eq!(parsed.metadata.name, "Track Name");
        assert_eq!(parsed.metadata.description, "Meta Desc");

        let fallback = document(
            "<metadata><name>Meta Name</name></metadata>",
            "<desc>Track Desc</desc>",
            &points,
        );
        let parsed = GpxParser::parse_at(&fallback, NOW);
        assert_eq!(parsed.metadata.name, "Meta Name");
        assert_eq!(parsed.metadata.description, "Track Desc");
    }

    #[test]
    fn test_start_time_chain() {
        let points = timed_points(2, 60);

        let metadata_time = document(
            "<metadata><time>2023-05-05T10:00:00Z</time></metadata>\
             <metadate>2022-01-01T00:00:00Z</metadate>",
            "",
            &points,
        );
        assert_eq!(
            GpxParser::parse_at(&metadata_time, NOW).metadata.start_time,
            datetime!(2023-05-05 10:00 UTC)
        );

        let legacy = document("<metadate>2022-01-01T00:00:00.000Z</metadate>", "", &points);
        assert_eq!(
            GpxParser::parse_at(&legacy, NOW).metadata.start_time,
            datetime!(2022-01-01 0:00 UTC)
        );

        let first_point = document("", "", &points);
        assert_eq!(
            GpxParser::parse_at(&first_point, NOW).metadata.start_time,
            datetime!(2024-06-01 06:00 UTC)
        );
    }

    #[test]
    fn test_derived_metrics() {
        // 11 points, ~111 m apart, 30 s apart
        let parsed = GpxParser::parse_at(&document("", "", &timed_points(11, 30)), NOW);
        let metadata = &parsed.metadata;

        assert_eq!(metadata.duration, Some(300.0));
        let distance = metadata.distance.unwrap();
        assert!((distance - 1.1119).abs() < 0.001);
        // 300 s / 1.112 km = 269.8 s/km
        assert_eq!(metadata.pace, Some(Pace { minutes: 4, seconds: 30 }));
        assert_eq!(metadata.pace_inconsistency, PaceInconsistency::Steady);
        assert_eq!(metadata.avg_heart_rate, None);
        assert_eq!(metadata.hr_variability, None);

        let quality = metadata.data_quality.unwrap();
        assert_eq!(quality.point_count, 11);
        assert!(!quality.has_detailed_timing);
        assert!(!quality.has_heart_rate_data);
        assert_eq!(quality.timing_accuracy, TimingAccuracy::Low);
    }

    #[test]
    fn test_timing_accuracy_tiers() {
        for (count, expected) in [
            (20, TimingAccuracy::Low),
            (21, TimingAccuracy::Medium),
            (100, TimingAccuracy::Medium),
            (101, TimingAccuracy::High),
        ] {
            let parsed = GpxParser::parse_at(&document("", "", &timed_points(count, 10)), NOW);
            let quality = parsed.metadata.data_quality.unwrap();
            assert_eq!(quality.timing_accuracy, expected, "{count} points");
            assert_eq!(quality.has_detailed_timing, count > 100);
        }
    }

    #[test]
    fn test_few_pace_segments_default_to_moderate() {
        // 6 timestamps (> 5) but only 5 segments
        let parsed = GpxParser::parse_at(&document("", "", &timed_points(6, 30)), NOW);
        assert_eq!(parsed.metadata.pace_inconsistency, PaceInconsistency::Moderate);

        // Too few timestamps to try at all
        let parsed = GpxParser::parse_at(&document("", "", &timed_points(5, 30)), NOW);
        assert_eq!(parsed.metadata.pace_inconsistency, PaceInconsistency::Steady);
    }

    #[test]
    fn test_heart_rate_summary() {
        let points: Vec<String> = [150, 0, 152, 148]
            .iter()
            .map(|hr| trkpt(1.0, 1.0, &format!("<gpxtpx:hr>{hr}</gpxtpx:hr>")))
            .collect();
        let parsed = GpxParser::parse_at(&document("", "", &points), NOW);

        assert_eq!(parsed.metadata.avg_heart_rate, Some(150));
        assert_eq!(parsed.metadata.heart_rate_samples, 3);
        assert_eq!(parsed.metadata.hr_variability, Some(HrVariability::Moderate));
    }

    #[test]
    fn test_stationary_track_has_no_pace() {
        let points = vec![
            trkpt(1.0, 1.0, "<time>2024-01-01T00:00:00Z</time>"),
            trkpt(1.0, 1.0, "<time>2024-01-01T00:10:00Z</time>"),
        ];
        let parsed = GpxParser::parse_at(&document("", "", &points), NOW);
        assert_eq!(parsed.metadata.duration, Some(600.0));
        assert_eq!(parsed.metadata.distance, Some(0.0));
        assert_eq!(parsed.metadata.pace, None);
        assert!(parsed.metadata.data_quality.is_some());
    }

    #[test]
    fn test_malformed_input_degrades_to_empty() {
        for input in ["", "not xml at all", "<gpx><trk><trkseg></trk></gpx>"] {
            let parsed = GpxParser::parse_at(input, NOW);
            assert!(parsed.route.is_empty(), "{input:?}");
            assert_eq!(parsed.metadata, ActivityMetadata::empty(NOW));
        }
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int(" 148 "), Some(148));
        assert_eq!(parse_leading_int("148.9"), Some(148));
        assert_eq!(parse_leading_int("bpm"), None);
        assert_eq!(parse_leading_int(""), None);
    }
}
