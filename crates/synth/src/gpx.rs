//! GPX 1.1 document writer for synthesized tracks.
//!
//! Output follows what fitness platforms accept for uploads: one track with a
//! single segment, every point carrying elevation, time and a Garmin
//! `TrackPointExtension` heart rate.

use std::fmt::Write;

use time::OffsetDateTime;
use time::UtcOffset;
use time::macros::format_description;

use crate::config::{MetadataTimeTag, SynthConfig};
use crate::errors::SynthError;
use crate::generators::SynthesizedTrack;

pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const TRACK_POINT_EXTENSION_NAMESPACE: &str =
    "http://www.garmin.com/xmlschemas/TrackPointExtension/v1";

const SCHEMA_LOCATION: &str = "http://www.topografix.com/GPX/1/1 \
http://www.topografix.com/GPX/1/1/gpx.xsd \
http://www.garmin.com/xmlschemas/TrackPointExtension/v1 \
http://www.garmin.com/xmlschemas/TrackPointExtensionv1.xsd";

/// UTC instant with millisecond precision, e.g. `2024-05-01T07:30:00.000Z`.
pub fn format_timestamp(instant: OffsetDateTime) -> Result<String, SynthError> {
    let utc = instant.to_offset(UtcOffset::UTC);
    Ok(utc.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ))?)
}

/// Renders a synthesized track as a GPX 1.1 document.
///
/// `description` is omitted when empty.
pub fn generate_gpx(
    track: &SynthesizedTrack,
    name: &str,
    description: &str,
    config: &SynthConfig,
) -> Result<String, SynthError> {
    let mut gpx = String::new();

    gpx.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    gpx.push('\n');
    write!(
        gpx,
        r#"<gpx xmlns="{GPX_NAMESPACE}" xmlns:xsi="{XSI_NAMESPACE}" xmlns:gpxtpx="{TRACK_POINT_EXTENSION_NAMESPACE}" version="1.1" creator="{}" xsi:schemaLocation="{SCHEMA_LOCATION}">"#,
        escape_xml(&config.creator)
    )?;
    gpx.push('\n');

    let start = format_timestamp(track.start)?;
    match config.metadata_time_tag {
        MetadataTimeTag::Legacy => writeln!(gpx, "  <metadate>{start}</metadate>")?,
        MetadataTimeTag::Standard => {
            writeln!(gpx, "  <metadata>\n    <time>{start}</time>\n  </metadata>")?
        }
    }

    gpx.push_str("  <trk>\n");
    writeln!(gpx, "    <name>{}</name>", escape_xml(name))?;
    if !description.is_empty() {
        writeln!(gpx, "    <desc>{}</desc>", escape_xml(description))?;
    }
    gpx.push_str("    <trkseg>\n");

    for p in &track.points {
        writeln!(
            gpx,
            r#"      <trkpt lat="{:.7}" lon="{:.7}">"#,
            p.point.lat, p.point.lon
        )?;
        writeln!(gpx, "        <ele>{}</ele>", p.elevation)?;
        writeln!(gpx, "        <time>{}</time>", format_timestamp(p.timestamp)?)?;
        gpx.push_str("        <extensions>\n");
        gpx.push_str("          <gpxtpx:TrackPointExtension>\n");
        writeln!(gpx, "            <gpxtpx:hr>{}</gpxtpx:hr>", p.heart_rate)?;
        gpx.push_str("          </gpxtpx:TrackPointExtension>\n");
        gpx.push_str("        </extensions>\n");
        gpx.push_str("      </trkpt>\n");
    }

    gpx.push_str("    </trkseg>\n");
    gpx.push_str("  </trk>\n");
    gpx.push_str("</gpx>\n");

    Ok(gpx)
}

/// Escapes XML special characters in a string.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
