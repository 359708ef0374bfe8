//! GPX output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::{OutputFormatter, RouteReport};

/// GPX formatter - outputs the route as a GPX track with endpoint waypoints
pub struct GpxFormatter;

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl OutputFormatter for GpxFormatter {
    fn name(&self) -> &str {
        "gpx"
    }

    fn description(&self) -> &str {
        "GPX track file"
    }

    fn format(&self, report: &RouteReport, _config: &Config) -> Result<String> {
        let name = escape_xml(&report.destination_label());
        let mut gpx = String::new();

        // XML header
        gpx.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        gpx.push('\n');
        gpx.push_str(r#"<gpx version="1.1" creator="navmap">"#);
        gpx.push('\n');

        // Metadata
        gpx.push_str("  <metadata>\n");
        gpx.push_str(&format!("    <name>Route to {}</name>\n", name));
        gpx.push_str(&format!("    <time>{}</time>\n", report.created_at.to_rfc3339()));
        gpx.push_str("  </metadata>\n");

        // Endpoints
        for (label, coord) in [("Start", report.origin), (name.as_str(), report.destination)] {
            gpx.push_str(&format!(
                r#"  <wpt lat="{}" lon="{}">"#,
                coord.latitude, coord.longitude
            ));
            gpx.push('\n');
            gpx.push_str(&format!("    <name>{}</name>\n", label));
            gpx.push_str("  </wpt>\n");
        }

        // Track
        gpx.push_str("  <trk>\n");
        gpx.push_str(&format!("    <name>{}</name>\n", name));
        if let (Some(km), Some(min)) = (report.route.distance_km(), report.route.duration_minutes()) {
            gpx.push_str(&format!("    <desc>{:.1} km, {} min</desc>\n", km, min));
        } else if report.route.is_fallback {
            gpx.push_str("    <desc>straight line</desc>\n");
        }
        gpx.push_str("    <trkseg>\n");
        for point in &report.route.path {
            gpx.push_str(&format!(
                "      <trkpt lat=\"{}\" lon=\"{}\"/>\n",
                point.latitude, point.longitude
            ));
        }
        gpx.push_str("    </trkseg>\n");
        gpx.push_str("  </trk>\n");

        gpx.push_str("</gpx>\n");
        Ok(gpx)
    }
}
