//! Human-readable text output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::{OutputFormatter, RouteReport};

/// Text formatter - outputs a human-readable route summary
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Human-readable route summary"
    }

    fn format(&self, report: &RouteReport, _config: &Config) -> Result<String> {
        let route = &report.route;
        let mut output = String::new();

        output.push_str(&format!("Route to {}\n", report.destination_label()));
        output.push_str(&format!("From: {}\n", report.origin));
        output.push_str(&format!("To:   {}\n", report.destination));

        match (route.distance_km(), route.duration_minutes()) {
            (Some(km), Some(min)) => {
                output.push_str(&format!("Distance: {:.1} km\n", km));
                output.push_str(&format!("Duration: {} min\n", min));
            }
            _ => {
                output.push_str(&format!(
                    "Distance: ~{:.1} km (straight line)\n",
                    route.estimated_distance_meters() / 1000.0
                ));
            }
        }
        output.push_str(&format!("Points: {}\n", route.path.len()));

        if route.is_fallback {
            output.push_str("\nRouting service unavailable; showing a straight line.\n");
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::sample_report;
    use crate::route::RouteResult;

    #[test]
    fn test_text_format() {
        let output = TextFormatter
            .format(&sample_report(), &Config::default())
            .unwrap();

        assert!(output.starts_with("Route to Tokyo Tower\n"));
        assert!(output.contains("Distance: 3.9 km"));
        assert!(output.contains("Duration: 10 min"));
        assert!(output.contains("Points: 3"));
        assert!(!output.contains("straight line"));
    }

    #[test]
    fn test_text_format_fallback() {
        let mut report = sample_report();
        report.route = RouteResult::fallback(report.origin, report.destination);

        let output = TextFormatter.format(&report, &Config::default()).unwrap();
        assert!(output.contains("(straight line)"));
        assert!(!output.contains("Duration"));
        assert!(output.contains("Routing service unavailable"));
    }
}
