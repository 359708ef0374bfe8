//! JSON output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::{OutputFormatter, RouteReport};

/// JSON formatter - outputs the full report as pretty-printed JSON
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Full JSON route report"
    }

    fn format(&self, report: &RouteReport, _config: &Config) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}
