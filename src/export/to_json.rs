use std::error::Error;

use super::AggregationReport;

pub fn render(report: &AggregationReport) -> Result<String, Box<dyn Error>> {
    Ok(serde_json::to_string_pretty(report)?)
}
