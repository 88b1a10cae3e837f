use std::error::Error;

use super::AggregationReport;

/// One row per group aggregation: group, field, function, result, formatted value
pub fn render(report: &AggregationReport) -> Result<String, Box<dyn Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["group", "field", "func", "result", "formatted_value"])?;

    for group in &report.groups {
        for aggregation in &group.aggregations {
            let spec = &aggregation.spec;
            writer.write_record([
                group.id.as_str(),
                spec.field.as_deref().unwrap_or_default(),
                spec.func.as_deref().unwrap_or_default(),
                aggregation.result.to_string().as_str(),
                aggregation.formatted_value.as_str(),
            ])?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| e.to_string())?;
    Ok(String::from_utf8(bytes)?)
}
