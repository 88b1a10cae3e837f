use super::{AggregateFunction, GroupAggregation};

/// Separator between aggregations rendered on one label
pub const LABEL_SEPARATOR: &str = " | ";

const UNSET_FUNCTION: &str = "[function]";
const UNSET_FIELD: &str = "[field]";
const UNSET_RESULT: &str = "0";

/// Renders `"<function> <field>: <value>"` for one aggregation.
///
/// The field label is preferred over the field key and the formatted value
/// over the raw result. Unset parts render as fixed placeholders.
pub fn format_aggregation_label(aggregation: &GroupAggregation) -> String {
    let spec = &aggregation.spec;

    let function = match spec.func.as_deref() {
        Some(func) => func
            .parse::<AggregateFunction>()
            .map(|f| f.title().to_string())
            .unwrap_or_else(|_| func.to_string()),
        None => UNSET_FUNCTION.to_string(),
    };

    let field = spec
        .field_label
        .as_deref()
        .filter(|label| !label.is_empty())
        .or(spec.field.as_deref())
        .unwrap_or(UNSET_FIELD);

    let value = if !aggregation.formatted_value.is_empty() {
        aggregation.formatted_value.clone()
    } else if aggregation.result != 0.0 {
        aggregation.result.to_string()
    } else {
        UNSET_RESULT.to_string()
    };

    format!("{} {}: {}", function, field, value)
}

/// Joins the labels of the visible aggregations.
pub fn format_aggregation_labels<'a, I>(aggregations: I) -> String
where
    I: IntoIterator<Item = &'a GroupAggregation>,
{
    aggregations
        .into_iter()
        .filter(|aggregation| aggregation.spec.is_visible)
        .map(format_aggregation_label)
        .collect::<Vec<_>>()
        .join(LABEL_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::GroupAggregationSpec;

    fn aggregation(spec: GroupAggregationSpec, result: f64, formatted: &str) -> GroupAggregation {
        GroupAggregation {
            spec,
            result,
            formatted_value: formatted.to_string(),
        }
    }

    #[test]
    fn test_label_prefers_field_label_and_formatted_value() {
        let agg = aggregation(
            GroupAggregationSpec::new("amount", "sum").with_field_label("Amount"),
            1500.0,
            "1,500",
        );
        assert_eq!(format_aggregation_label(&agg), "Sum Amount: 1,500");
    }

    #[test]
    fn test_label_falls_back_to_key_and_raw_result() {
        let agg = aggregation(GroupAggregationSpec::new("amount", "avg"), 12.5, "");
        assert_eq!(format_aggregation_label(&agg), "Avg amount: 12.5");
    }

    #[test]
    fn test_label_placeholders() {
        let agg = aggregation(GroupAggregationSpec::default(), 0.0, "");
        assert_eq!(format_aggregation_label(&agg), "[function] [field]: 0");
    }

    #[test]
    fn test_labels_join_visible_only() {
        let aggs = vec![
            aggregation(GroupAggregationSpec::new("a", "min"), 1.0, "1"),
            aggregation(GroupAggregationSpec::new("b", "max").hidden(), 2.0, "2"),
            aggregation(GroupAggregationSpec::new("c", "sum"), 3.0, "3"),
        ];
        assert_eq!(format_aggregation_labels(&aggs), "Min a: 1 | Sum c: 3");
        assert_eq!(format_aggregation_labels(&Vec::<GroupAggregation>::new()), "");
    }
}
