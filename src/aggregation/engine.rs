use std::collections::HashMap;

use bigdecimal::BigDecimal;
use tracing::debug;

use super::{AggregateFunction, AttributeSource, GroupAggregation, GroupAggregationSpec};
use crate::errors::AggregationResult;
use crate::field::{decimal_to_f64, format_decimal, parse_decimal, Field};

/// Significant digits kept when dividing for `avg`
const DIVISION_PRECISION: u64 = 20;

/// Computes one result per spec over the attribute lists of `children`.
///
/// The output has the same length and order as `specs`. A spec without
/// `field` or `func`, or one that never sees a numeric value, yields `0`.
/// Members whose attribute is missing or not a finite number are skipped for
/// that spec. `avg` divides the total by `children.len()`, counting members
/// that had no usable value.
///
/// Fails only for a `func` outside `sum|min|max|avg`, before any scanning.
pub fn aggregate<T: AttributeSource>(
    children: &[T],
    specs: &[GroupAggregationSpec],
) -> AggregationResult<Vec<GroupAggregation>> {
    let mut plan: Vec<Option<(&str, AggregateFunction)>> = Vec::with_capacity(specs.len());
    for spec in specs {
        let step = match (&spec.field, &spec.func) {
            (Some(field), Some(func)) => Some((field.as_str(), func.parse::<AggregateFunction>()?)),
            _ => None,
        };
        plan.push(step);
    }

    let mut accumulators: Vec<Option<BigDecimal>> = vec![None; specs.len()];

    for child in children {
        let fields: HashMap<&str, &Field> = child
            .attributes()
            .iter()
            .map(|field| (field.key.as_str(), field))
            .collect();

        for (accumulator, step) in accumulators.iter_mut().zip(&plan) {
            let Some((key, function)) = step else {
                continue;
            };
            let Some(value) = fields.get(key).and_then(|f| parse_decimal(&f.value)) else {
                continue;
            };
            *accumulator = Some(reduce(*function, accumulator.take(), value));
        }
    }

    let member_count = children.len();
    let results: Vec<GroupAggregation> = specs
        .iter()
        .zip(plan)
        .zip(accumulators)
        .map(|((spec, step), accumulator)| {
            let accumulator = match (step, accumulator) {
                (Some((_, AggregateFunction::Avg)), Some(total)) => {
                    Some((total / BigDecimal::from(member_count as u64)).with_prec(DIVISION_PRECISION))
                }
                (_, accumulator) => accumulator,
            };
            let value = accumulator.unwrap_or_else(|| BigDecimal::from(0));
            GroupAggregation {
                spec: spec.clone(),
                result: decimal_to_f64(&value),
                formatted_value: format_decimal(&value, spec.format_variant),
            }
        })
        .collect();

    debug!(
        "Aggregated {} spec(s) over {} member(s)",
        results.len(),
        member_count
    );

    Ok(results)
}

fn reduce(
    function: AggregateFunction,
    accumulator: Option<BigDecimal>,
    value: BigDecimal,
) -> BigDecimal {
    match (function, accumulator) {
        (_, None) => value,
        (AggregateFunction::Sum | AggregateFunction::Avg, Some(acc)) => acc + value,
        (AggregateFunction::Min, Some(acc)) => acc.min(value),
        (AggregateFunction::Max, Some(acc)) => acc.max(value),
    }
}
