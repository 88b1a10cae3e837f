use serde::{Deserialize, Serialize};

use super::GroupAggregation;

/// Which endpoint-group aggregations an edge echoes in its label.
///
/// Indices point into the source and target groups' aggregation rows.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgeAggregationSelection {
    #[serde(default)]
    pub source: Vec<usize>,
    #[serde(default)]
    pub target: Vec<usize>,
}

impl EdgeAggregationSelection {
    pub fn new(source: Vec<usize>, target: Vec<usize>) -> Self {
        Self { source, target }
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.target.is_empty()
    }
}

/// Selected source aggregations in selection order, then selected target ones.
///
/// Indices past the end of a list, or pointing at a row without `func`, are
/// dropped.
pub fn compose_edge_aggregations(
    selection: &EdgeAggregationSelection,
    source_aggregations: &[GroupAggregation],
    target_aggregations: &[GroupAggregation],
) -> Vec<GroupAggregation> {
    fn pick<'a>(
        indices: &'a [usize],
        aggregations: &'a [GroupAggregation],
    ) -> impl Iterator<Item = &'a GroupAggregation> + 'a {
        indices
            .iter()
            .filter_map(move |&idx| aggregations.get(idx))
            .filter(|aggregation| aggregation.spec.func.is_some())
    }

    pick(&selection.source, source_aggregations)
        .chain(pick(&selection.target, target_aggregations))
        .cloned()
        .collect()
}
