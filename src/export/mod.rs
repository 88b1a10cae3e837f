pub mod to_csv_groups;
pub mod to_json;

use serde::Serialize;

use crate::aggregation::{format_aggregation_labels, GroupAggregation};
use crate::graph::Graph;
use crate::state::GroupAggregationState;

/// Computed payload of one group, as the widget would attach it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GroupReport {
    pub id: String,
    pub label: String,
    pub member_count: usize,
    pub classes: Vec<String>,
    pub aggregations: Vec<GroupAggregation>,
    pub aggregation_label: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EdgeReport {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    pub aggregations: Vec<GroupAggregation>,
    pub aggregation_label: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AggregationReport {
    pub name: String,
    pub groups: Vec<GroupReport>,
    pub edges: Vec<EdgeReport>,
}

impl AggregationReport {
    /// Collects every group of the graph and every edge that echoes at
    /// least one endpoint aggregation.
    pub fn build(graph: &Graph, state: &GroupAggregationState) -> Self {
        let groups = graph
            .get_groups()
            .into_iter()
            .map(|group| {
                let entry = state.get(&group.id);
                let aggregations = state.aggregations(&group.id).to_vec();
                GroupReport {
                    id: group.id.clone(),
                    label: group.label.clone(),
                    member_count: graph.get_children(group).len(),
                    classes: entry
                        .map(|e| e.classes.iter().cloned().collect())
                        .unwrap_or_default(),
                    aggregation_label: format_aggregation_labels(&aggregations),
                    aggregations,
                }
            })
            .collect();

        let edges = graph
            .edges
            .iter()
            .filter(|edge| !edge.aggregations.is_empty())
            .map(|edge| {
                let aggregations = state.edge_aggregations(edge);
                EdgeReport {
                    id: edge.id.clone(),
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    label: edge.label.clone(),
                    aggregation_label: format_aggregation_labels(&aggregations),
                    aggregations,
                }
            })
            .collect();

        Self {
            name: graph.name.clone(),
            groups,
            edges,
        }
    }
}
