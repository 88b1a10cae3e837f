//! Aggregation rows and results for every group, keyed by group id.
//!
//! The graph owns membership, this table owns what each group aggregates and
//! the last computed results. Every edit recomputes the affected group from
//! the graph as it is at call time; the newest computation replaces the
//! previous one.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregation::{
    aggregate, compose_edge_aggregations, format_aggregation_labels, GroupAggregation,
    GroupAggregationSpec,
};
use crate::errors::{GraphError, GraphResult};
use crate::graph::{Edge, Graph, MembershipChange};

/// Presentation class carried by groups with at least one aggregation row
pub const HAS_AGGREGATIONS_CLASS: &str = "has-aggregations";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct GroupAggregationEntry {
    pub specs: Vec<GroupAggregationSpec>,
    pub aggregations: Vec<GroupAggregation>,
    pub classes: IndexSet<String>,
}

impl GroupAggregationEntry {
    fn store(&mut self, specs: Vec<GroupAggregationSpec>, aggregations: Vec<GroupAggregation>) {
        self.specs = specs;
        self.aggregations = aggregations;
        if self.aggregations.is_empty() {
            self.classes.shift_remove(HAS_AGGREGATIONS_CLASS);
        } else {
            self.classes.insert(HAS_AGGREGATIONS_CLASS.to_string());
        }
    }

    pub fn label(&self) -> String {
        format_aggregation_labels(&self.aggregations)
    }
}

#[derive(Clone, Debug, Default)]
pub struct GroupAggregationState {
    groups: IndexMap<String, GroupAggregationEntry>,
}

impl GroupAggregationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, group_id: &str) -> Option<&GroupAggregationEntry> {
        self.groups.get(group_id)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&String, &GroupAggregationEntry)> {
        self.groups.iter()
    }

    /// Last computed results; empty for groups without rows
    pub fn aggregations(&self, group_id: &str) -> &[GroupAggregation] {
        self.groups
            .get(group_id)
            .map(|entry| entry.aggregations.as_slice())
            .unwrap_or_default()
    }

    pub fn has_aggregations(&self, group_id: &str) -> bool {
        self.groups
            .get(group_id)
            .is_some_and(|entry| entry.classes.contains(HAS_AGGREGATIONS_CLASS))
    }

    /// Replaces all rows of a group.
    pub fn set_aggregations(
        &mut self,
        graph: &Graph,
        group_id: &str,
        specs: Vec<GroupAggregationSpec>,
    ) -> GraphResult<&[GroupAggregation]> {
        self.commit(graph, group_id, specs)
    }

    pub fn add_aggregation(
        &mut self,
        graph: &Graph,
        group_id: &str,
        spec: GroupAggregationSpec,
    ) -> GraphResult<&[GroupAggregation]> {
        let mut specs = self.current_specs(group_id);
        specs.push(spec);
        self.commit(graph, group_id, specs)
    }

    pub fn update_aggregation(
        &mut self,
        graph: &Graph,
        group_id: &str,
        index: usize,
        spec: GroupAggregationSpec,
    ) -> GraphResult<&[GroupAggregation]> {
        let mut specs = self.current_specs(group_id);
        let row = specs
            .get_mut(index)
            .ok_or_else(|| out_of_range(group_id, index, self.current_len(group_id)))?;
        *row = spec;
        self.commit(graph, group_id, specs)
    }

    pub fn remove_aggregation(
        &mut self,
        graph: &Graph,
        group_id: &str,
        index: usize,
    ) -> GraphResult<&[GroupAggregation]> {
        let mut specs = self.current_specs(group_id);
        if index >= specs.len() {
            return Err(out_of_range(group_id, index, specs.len()));
        }
        specs.remove(index);
        self.commit(graph, group_id, specs)
    }

    /// Recomputes one group from its current members.
    pub fn recompute(&mut self, graph: &Graph, group_id: &str) -> GraphResult<&[GroupAggregation]> {
        let specs = self.current_specs(group_id);
        self.commit(graph, group_id, specs)
    }

    pub fn recompute_all(&mut self, graph: &Graph) -> GraphResult<()> {
        let group_ids: Vec<String> = self.groups.keys().cloned().collect();
        for group_id in group_ids {
            self.recompute(graph, &group_id)?;
        }
        Ok(())
    }

    /// Drops entries of removed groups and recomputes the affected ones that
    /// declare rows.
    pub fn apply_membership_change(
        &mut self,
        graph: &Graph,
        change: &MembershipChange,
    ) -> GraphResult<()> {
        for group_id in &change.removed_groups {
            self.remove_group(group_id);
        }
        for group_id in &change.affected_groups {
            if self.groups.contains_key(group_id) {
                self.recompute(graph, group_id)?;
            }
        }
        Ok(())
    }

    pub fn remove_group(&mut self, group_id: &str) -> Option<GroupAggregationEntry> {
        let removed = self.groups.shift_remove(group_id);
        if removed.is_some() {
            debug!("Dropped aggregation state of group {}", group_id);
        }
        removed
    }

    /// Endpoint aggregations selected by the edge, source first.
    pub fn edge_aggregations(&self, edge: &Edge) -> Vec<GroupAggregation> {
        compose_edge_aggregations(
            &edge.aggregations,
            self.aggregations(&edge.source),
            self.aggregations(&edge.target),
        )
    }

    pub fn edge_label(&self, edge: &Edge) -> String {
        format_aggregation_labels(&self.edge_aggregations(edge))
    }

    fn current_specs(&self, group_id: &str) -> Vec<GroupAggregationSpec> {
        self.groups
            .get(group_id)
            .map(|entry| entry.specs.clone())
            .unwrap_or_default()
    }

    fn current_len(&self, group_id: &str) -> usize {
        self.groups.get(group_id).map_or(0, |entry| entry.specs.len())
    }

    /// Computes first, stores only on success.
    fn commit(
        &mut self,
        graph: &Graph,
        group_id: &str,
        specs: Vec<GroupAggregationSpec>,
    ) -> GraphResult<&[GroupAggregation]> {
        let members = graph.get_group_members(group_id)?;
        let aggregations = aggregate(&members, &specs)?;

        debug!(
            "Recomputed {} aggregation(s) for group {} over {} member(s)",
            aggregations.len(),
            group_id,
            members.len()
        );

        let entry = self.groups.entry(group_id.to_string()).or_default();
        entry.store(specs, aggregations);
        Ok(entry.aggregations.as_slice())
    }
}

fn out_of_range(group_id: &str, index: usize, len: usize) -> GraphError {
    GraphError::AggregationIndexOutOfRange {
        group: group_id.to_string(),
        index,
        len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::EdgeAggregationSelection;
    use crate::errors::AggregationError;
    use crate::field::Field;
    use crate::graph::Node;

    fn create_test_graph() -> Graph {
        Graph {
            name: "Sales".to_string(),
            nodes: vec![
                Node::new_group("north", "North"),
                Node::new_group("south", "South"),
                Node::new("a", "A")
                    .in_group("north")
                    .with_attr(Field::new("amount", "100")),
                Node::new("b", "B")
                    .in_group("north")
                    .with_attr(Field::new("amount", "50")),
                Node::new("c", "C")
                    .in_group("south")
                    .with_attr(Field::new("amount", "7")),
            ],
            edges: vec![Edge {
                aggregations: EdgeAggregationSelection::new(vec![0, 5], vec![0]),
                ..Edge::new("e1", "north", "south")
            }],
        }
    }

    #[test]
    fn test_add_aggregation_computes_and_marks_group() {
        let graph = create_test_graph();
        let mut state = GroupAggregationState::new();
        assert!(!state.has_aggregations("north"));

        let results = state
            .add_aggregation(&graph, "north", GroupAggregationSpec::new("amount", "sum"))
            .unwrap();
        assert_eq!(results[0].result, 150.0);
        assert!(state.has_aggregations("north"));
        assert_eq!(state.get("north").unwrap().label(), "Sum amount: 150");
    }

    #[test]
    fn test_update_and_remove_rows() {
        let graph = create_test_graph();
        let mut state = GroupAggregationState::new();
        state
            .add_aggregation(&graph, "north", GroupAggregationSpec::new("amount", "sum"))
            .unwrap();

        let results = state
            .update_aggregation(&graph, "north", 0, GroupAggregationSpec::new("amount", "min"))
            .unwrap();
        assert_eq!(results[0].result, 50.0);

        assert!(matches!(
            state.update_aggregation(&graph, "north", 3, GroupAggregationSpec::default()),
            Err(GraphError::AggregationIndexOutOfRange { index: 3, len: 1, .. })
        ));

        let results = state.remove_aggregation(&graph, "north", 0).unwrap();
        assert!(results.is_empty());
        assert!(!state.has_aggregations("north"));
        assert!(state.remove_aggregation(&graph, "north", 0).is_err());
    }

    #[test]
    fn test_invalid_function_leaves_state_untouched() {
        let graph = create_test_graph();
        let mut state = GroupAggregationState::new();
        state
            .add_aggregation(&graph, "north", GroupAggregationSpec::new("amount", "max"))
            .unwrap();

        let err = state
            .add_aggregation(&graph, "north", GroupAggregationSpec::new("amount", "median"))
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Aggregation(AggregationError::InvalidAggregateFunction(_))
        ));
        assert_eq!(state.get("north").unwrap().specs.len(), 1);
        assert_eq!(state.aggregations("north")[0].result, 100.0);
    }

    #[test]
    fn test_unknown_group_is_rejected() {
        let graph = create_test_graph();
        let mut state = GroupAggregationState::new();
        assert!(matches!(
            state.add_aggregation(&graph, "west", GroupAggregationSpec::new("amount", "sum")),
            Err(GraphError::GroupNotFound(_))
        ));
        assert!(state.get("west").is_none());
    }

    #[test]
    fn test_membership_change_recomputes_affected_groups() {
        let mut graph = create_test_graph();
        let mut state = GroupAggregationState::new();
        state
            .add_aggregation(&graph, "north", GroupAggregationSpec::new("amount", "sum"))
            .unwrap();
        state
            .add_aggregation(&graph, "south", GroupAggregationSpec::new("amount", "sum"))
            .unwrap();

        let change = graph.move_node("a", Some("south")).unwrap();
        state.apply_membership_change(&graph, &change).unwrap();
        assert_eq!(state.aggregations("north")[0].result, 50.0);
        assert_eq!(state.aggregations("south")[0].result, 107.0);

        let change = graph.ungroup("south").unwrap();
        state.apply_membership_change(&graph, &change).unwrap();
        assert!(state.get("south").is_none());
        assert!(state.aggregations("south").is_empty());
    }

    #[test]
    fn test_edge_label_composes_endpoint_results() {
        let graph = create_test_graph();
        let mut state = GroupAggregationState::new();
        state
            .set_aggregations(
                &graph,
                "north",
                vec![GroupAggregationSpec::new("amount", "sum").with_field_label("Amount")],
            )
            .unwrap();
        state
            .set_aggregations(&graph, "south", vec![GroupAggregationSpec::new("amount", "max")])
            .unwrap();

        let edge = &graph.edges[0];
        let composed = state.edge_aggregations(edge);
        assert_eq!(composed.len(), 2);
        assert_eq!(state.edge_label(edge), "Sum Amount: 150 | Max amount: 7");
    }

    #[test]
    fn test_recompute_all_follows_graph_edits() {
        let mut graph = create_test_graph();
        let mut state = GroupAggregationState::new();
        state
            .add_aggregation(&graph, "north", GroupAggregationSpec::new("amount", "avg"))
            .unwrap();
        assert_eq!(state.aggregations("north")[0].result, 75.0);

        graph.nodes.push(Node::new("d", "D").in_group("north"));
        state.recompute_all(&graph).unwrap();
        assert_eq!(state.aggregations("north")[0].result, 50.0);
    }
}
