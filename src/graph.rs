use std::collections::HashSet;

use csv::StringRecord;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregation::EdgeAggregationSelection;
use crate::common::{is_truthy, non_null, strip_quotes_and_whitespace};
use crate::data_loader::{EdgeLoadProfile, NodeLoadProfile};
use crate::errors::{GraphError, GraphResult};
use crate::field::Field;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Graph {
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Groups whose membership changed after a graph edit.
///
/// Handed to the aggregation state so it can recompute exactly those groups.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MembershipChange {
    /// Groups that still exist and whose direct members changed
    pub affected_groups: Vec<String>,
    /// Groups that no longer exist
    pub removed_groups: Vec<String>,
}

impl MembershipChange {
    fn touch(&mut self, group_id: Option<&str>) {
        if let Some(id) = group_id {
            if !self.affected_groups.iter().any(|g| g == id) {
                self.affected_groups.push(id.to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.affected_groups.is_empty() && self.removed_groups.is_empty()
    }
}

impl Graph {
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn get_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn get_root_nodes(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.belongs_to.is_none() && n.is_partition)
            .collect()
    }

    pub fn get_children(&self, parent: &Node) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.belongs_to.as_deref() == Some(&parent.id))
            .collect()
    }

    pub fn get_groups(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.is_partition).collect()
    }

    /// Direct members of a group, the nodes its aggregations scan.
    pub fn get_group_members(&self, group_id: &str) -> GraphResult<Vec<&Node>> {
        let group = self.get_group(group_id)?;
        Ok(self.get_children(group))
    }

    fn get_group(&self, group_id: &str) -> GraphResult<&Node> {
        let group = self
            .get_node(group_id)
            .ok_or_else(|| GraphError::GroupNotFound(group_id.to_string()))?;
        if !group.is_partition {
            return Err(GraphError::NotAGroup(group_id.to_string()));
        }
        Ok(group)
    }

    /// Walks `belongs_to` upwards from the node's parent, stopping on cycles.
    pub fn get_ancestors(&self, id: &str) -> Vec<&Node> {
        let mut ancestors = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get_node(id).and_then(|n| n.belongs_to.as_deref());
        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                break;
            }
            match self.get_node(parent_id) {
                Some(parent) => {
                    ancestors.push(parent);
                    current = parent.belongs_to.as_deref();
                }
                None => break,
            }
        }
        ancestors
    }

    pub fn remove_node(&mut self, id: &str) {
        self.nodes.retain(|n| n.id != id);
    }

    pub fn set_node(&mut self, node: Node) {
        let idx = self.nodes.iter().position(|n| n.id == node.id);
        if let Some(idx) = idx {
            self.nodes[idx] = node;
        } else {
            self.nodes.push(node);
        }
    }

    pub fn stats(&self) -> String {
        format!(
            "Nodes: {}, Groups: {}, Edges: {}",
            self.nodes.len(),
            self.get_groups().len(),
            self.edges.len()
        )
    }

    /// Creates a group node and moves `member_ids` into it.
    ///
    /// The new group sits under the members' common parent, or at the root
    /// when they come from different parents.
    pub fn group_nodes(
        &mut self,
        group_id: &str,
        label: &str,
        member_ids: &[String],
    ) -> GraphResult<MembershipChange> {
        if self.get_node(group_id).is_some() {
            return Err(GraphError::NodeAlreadyExists(group_id.to_string()));
        }

        let mut parents: IndexSet<Option<String>> = IndexSet::new();
        for member_id in member_ids {
            let member = self
                .get_node(member_id)
                .ok_or_else(|| GraphError::NodeNotFound(member_id.clone()))?;
            parents.insert(member.belongs_to.clone());
        }

        let common_parent = match parents.len() {
            1 => parents.first().cloned().flatten(),
            _ => None,
        };
        let layer = member_ids
            .first()
            .and_then(|id| self.get_node(id))
            .map(|n| n.layer.clone())
            .unwrap_or_default();

        self.nodes.push(Node {
            id: group_id.to_string(),
            label: label.to_string(),
            layer,
            is_partition: true,
            belongs_to: common_parent.clone(),
            attrs: Vec::new(),
            comment: None,
        });

        let mut change = MembershipChange::default();
        change.touch(Some(group_id));
        change.touch(common_parent.as_deref());
        for parent in parents.iter().flatten() {
            change.touch(Some(parent));
        }

        for member_id in member_ids {
            if let Some(member) = self.get_node_mut(member_id) {
                member.belongs_to = Some(group_id.to_string());
            }
        }

        debug!(
            "Grouped {} node(s) into {}: {}",
            member_ids.len(),
            group_id,
            self.stats()
        );
        Ok(change)
    }

    /// Removes a group node, lifting its members to the group's parent.
    ///
    /// Edges attached to the group itself are dropped.
    pub fn ungroup(&mut self, group_id: &str) -> GraphResult<MembershipChange> {
        let parent = self.get_group(group_id)?.belongs_to.clone();

        for node in self.nodes.iter_mut() {
            if node.belongs_to.as_deref() == Some(group_id) {
                node.belongs_to = parent.clone();
            }
        }
        self.remove_node(group_id);

        let edge_count = self.edges.len();
        self.edges
            .retain(|e| e.source != group_id && e.target != group_id);
        if self.edges.len() != edge_count {
            debug!(
                "Dropped {} edge(s) attached to group {}",
                edge_count - self.edges.len(),
                group_id
            );
        }

        let mut change = MembershipChange {
            removed_groups: vec![group_id.to_string()],
            ..Default::default()
        };
        change.touch(parent.as_deref());
        Ok(change)
    }

    /// Moves a node into `group_id`, or to the root when `None`.
    pub fn move_node(&mut self, node_id: &str, group_id: Option<&str>) -> GraphResult<MembershipChange> {
        let previous = self
            .get_node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?
            .belongs_to
            .clone();

        if let Some(group_id) = group_id {
            self.get_group(group_id)?;
            let cycles = group_id == node_id
                || self.get_ancestors(group_id).iter().any(|n| n.id == node_id);
            if cycles {
                return Err(GraphError::MembershipCycle {
                    node: node_id.to_string(),
                    group: group_id.to_string(),
                });
            }
        }

        let mut change = MembershipChange::default();
        if previous.as_deref() == group_id {
            return Ok(change);
        }

        if let Some(node) = self.get_node_mut(node_id) {
            node.belongs_to = group_id.map(str::to_string);
        }
        change.touch(previous.as_deref());
        change.touch(group_id);
        Ok(change)
    }

    pub fn verify_graph_integrity(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let mut node_ids: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            if !node_ids.insert(node.id.as_str()) {
                errors.push(format!("Node id:[{}] is not unique", node.id));
            }
        }

        for edge in &self.edges {
            if !node_ids.contains(edge.source.as_str()) {
                errors.push(format!(
                    "Edge id:[{}] source {:?} not found in nodes",
                    edge.id, edge.source
                ));
            }
            if !node_ids.contains(edge.target.as_str()) {
                errors.push(format!(
                    "Edge id:[{}] target {:?} not found in nodes",
                    edge.id, edge.target
                ));
            }
        }

        for node in &self.nodes {
            let Some(parent_id) = node.belongs_to.as_deref() else {
                continue;
            };
            match self.get_node(parent_id) {
                None => errors.push(format!(
                    "Node id:[{}] belongs_to {:?} not found in nodes",
                    node.id, parent_id
                )),
                Some(parent) if !parent.is_partition => errors.push(format!(
                    "Node id:[{}] belongs_to {:?} which is not a group",
                    node.id, parent_id
                )),
                Some(_) => {}
            }
            if parent_id == node.id || self.get_ancestors(parent_id).iter().any(|a| a.id == node.id) {
                errors.push(format!("Node id:[{}] is part of a membership cycle", node.id));
            }
        }

        if errors.is_empty() {
            debug!("Graph integrity verified: {}", self.stats());
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub layer: String,
    #[serde(default)]
    pub is_partition: bool,
    #[serde(default)]
    pub belongs_to: Option<String>,
    #[serde(default)]
    pub attrs: Vec<Field>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Node {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            layer: String::new(),
            is_partition: false,
            belongs_to: None,
            attrs: Vec::new(),
            comment: None,
        }
    }

    pub fn new_group(id: &str, label: &str) -> Self {
        Self {
            is_partition: true,
            ..Self::new(id, label)
        }
    }

    pub fn in_group(mut self, group_id: &str) -> Self {
        self.belongs_to = Some(group_id.to_string());
        self
    }

    pub fn with_attr(mut self, field: Field) -> Self {
        self.attrs.push(field);
        self
    }

    pub fn get_attr(&self, key: &str) -> Option<&Field> {
        self.attrs.iter().rev().find(|f| f.key == key)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub layer: String,
    /// Endpoint aggregations echoed into this edge's label
    #[serde(default)]
    pub aggregations: EdgeAggregationSelection,
}

impl Edge {
    pub fn new(id: &str, source: &str, target: &str) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            label: String::new(),
            layer: String::new(),
            aggregations: EdgeAggregationSelection::default(),
        }
    }
}

fn get_stripped_value(record: &StringRecord, idx: usize, label: &str) -> GraphResult<String> {
    let value = record
        .get(idx)
        .ok_or_else(|| GraphError::InvalidStructure(format!("Missing {}", label)))?;
    Ok(strip_quotes_and_whitespace(value).to_string())
}

impl Node {
    pub fn from_row(record: &StringRecord, profile: &NodeLoadProfile) -> GraphResult<Self> {
        let attrs = profile
            .attribute_columns
            .iter()
            .filter_map(|(idx, key)| {
                record
                    .get(*idx)
                    .map(|value| Field::new(key.clone(), strip_quotes_and_whitespace(value)))
            })
            .collect();

        Ok(Node {
            id: get_stripped_value(record, profile.id_column, "id")?,
            label: get_stripped_value(record, profile.label_column, "label")?,
            layer: get_stripped_value(record, profile.layer_column, "layer")?,
            is_partition: is_truthy(&get_stripped_value(
                record,
                profile.is_partition_column,
                "is_partition",
            )?),
            belongs_to: non_null(&get_stripped_value(
                record,
                profile.belongs_to_column,
                "belongs_to",
            )?),
            attrs,
            comment: profile
                .comment_column
                .and_then(|idx| record.get(idx))
                .and_then(non_null),
        })
    }
}

impl Edge {
    pub fn from_row(record: &StringRecord, profile: &EdgeLoadProfile) -> GraphResult<Self> {
        Ok(Edge {
            id: get_stripped_value(record, profile.id_column, "id")?,
            source: get_stripped_value(record, profile.source_column, "source")?,
            target: get_stripped_value(record, profile.target_column, "target")?,
            label: profile
                .label_column
                .and_then(|idx| record.get(idx))
                .map(|v| strip_quotes_and_whitespace(v).to_string())
                .unwrap_or_default(),
            layer: profile
                .layer_column
                .and_then(|idx| record.get(idx))
                .map(|v| strip_quotes_and_whitespace(v).to_string())
                .unwrap_or_default(),
            aggregations: EdgeAggregationSelection::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_graph() -> Graph {
        Graph {
            name: "Test Graph".to_string(),
            nodes: vec![
                Node::new_group("root", "Root"),
                Node::new_group("north", "North").in_group("root"),
                Node::new("a", "A")
                    .in_group("north")
                    .with_attr(Field::new("amount", "10")),
                Node::new("b", "B")
                    .in_group("north")
                    .with_attr(Field::new("amount", "20")),
                Node::new("c", "C")
                    .in_group("root")
                    .with_attr(Field::new("amount", "5")),
            ],
            edges: vec![Edge::new("e1", "a", "c"), Edge::new("e2", "north", "c")],
        }
    }

    fn ids(nodes: &[&Node]) -> Vec<String> {
        nodes.iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn test_get_root_nodes() {
        let graph = create_test_graph();
        assert_eq!(ids(&graph.get_root_nodes()), vec!["root"]);
    }

    #[test]
    fn test_get_group_members() {
        let graph = create_test_graph();
        assert_eq!(ids(&graph.get_group_members("north").unwrap()), vec!["a", "b"]);
        assert_eq!(ids(&graph.get_group_members("root").unwrap()), vec!["north", "c"]);
        assert!(matches!(
            graph.get_group_members("missing"),
            Err(GraphError::GroupNotFound(_))
        ));
        assert!(matches!(
            graph.get_group_members("a"),
            Err(GraphError::NotAGroup(_))
        ));
    }

    #[test]
    fn test_get_ancestors() {
        let graph = create_test_graph();
        assert_eq!(ids(&graph.get_ancestors("a")), vec!["north", "root"]);
        assert!(graph.get_ancestors("root").is_empty());
    }

    #[test]
    fn test_group_nodes_under_common_parent() {
        let mut graph = create_test_graph();
        let change = graph
            .group_nodes("pair", "Pair", &["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(change.affected_groups, vec!["pair", "north"]);
        assert!(change.removed_groups.is_empty());

        let pair = graph.get_node("pair").unwrap();
        assert!(pair.is_partition);
        assert_eq!(pair.belongs_to.as_deref(), Some("north"));
        assert_eq!(ids(&graph.get_group_members("pair").unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_group_nodes_from_different_parents_goes_to_root() {
        let mut graph = create_test_graph();
        let change = graph
            .group_nodes("mixed", "Mixed", &["a".to_string(), "c".to_string()])
            .unwrap();
        assert_eq!(change.affected_groups, vec!["mixed", "north", "root"]);
        assert_eq!(graph.get_node("mixed").unwrap().belongs_to, None);
    }

    #[test]
    fn test_group_nodes_errors() {
        let mut graph = create_test_graph();
        assert!(matches!(
            graph.group_nodes("north", "Dup", &[]),
            Err(GraphError::NodeAlreadyExists(_))
        ));
        assert!(matches!(
            graph.group_nodes("g", "G", &["zzz".to_string()]),
            Err(GraphError::NodeNotFound(_))
        ));
        assert!(graph.get_node("g").is_none());
    }

    #[test]
    fn test_ungroup_lifts_members_and_drops_group_edges() {
        let mut graph = create_test_graph();
        let change = graph.ungroup("north").unwrap();
        assert_eq!(change.affected_groups, vec!["root"]);
        assert_eq!(change.removed_groups, vec!["north"]);
        assert!(graph.get_node("north").is_none());
        assert_eq!(
            ids(&graph.get_group_members("root").unwrap()),
            vec!["a", "b", "c"]
        );
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].id, "e1");
    }

    #[test]
    fn test_ungroup_rejects_plain_nodes() {
        let mut graph = create_test_graph();
        assert!(matches!(graph.ungroup("a"), Err(GraphError::NotAGroup(_))));
    }

    #[test]
    fn test_move_node() {
        let mut graph = create_test_graph();
        let change = graph.move_node("c", Some("north")).unwrap();
        assert_eq!(change.affected_groups, vec!["root", "north"]);
        assert_eq!(graph.get_node("c").unwrap().belongs_to.as_deref(), Some("north"));

        let unchanged = graph.move_node("c", Some("north")).unwrap();
        assert!(unchanged.is_empty());

        let change = graph.move_node("c", None).unwrap();
        assert_eq!(change.affected_groups, vec!["north"]);
    }

    #[test]
    fn test_move_node_rejects_cycles() {
        let mut graph = create_test_graph();
        assert!(matches!(
            graph.move_node("root", Some("north")),
            Err(GraphError::MembershipCycle { .. })
        ));
        assert!(matches!(
            graph.move_node("north", Some("north")),
            Err(GraphError::MembershipCycle { .. })
        ));
    }

    #[test]
    fn test_verify_graph_integrity() {
        let graph = create_test_graph();
        assert!(graph.verify_graph_integrity().is_ok());

        let mut broken = create_test_graph();
        broken.edges.push(Edge::new("e3", "a", "ghost"));
        broken.nodes.push(Node::new("d", "D").in_group("a"));
        broken.nodes.push(Node::new("a", "Duplicate"));
        let errors = broken.verify_graph_integrity().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("target \"ghost\"")));
        assert!(errors.iter().any(|e| e.contains("which is not a group")));
        assert!(errors.iter().any(|e| e.contains("is not unique")));
    }

    #[test]
    fn test_verify_detects_membership_cycles() {
        let graph = Graph {
            name: "cycle".to_string(),
            nodes: vec![
                Node::new_group("x", "X").in_group("y"),
                Node::new_group("y", "Y").in_group("x"),
            ],
            edges: Vec::new(),
        };
        let errors = graph.verify_graph_integrity().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_get_attr_last_write_wins() {
        let node = Node::new("n", "N")
            .with_attr(Field::new("k", "1"))
            .with_attr(Field::new("k", "2"));
        assert_eq!(node.get_attr("k").map(|f| f.value.as_str()), Some("2"));
    }
}
