use serde::{Deserialize, Serialize};

use crate::aggregation::GroupAggregationSpec;

/// ## Structure
/// This module contains the data structures for the plan file.
///
/// ```text
/// Plan
///   ├── meta: Option<Meta>
///   │   └── name: Option<String>
///   ├── import: ImportConfig
///   │   └── profiles: Vec<ImportProfile>
///   │       ├── filename: String
///   │       └── filetype: ImportFileType (Nodes | Edges)
///   ├── groups: Vec<GroupConfig>
///   │   ├── id: String
///   │   ├── label: Option<String>
///   │   ├── members: Vec<String>
///   │   └── aggregations: Vec<GroupAggregationSpec>
///   ├── edges: Vec<EdgeConfig>
///   │   ├── id: String
///   │   ├── source: Vec<usize>
///   │   └── target: Vec<usize>
///   └── export: ExportProfile
///       └── profiles: Vec<ExportProfileItem>
///           ├── filename: String
///           └── exporter: ExportFileType (JSON | CSVGroups)
/// ```

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Plan {
    pub meta: Option<Meta>,
    pub import: ImportConfig,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub edges: Vec<EdgeConfig>,
    #[serde(default)]
    pub export: ExportProfile,
}

//
// Import configuration
//

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ImportConfig {
    pub profiles: Vec<ImportProfile>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ImportFileType {
    Nodes,
    Edges,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ImportProfile {
    pub filename: String,
    pub filetype: ImportFileType,
}

//
// Group configuration
//

/// Aggregation rows declared on a group.
///
/// When `members` is set and the group does not exist in the imported
/// nodes, the group is created and the members are moved into it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GroupConfig {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub aggregations: Vec<GroupAggregationSpec>,
}

/// Endpoint aggregations an edge echoes in its label
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EdgeConfig {
    pub id: String,
    #[serde(default)]
    pub source: Vec<usize>,
    #[serde(default)]
    pub target: Vec<usize>,
}

//
// Export configuration
//

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ExportProfile {
    pub profiles: Vec<ExportProfileItem>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExportProfileItem {
    pub filename: String,
    pub exporter: ExportFileType,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFileType {
    JSON,
    CSVGroups,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            meta: Some(Meta {
                name: Some("Group aggregations".to_string()),
            }),
            import: ImportConfig {
                profiles: vec![
                    ImportProfile {
                        filename: "nodes.csv".to_string(),
                        filetype: ImportFileType::Nodes,
                    },
                    ImportProfile {
                        filename: "edges.csv".to_string(),
                        filetype: ImportFileType::Edges,
                    },
                ],
            },
            groups: vec![GroupConfig {
                id: "group_1".to_string(),
                label: None,
                members: Vec::new(),
                aggregations: vec![GroupAggregationSpec::new("amount", "sum")],
            }],
            edges: Vec::new(),
            export: ExportProfile {
                profiles: vec![ExportProfileItem {
                    filename: "aggregations.json".to_string(),
                    exporter: ExportFileType::JSON,
                }],
            },
        }
    }
}
