//! Group aggregation engine.
//!
//! A group declares aggregation rows (`field` + `func`). The engine scans the
//! attribute lists of the group's members once and produces one result per
//! row, in row order. Results on the two endpoint groups of an edge can be
//! echoed into the edge's label.
//!
//! ```rust
//! use layercake_groups::aggregation::{aggregate, GroupAggregationSpec};
//! use layercake_groups::field::Field;
//!
//! let children = vec![
//!     vec![Field::new("amount", "100")],
//!     vec![Field::new("amount", "abc")],
//!     vec![Field::new("amount", "50")],
//! ];
//! let specs = vec![GroupAggregationSpec::new("amount", "sum")];
//!
//! let results = aggregate(&children, &specs).unwrap();
//! assert_eq!(results[0].result, 150.0);
//! ```

pub mod edge;
pub mod engine;
pub mod function;
pub mod label;

pub use edge::{compose_edge_aggregations, EdgeAggregationSelection};
pub use engine::aggregate;
pub use function::AggregateFunction;
pub use label::{format_aggregation_label, format_aggregation_labels, LABEL_SEPARATOR};

use serde::{Deserialize, Serialize};

use crate::field::{Field, FormatVariant};
use crate::graph::Node;

/// Anything the engine can read an attribute list from.
pub trait AttributeSource {
    fn attributes(&self) -> &[Field];
}

impl AttributeSource for Node {
    fn attributes(&self) -> &[Field] {
        &self.attrs
    }
}

impl AttributeSource for Vec<Field> {
    fn attributes(&self) -> &[Field] {
        self
    }
}

impl AttributeSource for [Field] {
    fn attributes(&self) -> &[Field] {
        self
    }
}

impl<T: AttributeSource + ?Sized> AttributeSource for &T {
    fn attributes(&self) -> &[Field] {
        (**self).attributes()
    }
}

fn default_visible() -> bool {
    true
}

/// An aggregation row as declared on a group.
///
/// `field` and `func` stay unset while the row is being configured; such a
/// row always yields `0`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GroupAggregationSpec {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub func: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_variant: Option<FormatVariant>,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_label: Option<String>,
}

impl Default for GroupAggregationSpec {
    fn default() -> Self {
        Self {
            field: None,
            func: None,
            format_variant: None,
            is_visible: true,
            field_label: None,
        }
    }
}

impl GroupAggregationSpec {
    pub fn new(field: impl Into<String>, func: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            func: Some(func.into()),
            ..Default::default()
        }
    }

    pub fn with_format_variant(mut self, variant: FormatVariant) -> Self {
        self.format_variant = Some(variant);
        self
    }

    pub fn with_field_label(mut self, label: impl Into<String>) -> Self {
        self.field_label = Some(label.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_visible = false;
        self
    }

    /// Both `field` and `func` are set
    pub fn is_configured(&self) -> bool {
        self.field.is_some() && self.func.is_some()
    }
}

/// A row merged with its computed result.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GroupAggregation {
    #[serde(flatten)]
    pub spec: GroupAggregationSpec,
    pub result: f64,
    pub formatted_value: String,
}
