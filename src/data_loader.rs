use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::path::Path;

use anyhow::Result;
use csv::StringRecord;

/// Columns every node file must carry; all other columns become attributes
pub const NODE_COLUMNS: [&str; 5] = ["id", "label", "layer", "is_partition", "belongs_to"];
pub const EDGE_COLUMNS: [&str; 3] = ["id", "source", "target"];

#[derive(Debug, Clone, Default)]
pub struct NodeLoadProfile {
    pub id_column: usize,
    pub label_column: usize,
    pub layer_column: usize,
    pub is_partition_column: usize,
    pub belongs_to_column: usize,
    pub comment_column: Option<usize>,
    /// Column offset and header of each attribute column
    pub attribute_columns: Vec<(usize, String)>,
}

impl Display for NodeLoadProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Node column offsets: id:{}, label:{}, layer:{}, is_partition:{}, belongs_to:{}, comment:{:?}, attributes:{:?}",
            self.id_column,
            self.label_column,
            self.layer_column,
            self.is_partition_column,
            self.belongs_to_column,
            self.comment_column,
            self.attribute_columns
                .iter()
                .map(|(_, key)| key.as_str())
                .collect::<Vec<_>>(),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct EdgeLoadProfile {
    pub id_column: usize,
    pub source_column: usize,
    pub target_column: usize,
    pub label_column: Option<usize>,
    pub layer_column: Option<usize>,
}

impl Display for EdgeLoadProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Edge column offsets: id:{}, source:{}, target:{}, label:{:?}, layer:{:?}",
            self.id_column, self.source_column, self.target_column, self.label_column, self.layer_column,
        )
    }
}

pub fn create_node_load_profile(headers: &[String]) -> NodeLoadProfile {
    let mut profile = NodeLoadProfile::default();
    for (i, field) in headers.iter().enumerate() {
        match field.as_str() {
            "id" => profile.id_column = i,
            "label" => profile.label_column = i,
            "layer" => profile.layer_column = i,
            "is_partition" => profile.is_partition_column = i,
            "belongs_to" => profile.belongs_to_column = i,
            "comment" => profile.comment_column = Some(i),
            "" => {}
            other => profile.attribute_columns.push((i, other.to_string())),
        }
    }
    profile
}

pub fn create_edge_load_profile(headers: &[String]) -> EdgeLoadProfile {
    let mut profile = EdgeLoadProfile::default();
    for (i, field) in headers.iter().enumerate() {
        match field.as_str() {
            "id" => profile.id_column = i,
            "source" => profile.source_column = i,
            "target" => profile.target_column = i,
            "label" => profile.label_column = Some(i),
            "layer" => profile.layer_column = Some(i),
            _ => {}
        }
    }
    profile
}

/// Reads a delimited file, returning trimmed headers and the data records.
pub fn load_records(path: &Path, separator: u8) -> Result<(Vec<String>, Vec<StringRecord>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|col_name| col_name.trim().to_string())
        .collect();

    let records: Vec<StringRecord> = reader.records().collect::<Result<_, _>>()?;

    Ok((headers, records))
}

/// Picks the separator from the file extension
pub fn separator_for(path: &Path) -> Result<u8> {
    let extension = path
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("");

    match extension {
        "csv" => Ok(b','),
        "tsv" => Ok(b'\t'),
        other => Err(anyhow::anyhow!("Unsupported extension '{}'", other)),
    }
}

fn verify_headers(headers: &[String], required: &[&str]) -> Result<()> {
    let columns: HashSet<&str> = headers.iter().map(String::as_str).collect();
    for col in required {
        if !columns.contains(col) {
            return Err(anyhow::anyhow!("Missing required column '{}'", col));
        }
    }
    Ok(())
}

pub fn verify_nodes_headers(headers: &[String]) -> Result<()> {
    verify_headers(headers, &NODE_COLUMNS)
}

pub fn verify_edges_headers(headers: &[String]) -> Result<()> {
    verify_headers(headers, &EDGE_COLUMNS)
}

fn is_valid_id(id: &str) -> bool {
    let trimmed = id.trim();
    !trimmed.is_empty() && trimmed != "null" && trimmed != "None" && trimmed != "NaN"
}

/// Ensures IDs are unique and not missing
pub fn verify_id_column(records: &[StringRecord], id_column_index: usize) -> Result<()> {
    let mut id_set = HashSet::new();
    let mut duplicates = Vec::new();
    let mut missing_ids = Vec::new();

    for record in records {
        match record.get(id_column_index) {
            Some(id) if !is_valid_id(id) => missing_ids.push(id.to_string()),
            Some(id) => {
                if !id_set.insert(id.trim()) {
                    duplicates.push(id.to_string());
                }
            }
            None => missing_ids.push("<missing>".to_string()),
        }
    }

    if !missing_ids.is_empty() {
        return Err(anyhow::anyhow!(
            "Missing or invalid IDs found in 'id' column: {:?}",
            missing_ids
        ));
    }

    if !duplicates.is_empty() {
        return Err(anyhow::anyhow!(
            "Duplicate IDs found in 'id' column: {:?}",
            duplicates
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_node_profile_collects_attribute_columns() {
        let profile = create_node_load_profile(&headers(&[
            "id",
            "amount",
            "label",
            "layer",
            "is_partition",
            "belongs_to",
            "comment",
            "region",
        ]));
        assert_eq!(profile.id_column, 0);
        assert_eq!(profile.label_column, 2);
        assert_eq!(profile.comment_column, Some(6));
        assert_eq!(
            profile.attribute_columns,
            vec![(1, "amount".to_string()), (7, "region".to_string())]
        );
    }

    #[test]
    fn test_edge_profile_optional_columns() {
        let profile = create_edge_load_profile(&headers(&["source", "target", "id"]));
        assert_eq!(profile.id_column, 2);
        assert_eq!(profile.label_column, None);
        assert_eq!(profile.layer_column, None);
    }

    #[test]
    fn test_verify_nodes_headers() {
        assert!(verify_nodes_headers(&headers(&NODE_COLUMNS)).is_ok());
        let err = verify_nodes_headers(&headers(&["id", "label"])).unwrap_err();
        assert!(err.to_string().contains("Missing required column"));
    }

    #[test]
    fn test_separator_for() {
        assert_eq!(separator_for(Path::new("nodes.csv")).unwrap(), b',');
        assert_eq!(separator_for(Path::new("nodes.tsv")).unwrap(), b'\t');
        assert!(separator_for(Path::new("nodes.xlsx")).is_err());
    }

    #[test]
    fn test_verify_id_column() {
        let records = vec![
            StringRecord::from(vec!["a", "x"]),
            StringRecord::from(vec!["b", "y"]),
        ];
        assert!(verify_id_column(&records, 0).is_ok());

        let duplicated = vec![
            StringRecord::from(vec!["a"]),
            StringRecord::from(vec!["a"]),
        ];
        let err = verify_id_column(&duplicated, 0).unwrap_err();
        assert!(err.to_string().contains("Duplicate IDs"));

        let missing = vec![StringRecord::from(vec!["null"])];
        assert!(verify_id_column(&missing, 0).is_err());
    }

    #[test]
    fn test_load_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.tsv");
        std::fs::write(&path, " id \tlabel\na\tA\nb\tB\n").unwrap();
        let (headers, records) = load_records(&path, b'\t').unwrap();
        assert_eq!(headers, vec!["id", "label"]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get(1), Some("B"));
    }
}
