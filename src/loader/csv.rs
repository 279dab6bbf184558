//! CSV import into a [`GraphStoreBuilder`].
//!
//! Column lookup is case-insensitive. Labels are `|`-separated. Property
//! cells parse as integers first, then as floats; empty cells are skipped.

use std::path::PathBuf;

use csv::{ReaderBuilder, StringRecord};
use tracing::info;

use crate::types::{GraphError, NodeLabel, OriginalId, Result};

use super::{GraphStoreBuilder, PropertyValue};

/// Where node rows come from and how their columns are read.
#[derive(Clone, Debug)]
pub struct NodeImportConfig {
    /// CSV file with a header row.
    pub path: PathBuf,
    /// Column holding the original node id.
    pub id_column: String,
    /// Column holding `|`-separated labels.
    pub label_column: Option<String>,
    /// Labels given to every imported node.
    pub static_labels: Vec<String>,
    /// Property columns; `None` imports every remaining column.
    pub prop_columns: Option<Vec<String>>,
}

impl NodeImportConfig {
    /// Reads ids from `id` and imports every other column as a property.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            id_column: "id".into(),
            label_column: None,
            static_labels: Vec::new(),
            prop_columns: None,
        }
    }
}

/// Where relationship rows come from and how their columns are read.
#[derive(Clone, Debug)]
pub struct EdgeImportConfig {
    /// CSV file with a header row.
    pub path: PathBuf,
    /// Column holding the source's original id.
    pub src_column: String,
    /// Column holding the target's original id.
    pub dst_column: String,
    /// Column holding the relationship type.
    pub type_column: Option<String>,
    /// Type used when no type column is configured or a cell is empty.
    pub static_type: Option<String>,
    /// Property columns; `None` imports every remaining column.
    pub prop_columns: Option<Vec<String>>,
}

impl EdgeImportConfig {
    /// Reads endpoints from `src` and `dst` and imports every other column
    /// as a property.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            src_column: "src".into(),
            dst_column: "dst".into(),
            type_column: None,
            static_type: None,
            prop_columns: None,
        }
    }
}

/// Rows imported by one call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Nodes read.
    pub nodes: u64,
    /// Relationships read.
    pub relationships: u64,
}

#[derive(Debug)]
struct ColumnSpec {
    name: String,
    index: usize,
}

/// Adds every row of `cfg.path` as a node.
pub fn import_nodes(builder: &mut GraphStoreBuilder, cfg: &NodeImportConfig) -> Result<ImportSummary> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(&cfg.path)?;
    let headers = reader.headers()?.clone();
    let id_idx = find_column(&headers, &cfg.id_column)?;
    let label_idx = cfg
        .label_column
        .as_deref()
        .map(|name| find_column(&headers, name))
        .transpose()?;
    let mut skip = vec![id_idx];
    skip.extend(label_idx);
    let prop_columns = resolve_prop_columns(&headers, &cfg.prop_columns, &skip)?;
    let static_labels: Vec<NodeLabel> = cfg.static_labels.iter().map(NodeLabel::new).collect();

    let mut summary = ImportSummary::default();
    let mut labels = Vec::new();
    let mut props: Vec<(&str, PropertyValue)> = Vec::with_capacity(prop_columns.len());
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let id = parse_id(get_required(&record, id_idx, &cfg.id_column)?, row)?;

        labels.clear();
        labels.extend(static_labels.iter().cloned());
        if let Some(idx) = label_idx {
            labels.extend(parse_labels(record.get(idx).unwrap_or("")).map(NodeLabel::new));
        }

        props.clear();
        for col in &prop_columns {
            let Some(raw) = record.get(col.index).map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            props.push((col.name.as_str(), parse_value(raw, &col.name, row)?));
        }

        builder.add_node(id, &labels, &props)?;
        summary.nodes += 1;
    }
    info!(path = %cfg.path.display(), nodes = summary.nodes, "loader.csv.nodes_imported");
    Ok(summary)
}

/// Adds every row of `cfg.path` as a relationship.
///
/// Types named by the rows must have been declared on `builder`.
pub fn import_relationships(
    builder: &mut GraphStoreBuilder,
    cfg: &EdgeImportConfig,
) -> Result<ImportSummary> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(&cfg.path)?;
    let headers = reader.headers()?.clone();
    let src_idx = find_column(&headers, &cfg.src_column)?;
    let dst_idx = find_column(&headers, &cfg.dst_column)?;
    let type_idx = cfg
        .type_column
        .as_deref()
        .map(|name| find_column(&headers, name))
        .transpose()?;
    if type_idx.is_none() && cfg.static_type.is_none() {
        return Err(GraphError::InvalidArgument(
            "relationship import needs a type column or a static type".into(),
        ));
    }
    let mut skip = vec![src_idx, dst_idx];
    skip.extend(type_idx);
    let prop_columns = resolve_prop_columns(&headers, &cfg.prop_columns, &skip)?;

    let mut summary = ImportSummary::default();
    let mut props: Vec<(&str, f64)> = Vec::with_capacity(prop_columns.len());
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let src = parse_id(get_required(&record, src_idx, &cfg.src_column)?, row)?;
        let dst = parse_id(get_required(&record, dst_idx, &cfg.dst_column)?, row)?;
        let ty = type_idx
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or(cfg.static_type.as_deref())
            .ok_or_else(|| {
                GraphError::Parse(format!("row {}: missing relationship type", row + 1))
            })?;

        props.clear();
        for col in &prop_columns {
            let Some(raw) = record.get(col.index).map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            let value = match parse_value(raw, &col.name, row)? {
                PropertyValue::Long(v) => v as f64,
                PropertyValue::Double(v) => v,
            };
            props.push((col.name.as_str(), value));
        }

        builder.add_relationship(ty, src, dst, &props)?;
        summary.relationships += 1;
    }
    info!(
        path = %cfg.path.display(),
        relationships = summary.relationships,
        "loader.csv.relationships_imported"
    );
    Ok(summary)
}

fn resolve_prop_columns(
    headers: &StringRecord,
    requested: &Option<Vec<String>>,
    skip: &[usize],
) -> Result<Vec<ColumnSpec>> {
    if let Some(list) = requested {
        list.iter()
            .map(|name| {
                Ok(ColumnSpec {
                    name: name.clone(),
                    index: find_column(headers, name)?,
                })
            })
            .collect()
    } else {
        Ok(headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| !skip.contains(idx))
            .map(|(index, header)| ColumnSpec {
                name: header.trim().to_string(),
                index,
            })
            .collect())
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| GraphError::InvalidArgument(format!("column '{}' not found", name)))
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str> {
    record
        .get(idx)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GraphError::Parse(format!("missing value for column '{}'", name)))
}

fn parse_labels(raw: &str) -> impl Iterator<Item = &str> {
    raw.split('|').map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn parse_id(raw: &str, row: usize) -> Result<OriginalId> {
    raw.parse::<OriginalId>()
        .map_err(|_| GraphError::Parse(format!("row {}: '{}' is not a node id", row + 1, raw)))
}

fn parse_value(raw: &str, column: &str, row: usize) -> Result<PropertyValue> {
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(PropertyValue::Long(v));
    }
    raw.parse::<f64>().map(PropertyValue::Double).map_err(|_| {
        GraphError::Parse(format!(
            "row {}: value '{}' of column '{}' is not numeric",
            row + 1,
            raw,
            column
        ))
    })
}
