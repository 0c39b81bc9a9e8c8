use super::{NodeEnv, NodeExecutor, NodeOutcome, config_mismatch};
use crate::error::NodeExecutionError;
use crate::graph::{Node, NodeConfig, NodeKind, SourceCsvConfig};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::fs;
use tracing::debug;

/// Emits a tabular dataset, either inline or read from a delimited text file.
pub struct CsvSourceExecutor;

#[async_trait]
impl NodeExecutor for CsvSourceExecutor {
    fn kind(&self) -> NodeKind {
        NodeKind::SourceCsv
    }

    async fn execute(
        &self,
        node: &Node,
        _env: &NodeEnv<'_>,
    ) -> Result<NodeOutcome, NodeExecutionError> {
        let NodeConfig::SourceCsv(config) = &node.config else {
            return Err(config_mismatch(node, self.kind()));
        };

        let (columns, rows) = match (&config.file_name, config.rows.is_empty()) {
            (Some(path), true) => load_delimited(path, config.delimiter.unwrap_or(','))?,
            _ => inline_dataset(config),
        };
        debug!(node_id = %node.id, rows = rows.len(), "dataset loaded");

        Ok(NodeOutcome::value(json!({
            "columns": columns,
            "rows": rows,
        })))
    }
}

fn inline_dataset(config: &SourceCsvConfig) -> (Vec<String>, Vec<Value>) {
    let columns = if config.columns.is_empty() {
        // Column order follows first appearance across rows.
        let mut columns: Vec<String> = Vec::new();
        for key in config.rows.iter().flat_map(|row| row.keys()) {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        columns
    } else {
        config.columns.clone()
    };
    let rows = config.rows.iter().cloned().map(Value::Object).collect();
    (columns, rows)
}

fn load_delimited(
    path: &str,
    delimiter: char,
) -> Result<(Vec<String>, Vec<Value>), NodeExecutionError> {
    let content = fs::read_to_string(path)
        .map_err(|e| NodeExecutionError::Dataset(format!("cannot read '{}': {}", path, e)))?;
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| NodeExecutionError::Dataset(format!("'{}' has no header row", path)))?;
    let columns = split_record(header, delimiter);

    let mut rows = Vec::new();
    for (index, line) in lines.enumerate() {
        let cells = split_record(line, delimiter);
        if cells.len() != columns.len() {
            return Err(NodeExecutionError::Dataset(format!(
                "'{}' row {} has {} fields, expected {}",
                path,
                index + 1,
                cells.len(),
                columns.len()
            )));
        }
        let row: Map<String, Value> = columns
            .iter()
            .cloned()
            .zip(cells.into_iter().map(cell_value))
            .collect();
        rows.push(Value::Object(row));
    }
    Ok((columns, rows))
}

/// Splits one record, honoring double-quoted fields and `""` escapes.
fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            c if c == delimiter && !quoted => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields.into_iter().map(|f| f.trim().to_string()).collect()
}

fn cell_value(cell: String) -> Value {
    if let Ok(n) = cell.parse::<f64>() {
        return crate::value::number(n);
    }
    match cell.as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "" => Value::Null,
        _ => Value::String(cell),
    }
}

/// Emits the exposed fields of a business asset.
pub struct AssetSourceExecutor;

#[async_trait]
impl NodeExecutor for AssetSourceExecutor {
    fn kind(&self) -> NodeKind {
        NodeKind::SourceAsset
    }

    async fn execute(
        &self,
        node: &Node,
        env: &NodeEnv<'_>,
    ) -> Result<NodeOutcome, NodeExecutionError> {
        let NodeConfig::SourceAsset(config) = &node.config else {
            return Err(config_mismatch(node, self.kind()));
        };

        let Some(catalog) = &env.collaborators.assets else {
            let mut record = Map::new();
            record.insert("id".to_string(), Value::from(config.asset_id.clone()));
            if let Some(criticality) = config.criticality {
                record.insert("criticality".to_string(), json!(criticality));
            }
            return Ok(NodeOutcome::value(Value::Object(record)));
        };

        let asset = catalog
            .asset(&config.asset_id)
            .await
            .map_err(NodeExecutionError::from)?
            .ok_or_else(|| NodeExecutionError::EntityNotFound {
                catalog: "asset".to_string(),
                entity_id: config.asset_id.clone(),
            })?;

        let mut record: Map<String, Value> = if config.fields.is_empty() {
            asset
        } else {
            config
                .fields
                .iter()
                .filter_map(|f| asset.get(f).map(|v| (f.clone(), v.clone())))
                .collect()
        };
        if let Some(criticality) = config.criticality {
            record
                .entry("criticality")
                .or_insert_with(|| json!(criticality));
        }
        Ok(NodeOutcome::value(Value::Object(record)))
    }
}

