use super::{NodeEnv, NodeExecutor, NodeOutcome, compare_values, config_mismatch};
use crate::context::collection_of;
use crate::error::NodeExecutionError;
use crate::formula::{Formula, round_to};
use crate::graph::{
    AggregateFunction, ComparisonOperator, Node, NodeConfig, NodeKind, TransformOperation,
    ValueType,
};
use crate::value::{as_number, compare, display, lookup_path, number};
use async_trait::async_trait;
use itertools::Itertools;
use serde_json::{Map, Value};
use tracing::debug;

/// Applies a collection operation to the configured input, or to the most recent
/// array-shaped value in the context.
pub struct TransformExecutor;

#[async_trait]
impl NodeExecutor for TransformExecutor {
    fn kind(&self) -> NodeKind {
        NodeKind::Transform
    }

    async fn execute(
        &self,
        node: &Node,
        env: &NodeEnv<'_>,
    ) -> Result<NodeOutcome, NodeExecutionError> {
        let NodeConfig::Transform(config) = &node.config else {
            return Err(config_mismatch(node, self.kind()));
        };

        let (source, rows) = match &config.input {
            Some(name) => {
                let value = env
                    .context
                    .resolve(name)
                    .ok_or_else(|| NodeExecutionError::missing(name.clone()))?;
                let rows = collection_of(value)
                    .ok_or_else(|| NodeExecutionError::mismatch("transform", "Array", value))?;
                (name.as_str(), rows)
            }
            None => env
                .context
                .latest_collection()
                .ok_or_else(|| NodeExecutionError::missing("array input"))?,
        };
        debug!(
            node_id = %node.id,
            input = source,
            operation = config.operation.name(),
            rows = rows.len(),
            "transforming collection"
        );

        let output = match &config.operation {
            TransformOperation::Map { target, formula } => {
                let formula = Formula::parse(formula)?;
                let precision = env.config.default_precision;
                let mapped = rows
                    .iter()
                    .map(|row| {
                        let evaluation = formula.evaluate(&|name: &str| {
                            lookup_path(row, name).or_else(|| env.context.resolve(name))
                        })?;
                        let mut row = row.clone();
                        if let Value::Object(fields) = &mut row {
                            let value = round_to(evaluation.value, precision);
                            fields.insert(target.clone(), number(value));
                        }
                        Ok(row)
                    })
                    .collect::<Result<Vec<_>, NodeExecutionError>>()?;
                Value::Array(mapped)
            }
            TransformOperation::Filter {
                field,
                operator,
                value,
            } => Value::Array(filter_rows(rows, field, *operator, value)?),
            TransformOperation::Aggregate {
                field,
                function,
                group_by,
            } => match group_by {
                None => {
                    let mut record = Map::new();
                    record.insert(field.clone(), aggregate(rows.iter(), field, *function)?);
                    Value::Object(record)
                }
                Some(key) => {
                    let groups = rows
                        .iter()
                        .into_group_map_by(|row| {
                            lookup_path(row, key).map(display).unwrap_or_default()
                        })
                        .into_iter()
                        .sorted_by(|a, b| a.0.cmp(&b.0));
                    let mut record = Map::new();
                    for (group, members) in groups {
                        record.insert(group, aggregate(members.into_iter(), field, *function)?);
                    }
                    Value::Object(record)
                }
            },
            TransformOperation::Sort { field, descending } => {
                let missing = Value::Null;
                let sorted = rows
                    .iter()
                    .sorted_by(|a, b| {
                        let ordering = compare(
                            lookup_path(a, field).unwrap_or(&missing),
                            lookup_path(b, field).unwrap_or(&missing),
                        );
                        if *descending {
                            ordering.reverse()
                        } else {
                            ordering
                        }
                    })
                    .cloned()
                    .collect();
                Value::Array(sorted)
            }
            TransformOperation::Enrich { fields } => Value::Array(
                rows.iter()
                    .map(|row| {
                        let mut row = row.clone();
                        if let Value::Object(existing) = &mut row {
                            for (name, value) in fields {
                                existing.insert(name.clone(), value.clone());
                            }
                        }
                        row
                    })
                    .collect(),
            ),
        };

        Ok(NodeOutcome::value(output))
    }
}

fn filter_rows(
    rows: &[Value],
    field: &str,
    operator: ComparisonOperator,
    expected: &Value,
) -> Result<Vec<Value>, NodeExecutionError> {
    let mut kept = Vec::new();
    for row in rows {
        // Rows without the field never match.
        let Some(actual) = lookup_path(row, field) else {
            continue;
        };
        if compare_values(actual, operator, expected, ValueType::Auto)? {
            kept.push(row.clone());
        }
    }
    Ok(kept)
}

fn aggregate<'r>(
    rows: impl Iterator<Item = &'r Value>,
    field: &str,
    function: AggregateFunction,
) -> Result<Value, NodeExecutionError> {
    let mut values = Vec::new();
    for row in rows {
        match lookup_path(row, field) {
            None | Some(Value::Null) => continue,
            Some(value) => values.push(
                as_number(value)
                    .ok_or_else(|| NodeExecutionError::mismatch("aggregate", "Number", value))?,
            ),
        }
    }

    let result = match function {
        AggregateFunction::Count => return Ok(Value::from(values.len())),
        _ if values.is_empty() => return Ok(Value::Null),
        AggregateFunction::Sum => values.iter().sum::<f64>(),
        AggregateFunction::Avg => values.iter().sum::<f64>() / values.len() as f64,
        AggregateFunction::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        AggregateFunction::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };
    Ok(number(result))
}
