use super::{NodeEnv, NodeExecutor, NodeOutcome, Routing, config_mismatch};
use crate::error::NodeExecutionError;
use crate::graph::{
    ComparisonOperator, FALSE_BRANCH, Node, NodeConfig, NodeKind, TRUE_BRANCH, ValueType,
};
use crate::value::{as_bool, as_number, display};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

/// Evaluates a comparison against a context variable and selects the "true" or
/// "false" branch.
pub struct ConditionalExecutor;

#[async_trait]
impl NodeExecutor for ConditionalExecutor {
    fn kind(&self) -> NodeKind {
        NodeKind::Conditional
    }

    async fn execute(
        &self,
        node: &Node,
        env: &NodeEnv<'_>,
    ) -> Result<NodeOutcome, NodeExecutionError> {
        let NodeConfig::Conditional(config) = &node.config else {
            return Err(config_mismatch(node, self.kind()));
        };

        let actual = env
            .context
            .resolve(&config.variable)
            .ok_or_else(|| NodeExecutionError::missing(config.variable.clone()))?;
        let result = compare_values(actual, config.operator, &config.value, config.value_type)?;
        let selected = if result { TRUE_BRANCH } else { FALSE_BRANCH };
        debug!(
            node_id = %node.id,
            variable = %config.variable,
            operator = config.operator.symbol(),
            result,
            "condition evaluated"
        );

        Ok(NodeOutcome::value(json!({
            "result": result,
            "selectedBranch": selected,
        }))
        .routed(Routing::Branches(vec![selected.to_string()])))
    }
}

/// Applies `operator` to `actual` and `expected` after coercing both per `value_type`.
///
/// `Auto` compares numerically when both sides read as numbers, as booleans when both
/// read as booleans, and as text otherwise. `contains` also matches array elements.
pub fn compare_values(
    actual: &Value,
    operator: ComparisonOperator,
    expected: &Value,
    value_type: ValueType,
) -> Result<bool, NodeExecutionError> {
    use ComparisonOperator::*;
    let op = operator.symbol();

    match operator {
        Contains => return Ok(contains(actual, expected)),
        StartsWith => return Ok(display(actual).starts_with(&display(expected))),
        EndsWith => return Ok(display(actual).ends_with(&display(expected))),
        _ => {}
    }

    let resolved = match value_type {
        ValueType::Auto => match (as_number(actual), as_number(expected)) {
            (Some(l), Some(r)) => Operands::Number(l, r),
            _ => match (actual, expected) {
                (Value::Bool(l), Value::Bool(r)) => Operands::Bool(*l, *r),
                _ => Operands::Text(display(actual), display(expected)),
            },
        },
        ValueType::Number => Operands::Number(
            as_number(actual).ok_or_else(|| NodeExecutionError::mismatch(op, "Number", actual))?,
            as_number(expected)
                .ok_or_else(|| NodeExecutionError::mismatch(op, "Number", expected))?,
        ),
        ValueType::Boolean => Operands::Bool(
            as_bool(actual).ok_or_else(|| NodeExecutionError::mismatch(op, "Boolean", actual))?,
            as_bool(expected)
                .ok_or_else(|| NodeExecutionError::mismatch(op, "Boolean", expected))?,
        ),
        ValueType::String => Operands::Text(display(actual), display(expected)),
    };

    Ok(match resolved {
        Operands::Number(l, r) => match operator {
            Equal => l == r,
            NotEqual => l != r,
            GreaterThan => l > r,
            LessThan => l < r,
            GreaterThanOrEqual => l >= r,
            LessThanOrEqual => l <= r,
            Contains | StartsWith | EndsWith => unreachable!("handled above"),
        },
        Operands::Bool(l, r) => match operator {
            Equal => l == r,
            NotEqual => l != r,
            // Booleans only support equality.
            _ => {
                return Err(NodeExecutionError::mismatch(
                    op,
                    "Number or String (booleans have no ordering)",
                    actual,
                ));
            }
        },
        Operands::Text(l, r) => match operator {
            Equal => l == r,
            NotEqual => l != r,
            GreaterThan => l > r,
            LessThan => l < r,
            GreaterThanOrEqual => l >= r,
            LessThanOrEqual => l <= r,
            Contains | StartsWith | EndsWith => unreachable!("handled above"),
        },
    })
}

enum Operands {
    Number(f64, f64),
    Bool(bool, bool),
    Text(String, String),
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items
            .iter()
            .any(|item| item == needle || display(item) == display(needle)),
        other => display(other).contains(&display(needle)),
    }
}
