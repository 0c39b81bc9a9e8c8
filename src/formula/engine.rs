use super::expression::Expression;
use super::trace::EvaluationTrace;
use crate::error::{FormulaError, NodeExecutionError};
use crate::value::as_number;
use serde_json::Value;

// This macro generates a match arm for a binary arithmetic operation.
macro_rules! eval_op {
    ($self:ident, $l:ident, $r:ident, $op_str:expr, $op_fn:expr) => {
        $self.eval_binary($l, $r, $op_str, $op_fn)
    };
}

/// The recursive engine that evaluates one formula against a variable resolver.
pub(super) struct FormulaEngine<'a, 'v> {
    expression: &'a Expression,
    resolve: &'a dyn Fn(&str) -> Option<&'v Value>,
}

impl<'a, 'v> FormulaEngine<'a, 'v> {
    pub(super) fn new(
        expression: &'a Expression,
        resolve: &'a dyn Fn(&str) -> Option<&'v Value>,
    ) -> Self {
        Self {
            expression,
            resolve,
        }
    }

    /// Evaluates the formula and returns a trace of the evaluation.
    pub(super) fn evaluate(&self) -> Result<EvaluationTrace, NodeExecutionError> {
        self.evaluate_recursive(self.expression)
    }

    fn evaluate_recursive(&self, expr: &Expression) -> Result<EvaluationTrace, NodeExecutionError> {
        match expr {
            Expression::Sum(l, r) => eval_op!(self, l, r, "+", |a, b| a + b),
            Expression::Subtract(l, r) => eval_op!(self, l, r, "-", |a, b| a - b),
            Expression::Multiply(l, r) => eval_op!(self, l, r, "*", |a, b| a * b),
            Expression::Divide(l, r) => {
                let left_trace = self.evaluate_recursive(l)?;
                let right_trace = self.evaluate_recursive(r)?;
                if right_trace.get_outcome() == 0.0 {
                    return Err(FormulaError::DivisionByZero {
                        expression: expr.to_string(),
                    }
                    .into());
                }
                let outcome = left_trace.get_outcome() / right_trace.get_outcome();
                Ok(EvaluationTrace::BinaryOp {
                    op_symbol: "/",
                    left: Box::new(left_trace),
                    right: Box::new(right_trace),
                    outcome,
                })
            }
            Expression::Negate(v) => {
                let child_trace = self.evaluate_recursive(v)?;
                let outcome = -child_trace.get_outcome();
                Ok(EvaluationTrace::UnaryOp {
                    op_symbol: "-",
                    child: Box::new(child_trace),
                    outcome,
                })
            }
            Expression::Literal(n) => Ok(EvaluationTrace::Leaf {
                source: super::format_number(*n),
                value: *n,
                resolved: false,
            }),
            Expression::Variable(name) => {
                let raw = (self.resolve)(name)
                    .ok_or_else(|| NodeExecutionError::missing(name.clone()))?;
                let value = as_number(raw)
                    .ok_or_else(|| NodeExecutionError::mismatch("formula", "Number", raw))?;
                Ok(EvaluationTrace::Leaf {
                    source: name.clone(),
                    value,
                    resolved: true,
                })
            }
        }
    }

    fn eval_binary<F>(
        &self,
        l: &Expression,
        r: &Expression,
        op: &'static str,
        f: F,
    ) -> Result<EvaluationTrace, NodeExecutionError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let left_trace = self.evaluate_recursive(l)?;
        let right_trace = self.evaluate_recursive(r)?;
        let outcome = f(left_trace.get_outcome(), right_trace.get_outcome());
        Ok(EvaluationTrace::BinaryOp {
            op_symbol: op,
            left: Box::new(left_trace),
            right: Box::new(right_trace),
            outcome,
        })
    }
}
