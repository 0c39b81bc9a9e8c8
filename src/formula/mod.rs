//! A small arithmetic language for formula nodes and `map` transforms.
//!
//! Formulas are parsed into an [`Expression`] tree and evaluated by walking it; nothing is
//! ever handed to a general-purpose interpreter. The grammar only admits numeric
//! literals, variable names (dotted paths allowed), `+ - * /`, unary minus and
//! parentheses. Anything else is rejected with [`FormulaError::Syntax`].
//!
//! ```rust
//! use procflow::formula::Formula;
//! use procflow::context::ExecutionContext;
//! use serde_json::json;
//!
//! let formula = Formula::parse("amount * 0.1").unwrap();
//! let ctx = ExecutionContext::new().with("amount", json!(100));
//! let evaluation = formula.evaluate_in(&ctx).unwrap();
//! assert_eq!(evaluation.value, 10.0);
//! assert_eq!(evaluation.explain(), "amount (was 100) * 0.1");
//! ```

mod engine;
pub mod expression;
pub mod formatter;
mod lexer;
mod parser;
pub mod trace;

pub use expression::Expression;
pub use formatter::TraceFormatter;
pub use parser::MAX_DEPTH;
pub use trace::EvaluationTrace;

use crate::context::ExecutionContext;
use crate::error::{FormulaError, NodeExecutionError};
use engine::FormulaEngine;
use serde_json::Value;
use std::collections::BTreeSet;

/// A parsed formula, ready to evaluate any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expression: Expression,
}

/// The result of evaluating a formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    pub trace: EvaluationTrace,
}

impl Evaluation {
    /// Human-readable account of the evaluation, e.g. `amount (was 100) * 0.1`.
    pub fn explain(&self) -> String {
        TraceFormatter::format_trace(&self.trace)
    }
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let expression = parser::Parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            expression,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Variable names the formula reads, sorted.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.expression.variables(&mut names);
        names
    }

    /// Evaluates with a custom variable resolver.
    pub fn evaluate<'v>(
        &self,
        resolve: &dyn Fn(&str) -> Option<&'v Value>,
    ) -> Result<Evaluation, NodeExecutionError> {
        let trace = FormulaEngine::new(&self.expression, resolve).evaluate()?;
        let value = trace.get_outcome();
        if !value.is_finite() {
            return Err(FormulaError::NonFinite { value }.into());
        }
        Ok(Evaluation { value, trace })
    }

    /// Evaluates against an execution context using its scoped variable lookup.
    pub fn evaluate_in(&self, ctx: &ExecutionContext) -> Result<Evaluation, NodeExecutionError> {
        self.evaluate(&|name: &str| ctx.resolve(name))
    }
}

/// Rounds half away from zero to `precision` decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision.min(15) as i32);
    (value * factor).round() / factor
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
