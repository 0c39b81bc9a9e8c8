/// A record of how a formula was evaluated, including intermediate values.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationTrace {
    BinaryOp {
        op_symbol: &'static str,
        left: Box<EvaluationTrace>,
        right: Box<EvaluationTrace>,
        outcome: f64,
    },
    UnaryOp {
        op_symbol: &'static str,
        child: Box<EvaluationTrace>,
        outcome: f64,
    },
    Leaf {
        source: String,
        value: f64,
        /// `true` when the value came from the execution context.
        resolved: bool,
    },
}

impl EvaluationTrace {
    pub fn get_outcome(&self) -> f64 {
        match self {
            EvaluationTrace::BinaryOp { outcome, .. } => *outcome,
            EvaluationTrace::UnaryOp { outcome, .. } => *outcome,
            EvaluationTrace::Leaf { value, .. } => *value,
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            EvaluationTrace::BinaryOp { op_symbol, .. } => match *op_symbol {
                "+" | "-" => 1,
                "*" | "/" => 2,
                _ => 0,
            },
            EvaluationTrace::UnaryOp { .. } => 3,
            EvaluationTrace::Leaf { .. } => 4,
        }
    }
}
