use super::trace::EvaluationTrace;

/// Formats evaluation traces into human-readable strings
pub struct TraceFormatter;

impl TraceFormatter {
    /// Format an evaluation trace into a human-readable explanation.
    pub fn format_trace(trace: &EvaluationTrace) -> String {
        // Start the recursive formatting with the lowest possible parent precedence.
        Self::format_recursive(trace, 0, false)
    }

    /// Recursively formats the trace, adding parentheses only when necessary.
    fn format_recursive(trace: &EvaluationTrace, parent_precedence: u8, tight: bool) -> String {
        let current_precedence = trace.precedence();
        let needs_parens = current_precedence < parent_precedence
            || (tight && current_precedence == parent_precedence);

        let mut result = String::new();
        if needs_parens {
            result.push('(');
        }

        match trace {
            EvaluationTrace::BinaryOp {
                op_symbol,
                left,
                right,
                ..
            } => {
                let left_str = Self::format_recursive(left, current_precedence, false);
                // `a - (b - c)` and `a / (b / c)` keep their grouping.
                let right_str = Self::format_recursive(right, current_precedence, true);
                result.push_str(&format!("{} {} {}", left_str, op_symbol, right_str));
            }
            EvaluationTrace::UnaryOp {
                op_symbol, child, ..
            } => {
                let child_str = Self::format_recursive(child, current_precedence, false);
                result.push_str(&format!("{}{}", op_symbol, child_str));
            }
            EvaluationTrace::Leaf {
                source,
                value,
                resolved,
            } => {
                let formatted_leaf = if *resolved {
                    format!("{} (was {})", source, super::format_number(*value))
                } else {
                    source.clone()
                };
                result.push_str(&formatted_leaf);
            }
        }

        if needs_parens {
            result.push(')');
        }
        result
    }
}
