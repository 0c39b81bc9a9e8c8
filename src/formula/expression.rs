use std::collections::BTreeSet;
use std::fmt;

/// The Abstract Syntax Tree of an arithmetic formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // Arithmetic
    Sum(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    Negate(Box<Expression>),

    // Leaf nodes
    Literal(f64),
    Variable(String),
}

impl Expression {
    /// Collects the variable names the expression reads.
    pub fn variables(&self, names: &mut BTreeSet<String>) {
        match self {
            Expression::Variable(name) => {
                names.insert(name.clone());
            }
            Expression::Sum(l, r)
            | Expression::Subtract(l, r)
            | Expression::Multiply(l, r)
            | Expression::Divide(l, r) => {
                l.variables(names);
                r.variables(names);
            }
            Expression::Negate(v) => v.variables(names),
            Expression::Literal(_) => {}
        }
    }

    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Expression::Sum(..) | Expression::Subtract(..) => 1,
            Expression::Multiply(..) | Expression::Divide(..) => 2,
            Expression::Negate(_) => 3,
            Expression::Literal(_) | Expression::Variable(_) => 4,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, child: &Expression, min: u8) -> fmt::Result {
        if child.precedence() < min {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }

    fn fmt_binary(
        &self,
        f: &mut fmt::Formatter<'_>,
        l: &Expression,
        op: &str,
        r: &Expression,
    ) -> fmt::Result {
        let own = self.precedence();
        self.fmt_child(f, l, own)?;
        write!(f, " {} ", op)?;
        // Right operands of `-` and `/` need parentheses at equal precedence.
        self.fmt_child(f, r, own + 1)
    }
}

/// Canonical infix rendering with the minimum parentheses.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Sum(l, r) => self.fmt_binary(f, l, "+", r),
            Expression::Subtract(l, r) => self.fmt_binary(f, l, "-", r),
            Expression::Multiply(l, r) => self.fmt_binary(f, l, "*", r),
            Expression::Divide(l, r) => self.fmt_binary(f, l, "/", r),
            Expression::Negate(v) => {
                write!(f, "-")?;
                self.fmt_child(f, v, self.precedence())
            }
            Expression::Literal(n) => write!(f, "{}", super::format_number(*n)),
            Expression::Variable(name) => write!(f, "{}", name),
        }
    }
}
