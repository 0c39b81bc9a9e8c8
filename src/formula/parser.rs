use super::expression::Expression;
use super::lexer::{Token, TokenKind, tokenize};
use crate::error::FormulaError;

/// Recursive-descent parser for the formula grammar:
///
/// ```text
/// expr    := term (('+' | '-') term)*
/// term    := unary (('*' | '/') unary)*
/// unary   := ('-' | '+') unary | primary
/// primary := number | identifier | '(' expr ')'
/// ```
///
/// Both the parser and the evaluator recurse over the tree, so the depth of the
/// expression tree and the nesting of parentheses are capped at [`MAX_DEPTH`].
pub(super) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
    nesting: usize,
}

/// Deepest expression tree or parenthesis nesting a formula may have.
pub const MAX_DEPTH: usize = 256;

/// A parsed subexpression with the depth of its tree.
struct Parsed {
    expr: Expression,
    depth: usize,
}

impl Parsed {
    fn leaf(expr: Expression) -> Self {
        Self { expr, depth: 1 }
    }
}

impl Parser {
    pub(super) fn parse(source: &str) -> Result<Expression, FormulaError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(FormulaError::Syntax {
                position: 0,
                message: "formula is empty".to_string(),
            });
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.chars().count(),
            nesting: 0,
        };
        let Parsed { expr, .. } = parser.expression()?;
        if let Some(token) = parser.peek() {
            return Err(FormulaError::Syntax {
                position: token.position,
                message: format!("unexpected {}", describe(&token.kind)),
            });
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn position(&self) -> usize {
        self.peek().map_or(self.end, |t| t.position)
    }

    fn too_deep(&self) -> FormulaError {
        FormulaError::Syntax {
            position: self.position(),
            message: format!("formula nests deeper than {} levels", MAX_DEPTH),
        }
    }

    fn binary(
        &self,
        left: Parsed,
        right: Parsed,
        build: fn(Box<Expression>, Box<Expression>) -> Expression,
    ) -> Result<Parsed, FormulaError> {
        let depth = left.depth.max(right.depth) + 1;
        if depth > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok(Parsed {
            expr: build(Box::new(left.expr), Box::new(right.expr)),
            depth,
        })
    }

    /// Tracks recursion through parentheses and unary operators.
    fn enter(&mut self) -> Result<(), FormulaError> {
        if self.nesting >= MAX_DEPTH {
            return Err(self.too_deep());
        }
        self.nesting += 1;
        Ok(())
    }

    fn expression(&mut self) -> Result<Parsed, FormulaError> {
        let mut left = self.term()?;
        while let Some(kind) = self.peek().map(|t| t.kind.clone()) {
            let build: fn(Box<Expression>, Box<Expression>) -> Expression = match kind {
                TokenKind::Plus => Expression::Sum,
                TokenKind::Minus => Expression::Subtract,
                _ => break,
            };
            self.pos += 1;
            let right = self.term()?;
            left = self.binary(left, right, build)?;
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Parsed, FormulaError> {
        let mut left = self.unary()?;
        while let Some(kind) = self.peek().map(|t| t.kind.clone()) {
            let build: fn(Box<Expression>, Box<Expression>) -> Expression = match kind {
                TokenKind::Star => Expression::Multiply,
                TokenKind::Slash => Expression::Divide,
                _ => break,
            };
            self.pos += 1;
            let right = self.unary()?;
            left = self.binary(left, right, build)?;
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Parsed, FormulaError> {
        let negate = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Minus) => true,
            Some(TokenKind::Plus) => false,
            _ => return self.primary(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.unary()?;
        self.nesting -= 1;
        if !negate {
            return Ok(operand);
        }
        let depth = operand.depth + 1;
        if depth > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok(Parsed {
            expr: Expression::Negate(Box::new(operand.expr)),
            depth,
        })
    }

    fn primary(&mut self) -> Result<Parsed, FormulaError> {
        let Some(token) = self.next() else {
            return Err(FormulaError::Syntax {
                position: self.end,
                message: "unexpected end of formula".to_string(),
            });
        };
        match token.kind {
            TokenKind::Number(n) => Ok(Parsed::leaf(Expression::Literal(n))),
            TokenKind::Ident(name) => Ok(Parsed::leaf(Expression::Variable(name))),
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.expression()?;
                self.nesting -= 1;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(FormulaError::Syntax {
                        position: other.position,
                        message: format!("expected ')' but found {}", describe(&other.kind)),
                    }),
                    None => Err(FormulaError::Syntax {
                        position: self.end,
                        message: format!("unclosed '(' opened at position {}", token.position),
                    }),
                }
            }
            other => Err(FormulaError::Syntax {
                position: token.position,
                message: format!("unexpected {}", describe(&other)),
            }),
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(n) => format!("number {}", n),
        TokenKind::Ident(name) => format!("identifier '{}'", name),
        TokenKind::Plus => "'+'".to_string(),
        TokenKind::Minus => "'-'".to_string(),
        TokenKind::Star => "'*'".to_string(),
        TokenKind::Slash => "'/'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
    }
}
