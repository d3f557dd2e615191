//! Restricted arithmetic evaluator.
//!
//! User text is filtered to an allow-listed character set, parsed into a
//! closed expression grammar (numbers, the four binary operators, unary
//! minus, parentheses) and evaluated bottom-up. Nothing outside that grammar
//! can be represented, let alone evaluated, so crafted input can never reach
//! a general-purpose interpreter.

use std::fmt::{Display, Formatter};

pub const EMPTY_EXPRESSION_MESSAGE: &str = "Empty or invalid math expression.";
pub const DIVISION_BY_ZERO_MESSAGE: &str = "Cannot divide by zero.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcError {
    /// Nothing left after sanitization. Routing uses this to decide the
    /// message was not math at all.
    EmptyExpression,
    DivisionByZero,
    /// Syntax the token stream can carry but the closed grammar excludes
    /// (currently only unary plus). Collapses to the generic message.
    UnsupportedConstruct,
    InvalidExpression,
}

impl CalcError {
    pub fn user_message(&self, input: &str) -> String {
        match self {
            Self::EmptyExpression => EMPTY_EXPRESSION_MESSAGE.to_string(),
            Self::DivisionByZero => DIVISION_BY_ZERO_MESSAGE.to_string(),
            Self::UnsupportedConstruct | Self::InvalidExpression => format!(
                "Could not calculate '{input}'. Please use simple math like '5 * 10'."
            ),
        }
    }
}

impl Display for CalcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyExpression => write!(f, "empty expression"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::UnsupportedConstruct => write!(f, "unsupported construct"),
            Self::InvalidExpression => write!(f, "invalid expression"),
        }
    }
}

impl std::error::Error for CalcError {}

/// Evaluates a free-text arithmetic expression, folding every failure into a
/// user-facing string. Pure function of its input.
pub fn evaluate(input: &str) -> String {
    match try_evaluate(input) {
        Ok(message) => message,
        Err(err) => err.user_message(input),
    }
}

/// Like [`evaluate`] but keeps the failure kind, so callers can tell
/// "this was never math" apart from a real evaluation failure.
pub fn try_evaluate(input: &str) -> Result<String, CalcError> {
    let sanitized = sanitize(input);
    if sanitized.trim().is_empty() {
        return Err(CalcError::EmptyExpression);
    }

    let tree = parse(&sanitized)?;
    let value = eval(&tree)?;
    Ok(format!("Calculated Result: {}", format_number(value)))
}

/// Character-class filter: keeps digits, the four operators, parentheses,
/// decimal point, and spaces. Disallowed characters are dropped rather than
/// rejected so expressions embedded in natural language still evaluate.
fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|ch| matches!(ch, '0'..='9' | '+' | '-' | '*' | '/' | '(' | ')' | '.' | ' '))
        .collect()
}

/// The closed grammar. No other node kind exists, which is the security
/// boundary: evaluation is an exhaustive match over exactly this set.
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            ' ' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&digit) = chars.peek() {
                    if digit.is_ascii_digit() || digit == '.' {
                        literal.push(digit);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidExpression)?;
                tokens.push(Token::Number(value));
            }
            // Sanitization guarantees the allow-list; anything else here is
            // a caller bug, not user input.
            _ => return Err(CalcError::InvalidExpression),
        }
    }

    Ok(tokens)
}

/// Recursive-descent parser over the closed grammar:
///
/// ```text
/// expr   := term (('+' | '-') term)*
/// term   := factor (('*' | '/') factor)*
/// factor := '-' factor | number | '(' expr ')'
/// ```
fn parse(input: &str) -> Result<Expr, CalcError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    if parser.peek().is_some() {
        // Leftover tokens, e.g. two adjacent numbers after sanitization
        // dropped the operator between them.
        return Err(CalcError::InvalidExpression);
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expression(&mut self) -> Result<Expr, CalcError> {
        let mut left = self.term()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, CalcError> {
        let mut left = self.factor()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.factor()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr, CalcError> {
        match self.advance() {
            Some(Token::Minus) => Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(self.factor()?),
            }),
            // Unary plus parses in ordinary expression languages but is
            // outside the closed grammar here.
            Some(Token::Plus) => Err(CalcError::UnsupportedConstruct),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(CalcError::InvalidExpression),
                }
            }
            _ => Err(CalcError::InvalidExpression),
        }
    }
}

fn eval(expr: &Expr) -> Result<f64, CalcError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => Ok(-eval(operand)?),
        Expr::Binary { left, op, right } => {
            let left = eval(left)?;
            let right = eval(right)?;
            match op {
                BinaryOp::Add => Ok(left + right),
                BinaryOp::Sub => Ok(left - right),
                BinaryOp::Mul => Ok(left * right),
                BinaryOp::Div => {
                    if right == 0.0 {
                        Err(CalcError::DivisionByZero)
                    } else {
                        Ok(left / right)
                    }
                }
            }
        }
    }
}

/// Integral results print without a decimal point; everything else is
/// rounded to 4 decimal places.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        return format!("{value}");
    }
    let rounded = (value * 10_000.0).round() / 10_000.0;
    format!("{rounded}")
}
