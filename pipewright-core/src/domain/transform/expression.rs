// pipewright-core/src/domain/transform/expression.rs

//! Formula language of the `compute_column` step.
//!
//! Precedence, lowest first:
//!
//! | level      | operators                          |
//! |------------|------------------------------------|
//! | or         | `or`, `\|`                         |
//! | and        | `and`, `&`                         |
//! | comparison | `==` `!=` `<` `<=` `>` `>=` (non-chaining) |
//! | sum        | `+` `-`                            |
//! | product    | `*` `/` `//` `%`                   |
//! | unary      | `-` `+` `not`                      |
//! | power      | `**` (right associative)           |
//!
//! Operands are numeric literals, `true`/`false`, column names (bare, or
//! `` `quoted with backticks` ``) and parenthesised expressions. There are no
//! functions. Arithmetic only accepts numeric values; text and timestamps may
//! only be compared with values of the same type.

use std::collections::HashMap;

use crate::domain::dataset::{Dataset, Value};
use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// A parsed formula, ready to be evaluated against datasets.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, DomainError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            source,
        };
        let ast = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(parser.error(&format!("unexpected token '{}'", token)));
        }
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Column names referenced by the formula, in order of appearance.
    pub fn identifiers(&self) -> Vec<&str> {
        fn walk<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
            match expr {
                Expr::Literal(_) => {}
                Expr::Column(name) => {
                    if !out.contains(&name.as_str()) {
                        out.push(name);
                    }
                }
                Expr::Unary(_, inner) => walk(inner, out),
                Expr::Binary(_, l, r) => {
                    walk(l, out);
                    walk(r, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.ast, &mut out);
        out
    }

    /// Evaluates the formula once per row.
    ///
    /// Identifiers are resolved before the first row, so an unknown column
    /// fails even on an empty dataset.
    pub fn evaluate(&self, dataset: &Dataset) -> Result<Vec<Value>, DomainError> {
        let mut slots: HashMap<&str, usize> = HashMap::new();
        for name in self.identifiers() {
            let index = dataset.position(name).ok_or_else(|| {
                DomainError::Expression(format!(
                    "unknown identifier '{}' in '{}' (available columns: {})",
                    name,
                    self.source,
                    dataset.column_names().join(", ")
                ))
            })?;
            slots.insert(name, index);
        }

        let columns = dataset.columns();
        (0..dataset.row_count())
            .map(|row| {
                eval(&self.ast, &|name| {
                    // Every identifier was bound above.
                    slots.get(name).map(|&i| &columns[i].values[row])
                })
            })
            .collect()
    }
}

// --- LEXER ---

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Int(i) => write!(f, "{}", i),
            Token::Float(x) => write!(f, "{}", x),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Op(op) => write!(f, "{}", op),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

const OPERATORS: [&str; 16] = [
    "**", "//", "==", "!=", "<=", ">=", "<", ">", "+", "-", "*", "/", "%", "&", "|", "=",
];

fn tokenize(source: &str) -> Result<Vec<Token>, DomainError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit))
        {
            let start = i;
            let mut is_float = false;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i < chars.len() && chars[i] == '.' {
                is_float = true;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    is_float = true;
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let token = if is_float {
                text.parse::<f64>().map(Token::Float).ok()
            } else {
                text.parse::<i64>().map(Token::Int).ok()
            };
            tokens.push(token.ok_or_else(|| {
                DomainError::Expression(format!("invalid number '{}' in '{}'", text, source))
            })?);
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else if c == '`' {
            let start = i + 1;
            let end = chars[start..]
                .iter()
                .position(|&ch| ch == '`')
                .map(|offset| start + offset)
                .ok_or_else(|| {
                    DomainError::Expression(format!("unterminated backtick in '{}'", source))
                })?;
            let name: String = chars[start..end].iter().collect();
            // Quoted names are always columns, even when they spell a keyword.
            tokens.push(Token::Ident(format!("`{}", name)));
            i = end + 1;
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .ok_or_else(|| {
                    DomainError::Expression(format!(
                        "unexpected character '{}' in '{}'",
                        c, source
                    ))
                })?;
            if *op == "=" {
                return Err(DomainError::Expression(format!(
                    "assignment is not supported, use '==' in '{}'",
                    source
                )));
            }
            tokens.push(Token::Op(op));
            i += op.len();
        }
    }

    Ok(tokens)
}

// --- PARSER ---

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, msg: &str) -> DomainError {
        DomainError::Expression(format!("{} in '{}'", msg, self.source))
    }

    fn eat_op(&mut self, candidates: &[&str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(op)) if candidates.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(word)) if word == keyword => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn parse_or(&mut self) -> Result<Expr, DomainError> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") || self.eat_op(&["|"]).is_some() {
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, DomainError> {
        let mut left = self.parse_comparison()?;
        while self.eat_keyword("and") || self.eat_op(&["&"]).is_some() {
            let right = self.parse_comparison()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, DomainError> {
        let left = self.parse_sum()?;
        let op = match self.eat_op(&["==", "!=", "<", "<=", ">", ">="]) {
            Some("==") => BinaryOp::Eq,
            Some("!=") => BinaryOp::Ne,
            Some("<") => BinaryOp::Lt,
            Some("<=") => BinaryOp::Le,
            Some(">") => BinaryOp::Gt,
            Some(">=") => BinaryOp::Ge,
            _ => return Ok(left),
        };
        let right = self.parse_sum()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn parse_sum(&mut self) -> Result<Expr, DomainError> {
        let mut left = self.parse_product()?;
        while let Some(op) = self.eat_op(&["+", "-"]) {
            let op = if op == "+" { BinaryOp::Add } else { BinaryOp::Sub };
            let right = self.parse_product()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_product(&mut self) -> Result<Expr, DomainError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.eat_op(&["*", "/", "//", "%"]) {
            let op = match op {
                "*" => BinaryOp::Mul,
                "/" => BinaryOp::Div,
                "//" => BinaryOp::FloorDiv,
                _ => BinaryOp::Mod,
            };
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, DomainError> {
        if let Some(op) = self.eat_op(&["-", "+"]) {
            let op = if op == "-" { UnaryOp::Neg } else { UnaryOp::Plus };
            return Ok(Expr::Unary(op, Box::new(self.parse_unary()?)));
        }
        if self.eat_keyword("not") {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.parse_unary()?)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, DomainError> {
        let base = self.parse_atom()?;
        if self.eat_op(&["**"]).is_some() {
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Expr, DomainError> {
        match self.next() {
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::Integer(i))),
            Some(Token::Float(x)) => Ok(Expr::Literal(Value::Float(x))),
            Some(Token::Ident(word)) => match word.as_str() {
                "true" | "True" => Ok(Expr::Literal(Value::Boolean(true))),
                "false" | "False" => Ok(Expr::Literal(Value::Boolean(false))),
                "and" | "or" | "not" => Err(self.error(&format!("unexpected keyword '{}'", word))),
                _ => Ok(Expr::Column(
                    word.strip_prefix('`').map(str::to_string).unwrap_or(word),
                )),
            },
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("missing closing parenthesis")),
                }
            }
            Some(token) => Err(self.error(&format!("unexpected token '{}'", token))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

// --- EVALUATION ---

fn eval<'v>(expr: &Expr, lookup: &dyn Fn(&str) -> Option<&'v Value>) -> Result<Value, DomainError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Column(name) => lookup(name)
            .cloned()
            .ok_or_else(|| DomainError::Expression(format!("unknown identifier '{}'", name))),
        Expr::Unary(op, inner) => {
            let value = eval(inner, lookup)?;
            unary(*op, value)
        }
        Expr::Binary(op, left, right) => {
            let l = eval(left, lookup)?;
            let r = eval(right, lookup)?;
            binary(*op, l, r)
        }
    }
}

fn mismatch(op: &str, value: &Value) -> DomainError {
    let ty = value
        .data_type()
        .map_or_else(|| "null".to_string(), |t| t.to_string());
    DomainError::Expression(format!("type mismatch: cannot apply '{}' to {}", op, ty))
}

fn truthy(op: &str, value: &Value) -> Result<Option<bool>, DomainError> {
    match value {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(*b)),
        Value::Integer(i) => Ok(Some(*i != 0)),
        Value::Float(x) => Ok(Some(*x != 0.0)),
        other => Err(mismatch(op, other)),
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, DomainError> {
    match (op, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOp::Not, v) => Ok(truthy("not", &v)?.map_or(Value::Null, |b| Value::Boolean(!b))),
        (UnaryOp::Neg, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| DomainError::Expression("integer overflow".into())),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Neg, Value::Boolean(b)) => Ok(Value::Integer(-i64::from(b))),
        (UnaryOp::Plus, v @ (Value::Integer(_) | Value::Float(_))) => Ok(v),
        (UnaryOp::Plus, Value::Boolean(b)) => Ok(Value::Integer(i64::from(b))),
        (UnaryOp::Neg, v) => Err(mismatch("-", &v)),
        (UnaryOp::Plus, v) => Err(mismatch("+", &v)),
    }
}

enum Numeric {
    Int(i64),
    Float(f64),
}

fn numeric(op: BinaryOp, value: &Value) -> Result<Numeric, DomainError> {
    match value {
        Value::Integer(i) => Ok(Numeric::Int(*i)),
        Value::Boolean(b) => Ok(Numeric::Int(i64::from(*b))),
        Value::Float(x) => Ok(Numeric::Float(*x)),
        other => Err(mismatch(op.symbol(), other)),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, DomainError> {
    match op {
        BinaryOp::And | BinaryOp::Or => {
            let l = truthy(op.symbol(), &left)?;
            let r = truthy(op.symbol(), &right)?;
            Ok(match (l, r) {
                (Some(a), Some(b)) if op == BinaryOp::And => Value::Boolean(a && b),
                (Some(a), Some(b)) => Value::Boolean(a || b),
                _ => Value::Null,
            })
        }
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            compare(op, &left, &right)
        }
        _ => {
            if left.is_null() || right.is_null() {
                // Still reject non-numeric operands on the other side.
                for v in [&left, &right] {
                    if !v.is_null() {
                        numeric(op, v)?;
                    }
                }
                return Ok(Value::Null);
            }
            match (numeric(op, &left)?, numeric(op, &right)?) {
                (Numeric::Int(a), Numeric::Int(b)) => int_arith(op, a, b),
                (a, b) => {
                    let a = match a {
                        Numeric::Int(i) => i as f64,
                        Numeric::Float(x) => x,
                    };
                    let b = match b {
                        Numeric::Int(i) => i as f64,
                        Numeric::Float(x) => x,
                    };
                    Ok(Value::Float(float_arith(op, a, b)))
                }
            }
        }
    }
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> Result<Value, DomainError> {
    let overflow = || DomainError::Expression(format!("integer overflow in {} {} {}", a, op.symbol(), b));
    match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Integer).ok_or_else(overflow),
        BinaryOp::Sub => a.checked_sub(b).map(Value::Integer).ok_or_else(overflow),
        BinaryOp::Mul => a.checked_mul(b).map(Value::Integer).ok_or_else(overflow),
        BinaryOp::Div => {
            if b == 0 {
                Ok(Value::Null)
            } else {
                Ok(Value::Float(a as f64 / b as f64))
            }
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Ok(Value::Null);
            }
            let q = a.checked_div(b).ok_or_else(overflow)?;
            let floored = if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q };
            Ok(Value::Integer(floored))
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Ok(Value::Null);
            }
            let r = a.checked_rem(b).ok_or_else(overflow)?;
            // Result takes the sign of the divisor.
            let r = if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r };
            Ok(Value::Integer(r))
        }
        BinaryOp::Pow => {
            if b < 0 {
                Ok(Value::Float((a as f64).powf(b as f64)))
            } else {
                let exp = u32::try_from(b).map_err(|_| overflow())?;
                a.checked_pow(exp).map(Value::Integer).ok_or_else(overflow)
            }
        }
        _ => Err(DomainError::Expression(format!(
            "'{}' is not an arithmetic operator",
            op.symbol()
        ))),
    }
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => a - b * (a / b).floor(),
        BinaryOp::Pow => a.powf(b),
        _ => f64::NAN,
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, DomainError> {
    use std::cmp::Ordering;

    let ordering: Option<Ordering> = match (left, right) {
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Null),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (l, r) => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            (None, _) => return Err(mismatch(op.symbol(), l)),
            (_, None) => return Err(mismatch(op.symbol(), r)),
        },
    };

    // NaN compares unequal to everything.
    let Some(ord) = ordering else {
        return Ok(Value::Boolean(op == BinaryOp::Ne));
    };

    let result = match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::Ne => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        _ => {
            return Err(DomainError::Expression(format!(
                "'{}' is not a comparison operator",
                op.symbol()
            )));
        }
    };
    Ok(Value::Boolean(result))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        Dataset::from_rows(
            vec!["a".into(), "b".into(), "unit price".into(), "label".into()],
            vec![
                vec![Value::Integer(1), Value::Integer(2), Value::Float(0.5), "x".into()],
                vec![Value::Integer(3), Value::Integer(4), Value::Null, "y".into()],
            ],
        )
        .unwrap()
    }

    fn eval_str(src: &str) -> Result<Vec<Value>, DomainError> {
        Expression::parse(src)?.evaluate(&dataset())
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            eval_str("a + b * 2").unwrap(),
            vec![Value::Integer(5), Value::Integer(11)]
        );
        assert_eq!(
            eval_str("(a + b) * 2").unwrap(),
            vec![Value::Integer(6), Value::Integer(14)]
        );
        assert_eq!(eval_str("-2 ** 2").unwrap()[0], Value::Integer(-4));
        assert_eq!(eval_str("2 ** 3 ** 2").unwrap()[0], Value::Integer(512));
    }

    #[test]
    fn test_division_semantics() {
        assert_eq!(eval_str("a / b").unwrap(), vec![Value::Float(0.5), Value::Float(0.75)]);
        assert_eq!(eval_str("-7 // 2").unwrap()[0], Value::Integer(-4));
        assert_eq!(eval_str("7 // -2").unwrap()[0], Value::Integer(-4));
        assert_eq!(eval_str("-7 % 3").unwrap()[0], Value::Integer(2));
        assert_eq!(eval_str("a / 0").unwrap()[0], Value::Null);
        assert_eq!(eval_str("a % 0").unwrap()[0], Value::Null);
        assert_eq!(eval_str("a / 0.0").unwrap()[0], Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(
            eval_str("a >= 2 and b < 10").unwrap(),
            vec![Value::Boolean(false), Value::Boolean(true)]
        );
        assert_eq!(
            eval_str("not (a == 1) or false").unwrap(),
            vec![Value::Boolean(false), Value::Boolean(true)]
        );
        assert_eq!(
            eval_str("label == label").unwrap(),
            vec![Value::Boolean(true), Value::Boolean(true)]
        );
    }

    #[test]
    fn test_null_propagation_and_backticks() {
        assert_eq!(
            eval_str("`unit price` * a").unwrap(),
            vec![Value::Float(0.5), Value::Null]
        );
        assert_eq!(eval_str("`unit price` > 0").unwrap()[1], Value::Null);
    }

    #[test]
    fn test_unknown_identifier_fails_on_empty_dataset() {
        let expr = Expression::parse("missing + 1").unwrap();
        let err = expr.evaluate(&Dataset::default()).unwrap_err();
        assert!(matches!(err, DomainError::Expression(msg) if msg.contains("missing")));
    }

    #[test]
    fn test_type_mismatch() {
        let err = eval_str("label + 1").unwrap_err();
        assert!(matches!(err, DomainError::Expression(msg) if msg.contains("type mismatch")));
        assert!(eval_str("label > 1").is_err());
    }

    #[test]
    fn test_syntax_errors() {
        assert!(Expression::parse("a +").is_err());
        assert!(Expression::parse("(a + b").is_err());
        assert!(Expression::parse("a = b").is_err());
        assert!(Expression::parse("a < b < c").is_err());
        assert!(Expression::parse("a $ b").is_err());
        assert!(Expression::parse("`open").is_err());
    }

    #[test]
    fn test_identifiers_in_order() {
        let expr = Expression::parse("b * a + b").unwrap();
        assert_eq!(expr.identifiers(), vec!["b", "a"]);
    }

    #[test]
    fn test_compare_rejects_arithmetic_operator() {
        let err = compare(BinaryOp::Add, &Value::Integer(1), &Value::Integer(2)).unwrap_err();
        assert!(matches!(err, DomainError::Expression(_)));
        assert_eq!(
            compare(BinaryOp::Le, &Value::Integer(1), &Value::Integer(2)).unwrap(),
            Value::Boolean(true)
        );
    }
}
