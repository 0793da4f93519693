//! Template rendering for text response bodies.
//!
//! Two passes over the content:
//!
//! 1. [`substitute`] replaces literal `{{ key }}` tokens (whitespace inside
//!    the braces is tolerated) with the matching value from the scope;
//!    unknown keys are left in place.
//! 2. [`interpolate`] evaluates `${ expr }` interpolations with a restricted
//!    expression evaluator: property lookup on the scope, string/number/bool
//!    literals, arithmetic, comparison, string concatenation and
//!    parentheses. Nothing else; in particular no function calls and no
//!    access outside the supplied scope. Malformed expressions are an error
//!    at render time.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unterminated ${{...}} interpolation at byte {0}")]
    Unterminated(usize),

    #[error("template scope must be a JSON object")]
    ScopeNotObject,

    #[error("unexpected character {0:?} in expression")]
    UnexpectedChar(char),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token {0:?} in expression")]
    UnexpectedToken(String),

    #[error("unknown identifier {0:?}")]
    UnknownIdentifier(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

/// Pass 1: literal `{{ key }}` substitution.
#[must_use]
pub fn substitute(content: &str, scope: &Value) -> String {
    let Some(map) = scope.as_object() else {
        return content.to_string();
    };
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start + 2..].find("}}") else {
            break;
        };
        let inner = &rest[start + 2..start + 2 + end];
        out.push_str(&rest[..start]);
        match map.get(inner.trim()) {
            Some(value) => out.push_str(&stringify(value)),
            // Unknown key: keep the token verbatim.
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &rest[start + 2 + end + 2..];
    }
    out.push_str(rest);
    out
}

/// Pass 2: `${ expr }` interpolation.
pub fn interpolate(content: &str, scope: &Value) -> Result<String, TemplateError> {
    if !content.contains("${") {
        return Ok(content.to_string());
    }
    let map = scope.as_object().ok_or(TemplateError::ScopeNotObject)?;
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let expr_start = start + 2;
        let end = find_closing_brace(&rest[expr_start..])
            .ok_or(TemplateError::Unterminated(start))?;
        let expr = &rest[expr_start..expr_start + end];
        let value = eval(expr, map)?;
        out.push_str(&stringify(&value));
        rest = &rest[expr_start + end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Find the `}` ending an interpolation, skipping over string literals.
fn find_closing_brace(s: &str) -> Option<usize> {
    let mut in_string: Option<char> = None;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match in_string {
            Some(quote) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == quote {
                    in_string = None;
                }
            }
            None => match c {
                '\'' | '"' => in_string = Some(c),
                '}' => return Some(i),
                _ => {}
            },
        }
    }
    None
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

// ============== Expression evaluator ==============

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    LParen,
    RParen,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Bang,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            c if c.is_ascii_digit() => {
                let mut num = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let parsed = num
                    .parse::<f64>()
                    .map_err(|_| TemplateError::UnexpectedToken(num.clone()))?;
                tokens.push(Token::Number(parsed));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                let mut closed = false;
                while let Some(d) = chars.next() {
                    if d == '\\' {
                        if let Some(escaped) = chars.next() {
                            s.push(escaped);
                        }
                    } else if d == quote {
                        closed = true;
                        break;
                    } else {
                        s.push(d);
                    }
                }
                if !closed {
                    return Err(TemplateError::UnexpectedEnd);
                }
                tokens.push(Token::Str(s));
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
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::EqEq);
                } else {
                    return Err(TemplateError::UnexpectedChar('='));
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::LtEq);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::GtEq);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            other => return Err(TemplateError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    scope: &'a serde_json::Map<String, Value>,
}

fn eval(expr: &str, scope: &serde_json::Map<String, Value>) -> Result<Value, TemplateError> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        scope,
    };
    let value = parser.equality()?;
    match parser.peek() {
        None => Ok(value),
        Some(tok) => Err(TemplateError::UnexpectedToken(format!("{tok:?}"))),
    }
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn equality(&mut self) -> Result<Value, TemplateError> {
        let mut left = self.comparison()?;
        while let Some(op) = self.peek().cloned() {
            match op {
                Token::EqEq => {
                    self.pos += 1;
                    let right = self.comparison()?;
                    left = Value::Bool(loose_eq(&left, &right));
                }
                Token::NotEq => {
                    self.pos += 1;
                    let right = self.comparison()?;
                    left = Value::Bool(!loose_eq(&left, &right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Value, TemplateError> {
        let mut left = self.term()?;
        while let Some(op) = self.peek().cloned() {
            let cmp: fn(f64, f64) -> bool = match op {
                Token::Lt => |a: f64, b: f64| a < b,
                Token::LtEq => |a: f64, b: f64| a <= b,
                Token::Gt => |a: f64, b: f64| a > b,
                Token::GtEq => |a: f64, b: f64| a >= b,
                _ => break,
            };
            self.pos += 1;
            let right = self.term()?;
            let (a, b) = (as_number(&left)?, as_number(&right)?);
            left = Value::Bool(cmp(a, b));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Value, TemplateError> {
        let mut left = self.factor()?;
        while let Some(op) = self.peek().cloned() {
            match op {
                Token::Plus => {
                    self.pos += 1;
                    let right = self.factor()?;
                    left = add(&left, &right)?;
                }
                Token::Minus => {
                    self.pos += 1;
                    let right = self.factor()?;
                    left = number(as_number(&left)? - as_number(&right)?);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Value, TemplateError> {
        let mut left = self.unary()?;
        while let Some(op) = self.peek().cloned() {
            let f: fn(f64, f64) -> f64 = match op {
                Token::Star => |a: f64, b: f64| a * b,
                Token::Slash => |a: f64, b: f64| a / b,
                Token::Percent => |a: f64, b: f64| a % b,
                _ => break,
            };
            self.pos += 1;
            let right = self.unary()?;
            left = number(f(as_number(&left)?, as_number(&right)?));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Value, TemplateError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                let value = self.unary()?;
                Ok(number(-as_number(&value)?))
            }
            Some(Token::Bang) => {
                self.pos += 1;
                let value = self.unary()?;
                Ok(Value::Bool(!truthy(&value)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Value, TemplateError> {
        let tok = self.next().ok_or(TemplateError::UnexpectedEnd)?.clone();
        match tok {
            Token::Number(n) => Ok(number(n)),
            Token::Str(s) => Ok(Value::String(s)),
            Token::LParen => {
                let value = self.equality()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(TemplateError::UnexpectedEnd),
                }
            }
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                _ => self.lookup(&name),
            },
            other => Err(TemplateError::UnexpectedToken(format!("{other:?}"))),
        }
    }

    /// Resolve `ident(.ident)*` against the scope. The root identifier must
    /// exist; missing nested properties resolve to `null`.
    fn lookup(&mut self, root: &str) -> Result<Value, TemplateError> {
        let mut current = self
            .scope
            .get(root)
            .ok_or_else(|| TemplateError::UnknownIdentifier(root.to_string()))?
            .clone();
        while self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            let Some(Token::Ident(field)) = self.next().cloned() else {
                return Err(TemplateError::UnexpectedEnd);
            };
            current = current.get(&field).cloned().unwrap_or(Value::Null);
        }
        Ok(current)
    }
}

fn number(n: f64) -> Value {
    // Render integral results without a trailing ".0".
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 9e15 {
        #[allow(clippy::cast_possible_truncation)]
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

fn as_number(value: &Value) -> Result<f64, TemplateError> {
    value
        .as_f64()
        .ok_or_else(|| TemplateError::TypeMismatch(format!("{value} is not a number")))
}

fn add(left: &Value, right: &Value) -> Result<Value, TemplateError> {
    match (left, right) {
        (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::String(format!(
            "{}{}",
            stringify(left),
            stringify(right)
        ))),
        _ => Ok(number(as_number(left)? + as_number(right)?)),
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
        _ => left == right,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
