//! JSONPath expressions over `serde_json` values.
//!
//! Supports the subset the viewer needs: `$` root, dot and bracket keys,
//! array indices (negative counts from the end), wildcards, recursive
//! descent, and `[?(@.path op literal)]` filters. An expression is parsed
//! once per query and evaluated per record, returning borrowed hits.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

/// The expression could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
  message: String,
}

impl PathError {
  fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

impl fmt::Display for PathError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "invalid JSONPath: {}", self.message)
  }
}

impl std::error::Error for PathError {}

/// A parsed, reusable JSONPath expression.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
  segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
  Key(String),
  Index(i64),
  Wildcard,
  /// `..name` / `..*`: apply the inner segment at every depth below.
  Descend(Box<Segment>),
  Filter(Filter),
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
  /// `@`-relative key chain.
  path: Vec<String>,
  /// `None` is a bare existence test.
  op: Option<(CmpOp, Value)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

impl JsonPath {
  pub fn parse(expr: &str) -> Result<Self, PathError> {
    Parser::new(expr).parse()
  }

  /// All values the expression selects under `root`, in document order.
  pub fn select<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
    let mut current = vec![root];
    for segment in &self.segments {
      let mut next = Vec::new();
      for value in current {
        apply(segment, value, &mut next);
      }
      if next.is_empty() {
        return Vec::new();
      }
      current = next;
    }
    current
  }
}

fn apply<'a>(segment: &Segment, value: &'a Value, out: &mut Vec<&'a Value>) {
  match segment {
    Segment::Key(key) => {
      if let Value::Object(map) = value {
        if let Some(v) = map.get(key) {
          out.push(v);
        }
      }
    }
    Segment::Index(i) => {
      if let Value::Array(items) = value {
        let idx = if *i < 0 {
          items.len().checked_sub(i.unsigned_abs() as usize)
        } else {
          Some(*i as usize)
        };
        if let Some(v) = idx.and_then(|idx| items.get(idx)) {
          out.push(v);
        }
      }
    }
    Segment::Wildcard => match value {
      Value::Object(map) => out.extend(map.values()),
      Value::Array(items) => out.extend(items.iter()),
      _ => {}
    },
    Segment::Descend(inner) => descend(inner, value, out),
    Segment::Filter(filter) => match value {
      Value::Array(items) => out.extend(items.iter().filter(|item| filter.matches(item))),
      // A filter on a single object tests the object itself.
      other => {
        if filter.matches(other) {
          out.push(other);
        }
      }
    },
  }
}

fn descend<'a>(segment: &Segment, value: &'a Value, out: &mut Vec<&'a Value>) {
  apply(segment, value, out);
  match value {
    Value::Object(map) => {
      for v in map.values() {
        descend(segment, v, out);
      }
    }
    Value::Array(items) => {
      for v in items {
        descend(segment, v, out);
      }
    }
    _ => {}
  }
}

impl Filter {
  fn matches(&self, item: &Value) -> bool {
    let mut current = item;
    for key in &self.path {
      match current {
        Value::Object(map) => match map.get(key) {
          Some(v) => current = v,
          None => return false,
        },
        _ => return false,
      }
    }
    match &self.op {
      None => !current.is_null(),
      Some((op, literal)) => compare_values(current, literal)
        .map(|ord| op.holds(ord))
        .unwrap_or(false),
    }
  }
}

impl CmpOp {
  fn holds(self, ord: Ordering) -> bool {
    match self {
      CmpOp::Eq => ord == Ordering::Equal,
      CmpOp::Ne => ord != Ordering::Equal,
      CmpOp::Lt => ord == Ordering::Less,
      CmpOp::Le => ord != Ordering::Greater,
      CmpOp::Gt => ord == Ordering::Greater,
      CmpOp::Ge => ord != Ordering::Less,
    }
  }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
    (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
    (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
    (Value::Null, Value::Null) => Some(Ordering::Equal),
    _ => None,
  }
}

struct Parser<'a> {
  src: &'a str,
  pos: usize,
}

impl<'a> Parser<'a> {
  fn new(src: &'a str) -> Self {
    Self {
      src: src.trim(),
      pos: 0,
    }
  }

  fn parse(mut self) -> Result<JsonPath, PathError> {
    if !self.eat('$') {
      return Err(PathError::new("expression must start with '$'"));
    }
    let mut segments = Vec::new();
    while let Some(c) = self.peek() {
      match c {
        '.' => {
          self.advance();
          if self.eat('.') {
            segments.push(Segment::Descend(Box::new(self.parse_dot_child()?)));
          } else {
            segments.push(self.parse_dot_child()?);
          }
        }
        '[' => {
          self.advance();
          segments.push(self.parse_bracket()?);
        }
        other => {
          return Err(PathError::new(format!(
            "unexpected character '{other}' at offset {}",
            self.pos
          )))
        }
      }
    }
    Ok(JsonPath { segments })
  }

  fn parse_dot_child(&mut self) -> Result<Segment, PathError> {
    if self.eat('*') {
      return Ok(Segment::Wildcard);
    }
    let name = self.parse_name()?;
    Ok(Segment::Key(name))
  }

  fn parse_bracket(&mut self) -> Result<Segment, PathError> {
    self.skip_ws();
    let segment = match self.peek() {
      Some('*') => {
        self.advance();
        Segment::Wildcard
      }
      Some(quote @ ('\'' | '"')) => {
        self.advance();
        Segment::Key(self.parse_quoted(quote)?)
      }
      Some('?') => {
        self.advance();
        self.parse_filter()?
      }
      Some(c) if c == '-' || c.is_ascii_digit() => Segment::Index(self.parse_integer()?),
      Some(other) => {
        return Err(PathError::new(format!(
          "unexpected character '{other}' inside brackets at offset {}",
          self.pos
        )))
      }
      None => return Err(PathError::new("unterminated bracket selector")),
    };
    self.skip_ws();
    if !self.eat(']') {
      return Err(PathError::new(format!(
        "expected ']' at offset {}",
        self.pos
      )));
    }
    Ok(segment)
  }

  fn parse_filter(&mut self) -> Result<Segment, PathError> {
    if !self.eat('(') {
      return Err(PathError::new("expected '(' after '?'"));
    }
    self.skip_ws();
    if !self.eat('@') {
      return Err(PathError::new("filters must start with '@'"));
    }
    let mut path = Vec::new();
    while self.eat('.') {
      path.push(self.parse_name()?);
    }
    if path.is_empty() {
      return Err(PathError::new("filter path is empty"));
    }
    self.skip_ws();

    let op = match self.peek() {
      Some(')') => None,
      _ => {
        let op = self.parse_cmp_op()?;
        self.skip_ws();
        let literal = self.parse_literal()?;
        self.skip_ws();
        Some((op, literal))
      }
    };
    if !self.eat(')') {
      return Err(PathError::new(format!(
        "expected ')' at offset {}",
        self.pos
      )));
    }
    Ok(Segment::Filter(Filter { path, op }))
  }

  fn parse_cmp_op(&mut self) -> Result<CmpOp, PathError> {
    let rest = &self.src[self.pos..];
    let (op, len) = if rest.starts_with("==") {
      (CmpOp::Eq, 2)
    } else if rest.starts_with("!=") {
      (CmpOp::Ne, 2)
    } else if rest.starts_with("<=") {
      (CmpOp::Le, 2)
    } else if rest.starts_with(">=") {
      (CmpOp::Ge, 2)
    } else if rest.starts_with('<') {
      (CmpOp::Lt, 1)
    } else if rest.starts_with('>') {
      (CmpOp::Gt, 1)
    } else {
      return Err(PathError::new(format!(
        "expected comparison operator at offset {}",
        self.pos
      )));
    };
    self.pos += len;
    Ok(op)
  }

  fn parse_literal(&mut self) -> Result<Value, PathError> {
    match self.peek() {
      Some(quote @ ('\'' | '"')) => {
        self.advance();
        Ok(Value::String(self.parse_quoted(quote)?))
      }
      Some(c) if c == '-' || c.is_ascii_digit() => {
        let start = self.pos;
        while let Some(c) = self.peek() {
          if c == '-' || c == '+' || c == '.' || c == 'e' || c == 'E' || c.is_ascii_digit() {
            self.advance();
          } else {
            break;
          }
        }
        let text = &self.src[start..self.pos];
        let n: f64 = text
          .parse()
          .map_err(|_| PathError::new(format!("bad number literal '{text}'")))?;
        serde_json::Number::from_f64(n)
          .map(Value::Number)
          .ok_or_else(|| PathError::new(format!("non-finite number literal '{text}'")))
      }
      _ => {
        if self.eat_word("true") {
          Ok(Value::Bool(true))
        } else if self.eat_word("false") {
          Ok(Value::Bool(false))
        } else if self.eat_word("null") {
          Ok(Value::Null)
        } else {
          Err(PathError::new(format!(
            "expected literal at offset {}",
            self.pos
          )))
        }
      }
    }
  }

  fn parse_name(&mut self) -> Result<String, PathError> {
    let start = self.pos;
    while let Some(c) = self.peek() {
      if c.is_alphanumeric() || c == '_' || c == '-' {
        self.advance();
      } else {
        break;
      }
    }
    if self.pos == start {
      return Err(PathError::new(format!(
        "expected a name at offset {start}"
      )));
    }
    Ok(self.src[start..self.pos].to_string())
  }

  fn parse_quoted(&mut self, quote: char) -> Result<String, PathError> {
    let mut out = String::new();
    loop {
      match self.peek() {
        None => return Err(PathError::new("unterminated string literal")),
        Some('\\') => {
          self.advance();
          match self.peek() {
            Some(c) => {
              out.push(c);
              self.advance();
            }
            None => return Err(PathError::new("unterminated escape")),
          }
        }
        Some(c) if c == quote => {
          self.advance();
          return Ok(out);
        }
        Some(c) => {
          out.push(c);
          self.advance();
        }
      }
    }
  }

  fn parse_integer(&mut self) -> Result<i64, PathError> {
    let start = self.pos;
    if self.peek() == Some('-') {
      self.advance();
    }
    while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
      self.advance();
    }
    self.src[start..self.pos]
      .parse()
      .map_err(|_| PathError::new(format!("bad index at offset {start}")))
  }

  fn peek(&self) -> Option<char> {
    self.src[self.pos..].chars().next()
  }

  fn advance(&mut self) {
    if let Some(c) = self.peek() {
      self.pos += c.len_utf8();
    }
  }

  fn eat(&mut self, expected: char) -> bool {
    if self.peek() == Some(expected) {
      self.advance();
      true
    } else {
      false
    }
  }

  fn eat_word(&mut self, word: &str) -> bool {
    if self.src[self.pos..].starts_with(word) {
      self.pos += word.len();
      true
    } else {
      false
    }
  }

  fn skip_ws(&mut self) {
    while matches!(self.peek(), Some(c) if c.is_whitespace()) {
      self.advance();
    }
  }
}
