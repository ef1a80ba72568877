//! Embedded expression language for expression targets such as `add(2, 3)`.
//!
//! Grammar:
//!
//! ```text
//! expr    := call | array | literal | ident
//! call    := ident '(' [expr (',' expr)*] ')'
//! array   := '[' [expr (',' expr)*] ']'
//! literal := number | string | true | false | null
//! ```
//!
//! Identifiers resolve against the [`Namespace`] when the expression is compiled, so
//! unknown names are reported before any timing starts.

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{BaselineError, BoxError};
use crate::target::Value;

type NativeFn<'a> = Box<dyn FnMut(&[Value]) -> Result<Value, BoxError> + 'a>;

/// Free variables and functions visible to an expression.
#[derive(Default)]
pub struct Namespace<'a> {
    functions: Vec<(String, NativeFn<'a>)>,
    values: BTreeMap<String, Value>,
}

impl<'a> Namespace<'a> {
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_function<F, E>(mut self, name: &str, func: F) -> Self
    where
        F: FnMut(&[Value]) -> Result<Value, E> + 'a,
        E: Into<BoxError>,
    {
        self.insert_function(name, func);
        self
    }

    pub fn with_value<V: Into<Value>>(mut self, name: &str, value: V) -> Self {
        self.insert_value(name, value);
        self
    }

    /// Register `func` under `name`, replacing any previous function of that name.
    pub fn insert_function<F, E>(&mut self, name: &str, mut func: F)
    where
        F: FnMut(&[Value]) -> Result<Value, E> + 'a,
        E: Into<BoxError>,
    {
        let boxed: NativeFn<'a> =
            Box::new(move |args: &[Value]| func(args).map_err(Into::into));
        match self.functions.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = boxed,
            None => self.functions.push((name.to_string(), boxed)),
        }
    }

    pub fn insert_value<V: Into<Value>>(&mut self, name: &str, value: V) {
        self.values.insert(name.to_string(), value.into());
    }

    fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|(n, _)| n == name)
    }
}

impl fmt::Debug for Namespace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field(
                "functions",
                &self.functions.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field("values", &self.values)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Literal(Value),
    Array(Vec<Expr>),
    Call { func: usize, args: Vec<Expr> },
}

/// An expression parsed and resolved against its namespace, ready to evaluate.
pub struct CompiledExpression<'a> {
    source: String,
    root: Expr,
    namespace: Namespace<'a>,
}

impl<'a> CompiledExpression<'a> {
    pub fn compile(source: &str, namespace: Namespace<'a>) -> Result<Self, BaselineError> {
        let tokens = tokenize(source).map_err(|e| e.into_config_error(source))?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            namespace: &namespace,
            end: source.len(),
        };
        let root = parser
            .parse_expr()
            .and_then(|root| parser.expect_end().map(|()| root))
            .map_err(|e| e.into_config_error(source))?;
        Ok(Self {
            source: source.to_string(),
            root,
            namespace,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&mut self) -> Result<Value, BoxError> {
        eval(&self.root, &mut self.namespace.functions)
    }
}

impl fmt::Debug for CompiledExpression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.source)
            .finish()
    }
}

fn eval(expr: &Expr, functions: &mut [(String, NativeFn<'_>)]) -> Result<Value, BoxError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Array(items) => items
            .iter()
            .map(|item| eval(item, functions))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Call { func, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, functions)?);
            }
            (functions[*func].1)(&values)
        }
    }
}

#[derive(Debug)]
struct ParseError {
    pos: usize,
    message: String,
}

impl ParseError {
    fn new<T: Into<String>>(pos: usize, message: T) -> Self {
        Self {
            pos,
            message: message.into(),
        }
    }

    fn into_config_error(self, source: &str) -> BaselineError {
        BaselineError::configuration(format!(
            "invalid expression `{source}` at byte {}: {}",
            self.pos, self.message
        ))
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Number(Value),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'(' | b')' | b'[' | b']' | b',' => {
                let token = match c {
                    b'(' => Token::LParen,
                    b')' => Token::RParen,
                    b'[' => Token::LBracket,
                    b']' => Token::RBracket,
                    _ => Token::Comma,
                };
                tokens.push((i, token));
                i += 1;
            }
            b'"' | b'\'' => {
                let (text, next) = lex_string(source, i)?;
                tokens.push((i, Token::Str(text)));
                i = next;
            }
            b'-' | b'+' | b'.' | b'0'..=b'9' => {
                let start = i;
                i += 1;
                while i < bytes.len()
                    && matches!(bytes[i], b'0'..=b'9' | b'.' | b'e' | b'E' | b'_')
                    || (i < bytes.len()
                        && matches!(bytes[i], b'-' | b'+')
                        && matches!(bytes[i - 1], b'e' | b'E'))
                {
                    i += 1;
                }
                tokens.push((start, Token::Number(parse_number(&source[start..i], start)?)));
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push((start, Token::Ident(source[start..i].to_string())));
            }
            _ => {
                let ch = source[i..].chars().next().unwrap_or('?');
                return Err(ParseError::new(i, format!("unexpected character '{ch}'")));
            }
        }
    }
    Ok(tokens)
}

fn lex_string(source: &str, start: usize) -> Result<(String, usize), ParseError> {
    let quote = source.as_bytes()[start] as char;
    let mut out = String::new();
    let mut chars = source[start + 1..].char_indices();
    while let Some((offset, ch)) = chars.next() {
        match ch {
            c if c == quote => return Ok((out, start + 1 + offset + c.len_utf8())),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            other => out.push(other),
        }
    }
    Err(ParseError::new(start, "unterminated string literal"))
}

fn parse_number(text: &str, pos: usize) -> Result<Value, ParseError> {
    let cleaned = text.replace('_', "");
    if let Ok(int) = cleaned.parse::<i64>() {
        return Ok(Value::from(int));
    }
    cleaned
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| ParseError::new(pos, format!("invalid number '{text}'")))
}

struct Parser<'t, 'n, 'a> {
    tokens: &'t [(usize, Token)],
    pos: usize,
    namespace: &'n Namespace<'a>,
    end: usize,
}

impl Parser<'_, '_, '_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(o, _)| *o).unwrap_or(self.end)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(ParseError::new(
                self.offset(),
                format!("unexpected {token:?} after expression"),
            )),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let Some((pos, token)) = self.next() else {
            return Err(ParseError::new(self.end, "expected an expression"));
        };
        match token {
            Token::Number(value) => Ok(Expr::Literal(value)),
            Token::Str(text) => Ok(Expr::Literal(Value::String(text))),
            Token::LBracket => self.parse_list(Token::RBracket).map(Expr::Array),
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let func = self.namespace.function_index(&name).ok_or_else(|| {
                        ParseError::new(pos, format!("unknown function '{name}'"))
                    })?;
                    let args = self.parse_list(Token::RParen)?;
                    return Ok(Expr::Call { func, args });
                }
                match name.as_str() {
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    "null" => Ok(Expr::Literal(Value::Null)),
                    _ => self
                        .namespace
                        .values
                        .get(&name)
                        .map(|v| Expr::Literal(v.clone()))
                        .ok_or_else(|| ParseError::new(pos, format!("unknown name '{name}'"))),
                }
            }
            other => Err(ParseError::new(pos, format!("unexpected {other:?}"))),
        }
    }

    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.peek() == Some(&close) {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(self.parse_expr()?);
            match self.next() {
                Some((_, Token::Comma)) => continue,
                Some((_, token)) if token == close => return Ok(items),
                Some((pos, token)) => {
                    return Err(ParseError::new(
                        pos,
                        format!("expected ',' or {close:?}, found {token:?}"),
                    ));
                }
                None => return Err(ParseError::new(self.end, format!("missing {close:?}"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn arith<'a>() -> Namespace<'a> {
        Namespace::new()
            .with_function("add", |args: &[Value]| -> Result<Value, BoxError> {
                let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
                Ok(json!(sum))
            })
            .with_value("base", 40)
    }

    #[test]
    fn test_tokenize_call() {
        let tokens = tokenize("add(2, -3.5)").unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|(_, t)| t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Ident("add".into()),
                Token::LParen,
                Token::Number(json!(2)),
                Token::Comma,
                Token::Number(json!(-3.5)),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r#""a\"b" 'c'"#).unwrap();
        assert_eq!(tokens[0].1, Token::Str("a\"b".into()));
        assert_eq!(tokens[1].1, Token::Str("c".into()));
    }

    #[test]
    fn test_nested_call_evaluates() {
        let mut expr = CompiledExpression::compile("add(add(1, 1), base)", arith()).unwrap();
        assert_eq!(expr.evaluate().unwrap(), json!(42));
    }

    #[test]
    fn test_array_and_keywords() {
        let mut expr =
            CompiledExpression::compile("[true, null, 'x', 1e3]", Namespace::new()).unwrap();
        assert_eq!(expr.evaluate().unwrap(), json!([true, null, "x", 1000.0]));
    }

    #[test]
    fn test_unknown_function_reports_offset() {
        let err = CompiledExpression::compile("add(mul(2, 3), 1)", arith()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unknown function 'mul'"), "{msg}");
        assert!(msg.contains("at byte 4"), "{msg}");
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(CompiledExpression::compile("add(1, 2) 3", arith()).is_err());
        assert!(CompiledExpression::compile("add(1, 2", arith()).is_err());
        assert!(CompiledExpression::compile("", arith()).is_err());
    }
}
