// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Parser for the expression sandbox.
//!
//! The grammar is the tiny subset of JavaScript that conformance fixtures
//! actually use to author payloads programmatically:
//!
//! ```text
//! expr     := term ('+' term)*
//! term     := primary ('.' ident '(' args ')')*
//! primary  := string | number | '(' expr ')' | 'String' '.' 'fromCharCode' '(' args ')'
//! args     := (expr (',' expr)*)?
//! ```
//!
//! Anything outside this subset is rejected, which is the sandbox's whole
//! point: fixtures never get ambient host capabilities.

use super::lexer::Token;
use super::value::JsString;
use super::EvalError;

/// A parsed sandbox expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A string literal.
    Str(JsString),
    /// An integer literal.
    Number(i64),
    /// `lhs + rhs` (string concatenation or integer addition).
    Concat(Box<Expr>, Box<Expr>),
    /// `target.repeat(count)`.
    Repeat {
        /// The string being repeated.
        target: Box<Expr>,
        /// The repetition count.
        count: Box<Expr>,
    },
    /// `String.fromCharCode(args...)` — builds a string from raw code units.
    FromCharCode(Vec<Expr>),
}

/// Parses a token stream into a single expression.
///
/// # Errors
///
/// Returns [`EvalError`] if the tokens are not exactly one expression from
/// the sandbox grammar (trailing tokens included).
pub fn parse(tokens: Vec<Token>) -> Result<Expr, EvalError> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    if let Some(extra) = parser.peek() {
        return Err(EvalError::UnexpectedToken(format!("{extra:?}")));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, EvalError> {
        let token = self.tokens.get(self.pos).cloned().ok_or(EvalError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> Result<(), EvalError> {
        let token = self.next()?;
        if &token == expected {
            Ok(())
        } else {
            Err(EvalError::UnexpectedToken(format!("{token:?}")))
        }
    }

    fn expression(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.term()?;
        while matches!(self.peek(), Some(Token::Plus)) {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Concat(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        while matches!(self.peek(), Some(Token::Dot)) {
            self.pos += 1;
            let method = match self.next()? {
                Token::Ident(name) => name,
                other => return Err(EvalError::UnexpectedToken(format!("{other:?}"))),
            };
            let args = self.call_args()?;
            expr = match method.as_str() {
                "repeat" => {
                    let mut args = args.into_iter();
                    match (args.next(), args.next()) {
                        (Some(count), None) => Expr::Repeat {
                            target: Box::new(expr),
                            count: Box::new(count),
                        },
                        _ => {
                            return Err(EvalError::WrongArgumentCount {
                                method,
                                expected: 1,
                            })
                        }
                    }
                }
                _ => return Err(EvalError::UnknownMethod(method)),
            };
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.next()? {
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) if name == "String" => {
                self.expect(&Token::Dot)?;
                match self.next()? {
                    Token::Ident(method) if method == "fromCharCode" => {
                        Ok(Expr::FromCharCode(self.call_args()?))
                    }
                    other => Err(EvalError::UnexpectedToken(format!("{other:?}"))),
                }
            }
            Token::Ident(name) => Err(EvalError::UnknownIdentifier(name)),
            other => Err(EvalError::UnexpectedToken(format!("{other:?}"))),
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>, EvalError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.next()? {
                Token::Comma => {}
                Token::RParen => return Ok(args),
                other => return Err(EvalError::UnexpectedToken(format!("{other:?}"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;

    fn parse_str(source: &str) -> Result<Expr, EvalError> {
        parse(tokenize(source)?)
    }

    #[test]
    fn bare_string() {
        let expr = parse_str(r#""abc""#).unwrap();
        assert_eq!(expr, Expr::Str(JsString::from_text("abc")));
    }

    #[test]
    fn concatenation_is_left_associative() {
        let expr = parse_str(r#""a" + "b" + "c""#).unwrap();
        let Expr::Concat(lhs, rhs) = expr else {
            panic!("expected concat");
        };
        assert!(matches!(*lhs, Expr::Concat(..)));
        assert_eq!(*rhs, Expr::Str(JsString::from_text("c")));
    }

    #[test]
    fn repeat_call() {
        let expr = parse_str(r#""ab".repeat(3)"#).unwrap();
        assert!(matches!(expr, Expr::Repeat { .. }));
    }

    #[test]
    fn chained_repeat() {
        let expr = parse_str(r#""a".repeat(2).repeat(3)"#).unwrap();
        let Expr::Repeat { target, .. } = expr else {
            panic!("expected repeat");
        };
        assert!(matches!(*target, Expr::Repeat { .. }));
    }

    #[test]
    fn from_char_code() {
        let expr = parse_str("String.fromCharCode(0xD800, 97)").unwrap();
        assert_eq!(
            expr,
            Expr::FromCharCode(vec![Expr::Number(0xD800), Expr::Number(97)])
        );
    }

    #[test]
    fn parenthesized() {
        let expr = parse_str(r#"("a" + "b").repeat(2)"#).unwrap();
        assert!(matches!(expr, Expr::Repeat { .. }));
    }

    #[test]
    fn unknown_method_rejected() {
        assert!(matches!(
            parse_str(r#""a".padStart(3)"#),
            Err(EvalError::UnknownMethod(name)) if name == "padStart"
        ));
    }

    #[test]
    fn unknown_identifier_rejected() {
        assert!(matches!(
            parse_str("process"),
            Err(EvalError::UnknownIdentifier(name)) if name == "process"
        ));
    }

    #[test]
    fn mismatched_parens_rejected() {
        assert!(parse_str(")(").is_err());
    }

    #[test]
    fn trailing_tokens_rejected() {
        assert!(matches!(
            parse_str(r#""a" "b""#),
            Err(EvalError::UnexpectedToken(_))
        ));
    }

    #[test]
    fn empty_input_rejected() {
        assert!(matches!(parse_str(""), Err(EvalError::UnexpectedEnd)));
    }
}
