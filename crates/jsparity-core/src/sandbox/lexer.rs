// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Tokenizer for the expression sandbox.
//!
//! Hand-written over [`Peekable<CharIndices>`] for exact control of escape
//! sequence decoding. String literals follow JavaScript semantics: `\xNN`
//! and `\uNNNN` produce raw UTF-16 code units (lone surrogates included),
//! `\u{...}` produces a code point, and an unrecognized escape is the
//! escaped character itself.

use std::iter::Peekable;
use std::str::CharIndices;

use ecow::EcoString;

use super::value::JsString;
use super::EvalError;

/// A token in the sandbox expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A decoded string literal.
    Str(JsString),
    /// An integer literal (decimal or `0x` hex).
    Number(i64),
    /// An identifier such as `String` or `repeat`.
    Ident(EcoString),
    /// `+`
    Plus,
    /// `.`
    Dot,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
}

/// Tokenizes a sandbox expression.
///
/// # Errors
///
/// Returns [`EvalError`] for unterminated strings, malformed escapes or
/// number literals, and characters outside the expression grammar. The
/// sandbox never panics on malformed input; a rejected payload is a
/// legitimate signal for error-expected cases.
pub fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
    let mut lexer = Lexer {
        chars: source.char_indices().peekable(),
    };
    lexer.run()
}

struct Lexer<'src> {
    chars: Peekable<CharIndices<'src>>,
}

impl Lexer<'_> {
    fn run(&mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.chars.next();
                }
                '"' | '\'' => tokens.push(Token::Str(self.lex_string(c)?)),
                '0'..='9' => tokens.push(Token::Number(self.lex_number()?)),
                '+' => {
                    self.chars.next();
                    tokens.push(Token::Plus);
                }
                '.' => {
                    self.chars.next();
                    tokens.push(Token::Dot);
                }
                '(' => {
                    self.chars.next();
                    tokens.push(Token::LParen);
                }
                ')' => {
                    self.chars.next();
                    tokens.push(Token::RParen);
                }
                ',' => {
                    self.chars.next();
                    tokens.push(Token::Comma);
                }
                c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                    tokens.push(Token::Ident(self.lex_ident()));
                }
                other => return Err(EvalError::UnexpectedCharacter(other)),
            }
        }
        Ok(tokens)
    }

    fn lex_ident(&mut self) -> EcoString {
        let mut name = EcoString::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        name
    }

    fn lex_number(&mut self) -> Result<i64, EvalError> {
        let mut digits = String::new();
        let (_, first) = self.chars.next().unwrap_or((0, '0'));
        digits.push(first);

        let hex = first == '0' && matches!(self.chars.peek(), Some(&(_, 'x' | 'X')));
        if hex {
            self.chars.next();
            digits.clear();
            while let Some(&(_, c)) = self.chars.peek() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                    self.chars.next();
                } else {
                    break;
                }
            }
            return i64::from_str_radix(&digits, 16).map_err(|_| EvalError::InvalidNumber);
        }

        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        digits.parse().map_err(|_| EvalError::InvalidNumber)
    }

    /// Lexes a string literal, decoding escapes into UTF-16 code units.
    fn lex_string(&mut self, quote: char) -> Result<JsString, EvalError> {
        self.chars.next(); // opening quote
        let mut value = JsString::new();
        loop {
            let Some((_, c)) = self.chars.next() else {
                return Err(EvalError::UnterminatedString);
            };
            match c {
                c if c == quote => return Ok(value),
                // Raw newlines are illegal inside a JS string literal.
                '\n' | '\r' => return Err(EvalError::UnterminatedString),
                '\\' => self.lex_escape(&mut value)?,
                c => value.push_char(c),
            }
        }
    }

    fn lex_escape(&mut self, value: &mut JsString) -> Result<(), EvalError> {
        let Some((_, c)) = self.chars.next() else {
            return Err(EvalError::UnterminatedString);
        };
        match c {
            'n' => value.push_unit(0x0A),
            't' => value.push_unit(0x09),
            'r' => value.push_unit(0x0D),
            'b' => value.push_unit(0x08),
            'f' => value.push_unit(0x0C),
            'v' => value.push_unit(0x0B),
            '0' => value.push_unit(0x00),
            'x' => {
                let unit = self.hex_digits(2)?;
                value.push_unit(unit as u16);
            }
            'u' => {
                if matches!(self.chars.peek(), Some(&(_, '{'))) {
                    self.chars.next();
                    let cp = self.braced_code_point()?;
                    push_code_point(value, cp);
                } else {
                    let unit = self.hex_digits(4)?;
                    value.push_unit(unit as u16);
                }
            }
            // Line continuation: backslash-newline produces nothing.
            '\n' => {}
            '\r' => {
                if matches!(self.chars.peek(), Some(&(_, '\n'))) {
                    self.chars.next();
                }
            }
            // Identity escape: '\a' is 'a'.
            other => value.push_char(other),
        }
        Ok(())
    }

    /// Reads exactly `count` hex digits.
    fn hex_digits(&mut self, count: u32) -> Result<u32, EvalError> {
        let mut result = 0u32;
        for _ in 0..count {
            let Some((_, c)) = self.chars.next() else {
                return Err(EvalError::UnterminatedString);
            };
            let digit = c.to_digit(16).ok_or(EvalError::InvalidEscape(c))?;
            result = result * 16 + digit;
        }
        Ok(result)
    }

    /// Reads a `\u{...}` code point up to the closing brace.
    fn braced_code_point(&mut self) -> Result<u32, EvalError> {
        let mut result: u32 = 0;
        let mut digits = 0;
        loop {
            let Some((_, c)) = self.chars.next() else {
                return Err(EvalError::UnterminatedString);
            };
            if c == '}' {
                if digits == 0 {
                    return Err(EvalError::InvalidEscape(c));
                }
                if result > 0x0010_FFFF {
                    return Err(EvalError::InvalidCodePoint(result));
                }
                return Ok(result);
            }
            let digit = c.to_digit(16).ok_or(EvalError::InvalidEscape(c))?;
            result = result.saturating_mul(16).saturating_add(digit);
            digits += 1;
        }
    }
}

/// Appends a code point as one code unit or a surrogate pair.
///
/// `\u{D800}` is legal JavaScript and yields a lone surrogate, so values
/// in the surrogate range are pushed through as-is.
fn push_code_point(value: &mut JsString, cp: u32) {
    if cp <= 0xFFFF {
        value.push_unit(cp as u16);
    } else {
        let offset = cp - 0x1_0000;
        value.push_unit(0xD800 + (offset >> 10) as u16);
        value.push_unit(0xDC00 + (offset & 0x3FF) as u16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_one_string(source: &str) -> JsString {
        match tokenize(source).unwrap().as_slice() {
            [Token::Str(s)] => s.clone(),
            other => panic!("expected one string token, got {other:?}"),
        }
    }

    #[test]
    fn simple_double_quoted() {
        assert_eq!(lex_one_string(r#""abc""#).to_text_lossy(), "abc");
    }

    #[test]
    fn simple_single_quoted() {
        assert_eq!(lex_one_string("'abc'").to_text_lossy(), "abc");
    }

    #[test]
    fn common_escapes() {
        assert_eq!(lex_one_string(r#""a\n\t\\\"b""#).to_text_lossy(), "a\n\t\\\"b");
    }

    #[test]
    fn identity_escape() {
        assert_eq!(lex_one_string(r#""\a\q""#).to_text_lossy(), "aq");
    }

    #[test]
    fn hex_escape() {
        assert_eq!(lex_one_string(r#""\x41\x42""#).to_text_lossy(), "AB");
    }

    #[test]
    fn unicode_escape_four_digits() {
        assert_eq!(lex_one_string("\"\\u0041\"").to_text_lossy(), "A");
    }

    #[test]
    fn lone_surrogate_escape() {
        let s = lex_one_string(r#""\uD800""#);
        assert_eq!(s.units(), &[0xD800]);
    }

    #[test]
    fn braced_code_point_above_bmp() {
        let s = lex_one_string(r#""\u{1F600}""#);
        assert_eq!(s.units(), &[0xD83D, 0xDE00]);
    }

    #[test]
    fn braced_surrogate_stays_lone() {
        let s = lex_one_string(r#""\u{D800}""#);
        assert_eq!(s.units(), &[0xD800]);
    }

    #[test]
    fn code_point_out_of_range() {
        assert!(matches!(
            tokenize(r#""\u{110000}""#),
            Err(EvalError::InvalidCodePoint(0x11_0000))
        ));
    }

    #[test]
    fn unterminated_string() {
        assert!(matches!(
            tokenize(r#""abc"#),
            Err(EvalError::UnterminatedString)
        ));
    }

    #[test]
    fn raw_newline_rejected() {
        assert!(matches!(
            tokenize("\"a\nb\""),
            Err(EvalError::UnterminatedString)
        ));
    }

    #[test]
    fn line_continuation_produces_nothing() {
        assert_eq!(lex_one_string("\"a\\\nb\"").to_text_lossy(), "ab");
    }

    #[test]
    fn numbers_and_punctuation() {
        let tokens = tokenize("\"a\".repeat(20000)").unwrap();
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[1], Token::Dot);
        assert_eq!(tokens[2], Token::Ident("repeat".into()));
        assert_eq!(tokens[4], Token::Number(20000));
    }

    #[test]
    fn hex_number() {
        let tokens = tokenize("0xD800").unwrap();
        assert_eq!(tokens, vec![Token::Number(0xD800)]);
    }

    #[test]
    fn unexpected_character() {
        assert!(matches!(
            tokenize("@"),
            Err(EvalError::UnexpectedCharacter('@'))
        ));
    }
}
