// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! String values for the expression sandbox.
//!
//! JavaScript strings are sequences of UTF-16 code units, not Unicode
//! scalar values: a conformance fixture may legally produce a lone
//! surrogate (`"\uD800"`), which no Rust [`String`] can hold. [`JsString`]
//! therefore stores raw code units and only converts to host text at the
//! comparison boundary, where both runtimes substitute U+FFFD for
//! unpaired surrogates anyway.

use std::fmt;

/// A JavaScript string value: a sequence of UTF-16 code units.
///
/// Unlike [`String`], this can represent unpaired surrogates, which is
/// required for the encoding edge cases the harness exists to check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsString {
    units: Vec<u16>,
}

impl JsString {
    /// Creates an empty string.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a string from well-formed host text.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            units: text.encode_utf16().collect(),
        }
    }

    /// Creates a string from raw code units, surrogate-paired or not.
    #[must_use]
    pub fn from_units(units: Vec<u16>) -> Self {
        Self { units }
    }

    /// Appends a single code unit.
    pub fn push_unit(&mut self, unit: u16) {
        self.units.push(unit);
    }

    /// Appends a Unicode scalar value, encoding it as one or two units.
    pub fn push_char(&mut self, c: char) {
        let mut buf = [0u16; 2];
        self.units.extend_from_slice(c.encode_utf16(&mut buf));
    }

    /// Appends another string's code units.
    pub fn push_str(&mut self, other: &JsString) {
        self.units.extend_from_slice(&other.units);
    }

    /// Returns the concatenation of `self` and `other`.
    #[must_use]
    pub fn concat(&self, other: &JsString) -> JsString {
        let mut units = Vec::with_capacity(self.units.len() + other.units.len());
        units.extend_from_slice(&self.units);
        units.extend_from_slice(&other.units);
        Self { units }
    }

    /// Returns `self` repeated `count` times, matching `String.prototype.repeat`.
    #[must_use]
    pub fn repeat(&self, count: usize) -> JsString {
        Self {
            units: self.units.repeat(count),
        }
    }

    /// The raw code units.
    #[must_use]
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Number of code units (the JavaScript `.length`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the string is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Converts to host text, replacing unpaired surrogates with U+FFFD.
    ///
    /// This matches what both runtimes do when printing to stdout, so the
    /// lossy conversion is exactly the comparison the oracle needs.
    #[must_use]
    pub fn to_text_lossy(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }

    /// Renders the value as a JavaScript double-quoted string literal.
    ///
    /// Everything outside printable ASCII is escaped as `\uXXXX` (unpaired
    /// surrogates included), so the emitted literal is pure ASCII and both
    /// runtimes must decode it to exactly these code units.
    #[must_use]
    pub fn to_source_literal(&self) -> String {
        let mut out = String::with_capacity(self.units.len() + 2);
        out.push('"');
        for &unit in &self.units {
            match unit {
                0x22 => out.push_str("\\\""),
                0x5C => out.push_str("\\\\"),
                0x0A => out.push_str("\\n"),
                0x0D => out.push_str("\\r"),
                0x09 => out.push_str("\\t"),
                0x20..=0x7E => out.push(unit as u8 as char),
                _ => {
                    out.push_str(&format!("\\u{unit:04X}"));
                }
            }
        }
        out.push('"');
        out
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text_lossy())
    }
}

impl From<&str> for JsString {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_round_trips_ascii() {
        let s = JsString::from_text("abc");
        assert_eq!(s.len(), 3);
        assert_eq!(s.to_text_lossy(), "abc");
    }

    #[test]
    fn lone_surrogate_is_representable() {
        let s = JsString::from_units(vec![0xD800]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.to_text_lossy(), "\u{FFFD}");
    }

    #[test]
    fn surrogate_pair_decodes() {
        // U+1F600 as a surrogate pair
        let s = JsString::from_units(vec![0xD83D, 0xDE00]);
        assert_eq!(s.to_text_lossy(), "\u{1F600}");
    }

    #[test]
    fn repeat_matches_js_semantics() {
        let s = JsString::from_text("ab");
        assert_eq!(s.repeat(3).to_text_lossy(), "ababab");
        assert_eq!(s.repeat(0).to_text_lossy(), "");
    }

    #[test]
    fn concat_preserves_units() {
        let a = JsString::from_units(vec![0xD800]);
        let b = JsString::from_text("x");
        let joined = a.concat(&b);
        assert_eq!(joined.units(), &[0xD800, 0x78]);
    }

    #[test]
    fn source_literal_escapes_specials() {
        let s = JsString::from_text("a\"b\\c\nd");
        assert_eq!(s.to_source_literal(), r#""a\"b\\c\nd""#);
    }

    #[test]
    fn source_literal_escapes_lone_surrogate() {
        let s = JsString::from_units(vec![0x61, 0xD800]);
        assert_eq!(s.to_source_literal(), r#""a\uD800""#);
    }

    #[test]
    fn source_literal_escapes_non_ascii() {
        let s = JsString::from_text("\u{00E9}");
        assert_eq!(s.to_source_literal(), "\"\\u00E9\"");
    }
}
