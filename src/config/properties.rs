//! Parser for `.properties` text.
//!
//! Supports the line-oriented `key=value` format used by JVM services:
//! `#`/`!` comments, `=`/`:`/whitespace separators, backslash line
//! continuation and the `\t \n \r \f \uXXXX` escapes. The same parser reads
//! static `application.properties` files and secret payloads.

use super::types::PropertyBag;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PropertiesError {
    #[error("malformed \\uxxxx escape on line {line}")]
    MalformedUnicodeEscape { line: usize },

    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Parse a raw byte payload. The bytes must be UTF-8.
///
/// Unlike `java.util.Properties.load(InputStream)`, which decodes ISO-8859-1
/// and accepts any byte sequence, non-UTF-8 input is rejected with
/// [`PropertiesError::InvalidUtf8`]. Non-ASCII text in a payload is expected
/// as UTF-8 or as `\uXXXX` escapes.
pub fn parse_properties_bytes(
    bytes: &[u8],
    origin: &str,
) -> Result<PropertyBag, PropertiesError> {
    let text = std::str::from_utf8(bytes)?;
    parse_properties(text, origin)
}

/// Parse properties text into a bag tagged with `origin`.
///
/// Duplicate keys keep the last value.
pub fn parse_properties(text: &str, origin: &str) -> Result<PropertyBag, PropertiesError> {
    let mut bag = PropertyBag::new(origin);
    for logical in logical_lines(text) {
        let (raw_key, raw_value) = split_entry(&logical.text);
        let key = unescape(raw_key, logical.line)?;
        let value = unescape(raw_value, logical.line)?;
        bag.insert(key, value);
    }
    Ok(bag)
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

struct LogicalLine {
    text: String,
    /// 1-based number of the first physical line.
    line: usize,
}

fn physical_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                start = i + 1;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < bytes.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn ends_with_odd_backslashes(s: &str) -> bool {
    s.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn logical_lines(text: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut lines = physical_lines(text).into_iter().enumerate();

    while let Some((idx, raw)) = lines.next() {
        let line = raw.trim_start_matches(is_blank);
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let mut buf = line.to_string();
        while ends_with_odd_backslashes(&buf) {
            buf.pop();
            match lines.next() {
                Some((_, next)) => buf.push_str(next.trim_start_matches(is_blank)),
                None => break,
            }
        }

        out.push(LogicalLine {
            text: buf,
            line: idx + 1,
        });
    }

    out
}

/// Split a logical line into its raw (still escaped) key and value.
fn split_entry(line: &str) -> (&str, &str) {
    let mut key_end = line.len();
    let mut value_start = line.len();
    let mut has_separator = false;
    let mut preceding_backslash = false;

    for (i, c) in line.char_indices() {
        if !preceding_backslash {
            if c == '=' || c == ':' {
                key_end = i;
                value_start = i + 1;
                has_separator = true;
                break;
            }
            if is_blank(c) {
                key_end = i;
                value_start = i + c.len_utf8();
                break;
            }
        }
        preceding_backslash = c == '\\' && !preceding_backslash;
    }

    let rest = &line[value_start..];
    let mut offset = rest.len();
    for (i, c) in rest.char_indices() {
        if is_blank(c) {
            continue;
        }
        if !has_separator && (c == '=' || c == ':') {
            has_separator = true;
            continue;
        }
        offset = i;
        break;
    }

    (&line[..key_end], &rest[offset..])
}

fn read_unicode_escape(
    chars: &mut std::str::Chars<'_>,
    line: usize,
) -> Result<u16, PropertiesError> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.chars().count() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PropertiesError::MalformedUnicodeEscape { line });
    }
    u16::from_str_radix(&hex, 16).map_err(|_| PropertiesError::MalformedUnicodeEscape { line })
}

fn unescape(raw: &str, line: usize) -> Result<String, PropertiesError> {
    let mut out = String::with_capacity(raw.len());
    let mut units: Vec<u16> = Vec::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('u') => {
                    units.push(read_unicode_escape(&mut chars, line)?);
                    continue;
                }
                Some(escaped) => {
                    flush_utf16(&mut units, &mut out);
                    out.push(match escaped {
                        't' => '\t',
                        'n' => '\n',
                        'r' => '\r',
                        'f' => '\x0c',
                        other => other,
                    });
                }
                None => flush_utf16(&mut units, &mut out),
            }
        } else {
            flush_utf16(&mut units, &mut out);
            out.push(c);
        }
    }
    flush_utf16(&mut units, &mut out);

    Ok(out)
}

/// Decode buffered `\uXXXX` code units, so surrogate pairs become one char.
fn flush_utf16(units: &mut Vec<u16>, out: &mut String) {
    if units.is_empty() {
        return;
    }
    out.extend(
        char::decode_utf16(units.drain(..)).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}

// ============================================================================
// Tests
// ============================================================================
