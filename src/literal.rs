//! Argument decoders for the text and variable-width opcodes.
//!
//! Everything here is a pure function from argument bytes to a value, so the
//! interpreter only has to read the argument and push the result.

use num_bigint::BigInt;

use crate::error::DecodeError;
use crate::opcodes::{FLOAT, GET, INT, LONG, PUT, STRING, UNICODE};
use crate::types::Value;

fn line_text(opcode: u8, line: &[u8]) -> Result<&str, DecodeError> {
    std::str::from_utf8(line)
        .map(str::trim)
        .map_err(|_| DecodeError::malformed(opcode, "argument is not valid text"))
}

fn check_digits(what: &'static str, s: &str, max_digits: usize) -> Result<(), DecodeError> {
    if s.len() > max_digits {
        return Err(DecodeError::LimitExceeded { what, limit: max_digits });
    }
    Ok(())
}

/// INT argument. `00`/`01` are the legacy spellings of False/True.
pub fn parse_int_line(line: &[u8], max_digits: usize) -> Result<Value, DecodeError> {
    let s = line_text(INT, line)?;
    match s {
        "00" => return Ok(Value::Bool(false)),
        "01" => return Ok(Value::Bool(true)),
        _ => {}
    }
    check_digits("INT literal", s, max_digits)?;
    if let Ok(i) = s.parse::<i64>() {
        return Ok(Value::Int(i));
    }
    // Protocol 0 writes machine-word ints with INT; wider producers overflow i64.
    s.parse::<BigInt>()
        .map(Value::BigInt)
        .map_err(|_| DecodeError::malformed(INT, format!("{s:?} is not an integer")))
}

/// LONG argument: decimal digits, usually followed by the `L` suffix.
pub fn parse_long_line(line: &[u8], max_digits: usize) -> Result<BigInt, DecodeError> {
    let s = line_text(LONG, line)?;
    let s = s.strip_suffix('L').unwrap_or(s);
    check_digits("LONG literal", s, max_digits)?;
    s.parse::<BigInt>()
        .map_err(|_| DecodeError::malformed(LONG, format!("{s:?} is not an integer")))
}

/// LONG1/LONG4 payload: little-endian two's complement of any width.
/// An empty payload is zero.
pub fn decode_long_bytes(bytes: &[u8]) -> BigInt {
    BigInt::from_signed_bytes_le(bytes)
}

pub fn parse_float_line(line: &[u8]) -> Result<f64, DecodeError> {
    let s = line_text(FLOAT, line)?;
    s.parse::<f64>()
        .map_err(|_| DecodeError::malformed(FLOAT, format!("{s:?} is not a float")))
}

/// Decimal memo index for GET/PUT.
pub fn parse_memo_index(opcode: u8, line: &[u8]) -> Result<usize, DecodeError> {
    debug_assert!(opcode == GET || opcode == PUT);
    let s = line_text(opcode, line)?;
    s.parse::<usize>()
        .map_err(|_| DecodeError::malformed(opcode, format!("{s:?} is not a memo index")))
}

fn hex_digit(b: u8) -> Option<u32> {
    (b as char).to_digit(16)
}

fn parse_hex(opcode: u8, digits: &[u8]) -> Result<u32, DecodeError> {
    digits.iter().try_fold(0u32, |acc, &b| {
        hex_digit(b)
            .map(|d| acc << 4 | d)
            .ok_or_else(|| DecodeError::malformed(opcode, "bad hex digit in escape"))
    })
}

/// STRING argument: a quoted literal as produced by `repr()`, decoded to raw bytes.
///
/// Either quote character may delimit the literal. Recognized escapes are
/// `\xNN`, `\n`, `\r`, `\t`, `\\`, `\'` and `\"`; anything else is rejected.
pub fn unquote_string(line: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let s = line.trim_ascii();
    let inner = match s {
        [q @ (b'\'' | b'"'), inner @ .., last] if last == q => inner,
        _ => {
            return Err(DecodeError::malformed(
                STRING,
                "argument must be enclosed in matching quotes",
            ))
        }
    };

    let mut out = Vec::with_capacity(inner.len());
    let mut iter = inner.iter().copied();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let esc = iter
            .next()
            .ok_or_else(|| DecodeError::malformed(STRING, "trailing backslash"))?;
        let decoded = match esc {
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'\\' | b'\'' | b'"' => esc,
            b'x' => {
                let hi = iter.next().and_then(hex_digit);
                let lo = iter.next().and_then(hex_digit);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => (hi << 4 | lo) as u8,
                    _ => return Err(DecodeError::malformed(STRING, "\\x needs two hex digits")),
                }
            }
            other => {
                return Err(DecodeError::malformed(
                    STRING,
                    format!("unsupported escape \\{}", other.escape_ascii()),
                ))
            }
        };
        out.push(decoded);
    }
    Ok(out)
}

/// UNICODE argument in raw-unicode-escape form.
///
/// `\uXXXX` and `\UXXXXXXXX` are escapes only after an odd run of
/// backslashes; every other byte is a Latin-1 code point. A UTF-16 surrogate
/// pair written as two `\u` escapes is combined into one character.
pub fn decode_raw_unicode_escape(line: &[u8]) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < line.len() {
        if line[i] != b'\\' {
            out.push(line[i] as char);
            i += 1;
            continue;
        }

        let run = line[i..].iter().take_while(|&&b| b == b'\\').count();
        let next = line.get(i + run).copied();
        if run % 2 == 0 || !matches!(next, Some(b'u' | b'U')) {
            out.extend(std::iter::repeat('\\').take(run));
            i += run;
            continue;
        }
        out.extend(std::iter::repeat('\\').take(run - 1));
        i += run;

        let (mut cp, used) = read_unicode_escape(&line[i..])?;
        i += used;
        if (0xD800..0xDC00).contains(&cp) {
            if line.get(i..i + 2) == Some(&b"\\u"[..]) {
                if let Ok((lo, used)) = read_unicode_escape(&line[i + 1..]) {
                    if (0xDC00..0xE000).contains(&lo) {
                        cp = 0x10000 + ((cp - 0xD800) << 10) + (lo - 0xDC00);
                        i += 1 + used;
                    }
                }
            }
        }
        let ch = char::from_u32(cp).ok_or_else(|| {
            DecodeError::malformed(UNICODE, format!("invalid code point U+{cp:04X}"))
        })?;
        out.push(ch);
    }
    Ok(out)
}

/// Parse `uXXXX` or `UXXXXXXXX` at the start of `rest`; returns the code
/// point and the number of bytes consumed.
fn read_unicode_escape(rest: &[u8]) -> Result<(u32, usize), DecodeError> {
    let width = if rest.first() == Some(&b'u') { 4 } else { 8 };
    let digits = rest
        .get(1..1 + width)
        .ok_or_else(|| DecodeError::malformed(UNICODE, "truncated \\u escape"))?;
    Ok((parse_hex(UNICODE, digits)?, 1 + width))
}
