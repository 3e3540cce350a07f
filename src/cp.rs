//! Code point helpers shared by every layer.
//!
//! Labels, entries and variants are all plain `u32` slices. These helpers
//! convert between that form, display strings (`0061 0300`) and `&str`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{LgrError, Result};

/// Highest valid Unicode scalar value.
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

/// Surrogate block, never a scalar value.
pub const SURROGATE_FIRST: u32 = 0xD800;
pub const SURROGATE_LAST: u32 = 0xDFFF;

/// Protocol ceiling on label length (in code points).
pub const MAX_LABEL_LENGTH: usize = 63;

/// Accepts `0061`, `U+0061`, `u+61`.
static CP_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[Uu]\+)?([0-9A-Fa-f]{1,6})$").unwrap());

/// Format one code point as `U+0061`.
pub fn format_cp(cp: u32) -> String {
    format!("U+{cp:04X}")
}

/// Format a code point sequence as space separated hex, e.g. `0061 0300`.
pub fn format_cps(cps: &[u32]) -> String {
    let parts: Vec<String> = cps.iter().map(|cp| format!("{cp:04X}")).collect();
    parts.join(" ")
}

/// Parse a single code point token.
pub fn parse_cp(token: &str) -> Result<u32> {
    let caps = CP_TOKEN
        .captures(token.trim())
        .ok_or_else(|| LgrError::MalformedCodePoint(token.to_string()))?;
    let value = u32::from_str_radix(&caps[1], 16)
        .map_err(|_| LgrError::MalformedCodePoint(token.to_string()))?;
    if value > MAX_CODE_POINT {
        return Err(LgrError::MalformedCodePoint(token.to_string()));
    }
    Ok(value)
}

/// Parse a whitespace separated code point sequence.
///
/// Empty input is rejected: every entry, variant and label has at least one
/// code point.
pub fn parse_cps(text: &str) -> Result<Vec<u32>> {
    let cps = text
        .split_whitespace()
        .map(parse_cp)
        .collect::<Result<Vec<u32>>>()?;
    if cps.is_empty() {
        return Err(LgrError::EmptyCodePoints);
    }
    Ok(cps)
}

/// Code points of a Rust string. Never fails since `char` is a scalar value.
pub fn label_from_str(label: &str) -> Vec<u32> {
    label.chars().map(u32::from).collect()
}

/// Render code points as a `String` for the pattern engine.
///
/// Surrogates and out of range values map to U+FFFD so char indices stay
/// aligned with positions in the label.
pub fn cps_to_string(cps: &[u32]) -> String {
    cps.iter()
        .map(|&cp| char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// True when `cp` is a surrogate or beyond the Unicode range.
pub fn is_invalid_scalar(cp: u32) -> bool {
    char::from_u32(cp).is_none()
}

/// Reject empty input and values that are not code points.
pub fn check_cps(cps: &[u32]) -> Result<()> {
    if cps.is_empty() {
        return Err(LgrError::EmptyCodePoints);
    }
    if let Some(&bad) = cps.iter().find(|&&cp| cp > MAX_CODE_POINT) {
        return Err(LgrError::MalformedCodePoint(format!("{bad:X}")));
    }
    Ok(())
}
