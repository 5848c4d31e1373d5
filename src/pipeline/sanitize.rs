//! Sanitising raw model output before it is parsed as JSON.
//!
//! Even when told to "return ONLY valid JSON", models regularly:
//!
//! - wrap the object in ` ```json ... ``` ` fences,
//! - prepend a sentence such as "Here is the updated extraction:",
//! - emit a BOM or zero-width characters copied from the PDF text layer,
//! - put raw newlines and tabs inside string values (invalid JSON).
//!
//! Each rule below is a pure `&str → String` pass; [`clean_json`] runs them
//! in order. Fence stripping must come first so the object search does not
//! trip over backticks, and control characters are escaped before the first
//! JSON value is cut out so that value can be parsed.

use crate::record::ExtractionRecord;
use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all sanitising passes to a raw JSON response.
pub fn clean_json(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = remove_invisible_chars(&s);
    let s = escape_control_chars(from_first_brace(&s));
    first_json_value(&s)
}

/// Sanitise and parse a raw response into a record.
///
/// The error string is the serde message, kept for retry logs.
pub fn parse_record(raw: &str) -> Result<ExtractionRecord, String> {
    let cleaned = clean_json(raw);
    if cleaned.trim().is_empty() {
        return Err("empty response".to_string());
    }
    if !cleaned.trim_start().starts_with('{') {
        return Err("response is not a JSON object".to_string());
    }
    serde_json::from_str::<ExtractionRecord>(&cleaned).map_err(|e| e.to_string())
}

/// Sanitise a free-text response (summaries): fences and invisible
/// characters removed, surrounding whitespace trimmed.
pub fn clean_text(input: &str) -> String {
    let s = strip_code_fences(input);
    remove_invisible_chars(&s).trim().to_string()
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n?(.*?)\r?\n?```\s*$").unwrap()
});

fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(caps) = RE_OUTER_FENCES.captures(trimmed) {
        caps[1].to_string()
    } else {
        trimmed.to_string()
    }
}

// ── Rule 2: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Keep only the first JSON value ───────────────────────────────────

fn from_first_brace(input: &str) -> &str {
    input.find('{').map_or(input, |start| &input[start..])
}

/// Cut `input` after the first complete JSON value, dropping trailing prose
/// (which may itself contain braces). Input that does not parse is cut at the
/// last `}` so the parse error still points into the object.
fn first_json_value(input: &str) -> String {
    let mut values = serde_json::Deserializer::from_str(input).into_iter::<serde_json::Value>();
    match values.next() {
        Some(Ok(_)) => input[..values.byte_offset()].to_string(),
        _ => match input.rfind('}') {
            Some(end) => input[..=end].to_string(),
            None => input.to_string(),
        },
    }
}

// ── Rule 4: Control characters ───────────────────────────────────────────────
//
// Inside a string literal, raw \n \r \t become their escapes and any other
// control character is dropped. Outside strings, JSON whitespace is kept and
// other control characters are dropped.

fn escape_control_chars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            if escaped {
                escaped = false;
                if !c.is_control() {
                    out.push(c);
                } else {
                    // A backslash followed by a raw control char: drop both.
                    out.pop();
                }
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => {}
                c => out.push(c),
            }
        } else {
            match c {
                '"' => {
                    in_string = true;
                    out.push(c);
                }
                '\n' | '\r' | '\t' | ' ' => out.push(c),
                c if c.is_control() => {}
                c => out.push(c),
            }
        }
    }
    out
}
