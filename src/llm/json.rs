//! JSON extraction from LLM responses.
//!
//! Models asked for JSON still wrap it in markdown fences now and then, and
//! long prose values sometimes arrive with raw newlines or tabs inside string
//! literals. Both are tolerated here; anything else is a parse failure that
//! the caller reports together with the raw response.

use serde_json::Value;

/// Strip a leading code fence with any info string (```json, ```YAML, bare ```) and a trailing fence
pub fn strip_markdown_fences(s: &str) -> &str {
    let s = s.trim();
    let s = match s.strip_prefix("```") {
        // The info string runs to the end of the opening line
        Some(rest) => match rest.split_once('\n') {
            Some((_, body)) => body,
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        },
        None => s,
    };
    s.strip_suffix("```").unwrap_or(s).trim()
}

/// Parse a JSON value out of an LLM response.
///
/// Strict parse first; if that fails because of a control character inside a
/// string, the control characters are escaped and the parse is retried once.
/// Any other failure returns the strict parser's error.
pub fn parse_json_response(text: &str) -> Result<Value, serde_json::Error> {
    let stripped = strip_markdown_fences(text);

    match serde_json::from_str::<Value>(stripped) {
        Ok(value) => Ok(value),
        Err(e) if is_control_character_error(&e) => {
            log::debug!("Strict JSON parse hit a control character, retrying leniently");
            serde_json::from_str::<Value>(&escape_control_chars_in_strings(stripped))
        }
        Err(e) => Err(e),
    }
}

fn is_control_character_error(e: &serde_json::Error) -> bool {
    e.is_syntax() && e.to_string().contains("control character")
}

/// Escape raw control characters that appear inside JSON string literals.
///
/// Characters outside strings are left untouched (they are whitespace to the
/// parser anyway).
pub fn escape_control_chars_in_strings(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in s.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
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
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }

    out
}
