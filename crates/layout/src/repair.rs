//! Defensive JSON repair for layout documents produced by an unreliable
//! upstream (an LLM). A bounded ladder of fixups, each tried only after the
//! previous parse attempt fails:
//!
//! 1. strip a fenced code block and slice to the outermost `{...}` span
//! 2. strip trailing commas before a closing bracket
//! 3. balance: close an unterminated string, then close open brackets in
//!    LIFO order, inserting missing closers where a mismatched one appears
//!
//! Each pass is a character scanner that tracks string-literal state and
//! escapes. No regexes; behavior is auditable in isolation.

use serde_json::Value;

/// Parse a layout document, repairing common syntax defects when the direct
/// parse fails. Returns the reason of the final failed attempt on `Err`.
pub fn parse_with_repair(raw: &str) -> Result<Value, String> {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        return Ok(v);
    }

    let sliced = slice_to_object(strip_code_fence(raw));
    if let Ok(v) = serde_json::from_str::<Value>(sliced) {
        return Ok(v);
    }

    let decommaed = strip_trailing_commas(sliced);
    if let Ok(v) = serde_json::from_str::<Value>(&decommaed) {
        return Ok(v);
    }

    let balanced = balance(&decommaed);
    serde_json::from_str::<Value>(&balanced).map_err(|e| e.to_string())
}

/// Drop a markdown fence wrapper (```json ... ```) if one is present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("json", "javascript", ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    match body.rfind("```") {
        Some(idx) => body[..idx].trim(),
        None => body.trim(),
    }
}

/// Slice to the outermost `{...}` span, dropping any leading or trailing
/// prose. Leaves the input alone when no braces are found.
fn slice_to_object(raw: &str) -> &str {
    let Some(start) = raw.find('{') else {
        return raw;
    };
    match raw.rfind('}') {
        Some(end) if end > start => &raw[start..=end],
        // No closing brace at all: keep the tail, the balance pass closes it.
        _ => &raw[start..],
    }
}

/// Remove commas that directly precede a closing `}` or `]`, ignoring
/// whitespace between. Commas inside string literals are untouched.
fn strip_trailing_commas(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = raw.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                // Look ahead past whitespace for a closing bracket.
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                    continue;
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Close whatever the document left open. Tracks string state (honoring
/// escapes) and a bracket stack; a mismatched closer gets the expected
/// closers inserted in front of it rather than being dropped.
fn balance(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in raw.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                stack.push(c);
                out.push(c);
            }
            '}' | ']' => {
                let opener = if c == '}' { '{' } else { '[' };
                // Pop up to the matching opener, emitting the closers the
                // document skipped.
                while let Some(&top) = stack.last() {
                    if top == opener {
                        stack.pop();
                        break;
                    }
                    stack.pop();
                    out.push(if top == '{' { '}' } else { ']' });
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    if in_string {
        out.push('"');
    }
    while let Some(top) = stack.pop() {
        out.push(if top == '{' { '}' } else { ']' });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_passes_through() {
        let v = parse_with_repair(r#"{"pages":[]}"#).unwrap();
        assert!(v.get("pages").unwrap().as_array().unwrap().is_empty());
    }

    #[test]
    fn test_code_fence_stripped() {
        let raw = "```json\n{\"pages\": []}\n```";
        let v = parse_with_repair(raw).unwrap();
        assert!(v.get("pages").is_some());
    }

    #[test]
    fn test_surrounding_prose_sliced_away() {
        let raw = "Here is your layout:\n{\"pages\": []}\nHope that helps!";
        let v = parse_with_repair(raw).unwrap();
        assert!(v.get("pages").is_some());
    }

    #[test]
    fn test_trailing_comma_in_array() {
        let v = parse_with_repair(r#"{"items": [1, 2, 3,]}"#).unwrap();
        assert_eq!(v["items"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_trailing_comma_in_object() {
        let v = parse_with_repair(r#"{"a": 1,}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn test_comma_inside_string_kept() {
        let v = parse_with_repair(r#"{"a": "x,]"}"#).unwrap();
        assert_eq!(v["a"], "x,]");
    }

    #[test]
    fn test_truncated_document_closed() {
        let v = parse_with_repair(r#"{"pages": [{"name": "Home""#).unwrap();
        assert_eq!(v["pages"][0]["name"], "Home");
    }

    #[test]
    fn test_unterminated_string_closed() {
        let v = parse_with_repair(r#"{"name": "Hom"#).unwrap();
        assert_eq!(v["name"], "Hom");
    }

    #[test]
    fn test_escaped_quote_not_a_terminator() {
        let v = parse_with_repair(r#"{"name": "say \"hi"#).unwrap();
        assert_eq!(v["name"], "say \"hi");
    }

    #[test]
    fn test_mismatched_closer_gets_inserted_closers() {
        // The `]` arrives while the inner object is still open.
        let raw = r#"{"pages":[{"name":"Home","sections":[{"type":"hero","title":"Hi",]}]}"#;
        let v = parse_with_repair(raw).unwrap();
        let section = &v["pages"][0]["sections"][0];
        assert_eq!(section["type"], "hero");
        assert_eq!(section["title"], "Hi");
    }

    #[test]
    fn test_unbalanced_open_brace() {
        let v = parse_with_repair(r#"{"a": {"b": 1}"#).unwrap();
        assert_eq!(v["a"]["b"], 1);
    }

    #[test]
    fn test_hopeless_input_is_an_error() {
        assert!(parse_with_repair("not json at all").is_err());
    }

    #[test]
    fn test_single_unbalanced_brace() {
        // Degenerate but must not panic: totality over arbitrary input.
        let _ = parse_with_repair("{");
        let _ = parse_with_repair("}");
        let _ = parse_with_repair("\"");
    }
}
