//! Typed-literal parsing of string-valued filter arguments.
//!
//! A single wire string can carry a structured value (`[1, 2, 3]`,
//! `true`, `-4.5`) without a dedicated encoding. This is an explicit
//! closed parser: booleans, integers, floats, quoted strings, bracketed
//! lists and bare identifiers. Nothing is ever evaluated.

use storage_types::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not parse literal: {input}")]
pub struct LiteralError {
    pub input: String,
}

/// Parses a literal out of a raw string. Callers treat a failure as
/// "keep the raw string", matching the opportunistic coercion of
/// filter arguments.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    match trimmed {
        "None" | "null" => return Ok(Value::Null),
        "True" | "true" => return Ok(Value::Boolean(true)),
        "False" | "false" => return Ok(Value::Boolean(false)),
        _ => {}
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(Value::Integer(i));
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Ok(Value::Float(f));
    }
    if let Some(inner) = strip_quotes(trimmed) {
        return Ok(Value::String(inner.to_string()));
    }
    if let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        return parse_list(inner);
    }
    // Bare identifiers pass through as strings.
    if is_identifier(trimmed) {
        return Ok(Value::String(trimmed.to_string()));
    }
    Err(LiteralError {
        input: input.to_string(),
    })
}

fn strip_quotes(s: &str) -> Option<&str> {
    for quote in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return Some(&s[1..s.len() - 1]);
        }
    }
    None
}

fn is_identifier(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn parse_list(inner: &str) -> Result<Value, LiteralError> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Ok(Value::List(Vec::new()));
    }
    let mut items = Vec::new();
    for item in split_top_level(inner) {
        items.push(parse_literal(item)?);
    }
    Ok(Value::List(items))
}

/// Splits on commas outside brackets and quotes.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quote: Option<char> = None;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match (in_quote, c) {
            (Some(q), _) if c == q => in_quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => in_quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars() {
        assert_eq!(parse_literal("42"), Ok(Value::Integer(42)));
        assert_eq!(parse_literal("-3.5"), Ok(Value::Float(-3.5)));
        assert_eq!(parse_literal("True"), Ok(Value::Boolean(true)));
        assert_eq!(parse_literal("false"), Ok(Value::Boolean(false)));
        assert_eq!(parse_literal("None"), Ok(Value::Null));
    }

    #[test]
    fn strings_and_identifiers() {
        assert_eq!(
            parse_literal("'apple'"),
            Ok(Value::String("apple".to_string()))
        );
        assert_eq!(
            parse_literal("snake_name-1"),
            Ok(Value::String("snake_name-1".to_string()))
        );
        assert!(parse_literal("not a literal !").is_err());
    }

    #[test]
    fn lists_nest() {
        assert_eq!(
            parse_literal("[1, 2, 3]"),
            Ok(Value::List(vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3)
            ]))
        );
        assert_eq!(
            parse_literal("['a', [1, 2]]"),
            Ok(Value::List(vec![
                Value::String("a".to_string()),
                Value::List(vec![Value::Integer(1), Value::Integer(2)]),
            ]))
        );
        assert_eq!(parse_literal("[]"), Ok(Value::List(Vec::new())));
    }
}
