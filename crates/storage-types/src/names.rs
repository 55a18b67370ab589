use smol_str::SmolStr;

/// A schema-level identifier: field names, argument names, aliases.
pub type Name = SmolStr;

/// The name a type is registered under in the schema.
pub type TypeName = SmolStr;

/// A relational column or attribute name.
pub type FieldName = SmolStr;

/// A storage collection (table) name.
pub type CollectionName = SmolStr;

/// A storage model name (the declared relational model backing a node).
pub type ModelName = SmolStr;

/// `CamelCase` / `camelCase` to `snake_case`. An uppercase run keeps
/// together except for its last letter when a lowercase run follows
/// (`IDList` becomes `id_list`).
pub fn camel_to_snake(camel: &str) -> String {
    let chars: Vec<char> = camel.chars().collect();
    let mut out = String::with_capacity(camel.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.push(ch.to_ascii_lowercase());
    }
    out
}

pub fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// Ordering keys must be `snake_case` (a leading `-` reverses the order).
pub fn is_snake_case(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_to_snake_handles_acronym_boundaries() {
        assert_eq!(camel_to_snake("ChatType"), "chat_type");
        assert_eq!(camel_to_snake("limitTo"), "limit_to");
        assert_eq!(camel_to_snake("IDList"), "id_list");
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
    }

    #[test]
    fn snake_case_check() {
        assert!(is_snake_case("created_at"));
        assert!(is_snake_case("-created_at"));
        assert!(!is_snake_case("createdAt"));
        assert!(!is_snake_case(""));
    }
}
