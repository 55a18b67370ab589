//! The raw expression sub-language: a flat `&`-conjunction or
//! `|`-disjunction of `key=literal` clauses, plus order-key parsing.

use selection::literal::parse_literal;
use storage_types::names::is_snake_case;
use storage_types::{Lookup, OrderBy, Predicate, Value};

use crate::error::PlanError;

/// Parses `"a=1&b=2"` into an AND of equality clauses, `"a=1|b=2"`
/// into an OR. The two operators never mix: when both appear, `&` is
/// checked first and any `|` stays inside the clause values.
pub fn parse_expression(input: &str) -> Result<Predicate, PlanError> {
    let (disjunction, separator) = if input.contains('&') {
        (false, '&')
    } else if input.contains('|') {
        (true, '|')
    } else {
        (false, '&')
    };

    let mut lookups = Vec::new();
    for clause in input.split(separator).filter(|c| !c.trim().is_empty()) {
        let (key, raw) = clause.split_once('=').ok_or_else(|| PlanError::InvalidExpression {
            input: input.to_owned(),
            reason: format!("clause '{}' has no '='", clause.trim()),
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(PlanError::InvalidExpression {
                input: input.to_owned(),
                reason: "clause has an empty key".to_owned(),
            });
        }
        let value = parse_literal(raw.trim())
            .unwrap_or_else(|_| Value::String(raw.trim().to_owned()));
        lookups.push(Lookup::new(key, value));
    }

    Ok(if disjunction {
        Predicate::Or(lookups)
    } else {
        Predicate::And(lookups)
    })
}

/// Parses an ordering key, rejecting anything that is not strict
/// lowercase-with-underscores (with an optional leading `-`). Case
/// mismatches would otherwise surface as wrong-column errors deep in
/// the datastore.
pub fn parse_order_key(key: &str) -> Result<OrderBy, PlanError> {
    if !is_snake_case(key) {
        return Err(PlanError::InvalidOrderKey {
            key: key.to_owned(),
        });
    }
    Ok(OrderBy::from_key(key))
}
