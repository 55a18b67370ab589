//! Reduction of the wire-level operation into `Selection` trees:
//! fragment spreads are inlined, variable references resolved against
//! the bound values, argument keys snake_cased, and the reserved
//! `meta` argument split off for the request-meta system.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json as json;

use storage_types::names::camel_to_snake;
use storage_types::{Name, Value};

use crate::ast::{ArgumentValue, Document, FieldNode, OperationDef, OperationType, SelectionNode};
use crate::tree::Selection;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no operation named '{name}' in the request document")]
    OperationNotFound { name: Name },

    #[error("the request document contains no operations")]
    EmptyDocument,

    #[error("fragment '{name}' is spread but never defined")]
    FragmentNotFound { name: Name },

    #[error("fragment spreads nest deeper than {limit} levels")]
    FragmentDepthExceeded { limit: usize },

    #[error("top-level field '{attribute}' must be an object selection")]
    MissingSubSelections { attribute: Name },
}

/// A parsed top-level field of the chosen operation.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedRoot {
    pub selection: Selection,
    /// Operation-scoped end-user context from the reserved `meta`
    /// argument; never a filter.
    pub meta: Option<IndexMap<Name, Value>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedOperation {
    pub ty: OperationType,
    pub name: Option<Name>,
    pub roots: Vec<ParsedRoot>,
}

impl ParsedOperation {
    /// The root selection the request is about: matched by alias or
    /// name against `requested`, defaulting to the first top-level
    /// selection. Every root must be an object selection.
    pub fn root(&self, requested: Option<&str>) -> Result<&ParsedRoot, ParseError> {
        let root = requested
            .and_then(|name| {
                self.roots.iter().find(|root| {
                    root.selection.alias.as_deref() == Some(name) || root.selection.attribute == name
                })
            })
            .or_else(|| self.roots.first())
            .ok_or(ParseError::EmptyDocument)?;

        if root.selection.sub_selections.is_empty() {
            return Err(ParseError::MissingSubSelections {
                attribute: root.selection.attribute.clone(),
            });
        }
        Ok(root)
    }
}

const FRAGMENT_DEPTH_LIMIT: usize = 32;

/// Parses the operation chosen by `operation_name` (or the only /
/// first one) into selection trees.
pub fn parse_request(
    document: &Document,
    variables: &HashMap<Name, json::Value>,
    operation_name: Option<&str>,
) -> Result<ParsedOperation, ParseError> {
    let operation = choose_operation(document, operation_name)?;

    let mut roots = Vec::new();
    for field in inline_fragments(&operation.selection_set, document, 0)? {
        roots.push(parse_root(&field, document, variables)?);
    }

    Ok(ParsedOperation {
        ty: operation.ty,
        name: operation.name.clone(),
        roots,
    })
}

fn choose_operation<'d>(
    document: &'d Document,
    operation_name: Option<&str>,
) -> Result<&'d OperationDef, ParseError> {
    match operation_name {
        Some(name) => document
            .operations
            .iter()
            .find(|op| op.name.as_deref() == Some(name))
            .ok_or_else(|| ParseError::OperationNotFound { name: name.into() }),
        None => document.operations.first().ok_or(ParseError::EmptyDocument),
    }
}

fn parse_root(
    field: &FieldNode,
    document: &Document,
    variables: &HashMap<Name, json::Value>,
) -> Result<ParsedRoot, ParseError> {
    let meta = field
        .arguments
        .get("meta")
        .and_then(|value| resolve_argument(value, variables))
        .and_then(|value| value.as_object().cloned());
    let selection = parse_field(field, document, variables, 0)?;
    Ok(ParsedRoot { selection, meta })
}

fn parse_field(
    field: &FieldNode,
    document: &Document,
    variables: &HashMap<Name, json::Value>,
    depth: usize,
) -> Result<Selection, ParseError> {
    let mut filters = IndexMap::new();
    for (key, value) in &field.arguments {
        // `meta` is operation context, never a filter argument.
        if key == "meta" {
            continue;
        }
        if let Some(value) = resolve_argument(value, variables) {
            filters.insert(Name::new(camel_to_snake(key)), value);
        }
    }

    let mut sub_selections = Vec::new();
    for sub_field in inline_fragments(&field.selection_set, document, depth)? {
        sub_selections.push(parse_field(&sub_field, document, variables, depth + 1)?);
    }

    Ok(Selection {
        attribute: field.name.clone(),
        filters,
        sub_selections,
        alias: field.alias.clone(),
    })
}

/// Substitutes every fragment spread with the fragment's own selection
/// set, flattened in place.
fn inline_fragments(
    selection_set: &[SelectionNode],
    document: &Document,
    depth: usize,
) -> Result<Vec<FieldNode>, ParseError> {
    if depth > FRAGMENT_DEPTH_LIMIT {
        return Err(ParseError::FragmentDepthExceeded {
            limit: FRAGMENT_DEPTH_LIMIT,
        });
    }
    let mut fields = Vec::new();
    for node in selection_set {
        match node {
            SelectionNode::Field(field) => fields.push(field.clone()),
            SelectionNode::FragmentSpread { name } => {
                let fragment = document
                    .fragments
                    .get(name)
                    .ok_or_else(|| ParseError::FragmentNotFound { name: name.clone() })?;
                fields.extend(inline_fragments(&fragment.selection_set, document, depth + 1)?);
            }
        }
    }
    Ok(fields)
}

/// Resolves one argument to a filter value. An unbound or null-bound
/// variable drops the argument entirely; an explicit null literal is
/// preserved, so a mutation can null out a column.
fn resolve_argument(
    value: &ArgumentValue,
    variables: &HashMap<Name, json::Value>,
) -> Option<Value> {
    match value {
        ArgumentValue::Literal(raw) => Some(Value::from_json(raw)),
        ArgumentValue::Variable(name) => {
            let bound = variables.get(name).map(Value::from_json)?;
            if bound.is_null() {
                None
            } else {
                Some(bound)
            }
        }
        ArgumentValue::List(items) => Some(Value::List(
            items
                .iter()
                .filter_map(|item| resolve_argument(item, variables))
                .collect(),
        )),
        ArgumentValue::Object(fields) => Some(Value::Object(
            fields
                .iter()
                .filter_map(|(key, value)| {
                    resolve_argument(value, variables)
                        .map(|value| (Name::new(camel_to_snake(key)), value))
                })
                .collect(),
        )),
    }
}
