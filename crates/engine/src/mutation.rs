//! Mutation execution: `save` (create without id, update with id),
//! delete, the list-action protocol for relationship-valued inputs,
//! and the bulk through-table path for administrative batches.

use indexmap::IndexMap;
use tracing::debug;

use registry::{ConfigurationError, ModelInfo, ModelRelation, NodeType, Registry};
use storage_types::{
    Datastore, FieldName, Lookup, Name, Predicate, QueryPlan, Row, ThroughTable, Value,
};

use crate::error::ExecuteError;

/// The protocol for mutating a many-valued relationship. `Put` is
/// accepted on the wire but rejected at application time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListAction {
    Add,
    Clean,
    Remove,
    Set,
    Put,
}

impl ListAction {
    pub fn parse(input: &str) -> Result<ListAction, ExecuteError> {
        match input {
            "add" => Ok(ListAction::Add),
            "clean" => Ok(ListAction::Clean),
            "remove" => Ok(ListAction::Remove),
            "set" => Ok(ListAction::Set),
            "put" => Ok(ListAction::Put),
            other => Err(ExecuteError::validation(format!(
                "unknown list action '{other}'"
            ))),
        }
    }
}

/// Creates or updates one row. Without an id every required column
/// must be supplied; with an id only the supplied columns are
/// revalidated. Relationship-valued arguments run the list-action
/// protocol (or nested creation) after the row itself is written.
pub fn save(
    registry: &Registry,
    datastore: &dyn Datastore,
    node: &NodeType,
    arguments: &IndexMap<Name, Value>,
) -> Result<Row, ExecuteError> {
    let model = require_model(node)?;

    let mut columns: IndexMap<FieldName, Value> = IndexMap::new();
    let mut relation_inputs: Vec<(&Name, &Value)> = Vec::new();
    for (name, value) in arguments {
        if name == "id" {
            continue;
        }
        if model.columns.contains_key(name) {
            columns.insert(name.clone(), value.clone());
        } else if let Some(ModelRelation::ForwardOne { column, .. }) = model.relation(name) {
            // A single-valued relation argument is a plain id; it
            // writes the foreign-key column.
            columns.insert(column.clone(), value.clone());
        } else if model.relations.contains_key(name) {
            relation_inputs.push((name, value));
        } else if is_foreign_key_column(model, name) {
            columns.insert(name.clone(), value.clone());
        } else {
            return Err(ExecuteError::validation(format!(
                "unknown argument '{name}' for type '{}'",
                node.type_name
            )));
        }
    }

    let id = arguments.get("id").filter(|value| !value.is_null());
    let row = match id {
        Some(id) => {
            validate_columns(model, &columns, false)?;
            datastore.update(&model.collection, id, columns)?
        }
        None => {
            validate_columns(model, &columns, true)?;
            datastore.insert(&model.collection, columns)?
        }
    };

    let parent_id = row.id();
    for (name, value) in relation_inputs {
        apply_relation_input(registry, datastore, model, name, value, &parent_id)?;
    }

    datastore
        .get(&model.collection, &parent_id)
        .map_err(Into::into)
}

pub fn delete(
    datastore: &dyn Datastore,
    node: &NodeType,
    arguments: &IndexMap<Name, Value>,
) -> Result<Value, ExecuteError> {
    let model = require_model(node)?;
    let id = arguments
        .get("id")
        .filter(|value| !value.is_null())
        .ok_or_else(|| ExecuteError::validation("delete requires an id"))?;
    datastore.delete(&model.collection, id)?;
    Ok(id.clone())
}

/// Set-algebra on the association table directly, bypassing per-object
/// mutation: `set` is delete-then-recreate, `add` insert-only, `remove`
/// delete-matching, `clean` delete-all.
pub fn bulk_apply_m2m_action(
    datastore: &dyn Datastore,
    through: &ThroughTable,
    action: ListAction,
    left_ids: &[Value],
    right_ids: &[Value],
) -> Result<(), ExecuteError> {
    match action {
        ListAction::Add => datastore.associate(through, &pairs(left_ids, right_ids))?,
        ListAction::Remove => datastore.dissociate(through, left_ids, Some(right_ids))?,
        ListAction::Clean => datastore.dissociate(through, left_ids, None)?,
        ListAction::Set => {
            datastore.dissociate(through, left_ids, None)?;
            datastore.associate(through, &pairs(left_ids, right_ids))?;
        }
        ListAction::Put => {
            return Err(ExecuteError::validation("list action 'put' is not supported"))
        }
    }
    Ok(())
}

fn pairs(left_ids: &[Value], right_ids: &[Value]) -> Vec<(Value, Value)> {
    left_ids
        .iter()
        .flat_map(|left| right_ids.iter().map(move |right| (left.clone(), right.clone())))
        .collect()
}

/// Foreign-key columns are declared on the relation, not in the
/// column table, but nested creation supplies them directly.
fn is_foreign_key_column(model: &ModelInfo, name: &str) -> bool {
    model.relations.values().any(|relation| match relation {
        ModelRelation::ForwardOne { column, .. } => column == name,
        _ => false,
    })
}

fn validate_columns(
    model: &ModelInfo,
    supplied: &IndexMap<FieldName, Value>,
    full: bool,
) -> Result<(), ExecuteError> {
    for (name, column) in &model.columns {
        if name == "id" || !column.required {
            continue;
        }
        match supplied.get(name) {
            Some(value) if value.is_null() => {
                return Err(ExecuteError::validation(format!(
                    "field '{name}' of {} may not be null",
                    model.name
                )));
            }
            None if full => {
                return Err(ExecuteError::validation(format!(
                    "field '{name}' is required for {}",
                    model.name
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Routes one relationship-valued argument: an `{action, ids}` object
/// runs the list protocol against the live relation; a list of objects
/// is nested creation through the related type's own save.
fn apply_relation_input(
    registry: &Registry,
    datastore: &dyn Datastore,
    model: &ModelInfo,
    field: &Name,
    value: &Value,
    parent_id: &Value,
) -> Result<(), ExecuteError> {
    let relation = model
        .relation(field)
        .ok_or_else(|| ExecuteError::validation(format!("'{field}' is not a relation")))?;

    match value {
        Value::Object(parts) => {
            let action = parts
                .get("action")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ExecuteError::validation(format!("list input for '{field}' needs an action"))
                })?;
            let action = ListAction::parse(action)?;
            let ids = parts
                .get("ids")
                .and_then(Value::as_list)
                .unwrap_or_default();
            apply_list_action(registry, datastore, relation, field, parent_id, action, ids)
        }
        Value::List(items) if items.iter().all(|item| item.as_object().is_some()) => {
            create_nested(registry, datastore, relation, field, parent_id, items)
        }
        _ => Err(ExecuteError::validation(format!(
            "'{field}' expects an {{action, ids}} object or a list of nested payloads"
        ))),
    }
}

fn apply_list_action(
    registry: &Registry,
    datastore: &dyn Datastore,
    relation: &ModelRelation,
    field: &Name,
    parent_id: &Value,
    action: ListAction,
    ids: &[Value],
) -> Result<(), ExecuteError> {
    debug!(field = %field, ?action, count = ids.len(), "applying list action");
    match relation {
        ModelRelation::Many { through, .. } => {
            let left = std::slice::from_ref(parent_id);
            bulk_apply_m2m_action(datastore, through, action, left, ids)
        }
        ModelRelation::ReverseMany { model, foreign_key } => {
            let collection = related_collection(registry, model)?;
            match action {
                ListAction::Add => {
                    for id in ids {
                        datastore.update(
                            &collection,
                            id,
                            IndexMap::from([(foreign_key.clone(), parent_id.clone())]),
                        )?;
                    }
                }
                ListAction::Remove => {
                    for id in ids {
                        datastore.update(
                            &collection,
                            id,
                            IndexMap::from([(foreign_key.clone(), Value::Null)]),
                        )?;
                    }
                }
                ListAction::Clean | ListAction::Set => {
                    let plan = QueryPlan::for_collection(collection.clone()).filtered(
                        Predicate::And(vec![Lookup::new(foreign_key.clone(), parent_id.clone())]),
                    );
                    for row in datastore.fetch(&plan)? {
                        datastore.update(
                            &collection,
                            &row.id(),
                            IndexMap::from([(foreign_key.clone(), Value::Null)]),
                        )?;
                    }
                    if action == ListAction::Set {
                        for id in ids {
                            datastore.update(
                                &collection,
                                id,
                                IndexMap::from([(foreign_key.clone(), parent_id.clone())]),
                            )?;
                        }
                    }
                }
                ListAction::Put => {
                    return Err(ExecuteError::validation(
                        "list action 'put' is not supported",
                    ))
                }
            }
            Ok(())
        }
        ModelRelation::ForwardOne { .. } => Err(ExecuteError::validation(format!(
            "'{field}' is single-valued and takes a plain id"
        ))),
    }
}

/// Nested creation payloads recursively run the related type's own
/// save. Reverse relations inject the back-reference column; m2m
/// relations associate the created row through the through table.
fn create_nested(
    registry: &Registry,
    datastore: &dyn Datastore,
    relation: &ModelRelation,
    field: &Name,
    parent_id: &Value,
    items: &[Value],
) -> Result<(), ExecuteError> {
    match relation {
        ModelRelation::ReverseMany { model, foreign_key } => {
            let related = registry.get_type_for_model(model)?;
            for item in items {
                let Some(payload) = item.as_object() else {
                    continue;
                };
                let mut arguments: IndexMap<Name, Value> = payload.clone();
                arguments.insert(foreign_key.clone(), parent_id.clone());
                save(registry, datastore, related, &arguments)?;
            }
            Ok(())
        }
        ModelRelation::Many { model, through } => {
            let related = registry.get_type_for_model(model)?;
            for item in items {
                let Some(payload) = item.as_object() else {
                    continue;
                };
                let row = save(registry, datastore, related, payload)?;
                datastore.associate(through, &[(parent_id.clone(), row.id())])?;
            }
            Ok(())
        }
        ModelRelation::ForwardOne { .. } => Err(ExecuteError::validation(format!(
            "nested creation through '{field}' needs a collection relation"
        ))),
    }
}

fn related_collection(
    registry: &Registry,
    model: &str,
) -> Result<storage_types::CollectionName, ExecuteError> {
    let node = registry.get_type_for_model(model)?;
    let info = require_model(node)?;
    Ok(info.collection.clone())
}

fn require_model(node: &NodeType) -> Result<&ModelInfo, ExecuteError> {
    node.model
        .as_ref()
        .ok_or_else(|| {
            ExecuteError::Configuration(ConfigurationError::MissingModel {
                type_name: node.type_name.clone(),
            })
        })
}
