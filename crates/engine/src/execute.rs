//! Request execution: parses the wire document, plans each root
//! selection, runs the plan against the datastore and materializes
//! rows through the schema's field resolvers.

use std::collections::HashMap;

use serde_json as json;
use tracing::{debug, warn};

use plan::Planner;
use registry::{FieldResolver, NodeType, Registry, RelatedTypeRef, RootFieldKind, TypeKey};
use selection::{Document, OperationType, ParsedRoot, Selection};
use storage_types::{
    Datastore, Deadline, Lookup, Name, Predicate, Related, RelationLink, Row, Value,
};

use crate::config::EngineConfig;
use crate::error::ExecuteError;
use crate::meta::MetaStore;
use crate::mutation;
use crate::permission::{AllowAll, PermissionCheck};
use crate::response::{FieldError, Response};

static ALLOW_ALL: AllowAll = AllowAll;

/// One engine per process: a locked registry, a datastore and the
/// permission policy. Each `execute` call carries its own deadline and
/// meta store, so concurrent requests share nothing mutable.
pub struct Engine<'a> {
    registry: &'a Registry,
    datastore: &'a dyn Datastore,
    permissions: &'a dyn PermissionCheck,
    config: EngineConfig,
}

impl<'a> Engine<'a> {
    pub fn new(
        registry: &'a Registry,
        datastore: &'a dyn Datastore,
        config: EngineConfig,
    ) -> Engine<'a> {
        Engine {
            registry,
            datastore,
            permissions: &ALLOW_ALL,
            config,
        }
    }

    pub fn with_permissions(mut self, permissions: &'a dyn PermissionCheck) -> Engine<'a> {
        self.permissions = permissions;
        self
    }

    /// Runs one request document end to end. Field-level failures fold
    /// into the structured error list; only an exhausted deadline
    /// short-circuits into the fixed TIMEOUT envelope.
    pub fn execute(
        &self,
        document: &Document,
        variables: &HashMap<Name, json::Value>,
        operation_name: Option<&str>,
    ) -> Response {
        let deadline = Deadline::start(self.config.request_budget);
        let mut meta_store = MetaStore::new();

        match self.run(document, variables, operation_name, &deadline, &mut meta_store) {
            Ok((data, errors)) => {
                Response::classify(data, errors, meta_store.warnings().to_vec())
            }
            Err(err) if err.is_timeout() => {
                warn!(budget_ms = deadline.budget_ms(), "request exceeded its budget");
                Response::timeout(deadline.budget_ms())
            }
            Err(err) => Response::classify(
                None,
                vec![FieldError {
                    field: None,
                    message: err.to_string(),
                }],
                meta_store.warnings().to_vec(),
            ),
        }
    }

    fn run(
        &self,
        document: &Document,
        variables: &HashMap<Name, json::Value>,
        operation_name: Option<&str>,
        deadline: &Deadline,
        meta_store: &mut MetaStore,
    ) -> Result<(Option<json::Value>, Vec<FieldError>), ExecuteError> {
        let operation = selection::parse_request(document, variables, operation_name)?;

        let mut data = json::Map::new();
        let mut errors = Vec::new();
        let mut resolved = 0usize;

        for root in &operation.roots {
            let key = root
                .selection
                .alias
                .clone()
                .unwrap_or_else(|| root.selection.attribute.clone());

            // Each root re-activates its operation's meta bucket, so a
            // batched document keeps per-operation context separate.
            let bucket = document
                .operations
                .iter()
                .filter_map(|op| op.name.as_deref())
                .find(|name| *name == key.as_str() || *name == root.selection.attribute.as_str());
            meta_store.activate(bucket);
            if let Some(meta) = &root.meta {
                meta_store.merge_context(meta);
            }

            deadline.check()?;
            let outcome = match operation.ty {
                OperationType::Query => self.execute_query_root(root, deadline, meta_store),
                OperationType::Mutation => self.execute_mutation_root(root, deadline, meta_store),
            };
            match outcome {
                Ok(value) => {
                    resolved += 1;
                    data.insert(key.to_string(), value);
                }
                Err(err) if err.is_timeout() => return Err(err),
                Err(err) => {
                    debug!(field = %key, error = %err, "root field failed");
                    data.insert(key.to_string(), json::Value::Null);
                    errors.push(FieldError::for_field(key, err.to_string()));
                }
            }
        }

        let data = if resolved > 0 || errors.is_empty() {
            Some(json::Value::Object(data))
        } else {
            None
        };
        Ok((data, errors))
    }

    fn execute_query_root(
        &self,
        root: &ParsedRoot,
        deadline: &Deadline,
        meta_store: &MetaStore,
    ) -> Result<json::Value, ExecuteError> {
        let selection = &root.selection;
        if selection.sub_selections.is_empty() {
            return Err(selection::ParseError::MissingSubSelections {
                attribute: selection.attribute.clone(),
            }
            .into());
        }

        let schema = self
            .registry
            .schema()
            .ok_or(registry::ConfigurationError::NoRegisteredTypes)?;
        let field = schema.query_field(&selection.attribute).ok_or_else(|| {
            registry::NotFoundError::NodeNotFound {
                key: selection.attribute.to_string(),
            }
        })?;

        if !self
            .permissions
            .allows(meta_store.active(), &field.type_name, &selection.attribute)
        {
            return Err(ExecuteError::PermissionDenied {
                field: selection.attribute.clone(),
            });
        }

        match field.kind {
            RootFieldKind::Custom => {
                let node = self
                    .registry
                    .get_type(TypeKey::Name(field.type_name.as_str()), true)?;
                let resolver = node.root_resolver.as_ref().ok_or_else(|| {
                    registry::NotFoundError::NodeNotFound {
                        key: field.type_name.to_string(),
                    }
                })?;
                resolver
                    .call(&selection.filters)
                    .map_err(|message| ExecuteError::Resolver {
                        field: selection.attribute.clone(),
                        message,
                    })
            }
            RootFieldKind::ModelList => {
                let node = self.registry.get_type_by_name(&field.type_name)?;
                let plan = Planner::new(self.registry, deadline).plan(node, selection)?;
                deadline.check()?;
                let rows = self.datastore.fetch(&plan)?;
                let items = rows
                    .iter()
                    .map(|row| self.materialize(node, selection, row, deadline, meta_store))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(json::Value::Array(items))
            }
        }
    }

    fn execute_mutation_root(
        &self,
        root: &ParsedRoot,
        deadline: &Deadline,
        meta_store: &MetaStore,
    ) -> Result<json::Value, ExecuteError> {
        let selection = &root.selection;
        let schema = self
            .registry
            .schema()
            .ok_or(registry::ConfigurationError::NoRegisteredTypes)?;
        let field = schema.mutation_field(&selection.attribute).ok_or_else(|| {
            registry::NotFoundError::NodeNotFound {
                key: selection.attribute.to_string(),
            }
        })?;

        deadline.check()?;
        match &field.kind {
            registry::MutationKind::Save { type_name, .. } => {
                let node = self.registry.get_type_by_name(type_name)?;
                if !self
                    .permissions
                    .allows(meta_store.active(), type_name, &selection.attribute)
                {
                    return Err(ExecuteError::PermissionDenied {
                        field: selection.attribute.clone(),
                    });
                }
                let row =
                    mutation::save(self.registry, self.datastore, node, &selection.filters)?;
                if selection.sub_selections.is_empty() {
                    Ok(json::json!({ "id": row.id().as_json() }))
                } else {
                    // The saved row comes back without relations; any
                    // requested relation resolves off-plan.
                    self.materialize(node, selection, &row, deadline, meta_store)
                }
            }
            registry::MutationKind::Delete { type_name } => {
                let node = self.registry.get_type_by_name(type_name)?;
                if !self
                    .permissions
                    .allows(meta_store.active(), type_name, &selection.attribute)
                {
                    return Err(ExecuteError::PermissionDenied {
                        field: selection.attribute.clone(),
                    });
                }
                let id = mutation::delete(self.datastore, node, &selection.filters)?;
                Ok(json::json!({ "id": id.as_json() }))
            }
            registry::MutationKind::Custom { resolver, .. } => resolver(
                self.datastore,
                &selection.filters,
            )
            .map_err(|message| ExecuteError::Resolver {
                field: selection.attribute.clone(),
                message,
            }),
        }
    }

    /// Turns one fetched row into a response object, walking the
    /// selection: custom resolvers first, then relations from the
    /// eager-loaded rows, then plain attribute reads (absent attributes
    /// read as null).
    fn materialize(
        &self,
        node: &NodeType,
        selection: &Selection,
        row: &Row,
        deadline: &Deadline,
        meta_store: &MetaStore,
    ) -> Result<json::Value, ExecuteError> {
        deadline.check()?;

        let mut object = json::Map::new();
        for sub in &selection.sub_selections {
            let key = sub.alias.as_ref().unwrap_or(&sub.attribute);
            let attribute = node.alias_to_attribute(&sub.attribute);

            let value = if let Some(resolver) = node.field_resolver(attribute) {
                match resolver {
                    FieldResolver::Attribute(name) => row.attribute(name).as_json(),
                    FieldResolver::Custom(resolve) => resolve(row).as_json(),
                }
            } else if let Some(related_field) = node.nested_field(attribute) {
                let target = self.related_node(node, &related_field.target)?;
                if !self
                    .permissions
                    .allows(meta_store.active(), &target.type_name, attribute)
                {
                    return Err(ExecuteError::PermissionDenied {
                        field: Name::new(attribute),
                    });
                }
                match row.related.get(&related_field.name) {
                    Some(Related::Many(rows)) => json::Value::Array(
                        rows.iter()
                            .map(|row| self.materialize(target, sub, row, deadline, meta_store))
                            .collect::<Result<Vec<_>, _>>()?,
                    ),
                    Some(Related::One(Some(related_row))) => {
                        self.materialize(target, sub, related_row, deadline, meta_store)?
                    }
                    Some(Related::One(None)) => json::Value::Null,
                    None => self.off_plan(node, target, related_field.name.as_str(), sub, row, deadline, meta_store)?,
                }
            } else {
                row.attribute(attribute).as_json()
            };
            object.insert(key.to_string(), value);
        }
        Ok(json::Value::Object(object))
    }

    /// A relation requested off an already-materialized parent, outside
    /// any eager load: fetch the live collection and apply the same
    /// filters, minus pagination.
    fn off_plan(
        &self,
        node: &NodeType,
        target: &NodeType,
        field: &str,
        sub: &Selection,
        row: &Row,
        deadline: &Deadline,
        meta_store: &MetaStore,
    ) -> Result<json::Value, ExecuteError> {
        let planner = Planner::new(self.registry, deadline);
        let (related, mut plan) = planner.related_plan(node, field, &sub.filters)?;

        let rows = match &related.link {
            // Single-valued: the parent row holds the foreign key, so
            // at most one related row exists.
            RelationLink::Parent { .. } => {
                let rows = self.datastore.related_rows(&related, row)?;
                return match rows.first() {
                    Some(related_row) => {
                        self.materialize(target, sub, related_row, deadline, meta_store)
                    }
                    None => Ok(json::Value::Null),
                };
            }
            RelationLink::Child { column } => {
                plan.filters.push(Predicate::And(vec![Lookup::new(
                    column.clone(),
                    row.id(),
                )]));
                self.datastore.fetch(&plan)?
            }
            RelationLink::Through(_) => {
                let members = self.datastore.related_rows(&related, row)?;
                let unfiltered = plan.filters.is_empty()
                    && plan.excludes.is_empty()
                    && plan.order_by.is_none()
                    && !plan.distinct;
                if unfiltered {
                    members
                } else {
                    let ids: Vec<Value> = members.iter().map(Row::id).collect();
                    plan.filters.push(Predicate::And(vec![Lookup::new(
                        "id__in",
                        Value::List(ids),
                    )]));
                    self.datastore.fetch(&plan)?
                }
            }
        };
        let items = rows
            .iter()
            .map(|row| self.materialize(target, sub, row, deadline, meta_store))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json::Value::Array(items))
    }

    fn related_node(
        &self,
        node: &NodeType,
        target: &RelatedTypeRef,
    ) -> Result<&'a NodeType, ExecuteError> {
        let name = target.referenced(&node.type_name);
        Ok(self.registry.get_type_by_name(&name)?)
    }
}
