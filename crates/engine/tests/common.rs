#![allow(dead_code)]

//! Shared fixtures: an in-memory datastore with a query counter, the
//! chat schema registry, and wire document builders.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use indexmap::IndexMap;
use serde_json as json;

use registry::{
    ArgumentsSpec, ColumnDef, ColumnKind, FilterDecl, InputKind, ModelInfo, ModelRelation,
    MutationDecl, MutationKind, NodeMetadata, NodeTypeDecl, RelatedField, RelatedTypeRef, Registry,
};
use selection::{ArgumentValue, Document, FieldNode, OperationDef, OperationType, SelectionNode};
use storage_types::{
    CollectionName, Datastore, FieldName, Lookup, OrderBy, Predicate, QueryPlan, Related,
    RelatedRef, RelationLink, Row, StoreError, ThroughTable, Value,
};

type Values = IndexMap<FieldName, Value>;

/// Rows in plain maps, association pairs per through table, and a
/// counter of executed collection scans so tests can assert the
/// absence of N+1 fetches.
pub struct MemoryStore {
    collections: Mutex<IndexMap<CollectionName, Vec<Values>>>,
    associations: Mutex<Vec<(CollectionName, Value, Value)>>,
    queries: AtomicUsize,
    next_id: Mutex<i64>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            collections: Mutex::new(IndexMap::new()),
            associations: Mutex::new(Vec::new()),
            queries: AtomicUsize::new(0),
            next_id: Mutex::new(1000),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn seed(&self, collection: &str, rows: Vec<json::Value>) {
        let mut collections = self.collections.lock().unwrap();
        let stored = collections.entry(collection.into()).or_default();
        for row in rows {
            if let Value::Object(values) = Value::from_json(&row) {
                stored.push(values);
            }
        }
    }

    pub fn seed_association(&self, table: &str, pairs: &[(i64, i64)]) {
        let mut associations = self.associations.lock().unwrap();
        for (left, right) in pairs {
            associations.push((
                table.into(),
                Value::Integer(*left),
                Value::Integer(*right),
            ));
        }
    }

    pub fn rows(&self, collection: &str) -> Vec<Values> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Right-side ids associated with `left` in the given table.
    pub fn associated(&self, table: &str, left: i64) -> Vec<i64> {
        self.associations
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, l, _)| t == table && *l == Value::Integer(left))
            .filter_map(|(_, _, r)| match r {
                Value::Integer(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn scan(&self, plan: &QueryPlan) -> Result<Vec<Values>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let collections = self.collections.lock().unwrap();
        let rows = collections
            .get(&plan.collection)
            .ok_or_else(|| StoreError::CollectionNotFound {
                collection: plan.collection.clone(),
            })?;

        let mut matched: Vec<Values> = rows
            .iter()
            .filter(|row| {
                plan.filters.iter().all(|p| predicate_matches(row, p))
                    && !plan.excludes.iter().any(|p| predicate_matches(row, p))
            })
            .cloned()
            .collect();

        if let Some(OrderBy { field, descending }) = &plan.order_by {
            matched.sort_by(|a, b| {
                let ordering = compare(a.get(field), b.get(field));
                if *descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(pagination) = plan.pagination {
            let offset = pagination.offset.unwrap_or(0) as usize;
            matched = matched.into_iter().skip(offset).collect();
            if let Some(limit) = pagination.limit {
                matched.truncate(limit as usize);
            }
        }
        Ok(matched)
    }

    fn attach_related(&self, plan: &QueryPlan, rows: Vec<Values>) -> Result<Vec<Row>, StoreError> {
        let mut out: Vec<Row> = rows.into_iter().map(Row::new).collect();

        for (field, related) in &plan.select {
            let targets = self.fetch(&QueryPlan::for_collection(related.collection.clone()))?;
            for row in &mut out {
                let joined = match &related.link {
                    RelationLink::Parent { column } => {
                        let key = row.attribute(column);
                        targets
                            .iter()
                            .find(|t| t.id() == key)
                            .cloned()
                            .map(Box::new)
                    }
                    _ => None,
                };
                row.related.insert(field.clone(), Related::One(joined));
            }
        }

        for (field, load) in &plan.eager_loads {
            let children = self.fetch(&load.plan)?;
            for row in &mut out {
                let mine = self.link_rows(&load.related, row, &children);
                row.related.insert(field.clone(), mine);
            }
        }
        Ok(out)
    }

    fn link_rows(&self, related: &RelatedRef, parent: &Row, children: &[Row]) -> Related {
        match &related.link {
            RelationLink::Parent { column } => {
                let key = parent.attribute(column);
                Related::One(children.iter().find(|c| c.id() == key).cloned().map(Box::new))
            }
            RelationLink::Child { column } => Related::Many(
                children
                    .iter()
                    .filter(|c| c.attribute(column) == parent.id())
                    .cloned()
                    .collect(),
            ),
            RelationLink::Through(through) => {
                let associations = self.associations.lock().unwrap();
                let rights: Vec<&Value> = associations
                    .iter()
                    .filter(|(t, l, _)| *t == through.table && *l == parent.id())
                    .map(|(_, _, r)| r)
                    .collect();
                Related::Many(
                    children
                        .iter()
                        .filter(|c| rights.iter().any(|r| **r == c.id()))
                        .cloned()
                        .collect(),
                )
            }
        }
    }
}

impl Datastore for MemoryStore {
    fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Row>, StoreError> {
        let rows = self.scan(plan)?;
        self.attach_related(plan, rows)
    }

    fn get(&self, collection: &CollectionName, id: &Value) -> Result<Row, StoreError> {
        let collections = self.collections.lock().unwrap();
        collections
            .get(collection)
            .and_then(|rows| rows.iter().find(|row| row.get("id") == Some(id)))
            .map(|row| Row::new(row.clone()))
            .ok_or_else(|| StoreError::RowNotFound {
                collection: collection.clone(),
                id: id.clone(),
            })
    }

    fn insert(&self, collection: &CollectionName, values: Values) -> Result<Row, StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let rows = collections.entry(collection.clone()).or_default();
        let mut values = values;
        if values.get("id").is_none_or(Value::is_null) {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            values.insert("id".into(), Value::Integer(*next));
        }
        rows.push(values.clone());
        Ok(Row::new(values))
    }

    fn update(
        &self,
        collection: &CollectionName,
        id: &Value,
        values: Values,
    ) -> Result<Row, StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let rows = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound {
                collection: collection.clone(),
            })?;
        let row = rows
            .iter_mut()
            .find(|row| row.get("id") == Some(id))
            .ok_or_else(|| StoreError::RowNotFound {
                collection: collection.clone(),
                id: id.clone(),
            })?;
        for (key, value) in values {
            row.insert(key, value);
        }
        Ok(Row::new(row.clone()))
    }

    fn delete(&self, collection: &CollectionName, id: &Value) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let rows = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound {
                collection: collection.clone(),
            })?;
        let before = rows.len();
        rows.retain(|row| row.get("id") != Some(id));
        if rows.len() == before {
            return Err(StoreError::RowNotFound {
                collection: collection.clone(),
                id: id.clone(),
            });
        }
        Ok(())
    }

    fn related_rows(&self, related: &RelatedRef, parent: &Row) -> Result<Vec<Row>, StoreError> {
        let children = self.fetch(&QueryPlan::for_collection(related.collection.clone()))?;
        Ok(match self.link_rows(related, parent, &children) {
            Related::Many(rows) => rows,
            Related::One(Some(row)) => vec![*row],
            Related::One(None) => Vec::new(),
        })
    }

    fn associate(
        &self,
        through: &ThroughTable,
        pairs: &[(Value, Value)],
    ) -> Result<(), StoreError> {
        let mut associations = self.associations.lock().unwrap();
        for (left, right) in pairs {
            let entry = (through.table.clone(), left.clone(), right.clone());
            if !associations.contains(&entry) {
                associations.push(entry);
            }
        }
        Ok(())
    }

    fn dissociate(
        &self,
        through: &ThroughTable,
        left_ids: &[Value],
        right_ids: Option<&[Value]>,
    ) -> Result<(), StoreError> {
        let mut associations = self.associations.lock().unwrap();
        associations.retain(|(table, left, right)| {
            if *table != through.table || !left_ids.contains(left) {
                return true;
            }
            match right_ids {
                Some(rights) => !rights.contains(right),
                None => false,
            }
        });
        Ok(())
    }
}

fn predicate_matches(row: &Values, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::And(lookups) => lookups.iter().all(|l| lookup_matches(row, l)),
        Predicate::Or(lookups) => lookups.iter().any(|l| lookup_matches(row, l)),
    }
}

fn lookup_matches(row: &Values, lookup: &Lookup) -> bool {
    if let Some(field) = lookup.key.strip_suffix("__in") {
        let Some(candidates) = lookup.value.as_list() else {
            return false;
        };
        return row
            .get(field)
            .is_some_and(|value| candidates.contains(value));
    }
    if let Some(field) = lookup.key.strip_suffix("__contains") {
        let (Some(haystack), Some(needle)) = (
            row.get(field).and_then(Value::as_str),
            lookup.value.as_str(),
        ) else {
            return false;
        };
        return haystack.contains(needle);
    }
    row.get(lookup.key.as_str()) == Some(&lookup.value)
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(Value::Integer(a)), Some(Value::Integer(b))) => a.cmp(b),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => std::cmp::Ordering::Equal,
    }
}

pub fn memberships() -> ThroughTable {
    ThroughTable {
        table: "chat_memberships".into(),
        left_column: "chat_id".into(),
        right_column: "user_id".into(),
    }
}

fn chat_model() -> ModelInfo {
    ModelInfo {
        name: "Chat".into(),
        collection: "chats".into(),
        columns: IndexMap::from([
            ("id".into(), ColumnDef::optional(ColumnKind::Id)),
            ("name".into(), ColumnDef::required(ColumnKind::String)),
        ]),
        relations: IndexMap::from([
            (
                "members".into(),
                ModelRelation::Many {
                    model: "User".into(),
                    through: memberships(),
                },
            ),
            (
                "messages".into(),
                ModelRelation::ReverseMany {
                    model: "Message".into(),
                    foreign_key: "chat_id".into(),
                },
            ),
        ]),
    }
}

fn user_model() -> ModelInfo {
    ModelInfo {
        name: "User".into(),
        collection: "users".into(),
        columns: IndexMap::from([
            ("id".into(), ColumnDef::optional(ColumnKind::Id)),
            ("name".into(), ColumnDef::required(ColumnKind::String)),
        ]),
        relations: IndexMap::new(),
    }
}

fn message_model() -> ModelInfo {
    ModelInfo {
        name: "Message".into(),
        collection: "messages".into(),
        columns: IndexMap::from([
            ("id".into(), ColumnDef::optional(ColumnKind::Id)),
            ("text".into(), ColumnDef::optional(ColumnKind::String)),
        ]),
        relations: IndexMap::from([(
            "chat".into(),
            ModelRelation::ForwardOne {
                model: "Chat".into(),
                column: "chat_id".into(),
                nullable: false,
            },
        )]),
    }
}

/// The chat schema plus save/delete mutations, built and locked.
pub fn build_registry() -> Registry {
    let mut registry = Registry::new();

    let mut chat_metadata = NodeMetadata::with_fields(["id", "name"]);
    chat_metadata.related_fields.push(RelatedField::nested(
        "members",
        RelatedTypeRef::Direct("User".into()),
    ));
    chat_metadata.lookups.insert("id".into(), InputKind::Id);
    chat_metadata
        .filters
        .insert("paginate".into(), FilterDecl::Pagination);
    chat_metadata
        .filters
        .insert("qs".into(), FilterDecl::Expression);
    registry
        .register_type(
            NodeTypeDecl {
                model: Some(chat_model()),
                metadata: chat_metadata,
                ..NodeTypeDecl::default()
            },
            Some("Chat".into()),
        )
        .unwrap();

    registry
        .register_type(
            NodeTypeDecl {
                model: Some(user_model()),
                metadata: NodeMetadata::with_fields(["id", "name"]),
                ..NodeTypeDecl::default()
            },
            Some("User".into()),
        )
        .unwrap();

    let mut message_metadata = NodeMetadata::with_fields(["id", "text"]);
    message_metadata
        .related_fields
        .push(RelatedField::reverse("Chat", "messages"));
    message_metadata.related_fields.push(RelatedField::nested(
        "chat",
        RelatedTypeRef::Direct("Chat".into()),
    ));
    registry
        .register_type(
            NodeTypeDecl {
                model: Some(message_model()),
                metadata: message_metadata,
                ..NodeTypeDecl::default()
            },
            Some("Message".into()),
        )
        .unwrap();

    registry.register_mutation(MutationDecl {
        name: "save_chat".into(),
        kind: MutationKind::Save {
            type_name: "Chat".into(),
            arguments: ArgumentsSpec::all().excluding(["messages"]),
        },
        description: None,
    });
    registry.register_mutation(MutationDecl {
        name: "delete_chat".into(),
        kind: MutationKind::Delete {
            type_name: "Chat".into(),
        },
        description: None,
    });
    registry.register_mutation(MutationDecl {
        name: "save_message".into(),
        kind: MutationKind::Save {
            type_name: "Message".into(),
            arguments: ArgumentsSpec::all(),
        },
        description: None,
    });

    registry.get_schema().unwrap();
    registry
}

pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.seed(
        "chats",
        vec![
            json::json!({"id": 1, "name": "general"}),
            json::json!({"id": 2, "name": "random"}),
        ],
    );
    store.seed(
        "users",
        vec![
            json::json!({"id": 1, "name": "alice"}),
            json::json!({"id": 2, "name": "bob"}),
            json::json!({"id": 3, "name": "carol"}),
        ],
    );
    store.seed(
        "messages",
        vec![
            json::json!({"id": 1, "chat_id": 1, "text": "hi"}),
            json::json!({"id": 2, "chat_id": 1, "text": "yo"}),
            json::json!({"id": 3, "chat_id": 2, "text": "sup"}),
        ],
    );
    store.seed_association("chat_memberships", &[(1, 1), (1, 2), (2, 2)]);
    store
}

pub fn field(name: &str, arguments: Vec<(&str, json::Value)>, subs: Vec<SelectionNode>) -> FieldNode {
    FieldNode {
        name: name.into(),
        alias: None,
        arguments: arguments
            .into_iter()
            .map(|(key, value)| (key.into(), ArgumentValue::Literal(value)))
            .collect(),
        selection_set: subs,
    }
}

pub fn leaf(name: &str) -> SelectionNode {
    SelectionNode::Field(field(name, Vec::new(), Vec::new()))
}

pub fn document(ty: OperationType, roots: Vec<SelectionNode>) -> Document {
    Document {
        operations: vec![OperationDef {
            ty,
            name: None,
            selection_set: roots,
        }],
        fragments: IndexMap::new(),
    }
}
