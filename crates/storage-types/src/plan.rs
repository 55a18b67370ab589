use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::datastore::ThroughTable;
use crate::names::{CollectionName, FieldName};
use crate::value::Value;

/// One `key = literal` clause. The key may carry a datastore lookup
/// suffix (`id__in`, `name__contains`); interpreting the suffix is the
/// datastore's concern.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Lookup {
    pub key: FieldName,
    pub value: Value,
}

impl Lookup {
    pub fn new(key: impl Into<FieldName>, value: Value) -> Lookup {
        Lookup {
            key: key.into(),
            value,
        }
    }
}

/// A flat conjunction or disjunction of lookups. The two operators
/// never mix within one predicate.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub enum Predicate {
    And(Vec<Lookup>),
    Or(Vec<Lookup>),
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub field: FieldName,
    pub descending: bool,
}

impl OrderBy {
    /// Parses the wire form where a leading `-` reverses the order.
    pub fn from_key(key: &str) -> OrderBy {
        match key.strip_prefix('-') {
            Some(field) => OrderBy {
                field: field.into(),
                descending: true,
            },
            None => OrderBy {
                field: key.into(),
                descending: false,
            },
        }
    }
}

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// How two collections connect, resolved from the relation declaration
/// so the datastore never infers column names.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub enum RelationLink {
    /// The parent row holds the related id in `column` (foreign key,
    /// one-to-one).
    Parent { column: FieldName },
    /// Related rows hold the parent id in `column` (reverse foreign
    /// key).
    Child { column: FieldName },
    /// Association table between the two sides.
    Through(ThroughTable),
}

/// A resolved pointer to a related collection.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RelatedRef {
    pub collection: CollectionName,
    pub link: RelationLink,
}

/// An instruction to fetch a relation together with its parent as one
/// additional query, pre-filtered and pre-ordered as a unit.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EagerLoad {
    /// The relation attribute on the parent the loaded rows attach to.
    pub relation: FieldName,
    pub related: RelatedRef,
    pub plan: QueryPlan,
}

/// A single relational fetch: one root query plus one eager-load per
/// requested child selection. Filters only ever narrow `filters` /
/// `excludes`; pagination is applied after every other filter.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct QueryPlan {
    pub collection: CollectionName,
    pub filters: Vec<Predicate>,
    pub excludes: Vec<Predicate>,
    pub order_by: Option<OrderBy>,
    pub distinct: bool,
    pub pagination: Option<Pagination>,
    /// Single-valued relations to join eagerly. Empty means fetch
    /// nothing extra, not fetch everything.
    pub select: BTreeMap<FieldName, RelatedRef>,
    pub eager_loads: IndexMap<FieldName, EagerLoad>,
}

impl QueryPlan {
    pub fn for_collection(collection: impl Into<CollectionName>) -> QueryPlan {
        QueryPlan {
            collection: collection.into(),
            filters: Vec::new(),
            excludes: Vec::new(),
            order_by: None,
            distinct: false,
            pagination: None,
            select: BTreeMap::new(),
            eager_loads: IndexMap::new(),
        }
    }

    pub fn filtered(mut self, predicate: Predicate) -> QueryPlan {
        self.filters.push(predicate);
        self
    }
}
