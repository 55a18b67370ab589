use indexmap::IndexMap;
use serde::Serialize;

use crate::names::{CollectionName, FieldName};
use crate::plan::{QueryPlan, RelatedRef};
use crate::value::{Row, Value};

/// Association (through) table metadata for a many-to-many relation.
/// Column names are declared explicitly; they are never derived from
/// model names.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ThroughTable {
    pub table: CollectionName,
    /// Column referencing the owning side of the relation.
    pub left_column: FieldName,
    /// Column referencing the related side.
    pub right_column: FieldName,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("collection '{collection}' not found")]
    CollectionNotFound { collection: CollectionName },

    #[error("no row with id {id:?} in collection '{collection}'")]
    RowNotFound {
        collection: CollectionName,
        id: Value,
    },

    #[error("unsupported lookup '{key}' on collection '{collection}'")]
    UnsupportedLookup {
        collection: CollectionName,
        key: FieldName,
    },

    #[error("datastore error: {description}")]
    Other { description: String },
}

/// The querying capability of the relational substrate. The planner
/// produces `QueryPlan` values; this is the single seam they cross to
/// become rows.
pub trait Datastore {
    /// Executes a fetch plan, including its eager-loads, and returns
    /// materialized rows.
    fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Row>, StoreError>;

    fn get(&self, collection: &CollectionName, id: &Value) -> Result<Row, StoreError>;

    fn insert(
        &self,
        collection: &CollectionName,
        values: IndexMap<FieldName, Value>,
    ) -> Result<Row, StoreError>;

    fn update(
        &self,
        collection: &CollectionName,
        id: &Value,
        values: IndexMap<FieldName, Value>,
    ) -> Result<Row, StoreError>;

    fn delete(&self, collection: &CollectionName, id: &Value) -> Result<(), StoreError>;

    /// The live collection behind a many-valued relation of one
    /// already-materialized parent row.
    fn related_rows(&self, related: &RelatedRef, parent: &Row) -> Result<Vec<Row>, StoreError>;

    /// Inserts association rows for every `(left, right)` pair.
    fn associate(&self, through: &ThroughTable, pairs: &[(Value, Value)])
        -> Result<(), StoreError>;

    /// Deletes association rows for the given left ids. `right_ids` of
    /// `None` removes every association of those rows.
    fn dissociate(
        &self,
        through: &ThroughTable,
        left_ids: &[Value],
        right_ids: Option<&[Value]>,
    ) -> Result<(), StoreError>;
}
