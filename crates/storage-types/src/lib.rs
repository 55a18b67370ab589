//! Shared vocabulary between schema registration, query planning and
//! execution: scalar values, materialized rows, relational fetch plans
//! and the `Datastore` capability the engine executes them against.

pub mod datastore;
pub mod deadline;
pub mod names;
pub mod plan;
pub mod value;

pub use datastore::{Datastore, StoreError, ThroughTable};
pub use deadline::{Deadline, DeadlineExceeded};
pub use names::{CollectionName, FieldName, ModelName, Name, TypeName};
pub use plan::{EagerLoad, Lookup, OrderBy, Pagination, Predicate, QueryPlan, RelatedRef, RelationLink};
pub use value::{Related, Row, Value};
