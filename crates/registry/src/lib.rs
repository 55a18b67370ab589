//! The type registry: collects declared node types and mutations,
//! validates and merges their metadata, resolves reverse and deferred
//! relationships, and wires everything into one locked schema graph.

pub mod convert;
pub mod declaration;
pub mod error;
pub mod merge;
pub mod model;
pub mod node;
pub mod registry;
pub mod schema;

pub use convert::InputKind;
pub use declaration::{
    ArgumentsBase, ArgumentsSpec, ExtraField, FieldResolver, FieldsSelection, FilterDecl,
    MutationDecl, MutationKind, NodeMetadata, NodeTypeDecl, RelatedField, RelatedKind,
    RelatedTypeRef, RootResolver,
};
pub use error::{ConfigurationError, NotFoundError};
pub use model::{ColumnDef, ColumnKind, ModelInfo, ModelRelation};
pub use node::NodeType;
pub use registry::{Registry, TypeKey};
pub use schema::{MutationField, RootField, RootFieldKind, Schema};
