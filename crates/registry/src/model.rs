//! Metadata describing the relational substrate a node type is backed
//! by. The storage engine itself is an external collaborator; this is
//! the shape the registry and planner need to know about it.

use indexmap::IndexMap;
use serde::Serialize;

use storage_types::{
    CollectionName, FieldName, ModelName, RelatedRef, RelationLink, ThroughTable,
};

/// Kinds of relational columns the input conversion table recognizes.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Id,
    Integer,
    Float,
    Boolean,
    String,
    DateTime,
    Date,
    Time,
    Json,
    Uuid,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub kind: ColumnKind,
    /// Whether a value must be supplied on create (no default, not
    /// nullable).
    pub required: bool,
}

impl ColumnDef {
    pub fn required(kind: ColumnKind) -> ColumnDef {
        ColumnDef {
            kind,
            required: true,
        }
    }

    pub fn optional(kind: ColumnKind) -> ColumnDef {
        ColumnDef {
            kind,
            required: false,
        }
    }
}

/// A relationship declared on the storage model.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub enum ModelRelation {
    /// Foreign key or one-to-one: this model's `column` holds the
    /// related row's id.
    ForwardOne {
        model: ModelName,
        column: FieldName,
        nullable: bool,
    },
    /// Many-to-many through an explicitly declared association table.
    Many {
        model: ModelName,
        through: ThroughTable,
    },
    /// Reverse side of a foreign key: related rows hold this model's
    /// id in `foreign_key`.
    ReverseMany {
        model: ModelName,
        foreign_key: FieldName,
    },
}

impl ModelRelation {
    pub fn target(&self) -> &ModelName {
        match self {
            ModelRelation::ForwardOne { model, .. }
            | ModelRelation::Many { model, .. }
            | ModelRelation::ReverseMany { model, .. } => model,
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(
            self,
            ModelRelation::Many { .. } | ModelRelation::ReverseMany { .. }
        )
    }

    pub fn link(&self) -> RelationLink {
        match self {
            ModelRelation::ForwardOne { column, .. } => RelationLink::Parent {
                column: column.clone(),
            },
            ModelRelation::Many { through, .. } => RelationLink::Through(through.clone()),
            ModelRelation::ReverseMany { foreign_key, .. } => RelationLink::Child {
                column: foreign_key.clone(),
            },
        }
    }

    pub fn through(&self) -> Option<&ThroughTable> {
        match self {
            ModelRelation::Many { through, .. } => Some(through),
            _ => None,
        }
    }
}

/// One registered storage model.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ModelInfo {
    pub name: ModelName,
    pub collection: CollectionName,
    pub columns: IndexMap<FieldName, ColumnDef>,
    pub relations: IndexMap<FieldName, ModelRelation>,
}

impl ModelInfo {
    pub fn relation(&self, field: &str) -> Option<&ModelRelation> {
        self.relations.get(field)
    }

    /// `RelatedRef` for a relation field, given the target model's
    /// collection.
    pub fn related_ref(&self, field: &str, target_collection: &CollectionName) -> Option<RelatedRef> {
        self.relation(field).map(|relation| RelatedRef {
            collection: target_collection.clone(),
            link: relation.link(),
        })
    }
}
