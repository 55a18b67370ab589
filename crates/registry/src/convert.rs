//! The pluggable conversion table from relational column kinds to
//! mutation/lookup input kinds.

use serde::Serialize;

use crate::model::{ColumnKind, ModelRelation};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    Id,
    Int,
    Float,
    Boolean,
    String,
    DateTime,
    Date,
    Time,
    Json,
    Uuid,
    /// The `{action, ids}` shape for many-valued relationship inputs.
    IdListAction,
}

impl InputKind {
    /// Lookup declarations only accept scalar-capable kinds.
    pub fn is_scalar(self) -> bool {
        !matches!(self, InputKind::IdListAction)
    }
}

pub fn column_input_kind(kind: ColumnKind) -> InputKind {
    match kind {
        ColumnKind::Id => InputKind::Id,
        ColumnKind::Integer => InputKind::Int,
        ColumnKind::Float => InputKind::Float,
        ColumnKind::Boolean => InputKind::Boolean,
        ColumnKind::String => InputKind::String,
        ColumnKind::DateTime => InputKind::DateTime,
        ColumnKind::Date => InputKind::Date,
        ColumnKind::Time => InputKind::Time,
        ColumnKind::Json => InputKind::Json,
        ColumnKind::Uuid => InputKind::Uuid,
    }
}

pub fn relation_input_kind(relation: &ModelRelation) -> InputKind {
    match relation {
        ModelRelation::ForwardOne { .. } => InputKind::Id,
        ModelRelation::Many { .. } | ModelRelation::ReverseMany { .. } => InputKind::IdListAction,
    }
}
