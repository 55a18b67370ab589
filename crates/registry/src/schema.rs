//! The finalized schema graph: root query and mutation fields wired to
//! their node types. Built once by the registry, read-only afterwards.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use storage_types::{Name, TypeName};

use crate::convert::InputKind;
use crate::declaration::MutationKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootFieldKind {
    /// A storage-backed node exposed as a list with its default
    /// queryset resolver.
    ModelList,
    /// A custom node resolved by its own root resolver.
    Custom,
}

#[derive(Clone, Debug)]
pub struct RootField {
    pub type_name: TypeName,
    pub kind: RootFieldKind,
    pub arguments: IndexMap<Name, InputKind>,
    pub description: Option<String>,
}

#[derive(Clone, Debug)]
pub struct MutationField {
    pub kind: MutationKind,
    pub arguments: IndexMap<Name, InputKind>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub query_fields: BTreeMap<Name, RootField>,
    pub mutation_fields: BTreeMap<Name, MutationField>,
}

impl Schema {
    pub fn query_field(&self, name: &str) -> Option<&RootField> {
        self.query_fields.get(name)
    }

    pub fn mutation_field(&self, name: &str) -> Option<&MutationField> {
        self.mutation_fields.get(name)
    }
}
