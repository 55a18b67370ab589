//! The registry proper: node bookkeeping, conflict detection, the
//! lock/reset lifecycle and schema construction.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::{debug, warn};

use storage_types::names::camel_to_snake;
use storage_types::{Name, TypeName};

use crate::convert::{column_input_kind, relation_input_kind, InputKind};
use crate::declaration::{
    ArgumentsBase, ArgumentsSpec, MutationDecl, MutationKind, NodeTypeDecl, RelatedField,
    RelatedKind, RelatedTypeRef,
};
use crate::error::{ConfigurationError, NotFoundError};
use crate::merge::merge_metadata;
use crate::model::ModelInfo;
use crate::node::NodeType;
use crate::schema::{MutationField, RootField, RootFieldKind, Schema};

/// Universal lookup key: a node is addressable by its schema name or
/// by its underlying storage model.
#[derive(Clone, Copy, Debug)]
pub enum TypeKey<'a> {
    Name(&'a str),
    Model(&'a str),
}

/// A node type admitted into the registry. Two registered nodes
/// conflict when their schema name or their underlying storage model
/// coincide.
#[derive(Clone, Debug)]
struct RegisteredNode {
    node: NodeType,
}

impl RegisteredNode {
    fn conflicts_with(&self, other: &NodeType) -> bool {
        if self.node.type_name == other.type_name {
            return true;
        }
        match (&self.node.model, &other.model) {
            (Some(a), Some(b)) => a.name == b.name,
            _ => false,
        }
    }
}

/// Central catalogue of node types and mutations. Mutable only during
/// the build phase; `get_schema` locks it, after which all reads are
/// safe to share.
#[derive(Debug, Default)]
pub struct Registry {
    nodes: Vec<RegisteredNode>,
    mutations: Vec<MutationDecl>,
    schema: Option<Schema>,
    locked: bool,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Validates and admits a node type declaration. Mixin metadata is
    /// merged here, explicitly, in declaration order.
    pub fn register_type(
        &mut self,
        decl: NodeTypeDecl,
        typename: Option<TypeName>,
    ) -> Result<TypeName, ConfigurationError> {
        let type_name = match typename.or_else(|| decl.model.as_ref().map(|m| m.name.clone())) {
            Some(name) => name,
            None => return Err(ConfigurationError::MissingTypeName),
        };

        if self.locked {
            return Err(ConfigurationError::Locked { type_name });
        }

        let mut metadata = decl.metadata.clone();
        for mixin in &decl.mixins {
            metadata = merge_metadata(&metadata, mixin);
        }

        if decl.model.is_some() {
            if metadata.fields.is_none() {
                return Err(ConfigurationError::MissingFields { type_name });
            }
            for (lookup, kind) in &metadata.lookups {
                if !kind.is_scalar() {
                    return Err(ConfigurationError::NonScalarLookup {
                        type_name,
                        lookup: lookup.clone(),
                    });
                }
            }
        }

        let node = NodeType::from_decl(type_name.clone(), decl, metadata);

        if let Some(existing) = self.nodes.iter().find(|n| n.conflicts_with(&node)) {
            debug!(
                existing = %existing.node.type_name,
                rejected = %type_name,
                "duplicate node registration rejected"
            );
            return Err(ConfigurationError::DuplicateNode { type_name });
        }

        self.nodes.push(RegisteredNode { node });
        Ok(type_name)
    }

    /// Appends a mutation; it is wired into the root mutation type
    /// lazily when the schema compiles.
    pub fn register_mutation(&mut self, decl: MutationDecl) {
        self.mutations.push(decl);
    }

    /// Universal type lookup across schema name and storage model.
    pub fn get_type(
        &self,
        key: TypeKey<'_>,
        include_custom: bool,
    ) -> Result<&NodeType, NotFoundError> {
        self.nodes
            .iter()
            .map(|registered| &registered.node)
            .filter(|node| include_custom || node.is_model_node())
            .find(|node| match key {
                TypeKey::Name(name) => node.type_name == name,
                TypeKey::Model(model) => node
                    .model
                    .as_ref()
                    .is_some_and(|info| info.name == model),
            })
            .ok_or_else(|| NotFoundError::NodeNotFound {
                key: match key {
                    TypeKey::Name(name) => format!("name={name}"),
                    TypeKey::Model(model) => format!("model={model}"),
                },
            })
    }

    pub fn get_type_by_name(&self, name: &str) -> Result<&NodeType, NotFoundError> {
        self.get_type(TypeKey::Name(name), false)
    }

    pub fn get_type_for_model(&self, model: &str) -> Result<&NodeType, NotFoundError> {
        self.get_type(TypeKey::Model(model), false).map_err(|_| {
            NotFoundError::RelatedTypeNotFound {
                model: model.into(),
            }
        })
    }

    /// The finalized schema; `None` until `get_schema` has run.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Idempotent schema construction: resolves reverse and deferred
    /// relationships, locks the node set, and assembles the root
    /// query/mutation fields. Later calls return the cached schema.
    pub fn get_schema(&mut self) -> Result<&Schema, ConfigurationError> {
        let schema = match self.schema.take() {
            Some(schema) => schema,
            None => self.construct_schema()?,
        };
        Ok(self.schema.insert(schema))
    }

    /// Discards all nodes, mutations and the built schema. The only
    /// supported way to mutate a locked registry.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.mutations.clear();
        self.schema = None;
        self.locked = false;
    }

    fn construct_schema(&mut self) -> Result<Schema, ConfigurationError> {
        if !self.nodes.iter().any(|n| n.node.is_model_node()) {
            return Err(ConfigurationError::NoRegisteredTypes);
        }

        self.register_inline_types()?;
        self.transform_reverse_to_nested()?;
        self.resolve_related_refs()?;
        self.validate_relations()?;
        self.locked = true;

        let mut query_fields = BTreeMap::new();
        for node in self.model_nodes() {
            query_fields.insert(
                node.root_field_name(),
                RootField {
                    type_name: node.type_name.clone(),
                    kind: RootFieldKind::ModelList,
                    arguments: node.list_arguments(),
                    description: node.description.clone(),
                },
            );
        }
        for node in self.custom_nodes() {
            if node.root_resolver.is_none() {
                warn!(type_name = %node.type_name, "custom node has no resolver, skipping");
                continue;
            }
            query_fields.insert(
                Name::new(camel_to_snake(&node.type_name)),
                RootField {
                    type_name: node.type_name.clone(),
                    kind: RootFieldKind::Custom,
                    arguments: node.arguments.clone(),
                    description: node.description.clone(),
                },
            );
        }

        let mut mutation_fields = BTreeMap::new();
        for decl in &self.mutations {
            let arguments = self.mutation_arguments(decl)?;
            mutation_fields.insert(
                decl.name.clone(),
                MutationField {
                    kind: decl.kind.clone(),
                    arguments,
                    description: decl.description.clone(),
                },
            );
        }

        debug!(
            queries = query_fields.len(),
            mutations = mutation_fields.len(),
            "schema constructed"
        );

        Ok(Schema {
            query_fields,
            mutation_fields,
        })
    }

    fn model_nodes(&self) -> impl Iterator<Item = &NodeType> {
        self.nodes
            .iter()
            .map(|n| &n.node)
            .filter(|node| node.is_model_node())
    }

    fn custom_nodes(&self) -> impl Iterator<Item = &NodeType> {
        self.nodes
            .iter()
            .map(|n| &n.node)
            .filter(|node| !node.is_model_node())
    }

    /// Registers the declarations carried by `Inline` references,
    /// repeating until no unregistered reference remains so inline
    /// types can themselves reference further inline types.
    fn register_inline_types(&mut self) -> Result<(), ConfigurationError> {
        loop {
            let mut pending: Vec<(TypeName, NodeTypeDecl)> = Vec::new();
            for registered in &self.nodes {
                for field in &registered.node.metadata.related_fields {
                    let RelatedTypeRef::Inline { type_name, decl } = &field.target else {
                        continue;
                    };
                    let known = self.nodes.iter().any(|n| n.node.type_name == *type_name)
                        || pending.iter().any(|(name, _)| name == type_name);
                    if !known {
                        pending.push((type_name.clone(), (**decl).clone()));
                    }
                }
            }
            if pending.is_empty() {
                return Ok(());
            }
            for (type_name, decl) in pending {
                debug!(type_name = %type_name, "registering inline related type");
                self.register_type(decl, Some(type_name))?;
            }
        }
    }

    /// Every declared reverse relation becomes a nested relation on
    /// the referenced type. This is how cyclic bidirectional edges are
    /// declared exactly once.
    fn transform_reverse_to_nested(&mut self) -> Result<(), ConfigurationError> {
        let mut additions: Vec<(usize, RelatedField)> = Vec::new();

        for registered in &self.nodes {
            let node = &registered.node;
            if !node.is_model_node() {
                continue;
            }
            for reverse in node.reverse_fields() {
                let target_name = reverse.target.referenced(&node.type_name);
                let target_index = self
                    .nodes
                    .iter()
                    .position(|n| n.node.is_model_node() && n.node.type_name == target_name)
                    .ok_or_else(|| ConfigurationError::ReverseTargetNotFound {
                        type_name: node.type_name.clone(),
                        field: reverse.name.clone(),
                        target: target_name.clone(),
                    })?;

                let mut nested =
                    RelatedField::nested(reverse.name.clone(), RelatedTypeRef::Direct(node.type_name.clone()));
                nested.alias = reverse.alias.clone();
                nested.reverse_key = reverse.reverse_key.clone();
                additions.push((target_index, nested));
            }
        }

        for (index, nested) in additions {
            let target = &mut self.nodes[index].node;
            if target.nested_field(&nested.name).is_none() {
                target.metadata.related_fields.push(nested);
            }
        }
        Ok(())
    }

    /// Rewrites `SelfRef`, `Deferred` and `Inline` references to
    /// `Direct` in one pass over the full registry, and checks every
    /// target exists.
    fn resolve_related_refs(&mut self) -> Result<(), ConfigurationError> {
        let known: Vec<TypeName> = self
            .model_nodes()
            .map(|node| node.type_name.clone())
            .collect();

        for registered in &mut self.nodes {
            let node = &mut registered.node;
            let owner = node.type_name.clone();
            for field in &mut node.metadata.related_fields {
                if field.kind != RelatedKind::Nested {
                    continue;
                }
                let resolved = field.target.referenced(&owner);
                if !known.contains(&resolved) {
                    return Err(ConfigurationError::UnknownRelatedType {
                        type_name: owner,
                        field: field.name.clone(),
                        reference: resolved,
                    });
                }
                field.target = RelatedTypeRef::Direct(resolved);
            }
        }
        Ok(())
    }

    /// Every nested field must map onto a relation of the backing
    /// storage model, otherwise the planner could never link it.
    fn validate_relations(&self) -> Result<(), ConfigurationError> {
        for node in self.model_nodes() {
            let Some(model) = node.model.as_ref() else {
                continue;
            };
            for field in node.nested_fields() {
                if model.relation(&field.name).is_none() {
                    return Err(ConfigurationError::UnknownRelationField {
                        type_name: node.type_name.clone(),
                        field: field.name.clone(),
                        model: model.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn mutation_arguments(
        &self,
        decl: &MutationDecl,
    ) -> Result<IndexMap<Name, InputKind>, ConfigurationError> {
        match &decl.kind {
            MutationKind::Save {
                type_name,
                arguments,
            } => {
                let node = self.get_type_by_name(type_name).map_err(|_| {
                    ConfigurationError::MutationTargetNotFound {
                        mutation: decl.name.clone(),
                        type_name: type_name.clone(),
                    }
                })?;
                let model = node.model.as_ref().ok_or_else(|| {
                    ConfigurationError::MutationTargetNotFound {
                        mutation: decl.name.clone(),
                        type_name: type_name.clone(),
                    }
                })?;
                Ok(derive_arguments(model, arguments))
            }
            MutationKind::Delete { .. } => {
                Ok(IndexMap::from([(Name::new("id"), InputKind::Id)]))
            }
            MutationKind::Custom { arguments, .. } => Ok(arguments.clone()),
        }
    }
}

/// Derives mutation arguments from the model through the conversion
/// table, honoring include/exclude/extra.
fn derive_arguments(model: &ModelInfo, spec: &ArgumentsSpec) -> IndexMap<Name, InputKind> {
    let mut arguments: IndexMap<Name, InputKind> = match &spec.base {
        ArgumentsBase::Explicit(explicit) => explicit.clone(),
        ArgumentsBase::All => derive_from_model(model, None),
        ArgumentsBase::Include(include) => derive_from_model(model, Some(include)),
    };

    for (name, kind) in &spec.extra {
        arguments.insert(name.clone(), *kind);
    }
    for name in &spec.exclude {
        arguments.shift_remove(name);
    }
    arguments
}

fn derive_from_model(
    model: &ModelInfo,
    include: Option<&Vec<storage_types::FieldName>>,
) -> IndexMap<Name, InputKind> {
    let wanted = |name: &str| include.is_none_or(|list| list.iter().any(|f| f == name));

    let mut arguments = IndexMap::new();
    for (name, column) in &model.columns {
        if wanted(name) {
            arguments.insert(name.clone(), column_input_kind(column.kind));
        }
    }
    // Relation inputs come after plain columns, like the source model
    // field ordering.
    for (name, relation) in &model.relations {
        if wanted(name) {
            arguments.insert(name.clone(), relation_input_kind(relation));
        }
    }
    arguments
}
