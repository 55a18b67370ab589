//! Declarative descriptions of node types and mutations, the input to
//! the registry. Declarations are plain data; "mixin" behavior is an
//! explicit metadata merge, not inheritance.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json as json;

use storage_types::{Datastore, FieldName, Name, Predicate, Row, TypeName, Value};

use crate::convert::InputKind;
use crate::model::ModelInfo;

/// The declared field allowlist. `All` is the `__all__` sentinel: it
/// survives metadata merges instead of being replaced by a concrete
/// list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldsSelection {
    All,
    Named(Vec<FieldName>),
}

impl FieldsSelection {
    pub fn contains(&self, field: &str) -> bool {
        match self {
            FieldsSelection::All => true,
            FieldsSelection::Named(fields) => fields.iter().any(|f| f == field),
        }
    }
}

/// Which side of a relationship a declaration describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelatedKind {
    /// Forward: this type owns or points to the related type.
    Nested,
    /// Mirror image, declared here and transformed into a `Nested`
    /// field on the referenced type during schema construction.
    Reverse,
}

/// Reference to the related node type. `SelfRef` and `Deferred` are
/// resolved to `Direct` in one pass once the full registry is known;
/// `Inline` carries the referenced type's own declaration, registered
/// transitively during schema construction.
#[derive(Clone, Debug)]
pub enum RelatedTypeRef {
    Direct(TypeName),
    SelfRef,
    Deferred(Name),
    Inline {
        type_name: TypeName,
        decl: Box<NodeTypeDecl>,
    },
}

impl RelatedTypeRef {
    pub fn inline(type_name: impl Into<TypeName>, decl: NodeTypeDecl) -> RelatedTypeRef {
        RelatedTypeRef::Inline {
            type_name: type_name.into(),
            decl: Box::new(decl),
        }
    }

    /// The referenced type's name, with `owner` standing in for a
    /// self reference.
    pub fn referenced(&self, owner: &TypeName) -> TypeName {
        match self {
            RelatedTypeRef::Direct(name) | RelatedTypeRef::Deferred(name) => name.clone(),
            RelatedTypeRef::SelfRef => owner.clone(),
            RelatedTypeRef::Inline { type_name, .. } => type_name.clone(),
        }
    }
}

impl PartialEq for RelatedTypeRef {
    fn eq(&self, other: &RelatedTypeRef) -> bool {
        match (self, other) {
            (RelatedTypeRef::Direct(a), RelatedTypeRef::Direct(b)) => a == b,
            (RelatedTypeRef::Deferred(a), RelatedTypeRef::Deferred(b)) => a == b,
            (RelatedTypeRef::SelfRef, RelatedTypeRef::SelfRef) => true,
            (
                RelatedTypeRef::Inline { type_name: a, .. },
                RelatedTypeRef::Inline { type_name: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

impl Eq for RelatedTypeRef {}

/// Directional edge between two node types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelatedField {
    pub name: FieldName,
    pub kind: RelatedKind,
    pub target: RelatedTypeRef,
    pub alias: Option<FieldName>,
    /// Column on the related model pointing back at this one; used to
    /// create related rows through the relation on mutation.
    pub reverse_key: Option<FieldName>,
}

impl RelatedField {
    pub fn nested(name: impl Into<FieldName>, target: RelatedTypeRef) -> RelatedField {
        RelatedField {
            name: name.into(),
            kind: RelatedKind::Nested,
            target,
            alias: None,
            reverse_key: None,
        }
    }

    /// Declares the mirror edge: `parent` will grow a nested field
    /// called `name` pointing back at the declaring type.
    pub fn reverse(parent: impl Into<TypeName>, name: impl Into<FieldName>) -> RelatedField {
        RelatedField {
            name: name.into(),
            kind: RelatedKind::Reverse,
            target: RelatedTypeRef::Direct(parent.into()),
            alias: None,
            reverse_key: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<FieldName>) -> RelatedField {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_reverse_key(mut self, key: impl Into<FieldName>) -> RelatedField {
        self.reverse_key = Some(key.into());
        self
    }

    /// The name the field appears under in the schema.
    pub fn schema_name(&self) -> &FieldName {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

/// A named filter declaration in a node's metadata. Implementations
/// live in the planner; declarations are data so metadata stays
/// mergeable.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterDecl {
    /// Limit/offset; always applied after every other filter.
    Pagination,
    /// A list of ids, filtered as `id__in`.
    IdList,
    /// The raw expression sub-language: `filter`, `exclude`,
    /// `order_by`, `distinct`.
    Expression,
    /// Equality filter on `field`, restricted to the declared choices.
    Enum {
        field: FieldName,
        choices: IndexMap<Name, String>,
    },
}

/// Builds an enum filter from a choice mapping, the allowed input
/// values being exactly the mapping's keys.
pub fn enum_filter(
    field: impl Into<FieldName>,
    choices: impl IntoIterator<Item = (Name, String)>,
) -> FilterDecl {
    FilterDecl::Enum {
        field: field.into(),
        choices: choices.into_iter().collect(),
    }
}

/// Resolver for a single field on a materialized row.
#[derive(Clone)]
pub enum FieldResolver {
    /// Plain attribute read, `Null` when absent.
    Attribute(FieldName),
    Custom(Arc<dyn Fn(&Row) -> Value + Send + Sync>),
}

impl fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldResolver::Attribute(name) => write!(f, "Attribute({name})"),
            FieldResolver::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Resolver for a custom (non-storage) root field.
#[derive(Clone)]
pub struct RootResolver(
    Arc<dyn Fn(&IndexMap<Name, Value>) -> Result<json::Value, String> + Send + Sync>,
);

impl RootResolver {
    pub fn new(
        resolve: impl Fn(&IndexMap<Name, Value>) -> Result<json::Value, String>
            + Send
            + Sync
            + 'static,
    ) -> RootResolver {
        RootResolver(Arc::new(resolve))
    }

    pub fn call(&self, arguments: &IndexMap<Name, Value>) -> Result<json::Value, String> {
        (self.0)(arguments)
    }
}

impl fmt::Debug for RootResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootResolver(..)")
    }
}

/// Resolver for a custom mutation.
pub type MutationResolverFn =
    Arc<dyn Fn(&dyn Datastore, &IndexMap<Name, Value>) -> Result<json::Value, String> + Send + Sync>;

/// A field that is not a storage-model column, with its own resolver.
#[derive(Clone, Debug)]
pub struct ExtraField {
    pub name: FieldName,
    pub kind: InputKind,
    pub resolver: FieldResolver,
}

/// The mergeable part of a node declaration. Mixins contribute one of
/// these each; `merge::merge_metadata` folds them together.
#[derive(Clone, Debug, Default)]
pub struct NodeMetadata {
    pub fields: Option<FieldsSelection>,
    pub extra_fields: Vec<ExtraField>,
    pub related_fields: Vec<RelatedField>,
    pub lookups: IndexMap<Name, InputKind>,
    pub filters: IndexMap<Name, FilterDecl>,
    /// `{schema field: path to select}`; a plain list declaration
    /// normalizes to an identity mapping.
    pub select_related: IndexMap<FieldName, FieldName>,
    pub prefetch_related: IndexMap<FieldName, FieldName>,
}

impl NodeMetadata {
    pub fn with_fields(fields: impl IntoIterator<Item = &'static str>) -> NodeMetadata {
        NodeMetadata {
            fields: Some(FieldsSelection::Named(
                fields.into_iter().map(FieldName::new).collect(),
            )),
            ..NodeMetadata::default()
        }
    }

    /// Normalizes an iterable hint declaration to the keyed form.
    pub fn identity_hints(items: impl IntoIterator<Item = FieldName>) -> IndexMap<FieldName, FieldName> {
        items.into_iter().map(|item| (item.clone(), item)).collect()
    }
}

/// A complete node type declaration handed to `Registry::register_type`.
#[derive(Clone, Debug, Default)]
pub struct NodeTypeDecl {
    /// Storage model backing this node; `None` declares a custom node.
    pub model: Option<ModelInfo>,
    pub metadata: NodeMetadata,
    /// Inheritable schema metadata merged into `metadata` during
    /// registration.
    pub mixins: Vec<NodeMetadata>,
    /// Base narrowing applied to every fetch of this type.
    pub base_filter: Option<Predicate>,
    pub description: Option<String>,
    /// Overrides the derived root field name.
    pub verbose_name: Option<Name>,
    /// Per-field custom resolvers; fields resolved here are excluded
    /// from relational planning.
    pub resolvers: IndexMap<FieldName, FieldResolver>,
    /// Root resolver of a custom node.
    pub root_resolver: Option<RootResolver>,
    /// Root field arguments of a custom node.
    pub arguments: IndexMap<Name, InputKind>,
}

/// How a mutation's arguments are obtained.
#[derive(Clone, Debug)]
pub enum ArgumentsBase {
    /// Derive every column and relation of the model through the
    /// conversion table.
    All,
    /// Derive only the named model fields.
    Include(Vec<FieldName>),
    Explicit(IndexMap<Name, InputKind>),
}

#[derive(Clone, Debug)]
pub struct ArgumentsSpec {
    pub base: ArgumentsBase,
    pub exclude: Vec<FieldName>,
    pub extra: IndexMap<Name, InputKind>,
}

impl ArgumentsSpec {
    pub fn all() -> ArgumentsSpec {
        ArgumentsSpec {
            base: ArgumentsBase::All,
            exclude: Vec::new(),
            extra: IndexMap::new(),
        }
    }

    pub fn excluding(mut self, fields: impl IntoIterator<Item = &'static str>) -> ArgumentsSpec {
        self.exclude.extend(fields.into_iter().map(FieldName::new));
        self
    }
}

#[derive(Clone)]
pub enum MutationKind {
    /// Create when no id supplied, update otherwise.
    Save {
        type_name: TypeName,
        arguments: ArgumentsSpec,
    },
    Delete { type_name: TypeName },
    Custom {
        resolver: MutationResolverFn,
        arguments: IndexMap<Name, InputKind>,
    },
}

impl fmt::Debug for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Save { type_name, .. } => write!(f, "Save({type_name})"),
            MutationKind::Delete { type_name } => write!(f, "Delete({type_name})"),
            MutationKind::Custom { .. } => write!(f, "Custom(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MutationDecl {
    /// Schema name of the mutation root field.
    pub name: Name,
    pub kind: MutationKind,
    pub description: Option<String>,
}
