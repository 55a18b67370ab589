//! The resolved view of a registered node type, consumed by the
//! planner and the mutation executor.

use indexmap::IndexMap;

use storage_types::names::camel_to_snake;
use storage_types::{FieldName, Name, Predicate, TypeName};

use crate::declaration::{
    FieldResolver, FilterDecl, NodeMetadata, NodeTypeDecl, RelatedField, RelatedKind,
    RootResolver,
};
use crate::convert::InputKind;
use crate::model::ModelInfo;

#[derive(Clone, Debug)]
pub struct NodeType {
    pub type_name: TypeName,
    pub model: Option<ModelInfo>,
    pub metadata: NodeMetadata,
    pub base_filter: Option<Predicate>,
    pub description: Option<String>,
    pub verbose_name: Option<Name>,
    pub resolvers: IndexMap<FieldName, FieldResolver>,
    pub root_resolver: Option<RootResolver>,
    pub arguments: IndexMap<Name, InputKind>,
}

impl NodeType {
    pub fn from_decl(type_name: TypeName, decl: NodeTypeDecl, metadata: NodeMetadata) -> NodeType {
        NodeType {
            type_name,
            model: decl.model,
            metadata,
            base_filter: decl.base_filter,
            description: decl.description,
            verbose_name: decl.verbose_name,
            resolvers: decl.resolvers,
            root_resolver: decl.root_resolver,
            arguments: decl.arguments,
        }
    }

    pub fn is_model_node(&self) -> bool {
        self.model.is_some()
    }

    /// The root query field name: the declared verbose name, or the
    /// snake_cased type name (minus a trailing `_type`) pluralized.
    pub fn root_field_name(&self) -> Name {
        if let Some(verbose) = &self.verbose_name {
            return verbose.clone();
        }
        let snake = camel_to_snake(&self.type_name);
        let stem = snake.strip_suffix("_type").unwrap_or(&snake);
        Name::new(format!("{stem}s"))
    }

    pub fn nested_fields(&self) -> impl Iterator<Item = &RelatedField> {
        self.metadata
            .related_fields
            .iter()
            .filter(|field| field.kind == RelatedKind::Nested)
    }

    pub fn reverse_fields(&self) -> impl Iterator<Item = &RelatedField> {
        self.metadata
            .related_fields
            .iter()
            .filter(|field| field.kind == RelatedKind::Reverse)
    }

    pub fn nested_field(&self, name: &str) -> Option<&RelatedField> {
        self.nested_fields().find(|field| field.name == name)
    }

    /// Maps a schema-level alias back to the underlying relation
    /// attribute; unknown names pass through unchanged.
    pub fn alias_to_attribute<'a>(&'a self, alias: &'a str) -> &'a str {
        for field in self.nested_fields() {
            if field.name == alias || field.alias.as_deref() == Some(alias) {
                return &field.name;
            }
        }
        alias
    }

    pub fn has_custom_resolver(&self, attribute: &str) -> bool {
        self.resolvers.contains_key(attribute)
            || self
                .metadata
                .extra_fields
                .iter()
                .any(|extra| extra.name == attribute)
    }

    pub fn field_resolver(&self, attribute: &str) -> Option<&FieldResolver> {
        self.resolvers.get(attribute).or_else(|| {
            self.metadata
                .extra_fields
                .iter()
                .find(|extra| extra.name == attribute)
                .map(|extra| &extra.resolver)
        })
    }

    pub fn filter_decls(&self) -> &IndexMap<Name, FilterDecl> {
        &self.metadata.filters
    }

    /// Arguments accepted by this node's list fields: declared lookups
    /// plus one argument per declared filter.
    pub fn list_arguments(&self) -> IndexMap<Name, InputKind> {
        let mut arguments = self.metadata.lookups.clone();
        for name in self.metadata.filters.keys() {
            arguments.entry(name.clone()).or_insert(InputKind::Json);
        }
        arguments
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
