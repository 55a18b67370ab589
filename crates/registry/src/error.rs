use storage_types::{FieldName, ModelName, Name, TypeName};

/// Schema declared incorrectly. Fatal at build time; a process serving
/// requests never sees one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("type '{type_name}' declares no storage model")]
    MissingModel { type_name: TypeName },

    #[error("a custom node must be registered under an explicit type name")]
    MissingTypeName,

    #[error("type '{type_name}' declares no field list")]
    MissingFields { type_name: TypeName },

    #[error("lookup '{lookup}' on type '{type_name}' is not a scalar-capable kind")]
    NonScalarLookup { type_name: TypeName, lookup: Name },

    #[error("type '{type_name}' conflicts with an already registered node")]
    DuplicateNode { type_name: TypeName },

    #[error("registry is locked; '{type_name}' cannot be added after schema construction")]
    Locked { type_name: TypeName },

    #[error("no registered types found during schema creation")]
    NoRegisteredTypes,

    #[error("reverse field '{field}' on '{type_name}' references unregistered type '{target}'")]
    ReverseTargetNotFound {
        type_name: TypeName,
        field: FieldName,
        target: TypeName,
    },

    #[error("related field '{field}' on '{type_name}' references unknown type '{reference}'")]
    UnknownRelatedType {
        type_name: TypeName,
        field: FieldName,
        reference: Name,
    },

    #[error("related field '{field}' on '{type_name}' has no matching relation on model '{model}'")]
    UnknownRelationField {
        type_name: TypeName,
        field: FieldName,
        model: ModelName,
    },

    #[error("mutation '{mutation}' targets unregistered type '{type_name}'")]
    MutationTargetNotFound { mutation: Name, type_name: TypeName },
}

/// Lookup failures at request time; surfaced as structured field
/// errors, never process crashes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFoundError {
    #[error("node not found for key '{key}'")]
    NodeNotFound { key: String },

    #[error("no registered type for model '{model}'")]
    RelatedTypeNotFound { model: ModelName },
}
