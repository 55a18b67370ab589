//! Wire-level request AST. Producing this from GraphQL syntax is the
//! job of an external parser; the engine consumes it as data.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json as json;

use storage_types::Name;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Document {
    pub operations: Vec<OperationDef>,
    #[serde(default)]
    pub fragments: IndexMap<Name, FragmentDef>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OperationDef {
    pub ty: OperationType,
    pub name: Option<Name>,
    pub selection_set: Vec<SelectionNode>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FragmentDef {
    pub name: Name,
    pub type_condition: Option<Name>,
    pub selection_set: Vec<SelectionNode>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionNode {
    Field(FieldNode),
    FragmentSpread { name: Name },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FieldNode {
    pub name: Name,
    #[serde(default)]
    pub alias: Option<Name>,
    #[serde(default)]
    pub arguments: IndexMap<Name, ArgumentValue>,
    #[serde(default)]
    pub selection_set: Vec<SelectionNode>,
}

impl FieldNode {
    /// The name the response (and operation matching) keys this field
    /// by: the alias when present, the field name otherwise.
    pub fn response_key(&self) -> &Name {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

/// An argument as it arrives off the wire: a scalar/structured literal
/// or a reference to a bound variable.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArgumentValue {
    Literal(json::Value),
    Variable(Name),
    List(Vec<ArgumentValue>),
    Object(IndexMap<Name, ArgumentValue>),
}
