//! The already-parsed wire request (operations, fields, arguments,
//! fragments, variables) and its reduction to the internal selection
//! tree the planner walks.

pub mod ast;
pub mod literal;
pub mod parse;
pub mod tree;

pub use ast::{ArgumentValue, Document, FieldNode, FragmentDef, OperationDef, OperationType, SelectionNode};
pub use literal::parse_literal;
pub use parse::{parse_request, ParseError, ParsedOperation, ParsedRoot};
pub use tree::Selection;
