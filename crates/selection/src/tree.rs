use indexmap::IndexMap;
use serde::Serialize;

use storage_types::{Name, Value};

/// One node of a parsed request tree. Created fresh per request,
/// immutable once constructed, discarded after its fetch plan has been
/// built.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Selection {
    pub attribute: Name,
    /// Filter arguments for this level, keys already snake_cased.
    /// Multiple arguments compose as AND.
    pub filters: IndexMap<Name, Value>,
    pub sub_selections: Vec<Selection>,
    pub alias: Option<Name>,
}

impl Selection {
    pub fn new(attribute: impl Into<Name>) -> Selection {
        Selection {
            attribute: attribute.into(),
            filters: IndexMap::new(),
            sub_selections: Vec::new(),
            alias: None,
        }
    }

    /// Whether this selection or any sub-selection asks for `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.attribute == name
            || self
                .sub_selections
                .iter()
                .any(|sub| sub.has_field(name))
    }
}
