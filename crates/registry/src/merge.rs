//! Explicit metadata merging, the composition replacing mixin
//! inheritance: iterable attributes union, keyed attributes merge with
//! the right-hand side winning, and the `All` fields sentinel survives
//! any merge.

use indexmap::IndexMap;

use crate::declaration::{FieldsSelection, NodeMetadata};

/// Folds `extension` (a mixin's metadata) into `base`.
pub fn merge_metadata(base: &NodeMetadata, extension: &NodeMetadata) -> NodeMetadata {
    let fields = match (&base.fields, &extension.fields) {
        (Some(FieldsSelection::All), _) | (_, Some(FieldsSelection::All)) => {
            Some(FieldsSelection::All)
        }
        (Some(FieldsSelection::Named(a)), Some(FieldsSelection::Named(b))) => {
            let mut merged = a.clone();
            for field in b {
                if !merged.contains(field) {
                    merged.push(field.clone());
                }
            }
            Some(FieldsSelection::Named(merged))
        }
        (Some(named), None) | (None, Some(named)) => Some(named.clone()),
        (None, None) => None,
    };

    let mut extra_fields = base.extra_fields.clone();
    for field in &extension.extra_fields {
        if !extra_fields.iter().any(|existing| existing.name == field.name) {
            extra_fields.push(field.clone());
        }
    }

    let mut related_fields = base.related_fields.clone();
    for field in &extension.related_fields {
        if !related_fields.contains(field) {
            related_fields.push(field.clone());
        }
    }

    NodeMetadata {
        fields,
        extra_fields,
        related_fields,
        lookups: merge_keyed(&base.lookups, &extension.lookups),
        filters: merge_keyed(&base.filters, &extension.filters),
        select_related: merge_keyed(&base.select_related, &extension.select_related),
        prefetch_related: merge_keyed(&base.prefetch_related, &extension.prefetch_related),
    }
}

fn merge_keyed<K: Clone + std::hash::Hash + Eq, V: Clone>(
    a: &IndexMap<K, V>,
    b: &IndexMap<K, V>,
) -> IndexMap<K, V> {
    let mut merged = a.clone();
    for (key, value) in b {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
