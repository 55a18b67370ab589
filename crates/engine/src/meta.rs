//! Per-operation request context. A single transport-level request can
//! batch several named operations; each gets its own `RequestMeta`
//! bucket, with an active pointer switching between them as the roots
//! are executed.

use indexmap::IndexMap;

use storage_types::{Name, Value};

pub const DEFAULT_OPERATION: &str = "default";

/// Contextual metadata for one named query or mutation: who is asking
/// and whatever the reserved `meta` argument carried.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestMeta {
    pub operation: Name,
    pub context: IndexMap<Name, Value>,
}

impl RequestMeta {
    pub fn identity(&self) -> Option<&str> {
        self.context.get("user").and_then(Value::as_str)
    }
}

/// The request-scoped meta mapping. Owned by the request, dropped with
/// it; nothing leaks between requests sharing a worker.
#[derive(Debug, Default)]
pub struct MetaStore {
    metas: IndexMap<Name, RequestMeta>,
    active: Option<Name>,
    warnings: Vec<String>,
    cache_prefix: Option<String>,
}

impl MetaStore {
    pub fn new() -> MetaStore {
        MetaStore::default()
    }

    /// Activates the bucket for one root field, keyed by its alias or
    /// name when the operation registered it, else the default bucket.
    pub fn activate(&mut self, operation: Option<&str>) -> &mut RequestMeta {
        let key = Name::new(operation.unwrap_or(DEFAULT_OPERATION));
        self.active = Some(key.clone());
        self.metas.entry(key.clone()).or_insert_with(|| RequestMeta {
            operation: key,
            context: IndexMap::new(),
        })
    }

    pub fn merge_context(&mut self, context: &IndexMap<Name, Value>) {
        if let Some(active) = self.active_mut() {
            for (key, value) in context {
                active.context.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn active(&self) -> Option<&RequestMeta> {
        self.active.as_ref().and_then(|key| self.metas.get(key))
    }

    fn active_mut(&mut self) -> Option<&mut RequestMeta> {
        self.active.as_ref().and_then(|key| self.metas.get_mut(key))
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Prefix downstream caches may fold into their keys to scope
    /// entries to this request's identity.
    pub fn set_cache_prefix(&mut self, prefix: impl Into<String>) {
        self.cache_prefix = Some(prefix.into());
    }

    pub fn cache_prefix(&self) -> Option<&str> {
        self.cache_prefix.as_deref()
    }

    pub fn reset(&mut self) {
        self.metas.clear();
        self.active = None;
        self.warnings.clear();
        self.cache_prefix = None;
    }
}
