//! Request execution over a locked registry: parsing, planning,
//! datastore fetches, materialization, mutations and the response
//! envelope, all under one per-request deadline.

pub mod config;
pub mod error;
pub mod execute;
pub mod meta;
pub mod mutation;
pub mod permission;
pub mod response;

pub use config::EngineConfig;
pub use error::ExecuteError;
pub use execute::Engine;
pub use meta::{MetaStore, RequestMeta};
pub use mutation::{bulk_apply_m2m_action, ListAction};
pub use permission::{AllowAll, PermissionCheck};
pub use response::{Classification, FieldError, Response};
