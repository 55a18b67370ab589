//! Query planning: reduces a parsed selection tree, through the
//! registry's relationship metadata and declared filters, to one
//! relational fetch plan with its eager loads.

pub mod error;
pub mod filter;
pub mod lookup;
pub mod query;

pub use error::PlanError;
pub use filter::FilterSet;
pub use lookup::{parse_expression, parse_order_key};
pub use query::Planner;
