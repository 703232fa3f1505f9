pub mod types;
pub mod filter;
pub mod filter_where;
pub mod filter_order;
pub mod query_modifier;
pub mod error;

pub use types::*;
pub use filter::Filter;
pub use query_modifier::{FieldKind, FieldSpec, QueryModifier};
