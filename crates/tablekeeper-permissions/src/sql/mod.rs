//! SQL text permission filtering

pub mod extract;
pub mod filter;

pub use extract::TableRef;
pub use filter::SqlPermissionFilter;
