//! `opstore` core — request identity context and storage entity records.

pub mod context;
pub mod types;

pub use context::{RequestContext, ROUTING_HEADER, SESSION_COOKIE};
pub use types::Datasource;
