//! `opstore` server — tenant-aware storage client, datasource lookup cache,
//! and HTTP ingress.

pub mod client;
pub mod config;
pub mod network;
pub mod opstorage;
pub mod service;
pub mod storage;

pub use config::{LogFormat, ProxyConfig};
