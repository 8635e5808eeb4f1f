use std::sync::Arc;

pub mod actor;
pub mod azure_compute;
pub mod config;
pub mod eviction;
pub mod landlord;
pub mod node;
pub mod random;

pub type AppConfig = Arc<config::Config>;
