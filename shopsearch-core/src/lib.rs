// shopsearch-core: search surface shared by every shopsearch front end.

pub mod types;
pub mod config;
pub mod preview;
pub mod transport;
pub mod render;
pub mod orchestrator;
pub mod session;
pub mod browse;

// Test utilities - always available for use by shopsearch-cli and tests
pub mod testutil;
