//! Data-governance MCP server library.
//!
//! This library provides MCP (Model Context Protocol) tools for tagging
//! database columns with NDMO classifications and PII/PHI/PFI/PSI/PCI flags,
//! classifying column names with a hosted language model, and persisting the
//! records to PostgreSQL or Oracle.

pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod interchange;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{CatalogError, CatalogResult};
pub use mcp::DataGovService;
