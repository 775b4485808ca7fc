//! Startup configuration resolver for the Rewards REST service.
//!
//! Before the service reads any configuration, [`bootstrap`] decides where
//! its runtime properties come from (a Cloud Run secret env var, the GCP
//! Secret Manager API, or a direct MongoDB URI override) and installs the
//! result as a high-precedence layer of the configuration namespace.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod infra;
pub mod logging;
pub mod server;
