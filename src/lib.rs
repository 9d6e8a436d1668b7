//! Document registration on a shared ledger with content-addressed storage.
//!
//! A file's bytes are pinned to an IPFS pinning service and its address,
//! name and owner are recorded by a registry contract on an EVM chain. The
//! [`orchestrator::DocumentOrchestrator`] keeps the two in step.

pub mod blobstore;
pub mod config;
pub mod http;
pub mod ledger;
pub mod lifecycle;
pub mod observability;
pub mod orchestrator;
pub mod resilience;

pub use config::DocLedgerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use orchestrator::DocumentOrchestrator;
