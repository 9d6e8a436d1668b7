//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms via `metrics`)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Events carry `tx_ref`, `blob_address`, `stage` fields for cleanup tooling
//! - Request ID flows from the HTTP layer into orchestrator spans
//! - Secrets never reach either sink

pub mod logging;
pub mod metrics;
