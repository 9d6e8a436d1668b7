//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting → in-flight requests drain → exit
//! ```
//!
//! Requests already past submission keep running on their own tasks until
//! the runtime exits; their transaction references are in the logs.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, spawn_signal_handler};
