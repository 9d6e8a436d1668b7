//! HTTP front-end adapter.
//!
//! # Data Flow
//! ```text
//! client (chat front end, docledger-cli)
//!     → server.rs (Axum setup, request ID, timeout, body limit)
//!     → handlers.rs (session arming, upload, lookup, download, revoke)
//!     → DocumentOrchestrator
//!     → error.rs (kind → status code + JSON body)
//! ```

pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ErrorBody};
pub use server::{build_router, AppState, HttpServer, X_REQUEST_ID};
