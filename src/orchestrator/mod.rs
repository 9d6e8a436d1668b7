//! Document lifecycle orchestrator.
//!
//! # Data Flow
//! ```text
//! register: BlobStore::upload → Submitter::submit → ConfirmationWaiter::wait
//!           → ContractInterface::extract_document_id → Registration
//! lookup:   Ledger::call → ContractInterface::decode_lookup → DocumentRecord
//! revoke:   Submitter::submit → ConfirmationWaiter::wait → BlobStore::delete
//! ```

pub mod documents;
pub mod error;
pub mod sessions;
pub mod state;
pub mod types;

pub use documents::DocumentOrchestrator;
pub use error::{DocumentError, ErrorKind, LifecycleError, LifecycleResult};
pub use sessions::{SessionError, SessionLease, SessionRegistry, SessionStatus};
pub use state::{Progress, RequestProgress, RequestState, Stage};
pub use types::{DocumentRecord, Registration};
