//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment (private key) + config (RPC URL, ABI path)
//!     → wallet.rs (key loading, signing)
//!     → contract.rs (ABI encoding, typed event decoding)
//!     → submitter.rs (nonce gate, fee bid, sign, broadcast once)
//!     → confirmation.rs (bounded receipt polling)
//!     → client.rs (RPC connection with timeouts and failover)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod confirmation;
pub mod contract;
pub mod nonce;
pub mod submitter;
pub mod types;
pub mod wallet;

pub use client::{Ledger, LedgerClient};
pub use confirmation::{ConfirmationError, ConfirmationWaiter, PollPolicy};
pub use contract::{ContractError, ContractInterface, LookupOutput};
pub use submitter::{FeePolicy, SubmitError, Submitter};
pub use types::{AcceptanceRecord, ChainId, LedgerError, LedgerResult, TxRef};
pub use wallet::{Wallet, WalletError};
