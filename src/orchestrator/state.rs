//! Per-request lifecycle state.
//!
//! ```text
//! register: Idle → Uploading → Submitted → Confirming → Extracting → Done
//! revoke:   Idle → Submitted → Confirming → Unpinning → Done
//! ```
//!
//! Any non-terminal stage may end in `Failed`. Stages only move forward.

use serde::Serialize;
use tokio::sync::watch;

use crate::blobstore::ContentAddress;
use crate::ledger::TxRef;
use crate::orchestrator::error::{DocumentError, ErrorKind, LifecycleError};

/// Position of a request in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Uploading,
    Submitted,
    Confirming,
    Extracting,
    Unpinning,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Uploading => "uploading",
            Stage::Submitted => "submitted",
            Stage::Confirming => "confirming",
            Stage::Extracting => "extracting",
            Stage::Unpinning => "unpinning",
            Stage::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestState {
    Running { stage: Stage },
    Failed { stage: Stage, kind: ErrorKind },
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Failed { .. } | RequestState::Running { stage: Stage::Done }
        )
    }
}

impl Default for RequestState {
    fn default() -> Self {
        RequestState::Running { stage: Stage::Idle }
    }
}

/// What an observer sees: the state plus the submitted transaction, once
/// there is one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestProgress {
    #[serde(flatten)]
    pub state: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_ref: Option<TxRef>,
}

/// Tracks one request through its stages and collects the context a
/// [`LifecycleError`] needs.
#[derive(Debug)]
pub struct Progress {
    operation: &'static str,
    stage: Stage,
    blob_address: Option<ContentAddress>,
    tx_ref: Option<TxRef>,
    observer: Option<watch::Sender<RequestProgress>>,
}

impl Progress {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            stage: Stage::Idle,
            blob_address: None,
            tx_ref: None,
            observer: None,
        }
    }

    /// Like [`Progress::new`], publishing every transition to `observer`.
    pub fn observed(operation: &'static str, observer: watch::Sender<RequestProgress>) -> Self {
        let progress = Self {
            observer: Some(observer),
            ..Self::new(operation)
        };
        progress.publish(RequestState::default());
        progress
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn blob_address(&self) -> Option<&ContentAddress> {
        self.blob_address.as_ref()
    }

    pub fn tx_ref(&self) -> Option<TxRef> {
        self.tx_ref
    }

    /// Move to `next`. Backward or repeated transitions are ignored.
    pub fn advance(&mut self, next: Stage) {
        if next <= self.stage {
            tracing::warn!(operation = self.operation, from = ?self.stage, to = ?next, "Ignoring backward stage transition");
            return;
        }
        tracing::debug!(operation = self.operation, from = ?self.stage, to = ?next, "Stage transition");
        self.stage = next;
        self.publish(RequestState::Running { stage: next });
    }

    pub fn record_blob(&mut self, address: ContentAddress) {
        self.blob_address = Some(address);
    }

    pub fn record_tx(&mut self, tx_ref: TxRef) {
        self.tx_ref = Some(tx_ref);
        self.publish(RequestState::Running { stage: self.stage });
    }

    /// End the request successfully.
    pub fn finish(mut self) {
        self.advance(Stage::Done);
    }

    /// End the request with `source`, capturing the stage and references.
    pub fn fail(self, source: impl Into<DocumentError>) -> LifecycleError {
        let source = source.into();
        self.publish(RequestState::Failed {
            stage: self.stage,
            kind: source.kind(),
        });
        LifecycleError {
            operation: self.operation,
            stage: self.stage,
            blob_address: self.blob_address,
            tx_ref: self.tx_ref,
            source,
        }
    }

    fn publish(&self, state: RequestState) {
        if let Some(observer) = &self.observer {
            // No receivers left just means nobody is watching.
            let _ = observer.send(RequestProgress {
                state,
                tx_ref: self.tx_ref,
            });
        }
    }
}
