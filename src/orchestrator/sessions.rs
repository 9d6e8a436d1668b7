//! Per-session pending uploads.
//!
//! A front-end session first arms itself for one upload, then submits the
//! file. While the register sequence runs the session is busy and a second
//! file is refused. The entry is dropped when the sequence ends, whichever
//! way it ends.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;

use crate::ledger::TxRef;
use crate::orchestrator::state::{RequestProgress, RequestState};

/// Why a session cannot accept a file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session '{0}' is not waiting for a file")]
    NotArmed(String),

    #[error("session '{0}' already has an upload in progress")]
    Busy(String),
}

#[derive(Debug)]
enum PendingUpload {
    Armed { since: Instant },
    Running {
        file_name: String,
        state: watch::Receiver<RequestProgress>,
    },
}

/// Externally visible state of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Armed { waiting_secs: u64 },
    Running {
        file_name: String,
        progress: RequestState,
        /// Set once the register transaction is broadcast; lets a client
        /// re-check acceptance if its own request timed out.
        #[serde(skip_serializing_if = "Option::is_none")]
        tx_ref: Option<TxRef>,
    },
}

/// Registry of pending uploads keyed by session id.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, PendingUpload>>,
}

/// Exclusive claim on a session for the duration of one register sequence.
///
/// Dropping the lease removes the session's pending state.
#[derive(Debug)]
pub struct SessionLease {
    sessions: Arc<DashMap<String, PendingUpload>>,
    session: String,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `session` for its next file. Re-arming an armed session is a no-op.
    pub fn arm(&self, session: &str) -> Result<(), SessionError> {
        match self.sessions.entry(session.to_string()) {
            Entry::Occupied(entry) => match entry.get() {
                PendingUpload::Armed { .. } => Ok(()),
                PendingUpload::Running { .. } => Err(SessionError::Busy(session.to_string())),
            },
            Entry::Vacant(entry) => {
                entry.insert(PendingUpload::Armed {
                    since: Instant::now(),
                });
                tracing::debug!(session = session, "Session armed for upload");
                Ok(())
            }
        }
    }

    /// Claim an armed session for `file_name`.
    ///
    /// Returns the lease plus the sender the register sequence publishes its
    /// progress on.
    pub fn begin(
        &self,
        session: &str,
        file_name: &str,
    ) -> Result<(SessionLease, watch::Sender<RequestProgress>), SessionError> {
        let mut entry = match self.sessions.get_mut(session) {
            Some(entry) => entry,
            None => return Err(SessionError::NotArmed(session.to_string())),
        };
        if let PendingUpload::Running { .. } = *entry {
            return Err(SessionError::Busy(session.to_string()));
        }

        let (tx, rx) = watch::channel(RequestProgress::default());
        *entry = PendingUpload::Running {
            file_name: file_name.to_string(),
            state: rx,
        };
        drop(entry);

        let lease = SessionLease {
            sessions: self.sessions.clone(),
            session: session.to_string(),
        };
        Ok((lease, tx))
    }

    pub fn status(&self, session: &str) -> SessionStatus {
        match self.sessions.get(session).as_deref() {
            None => SessionStatus::Idle,
            Some(PendingUpload::Armed { since }) => SessionStatus::Armed {
                waiting_secs: since.elapsed().as_secs(),
            },
            Some(PendingUpload::Running { file_name, state }) => {
                let seen = *state.borrow();
                SessionStatus::Running {
                    file_name: file_name.clone(),
                    progress: seen.state,
                    tx_ref: seen.tx_ref,
                }
            }
        }
    }

    /// Drop armed sessions that never sent a file within `max_age`.
    pub fn prune_armed(&self, max_age: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, pending| match pending {
            PendingUpload::Armed { since } => since.elapsed() < max_age,
            PendingUpload::Running { .. } => true,
        });
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.sessions.remove(&self.session);
        tracing::debug!(session = %self.session, "Session upload finished");
    }
}
