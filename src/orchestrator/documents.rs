//! Document lifecycle orchestration.
//!
//! # Responsibilities
//! - Register: upload blob → submit register call → wait → extract id
//! - Lookup: read-only contract call, no transaction
//! - Revoke: submit delete call → wait → unpin blob
//!
//! Nothing is rolled back. A failure after the blob was pinned leaves it in
//! the store; the returned [`LifecycleError`] names the blob and transaction
//! so an operator can reconcile by hand.

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::watch;

use crate::blobstore::{BlobStore, ContentAddress};
use crate::ledger::{
    AcceptanceRecord, ConfirmationWaiter, ContractInterface, FeePolicy, Ledger, LedgerError,
    PollPolicy, Submitter, TxRef, Wallet,
};
use crate::observability::metrics;
use crate::orchestrator::error::{DocumentError, LifecycleError, LifecycleResult};
use crate::orchestrator::state::{Progress, RequestProgress, Stage};
use crate::orchestrator::types::{DocumentRecord, Registration};

/// Coordinates the ledger and the blob store for each document operation.
pub struct DocumentOrchestrator<L, B> {
    ledger: Arc<L>,
    blobs: Arc<B>,
    contract: Arc<ContractInterface>,
    submitter: Submitter<L>,
    waiter: ConfirmationWaiter<L>,
}

impl<L: Ledger, B: BlobStore> DocumentOrchestrator<L, B> {
    pub fn new(
        ledger: Arc<L>,
        blobs: Arc<B>,
        contract: Arc<ContractInterface>,
        fees: FeePolicy,
        policy: PollPolicy,
    ) -> Self {
        Self {
            submitter: Submitter::new(ledger.clone(), contract.clone(), fees),
            waiter: ConfirmationWaiter::new(ledger.clone(), policy),
            ledger,
            blobs,
            contract,
        }
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn contract(&self) -> &ContractInterface {
        &self.contract
    }

    /// Upload `bytes` under `display_name` and record it on the ledger.
    pub async fn register_document(
        &self,
        display_name: &str,
        bytes: Bytes,
        wallet: &Wallet,
    ) -> LifecycleResult<Registration> {
        let result = self
            .register(display_name, bytes, wallet, Progress::new("register"))
            .await;
        record_outcome("register", &result);
        result
    }

    /// [`Self::register_document`], publishing stage changes to `observer`.
    pub async fn register_document_observed(
        &self,
        display_name: &str,
        bytes: Bytes,
        wallet: &Wallet,
        observer: watch::Sender<RequestProgress>,
    ) -> LifecycleResult<Registration> {
        let progress = Progress::observed("register", observer);
        let result = self.register(display_name, bytes, wallet, progress).await;
        record_outcome("register", &result);
        result
    }

    async fn register(
        &self,
        display_name: &str,
        bytes: Bytes,
        wallet: &Wallet,
        mut progress: Progress,
    ) -> LifecycleResult<Registration> {
        progress.advance(Stage::Uploading);
        let blob_address = match self.blobs.upload(display_name, bytes).await {
            Ok(address) => address,
            Err(e) => return Err(self.failed(progress, e)),
        };
        progress.record_blob(blob_address.clone());

        progress.advance(Stage::Submitted);
        let method = &self.contract.names().register_method;
        let args = ContractInterface::register_args(blob_address.as_str(), display_name);
        let tx_ref = match self.submitter.submit(method, &args, wallet).await {
            Ok(tx_ref) => tx_ref,
            Err(e) => return Err(self.failed(progress, e)),
        };
        progress.record_tx(tx_ref);

        progress.advance(Stage::Confirming);
        let record = match self.confirm(tx_ref).await {
            Ok(record) => record,
            Err(e) => return Err(self.failed(progress, e)),
        };

        progress.advance(Stage::Extracting);
        let document_id = match self.contract.extract_document_id(&record) {
            Some(id) => id,
            None => return Err(self.failed(progress, DocumentError::MalformedAcceptance(tx_ref))),
        };

        progress.finish();
        tracing::info!(
            document_id = document_id,
            tx_ref = %tx_ref,
            blob_address = %blob_address,
            name = display_name,
            "Document registered"
        );
        Ok(Registration {
            document_id,
            tx_ref,
            blob_address,
        })
    }

    /// Read a document record. Never submits a transaction.
    pub async fn lookup_document(&self, document_id: u64) -> LifecycleResult<DocumentRecord> {
        let result = self
            .lookup(document_id)
            .await
            .map_err(|e| self.failed(Progress::new("lookup"), e));
        record_outcome("lookup", &result);
        result
    }

    async fn lookup(&self, document_id: u64) -> Result<DocumentRecord, DocumentError> {
        let method = &self.contract.names().lookup_method;
        let data = self
            .contract
            .encode_call(method, &ContractInterface::id_args(document_id))?;

        let output = match self.ledger.call(self.contract.address(), data).await {
            Ok(output) => output,
            Err(LedgerError::Reverted(reason)) => {
                return Err(DocumentError::NotFound(format!(
                    "document {} ({})",
                    document_id, reason
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let decoded = self.contract.decode_lookup(&output)?;
        DocumentRecord::from_lookup(document_id, decoded)
            .ok_or_else(|| DocumentError::NotFound(format!("document {}", document_id)))
    }

    /// Look up a document and fetch its bytes from the blob store.
    pub async fn download_document(&self, document_id: u64) -> LifecycleResult<(DocumentRecord, Bytes)> {
        let result = self.download(document_id).await;
        record_outcome("download", &result);
        result
    }

    async fn download(&self, document_id: u64) -> LifecycleResult<(DocumentRecord, Bytes)> {
        let mut progress = Progress::new("download");
        let record = match self.lookup(document_id).await {
            Ok(record) => record,
            Err(e) => return Err(self.failed(progress, e)),
        };
        progress.record_blob(record.blob_address.clone());

        match self.blobs.download(&record.blob_address).await {
            Ok(bytes) => Ok((record, bytes)),
            Err(e) => Err(self.failed(progress, e)),
        }
    }

    /// Remove the ledger entry for `document_id`, then unpin `blob_address`.
    pub async fn revoke_document(
        &self,
        document_id: u64,
        blob_address: &ContentAddress,
        wallet: &Wallet,
    ) -> LifecycleResult<()> {
        let result = self
            .revoke(document_id, blob_address, wallet, Progress::new("revoke"))
            .await;
        record_outcome("revoke", &result);
        result
    }

    /// Resolve the blob address through a lookup, then revoke.
    pub async fn revoke_by_id(&self, document_id: u64, wallet: &Wallet) -> LifecycleResult<()> {
        let result = match self.lookup(document_id).await {
            Ok(record) => {
                self.revoke(document_id, &record.blob_address, wallet, Progress::new("revoke"))
                    .await
            }
            Err(e) => Err(self.failed(Progress::new("revoke"), e)),
        };
        record_outcome("revoke", &result);
        result
    }

    async fn revoke(
        &self,
        document_id: u64,
        blob_address: &ContentAddress,
        wallet: &Wallet,
        mut progress: Progress,
    ) -> LifecycleResult<()> {
        progress.record_blob(blob_address.clone());

        progress.advance(Stage::Submitted);
        let method = &self.contract.names().delete_method;
        let args = ContractInterface::id_args(document_id);
        let tx_ref = match self.submitter.submit(method, &args, wallet).await {
            Ok(tx_ref) => tx_ref,
            Err(e) => return Err(self.failed(progress, e)),
        };
        progress.record_tx(tx_ref);

        progress.advance(Stage::Confirming);
        if let Err(e) = self.confirm(tx_ref).await {
            return Err(self.failed(progress, e));
        }

        progress.advance(Stage::Unpinning);
        if let Err(e) = self.blobs.delete(blob_address).await {
            return Err(self.failed(progress, e));
        }

        progress.finish();
        tracing::info!(
            document_id = document_id,
            tx_ref = %tx_ref,
            blob_address = %blob_address,
            "Document revoked"
        );
        Ok(())
    }

    /// Query the acceptance record of an earlier submission once.
    ///
    /// Safe to repeat; use it after a `ConfirmationTimeout` to learn whether
    /// the transaction landed after all.
    pub async fn check_acceptance(&self, tx_ref: TxRef) -> LifecycleResult<Option<AcceptanceRecord>> {
        self.ledger.poll_receipt(tx_ref).await.map_err(|e| {
            let mut progress = Progress::new("check_acceptance");
            progress.record_tx(tx_ref);
            self.failed(progress, e)
        })
    }

    /// Wait for `tx_ref` and insist that it applied.
    async fn confirm(&self, tx_ref: TxRef) -> Result<AcceptanceRecord, DocumentError> {
        let record = self.waiter.wait(tx_ref).await?;
        if !record.success {
            return Err(DocumentError::Submission(format!(
                "transaction {} reverted",
                tx_ref
            )));
        }
        Ok(record)
    }

    fn failed(&self, progress: Progress, source: impl Into<DocumentError>) -> LifecycleError {
        let err = progress.fail(source);
        match err.orphaned_blob() {
            Some(blob_address) => {
                metrics::record_orphaned_blob(err.stage.as_str());
                tracing::error!(
                    operation = err.operation,
                    stage = ?err.stage,
                    blob_address = %blob_address,
                    tx_ref = ?err.tx_ref.map(|t| t.hex()),
                    error = %err.source,
                    "Blob left in store without a ledger record"
                );
            }
            None => {
                tracing::warn!(
                    operation = err.operation,
                    stage = ?err.stage,
                    kind = %err.kind(),
                    tx_ref = ?err.tx_ref.map(|t| t.hex()),
                    error = %err.source,
                    "Document operation failed"
                );
            }
        }
        err
    }
}

fn record_outcome<T>(operation: &'static str, result: &LifecycleResult<T>) {
    match result {
        Ok(_) => metrics::record_request(operation, "ok"),
        Err(e) => metrics::record_request(operation, e.kind().as_str()),
    }
}
