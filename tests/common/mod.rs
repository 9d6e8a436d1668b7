//! Shared fakes for integration tests.
//!
//! `FakeLedger` accepts real signed transactions, decodes them against the
//! fixture ABI and applies them to an in-memory document table. Receipts
//! become visible after a configurable number of polls.
#![allow(dead_code)]

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::eips::eip2718::Decodable2718;
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{keccak256, Address, Bytes, Log, LogData, B256, U256};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docledger::blobstore::{BlobError, BlobResult, BlobStore, ContentAddress};
use docledger::config::ContractConfig;
use docledger::ledger::{
    AcceptanceRecord, ContractInterface, FeePolicy, Ledger, LedgerError, LedgerResult, PollPolicy,
    TxRef, Wallet,
};
use docledger::orchestrator::DocumentOrchestrator;

pub const ABI_JSON: &str = include_str!("../fixtures/DocumentManagement.json");

/// Anvil's first development key.
pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const CHAIN_ID: u64 = 421_614;

pub fn contract_address() -> Address {
    Address::repeat_byte(0xcc)
}

pub fn test_wallet() -> Wallet {
    Wallet::from_private_key(TEST_PRIVATE_KEY, CHAIN_ID).unwrap()
}

pub fn contract_interface() -> ContractInterface {
    ContractInterface::from_json(contract_address(), ABI_JSON, ContractConfig::default()).unwrap()
}

pub fn fee_policy() -> FeePolicy {
    FeePolicy {
        gas_limit: 300_000,
        gas_price_multiplier: 1.0,
        max_gas_price_gwei: 500,
    }
}

/// Short fixed-interval polling so tests stay fast.
pub fn fast_policy() -> PollPolicy {
    PollPolicy::fixed(Duration::from_millis(5), 10)
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Debug, Clone)]
struct StoredDocument {
    blob_address: String,
    display_name: String,
    created_at: u64,
    owner: Address,
}

/// Scripted failure of one receipt query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptFailure {
    /// Transport-level failure the waiter should retry.
    Transport,
    /// The node refused the query.
    Refused,
}

struct PendingReceipt {
    polls: u32,
    visible: bool,
    record: AcceptanceRecord,
}

#[derive(Default)]
struct LedgerState {
    documents: BTreeMap<u64, StoredDocument>,
    next_id: u64,
    next_nonce: u64,
    /// Transactions whose receipts have been observed.
    mined: u64,
    receipts: HashMap<B256, PendingReceipt>,
    /// `(nonce, method)` of every accepted broadcast, in arrival order.
    submissions: Vec<(u64, String)>,
}

/// In-memory registry contract behind the [`Ledger`] trait.
pub struct FakeLedger {
    abi: JsonAbi,
    address: Address,
    sender: Address,
    state: Mutex<LedgerState>,
    accept_after: AtomicU32,
    fail_send: AtomicBool,
    fail_gas_price: AtomicBool,
    fail_nonce_query: AtomicBool,
    omit_events: AtomicBool,
    garble_lookups: AtomicBool,
    receipt_failures: Mutex<VecDeque<ReceiptFailure>>,
    receipt_polls: AtomicU32,
}

impl FakeLedger {
    /// A ledger that expects transactions signed by `sender`.
    pub fn new(address: Address, sender: Address) -> Self {
        Self {
            abi: serde_json::from_str(ABI_JSON).unwrap(),
            address,
            sender,
            state: Mutex::new(LedgerState::default()),
            accept_after: AtomicU32::new(1),
            fail_send: AtomicBool::new(false),
            fail_gas_price: AtomicBool::new(false),
            fail_nonce_query: AtomicBool::new(false),
            omit_events: AtomicBool::new(false),
            garble_lookups: AtomicBool::new(false),
            receipt_failures: Mutex::new(VecDeque::new()),
            receipt_polls: AtomicU32::new(0),
        }
    }

    /// Id the next registration receives.
    pub fn set_next_id(&self, id: u64) {
        self.state.lock().unwrap().next_id = id;
    }

    /// Receipts appear on the `polls`-th query. `u32::MAX` means never.
    pub fn set_accept_after(&self, polls: u32) {
        self.accept_after.store(polls, Ordering::SeqCst);
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_gas_price(&self, fail: bool) {
        self.fail_gas_price.store(fail, Ordering::SeqCst);
    }

    /// Pending nonce queries fail at the transport level.
    pub fn set_fail_nonce_query(&self, fail: bool) {
        self.fail_nonce_query.store(fail, Ordering::SeqCst);
    }

    /// Registrations apply but emit no `DocumentAdded` log.
    pub fn set_omit_events(&self, omit: bool) {
        self.omit_events.store(omit, Ordering::SeqCst);
    }

    /// Lookup calls return bytes that are not a valid ABI encoding.
    pub fn set_garble_lookups(&self, garble: bool) {
        self.garble_lookups.store(garble, Ordering::SeqCst);
    }

    /// The next receipt queries fail with `failures`, in order.
    pub fn fail_receipt_polls(&self, failures: &[ReceiptFailure]) {
        self.receipt_failures.lock().unwrap().extend(failures.iter().copied());
    }

    /// Seed a document directly, bypassing transactions.
    pub fn insert_document(&self, id: u64, blob_address: &str, display_name: &str) {
        self.state.lock().unwrap().documents.insert(
            id,
            StoredDocument {
                blob_address: blob_address.to_string(),
                display_name: display_name.to_string(),
                created_at: 1_700_000_000,
                owner: self.sender,
            },
        );
    }

    pub fn submissions(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().unwrap().submissions.len()
    }

    pub fn receipt_polls(&self) -> u32 {
        self.receipt_polls.load(Ordering::SeqCst)
    }

    pub fn document_count(&self) -> usize {
        self.state.lock().unwrap().documents.len()
    }

    fn function_for(&self, input: &[u8]) -> Option<&Function> {
        if input.len() < 4 {
            return None;
        }
        self.abi
            .functions()
            .find(|f| f.selector().as_slice() == &input[..4])
    }

    fn event_selector(&self, name: &str) -> B256 {
        self.abi.event(name).and_then(|e| e.first()).unwrap().selector()
    }

    fn id_arg(values: &[DynSolValue]) -> u64 {
        match values {
            [DynSolValue::Uint(id, _)] => u64::try_from(*id).unwrap(),
            other => panic!("unexpected id arguments: {:?}", other),
        }
    }

    /// Apply a decoded call. Returns `(success, logs)`.
    fn execute(&self, state: &mut LedgerState, function: &Function, args: &[DynSolValue]) -> (bool, Vec<Log>) {
        match function.name.as_str() {
            "addDocument" => {
                let (blob_address, display_name) = match args {
                    [DynSolValue::String(blob), DynSolValue::String(name)] => (blob.clone(), name.clone()),
                    other => panic!("unexpected addDocument arguments: {:?}", other),
                };
                let id = state.next_id;
                state.next_id += 1;
                state.documents.insert(
                    id,
                    StoredDocument {
                        blob_address: blob_address.clone(),
                        display_name: display_name.clone(),
                        created_at: 1_700_000_000 + id,
                        owner: self.sender,
                    },
                );

                let body = DynSolValue::Tuple(vec![
                    DynSolValue::String(blob_address),
                    DynSolValue::String(display_name),
                ])
                .abi_encode_params();
                let topics = vec![
                    self.event_selector("DocumentAdded"),
                    B256::from(U256::from(id).to_be_bytes::<32>()),
                    self.sender.into_word(),
                ];
                if self.omit_events.load(Ordering::SeqCst) {
                    return (true, vec![]);
                }
                let log = Log {
                    address: self.address,
                    data: LogData::new_unchecked(topics, body.into()),
                };
                (true, vec![log])
            }
            "deleteDocument" => {
                let id = Self::id_arg(args);
                if state.documents.remove(&id).is_none() {
                    return (false, vec![]);
                }
                let topics = vec![
                    self.event_selector("DocumentDeleted"),
                    B256::from(U256::from(id).to_be_bytes::<32>()),
                ];
                let log = Log {
                    address: self.address,
                    data: LogData::new_unchecked(topics, Bytes::new()),
                };
                (true, vec![log])
            }
            _ => (false, vec![]),
        }
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn chain_id(&self) -> LedgerResult<u64> {
        Ok(CHAIN_ID)
    }

    async fn pending_nonce(&self, _address: Address) -> LedgerResult<u64> {
        if self.fail_nonce_query.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc("connection refused".into()));
        }
        // Lags behind broadcasts until their receipts are seen, like a node
        // whose mempool view is stale.
        Ok(self.state.lock().unwrap().mined)
    }

    async fn gas_price(&self) -> LedgerResult<u128> {
        if self.fail_gas_price.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc("gas oracle unavailable".into()));
        }
        Ok(1_000_000_000)
    }

    async fn call(&self, to: Address, data: Bytes) -> LedgerResult<Bytes> {
        if to != self.address {
            return Ok(Bytes::new());
        }
        let function = self
            .function_for(&data)
            .ok_or_else(|| LedgerError::Reverted("execution reverted: unknown selector".into()))?;
        let args = function
            .abi_decode_input(&data[4..])
            .map_err(|e| LedgerError::Reverted(format!("execution reverted: {}", e)))?;

        match function.name.as_str() {
            "getDocument" => {
                let id = Self::id_arg(&args);
                let state = self.state.lock().unwrap();
                let doc = state
                    .documents
                    .get(&id)
                    .ok_or_else(|| LedgerError::Reverted("execution reverted: document does not exist".into()))?;
                if self.garble_lookups.load(Ordering::SeqCst) {
                    return Ok(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]));
                }
                let encoded = DynSolValue::Tuple(vec![
                    DynSolValue::String(doc.blob_address.clone()),
                    DynSolValue::String(doc.display_name.clone()),
                    DynSolValue::Uint(U256::from(doc.created_at), 256),
                    DynSolValue::Address(doc.owner),
                ])
                .abi_encode_params();
                Ok(encoded.into())
            }
            other => Err(LedgerError::Reverted(format!("execution reverted: {} is not a view", other))),
        }
    }

    async fn send_raw(&self, raw: Bytes) -> LedgerResult<TxRef> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc("connection reset by peer".into()));
        }

        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| LedgerError::Rejected(format!("invalid transaction: {}", e)))?;
        let hash = keccak256(&raw);

        let mut state = self.state.lock().unwrap();
        if envelope.nonce() != state.next_nonce {
            return Err(LedgerError::Rejected(format!(
                "nonce too low: expected {}, got {}",
                state.next_nonce,
                envelope.nonce()
            )));
        }
        state.next_nonce += 1;

        let input = envelope.input().clone();
        let (method, success, logs) = match self.function_for(&input) {
            Some(function) => {
                let args = function.abi_decode_input(&input[4..]).unwrap_or_default();
                let (success, logs) = self.execute(&mut state, function, &args);
                (function.name.clone(), success, logs)
            }
            None => ("unknown".to_string(), false, vec![]),
        };

        state.submissions.push((envelope.nonce(), method));
        let block_number = state.next_nonce;
        state.receipts.insert(
            hash,
            PendingReceipt {
                polls: 0,
                visible: false,
                record: AcceptanceRecord {
                    tx_ref: TxRef(hash),
                    success,
                    block_number: Some(block_number),
                    logs,
                },
            },
        );
        Ok(TxRef(hash))
    }

    async fn poll_receipt(&self, tx_ref: TxRef) -> LedgerResult<Option<AcceptanceRecord>> {
        self.receipt_polls.fetch_add(1, Ordering::SeqCst);
        match self.receipt_failures.lock().unwrap().pop_front() {
            Some(ReceiptFailure::Transport) => {
                return Err(LedgerError::Rpc("connection reset by peer".into()))
            }
            Some(ReceiptFailure::Refused) => {
                return Err(LedgerError::Rejected("header not found".into()))
            }
            None => {}
        }
        let accept_after = self.accept_after.load(Ordering::SeqCst);

        let mut state = self.state.lock().unwrap();
        let mut newly_mined = false;
        let result = match state.receipts.get_mut(&tx_ref.0) {
            None => None,
            Some(pending) => {
                pending.polls += 1;
                if pending.polls >= accept_after {
                    newly_mined = !pending.visible;
                    pending.visible = true;
                    Some(pending.record.clone())
                } else {
                    None
                }
            }
        };
        if newly_mined {
            state.mined += 1;
        }
        Ok(result)
    }
}

// ============================================================================
// Blob store
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFailure {
    Unavailable,
    Quota,
}

/// In-memory content-addressed store.
#[derive(Default)]
pub struct FakeBlobStore {
    blobs: Mutex<HashMap<ContentAddress, bytes::Bytes>>,
    scripted: Mutex<VecDeque<String>>,
    upload_failure: Mutex<Option<UploadFailure>>,
    fail_delete: AtomicBool,
    uploads: AtomicUsize,
    deletes: AtomicUsize,
}

impl FakeBlobStore {
    /// Address returned by the next upload.
    pub fn script_address(&self, address: &str) {
        self.scripted.lock().unwrap().push_back(address.to_string());
    }

    pub fn fail_uploads(&self, failure: Option<UploadFailure>) {
        *self.upload_failure.lock().unwrap() = failure;
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, address: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(&ContentAddress::from(address))
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn upload(&self, name: &str, bytes: bytes::Bytes) -> BlobResult<ContentAddress> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        match *self.upload_failure.lock().unwrap() {
            Some(UploadFailure::Unavailable) => {
                return Err(BlobError::StoreUnavailable("pinning service down".into()))
            }
            Some(UploadFailure::Quota) => return Err(BlobError::QuotaExceeded("plan limit".into())),
            None => {}
        }

        let address = match self.scripted.lock().unwrap().pop_front() {
            Some(address) => ContentAddress(address),
            None => ContentAddress(format!("QmFake{}{}", n, name.len())),
        };
        self.blobs.lock().unwrap().insert(address.clone(), bytes);
        Ok(address)
    }

    async fn download(&self, address: &ContentAddress) -> BlobResult<bytes::Bytes> {
        self.blobs
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(address.clone()))
    }

    async fn delete(&self, address: &ContentAddress) -> BlobResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(BlobError::StoreUnavailable("unpin timed out".into()));
        }
        self.blobs.lock().unwrap().remove(address);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub type TestOrchestrator = DocumentOrchestrator<FakeLedger, FakeBlobStore>;

pub struct Harness {
    pub ledger: Arc<FakeLedger>,
    pub blobs: Arc<FakeBlobStore>,
    pub orchestrator: Arc<TestOrchestrator>,
    pub wallet: Wallet,
}

pub fn harness() -> Harness {
    harness_with(fast_policy())
}

pub fn harness_with(policy: PollPolicy) -> Harness {
    let wallet = test_wallet();
    let ledger = Arc::new(FakeLedger::new(contract_address(), wallet.address()));
    let blobs = Arc::new(FakeBlobStore::default());
    let orchestrator = DocumentOrchestrator::new(
        ledger.clone(),
        blobs.clone(),
        Arc::new(contract_interface()),
        fee_policy(),
        policy,
    );
    Harness {
        ledger,
        blobs,
        orchestrator: Arc::new(orchestrator),
        wallet,
    }
}
