//! Contract interface loaded from a JSON ABI.
//!
//! The registry contract's method and event layout is external
//! configuration: the ABI file plus the method/event names in
//! [`ContractConfig`]. Calls are encoded and results decoded dynamically
//! against that description.

use alloy::dyn_abi::{DynSolValue, EventExt, FunctionExt, JsonAbiExt};
use alloy::json_abi::{Event, Function, JsonAbi};
use alloy::primitives::{Address, Bytes, Log, U256};
use std::path::Path;
use thiserror::Error;

use crate::config::ContractConfig;
use crate::ledger::types::AcceptanceRecord;

/// Errors raised while loading the ABI or encoding/decoding against it.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("failed to read ABI file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse ABI: {0}")]
    Parse(String),

    #[error("ABI has no {kind} named '{name}'")]
    Missing { kind: &'static str, name: String },

    #[error("failed to encode call to '{method}': {reason}")]
    Encode { method: String, reason: String },

    #[error("failed to decode output of '{method}': {reason}")]
    Decode { method: String, reason: String },
}

/// A document record as returned by the lookup method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOutput {
    pub blob_address: String,
    pub display_name: String,
    pub created_at: U256,
    pub owner: Address,
}

/// The registry contract as seen through its ABI.
#[derive(Debug, Clone)]
pub struct ContractInterface {
    address: Address,
    abi: JsonAbi,
    names: ContractConfig,
}

impl ContractInterface {
    /// Build an interface from ABI JSON text.
    ///
    /// Accepts either a plain ABI array or a build artifact object with an
    /// `abi` key. Every configured method and event must be present.
    pub fn from_json(address: Address, json: &str, names: ContractConfig) -> Result<Self, ContractError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ContractError::Parse(e.to_string()))?;
        let abi_value = match value {
            serde_json::Value::Object(mut artifact) => artifact
                .remove("abi")
                .ok_or_else(|| ContractError::Parse("artifact has no 'abi' key".to_string()))?,
            other => other,
        };
        let abi: JsonAbi =
            serde_json::from_value(abi_value).map_err(|e| ContractError::Parse(e.to_string()))?;

        let interface = Self { address, abi, names };
        interface.function(&interface.names.register_method)?;
        interface.function(&interface.names.lookup_method)?;
        interface.function(&interface.names.delete_method)?;
        interface.registered_event()?;
        Ok(interface)
    }

    /// Load the ABI from disk.
    pub fn load(address: Address, path: &Path, names: ContractConfig) -> Result<Self, ContractError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(address, &json, names)
    }

    /// Contract address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Configured method/event names.
    pub fn names(&self) -> &ContractConfig {
        &self.names
    }

    fn function(&self, name: &str) -> Result<&Function, ContractError> {
        self.abi
            .function(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| ContractError::Missing {
                kind: "function",
                name: name.to_string(),
            })
    }

    fn registered_event(&self) -> Result<&Event, ContractError> {
        let name = &self.names.registered_event;
        self.abi
            .event(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| ContractError::Missing {
                kind: "event",
                name: name.to_string(),
            })
    }

    /// Encode a call (selector + arguments) to `method`.
    pub fn encode_call(&self, method: &str, args: &[DynSolValue]) -> Result<Bytes, ContractError> {
        let function = self.function(method)?;
        function
            .abi_encode_input(args)
            .map(Bytes::from)
            .map_err(|e| ContractError::Encode {
                method: method.to_string(),
                reason: e.to_string(),
            })
    }

    /// Arguments of the register method.
    pub fn register_args(blob_address: &str, display_name: &str) -> Vec<DynSolValue> {
        vec![
            DynSolValue::String(blob_address.to_string()),
            DynSolValue::String(display_name.to_string()),
        ]
    }

    /// Arguments of the lookup and delete methods.
    pub fn id_args(document_id: u64) -> Vec<DynSolValue> {
        vec![DynSolValue::Uint(U256::from(document_id), 256)]
    }

    /// Decode the lookup method's `(string, string, uint256, address)` output.
    pub fn decode_lookup(&self, data: &[u8]) -> Result<LookupOutput, ContractError> {
        let method = &self.names.lookup_method;
        let decode_err = |reason: String| ContractError::Decode {
            method: method.clone(),
            reason,
        };

        let function = self.function(method)?;
        let values = function
            .abi_decode_output(data)
            .map_err(|e| decode_err(e.to_string()))?;

        match values.as_slice() {
            [DynSolValue::String(blob_address), DynSolValue::String(display_name), DynSolValue::Uint(created_at, _), DynSolValue::Address(owner)] => {
                Ok(LookupOutput {
                    blob_address: blob_address.clone(),
                    display_name: display_name.clone(),
                    created_at: *created_at,
                    owner: *owner,
                })
            }
            other => Err(decode_err(format!(
                "expected (string, string, uint256, address), got {} values",
                other.len()
            ))),
        }
    }

    /// Extract the assigned document id from an acceptance record.
    ///
    /// Looks at logs emitted by this contract whose first topic is the
    /// registration event's selector and decodes them against the event
    /// schema. Returns `None` when no log decodes to an id that fits `u64`.
    pub fn extract_document_id(&self, record: &AcceptanceRecord) -> Option<u64> {
        let event = self.registered_event().ok()?;
        let selector = event.selector();

        record
            .logs_from(self.address)
            .filter(|log| log.data.topics().first() == Some(&selector))
            .find_map(|log| self.decode_id(event, log))
    }

    fn decode_id(&self, event: &Event, log: &Log) -> Option<u64> {
        let decoded = match event.decode_log(&log.data) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(error = %e, event = %event.name, "Registration log did not match event schema");
                return None;
            }
        };

        // Walk inputs in declaration order, tracking where each one landed.
        let (mut indexed, mut body) = (decoded.indexed.iter(), decoded.body.iter());
        for input in &event.inputs {
            let value = (if input.indexed { indexed.next() } else { body.next() })?;
            let wanted = match &self.names.document_id_param {
                Some(name) => &input.name == name,
                None => input.ty.starts_with("uint"),
            };
            if wanted {
                let (id, _) = value.as_uint()?;
                return u64::try_from(id).ok();
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::TxRef;
    use alloy::primitives::{LogData, B256};

    const ABI: &str = r#"[
        {"type":"function","name":"addDocument","stateMutability":"nonpayable",
         "inputs":[{"name":"ipfsHash","type":"string"},{"name":"fileName","type":"string"}],
         "outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"getDocument","stateMutability":"view",
         "inputs":[{"name":"docId","type":"uint256"}],
         "outputs":[{"name":"","type":"string"},{"name":"","type":"string"},
                    {"name":"","type":"uint256"},{"name":"","type":"address"}]},
        {"type":"function","name":"deleteDocument","stateMutability":"nonpayable",
         "inputs":[{"name":"docId","type":"uint256"}],"outputs":[]},
        {"type":"event","name":"DocumentAdded","anonymous":false,
         "inputs":[{"name":"docId","type":"uint256","indexed":true},
                   {"name":"owner","type":"address","indexed":true},
                   {"name":"ipfsHash","type":"string","indexed":false},
                   {"name":"fileName","type":"string","indexed":false}]}
    ]"#;

    fn contract() -> ContractInterface {
        ContractInterface::from_json(Address::repeat_byte(0xcc), ABI, ContractConfig::default()).unwrap()
    }

    fn added_log(contract: &ContractInterface, address: Address, id: u64) -> Log {
        let event = contract.registered_event().unwrap();
        let body = DynSolValue::Tuple(vec![
            DynSolValue::String("Qm123".into()),
            DynSolValue::String("report.pdf".into()),
        ])
        .abi_encode_params();
        let topics = vec![
            event.selector(),
            B256::from(U256::from(id).to_be_bytes::<32>()),
            Address::repeat_byte(0xaa).into_word(),
        ];
        Log {
            address,
            data: LogData::new_unchecked(topics, body.into()),
        }
    }

    fn record(logs: Vec<Log>) -> AcceptanceRecord {
        AcceptanceRecord {
            tx_ref: TxRef(B256::ZERO),
            success: true,
            block_number: Some(1),
            logs,
        }
    }

    #[test]
    fn test_accepts_build_artifact() {
        let artifact = format!(r#"{{"contractName":"DocumentManagement","abi":{},"bytecode":"0x"}}"#, ABI);
        let result = ContractInterface::from_json(Address::ZERO, &artifact, ContractConfig::default());
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_method_rejected() {
        let names = ContractConfig {
            delete_method: "burnDocument".into(),
            ..ContractConfig::default()
        };
        let err = ContractInterface::from_json(Address::ZERO, ABI, names).unwrap_err();
        assert!(err.to_string().contains("burnDocument"));
    }

    #[test]
    fn test_encode_register_call() {
        let contract = contract();
        let data = contract
            .encode_call("addDocument", &ContractInterface::register_args("Qm123", "report.pdf"))
            .unwrap();
        let selector = contract.function("addDocument").unwrap().selector();
        assert_eq!(&data[..4], selector.as_slice());
    }

    #[test]
    fn test_encode_rejects_wrong_arity() {
        let err = contract()
            .encode_call("deleteDocument", &ContractInterface::register_args("a", "b"))
            .unwrap_err();
        assert!(matches!(err, ContractError::Encode { .. }));
    }

    #[test]
    fn test_decode_lookup_roundtrip() {
        let owner = Address::repeat_byte(0xaa);
        let encoded = DynSolValue::Tuple(vec![
            DynSolValue::String("Qm123".into()),
            DynSolValue::String("report.pdf".into()),
            DynSolValue::Uint(U256::from(1_700_000_000u64), 256),
            DynSolValue::Address(owner),
        ])
        .abi_encode_params();

        let output = contract().decode_lookup(&encoded).unwrap();
        assert_eq!(output.blob_address, "Qm123");
        assert_eq!(output.display_name, "report.pdf");
        assert_eq!(output.owner, owner);
    }

    #[test]
    fn test_decode_lookup_garbage() {
        let err = contract().decode_lookup(&[0x01, 0x02]).unwrap_err();
        assert!(matches!(err, ContractError::Decode { .. }));
    }

    #[test]
    fn test_extract_document_id() {
        let contract = contract();
        let log = added_log(&contract, contract.address(), 42);
        assert_eq!(contract.extract_document_id(&record(vec![log])), Some(42));
    }

    #[test]
    fn test_extract_accepts_zero_id() {
        let contract = contract();
        let log = added_log(&contract, contract.address(), 0);
        assert_eq!(contract.extract_document_id(&record(vec![log])), Some(0));
    }

    #[test]
    fn test_extract_ignores_foreign_contract() {
        let contract = contract();
        let log = added_log(&contract, Address::repeat_byte(0x01), 42);
        assert_eq!(contract.extract_document_id(&record(vec![log])), None);
    }

    #[test]
    fn test_extract_without_logs() {
        assert_eq!(contract().extract_document_id(&record(vec![])), None);
    }

    #[test]
    fn test_extract_by_named_param() {
        let names = ContractConfig {
            document_id_param: Some("docId".into()),
            ..ContractConfig::default()
        };
        let contract = ContractInterface::from_json(Address::repeat_byte(0xcc), ABI, names).unwrap();
        let log = added_log(&contract, contract.address(), 7);
        assert_eq!(contract.extract_document_id(&record(vec![log])), Some(7));
    }
}
