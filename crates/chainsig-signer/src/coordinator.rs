//! The coordinator-chain RPC adapter boundary (§4.2).
//!
//! [`CoordinatorAdapter`] is the one thing [`crate::client::MpcSigningClient`]
//! depends on: view/change calls against the signer contract, meta-transaction
//! construction and dispatch, receipt polling, and nonce-cache invalidation.
//! Bootstrapping a concrete coordinator-chain account/keystore is out of
//! scope; callers supply an adapter already wired to one.

use serde::{Deserialize, Serialize};

use chainsig_types::error::Error;

/// One `FunctionCall` action inside a delegate action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallAction {
    pub method_name: String,
    /// Base64-encoded JSON call arguments.
    pub args_base64: String,
    pub gas: u64,
    pub deposit: u128,
}

/// An unsigned delegate action, ready to be signed by the caller's access key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegateAction {
    pub actions: Vec<FunctionCallAction>,
    pub nonce: u64,
    pub max_block_height: u64,
    pub public_key: String,
    pub receiver_id: String,
    pub sender_id: String,
}

/// A delegate action plus the caller's ed25519 signature over it, ready to
/// be wrapped in a meta-transaction and sent to a relayer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedDelegate {
    pub delegate_action: DelegateAction,
    /// `"ed25519:<base58>"`.
    pub signature: String,
}

/// The terminal status of one receipt in an execution outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// `SuccessValue(v)`: `v` is the method's base64-encoded return value.
    SuccessValue(String),
    /// Any other terminal status (failure, or a success carrying no value).
    Other,
}

#[derive(Debug, Clone)]
pub struct ReceiptOutcome {
    pub status: ReceiptStatus,
}

/// A finished execution, in `receipts_outcome` order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub receipts_outcome: Vec<ReceiptOutcome>,
}

/// The coordinator-chain operations the signing client needs. Implementors
/// own the account/keystore bootstrap and the underlying RPC client.
#[async_trait::async_trait]
pub trait CoordinatorAdapter: Send + Sync {
    /// A read-only `view` call against `contract` (e.g. `public_key`,
    /// `experimental_signature_deposit`).
    async fn call_view(&self, contract: &str, method: &str, args: serde_json::Value) -> Result<serde_json::Value, Error>;

    /// A direct, caller-signed `change` call (no relayer).
    async fn call_change(
        &self,
        contract: &str,
        method: &str,
        args: serde_json::Value,
        gas: u64,
        deposit: u128,
    ) -> Result<ExecutionOutcome, Error>;

    /// Signs a delegate action with the caller's access key.
    async fn sign_meta_transaction(&self, action: DelegateAction) -> Result<SignedDelegate, Error>;

    /// POSTs a signed delegate to `<relayer_url>/send_meta_tx_async`,
    /// returning the resulting transaction hash.
    async fn send_meta_transaction(&self, signed: &SignedDelegate, relayer_url: &url::Url) -> Result<String, Error>;

    /// Polls the coordinator-chain provider's `tx_status` until a terminal
    /// outcome is observed.
    async fn poll_tx_status(&self, tx_hash: &str) -> Result<ExecutionOutcome, Error>;

    /// Invalidates any cached access-key nonce for `public_key`. Must be
    /// called unconditionally after every `sign_meta_transaction`, whether
    /// or not the subsequent send/poll succeeds, or the next sign sharing
    /// that key replays the nonce and is rejected.
    fn invalidate_nonce_cache(&self, public_key: &str);
}
