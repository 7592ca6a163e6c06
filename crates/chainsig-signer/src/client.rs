//! The MPC signing client (§4.3): quotes a fee, dispatches a direct or
//! relayed sign, and parses the resulting signature out of an execution
//! receipt.

use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use chainsig_types::error::Error;
use chainsig_types::path::KeyDerivationPath;
use chainsig_types::signature::MpcSignature;

use crate::coordinator::{CoordinatorAdapter, DelegateAction, FunctionCallAction, ReceiptStatus};

/// Gas attached to a direct `sign` change call. Fixed per the wire contract.
const SIGN_GAS: u64 = 300_000_000_000_000;

/// One `sign` invocation against the signer contract.
pub struct SignRequest<'a> {
    pub payload: [u8; 32],
    pub path: KeyDerivationPath,
    /// The coordinator-chain account the adapter signs with.
    pub caller_auth: &'a str,
    /// The signer contract's account id.
    pub contract: &'a str,
    /// When present, the sign is relayed through a meta-transaction instead
    /// of submitted as a direct change call.
    pub relayer_url: Option<&'a url::Url>,
    /// Overrides the freshly quoted fee. Must still be `>= current fee`, or
    /// the contract rejects it (surfaced as [`Error::FeeTooLow`]).
    pub proposed_deposit: Option<u128>,
}

/// Thin wrapper over a [`CoordinatorAdapter`] implementing §4.3's algorithm.
pub struct MpcSigningClient<A> {
    adapter: A,
}

impl<A: CoordinatorAdapter> MpcSigningClient<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    /// Runs the full sign algorithm: quote, compose, direct-or-relayed
    /// dispatch, and (for the relayed path) receipt scan. One attempt; the
    /// caller layers retry.
    #[cfg_attr(feature = "telemetry", tracing::instrument(skip(self, request), fields(contract = request.contract)))]
    pub async fn sign(&self, request: SignRequest<'_>) -> Result<MpcSignature, Error> {
        let canonical_path = request.path.canonicalize();

        let deposit = match request.proposed_deposit {
            Some(d) => d,
            None => self.current_fee(request.contract).await?.max(1),
        };

        let sign_args = json!({
            "payload": request.payload.to_vec(),
            "path": canonical_path,
            "key_version": 0,
        });

        match request.relayer_url {
            None => self.sign_direct(request.contract, sign_args, deposit).await,
            Some(relayer_url) => {
                self.sign_relayed(request.contract, request.caller_auth, sign_args, deposit, relayer_url)
                    .await
            }
        }
    }

    async fn current_fee(&self, contract: &str) -> Result<u128, Error> {
        let value = self
            .adapter
            .call_view(contract, "experimental_signature_deposit", json!({}))
            .await
            .map_err(|e| Error::FeeQuoteUnavailable(e.to_string()))?;
        value
            .as_str()
            .and_then(|s| s.parse::<u128>().ok())
            .or_else(|| value.as_u64().map(u128::from))
            .ok_or_else(|| Error::FeeQuoteUnavailable("fee quote was not a u128".into()))
    }

    async fn sign_direct(&self, contract: &str, sign_args: serde_json::Value, deposit: u128) -> Result<MpcSignature, Error> {
        let outcome = self
            .adapter
            .call_change(contract, "sign", sign_args, SIGN_GAS, deposit)
            .await?;
        scan_receipts_for_signature(&outcome.receipts_outcome)
    }

    async fn sign_relayed(
        &self,
        contract: &str,
        caller_auth: &str,
        sign_args: serde_json::Value,
        deposit: u128,
        relayer_url: &url::Url,
    ) -> Result<MpcSignature, Error> {
        let action = DelegateAction {
            actions: vec![FunctionCallAction {
                method_name: "sign".into(),
                args_base64: base64::engine::general_purpose::STANDARD.encode(sign_args.to_string()),
                gas: SIGN_GAS,
                deposit,
            }],
            // A concrete adapter owns nonce/block-height bookkeeping; these
            // are overwritten when it signs.
            nonce: 0,
            max_block_height: 0,
            public_key: caller_auth.to_string(),
            receiver_id: contract.to_string(),
            sender_id: caller_auth.to_string(),
        };

        let signed = self.adapter.sign_meta_transaction(action).await;
        // Unconditional per §4.2: the next sign sharing this key must not
        // replay the nonce just consumed, regardless of what happens next.
        self.adapter.invalidate_nonce_cache(caller_auth);
        let signed = signed?;

        let tx_hash = self.adapter.send_meta_transaction(&signed, relayer_url).await?;
        let outcome = self.adapter.poll_tx_status(&tx_hash).await?;
        scan_receipts_for_signature(&outcome.receipts_outcome)
    }
}

/// `{ "Ok": MPCSignature }`, the shape a successful `sign` return value decodes to.
#[derive(Deserialize)]
struct SignOutcome {
    #[serde(rename = "Ok")]
    ok: MpcSignature,
}

/// First-match scan: the first receipt with a non-empty `SuccessValue` wins,
/// decoded as base64 UTF-8 JSON. Remaining receipts are not inspected.
fn scan_receipts_for_signature(receipts: &[crate::coordinator::ReceiptOutcome]) -> Result<MpcSignature, Error> {
    for receipt in receipts {
        let ReceiptStatus::SuccessValue(encoded) = &receipt.status else {
            continue;
        };
        if encoded.is_empty() {
            continue;
        }
        let Ok(raw) = base64::engine::general_purpose::STANDARD.decode(encoded) else {
            continue;
        };
        let Ok(outcome) = serde_json::from_slice::<SignOutcome>(&raw) else {
            continue;
        };
        return Ok(outcome.ok);
    }
    Err(Error::SignatureUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{ExecutionOutcome, ReceiptOutcome, SignedDelegate};
    use chainsig_types::signature::{BigR, CompressedPoint, SField, Scalar32};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    struct MockAdapter {
        fee: u128,
        receipts: Mutex<Option<Vec<ReceiptOutcome>>>,
        invalidated: AtomicU64,
    }

    fn sample_signature_json() -> String {
        let sig = MpcSignature {
            big_r: BigR {
                affine_point: CompressedPoint([3u8; 33]),
            },
            s: SField { scalar: Scalar32([4u8; 32]) },
            recovery_id: 0,
        };
        serde_json::to_string(&serde_json::json!({"Ok": sig})).unwrap()
    }

    #[async_trait::async_trait]
    impl CoordinatorAdapter for MockAdapter {
        async fn call_view(&self, _contract: &str, _method: &str, _args: serde_json::Value) -> Result<serde_json::Value, Error> {
            Ok(serde_json::json!(self.fee.to_string()))
        }

        async fn call_change(
            &self,
            _contract: &str,
            _method: &str,
            _args: serde_json::Value,
            _gas: u64,
            _deposit: u128,
        ) -> Result<ExecutionOutcome, Error> {
            Ok(ExecutionOutcome {
                receipts_outcome: self.receipts.lock().unwrap().clone().unwrap_or_default(),
            })
        }

        async fn sign_meta_transaction(&self, action: DelegateAction) -> Result<SignedDelegate, Error> {
            Ok(SignedDelegate {
                delegate_action: action,
                signature: "ed25519:deadbeef".into(),
            })
        }

        async fn send_meta_transaction(&self, _signed: &SignedDelegate, _relayer_url: &url::Url) -> Result<String, Error> {
            Ok("tx-hash".into())
        }

        async fn poll_tx_status(&self, _tx_hash: &str) -> Result<ExecutionOutcome, Error> {
            Ok(ExecutionOutcome {
                receipts_outcome: self.receipts.lock().unwrap().clone().unwrap_or_default(),
            })
        }

        fn invalidate_nonce_cache(&self, _public_key: &str) {
            self.invalidated.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn base_request(path: &str) -> SignRequest<'static> {
        SignRequest {
            payload: [0x11; 32],
            path: KeyDerivationPath::Opaque(path.to_string()),
            caller_auth: "alice.testnet",
            contract: "v1.signer",
            relayer_url: None,
            proposed_deposit: None,
        }
    }

    #[tokio::test]
    async fn direct_sign_parses_first_success_value() {
        let adapter = MockAdapter {
            fee: 1,
            receipts: Mutex::new(Some(vec![
                ReceiptOutcome { status: ReceiptStatus::Other },
                ReceiptOutcome {
                    status: ReceiptStatus::SuccessValue(base64::engine::general_purpose::STANDARD.encode(sample_signature_json())),
                },
            ])),
            invalidated: AtomicU64::new(0),
        };
        let client = MpcSigningClient::new(adapter);
        let sig = client.sign(base_request("m/44'/60'/0'/0/0")).await.unwrap();
        assert_eq!(sig.recovery_id, 0);
    }

    #[tokio::test]
    async fn direct_sign_with_no_success_value_is_unavailable() {
        let adapter = MockAdapter {
            fee: 1,
            receipts: Mutex::new(Some(vec![ReceiptOutcome { status: ReceiptStatus::Other }])),
            invalidated: AtomicU64::new(0),
        };
        let client = MpcSigningClient::new(adapter);
        let err = client.sign(base_request("m/44'/60'/0'/0/0")).await.unwrap_err();
        assert!(matches!(err, Error::SignatureUnavailable));
    }

    #[tokio::test]
    async fn relayed_sign_invalidates_nonce_cache_even_on_failure() {
        let adapter = MockAdapter {
            fee: 1,
            receipts: Mutex::new(Some(vec![])),
            invalidated: AtomicU64::new(0),
        };
        let relayer_url = url::Url::parse("https://relayer.example.com").unwrap();
        let mut request = base_request("m/44'/60'/0'/0/0");
        request.relayer_url = Some(&relayer_url);
        let client = MpcSigningClient::new(adapter);
        let result = client.sign(request).await;
        assert!(result.is_err());
        assert_eq!(client.adapter.invalidated.load(Ordering::SeqCst), 1);
    }
}
