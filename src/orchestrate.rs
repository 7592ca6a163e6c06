//! The sign-and-broadcast orchestration helper (§4.7/§5): drives one
//! request through [`SignFlowState`] end to end — prepare payload, sign
//! (concurrently, one MPC round-trip per payload), reattach, broadcast.
//!
//! Grounded on `FacilitatorLocal::verify`/`settle` in the teacher project:
//! the same "route to the chain provider matching this request, instrument
//! the call with its chain id, surface the first error" shape, generalized
//! from a single RPC call to a multi-step state machine. Concurrent
//! per-payload signing (needed for Bitcoin's one-sighash-per-input PSBTs)
//! follows design note §5: every payload is signed independently and
//! reassembled by ascending [`MpcPayload::index`] before being handed back
//! to the assembler.

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;

use chainsig_signer::{CoordinatorAdapter, MpcSigningClient, SignRequest};
use chainsig_types::chain::{Chain, ChainProviderOps};
use chainsig_types::error::Error;
use chainsig_types::path::KeyDerivationPath;
use chainsig_types::signature::MpcSignature;
use chainsig_types::tx::{MpcPayload, SignFlowState};

/// Everything one sign-and-broadcast call needs beyond the request itself:
/// the target chain's assembler, an MPC signing client bound to a
/// coordinator adapter, and the caller's identity.
pub struct SignAndBroadcast<'a, C, A> {
    pub chain: &'a C,
    pub signer: &'a MpcSigningClient<A>,
    /// The key derivation path every payload for this request signs under.
    pub path: KeyDerivationPath,
    /// The signer contract's account id.
    pub contract: &'a str,
    /// The coordinator-chain account the signing client authenticates as.
    pub caller_auth: &'a str,
    /// When present, signs are relayed through a meta-transaction.
    pub relayer_url: Option<&'a url::Url>,
}

impl<'a, C, A> SignAndBroadcast<'a, C, A>
where
    C: Chain,
    A: CoordinatorAdapter,
{
    /// Runs the full flow for one request, advancing [`SignFlowState`] at
    /// every step. Any failure — including cancellation — is terminal; there
    /// is no retry inside this call.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(skip_all, err, fields(chain_id = %self.chain.chain_id()))
    )]
    pub async fn run(&self, request: C::TxRequest, cancellation: CancellationToken) -> Result<String, Error> {
        let mut state = SignFlowState::Assembled;

        if cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let (unsigned, mut payloads) = match self.chain.prepare_payload(request).await {
            Ok(prepared) => prepared,
            Err(e) => {
                state = SignFlowState::Failed;
                return Err(e);
            }
        };
        advance(&mut state, SignFlowState::PayloadExtracted)?;

        payloads.sort();
        advance(&mut state, SignFlowState::Signing)?;

        let sign_futures = payloads.iter().map(|payload| self.sign_one(*payload));
        let mut signed: Vec<(u32, MpcSignature)> = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                state = SignFlowState::Failed;
                return Err(Error::Cancelled);
            }
            result = try_join_all(sign_futures) => match result {
                Ok(signed) => signed,
                Err(e) => {
                    state = SignFlowState::Failed;
                    return Err(e);
                }
            },
        };
        signed.sort_by_key(|(index, _)| *index);
        let signatures: Vec<MpcSignature> = signed.into_iter().map(|(_, sig)| sig).collect();
        advance(&mut state, SignFlowState::Signed)?;

        advance(&mut state, SignFlowState::Broadcasting)?;
        if cancellation.is_cancelled() {
            state = SignFlowState::Failed;
            return Err(Error::Cancelled);
        }

        match self.chain.attach_signatures_and_broadcast(unsigned, signatures).await {
            Ok(tx_hash) => {
                advance(&mut state, SignFlowState::Broadcast)?;
                Ok(tx_hash)
            }
            Err(e) => {
                state = SignFlowState::Failed;
                Err(e)
            }
        }
    }

    async fn sign_one(&self, payload: MpcPayload) -> Result<(u32, MpcSignature), Error> {
        let signature = self
            .signer
            .sign(SignRequest {
                payload: payload.payload,
                path: self.path.clone(),
                caller_auth: self.caller_auth,
                contract: self.contract,
                relayer_url: self.relayer_url,
                proposed_deposit: None,
            })
            .await?;
        Ok((payload.index, signature))
    }
}

/// Applies a [`SignFlowState`] transition, or fails closed if the caller
/// ever wires the steps out of order — this should never actually fire
/// given [`SignAndBroadcast::run`]'s fixed step sequence.
fn advance(state: &mut SignFlowState, next: SignFlowState) -> Result<(), Error> {
    if !state.can_advance_to(next) {
        return Err(Error::ProtocolInvariantViolated(format!(
            "illegal sign-flow transition {state:?} -> {next:?}"
        )));
    }
    *state = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainsig_signer::coordinator::{DelegateAction, ExecutionOutcome, ReceiptOutcome, ReceiptStatus, SignedDelegate};
    use chainsig_types::chain::ChainId;
    use chainsig_types::signature::{BigR, CompressedPoint, SField, Scalar32};
    use std::sync::Mutex;

    struct EchoAdapter {
        receipts: Mutex<Vec<ReceiptOutcome>>,
    }

    fn sample_signature_receipt() -> ReceiptOutcome {
        let sig = MpcSignature {
            big_r: BigR {
                affine_point: CompressedPoint([3u8; 33]),
            },
            s: SField { scalar: Scalar32([4u8; 32]) },
            recovery_id: 0,
        };
        use base64::Engine as _;
        let encoded = base64::engine::general_purpose::STANDARD.encode(serde_json::to_string(&serde_json::json!({"Ok": sig})).unwrap());
        ReceiptOutcome {
            status: ReceiptStatus::SuccessValue(encoded),
        }
    }

    #[async_trait::async_trait]
    impl CoordinatorAdapter for EchoAdapter {
        async fn call_view(&self, _contract: &str, _method: &str, _args: serde_json::Value) -> Result<serde_json::Value, Error> {
            Ok(serde_json::json!("1"))
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
                receipts_outcome: self.receipts.lock().unwrap().clone(),
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
                receipts_outcome: self.receipts.lock().unwrap().clone(),
            })
        }

        fn invalidate_nonce_cache(&self, _public_key: &str) {}
    }

    struct StubChain {
        chain_id: ChainId,
        payload_count: u32,
    }

    impl ChainProviderOps for StubChain {
        fn chain_id(&self) -> ChainId {
            self.chain_id.clone()
        }
    }

    #[async_trait::async_trait]
    impl Chain for StubChain {
        type TxRequest = ();
        type Unsigned = Vec<u8>;

        async fn derive_address_and_pubkey(&self, _caller_id: &str, _canonical_path: &str) -> Result<(String, Vec<u8>), Error> {
            unimplemented!()
        }

        async fn prepare_payload(&self, _request: ()) -> Result<(Self::Unsigned, Vec<MpcPayload>), Error> {
            let payloads = (0..self.payload_count)
                .map(|i| MpcPayload { index: i, payload: [i as u8; 32] })
                .collect();
            Ok((vec![], payloads))
        }

        async fn attach_signatures_and_broadcast(&self, _unsigned: Self::Unsigned, signatures: Vec<MpcSignature>) -> Result<String, Error> {
            Ok(format!("broadcast-with-{}-signatures", signatures.len()))
        }

        async fn get_balance(&self, _address: &str) -> Result<u128, Error> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn runs_full_flow_for_a_single_payload_chain() {
        let chain = StubChain {
            chain_id: ChainId::new("eip155", "1"),
            payload_count: 1,
        };
        let adapter = EchoAdapter {
            receipts: Mutex::new(vec![sample_signature_receipt()]),
        };
        let client = MpcSigningClient::new(adapter);
        let orchestrator = SignAndBroadcast {
            chain: &chain,
            signer: &client,
            path: KeyDerivationPath::Opaque("m/44'/60'/0'/0/0".into()),
            contract: "v1.signer",
            caller_auth: "alice.testnet",
            relayer_url: None,
        };
        let result = orchestrator.run((), CancellationToken::new()).await.unwrap();
        assert_eq!(result, "broadcast-with-1-signatures");
    }

    #[tokio::test]
    async fn signs_every_payload_for_a_multi_input_chain() {
        let chain = StubChain {
            chain_id: ChainId::new("bip122", "testnet"),
            payload_count: 3,
        };
        let adapter = EchoAdapter {
            receipts: Mutex::new(vec![sample_signature_receipt()]),
        };
        let client = MpcSigningClient::new(adapter);
        let orchestrator = SignAndBroadcast {
            chain: &chain,
            signer: &client,
            path: KeyDerivationPath::Opaque("m/44'/0'/0'/0/0".into()),
            contract: "v1.signer",
            caller_auth: "alice.testnet",
            relayer_url: None,
        };
        let result = orchestrator.run((), CancellationToken::new()).await.unwrap();
        assert_eq!(result, "broadcast-with-3-signatures");
    }

    #[tokio::test]
    async fn a_pre_cancelled_token_fails_before_any_work() {
        let chain = StubChain {
            chain_id: ChainId::new("eip155", "1"),
            payload_count: 1,
        };
        let adapter = EchoAdapter { receipts: Mutex::new(vec![]) };
        let client = MpcSigningClient::new(adapter);
        let orchestrator = SignAndBroadcast {
            chain: &chain,
            signer: &client,
            path: KeyDerivationPath::Opaque("m/44'/60'/0'/0/0".into()),
            contract: "v1.signer",
            caller_auth: "alice.testnet",
            relayer_url: None,
        };
        let token = CancellationToken::new();
        token.cancel();
        let result = orchestrator.run((), token).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
