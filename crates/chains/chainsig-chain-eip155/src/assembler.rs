//! The EVM transaction assembler (§4.4): builds an EIP-1559 transaction,
//! extracts its keccak256 signing hash, and reattaches an MPC-produced RSV
//! signature for broadcast.

use alloy_consensus::{SignableTransaction, TxEip1559};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes, Signature, TxKind, U256};
use std::str::FromStr;

use chainsig_derivation::evm_address;
use chainsig_types::chain::{Chain, ChainId, ChainProviderOps};
use chainsig_types::error::Error;
use chainsig_types::keys::{RootPublicKey, derive_child_pubkey};
use chainsig_types::signature::{MpcSignature, RsvSignature};
use chainsig_types::tx::MpcPayload;

use crate::chain::Eip155ChainProvider;

/// Caller-supplied request for one EVM transaction (§4.4).
#[derive(Debug, Clone)]
pub struct Eip155TxRequest {
    pub caller_id: String,
    pub canonical_path: String,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    /// Overridden by the caller; fetched from RPC when absent.
    pub nonce: Option<u64>,
    pub gas_limit: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

/// An assembled, unsigned EIP-1559 transaction plus the address it was built
/// to be signed by — surfaced for display and for verifying the recovered
/// signature matches the derived address (spec.md §8 EVM round-trip).
#[derive(Debug, Clone)]
pub struct Eip155UnsignedTx {
    pub tx: TxEip1559,
    pub from: Address,
}

/// Implements [`Chain`] for EVM chains addressed by EIP-155 chain ID.
///
/// Holds the coordinator chain's root public key so address derivation is a
/// pure local computation (§4.1); fetching that key from the signer contract
/// is the coordinator adapter's job (§4.2), out of this crate's scope.
pub struct Eip155Assembler {
    provider: Eip155ChainProvider,
    root: RootPublicKey,
}

impl Eip155Assembler {
    pub fn new(provider: Eip155ChainProvider, root: RootPublicKey) -> Self {
        Self { provider, root }
    }
}

#[async_trait::async_trait]
impl Chain for Eip155Assembler {
    type TxRequest = Eip155TxRequest;
    type Unsigned = Eip155UnsignedTx;

    async fn derive_address_and_pubkey(
        &self,
        caller_id: &str,
        canonical_path: &str,
    ) -> Result<(String, Vec<u8>), Error> {
        let child = derive_child_pubkey(&self.root, caller_id, canonical_path)?;
        Ok((evm_address(&child), child.to_uncompressed().to_vec()))
    }

    async fn prepare_payload(
        &self,
        request: Self::TxRequest,
    ) -> Result<(Self::Unsigned, Vec<MpcPayload>), Error> {
        let (from, _pubkey) = self
            .derive_address_and_pubkey(&request.caller_id, &request.canonical_path)
            .await?;
        let from = Address::from_str(&from)
            .map_err(|e| Error::ProtocolInvariantViolated(format!("derived address malformed: {e}")))?;

        let nonce = match request.nonce {
            Some(n) => n,
            None => self.provider.next_nonce(from).await?,
        };

        let (max_fee_per_gas, max_priority_fee_per_gas) =
            match (request.max_fee_per_gas, request.max_priority_fee_per_gas) {
                (Some(max_fee), Some(priority)) => (max_fee, priority),
                _ => self.provider.suggest_fees().await,
            };

        let gas_limit = match request.gas_limit {
            Some(g) => g,
            None => {
                let call = serde_json::json!({
                    "from": from.to_checksum(None),
                    "to": request.to.to_checksum(None),
                    "value": format!("0x{:x}", request.value),
                    "data": format!("0x{}", hex::encode(&request.data)),
                });
                self.provider.estimate_gas(call).await?
            }
        };

        let tx = TxEip1559 {
            chain_id: self.provider.chain.inner(),
            nonce,
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            to: TxKind::Call(request.to),
            value: request.value,
            access_list: Default::default(),
            input: request.data,
        };

        let sighash = tx.signature_hash();
        let unsigned = Eip155UnsignedTx { tx, from };
        Ok((unsigned, vec![MpcPayload { index: 0, payload: *sighash }]))
    }

    async fn attach_signatures_and_broadcast(
        &self,
        unsigned: Self::Unsigned,
        signatures: Vec<MpcSignature>,
    ) -> Result<String, Error> {
        let sig = signatures
            .first()
            .ok_or_else(|| Error::ProtocolInvariantViolated("EVM tx requires exactly one signature".into()))?;
        let rsv = RsvSignature::try_from(sig)?;

        let signature = Signature::new(
            U256::from_be_bytes(rsv.r),
            U256::from_be_bytes(rsv.s),
            rsv.v != 0,
        );
        let signed = unsigned.tx.into_signed(signature);
        let raw = signed.encoded_2718();
        let result = self.provider.send_raw_transaction(&raw).await;
        if result.is_err() {
            // The cached nonce can no longer be trusted once a broadcast
            // fails; force the next assembly for this address to requery.
            self.provider.reset_nonce(unsigned.from).await;
        }
        result
    }

    async fn get_balance(&self, address: &str) -> Result<u128, Error> {
        self.provider.get_balance(address).await
    }
}

impl ChainProviderOps for Eip155Assembler {
    fn chain_id(&self) -> ChainId {
        self.provider.chain_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::{ProjectivePoint, Scalar};

    fn test_root() -> RootPublicKey {
        let scalar = Scalar::from(11u64);
        let point = (ProjectivePoint::GENERATOR * scalar).to_affine();
        RootPublicKey::from_affine(point).unwrap()
    }

    #[test]
    fn derived_address_matches_evm_address_helper() {
        let root = test_root();
        let child = derive_child_pubkey(&root, "alice.testnet", "m/44'/60'/0'/0/0").unwrap();
        let expected = evm_address(&child);
        assert!(expected.starts_with("0x"));
        assert_eq!(expected.len(), 42);
    }

    #[test]
    fn unsigned_tx_signature_hash_is_deterministic() {
        let tx = TxEip1559 {
            chain_id: 1,
            nonce: 0,
            gas_limit: 21_000,
            max_fee_per_gas: 10_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
            to: TxKind::Call(Address::ZERO),
            value: U256::ZERO,
            access_list: Default::default(),
            input: Bytes::new(),
        };
        let h1 = tx.signature_hash();
        let h2 = tx.clone().signature_hash();
        assert_eq!(h1, h2);
    }
}
