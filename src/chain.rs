//! The cross-chain-family [`Chain`] implementation (design note §9).
//!
//! Grounded on the teacher's `ChainProvider` enum
//! (`chain/mod.rs`): one variant per chain family, wrapped in an `Arc` so a
//! registry can be shared across concurrent signs, with `FromConfig`/
//! `ChainProviderOps` implemented by matching on the variant. Unlike the
//! teacher's `ChainProvider` — whose per-family providers all share one
//! `TxRequest`/`Unsigned` shape — EVM, Bitcoin, and Cosmos assemblers here
//! have genuinely different request and unsigned-transaction types, so this
//! crate introduces [`AnyTxRequest`]/[`AnyUnsignedTx`] sum types to let
//! `ChainProvider` itself implement a single, concrete [`Chain`].
//!
//! The teacher's chain providers also each own their own signer wallet, so
//! `FromConfig<ChainConfig>` alone is enough to build one. Every assembler
//! here instead derives its addresses from one coordinator-chain root public
//! key fetched at runtime (§4.1/§4.2), so construction takes that key
//! alongside the per-chain config — see [`FromConfig`] for
//! `(ChainConfig, RootPublicKey)`.

use std::collections::HashMap;
use std::sync::Arc;

use chainsig_chain_bitcoin::{BitcoinAssembler, BitcoinTxRequest, BitcoinUnsignedTx, HttpBitcoinProvider};
use chainsig_chain_cosmos::{CosmosAssembler, CosmosTxRequest, CosmosUnsignedTx, HttpCosmosProvider};
use chainsig_chain_eip155::{Eip155Assembler, Eip155ChainProvider, Eip155TxRequest, Eip155UnsignedTx};
use chainsig_types::chain::{Chain, ChainId, ChainProviderOps, ChainRegistry, FromConfig};
use chainsig_types::error::Error;
use chainsig_types::keys::RootPublicKey;
use chainsig_types::signature::MpcSignature;
use chainsig_types::tx::MpcPayload;

use crate::config::{ChainConfig, ChainsConfig};

/// The tagged union of every chain family's request type.
#[derive(Debug, Clone)]
pub enum AnyTxRequest {
    Eip155(Eip155TxRequest),
    Bitcoin(BitcoinTxRequest),
    Cosmos(CosmosTxRequest),
}

/// The tagged union of every chain family's unsigned-transaction type.
#[derive(Debug, Clone)]
pub enum AnyUnsignedTx {
    Eip155(Eip155UnsignedTx),
    Bitcoin(BitcoinUnsignedTx),
    Cosmos(CosmosUnsignedTx),
}

/// One configured chain, dispatched to the concrete assembler for its family.
pub enum ChainProvider {
    Eip155(Arc<Eip155Assembler>),
    Bitcoin(Arc<BitcoinAssembler<HttpBitcoinProvider>>),
    Cosmos(Arc<CosmosAssembler<HttpCosmosProvider>>),
}

impl ChainProviderOps for ChainProvider {
    fn chain_id(&self) -> ChainId {
        match self {
            ChainProvider::Eip155(a) => a.chain_id(),
            ChainProvider::Bitcoin(a) => a.chain_id(),
            ChainProvider::Cosmos(a) => a.chain_id(),
        }
    }
}

#[async_trait::async_trait]
impl Chain for ChainProvider {
    type TxRequest = AnyTxRequest;
    type Unsigned = AnyUnsignedTx;

    async fn derive_address_and_pubkey(
        &self,
        caller_id: &str,
        canonical_path: &str,
    ) -> Result<(String, Vec<u8>), Error> {
        match self {
            ChainProvider::Eip155(a) => a.derive_address_and_pubkey(caller_id, canonical_path).await,
            ChainProvider::Bitcoin(a) => a.derive_address_and_pubkey(caller_id, canonical_path).await,
            ChainProvider::Cosmos(a) => a.derive_address_and_pubkey(caller_id, canonical_path).await,
        }
    }

    async fn prepare_payload(
        &self,
        request: Self::TxRequest,
    ) -> Result<(Self::Unsigned, Vec<MpcPayload>), Error> {
        match (self, request) {
            (ChainProvider::Eip155(a), AnyTxRequest::Eip155(req)) => {
                let (unsigned, payloads) = a.prepare_payload(req).await?;
                Ok((AnyUnsignedTx::Eip155(unsigned), payloads))
            }
            (ChainProvider::Bitcoin(a), AnyTxRequest::Bitcoin(req)) => {
                let (unsigned, payloads) = a.prepare_payload(req).await?;
                Ok((AnyUnsignedTx::Bitcoin(unsigned), payloads))
            }
            (ChainProvider::Cosmos(a), AnyTxRequest::Cosmos(req)) => {
                let (unsigned, payloads) = a.prepare_payload(req).await?;
                Ok((AnyUnsignedTx::Cosmos(unsigned), payloads))
            }
            (provider, request) => Err(Error::ProtocolInvariantViolated(format!(
                "request for {:?} does not match configured chain family for {}",
                request, provider.chain_id()
            ))),
        }
    }

    async fn attach_signatures_and_broadcast(
        &self,
        unsigned: Self::Unsigned,
        signatures: Vec<MpcSignature>,
    ) -> Result<String, Error> {
        match (self, unsigned) {
            (ChainProvider::Eip155(a), AnyUnsignedTx::Eip155(tx)) => a.attach_signatures_and_broadcast(tx, signatures).await,
            (ChainProvider::Bitcoin(a), AnyUnsignedTx::Bitcoin(tx)) => a.attach_signatures_and_broadcast(tx, signatures).await,
            (ChainProvider::Cosmos(a), AnyUnsignedTx::Cosmos(tx)) => a.attach_signatures_and_broadcast(tx, signatures).await,
            (provider, _) => Err(Error::ProtocolInvariantViolated(format!(
                "unsigned transaction does not match configured chain family for {}",
                provider.chain_id()
            ))),
        }
    }

    async fn get_balance(&self, address: &str) -> Result<u128, Error> {
        match self {
            ChainProvider::Eip155(a) => a.get_balance(address).await,
            ChainProvider::Bitcoin(a) => a.get_balance(address).await,
            ChainProvider::Cosmos(a) => a.get_balance(address).await,
        }
    }
}

#[async_trait::async_trait]
impl FromConfig<(ChainConfig, RootPublicKey)> for ChainProvider {
    async fn from_config(config: &(ChainConfig, RootPublicKey)) -> Result<Self, Error> {
        let (chain_config, root) = config;
        match chain_config {
            ChainConfig::Eip155(inner) => {
                let provider = Eip155ChainProvider::from_config(inner).await?;
                Ok(ChainProvider::Eip155(Arc::new(Eip155Assembler::new(provider, root.clone()))))
            }
            ChainConfig::Bitcoin(inner) => {
                let provider = HttpBitcoinProvider::new(inner.rest.clone());
                let chain_id = inner.chain_id();
                Ok(ChainProvider::Bitcoin(Arc::new(BitcoinAssembler::new(
                    provider,
                    root.clone(),
                    inner.network,
                    chain_id,
                ))))
            }
            ChainConfig::Cosmos(inner) => {
                let provider = HttpCosmosProvider::new(&inner.rest)?;
                Ok(ChainProvider::Cosmos(Arc::new(CosmosAssembler::new(provider, root.clone(), inner.clone()))))
            }
        }
    }
}

#[async_trait::async_trait]
impl FromConfig<(ChainsConfig, RootPublicKey)> for ChainRegistry<ChainProvider> {
    async fn from_config(config: &(ChainsConfig, RootPublicKey)) -> Result<Self, Error> {
        let (chains, root) = config;
        let mut map = HashMap::with_capacity(chains.0.len());
        for chain_config in &chains.0 {
            let provider = ChainProvider::from_config(&(chain_config.clone(), root.clone())).await?;
            map.insert(provider.chain_id(), provider);
        }
        Ok(ChainRegistry::new(map))
    }
}
