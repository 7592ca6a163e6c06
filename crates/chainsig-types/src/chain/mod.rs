//! Chain identification and the cross-chain capability trait.
//!
//! - [`ChainId`] — a CAIP-2 chain identifier (e.g. `eip155:8453`, `bip122:000000000019d6689c085ae165831e93`)
//! - [`ChainIdPattern`] — pattern matching for chain IDs (exact, wildcard, or set)
//! - [`ChainRegistry`] — registry of configured chain providers
//! - [`Chain`] — the capability trait each chain-family assembler implements

mod chain_id;

pub use chain_id::*;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::signature::MpcSignature;
use crate::tx::MpcPayload;

/// Asynchronously constructs an instance of `Self` from a configuration type.
#[async_trait::async_trait]
pub trait FromConfig<TConfig>
where
    Self: Sized,
{
    async fn from_config(config: &TConfig) -> Result<Self, Error>;
}

/// Common metadata available on every chain assembler.
pub trait ChainProviderOps {
    /// The CAIP-2 chain identifier this provider serves.
    fn chain_id(&self) -> ChainId;
}

impl<T: ChainProviderOps> ChainProviderOps for Arc<T> {
    fn chain_id(&self) -> ChainId {
        (**self).chain_id()
    }
}

/// The cross-chain capability trait (design note §9): one implementation
/// per chain family (EVM, Bitcoin, Cosmos), generalizing "derive an
/// address, prepare a payload, attach signatures and broadcast" across
/// otherwise unrelated wire formats.
#[async_trait::async_trait]
pub trait Chain: ChainProviderOps + Send + Sync {
    /// The caller-supplied request type for this chain family (a tagged sum,
    /// per design note §9 — e.g. `Manual{..} | Auto{..}` for Bitcoin).
    type TxRequest: Send + Sync;
    /// The chain family's unsigned-transaction representation.
    type Unsigned: Send + Sync;

    /// §4.1: derives the caller's address and child public key for this chain.
    async fn derive_address_and_pubkey(
        &self,
        caller_id: &str,
        canonical_path: &str,
    ) -> Result<(String, Vec<u8>), Error>;

    /// Builds the unsigned transaction and extracts the sighash(es) the MPC
    /// must sign, ordered ascending by [`MpcPayload::index`].
    async fn prepare_payload(
        &self,
        request: Self::TxRequest,
    ) -> Result<(Self::Unsigned, Vec<MpcPayload>), Error>;

    /// Reattaches MPC signatures (one per payload, same index order) and
    /// broadcasts the finished transaction, returning the chain's tx hash/id.
    async fn attach_signatures_and_broadcast(
        &self,
        unsigned: Self::Unsigned,
        signatures: Vec<MpcSignature>,
    ) -> Result<String, Error>;

    /// Reads the native-asset balance of a derived address, where the chain
    /// supports it cheaply via the same provider used for broadcast.
    async fn get_balance(&self, address: &str) -> Result<u128, Error>;
}

/// Registry of configured chain providers indexed by chain ID.
#[derive(Debug)]
pub struct ChainRegistry<P>(HashMap<ChainId, P>);

impl<P> ChainRegistry<P> {
    pub fn new(providers: HashMap<ChainId, P>) -> Self {
        Self(providers)
    }

    /// Looks up a provider by exact chain ID.
    pub fn by_chain_id(&self, chain_id: &ChainId) -> Option<&P> {
        self.0.get(chain_id)
    }

    /// Looks up providers by chain ID pattern matching.
    pub fn by_chain_id_pattern(&self, pattern: &ChainIdPattern) -> Vec<&P> {
        self.0
            .iter()
            .filter_map(|(chain_id, provider)| pattern.matches(chain_id).then_some(provider))
            .collect()
    }
}
