//! Caller configuration for the EVM assembler.

use serde::{Deserialize, Serialize};

use chainsig_types::chain::ChainId;
use chainsig_types::config::RpcConfig;

use crate::chain::Eip155ChainReference;

/// Configuration for a single EVM chain. No signer material — this crate
/// never holds a native private key for the chains it assembles for (§1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eip155ChainConfig {
    pub chain_reference: Eip155ChainReference,
    /// RPC provider configuration for this chain (required).
    pub rpc: Vec<RpcConfig>,
    /// `maxFeePerGas`/`maxPriorityFeePerGas` fallback when `eth_feeHistory`
    /// is unavailable and the caller did not supply fee fields (§4.4,
    /// spec.md §9 REDESIGN FLAGS — documented default, not silently fixed).
    #[serde(default = "eip155_chain_config::default_fee_gwei")]
    pub default_fee_gwei: u64,
}

impl Eip155ChainConfig {
    pub fn chain_id(&self) -> ChainId {
        self.chain_reference.into()
    }
}

mod eip155_chain_config {
    pub fn default_fee_gwei() -> u64 {
        10
    }
}
