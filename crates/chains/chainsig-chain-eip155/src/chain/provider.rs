//! The EVM RPC transport: JSON-RPC calls only, no local signer.
//!
//! Grounded on `Eip155ChainProvider::rpc_client` in the teacher project: the
//! same fallback-over-throttled-HTTP-transports construction, generalized to
//! plain `eth_*` JSON-RPC calls instead of a filled, wallet-backed
//! `alloy_provider::Provider`. There is no local wallet here — every
//! signature this crate ever attaches came from the MPC signing client.

use std::num::NonZeroUsize;

use alloy_rpc_client::RpcClient;
use alloy_transport::TransportError;
use alloy_transport::layers::{FallbackLayer, ThrottleLayer};
use alloy_transport_http::Http;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower::ServiceBuilder;

use alloy_primitives::Address;

use chainsig_types::chain::{ChainId, ChainProviderOps, FromConfig};
use chainsig_types::config::RpcConfig;
use chainsig_types::error::Error;

use crate::chain::config::Eip155ChainConfig;
use crate::chain::nonce::PendingNonceManager;
use crate::chain::types::Eip155ChainReference;

/// Thin JSON-RPC transport plus the per-chain defaults the assembler needs.
#[derive(Debug)]
pub struct Eip155ChainProvider {
    pub(crate) chain: Eip155ChainReference,
    pub(crate) default_fee_gwei: u64,
    client: RpcClient,
    nonces: PendingNonceManager,
}

impl Eip155ChainProvider {
    /// Builds a fallback-over-throttled-HTTP-transports RPC client, exactly
    /// as the teacher's `Eip155ChainProvider::rpc_client` does.
    pub fn rpc_client(chain_id: ChainId, rpc: &[RpcConfig]) -> Result<RpcClient, Error> {
        let transports = rpc
            .iter()
            .filter(|provider_config| matches!(provider_config.http.scheme(), "http" | "https"))
            .map(|provider_config| {
                #[cfg(feature = "telemetry")]
                tracing::info!(chain = %chain_id, rpc_url = %provider_config.http, "using HTTP transport");
                let rate_limit = provider_config.rate_limit.unwrap_or(u32::MAX);
                ServiceBuilder::new()
                    .layer(ThrottleLayer::new(rate_limit))
                    .service(Http::new(provider_config.http.clone()))
            })
            .collect::<Vec<_>>();
        let active = NonZeroUsize::new(transports.len())
            .ok_or_else(|| Error::config_invalid(format!("no RPC providers configured for {chain_id}")))?;
        let fallback = ServiceBuilder::new()
            .layer(FallbackLayer::default().with_active_transport_count(active))
            .service(transports);
        Ok(RpcClient::new(fallback, false))
    }

    async fn rpc_call<P, R>(&self, method: &'static str, params: P) -> Result<R, Error>
    where
        P: Serialize + Clone + core::fmt::Debug + Send + Sync + Unpin,
        R: DeserializeOwned + core::fmt::Debug + Send + Sync + Unpin + 'static,
    {
        self.client
            .request(method, params)
            .await
            .map_err(|e: TransportError| Error::ProviderUnreachable(e.to_string()))
    }

    /// `eth_getTransactionCount(from, "latest")`.
    pub async fn transaction_count(&self, address: &str) -> Result<u64, Error> {
        let hex: String = self.rpc_call("eth_getTransactionCount", (address, "latest")).await?;
        parse_hex_u64(&hex)
    }

    /// `eth_getTransactionCount(from, "pending")` — includes mempool
    /// transactions, used only to seed the local nonce cache.
    async fn pending_transaction_count(&self, address: Address) -> Result<u64, Error> {
        let hex: String = self
            .rpc_call("eth_getTransactionCount", (address.to_checksum(None), "pending"))
            .await?;
        parse_hex_u64(&hex)
    }

    /// The next nonce to use for `address`, cached locally after the first
    /// pending-inclusive fetch (§5: concurrent transactions from the same
    /// derived address must not race on `eth_getTransactionCount`).
    pub async fn next_nonce(&self, address: Address) -> Result<u64, Error> {
        self.nonces
            .next_nonce(address, || self.pending_transaction_count(address))
            .await
    }

    /// Forces the next [`Eip155ChainProvider::next_nonce`] call for `address`
    /// to requery the RPC. Call this when a broadcast fails, since the
    /// cached nonce can no longer be trusted.
    pub async fn reset_nonce(&self, address: Address) {
        self.nonces.reset(address).await;
    }

    /// `eth_estimateGas` against a plain call object.
    pub async fn estimate_gas(&self, call: serde_json::Value) -> Result<u64, Error> {
        let hex: String = self.rpc_call("eth_estimateGas", (call,)).await?;
        parse_hex_u64(&hex)
    }

    /// `eth_feeHistory`-derived fee, falling back to [`Eip155ChainProvider::default_fee_gwei`]
    /// when the RPC is unavailable — the documented fallback default of §9.
    pub async fn suggest_fees(&self) -> (u128, u128) {
        let default = self.default_fee_gwei as u128 * 1_000_000_000;
        match self.fee_history().await {
            Ok(base_fee) => (base_fee + default, default),
            Err(_) => (default, default),
        }
    }

    async fn fee_history(&self) -> Result<u128, Error> {
        #[derive(Debug, serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct FeeHistory {
            base_fee_per_gas: Vec<String>,
        }
        let history: FeeHistory = self
            .rpc_call("eth_feeHistory", (1u64, "latest", [] as [u64; 0]))
            .await?;
        let latest = history
            .base_fee_per_gas
            .last()
            .ok_or_else(|| Error::ProtocolInvariantViolated("empty eth_feeHistory response".into()))?;
        parse_hex_u128(latest)
    }

    /// `eth_sendRawTransaction`.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String, Error> {
        let hex = format!("0x{}", hex::encode(raw));
        self.rpc_call("eth_sendRawTransaction", (hex,)).await
    }

    /// `eth_getBalance(address, "latest")`.
    pub async fn get_balance(&self, address: &str) -> Result<u128, Error> {
        let hex: String = self.rpc_call("eth_getBalance", (address, "latest")).await?;
        parse_hex_u128(&hex)
    }
}

fn parse_hex_u64(s: &str) -> Result<u64, Error> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| Error::ProtocolInvariantViolated(format!("invalid hex quantity {s}: {e}")))
}

fn parse_hex_u128(s: &str) -> Result<u128, Error> {
    u128::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| Error::ProtocolInvariantViolated(format!("invalid hex quantity {s}: {e}")))
}

#[async_trait::async_trait]
impl FromConfig<Eip155ChainConfig> for Eip155ChainProvider {
    async fn from_config(config: &Eip155ChainConfig) -> Result<Self, Error> {
        let client = Self::rpc_client(config.chain_id(), &config.rpc)?;
        Ok(Self {
            chain: config.chain_reference,
            default_fee_gwei: config.default_fee_gwei,
            client,
            nonces: PendingNonceManager::default(),
        })
    }
}

impl ChainProviderOps for Eip155ChainProvider {
    fn chain_id(&self) -> ChainId {
        self.chain.into()
    }
}
