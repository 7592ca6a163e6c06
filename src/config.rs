//! Caller-supplied configuration (§6): the coordinator network, signer
//! contract, relayer, and the per-chain registry [`crate::chain::ChainProvider`]
//! is built from.
//!
//! [`ChainsConfig`] is hand-deserialized as a CAIP-2-namespace-keyed JSON
//! map, exactly like the teacher's `ChainsConfig`: the object's keys decide
//! which per-chain config shape is parsed next, rather than requiring an
//! externally-tagged `{"type": "...", ...}` wrapper around every entry.

use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use chainsig_chain_cosmos::CosmosChainParams;
use chainsig_chain_cosmos::params::COSMOS_NAMESPACE;
use chainsig_chain_eip155::Eip155ChainConfig;
use chainsig_chain_eip155::chain::EIP155_NAMESPACE;
use chainsig_derivation::BitcoinNetwork;
use chainsig_types::chain::ChainId;
use chainsig_types::error::Error;

/// The CAIP-2 namespace for Bitcoin and Bitcoin-derived chains. No dedicated
/// constant exists in `chainsig-chain-bitcoin` — that crate takes a
/// caller-supplied [`ChainId`] rather than computing one of its own.
const BIP122_NAMESPACE: &str = "bip122";

/// Which NEAR-shaped network the signer contract and relayer live on
/// (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorNetwork {
    Mainnet,
    Testnet,
}

/// Bitcoin chain configuration. `chainsig-chain-bitcoin` has no config type
/// of its own — [`chainsig_chain_bitcoin::assembler::BitcoinAssembler::new`]
/// takes a network and chain ID directly — so this struct is the root
/// crate's, not grounded on a pre-existing per-chain config like
/// `Eip155ChainConfig`/`CosmosChainParams` are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinChainConfigInner {
    pub network: BitcoinNetwork,
    /// Base URL of the Esplora/mempool.space-shaped REST provider.
    pub rest: url::Url,
}

impl BitcoinChainConfigInner {
    pub fn chain_id(&self) -> ChainId {
        let reference = match self.network {
            BitcoinNetwork::Mainnet => "mainnet",
            BitcoinNetwork::Testnet => "testnet",
            BitcoinNetwork::Regtest => "regtest",
        };
        ChainId::new(BIP122_NAMESPACE, reference)
    }
}

/// One entry in the chain registry, tagged by chain family. Each variant
/// wraps the per-chain-family config its own assembler crate defines.
#[derive(Debug, Clone)]
pub enum ChainConfig {
    Eip155(Eip155ChainConfig),
    Bitcoin(BitcoinChainConfigInner),
    Cosmos(CosmosChainParams),
}

impl ChainConfig {
    pub fn chain_id(&self) -> ChainId {
        match self {
            ChainConfig::Eip155(inner) => inner.chain_id(),
            ChainConfig::Bitcoin(inner) => inner.chain_id(),
            ChainConfig::Cosmos(inner) => inner.caip2_chain_id(),
        }
    }
}

/// The full per-chain registry, keyed by CAIP-2 chain ID on the wire.
///
/// ```json
/// {
///   "eip155:8453": { "chain_reference": 8453, "rpc": [{"http": "https://..."}] },
///   "bip122:testnet": { "network": "testnet", "rest": "https://blockstream.info/testnet/api/" },
///   "cosmos:cosmoshub-4": { "chain_id": "cosmoshub-4", "hrp": "cosmos", "native_denom": "uatom", "gas_price": 0.025, "rest": [{"http": "https://..."}] }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChainsConfig(pub Vec<ChainConfig>);

impl Serialize for ChainsConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            let key = entry.chain_id().to_string();
            match entry {
                ChainConfig::Eip155(inner) => map.serialize_entry(&key, inner)?,
                ChainConfig::Bitcoin(inner) => map.serialize_entry(&key, inner)?,
                ChainConfig::Cosmos(inner) => map.serialize_entry(&key, inner)?,
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ChainsConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChainsConfigVisitor;

        impl<'de> Visitor<'de> for ChainsConfigVisitor {
            type Value = ChainsConfig;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of CAIP-2 chain id to chain configuration")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(key) = map.next_key::<String>()? {
                    let chain_id: ChainId = key
                        .parse()
                        .map_err(|e| serde::de::Error::custom(format!("invalid chain id {key}: {e}")))?;
                    let entry = match chain_id.namespace() {
                        EIP155_NAMESPACE => ChainConfig::Eip155(map.next_value()?),
                        BIP122_NAMESPACE => ChainConfig::Bitcoin(map.next_value()?),
                        COSMOS_NAMESPACE => ChainConfig::Cosmos(map.next_value()?),
                        other => {
                            return Err(serde::de::Error::custom(format!(
                                "unsupported chain namespace {other} for {key}"
                            )));
                        }
                    };
                    entries.push(entry);
                }
                Ok(ChainsConfig(entries))
            }
        }

        deserializer.deserialize_map(ChainsConfigVisitor)
    }
}

/// A caller-provided configuration object (spec.md §6): which coordinator
/// network the signer contract lives on, the contract's account id, an
/// optional relayer, and the chain registry. Holds no credential material —
/// per §1/§6 the core never reads environment variables or private keys
/// directly; [`chainsig_signer::CoordinatorAdapter`] is the caller's own
/// adapter into whatever keystore it already has.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub coordinator_network: CoordinatorNetwork,
    pub signer_contract_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relayer_url: Option<url::Url>,
    pub chains: ChainsConfig,
}

impl Config {
    /// Reads and parses a configuration file. There is no binary in this
    /// crate to wire a `--config` flag to; callers own that.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config_invalid(format!("failed to read config file {}: {e}", path.as_ref().display())))?;
        serde_json::from_str(&contents).map_err(|e| Error::config_invalid(format!("failed to parse config file: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "coordinator_network": "testnet",
            "signer_contract_id": "v1.signer-prod.testnet",
            "relayer_url": "https://relayer.example.com/",
            "chains": {
                "eip155:8453": {"chain_reference": 8453, "rpc": [{"http": "https://base.example.com"}]},
                "bip122:testnet": {"network": "testnet", "rest": "https://blockstream.info/testnet/api/"},
                "cosmos:cosmoshub-4": {"chain_id": "cosmoshub-4", "hrp": "cosmos", "native_denom": "uatom", "gas_price": 0.025, "rest": [{"http": "https://lcd.example.com"}]}
            }
        }"#
    }

    #[test]
    fn parses_one_entry_per_namespace() {
        let config: Config = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(config.coordinator_network, CoordinatorNetwork::Testnet);
        assert_eq!(config.chains.0.len(), 3);
        let namespaces: Vec<String> = config
            .chains
            .0
            .iter()
            .map(|c| c.chain_id().namespace().to_string())
            .collect();
        assert!(namespaces.contains(&"eip155".to_string()));
        assert!(namespaces.contains(&"bip122".to_string()));
        assert!(namespaces.contains(&"cosmos".to_string()));
    }

    #[test]
    fn bitcoin_entry_derives_expected_chain_id() {
        let config: Config = serde_json::from_str(sample_json()).unwrap();
        let bitcoin = config
            .chains
            .0
            .iter()
            .find(|c| matches!(c, ChainConfig::Bitcoin(_)))
            .unwrap();
        assert_eq!(bitcoin.chain_id().to_string(), "bip122:testnet");
    }

    #[test]
    fn rejects_unknown_namespace() {
        let json = r#"{"solana:mainnet": {}}"#;
        let result: Result<ChainsConfig, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn round_trips_through_serialize() {
        let config: Config = serde_json::from_str(sample_json()).unwrap();
        let rendered = serde_json::to_string(&config).unwrap();
        let reparsed: Config = serde_json::from_str(&rendered).unwrap();
        assert_eq!(reparsed.chains.0.len(), 3);
    }
}
