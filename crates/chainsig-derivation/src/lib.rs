#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Address derivation for Bitcoin, EVM, and Cosmos chains (§4.1).
//!
//! Each function takes a [`ChildPublicKey`](chainsig_types::keys::ChildPublicKey)
//! — the key a specific `(caller_id, path)` pair actually signs with — and
//! produces the address a chain-family assembler derives that identity as.
//! [`derive_child_pubkey`] is re-exported from `chainsig-types` so a caller
//! needs only this crate for the full "root key in, address out" path.

pub use chainsig_types::keys::derive_child_pubkey;

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};

use chainsig_types::error::Error;
use chainsig_types::keys::ChildPublicKey;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// Bitcoin network, selecting the bech32 HRP an address is encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinNetwork {
    Mainnet,
    Testnet,
    Regtest,
}

impl BitcoinNetwork {
    fn hrp(self) -> &'static str {
        match self {
            BitcoinNetwork::Mainnet => "bc",
            BitcoinNetwork::Testnet => "tb",
            BitcoinNetwork::Regtest => "bcrt",
        }
    }
}

/// `evm_address(child_pubkey) → 20 bytes`: Keccak-256 of the uncompressed
/// point (sans the `0x04` prefix), last 20 bytes, `0x`-prefixed lowercase hex.
pub fn evm_address(child_pubkey: &ChildPublicKey) -> String {
    let uncompressed = child_pubkey.to_uncompressed();
    let mut hasher = Keccak256::new();
    hasher.update(&uncompressed[1..]);
    let digest = hasher.finalize();
    format!("0x{}", hex::encode(&digest[12..]))
}

/// `bitcoin_p2wpkh_address(child_pubkey, network) → bech32 string`: SHA-256
/// then RIPEMD-160 of the compressed point, encoded as a witness-version-0
/// bech32 address with the network's HRP.
pub fn bitcoin_p2wpkh_address(child_pubkey: &ChildPublicKey, network: BitcoinNetwork) -> Result<String, Error> {
    let hash160 = hash160(&child_pubkey.to_compressed());
    let hrp = Hrp::parse(network.hrp())
        .map_err(|e| Error::ProtocolInvariantViolated(format!("invalid bitcoin HRP: {e}")))?;
    bech32::segwit::encode_v0(hrp, &hash160)
        .map_err(|e| Error::ProtocolInvariantViolated(format!("bech32 segwit encoding failed: {e}")))
}

/// `cosmos_bech32_address(child_pubkey, hrp) → string`: SHA-256 then
/// RIPEMD-160 of the compressed point, bech32-encoded with a chain-specific
/// HRP (e.g. `cosmos`, `osmo`).
pub fn cosmos_bech32_address(child_pubkey: &ChildPublicKey, hrp: &str) -> Result<String, Error> {
    let hash160 = hash160(&child_pubkey.to_compressed());
    let hrp = Hrp::parse(hrp).map_err(|e| Error::ProtocolInvariantViolated(format!("invalid cosmos HRP: {e}")))?;
    bech32::encode::<Bech32>(hrp, &hash160)
        .map_err(|e| Error::ProtocolInvariantViolated(format!("bech32 encoding failed: {e}")))
}

fn hash160(input: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(input);
    let ripemd = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripemd);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainsig_types::keys::{Epsilon, RootPublicKey};
    use k256::{ProjectivePoint, Scalar};

    fn test_child() -> ChildPublicKey {
        let root_scalar = Scalar::from(11u64);
        let root_point = (ProjectivePoint::GENERATOR * root_scalar).to_affine();
        let root = RootPublicKey::from_affine(root_point).unwrap();
        let epsilon = Epsilon::derive("alice.testnet", "m/44'/60'/0'/0/0");
        ChildPublicKey::derive(&root, epsilon).unwrap()
    }

    #[test]
    fn evm_address_is_twenty_bytes_hex_prefixed() {
        let addr = evm_address(&test_child());
        assert!(addr.starts_with("0x"));
        assert_eq!(addr.len(), 42);
    }

    #[test]
    fn evm_address_is_deterministic() {
        let child = test_child();
        assert_eq!(evm_address(&child), evm_address(&child));
    }

    #[test]
    fn bitcoin_address_uses_testnet_hrp() {
        let addr = bitcoin_p2wpkh_address(&test_child(), BitcoinNetwork::Testnet).unwrap();
        assert!(addr.starts_with("tb1"));
    }

    #[test]
    fn bitcoin_address_uses_mainnet_hrp() {
        let addr = bitcoin_p2wpkh_address(&test_child(), BitcoinNetwork::Mainnet).unwrap();
        assert!(addr.starts_with("bc1"));
    }

    #[test]
    fn cosmos_address_uses_requested_hrp() {
        let addr = cosmos_bech32_address(&test_child(), "cosmos").unwrap();
        assert!(addr.starts_with("cosmos1"));
        let osmo = cosmos_bech32_address(&test_child(), "osmo").unwrap();
        assert!(osmo.starts_with("osmo1"));
    }

    #[test]
    fn bitcoin_and_cosmos_addresses_share_the_same_hash160() {
        let child = test_child();
        let btc = bitcoin_p2wpkh_address(&child, BitcoinNetwork::Mainnet).unwrap();
        let cosmos = cosmos_bech32_address(&child, "cosmos").unwrap();
        assert_ne!(btc, cosmos);
    }

    proptest::proptest! {
        #[test]
        fn evm_address_is_deterministic_for_any_path(path in "[a-zA-Z0-9'/]{1,32}") {
            let root_scalar = Scalar::from(11u64);
            let root_point = (ProjectivePoint::GENERATOR * root_scalar).to_affine();
            let root = RootPublicKey::from_affine(root_point).unwrap();
            let epsilon = Epsilon::derive("alice.testnet", &path);
            let child = ChildPublicKey::derive(&root, epsilon).unwrap();
            proptest::prop_assert_eq!(evm_address(&child), evm_address(&child));
        }
    }
}
