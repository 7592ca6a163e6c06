//! Root/child secp256k1 public keys and epsilon derivation.
//!
//! See the `near-mpc-recovery` wire contract this crate implements:
//! `epsilon = SHA3-256(prefix || caller_id || "," || canonical_path)`,
//! `child = root + epsilon * G`.

use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{AffinePoint, EncodedPoint, ProjectivePoint, Scalar, U256};
use sha3::{Digest, Sha3_256};
use std::str::FromStr;

use crate::error::Error;

/// Literal epsilon-derivation wire contract prefix. Part of the protocol;
/// must never be reconstructed ad hoc anywhere else in this workspace.
pub const EPSILON_DERIVATION_PREFIX: &str = "near-mpc-recovery v0.1.0 epsilon derivation:";

/// NAJ curve tag for secp256k1 keys, used in the `"secp256k1:<base58>"` wire form.
const NAJ_CURVE_TAG: &str = "secp256k1";

/// The signer contract's published root public key, `P`.
///
/// Wire form: `"secp256k1:<base58-of-64-byte-XY>"`. Parsing rejects the
/// identity point and any input not on the curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPublicKey(AffinePoint);

impl RootPublicKey {
    /// Wraps a raw uncompressed point, rejecting the identity point.
    pub fn from_affine(point: AffinePoint) -> Result<Self, Error> {
        if point == AffinePoint::IDENTITY {
            return Err(Error::ProtocolInvariantViolated(
                "root public key is the identity point".into(),
            ));
        }
        Ok(Self(point))
    }

    pub fn as_affine(&self) -> &AffinePoint {
        &self.0
    }

    /// Parses the NAJ wire form `"secp256k1:<base58 64-byte XY>"`.
    pub fn from_naj(naj: &str) -> Result<Self, Error> {
        let (tag, body) = naj
            .split_once(':')
            .ok_or_else(|| Error::RootKeyUnavailable(format!("malformed NAJ key: {naj}")))?;
        if tag != NAJ_CURVE_TAG {
            return Err(Error::RootKeyUnavailable(format!(
                "unsupported curve tag {tag}"
            )));
        }
        let raw = bs58::decode(body)
            .into_vec()
            .map_err(|e| Error::RootKeyUnavailable(format!("invalid base58 in NAJ key: {e}")))?;
        if raw.len() != 64 {
            return Err(Error::RootKeyUnavailable(format!(
                "expected 64-byte XY, got {} bytes",
                raw.len()
            )));
        }
        let mut uncompressed = [0u8; 65];
        uncompressed[0] = 0x04;
        uncompressed[1..].copy_from_slice(&raw);
        let encoded = EncodedPoint::from_bytes(uncompressed)
            .map_err(|e| Error::RootKeyUnavailable(format!("invalid point encoding: {e}")))?;
        let point = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .ok_or_else(|| Error::RootKeyUnavailable("point not on secp256k1 curve".into()))?;
        Self::from_affine(point)
    }

    /// Renders the NAJ wire form.
    pub fn to_naj(&self) -> String {
        let encoded = self.0.to_encoded_point(false);
        let xy = &encoded.as_bytes()[1..];
        format!("{NAJ_CURVE_TAG}:{}", bs58::encode(xy).into_string())
    }
}

impl FromStr for RootPublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_naj(s)
    }
}

/// `epsilon = SHA3-256(prefix || caller_id || "," || canonical_path) mod n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epsilon(Scalar);

impl Epsilon {
    /// Derives epsilon from a caller identity and an already-canonicalized path.
    pub fn derive(caller_id: &str, canonical_path: &str) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(EPSILON_DERIVATION_PREFIX.as_bytes());
        hasher.update(caller_id.as_bytes());
        hasher.update(b",");
        hasher.update(canonical_path.as_bytes());
        let digest = hasher.finalize();
        // `Scalar::reduce` takes the digest modulo the curve order directly,
        // matching "interpreted big-endian mod curve order" in the wire contract.
        let wide = U256::from_be_slice(&digest);
        Epsilon(Scalar::reduce(wide))
    }

    pub fn as_scalar(&self) -> &Scalar {
        &self.0
    }
}

/// `Q = P + epsilon * G`, the key a given `(caller_id, path)` actually signs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildPublicKey(AffinePoint);

impl ChildPublicKey {
    /// Computes the child key, rejecting an identity result (§4.1).
    pub fn derive(root: &RootPublicKey, epsilon: Epsilon) -> Result<Self, Error> {
        let shift = ProjectivePoint::GENERATOR * epsilon.0;
        let child = ProjectivePoint::from(*root.as_affine()) + shift;
        let affine = child.to_affine();
        if affine == AffinePoint::IDENTITY {
            return Err(Error::DerivationFailed);
        }
        Ok(Self(affine))
    }

    pub fn as_affine(&self) -> &AffinePoint {
        &self.0
    }

    /// Uncompressed `0x04 || X || Y`, 65 bytes.
    pub fn to_uncompressed(&self) -> [u8; 65] {
        let encoded = self.0.to_encoded_point(false);
        let mut out = [0u8; 65];
        out.copy_from_slice(encoded.as_bytes());
        out
    }

    /// Compressed `0x02/0x03 || X`, 33 bytes.
    pub fn to_compressed(&self) -> [u8; 33] {
        let encoded = self.0.to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(encoded.as_bytes());
        out
    }
}

/// Public entry point for §4.1's `derive_child_pubkey`: combines epsilon
/// derivation and child key computation in one call.
pub fn derive_child_pubkey(
    root: &RootPublicKey,
    caller_id: &str,
    canonical_path: &str,
) -> Result<ChildPublicKey, Error> {
    let epsilon = Epsilon::derive(caller_id, canonical_path);
    ChildPublicKey::derive(root, epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_root() -> RootPublicKey {
        let scalar = Scalar::from(7u64);
        let point = (ProjectivePoint::GENERATOR * scalar).to_affine();
        RootPublicKey::from_affine(point).unwrap()
    }

    #[test]
    fn epsilon_is_deterministic() {
        let e1 = Epsilon::derive("alice.testnet", "m/44'/60'/0'/0/0");
        let e2 = Epsilon::derive("alice.testnet", "m/44'/60'/0'/0/0");
        assert_eq!(e1, e2);
    }

    #[test]
    fn epsilon_differs_across_paths() {
        let e1 = Epsilon::derive("alice.testnet", "m/44'/60'/0'/0/0");
        let e2 = Epsilon::derive("alice.testnet", "m/44'/60'/0'/0/1");
        assert_ne!(e1, e2);
    }

    #[test]
    fn child_pubkey_derivation_is_deterministic() {
        let root = test_root();
        let child1 = derive_child_pubkey(&root, "alice.testnet", "m/44'/60'/0'/0/0").unwrap();
        let child2 = derive_child_pubkey(&root, "alice.testnet", "m/44'/60'/0'/0/0").unwrap();
        assert_eq!(child1, child2);
    }

    #[test]
    fn naj_round_trips() {
        let root = test_root();
        let naj = root.to_naj();
        assert!(naj.starts_with("secp256k1:"));
        let parsed = RootPublicKey::from_naj(&naj).unwrap();
        assert_eq!(root, parsed);
    }

    proptest::proptest! {
        #[test]
        fn derivation_is_deterministic_for_any_input(
            caller_id in "[a-z.]{1,32}",
            path in "[a-zA-Z0-9'/]{1,32}",
        ) {
            let root = test_root();
            let a = derive_child_pubkey(&root, &caller_id, &path);
            let b = derive_child_pubkey(&root, &caller_id, &path);
            proptest::prop_assert_eq!(a.ok(), b.ok());
        }
    }
}
