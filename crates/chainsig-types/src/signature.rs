//! Signature formats: the contract's native form and the two per-chain
//! shapes it is translated into.

use k256::elliptic_curve::scalar::IsHigh;
use k256::Scalar;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A 33-byte compressed secp256k1 point, hex-encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompressedPoint(#[serde(with = "hex_bytes33")] pub [u8; 33]);

/// A 32-byte scalar, hex-encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scalar32(#[serde(with = "hex_bytes32")] pub [u8; 32]);

/// `0` or `1`: which of the two possible `y` values the nonce point used.
pub type RecoveryId = u8;

/// The signature exactly as the signer contract returns it.
///
/// Field names match the contract's JSON shape (`big_r.affine_point`,
/// `s.scalar`, `recovery_id`) so this type deserializes directly out of a
/// decoded `SuccessValue` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpcSignature {
    pub big_r: BigR,
    pub s: SField,
    pub recovery_id: RecoveryId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigR {
    pub affine_point: CompressedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SField {
    pub scalar: Scalar32,
}

impl MpcSignature {
    /// The signature's `r` component: `big_r.affine_point` with the leading
    /// parity byte dropped, per the contract-specific convention in §3.
    pub fn r(&self) -> [u8; 32] {
        let mut r = [0u8; 32];
        r.copy_from_slice(&self.big_r.affine_point.0[1..]);
        r
    }

    pub fn s(&self) -> [u8; 32] {
        self.s.scalar.0
    }
}

/// `{r, s, v}` as EVM's `ecrecover`/RLP signature fields expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsvSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl TryFrom<&MpcSignature> for RsvSignature {
    type Error = Error;

    fn try_from(sig: &MpcSignature) -> Result<Self, Self::Error> {
        Ok(RsvSignature {
            r: sig.r(),
            s: sig.s(),
            v: sig.recovery_id,
        })
    }
}

/// Raw 64-byte `R || S`, the form Bitcoin (after DER-encoding) and Cosmos
/// signatures are built from. Normalized to low-S per BIP-62/secp256k1
/// standardness, since neither chain family accepts a high-S signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Raw64Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl TryFrom<&MpcSignature> for Raw64Signature {
    type Error = Error;

    fn try_from(sig: &MpcSignature) -> Result<Self, Self::Error> {
        let r = sig.r();
        let s = low_s(sig.s())?;
        Ok(Raw64Signature { r, s })
    }
}

/// Flips `s` to `n - s` when it is in the upper half of the scalar field,
/// the canonical low-S form BIP-62 and Cosmos SDK both require.
fn low_s(s: [u8; 32]) -> Result<[u8; 32], Error> {
    let scalar = Option::<Scalar>::from(Scalar::from_repr(s.into()))
        .ok_or_else(|| Error::ProtocolInvariantViolated("signature s is not a valid secp256k1 scalar".into()))?;
    if bool::from(scalar.is_high()) {
        Ok((-scalar).to_bytes().into())
    } else {
        Ok(s)
    }
}

mod hex_bytes33 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 33], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 33], D::Error> {
        let s = String::deserialize(d)?;
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|v: Vec<u8>| serde::de::Error::custom(format!("expected 33 bytes, got {}", v.len())))
    }
}

mod hex_bytes32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|v: Vec<u8>| serde::de::Error::custom(format!("expected 32 bytes, got {}", v.len())))
    }
}
