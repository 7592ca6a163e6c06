//! Key derivation paths and RFC 8785 canonicalization.
//!
//! The signer contract only ever sees a UTF-8 string: either the caller's
//! opaque string verbatim, or the canonical JSON form of a structured path.
//! Two structured paths with equal (sorted, null-omitted) content MUST
//! canonicalize to byte-identical strings — see the canonicalization
//! invariant in the test module below.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A key derivation path as handed to the signer contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyDerivationPath {
    /// A caller-supplied string, used as-is.
    Opaque(String),
    /// A structured path, reduced to its canonical string via [`StructuredPath::canonicalize`].
    Structured(StructuredPath),
}

impl KeyDerivationPath {
    /// Returns the canonical string this path resolves to.
    pub fn canonicalize(&self) -> String {
        match self {
            KeyDerivationPath::Opaque(s) => s.clone(),
            KeyDerivationPath::Structured(p) => p.canonicalize(),
        }
    }
}

/// The structured form of a key derivation path.
///
/// `chain` is a SLIP-44 coin number. `domain` and `meta` are optional and
/// are omitted entirely from the canonical form when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredPath {
    pub chain: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl StructuredPath {
    pub fn new(chain: u64) -> Self {
        Self {
            chain,
            domain: None,
            meta: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Produces the RFC 8785-shaped canonical JSON string: object keys
    /// sorted lexicographically, no insignificant whitespace, `null` fields
    /// omitted.
    pub fn canonicalize(&self) -> String {
        let value = serde_json::to_value(self).expect("StructuredPath always serializes");
        canonical_json_string(&value)
    }
}

/// Renders a [`serde_json::Value`] as canonical JSON: object members sorted
/// by key, compact separators, `null`-valued object members dropped.
///
/// This is not a full RFC 8785 implementation (it does not canonicalize
/// floating point formatting) but matches JCS for the integer/string/bool/
/// nested-object inputs a derivation path is built from.
fn canonical_json_string(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !v.is_null()).collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let rendered: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", serde_json::to_string(k).unwrap(), canonical_json_string(v)))
                .collect();
            format!("{{{}}}", rendered.join(","))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json_string).collect();
            format!("[{}]", rendered.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonicalizes_sorted_keys_and_drops_nulls() {
        let p1 = StructuredPath {
            chain: 60,
            domain: Some("example.com".into()),
            meta: Some(json!({"a": 1, "b": 2})),
        };
        assert_eq!(
            p1.canonicalize(),
            r#"{"chain":60,"domain":"example.com","meta":{"a":1,"b":2}}"#
        );
    }

    #[test]
    fn canonicalization_is_order_independent() {
        let p1 = StructuredPath {
            chain: 60,
            domain: Some("example.com".into()),
            meta: Some(json!({"a": 1, "b": 2})),
        };
        let p2 = StructuredPath {
            chain: 60,
            domain: Some("example.com".into()),
            meta: Some(json!({"b": 2, "a": 1})),
        };
        assert_eq!(p1.canonicalize(), p2.canonicalize());
    }

    #[test]
    fn opaque_path_passes_through() {
        let path = KeyDerivationPath::Opaque("m/44'/60'/0'/0/0".into());
        assert_eq!(path.canonicalize(), "m/44'/60'/0'/0/0");
    }

    #[test]
    fn absent_optional_fields_are_omitted() {
        let path = StructuredPath::new(118);
        assert_eq!(path.canonicalize(), r#"{"chain":118}"#);
    }

    proptest::proptest! {
        #[test]
        fn canonicalization_matches_regardless_of_meta_key_order(
            chain in 0u64..10_000,
            a in 0i64..1000,
            b in 0i64..1000,
        ) {
            let p1 = StructuredPath::new(chain).with_meta(json!({"a": a, "b": b}));
            let p2 = StructuredPath::new(chain).with_meta(json!({"b": b, "a": a}));
            proptest::prop_assert_eq!(p1.canonicalize(), p2.canonicalize());
        }
    }
}
