//! The Cosmos SDK `SIGN_MODE_DIRECT` transaction assembler (§4.6).

use cosmos_sdk_proto::Any;
use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
use cosmos_sdk_proto::cosmos::crypto::secp256k1::PubKey;
use cosmos_sdk_proto::cosmos::tx::v1beta1::mode_info::{Single, Sum};
use cosmos_sdk_proto::cosmos::tx::v1beta1::{AuthInfo, Fee, ModeInfo, SignDoc, SignerInfo, TxBody, TxRaw};
use prost::Message;
use sha2::{Digest, Sha256};

use chainsig_derivation::cosmos_bech32_address;
use chainsig_types::chain::{Chain, ChainId, ChainProviderOps};
use chainsig_types::error::Error;
use chainsig_types::keys::{RootPublicKey, derive_child_pubkey};
use chainsig_types::signature::{MpcSignature, Raw64Signature};
use chainsig_types::tx::MpcPayload;

use crate::messages::CosmosMessage;
use crate::params::CosmosChainParams;
use crate::provider::CosmosProvider;

/// One request to sign a Cosmos transaction (§4.6).
#[derive(Debug, Clone)]
pub struct CosmosTxRequest {
    pub caller_id: String,
    pub canonical_path: String,
    pub messages: Vec<CosmosMessage>,
    pub memo: Option<String>,
    /// Gas limit override; defaults to [`CosmosChainParams::default_gas_limit`].
    pub gas: Option<u64>,
}

/// The two proto-encoded byte strings a `SignDoc`/`TxRaw` are built from,
/// plus the exact compressed pubkey `SignerInfo` was built against.
#[derive(Debug, Clone)]
pub struct CosmosUnsignedTx {
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    pub compressed_pubkey: [u8; 33],
}

/// Implements [`Chain`] for Cosmos SDK chains under `SIGN_MODE_DIRECT`.
pub struct CosmosAssembler<P> {
    provider: P,
    root: RootPublicKey,
    params: CosmosChainParams,
}

impl<P: CosmosProvider> CosmosAssembler<P> {
    pub fn new(provider: P, root: RootPublicKey, params: CosmosChainParams) -> Self {
        Self { provider, root, params }
    }
}

#[async_trait::async_trait]
impl<P: CosmosProvider> Chain for CosmosAssembler<P> {
    type TxRequest = CosmosTxRequest;
    type Unsigned = CosmosUnsignedTx;

    async fn derive_address_and_pubkey(
        &self,
        caller_id: &str,
        canonical_path: &str,
    ) -> Result<(String, Vec<u8>), Error> {
        let child = derive_child_pubkey(&self.root, caller_id, canonical_path)?;
        let address = cosmos_bech32_address(&child, &self.params.hrp)?;
        Ok((address, child.to_compressed().to_vec()))
    }

    async fn prepare_payload(
        &self,
        request: Self::TxRequest,
    ) -> Result<(Self::Unsigned, Vec<MpcPayload>), Error> {
        let (address, pubkey_bytes) = self
            .derive_address_and_pubkey(&request.caller_id, &request.canonical_path)
            .await?;
        let compressed_pubkey: [u8; 33] = pubkey_bytes
            .try_into()
            .map_err(|_| Error::ProtocolInvariantViolated("derived cosmos pubkey is not 33 bytes".into()))?;

        let account = self.provider.get_account(&address).await?;

        let mut messages = request.messages;
        for message in &mut messages {
            message.normalize_from_address(&address);
        }
        let message_anys = messages
            .into_iter()
            .map(CosmosMessage::into_any)
            .collect::<Result<Vec<Any>, Error>>()?;

        let gas_limit = request.gas.unwrap_or(self.params.default_gas_limit);
        let fee_amount = self.params.fee_amount(gas_limit);

        let tx_body = TxBody {
            messages: message_anys,
            memo: request.memo.unwrap_or_default(),
            timeout_height: 0,
            extension_options: vec![],
            non_critical_extension_options: vec![],
        };
        let body_bytes = tx_body.encode_to_vec();

        let public_key = Any {
            type_url: "/cosmos.crypto.secp256k1.PubKey".to_string(),
            value: PubKey {
                key: compressed_pubkey.to_vec(),
            }
            .encode_to_vec(),
        };
        let signer_info = SignerInfo {
            public_key: Some(public_key),
            mode_info: Some(ModeInfo {
                sum: Some(Sum::Single(Single { mode: 1 })),
            }),
            sequence: account.sequence,
        };
        let fee = Fee {
            amount: vec![Coin {
                denom: self.params.native_denom.clone(),
                amount: fee_amount,
            }],
            gas_limit,
            payer: String::new(),
            granter: String::new(),
        };
        let auth_info = AuthInfo {
            signer_infos: vec![signer_info],
            fee: Some(fee),
            tip: None,
        };
        let auth_info_bytes = auth_info.encode_to_vec();

        let sign_doc = SignDoc {
            body_bytes: body_bytes.clone(),
            auth_info_bytes: auth_info_bytes.clone(),
            chain_id: self.params.chain_id.clone(),
            account_number: account.account_number,
        };
        let sighash: [u8; 32] = Sha256::digest(sign_doc.encode_to_vec()).into();

        Ok((
            CosmosUnsignedTx {
                body_bytes,
                auth_info_bytes,
                compressed_pubkey,
            },
            vec![MpcPayload { index: 0, payload: sighash }],
        ))
    }

    async fn attach_signatures_and_broadcast(
        &self,
        unsigned: Self::Unsigned,
        signatures: Vec<MpcSignature>,
    ) -> Result<String, Error> {
        let signature = signatures
            .first()
            .ok_or_else(|| Error::ProtocolInvariantViolated("expected one cosmos signature".into()))?;
        if signatures.len() != 1 {
            return Err(Error::ProtocolInvariantViolated(format!(
                "expected exactly one cosmos signature, got {}",
                signatures.len()
            )));
        }
        let raw64 = Raw64Signature::try_from(signature)?;
        let mut sig_bytes = Vec::with_capacity(64);
        sig_bytes.extend_from_slice(&raw64.r);
        sig_bytes.extend_from_slice(&raw64.s);

        let tx_raw = TxRaw {
            body_bytes: unsigned.body_bytes,
            auth_info_bytes: unsigned.auth_info_bytes,
            signatures: vec![sig_bytes],
        };
        self.provider.broadcast_tx(&tx_raw.encode_to_vec()).await
    }

    async fn get_balance(&self, address: &str) -> Result<u128, Error> {
        self.provider.get_balance(address, &self.params.native_denom).await
    }
}

impl<P: CosmosProvider> ChainProviderOps for CosmosAssembler<P> {
    fn chain_id(&self) -> ChainId {
        self.params.caip2_chain_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::CoinAmount;
    use crate::provider::AccountInfo;
    use k256::{ProjectivePoint, Scalar};

    fn test_root() -> RootPublicKey {
        let scalar = Scalar::from(29u64);
        let point = (ProjectivePoint::GENERATOR * scalar).to_affine();
        RootPublicKey::from_affine(point).unwrap()
    }

    fn test_params() -> CosmosChainParams {
        CosmosChainParams {
            chain_id: "cosmoshub-4".into(),
            hrp: "cosmos".into(),
            native_denom: "uatom".into(),
            gas_price: 0.025,
            rest: vec![],
            default_gas_limit: 200_000,
        }
    }

    struct FakeProvider {
        account: AccountInfo,
    }

    #[async_trait::async_trait]
    impl CosmosProvider for FakeProvider {
        async fn get_account(&self, _address: &str) -> Result<AccountInfo, Error> {
            Ok(self.account)
        }

        async fn get_balance(&self, _address: &str, _denom: &str) -> Result<u128, Error> {
            Ok(1_000_000)
        }

        async fn broadcast_tx(&self, _tx_bytes: &[u8]) -> Result<String, Error> {
            Ok("ABCDEF0123".into())
        }
    }

    #[tokio::test]
    async fn derive_address_uses_configured_hrp() {
        let assembler = CosmosAssembler::new(
            FakeProvider {
                account: AccountInfo {
                    account_number: 5,
                    sequence: 1,
                },
            },
            test_root(),
            test_params(),
        );
        let (address, pubkey) = assembler
            .derive_address_and_pubkey("alice.testnet", "m/44'/118'/0'/0/0")
            .await
            .unwrap();
        assert!(address.starts_with("cosmos1"));
        assert_eq!(pubkey.len(), 33);
    }

    #[tokio::test]
    async fn prepare_payload_normalizes_from_address_and_emits_one_payload() {
        let assembler = CosmosAssembler::new(
            FakeProvider {
                account: AccountInfo {
                    account_number: 5,
                    sequence: 1,
                },
            },
            test_root(),
            test_params(),
        );
        let request = CosmosTxRequest {
            caller_id: "alice.testnet".into(),
            canonical_path: "m/44'/118'/0'/0/0".into(),
            messages: vec![CosmosMessage::BankSend {
                from_address: String::new(),
                to_address: "cosmos1dest".into(),
                amount: vec![CoinAmount {
                    denom: "uatom".into(),
                    amount: "10".into(),
                }],
            }],
            memo: Some("test memo".into()),
            gas: None,
        };
        let (unsigned, payloads) = assembler.prepare_payload(request).await.unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].index, 0);
        assert!(!unsigned.body_bytes.is_empty());
        assert!(!unsigned.auth_info_bytes.is_empty());
    }

    #[tokio::test]
    async fn chain_id_uses_cosmos_namespace() {
        let assembler = CosmosAssembler::new(
            FakeProvider {
                account: AccountInfo {
                    account_number: 0,
                    sequence: 0,
                },
            },
            test_root(),
            test_params(),
        );
        assert_eq!(assembler.chain_id().to_string(), "cosmos:cosmoshub-4");
    }
}
