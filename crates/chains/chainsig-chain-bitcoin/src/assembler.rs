//! The Bitcoin P2WPKH transaction assembler (§4.5). Only witness v0
//! pay-to-witness-pubkey-hash is supported; mixed script types are rejected
//! by construction (there is nowhere in this assembler to express them).

use std::str::FromStr;

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::serialize as consensus_serialize;
use bitcoin::ecdsa::Signature as EcdsaSignature;
use bitcoin::psbt::Psbt;
use bitcoin::secp256k1::ecdsa::Signature as Secp256k1Signature;
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Address, Amount, CompressedPublicKey, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};

use chainsig_derivation::{BitcoinNetwork, bitcoin_p2wpkh_address};
use chainsig_types::chain::{Chain, ChainId, ChainProviderOps};
use chainsig_types::error::Error;
use chainsig_types::keys::{RootPublicKey, derive_child_pubkey};
use chainsig_types::signature::{MpcSignature, Raw64Signature};
use chainsig_types::tx::MpcPayload;

use crate::provider::{BitcoinProvider, PrevOut};
use crate::selection::{PlannedOutput, select_coins};

/// A single manually-specified input: the funding outpoint.
#[derive(Debug, Clone)]
pub struct ManualInput {
    pub txid: String,
    pub vout: u32,
}

/// The tagged sum of §4.5/design note §9: either the caller fully specifies
/// inputs and outputs, or hands over `to`/`value` and lets the assembler run
/// coin selection.
#[derive(Debug, Clone)]
pub enum BtcRequest {
    Manual {
        inputs: Vec<ManualInput>,
        outputs: Vec<PlannedOutput>,
    },
    Auto {
        to: String,
        value_sats: u64,
    },
}

/// Caller-supplied request for one Bitcoin transaction.
#[derive(Debug, Clone)]
pub struct BitcoinTxRequest {
    pub caller_id: String,
    pub canonical_path: String,
    pub request: BtcRequest,
    /// Confirmation target for the auto fee-rate lookup (§4.5.1). Default 6.
    pub confirmation_target_blocks: u32,
    /// Dust policy applied when deciding whether to add a change output.
    pub dust_threshold_sats: u64,
}

impl BitcoinTxRequest {
    pub fn auto(caller_id: impl Into<String>, canonical_path: impl Into<String>, to: impl Into<String>, value_sats: u64) -> Self {
        Self {
            caller_id: caller_id.into(),
            canonical_path: canonical_path.into(),
            request: BtcRequest::Auto { to: to.into(), value_sats },
            confirmation_target_blocks: 6,
            dust_threshold_sats: 546,
        }
    }
}

/// The PSBT plus the exact compressed pubkey every input's witness signs
/// with (§3 `UnsignedTx::BTC`).
#[derive(Debug, Clone)]
pub struct BitcoinUnsignedTx {
    pub psbt: Psbt,
    pub compressed_pubkey: [u8; 33],
}

/// Implements [`Chain`] for Bitcoin, P2WPKH only.
pub struct BitcoinAssembler<P> {
    provider: P,
    root: RootPublicKey,
    network: BitcoinNetwork,
    chain_id: ChainId,
}

impl<P: BitcoinProvider> BitcoinAssembler<P> {
    pub fn new(provider: P, root: RootPublicKey, network: BitcoinNetwork, chain_id: ChainId) -> Self {
        Self { provider, root, network, chain_id }
    }

    fn bitcoin_network(&self) -> bitcoin::Network {
        match self.network {
            BitcoinNetwork::Mainnet => bitcoin::Network::Bitcoin,
            BitcoinNetwork::Testnet => bitcoin::Network::Testnet,
            BitcoinNetwork::Regtest => bitcoin::Network::Regtest,
        }
    }

    fn script_pubkey_for(&self, address: &str) -> Result<ScriptBuf, Error> {
        let parsed = Address::from_str(address)
            .map_err(|e| Error::ConfigInvalid(format!("invalid bitcoin address {address}: {e}")))?
            .require_network(self.bitcoin_network())
            .map_err(|e| Error::ConfigInvalid(format!("address {address} is not on the configured network: {e}")))?;
        Ok(parsed.script_pubkey())
    }

    async fn resolve_inputs(&self, request: &BitcoinTxRequest, from: &str) -> Result<(Vec<OutPoint>, Vec<PrevOut>, Vec<PlannedOutput>), Error> {
        match &request.request {
            BtcRequest::Manual { inputs, outputs } => {
                let mut outpoints = Vec::with_capacity(inputs.len());
                let mut prevouts = Vec::with_capacity(inputs.len());
                for input in inputs {
                    let txid = Txid::from_str(&input.txid)
                        .map_err(|e| Error::ConfigInvalid(format!("invalid txid {}: {e}", input.txid)))?;
                    outpoints.push(OutPoint { txid, vout: input.vout });
                    prevouts.push(self.provider.get_prevout(&input.txid, input.vout).await?);
                }
                Ok((outpoints, prevouts, outputs.clone()))
            }
            BtcRequest::Auto { to, value_sats } => {
                let utxos = self.provider.get_utxos(from).await?;
                let fees = self.provider.get_fee_recommendation().await?;
                let rate = fees.for_confirmation_target(request.confirmation_target_blocks);
                let planned = vec![PlannedOutput {
                    address: to.clone(),
                    value_sats: *value_sats,
                }];
                let selection = select_coins(&utxos, planned, rate, from, request.dust_threshold_sats)?;

                let mut outpoints = Vec::with_capacity(selection.inputs.len());
                let mut prevouts = Vec::with_capacity(selection.inputs.len());
                for utxo in &selection.inputs {
                    let txid = Txid::from_str(&utxo.txid)
                        .map_err(|e| Error::ConfigInvalid(format!("invalid txid {}: {e}", utxo.txid)))?;
                    outpoints.push(OutPoint { txid, vout: utxo.vout });
                    prevouts.push(self.provider.get_prevout(&utxo.txid, utxo.vout).await?);
                }
                Ok((outpoints, prevouts, selection.outputs))
            }
        }
    }
}

#[async_trait::async_trait]
impl<P: BitcoinProvider> Chain for BitcoinAssembler<P> {
    type TxRequest = BitcoinTxRequest;
    type Unsigned = BitcoinUnsignedTx;

    async fn derive_address_and_pubkey(
        &self,
        caller_id: &str,
        canonical_path: &str,
    ) -> Result<(String, Vec<u8>), Error> {
        let child = derive_child_pubkey(&self.root, caller_id, canonical_path)?;
        let address = bitcoin_p2wpkh_address(&child, self.network)?;
        Ok((address, child.to_compressed().to_vec()))
    }

    async fn prepare_payload(
        &self,
        request: Self::TxRequest,
    ) -> Result<(Self::Unsigned, Vec<MpcPayload>), Error> {
        let (from, pubkey_bytes) = self
            .derive_address_and_pubkey(&request.caller_id, &request.canonical_path)
            .await?;
        let compressed_pubkey: [u8; 33] = pubkey_bytes
            .try_into()
            .map_err(|_| Error::ProtocolInvariantViolated("derived bitcoin pubkey is not 33 bytes".into()))?;

        let (outpoints, prevouts, outputs) = self.resolve_inputs(&request, &from).await?;
        if outpoints.is_empty() {
            return Err(Error::InsufficientFunds);
        }

        let tx_outputs = outputs
            .iter()
            .map(|o| {
                Ok(TxOut {
                    value: Amount::from_sat(o.value_sats),
                    script_pubkey: self.script_pubkey_for(&o.address)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: outpoints
                .iter()
                .map(|outpoint| TxIn {
                    previous_output: *outpoint,
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                    witness: Witness::new(),
                })
                .collect(),
            output: tx_outputs,
        };

        let mut psbt = Psbt::from_unsigned_tx(tx)
            .map_err(|e| Error::ProtocolInvariantViolated(format!("psbt construction failed: {e}")))?;

        for (i, prevout) in prevouts.iter().enumerate() {
            psbt.inputs[i].witness_utxo = Some(TxOut {
                value: Amount::from_sat(prevout.value),
                script_pubkey: ScriptBuf::from_bytes(prevout.script_pubkey.clone()),
            });
        }

        // Direct BIP-143 computation from the PSBT's own fields — the
        // "no mock signer" re-architecture of spec.md §9.
        let mut payloads = Vec::with_capacity(psbt.inputs.len());
        {
            let mut cache = SighashCache::new(&psbt.unsigned_tx);
            for (i, input) in psbt.inputs.iter().enumerate() {
                let witness_utxo = input
                    .witness_utxo
                    .as_ref()
                    .ok_or_else(|| Error::ProtocolInvariantViolated("missing witnessUtxo".into()))?;
                let sighash = cache
                    .p2wpkh_signature_hash(i, &witness_utxo.script_pubkey, witness_utxo.value, EcdsaSighashType::All)
                    .map_err(|e| Error::ProtocolInvariantViolated(format!("sighash computation failed: {e}")))?;
                payloads.push(MpcPayload {
                    index: i as u32,
                    payload: sighash.to_byte_array(),
                });
            }
        }

        Ok((
            BitcoinUnsignedTx {
                psbt,
                compressed_pubkey,
            },
            payloads,
        ))
    }

    async fn attach_signatures_and_broadcast(
        &self,
        mut unsigned: Self::Unsigned,
        signatures: Vec<MpcSignature>,
    ) -> Result<String, Error> {
        if signatures.len() != unsigned.psbt.inputs.len() {
            return Err(Error::ProtocolInvariantViolated(format!(
                "expected {} bitcoin signatures, got {}",
                unsigned.psbt.inputs.len(),
                signatures.len()
            )));
        }

        let pubkey = CompressedPublicKey::from_slice(&unsigned.compressed_pubkey)
            .map_err(|e| Error::ProtocolInvariantViolated(format!("invalid compressed pubkey: {e}")))?;

        for (i, sig) in signatures.iter().enumerate() {
            let raw64 = Raw64Signature::try_from(sig)?;
            let mut compact = [0u8; 64];
            compact[..32].copy_from_slice(&raw64.r);
            compact[32..].copy_from_slice(&raw64.s);
            let signature = Secp256k1Signature::from_compact(&compact)
                .map_err(|e| Error::ProtocolInvariantViolated(format!("invalid secp256k1 signature: {e}")))?;
            let ecdsa_sig = EcdsaSignature {
                signature,
                sighash_type: EcdsaSighashType::All,
            };
            unsigned.psbt.inputs[i].final_script_witness = Some(Witness::p2wpkh(&ecdsa_sig, &pubkey));
            // PSBT finalization semantics: clear partial-sig bookkeeping
            // once the final witness is set, mirroring a real finalizer.
            unsigned.psbt.inputs[i].partial_sigs.clear();
            unsigned.psbt.inputs[i].sighash_type = None;
        }

        let tx = unsigned
            .psbt
            .extract_tx()
            .map_err(|e| Error::ProtocolInvariantViolated(format!("psbt extraction failed: {e}")))?;
        let raw_hex = hex::encode(consensus_serialize(&tx));
        self.provider.broadcast(&raw_hex).await
    }

    async fn get_balance(&self, address: &str) -> Result<u128, Error> {
        let utxos = self.provider.get_utxos(address).await?;
        Ok(utxos.iter().map(|u| u.value as u128).sum())
    }
}

impl<P: BitcoinProvider> ChainProviderOps for BitcoinAssembler<P> {
    fn chain_id(&self) -> ChainId {
        self.chain_id.clone()
    }
}
