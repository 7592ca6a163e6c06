#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! The Bitcoin P2WPKH chain assembler (§4.5).
//!
//! Derives bech32 addresses from the coordinator chain's root public key,
//! assembles a PSBT against caller-selected or auto-selected UTXOs, extracts
//! one BIP-143 sighash per input for the MPC signing client, and finalizes
//! the witness stack from the resulting raw signatures for broadcast. Holds
//! no native private key.
//!
//! # Modules
//!
//! - [`provider`] — the REST provider boundary ([`provider::BitcoinProvider`])
//! - [`selection`] — UTXO coin selection ([`selection::select_coins`])
//! - [`assembler`] — [`assembler::BitcoinAssembler`], the [`chainsig_types::chain::Chain`] implementation
//!
//! # Feature Flags
//!
//! - `telemetry` — enables `tracing` instrumentation

pub mod assembler;
pub mod provider;
pub mod selection;

pub use assembler::{BitcoinAssembler, BitcoinTxRequest, BitcoinUnsignedTx, BtcRequest, ManualInput};
pub use provider::{BitcoinProvider, FeeRecommendation, HttpBitcoinProvider, PrevOut, Utxo};
pub use selection::{PlannedOutput, SelectionResult, select_coins};
