#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! The Cosmos SDK chain assembler (§4.6).
//!
//! Derives bech32 addresses from the coordinator chain's root public key,
//! normalizes an empty `MsgSend.fromAddress` to the derived signer (and
//! only that field — §9 Open Question, preserved verbatim), encodes
//! `TxBody`/`AuthInfo`/`SignDoc` under `SIGN_MODE_DIRECT`, and broadcasts
//! the finished `TxRaw` once the MPC signature is attached. Holds no
//! native private key.
//!
//! # Modules
//!
//! - [`params`] — per-chain parameters ([`params::CosmosChainParams`])
//! - [`provider`] — the REST provider boundary ([`provider::CosmosProvider`])
//! - [`messages`] — message normalization and proto encoding ([`messages::CosmosMessage`])
//! - [`assembler`] — [`assembler::CosmosAssembler`], the [`chainsig_types::chain::Chain`] implementation
//!
//! # Feature Flags
//!
//! - `telemetry` — enables `tracing` instrumentation

pub mod assembler;
pub mod messages;
pub mod params;
pub mod provider;

pub use assembler::{CosmosAssembler, CosmosTxRequest, CosmosUnsignedTx};
pub use messages::{CoinAmount, CosmosMessage};
pub use params::CosmosChainParams;
pub use provider::{AccountInfo, CosmosProvider, HttpCosmosProvider};
