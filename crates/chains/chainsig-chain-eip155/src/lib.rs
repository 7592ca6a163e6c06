#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! The EVM (EIP-155) chain assembler (§4.4).
//!
//! Derives EVM addresses from the coordinator chain's root public key,
//! builds EIP-1559 transactions, extracts their keccak256 signing hash for
//! the MPC signing client, and reattaches the resulting RSV signature for
//! broadcast via `eth_sendRawTransaction`. Holds no native private key.
//!
//! # Modules
//!
//! - [`chain`] — chain identification, RPC transport ([`chain::Eip155ChainProvider`]),
//!   and configuration ([`chain::Eip155ChainConfig`])
//! - [`assembler`] — [`assembler::Eip155Assembler`], the [`chainsig_types::chain::Chain`] implementation
//!
//! # Feature Flags
//!
//! - `telemetry` — enables `tracing` instrumentation

pub mod assembler;
pub mod chain;

pub use assembler::{Eip155Assembler, Eip155TxRequest, Eip155UnsignedTx};
pub use chain::{Eip155ChainConfig, Eip155ChainProvider, Eip155ChainReference};
