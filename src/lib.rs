#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! `chainsig` — a client-side multi-chain MPC transaction-signing factory
//! (spec.md §1): a single coordinator-chain identity authorizes transactions
//! on Bitcoin, EVM, and Cosmos chains without ever holding a native private
//! key for them. Foreign-chain addresses are derived deterministically from
//! a network-wide root public key published by a signer contract on the
//! coordinator chain, and signing proceeds by packaging the canonical
//! per-chain sighash, invoking the signer contract's `sign` method, and
//! translating the recovered signature into each chain's wire format.
//!
//! This crate is the facade: it wires together [`chainsig_types`]'s
//! capability traits, [`chainsig_derivation`]'s pure key/address math,
//! [`chainsig_signer`]'s MPC signing client, and the three per-chain
//! assembler crates (`chainsig-chain-eip155`, `chainsig-chain-bitcoin`,
//! `chainsig-chain-cosmos`) behind one [`chain::ChainProvider`] enum and one
//! [`orchestrate::SignAndBroadcast`] driver, the way the teacher project's
//! root crate wires its own `ChainProvider`/`FacilitatorLocal` split behind
//! one top-level facade.
//!
//! # Modules
//!
//! - [`config`] — caller-supplied configuration (§6): coordinator network,
//!   signer contract id, optional relayer, and the per-chain registry
//! - [`chain`] — the cross-chain-family [`chain::ChainProvider`], dispatching
//!   to the concrete EIP-155/Bitcoin/Cosmos assembler behind one [`chainsig_types::chain::Chain`] impl
//! - [`orchestrate`] — [`orchestrate::SignAndBroadcast`], the per-request
//!   state-machine driver (§4.7) from payload extraction through broadcast
//! - [`telemetry`] — `tracing_subscriber` bootstrap for binaries embedding
//!   this crate
//!
//! # Feature Flags
//!
//! - `telemetry` — enables `tracing` instrumentation in the signer and chain
//!   assembler crates

pub mod chain;
pub mod config;
pub mod orchestrate;
pub mod telemetry;

pub use chainsig_types::error::Error;
pub use config::{ChainConfig, ChainsConfig, Config, CoordinatorNetwork};
pub use orchestrate::SignAndBroadcast;

pub use chainsig_derivation as derivation;
pub use chainsig_signer as signer;
pub use chainsig_types as types;
