#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for a client-side multi-chain MPC transaction-signing factory.
//!
//! This crate provides the foundational, blockchain-agnostic types that every
//! chain assembler and the signing client build on: key derivation paths and
//! their canonicalization, root/child secp256k1 public keys, the signer
//! contract's signature shapes and their per-chain translations, the
//! payload/transaction sum types and sign-flow state machine, transaction
//! storage across the sign round-trip, chain identification, and caller
//! configuration.
//!
//! # Modules
//!
//! - [`chain`] — CAIP-2 chain identifiers, the chain registry, and the
//!   [`chain::Chain`] capability trait each chain family implements
//! - [`config`] — RPC provider configuration and environment variable resolution
//! - [`error`] — the closed error taxonomy shared by every crate in the workspace
//! - [`keys`] — root/child public key derivation (epsilon derivation)
//! - [`path`] — key derivation paths and their canonical string form
//! - [`signature`] — the signer contract's signature shape and per-chain translations
//! - [`store`] — injected storage for an unsigned transaction across a sign round-trip
//! - [`tx`] — payload/transaction sum types and the sign-flow state machine
//!
//! # Feature Flags
//!
//! - `telemetry` — enables `tracing` instrumentation for debugging and monitoring

pub mod chain;
pub mod config;
pub mod error;
pub mod keys;
pub mod path;
pub mod signature;
pub mod store;
pub mod tx;

pub use error::Error;
