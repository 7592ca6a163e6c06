#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! The MPC signing client (§4.2-4.3): a thin wrapper over an injected
//! [`CoordinatorAdapter`] that quotes the signer contract's fee, dispatches
//! a sign directly or via a relayed meta-transaction, and parses the
//! resulting signature out of an execution receipt.
//!
//! # Modules
//!
//! - [`coordinator`] — the [`coordinator::CoordinatorAdapter`] trait and the
//!   delegate-action/execution-outcome shapes it deals in
//! - [`client`] — [`client::MpcSigningClient`] and its [`client::SignRequest`]
//!
//! # Feature Flags
//!
//! - `telemetry` — traces the `sign` call via `tracing::instrument`

pub mod client;
pub mod coordinator;

pub use client::{MpcSigningClient, SignRequest};
pub use coordinator::CoordinatorAdapter;
