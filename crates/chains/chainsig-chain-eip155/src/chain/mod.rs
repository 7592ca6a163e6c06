//! EVM chain support: chain identification, RPC transport, and configuration.
//!
//! - [`types`] — [`Eip155ChainReference`], [`ChecksummedAddress`](types::ChecksummedAddress)
//! - [`config`] — [`config::Eip155ChainConfig`]
//! - [`provider`] — [`provider::Eip155ChainProvider`], the JSON-RPC transport
//! - [`nonce`] — [`nonce::PendingNonceManager`], the per-address nonce cache

pub mod config;
pub mod nonce;
pub mod provider;
pub mod types;

pub use config::Eip155ChainConfig;
pub use provider::Eip155ChainProvider;
pub use types::*;
