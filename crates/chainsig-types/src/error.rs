//! The closed error taxonomy shared by every crate in the workspace.
//!
//! Chain and signer crates define their own narrower `thiserror` enums for
//! their fallible operations and convert into [`Error`] at the boundary —
//! the same shape as `MetaTransactionSendError` feeding into a wider
//! facilitator error in the teacher project this crate is descended from.

use std::fmt;

/// Errors surfaced to callers, verbatim, with no retry performed by the core.
///
/// `#[non_exhaustive]` because new chain families or MPC-contract behaviors
/// may need new variants without that being a breaking change for matches
/// that already have a wildcard arm.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Missing or contradictory chain parameters or provider URL.
    #[error("configuration invalid: {0}")]
    ConfigInvalid(String),

    /// The signer contract's `public_key` view call failed or returned empty.
    #[error("root public key unavailable: {0}")]
    RootKeyUnavailable(String),

    /// Epsilon derivation produced the identity point. Astronomically
    /// unlikely; treated as a hard failure rather than retried.
    #[error("derivation produced the identity point")]
    DerivationFailed,

    /// The `experimental_signature_deposit` view call failed.
    #[error("fee quote unavailable: {0}")]
    FeeQuoteUnavailable(String),

    /// The coordinator chain rejected the sign as a nonce replay.
    #[error("nonce conflict, caller must refresh and retry")]
    NonceConflict,

    /// The receipt scan of §4.3 found no `SuccessValue` carrying a signature.
    #[error("signature unavailable in execution receipt")]
    SignatureUnavailable,

    /// The contract rejected the attached deposit as insufficient.
    #[error("attached fee too low")]
    FeeTooLow,

    /// Cosmos account, EVM nonce target, or Bitcoin UTXO set not found.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Coin selection found no feasible input/output/fee combination.
    #[error("insufficient funds for requested transaction")]
    InsufficientFunds,

    /// A foreign chain RPC refused the signed, broadcast-ready transaction.
    #[error("broadcast rejected (code {code}): {message}")]
    BroadcastRejected {
        /// Chain-specific rejection code (`tx_response.code` for Cosmos, 0 otherwise).
        code: i64,
        /// Human-readable rejection detail (`raw_log` for Cosmos).
        message: String,
    },

    /// A transport-level failure talking to an RPC/REST provider.
    #[error("provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// A chain registry lookup found no configuration for the requested chain.
    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    /// Assertion-class: a shape/decoding invariant that should never fire.
    #[error("protocol invariant violated: {0}")]
    ProtocolInvariantViolated(String),

    /// The caller's `CancellationToken` fired before the sign-and-broadcast
    /// flow reached a terminal state (§5).
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Convenience constructor mirroring `ConfigInvalid(reason.to_string())`.
    pub fn config_invalid(reason: impl fmt::Display) -> Self {
        Error::ConfigInvalid(reason.to_string())
    }
}
