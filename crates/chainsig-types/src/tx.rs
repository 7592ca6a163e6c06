//! The payload/transaction sum types shared across chain families, and the
//! per-sign state machine of §4.7.

use std::cmp::Ordering;

/// One 32-byte sighash a chain assembler needs the MPC to sign, tagged with
/// the position the resulting signature must be reinserted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpcPayload {
    pub index: u32,
    pub payload: [u8; 32],
}

impl PartialOrd for MpcPayload {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MpcPayload {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

/// A chain-family-tagged unsigned transaction. Each chain crate defines its
/// own variant payload struct; this sum type lets a caller (e.g. a
/// [`crate::store::TransactionStore`] consumer) hold any of them
/// uniformly across the sign round-trip.
#[derive(Debug, Clone)]
pub enum UnsignedTx {
    Evm(Vec<u8>),
    Bitcoin(Vec<u8>),
    Cosmos(Vec<u8>),
}

impl UnsignedTx {
    pub fn chain_family(&self) -> &'static str {
        match self {
            UnsignedTx::Evm(_) => "eip155",
            UnsignedTx::Bitcoin(_) => "bip122",
            UnsignedTx::Cosmos(_) => "cosmos",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UnsignedTx::Evm(b) | UnsignedTx::Bitcoin(b) | UnsignedTx::Cosmos(b) => b,
        }
    }
}

/// The lifecycle of a single sign-and-broadcast operation (§4.7). Any step's
/// failure is terminal; there is no in-core retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignFlowState {
    Assembled,
    PayloadExtracted,
    Signing,
    Signed,
    Broadcasting,
    Broadcast,
    Failed,
}

impl SignFlowState {
    /// Whether `next` is a transition this state machine allows from `self`.
    pub fn can_advance_to(self, next: SignFlowState) -> bool {
        use SignFlowState::*;
        matches!(
            (self, next),
            (Assembled, PayloadExtracted)
                | (PayloadExtracted, Signing)
                | (Signing, Signed)
                | (Signed, Broadcasting)
                | (Broadcasting, Broadcast)
                | (_, Failed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_order_by_index() {
        let mut payloads = vec![
            MpcPayload {
                index: 2,
                payload: [0u8; 32],
            },
            MpcPayload {
                index: 0,
                payload: [1u8; 32],
            },
            MpcPayload {
                index: 1,
                payload: [2u8; 32],
            },
        ];
        payloads.sort();
        assert_eq!(
            payloads.iter().map(|p| p.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn state_machine_rejects_skipped_steps() {
        assert!(SignFlowState::Assembled.can_advance_to(SignFlowState::PayloadExtracted));
        assert!(!SignFlowState::Assembled.can_advance_to(SignFlowState::Signed));
        assert!(SignFlowState::Signing.can_advance_to(SignFlowState::Failed));
    }
}
