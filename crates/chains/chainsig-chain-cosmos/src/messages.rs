//! Cosmos message normalization (§4.6 step 2) and proto encoding.
//!
//! Only a message whose signer field is literally named `fromAddress` gets
//! backfilled with the derived address when empty (spec.md §9 Open
//! Question, preserved verbatim). `MsgDelegate`'s `delegatorAddress` and
//! every other message's signer field are left alone even though they play
//! the same role — a narrow, intentional product decision, not an
//! oversight.

use cosmos_sdk_proto::Any;
use cosmos_sdk_proto::cosmos::bank::v1beta1::MsgSend;
use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
use cosmos_sdk_proto::cosmos::staking::v1beta1::MsgDelegate;
use prost::Message;

use chainsig_types::error::Error;

/// One Cosmos SDK coin amount.
#[derive(Debug, Clone)]
pub struct CoinAmount {
    pub denom: String,
    pub amount: String,
}

impl From<&CoinAmount> for Coin {
    fn from(c: &CoinAmount) -> Self {
        Coin {
            denom: c.denom.clone(),
            amount: c.amount.clone(),
        }
    }
}

/// The caller-supplied messages this assembler knows how to encode.
#[derive(Debug, Clone)]
pub enum CosmosMessage {
    /// `/cosmos.bank.v1beta1.MsgSend` — the message whose signer field is
    /// literally named `fromAddress` on the wire.
    BankSend {
        from_address: String,
        to_address: String,
        amount: Vec<CoinAmount>,
    },
    /// `/cosmos.staking.v1beta1.MsgDelegate` — signer field is
    /// `delegatorAddress`, deliberately excluded from normalization.
    StakingDelegate {
        delegator_address: String,
        validator_address: String,
        amount: CoinAmount,
    },
    /// A caller-pre-encoded message of any other type. Opaque to
    /// normalization.
    Raw { type_url: String, value: Vec<u8> },
}

impl CosmosMessage {
    /// §4.6 step 2: backfills only `BankSend::from_address` when empty.
    pub fn normalize_from_address(&mut self, derived_address: &str) {
        if let CosmosMessage::BankSend { from_address, .. } = self {
            if from_address.is_empty() {
                *from_address = derived_address.to_string();
            }
        }
    }

    pub fn into_any(self) -> Result<Any, Error> {
        match self {
            CosmosMessage::BankSend {
                from_address,
                to_address,
                amount,
            } => {
                let msg = MsgSend {
                    from_address,
                    to_address,
                    amount: amount.iter().map(Coin::from).collect(),
                };
                Ok(Any {
                    type_url: "/cosmos.bank.v1beta1.MsgSend".to_string(),
                    value: msg.encode_to_vec(),
                })
            }
            CosmosMessage::StakingDelegate {
                delegator_address,
                validator_address,
                amount,
            } => {
                let msg = MsgDelegate {
                    delegator_address,
                    validator_address,
                    amount: Some(Coin::from(&amount)),
                };
                Ok(Any {
                    type_url: "/cosmos.staking.v1beta1.MsgDelegate".to_string(),
                    value: msg.encode_to_vec(),
                })
            }
            CosmosMessage::Raw { type_url, value } => Ok(Any { type_url, value }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_empty_bank_send_from_address() {
        let mut msg = CosmosMessage::BankSend {
            from_address: String::new(),
            to_address: "cosmos1dest".into(),
            amount: vec![CoinAmount {
                denom: "uatom".into(),
                amount: "10".into(),
            }],
        };
        msg.normalize_from_address("cosmos1derived");
        match msg {
            CosmosMessage::BankSend { from_address, .. } => assert_eq!(from_address, "cosmos1derived"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn does_not_overwrite_populated_bank_send_from_address() {
        let mut msg = CosmosMessage::BankSend {
            from_address: "cosmos1already".into(),
            to_address: "cosmos1dest".into(),
            amount: vec![],
        };
        msg.normalize_from_address("cosmos1derived");
        match msg {
            CosmosMessage::BankSend { from_address, .. } => assert_eq!(from_address, "cosmos1already"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn leaves_staking_delegate_untouched_even_when_empty() {
        let mut msg = CosmosMessage::StakingDelegate {
            delegator_address: String::new(),
            validator_address: "cosmosvaloper1x".into(),
            amount: CoinAmount {
                denom: "uatom".into(),
                amount: "10".into(),
            },
        };
        msg.normalize_from_address("cosmos1derived");
        match msg {
            CosmosMessage::StakingDelegate { delegator_address, .. } => assert_eq!(delegator_address, ""),
            _ => unreachable!(),
        }
    }

    #[test]
    fn bank_send_encodes_to_expected_type_url() {
        let msg = CosmosMessage::BankSend {
            from_address: "cosmos1a".into(),
            to_address: "cosmos1b".into(),
            amount: vec![CoinAmount {
                denom: "uatom".into(),
                amount: "5000".into(),
            }],
        };
        let any = msg.into_any().unwrap();
        assert_eq!(any.type_url, "/cosmos.bank.v1beta1.MsgSend");
        assert!(!any.value.is_empty());
    }
}
