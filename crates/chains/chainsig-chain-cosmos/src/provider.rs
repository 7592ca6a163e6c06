//! The Cosmos REST provider boundary (§6): account lookup, balance, and
//! broadcast against an LCD endpoint.
//!
//! Modeled as a trait, like the teacher's provider-behind-a-trait shape, so
//! [`crate::assembler::CosmosAssembler`] is unit-testable against a fake
//! provider instead of a live LCD.

use base64::Engine as _;
use serde::Deserialize;

use chainsig_types::config::RpcConfig;
use chainsig_types::error::Error;

/// `{account_number, sequence}`, as returned by the auth query (§4.6 step 1).
#[derive(Debug, Clone, Copy)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// The REST operations §4.6/§6 depend on.
#[async_trait::async_trait]
pub trait CosmosProvider: Send + Sync {
    /// `GET /cosmos/auth/v1beta1/accounts/{addr}`.
    async fn get_account(&self, address: &str) -> Result<AccountInfo, Error>;

    /// `GET /cosmos/bank/v1beta1/balances/{addr}`, the amount of `denom`.
    async fn get_balance(&self, address: &str, denom: &str) -> Result<u128, Error>;

    /// `POST /cosmos/tx/v1beta1/txs`, `BROADCAST_MODE_SYNC`.
    async fn broadcast_tx(&self, tx_bytes: &[u8]) -> Result<String, Error>;
}

/// `reqwest`-backed implementation against a Cosmos SDK LCD REST API.
pub struct HttpCosmosProvider {
    base_url: url::Url,
    client: reqwest::Client,
}

impl HttpCosmosProvider {
    pub fn new(rest: &[RpcConfig]) -> Result<Self, Error> {
        let base_url = rest
            .first()
            .ok_or_else(|| Error::config_invalid("cosmos chain has no configured REST endpoint"))?
            .http
            .clone();
        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
        })
    }

    fn join(&self, path: &str) -> Result<url::Url, Error> {
        self.base_url
            .join(path)
            .map_err(|e| Error::config_invalid(format!("invalid provider path {path}: {e}")))
    }
}

#[async_trait::async_trait]
impl CosmosProvider for HttpCosmosProvider {
    async fn get_account(&self, address: &str) -> Result<AccountInfo, Error> {
        #[derive(Deserialize)]
        struct BaseAccount {
            account_number: String,
            sequence: String,
        }
        #[derive(Deserialize)]
        struct AccountEnvelope {
            account: BaseAccount,
        }

        let url = self.join(&format!("cosmos/auth/v1beta1/accounts/{address}"))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ProviderUnreachable(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::AccountNotFound(address.to_string()));
        }
        let envelope: AccountEnvelope = response
            .json()
            .await
            .map_err(|e| Error::ProtocolInvariantViolated(format!("malformed account response: {e}")))?;
        let account_number = envelope
            .account
            .account_number
            .parse()
            .map_err(|e| Error::ProtocolInvariantViolated(format!("invalid account_number: {e}")))?;
        let sequence = envelope
            .account
            .sequence
            .parse()
            .map_err(|e| Error::ProtocolInvariantViolated(format!("invalid sequence: {e}")))?;
        Ok(AccountInfo {
            account_number,
            sequence,
        })
    }

    async fn get_balance(&self, address: &str, denom: &str) -> Result<u128, Error> {
        #[derive(Deserialize)]
        struct Balance {
            denom: String,
            amount: String,
        }
        #[derive(Deserialize)]
        struct BalancesResponse {
            balances: Vec<Balance>,
        }

        let url = self.join(&format!("cosmos/bank/v1beta1/balances/{address}"))?;
        let response: BalancesResponse = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ProviderUnreachable(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::ProtocolInvariantViolated(format!("malformed balance response: {e}")))?;
        let amount = response
            .balances
            .iter()
            .find(|b| b.denom == denom)
            .map(|b| b.amount.clone())
            .unwrap_or_else(|| "0".to_string());
        amount
            .parse()
            .map_err(|e| Error::ProtocolInvariantViolated(format!("invalid balance amount: {e}")))
    }

    async fn broadcast_tx(&self, tx_bytes: &[u8]) -> Result<String, Error> {
        #[derive(serde::Serialize)]
        struct BroadcastRequest {
            tx_bytes: String,
            mode: &'static str,
        }
        #[derive(Deserialize)]
        struct TxResponse {
            code: i64,
            txhash: String,
            raw_log: String,
        }
        #[derive(Deserialize)]
        struct BroadcastResponse {
            tx_response: TxResponse,
        }

        let url = self.join("cosmos/tx/v1beta1/txs")?;
        let body = BroadcastRequest {
            tx_bytes: base64::engine::general_purpose::STANDARD.encode(tx_bytes),
            mode: "BROADCAST_MODE_SYNC",
        };
        let response: BroadcastResponse = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ProviderUnreachable(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::ProtocolInvariantViolated(format!("malformed broadcast response: {e}")))?;
        if response.tx_response.code != 0 {
            return Err(Error::BroadcastRejected {
                code: response.tx_response.code,
                message: response.tx_response.raw_log,
            });
        }
        Ok(response.tx_response.txhash)
    }
}
