//! The Bitcoin REST provider boundary (§6): UTXO lookup, fee-rate
//! recommendation, funding-transaction fetch, and broadcast.
//!
//! Modeled as a trait, like the teacher's `*ChainProvider` split, so the
//! coin-selection and PSBT-assembly logic in [`crate::assembler`] is
//! unit-testable against a fake provider instead of a live REST endpoint.

use serde::Deserialize;

use chainsig_types::error::Error;

/// One unspent output as returned by `GET /address/{addr}/utxo`.
#[derive(Debug, Clone, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
}

/// `GET /v1/fees/recommended` response.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeeRecommendation {
    #[serde(rename = "fastestFee")]
    pub fastest_fee: u64,
    #[serde(rename = "halfHourFee")]
    pub half_hour_fee: u64,
    #[serde(rename = "hourFee")]
    pub hour_fee: u64,
    #[serde(rename = "economyFee")]
    pub economy_fee: u64,
    #[serde(rename = "minimumFee")]
    pub minimum_fee: u64,
}

impl FeeRecommendation {
    /// Picks a sat/vB rate for a confirmation target, defaulting to the
    /// 6-block rate (§4.5) when the target doesn't map to a named bucket.
    pub fn for_confirmation_target(&self, target_blocks: u32) -> u64 {
        match target_blocks {
            0..=1 => self.fastest_fee,
            2..=3 => self.half_hour_fee,
            4..=6 => self.hour_fee,
            _ => self.economy_fee.max(self.minimum_fee),
        }
    }
}

/// One previous output, as needed to build a PSBT's `witnessUtxo` (§4.5.2).
#[derive(Debug, Clone)]
pub struct PrevOut {
    pub script_pubkey: Vec<u8>,
    pub value: u64,
}

/// The REST operations §4.5/§6 depend on.
#[async_trait::async_trait]
pub trait BitcoinProvider: Send + Sync {
    /// `GET /address/{addr}/utxo`.
    async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>, Error>;

    /// `GET /v1/fees/recommended`.
    async fn get_fee_recommendation(&self) -> Result<FeeRecommendation, Error>;

    /// `GET /tx/{txid}`, returning the exact previous output at `vout`.
    async fn get_prevout(&self, txid: &str, vout: u32) -> Result<PrevOut, Error>;

    /// `POST /tx` with raw hex body, returning the broadcast txid.
    async fn broadcast(&self, raw_tx_hex: &str) -> Result<String, Error>;
}

/// `reqwest`-backed implementation against an Esplora/mempool.space-shaped REST API.
pub struct HttpBitcoinProvider {
    base_url: url::Url,
    client: reqwest::Client,
}

impl HttpBitcoinProvider {
    pub fn new(base_url: url::Url) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn join(&self, path: &str) -> Result<url::Url, Error> {
        self.base_url
            .join(path)
            .map_err(|e| Error::config_invalid(format!("invalid provider path {path}: {e}")))
    }
}

#[async_trait::async_trait]
impl BitcoinProvider for HttpBitcoinProvider {
    async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>, Error> {
        let url = self.join(&format!("address/{address}/utxo"))?;
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ProviderUnreachable(e.to_string()))?
            .json::<Vec<Utxo>>()
            .await
            .map_err(|e| Error::ProtocolInvariantViolated(format!("malformed UTXO response: {e}")))
    }

    async fn get_fee_recommendation(&self) -> Result<FeeRecommendation, Error> {
        let url = self.join("v1/fees/recommended")?;
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ProviderUnreachable(e.to_string()))?
            .json::<FeeRecommendation>()
            .await
            .map_err(|e| Error::ProtocolInvariantViolated(format!("malformed fee response: {e}")))
    }

    async fn get_prevout(&self, txid: &str, vout: u32) -> Result<PrevOut, Error> {
        #[derive(Deserialize)]
        struct TxOutJson {
            scriptpubkey: String,
            value: u64,
        }
        #[derive(Deserialize)]
        struct TxJson {
            vout: Vec<TxOutJson>,
        }
        let url = self.join(&format!("tx/{txid}"))?;
        let tx: TxJson = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ProviderUnreachable(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::ProtocolInvariantViolated(format!("malformed tx response: {e}")))?;
        let out = tx
            .vout
            .get(vout as usize)
            .ok_or_else(|| Error::AccountNotFound(format!("{txid}:{vout} has no such output")))?;
        let script_pubkey = hex::decode(&out.scriptpubkey)
            .map_err(|e| Error::ProtocolInvariantViolated(format!("invalid scriptpubkey hex: {e}")))?;
        Ok(PrevOut {
            script_pubkey,
            value: out.value,
        })
    }

    async fn broadcast(&self, raw_tx_hex: &str) -> Result<String, Error> {
        let url = self.join("tx")?;
        let response = self
            .client
            .post(url)
            .body(raw_tx_hex.to_string())
            .send()
            .await
            .map_err(|e| Error::ProviderUnreachable(e.to_string()))?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::BroadcastRejected {
                code: 0,
                message: body,
            });
        }
        response
            .text()
            .await
            .map_err(|e| Error::ProtocolInvariantViolated(format!("malformed broadcast response: {e}")))
    }
}
