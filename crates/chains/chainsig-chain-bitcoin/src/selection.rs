//! UTXO coin selection (§4.5.1): picks inputs covering the requested outputs
//! plus a fee, adding a change output back to the sender when a round is
//! feasible.

use chainsig_types::error::Error;

use crate::provider::Utxo;

/// One planned output: an address and a satoshi amount.
#[derive(Debug, Clone)]
pub struct PlannedOutput {
    pub address: String,
    pub value_sats: u64,
}

/// The result of a feasible coin-selection pass.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub inputs: Vec<Utxo>,
    pub outputs: Vec<PlannedOutput>,
    pub fee_sats: u64,
}

/// Rough per-input/per-output virtual size for a P2WPKH transaction, used to
/// estimate the fee before inputs are finalized. Matches the standard
/// P2WPKH weight figures (not exact, conservative enough for fee-rate sizing).
const BASE_VBYTES: u64 = 11;
const INPUT_VBYTES: u64 = 68;
const OUTPUT_VBYTES: u64 = 31;

/// Greedy coin selection: accumulate UTXOs (largest-first, to keep the input
/// count small) until the selected value covers outputs plus fee, adding a
/// change output back to `from` when the leftover exceeds the dust threshold.
///
/// Fails [`Error::InsufficientFunds`] if no feasible set exists.
pub fn select_coins(
    utxos: &[Utxo],
    outputs: Vec<PlannedOutput>,
    fee_rate_sat_per_vb: u64,
    change_address: &str,
    dust_threshold_sats: u64,
) -> Result<SelectionResult, Error> {
    let target: u64 = outputs.iter().map(|o| o.value_sats).sum();

    let mut candidates = utxos.to_vec();
    candidates.sort_by(|a, b| b.value.cmp(&a.value));

    let mut selected = Vec::new();
    let mut selected_value = 0u64;

    for utxo in candidates {
        selected_value += utxo.value;
        selected.push(utxo);

        let vbytes_without_change = BASE_VBYTES + selected.len() as u64 * INPUT_VBYTES
            + outputs.len() as u64 * OUTPUT_VBYTES;
        let fee_without_change = vbytes_without_change * fee_rate_sat_per_vb;

        if selected_value < target + fee_without_change {
            continue;
        }

        let leftover = selected_value - target - fee_without_change;
        let vbytes_with_change = vbytes_without_change + OUTPUT_VBYTES;
        let fee_with_change = vbytes_with_change * fee_rate_sat_per_vb;

        if leftover > dust_threshold_sats && selected_value >= target + fee_with_change {
            let mut outputs = outputs;
            outputs.push(PlannedOutput {
                address: change_address.to_string(),
                value_sats: selected_value - target - fee_with_change,
            });
            return Ok(SelectionResult {
                inputs: selected,
                outputs,
                fee_sats: fee_with_change,
            });
        }

        return Ok(SelectionResult {
            inputs: selected,
            outputs,
            fee_sats: selected_value - target,
        });
    }

    Err(Error::InsufficientFunds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxo(value: u64) -> Utxo {
        Utxo {
            txid: "a".repeat(64),
            vout: 0,
            value,
        }
    }

    #[test]
    fn selects_enough_inputs_and_adds_change() {
        let utxos = vec![utxo(100_000), utxo(50_000)];
        let outputs = vec![PlannedOutput {
            address: "tb1qdest".into(),
            value_sats: 40_000,
        }];
        let result = select_coins(&utxos, outputs, 5, "tb1qchange", 546).unwrap();
        assert_eq!(result.inputs.len(), 1);
        assert_eq!(result.outputs.len(), 2);
        assert!(result.fee_sats > 0);
    }

    #[test]
    fn fails_when_funds_insufficient() {
        let utxos = vec![utxo(1_000)];
        let outputs = vec![PlannedOutput {
            address: "tb1qdest".into(),
            value_sats: 40_000,
        }];
        let err = select_coins(&utxos, outputs, 5, "tb1qchange", 546).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds));
    }

    #[test]
    fn omits_change_output_when_leftover_is_dust() {
        let utxos = vec![utxo(40_600)];
        let outputs = vec![PlannedOutput {
            address: "tb1qdest".into(),
            value_sats: 40_000,
        }];
        let result = select_coins(&utxos, outputs, 1, "tb1qchange", 546).unwrap();
        assert_eq!(result.outputs.len(), 1);
    }
}
