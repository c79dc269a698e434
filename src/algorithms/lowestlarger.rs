use crate::{
    types::{Candidate, FeeRate, SelectionError, SelectionOutput},
    utils::{ensure_funds, spendable_inputs, validate_inputs},
};

/// Performs coin selection using the Lowest Larger algorithm.
///
/// Picks the smallest single input whose effective value covers `target`. When no single
/// input suffices, the largest input is taken and the search repeats for what is left of
/// the target, so the selection ends on the smallest input that closes the gap.
///
/// Returns `InsufficientFunds` if the inputs can't cover the target.
pub fn select_coin_lowestlarger(
    inputs: &[Candidate],
    target: u64,
    feerate: FeeRate,
) -> Result<SelectionOutput, SelectionError> {
    validate_inputs(inputs, target)?;

    let mut sorted_inputs = spendable_inputs(inputs, feerate);
    ensure_funds(&sorted_inputs, target)?;
    sorted_inputs.sort_unstable_by_key(|&(index, value)| (value, index));

    let mut selected_inputs: Vec<usize> = Vec::new();
    let mut accumulated_value: u64 = 0;
    let mut outstanding = target;

    loop {
        let index = sorted_inputs.partition_point(|&(_, value)| value < outstanding);
        if let Some(&(idx, value)) = sorted_inputs.get(index) {
            selected_inputs.push(idx);
            accumulated_value = accumulated_value.saturating_add(value);
            break;
        }
        // Nothing covers the rest on its own; ensure_funds guarantees the pool is not empty.
        match sorted_inputs.pop() {
            Some((idx, value)) => {
                selected_inputs.push(idx);
                accumulated_value = accumulated_value.saturating_add(value);
                outstanding -= value;
            }
            None => {
                return Err(SelectionError::InsufficientFunds {
                    needed: target,
                    available: accumulated_value,
                })
            }
        }
    }

    log::debug!(
        "lowest larger selected {} inputs worth {} for target {}",
        selected_inputs.len(),
        accumulated_value,
        target
    );
    Ok(SelectionOutput::new(
        selected_inputs,
        accumulated_value,
        target,
    ))
}
