use std::cmp::Reverse;

use crate::{
    types::{Candidate, FeeRate, MatchParameters, SelectionError, SelectionOutput},
    utils::{ensure_funds, spendable_inputs, validate_inputs},
};

/// Upper bound on the nodes a single Branch and Bound search may visit.
pub const BNB_TOTAL_TRIES: usize = 100_000;

/// Perform Coinselection via Branch And Bound algorithm.
///
/// Looks for a subset of `inputs` whose effective value at `feerate` lies within
/// `[target, target + cost_of_change]`, so the transaction needs no change output.
/// An exact match is preferred; otherwise the smallest sum in the window wins, and
/// among equal sums the one with fewer inputs.
///
/// Returns `NoSolutionFound` if nothing lands in the window within [`BNB_TOTAL_TRIES`].
pub fn select_coin_bnb(
    inputs: &[Candidate],
    target: u64,
    cost_of_change: u64,
    feerate: FeeRate,
) -> Result<SelectionOutput, SelectionError> {
    validate_inputs(inputs, target)?;

    let mut sorted_inputs = spendable_inputs(inputs, feerate);
    let available = ensure_funds(&sorted_inputs, target)?;
    // Sorted on every call: inputs of different sizes swap places as the feerate moves.
    sorted_inputs.sort_unstable_by_key(|&(index, value)| (Reverse(value), index));

    let match_parameters = MatchParameters {
        target_for_match: target,
        match_range: cost_of_change,
    };

    match bnb(&sorted_inputs, available, &match_parameters, BNB_TOTAL_TRIES) {
        Some((selected_inputs, selected_value)) => {
            log::debug!(
                "bnb selected {} inputs worth {} for target {}",
                selected_inputs.len(),
                selected_value,
                target
            );
            Ok(SelectionOutput::new(selected_inputs, selected_value, target))
        }
        None => Err(SelectionError::NoSolutionFound),
    }
}

/// Depth first search over the include/exclude tree of `inputs_in_desc_value`.
///
/// `available` is the total value of the slice. Returns the indices of the best selection
/// together with its value, or `None` if no visited node landed within the window.
fn bnb(
    inputs_in_desc_value: &[(usize, u64)],
    available: u64,
    match_parameters: &MatchParameters,
    mut bnb_tries: usize,
) -> Option<(Vec<usize>, u64)> {
    let target = match_parameters.target_for_match;
    let upper_bound = target.saturating_add(match_parameters.match_range);

    // selection[i] holds whether inputs_in_desc_value[i] is included. Inputs at
    // selection.len() and beyond are still undecided, their value is in `remaining`.
    let mut selection: Vec<bool> = Vec::with_capacity(inputs_in_desc_value.len());
    let mut best_selection: Vec<bool> = Vec::with_capacity(inputs_in_desc_value.len());
    // (value, input count) of best_selection
    let mut best: Option<(u64, usize)> = None;

    let mut acc_eff_value: u64 = 0;
    let mut input_count: usize = 0;
    let mut remaining = available;
    let mut exhausted = false;

    while bnb_tries > 0 {
        bnb_tries -= 1;

        let backtrack = if acc_eff_value.saturating_add(remaining) < target {
            // Even everything left can't reach the target.
            true
        } else if acc_eff_value >= target {
            // In the window: adding more only moves away from the target.
            if best.map_or(true, |best| (acc_eff_value, input_count) < best) {
                log::trace!(
                    "bnb improved to {} with {} inputs",
                    acc_eff_value,
                    input_count
                );
                best_selection.clone_from(&selection);
                best = Some((acc_eff_value, input_count));
            }
            if acc_eff_value == target {
                break;
            }
            true
        } else {
            false
        };

        if backtrack {
            // Walk back to the last included input that still has its omission branch to explore.
            while let Some(false) = selection.last() {
                selection.pop();
                remaining = remaining.saturating_add(inputs_in_desc_value[selection.len()].1);
            }
            match selection.last_mut() {
                Some(included) => *included = false,
                None => {
                    exhausted = true;
                    break;
                }
            }
            acc_eff_value -= inputs_in_desc_value[selection.len() - 1].1;
            input_count -= 1;
        } else {
            let value = inputs_in_desc_value[selection.len()].1;
            remaining = remaining.saturating_sub(value);
            // Inclusion branch first, unless it already overshoots the window.
            if acc_eff_value.saturating_add(value) <= upper_bound {
                selection.push(true);
                acc_eff_value += value;
                input_count += 1;
            } else {
                selection.push(false);
            }
        }
    }

    if !exhausted && best.map_or(true, |(value, _)| value != target) {
        log::debug!(
            "bnb search budget spent, best so far: {:?}",
            best.map(|(value, _)| value)
        );
    }

    best.map(|(value, _)| {
        let selected_inputs = inputs_in_desc_value
            .iter()
            .zip(&best_selection)
            .filter_map(|(&(index, _), &included)| included.then_some(index))
            .collect();
        (selected_inputs, value)
    })
}
