use crate::{
    types::{Candidate, FeeRate, SelectionError, SelectionOutput},
    utils::{ensure_funds, spendable_inputs, validate_inputs},
};
use rand::{seq::SliceRandom, Rng};

/// Source of the draw order for Single Random Draw.
///
/// Every [`Rng`] is a source of uniform permutations; tests can plug in a seeded rng or a
/// fixed order.
pub trait PermutationSource {
    /// Returns the numbers `0..len`, each exactly once, in draw order.
    fn permutation(&mut self, len: usize) -> Vec<usize>;
}

impl<R: Rng + ?Sized> PermutationSource for R {
    fn permutation(&mut self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(self);
        order
    }
}

/// Performs coin selection using a single random draw.
///
/// Inputs are drawn in the order given by `rng` until their effective value reaches
/// `target`. Repeated calls may return different selections.
///
/// Returns `InsufficientFunds` if the inputs can't cover the target.
pub fn select_coin_srd<P: PermutationSource + ?Sized>(
    inputs: &[Candidate],
    target: u64,
    feerate: FeeRate,
    rng: &mut P,
) -> Result<SelectionOutput, SelectionError> {
    validate_inputs(inputs, target)?;

    // In the output we need to specify the indexes of the inputs in the given order,
    // so the draw goes over positions in the spendable list.
    let spendable = spendable_inputs(inputs, feerate);
    ensure_funds(&spendable, target)?;

    let mut accumulated_value: u64 = 0;
    let mut selected_inputs = Vec::new();
    let mut drawn = vec![false; spendable.len()];

    for position in rng.permutation(spendable.len()) {
        let Some(&(index, value)) = spendable.get(position) else {
            continue;
        };
        // A coin is spent at most once, whatever order the source hands out.
        if std::mem::replace(&mut drawn[position], true) {
            continue;
        }
        selected_inputs.push(index);
        accumulated_value = accumulated_value.saturating_add(value);
        if accumulated_value >= target {
            break;
        }
    }

    // A permutation source that skips or repeats positions can leave the target unreached.
    if accumulated_value < target {
        return Err(SelectionError::InsufficientFunds {
            needed: target,
            available: accumulated_value,
        });
    }

    log::debug!(
        "srd selected {} inputs worth {} for target {}",
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
