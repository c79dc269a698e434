use crate::types::{
    Candidate, CoinSelectionOpt, EffectiveValue, FeeRate, SelectionError, Size,
};

/// Fee for `size` units at `rate` per 1000 units, rounded up.
#[inline]
pub fn calculate_fee(size: Size, rate: FeeRate) -> u64 {
    let fee = (u128::from(size) * u128::from(rate) + 999) / 1000;
    u64::try_from(fee).unwrap_or(u64::MAX)
}

/// Returns the effective value of the [`Candidate`], which is the actual value minus the fee
/// needed to spend it.
#[inline]
pub fn effective_value(candidate: &Candidate, feerate: FeeRate) -> EffectiveValue {
    let value = EffectiveValue::try_from(candidate.value).unwrap_or(EffectiveValue::MAX);
    let fee = EffectiveValue::try_from(candidate.fee(feerate)).unwrap_or(EffectiveValue::MAX);
    value.saturating_sub(fee)
}

/// Rejects a zero target and malformed candidates before any search starts.
pub fn validate_inputs(inputs: &[Candidate], target: u64) -> Result<(), SelectionError> {
    if target == 0 {
        return Err(SelectionError::InvalidTarget);
    }
    match inputs.iter().position(|candidate| !is_well_formed(candidate)) {
        Some(index) => Err(SelectionError::InvalidCandidate { index }),
        None => Ok(()),
    }
}

#[inline]
pub(crate) fn is_well_formed(candidate: &Candidate) -> bool {
    candidate.size > 0 && EffectiveValue::try_from(candidate.value).is_ok()
}

/// Pairs every candidate worth more than its own spending fee with its effective value.
///
/// Candidates with a non-positive effective value can only lower a selected sum, so no
/// algorithm ever picks them.
pub fn spendable_inputs(inputs: &[Candidate], feerate: FeeRate) -> Vec<(usize, u64)> {
    inputs
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            u64::try_from(candidate.effective_value(feerate))
                .ok()
                .filter(|&value| value > 0)
                .map(|value| (index, value))
        })
        .collect()
}

#[inline]
pub fn total_effective_value(spendable: &[(usize, u64)]) -> u64 {
    spendable
        .iter()
        .fold(0u64, |acc, &(_, value)| acc.saturating_add(value))
}

/// Fails with [`SelectionError::InsufficientFunds`] if `target` is out of reach.
pub(crate) fn ensure_funds(spendable: &[(usize, u64)], target: u64) -> Result<u64, SelectionError> {
    let available = total_effective_value(spendable);
    if available < target {
        log::debug!(
            "insufficient funds: target {} exceeds available effective value {}",
            target,
            available
        );
        return Err(SelectionError::InsufficientFunds {
            needed: target,
            available,
        });
    }
    Ok(available)
}

#[inline]
pub fn calculate_waste(
    options: &CoinSelectionOpt,
    input_value: u64,
    fee_without_change: u64,
    change: Option<u64>,
) -> u64 {
    // waste = cost of change when a change output is created, otherwise the excess that
    // gets dropped to fee on top of what the transaction needs to pay.
    match change {
        Some(_) => options.cost_of_change(),
        None => input_value.saturating_sub(options.target_value.saturating_add(fee_without_change)),
    }
}
