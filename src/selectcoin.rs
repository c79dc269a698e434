use crate::{
    algorithms::srd::PermutationSource,
    selector::CoinSelector,
    types::{
        Algorithm, CoinSelectionOpt, FallbackStrategy, FundingPlan, SelectionError,
        SelectionOutput, WasteMetric,
    },
    utils::{calculate_fee, calculate_waste},
};

/// Funds a payment of `options.target_value` from the selector's candidates.
///
/// Branch and Bound runs first, looking for a selection that needs no change output.
/// If it finds none, the `options.fallback` strategy picks the inputs instead. The
/// returned plan carries the real fee for the final transaction size and a change
/// output whenever the remainder exceeds `options.min_change_value`.
pub fn select_coin<P: PermutationSource + ?Sized>(
    selector: &CoinSelector,
    options: &CoinSelectionOpt,
    rng: &mut P,
) -> Result<FundingPlan, SelectionError> {
    if options.target_value == 0 {
        return Err(SelectionError::InvalidTarget);
    }
    let feerate = options.target_feerate;
    // Inputs pay for themselves through their effective value, the skeleton is paid on top.
    let target = options
        .target_value
        .saturating_add(calculate_fee(selector.base_size(), feerate));

    match selector.select_bnb(target, options.cost_of_change(), feerate) {
        Ok(selection) => {
            return Ok(build_plan(
                selector,
                options,
                selection,
                Algorithm::BranchAndBound,
            ))
        }
        Err(SelectionError::NoSolutionFound) => {
            log::debug!(
                "no changeless selection for {}, falling back to {:?}",
                target,
                options.fallback
            );
        }
        Err(e) => return Err(e),
    }

    let lowest_larger = || {
        selector
            .select_lowest_larger(target, feerate)
            .map(|selection| build_plan(selector, options, selection, Algorithm::LowestLarger))
    };

    match options.fallback {
        FallbackStrategy::LowestLarger => lowest_larger(),
        FallbackStrategy::SingleRandomDraw => select_srd(selector, options, target, rng),
        FallbackStrategy::LeastWaste => {
            match (lowest_larger(), select_srd(selector, options, target, rng)) {
                (Ok(ll), Ok(srd)) => Ok(if srd.waste < ll.waste { srd } else { ll }),
                (Ok(plan), Err(_)) | (Err(_), Ok(plan)) => Ok(plan),
                (Err(e), Err(_)) => Err(e),
            }
        }
    }
}

fn select_srd<P: PermutationSource + ?Sized>(
    selector: &CoinSelector,
    options: &CoinSelectionOpt,
    target: u64,
    rng: &mut P,
) -> Result<FundingPlan, SelectionError> {
    selector
        .select_srd(target, options.target_feerate, rng)
        .map(|selection| build_plan(selector, options, selection, Algorithm::SingleRandomDraw))
}

/// Prices the transaction spending `selection` and decides on change.
fn build_plan(
    selector: &CoinSelector,
    options: &CoinSelectionOpt,
    selection: SelectionOutput,
    algorithm: Algorithm,
) -> FundingPlan {
    let feerate = options.target_feerate;
    let candidates = selector.candidates();
    let (input_value, input_size) =
        selection
            .selected_inputs
            .iter()
            .fold((0u64, 0u32), |(value, size), &index| {
                (
                    value.saturating_add(candidates[index].value),
                    size.saturating_add(candidates[index].size),
                )
            });

    let size_without_change = selector.base_size().saturating_add(input_size);
    let fee_without_change = calculate_fee(size_without_change, feerate);
    let size_with_change = size_without_change.saturating_add(options.change_size);
    let fee_with_change = calculate_fee(size_with_change, feerate);

    let change = input_value
        .checked_sub(options.target_value.saturating_add(fee_with_change))
        .filter(|&change| change > options.min_change_value);

    let (fee, size) = match change {
        Some(_) => (fee_with_change, size_with_change),
        // Whatever is left over goes to the miner.
        None => (
            input_value.saturating_sub(options.target_value),
            size_without_change,
        ),
    };
    let waste = calculate_waste(options, input_value, fee_without_change, change);

    log::debug!(
        "{:?} funded {} with {} inputs: fee {}, change {:?}, waste {}",
        algorithm,
        options.target_value,
        selection.selected_inputs.len(),
        fee,
        change,
        waste
    );

    FundingPlan {
        selection,
        algorithm,
        input_value,
        fee,
        change,
        size,
        waste: WasteMetric(waste),
    }
}
