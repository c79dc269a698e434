use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::{calculate_fee, effective_value};

/// Fee rate in value units per 1000 size units (e.g. sat/kvB).
pub type FeeRate = u64;
/// Serialized size contribution of an input or output, in size units (e.g. vbytes).
pub type Size = u32;
/// Value of a [`Candidate`] after paying for its own inclusion. May be negative.
pub type EffectiveValue = i64;

/// Size of spending a P2WPKH output.
pub const DEFAULT_INPUT_SIZE: Size = 68;
/// Size of a P2WPKH output.
pub const DEFAULT_OUTPUT_SIZE: Size = 31;
/// Size of a P2WPKH change output.
pub const DEFAULT_CHANGE_SIZE: Size = DEFAULT_OUTPUT_SIZE;
/// Size of later spending a P2WPKH change output.
pub const DEFAULT_CHANGE_SPEND_SIZE: Size = DEFAULT_INPUT_SIZE;
/// Change at or below this value is paid as fee instead of creating an output.
pub const DUST_THRESHOLD: u64 = 546;
/// Version, locktime, in/out counters and segwit marker of a transaction skeleton.
pub const TX_OVERHEAD_SIZE: Size = 11;

/// A [`Candidate`] represents a single spendable coin offered to the selector.
///
/// Its identity is its position in the candidate list handed to an algorithm, and
/// every selection result refers back to candidates by that position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Value of the coin.
    pub value: u64,
    /// Size added to the transaction by spending this coin. Must be non-zero.
    pub size: Size,
}

impl Candidate {
    pub fn new(value: u64, size: Size) -> Self {
        Candidate { value, size }
    }

    /// Fee required to spend this candidate at `feerate`.
    pub fn fee(&self, feerate: FeeRate) -> u64 {
        calculate_fee(self.size, feerate)
    }

    /// Value minus the fee required to spend this candidate at `feerate`.
    ///
    /// Recomputed on every call; nothing is cached between fee rates.
    pub fn effective_value(&self, feerate: FeeRate) -> EffectiveValue {
        effective_value(self, feerate)
    }
}

/// What to do when Branch and Bound finds no changeless solution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    #[default]
    LowestLarger,
    SingleRandomDraw,
    /// Run both fallbacks and keep the plan with the lower [`WasteMetric`].
    LeastWaste,
}

/// The algorithm that produced a selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    BranchAndBound,
    LowestLarger,
    SingleRandomDraw,
}

/// Options for funding a single payment through [`crate::selectcoin::select_coin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinSelectionOpt {
    /// Sum of the requested payment outputs.
    pub target_value: u64,
    /// The feerate the transaction should pay.
    pub target_feerate: FeeRate,
    /// Size of the change output, if one gets created.
    pub change_size: Size,
    /// Size of spending the change output in a future transaction.
    pub change_spend_size: Size,
    /// A change output is only created when its value exceeds this.
    pub min_change_value: u64,
    /// Algorithm to try when Branch and Bound finds nothing.
    pub fallback: FallbackStrategy,
}

impl Default for CoinSelectionOpt {
    fn default() -> Self {
        CoinSelectionOpt {
            target_value: 0,
            target_feerate: 1000,
            change_size: DEFAULT_CHANGE_SIZE,
            change_spend_size: DEFAULT_CHANGE_SPEND_SIZE,
            min_change_value: DUST_THRESHOLD,
            fallback: FallbackStrategy::default(),
        }
    }
}

impl CoinSelectionOpt {
    /// Cost of creating the change output now plus spending it later.
    ///
    /// Branch and Bound accepts overshooting its target by up to this amount, as
    /// dropping such a remainder to fee is cheaper than creating change.
    pub fn cost_of_change(&self) -> u64 {
        calculate_fee(self.change_size, self.target_feerate)
            .saturating_add(calculate_fee(self.change_spend_size, self.target_feerate))
    }
}

/// Error describing failure of a selection attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The candidates' total effective value does not reach the target.
    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    /// Funds exist, but no combination lands within the accepted window.
    #[error("no selection found within the accepted window")]
    NoSolutionFound,
    #[error("selection target must be greater than zero")]
    InvalidTarget,
    #[error("candidate {index} is malformed: size must be non-zero and value must fit in i64")]
    InvalidCandidate { index: usize },
}

impl SelectionError {
    /// Whether the error only means "nothing to select" rather than a caller mistake.
    pub fn is_no_solution(&self) -> bool {
        matches!(
            self,
            SelectionError::InsufficientFunds { .. } | SelectionError::NoSolutionFound
        )
    }
}

/// Measures the value lost by a selection, in value units.
///
/// For a raw selection this is the overshoot of the selected effective value over its
/// target. For a [`FundingPlan`] it is the cost of change when change is created, or
/// the excess paid as fee otherwise. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WasteMetric(pub u64);

/// The result of a selection algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOutput {
    /// The selected input indices in ascending order, refers to the indices of the inputs slice
    pub selected_inputs: Vec<usize>,
    /// Sum of the effective values of the selected inputs
    pub effective_value: u64,
    /// The waste amount, for the above inputs
    pub waste: WasteMetric,
}

impl SelectionOutput {
    pub(crate) fn new(mut selected_inputs: Vec<usize>, effective_value: u64, target: u64) -> Self {
        selected_inputs.sort_unstable();
        SelectionOutput {
            selected_inputs,
            effective_value,
            waste: WasteMetric(effective_value.saturating_sub(target)),
        }
    }
}

/// Struct for the Branch and Bound window: target_for_match and match_range
///
/// The accepted window is `[target_for_match, target_for_match + match_range]`.
#[derive(Debug)]
pub struct MatchParameters {
    pub(crate) target_for_match: u64,
    pub(crate) match_range: u64,
}

/// A funded payment: the chosen inputs plus the fee and change they imply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingPlan {
    pub selection: SelectionOutput,
    pub algorithm: Algorithm,
    /// Sum of the raw values of the selected inputs.
    pub input_value: u64,
    /// Fee actually paid, including any remainder dropped to fee.
    pub fee: u64,
    /// Value of the change output, if one is created.
    pub change: Option<u64>,
    /// Final transaction size, change output included.
    pub size: Size,
    pub waste: WasteMetric,
}
