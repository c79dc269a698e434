//! A fee-aware UTXO input selection engine.
//!
//! Given spendable coins ([`Candidate`]s) and a payment target, the engine picks which coins
//! to spend. Each coin counts at its effective value, its value minus the fee needed to
//! spend it at the requested feerate, so the choice already accounts for input cost.
//!
//! Three algorithms are provided:
//!
//! * [`select_coin_bnb`]: Branch and Bound, searching for a selection that needs no change.
//! * [`select_coin_lowestlarger`]: the smallest coin that covers the target, consolidating
//!   from the largest coins down when none does.
//! * [`select_coin_srd`]: Single Random Draw, accumulating coins in random order.
//!
//! [`select_coin`] ties them together for a payment: Branch and Bound first, a fallback
//! next, then the real fee and the change output.
//!
//! ```
//! use utxo_coinselect::{select_coin, Candidate, CoinSelectionOpt, CoinSelector};
//!
//! let selector = CoinSelector::with_candidates(
//!     11,
//!     [50_000, 20_000, 10_079].map(|value| Candidate::new(value, 68)),
//! )?;
//! let options = CoinSelectionOpt {
//!     target_value: 10_000,
//!     target_feerate: 1000,
//!     ..Default::default()
//! };
//! let plan = select_coin(&selector, &options, &mut rand::thread_rng())?;
//! assert_eq!(plan.selection.selected_inputs, vec![2]);
//! assert_eq!(plan.change, None);
//! # Ok::<(), utxo_coinselect::SelectionError>(())
//! ```

/// Branch and Bound, Lowest Larger and Single Random Draw
pub mod algorithms;
/// Wrapper API that funds a payment, Branch and Bound first with a configurable fallback
pub mod selectcoin;
/// The candidate list of a single payment attempt
pub mod selector;
pub mod simulation;
/// Core types and structs used throughout the library including Candidate and CoinSelectionOpt
pub mod types;
/// Helper functions for fee calculation, effective values and waste metrics
pub mod utils;

pub use crate::algorithms::{
    bnb::{select_coin_bnb, BNB_TOTAL_TRIES},
    lowestlarger::select_coin_lowestlarger,
    srd::{select_coin_srd, PermutationSource},
};
pub use crate::selectcoin::select_coin;
pub use crate::selector::CoinSelector;
pub use crate::types::{
    Algorithm, Candidate, CoinSelectionOpt, EffectiveValue, FallbackStrategy, FeeRate,
    FundingPlan, SelectionError, SelectionOutput, Size, WasteMetric,
};
