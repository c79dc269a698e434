use crate::{
    algorithms::{
        bnb::select_coin_bnb,
        lowestlarger::select_coin_lowestlarger,
        srd::{select_coin_srd, PermutationSource},
    },
    types::{Candidate, FeeRate, SelectionError, SelectionOutput, Size, TX_OVERHEAD_SIZE},
    utils::{is_well_formed, spendable_inputs, total_effective_value},
};

/// Holds the candidates for one payment attempt and runs the selection algorithms over them.
///
/// The candidate list only ever grows, so an index returned by any selection keeps
/// pointing at the same coin for the lifetime of the selector. The feerate is an argument
/// of every call rather than selector state.
///
/// A selector has no internal locking; concurrent payment attempts should each build
/// their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelector {
    candidates: Vec<Candidate>,
    /// Size of the transaction skeleton the inputs get attached to.
    base_size: Size,
}

impl Default for CoinSelector {
    fn default() -> Self {
        CoinSelector::new(TX_OVERHEAD_SIZE)
    }
}

impl CoinSelector {
    pub fn new(base_size: Size) -> Self {
        CoinSelector {
            candidates: Vec::new(),
            base_size,
        }
    }

    /// Builds a selector over `candidates`, rejecting the first malformed one.
    pub fn with_candidates(
        base_size: Size,
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> Result<Self, SelectionError> {
        let mut selector = CoinSelector::new(base_size);
        for candidate in candidates {
            selector.add_candidate(candidate)?;
        }
        Ok(selector)
    }

    /// Appends a candidate and returns its index.
    pub fn add_candidate(&mut self, candidate: Candidate) -> Result<usize, SelectionError> {
        let index = self.candidates.len();
        if !is_well_formed(&candidate) {
            return Err(SelectionError::InvalidCandidate { index });
        }
        self.candidates.push(candidate);
        Ok(index)
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn base_size(&self) -> Size {
        self.base_size
    }

    /// Sum of the positive effective values at `feerate`, i.e. the most any selection can reach.
    pub fn available(&self, feerate: FeeRate) -> u64 {
        total_effective_value(&spendable_inputs(&self.candidates, feerate))
    }

    /// See [`select_coin_bnb`].
    pub fn select_bnb(
        &self,
        target: u64,
        cost_of_change: u64,
        feerate: FeeRate,
    ) -> Result<SelectionOutput, SelectionError> {
        select_coin_bnb(&self.candidates, target, cost_of_change, feerate)
    }

    /// See [`select_coin_lowestlarger`].
    pub fn select_lowest_larger(
        &self,
        target: u64,
        feerate: FeeRate,
    ) -> Result<SelectionOutput, SelectionError> {
        select_coin_lowestlarger(&self.candidates, target, feerate)
    }

    /// See [`select_coin_srd`].
    pub fn select_srd<P: PermutationSource + ?Sized>(
        &self,
        target: u64,
        feerate: FeeRate,
        rng: &mut P,
    ) -> Result<SelectionOutput, SelectionError> {
        select_coin_srd(&self.candidates, target, feerate, rng)
    }
}

#[cfg(test)]
mod test {
    use super::CoinSelector;
    use crate::types::{Candidate, SelectionError};
    use rand::{rngs::StdRng, SeedableRng};

    fn setup_selector() -> CoinSelector {
        CoinSelector::with_candidates(
            11,
            [100000, 50000, 30000, 20000, 10000, 5000, 3000, 2000, 1000]
                .iter()
                .map(|&value| Candidate::new(value, 69)),
        )
        .unwrap()
    }

    #[test]
    fn test_add_candidate_is_append_only() {
        let mut selector = CoinSelector::new(11);
        assert_eq!(selector.add_candidate(Candidate::new(500, 68)), Ok(0));
        assert_eq!(selector.add_candidate(Candidate::new(700, 68)), Ok(1));
        assert_eq!(
            selector.add_candidate(Candidate::new(900, 0)),
            Err(SelectionError::InvalidCandidate { index: 2 })
        );
        assert_eq!(selector.add_candidate(Candidate::new(900, 68)), Ok(2));
        assert_eq!(selector.candidates()[1].value, 700);
        assert_eq!(selector.base_size(), 11);
    }

    #[test]
    fn test_available_follows_feerate() {
        let selector = setup_selector();
        assert_eq!(selector.available(0), 221000);
        assert_eq!(selector.available(1000), 221000 - 9 * 69);
    }

    #[test]
    fn test_feerate_is_per_call() {
        let selector = setup_selector();
        let at_zero = selector.select_bnb(6000, 345, 0).unwrap();
        let _ = selector.select_bnb(6000, 345, 5000);
        // A call at another feerate leaves no trace on the next one.
        assert_eq!(selector.select_bnb(6000, 345, 0).unwrap(), at_zero);
    }

    #[test]
    fn test_all_algorithms_cover_target() {
        let selector = setup_selector();
        let mut rng = StdRng::seed_from_u64(1);
        for target in [1, 999, 1001, 54321, 220999] {
            let ll = selector.select_lowest_larger(target, 0).unwrap();
            assert!(ll.effective_value >= target);
            let srd = selector.select_srd(target, 0, &mut rng).unwrap();
            assert!(srd.effective_value >= target);
        }
    }
}
