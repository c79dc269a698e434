//! Replays a history of deposits and payments against an in-memory coin pool.
//!
//! Every payment is funded through [`select_coin`], so running the same scenario under
//! different [`FallbackStrategy`] settings compares the fees each policy ends up paying.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::{
    algorithms::srd::PermutationSource,
    selectcoin::select_coin,
    selector::CoinSelector,
    types::{
        Algorithm, Candidate, CoinSelectionOpt, FallbackStrategy, FeeRate, SelectionError, Size,
        DEFAULT_CHANGE_SIZE, DEFAULT_CHANGE_SPEND_SIZE, DEFAULT_INPUT_SIZE, DEFAULT_OUTPUT_SIZE,
        DUST_THRESHOLD, TX_OVERHEAD_SIZE,
    },
    utils::calculate_fee,
};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// One entry of a [`Scenario`]: a deposit when `value` is positive, a payment otherwise.
///
/// Both fields accept either base units as a JSON integer or a decimal BTC string such as
/// `"-0.00125"`, the shape of rows converted from CSV exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioEvent {
    #[serde(deserialize_with = "deserialize_amount")]
    pub value: i64,
    /// Feerate per 1000 size units of the transaction moving the funds.
    #[serde(deserialize_with = "deserialize_rate")]
    pub rate: FeeRate,
}

const UNITS_PER_BTC: i64 = 100_000_000;

#[derive(Deserialize)]
#[serde(untagged)]
enum Amount {
    Units(i64),
    Btc(String),
}

/// Converts a decimal BTC amount with at most eight fractional digits into base units.
fn parse_btc(amount: &str) -> Option<i64> {
    let amount = amount.trim();
    let (negative, digits) = match amount.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, amount.strip_prefix('+').unwrap_or(amount)),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if (whole.is_empty() && fraction.is_empty())
        || fraction.len() > 8
        || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let fraction: i64 = format!("{:0<8}", fraction).parse().ok()?;
    let units = whole.checked_mul(UNITS_PER_BTC)?.checked_add(fraction)?;
    Some(if negative { -units } else { units })
}

fn deserialize_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Amount::deserialize(deserializer)? {
        Amount::Units(units) => Ok(units),
        Amount::Btc(amount) => parse_btc(&amount)
            .ok_or_else(|| de::Error::custom(format_args!("invalid BTC amount {:?}", amount))),
    }
}

fn deserialize_rate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FeeRate, D::Error> {
    let rate = deserialize_amount(deserializer)?;
    FeeRate::try_from(rate)
        .map_err(|_| de::Error::custom(format_args!("negative fee rate {}", rate)))
}

/// An ordered wallet history, serialized as a JSON array of [`ScenarioEvent`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scenario {
    pub events: Vec<ScenarioEvent>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Skeleton of a payment transaction: overhead plus the payment output.
    pub base_size: Size,
    /// Size of spending one of the wallet's coins.
    pub input_size: Size,
    pub change_size: Size,
    pub change_spend_size: Size,
    pub min_change_value: u64,
    /// Events moving less than this are skipped.
    pub min_event_value: u64,
    pub fallback: FallbackStrategy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            base_size: TX_OVERHEAD_SIZE + DEFAULT_OUTPUT_SIZE,
            input_size: DEFAULT_INPUT_SIZE,
            change_size: DEFAULT_CHANGE_SIZE,
            change_spend_size: DEFAULT_CHANGE_SPEND_SIZE,
            min_change_value: DUST_THRESHOLD,
            min_event_value: 500,
            fallback: FallbackStrategy::default(),
        }
    }
}

/// Totals gathered over a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub received: u64,
    pub sent: u64,
    /// Fees the wallet paid on its own payments.
    pub wallet_fee: u64,
    /// Fees the sending side paid on the deposits the wallet received.
    pub funding_fee: u64,
    pub deposits: usize,
    pub payments: usize,
    pub failed_payments: usize,
    pub skipped_events: usize,
    pub changeless_payments: usize,
    pub bnb_selections: usize,
    pub lowest_larger_selections: usize,
    pub srd_selections: usize,
    pub final_balance: u64,
    pub final_coins: usize,
}

impl SimulationReport {
    pub fn total_fee(&self) -> u64 {
        self.wallet_fee.saturating_add(self.funding_fee)
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total received: {}", self.received)?;
        writeln!(f, "Total sent: {}", self.sent)?;
        writeln!(f, "Total fee: {}", self.total_fee())?;
        writeln!(f, "Total fee by wallet: {}", self.wallet_fee)?;
        writeln!(f, "Total fee by funder: {}", self.funding_fee)?;
        writeln!(
            f,
            "Payments: {} made, {} failed, {} without change",
            self.payments, self.failed_payments, self.changeless_payments
        )?;
        writeln!(
            f,
            "Selections: {} bnb, {} lowest larger, {} srd",
            self.bnb_selections, self.lowest_larger_selections, self.srd_selections
        )?;
        write!(
            f,
            "Balance: {} in {} coins",
            self.final_balance, self.final_coins
        )
    }
}

/// A wallet whose coins only live in memory.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    coins: Vec<Candidate>,
    report: SimulationReport,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Simulation {
            config,
            coins: Vec::new(),
            report: SimulationReport::default(),
        }
    }

    pub fn coins(&self) -> &[Candidate] {
        &self.coins
    }

    pub fn report(&self) -> &SimulationReport {
        &self.report
    }

    /// Applies a single event. A payment the wallet can't fund is counted as failed.
    pub fn apply<P: PermutationSource + ?Sized>(
        &mut self,
        event: &ScenarioEvent,
        rng: &mut P,
    ) -> Result<(), SelectionError> {
        let amount = event.value.unsigned_abs();
        if amount < self.config.min_event_value {
            self.report.skipped_events += 1;
            return Ok(());
        }
        if event.value > 0 {
            self.deposit(amount, event.rate);
            return Ok(());
        }

        // A fresh selector per payment, the pool changes between payments.
        let selector =
            CoinSelector::with_candidates(self.config.base_size, self.coins.iter().copied())?;
        let options = CoinSelectionOpt {
            target_value: amount,
            target_feerate: event.rate,
            change_size: self.config.change_size,
            change_spend_size: self.config.change_spend_size,
            min_change_value: self.config.min_change_value,
            fallback: self.config.fallback,
        };

        let plan = match select_coin(&selector, &options, rng) {
            Ok(plan) => plan,
            Err(e) if e.is_no_solution() => {
                log::warn!("payment of {} at rate {} failed: {}", amount, event.rate, e);
                self.report.failed_payments += 1;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let selected = &plan.selection.selected_inputs;
        let mut index = 0;
        self.coins.retain(|_| {
            let keep = selected.binary_search(&index).is_err();
            index += 1;
            keep
        });
        match plan.change {
            Some(change) => self.coins.push(Candidate::new(change, self.config.input_size)),
            None => self.report.changeless_payments += 1,
        }

        match plan.algorithm {
            Algorithm::BranchAndBound => self.report.bnb_selections += 1,
            Algorithm::LowestLarger => self.report.lowest_larger_selections += 1,
            Algorithm::SingleRandomDraw => self.report.srd_selections += 1,
        }
        self.report.sent += amount;
        self.report.wallet_fee += plan.fee;
        self.report.payments += 1;
        self.refresh_balance();
        Ok(())
    }

    /// Applies every event of `scenario` in order and returns the final report.
    pub fn run<P: PermutationSource + ?Sized>(
        mut self,
        scenario: &Scenario,
        rng: &mut P,
    ) -> Result<SimulationReport, SimulationError> {
        let total = scenario.events.len();
        for (i, event) in scenario.events.iter().enumerate() {
            self.apply(event, rng)?;
            if i % 100 == 0 {
                log::info!("done {} of {} events", i, total);
            }
        }
        Ok(self.report)
    }

    /// The funding transaction spends one coin of the sender and returns change to it.
    fn deposit(&mut self, amount: u64, rate: FeeRate) {
        let size = self
            .config
            .base_size
            .saturating_add(self.config.input_size)
            .saturating_add(self.config.change_size);
        self.coins.push(Candidate::new(amount, self.config.input_size));
        self.report.received += amount;
        self.report.funding_fee += calculate_fee(size, rate);
        self.report.deposits += 1;
        self.refresh_balance();
    }

    fn refresh_balance(&mut self) {
        self.report.final_balance = self.coins.iter().map(|coin| coin.value).sum();
        self.report.final_coins = self.coins.len();
    }
}

#[cfg(test)]
mod test {
    use super::{Scenario, ScenarioEvent, Simulation, SimulationConfig, SimulationError};
    use crate::types::{FallbackStrategy, SelectionError};
    use rand::{rngs::StdRng, SeedableRng};

    fn setup_scenario() -> Scenario {
        Scenario::from_json(
            r#"[
                {"value": 100000, "rate": 0},
                {"value": 50000, "rate": 0},
                {"value": 20000, "rate": 0},
                {"value": -30000, "rate": 2000},
                {"value": 300, "rate": 0},
                {"value": -200, "rate": 1000},
                {"value": -65000, "rate": 5000},
                {"value": 7000, "rate": 0},
                {"value": -500000, "rate": 1000},
                {"value": -12000, "rate": 1000}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_scenario_from_json() {
        let scenario = setup_scenario();
        assert_eq!(scenario.events.len(), 10);
        assert_eq!(
            scenario.events[3],
            ScenarioEvent {
                value: -30000,
                rate: 2000,
            }
        );
        assert!(matches!(
            Scenario::from_json("[{\"value\": 1}]"),
            Err(SimulationError::Json(_))
        ));
    }

    #[test]
    fn test_scenario_from_btc_strings() {
        let scenario = Scenario::from_json(
            r#"[
                {"value": "0.00125", "rate": "0.00001"},
                {"value": "-0.0003", "rate": "0.00002"},
                {"value": "2", "rate": "0"},
                {"value": "-.5", "rate": "0.0001", "date": "2019-03-01"}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            scenario.events,
            vec![
                ScenarioEvent {
                    value: 125_000,
                    rate: 1000,
                },
                ScenarioEvent {
                    value: -30_000,
                    rate: 2000,
                },
                ScenarioEvent {
                    value: 200_000_000,
                    rate: 0,
                },
                ScenarioEvent {
                    value: -50_000_000,
                    rate: 10_000,
                },
            ]
        );
    }

    #[test]
    fn test_scenario_rejects_bad_amounts() {
        for json in [
            r#"[{"value": "0.000000001", "rate": "0"}]"#,
            r#"[{"value": "1e-3", "rate": "0"}]"#,
            r#"[{"value": ".", "rate": "0"}]"#,
            r#"[{"value": "", "rate": "0"}]"#,
            r#"[{"value": "1", "rate": "-0.00001"}]"#,
            r#"[{"value": "92233720369", "rate": "0"}]"#,
        ] {
            assert!(
                matches!(Scenario::from_json(json), Err(SimulationError::Json(_))),
                "{}",
                json
            );
        }
    }

    #[test]
    fn test_deposits_record_funding_fee() {
        let mut simulation = Simulation::new(SimulationConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        simulation
            .apply(
                &ScenarioEvent {
                    value: 50000,
                    rate: 1000,
                },
                &mut rng,
            )
            .unwrap();
        let config = SimulationConfig::default();
        let size = config.base_size + config.input_size + config.change_size;
        let report = simulation.report();
        assert_eq!(report.funding_fee, u64::from(size));
        assert_eq!(report.wallet_fee, 0);
        assert_eq!(report.total_fee(), report.funding_fee);
        // The sender pays the deposit fee, the coin arrives in full.
        assert_eq!(report.final_balance, 50000);
    }

    #[test]
    fn test_simulation_balances() {
        for fallback in [
            FallbackStrategy::LowestLarger,
            FallbackStrategy::SingleRandomDraw,
            FallbackStrategy::LeastWaste,
        ] {
            let config = SimulationConfig {
                fallback,
                ..Default::default()
            };
            let report = Simulation::new(config)
                .run(&setup_scenario(), &mut StdRng::seed_from_u64(3))
                .unwrap();
            assert_eq!(report.deposits, 4);
            assert_eq!(report.skipped_events, 2);
            assert_eq!(report.payments, 3);
            // 500000 is more than the wallet ever holds.
            assert_eq!(report.failed_payments, 1);
            assert_eq!(report.received, 177000);
            assert_eq!(report.sent, 107000);
            assert!(report.wallet_fee > 0);
            // Every deposit in the scenario arrives at rate 0.
            assert_eq!(report.funding_fee, 0);
            assert_eq!(
                report.received - report.sent - report.wallet_fee,
                report.final_balance
            );
            assert_eq!(
                report.bnb_selections + report.lowest_larger_selections + report.srd_selections,
                report.payments
            );
        }
    }

    #[test]
    fn test_simulation_spends_selected_coins() {
        let mut simulation = Simulation::new(SimulationConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        for value in [40000, 25000, 10000] {
            simulation
                .apply(&ScenarioEvent { value, rate: 0 }, &mut rng)
                .unwrap();
        }
        // At rate 0 the 25000 coin matches exactly and no change is created.
        simulation
            .apply(
                &ScenarioEvent {
                    value: -25000,
                    rate: 0,
                },
                &mut rng,
            )
            .unwrap();
        let values: Vec<u64> = simulation.coins().iter().map(|coin| coin.value).collect();
        assert_eq!(values, vec![40000, 10000]);
        assert_eq!(simulation.report().changeless_payments, 1);
        assert_eq!(simulation.report().bnb_selections, 1);
        assert_eq!(simulation.report().final_balance, 50000);
    }

    #[test]
    fn test_simulation_rejects_zero_input_size() {
        let config = SimulationConfig {
            input_size: 0,
            ..Default::default()
        };
        let mut simulation = Simulation::new(config);
        let mut rng = StdRng::seed_from_u64(0);
        simulation
            .apply(&ScenarioEvent { value: 1000, rate: 0 }, &mut rng)
            .unwrap();
        assert_eq!(
            simulation.apply(&ScenarioEvent { value: -600, rate: 0 }, &mut rng),
            Err(SelectionError::InvalidCandidate { index: 0 })
        );
    }

    #[test]
    fn test_report_display() {
        let report = Simulation::new(SimulationConfig::default())
            .run(&setup_scenario(), &mut StdRng::seed_from_u64(3))
            .unwrap();
        let text = report.to_string();
        assert!(text.contains("Total received: 177000"));
        assert!(text.contains("Total fee:"));
        assert!(text.contains("Total fee by wallet:"));
        assert!(text.contains("Total fee by funder: 0"));
    }
}
