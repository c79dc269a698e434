//! Replays a wallet history under every fallback strategy and prints the fees paid.
//!
//! Usage: `cargo run --example simulate [scenario.json] [seed]`

use std::{env, fs};

use rand::{rngs::StdRng, SeedableRng};
use utxo_coinselect::{
    simulation::{Scenario, Simulation, SimulationConfig, SimulationError},
    FallbackStrategy,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let scenario = match args.next() {
        Some(path) => Scenario::from_json(&fs::read_to_string(path)?)?,
        None => Scenario::from_json(include_str!("scenario.json"))?,
    };
    let seed: u64 = match args.next() {
        Some(seed) => seed.parse()?,
        None => 0,
    };

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
            .run(&scenario, &mut StdRng::seed_from_u64(seed))
            .map_err(|e: SimulationError| format!("{:?} simulation failed: {}", fallback, e))?;
        println!("== fallback: {:?}", fallback);
        println!("{}\n", report);
    }
    Ok(())
}
