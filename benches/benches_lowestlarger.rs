use criterion::{black_box, criterion_group, criterion_main, Criterion};
use utxo_coinselect::{
    algorithms::lowestlarger::select_coin_lowestlarger,
    types::{Candidate, SelectionError, SelectionOutput},
};

fn benchmark_select_coin_lowestlarger(c: &mut Criterion) {
    let inputs = [
        Candidate::new(100, 100),
        Candidate::new(1500, 200),
        Candidate::new(3400, 300),
        Candidate::new(2200, 150),
        Candidate::new(1190, 200),
        Candidate::new(3300, 100),
        Candidate::new(1000, 190),
        Candidate::new(2000, 210),
        Candidate::new(3000, 300),
        Candidate::new(2250, 250),
        Candidate::new(190, 220),
        Candidate::new(1750, 170),
    ];

    let mut final_result: Option<Result<SelectionOutput, SelectionError>> = None;

    c.bench_function("select_coin_lowestlarger", |b| {
        b.iter(|| {
            final_result = Some(select_coin_lowestlarger(
                black_box(&inputs),
                black_box(20000),
                black_box(400),
            ));
            black_box(&final_result);
        })
    });

    if let Some(result) = &final_result {
        match result {
            Ok(selection) => println!("SelectionOutput: {:?}", selection),
            Err(e) => println!("Error: {:?}", e),
        }
    }
}

criterion_group!(benches, benchmark_select_coin_lowestlarger);
criterion_main!(benches);
