//! Benchmark for ZK-SNARK proving and verification time

use std::time::Duration;

use ark_std::rand::rngs::StdRng;
use ark_std::rand::SeedableRng;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use talent_zk_prover::{
    AttributeValues, BidValidityInput, Circuit, CircuitKeys, MarketplaceProver,
    MarketplaceVerifier, SelectiveDisclosureInput,
};

fn keys(circuit: Circuit) -> CircuitKeys {
    let mut rng = StdRng::seed_from_u64(1);
    CircuitKeys::setup(circuit, &mut rng).unwrap()
}

fn disclosure_input(disclosed: bool) -> SelectiveDisclosureInput {
    let mut values = AttributeValues::default();
    values.rate = Some("75".into());
    values.rate_disclosed = disclosed;
    values.availability = Some("evenings and weekends".into());
    values.availability_disclosed = disclosed;
    values.skills = Some("rust, solidity, circom".into());
    values.skills_disclosed = disclosed;
    values.resume_file_name = Some("resume.pdf".into());
    values.exclusions = Some("gambling".into());
    SelectiveDisclosureInput::from_values(&values).unwrap()
}

/// Benchmark bid validity proving
fn bench_bid_validity_proving(c: &mut Criterion) {
    let mut group = c.benchmark_group("bid_validity_proving");
    group.measurement_time(Duration::from_secs(20));
    group.sample_size(10);

    // Setup (not part of benchmark)
    let prover = MarketplaceProver::new()
        .with_proving_key(Circuit::BidValidity, keys(Circuit::BidValidity).proving_key);

    let cases = [(100u64, 80u64), (5_000, 7_500), (u64::from(u32::MAX), 1)];
    for (max_budget, accepted_price) in cases {
        let input = BidValidityInput::new(max_budget, accepted_price);
        group.bench_with_input(
            BenchmarkId::new("bid", format!("{max_budget}/{accepted_price}")),
            &input,
            |b, input| {
                b.iter(|| prover.prove_bid_validity(black_box(input)).unwrap());
            },
        );
    }

    group.finish();
}

/// Benchmark selective disclosure proving
fn bench_selective_disclosure_proving(c: &mut Criterion) {
    let mut group = c.benchmark_group("selective_disclosure_proving");
    group.measurement_time(Duration::from_secs(30));
    group.sample_size(10);

    let prover = MarketplaceProver::new().with_proving_key(
        Circuit::SelectiveDisclosure,
        keys(Circuit::SelectiveDisclosure).proving_key,
    );

    for disclosed in [true, false] {
        let input = disclosure_input(disclosed);
        group.bench_with_input(
            BenchmarkId::new("disclosed", disclosed),
            &input,
            |b, input| {
                b.iter(|| prover.prove_selective_disclosure(black_box(input)).unwrap());
            },
        );
    }

    group.finish();
}

/// Benchmark verification time
fn bench_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("verification");
    group.measurement_time(Duration::from_secs(20));

    for circuit in Circuit::ALL {
        let keys = keys(circuit);
        let verifier = MarketplaceVerifier::new()
            .with_verifying_key(circuit, &keys.verifying_key)
            .unwrap();
        let prover = MarketplaceProver::new().with_proving_key(circuit, keys.proving_key);

        let proof = match circuit {
            Circuit::BidValidity => prover.prove_bid_validity(&BidValidityInput::new(8_000, 7_999)),
            Circuit::SelectiveDisclosure => {
                prover.prove_selective_disclosure(&disclosure_input(true))
            }
        }
        .unwrap();
        let signals = proof.public_signals();

        group.bench_function(BenchmarkId::new("groth16_verify", circuit), |b| {
            b.iter(|| {
                assert!(verifier.verify(circuit, black_box(&proof.proof), black_box(&signals)));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_bid_validity_proving,
    bench_selective_disclosure_proving,
    bench_verification,
);

criterion_main!(benches);
