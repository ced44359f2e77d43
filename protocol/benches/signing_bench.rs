// Signing & verification benchmarks for the Namechain protocol.
//
// Covers Ed25519 key derivation, single-message signing and verification,
// transaction signing, and batch verification at various sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use namechain_protocol::account::Address;
use namechain_protocol::crypto::{batch_verify, sign, verify, Keypair};
use namechain_protocol::transaction::{Amount, TransactionBuilder};

fn bench_keypair_from_passphrase(c: &mut Criterion) {
    c.bench_function("ed25519/keypair_from_passphrase", |b| {
        b.iter(|| Keypair::from_passphrase("correct horse battery staple"));
    });
}

fn bench_sign_message(c: &mut Criterion) {
    let keypair = Keypair::generate();
    let message = b"register name 'test' with value 'this is the value'";

    c.bench_function("ed25519/sign_message", |b| {
        b.iter(|| sign(&keypair, message));
    });
}

fn bench_verify_signature(c: &mut Criterion) {
    let keypair = Keypair::generate();
    let message = b"register name 'test' with value 'this is the value'";
    let signature = sign(&keypair, message);
    let public_key = keypair.public_key();

    c.bench_function("ed25519/verify_signature", |b| {
        b.iter(|| verify(&public_key, message, &signature));
    });
}

fn bench_sign_transaction(c: &mut Criterion) {
    let keypair = Keypair::generate();
    let recipient = Address::from_public_key(&Keypair::generate().public_key());

    c.bench_function("ed25519/sign_payment", |b| {
        b.iter(|| {
            TransactionBuilder::new(&keypair)
                .timestamp(1_700_000_000_000)
                .payment(recipient, Amount::from_coins(100))
        });
    });
}

fn bench_batch_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("ed25519/batch_verify");

    for size in [10, 50, 100, 500] {
        let recipient = Address::from_public_key(&Keypair::generate().public_key());
        let items: Vec<_> = (0..size)
            .filter_map(|i| {
                TransactionBuilder::new(&Keypair::generate())
                    .timestamp(i as i64)
                    .payment(recipient, Amount::from_coins(1))
                    .verify_item()
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| batch_verify(items));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_keypair_from_passphrase,
    bench_sign_message,
    bench_verify_signature,
    bench_sign_transaction,
    bench_batch_verify,
);
criterion_main!(benches);
