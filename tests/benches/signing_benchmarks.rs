//! # Consent-Exchange Signing Benchmarks
//!
//! | Path | Operation | Target |
//! |------|-----------|--------|
//! | cx-02 canonicalize | write request, 10 identifiers | < 50µs |
//! | cx-02 sign | read request | < 1ms |
//! | cx-02 verify | read request, key cached | < 1ms |
//! | cx-02 verify | write body, N identifiers | linear in N |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cx_01_key_store::{KeyStore, KeyStoreConfig, KeyWindow, LocalIdentity, StaticIdentityFetcher};
use cx_02_signing::{AsPayload, SigningContext, SigningDefinition, Signer, Verifier, VerifierConfig};
use shared_crypto::{EcdsaP256, P256KeyPair};
use shared_types::{
    Identifier, IdsAndPreferences, ManualClock, MessageType, PartyType, UnsignedPreferences,
    BROWSER_ID_TYPE,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

const VENDOR: &str = "vendor.example";
const OPERATOR: &str = "operator.example";
const ORIGIN: &str = "https://good.example";

struct Parties {
    vendor: Signer,
    operator: Signer,
    operator_verifier: Verifier,
}

fn parties() -> Parties {
    let clock = Arc::new(ManualClock::new(1_000));
    let fetcher = Arc::new(StaticIdentityFetcher::new());

    let store = |host: &str, party: PartyType| {
        let keys = vec![KeyWindow::new(0, 1_000_000, P256KeyPair::generate())];
        let identity = LocalIdentity::new(host, host, party, keys).unwrap();
        Arc::new(KeyStore::new(
            EcdsaP256,
            identity,
            fetcher.clone(),
            clock.clone(),
            KeyStoreConfig::default(),
        ))
    };
    let vendor = store(VENDOR, PartyType::Vendor);
    let operator = store(OPERATOR, PartyType::Operator);
    fetcher.insert(vendor.self_document().unwrap());
    fetcher.insert(operator.self_document().unwrap());

    Parties {
        vendor: Signer::new(vendor),
        operator_verifier: Verifier::new(operator.clone(), VerifierConfig::default()),
        operator: Signer::new(operator),
    }
}

fn write_body(parties: &Parties, ids: usize) -> IdsAndPreferences {
    let identifiers: Vec<Identifier> = (0..ids)
        .map(|i| {
            parties
                .operator
                .sign_identifier(BROWSER_ID_TYPE, &format!("id-{i}"), Some(true))
                .unwrap()
        })
        .collect();
    let unsigned: UnsignedPreferences =
        serde_json::from_value(serde_json::json!({ "data": { "optIn": true } })).unwrap();
    let preferences = parties.vendor.sign_preferences(unsigned, &identifiers).unwrap();
    IdsAndPreferences {
        identifiers,
        preferences: Some(preferences),
    }
}

// ============================================================================
// CANONICALIZATION
// ============================================================================

fn bench_canonicalize(c: &mut Criterion) {
    let parties = parties();
    let body = write_body(&parties, 10);
    let definition = SigningDefinition::for_message(MessageType::WriteRequest, body.view()).unwrap();
    let ctx = SigningContext::transport(VENDOR, OPERATOR, 1_000, Some(ORIGIN));

    c.bench_function("cx-02-canonicalize-write-10-ids", |b| {
        b.iter(|| black_box(definition.canonicalize(&ctx).unwrap()))
    });
}

// ============================================================================
// SIGN / VERIFY
// ============================================================================

fn bench_sign_and_verify(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let parties = parties();

    let mut group = c.benchmark_group("cx-02-transport");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("sign_read_request", |b| {
        b.iter(|| {
            black_box(
                parties
                    .vendor
                    .sign_message(MessageType::ReadRequest, OPERATOR, Some(ORIGIN), ())
                    .unwrap(),
            )
        })
    });

    let request = parties
        .vendor
        .sign_message(MessageType::ReadRequest, OPERATOR, Some(ORIGIN), ())
        .unwrap();
    // Warm the operator's cache so the loop measures the curve, not the fetch.
    runtime
        .block_on(parties.operator_verifier.verify_message(&request, Some(ORIGIN)))
        .unwrap();

    group.bench_function("verify_read_request", |b| {
        b.iter(|| {
            runtime
                .block_on(parties.operator_verifier.verify_message(&request, Some(ORIGIN)))
                .unwrap()
        })
    });

    group.finish();
}

fn bench_verify_body(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let parties = parties();

    let mut group = c.benchmark_group("cx-02-ids-and-preferences");
    for ids in [1usize, 5, 20] {
        let body = write_body(&parties, ids);
        runtime
            .block_on(parties.operator_verifier.verify_ids_and_preferences(&body))
            .unwrap();

        group.throughput(Throughput::Elements(ids as u64 + 1));
        group.bench_with_input(BenchmarkId::new("verify", ids), &body, |b, body| {
            b.iter(|| {
                runtime
                    .block_on(parties.operator_verifier.verify_ids_and_preferences(body))
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_canonicalize, bench_sign_and_verify, bench_verify_body);
criterion_main!(benches);
