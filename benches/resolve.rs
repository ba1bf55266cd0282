use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::{json, Value as JsonValue};

use ship_parties::normalize::{normalize_external, normalize_name};
use ship_parties::pool::PoolSet;
use ship_parties::resolver::resolve_pool;
use ship_parties::{Mode, PartiesEngine, PartiesRequest, ShipIdentity};

const ROLES: [&str; 5] = [
    "registeredOwner",
    "beneficialOwner",
    "operator",
    "manager",
    "bareboatCharterer",
];

/// External claims spread across roles, with repeats so groups merge.
fn external_claims(n: usize) -> JsonValue {
    let claims: Vec<JsonValue> = (0..n)
        .map(|i| {
            json!({
                "role": ROLES[i % ROLES.len()],
                "value": format!("Party {} Shipping Ltd.", i % 7),
                "confidence": ["low", "medium", "high"][i % 3],
                "path": format!("registry/{i}"),
            })
        })
        .collect();
    JsonValue::Array(claims)
}

fn bench_normalize_name(c: &mut Criterion) {
    c.bench_function("resolve/normalize_name", |b| {
        b.iter(|| normalize_name(black_box("  ...Alpha   Shipping  Co., Ltd.!! ")));
    });
}

fn bench_pool_and_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve/pool_and_resolve");
    for n in [16usize, 256] {
        let claims = normalize_external(&external_claims(n)).claims;
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("{n}_claims"), |b| {
            b.iter(|| {
                let pools = PoolSet::from_claims(claims.iter().cloned());
                for (_, pool) in pools.iter() {
                    black_box(resolve_pool(pool));
                }
            });
        });
    }
    group.finish();
}

fn bench_engine_strict(c: &mut Criterion) {
    let engine = PartiesEngine::new();
    let request = PartiesRequest::new(ShipIdentity::by_imo("9074729").unwrap())
        .with_mode(Mode::Strict)
        .with_ais_static(json!({ "registeredOwner": "Alpha Shipping", "operator": "Delta Lines" }))
        .with_external(external_claims(64));

    c.bench_function("resolve/engine_strict_64", |b| {
        b.iter(|| engine.resolve(black_box(&request)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_normalize_name,
    bench_pool_and_resolve,
    bench_engine_strict
);
criterion_main!(benches);
