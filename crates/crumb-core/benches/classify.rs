use criterion::{black_box, criterion_group, criterion_main, Criterion};

use crumb_core::{dedupe, Classifier, Cookie, CookieDatabase, DatabaseEntry};

const NOW: f64 = 1_700_000_000.0;

fn sample_cookies() -> Vec<Cookie> {
    let names = ["_ga", "_gid", "PHPSESSID", "_fbp", "lang", "x9", "qwertyuiop", "_utmz", "cookie_consent"];
    let domains = [".shop.com", ".doubleclick.net", "www.shop.com", ".google-analytics.com"];

    (0..1_000)
        .map(|i| {
            Cookie::new(names[i % names.len()], domains[i % domains.len()])
                .with_value(format!("value-{}", i))
                .with_expires(NOW + (i as f64) * 3_600.0)
        })
        .collect()
}

fn sample_database() -> CookieDatabase {
    let mut entries: Vec<DatabaseEntry> = (0..2_000)
        .map(|i| DatabaseEntry::new(format!("vendor_cookie_{}", i), "Marketing"))
        .collect();
    entries.push(DatabaseEntry::new("_ga", "Analytics"));
    entries.push(DatabaseEntry::new("_utm*", "Analytics").wildcard());
    CookieDatabase::new(entries)
}

fn bench_classify(c: &mut Criterion) {
    let cookies = sample_cookies();
    let db = sample_database();
    let classifier = Classifier::new(&db).with_reference_time(NOW);

    c.bench_function("classify_1000", |b| b.iter(|| classifier.classify(black_box(&cookies))));

    let empty = CookieDatabase::empty();
    let rules_only = Classifier::new(&empty).with_reference_time(NOW);
    c.bench_function("classify_rules_only_1000", |b| {
        b.iter(|| rules_only.classify(black_box(&cookies)))
    });

    c.bench_function("dedupe_1000", |b| b.iter(|| dedupe(black_box(&cookies))));
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
