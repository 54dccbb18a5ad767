//! Host event normalization benchmarks.
//!
//! Run with: cargo bench --bench normalize
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use extension_relay::{
    OutboundEvent, PlatformEvent, RawActiveInfo, RawSender, TabActivationRecord, normalize_sender,
};
use serde_json::json;

// ============================================================================
// Fixtures
// ============================================================================

fn full_sender() -> RawSender {
    RawSender::from_value(&json!({
        "documentId": "doc-1",
        "documentLifecycle": "active",
        "frameId": 0,
        "id": "relay@example.org",
        "origin": "https://example.org",
        "tab": {"id": 7, "windowId": 2},
        "url": "https://example.org/index.html"
    }))
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_normalize_sender(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_sender");

    let full = full_sender();
    group.bench_function("full", |b| b.iter(|| normalize_sender(black_box(&full))));

    let empty = RawSender::default();
    group.bench_function("empty", |b| b.iter(|| normalize_sender(black_box(&empty))));

    group.finish();
}

fn bench_event_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_pipeline");

    let text = r#"{"event":"tabActivated","tabId":7,"windowId":2}"#;
    group.bench_function("parse_tab_activated", |b| {
        b.iter(|| PlatformEvent::parse(black_box(text)))
    });

    let record = TabActivationRecord::from(RawActiveInfo {
        tab_id: 7,
        window_id: 2,
    });
    group.bench_function("serialize_tab_activated", |b| {
        b.iter(|| serde_json::to_string(&OutboundEvent::from(black_box(record))))
    });

    group.finish();
}

criterion_group!(benches, bench_normalize_sender, bench_event_pipeline);
criterion_main!(benches);
