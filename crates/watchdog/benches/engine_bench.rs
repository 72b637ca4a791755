use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;
use tokio::time::Instant;
use watchdog::report::maybe_report;
use watchdog::{
    CycleSnapshot, HysteresisEvaluator, ProbeAux, ProbeOutcome, SignalKind, SignalStatus,
    StatusReport, Verdict,
};

fn hysteresis_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("hysteresis");

    let outcomes: Vec<ProbeOutcome> = (0..64)
        .map(|i| match i % 5 {
            0 => ProbeOutcome::Pass,
            1 => ProbeOutcome::error("timeout"),
            _ => ProbeOutcome::fail("low cpu"),
        })
        .collect();

    for threshold in [1u32, 3, 10] {
        group.bench_with_input(BenchmarkId::new("evaluate", threshold), &threshold, |b, &t| {
            b.iter(|| {
                let mut eval = HysteresisEvaluator::new(t);
                for outcome in &outcomes {
                    black_box(eval.evaluate(outcome));
                }
            })
        });
    }

    group.finish();
}

fn snapshot_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    let signals: Vec<SignalStatus> = (0..4)
        .map(|i| SignalStatus {
            id: format!("signal_{}", i),
            label: format!("Signal {}", i),
            kind: if i == 1 {
                SignalKind::ProcessActivity
            } else {
                SignalKind::Presence
            },
            verdict: if i % 2 == 0 { Verdict::Fail } else { Verdict::Pass },
            streak: 0,
            aux: ProbeAux {
                process_id: Some(4242),
                item_count: Some(8),
            },
        })
        .collect();

    group.bench_function("assemble_and_count", |b| {
        b.iter(|| {
            let snapshot = CycleSnapshot::new(1, signals.clone());
            black_box(snapshot.failing_count())
        })
    });

    let snapshot = CycleSnapshot::new(1, signals.clone());
    group.bench_function("build_report", |b| {
        b.iter(|| black_box(StatusReport::from_snapshot(&snapshot, "2024-01-01 00:00:00")))
    });

    let start = Instant::now();
    group.bench_function("report_due", |b| {
        b.iter(|| {
            black_box(maybe_report(
                start + Duration::from_secs(301),
                start,
                Duration::from_secs(300),
            ))
        })
    });

    group.finish();
}

criterion_group!(benches, hysteresis_benchmark, snapshot_benchmark);
criterion_main!(benches);
