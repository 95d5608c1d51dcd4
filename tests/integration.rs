//! Integration tests for generator, pipeline and fan-out/fan-in stages

use std::time::Duration;

use pipeweld::prelude::*;
use tokio::time::timeout;
use tokio_stream::StreamExt;

fn square(n: i64) -> i64 {
    n * n
}

/// First `count` terms of the additive recurrence seeded at 0, 1
fn fibonacci(count: usize) -> Receiver<u64> {
    generate(count, (0u64, 1u64), |(a, b)| {
        let out = *a;
        let next = *a + *b;
        *a = *b;
        *b = next;
        out
    })
}

#[tokio::test]
async fn test_generator_yields_in_order() {
    let ch = source(vec![0, 1, 2, 3]);
    assert_eq!(ch.collect().await, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_generator_consumed_as_stream() {
    let mut stream = Box::pin(source(vec!["a", "b", "c"]).into_stream());
    let mut seen = Vec::new();
    while let Some(item) = stream.next().await {
        seen.push(item);
    }
    assert_eq!(seen, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_bounded_recurrence() {
    assert_eq!(fibonacci(5).collect().await, vec![0, 1, 1, 2, 3]);
}

#[tokio::test]
async fn test_recurrence_bounded_by_value() {
    // Terms below 100, as a plain iterator bound on the source.
    let mut state = (0u64, 1u64);
    let terms = std::iter::from_fn(move || {
        let out = state.0;
        state = (state.1, state.0 + state.1);
        Some(out)
    })
    .take_while(|n| *n < 100);

    let drained = source(terms).collect().await;
    assert_eq!(drained, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89]);
}

#[tokio::test]
async fn test_pipeline_squares() {
    let out = transform(source(vec![2, 3]), square);
    assert_eq!(out.collect().await, vec![4, 9]);
}

#[tokio::test]
async fn test_pipeline_map_law() {
    let input: Vec<i64> = (-20..20).collect();
    let expected: Vec<i64> = input.iter().map(|n| square(*n) + 1).collect();

    let out = transform(transform(source(input), square), |n| n + 1);
    assert_eq!(out.collect().await, expected);
}

#[tokio::test]
async fn test_fan_out_fan_in_shared_source() {
    // Two workers compete for the same source.
    let input = source(vec![2, 3]);
    let c1 = transform(input.clone(), square);
    let c2 = transform(input, square);

    let mut merged = merge([c1, c2]).collect().await;
    merged.sort();
    assert_eq!(merged, vec![4, 9]);
}

#[tokio::test]
async fn test_merge_of_independent_pipelines() {
    let c1 = transform(source(vec![2, 3]), square);
    let c2 = transform(source(vec![2, 3]), square);

    let mut merged = merge([c1, c2]).collect().await;
    merged.sort();
    assert_eq!(merged, vec![4, 4, 9, 9]);
}

#[tokio::test]
async fn test_fan_out_no_loss_no_duplication() {
    let s1: Vec<i64> = (0..200).collect();
    let s2: Vec<i64> = (500..700).collect();

    for workers in [1, 2, 3, 8] {
        let first = fan_out(source(s1.clone()), workers, square);
        let second = fan_out(source(s2.clone()), workers, square);

        let mut merged = merge(first.into_iter().chain(second)).collect().await;
        merged.sort();

        let mut expected: Vec<i64> = s1.iter().chain(&s2).map(|n| square(*n)).collect();
        expected.sort();
        assert_eq!(merged, expected, "workers = {}", workers);
    }
}

#[tokio::test]
async fn test_merge_never_closes_while_input_open() {
    let (tx, rx) = channel::<i64>(Capacity::Rendezvous);
    let merged = merge([rx, source(vec![1])]);

    assert_eq!(merged.recv().await, Some(1));
    assert!(timeout(Duration::from_millis(100), merged.recv())
        .await
        .is_err());

    drop(tx);
    let rest = timeout(Duration::from_secs(1), merged.collect())
        .await
        .expect("output should close once every input closes");
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_configured_bounded_pipeline() {
    let stage = Stage::new().capacity(16).name("bounded");
    let workers = stage.fan_out(stage.source(0..1000), 4, |n: u64| n % 7);
    let merged = stage.merge(workers).collect().await;

    assert_eq!(merged.len(), 1000);
    assert_eq!(merged.iter().sum::<u64>(), (0..1000).map(|n| n % 7).sum());
}

#[tokio::test]
async fn test_faults_travel_with_values() {
    let parsed = try_transform(source(vec!["4", "four", "16"]), |s: &str| {
        s.parse::<u32>()
    });
    let results = merge([parsed]).collect().await;

    let values: Vec<u32> = results.iter().filter_map(|r| r.clone().ok()).collect();
    assert_eq!(values, vec![4, 16]);
    assert_eq!(
        results.iter().filter(|r| r.is_err()).count(),
        1,
        "the bad input is reported, not dropped"
    );
}

#[tokio::test]
async fn test_cancelled_generator_through_pipeline() {
    let token = tokio_util::sync::CancellationToken::new();
    let naturals = generate_until(
        0u64,
        |n| {
            let out = *n;
            *n += 1;
            out
        },
        token.clone(),
    );
    let doubled = transform(naturals, |n| n * 2);

    let mut first = Vec::new();
    for _ in 0..5 {
        first.push(doubled.recv().await.unwrap());
    }
    assert_eq!(first, vec![0, 2, 4, 6, 8]);

    token.cancel();
    timeout(Duration::from_secs(1), doubled.collect())
        .await
        .expect("pipeline should drain after cancellation");
}

#[tokio::test]
async fn test_tokio_receivers_feed_merge() {
    let (tx_a, rx_a) = tokio::sync::mpsc::channel(4);
    let (tx_b, rx_b) = tokio::sync::mpsc::channel(4);

    tokio::spawn(async move {
        for n in 0..3 {
            tx_a.send(n).await.unwrap();
        }
    });
    tokio::spawn(async move {
        for n in 10..13 {
            tx_b.send(n).await.unwrap();
        }
    });

    let mut merged = merge([rx_a, rx_b]).collect().await;
    merged.sort();
    assert_eq!(merged, vec![0, 1, 2, 10, 11, 12]);
}
