//! Source stages.
//!
//! A source owns nothing upstream. It spawns one task that sends its values
//! in order on a fresh channel and closes that channel once it is done.

use tokio_util::sync::CancellationToken;

use crate::channel::{channel, Receiver};
use crate::meter::{spawn_stage, Meter};
use crate::stage::StageConfig;

/// Emit every value of a finite sequence, in order, then close.
///
/// The task stops early if every receiver is dropped.
///
/// ```rust
/// use pipeweld::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() {
/// assert_eq!(source(vec![0, 1, 2, 3]).collect().await, vec![0, 1, 2, 3]);
/// # }
/// ```
pub fn source<I>(values: I) -> Receiver<I::Item>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    source_with(&StageConfig::default(), values)
}

pub(crate) fn source_with<I>(config: &StageConfig, values: I) -> Receiver<I::Item>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    let (tx, rx) = channel(config.capacity);
    let name = config.label("source");
    let mut meter = Meter::new(&name);
    let values = values.into_iter();

    spawn_stage(&name, async move {
        for value in values {
            if tx.send(value).await.is_err() {
                tracing::debug!(stage = %meter.stage(), "no receivers left");
                break;
            }
            meter.item();
        }
        tx.close().await;
        meter.finish();
    });

    rx
}

/// Emit exactly `count` values of a recurrence, then close.
///
/// `step` advances `state` and returns the next value.
///
/// ```rust
/// use pipeweld::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() {
/// let powers = generate(4, 1u32, |n| {
///     let out = *n;
///     *n *= 2;
///     out
/// });
/// assert_eq!(powers.collect().await, vec![1, 2, 4, 8]);
/// # }
/// ```
pub fn generate<S, T, F>(count: usize, state: S, step: F) -> Receiver<T>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnMut(&mut S) -> T + Send + 'static,
{
    generate_with(&StageConfig::default(), count, state, step)
}

pub(crate) fn generate_with<S, T, F>(
    config: &StageConfig,
    count: usize,
    mut state: S,
    mut step: F,
) -> Receiver<T>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnMut(&mut S) -> T + Send + 'static,
{
    let (tx, rx) = channel(config.capacity);
    let name = config.label("generate");
    let mut meter = Meter::new(&name);

    spawn_stage(&name, async move {
        for _ in 0..count {
            let value = step(&mut state);
            if tx.send(value).await.is_err() {
                tracing::debug!(stage = %meter.stage(), "no receivers left");
                break;
            }
            meter.item();
        }
        tx.close().await;
        meter.finish();
    });

    rx
}

/// Emit values of a recurrence until `token` is cancelled, then close.
///
/// Cancellation is observed while waiting to send, so a consumer that stops
/// reading can still end the stage by cancelling.
pub fn generate_until<S, T, F>(state: S, step: F, token: CancellationToken) -> Receiver<T>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnMut(&mut S) -> T + Send + 'static,
{
    generate_until_with(&StageConfig::default(), state, step, token)
}

pub(crate) fn generate_until_with<S, T, F>(
    config: &StageConfig,
    mut state: S,
    mut step: F,
    token: CancellationToken,
) -> Receiver<T>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnMut(&mut S) -> T + Send + 'static,
{
    let (tx, rx) = channel(config.capacity);
    let name = config.label("generate");
    let mut meter = Meter::new(&name);

    spawn_stage(&name, async move {
        loop {
            if token.is_cancelled() {
                break;
            }
            let value = step(&mut state);
            let sent = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                sent = tx.send(value) => sent,
            };
            if sent.is_err() {
                tracing::debug!(stage = %meter.stage(), "no receivers left");
                break;
            }
            meter.item();
        }
        tx.close().await;
        meter.finish();
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Capacity;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_source_preserves_order() {
        let rx = source(vec![5, 3, 9, 1]);
        assert_eq!(rx.collect().await, vec![5, 3, 9, 1]);
    }

    #[tokio::test]
    async fn test_empty_source_closes() {
        let rx = source(Vec::<u8>::new());
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_source_from_iterator() {
        let rx = source((0..10).filter(|n| n % 3 == 0));
        assert_eq!(rx.collect().await, vec![0, 3, 6, 9]);
    }

    #[tokio::test]
    async fn test_generate_is_bounded() {
        let rx = generate(3, 0u32, |n| {
            *n += 1;
            *n
        });
        assert_eq!(rx.collect().await, vec![1, 2, 3]);

        let rx = generate(0, (), |_| 1);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_source_stops_when_receivers_drop() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let rx = generate(1_000_000, (), move |_| counter.fetch_add(1, Ordering::SeqCst));

        assert_eq!(rx.recv().await, Some(0));
        drop(rx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(pulled.load(Ordering::SeqCst) < 10);
    }

    #[tokio::test]
    async fn test_generate_until_cancelled() {
        let token = CancellationToken::new();
        let rx = generate_until(
            0u64,
            |n| {
                *n += 1;
                *n
            },
            token.clone(),
        );

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        token.cancel();

        // At most one value was already in flight when the token fired.
        let rest = timeout(Duration::from_secs(1), rx.collect())
            .await
            .expect("generator should close after cancellation");
        assert!(rest.len() <= 1);
    }

    #[tokio::test]
    async fn test_generate_until_with_buffer() {
        let token = CancellationToken::new();
        let config = StageConfig::new().capacity(Capacity::bounded(4));
        let rx = generate_until_with(&config, (), |_| 'x', token.clone());

        // Buffer fills and the sender waits; cancelling still ends it.
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        let rest = timeout(Duration::from_secs(1), rx.collect())
            .await
            .expect("generator should close after cancellation");
        assert!(rest.len() <= 5);
    }
}
