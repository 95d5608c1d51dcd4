//! Transform stages.
//!
//! A transform reads one input until it reports closure, applies a function
//! to every value, and sends the results on its own outbound channel, which
//! it closes once the input is drained.
//!
//! Several transforms attached to clones of the same [`Receiver`] compete
//! for its values, which is how work is fanned out; see [`fan_out`].

use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use crate::channel::{channel, Inbound, Receiver};
use crate::error::{Error, Result};
use crate::meter::{spawn_stage, Meter};
use crate::stage::StageConfig;

/// Apply `f` to every value of `input`.
///
/// Order is preserved. A panic inside `f` ends the stage task and closes
/// the output early; use [`try_transform`] to keep going instead.
///
/// ```rust
/// use pipeweld::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() {
/// let squares = transform(source(vec![2, 3]), |n: i32| n * n);
/// assert_eq!(squares.collect().await, vec![4, 9]);
/// # }
/// ```
pub fn transform<I, U, F>(input: I, f: F) -> Receiver<U>
where
    I: Inbound,
    U: Send + 'static,
    F: FnMut(I::Item) -> U + Send + 'static,
{
    transform_with(&StageConfig::default(), input, f)
}

pub(crate) fn transform_with<I, U, F>(config: &StageConfig, mut input: I, mut f: F) -> Receiver<U>
where
    I: Inbound,
    U: Send + 'static,
    F: FnMut(I::Item) -> U + Send + 'static,
{
    let (tx, rx) = channel(config.capacity);
    let name = config.label("transform");
    let mut meter = Meter::new(&name);

    spawn_stage(&name, async move {
        while let Some(item) = input.recv().await {
            if tx.send(f(item)).await.is_err() {
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

/// Apply a fallible `f` to every value of `input`, tagging each result.
///
/// Errors returned by `f` and panics raised inside it are caught at the
/// stage boundary and sent downstream as [`Error::Stage`] in place of the
/// value. The stage keeps processing after a fault.
///
/// ```rust
/// use pipeweld::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() {
/// let parsed = try_transform(source(vec!["1", "x"]), |s: &str| s.parse::<i32>());
/// let results = parsed.collect().await;
/// assert_eq!(results[0], Ok(1));
/// assert!(results[1].is_err());
/// # }
/// ```
pub fn try_transform<I, U, E, F>(input: I, f: F) -> Receiver<Result<U>>
where
    I: Inbound,
    U: Send + 'static,
    E: Display,
    F: FnMut(I::Item) -> std::result::Result<U, E> + Send + 'static,
{
    try_transform_with(&StageConfig::default(), input, f)
}

pub(crate) fn try_transform_with<I, U, E, F>(
    config: &StageConfig,
    mut input: I,
    mut f: F,
) -> Receiver<Result<U>>
where
    I: Inbound,
    U: Send + 'static,
    E: Display,
    F: FnMut(I::Item) -> std::result::Result<U, E> + Send + 'static,
{
    let (tx, rx) = channel(config.capacity);
    let name = config.label("transform");
    let mut meter = Meter::new(&name);

    spawn_stage(&name, async move {
        while let Some(item) = input.recv().await {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| f(item))) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(Error::stage(meter.stage(), e)),
                Err(payload) => Err(Error::panicked(meter.stage(), payload)),
            };
            if let Err(e) = &outcome {
                meter.fault(e);
            }
            if tx.send(outcome).await.is_err() {
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

/// Attach `workers` instances of `f` to the same input.
///
/// Each value is taken by whichever worker is ready first; there is no
/// fixed assignment. Combine the returned receivers with
/// [`merge`](crate::merge::merge). With zero workers the input is dropped.
pub fn fan_out<T, U, F>(input: Receiver<T>, workers: usize, f: F) -> Vec<Receiver<U>>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Clone + Send + 'static,
{
    fan_out_with(&StageConfig::default(), input, workers, f)
}

pub(crate) fn fan_out_with<T, U, F>(
    config: &StageConfig,
    input: Receiver<T>,
    workers: usize,
    f: F,
) -> Vec<Receiver<U>>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Clone + Send + 'static,
{
    (0..workers)
        .map(|_| transform_with(config, input.clone(), f.clone()))
        .collect()
}
