//! Fan-in: combine many inputs into one channel.
//!
//! Every input gets a forwarding task that copies its values to the shared
//! output. A coordinator task waits on a [`WaitGroup`] until every forwarder
//! has finished and only then closes the output, so no forwarder can ever
//! send on a closed channel.
//!
//! Values from one input keep their relative order. Values from different
//! inputs interleave in whatever order the scheduler produces.
//!
//! The output closes if and only if every input eventually closes. An input
//! that never closes keeps its forwarder alive and the output open forever.

use crate::channel::{channel, Inbound, Receiver, Sender};
use crate::meter::{spawn_stage, Meter};
use crate::stage::StageConfig;
use crate::wait_group::{Done, WaitGroup};

/// Merge `inputs` into a single channel that closes after all of them close.
///
/// ```rust
/// use pipeweld::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() {
/// let merged = merge(vec![source(vec![1, 2]), source(vec![3])]);
/// let mut items = merged.collect().await;
/// items.sort();
/// assert_eq!(items, vec![1, 2, 3]);
/// # }
/// ```
pub fn merge<I>(inputs: impl IntoIterator<Item = I>) -> Receiver<I::Item>
where
    I: Inbound,
{
    merge_with(&StageConfig::default(), inputs)
}

pub(crate) fn merge_with<I>(
    config: &StageConfig,
    inputs: impl IntoIterator<Item = I>,
) -> Receiver<I::Item>
where
    I: Inbound,
{
    let (tx, rx) = channel(config.capacity);
    let name = config.label("merge");
    let inputs: Vec<I> = inputs.into_iter().collect();
    let group = WaitGroup::new(inputs.len());

    for (index, input) in inputs.into_iter().enumerate() {
        let forwarder = forward(index, input, tx.clone(), group.handle(), Meter::new(&name));
        spawn_stage(&name, forwarder);
    }

    spawn_stage(&name, async move {
        group.wait().await;
        tx.close().await;
        tracing::debug!("all inputs drained, merged output closed");
    });

    rx
}

async fn forward<I: Inbound>(
    index: usize,
    mut input: I,
    out: Sender<I::Item>,
    done: Done,
    mut meter: Meter,
) {
    // Signals even if `input.recv` panics, so the coordinator still closes.
    let signal = done.into_guard();
    while let Some(item) = input.recv().await {
        if out.send(item).await.is_err() {
            tracing::debug!(stage = %meter.stage(), input = index, "merged output dropped");
            break;
        }
        meter.item();
    }
    tracing::trace!(stage = %meter.stage(), input = index, "input drained");
    drop(out);
    drop(signal);
    meter.finish();
}
