//! Typed, closable channels connecting stages.
//!
//! A channel is created with a [`Capacity`]. The default is a rendezvous
//! channel: `send` suspends until a receiver has taken the value. Bounded
//! channels suspend only while the buffer is full, unbounded ones never do.
//!
//! Both halves are cloneable. Sender clones share a single close switch, so
//! [`Sender::close`] closes the channel for every producer at once. Receiver
//! clones share a single queue, so each value is taken by exactly one of
//! them; attaching several consumers to one receiver is how work is fanned
//! out.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio_stream::StreamExt;

use crate::error::{Error, Result};

/// Buffering policy of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Capacity {
    /// No buffer; every send waits for a receiver to take the value
    #[default]
    Rendezvous,
    /// Up to `n` values may be buffered before senders wait
    Bounded(NonZeroUsize),
    /// Senders never wait
    Unbounded,
}

impl Capacity {
    /// A bounded capacity, or rendezvous when `n` is zero
    pub fn bounded(n: usize) -> Self {
        match NonZeroUsize::new(n) {
            Some(n) => Capacity::Bounded(n),
            None => Capacity::Rendezvous,
        }
    }
}

impl From<usize> for Capacity {
    fn from(n: usize) -> Self {
        Capacity::bounded(n)
    }
}

struct Envelope<T> {
    item: T,
    ack: Option<oneshot::Sender<()>>,
}

enum Tx<T> {
    Bounded(mpsc::Sender<Envelope<T>>),
    Unbounded(mpsc::UnboundedSender<Envelope<T>>),
}

impl<T> Clone for Tx<T> {
    fn clone(&self) -> Self {
        match self {
            Tx::Bounded(tx) => Tx::Bounded(tx.clone()),
            Tx::Unbounded(tx) => Tx::Unbounded(tx.clone()),
        }
    }
}

impl<T> Tx<T> {
    async fn send(&self, envelope: Envelope<T>) -> Result<()> {
        match self {
            Tx::Bounded(tx) => tx.send(envelope).await?,
            Tx::Unbounded(tx) => tx.send(envelope).map_err(|_| Error::ChannelClosed)?,
        }
        Ok(())
    }
}

enum Rx<T> {
    Bounded(mpsc::Receiver<Envelope<T>>),
    Unbounded(mpsc::UnboundedReceiver<Envelope<T>>),
}

impl<T> Rx<T> {
    async fn recv(&mut self) -> Option<Envelope<T>> {
        match self {
            Rx::Bounded(rx) => rx.recv().await,
            Rx::Unbounded(rx) => rx.recv().await,
        }
    }
}

struct SenderShared<T> {
    // `None` once closed. The channel closes for receivers when the last
    // in-flight clone of the inner sender is dropped.
    tx: RwLock<Option<Tx<T>>>,
    rendezvous: bool,
}

/// Producer half of a channel.
pub struct Sender<T> {
    shared: Arc<SenderShared<T>>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("rendezvous", &self.shared.rendezvous)
            .finish()
    }
}

impl<T: Send> Sender<T> {
    /// Send a value, suspending as the channel's capacity requires.
    ///
    /// Fails with [`Error::ChannelClosed`] if the channel was closed or
    /// every receiver has been dropped.
    pub async fn send(&self, item: T) -> Result<()> {
        let tx = match self.shared.tx.read().await.as_ref() {
            Some(tx) => tx.clone(),
            None => return Err(Error::ChannelClosed),
        };

        if !self.shared.rendezvous {
            return tx.send(Envelope { item, ack: None }).await;
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        tx.send(Envelope {
            item,
            ack: Some(ack_tx),
        })
        .await?;
        drop(tx);
        ack_rx.await?;
        Ok(())
    }

    /// Close the channel for all sender clones.
    ///
    /// Returns `true` for the call that closed it and `false` afterwards.
    /// Values already sent are still delivered.
    pub async fn close(&self) -> bool {
        self.shared.tx.write().await.take().is_some()
    }

    /// Whether [`close`](Self::close) has been called
    pub async fn is_closed(&self) -> bool {
        self.shared.tx.read().await.is_none()
    }
}

/// Consumer half of a channel.
pub struct Receiver<T> {
    inner: Arc<Mutex<Rx<T>>>,
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Receiver<T> {
    /// Take the next value, or `None` once the channel is closed and drained.
    pub async fn recv(&self) -> Option<T> {
        let envelope = self.inner.lock().await.recv().await?;
        if let Some(ack) = envelope.ack {
            let _ = ack.send(());
        }
        Some(envelope.item)
    }

    /// Turn this receiver into a stream that ends when the channel closes.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send + 'static {
        futures::stream::unfold(self, |rx| async move {
            let item = rx.recv().await?;
            Some((item, rx))
        })
    }

    /// Drain the channel until it closes.
    pub async fn collect(self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.recv().await {
            items.push(item);
        }
        items
    }
}

/// Create a channel with the given capacity.
pub fn channel<T>(capacity: Capacity) -> (Sender<T>, Receiver<T>) {
    let (tx, rx, rendezvous) = match capacity {
        Capacity::Rendezvous => {
            let (tx, rx) = mpsc::channel(1);
            (Tx::Bounded(tx), Rx::Bounded(rx), true)
        }
        Capacity::Bounded(n) => {
            let (tx, rx) = mpsc::channel(n.get());
            (Tx::Bounded(tx), Rx::Bounded(rx), false)
        }
        Capacity::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Tx::Unbounded(tx), Rx::Unbounded(rx), false)
        }
    };

    let sender = Sender {
        shared: Arc::new(SenderShared {
            tx: RwLock::new(Some(tx)),
            rendezvous,
        }),
    };
    let receiver = Receiver {
        inner: Arc::new(Mutex::new(rx)),
    };
    (sender, receiver)
}

/// Anything a stage can read values from until it reports closure.
///
/// Stage operations accept any `Inbound`, so queues other than
/// [`Receiver`] can feed a pipeline.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use pipeweld::channel::Inbound;
///
/// struct Countdown(u32);
///
/// #[async_trait]
/// impl Inbound for Countdown {
///     type Item = u32;
///
///     async fn recv(&mut self) -> Option<u32> {
///         if self.0 == 0 {
///             return None;
///         }
///         self.0 -= 1;
///         Some(self.0)
///     }
/// }
/// ```
#[async_trait]
pub trait Inbound: Send + 'static {
    /// The type of values read from this input
    type Item: Send + 'static;

    /// Take the next value, or `None` once the input is exhausted.
    async fn recv(&mut self) -> Option<Self::Item>;
}

#[async_trait]
impl<T: Send + 'static> Inbound for Receiver<T> {
    type Item = T;

    async fn recv(&mut self) -> Option<T> {
        Receiver::recv(self).await
    }
}

#[async_trait]
impl<T: Send + 'static> Inbound for mpsc::Receiver<T> {
    type Item = T;

    async fn recv(&mut self) -> Option<T> {
        mpsc::Receiver::recv(self).await
    }
}

#[async_trait]
impl<T: Send + 'static> Inbound for mpsc::UnboundedReceiver<T> {
    type Item = T;

    async fn recv(&mut self) -> Option<T> {
        mpsc::UnboundedReceiver::recv(self).await
    }
}

#[async_trait]
impl<I: Inbound + ?Sized> Inbound for Box<I> {
    type Item = I::Item;

    async fn recv(&mut self) -> Option<I::Item> {
        (**self).recv().await
    }
}

/// Adapts any stream into an [`Inbound`].
pub struct FromStream<S>(pub S);

#[async_trait]
impl<S> Inbound for FromStream<S>
where
    S: Stream + Send + Unpin + 'static,
    S::Item: Send + 'static,
{
    type Item = S::Item;

    async fn recv(&mut self) -> Option<S::Item> {
        self.0.next().await
    }
}
