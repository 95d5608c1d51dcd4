//! Stage configuration and the configured stage builder.
//!
//! The free functions ([`source`](crate::sources::source),
//! [`transform`](crate::processors::transform), [`merge`](crate::merge::merge),
//! ...) use [`StageConfig::default`]. [`Stage`] exposes the same operations
//! with a chosen channel capacity and stage name.

use std::fmt::Display;

use tokio_util::sync::CancellationToken;

use crate::channel::{Capacity, Inbound, Receiver};
use crate::error::Result;
use crate::{merge, processors, sources};

/// Configuration applied to the outbound channel and task of a stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StageConfig {
    /// Capacity of the outbound channel
    pub capacity: Capacity,
    /// Name used in logs and metrics; defaults to the stage kind
    pub name: Option<String>,
}

impl StageConfig {
    /// Create a rendezvous, unnamed configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outbound channel capacity
    pub fn capacity(mut self, capacity: impl Into<Capacity>) -> Self {
        self.capacity = capacity.into();
        self
    }

    /// Set the stage name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub(crate) fn label(&self, kind: &str) -> String {
        self.name.clone().unwrap_or_else(|| kind.to_string())
    }
}

/// Builds stages that share one [`StageConfig`].
///
/// ```rust
/// use pipeweld::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() {
/// let stage = Stage::new().capacity(8).name("squares");
/// let squares = stage.transform(stage.source(1..=3), |x: i32| x * x);
/// assert_eq!(squares.collect().await, vec![1, 4, 9]);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Stage {
    config: StageConfig,
}

impl Stage {
    /// Create a builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from an existing configuration
    pub fn with_config(config: StageConfig) -> Self {
        Self { config }
    }

    /// Set the outbound channel capacity
    pub fn capacity(mut self, capacity: impl Into<Capacity>) -> Self {
        self.config = self.config.capacity(capacity);
        self
    }

    /// Set the stage name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.name(name);
        self
    }

    /// The configuration applied to stages built here
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// See [`sources::source`]
    pub fn source<I>(&self, values: I) -> Receiver<I::Item>
    where
        I: IntoIterator,
        I::IntoIter: Send + 'static,
        I::Item: Send + 'static,
    {
        sources::source_with(&self.config, values)
    }

    /// See [`sources::generate`]
    pub fn generate<S, T, F>(&self, count: usize, state: S, step: F) -> Receiver<T>
    where
        S: Send + 'static,
        T: Send + 'static,
        F: FnMut(&mut S) -> T + Send + 'static,
    {
        sources::generate_with(&self.config, count, state, step)
    }

    /// See [`sources::generate_until`]
    pub fn generate_until<S, T, F>(
        &self,
        state: S,
        step: F,
        token: CancellationToken,
    ) -> Receiver<T>
    where
        S: Send + 'static,
        T: Send + 'static,
        F: FnMut(&mut S) -> T + Send + 'static,
    {
        sources::generate_until_with(&self.config, state, step, token)
    }

    /// See [`processors::transform`]
    pub fn transform<I, U, F>(&self, input: I, f: F) -> Receiver<U>
    where
        I: Inbound,
        U: Send + 'static,
        F: FnMut(I::Item) -> U + Send + 'static,
    {
        processors::transform_with(&self.config, input, f)
    }

    /// See [`processors::try_transform`]
    pub fn try_transform<I, U, E, F>(&self, input: I, f: F) -> Receiver<Result<U>>
    where
        I: Inbound,
        U: Send + 'static,
        E: Display,
        F: FnMut(I::Item) -> std::result::Result<U, E> + Send + 'static,
    {
        processors::try_transform_with(&self.config, input, f)
    }

    /// See [`processors::fan_out`]
    pub fn fan_out<T, U, F>(&self, input: Receiver<T>, workers: usize, f: F) -> Vec<Receiver<U>>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> U + Clone + Send + 'static,
    {
        processors::fan_out_with(&self.config, input, workers, f)
    }

    /// See [`merge::merge`]
    pub fn merge<I>(&self, inputs: impl IntoIterator<Item = I>) -> Receiver<I::Item>
    where
        I: Inbound,
    {
        merge::merge_with(&self.config, inputs)
    }
}
