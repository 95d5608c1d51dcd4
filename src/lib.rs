//! # Channel-based generator, pipeline and fan-out/fan-in stages for tokio
//!
//! Each stage is a tokio task that owns exactly one outbound channel and
//! closes it once its work is done. Stages are wired together by handing
//! one stage's [`Receiver`](channel::Receiver) to the next.
//!
//! ## Core Concepts
//!
//! - **Source**: emits a finite sequence (or a bounded recurrence) in order
//! - **Transform**: applies a function to every value of one input
//! - **Fan-out**: several transforms reading clones of the same receiver
//! - **Merge**: fan-in of many inputs, closed only after all of them close
//!
//! ## Example
//!
//! ```rust
//! use pipeweld::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let input = source(vec![2, 3]);
//!     let workers = fan_out(input, 2, |n: i32| n * n);
//!
//!     let mut squares = merge(workers).collect().await;
//!     squares.sort();
//!     assert_eq!(squares, vec![4, 9]);
//! }
//! ```

pub mod channel;
pub mod error;
pub mod merge;
mod meter;
pub mod processors;
pub mod sources;
pub mod stage;
pub mod wait_group;

// Re-export commonly used items
pub mod prelude {
    pub use crate::channel::{channel, Capacity, FromStream, Inbound, Receiver, Sender};
    pub use crate::error::{Error, Result};
    pub use crate::merge::merge;
    pub use crate::processors::{fan_out, transform, try_transform};
    pub use crate::sources::{generate, generate_until, source};
    pub use crate::stage::{Stage, StageConfig};
    pub use crate::wait_group::{Done, DoneGuard, WaitGroup};
}

// Re-export main error type
pub use error::{Error, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
