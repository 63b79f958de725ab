// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler core: a bounded pool of supervisor workers fed from a
//! priority queue or the store, emitting lifecycle artifacts to a
//! dedicated consumer.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod dispatch;
mod events;
mod notify;
mod pool;
mod proc;
mod queue;
mod signal;

#[cfg(test)]
mod test_support;

pub use dispatch::{StoreSource, TaskSource, POLL_INTERVAL};
pub use events::{spawn_consumer, Artifact, FinishedTaskLog};
pub use notify::{HttpNotify, NoopNotify, ParentNotify};
pub use pool::Pool;
pub use proc::{Proc, ProcHandle};
pub use queue::PriorityPool;
pub use signal::send_signal;
