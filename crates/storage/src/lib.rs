// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the hook service

mod events;
mod memory;
mod outgoing;
mod schedules;
mod store;
mod traced;

pub use events::{EventRepository, QueueStats};
pub use memory::{MemoryStore, MemorySubscription};
pub use outgoing::OutgoingRepository;
pub use schedules::SchedulerRepository;
pub use store::{Store, StoreError, StoreExt, Subscription};
pub use traced::TracedStore;
