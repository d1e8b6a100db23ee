// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Bounded retry with exponential backoff.
//!
//! This crate provides:
//! - [`RetryPolicy`]: seed interval, growth factor, cap and stop conditions
//! - [`Attempt`]: the classified result of a single try
//! - [`execute`]: the retry loop, interruptible by a [`CancellationToken`]
//!   while it sleeps between attempts
//!
//! Every call to [`execute`] starts from a fresh [`RetryContext`]; nothing is
//! shared between calls.

mod context;
mod engine;
mod outcome;
mod policy;

pub use context::RetryContext;
pub use engine::execute;
pub use outcome::{Attempt, Execution, Outcome, RetryError};
pub use policy::RetryPolicy;
pub use tokio_util::sync::CancellationToken;
