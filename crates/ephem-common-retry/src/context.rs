// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

/// Progress of a single [`execute`](crate::execute) call.
///
/// `attempts` and `elapsed` only ever increase while the call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryContext {
	pub(crate) attempts: u32,
	pub(crate) elapsed: Duration,
	pub(crate) interval: Duration,
}

impl RetryContext {
	pub(crate) fn new(initial_interval: Duration) -> Self {
		Self {
			attempts: 0,
			elapsed: Duration::ZERO,
			interval: initial_interval,
		}
	}

	/// Number of times the operation has been invoked.
	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	/// Wall time since the first attempt started.
	pub fn elapsed(&self) -> Duration {
		self.elapsed
	}

	/// The backoff interval that would be used before the next attempt.
	pub fn interval(&self) -> Duration {
		self.interval
	}

	pub(crate) fn record_elapsed(&mut self, elapsed: Duration) {
		if elapsed > self.elapsed {
			self.elapsed = elapsed;
		}
	}
}
