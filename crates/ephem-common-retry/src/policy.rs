// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Backoff policy and delay arithmetic.

use std::time::Duration;

/// How long to wait between attempts and when to give up.
///
/// The interval starts at `initial_interval`, is multiplied by `multiplier`
/// after every retryable failure and never exceeds `max_interval`. The loop
/// stops on whichever of `max_attempts` / `max_elapsed` triggers first. A
/// policy with neither bound makes a single attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
	pub initial_interval: Duration,
	pub multiplier: f64,
	pub max_interval: Duration,
	pub max_attempts: Option<u32>,
	pub max_elapsed: Option<Duration>,
	pub jitter: bool,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			initial_interval: Duration::from_millis(100),
			multiplier: 3.0,
			max_interval: Duration::from_secs(30),
			max_attempts: Some(6),
			max_elapsed: None,
			jitter: false,
		}
	}
}

impl RetryPolicy {
	/// Policy bounded by attempt count only.
	pub fn with_max_attempts(attempts: u32) -> Self {
		Self {
			max_attempts: Some(attempts),
			..Default::default()
		}
	}

	/// Policy bounded by elapsed time only.
	pub fn with_max_elapsed(max_elapsed: Duration) -> Self {
		Self {
			max_attempts: None,
			max_elapsed: Some(max_elapsed),
			..Default::default()
		}
	}

	pub fn initial_interval(mut self, interval: Duration) -> Self {
		self.initial_interval = interval;
		self
	}

	pub fn multiplier(mut self, multiplier: f64) -> Self {
		self.multiplier = multiplier;
		self
	}

	pub fn max_interval(mut self, interval: Duration) -> Self {
		self.max_interval = interval;
		self
	}

	pub fn max_attempts(mut self, attempts: u32) -> Self {
		self.max_attempts = Some(attempts);
		self
	}

	pub fn max_elapsed(mut self, elapsed: Duration) -> Self {
		self.max_elapsed = Some(elapsed);
		self
	}

	pub fn jitter(mut self, jitter: bool) -> Self {
		self.jitter = jitter;
		self
	}

	/// The first interval, already capped.
	pub(crate) fn seed(&self) -> Duration {
		self.initial_interval.min(self.max_interval)
	}

	/// The interval that follows `current`.
	pub(crate) fn grow(&self, current: Duration) -> Duration {
		let next = scale(current, self.multiplier.max(1.0)).unwrap_or(self.max_interval);
		next.max(current).min(self.max_interval)
	}

	/// The sleep before the next attempt.
	///
	/// A server-suggested delay raises the sleep but never past the cap.
	pub(crate) fn delay_for(&self, interval: Duration, retry_after: Option<Duration>) -> Duration {
		let base = match retry_after {
			Some(hint) => interval.max(hint),
			None => interval,
		}
		.min(self.max_interval);

		if self.jitter {
			let jitter_factor = 0.5 + fastrand::f64();
			scale(base, jitter_factor)
				.unwrap_or(base)
				.min(self.max_interval)
		} else {
			base
		}
	}

	pub(crate) fn attempts_exhausted(&self, attempts: u32) -> bool {
		match (self.max_attempts, self.max_elapsed) {
			(Some(max), _) => attempts >= max,
			(None, Some(_)) => false,
			(None, None) => true,
		}
	}

	/// True when sleeping for `delay` would run past `max_elapsed`.
	pub(crate) fn elapsed_exhausted(&self, elapsed: Duration, delay: Duration) -> bool {
		self
			.max_elapsed
			.is_some_and(|max| elapsed.saturating_add(delay) > max)
	}
}

/// Multiply a duration by a float factor, rounding to whole nanoseconds.
fn scale(duration: Duration, factor: f64) -> Option<Duration> {
	let nanos = (duration.as_nanos() as f64 * factor).round();
	if nanos.is_finite() && nanos >= 0.0 && nanos < u64::MAX as f64 {
		Some(Duration::from_nanos(nanos as u64))
	} else {
		None
	}
}
