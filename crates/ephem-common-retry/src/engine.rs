// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The retry loop.

use std::fmt::Display;
use std::future::Future;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::context::RetryContext;
use crate::outcome::{Attempt, Execution, Outcome};
use crate::policy::RetryPolicy;

/// Run `operation` until it succeeds, fails permanently, exhausts `policy`,
/// or `cancel` fires while waiting between attempts.
///
/// Attempts are strictly sequential. The only await point added by the engine
/// is the backoff sleep, and that is the only place cancellation is observed
/// once the first attempt has started.
pub async fn execute<F, Fut, T, E>(
	policy: &RetryPolicy,
	cancel: &CancellationToken,
	mut operation: F,
) -> Execution<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Attempt<T, E>>,
	E: Display,
{
	let start = Instant::now();
	let mut ctx = RetryContext::new(policy.seed());

	if cancel.is_cancelled() {
		return Execution {
			outcome: Outcome::Cancelled { last_cause: None },
			context: ctx,
		};
	}

	loop {
		ctx.attempts += 1;
		let attempt = operation().await;
		ctx.record_elapsed(start.elapsed());

		let (cause, retry_after) = match attempt {
			Attempt::Success(value) => {
				return Execution {
					outcome: Outcome::Success(value),
					context: ctx,
				};
			}
			Attempt::AlreadyExists => {
				debug!(attempt = ctx.attempts, "target already exists");
				return Execution {
					outcome: Outcome::AlreadyExists,
					context: ctx,
				};
			}
			Attempt::Fatal(cause) => {
				warn!(
					error = %cause,
					attempt = ctx.attempts,
					"non-retryable error encountered"
				);
				return Execution {
					outcome: Outcome::Fatal(cause),
					context: ctx,
				};
			}
			Attempt::Retryable { cause, retry_after } => (cause, retry_after),
		};

		let delay = policy.delay_for(ctx.interval, retry_after);
		if policy.attempts_exhausted(ctx.attempts) || policy.elapsed_exhausted(ctx.elapsed, delay) {
			warn!(
				error = %cause,
				attempt = ctx.attempts,
				elapsed_ms = ctx.elapsed.as_millis(),
				"retry budget exhausted"
			);
			return Execution {
				outcome: Outcome::Exhausted(cause),
				context: ctx,
			};
		}

		warn!(
			error = %cause,
			attempt = ctx.attempts,
			delay_ms = delay.as_millis(),
			"retrying after error"
		);

		tokio::select! {
			biased;
			_ = cancel.cancelled() => {
				ctx.record_elapsed(start.elapsed());
				debug!(attempt = ctx.attempts, "retry cancelled during backoff");
				return Execution {
					outcome: Outcome::Cancelled { last_cause: Some(cause) },
					context: ctx,
				};
			}
			_ = tokio::time::sleep(delay) => {}
		}

		ctx.record_elapsed(start.elapsed());
		ctx.interval = policy.grow(ctx.interval);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::{Arc, Mutex};
	use std::time::Duration;

	#[derive(Debug, Clone, Copy, PartialEq)]
	struct MockError(&'static str);

	impl Display for MockError {
		fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
			f.write_str(self.0)
		}
	}

	fn policy(seed_ms: u64, factor: f64, cap_ms: u64, attempts: u32) -> RetryPolicy {
		RetryPolicy::with_max_attempts(attempts)
			.initial_interval(Duration::from_millis(seed_ms))
			.multiplier(factor)
			.max_interval(Duration::from_millis(cap_ms))
	}

	/// Succeeds on attempt `succeed_on` (1-based), retryable before that.
	fn flaky(
		count: Arc<AtomicU32>,
		succeed_on: u32,
	) -> impl FnMut() -> std::future::Ready<Attempt<&'static str, MockError>> {
		move || {
			let current = count.fetch_add(1, Ordering::SeqCst) + 1;
			std::future::ready(if current < succeed_on {
				Attempt::retryable(MockError("server busy"))
			} else {
				Attempt::Success("created")
			})
		}
	}

	#[tokio::test(start_paused = true)]
	async fn succeeds_after_three_retryable_failures() {
		let count = Arc::new(AtomicU32::new(0));
		let policy = policy(50, 2.0, 400, 5);

		let execution = execute(&policy, &CancellationToken::new(), flaky(count.clone(), 4)).await;

		assert!(matches!(execution.outcome, Outcome::Success("created")));
		assert_eq!(execution.attempts(), 4);
		assert_eq!(count.load(Ordering::SeqCst), 4);
		assert_eq!(execution.elapsed(), Duration::from_millis(50 + 100 + 200));
	}

	#[tokio::test(start_paused = true)]
	async fn sleeps_grow_geometrically_and_cap() {
		let policy = policy(100, 2.0, 400, 10);
		let stamps = Arc::new(Mutex::new(Vec::new()));
		let start = Instant::now();

		let recorder = Arc::clone(&stamps);
		let execution = execute(&policy, &CancellationToken::new(), move || {
			let mut stamps = recorder.lock().unwrap();
			stamps.push(start.elapsed());
			let done = stamps.len() == 6;
			async move {
				if done {
					Attempt::Success(())
				} else {
					Attempt::<(), _>::retryable(MockError("timeout"))
				}
			}
		})
		.await;

		assert!(execution.outcome.is_success());
		let stamps = stamps.lock().unwrap();
		let gaps: Vec<u128> = stamps
			.windows(2)
			.map(|w| (w[1] - w[0]).as_millis())
			.collect();
		assert_eq!(gaps, vec![100, 200, 400, 400, 400]);
	}

	#[tokio::test(start_paused = true)]
	async fn fatal_returns_on_first_attempt_without_sleeping() {
		let count = Arc::new(AtomicU32::new(0));
		let c = Arc::clone(&count);

		let execution = execute(&policy(100, 2.0, 400, 5), &CancellationToken::new(), || {
			c.fetch_add(1, Ordering::SeqCst);
			async { Attempt::<(), _>::Fatal(MockError("forbidden")) }
		})
		.await;

		assert!(matches!(execution.outcome, Outcome::Fatal(MockError("forbidden"))));
		assert_eq!(count.load(Ordering::SeqCst), 1);
		assert_eq!(execution.elapsed(), Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn exhausts_after_exactly_max_attempts() {
		let count = Arc::new(AtomicU32::new(0));
		let c = Arc::clone(&count);

		let execution = execute(&policy(10, 2.0, 100, 3), &CancellationToken::new(), || {
			let n = c.fetch_add(1, Ordering::SeqCst);
			async move {
				Attempt::<(), _>::retryable(MockError(if n == 2 { "last" } else { "earlier" }))
			}
		})
		.await;

		assert_eq!(count.load(Ordering::SeqCst), 3);
		assert_eq!(execution.attempts(), 3);
		match execution.outcome {
			Outcome::Exhausted(cause) => assert_eq!(cause, MockError("last")),
			other => panic!("expected exhaustion, got {other:?}"),
		}
		// No sleep after the final attempt.
		assert_eq!(execution.elapsed(), Duration::from_millis(10 + 20));
	}

	#[tokio::test(start_paused = true)]
	async fn already_exists_is_terminal() {
		let count = Arc::new(AtomicU32::new(0));
		let c = Arc::clone(&count);

		let execution = execute(&policy(10, 2.0, 100, 5), &CancellationToken::new(), || {
			c.fetch_add(1, Ordering::SeqCst);
			async { Attempt::<(), MockError>::AlreadyExists }
		})
		.await;

		assert!(matches!(execution.outcome, Outcome::AlreadyExists));
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_between_second_and_third_attempt() {
		let count = Arc::new(AtomicU32::new(0));
		let c = Arc::clone(&count);
		let cancel = CancellationToken::new();

		// Attempt 1 at t=0, attempt 2 at t=100, attempt 3 would be at t=300.
		let canceller = cancel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(150)).await;
			canceller.cancel();
		});

		let execution = execute(&policy(100, 2.0, 1000, 10), &cancel, || {
			c.fetch_add(1, Ordering::SeqCst);
			async { Attempt::<(), _>::retryable(MockError("unavailable")) }
		})
		.await;

		match execution.outcome {
			Outcome::Cancelled { last_cause } => {
				assert_eq!(last_cause, Some(MockError("unavailable")))
			}
			other => panic!("expected cancellation, got {other:?}"),
		}
		assert_eq!(execution.attempts(), 2);
		assert_eq!(execution.elapsed(), Duration::from_millis(150));

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert_eq!(count.load(Ordering::SeqCst), 2, "no attempts after cancel");
	}

	#[tokio::test]
	async fn pre_cancelled_token_skips_the_operation() {
		let cancel = CancellationToken::new();
		cancel.cancel();
		let count = Arc::new(AtomicU32::new(0));

		let execution = execute(&RetryPolicy::default(), &cancel, flaky(count.clone(), 1)).await;

		assert!(matches!(execution.outcome, Outcome::Cancelled { last_cause: None }));
		assert_eq!(count.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn elapsed_budget_stops_before_overrunning() {
		let count = Arc::new(AtomicU32::new(0));
		let policy = RetryPolicy::with_max_elapsed(Duration::from_millis(500))
			.initial_interval(Duration::from_millis(100))
			.multiplier(2.0)
			.max_interval(Duration::from_secs(10));

		let execution = execute(&policy, &CancellationToken::new(), flaky(count.clone(), 100)).await;

		// Sleeps of 100 and 200 fit; the next 400ms sleep would end at 700ms.
		assert!(matches!(execution.outcome, Outcome::Exhausted(_)));
		assert_eq!(count.load(Ordering::SeqCst), 3);
		assert_eq!(execution.elapsed(), Duration::from_millis(300));
	}

	#[tokio::test(start_paused = true)]
	async fn attempt_bound_wins_when_it_triggers_first() {
		let count = Arc::new(AtomicU32::new(0));
		let policy = policy(10, 2.0, 100, 2).max_elapsed(Duration::from_secs(60));

		let execution = execute(&policy, &CancellationToken::new(), flaky(count.clone(), 100)).await;

		assert!(matches!(execution.outcome, Outcome::Exhausted(_)));
		assert_eq!(count.load(Ordering::SeqCst), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn unbounded_policy_makes_a_single_attempt() {
		let count = Arc::new(AtomicU32::new(0));
		let policy = RetryPolicy {
			max_attempts: None,
			max_elapsed: None,
			..Default::default()
		};

		let execution = execute(&policy, &CancellationToken::new(), flaky(count.clone(), 100)).await;

		assert!(matches!(execution.outcome, Outcome::Exhausted(MockError("server busy"))));
		assert_eq!(count.load(Ordering::SeqCst), 1);
		assert_eq!(execution.elapsed(), Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn server_hint_stretches_the_sleep() {
		let count = Arc::new(AtomicU32::new(0));
		let c = Arc::clone(&count);

		let execution = execute(&policy(50, 2.0, 1000, 5), &CancellationToken::new(), || {
			let n = c.fetch_add(1, Ordering::SeqCst);
			async move {
				if n == 0 {
					Attempt::retry_after(MockError("throttled"), Duration::from_millis(300))
				} else {
					Attempt::Success(n)
				}
			}
		})
		.await;

		assert!(matches!(execution.outcome, Outcome::Success(1)));
		assert_eq!(execution.elapsed(), Duration::from_millis(300));
	}

	#[tokio::test(start_paused = true)]
	async fn separate_calls_share_no_state() {
		let policy = policy(10, 2.0, 100, 3);
		let cancel = CancellationToken::new();

		let first = execute(&policy, &cancel, flaky(Arc::new(AtomicU32::new(0)), 3)).await;
		let second = execute(&policy, &cancel, flaky(Arc::new(AtomicU32::new(0)), 3)).await;

		assert_eq!(first.attempts(), 3);
		assert_eq!(second.attempts(), 3);
		assert_eq!(first.elapsed(), second.elapsed());
		tokio_test::assert_ok!(second.into_result());
	}
}
