// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use crate::context::RetryContext;

/// The classified result of one invocation of the operation.
#[derive(Debug)]
pub enum Attempt<T, E> {
	/// The operation completed.
	Success(T),
	/// The target already exists. Terminal, treated as success.
	AlreadyExists,
	/// A transient failure. `retry_after` carries a server-suggested delay.
	Retryable {
		cause: E,
		retry_after: Option<Duration>,
	},
	/// A permanent failure. Never retried.
	Fatal(E),
}

impl<T, E> Attempt<T, E> {
	pub fn retryable(cause: E) -> Self {
		Self::Retryable {
			cause,
			retry_after: None,
		}
	}

	pub fn retry_after(cause: E, delay: Duration) -> Self {
		Self::Retryable {
			cause,
			retry_after: Some(delay),
		}
	}
}

/// How an [`execute`](crate::execute) call ended.
#[derive(Debug)]
pub enum Outcome<T, E> {
	Success(T),
	AlreadyExists,
	Fatal(E),
	/// The stop condition was reached while only retryable failures were seen.
	Exhausted(E),
	/// The caller cancelled while the engine was waiting between attempts.
	Cancelled { last_cause: Option<E> },
}

impl<T, E> Outcome<T, E> {
	/// True for `Success` and `AlreadyExists`.
	pub fn is_success(&self) -> bool {
		matches!(self, Outcome::Success(_) | Outcome::AlreadyExists)
	}
}

/// Terminal outcome together with the final retry context.
#[derive(Debug)]
pub struct Execution<T, E> {
	pub outcome: Outcome<T, E>,
	pub context: RetryContext,
}

impl<T, E> Execution<T, E> {
	pub fn attempts(&self) -> u32 {
		self.context.attempts()
	}

	pub fn elapsed(&self) -> Duration {
		self.context.elapsed()
	}

	/// Collapse into a `Result`; `Ok(None)` means the target already existed.
	pub fn into_result(self) -> Result<Option<T>, RetryError<E>> {
		let attempts = self.context.attempts();
		match self.outcome {
			Outcome::Success(value) => Ok(Some(value)),
			Outcome::AlreadyExists => Ok(None),
			Outcome::Fatal(cause) => Err(RetryError::Fatal(cause)),
			Outcome::Exhausted(cause) => Err(RetryError::Exhausted { attempts, cause }),
			Outcome::Cancelled { last_cause } => Err(RetryError::Cancelled {
				attempts,
				last_cause,
			}),
		}
	}
}

/// Failure side of [`Execution::into_result`].
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
	#[error("non-retryable failure: {0}")]
	Fatal(#[source] E),

	#[error("gave up after {attempts} attempts: {cause}")]
	Exhausted {
		attempts: u32,
		#[source]
		cause: E,
	},

	#[error("cancelled after {attempts} attempts")]
	Cancelled {
		attempts: u32,
		#[source]
		last_cause: Option<E>,
	},
}

impl<E> RetryError<E> {
	/// The underlying cause, when one was observed.
	pub fn cause(&self) -> Option<&E> {
		match self {
			RetryError::Fatal(cause) | RetryError::Exhausted { cause, .. } => Some(cause),
			RetryError::Cancelled { last_cause, .. } => last_cause.as_ref(),
		}
	}
}
