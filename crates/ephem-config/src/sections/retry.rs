// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retry configuration section.

use std::time::Duration;

use ephem_common_retry::RetryPolicy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_INITIAL_INTERVAL_MS: u64 = 100;
const DEFAULT_MULTIPLIER: f64 = 3.0;
const DEFAULT_MAX_INTERVAL_MS: u64 = 30_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Retry configuration layer (for merging).
///
/// `max_attempts = 0` removes the attempt bound, leaving `max_elapsed_ms` as
/// the only stop condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryConfigLayer {
	pub initial_interval_ms: Option<u64>,
	pub multiplier: Option<f64>,
	pub max_interval_ms: Option<u64>,
	pub max_attempts: Option<u32>,
	pub max_elapsed_ms: Option<u64>,
	pub jitter: Option<bool>,
}

impl RetryConfigLayer {
	/// Merges another layer on top of this one.
	/// Values from `other` take precedence when present.
	pub fn merge(&mut self, other: RetryConfigLayer) {
		if other.initial_interval_ms.is_some() {
			self.initial_interval_ms = other.initial_interval_ms;
		}
		if other.multiplier.is_some() {
			self.multiplier = other.multiplier;
		}
		if other.max_interval_ms.is_some() {
			self.max_interval_ms = other.max_interval_ms;
		}
		if other.max_attempts.is_some() {
			self.max_attempts = other.max_attempts;
		}
		if other.max_elapsed_ms.is_some() {
			self.max_elapsed_ms = other.max_elapsed_ms;
		}
		if other.jitter.is_some() {
			self.jitter = other.jitter;
		}
	}

	/// Resolves this layer into a runtime configuration.
	pub fn resolve(self) -> Result<RetryConfig, ConfigError> {
		let config = RetryConfig {
			initial_interval_ms: self
				.initial_interval_ms
				.unwrap_or(DEFAULT_INITIAL_INTERVAL_MS),
			multiplier: self.multiplier.unwrap_or(DEFAULT_MULTIPLIER),
			max_interval_ms: self.max_interval_ms.unwrap_or(DEFAULT_MAX_INTERVAL_MS),
			max_attempts: match self.max_attempts {
				Some(0) => None,
				Some(n) => Some(n),
				None => Some(DEFAULT_MAX_ATTEMPTS),
			},
			max_elapsed_ms: self.max_elapsed_ms,
			jitter: self.jitter.unwrap_or(false),
		};
		config.validate()?;
		Ok(config)
	}
}

/// Retry configuration (runtime, resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
	pub initial_interval_ms: u64,
	pub multiplier: f64,
	pub max_interval_ms: u64,
	pub max_attempts: Option<u32>,
	pub max_elapsed_ms: Option<u64>,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			initial_interval_ms: DEFAULT_INITIAL_INTERVAL_MS,
			multiplier: DEFAULT_MULTIPLIER,
			max_interval_ms: DEFAULT_MAX_INTERVAL_MS,
			max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
			max_elapsed_ms: None,
			jitter: false,
		}
	}
}

impl RetryConfig {
	fn validate(&self) -> Result<(), ConfigError> {
		if !(self.multiplier >= 1.0 && self.multiplier.is_finite()) {
			return Err(ConfigError::InvalidValue {
				key: "retry.multiplier".to_string(),
				message: format!("must be a finite number >= 1.0, got {}", self.multiplier),
			});
		}
		if self.initial_interval_ms > self.max_interval_ms {
			return Err(ConfigError::Validation(format!(
				"retry.initial_interval_ms ({}) exceeds retry.max_interval_ms ({})",
				self.initial_interval_ms, self.max_interval_ms
			)));
		}
		if self.max_attempts.is_none() && self.max_elapsed_ms.is_none() {
			return Err(ConfigError::Validation(
				"retry needs a stop condition: set retry.max_attempts or retry.max_elapsed_ms"
					.to_string(),
			));
		}
		Ok(())
	}

	/// Build the engine policy described by this section.
	pub fn to_policy(&self) -> RetryPolicy {
		RetryPolicy {
			initial_interval: Duration::from_millis(self.initial_interval_ms),
			multiplier: self.multiplier,
			max_interval: Duration::from_millis(self.max_interval_ms),
			max_attempts: self.max_attempts,
			max_elapsed: self.max_elapsed_ms.map(Duration::from_millis),
			jitter: self.jitter,
		}
	}
}
