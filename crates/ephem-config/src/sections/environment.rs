// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment lifecycle configuration section.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest name the API server accepts for a namespace (RFC 1123 label).
const MAX_NAMESPACE_LEN: usize = 63;
/// Length of the `-xxxxx` suffix appended to every generated namespace.
const SUFFIX_LEN: usize = 6;

/// Environment configuration layer (for merging).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfigLayer {
	pub base_name: Option<String>,
	pub namespace_prefix: Option<String>,
	pub teardown_grace_period_secs: Option<u32>,
	pub labels: Option<BTreeMap<String, String>>,
}

impl EnvironmentConfigLayer {
	/// Merges another layer on top of this one.
	/// Values from `other` take precedence when present; `labels` is replaced
	/// as a whole.
	pub fn merge(&mut self, other: EnvironmentConfigLayer) {
		if other.base_name.is_some() {
			self.base_name = other.base_name;
		}
		if other.namespace_prefix.is_some() {
			self.namespace_prefix = other.namespace_prefix;
		}
		if other.teardown_grace_period_secs.is_some() {
			self.teardown_grace_period_secs = other.teardown_grace_period_secs;
		}
		if other.labels.is_some() {
			self.labels = other.labels;
		}
	}

	/// Resolves this layer into a runtime configuration.
	pub fn resolve(self) -> Result<EnvironmentConfig, ConfigError> {
		let defaults = EnvironmentConfig::default();
		let config = EnvironmentConfig {
			base_name: self.base_name.unwrap_or(defaults.base_name),
			namespace_prefix: self.namespace_prefix.unwrap_or(defaults.namespace_prefix),
			teardown_grace_period_secs: self
				.teardown_grace_period_secs
				.unwrap_or(defaults.teardown_grace_period_secs),
			labels: self.labels.unwrap_or_default(),
		};
		config.validate()?;
		Ok(config)
	}
}

/// Environment configuration (runtime, resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
	pub base_name: String,
	pub namespace_prefix: String,
	pub teardown_grace_period_secs: u32,
	pub labels: BTreeMap<String, String>,
}

impl Default for EnvironmentConfig {
	fn default() -> Self {
		Self {
			base_name: "e2e".to_string(),
			namespace_prefix: "e2e-tests".to_string(),
			teardown_grace_period_secs: 0,
			labels: BTreeMap::new(),
		}
	}
}

fn is_dns_label_part(value: &str) -> bool {
	!value.is_empty()
		&& value
			.bytes()
			.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
		&& !value.starts_with('-')
		&& !value.ends_with('-')
}

impl EnvironmentConfig {
	fn validate(&self) -> Result<(), ConfigError> {
		for (key, value) in [
			("environment.namespace_prefix", &self.namespace_prefix),
			("environment.base_name", &self.base_name),
		] {
			if !is_dns_label_part(value) {
				return Err(ConfigError::InvalidValue {
					key: key.to_string(),
					message: format!(
						"'{value}' must be non-empty lowercase alphanumerics or '-', \
						 not starting or ending with '-'"
					),
				});
			}
		}

		let generated_len = self.namespace_prefix.len() + 1 + self.base_name.len() + SUFFIX_LEN;
		if generated_len > MAX_NAMESPACE_LEN {
			return Err(ConfigError::Validation(format!(
				"generated namespace names would be {generated_len} characters, \
				 the limit is {MAX_NAMESPACE_LEN}"
			)));
		}
		Ok(())
	}
}
