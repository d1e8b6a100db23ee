// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Top-level configuration layer.

use serde::{Deserialize, Serialize};

use crate::sections::{EnvironmentConfigLayer, LoggingConfigLayer, RetryConfigLayer};

/// One source's view of the configuration. Every section is optional so that
/// sources only override what they actually set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionerConfigLayer {
	pub retry: Option<RetryConfigLayer>,
	pub environment: Option<EnvironmentConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, overlay: Option<T>, merge: impl FnOnce(&mut T, T)) {
	if let Some(overlay) = overlay {
		match base {
			Some(existing) => merge(existing, overlay),
			None => *base = Some(overlay),
		}
	}
}

impl ProvisionerConfigLayer {
	/// Merges another layer on top of this one.
	/// Values from `other` take precedence when present.
	pub fn merge(&mut self, other: ProvisionerConfigLayer) {
		merge_section(&mut self.retry, other.retry, RetryConfigLayer::merge);
		merge_section(
			&mut self.environment,
			other.environment,
			EnvironmentConfigLayer::merge,
		);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}
