// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracing subscriber setup.

use ephem_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber described by `logging`.
///
/// `RUST_LOG` takes precedence over `logging.level`. Returns `false` when a
/// global subscriber was already installed, in which case nothing changes.
pub fn init_logging(logging: &LoggingConfig) -> bool {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

	let result = match logging.format {
		LogFormat::Json => tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().json())
			.try_init(),
		LogFormat::Pretty => tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer())
			.try_init(),
	};
	result.is_ok()
}
