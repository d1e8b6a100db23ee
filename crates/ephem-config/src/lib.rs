// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the ephemeral environment provisioner.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`EPHEM_*`)
//!
//! # Usage
//!
//! ```ignore
//! use ephem_config::load_config;
//!
//! let config = load_config()?;
//! let policy = config.retry.to_policy();
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ProvisionerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved provisioner configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvisionerConfig {
	pub retry: RetryConfig,
	pub environment: EnvironmentConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`EPHEM_*`)
/// 2. Config file (`/etc/ephem/provisioner.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ProvisionerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ProvisionerConfig, ConfigError> {
	let mut merged = ProvisionerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ProvisionerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

/// Merge `sources` in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ProvisionerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ProvisionerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ProvisionerConfigLayer) -> Result<ProvisionerConfig, ConfigError> {
	let retry = layer.retry.unwrap_or_default().resolve()?;
	let environment = layer.environment.unwrap_or_default().resolve()?;
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		initial_interval_ms = retry.initial_interval_ms,
		max_attempts = ?retry.max_attempts,
		max_elapsed_ms = ?retry.max_elapsed_ms,
		namespace_prefix = %environment.namespace_prefix,
		base_name = %environment.base_name,
		log_format = %logging.format,
		"Provisioner configuration loaded"
	);

	Ok(ProvisionerConfig {
		retry,
		environment,
		logging,
	})
}
