// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ProvisionerConfigLayer;
use crate::sections::{EnvironmentConfigLayer, LogFormat, LoggingConfigLayer, RetryConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ProvisionerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ProvisionerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ProvisionerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/ephem/provisioner.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ProvisionerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ProvisionerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ProvisionerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: EPHEM_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ProvisionerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ProvisionerConfigLayer {
			retry: Some(load_retry_from_env()?),
			environment: Some(load_environment_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: FromStr>(name: &str, type_name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {type_name} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_retry_from_env() -> Result<RetryConfigLayer, ConfigError> {
	Ok(RetryConfigLayer {
		initial_interval_ms: env_parse("EPHEM_RETRY_INITIAL_INTERVAL_MS", "u64")?,
		multiplier: env_parse("EPHEM_RETRY_MULTIPLIER", "f64")?,
		max_interval_ms: env_parse("EPHEM_RETRY_MAX_INTERVAL_MS", "u64")?,
		max_attempts: env_parse("EPHEM_RETRY_MAX_ATTEMPTS", "u32")?,
		max_elapsed_ms: env_parse("EPHEM_RETRY_MAX_ELAPSED_MS", "u64")?,
		jitter: env_bool("EPHEM_RETRY_JITTER"),
	})
}

fn load_environment_from_env() -> Result<EnvironmentConfigLayer, ConfigError> {
	Ok(EnvironmentConfigLayer {
		base_name: env_var("EPHEM_ENVIRONMENT_BASE_NAME"),
		namespace_prefix: env_var("EPHEM_ENVIRONMENT_NAMESPACE_PREFIX"),
		teardown_grace_period_secs: env_parse("EPHEM_ENVIRONMENT_TEARDOWN_GRACE_PERIOD_SECS", "u32")?,
		labels: None,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("EPHEM_LOG_FORMAT") {
		Some(v) => Some(
			v.parse::<LogFormat>()
				.map_err(|message| ConfigError::InvalidValue {
					key: "EPHEM_LOG_FORMAT".to_string(),
					message,
				})?,
		),
		None => None,
	};

	Ok(LoggingConfigLayer {
		level: env_var("EPHEM_LOG_LEVEL"),
		format,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::env;
	use std::io::Write;
	use std::sync::Mutex;

	static ENV_MUTEX: Mutex<()> = Mutex::new(());

	const ENV_VARS: [&str; 11] = [
		"EPHEM_RETRY_INITIAL_INTERVAL_MS",
		"EPHEM_RETRY_MULTIPLIER",
		"EPHEM_RETRY_MAX_INTERVAL_MS",
		"EPHEM_RETRY_MAX_ATTEMPTS",
		"EPHEM_RETRY_MAX_ELAPSED_MS",
		"EPHEM_RETRY_JITTER",
		"EPHEM_ENVIRONMENT_BASE_NAME",
		"EPHEM_ENVIRONMENT_NAMESPACE_PREFIX",
		"EPHEM_ENVIRONMENT_TEARDOWN_GRACE_PERIOD_SECS",
		"EPHEM_LOG_LEVEL",
		"EPHEM_LOG_FORMAT",
	];

	fn clear_ephem_env() {
		for name in ENV_VARS {
			env::remove_var(name);
		}
	}

	#[test]
	fn precedence_orders_sources() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn missing_toml_file_is_skipped() {
		let dir = tempfile::tempdir().unwrap();
		let layer = TomlSource::new(dir.path().join("absent.toml")).load().unwrap();
		assert!(layer.retry.is_none());
		assert!(layer.environment.is_none());
	}

	#[test]
	fn toml_file_populates_sections() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[retry]
initial_interval_ms = 250
max_attempts = 4

[environment]
base_name = "volumes"
labels = {{ team = "storage" }}

[logging]
format = "json"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		let retry = layer.retry.unwrap();
		assert_eq!(retry.initial_interval_ms, Some(250));
		assert_eq!(retry.max_attempts, Some(4));
		assert_eq!(retry.multiplier, None);

		let environment = layer.environment.unwrap();
		assert_eq!(environment.base_name.as_deref(), Some("volumes"));
		assert_eq!(
			environment.labels.unwrap().get("team").map(String::as_str),
			Some("storage")
		);
		assert_eq!(layer.logging.unwrap().format, Some(LogFormat::Json));
	}

	#[test]
	fn malformed_toml_reports_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[retry\nmax_attempts = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		match err {
			ConfigError::TomlParse { path, .. } => assert_eq!(path, file.path()),
			other => panic!("expected TomlParse, got {other:?}"),
		}
	}

	#[test]
	fn env_source_reads_every_section() {
		let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
		clear_ephem_env();
		env::set_var("EPHEM_RETRY_INITIAL_INTERVAL_MS", "50");
		env::set_var("EPHEM_RETRY_MULTIPLIER", "2.5");
		env::set_var("EPHEM_RETRY_MAX_ATTEMPTS", "5");
		env::set_var("EPHEM_RETRY_JITTER", "TRUE");
		env::set_var("EPHEM_ENVIRONMENT_BASE_NAME", "volumes");
		env::set_var("EPHEM_ENVIRONMENT_TEARDOWN_GRACE_PERIOD_SECS", "30");
		env::set_var("EPHEM_LOG_FORMAT", "json");

		let layer = EnvSource.load();
		clear_ephem_env();
		let layer = layer.unwrap();

		let retry = layer.retry.unwrap();
		assert_eq!(retry.initial_interval_ms, Some(50));
		assert_eq!(retry.multiplier, Some(2.5));
		assert_eq!(retry.max_attempts, Some(5));
		assert_eq!(retry.max_interval_ms, None);
		assert_eq!(retry.jitter, Some(true));

		let environment = layer.environment.unwrap();
		assert_eq!(environment.base_name.as_deref(), Some("volumes"));
		assert_eq!(environment.namespace_prefix, None);
		assert_eq!(environment.teardown_grace_period_secs, Some(30));

		let logging = layer.logging.unwrap();
		assert_eq!(logging.format, Some(LogFormat::Json));
		assert_eq!(logging.level, None);
	}

	#[test]
	fn env_overrides_config_file() {
		let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
		clear_ephem_env();

		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[retry]
initial_interval_ms = 250
max_attempts = 4

[environment]
base_name = "from-file"
"#
		)
		.unwrap();

		env::set_var("EPHEM_RETRY_MAX_ATTEMPTS", "9");
		env::set_var("EPHEM_ENVIRONMENT_BASE_NAME", "from-env");
		let config = crate::load_config_with_file(file.path());
		clear_ephem_env();
		let config = config.unwrap();

		assert_eq!(config.retry.max_attempts, Some(9));
		assert_eq!(config.retry.initial_interval_ms, 250);
		assert_eq!(config.environment.base_name, "from-env");
	}

	#[test]
	fn unparseable_env_value_is_rejected() {
		let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
		clear_ephem_env();
		env::set_var("EPHEM_RETRY_MAX_ATTEMPTS", "abc");

		let err = EnvSource.load().unwrap_err();
		let from_env = crate::load_config_from_env();
		clear_ephem_env();

		match err {
			ConfigError::InvalidValue { key, message } => {
				assert_eq!(key, "EPHEM_RETRY_MAX_ATTEMPTS");
				assert!(message.contains("'abc'"), "{message}");
			}
			other => panic!("expected InvalidValue, got {other:?}"),
		}
		assert!(matches!(from_env, Err(ConfigError::InvalidValue { .. })));
	}

	#[test]
	fn unknown_log_format_is_rejected() {
		let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
		clear_ephem_env();
		env::set_var("EPHEM_LOG_FORMAT", "xml");

		let result = EnvSource.load();
		clear_ephem_env();

		assert!(matches!(
			result,
			Err(ConfigError::InvalidValue { ref key, .. }) if key == "EPHEM_LOG_FORMAT"
		));
	}
}
