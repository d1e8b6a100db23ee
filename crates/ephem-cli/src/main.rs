// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ephem - create, populate and destroy ephemeral K8s test environments.
//!
//! Every command uses the same retry policy and naming rules as the test
//! harness, so environments created by hand look exactly like the ones a
//! test run creates.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use ephem_config::{load_config, load_config_with_file, LogFormat};
use ephem_k8s::{
	K8sClient, KubeClient, ObjectMeta, PersistentVolumeClaim, PersistentVolumeClaimSpec, Quantity,
	VolumeResourceRequirements,
};
use ephem_provisioner::{init_logging, EnvironmentManager};

/// ephem - ephemeral K8s test environments
#[derive(Parser, Debug)]
#[command(name = "ephem", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Create a freshly named environment namespace and print it
	Create,
	/// Provision a persistent volume claim inside an existing environment
	Pvc {
		/// Environment namespace
		#[arg(long, short)]
		namespace: String,
		/// Claim name
		#[arg(long)]
		name: String,
		/// Requested storage
		#[arg(long, default_value = "1Gi")]
		size: String,
		/// Storage class (cluster default when omitted)
		#[arg(long)]
		storage_class: Option<String>,
		#[arg(long, default_value = "ReadWriteOnce")]
		access_mode: String,
	},
	/// Delete an environment namespace and wait for the result
	Destroy {
		/// Environment namespace
		namespace: String,
	},
}

fn claim(
	name: &str,
	size: &str,
	storage_class: Option<String>,
	access_mode: &str,
) -> PersistentVolumeClaim {
	PersistentVolumeClaim {
		metadata: ObjectMeta {
			name: Some(name.to_string()),
			..Default::default()
		},
		spec: Some(PersistentVolumeClaimSpec {
			access_modes: Some(vec![access_mode.to_string()]),
			storage_class_name: storage_class,
			resources: Some(VolumeResourceRequirements {
				requests: Some(BTreeMap::from([(
					"storage".to_string(),
					Quantity(size.to_string()),
				)])),
				..Default::default()
			}),
			..Default::default()
		}),
		..Default::default()
	}
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => load_config_with_file(path),
		None => load_config(),
	}
	.context("failed to load configuration")?;
	if let Some(level) = args.log_level {
		config.logging.level = level;
	}
	if args.json_logs {
		config.logging.format = LogFormat::Json;
	}
	init_logging(&config.logging);
	info!(
		namespace_prefix = %config.environment.namespace_prefix,
		base_name = %config.environment.base_name,
		max_attempts = ?config.retry.max_attempts,
		max_elapsed_ms = ?config.retry.max_elapsed_ms,
		"configuration loaded"
	);

	let client: Arc<dyn K8sClient> = Arc::new(
		KubeClient::new()
			.await
			.context("failed to initialise K8s client")?,
	);
	let manager = EnvironmentManager::new(client, config);

	match args.command {
		Command::Create => {
			let environment = manager.create_environment().await?;
			print_json(environment.namespace())?;
		}
		Command::Pvc {
			namespace,
			name,
			size,
			storage_class,
			access_mode,
		} => {
			let environment = manager.open_environment(&namespace).await?;
			let pvc = environment
				.ensure_pvc(claim(&name, &size, storage_class, &access_mode))
				.await?;
			print_json(&pvc)?;
		}
		Command::Destroy { namespace } => {
			manager.destroy_namespace(namespace.as_str()).wait().await?;
			info!(namespace = %namespace, "environment destroyed");
		}
	}

	Ok(())
}
