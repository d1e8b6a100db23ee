// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-test namespaces: synchronous setup, background teardown.

use std::collections::BTreeMap;
use std::sync::Arc;

use ephem_common_retry::{execute, Attempt, CancellationToken, Outcome, RetryPolicy};
use ephem_config::{EnvironmentConfig, ProvisionerConfig};
use ephem_k8s::{K8sClient, K8sError, Namespace, ObjectMeta, PersistentVolumeClaim};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, Instrument};

use crate::error::{ProvisioningError, TeardownError, ValidationError};
use crate::provisioner::{to_attempt, Provisioner};

/// Label set on every namespace created by [`EnvironmentManager`].
pub const MANAGED_LABEL: &str = "ephem.dev/managed";
/// Label carrying the configured base name.
pub const BASE_NAME_LABEL: &str = "ephem.dev/base-name";

const SUFFIX_LEN: usize = 5;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// `<prefix>-<base>-<5 random lowercase alphanumerics>`
pub fn generate_namespace_name(prefix: &str, base_name: &str) -> String {
	let suffix: String = (0..SUFFIX_LEN)
		.map(|_| SUFFIX_ALPHABET[fastrand::usize(..SUFFIX_ALPHABET.len())] as char)
		.collect();
	format!("{prefix}-{base_name}-{suffix}")
}

/// A provisioned namespace owned by one unit of work.
#[derive(Debug, Clone)]
pub struct Environment {
	name: String,
	namespace: Namespace,
	provisioner: Provisioner,
}

impl Environment {
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The namespace as returned by the confirmatory read.
	pub fn namespace(&self) -> &Namespace {
		&self.namespace
	}

	/// Provision `pvc` inside this environment. The claim's namespace is
	/// filled in when missing; a claim naming any other namespace is rejected
	/// so nothing outlives the environment's teardown.
	pub async fn ensure_pvc(
		&self,
		mut pvc: PersistentVolumeClaim,
	) -> Result<PersistentVolumeClaim, ProvisioningError> {
		match pvc.metadata.namespace.as_deref() {
			None | Some("") => pvc.metadata.namespace = Some(self.name.clone()),
			Some(namespace) if namespace == self.name => {}
			Some(namespace) => {
				return Err(ValidationError::OutsideEnvironment {
					name: pvc.metadata.name.clone().unwrap_or_default(),
					namespace: namespace.to_string(),
					environment: self.name.clone(),
				}
				.into());
			}
		}
		self.provisioner.ensure_pvc(&pvc).await
	}
}

/// Handle to a background namespace deletion.
///
/// Dropping the handle detaches the task; failures are still logged.
#[derive(Debug)]
pub struct TeardownHandle {
	namespace: String,
	cancel: CancellationToken,
	task: JoinHandle<Result<(), TeardownError>>,
}

impl TeardownHandle {
	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}

	/// Stop retrying the deletion. A request already in flight completes.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Wait for the deletion to finish and return its result.
	pub async fn wait(self) -> Result<(), TeardownError> {
		match self.task.await {
			Ok(result) => result,
			Err(e) => Err(TeardownError::Join {
				namespace: self.namespace,
				message: e.to_string(),
			}),
		}
	}
}

/// Creates and destroys per-test namespaces.
#[derive(Debug, Clone)]
pub struct EnvironmentManager {
	provisioner: Provisioner,
	config: EnvironmentConfig,
}

impl EnvironmentManager {
	pub fn new(client: Arc<dyn K8sClient>, config: ProvisionerConfig) -> Self {
		Self {
			provisioner: Provisioner::from_config(client, &config.retry),
			config: config.environment,
		}
	}

	pub fn provisioner(&self) -> &Provisioner {
		&self.provisioner
	}

	fn namespace_object(&self, name: &str) -> Namespace {
		let mut labels: BTreeMap<String, String> = self.config.labels.clone();
		labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
		labels.insert(BASE_NAME_LABEL.to_string(), self.config.base_name.clone());

		Namespace {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				labels: Some(labels),
				..Default::default()
			},
			..Default::default()
		}
	}

	/// Provision a freshly named namespace. A failure here should fail the
	/// enclosing unit of work.
	#[instrument(skip(self), fields(base_name = %self.config.base_name))]
	pub async fn create_environment(&self) -> Result<Environment, ProvisioningError> {
		let name = generate_namespace_name(&self.config.namespace_prefix, &self.config.base_name);
		let namespace = self
			.provisioner
			.ensure_namespace(&self.namespace_object(&name))
			.await?;

		info!(namespace = %name, "environment created");
		Ok(Environment {
			name,
			namespace,
			provisioner: self.provisioner.clone(),
		})
	}

	/// Adopt an existing namespace by name, for example one created by an
	/// earlier process.
	pub async fn open_environment(&self, name: &str) -> Result<Environment, ProvisioningError> {
		let namespace = self.provisioner.get_namespace(name).await?;
		Ok(Environment {
			name: name.to_string(),
			namespace,
			provisioner: self.provisioner.clone(),
		})
	}

	/// Delete the environment's namespace in the background.
	///
	/// Must be called from within a tokio runtime. Transient failures are
	/// retried with the configured policy; a namespace that is already gone
	/// counts as deleted.
	pub fn destroy_environment(&self, environment: Environment) -> TeardownHandle {
		self.destroy_namespace(environment.name)
	}

	/// Delete an environment namespace by name without reading it first.
	/// A namespace that no longer exists completes successfully.
	pub fn destroy_namespace(&self, namespace: impl Into<String>) -> TeardownHandle {
		let namespace = namespace.into();
		let cancel = CancellationToken::new();
		let task = delete_namespace(
			self.provisioner.client().clone(),
			self.provisioner.policy().clone(),
			namespace.clone(),
			self.config.teardown_grace_period_secs,
			cancel.clone(),
		);

		let span = tracing::info_span!("teardown", namespace = %namespace);
		TeardownHandle {
			namespace,
			cancel,
			task: tokio::spawn(task.instrument(span)),
		}
	}
}

async fn delete_namespace(
	client: Arc<dyn K8sClient>,
	policy: RetryPolicy,
	namespace: String,
	grace_period_seconds: u32,
	cancel: CancellationToken,
) -> Result<(), TeardownError> {
	let api = client.as_ref();
	let name = namespace.as_str();

	let execution = execute(&policy, &cancel, || async move {
		match api.delete_namespace(name, grace_period_seconds).await {
			Err(K8sError::NotFound { .. }) => {
				debug!("namespace already gone");
				Attempt::Success(())
			}
			result => to_attempt(result),
		}
	})
	.await;
	let attempts = execution.attempts();

	let result = match execution.outcome {
		Outcome::Success(()) | Outcome::AlreadyExists => {
			info!(attempts, "environment namespace deleted");
			return Ok(());
		}
		Outcome::Fatal(source) => TeardownError::Delete {
			namespace: namespace.clone(),
			source,
		},
		Outcome::Exhausted(source) => TeardownError::Exhausted {
			namespace: namespace.clone(),
			attempts,
			source,
		},
		Outcome::Cancelled { last_cause } => TeardownError::Cancelled {
			namespace: namespace.clone(),
			attempts,
			last_cause,
		},
	};

	error!(attempts, error = %result, "environment teardown failed");
	Err(result)
}
