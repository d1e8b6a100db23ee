// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Create-then-confirm provisioning of individual resources.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use ephem_common_retry::{execute, Attempt, CancellationToken, Outcome, RetryPolicy};
use ephem_config::RetryConfig;
use ephem_k8s::{ErrorClass, K8sClient, K8sError, Namespace, PersistentVolumeClaim};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Phase, ProvisioningError};
use crate::types::{
	namespace_name, pvc_target, ProvisionedResource, ResourceId, ResourceKind, ResourceRequest,
};

/// Turn the result of one API call into an engine attempt.
pub(crate) fn to_attempt<T>(result: Result<T, K8sError>) -> Attempt<T, K8sError> {
	match result {
		Ok(value) => Attempt::Success(value),
		Err(err) => match err.class() {
			ErrorClass::Conflict => Attempt::AlreadyExists,
			ErrorClass::Retryable => match err.retry_after() {
				Some(delay) => Attempt::retry_after(err, delay),
				None => Attempt::retryable(err),
			},
			ErrorClass::Fatal => Attempt::Fatal(err),
		},
	}
}

/// Creates resources through the retry engine and reads them back.
///
/// A create that reports `AlreadyExists` is treated like a successful one, so
/// provisioning the same request twice yields the same object both times.
/// The confirmatory read runs exactly once and is never retried.
#[derive(Clone)]
pub struct Provisioner {
	client: Arc<dyn K8sClient>,
	policy: RetryPolicy,
}

impl fmt::Debug for Provisioner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Provisioner")
			.field("policy", &self.policy)
			.finish_non_exhaustive()
	}
}

impl Provisioner {
	pub fn new(client: Arc<dyn K8sClient>, policy: RetryPolicy) -> Self {
		Self { client, policy }
	}

	pub fn from_config(client: Arc<dyn K8sClient>, config: &RetryConfig) -> Self {
		Self::new(client, config.to_policy())
	}

	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	pub(crate) fn client(&self) -> &Arc<dyn K8sClient> {
		&self.client
	}

	/// Provision `request` and return the object as stored by the API server.
	pub async fn provision(
		&self,
		request: &ResourceRequest,
	) -> Result<ProvisionedResource, ProvisioningError> {
		self.provision_with_cancel(request, &CancellationToken::new())
			.await
	}

	/// Like [`provision`](Self::provision), but `cancel` aborts the wait
	/// between attempts.
	pub async fn provision_with_cancel(
		&self,
		request: &ResourceRequest,
		cancel: &CancellationToken,
	) -> Result<ProvisionedResource, ProvisioningError> {
		match request {
			ResourceRequest::Namespace(namespace) => self
				.namespace_with_cancel(namespace, cancel)
				.await
				.map(ProvisionedResource::Namespace),
			ResourceRequest::PersistentVolumeClaim(pvc) => self
				.pvc_with_cancel(pvc, cancel)
				.await
				.map(ProvisionedResource::PersistentVolumeClaim),
		}
	}

	/// Create `namespace` unless it already exists and return it.
	pub async fn ensure_namespace(
		&self,
		namespace: &Namespace,
	) -> Result<Namespace, ProvisioningError> {
		self.namespace_with_cancel(namespace, &CancellationToken::new())
			.await
	}

	/// Create `pvc` in its `metadata.namespace` unless it already exists and
	/// return it.
	pub async fn ensure_pvc(
		&self,
		pvc: &PersistentVolumeClaim,
	) -> Result<PersistentVolumeClaim, ProvisioningError> {
		self.pvc_with_cancel(pvc, &CancellationToken::new()).await
	}

	/// Single read of a namespace.
	pub async fn get_namespace(&self, name: &str) -> Result<Namespace, ProvisioningError> {
		self.client
			.get_namespace(name)
			.await
			.map_err(|source| ProvisioningError::Fatal {
				resource: ResourceId::cluster(ResourceKind::Namespace, name),
				phase: Phase::Read,
				source,
			})
	}

	/// Single read of a persistent volume claim.
	pub async fn get_pvc(
		&self,
		namespace: &str,
		name: &str,
	) -> Result<PersistentVolumeClaim, ProvisioningError> {
		self.client
			.get_pvc(namespace, name)
			.await
			.map_err(|source| ProvisioningError::Fatal {
				resource: ResourceId::namespaced(ResourceKind::PersistentVolumeClaim, namespace, name),
				phase: Phase::Read,
				source,
			})
	}

	async fn namespace_with_cancel(
		&self,
		namespace: &Namespace,
		cancel: &CancellationToken,
	) -> Result<Namespace, ProvisioningError> {
		let name = namespace_name(namespace)?;
		let id = ResourceId::cluster(ResourceKind::Namespace, name);
		self.create_and_confirm(
			id,
			cancel,
			|| self.client.create_namespace(namespace),
			|| self.client.get_namespace(name),
		)
		.await
	}

	async fn pvc_with_cancel(
		&self,
		pvc: &PersistentVolumeClaim,
		cancel: &CancellationToken,
	) -> Result<PersistentVolumeClaim, ProvisioningError> {
		let (namespace, name) = pvc_target(pvc)?;
		let id = ResourceId::namespaced(ResourceKind::PersistentVolumeClaim, namespace, name);
		self.create_and_confirm(
			id,
			cancel,
			|| self.client.create_pvc(namespace, pvc),
			|| self.client.get_pvc(namespace, name),
		)
		.await
	}

	#[instrument(skip_all, fields(resource = %id))]
	async fn create_and_confirm<T, C, CF, R, RF>(
		&self,
		id: ResourceId,
		cancel: &CancellationToken,
		mut create: C,
		read: R,
	) -> Result<T, ProvisioningError>
	where
		C: FnMut() -> CF,
		CF: Future<Output = Result<T, K8sError>>,
		R: FnOnce() -> RF,
		RF: Future<Output = Result<T, K8sError>>,
	{
		let execution = execute(&self.policy, cancel, || {
			let call = create();
			async move { to_attempt(call.await) }
		})
		.await;
		let attempts = execution.attempts();
		let elapsed_ms = execution.elapsed().as_millis() as u64;

		match execution.outcome {
			Outcome::Success(_) => debug!(attempts, "created, confirming"),
			Outcome::AlreadyExists => debug!(attempts, "already exists, confirming"),
			Outcome::Fatal(source) => {
				error!(attempts, error = %source, "provisioning failed");
				return Err(ProvisioningError::Fatal {
					resource: id,
					phase: Phase::Create,
					source,
				});
			}
			Outcome::Exhausted(source) => {
				error!(attempts, elapsed_ms, error = %source, "provisioning retries exhausted");
				return Err(ProvisioningError::Exhausted {
					resource: id,
					attempts,
					source,
				});
			}
			Outcome::Cancelled { last_cause } => {
				warn!(attempts, elapsed_ms, "provisioning cancelled");
				return Err(ProvisioningError::Cancelled {
					resource: id,
					attempts,
					last_cause,
				});
			}
		}

		match read().await {
			Ok(confirmed) => {
				info!(attempts, elapsed_ms, "resource provisioned");
				Ok(confirmed)
			}
			Err(source) => {
				error!(error = %source, "confirmatory read failed");
				Err(ProvisioningError::Fatal {
					resource: id,
					phase: Phase::Confirm,
					source,
				})
			}
		}
	}
}
