// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioner error types.

use std::fmt;

use ephem_k8s::{ErrorClass, K8sError};

use crate::types::{ResourceId, ResourceKind};

/// A request that cannot be sent. Raised before any API call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	#[error("{kind} request has no metadata.name")]
	MissingName { kind: ResourceKind },

	#[error("PersistentVolumeClaim {name} has no metadata.namespace")]
	MissingNamespace { name: String },

	#[error("PersistentVolumeClaim {name} has no spec")]
	MissingSpec { name: String },

	#[error("PersistentVolumeClaim {name} targets namespace {namespace}, not environment {environment}")]
	OutsideEnvironment {
		name: String,
		namespace: String,
		environment: String,
	},
}

/// The call that produced a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Create,
	/// The read that follows a successful or already-existing create.
	Confirm,
	/// A standalone read helper.
	Read,
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Phase::Create => f.write_str("create"),
			Phase::Confirm => f.write_str("confirmatory read"),
			Phase::Read => f.write_str("read"),
		}
	}
}

/// Errors that can occur while provisioning a resource.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
	/// The request was rejected before entering the retry loop
	#[error("invalid resource request: {0}")]
	Validation(#[from] ValidationError),

	/// A non-retryable API error
	#[error("{phase} of {resource} failed: {source}")]
	Fatal {
		resource: ResourceId,
		phase: Phase,
		#[source]
		source: K8sError,
	},

	/// Only transient errors were seen until the retry budget ran out
	#[error("{resource} not provisioned after {attempts} attempts: {source}")]
	Exhausted {
		resource: ResourceId,
		attempts: u32,
		#[source]
		source: K8sError,
	},

	/// The caller cancelled while waiting between attempts
	#[error("provisioning of {resource} cancelled after {attempts} attempts")]
	Cancelled {
		resource: ResourceId,
		attempts: u32,
		#[source]
		last_cause: Option<K8sError>,
	},
}

impl ProvisioningError {
	/// The resource the error is about. `None` for validation failures.
	pub fn resource(&self) -> Option<&ResourceId> {
		match self {
			ProvisioningError::Validation(_) => None,
			ProvisioningError::Fatal { resource, .. }
			| ProvisioningError::Exhausted { resource, .. }
			| ProvisioningError::Cancelled { resource, .. } => Some(resource),
		}
	}

	/// The underlying API error, if one was observed.
	pub fn cause(&self) -> Option<&K8sError> {
		match self {
			ProvisioningError::Validation(_) => None,
			ProvisioningError::Fatal { source, .. } | ProvisioningError::Exhausted { source, .. } => {
				Some(source)
			}
			ProvisioningError::Cancelled { last_cause, .. } => last_cause.as_ref(),
		}
	}

	/// Classification of the underlying API error.
	pub fn class(&self) -> Option<ErrorClass> {
		self.cause().map(K8sError::class)
	}

	/// True when the retry budget ran out on transient errors.
	pub fn is_retryable_exhaustion(&self) -> bool {
		matches!(self, ProvisioningError::Exhausted { .. })
	}
}

/// Errors reported by a background teardown.
#[derive(Debug, thiserror::Error)]
pub enum TeardownError {
	#[error("failed to delete namespace {namespace}: {source}")]
	Delete {
		namespace: String,
		#[source]
		source: K8sError,
	},

	#[error("gave up deleting namespace {namespace} after {attempts} attempts: {source}")]
	Exhausted {
		namespace: String,
		attempts: u32,
		#[source]
		source: K8sError,
	},

	#[error("deletion of namespace {namespace} cancelled after {attempts} attempts")]
	Cancelled {
		namespace: String,
		attempts: u32,
		#[source]
		last_cause: Option<K8sError>,
	},

	#[error("teardown task for namespace {namespace} did not complete: {message}")]
	Join { namespace: String, message: String },
}
