// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::K8sError;
use crate::types::{Namespace, PersistentVolumeClaim};

/// Trait for K8s client operations.
///
/// Every call performs a single request. Retrying is left to the caller so
/// that each failure can be classified first.
#[async_trait]
pub trait K8sClient: Send + Sync {
	/// Create a cluster-scoped namespace.
	async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, K8sError>;

	/// Get a namespace by name.
	async fn get_namespace(&self, name: &str) -> Result<Namespace, K8sError>;

	/// Delete a namespace and everything in it.
	async fn delete_namespace(&self, name: &str, grace_period_seconds: u32)
		-> Result<(), K8sError>;

	/// Create a persistent volume claim in the specified namespace.
	async fn create_pvc(
		&self,
		namespace: &str,
		pvc: &PersistentVolumeClaim,
	) -> Result<PersistentVolumeClaim, K8sError>;

	/// Get a persistent volume claim by name from the specified namespace.
	async fn get_pvc(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim, K8sError>;
}
