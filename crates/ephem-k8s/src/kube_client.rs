// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use kube::{
	api::{Api, DeleteParams, PostParams},
	Client,
};
use tracing::{debug, instrument};

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::types::{Namespace, PersistentVolumeClaim, NAMESPACE_KIND, PVC_KIND};

/// Production K8s client implementation using the kube crate.
pub struct KubeClient {
	client: Client,
}

impl KubeClient {
	/// Create a new KubeClient that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. In-cluster service account (when running in K8s)
	/// 2. KUBECONFIG environment variable
	/// 3. ~/.kube/config
	pub async fn new() -> Result<Self, K8sError> {
		let client = Client::try_default().await?;
		debug!("K8s client initialized");
		Ok(Self { client })
	}

	/// Wrap an already configured kube client.
	pub fn from_client(client: Client) -> Self {
		Self { client }
	}
}

fn object_name(name: &Option<String>) -> &str {
	name.as_deref().unwrap_or("<unnamed>")
}

#[async_trait]
impl K8sClient for KubeClient {
	#[instrument(skip_all, fields(name = object_name(&namespace.metadata.name)))]
	async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, K8sError> {
		let namespaces: Api<Namespace> = Api::all(self.client.clone());
		namespaces
			.create(&PostParams::default(), namespace)
			.await
			.map_err(|e| {
				K8sError::from_kube(e, NAMESPACE_KIND, object_name(&namespace.metadata.name))
			})
	}

	#[instrument(skip(self))]
	async fn get_namespace(&self, name: &str) -> Result<Namespace, K8sError> {
		let namespaces: Api<Namespace> = Api::all(self.client.clone());
		namespaces
			.get(name)
			.await
			.map_err(|e| K8sError::from_kube(e, NAMESPACE_KIND, name))
	}

	#[instrument(skip(self))]
	async fn delete_namespace(
		&self,
		name: &str,
		grace_period_seconds: u32,
	) -> Result<(), K8sError> {
		let namespaces: Api<Namespace> = Api::all(self.client.clone());
		let dp = DeleteParams {
			grace_period_seconds: Some(grace_period_seconds),
			..Default::default()
		};
		namespaces
			.delete(name, &dp)
			.await
			.map(|_| ())
			.map_err(|e| K8sError::from_kube(e, NAMESPACE_KIND, name))
	}

	#[instrument(skip(self, pvc), fields(name = object_name(&pvc.metadata.name)))]
	async fn create_pvc(
		&self,
		namespace: &str,
		pvc: &PersistentVolumeClaim,
	) -> Result<PersistentVolumeClaim, K8sError> {
		let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
		pvcs
			.create(&PostParams::default(), pvc)
			.await
			.map_err(|e| K8sError::from_kube(e, PVC_KIND, object_name(&pvc.metadata.name)))
	}

	#[instrument(skip(self))]
	async fn get_pvc(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim, K8sError> {
		let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
		pvcs
			.get(name)
			.await
			.map_err(|e| K8sError::from_kube(e, PVC_KIND, name))
	}
}
