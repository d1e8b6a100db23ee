// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{NamespaceStatus, PersistentVolumeClaimStatus};

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::types::{Namespace, PersistentVolumeClaim, NAMESPACE_KIND, PVC_KIND};

/// The calls [`MockK8sClient`] can script and count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	CreateNamespace,
	GetNamespace,
	DeleteNamespace,
	CreatePvc,
	GetPvc,
}

#[derive(Default)]
struct MockState {
	namespaces: BTreeMap<String, Namespace>,
	pvcs: BTreeMap<(String, String), PersistentVolumeClaim>,
	failures: HashMap<Operation, VecDeque<K8sError>>,
	calls: HashMap<Operation, u32>,
	next_version: u64,
}

impl MockState {
	/// Count the call, then hand back the next scripted failure if any.
	fn begin(&mut self, op: Operation) -> Result<(), K8sError> {
		*self.calls.entry(op).or_default() += 1;
		match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}

	fn stamp(&mut self) -> (String, String) {
		self.next_version += 1;
		(
			self.next_version.to_string(),
			format!("00000000-0000-0000-0000-{:012}", self.next_version),
		)
	}
}

/// In-memory K8s control plane for tests.
///
/// Objects are kept per identity, so a second create of the same name fails
/// with `AlreadyExists` like the real API server. Failures can be queued per
/// operation and are returned in FIFO order before the store is touched.
#[derive(Clone, Default)]
pub struct MockK8sClient {
	state: Arc<Mutex<MockState>>,
}

impl MockK8sClient {
	pub fn new() -> Self {
		Self::default()
	}

	fn state(&self) -> MutexGuard<'_, MockState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Queue `err` as the result of the next call to `op`.
	pub fn fail_next(&self, op: Operation, err: K8sError) {
		self.state().failures.entry(op).or_default().push_back(err);
	}

	/// Queue `err` for the next `times` calls to `op`.
	pub fn fail_times(&self, op: Operation, err: K8sError, times: usize) {
		let mut state = self.state();
		let queue = state.failures.entry(op).or_default();
		queue.extend(std::iter::repeat(err).take(times));
	}

	/// Number of calls made to `op`, failed ones included.
	pub fn calls(&self, op: Operation) -> u32 {
		self.state().calls.get(&op).copied().unwrap_or(0)
	}

	/// Number of calls across all operations.
	pub fn total_calls(&self) -> u32 {
		self.state().calls.values().sum()
	}

	/// Names of every stored namespace, sorted.
	pub fn namespace_names(&self) -> Vec<String> {
		self.state().namespaces.keys().cloned().collect()
	}

	/// Names of the stored claims in `namespace`, sorted.
	pub fn pvc_names(&self, namespace: &str) -> Vec<String> {
		self.state()
			.pvcs
			.keys()
			.filter(|(ns, _)| ns == namespace)
			.map(|(_, name)| name.clone())
			.collect()
	}
}

fn required_name(name: &Option<String>) -> Result<String, K8sError> {
	match name.as_deref() {
		Some(name) if !name.is_empty() => Ok(name.to_string()),
		_ => Err(K8sError::Invalid {
			message: "metadata.name: Required value: name is required".to_string(),
		}),
	}
}

#[async_trait]
impl K8sClient for MockK8sClient {
	async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, K8sError> {
		let mut state = self.state();
		state.begin(Operation::CreateNamespace)?;
		let name = required_name(&namespace.metadata.name)?;
		if state.namespaces.contains_key(&name) {
			return Err(K8sError::AlreadyExists {
				kind: NAMESPACE_KIND.to_string(),
				name,
			});
		}

		let (version, uid) = state.stamp();
		let mut stored = namespace.clone();
		stored.metadata.resource_version = Some(version);
		stored.metadata.uid = Some(uid);
		stored.status = Some(NamespaceStatus {
			phase: Some("Active".to_string()),
			..Default::default()
		});
		state.namespaces.insert(name, stored.clone());
		Ok(stored)
	}

	async fn get_namespace(&self, name: &str) -> Result<Namespace, K8sError> {
		let mut state = self.state();
		state.begin(Operation::GetNamespace)?;
		state
			.namespaces
			.get(name)
			.cloned()
			.ok_or_else(|| K8sError::NotFound {
				kind: NAMESPACE_KIND.to_string(),
				name: name.to_string(),
			})
	}

	async fn delete_namespace(
		&self,
		name: &str,
		_grace_period_seconds: u32,
	) -> Result<(), K8sError> {
		let mut state = self.state();
		state.begin(Operation::DeleteNamespace)?;
		if state.namespaces.remove(name).is_none() {
			return Err(K8sError::NotFound {
				kind: NAMESPACE_KIND.to_string(),
				name: name.to_string(),
			});
		}
		state.pvcs.retain(|(ns, _), _| ns != name);
		Ok(())
	}

	async fn create_pvc(
		&self,
		namespace: &str,
		pvc: &PersistentVolumeClaim,
	) -> Result<PersistentVolumeClaim, K8sError> {
		let mut state = self.state();
		state.begin(Operation::CreatePvc)?;
		let name = required_name(&pvc.metadata.name)?;
		if !state.namespaces.contains_key(namespace) {
			return Err(K8sError::NotFound {
				kind: NAMESPACE_KIND.to_string(),
				name: namespace.to_string(),
			});
		}
		let key = (namespace.to_string(), name);
		if state.pvcs.contains_key(&key) {
			return Err(K8sError::AlreadyExists {
				kind: PVC_KIND.to_string(),
				name: key.1,
			});
		}

		let (version, uid) = state.stamp();
		let mut stored = pvc.clone();
		stored.metadata.namespace = Some(namespace.to_string());
		stored.metadata.resource_version = Some(version);
		stored.metadata.uid = Some(uid);
		stored.status = Some(PersistentVolumeClaimStatus {
			phase: Some("Pending".to_string()),
			..Default::default()
		});
		state.pvcs.insert(key, stored.clone());
		Ok(stored)
	}

	async fn get_pvc(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim, K8sError> {
		let mut state = self.state();
		state.begin(Operation::GetPvc)?;
		state
			.pvcs
			.get(&(namespace.to_string(), name.to_string()))
			.cloned()
			.ok_or_else(|| K8sError::NotFound {
				kind: PVC_KIND.to_string(),
				name: name.to_string(),
			})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::ObjectMeta;

	fn namespace(name: &str) -> Namespace {
		Namespace {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				..Default::default()
			},
			..Default::default()
		}
	}

	fn pvc(name: &str) -> PersistentVolumeClaim {
		PersistentVolumeClaim {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				..Default::default()
			},
			..Default::default()
		}
	}

	#[tokio::test]
	async fn create_then_get_returns_stamped_object() {
		let client = MockK8sClient::new();
		let created = client.create_namespace(&namespace("e2e-tests-a")).await.unwrap();
		let fetched = client.get_namespace("e2e-tests-a").await.unwrap();

		assert_eq!(created, fetched);
		assert_eq!(fetched.metadata.resource_version.as_deref(), Some("1"));
		assert!(fetched.metadata.uid.is_some());
	}

	#[tokio::test]
	async fn duplicate_create_reports_already_exists() {
		let client = MockK8sClient::new();
		client.create_namespace(&namespace("dup")).await.unwrap();
		let err = client.create_namespace(&namespace("dup")).await.unwrap_err();

		assert!(matches!(err, K8sError::AlreadyExists { .. }));
		assert_eq!(client.calls(Operation::CreateNamespace), 2);
	}

	#[tokio::test]
	async fn scripted_failures_come_out_in_order() {
		let client = MockK8sClient::new();
		client.fail_next(
			Operation::GetNamespace,
			K8sError::InternalError {
				message: "first".to_string(),
			},
		);
		client.fail_next(Operation::GetNamespace, K8sError::EmptyObject);

		assert!(matches!(
			client.get_namespace("x").await,
			Err(K8sError::InternalError { .. })
		));
		assert_eq!(client.get_namespace("x").await, Err(K8sError::EmptyObject));
		assert!(matches!(
			client.get_namespace("x").await,
			Err(K8sError::NotFound { .. })
		));
		assert_eq!(client.calls(Operation::GetNamespace), 3);
	}

	#[tokio::test]
	async fn pvc_requires_parent_namespace() {
		let client = MockK8sClient::new();
		let err = client.create_pvc("missing", &pvc("data")).await.unwrap_err();
		assert_eq!(
			err,
			K8sError::NotFound {
				kind: NAMESPACE_KIND.to_string(),
				name: "missing".to_string(),
			}
		);
	}

	#[tokio::test]
	async fn deleting_namespace_drops_its_claims() {
		let client = MockK8sClient::new();
		client.create_namespace(&namespace("ns")).await.unwrap();
		let created = client.create_pvc("ns", &pvc("data")).await.unwrap();
		assert_eq!(created.metadata.namespace.as_deref(), Some("ns"));
		assert_eq!(client.pvc_names("ns"), vec!["data".to_string()]);

		client.delete_namespace("ns", 0).await.unwrap();
		assert!(client.namespace_names().is_empty());
		assert!(client.pvc_names("ns").is_empty());
		assert!(matches!(
			client.delete_namespace("ns", 0).await,
			Err(K8sError::NotFound { .. })
		));
	}

	#[tokio::test]
	async fn unnamed_objects_are_invalid() {
		let client = MockK8sClient::new();
		let err = client.create_namespace(&Namespace::default()).await.unwrap_err();
		assert!(matches!(err, K8sError::Invalid { .. }));
	}
}
