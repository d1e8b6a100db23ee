// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource requests and their identities.

use std::fmt;

use ephem_k8s::{Namespace, PersistentVolumeClaim, NAMESPACE_KIND, PVC_KIND};

use crate::error::ValidationError;

/// Kinds of resource the provisioner knows how to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
	Namespace,
	PersistentVolumeClaim,
}

impl ResourceKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ResourceKind::Namespace => NAMESPACE_KIND,
			ResourceKind::PersistentVolumeClaim => PVC_KIND,
		}
	}
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Identity of a resource: kind, namespace (for namespaced kinds) and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
	pub kind: ResourceKind,
	pub namespace: Option<String>,
	pub name: String,
}

impl ResourceId {
	pub fn cluster(kind: ResourceKind, name: impl Into<String>) -> Self {
		Self {
			kind,
			namespace: None,
			name: name.into(),
		}
	}

	pub fn namespaced(
		kind: ResourceKind,
		namespace: impl Into<String>,
		name: impl Into<String>,
	) -> Self {
		Self {
			kind,
			namespace: Some(namespace.into()),
			name: name.into(),
		}
	}
}

impl fmt::Display for ResourceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.namespace {
			Some(namespace) => write!(f, "{}/{}/{}", self.kind, namespace, self.name),
			None => write!(f, "{}/{}", self.kind, self.name),
		}
	}
}

/// What to create. The payload is sent to the API server as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceRequest {
	Namespace(Namespace),
	PersistentVolumeClaim(PersistentVolumeClaim),
}

impl ResourceRequest {
	pub fn kind(&self) -> ResourceKind {
		match self {
			ResourceRequest::Namespace(_) => ResourceKind::Namespace,
			ResourceRequest::PersistentVolumeClaim(_) => ResourceKind::PersistentVolumeClaim,
		}
	}

	/// Check the request is complete enough to send and return its identity.
	pub fn validate(&self) -> Result<ResourceId, ValidationError> {
		match self {
			ResourceRequest::Namespace(namespace) => {
				namespace_name(namespace).map(|name| ResourceId::cluster(ResourceKind::Namespace, name))
			}
			ResourceRequest::PersistentVolumeClaim(pvc) => pvc_target(pvc).map(|(namespace, name)| {
				ResourceId::namespaced(ResourceKind::PersistentVolumeClaim, namespace, name)
			}),
		}
	}
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|v| !v.is_empty())
}

pub(crate) fn namespace_name(namespace: &Namespace) -> Result<&str, ValidationError> {
	non_empty(&namespace.metadata.name).ok_or(ValidationError::MissingName {
		kind: ResourceKind::Namespace,
	})
}

/// Namespace and name of a claim, both required.
pub(crate) fn pvc_target(pvc: &PersistentVolumeClaim) -> Result<(&str, &str), ValidationError> {
	let name = non_empty(&pvc.metadata.name).ok_or(ValidationError::MissingName {
		kind: ResourceKind::PersistentVolumeClaim,
	})?;
	let namespace = non_empty(&pvc.metadata.namespace).ok_or_else(|| {
		ValidationError::MissingNamespace {
			name: name.to_string(),
		}
	})?;
	if pvc.spec.is_none() {
		return Err(ValidationError::MissingSpec {
			name: name.to_string(),
		});
	}
	Ok((namespace, name))
}

/// The authoritative object read back after provisioning.
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionedResource {
	Namespace(Namespace),
	PersistentVolumeClaim(PersistentVolumeClaim),
}

impl ProvisionedResource {
	pub fn kind(&self) -> ResourceKind {
		match self {
			ProvisionedResource::Namespace(_) => ResourceKind::Namespace,
			ProvisionedResource::PersistentVolumeClaim(_) => ResourceKind::PersistentVolumeClaim,
		}
	}

	pub fn resource_version(&self) -> Option<&str> {
		match self {
			ProvisionedResource::Namespace(ns) => ns.metadata.resource_version.as_deref(),
			ProvisionedResource::PersistentVolumeClaim(pvc) => pvc.metadata.resource_version.as_deref(),
		}
	}

	pub fn into_namespace(self) -> Option<Namespace> {
		match self {
			ProvisionedResource::Namespace(ns) => Some(ns),
			ProvisionedResource::PersistentVolumeClaim(_) => None,
		}
	}

	pub fn into_pvc(self) -> Option<PersistentVolumeClaim> {
		match self {
			ProvisionedResource::PersistentVolumeClaim(pvc) => Some(pvc),
			ProvisionedResource::Namespace(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ephem_k8s::{ObjectMeta, PersistentVolumeClaimSpec};
	use proptest::prelude::*;

	fn pvc(namespace: Option<&str>, name: Option<&str>, with_spec: bool) -> PersistentVolumeClaim {
		PersistentVolumeClaim {
			metadata: ObjectMeta {
				name: name.map(str::to_string),
				namespace: namespace.map(str::to_string),
				..Default::default()
			},
			spec: with_spec.then(PersistentVolumeClaimSpec::default),
			..Default::default()
		}
	}

	#[test]
	fn ids_render_with_namespace_when_present() {
		let id = ResourceId::namespaced(ResourceKind::PersistentVolumeClaim, "ns", "data");
		assert_eq!(id.to_string(), "PersistentVolumeClaim/ns/data");
		let id = ResourceId::cluster(ResourceKind::Namespace, "ns");
		assert_eq!(id.to_string(), "Namespace/ns");
	}

	#[test]
	fn complete_pvc_request_validates() {
		let request = ResourceRequest::PersistentVolumeClaim(pvc(Some("ns"), Some("data"), true));
		assert_eq!(
			request.validate().unwrap(),
			ResourceId::namespaced(ResourceKind::PersistentVolumeClaim, "ns", "data")
		);
	}

	#[test]
	fn empty_requests_are_rejected() {
		let request = ResourceRequest::Namespace(Namespace::default());
		assert_eq!(
			request.validate(),
			Err(ValidationError::MissingName {
				kind: ResourceKind::Namespace
			})
		);

		let request = ResourceRequest::PersistentVolumeClaim(pvc(Some("ns"), Some(""), true));
		assert!(matches!(
			request.validate(),
			Err(ValidationError::MissingName { .. })
		));
	}

	#[test]
	fn pvc_needs_namespace_and_spec() {
		let request = ResourceRequest::PersistentVolumeClaim(pvc(None, Some("data"), true));
		assert!(matches!(
			request.validate(),
			Err(ValidationError::MissingNamespace { .. })
		));

		let request = ResourceRequest::PersistentVolumeClaim(pvc(Some("ns"), Some("data"), false));
		assert!(matches!(
			request.validate(),
			Err(ValidationError::MissingSpec { .. })
		));
	}

	fn field() -> impl Strategy<Value = Option<String>> {
		proptest::option::of("[a-z0-9-]{0,8}")
	}

	proptest! {
		#[test]
		fn pvc_validates_only_when_complete(
			namespace in field(),
			name in field(),
			with_spec in any::<bool>(),
		) {
			let request = ResourceRequest::PersistentVolumeClaim(pvc(
				namespace.as_deref(),
				name.as_deref(),
				with_spec,
			));
			let has_name = name.as_deref().is_some_and(|n| !n.is_empty());
			let has_namespace = namespace.as_deref().is_some_and(|n| !n.is_empty());

			match request.validate() {
				Ok(id) => {
					prop_assert!(has_name && has_namespace && with_spec);
					prop_assert_eq!(Some(id.name), name);
					prop_assert_eq!(id.namespace, namespace);
				}
				Err(ValidationError::MissingName { .. }) => prop_assert!(!has_name),
				Err(ValidationError::MissingNamespace { .. }) => {
					prop_assert!(has_name && !has_namespace)
				}
				Err(ValidationError::MissingSpec { .. }) => {
					prop_assert!(has_name && has_namespace && !with_spec)
				}
				Err(other) => prop_assert!(false, "unexpected {other:?}"),
			}
		}

		#[test]
		fn namespace_validates_iff_named(name in field()) {
			let request = ResourceRequest::Namespace(Namespace {
				metadata: ObjectMeta {
					name: name.clone(),
					..Default::default()
				},
				..Default::default()
			});
			let has_name = name.as_deref().is_some_and(|n| !n.is_empty());
			prop_assert_eq!(request.validate().is_ok(), has_name);
		}
	}
}
