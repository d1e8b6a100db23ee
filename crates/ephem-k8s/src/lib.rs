// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! K8s client abstraction for ephemeral test environments.
//!
//! This crate provides:
//! - A trait-based K8s client abstraction for testability
//! - Production implementation using the kube crate
//! - A structured error type and its retry classification
//! - An in-memory client for tests

mod classify;
mod client;
mod error;
mod kube_client;
mod mock;
mod types;

pub use classify::{classify, ErrorClass};
pub use client::K8sClient;
pub use error::{K8sError, K8sResult};
pub use kube_client::KubeClient;
pub use mock::{MockK8sClient, Operation};
pub use types::{
	Namespace, ObjectMeta, PersistentVolumeClaim, PersistentVolumeClaimSpec, Quantity,
	VolumeResourceRequirements, NAMESPACE_KIND, PVC_KIND,
};
