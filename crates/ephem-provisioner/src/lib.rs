// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retry-driven provisioning of ephemeral K8s test environments.
//!
//! # Architecture
//!
//! Calls flow one way:
//!
//! - [`EnvironmentManager`] creates a namespace per unit of work and deletes
//!   it in the background afterwards
//! - [`Provisioner`] creates a resource through the retry engine, then reads
//!   it back once
//! - `ephem-common-retry` runs the backoff loop
//! - `ephem-k8s` classifies each API error as conflict, retryable or fatal

pub mod environment;
pub mod error;
pub mod logging;
pub mod provisioner;
pub mod types;

pub use environment::{
	generate_namespace_name, Environment, EnvironmentManager, TeardownHandle, BASE_NAME_LABEL,
	MANAGED_LABEL,
};
pub use error::{Phase, ProvisioningError, TeardownError, ValidationError};
pub use logging::init_logging;
pub use provisioner::Provisioner;
pub use types::{ProvisionedResource, ResourceId, ResourceKind, ResourceRequest};

pub use ephem_common_retry::{CancellationToken, RetryPolicy};
pub use ephem_config::ProvisionerConfig;
