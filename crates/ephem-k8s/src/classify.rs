// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Error classification for create/read calls.

use crate::error::K8sError;

/// What a caller should do about a failed control-plane call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
	/// The object already exists by identity. Resolved as success.
	Conflict,
	/// Transient. Safe to try the same idempotent call again.
	Retryable,
	/// Permanent. Surface to the caller with the cause attached.
	Fatal,
}

const RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Classify an error returned by the K8s API.
///
/// Unrecognised errors are `Fatal` so permanent failures are never hidden
/// behind a retry loop.
pub fn classify(err: &K8sError) -> ErrorClass {
	match err {
		K8sError::AlreadyExists { .. } => ErrorClass::Conflict,

		K8sError::Timeout { .. }
		| K8sError::TooManyRequests { .. }
		| K8sError::ServiceUnavailable { .. }
		| K8sError::InternalError { .. }
		| K8sError::Transport { .. }
		| K8sError::Conflict { .. } => ErrorClass::Retryable,

		K8sError::ApiError { code, .. } if RETRYABLE_STATUS_CODES.contains(code) => {
			ErrorClass::Retryable
		}

		K8sError::NotFound { .. }
		| K8sError::Forbidden { .. }
		| K8sError::Unauthorized { .. }
		| K8sError::Invalid { .. }
		| K8sError::ApiError { .. }
		| K8sError::Client { .. }
		| K8sError::EmptyObject => ErrorClass::Fatal,
	}
}

impl K8sError {
	/// Shorthand for [`classify`].
	pub fn class(&self) -> ErrorClass {
		classify(self)
	}
}
