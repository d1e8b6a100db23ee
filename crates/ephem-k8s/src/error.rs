// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use kube::core::ErrorResponse;
use thiserror::Error;

/// Result type alias for K8s operations.
pub type K8sResult<T> = Result<T, K8sError>;

/// Errors that can occur during K8s operations.
///
/// The variants mirror the status reasons the API server reports so the
/// classifier can decide between retrying, treating as success, or giving up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum K8sError {
	#[error("{kind} {name} already exists")]
	AlreadyExists { kind: String, name: String },

	#[error("{kind} {name} not found")]
	NotFound { kind: String, name: String },

	#[error("Write conflict: {message}")]
	Conflict { message: String },

	#[error("Request timed out: {message}")]
	Timeout {
		message: String,
		retry_after: Option<Duration>,
	},

	#[error("Too many requests: {message}")]
	TooManyRequests {
		message: String,
		retry_after: Option<Duration>,
	},

	#[error("Service unavailable: {message}")]
	ServiceUnavailable {
		message: String,
		retry_after: Option<Duration>,
	},

	#[error("Internal server error: {message}")]
	InternalError { message: String },

	#[error("Transport error: {message}")]
	Transport { message: String },

	#[error("Forbidden: {message}")]
	Forbidden { message: String },

	#[error("Unauthorized: {message}")]
	Unauthorized { message: String },

	#[error("Invalid object: {message}")]
	Invalid { message: String },

	#[error("K8s API error ({code} {reason}): {message}")]
	ApiError {
		code: u16,
		reason: String,
		message: String,
	},

	#[error("K8s client error: {message}")]
	Client { message: String },

	#[error("Object provided to create is empty")]
	EmptyObject,
}

impl K8sError {
	/// Server-suggested delay before retrying, if the error carried one.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			K8sError::Timeout { retry_after, .. }
			| K8sError::TooManyRequests { retry_after, .. }
			| K8sError::ServiceUnavailable { retry_after, .. } => *retry_after,
			_ => None,
		}
	}

	/// Map an API server status response for the object `kind`/`name`.
	pub fn from_status(response: ErrorResponse, kind: &str, name: &str) -> Self {
		let ErrorResponse {
			message,
			reason,
			code,
			..
		} = response;

		match (reason.as_str(), code) {
			("AlreadyExists", _) => K8sError::AlreadyExists {
				kind: kind.to_string(),
				name: name.to_string(),
			},
			("NotFound", _) | (_, 404) => K8sError::NotFound {
				kind: kind.to_string(),
				name: name.to_string(),
			},
			("Conflict", _) | (_, 409) => K8sError::Conflict { message },
			("Timeout" | "ServerTimeout", _) | (_, 408 | 504) => K8sError::Timeout {
				message,
				retry_after: None,
			},
			("TooManyRequests", _) | (_, 429) => K8sError::TooManyRequests {
				message,
				retry_after: None,
			},
			("ServiceUnavailable", _) | (_, 503) => K8sError::ServiceUnavailable {
				message,
				retry_after: None,
			},
			("InternalError", _) | (_, 500) => K8sError::InternalError { message },
			("Forbidden", _) | (_, 403) => K8sError::Forbidden { message },
			("Unauthorized", _) | (_, 401) => K8sError::Unauthorized { message },
			("Invalid" | "BadRequest", _) | (_, 400 | 422) => K8sError::Invalid { message },
			_ => K8sError::ApiError {
				code,
				reason,
				message,
			},
		}
	}

	/// Map any kube client error for the object `kind`/`name`.
	pub fn from_kube(err: kube::Error, kind: &str, name: &str) -> Self {
		match err {
			kube::Error::Api(response) => K8sError::from_status(response, kind, name),
			kube::Error::HyperError(e) => K8sError::Transport {
				message: e.to_string(),
			},
			kube::Error::Service(e) => K8sError::Transport {
				message: e.to_string(),
			},
			kube::Error::ReadEvents(e) => K8sError::Transport {
				message: e.to_string(),
			},
			other => K8sError::Client {
				message: other.to_string(),
			},
		}
	}
}

impl From<kube::Error> for K8sError {
	fn from(err: kube::Error) -> Self {
		K8sError::from_kube(err, "object", "<unknown>")
	}
}
