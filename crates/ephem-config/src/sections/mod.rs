// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod environment;
mod logging;
mod retry;

pub use environment::{EnvironmentConfig, EnvironmentConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use retry::{RetryConfig, RetryConfigLayer};
