// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Injection error types.

use crate::api::resource::QuantityError;
use thiserror::Error;

/// Result type for injection operations.
pub type InjectResult<T> = Result<T, InjectError>;

/// InjectError represents errors that can occur while building the agent sidecar.
#[derive(Debug, Error)]
pub enum InjectError {
    /// A resource limit or request is not a valid quantity.
    #[error("invalid value for {field}: {source}")]
    InvalidResource {
        field: String,
        value: String,
        #[source]
        source: QuantityError,
    },

    /// The agent configuration could not be decoded.
    #[error("invalid agent configuration: {0}")]
    Config(String),
}

impl InjectError {
    /// Create a new InvalidResource error for the given field path.
    pub fn invalid_resource(
        field: impl Into<String>,
        value: impl Into<String>,
        source: QuantityError,
    ) -> Self {
        InjectError::InvalidResource {
            field: field.into(),
            value: value.into(),
            source,
        }
    }

    /// Create a new Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        InjectError::Config(msg.into())
    }

    /// Returns the underlying quantity error, if this is a resource error.
    pub fn quantity_error(&self) -> Option<&QuantityError> {
        match self {
            InjectError::InvalidResource { source, .. } => Some(source),
            InjectError::Config(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::resource::Quantity;

    #[test]
    fn test_invalid_resource_display() {
        let source = Quantity::parse("abc").unwrap_err();
        let err = InjectError::invalid_resource("limits.cpu", "abc", source);
        let msg = err.to_string();
        assert!(msg.starts_with("invalid value for limits.cpu"));
        assert!(msg.contains("\"abc\""));
        assert!(msg.contains("quantities must match the regular expression"));
    }

    #[test]
    fn test_quantity_error_accessor() {
        let source = Quantity::parse("1x").unwrap_err();
        let err = InjectError::invalid_resource("requests.memory", "1x", source.clone());
        assert_eq!(err.quantity_error(), Some(&source));
        match &err {
            InjectError::InvalidResource { field, value, .. } => {
                assert_eq!(field, "requests.memory");
                assert_eq!(value, "1x");
            }
            other => panic!("unexpected error: {}", other),
        }

        let err = InjectError::config("bad json");
        assert!(err.quantity_error().is_none());
        assert_eq!(err.to_string(), "invalid agent configuration: bad json");
    }
}
