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

//! Core Kubernetes API types (Container, VolumeMount, Lifecycle, etc.)
//!
//! Field names serialize in camelCase so that a [`Container`] can be embedded
//! directly in a `core/v1` Pod manifest.

use crate::api::resource::Quantity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Resource Types
// ============================================================================

/// Resource name for CPU, in cores.
pub const RESOURCE_CPU: &str = "cpu";

/// Resource name for memory, in bytes.
pub const RESOURCE_MEMORY: &str = "memory";

/// ResourceList is a map of resource names to validated quantities.
/// A resource that is not set is absent from the map.
pub type ResourceList = BTreeMap<String, Quantity>;

/// ResourceRequirements describes the compute resource requirements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    /// Limits describes the maximum amount of compute resources allowed.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: ResourceList,
    /// Requests describes the minimum amount of compute resources required.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: ResourceList,
}

// ============================================================================
// Environment
// ============================================================================

/// EnvVar represents an environment variable present in a container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Name of the environment variable.
    pub name: String,
    /// Value of the environment variable.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl EnvVar {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

// ============================================================================
// Volume Mounts
// ============================================================================

/// VolumeMount describes a mounting of a Volume within a container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    /// This must match the Name of a Volume.
    pub name: String,
    /// Path within the container at which the volume should be mounted.
    pub mount_path: String,
    /// Mounted read-only if true, read-write otherwise.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

impl VolumeMount {
    /// Create a new volume mount.
    pub fn new(name: &str, mount_path: &str, read_only: bool) -> Self {
        Self {
            name: name.to_string(),
            mount_path: mount_path.to_string(),
            read_only,
        }
    }
}

// ============================================================================
// Security Context
// ============================================================================

/// SecurityContext holds security configuration that will be applied to a container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContext {
    /// The UID to run the entrypoint of the container process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<i64>,
    /// The GID to run the entrypoint of the container process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_group: Option<i64>,
    /// Indicates that the container must run as a non-root user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_non_root: Option<bool>,
}

// ============================================================================
// Lifecycle
// ============================================================================

/// ExecAction describes a "run in container" action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecAction {
    /// Command line to execute inside the container. It is not run in a shell;
    /// to use shell instructions, call out to the shell explicitly.
    #[serde(default)]
    pub command: Vec<String>,
}

/// LifecycleHandler defines a specific action that should be taken in a lifecycle hook.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleHandler {
    /// Exec specifies the action to take.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecAction>,
}

impl LifecycleHandler {
    /// Create a handler that executes the given command.
    pub fn exec(command: Vec<String>) -> Self {
        Self {
            exec: Some(ExecAction { command }),
        }
    }
}

/// Lifecycle describes actions that the management system should take in
/// response to container lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lifecycle {
    /// Called immediately before a container is terminated. The container is
    /// terminated after the handler completes, or when the pod's termination
    /// grace period expires, whichever comes first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_stop: Option<LifecycleHandler>,
}

impl Lifecycle {
    /// Returns true if no hook is attached.
    pub fn is_empty(&self) -> bool {
        self.pre_stop.is_none()
    }
}

// ============================================================================
// Container
// ============================================================================

/// Container represents a single container in a pod.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Name of the container.
    pub name: String,
    /// Container image name.
    pub image: String,
    /// Entrypoint array.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Arguments to the entrypoint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// List of environment variables to set in the container.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    /// Compute Resources required by this container.
    #[serde(default)]
    pub resources: ResourceRequirements,
    /// Pod volumes to mount into the container's filesystem.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
    /// Actions that the management system should take in response to container lifecycle events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<Lifecycle>,
    /// Security options the container should be run with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lifecycle_is_empty() {
        assert!(Lifecycle::default().is_empty());

        let lifecycle = Lifecycle {
            pre_stop: Some(LifecycleHandler::exec(vec!["true".to_string()])),
        };
        assert!(!lifecycle.is_empty());
    }

    #[test]
    fn test_container_serializes_camel_case() {
        let mut container = Container {
            name: "sidecar".to_string(),
            image: "busybox".to_string(),
            ..Default::default()
        };
        container.volume_mounts = vec![
            VolumeMount::new("data", "/data", false),
            VolumeMount::new("config", "/etc/config", true),
        ];
        container.security_context = Some(SecurityContext {
            run_as_non_root: Some(true),
            ..Default::default()
        });
        container
            .resources
            .limits
            .insert(RESOURCE_CPU.to_string(), Quantity::parse("500m").unwrap());

        let value = serde_json::to_value(&container).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "sidecar",
                "image": "busybox",
                "resources": { "limits": { "cpu": "500m" } },
                "volumeMounts": [
                    { "name": "data", "mountPath": "/data" },
                    { "name": "config", "mountPath": "/etc/config", "readOnly": true }
                ],
                "securityContext": { "runAsNonRoot": true }
            })
        );
    }

    #[test]
    fn test_container_deserializes() {
        let container: Container = serde_json::from_value(json!({
            "name": "app",
            "image": "nginx",
            "env": [{ "name": "FOO", "value": "bar" }],
            "resources": { "requests": { "memory": "64Mi" } }
        }))
        .unwrap();

        assert_eq!(container.env, vec![EnvVar::new("FOO", "bar")]);
        assert_eq!(
            container.resources.requests[RESOURCE_MEMORY].value(),
            64 * 1024 * 1024
        );
    }
}
