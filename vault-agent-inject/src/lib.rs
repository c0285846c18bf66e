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

//! Vault Agent sidecar injection for Kubernetes pods.
//!
//! This crate builds the `vault-agent` container that a mutating admission
//! webhook appends to a pod: resource quantities are validated, the mount set
//! and startup command are derived from the agent configuration, and an optional
//! pre-stop hook revokes the agent token when the pod shuts down.
//!
//! The webhook server, annotation parsing and apiserver interaction live
//! outside this crate.

pub mod agent;
pub mod api;

// Re-export commonly used types
pub use agent::{Agent, InjectError, InjectResult, Vault};
pub use api::core::{Container, EnvVar, Lifecycle, ResourceRequirements, VolumeMount};
pub use api::resource::{parse_quantity, Quantity, QuantityError};
