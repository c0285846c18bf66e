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

//! Sidecar container assembly.

use super::errors::{InjectError, InjectResult};
use super::{
    Agent, CONFIG_VOLUME_NAME, CONFIG_VOLUME_PATH, DEFAULT_CONTAINER_ARG, SECRET_VOLUME_NAME,
    SECRET_VOLUME_PATH, TLS_SECRET_VOLUME_NAME, TLS_SECRET_VOLUME_PATH, TOKEN_FILE,
};
use crate::api::core::{
    Container, EnvVar, ResourceList, ResourceRequirements, SecurityContext, VolumeMount,
    RESOURCE_CPU, RESOURCE_MEMORY,
};
use crate::api::resource::parse_quantity;
use tracing::{debug, warn};

/// Name of the injected sidecar container.
pub const AGENT_CONTAINER_NAME: &str = "vault-agent";

/// UID the agent runs as.
pub const AGENT_USER_ID: i64 = 100;

/// GID the agent runs as.
pub const AGENT_GROUP_ID: i64 = 1000;

impl Agent {
    /// Build the `vault-agent` sidecar container for the pod being mutated.
    ///
    /// `env` is the already materialized environment for the agent and is used
    /// as is. The only failure is an invalid resource quantity, in which case
    /// no container is returned.
    pub fn container_sidecar(&self, env: Vec<EnvVar>) -> InjectResult<Container> {
        let resources = self.parse_resources()?;
        let lifecycle = self.create_lifecycle();

        Ok(Container {
            name: AGENT_CONTAINER_NAME.to_string(),
            image: self.image_name.clone(),
            command: vec!["/bin/sh".to_string(), "-ec".to_string()],
            args: vec![self.container_arg()],
            env,
            resources,
            volume_mounts: self.volume_mounts(),
            lifecycle: Some(lifecycle),
            security_context: Some(SecurityContext {
                run_as_user: Some(AGENT_USER_ID),
                run_as_group: Some(AGENT_GROUP_ID),
                run_as_non_root: Some(true),
            }),
        })
    }

    /// Startup argument for the agent. A config map replaces the base64
    /// configuration passed through the environment.
    fn container_arg(&self) -> String {
        if self.config_map_name.is_empty() {
            return DEFAULT_CONTAINER_ARG.to_string();
        }
        format!(
            "touch {} && vault agent -config={}/config.hcl",
            TOKEN_FILE, CONFIG_VOLUME_PATH
        )
    }

    fn volume_mounts(&self) -> Vec<VolumeMount> {
        let mut mounts = vec![
            VolumeMount::new(SECRET_VOLUME_NAME, SECRET_VOLUME_PATH, false),
            VolumeMount::new(&self.service_account_name, &self.service_account_path, true),
        ];

        if !self.config_map_name.is_empty() {
            debug!(config_map = %self.config_map_name, "mounting agent config map");
            mounts.push(VolumeMount::new(CONFIG_VOLUME_NAME, CONFIG_VOLUME_PATH, true));
        }

        if !self.vault.tls_secret.is_empty() {
            debug!(tls_secret = %self.vault.tls_secret, "mounting vault TLS secret");
            mounts.push(VolumeMount::new(
                TLS_SECRET_VOLUME_NAME,
                TLS_SECRET_VOLUME_PATH,
                true,
            ));
        }

        mounts
    }

    /// Validate the resource limits and requests.
    ///
    /// Fields are checked in the order limits.cpu, limits.memory, requests.cpu,
    /// requests.memory and the first invalid one is returned. Unset fields are
    /// left out of the result.
    // Valid resource notations: https://kubernetes.io/docs/concepts/configuration/manage-compute-resources-container/#meaning-of-cpu
    pub fn parse_resources(&self) -> InjectResult<ResourceRequirements> {
        let mut limits = ResourceList::new();
        insert_quantity(&mut limits, "limits", RESOURCE_CPU, &self.limits_cpu)?;
        insert_quantity(&mut limits, "limits", RESOURCE_MEMORY, &self.limits_mem)?;

        let mut requests = ResourceList::new();
        insert_quantity(&mut requests, "requests", RESOURCE_CPU, &self.requests_cpu)?;
        insert_quantity(&mut requests, "requests", RESOURCE_MEMORY, &self.requests_mem)?;

        Ok(ResourceRequirements { limits, requests })
    }
}

fn insert_quantity(
    list: &mut ResourceList,
    kind: &str,
    resource: &str,
    raw: &str,
) -> InjectResult<()> {
    match parse_quantity(raw) {
        Ok(Some(quantity)) => {
            list.insert(resource.to_string(), quantity);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            let field = format!("{}.{}", kind, resource);
            warn!(field = %field, value = raw, "invalid resource quantity");
            Err(InjectError::invalid_resource(field, raw, e))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
