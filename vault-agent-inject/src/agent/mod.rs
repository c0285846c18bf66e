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

//! Vault Agent sidecar injection.
//!
//! An [`Agent`] holds the per-pod injection settings produced by the annotation
//! layer. From it, [`Agent::container_sidecar`] builds the `vault-agent`
//! container that is appended to the pod being mutated:
//!
//! - the secrets volume and the pod's service-account token are always mounted;
//! - a config map, when named, replaces the base64 bootstrap configuration;
//! - a TLS secret, when named, is mounted for the agent's Vault connection;
//! - when revoke-on-shutdown is enabled, a pre-stop hook waits for the revoke
//!   grace period and then revokes the agent's own token.
//!
//! Building the container is a pure function of the `Agent` and the supplied
//! environment; nothing is cached between calls.

mod container_sidecar;
pub mod errors;
mod lifecycle;

pub use container_sidecar::{AGENT_CONTAINER_NAME, AGENT_GROUP_ID, AGENT_USER_ID};
pub use errors::{InjectError, InjectResult};
pub use lifecycle::revoke_command;

use serde::Deserialize;
use std::io::Read;

// ============================================================================
// Defaults
// ============================================================================

// https://kubernetes.io/docs/concepts/configuration/manage-compute-resources-container/#meaning-of-cpu
pub const DEFAULT_RESOURCE_LIMIT_CPU: &str = "500m";
pub const DEFAULT_RESOURCE_LIMIT_MEM: &str = "128Mi";
pub const DEFAULT_RESOURCE_REQUEST_CPU: &str = "250m";
pub const DEFAULT_RESOURCE_REQUEST_MEM: &str = "64Mi";

/// Startup argument used when no config map is supplied. The agent
/// configuration is passed base64 encoded in the VAULT_CONFIG environment variable.
pub const DEFAULT_CONTAINER_ARG: &str =
    "echo ${VAULT_CONFIG?} | base64 -d > /tmp/config.json && vault agent -config=/tmp/config.json";

/// Seconds to wait before revoking the agent token on shutdown.
pub const DEFAULT_REVOKE_GRACE: u64 = 5;

pub const DEFAULT_AGENT_LOG_LEVEL: &str = "info";

pub const DEFAULT_SERVICE_ACCOUNT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

// ============================================================================
// Volumes
// ============================================================================
//
// Names and paths are shared with the volume provisioning logic.

/// Volume the agent renders secrets into; shared with the application containers.
pub const SECRET_VOLUME_NAME: &str = "vault-secrets";
pub const SECRET_VOLUME_PATH: &str = "/vault/secrets";

/// Volume holding the user supplied agent configuration.
pub const CONFIG_VOLUME_NAME: &str = "vault-config";
pub const CONFIG_VOLUME_PATH: &str = "/vault/configs";

/// Volume holding the TLS material used to talk to Vault.
pub const TLS_SECRET_VOLUME_NAME: &str = "vault-tls-secrets";
pub const TLS_SECRET_VOLUME_PATH: &str = "/vault/tls";

/// Sink file the agent writes its token to when running from a config map.
pub const TOKEN_FILE: &str = "/home/vault/.token";

// ============================================================================
// Configuration
// ============================================================================

/// Vault connection settings for the agent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Vault {
    /// Address of the Vault server.
    pub address: String,
    /// Path of a PEM-encoded CA certificate file.
    pub ca_cert: String,
    /// Path of a directory of PEM-encoded CA certificates.
    pub ca_key: String,
    /// Path of a PEM-encoded client certificate.
    pub client_cert: String,
    /// Path of the client certificate's private key.
    pub client_key: String,
    /// Name of a Kubernetes secret holding TLS material; empty means none.
    pub tls_secret: String,
    /// Skip verification of the server certificate.
    pub tls_skip_verify: bool,
    /// Server name to use as SNI when connecting via TLS.
    pub tls_server_name: String,
}

/// Agent is the injection configuration for a single pod.
///
/// Empty resource strings mean "unset" and are omitted from the container
/// rather than requested as zero.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Agent {
    /// Vault Agent image.
    pub image_name: String,
    /// Name of the volume holding the pod's service-account token.
    pub service_account_name: String,
    /// Path the service-account volume is mounted at.
    pub service_account_path: String,
    /// Config map holding the agent configuration; empty means none.
    pub config_map_name: String,
    pub limits_cpu: String,
    pub limits_mem: String,
    pub requests_cpu: String,
    pub requests_mem: String,
    /// Revoke the agent token when the pod shuts down.
    pub revoke_on_shutdown: bool,
    /// Seconds to wait before revoking the token.
    pub revoke_grace: u64,
    pub log_level: String,
    pub vault: Vault,
}

impl Default for Agent {
    fn default() -> Self {
        Self {
            image_name: String::new(),
            service_account_name: String::new(),
            service_account_path: DEFAULT_SERVICE_ACCOUNT_PATH.to_string(),
            config_map_name: String::new(),
            limits_cpu: DEFAULT_RESOURCE_LIMIT_CPU.to_string(),
            limits_mem: DEFAULT_RESOURCE_LIMIT_MEM.to_string(),
            requests_cpu: DEFAULT_RESOURCE_REQUEST_CPU.to_string(),
            requests_mem: DEFAULT_RESOURCE_REQUEST_MEM.to_string(),
            revoke_on_shutdown: false,
            revoke_grace: DEFAULT_REVOKE_GRACE,
            log_level: DEFAULT_AGENT_LOG_LEVEL.to_string(),
            vault: Vault::default(),
        }
    }
}

impl Agent {
    /// Decode an agent from a JSON document. Missing fields take their
    /// defaults; with no input the default agent is returned.
    pub fn from_reader(config: Option<&mut dyn Read>) -> InjectResult<Self> {
        match config {
            None => Ok(Agent::default()),
            Some(reader) => {
                serde_json::from_reader(reader).map_err(|e| InjectError::config(e.to_string()))
            }
        }
    }

    /// Flags used to connect the vault CLI to the Vault server.
    pub fn vault_cli_flags(&self) -> Vec<String> {
        let mut flags = vec![format!("-address={}", self.vault.address)];

        if !self.vault.ca_cert.is_empty() {
            flags.push(format!("-ca-cert={}", self.vault.ca_cert));
        }
        if !self.vault.ca_key.is_empty() {
            flags.push(format!("-ca-path={}", self.vault.ca_key));
        }
        if !self.vault.client_cert.is_empty() {
            flags.push(format!("-client-cert={}", self.vault.client_cert));
        }
        if !self.vault.client_key.is_empty() {
            flags.push(format!("-client-key={}", self.vault.client_key));
        }
        if self.vault.tls_skip_verify {
            flags.push("-tls-skip-verify".to_string());
        }
        if !self.vault.tls_server_name.is_empty() {
            flags.push(format!("-tls-server-name={}", self.vault.tls_server_name));
        }

        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_agent() {
        let agent = Agent::default();
        assert_eq!(agent.limits_cpu, "500m");
        assert_eq!(agent.limits_mem, "128Mi");
        assert_eq!(agent.requests_cpu, "250m");
        assert_eq!(agent.requests_mem, "64Mi");
        assert_eq!(agent.revoke_grace, 5);
        assert_eq!(agent.log_level, "info");
        assert!(!agent.revoke_on_shutdown);
        assert!(agent.config_map_name.is_empty());
    }

    #[test]
    fn test_from_reader_none() {
        let agent = Agent::from_reader(None).unwrap();
        assert_eq!(agent, Agent::default());
    }

    #[test]
    fn test_from_reader_json() {
        let body = r#"{
            "imageName": "vault:1.4.0",
            "serviceAccountName": "foobar-token",
            "configMapName": "agent-config",
            "limitsCpu": "",
            "revokeOnShutdown": true,
            "revokeGrace": 10,
            "vault": { "address": "https://vault:8200", "tlsSecret": "vault-tls", "tlsSkipVerify": true }
        }"#;
        let mut bytes = body.as_bytes();
        let reader: &mut dyn Read = &mut bytes;
        let agent = Agent::from_reader(Some(reader)).unwrap();

        assert_eq!(agent.image_name, "vault:1.4.0");
        assert_eq!(agent.service_account_name, "foobar-token");
        assert_eq!(agent.service_account_path, DEFAULT_SERVICE_ACCOUNT_PATH);
        assert_eq!(agent.config_map_name, "agent-config");
        assert_eq!(agent.limits_cpu, "");
        assert_eq!(agent.limits_mem, DEFAULT_RESOURCE_LIMIT_MEM);
        assert!(agent.revoke_on_shutdown);
        assert_eq!(agent.revoke_grace, 10);
        assert_eq!(agent.vault.address, "https://vault:8200");
        assert_eq!(agent.vault.tls_secret, "vault-tls");
        assert!(agent.vault.tls_skip_verify);
    }

    #[test]
    fn test_from_reader_invalid() {
        let mut bytes = "{ not json".as_bytes();
        let reader: &mut dyn Read = &mut bytes;
        let err = Agent::from_reader(Some(reader)).unwrap_err();
        assert!(matches!(err, InjectError::Config(_)));

        let mut bytes = r#"{ "revokeGrace": -1 }"#.as_bytes();
        let reader: &mut dyn Read = &mut bytes;
        assert!(Agent::from_reader(Some(reader)).is_err());
    }

    #[test]
    fn test_vault_cli_flags_address_only() {
        let agent = Agent {
            vault: Vault {
                address: "http://vault:8200".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(agent.vault_cli_flags(), vec!["-address=http://vault:8200"]);
    }

    #[test]
    fn test_vault_cli_flags_all() {
        let agent = Agent {
            vault: Vault {
                address: "https://vault:8200".to_string(),
                ca_cert: "/vault/tls/ca.crt".to_string(),
                ca_key: "/vault/tls/ca".to_string(),
                client_cert: "/vault/tls/client.crt".to_string(),
                client_key: "/vault/tls/client.key".to_string(),
                tls_secret: "vault-tls".to_string(),
                tls_skip_verify: true,
                tls_server_name: "vault.internal".to_string(),
            },
            ..Default::default()
        };
        assert_eq!(
            agent.vault_cli_flags(),
            vec![
                "-address=https://vault:8200",
                "-ca-cert=/vault/tls/ca.crt",
                "-ca-path=/vault/tls/ca",
                "-client-cert=/vault/tls/client.crt",
                "-client-key=/vault/tls/client.key",
                "-tls-skip-verify",
                "-tls-server-name=vault.internal",
            ]
        );
    }
}
