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

//! Shutdown hook for the agent sidecar.
//!
//! When revoke-on-shutdown is enabled the sidecar gets a pre-stop hook that
//! sleeps for the revoke grace period, letting in-flight requests that use the
//! token finish, and then revokes the agent's own token. The hook runs inside
//! the pod's termination grace period; if the grace delay exceeds it, the
//! kubelet kills the hook before the revoke runs. The two values are not
//! cross-checked here.

use super::Agent;
use crate::api::core::{Lifecycle, LifecycleHandler};
use tracing::debug;

/// Shell script run by the pre-stop hook: wait `grace_seconds`, then revoke the
/// token held by the local agent using the given connection flags.
///
/// Flags are joined into the script unquoted, so the `vault` connection
/// settings they are built from must be shell-safe (no spaces or shell
/// metacharacters).
pub fn revoke_command(grace_seconds: u64, flags: &[String]) -> String {
    format!(
        "/bin/sleep {} && /bin/vault token revoke {}",
        grace_seconds,
        flags.join(" ")
    )
}

impl Agent {
    /// Build the lifecycle for the sidecar container. Only meaningful for the
    /// long running sidecar, never for an init container.
    pub fn create_lifecycle(&self) -> Lifecycle {
        let mut lifecycle = Lifecycle::default();

        if self.revoke_on_shutdown {
            let mut flags = self.vault_cli_flags();
            flags.push("-self".to_string());

            debug!(
                revoke_grace = self.revoke_grace,
                "attaching token revoke pre-stop hook"
            );

            lifecycle.pre_stop = Some(LifecycleHandler::exec(vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                revoke_command(self.revoke_grace, &flags),
            ]));
        }

        lifecycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Vault;

    fn pre_stop_command(lifecycle: &Lifecycle) -> Vec<String> {
        lifecycle
            .pre_stop
            .as_ref()
            .and_then(|h| h.exec.as_ref())
            .map(|e| e.command.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_revoke_command() {
        let flags = vec!["-address=http://vault:8200".to_string(), "-self".to_string()];
        assert_eq!(
            revoke_command(5, &flags),
            "/bin/sleep 5 && /bin/vault token revoke -address=http://vault:8200 -self"
        );
        assert_eq!(
            revoke_command(0, &["-self".to_string()]),
            "/bin/sleep 0 && /bin/vault token revoke -self"
        );
    }

    #[test]
    fn test_revoke_command_does_not_quote_flags() {
        let flags = vec!["-ca-cert=/vault/tls/ca.crt".to_string(), "-self".to_string()];
        let script = revoke_command(5, &flags);
        assert!(!script.contains('\''));
        assert!(!script.contains('"'));
        assert!(script.ends_with("revoke -ca-cert=/vault/tls/ca.crt -self"));
    }

    #[test]
    fn test_lifecycle_revoke_disabled() {
        let agent = Agent {
            revoke_on_shutdown: false,
            ..Default::default()
        };
        let lifecycle = agent.create_lifecycle();
        assert!(lifecycle.pre_stop.is_none());
        assert!(lifecycle.is_empty());
    }

    #[test]
    fn test_lifecycle_revoke_enabled() {
        let agent = Agent {
            revoke_on_shutdown: true,
            revoke_grace: 5,
            vault: Vault {
                address: "https://vault:8200".to_string(),
                ca_cert: "/vault/tls/ca.crt".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let command = pre_stop_command(&agent.create_lifecycle());
        assert_eq!(command.len(), 3);
        assert_eq!(command[0], "/bin/sh");
        assert_eq!(command[1], "-c");
        assert_eq!(
            command[2],
            "/bin/sleep 5 && /bin/vault token revoke -address=https://vault:8200 -ca-cert=/vault/tls/ca.crt -self"
        );
    }

    #[test]
    fn test_lifecycle_custom_grace() {
        let agent = Agent {
            revoke_on_shutdown: true,
            revoke_grace: 30,
            ..Default::default()
        };

        let command = pre_stop_command(&agent.create_lifecycle());
        assert!(command[2].starts_with("/bin/sleep 30 && "));
        assert!(command[2].ends_with(" -self"));
    }
}
