use crate::config::ContainerRuntime;
use crate::error::{DiscoveryFailure, RemoteError, Result};
use crate::ops::config::{Container, Server};
use crate::ops::shell::{Shell, DEFAULT_PROBE_TIMEOUT};
use std::time::Duration;
use tracing::debug;

// Exit code the probe uses when the runtime binary is missing.
const RUNTIME_MISSING_EXIT: i32 = 127;
// ssh reports its own connection failures with 255.
const SSH_CONNECTION_EXIT: i32 = 255;

/// Lists running containers on a server with a single ssh round trip.
pub struct Discovery<'a> {
    shell: &'a Shell,
    runtime: ContainerRuntime,
    timeout: Duration,
}

impl<'a> Discovery<'a> {
    pub fn new(shell: &'a Shell) -> Self {
        Self {
            shell,
            runtime: ContainerRuntime::default(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn runtime(mut self, runtime: ContainerRuntime) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn discover(&self, server: &Server) -> Result<Vec<Container>> {
        let cmd = probe_command(self.runtime);
        let output = self
            .shell
            .capture_command(server, &cmd, self.timeout)
            .await
            .map_err(|err| classify(server, err))?;

        let containers = parse_container_list(&output);
        debug!(
            server = %server.name,
            count = containers.len(),
            "discovered containers"
        );
        Ok(containers)
    }
}

/// Runtime check and `ps` listing in one remote command.
pub fn probe_command(runtime: ContainerRuntime) -> String {
    let program = runtime.program();
    format!(
        "command -v {program} >/dev/null 2>&1 || exit {RUNTIME_MISSING_EXIT}; \
         {program} ps --format '{{{{.Names}}}}\t{{{{.Image}}}}'"
    )
}

/// Parse `name<TAB>image` lines. Lines that don't fit are skipped.
pub fn parse_container_list(output: &str) -> Vec<Container> {
    let mut containers = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((name, image)) = line.split_once('\t') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        containers.push(Container {
            container_name: name.to_string(),
            image_name: image.trim().to_string(),
        });
    }
    containers
}

fn classify(server: &Server, err: RemoteError) -> RemoteError {
    let kind = match &err {
        RemoteError::RemoteCommandFailed {
            code: Some(RUNTIME_MISSING_EXIT),
            ..
        } => DiscoveryFailure::RuntimeMissing,
        RemoteError::RemoteCommandFailed {
            code: Some(SSH_CONNECTION_EXIT),
            ..
        }
        | RemoteError::Timeout { .. } => DiscoveryFailure::Unreachable,
        RemoteError::RemoteCommandFailed { .. } => DiscoveryFailure::ProbeFailed,
        // Launch failures are local problems, not discovery ones.
        _ => return err,
    };
    RemoteError::DiscoveryFailed {
        server: server.name.clone(),
        kind,
        source: Box::new(err),
    }
}
