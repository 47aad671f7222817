use std::fmt;
use std::time::Duration;

/// Failures of the resolver, the bridge and container discovery.
///
/// Ordered from most to least specific. Callers match on the variant to decide
/// how to present the failure; nothing in the core retries.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The selection names a container the server does not know about.
    #[error("container '{container}' not found on server '{server}'")]
    TargetNotFound { server: String, container: String },

    /// A bounded probe ran past its deadline and was killed.
    #[error("remote command timed out after {}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    /// A bounded probe finished but the remote side exited non-zero.
    #[error("remote command failed (exit: {}): {output}", exit_label(.code))]
    RemoteCommandFailed { code: Option<i32>, output: String },

    /// The container-runtime probe failed. `kind` says why.
    #[error("container discovery failed on '{server}': {kind}")]
    DiscoveryFailed {
        server: String,
        kind: DiscoveryFailure,
        #[source]
        source: Box<RemoteError>,
    },

    /// The interactive session exited non-zero.
    #[error("connection failed (exit: {}){}", exit_label(.code), stderr_suffix(.stderr))]
    ConnectionFailed { code: Option<i32>, stderr: String },

    /// The copy process exited non-zero.
    #[error("transfer failed (exit: {})", exit_label(.code))]
    TransferFailed { code: Option<i32> },

    /// The external program could not be launched or waited on.
    #[error("failed to run '{program}': {source}")]
    Process {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a container discovery probe failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryFailure {
    /// The container runtime is not installed on the remote host.
    RuntimeMissing,
    /// The host could not be reached, or did not answer in time.
    Unreachable,
    /// The runtime is there but listing containers failed.
    ProbeFailed,
}

impl DiscoveryFailure {
    /// An actionable hint for the operator, when there is one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            DiscoveryFailure::RuntimeMissing => Some(
                "install the container runtime (docker or podman) on the remote host, \
                 or connect to the host directly",
            ),
            DiscoveryFailure::Unreachable => {
                Some("check the host address, port and key, then try again")
            }
            DiscoveryFailure::ProbeFailed => None,
        }
    }
}

impl fmt::Display for DiscoveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryFailure::RuntimeMissing => write!(f, "container runtime is not installed"),
            DiscoveryFailure::Unreachable => write!(f, "host is unreachable"),
            DiscoveryFailure::ProbeFailed => write!(f, "listing containers failed"),
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;
