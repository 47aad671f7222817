use crate::config::ContainerRuntime;
use crate::error::{RemoteError, Result};
use crate::ops::config::Server;

/// What the operator wants to land in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Host,
    Container(String),
}

/// Fully resolved connection parameters for one remote operation.
///
/// `inner_command` decides the mode: `None` opens a login shell (optionally in
/// `default_path`), `Some` runs the command on arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    host: String,
    port: u16,
    username: String,
    key_path: Option<String>,
    default_path: Option<String>,
    inner_command: Option<String>,
}

impl RemoteTarget {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn key_path(&self) -> Option<&str> {
        self.key_path.as_deref()
    }

    pub fn default_path(&self) -> Option<&str> {
        self.default_path.as_deref()
    }

    pub fn inner_command(&self) -> Option<&str> {
        self.inner_command.as_deref()
    }

    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    pub fn is_login(&self) -> bool {
        self.inner_command.is_none()
    }
}

/// Resolve a selection against `server` using the default container runtime.
pub fn resolve(server: &Server, selection: &Selection) -> Result<RemoteTarget> {
    resolve_with(server, selection, ContainerRuntime::default())
}

pub fn resolve_with(
    server: &Server,
    selection: &Selection,
    runtime: ContainerRuntime,
) -> Result<RemoteTarget> {
    let inner_command = match selection {
        Selection::Host => None,
        Selection::Container(name) => {
            if server.find_container(name).is_none() {
                return Err(RemoteError::TargetNotFound {
                    server: server.name.clone(),
                    container: name.clone(),
                });
            }
            Some(container_shell_command(runtime, name))
        }
    };

    Ok(RemoteTarget {
        host: server.host.clone(),
        port: server.effective_port(),
        username: server.username.clone(),
        key_path: server.identity().map(str::to_string),
        default_path: server.working_dir().map(str::to_string),
        inner_command,
    })
}

/// `<runtime> exec -it <name> /bin/bash || <runtime> exec -it <name> /bin/sh`
pub fn container_shell_command(runtime: ContainerRuntime, container: &str) -> String {
    let program = runtime.program();
    let name = shell_quote(container);
    format!("{program} exec -it {name} /bin/bash || {program} exec -it {name} /bin/sh")
}

/// Change into `dir` and replace the shell with a login shell.
pub fn login_in_dir_command(dir: &str) -> String {
    format!("cd {} && exec $SHELL -l", shell_quote_path(dir))
}

/// Quote `value` for a POSIX shell. Plain tokens are returned unchanged.
pub fn shell_quote(value: &str) -> String {
    let is_plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@%+=,".contains(c));
    if is_plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

// A leading `~/` is left bare so the remote shell still expands it.
fn shell_quote_path(path: &str) -> String {
    if path == "~" {
        return path.to_string();
    }
    match path.strip_prefix("~/") {
        Some("") => "~/".to_string(),
        Some(rest) => format!("~/{}", shell_quote(rest)),
        None => shell_quote(path),
    }
}
