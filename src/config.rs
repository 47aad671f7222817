use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

pub const CONFIG_FILE: &str = "config.toml";
pub const SERVERS_FILE: &str = "servers.toml";
pub const HOME_ENV: &str = "REMOTELINK_HOME";

/// Base directory for remotelink state: `$REMOTELINK_HOME` or `~/.remotelink`.
pub fn remotelink_home() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home.join(".remotelink"))
}

/// Which container runtime the remote hosts run.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    #[default]
    Docker,
    Podman,
}

impl ContainerRuntime {
    pub fn program(&self) -> &'static str {
        match self {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Wall-clock deadline for non-interactive probes.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Passed to ssh as `ConnectTimeout` for probes.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Remote login program plus leading arguments.
    #[serde(default = "default_ssh_command")]
    pub ssh_command: Vec<String>,
    /// Remote copy program plus leading arguments.
    #[serde(default = "default_scp_command")]
    pub scp_command: Vec<String>,
    #[serde(default)]
    pub container_runtime: ContainerRuntime,
}

fn default_probe_timeout_secs() -> u64 {
    10
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_ssh_command() -> Vec<String> {
    vec!["ssh".to_string()]
}
fn default_scp_command() -> Vec<String> {
    vec!["scp".to_string()]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            ssh_command: default_ssh_command(),
            scp_command: default_scp_command(),
            container_runtime: ContainerRuntime::default(),
        }
    }
}

impl Settings {
    /// Load `config.toml` from the remotelink home, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&remotelink_home()?.join(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut settings: Settings = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Invalid settings in {}", path.display()))?
        } else {
            Self::default()
        };

        // An empty program list would leave nothing to spawn.
        if settings.ssh_command.is_empty() {
            settings.ssh_command = default_ssh_command();
        }
        if settings.scp_command.is_empty() {
            settings.scp_command = default_scp_command();
        }
        if settings.probe_timeout_secs == 0 {
            settings.probe_timeout_secs = default_probe_timeout_secs();
        }
        if settings.connect_timeout_secs == 0 {
            settings.connect_timeout_secs = default_connect_timeout_secs();
        }

        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}
