use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SSH_PORT: u16 = 22;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Container {
    pub container_name: String,
    pub image_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Server {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub port: u16,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_path: Option<String>,
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl Server {
    pub fn new(name: &str, host: &str, username: &str) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
            port: DEFAULT_SSH_PORT,
            username: username.to_string(),
            key_path: None,
            default_path: None,
            containers: Vec::new(),
        }
    }

    /// Port to dial; an unset (zero) port means the ssh default.
    pub fn effective_port(&self) -> u16 {
        if self.port == 0 {
            DEFAULT_SSH_PORT
        } else {
            self.port
        }
    }

    /// `user@host`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    /// Identity file, if one is configured. Empty means "let ssh decide".
    pub fn identity(&self) -> Option<&str> {
        self.key_path.as_deref().filter(|k| !k.is_empty())
    }

    pub fn working_dir(&self) -> Option<&str> {
        self.default_path.as_deref().filter(|p| !p.is_empty())
    }

    pub fn find_container(&self, name: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.container_name == name)
    }
}

/// Port from operator input. Blank means the ssh default.
pub fn parse_port(input: &str) -> anyhow::Result<u16> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(DEFAULT_SSH_PORT);
    }
    match input.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => bail!("Invalid port number: {}", input),
    }
}

/// The remote `cd` quotes the path, so only `~` and a leading `~/` expand.
fn check_default_path(dir: &str) -> anyhow::Result<()> {
    if dir.contains('$') {
        bail!(
            "Default path '{}' uses a shell variable; use an absolute path or ~/",
            dir
        );
    }
    if dir.starts_with('~') && dir != "~" && !dir.starts_with("~/") {
        bail!(
            "Default path '{}' names another user's home; use an absolute path or ~/",
            dir
        );
    }
    Ok(())
}

/// Snapshot of the operator's servers, as stored in `servers.toml`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct ServerRegistry {
    #[serde(default)]
    pub servers: Vec<Server>,
}

impl ServerRegistry {
    /// Read the registry at `path`, writing a starter file first if there is none.
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let starter = Self::starter();
            starter
                .save(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            tracing::info!(path = %path.display(), "created starter server registry");
            return Ok(starter);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let registry: ServerRegistry = toml::from_str(&content)
            .with_context(|| format!("Invalid server registry in {}", path.display()))?;
        registry.check_unique_names()?;
        Ok(registry)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> anyhow::Result<PathBuf> {
        Ok(crate::config::remotelink_home()?.join(crate::config::SERVERS_FILE))
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.name == name)
    }

    pub fn add(&mut self, server: Server) -> anyhow::Result<()> {
        if server.name.trim().is_empty() {
            bail!("Server name must not be empty");
        }
        if server.host.trim().is_empty() {
            bail!("Host must not be empty");
        }
        if server.username.trim().is_empty() {
            bail!("Username must not be empty");
        }
        if let Some(dir) = server.working_dir() {
            check_default_path(dir)?;
        }
        if self.find(&server.name).is_some() {
            bail!("Server '{}' already exists", server.name);
        }
        self.servers.push(server);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> anyhow::Result<Server> {
        let idx = self
            .servers
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| anyhow!("Server '{}' not found", name))?;
        Ok(self.servers.remove(idx))
    }

    /// Store a freshly discovered container list on the named server.
    pub fn replace_containers(
        &mut self,
        name: &str,
        containers: Vec<Container>,
    ) -> anyhow::Result<()> {
        let server = self
            .servers
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| anyhow!("Server '{}' not found", name))?;
        server.containers = containers;
        Ok(())
    }

    fn check_unique_names(&self) -> anyhow::Result<()> {
        for (i, server) in self.servers.iter().enumerate() {
            if self.servers[..i].iter().any(|s| s.name == server.name) {
                bail!("Duplicate server name '{}' in registry", server.name);
            }
        }
        Ok(())
    }

    fn starter() -> Self {
        let mut first = Server::new("example-server1", "192.168.1.100", "your-username1");
        first.key_path = Some("~/.ssh/id_rsa".to_string());
        first.default_path = Some("/home/user".to_string());
        first.containers.push(Container {
            container_name: "app-container".to_string(),
            image_name: "nginx:latest".to_string(),
        });

        let mut second = Server::new("example-server2", "192.168.1.101", "your-username2");
        second.key_path = Some("~/.ssh/id_rsa".to_string());
        second.default_path = Some("/home/user".to_string());

        Self {
            servers: vec![first, second],
        }
    }
}
