use crate::ops::config::{parse_port, Server};
use crate::tui::prompt_line_from;
use anyhow::Result;
use std::io::{self, BufRead, Write};

/// Fields for a new server, as far as they were given on the command line.
///
/// When any required field is missing the operator is asked, on stdin, for
/// every field that is still unset.
#[derive(Debug, Default, Clone)]
pub struct ServerForm {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub username: Option<String>,
    pub key_path: Option<String>,
    pub default_path: Option<String>,
}

impl ServerForm {
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.host.is_some() && self.username.is_some()
    }

    pub fn fill(self) -> Result<Option<Server>> {
        let stdin = io::stdin();
        self.fill_from(&mut stdin.lock(), &mut io::stdout())
    }

    /// `Ok(None)` when the operator sends EOF.
    pub fn fill_from<R: BufRead, W: Write>(
        self,
        input: &mut R,
        output: &mut W,
    ) -> Result<Option<Server>> {
        let interactive = !self.is_complete();

        let Some(name) = ask(input, output, self.name, interactive, "Server name", None)? else {
            return Ok(None);
        };
        let Some(host) = ask(input, output, self.host, interactive, "Host", None)? else {
            return Ok(None);
        };
        let Some(port) = ask(input, output, self.port, interactive, "Port", Some("22"))? else {
            return Ok(None);
        };
        let Some(username) = ask(input, output, self.username, interactive, "Username", None)?
        else {
            return Ok(None);
        };
        let Some(key_path) = ask(
            input,
            output,
            self.key_path,
            interactive,
            "SSH key path (blank for ssh's default)",
            None,
        )?
        else {
            return Ok(None);
        };
        let Some(default_path) = ask(
            input,
            output,
            self.default_path,
            interactive,
            "Default path (absolute or ~/, blank for home)",
            None,
        )?
        else {
            return Ok(None);
        };

        let mut server = Server::new(name.trim(), host.trim(), username.trim());
        server.port = parse_port(&port)?;
        server.key_path = Some(key_path).filter(|k| !k.trim().is_empty());
        server.default_path = Some(default_path).filter(|p| !p.trim().is_empty());
        Ok(Some(server))
    }
}

// A given value wins; otherwise prompt, or treat the field as blank.
fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    value: Option<String>,
    interactive: bool,
    label: &str,
    default: Option<&str>,
) -> Result<Option<String>> {
    match value {
        Some(v) => Ok(Some(v)),
        None if interactive => prompt_line_from(input, output, label, default),
        None => Ok(Some(String::new())),
    }
}
