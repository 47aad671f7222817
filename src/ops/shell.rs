use crate::config::Settings;
use crate::error::{RemoteError, Result};
use crate::ops::config::Server;
use crate::ops::target::{login_in_dir_command, RemoteTarget};
use std::io::{Read, Write};
use std::process::{ChildStderr, Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

/// Default deadline for `capture_command`.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

// Bytes of ssh's stderr kept for the error after an interactive session fails.
const STDERR_TAIL_BYTES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// local -> `user@host:remote`
    Upload,
    /// `user@host:remote` -> local
    Download,
}

/// Runs ssh and scp on behalf of a resolved target.
///
/// Builders (`*_args`) are pure and return everything after the program
/// prefix, so the exact argv can be checked without spawning anything.
#[derive(Debug, Clone)]
pub struct Shell {
    ssh_command: Vec<String>,
    scp_command: Vec<String>,
    connect_timeout_secs: u64,
    dry_run: bool,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl Shell {
    pub fn new(settings: &Settings) -> Self {
        Self {
            ssh_command: settings.ssh_command.clone(),
            scp_command: settings.scp_command.clone(),
            connect_timeout_secs: settings.connect_timeout_secs,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// `-p <port> [-i <key>] <user>@<host> [-t <command>]`
    pub fn interactive_args(&self, target: &RemoteTarget) -> Vec<String> {
        let mut args = vec!["-p".to_string(), target.port().to_string()];

        if let Some(key) = target.key_path() {
            args.push("-i".to_string());
            args.push(key.to_string());
        }

        args.push(target.destination());

        // A bare login needs neither a forced tty nor a command.
        let command = match (target.inner_command(), target.default_path()) {
            (Some(cmd), _) => Some(cmd.to_string()),
            (None, Some(dir)) => Some(login_in_dir_command(dir)),
            (None, None) => None,
        };
        if let Some(command) = command {
            args.push("-t".to_string());
            args.push(command);
        }

        args
    }

    /// Non-interactive probe: host key checking off, bounded connect, no prompts.
    pub fn capture_args(&self, server: &Server, command: &str) -> Vec<String> {
        let mut args = vec!["-p".to_string(), server.effective_port().to_string()];

        if let Some(key) = server.identity() {
            args.push("-i".to_string());
            args.push(key.to_string());
        }

        args.push("-o".to_string());
        args.push("StrictHostKeyChecking=no".to_string());
        args.push("-o".to_string());
        args.push(format!("ConnectTimeout={}", self.connect_timeout_secs));
        args.push("-o".to_string());
        args.push("BatchMode=yes".to_string());

        args.push(server.destination());
        args.push(command.to_string());
        args
    }

    /// Recursive scp with the user's ssh config ignored.
    pub fn transfer_args(
        &self,
        server: &Server,
        local: &str,
        remote: &str,
        direction: Direction,
    ) -> Vec<String> {
        let mut args = vec![
            "-F".to_string(),
            null_device().to_string(),
            "-P".to_string(),
            server.effective_port().to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-r".to_string(),
        ];

        if let Some(key) = server.identity() {
            args.push("-i".to_string());
            args.push(key.to_string());
        }

        let remote_spec = format!("{}:{}", server.destination(), remote);
        match direction {
            Direction::Upload => {
                args.push(local.to_string());
                args.push(remote_spec);
            }
            Direction::Download => {
                args.push(remote_spec);
                args.push(local.to_string());
            }
        }
        args
    }

    /// Open a session on `target` with the terminal handed over to ssh.
    ///
    /// ssh's own stderr is echoed as it arrives and its tail is kept for the
    /// error if the session exits non-zero.
    pub fn interactive_session(&self, target: &RemoteTarget) -> Result<()> {
        let args = self.interactive_args(target);
        let (program, mut cmd) = build_command(&self.ssh_command, &args);

        if self.dry_run {
            println!("   [DRY RUN] {}", render_argv(&self.ssh_command, &args));
            return Ok(());
        }

        debug!(program = %program, args = ?args, "starting interactive session");
        let mut child = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RemoteError::Process {
                program: program.clone(),
                source,
            })?;

        let tee = child
            .stderr
            .take()
            .map(|pipe| std::thread::spawn(move || tee_stderr(pipe)));

        let status = child.wait().map_err(|source| RemoteError::Process {
            program: program.clone(),
            source,
        })?;
        let stderr = tee
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(RemoteError::ConnectionFailed {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    /// Run `command` on `server` and return its trimmed combined output.
    ///
    /// Combined output is all of stdout followed by all of stderr, not the two
    /// streams in the order they were written. The same applies to
    /// `RemoteCommandFailed::output`.
    ///
    /// The child is killed if it is still running when `timeout` elapses.
    pub async fn capture_command(
        &self,
        server: &Server,
        command: &str,
        timeout: Duration,
    ) -> Result<String> {
        let args = self.capture_args(server, command);
        let (program, cmd) = build_command(&self.ssh_command, &args);
        let mut cmd = tokio::process::Command::from(cmd);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            program = %program,
            args = ?args,
            timeout_secs = timeout.as_secs_f64(),
            "running remote probe"
        );
        let child = cmd.spawn().map_err(|source| RemoteError::Process {
            program: program.clone(),
            source,
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(waited) => waited.map_err(|source| RemoteError::Process {
                program: program.clone(),
                source,
            })?,
            Err(_) => {
                warn!(host = %server.host, command, "remote probe timed out, killed");
                return Err(RemoteError::Timeout { after: timeout });
            }
        };

        let combined = combine_output(&output.stdout, &output.stderr);
        if !output.status.success() {
            return Err(RemoteError::RemoteCommandFailed {
                code: output.status.code(),
                output: combined,
            });
        }
        Ok(combined)
    }

    /// Copy `local` to or from `remote` on `server`, showing scp's progress.
    ///
    /// The local path is not checked here.
    pub fn transfer(
        &self,
        server: &Server,
        local: &str,
        remote: &str,
        direction: Direction,
    ) -> Result<()> {
        let args = self.transfer_args(server, local, remote, direction);
        let (program, mut cmd) = build_command(&self.scp_command, &args);

        if self.dry_run {
            println!("   [DRY RUN] {}", render_argv(&self.scp_command, &args));
            return Ok(());
        }

        debug!(program = %program, args = ?args, ?direction, "starting transfer");
        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| RemoteError::Process { program, source })?;

        if !status.success() {
            return Err(RemoteError::TransferFailed {
                code: status.code(),
            });
        }
        Ok(())
    }
}

/// Program prefix (e.g. `["ssh"]`) plus `args` as a ready `Command`.
fn build_command(prefix: &[String], args: &[String]) -> (String, Command) {
    let (program, leading) = match prefix.split_first() {
        Some((program, leading)) => (program.clone(), leading),
        None => ("ssh".to_string(), &[][..]),
    };
    let mut cmd = Command::new(&program);
    cmd.args(leading).args(args);
    (program, cmd)
}

fn render_argv(prefix: &[String], args: &[String]) -> String {
    prefix
        .iter()
        .chain(args)
        .map(|a| crate::ops::target::shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let out = String::from_utf8_lossy(stdout);
    let err = String::from_utf8_lossy(stderr);
    let (out, err) = (out.trim(), err.trim());
    match (out.is_empty(), err.is_empty()) {
        (_, true) => out.to_string(),
        (true, false) => err.to_string(),
        (false, false) => format!("{out}\n{err}"),
    }
}

fn tee_stderr(mut pipe: ChildStderr) -> String {
    let mut tail: Vec<u8> = Vec::new();
    let mut buf = [0u8; 1024];
    let mut console = std::io::stderr();
    loop {
        match pipe.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let _ = console.write_all(&buf[..n]);
                let _ = console.flush();
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > STDERR_TAIL_BYTES {
                    let excess = tail.len() - STDERR_TAIL_BYTES;
                    tail.drain(..excess);
                }
            }
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}

fn null_device() -> &'static str {
    if cfg!(windows) {
        "NUL"
    } else {
        "/dev/null"
    }
}
