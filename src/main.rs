use remotelink::config::Settings;
use remotelink::logging;
use remotelink::ops::config::{Server, ServerRegistry};
use remotelink::ops::discovery::Discovery;
use remotelink::ops::shell::{Direction, Shell};
use remotelink::ops::target::{resolve_with, Selection};
use remotelink::tui::form::ServerForm;
use remotelink::tui::{self, fleet, picker};
use remotelink::RemoteError;

use anyhow::{anyhow, bail, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

fn cli() -> Command {
    Command::new("remotelink")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Jump into your servers and their containers, and move files around")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug level logging on stderr"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print the ssh/scp invocation instead of running it"),
        )
        .subcommand(
            Command::new("connect")
                .about("SSH connect to a server or one of its containers")
                .visible_aliases(["ssh", "cn"])
                .arg(Arg::new("server").required(false)),
        )
        .subcommand(
            Command::new("send")
                .about("Upload a file or directory to a server via scp")
                .visible_aliases(["upload", "up"])
                .arg(server_flag())
                .arg(Arg::new("local").required(false))
                .arg(Arg::new("remote").required(false)),
        )
        .subcommand(
            Command::new("pull")
                .about("Download a file or directory from a server via scp")
                .visible_aliases(["download", "dl"])
                .arg(server_flag())
                .arg(Arg::new("remote").required(false))
                .arg(Arg::new("local").required(false)),
        )
        .subcommand(
            Command::new("add")
                .about("Add a server to the registry (prompts for missing fields)")
                .arg(Arg::new("name").long("name").short('n'))
                .arg(Arg::new("host").long("host").short('H'))
                .arg(
                    Arg::new("port")
                        .long("port")
                        .short('p')
                        .help("SSH port (default: 22)"),
                )
                .arg(Arg::new("user").long("user").short('u'))
                .arg(
                    Arg::new("key")
                        .long("key")
                        .short('k')
                        .help("SSH private key path (default: ssh's own lookup)"),
                )
                .arg(
                    Arg::new("path")
                        .long("path")
                        .help("Directory to start interactive sessions in (absolute or ~/; no $VARS or ~user)"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a server from the registry")
                .visible_aliases(["rm", "delete"])
                .arg(Arg::new("server").required(false))
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .short('y')
                        .action(ArgAction::SetTrue)
                        .help("Skip the confirmation"),
                ),
        )
        .subcommand(
            Command::new("ls")
                .about("List servers")
                .arg(
                    Arg::new("plain")
                        .long("plain")
                        .action(ArgAction::SetTrue)
                        .help("Print a plain text table"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("plain")
                        .help("Print the registry as JSON"),
                ),
        )
        .subcommand(
            Command::new("containers")
                .about("Discover running containers on a server")
                .arg(Arg::new("server").required(true))
                .arg(
                    Arg::new("save")
                        .long("save")
                        .action(ArgAction::SetTrue)
                        .help("Store the discovered list in the registry"),
                ),
        )
}

fn server_flag() -> Arg {
    Arg::new("server")
        .long("server")
        .short('s')
        .help("Server name (prompted when omitted)")
}

/// Everything a command needs, loaded once in `main`.
struct App {
    settings: Settings,
    registry: ServerRegistry,
    registry_path: PathBuf,
    shell: Shell,
}

impl App {
    fn load(dry_run: bool) -> Result<Self> {
        let settings = Settings::load()?;
        let registry_path = ServerRegistry::default_path()?;
        let registry = ServerRegistry::load_or_create(&registry_path)?;
        let shell = Shell::new(&settings).with_dry_run(dry_run);
        Ok(Self {
            settings,
            registry,
            registry_path,
            shell,
        })
    }

    fn discovery(&self) -> Discovery<'_> {
        Discovery::new(&self.shell)
            .runtime(self.settings.container_runtime)
            .timeout(self.settings.probe_timeout())
    }

    fn save(&self) -> Result<()> {
        self.registry.save(&self.registry_path)
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    if let Err(e) = logging::init_logging(matches.get_flag("verbose")) {
        eprintln!("⚠️  {e}");
    }

    if let Err(err) = run(&matches).await {
        report(&err);
        std::process::exit(1);
    }
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let mut app = App::load(matches.get_flag("dry-run"))?;

    match matches.subcommand() {
        Some(("connect", sub)) => connect(&app, sub.get_one::<String>("server")).await,
        Some(("send", sub)) => send(&app, sub),
        Some(("pull", sub)) => pull(&app, sub),
        Some(("add", sub)) => add(&mut app, sub),
        Some(("remove", sub)) => remove(&mut app, sub),
        Some(("ls", sub)) => list(&app, sub),
        Some(("containers", sub)) => containers(&mut app, sub).await,
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}

fn report(err: &anyhow::Error) {
    eprintln!("❌ {err:#}");
    if let Some(RemoteError::DiscoveryFailed { kind, .. }) = err.downcast_ref::<RemoteError>() {
        if let Some(hint) = kind.hint() {
            eprintln!("   💡 {hint}");
        }
    }
}

async fn connect(app: &App, name: Option<&String>) -> Result<()> {
    if app.registry.is_empty() {
        println!("❌ No servers configured. Add one with `remotelink add`.");
        return Ok(());
    }

    let Some(chosen) = choose_server(&app.registry, name.map(String::as_str))? else {
        println!("Cancelled");
        return Ok(());
    };

    // Work on a copy; the live container list is not written back here.
    let mut server = chosen.clone();
    println!("🔍 Looking for containers on {}...", server.name);
    match app.discovery().discover(&server).await {
        Ok(found) => server.containers = found,
        Err(err) => {
            eprintln!("⚠️  {err}");
            if let RemoteError::DiscoveryFailed { kind, .. } = &err {
                if let Some(hint) = kind.hint() {
                    eprintln!("   💡 {hint}");
                }
            }
            if !server.containers.is_empty() {
                eprintln!("   Showing the containers stored in the registry instead.");
            }
        }
    }

    let Some(selection) = choose_target(&server)? else {
        println!("Cancelled");
        return Ok(());
    };
    let target = resolve_with(&server, &selection, app.settings.container_runtime)?;

    match &selection {
        Selection::Host => println!(
            "\n🔌 Connecting to {} ({})...\n",
            server.name,
            target.destination()
        ),
        Selection::Container(c) => println!(
            "\n🐳 Connecting to container '{}' on {}...\n",
            c, server.name
        ),
    }

    app.shell.interactive_session(&target)?;
    println!("\n✅ Connection closed");
    Ok(())
}

fn send(app: &App, args: &ArgMatches) -> Result<()> {
    if app.registry.is_empty() {
        println!("❌ No servers configured. Add one with `remotelink add`.");
        return Ok(());
    }
    let Some(server) = choose_server(
        &app.registry,
        args.get_one::<String>("server").map(String::as_str),
    )?
    else {
        println!("Cancelled");
        return Ok(());
    };

    let Some(local) = arg_or_prompt(args, "local", "Local path (file or directory to upload)", None)?
    else {
        println!("Cancelled");
        return Ok(());
    };
    let Some(remote) = arg_or_prompt(
        args,
        "remote",
        "Remote path (destination on the server)",
        server.default_path.as_deref(),
    )?
    else {
        println!("Cancelled");
        return Ok(());
    };

    if !Path::new(&local).exists() {
        bail!("Local path not found: {}", local);
    }

    println!("\n📤 Uploading {} → {}:{}\n", local, server.name, remote);
    app.shell
        .transfer(server, &local, &remote, Direction::Upload)?;
    println!("\n✅ Upload complete");
    Ok(())
}

fn pull(app: &App, args: &ArgMatches) -> Result<()> {
    if app.registry.is_empty() {
        println!("❌ No servers configured. Add one with `remotelink add`.");
        return Ok(());
    }
    let Some(server) = choose_server(
        &app.registry,
        args.get_one::<String>("server").map(String::as_str),
    )?
    else {
        println!("Cancelled");
        return Ok(());
    };

    let Some(remote) = arg_or_prompt(args, "remote", "Remote path (file or directory to download)", None)?
    else {
        println!("Cancelled");
        return Ok(());
    };
    let Some(local) = arg_or_prompt(args, "local", "Local path (destination)", Some("./"))? else {
        println!("Cancelled");
        return Ok(());
    };

    println!("\n📥 Downloading {}:{} → {}\n", server.name, remote, local);
    app.shell
        .transfer(server, &local, &remote, Direction::Download)?;
    println!("\n✅ Download complete");
    Ok(())
}

fn add(app: &mut App, args: &ArgMatches) -> Result<()> {
    let form = ServerForm {
        name: args.get_one::<String>("name").cloned(),
        host: args.get_one::<String>("host").cloned(),
        port: args.get_one::<String>("port").cloned(),
        username: args.get_one::<String>("user").cloned(),
        key_path: args.get_one::<String>("key").cloned(),
        default_path: args.get_one::<String>("path").cloned(),
    };
    let Some(server) = form.fill()? else {
        println!("Cancelled");
        return Ok(());
    };

    let name = server.name.clone();
    app.registry.add(server)?;
    app.save()?;
    println!("✅ Server '{}' added", name);
    Ok(())
}

fn remove(app: &mut App, args: &ArgMatches) -> Result<()> {
    if app.registry.is_empty() {
        println!("No servers configured");
        return Ok(());
    }

    let name = match args.get_one::<String>("server") {
        Some(name) => name.clone(),
        None => {
            let labels: Vec<String> = app
                .registry
                .servers
                .iter()
                .map(|s| format!("{} ({})", s.name, s.destination()))
                .collect();
            match picker::pick("Select server to remove", "This cannot be undone", &labels)? {
                Some(idx) => app.registry.servers[idx].name.clone(),
                None => {
                    println!("Cancelled");
                    return Ok(());
                }
            }
        }
    };

    if app.registry.find(&name).is_none() {
        bail!("Server '{}' not found", name);
    }
    if !args.get_flag("yes") && !tui::confirm(&format!("Remove server '{}'?", name))? {
        println!("Cancelled");
        return Ok(());
    }

    let removed = app.registry.remove(&name)?;
    app.save()?;
    println!("✅ Server '{}' removed", removed.name);
    Ok(())
}

fn list(app: &App, args: &ArgMatches) -> Result<()> {
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&app.registry.servers)?);
        return Ok(());
    }
    if app.registry.is_empty() {
        println!("No servers configured");
        return Ok(());
    }
    if args.get_flag("plain") || !std::io::stdout().is_terminal() {
        print!("{}", fleet::plain_table(&app.registry.servers));
        return Ok(());
    }
    fleet::show_fleet(&app.registry.servers)
}

async fn containers(app: &mut App, args: &ArgMatches) -> Result<()> {
    let name = required(args, "server")?;
    let server = app
        .registry
        .find(&name)
        .ok_or_else(|| anyhow!("Server '{}' not found", name))?;

    println!("🔍 Looking for containers on {}...", server.name);
    let found = app.discovery().discover(server).await?;

    if found.is_empty() {
        println!("No running containers");
    }
    for c in &found {
        println!("🐳 {} ({})", c.container_name, c.image_name);
    }

    if args.get_flag("save") {
        let count = found.len();
        app.registry.replace_containers(&name, found)?;
        app.save()?;
        println!("✅ Stored {} container(s) for '{}'", count, name);
    }
    Ok(())
}

fn choose_server<'a>(registry: &'a ServerRegistry, name: Option<&str>) -> Result<Option<&'a Server>> {
    if let Some(name) = name {
        return registry
            .find(name)
            .map(Some)
            .ok_or_else(|| anyhow!("Server '{}' not found", name));
    }
    if let [only] = registry.servers.as_slice() {
        return Ok(Some(only));
    }

    let labels: Vec<String> = registry
        .servers
        .iter()
        .map(|s| {
            let mut label = format!(
                "{:<20} {}@{}:{}",
                s.name,
                s.username,
                s.host,
                s.effective_port()
            );
            if !s.containers.is_empty() {
                label.push_str(&format!(" 🐳 {} containers", s.containers.len()));
            }
            label
        })
        .collect();

    let picked = picker::pick("🔌 Select server", "Choose a server to connect", &labels)?;
    Ok(picked.map(|idx| &registry.servers[idx]))
}

fn choose_target(server: &Server) -> Result<Option<Selection>> {
    if server.containers.is_empty() {
        return Ok(Some(Selection::Host));
    }

    let mut labels = vec![format!("🖥️  {} (Host)", server.name)];
    labels.extend(
        server
            .containers
            .iter()
            .map(|c| format!("🐳 {} ({})", c.container_name, c.image_name)),
    );

    let title = format!("📍 Select connection target for {}", server.name);
    let picked = picker::pick(&title, "Choose host or container", &labels)?;
    Ok(picked.map(|idx| match idx {
        0 => Selection::Host,
        n => Selection::Container(server.containers[n - 1].container_name.clone()),
    }))
}

fn arg_or_prompt(
    args: &ArgMatches,
    id: &str,
    label: &str,
    default: Option<&str>,
) -> Result<Option<String>> {
    if let Some(value) = args.get_one::<String>(id) {
        return Ok(Some(value.clone()));
    }
    let answer = tui::prompt_line(label, default)?;
    Ok(answer.filter(|a| !a.is_empty()))
}

fn required(args: &ArgMatches, id: &str) -> Result<String> {
    args.get_one::<String>(id)
        .cloned()
        .ok_or_else(|| anyhow!("Missing required argument '{}'", id))
}
