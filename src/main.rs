//! jailbind - FreeBSD jail syscall front end
//!
//! Thin command-line wrapper over the jailbind library operations.

mod cli;

use cli::{Cli, Commands};
use jailbind::error::{Error, Result};
use jailbind::jail::{JailFlags, JailOptions, Jailer, ParamKind, ParamSet, ParamValue};
use jailbind::manifest::{self, BindConfig};
use std::collections::BTreeMap;
use std::os::unix::process::CommandExt;
use std::process::Command;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::{Directive, LevelFilter};

fn main() {
    let cli = Cli::parse_args();

    let directive = if cli.verbose { "jailbind=debug" } else { "jailbind=info" };
    let filter = EnvFilter::from_default_env().add_directive(
        directive
            .parse::<Directive>()
            .unwrap_or_else(|_| LevelFilter::INFO.into()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            let config = manifest::load(path)?;
            config.install()?;
            tracing::debug!(path = %path.display(), params = config.params.len(), "config loaded");
            config
        }
        None => BindConfig::default(),
    };

    let jailer = Jailer::host();

    match cli.command {
        Commands::Create {
            path,
            name,
            hostname,
            ip4,
            chdir,
            command,
        } => {
            let mut opts = config
                .create
                .clone()
                .unwrap_or_else(|| JailOptions::new("", ""));
            if let Some(path) = path {
                opts.path = path;
            }
            if let Some(name) = name {
                opts.name = name;
            }
            if let Some(hostname) = hostname {
                opts.hostname = hostname;
            }
            if ip4.is_some() {
                opts.ipv4 = ip4;
            }
            opts.chdir_on_success |= chdir;
            if opts.hostname.is_empty() {
                opts.hostname = opts.name.clone();
            }

            let handle = jailer.create(&opts)?;
            tracing::info!(jid = handle.jid(), name = %handle.name(), "jail created");

            if command.is_empty() {
                println!("{}", handle.jid());
                return Ok(());
            }
            exec(&command)
        }

        Commands::Remove { jail } => {
            let jid = jailer.lookup(&jail)?;
            jailer.remove(jid)?;
            tracing::info!(jid, "jail removed");
            Ok(())
        }

        Commands::Attach { jail, command } => {
            let jid = jailer.lookup(&jail)?;
            jailer.attach(jid)?;
            exec(&command)
        }

        Commands::Id { name } => {
            println!("{}", jailer.resolve_id(&name)?);
            Ok(())
        }

        Commands::Name { jid } => {
            println!("{}", jailer.resolve_name(jid)?);
            Ok(())
        }

        Commands::Get {
            jail,
            params,
            dying,
            json,
        } => {
            let mut set = ParamSet::new();
            match jail.parse::<i32>() {
                Ok(jid) => set.add("jid", jid)?,
                Err(_) => set.add("name", jail.as_str())?,
            }
            for name in &params {
                if set.contains(name) {
                    continue;
                }
                let kind = set
                    .registry()
                    .kind_of(name)
                    .ok_or_else(|| Error::InvalidParameterName(name.clone()))?;
                let empty = match kind {
                    ParamKind::Ipv4 => ParamValue::Ipv4(Vec::new()),
                    _ => kind.parse_value(name, default_text(kind))?,
                };
                set.add(name, empty)?;
            }

            let flags = if dying { JailFlags::DYING } else { JailFlags::empty() };
            jailer.get(&mut set, flags)?;

            let values: BTreeMap<&str, _> = set
                .iter()
                .filter(|(name, _)| params.iter().any(|p| p.as_str() == *name))
                .collect();
            if json {
                let text = serde_json::to_string_pretty(&values)
                    .map_err(|e| Error::Io(std::io::Error::other(e)))?;
                println!("{}", text);
            } else {
                for name in &params {
                    if let Some(value) = values.get(name.as_str()) {
                        println!("{}={}", name, value);
                    }
                }
            }
            Ok(())
        }

        Commands::Set { jail, params } => {
            let mut set = ParamSet::new();
            match jail.parse::<i32>() {
                Ok(jid) => set.add("jid", jid)?,
                Err(_) => set.add("name", jail.as_str())?,
            }
            for assignment in &params {
                match assignment.split_once('=') {
                    Some((name, value)) => set.add_parsed(name, value)?,
                    None => set.add_parsed(assignment, "")?,
                }
            }
            let jid = jailer.set(&set, JailFlags::UPDATE)?;
            tracing::info!(jid, params = params.len(), "jail updated");
            Ok(())
        }

        Commands::Completion { shell } => {
            Cli::generate_completion(shell);
            Ok(())
        }
    }
}

/// Text that parses to the zero value of a kind
fn default_text(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Int => "0",
        ParamKind::Bool => "false",
        _ => "",
    }
}

/// Replace this process with `command`
fn exec(command: &[String]) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        return Ok(());
    };
    let err = Command::new(program).args(args).exec();
    Err(Error::Io(err))
}
