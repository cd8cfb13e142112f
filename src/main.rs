//! Vault command-line client
//!
//! Talks to a running vault backend over its RPC socket.
//!
//! ## Usage
//!
//! ```bash
//! # Is the vault initialised?
//! vault status
//!
//! # List entries (master password from env)
//! VAULT_MASTER_PASSWORD=... vault list
//!
//! # Talk to a backend on another host
//! vault --origin https://10.0.0.2:8888 list
//!
//! # Raw call with JSON params
//! vault call make_password '{"len":20,"uppercase":true,"lowercase":true,"digit":true,"special":false}'
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vault_client::config::default_config_path;
use vault_client::{
    ClientOptions, Config, ImportSource, PasswordOption, TracingNotifier, VaultContext, VaultRpc,
};

#[derive(Parser, Debug)]
#[command(name = "vault")]
#[command(about = "Command-line client for the vault password manager")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Origin of the backend (http://host:port); the socket URL is derived from it
    #[arg(long, env = "VAULT_ORIGIN")]
    origin: Option<String>,

    /// Explicit socket URL, bypassing origin derivation
    #[arg(long, env = "VAULT_ENDPOINT")]
    endpoint: Option<String>,

    /// Master password for commands that need one
    #[arg(long, env = "VAULT_MASTER_PASSWORD", hide_env_values = true)]
    master_password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show whether a master password is set
    Status,
    /// Set the initial master password
    Init,
    /// Check the master password
    Verify,
    /// List entries
    List,
    /// Show one entry
    Get { id: u64 },
    /// Add an entry
    Add { name: String, password: String },
    /// Replace an entry's name and password
    Update {
        id: u64,
        name: String,
        password: String,
    },
    /// Delete an entry
    Delete { id: u64 },
    /// Generate a password
    Generate {
        #[arg(long, default_value_t = 16)]
        len: usize,
        #[arg(long)]
        no_uppercase: bool,
        #[arg(long)]
        no_lowercase: bool,
        #[arg(long)]
        no_digit: bool,
        #[arg(long)]
        special: bool,
    },
    /// Import an export file (path on the backend host)
    Import {
        file: String,
        /// Password the export was made with, if not the master password
        #[arg(long)]
        decrypt_password: Option<String>,
    },
    /// Export entries, to a backend-side file or to stdout
    Export {
        #[arg(long)]
        file: Option<String>,
    },
    /// Change the master password
    ChangePassword { new_password: String },
    /// Show, enable, or disable network access
    Network {
        #[command(subcommand)]
        action: NetworkAction,
    },
    /// Call any procedure with JSON params
    Call { method: String, params: Vec<String> },
}

#[derive(Subcommand, Debug)]
enum NetworkAction {
    Status,
    Enable,
    Disable,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vault_client=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Load config
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config = if config_path.exists() {
        Config::load(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(origin) = &args.origin {
        config.origin = origin.clone();
    }

    let notifier = Arc::new(TracingNotifier);
    let ctx = match &args.endpoint {
        Some(url) => VaultContext::with_endpoint(
            url,
            ClientOptions {
                reject_pending_on_disconnect: config.reject_pending_on_disconnect,
            },
            notifier,
        ),
        None => VaultContext::from_config(&config, notifier)?,
    };

    run(&ctx, &args).await
}

async fn run(ctx: &VaultContext, args: &Args) -> anyhow::Result<()> {
    let rpc = ctx.rpc();

    match &args.command {
        Command::Status => print(&rpc.is_master_password_set().await?),
        Command::Init => {
            if rpc.is_master_password_set().await? {
                bail!("master password is already set");
            }
            rpc.set_master_password(&required_master(args)?).await?;
            info!("Master password set");
            Ok(())
        }
        Command::Verify => print(&rpc.verify_master_password(&required_master(args)?).await?),
        Command::Call { method, params } => {
            let params = params
                .iter()
                .map(|p| serde_json::from_str(p).with_context(|| format!("param {:?}", p)))
                .collect::<anyhow::Result<Vec<Value>>>()?;
            print(&ctx.client().call(method, params).await?)
        }
        Command::Generate {
            len,
            no_uppercase,
            no_lowercase,
            no_digit,
            special,
        } => {
            let option = PasswordOption {
                len: *len,
                uppercase: !no_uppercase,
                lowercase: !no_lowercase,
                digit: !no_digit,
                special: *special,
            };
            print(&rpc.make_password(&option).await?)
        }
        command => {
            unlock(ctx, args).await?;
            let master = ctx.master_password().await?;
            run_unlocked(ctx, &master, command).await
        }
    }
}

async fn run_unlocked(ctx: &VaultContext, master: &str, command: &Command) -> anyhow::Result<()> {
    let rpc = ctx.rpc();

    match command {
        Command::List => print(&rpc.list_password(master).await?),
        Command::Get { id } => print(&rpc.get_password(master, *id).await?),
        Command::Add { name, password } => rpc
            .add_password(master, name, password)
            .await
            .map_err(Into::into),
        Command::Update { id, name, password } => rpc
            .update_password(master, *id, name, password)
            .await
            .map_err(Into::into),
        Command::Delete { id } => rpc.delete_password(master, *id).await.map_err(Into::into),
        Command::Import {
            file,
            decrypt_password,
        } => {
            let count = rpc
                .import_password(
                    master,
                    decrypt_password.as_deref(),
                    &ImportSource::File(file.clone()),
                )
                .await?;
            info!(inserted = count.insert, ignored = count.ignore, "Import finished");
            print(&count)
        }
        Command::Export { file } => {
            match rpc.export_password(master, file.as_deref()).await? {
                Some(rows) => print(&rows),
                None => Ok(()),
            }
        }
        Command::ChangePassword { new_password } => {
            rpc.change_password(master, new_password).await?;
            ctx.lock().await;
            Ok(())
        }
        Command::Network { action } => match action {
            NetworkAction::Status => print(&rpc.get_network_port(master).await?),
            NetworkAction::Enable => print(&rpc.enable_network_access(master).await?),
            NetworkAction::Disable => rpc.disable_network_access(master).await.map_err(Into::into),
        },
        other => bail!("{:?} does not need an unlocked vault", other),
    }
}

fn required_master(args: &Args) -> anyhow::Result<String> {
    args.master_password
        .clone()
        .context("master password required (--master-password or VAULT_MASTER_PASSWORD)")
}

async fn unlock(ctx: &VaultContext, args: &Args) -> anyhow::Result<()> {
    if !ctx.unlock(&required_master(args)?).await? {
        bail!("wrong master password");
    }
    Ok(())
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
