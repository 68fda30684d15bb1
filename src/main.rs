//! shardkv: inspect and edit a store from the shell.
//!
//! Usage:
//!   shardkv --dir ./data set user:1 '{"name":"ada"}'
//!   shardkv --dir ./data set-file avatar:1 ./avatar.png
//!   shardkv --dir ./data get user:1
//!   shardkv --dir ./data del user:1
//!   shardkv --config store.toml list

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use shardkv::{is_valid_key, Config, Store, Value};

#[derive(Parser)]
#[command(name = "shardkv", about = "Sharded file-system key/value store", version)]
struct Cli {
    #[command(flatten)]
    target: Target,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Target {
    /// Path to a TOML configuration file.
    #[arg(short, long, conflicts_with = "dir")]
    config: Option<PathBuf>,
    /// Store root directory (default settings).
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Store a JSON value.
    Set {
        key: String,
        /// JSON text, e.g. '{"a":1}' or '"plain string"'.
        json: String,
    },
    /// Store the raw bytes of a file.
    SetFile { key: String, path: PathBuf },
    /// Print the value stored under a key.
    Get { key: String },
    /// Delete a key.
    Del { key: String },
    /// Print every stored key.
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Command failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match (cli.target.config, cli.target.dir) {
        (Some(path), _) => Config::from_file(&path)?,
        (None, Some(dir)) => Config::new(dir),
        (None, None) => bail!("either --config or --dir is required"),
    };
    let store = Store::open(config).await?;

    match cli.command {
        Command::Set { key, json } => {
            require_key(&key)?;
            let parsed: serde_json::Value =
                serde_json::from_str(&json).context("value is not valid JSON")?;
            store.set(&key, &Value::from(parsed)).await?;
        }
        Command::SetFile { key, path } => {
            require_key(&key)?;
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("cannot read {}", path.display()))?;
            store.set(&key, &Value::from(data)).await?;
        }
        Command::Get { key } => {
            require_key(&key)?;
            match store.get(&key).await? {
                Some(Value::Json(doc)) => println!("{}", serde_json::to_string_pretty(&doc)?),
                Some(Value::Binary(bytes)) => {
                    println!("<binary, {} bytes> {}", bytes.len(), hex::encode(&bytes[..bytes.len().min(32)]))
                }
                None => {
                    eprintln!("(absent)");
                    std::process::exit(2);
                }
            }
        }
        Command::Del { key } => {
            require_key(&key)?;
            store.del(&key).await?;
        }
        Command::List => {
            let summary = store
                .each(|key, value| {
                    let kind = match value {
                        Value::Binary(_) => "binary",
                        Value::Json(_) => "json",
                    };
                    println!("{kind:<6}  {key}");
                })
                .await?;
            for failure in &summary.failures {
                warn!(path = ?failure.path, error = %failure.error, "Unreadable record");
            }
        }
    }
    Ok(())
}

fn require_key(key: &str) -> anyhow::Result<()> {
    if !is_valid_key(key) {
        bail!("key must be a non-empty string");
    }
    Ok(())
}
