//! Subcommand handlers.

use std::path::PathBuf;

use {
    anyhow::{Context, Result, ensure},
    clap::Args,
    tracing::info,
};

use {
    tokenvault_core::{Child, ChildReceipt, Receipt},
    tokenvault_service::{DEFAULT_PORT, ServiceConfig},
    tokenvault_store::{StoreConfig, remote::DEFAULT_REMOTE_URL},
};

use crate::instance::{self, InstanceConfig};

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreKind {
    Memory,
    File,
    Snapshot,
    Remote,
}

/// Backend selection flags shared by `init` and `service run`.
#[derive(Args)]
pub struct StoreOpts {
    /// Storage backend.
    #[arg(long, value_enum, default_value = "file")]
    store: StoreKind,

    /// Disk location for the file store.
    #[arg(long)]
    file_path: Option<PathBuf>,

    /// Disk location for the snapshot store.
    #[arg(long)]
    snapshot_path: Option<PathBuf>,

    /// Discard any existing snapshot on startup.
    #[arg(long, default_value_t = false)]
    truncate: bool,

    /// Connection URL for the remote cache.
    #[arg(long, default_value = DEFAULT_REMOTE_URL)]
    url: String,
}

impl StoreOpts {
    fn to_config(&self) -> StoreConfig {
        let data_dir = instance::data_dir();
        match self.store {
            StoreKind::Memory => StoreConfig::Memory,
            StoreKind::File => StoreConfig::File {
                path: self
                    .file_path
                    .clone()
                    .unwrap_or_else(|| data_dir.join("vault.store")),
            },
            StoreKind::Snapshot => StoreConfig::Snapshot {
                path: self
                    .snapshot_path
                    .clone()
                    .unwrap_or_else(|| data_dir.join("vault.snapshot")),
                truncate: self.truncate,
            },
            StoreKind::Remote => StoreConfig::Remote {
                url: self.url.clone(),
            },
        }
    }
}

fn default_cipher_path() -> PathBuf {
    instance::config_dir().join("material")
}

// ── init ─────────────────────────────────────────────────────────────────

#[derive(Args)]
pub struct InitArgs {
    #[command(flatten)]
    store: StoreOpts,

    /// Location of the cipher material file.
    #[arg(long)]
    cipher_path: Option<PathBuf>,
}

pub fn handle_init(args: InitArgs) -> Result<()> {
    let config = InstanceConfig {
        store: args.store.to_config(),
        cipher_path: args.cipher_path.unwrap_or_else(default_cipher_path),
    };

    let path = instance::default_config_path();
    config.save(&path)?;

    println!("Vault configured with the {} backend.", config.store.kind());
    println!("Config written to {}.", path.display());
    Ok(())
}

// ── store ────────────────────────────────────────────────────────────────

#[derive(Args)]
pub struct StoreArgs {
    /// Identifier to store the secret under.
    #[arg(long, short)]
    id: String,

    #[command(flatten)]
    secret: SecretInput,
}

/// Exactly one source for the secret value.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct SecretInput {
    /// Secret value passed directly.
    #[arg(long)]
    secret: Option<String>,

    /// Read the secret from a file.
    #[arg(long)]
    secret_file: Option<PathBuf>,

    /// Read the secret from stdin.
    #[arg(long)]
    stdin: bool,
}

impl SecretInput {
    fn resolve(self) -> Result<String> {
        if let Some(secret) = self.secret {
            return Ok(secret);
        }

        if let Some(path) = self.secret_file {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("reading secret file {}", path.display()))?;
            ensure!(!contents.is_empty(), "secret file {} is empty", path.display());
            return Ok(contents);
        }

        // --stdin
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)?;
        ensure!(!buf.is_empty(), "no secret data on stdin");
        Ok(buf)
    }
}

pub async fn handle_store(args: StoreArgs) -> Result<()> {
    let manager = load_manager().await?;
    let secret = args.secret.resolve()?;

    let token = manager.tokenize(&args.id, &secret).await?;
    info!(id = %args.id, "secret stored");

    let issued = Child {
        key: args.id,
        value: token,
    };
    println!("{}", serde_json::to_string_pretty(&issued)?);
    Ok(())
}

// ── peek / peel / list / delete ──────────────────────────────────────────

pub async fn handle_peek(id: &str) -> Result<()> {
    let manager = load_manager().await?;
    let token = manager.token_by_id(id).await?;
    println!("{}", serde_json::to_string_pretty(&token)?);
    Ok(())
}

pub async fn handle_peel(id: &str) -> Result<()> {
    let manager = load_manager().await?;

    let stored = manager.token_by_id(id).await?;
    let token = stored
        .data
        .first()
        .map(|child| child.value.clone())
        .context("empty response for id")?;
    let datum = manager.detokenize(id, &token).await?;

    let receipt = ChildReceipt {
        key: id.to_string(),
        value: Receipt { found: true, datum },
    };
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

pub async fn handle_list() -> Result<()> {
    let manager = load_manager().await?;
    let all = manager.all_tokens().await?;
    println!("{}", serde_json::to_string_pretty(&all)?);
    Ok(())
}

pub async fn handle_delete(id: &str) -> Result<()> {
    let manager = load_manager().await?;
    manager.delete_by_id(id).await?;
    println!("Deleted {id}.");
    Ok(())
}

// ── service run ──────────────────────────────────────────────────────────

#[derive(Args)]
pub struct RunArgs {
    /// Port for the service to listen on.
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[command(flatten)]
    store: StoreOpts,

    /// Location of the cipher material file.
    #[arg(long)]
    cipher_path: Option<PathBuf>,
}

pub async fn handle_service_run(args: RunArgs) -> Result<()> {
    let config = ServiceConfig {
        port: args.port,
        store: args.store.to_config(),
        cipher_path: args.cipher_path.unwrap_or_else(default_cipher_path),
    };
    tokenvault_service::serve(config).await
}

async fn load_manager() -> Result<tokenvault_core::Manager> {
    let config = InstanceConfig::load(&instance::default_config_path())?;
    config.manager().await
}
