mod instance;
mod vault_commands;

use {
    clap::{Parser, Subcommand},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "tokenvault",
    about = "Tokenization vault: exchange sensitive values for reversible tokens"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the local vault configuration.
    Init(vault_commands::InitArgs),
    /// Encrypt and store a new secret.
    Store(vault_commands::StoreArgs),
    /// Show the stored (still encrypted) token for an id.
    Peek {
        /// Identifier of the token to show.
        #[arg(long, short)]
        id: String,
    },
    /// Retrieve and decrypt the secret behind an id.
    Peel {
        /// Identifier of the token to decrypt.
        #[arg(long, short)]
        id: String,
    },
    /// List every stored token, grouped by parent id.
    List,
    /// Remove a stored token.
    Delete {
        /// Identifier of the token to remove.
        #[arg(long, short)]
        id: String,
    },
    /// Service management.
    Service {
        #[command(subcommand)]
        action: ServiceAction,
    },
}

#[derive(Subcommand)]
enum ServiceAction {
    /// Start the HTTP service with the selected storage backend.
    Run(vault_commands::RunArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_ansi(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    match cli.command {
        Commands::Init(args) => vault_commands::handle_init(args),
        Commands::Store(args) => vault_commands::handle_store(args).await,
        Commands::Peek { id } => vault_commands::handle_peek(&id).await,
        Commands::Peel { id } => vault_commands::handle_peel(&id).await,
        Commands::List => vault_commands::handle_list().await,
        Commands::Delete { id } => vault_commands::handle_delete(&id).await,
        Commands::Service {
            action: ServiceAction::Run(args),
        } => vault_commands::handle_service_run(args).await,
    }
}
