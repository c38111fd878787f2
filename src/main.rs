//! Multisig Engine CLI Application
//!
//! A command-line interface for deploying and operating M-of-N wallets.

use clap::{Parser, Subcommand};
use multisig_engine::api::{create_router, ApiState};
use multisig_engine::cli::{self, AppState};
use multisig_engine::storage::{Storage, StorageConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "multisig")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "An M-of-N multi-signature wallet engine in Rust", long_about = None)]
struct Cli {
    /// Data directory for wallet storage
    #[arg(short, long, default_value = ".multisig_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a new multisig wallet
    Deploy {
        /// Owner identities (comma-separated)
        #[arg(short, long)]
        owners: String,

        /// Confirmations required to execute
        #[arg(short, long)]
        quorum: usize,

        /// Optional label for the wallet
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List deployed wallets
    List,

    /// Show wallet details
    Info {
        /// Wallet address
        #[arg(short, long)]
        address: String,
    },

    /// Deposit value into a wallet
    Deposit {
        /// Wallet address
        #[arg(short, long)]
        address: String,

        /// Sender identity
        #[arg(short, long)]
        from: String,

        /// Amount to deposit
        #[arg(long)]
        amount: u128,
    },

    /// Submit a transaction proposal
    Submit {
        /// Wallet address
        #[arg(short, long)]
        address: String,

        /// Submitting owner
        #[arg(short, long)]
        caller: String,

        /// Destination
        #[arg(short, long)]
        to: String,

        /// Value to send
        #[arg(short, long, default_value = "0")]
        value: u128,

        /// Call payload as hex
        #[arg(long, default_value = "0x")]
        data: String,
    },

    /// Confirm a transaction
    Confirm {
        /// Wallet address
        #[arg(short, long)]
        address: String,

        /// Confirming owner
        #[arg(short, long)]
        caller: String,

        /// Transaction index
        #[arg(short, long)]
        index: usize,
    },

    /// Revoke a confirmation
    Revoke {
        /// Wallet address
        #[arg(short, long)]
        address: String,

        /// Revoking owner
        #[arg(short, long)]
        caller: String,

        /// Transaction index
        #[arg(short, long)]
        index: usize,
    },

    /// Execute a confirmed transaction
    Execute {
        /// Wallet address
        #[arg(short, long)]
        address: String,

        /// Executing owner
        #[arg(short, long)]
        caller: String,

        /// Transaction index
        #[arg(short, long)]
        index: usize,
    },

    /// Show a transaction
    Tx {
        /// Wallet address
        #[arg(short, long)]
        address: String,

        /// Transaction index
        #[arg(short, long)]
        index: usize,
    },

    /// List a wallet's transactions
    Txs {
        /// Wallet address
        #[arg(short, long)]
        address: String,

        /// Only show pending transactions
        #[arg(long)]
        pending: bool,
    },

    /// Show a wallet's event log
    Events {
        /// Wallet address
        #[arg(short, long)]
        address: String,
    },

    /// Show an external account balance
    Account {
        /// Account identity
        #[arg(short, long)]
        address: String,
    },

    /// REST API server
    Api {
        #[command(subcommand)]
        action: ApiCommands,
    },
}

#[derive(Subcommand)]
enum ApiCommands {
    /// Start the REST API server
    Start {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Handle API commands with tokio runtime
    if let Commands::Api { ref action } = cli.command {
        return run_api_command(action, &cli.data_dir);
    }

    let mut state = AppState::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Api { .. } => unreachable!(),

        Commands::Deploy {
            owners,
            quorum,
            label,
        } => {
            cli::cmd_deploy(&mut state, &owners, quorum, label.as_deref())?;
        }

        Commands::List => {
            cli::cmd_list(&state)?;
        }

        Commands::Info { address } => {
            cli::cmd_info(&state, &address)?;
        }

        Commands::Deposit {
            address,
            from,
            amount,
        } => {
            cli::cmd_deposit(&mut state, &address, &from, amount)?;
        }

        Commands::Submit {
            address,
            caller,
            to,
            value,
            data,
        } => {
            cli::cmd_submit(&mut state, &address, &caller, &to, value, &data)?;
        }

        Commands::Confirm {
            address,
            caller,
            index,
        } => {
            cli::cmd_confirm(&mut state, &address, &caller, index)?;
        }

        Commands::Revoke {
            address,
            caller,
            index,
        } => {
            cli::cmd_revoke(&mut state, &address, &caller, index)?;
        }

        Commands::Execute {
            address,
            caller,
            index,
        } => {
            cli::cmd_execute(&mut state, &address, &caller, index)?;
        }

        Commands::Tx { address, index } => {
            cli::cmd_tx(&state, &address, index)?;
        }

        Commands::Txs { address, pending } => {
            cli::cmd_txs(&state, &address, pending)?;
        }

        Commands::Events { address } => {
            cli::cmd_events(&state, &address)?;
        }

        Commands::Account { address } => {
            cli::cmd_account(&state, &address)?;
        }
    }

    Ok(())
}

fn run_api_command(
    action: &ApiCommands,
    data_dir: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match action {
            ApiCommands::Start { port } => {
                let storage = Storage::new(StorageConfig {
                    data_dir: data_dir.clone(),
                    ..Default::default()
                })?;
                let factory = storage.load_or_default()?;
                let wallet_count = factory.instance_count();

                let state = ApiState::new(factory, storage);
                let shutdown_state = state.clone();
                let app = create_router(state);

                let addr = format!("0.0.0.0:{}", port);
                println!("🚀 Multisig API server starting on http://{}", addr);
                println!("   📂 Data dir: {}", data_dir.display());
                println!("   🔐 Wallets loaded: {}", wallet_count);
                println!();
                println!("📚 Endpoints:");
                println!("   GET  /health                                   - Health check");
                println!("   GET  /ws                                       - WebSocket events");
                println!("   GET  /api/wallets                              - List wallets");
                println!("   POST /api/wallets                              - Deploy wallet");
                println!("   GET  /api/wallets/{{addr}}                       - Wallet info");
                println!("   POST /api/wallets/{{addr}}/deposit               - Deposit");
                println!("   GET  /api/wallets/{{addr}}/events                - Event log");
                println!("   GET  /api/wallets/{{addr}}/transactions          - List transactions");
                println!("   POST /api/wallets/{{addr}}/transactions          - Submit transaction");
                println!("   GET  /api/wallets/{{addr}}/transactions/{{i}}      - Get transaction");
                println!("   POST /api/wallets/{{addr}}/transactions/{{i}}/confirm - Confirm");
                println!("   POST /api/wallets/{{addr}}/transactions/{{i}}/revoke  - Revoke");
                println!("   POST /api/wallets/{{addr}}/transactions/{{i}}/execute - Execute");
                println!("   GET  /api/accounts/{{addr}}                      - Account balance");
                println!();

                // Handle Ctrl+C with a final save
                tokio::spawn(async move {
                    tokio::signal::ctrl_c().await.ok();
                    println!("\n📴 Shutting down API server...");

                    println!("💾 Saving data...");
                    let factory = shutdown_state.factory.read().await;
                    match shutdown_state.storage.save(&factory) {
                        Ok(()) => println!("✅ Data saved successfully!"),
                        Err(e) => log::error!("Failed to save on shutdown: {}", e),
                    }
                    std::process::exit(0);
                });

                let listener = tokio::net::TcpListener::bind(&addr).await?;
                axum::serve(listener, app).await?;
            }
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
