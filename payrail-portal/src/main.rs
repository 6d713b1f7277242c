//! Payrail Portal
//!
//! Subscriber command line: look up a plan, subscribe with a wallet or a
//! deposit vault, follow a subscription, list and cancel subscriptions.

mod commands;
mod store;
mod wallet;

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use payrail_core::config::{ChainConfig, DEFAULT_TOKEN_DECIMALS};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;
use uuid::Uuid;
use wallet::WalletArgs;

/// Payrail Portal - subscribe to and manage stablecoin subscriptions
#[derive(Parser, Debug)]
#[command(name = "payrail-portal")]
#[command(version, about, long_about = None)]
struct Args {
    /// Base URL of the Payrail server
    #[arg(long, env = "PAYRAIL_SERVER", default_value = "http://127.0.0.1:8080")]
    server: Url,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a plan as the checkout page would
    Plan { plan_id: i64 },

    /// Subscribe to a plan
    Subscribe {
        plan_id: i64,

        /// Pay from a connected wallet or through a deposit vault
        #[arg(long, value_enum, default_value_t = commands::Mode::Wallet)]
        mode: commands::Mode,

        /// Keep polling a vault subscription until it is active
        #[arg(long)]
        wait: bool,

        /// Submit the wallet subscription without asking for confirmation
        #[arg(long, short = 'y')]
        yes: bool,

        #[command(flatten)]
        chain: ChainArgs,

        #[command(flatten)]
        wallet: WalletArgs,
    },

    /// Show a subscription and its vault
    Status { subscription_id: Uuid },

    /// List the subscriptions of an address
    List {
        #[command(flatten)]
        wallet: WalletArgs,
    },

    /// Cancel a subscription
    Cancel {
        subscription_id: Uuid,

        #[command(flatten)]
        chain: ChainArgs,

        #[command(flatten)]
        wallet: WalletArgs,
    },
}

/// Chain access flags.
#[derive(clap::Args, Debug, Clone)]
struct ChainArgs {
    /// JSON-RPC endpoint used for reads
    #[arg(long, env = "PAYRAIL_RPC_URL")]
    rpc_url: Url,

    #[arg(long, env = "PAYRAIL_CHAIN_ID", default_value_t = 84532)]
    chain_id: u64,

    /// Subscription engine contract
    #[arg(long, env = "PAYRAIL_ENGINE_ADDRESS")]
    engine: Address,

    /// Decimals of the plan token
    #[arg(long, default_value_t = DEFAULT_TOKEN_DECIMALS)]
    token_decimals: u32,
}

impl From<ChainArgs> for ChainConfig {
    fn from(args: ChainArgs) -> Self {
        ChainConfig {
            rpc_url: args.rpc_url,
            chain_id: args.chain_id,
            engine_address: args.engine,
            token_decimals: args.token_decimals,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let portal = commands::Portal::new(args.server);

    match args.command {
        Command::Plan { plan_id } => portal.show_plan(plan_id).await,
        Command::Subscribe {
            plan_id,
            mode,
            wait,
            yes,
            chain,
            wallet,
        } => {
            portal
                .subscribe(plan_id, mode, wait, yes, chain.into(), &wallet)
                .await
        }
        Command::Status { subscription_id } => portal.status(subscription_id).await,
        Command::List { wallet } => portal.list(&wallet).await,
        Command::Cancel {
            subscription_id,
            chain,
            wallet,
        } => portal.cancel(subscription_id, chain.into(), &wallet).await,
    }
}

/// Logs go to stderr so command output stays pipeable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,payrail_portal=info,payrail_core=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
