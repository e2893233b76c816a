use clap::Parser;
use minichain_core::{ChainConfig, MiningStrategy, SharedChain};
use minichain_node::{app, AppState};
use std::{net::SocketAddr, time::Duration};
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Leading zero hex characters required of each block hash
    #[arg(long, default_value_t = 4)]
    difficulty: u32,

    /// Amount paid to the miner of each block
    #[arg(long, default_value_t = 100)]
    reward: u64,

    /// Search nonces on every core
    #[arg(long)]
    parallel: bool,

    /// Give up on a mining request after this many seconds
    #[arg(long)]
    mining_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let strategy = if args.parallel {
        MiningStrategy::Parallel
    } else {
        MiningStrategy::Sequential
    };
    let config = ChainConfig::default()
        .with_difficulty(args.difficulty)
        .with_mining_reward(args.reward)
        .with_strategy(strategy);
    let chain = SharedChain::with_config(config)?;

    let state = AppState {
        chain,
        mining_timeout: args.mining_timeout_secs.map(Duration::from_secs),
    };

    let addr: SocketAddr = args.listen.parse()?;
    info!(difficulty = args.difficulty, "minichain-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
