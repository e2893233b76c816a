use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "minichain-cli")]
#[command(about = "CLI client for the minichain node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction
    Submit {
        /// Sender; omit to issue coins from the system
        #[arg(long)]
        from: Option<String>,
        /// Recipient
        #[arg(long)]
        to: String,
        /// Amount
        #[arg(long)]
        amount: u64,
    },
    /// Mine the pending transactions into a block
    Mine {
        /// Address credited with the reward in the next block
        #[arg(long)]
        reward_address: String,
    },
    /// Show the balance of an address
    Balance { address: String },
    /// Check the chain's integrity
    Validate,
    /// Show the chain tip
    Head,
}

#[derive(Serialize)]
struct Tx {
    from: Option<String>,
    to: String,
    amount: u64,
}

#[derive(Serialize)]
struct Mine {
    reward_address: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();
    let req = match cli.cmd {
        Command::Submit { from, to, amount } => client
            .post(format!("{node}/tx"))
            .json(&Tx { from, to, amount }),
        Command::Mine { reward_address } => client
            .post(format!("{node}/mine"))
            .json(&Mine { reward_address }),
        Command::Balance { address } => client.get(balance_url(node, &address)),
        Command::Validate => client.get(format!("{node}/chain/valid")),
        Command::Head => client.get(format!("{node}/chain/head")),
    };
    debug!(?req, "sending");

    let res = req.send().await?;
    println!("status: {}", res.status());
    let body = res.text().await?;
    println!("{}", render_body(&body));
    Ok(())
}

/// Addresses are arbitrary strings, so the path segment is percent-encoded.
fn balance_url(node: &str, address: &str) -> String {
    format!("{node}/balance/{}", urlencoding::encode(address))
}

/// Pretty-prints JSON replies; anything else is shown as received.
fn render_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_else(|_| body.to_string()),
        Err(_) => body.to_string(),
    }
}
