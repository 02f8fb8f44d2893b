//! `vivad` — the interview gateway daemon.

mod api;
mod bootstrap;
mod state;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vivad", about = "AI mock-interview gateway", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway (default).
    Serve {
        /// Override the bind address from the environment.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = viva_domain::Config::from_env();
    if let Some(Command::Serve { bind: Some(addr) }) = &cli.command {
        config.bind_addr = addr.clone();
    }

    let state = bootstrap::build_state(config).await?;
    api::serve(state).await
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}
