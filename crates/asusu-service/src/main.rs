use asusu_core::config::{AdvisoryConfig, ForceStartPolicy, PayoutPolicy, StoreConfig};
use asusu_service::{build_router, ServiceConfig, ServiceState};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PayoutMode {
    Leader,
    Rotation,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ForceStartMode {
    KeepCapacity,
    LockToMembers,
}

#[derive(Debug, Parser)]
#[command(name = "asusud", version, about = "Asusu savings group REST service")]
struct Cli {
    /// REST socket address to bind, e.g. 127.0.0.1:8092
    #[arg(long, default_value = "127.0.0.1:8092", env = "ASUSU_LISTEN")]
    listen: SocketAddr,
    /// Preload the demo groups and opening balance.
    #[arg(long, default_value_t = true, env = "ASUSU_SEED_DEMO", action = clap::ArgAction::Set)]
    seed_demo: bool,
    /// User id that receives the demo opening balance.
    #[arg(long, default_value = asusu_core::seed::DEMO_USER_ID)]
    demo_user: String,
    /// Who collects the pot on disbursement.
    #[arg(long, value_enum, default_value_t = PayoutMode::Leader)]
    payout: PayoutMode,
    /// Whether force-start keeps the capacity as the cycle size.
    #[arg(long, value_enum, default_value_t = ForceStartMode::KeepCapacity)]
    force_start: ForceStartMode,
    /// Gemini API key. Advisory serves the fallback report when unset.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,
    /// Gemini model used for advisory reports.
    #[arg(long, default_value = "gemini-3-flash-preview")]
    gemini_model: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "asusu_service=info,asusu_core=info,info".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig {
        store: StoreConfig {
            payout_policy: match cli.payout {
                PayoutMode::Leader => PayoutPolicy::Leader,
                PayoutMode::Rotation => PayoutPolicy::Rotation,
            },
            force_start_policy: match cli.force_start {
                ForceStartMode::KeepCapacity => ForceStartPolicy::KeepCapacity,
                ForceStartMode::LockToMembers => ForceStartPolicy::LockToMembers,
            },
            ..StoreConfig::default()
        },
        advisory: AdvisoryConfig {
            model: cli.gemini_model,
            ..AdvisoryConfig::default()
        },
        gemini_api_key: cli.gemini_api_key,
        seed_demo: cli.seed_demo,
        demo_user: cli.demo_user,
        ..ServiceConfig::default()
    };

    let state = ServiceState::bootstrap(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    info!("asusu-service REST listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
