use clap::{Parser, Subcommand};

mod app;
mod auth;
mod config;
mod error;
mod state;
mod storage;
mod uploads;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "smartpantry")]
#[command(about = "SmartPantry accounts and asset upload API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Grant admin privileges to an existing user
    SetAdmin {
        /// Email address of the user
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "smartpantry=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    let app_state = AppState::init().await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            auth::services::bootstrap_admin(&app_state).await?;
            app::serve(app::build_app(app_state)).await
        }
        Commands::SetAdmin { email } => {
            let user = auth::services::promote_admin(&app_state, &email)
                .await
                .map_err(|e| anyhow::anyhow!("set-admin {email}: {e}"))?;
            tracing::info!(user_id = user.id, email = %user.email, "admin granted");
            Ok(())
        }
    }
}
