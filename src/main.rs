//! cardiokit entry point

use cardiokit::cli::{cmd_serve, cmd_train, Cli, Commands, TrainArgs};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardiokit=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { data, output, n_jobs, seed, data_url, target } => {
            cmd_train(TrainArgs { data, output, n_jobs, seed, data_url, target }).await?;
        }
        Commands::Serve { model, host, port, drift_policy } => {
            cmd_serve(model, &host, port, &drift_policy).await?;
        }
    }

    Ok(())
}
