//! dropdock - Main entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dropdock::{
    cli::{
        Cli, Command, run_apply_command, run_can_perform_command, run_doctor_command,
        run_drops_command, run_perform_command,
    },
    config::Config,
    performer::DropRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Completion output goes straight to stdout; keep it free of log lines
    if let Command::Completion(completion) = &cli.command {
        return completion.run();
    }

    let _ = dotenvy::dotenv();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dropdock=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let registry = DropRegistry::builtin();

    match cli.command {
        Command::Drops => {
            run_drops_command(&registry);
            Ok(())
        }
        Command::CanPerform { drop, action, args } => {
            run_can_perform_command(Config::from_env()?, &registry, &drop, &action, args).await
        }
        Command::Perform { drop, action, args } => {
            run_perform_command(Config::from_env()?, &registry, &drop, &action, args).await
        }
        Command::Apply { spec, namespace } => {
            run_apply_command(Config::from_env()?, &spec, namespace).await
        }
        Command::Doctor => run_doctor_command().await,
        Command::Completion(_) => Ok(()),
    }
}
