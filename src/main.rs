//! Szinkron CLI entry point.

use clap::Parser;
use szinkron::cli::{commands, Cli, Commands};
use szinkron::config::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let settings = Settings::load_from(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => commands::run_serve(host, port, settings).await,
        Commands::Transcribe {
            url,
            test,
            no_breath,
            post_edit,
            model,
            language,
        } => {
            commands::run_transcribe(url, test, no_breath, post_edit, model, language, settings)
                .await
        }
        Commands::Dub => commands::run_dub(settings).await,
        Commands::Voices { provider, language } => {
            commands::run_voices(provider, language, settings).await
        }
        Commands::Providers { text } => commands::run_providers(text, settings).await,
        Commands::Doctor => commands::run_doctor(settings).await,
    }
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "szinkron=info",
        1 => "szinkron=debug",
        _ => "szinkron=trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
