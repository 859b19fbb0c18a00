use clap::Parser;
use formsaathi::cli::commands::{
    ProbeOptions, ScanOptions, ServeOptions, cmd_probe, cmd_scan, cmd_serve, merge_azure,
};
use formsaathi::cli::config::{Cli, Commands, OllamaConfig, load_config};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// RUST_LOG wins; otherwise -v raises the level from warn.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Serve {
            host,
            port,
            provider,
            azure_endpoint,
            azure_deployment,
            azure_api_key,
            ollama_endpoint,
            ollama_model,
        } => {
            let options = ServeOptions {
                host,
                port,
                provider,
                azure: merge_azure(&config.azure, azure_endpoint, azure_deployment, azure_api_key),
                ollama: OllamaConfig {
                    endpoint: ollama_endpoint.or_else(|| config.ollama.endpoint.clone()),
                    model: ollama_model.or_else(|| config.ollama.model.clone()),
                },
            };
            cmd_serve(&config, options).await?;
        }
        Commands::Scan {
            snapshot,
            backend_url,
            language,
            rescans,
            trace,
            fallback,
        } => {
            let options = ScanOptions {
                snapshot,
                backend_url,
                language,
                rescans,
                trace,
                fallback,
            };
            cmd_scan(&config, options, cli.verbose).await?;
        }
        Commands::Probe {
            backend_url,
            label,
            field_type,
            placeholder,
            language,
            domain,
        } => {
            let options = ProbeOptions {
                backend_url,
                label,
                field_type,
                placeholder,
                language,
                domain,
            };
            cmd_probe(&config, options).await?;
        }
    }

    Ok(())
}
