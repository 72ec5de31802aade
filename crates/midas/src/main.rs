use clap::Parser;
use midas::MidasKernel;
use std::path::PathBuf;
use tracing::error;

/// Midas: personal multimodal knowledge-capture server.
#[derive(Parser, Debug)]
#[command(name = "midas-server")]
struct Cli {
    /// Path to the YAML config file. Falls back to MIDAS_CONFIG_PATH.
    #[arg(long, env = "MIDAS_CONFIG_PATH", default_value = "midas.yaml")]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    midas_telemetry::init_tracing("midas");

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(async {
        let kernel = MidasKernel::ignite(&cli.config).await.unwrap_or_else(|e| {
            error!(error = %e, "fatal: failed to bootstrap midas");
            std::process::exit(1);
        });

        if let Err(e) = kernel.launch().await {
            error!(error = %e, "fatal: midas server exited with an error");
            std::process::exit(1);
        }
    });

    Ok(())
}
