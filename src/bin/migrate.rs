use clap::Parser;
use image_analyzer::cli::MigrateCli;
use image_analyzer::config::{LogConfig, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = MigrateCli::parse();

    image_analyzer::logging::init(&LogConfig {
        level: if cli.verbose { "debug" } else { "info" }.to_string(),
        format: LogFormat::Pretty,
    });

    if let Err(e) = image_analyzer::cli::run(cli).await {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }

    Ok(())
}
