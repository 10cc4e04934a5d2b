use clap::Parser;
use modmail::utils::error::ErrorSeverity;
use modmail::utils::{logger, validation::Validate};
use modmail::{CliConfig, ModmailBot, ModmailConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting modmail");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let config = match load_config(&cli) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!(
                "❌ Failed to load config: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(exit_code_for(e.severity()));
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(exit_code_for(e.severity()));
    }

    let mut bot = match ModmailBot::new(config, &cli.cache_path) {
        Ok(bot) => bot,
        Err(e) => {
            tracing::error!("❌ Failed to start the bot: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(exit_code_for(e.severity()));
        }
    };

    tracing::info!("✅ Bot ready, waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutdown signal received");
    bot.close();

    Ok(())
}

fn load_config(cli: &CliConfig) -> modmail::Result<ModmailConfig> {
    match &cli.config {
        Some(path) => ModmailConfig::from_file(path),
        None => ModmailConfig::load(),
    }
}

fn exit_code_for(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
