use clap::{Args, Subcommand};
use serde_json::json;

use crate::cli::print_json;
use crate::config::Config as AppConfig;
use crate::error::Result;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

pub async fn execute(args: ConfigArgs, config: &AppConfig, config_override: Option<&str>) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            if args.json {
                return print_json(config);
            }

            println!("Current configuration:");
            println!("  database_path: {}", config.database_path.display());
            println!("  provider_url: {}", config.provider_url);
            println!("  provider_timeout_secs: {}", config.provider_timeout_secs);
            println!("  max_retries: {}", config.max_retries);
            println!("  retry_delay_ms: {}", config.retry_delay_ms);
            println!("  redis_url: {}", config.redis_url.as_deref().unwrap_or("(none, in-memory cache)"));
            println!("  song_text_cache_ttl_secs: {}", config.song_text_cache_ttl_secs);
            println!("  default_page_limit: {}", config.default_page_limit);
        }

        ConfigCommands::Path => {
            let path = match config_override {
                Some(path) => std::path::PathBuf::from(path),
                None => AppConfig::config_path()?,
            };

            if args.json {
                return print_json(&json!({ "path": path }));
            }
            println!("{}", path.display());
        }
    }

    Ok(())
}
