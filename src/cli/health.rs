use clap::Args;

use crate::cli::print_json;
use crate::core::infrastructure::CancelToken;
use crate::core::services::Catalog;
use crate::error::Result;

#[derive(Args)]
pub struct PingArgs {
    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: PingArgs, catalog: &Catalog, cancel: &CancelToken) -> Result<()> {
    let report = cancel.guard(catalog.ping()).await?;

    if args.json {
        return print_json(&report);
    }

    println!("pong");
    println!("  database: {}", report.database);
    println!("  cache ({}): {}", report.cache_backend, report.cache);
    Ok(())
}
