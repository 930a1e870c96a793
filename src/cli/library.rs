use clap::Args;

use crate::cli::print_json;
use crate::core::infrastructure::CancelToken;
use crate::core::models::LibraryFilter;
use crate::core::services::Catalog;
use crate::error::Result;

#[derive(Args)]
pub struct ListArgs {
    /// Group name substring (case-insensitive)
    #[arg(long)]
    group: Option<String>,

    /// Song name substring (case-insensitive)
    #[arg(long)]
    song: Option<String>,

    /// Lyrics substring (case-insensitive)
    #[arg(long)]
    text: Option<String>,

    /// Exact release date
    #[arg(long)]
    release_date: Option<String>,

    /// Page number, starting at 1
    #[arg(short, long)]
    page: Option<i64>,

    /// Songs per page
    #[arg(short, long)]
    limit: Option<i64>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: ListArgs, catalog: &Catalog, cancel: &CancelToken) -> Result<()> {
    let filter = LibraryFilter {
        group: args.group,
        song: args.song,
        text: args.text,
        release_date: args.release_date,
    };

    let page = catalog.list_songs(&filter, args.page, args.limit, cancel).await?;

    if args.json {
        return print_json(&page);
    }

    if page.songs.is_empty() {
        println!("No songs found (page {}, {} total)", page.page, page.total);
        return Ok(());
    }

    println!("Page {} ({} per page, {} total):", page.page, page.limit, page.total);
    for song in &page.songs {
        let release = if song.release_date.is_empty() {
            "unknown date"
        } else {
            song.release_date.as_str()
        };
        println!("  [{}] {} - {} ({})", song.id, song.group_name, song.song_name, release);
    }

    Ok(())
}
