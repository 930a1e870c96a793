use clap::Args;
use serde_json::json;

use crate::cli::print_json;
use crate::core::infrastructure::CancelToken;
use crate::core::lyrics::stanza_count;
use crate::core::models::{CreateOutcome, Song, SongId, SongPatch, SongRequest};
use crate::core::services::Catalog;
use crate::error::{MusicLabError, Result};

#[derive(Args)]
pub struct CreateArgs {
    /// Group (artist) name
    #[arg(short, long)]
    group: String,

    /// Song name
    #[arg(short, long)]
    song: String,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct VerseArgs {
    /// Song id
    #[arg(short, long)]
    id: SongId,

    /// Stanza number, starting at 1
    #[arg(short, long, default_value_t = 1)]
    page: i64,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Song id
    #[arg(short, long)]
    id: SongId,

    /// New group name (created if it does not exist yet)
    #[arg(short, long)]
    group: Option<String>,

    /// New song name
    #[arg(short, long)]
    song: Option<String>,

    #[arg(long)]
    release_date: Option<String>,

    /// Full replacement lyrics, stanzas separated by blank lines
    #[arg(long)]
    text: Option<String>,

    #[arg(long)]
    link: Option<String>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Song id
    #[arg(short, long, conflicts_with_all = ["group", "song"], required_unless_present_all = ["group", "song"])]
    id: Option<SongId>,

    /// Group name, used together with --song
    #[arg(short, long, requires = "song")]
    group: Option<String>,

    /// Song name, used together with --group
    #[arg(short, long, requires = "group")]
    song: Option<String>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

fn print_song(song: &Song) {
    println!("  id: {}", song.id);
    println!("  group: {}", song.group_name);
    println!("  song: {}", song.song_name);
    println!("  release date: {}", song.release_date);
    println!("  link: {}", song.link.as_deref().unwrap_or("-"));
    println!("  stanzas: {}", stanza_count(&song.text));
}

pub async fn create(args: CreateArgs, catalog: &Catalog, cancel: &CancelToken) -> Result<()> {
    let request = SongRequest::new(args.group, args.song);
    let created = catalog.create_song(&request, cancel).await?;

    if args.json {
        return print_json(&json!({
            "outcome": created.outcome,
            "song": created.song,
            "stanzas": stanza_count(&created.song.text),
        }));
    }

    match created.outcome {
        CreateOutcome::Created(_) => println!("Created song:"),
        CreateOutcome::AlreadyExists(_) => println!("Song already exists:"),
    }
    print_song(&created.song);
    Ok(())
}

pub async fn verse(args: VerseArgs, catalog: &Catalog, cancel: &CancelToken) -> Result<()> {
    let verse = catalog.get_verse(args.id, args.page, cancel).await?;

    if args.json {
        return print_json(&json!({
            "id": args.id,
            "page": args.page,
            "verse": verse,
        }));
    }

    println!("{}", verse);
    Ok(())
}

pub async fn update(args: UpdateArgs, catalog: &Catalog, cancel: &CancelToken) -> Result<()> {
    let patch = SongPatch {
        group_name: args.group,
        song_name: args.song,
        release_date: args.release_date,
        text: args.text,
        link: args.link,
    };

    let song = catalog.update_song(args.id, &patch, cancel).await?;

    if args.json {
        return print_json(&song);
    }

    println!("Updated song:");
    print_song(&song);
    Ok(())
}

pub async fn delete(args: DeleteArgs, catalog: &Catalog, cancel: &CancelToken) -> Result<()> {
    let id = match (args.id, args.group, args.song) {
        (Some(id), _, _) => {
            catalog.delete_song(id, cancel).await?;
            id
        }
        (None, Some(group), Some(song)) => catalog.delete_song_by_name(&group, &song, cancel).await?,
        _ => {
            return Err(MusicLabError::Validation(
                "delete requires --id or both --group and --song".to_string(),
            ))
        }
    };

    if args.json {
        return print_json(&json!({ "deleted": id }));
    }

    println!("Deleted song {}", id);
    Ok(())
}
