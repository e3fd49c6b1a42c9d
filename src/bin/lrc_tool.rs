//! Standalone lyric utilities: look up an LRC on lrclib.net, or realign an
//! existing `.lrc` file.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use albumsync::config::Config;
use albumsync::lrclib::LrclibClient;
use albumsync::postprocess::{self, Correction};
use albumsync::progress::set_log_only;
use albumsync::selector::{resolve_lyrics, select};
use albumsync::settings::LyricSettings;
use albumsync::timestamp::Timestamp;

#[derive(Parser)]
#[command(name = "lrc-tool")]
#[command(about = "Look up and realign synced lyrics")]
struct Args {
    /// Config file (default: ~/.config/albumsync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find lyrics for a track and print the LRC to stdout
    Lookup {
        #[arg(long)]
        track: String,

        #[arg(long)]
        artist: String,

        #[arg(long)]
        album: String,

        /// Audio duration in seconds
        #[arg(long)]
        duration: f64,

        /// Use this lrclib.net record id
        #[arg(long)]
        id: Option<u64>,

        #[arg(long)]
        duration_slop: Option<f64>,

        #[arg(long)]
        no_exact: bool,

        #[arg(long)]
        no_search: bool,

        /// Shift every line by this much (seconds or MM:SS.CC)
        #[arg(long, allow_hyphen_values = true, value_parser = parse_time)]
        offset: Option<Timestamp>,

        /// Move the first line to this time
        #[arg(long, value_parser = parse_time)]
        start: Option<Timestamp>,

        /// Print the candidate list instead of the lyrics
        #[arg(long)]
        candidates: bool,
    },

    /// Apply an offset or start time to an .lrc file
    Shift {
        input: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, allow_hyphen_values = true, value_parser = parse_time)]
        offset: Option<Timestamp>,

        #[arg(long, value_parser = parse_time)]
        start: Option<Timestamp>,
    },
}

/// Seconds (`-1.25`) or `[-]MM:SS.CC`.
fn parse_time(s: &str) -> std::result::Result<Timestamp, String> {
    if let Ok(secs) = s.parse::<f64>() {
        if secs.is_finite() {
            return Ok(Timestamp::from_secs_f64(secs));
        }
    }
    Timestamp::parse(s).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();
    // Lookup logs go to stderr; keep stdout for the LRC itself.
    set_log_only(true);

    match args.command {
        Command::Lookup {
            track,
            artist,
            album,
            duration,
            id,
            duration_slop,
            no_exact,
            no_search,
            offset,
            start,
            candidates,
        } => {
            let config = Config::load(args.config.as_deref()).context("Failed to load config")?;
            let client = LrclibClient::new(
                config.lrclib_url(),
                config.http_timeout(),
                &config.user_agent(),
            );

            let overrides = LyricSettings {
                id,
                duration_slop,
                try_exact: no_exact.then_some(false),
                try_search: no_search.then_some(false),
                offset,
                start,
                ..Default::default()
            };
            let settings = config
                .lyrics
                .merge(&LyricSettings::for_track(&track, &artist, &album, duration))
                .merge(&overrides);

            if candidates {
                let query = settings.query()?;
                match select(&client, &query)? {
                    Some(c) => println!(
                        "{}\t{}\t{:.1}s\t{} - {} ({})\tsynced={}",
                        c.id,
                        c.provenance,
                        c.duration,
                        c.artist_name,
                        c.track_name,
                        c.album_name,
                        c.has_synced()
                    ),
                    None => println!("no candidate"),
                }
                return Ok(());
            }

            match resolve_lyrics(&client, &settings, "lookup")? {
                Some(resolved) => println!("{}", resolved.lrc),
                None => bail!("no synced lyrics found for {:?} by {:?}", track, artist),
            }
        }

        Command::Shift {
            input,
            output,
            offset,
            start,
        } => {
            let correction = Correction::from_settings(offset, start)?;
            if correction == Correction::None {
                bail!("nothing to do: pass --offset or --start");
            }
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let shifted = postprocess::apply(&text, correction, "shift")?;
            match output {
                Some(path) => std::fs::write(&path, shifted + "\n")
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", shifted),
            }
        }
    }

    Ok(())
}
