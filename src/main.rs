use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use albumsync::config::Config;
use albumsync::cover::{CoverFetcher, HttpCoverSource};
use albumsync::fetch::{FetchCache, YtDlp};
use albumsync::lrclib::{CachedRepository, LrclibClient};
use albumsync::pipeline::{AlbumPlan, Pipeline};
use albumsync::progress::{format_duration, log_line, set_log_only};
use albumsync::safety::validate_output_dir;
use albumsync::settings::LyricSettings;

#[derive(Parser)]
#[command(name = "albumsync")]
#[command(about = "Download, tag and attach synced lyrics to albums described by YAML specs")]
struct Args {
    /// Album spec files
    #[arg(required = true)]
    specs: Vec<PathBuf>,

    /// Output root; albums go into `<artist> - <album>` below it
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Only load and check the specs
    #[arg(long)]
    validate_only: bool,

    /// Skip albums whose output directory already exists
    #[arg(long)]
    ifne: bool,

    /// Parallel tracks per album (0 = one per core)
    #[arg(long)]
    workers: Option<usize>,

    /// Config file (default: ~/.config/albumsync/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Download cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Lyric/audio duration tolerance in seconds
    #[arg(long)]
    duration_slop: Option<f64>,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,

    /// Disable progress bars, print plain log lines
    #[arg(long)]
    log_only: bool,
}

impl Args {
    /// Flags that override config file values.
    fn as_config(&self) -> Config {
        Config {
            cache_dir: self.cache_dir.clone(),
            workers: self.workers,
            lyrics: LyricSettings {
                duration_slop: self.duration_slop,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);

    let mut config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    config.merge(&args.as_config());
    config.lyrics.validate().context("Invalid lyric defaults")?;

    if args.show_config {
        config.print("Effective configuration");
        return Ok(());
    }

    // Everything is validated before the first download.
    let mut plans = Vec::with_capacity(args.specs.len());
    for spec in &args.specs {
        let plan = AlbumPlan::load(spec, &config.lyrics)
            .with_context(|| format!("not valid: {}", spec.display()))?;
        plans.push(plan);
    }
    if args.validate_only {
        println!("{} spec(s) valid", plans.len());
        return Ok(());
    }

    if let Some(workers) = config.workers.filter(|&n| n > 0) {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let cache_dir = config.cache_dir()?;
    validate_output_dir(&args.out, &cache_dir)?;
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create cache dir {}", cache_dir.display()))?;

    let user_agent = config.user_agent();
    let pipeline = Pipeline {
        fetcher: FetchCache::new(cache_dir, YtDlp::new(config.yt_dlp(), config.socket_timeout())),
        covers: CoverFetcher::new(HttpCoverSource::new(config.http_timeout(), &user_agent)),
        lyrics: CachedRepository::new(LrclibClient::new(
            config.lrclib_url(),
            config.http_timeout(),
            &user_agent,
        )),
        tagger: albumsync::tagging::LoftyTagger,
        lyric_defaults: config.lyrics.clone(),
    };

    let start = Instant::now();
    let mut failed_albums = 0;
    let mut failed_tracks = 0;
    let mut done_tracks = 0;

    for plan in &plans {
        let album_dir = plan.album_dir(&args.out);
        if args.ifne && album_dir.exists() {
            log_line("album", &format!("skipping existing {}", album_dir.display()));
            continue;
        }
        log_line("album", &format!("{} -> {}", plan.spec_path.display(), album_dir.display()));

        match pipeline.process_album(plan, &album_dir) {
            Ok(report) => {
                for outcome in &report.tracks {
                    match &outcome.result {
                        Ok(_) => done_tracks += 1,
                        Err(e) => {
                            failed_tracks += 1;
                            eprintln!(
                                "  FAILED track[{}] {:?}: {}{}",
                                outcome.index,
                                outcome.title,
                                e,
                                if e.is_retryable() { " (retryable)" } else { "" }
                            );
                        }
                    }
                }
            }
            Err(e) => {
                failed_albums += 1;
                eprintln!("  FAILED album {}: {}", plan.spec_path.display(), e);
            }
        }
    }

    println!("\n{:=<60}", "");
    println!("Done in {}", format_duration(start.elapsed()));
    println!("  Tracks written: {}", done_tracks);
    println!("  Tracks failed:  {}", failed_tracks);
    println!("  Albums failed:  {}", failed_albums);
    println!("{:=<60}", "");

    if failed_albums > 0 || failed_tracks > 0 {
        bail!("{} album(s) and {} track(s) failed", failed_albums, failed_tracks);
    }
    Ok(())
}
