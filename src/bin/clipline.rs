#![forbid(unsafe_code)]

//! Command-line front end: prints the `yt-dlp` + `ffmpeg` lines for a clip,
//! or the noembed details of a video.
//!
//! Nothing is executed. The output is meant to be copied into a shell.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use clipline::command::{ClipRequest, CommandGenerator, format_timestamp, parse_timestamp};
use clipline::config::{RuntimeOverrides, RuntimeSettings, resolve_runtime_settings};
use clipline::details::{DetailsLoader, JsonFetcher, UreqFetcher, VideoDetails};
use clipline::video_id::extract_video_id;
use log::info;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Prints yt-dlp/ffmpeg commands that cut a clip out of a YouTube video"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Env file with CLIPLINE_* settings (defaults to ./.env)
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Details endpoint, overrides CLIPLINE_ENDPOINT
    #[arg(long, global = true, value_name = "URL")]
    endpoint: Option<String>,

    /// HTTP timeout in seconds, overrides CLIPLINE_TIMEOUT_SECS
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Raise log verbosity (-v info, -vv debug). RUST_LOG wins when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the download and trim commands for a clip
    Command(CommandArgs),
    /// Look up title, author and thumbnail of a video
    Details(DetailsArgs),
}

#[derive(Args, Debug)]
struct CommandArgs {
    /// Video id or YouTube URL
    video: String,

    /// Clip start, in seconds or M:SS / H:MM:SS
    #[arg(long, value_name = "TIME", value_parser = parse_time_arg)]
    start: f64,

    /// Clip end, in seconds or M:SS / H:MM:SS
    #[arg(long, value_name = "TIME", value_parser = parse_time_arg)]
    end: f64,

    /// Keep only the audio track (mp3)
    #[arg(short = 'x', long)]
    audio: bool,

    /// Base name for the output file
    #[arg(long, value_name = "TEXT")]
    title: Option<String>,

    /// Fetch the video title and use it as base name
    #[arg(long, conflicts_with = "title")]
    lookup_title: bool,
}

#[derive(Args, Debug)]
struct DetailsArgs {
    /// Video id or YouTube URL
    video: String,

    /// Print the details as JSON
    #[arg(long)]
    json: bool,
}

fn parse_time_arg(value: &str) -> Result<f64, String> {
    parse_timestamp(value)
        .ok_or_else(|| format!("expected seconds or M:SS / H:MM:SS, got {value:?}"))
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = resolve_runtime_settings(RuntimeOverrides {
        details_endpoint: cli.endpoint.clone(),
        timeout_secs: cli.timeout,
        env_path: cli.env_file.clone(),
    })
    .context("loading settings")?;
    let fetcher = UreqFetcher::new(settings.request_timeout);

    let output = match &cli.command {
        Commands::Command(args) => run_command(args, &settings, &fetcher)?,
        Commands::Details(args) => run_details(args, &settings, &fetcher)?,
    };
    println!("{output}");
    Ok(())
}

fn run_command(
    args: &CommandArgs,
    settings: &RuntimeSettings,
    fetcher: impl JsonFetcher,
) -> Result<String> {
    // The id lands unquoted in the printed shell lines, so only accept ids
    // that passed the 11-character pattern.
    let Some(video_id) = extract_video_id(&args.video) else {
        bail!("not a YouTube video id or URL: {}", args.video);
    };

    let title = match (&args.title, args.lookup_title) {
        (Some(title), _) => Some(title.clone()),
        (None, true) => {
            let loader = DetailsLoader::new(fetcher, settings.details_endpoint.as_str());
            let title = loader.load(&video_id).map(|details| details.title);
            if title.is_none() {
                info!("no title found for {video_id}, naming the clip after the id");
            }
            title
        }
        (None, false) => None,
    };

    let request = ClipRequest {
        video_id: Some(video_id),
        start: Some(args.start),
        end: Some(args.end),
        extract_audio: args.audio,
        title,
    };

    let Some(commands) = CommandGenerator::new(settings.tools.clone()).generate(&request) else {
        bail!(
            "invalid clip range: start ({}) must come before end ({})",
            format_timestamp(args.start),
            format_timestamp(args.end)
        );
    };
    Ok(commands.to_string())
}

fn run_details(
    args: &DetailsArgs,
    settings: &RuntimeSettings,
    fetcher: impl JsonFetcher,
) -> Result<String> {
    let Some(video_id) = extract_video_id(&args.video) else {
        bail!("not a YouTube video id or URL: {}", args.video);
    };

    let loader = DetailsLoader::new(fetcher, settings.details_endpoint.as_str());
    let Some(details) = loader.load(&video_id) else {
        bail!("no details available for {video_id}");
    };

    if args.json {
        serde_json::to_string_pretty(&details).context("serializing video details")
    } else {
        Ok(render_details(&details))
    }
}

fn render_details(details: &VideoDetails) -> String {
    format!(
        "Title:     {}\nAuthor:    {}\nThumbnail: {}",
        details.title, details.author, details.image_url
    )
}
