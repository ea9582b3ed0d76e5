use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use error_stack::fmt::{Charset, ColorMode};
use error_stack::{IntoReport, Report, ResultExt};
use url::Url;

use zspotify::catalog::client::CatalogClient;
use zspotify::commands::{Commands, ZSpotifyCommand};
use zspotify::config::{AppConfig, MusicFormat, Settings, TagFailurePolicy};
use zspotify::download::Downloader;
use zspotify::postprocess::tags::LoftyTagger;
use zspotify::postprocess::transcode::FfmpegTranscoder;
use zspotify::session::librespot_session::LibrespotSession;
use zspotify::session::AudioQuality;

#[derive(Debug)]
pub struct ZSpotifyError;
impl fmt::Display for ZSpotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ZSpotify error")
    }
}
impl std::error::Error for ZSpotifyError {}

pub type ZSpotifyResult<T> = error_stack::Result<T, ZSpotifyError>;

/// Downloads tracks, albums and playlists from Spotify
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Spotify downloader")]
struct Cli {
    /// Track, album or playlist URI/URL, or a search term
    input: Option<String>,
    /// Pick one of your playlists and download it
    #[clap(long, short, action)]
    playlist: bool,
    /// Download your liked songs
    #[clap(long, action)]
    liked_songs: bool,
    /// Settings file, defaults to ~/.zspotify/config.json
    #[clap(long)]
    config: Option<PathBuf>,
    /// Directory the music is saved into
    #[clap(long)]
    root_path: Option<PathBuf>,
    /// mp3 or ogg
    #[clap(long)]
    music_format: Option<MusicFormat>,
    /// Keep the downloaded audio as is, without converting or tagging it
    #[clap(long, action)]
    raw: bool,
    /// Use the premium quality even if the account isn't detected as premium
    #[clap(long, action)]
    force_premium: bool,
    /// Download tracks again even if the file already exists
    #[clap(long, action)]
    no_skip_existing: bool,
    /// Delete files whose tags couldn't be written
    #[clap(long, action)]
    delete_on_tag_failure: bool,
    /// Timeout of every remote call, in seconds
    #[clap(long)]
    timeout: Option<u64>,
}

impl Cli {
    /// `-ls` isn't a valid short flag, so it is rewritten before parsing.
    fn parse_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = OsString>,
    {
        let args = args.into_iter().map(|arg| {
            if arg == "-ls" {
                OsString::from("--liked-songs")
            } else {
                arg
            }
        });
        Self::parse_from(args)
    }

    fn settings(&self) -> ZSpotifyResult<Settings> {
        let mut settings =
            Settings::load(self.config.as_deref()).change_context(ZSpotifyError)?;
        if let Some(root_path) = &self.root_path {
            settings.root_path = root_path.clone();
        }
        if let Some(music_format) = self.music_format {
            settings.music_format = music_format;
        }
        if self.raw {
            settings.raw_audio_as_is = true;
        }
        if self.force_premium {
            settings.force_premium = true;
        }
        if self.no_skip_existing {
            settings.skip_existing_files = false;
        }
        if self.delete_on_tag_failure {
            settings.tag_failure_policy = TagFailurePolicy::Delete;
        }
        if let Some(timeout) = self.timeout {
            settings.request_timeout_secs = timeout;
        }
        Ok(settings)
    }

    fn command(&self) -> ZSpotifyCommand {
        ZSpotifyCommand::from_args(self.input.as_deref(), self.playlist, self.liked_songs)
    }
}

pub struct Suggestion(String);

impl Suggestion {
    pub fn set_report() {
        Report::set_charset(Charset::Utf8);
        Report::set_color_mode(ColorMode::Color);
        Report::install_debug_hook::<Self>(|Self(value), context| {
            context.push_body(format!("{}: {value}", "suggestion".yellow()))
        });
    }
}

fn splash() {
    println!(
        "{}",
        "=================================\n\
         | Spotify Downloader            |\n\
         ================================="
            .green()
    );
    println!();
}

fn transcoder(settings: &Settings) -> ZSpotifyResult<FfmpegTranscoder> {
    match FfmpegTranscoder::from_path() {
        Some(transcoder) => Ok(transcoder),
        // Never invoked in raw mode.
        None if settings.raw_audio_as_is => Ok(FfmpegTranscoder::new(PathBuf::from("ffmpeg"))),
        None => Err(Report::new(ZSpotifyError)
            .attach_printable("ffmpeg was not found on the PATH")
            .attach(Suggestion(
                "install ffmpeg, or pass --raw to keep the audio as downloaded".to_string(),
            ))),
    }
}

fn run() -> ZSpotifyResult<()> {
    let cli = Cli::parse_args(std::env::args_os());

    Suggestion::set_report();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let settings = cli.settings()?;
    log::debug!("{settings:#?}");
    let transcoder = transcoder(&settings)?;
    let tagger = LoftyTagger;

    let session = LibrespotSession::login(&settings).change_context(ZSpotifyError)?;
    splash();

    let api_base = Url::parse(AppConfig::SPOTIFY_API_BASE)
        .into_report()
        .change_context(ZSpotifyError)?;
    let catalog = CatalogClient::new(api_base, &session, settings.request_timeout())
        .change_context(ZSpotifyError)?;
    let is_premium = catalog
        .is_premium_account(settings.force_premium)
        .change_context(ZSpotifyError)?;
    let quality = AudioQuality::for_account(is_premium);
    if is_premium {
        println!(
            "Detected premium account, using {} quality",
            quality.to_string().green()
        );
    } else {
        println!(
            "Detected free account, using {} quality",
            quality.to_string().yellow()
        );
    }

    let downloader = Downloader::new(
        &settings,
        quality,
        &catalog,
        &session,
        &transcoder,
        &tagger,
    );
    Commands::new(&catalog, &downloader)
        .execute(cli.command())
        .change_context(ZSpotifyError)
}

fn main() -> ZSpotifyResult<()> {
    run()
}
