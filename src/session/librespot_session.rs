use std::cell::RefCell;
use std::fmt::Debug;
use std::future::Future;
use std::io::{self, Read};
use std::time::{Duration, Instant};

use colored::Colorize;
use error_stack::{IntoReport, Report, ResultExt};
use indicatif::{ProgressBar, ProgressStyle};
use librespot_audio::{AudioDecrypt, AudioFile};
use librespot_core::authentication::Credentials;
use librespot_core::cache::Cache;
use librespot_core::config::SessionConfig;
use librespot_core::keymaster;
use librespot_core::session::Session;
use librespot_core::spotify_id::SpotifyId;
use librespot_metadata::{FileFormat, Metadata, Track};
use tokio::runtime::Runtime;

use crate::config::{AppConfig, Settings};
use crate::dialoguer::Dialoguer;
use crate::session::idle_timeout::IdleTimeoutReader;
use crate::session::{
    AudioQuality, SessionError, SessionResult, StreamFetchFailed, StreamFetchResult,
    StreamSession, TokenSource,
};

// Spotify prefixes its Ogg files with a proprietary block of this size.
const SPOTIFY_OGG_HEADER_END: u64 = 0xa7;
// Tokens are renewed a bit before they actually expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Session backed by librespot. Owns the runtime the library's background tasks run on;
/// every call into it blocks the caller until it completes or times out.
pub struct LibrespotSession {
    runtime: Runtime,
    session: Session,
    timeout: Duration,
    token: RefCell<Option<CachedToken>>,
}

impl LibrespotSession {
    /// Logs in with the stored credentials file if there is one, otherwise keeps asking
    /// for a username and password until the login succeeds.
    pub fn login(settings: &Settings) -> SessionResult<Self> {
        let runtime = Runtime::new()
            .into_report()
            .attach_printable("Failed to start the session runtime")
            .change_context(SessionError)?;
        let timeout = settings.request_timeout();

        let stored_credentials = Self::open_cache(settings)?.credentials();
        if let Some(credentials) = stored_credentials {
            match Self::connect(&runtime, timeout, settings, credentials) {
                Ok(session) => return Ok(Self::new(runtime, session, timeout)),
                Err(report) => {
                    log::debug!("{report:?}");
                    println!("{}", "Stored credentials were rejected".yellow());
                }
            }
        }

        loop {
            let username =
                Dialoguer::input("Username".to_string()).change_context(SessionError)?;
            let password =
                Dialoguer::password("Password".to_string()).change_context(SessionError)?;
            let credentials = Credentials::with_password(username, password);
            match Self::connect(&runtime, timeout, settings, credentials) {
                Ok(session) => return Ok(Self::new(runtime, session, timeout)),
                Err(report) => {
                    log::debug!("{report:?}");
                    println!("{}", "Login failed, please try again".red());
                }
            }
        }
    }

    fn new(runtime: Runtime, session: Session, timeout: Duration) -> Self {
        Self {
            runtime,
            session,
            timeout,
            token: RefCell::new(None),
        }
    }

    fn open_cache(settings: &Settings) -> SessionResult<Cache> {
        Cache::new(
            Some(settings.credentials_location.as_path()),
            None,
            None,
            None,
        )
        .into_report()
        .attach_printable(format!(
            "Failed to open the credentials location {}",
            settings.credentials_location.display()
        ))
        .change_context(SessionError)
    }

    fn connect(
        runtime: &Runtime,
        timeout: Duration,
        settings: &Settings,
        credentials: Credentials,
    ) -> SessionResult<Session> {
        let cache = Self::open_cache(settings)?;
        let (session, _) = block_on_with_timeout(
            runtime,
            timeout,
            Session::connect(SessionConfig::default(), credentials, Some(cache), true),
        )
        .map_err(|message| Report::new(SessionError).attach_printable(message))?;
        log::debug!("Connected to Spotify");
        Ok(session)
    }

    fn block_on<F, T, E>(&self, future: F) -> Result<T, String>
    where
        F: Future<Output = Result<T, E>>,
        E: Debug,
    {
        block_on_with_timeout(&self.runtime, self.timeout, future)
    }
}

/// Drives `future` to completion on `runtime`, giving up after `timeout`.
fn block_on_with_timeout<F, T, E>(runtime: &Runtime, timeout: Duration, future: F) -> Result<T, String>
where
    F: Future<Output = Result<T, E>>,
    E: Debug,
{
    match runtime.block_on(async move { tokio::time::timeout(timeout, future).await }) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(format!("{err:?}")),
        Err(_) => Err(format!("Timed out after {} seconds", timeout.as_secs())),
    }
}

/// Ogg Vorbis files to try for a tier, best match first.
fn preferred_formats(quality: AudioQuality) -> [FileFormat; 3] {
    match quality {
        AudioQuality::VeryHigh => [
            FileFormat::OGG_VORBIS_320,
            FileFormat::OGG_VORBIS_160,
            FileFormat::OGG_VORBIS_96,
        ],
        AudioQuality::High => [
            FileFormat::OGG_VORBIS_160,
            FileFormat::OGG_VORBIS_96,
            FileFormat::OGG_VORBIS_320,
        ],
    }
}

fn bytes_per_second(quality: AudioQuality) -> usize {
    match quality {
        AudioQuality::VeryHigh => 320 * 1024 / 8,
        AudioQuality::High => 160 * 1024 / 8,
    }
}

impl TokenSource for LibrespotSession {
    fn bearer_token(&self) -> SessionResult<String> {
        if let Some(cached) = self.token.borrow().as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }
        let token = self
            .block_on(keymaster::get_token(
                &self.session,
                AppConfig::KEYMASTER_CLIENT_ID,
                AppConfig::CATALOG_SCOPES,
            ))
            .map_err(|message| {
                Report::new(SessionError)
                    .attach_printable(format!("Failed to get a catalog token: {message}"))
            })?;
        let lifetime = Duration::from_secs(u64::from(token.expires_in));
        let access_token = token.access_token.clone();
        *self.token.borrow_mut() = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        });
        Ok(access_token)
    }
}

impl StreamSession for LibrespotSession {
    fn fetch_stream(
        &self,
        track_id: &str,
        quality: AudioQuality,
    ) -> StreamFetchResult<Box<dyn Read>> {
        let spotify_id = SpotifyId::from_base62(track_id).map_err(|err| {
            Report::new(StreamFetchFailed)
                .attach_printable(format!("Invalid track id {track_id}: {err:?}"))
        })?;
        let track = self
            .block_on(Track::get(&self.session, spotify_id))
            .map_err(|message| Report::new(StreamFetchFailed).attach_printable(message))?;
        let file_id = preferred_formats(quality)
            .iter()
            .find_map(|format| track.files.get(format))
            .copied()
            .ok_or(StreamFetchFailed)
            .into_report()
            .attach_printable(format!("Track {track_id} has no Ogg Vorbis file"))?;
        let key = self
            .block_on(self.session.audio_key().request(spotify_id, file_id))
            .map_err(|message| {
                Report::new(StreamFetchFailed)
                    .attach_printable(format!("Failed to get the audio key: {message}"))
            })?;
        let encrypted = self
            .block_on(AudioFile::open(
                &self.session,
                file_id,
                bytes_per_second(quality),
                true,
            ))
            .map_err(|message| {
                Report::new(StreamFetchFailed)
                    .attach_printable(format!("Failed to open the audio file: {message}"))
            })?;
        let mut decrypted = AudioDecrypt::new(key, encrypted);
        io::copy(
            &mut (&mut decrypted).take(SPOTIFY_OGG_HEADER_END),
            &mut io::sink(),
        )
        .into_report()
        .change_context(StreamFetchFailed)?;

        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} {bytes} ({bytes_per_sec})")
                .into_report()
                .change_context(StreamFetchFailed)?,
        );
        progress.set_message("Downloading raw audio");
        let guarded = IdleTimeoutReader::spawn(decrypted, self.timeout);
        Ok(Box::new(progress.wrap_read(guarded)))
    }
}
