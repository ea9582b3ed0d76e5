use std::fmt;
use std::io::Read;

pub mod idle_timeout;
pub mod librespot_session;

#[derive(Debug)]
pub struct SessionError;

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Session error")
    }
}

impl std::error::Error for SessionError {}

pub type SessionResult<T> = error_stack::Result<T, SessionError>;

/// The session could not produce audio bytes for a track.
#[derive(Debug)]
pub struct StreamFetchFailed;

impl fmt::Display for StreamFetchFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Stream fetch failed")
    }
}

impl std::error::Error for StreamFetchFailed {}

pub type StreamFetchResult<T> = error_stack::Result<T, StreamFetchFailed>;

/// Quality tier the account is entitled to, picked once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AudioQuality {
    #[strum(serialize = "VERY_HIGH")]
    VeryHigh,
    #[strum(serialize = "HIGH")]
    High,
}

impl AudioQuality {
    pub fn for_account(is_premium: bool) -> Self {
        if is_premium {
            AudioQuality::VeryHigh
        } else {
            AudioQuality::High
        }
    }

    /// Bitrate handed to the encoder when re-encoding a stream of this tier.
    pub fn bitrate(&self) -> &'static str {
        match self {
            AudioQuality::VeryHigh => "320k",
            AudioQuality::High => "160k",
        }
    }
}

/// Hands out bearer tokens for the catalog API.
pub trait TokenSource {
    fn bearer_token(&self) -> SessionResult<String>;
}

pub trait StreamSession {
    /// Opens the raw audio of `track_id` at `quality`. The returned reader yields the
    /// whole file; callers read it to the end in one go.
    fn fetch_stream(&self, track_id: &str, quality: AudioQuality)
        -> StreamFetchResult<Box<dyn Read>>;
}
