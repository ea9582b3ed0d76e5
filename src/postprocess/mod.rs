use std::fmt;
use std::path::Path;

use crate::catalog::TrackMetadata;
use crate::config::MusicFormat;

pub mod tags;
pub mod transcode;

#[derive(Debug)]
pub struct TranscodeFailed;

impl fmt::Display for TranscodeFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transcode failed")
    }
}

impl std::error::Error for TranscodeFailed {}

pub type TranscodeResult<T> = error_stack::Result<T, TranscodeFailed>;

#[derive(Debug)]
pub struct TagWriteFailed;

impl fmt::Display for TagWriteFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tag write failed")
    }
}

impl std::error::Error for TagWriteFailed {}

pub type TagWriteResult<T> = error_stack::Result<T, TagWriteFailed>;

pub trait Transcoder {
    /// Re-encodes the Ogg file at `path` into `format` at `bitrate`, replacing it in place.
    fn transcode(&self, path: &Path, format: MusicFormat, bitrate: &str) -> TranscodeResult<()>;
}

pub trait Tagger {
    fn apply_tags(&self, path: &Path, metadata: &TrackMetadata) -> TagWriteResult<()>;

    fn embed_artwork(&self, path: &Path, image: &[u8]) -> TagWriteResult<()>;
}
