use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use colored::Colorize;
use error_stack::{IntoReport, ResultExt};

use crate::catalog::{TrackCatalog, TrackMetadata, TrackReference};
use crate::config::{Settings, TagFailurePolicy};
use crate::postprocess::{TagWriteFailed, TagWriteResult, Tagger, Transcoder};
use crate::session::{AudioQuality, StreamFetchFailed, StreamFetchResult, StreamSession};

#[cfg(test)]
mod tests;

/// The raw audio couldn't be written to disk.
#[derive(Debug)]
pub struct WriteFailed;

impl fmt::Display for WriteFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Write failed")
    }
}

impl std::error::Error for WriteFailed {}

pub type WriteResult<T> = error_stack::Result<T, WriteFailed>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum DownloadOutcome {
    Saved,
    SkippedUnplayable,
    SkippedExists,
    FailedLookup,
    FailedFetch,
    FailedWrite,
    FailedTranscode,
    FailedTag,
}

impl DownloadOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DownloadOutcome::FailedLookup
                | DownloadOutcome::FailedFetch
                | DownloadOutcome::FailedWrite
                | DownloadOutcome::FailedTranscode
                | DownloadOutcome::FailedTag
        )
    }
}

/// Where a track ends up: `<directory>/<filename>.<format>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub directory: PathBuf,
    pub filename: String,
    pub format: String,
}

impl DownloadTarget {
    pub fn new(settings: &Settings, extra_path: &Path, metadata: &TrackMetadata) -> Self {
        Self {
            directory: settings.root_path.join(extra_path),
            filename: metadata.song_name(),
            format: settings.file_extension(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.filename, self.format))
    }

    /// Creates the directory if needed and writes `audio` in one go.
    /// A partially written file is removed.
    fn write(&self, audio: &[u8]) -> WriteResult<()> {
        fs::create_dir_all(&self.directory)
            .into_report()
            .attach_printable(format!(
                "Failed to create directory {}",
                self.directory.display()
            ))
            .change_context(WriteFailed)?;
        let path = self.path();
        if let Err(err) = fs::write(&path, audio) {
            let _ = fs::remove_file(&path);
            return Err(err)
                .into_report()
                .attach_printable(format!("Failed to write {}", path.display()))
                .change_context(WriteFailed);
        }
        Ok(())
    }
}

/// Counts of a batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[DownloadOutcome]) -> Self {
        outcomes
            .iter()
            .fold(BatchSummary::default(), |mut summary, outcome| {
                match outcome {
                    DownloadOutcome::Saved => summary.saved += 1,
                    DownloadOutcome::SkippedUnplayable | DownloadOutcome::SkippedExists => {
                        summary.skipped += 1
                    }
                    _ => summary.failed += 1,
                }
                summary
            })
    }

    pub fn print(&self) {
        println!(
            "{}: saved {} tracks, skipped {}, failed {}",
            "Summary".green(),
            self.saved.to_string().cyan(),
            self.skipped.to_string().yellow(),
            self.failed.to_string().red()
        );
    }
}

/// Turns track ids into tagged files, one at a time.
pub struct Downloader<'a> {
    settings: &'a Settings,
    quality: AudioQuality,
    catalog: &'a dyn TrackCatalog,
    session: &'a dyn StreamSession,
    transcoder: &'a dyn Transcoder,
    tagger: &'a dyn Tagger,
}

impl<'a> Downloader<'a> {
    pub fn new(
        settings: &'a Settings,
        quality: AudioQuality,
        catalog: &'a dyn TrackCatalog,
        session: &'a dyn StreamSession,
        transcoder: &'a dyn Transcoder,
        tagger: &'a dyn Tagger,
    ) -> Self {
        Self {
            settings,
            quality,
            catalog,
            session,
            transcoder,
            tagger,
        }
    }

    /// Downloads one track into `root_path/extra_path`. Every failure is reported and
    /// turned into an outcome, so callers can move on to the next track.
    pub fn download_track(&self, track_id: &str, extra_path: &Path) -> DownloadOutcome {
        let metadata = match self.catalog.fetch_track_metadata(track_id) {
            Ok(metadata) => metadata,
            Err(report) => {
                log::warn!("{report:?}");
                println!(
                    "Skipping track {}: couldn't get its metadata",
                    track_id.red()
                );
                return DownloadOutcome::FailedLookup;
            }
        };
        let target = DownloadTarget::new(self.settings, extra_path, &metadata);
        let song_name = target.filename.clone();
        let file_path = target.path();

        if !metadata.is_playable {
            println!("Skipping {}: song is unavailable", song_name.yellow());
            return DownloadOutcome::SkippedUnplayable;
        }
        if self.settings.skip_existing_files && file_path.is_file() {
            println!("Skipping {}: song already exists", song_name.yellow());
            return DownloadOutcome::SkippedExists;
        }

        let stream_id = if metadata.canonical_id != track_id {
            println!(
                "Track {} is served as {}, downloading that one instead",
                track_id.purple(),
                metadata.canonical_id.purple()
            );
            metadata.canonical_id.as_str()
        } else {
            track_id
        };
        println!("Found song {}", song_name.cyan());

        let audio = match self.fetch_audio(stream_id) {
            Ok(audio) => audio,
            Err(report) => {
                log::warn!("{report:?}");
                println!("Skipping {}: download error", song_name.red());
                return DownloadOutcome::FailedFetch;
            }
        };
        if let Err(report) = target.write(&audio) {
            log::warn!("{report:?}");
            println!("Skipping {}: couldn't write the file", song_name.red());
            return DownloadOutcome::FailedWrite;
        }

        if self.settings.raw_audio_as_is {
            println!("{} saved", song_name.green());
            return DownloadOutcome::Saved;
        }

        println!(
            "Converting to {}",
            self.settings.music_format.to_string().to_uppercase()
        );
        if let Err(report) =
            self.transcoder
                .transcode(&file_path, self.settings.music_format, self.quality.bitrate())
        {
            log::warn!("{report:?}");
            remove_file(&file_path);
            println!("Skipping {}: conversion error", song_name.red());
            return DownloadOutcome::FailedTranscode;
        }

        if let Err(report) = self.write_tags(&file_path, &metadata) {
            log::warn!("{report:?}");
            match self.settings.tag_failure_policy {
                TagFailurePolicy::Keep => println!(
                    "{} saved without tags: couldn't write them",
                    song_name.yellow()
                ),
                TagFailurePolicy::Delete => {
                    remove_file(&file_path);
                    println!("Skipping {}: couldn't write its tags", song_name.red());
                }
            }
            return DownloadOutcome::FailedTag;
        }

        println!("{} saved", song_name.green());
        DownloadOutcome::Saved
    }

    /// Downloads `tracks` in order. A failed track never stops the rest.
    pub fn download_batch(&self, tracks: &[TrackReference], extra_path: &Path) -> Vec<DownloadOutcome> {
        let total = tracks.len();
        let outcomes: Vec<DownloadOutcome> = tracks
            .iter()
            .enumerate()
            .map(|(index, track)| {
                println!(
                    "-----------------------------------------------------------------------------"
                );
                println!(
                    "Processing track {} of {}",
                    (index + 1).to_string().cyan(),
                    total.to_string().cyan()
                );
                self.download_track(&track.id, extra_path)
            })
            .collect();
        BatchSummary::from_outcomes(&outcomes).print();
        outcomes
    }

    fn fetch_audio(&self, track_id: &str) -> StreamFetchResult<Vec<u8>> {
        let mut stream = self.session.fetch_stream(track_id, self.quality)?;
        let mut audio = Vec::new();
        stream
            .read_to_end(&mut audio)
            .into_report()
            .attach_printable(format!("Stream of {track_id} was interrupted"))
            .change_context(StreamFetchFailed)?;
        Ok(audio)
    }

    fn write_tags(&self, path: &Path, metadata: &TrackMetadata) -> TagWriteResult<()> {
        println!("Setting music tags");
        self.tagger.apply_tags(path, metadata)?;
        if let Some(artwork_url) = &metadata.artwork_url {
            println!("Setting thumbnail");
            let image = self
                .catalog
                .fetch_artwork(artwork_url)
                .change_context(TagWriteFailed)?;
            self.tagger.embed_artwork(path, &image)?;
        }
        Ok(())
    }
}

fn remove_file(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        log::warn!("Failed to remove {}: {err}", path.display());
    }
}
