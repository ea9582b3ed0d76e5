use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read};

use error_stack::Report;

use super::*;
use crate::catalog::{CatalogResult, RemoteUnavailable};
use crate::config::MusicFormat;
use crate::postprocess::{TranscodeFailed, TranscodeResult};
use crate::resolver::Resource;

const PAYLOAD: &[u8] = b"OggS fake vorbis payload";

fn metadata(artist: &str, title: &str, canonical_id: &str) -> TrackMetadata {
    TrackMetadata {
        artists: vec![artist.to_string()],
        album_name: "Album".to_string(),
        title: title.to_string(),
        artwork_url: None,
        release_year: "2004".to_string(),
        disc_number: 1,
        track_number: 1,
        canonical_id: canonical_id.to_string(),
        is_playable: true,
    }
}

#[derive(Default)]
struct FakeCatalog {
    tracks: HashMap<String, TrackMetadata>,
    artwork_requests: RefCell<Vec<String>>,
}

impl FakeCatalog {
    fn with(mut self, id: &str, metadata: TrackMetadata) -> Self {
        self.tracks.insert(id.to_string(), metadata);
        self
    }
}

impl TrackCatalog for FakeCatalog {
    fn fetch_track_metadata(&self, track_id: &str) -> CatalogResult<TrackMetadata> {
        self.tracks
            .get(track_id)
            .cloned()
            .ok_or_else(|| Report::new(RemoteUnavailable))
    }

    fn fetch_artwork(&self, url: &str) -> CatalogResult<Vec<u8>> {
        self.artwork_requests.borrow_mut().push(url.to_string());
        Ok(b"jpeg".to_vec())
    }
}

/// Reader that fails halfway through.
struct BrokenStream;

impl Read for BrokenStream {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
    }
}

#[derive(Default)]
struct FakeSession {
    unavailable: HashSet<String>,
    interrupted: HashSet<String>,
    fetched: RefCell<Vec<String>>,
}

impl StreamSession for FakeSession {
    fn fetch_stream(
        &self,
        track_id: &str,
        _quality: AudioQuality,
    ) -> StreamFetchResult<Box<dyn Read>> {
        self.fetched.borrow_mut().push(track_id.to_string());
        if self.unavailable.contains(track_id) {
            return Err(Report::new(StreamFetchFailed));
        }
        if self.interrupted.contains(track_id) {
            return Ok(Box::new(BrokenStream));
        }
        Ok(Box::new(Cursor::new(PAYLOAD.to_vec())))
    }
}

#[derive(Default)]
struct FakeTranscoder {
    fail: bool,
    bitrates: RefCell<Vec<String>>,
}

impl Transcoder for FakeTranscoder {
    fn transcode(&self, path: &Path, format: MusicFormat, bitrate: &str) -> TranscodeResult<()> {
        self.bitrates.borrow_mut().push(bitrate.to_string());
        if self.fail {
            return Err(Report::new(TranscodeFailed));
        }
        fs::write(path, format!("{format}@{bitrate}")).map_err(|_| Report::new(TranscodeFailed))
    }
}

#[derive(Default)]
struct FakeTagger {
    fail: bool,
    tagged: RefCell<Vec<(PathBuf, String, String)>>,
    artwork: Cell<usize>,
}

impl Tagger for FakeTagger {
    fn apply_tags(&self, path: &Path, metadata: &TrackMetadata) -> TagWriteResult<()> {
        if self.fail {
            return Err(Report::new(TagWriteFailed));
        }
        self.tagged.borrow_mut().push((
            path.to_path_buf(),
            metadata.joined_artists(),
            metadata.title.clone(),
        ));
        Ok(())
    }

    fn embed_artwork(&self, _path: &Path, _image: &[u8]) -> TagWriteResult<()> {
        self.artwork.set(self.artwork.get() + 1);
        Ok(())
    }
}

fn settings(root: &Path) -> Settings {
    Settings {
        root_path: root.to_path_buf(),
        ..Settings::default()
    }
}

struct Fakes {
    catalog: FakeCatalog,
    session: FakeSession,
    transcoder: FakeTranscoder,
    tagger: FakeTagger,
}

impl Fakes {
    fn new(catalog: FakeCatalog) -> Self {
        Self {
            catalog,
            session: FakeSession::default(),
            transcoder: FakeTranscoder::default(),
            tagger: FakeTagger::default(),
        }
    }

    fn downloader<'a>(&'a self, settings: &'a Settings) -> Downloader<'a> {
        Downloader::new(
            settings,
            AudioQuality::VeryHigh,
            &self.catalog,
            &self.session,
            &self.transcoder,
            &self.tagger,
        )
    }
}

#[test]
fn test_unplayable_track_is_never_fetched() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(&dir.path().join("music"));
    let mut track = metadata("Artist", "Title", "t1");
    track.is_playable = false;
    let fakes = Fakes::new(FakeCatalog::default().with("t1", track));

    let outcome = fakes.downloader(&settings).download_track("t1", Path::new(""));

    assert_eq!(outcome, DownloadOutcome::SkippedUnplayable);
    assert!(fakes.session.fetched.borrow().is_empty());
    assert!(!settings.root_path.exists());
}

#[test]
fn test_existing_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let existing = dir.path().join("Artist - Title.mp3");
    fs::write(&existing, b"already here").unwrap();
    let fakes = Fakes::new(FakeCatalog::default().with("t1", metadata("Artist", "Title", "t1")));

    let outcome = fakes.downloader(&settings).download_track("t1", Path::new(""));

    assert_eq!(outcome, DownloadOutcome::SkippedExists);
    assert!(fakes.session.fetched.borrow().is_empty());
    assert_eq!(fs::read(&existing).unwrap(), b"already here");
}

#[test]
fn test_existing_file_is_replaced_when_skipping_is_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(dir.path());
    settings.skip_existing_files = false;
    let existing = dir.path().join("Artist - Title.mp3");
    fs::write(&existing, b"stale").unwrap();
    let fakes = Fakes::new(FakeCatalog::default().with("t1", metadata("Artist", "Title", "t1")));

    let outcome = fakes.downloader(&settings).download_track("t1", Path::new(""));

    assert_eq!(outcome, DownloadOutcome::Saved);
    assert_eq!(fs::read_to_string(&existing).unwrap(), "mp3@320k");
}

#[test]
fn test_second_raw_download_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(dir.path());
    settings.raw_audio_as_is = true;
    let fakes = Fakes::new(FakeCatalog::default().with("t1", metadata("Artist", "Title", "t1")));
    let downloader = fakes.downloader(&settings);

    let first = downloader.download_track("t1", Path::new(""));
    let second = downloader.download_track("t1", Path::new(""));

    assert_eq!(first, DownloadOutcome::Saved);
    assert_eq!(second, DownloadOutcome::SkippedExists);
    assert_eq!(*fakes.session.fetched.borrow(), vec!["t1".to_string()]);
    assert_eq!(
        fs::read(dir.path().join("Artist - Title.raw")).unwrap(),
        PAYLOAD
    );
    assert!(fakes.transcoder.bitrates.borrow().is_empty());
    assert!(fakes.tagger.tagged.borrow().is_empty());
}

#[test]
fn test_canonical_id_is_used_only_for_the_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let fakes = Fakes::new(
        FakeCatalog::default().with("requested", metadata("Artist", "Relinked", "canonical")),
    );

    let outcome = fakes
        .downloader(&settings)
        .download_track("requested", Path::new(""));

    assert_eq!(outcome, DownloadOutcome::Saved);
    assert_eq!(*fakes.session.fetched.borrow(), vec!["canonical".to_string()]);
    assert!(dir.path().join("Artist - Relinked.mp3").is_file());
}

#[test]
fn test_unknown_track_fails_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let fakes = Fakes::new(FakeCatalog::default());

    let outcome = fakes.downloader(&settings).download_track("missing", Path::new(""));

    assert_eq!(outcome, DownloadOutcome::FailedLookup);
    assert!(outcome.is_failure());
    assert!(fakes.session.fetched.borrow().is_empty());
}

#[test]
fn test_interrupted_stream_leaves_nothing_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(&dir.path().join("music"));
    let mut fakes =
        Fakes::new(FakeCatalog::default().with("t1", metadata("Artist", "Title", "t1")));
    fakes.session.interrupted.insert("t1".to_string());

    let outcome = fakes.downloader(&settings).download_track("t1", Path::new("Album"));

    assert_eq!(outcome, DownloadOutcome::FailedFetch);
    assert!(!settings.root_path.exists());
}

#[test]
fn test_failed_transcode_removes_the_raw_file() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let mut fakes =
        Fakes::new(FakeCatalog::default().with("t1", metadata("Artist", "Title", "t1")));
    fakes.transcoder.fail = true;

    let outcome = fakes.downloader(&settings).download_track("t1", Path::new(""));

    assert_eq!(outcome, DownloadOutcome::FailedTranscode);
    assert!(!dir.path().join("Artist - Title.mp3").exists());
    assert!(fakes.tagger.tagged.borrow().is_empty());
}

#[test]
fn test_tag_failure_keeps_file_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let mut fakes =
        Fakes::new(FakeCatalog::default().with("t1", metadata("Artist", "Title", "t1")));
    fakes.tagger.fail = true;

    let outcome = fakes.downloader(&settings).download_track("t1", Path::new(""));

    assert_eq!(outcome, DownloadOutcome::FailedTag);
    assert!(dir.path().join("Artist - Title.mp3").is_file());
}

#[test]
fn test_tag_failure_with_delete_policy_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(dir.path());
    settings.tag_failure_policy = TagFailurePolicy::Delete;
    let mut fakes =
        Fakes::new(FakeCatalog::default().with("t1", metadata("Artist", "Title", "t1")));
    fakes.tagger.fail = true;

    let outcome = fakes.downloader(&settings).download_track("t1", Path::new(""));

    assert_eq!(outcome, DownloadOutcome::FailedTag);
    assert!(!dir.path().join("Artist - Title.mp3").exists());
}

#[test]
fn test_track_uri_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let track_id = "4cOdK2wGLETKBW3PvgPWqT";
    let mut track = metadata("Artist", "Title", track_id);
    track.artwork_url = Some("https://i.scdn.co/image/cover".to_string());
    let fakes = Fakes::new(FakeCatalog::default().with(track_id, track));

    let Resource::Track(parsed_id) = Resource::parse(&format!("spotify:track:{track_id}")) else {
        panic!("expected a track");
    };
    let outcome = fakes.downloader(&settings).download_track(&parsed_id, Path::new(""));

    let expected_path = dir.path().join("Artist - Title.mp3");
    assert_eq!(outcome, DownloadOutcome::Saved);
    assert_eq!(fs::read_to_string(&expected_path).unwrap(), "mp3@320k");
    assert_eq!(
        *fakes.tagger.tagged.borrow(),
        vec![(expected_path, "Artist".to_string(), "Title".to_string())]
    );
    assert_eq!(fakes.tagger.artwork.get(), 1);
    assert_eq!(
        *fakes.catalog.artwork_requests.borrow(),
        vec!["https://i.scdn.co/image/cover".to_string()]
    );
}

#[test]
fn test_missing_artwork_is_not_requested() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let fakes = Fakes::new(FakeCatalog::default().with("t1", metadata("Artist", "Title", "t1")));

    let outcome = fakes.downloader(&settings).download_track("t1", Path::new(""));

    assert_eq!(outcome, DownloadOutcome::Saved);
    assert!(fakes.catalog.artwork_requests.borrow().is_empty());
    assert_eq!(fakes.tagger.artwork.get(), 0);
}

#[test]
fn test_album_batch_continues_after_a_failed_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let mut fakes = Fakes::new(
        FakeCatalog::default()
            .with("t1", metadata("Artist", "One", "t1"))
            .with("t2", metadata("Artist", "Two", "t2"))
            .with("t3", metadata("Artist", "Three", "t3")),
    );
    fakes.session.unavailable.insert("t2".to_string());
    let tracks: Vec<TrackReference> = ["t1", "t2", "t3"]
        .iter()
        .map(|id| TrackReference { id: id.to_string() })
        .collect();

    let outcomes = fakes
        .downloader(&settings)
        .download_batch(&tracks, Path::new("Artist - Album"));

    assert_eq!(
        outcomes,
        vec![
            DownloadOutcome::Saved,
            DownloadOutcome::FailedFetch,
            DownloadOutcome::Saved
        ]
    );
    let album_dir = dir.path().join("Artist - Album");
    let mut files: Vec<_> = fs::read_dir(&album_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    files.sort();
    assert_eq!(files, vec!["Artist - One.mp3", "Artist - Three.mp3"]);
    assert_eq!(
        BatchSummary::from_outcomes(&outcomes),
        BatchSummary {
            saved: 2,
            skipped: 0,
            failed: 1
        }
    );
}

#[test]
fn test_bitrate_follows_quality() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let fakes = Fakes::new(FakeCatalog::default().with("t1", metadata("Artist", "Title", "t1")));
    let downloader = Downloader::new(
        &settings,
        AudioQuality::High,
        &fakes.catalog,
        &fakes.session,
        &fakes.transcoder,
        &fakes.tagger,
    );

    downloader.download_track("t1", Path::new(""));

    assert_eq!(*fakes.transcoder.bitrates.borrow(), vec!["160k".to_string()]);
}
