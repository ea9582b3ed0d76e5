use std::fmt;

use crate::sanitize::sanitize_data;

pub mod api;
pub mod client;

/// A catalog call failed: transport error, bad status, token error or unexpected body.
#[derive(Debug)]
pub struct RemoteUnavailable;

impl fmt::Display for RemoteUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Remote catalog unavailable")
    }
}

impl std::error::Error for RemoteUnavailable {}

pub type CatalogResult<T> = error_stack::Result<T, RemoteUnavailable>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReference {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub artists: Vec<String>,
    pub album_name: String,
    pub title: String,
    pub artwork_url: Option<String>,
    pub release_year: String,
    pub disc_number: u32,
    pub track_number: u32,
    /// Id the catalog actually serves audio for. May differ from the requested one.
    pub canonical_id: String,
    pub is_playable: bool,
}

impl TrackMetadata {
    pub fn primary_artist(&self) -> &str {
        self.artists
            .first()
            .map(String::as_str)
            .unwrap_or("Unknown Artist")
    }

    /// `"<primary artist> - <title>"`, safe to use as a file name.
    pub fn song_name(&self) -> String {
        format!(
            "{} - {}",
            sanitize_data(self.primary_artist()),
            sanitize_data(&self.title)
        )
    }

    pub fn joined_artists(&self) -> String {
        self.artists.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSummary {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SearchKind {
    #[strum(serialize = "TRACK")]
    Track,
    #[strum(serialize = "ALBUM")]
    Album,
    #[strum(serialize = "PLAYLIST")]
    Playlist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEntry {
    pub kind: SearchKind,
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    pub tracks: Vec<TrackSummary>,
    pub albums: Vec<AlbumSummary>,
    pub playlists: Vec<PlaylistSummary>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.albums.is_empty() && self.playlists.is_empty()
    }

    /// Tracks, then albums, then playlists, as one selectable list.
    pub fn entries(&self) -> Vec<SearchEntry> {
        let tracks = self.tracks.iter().map(|track| SearchEntry {
            kind: SearchKind::Track,
            id: track.id.clone(),
            label: format!("{} | {}", track.name, track.artists.join(",")),
        });
        let albums = self.albums.iter().map(|album| SearchEntry {
            kind: SearchKind::Album,
            id: album.id.clone(),
            label: format!("{} | {}", album.name, album.artists.join(",")),
        });
        let playlists = self.playlists.iter().map(|playlist| SearchEntry {
            kind: SearchKind::Playlist,
            id: playlist.id.clone(),
            label: format!("{} | {}", playlist.name, playlist.owner),
        });
        tracks.chain(albums).chain(playlists).collect()
    }
}

/// What the download pipeline needs from the catalog.
pub trait TrackCatalog {
    fn fetch_track_metadata(&self, track_id: &str) -> CatalogResult<TrackMetadata>;

    fn fetch_artwork(&self, url: &str) -> CatalogResult<Vec<u8>>;
}

/// Fetches `limit`-sized pages starting at offset 0 until a page comes back shorter
/// than `limit`. There is no upper bound on the number of pages.
pub fn collect_pages<T, F>(limit: usize, mut fetch_page: F) -> CatalogResult<Vec<T>>
where
    F: FnMut(usize) -> CatalogResult<Vec<T>>,
{
    let mut items = Vec::new();
    let mut offset = 0;
    loop {
        let page = fetch_page(offset)?;
        let page_len = page.len();
        items.extend(page);
        if page_len < limit {
            return Ok(items);
        }
        offset += limit;
    }
}
