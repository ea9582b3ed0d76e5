use std::time::Duration;

use error_stack::{IntoReport, Report, ResultExt};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::catalog::api::SpotifyAPI;
use crate::catalog::{
    collect_pages, AlbumSummary, CatalogResult, PlaylistSummary, RemoteUnavailable,
    SearchResults, TrackCatalog, TrackMetadata, TrackReference, TrackSummary,
};
use crate::session::TokenSource;

#[derive(Deserialize, Debug)]
struct ApiArtist {
    name: String,
}

#[derive(Deserialize, Debug)]
struct ApiImage {
    url: String,
}

#[derive(Deserialize, Debug)]
struct ApiAlbum {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    #[serde(default)]
    images: Vec<ApiImage>,
    #[serde(default)]
    release_date: String,
}

#[derive(Deserialize, Debug)]
struct ApiTrack {
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    album: Option<ApiAlbum>,
    #[serde(default)]
    disc_number: u32,
    #[serde(default)]
    track_number: u32,
    is_playable: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct ApiTrackId {
    id: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiOwner {
    display_name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiPlaylist {
    id: String,
    name: String,
    owner: ApiOwner,
}

#[derive(Deserialize, Debug)]
struct ApiPlaylistInfo {
    name: String,
    owner: ApiOwner,
}

/// Item of a playlist or of the saved tracks; `track` is null for removed tracks.
#[derive(Deserialize, Debug)]
struct ApiTrackItem {
    track: Option<ApiTrackId>,
}

#[derive(Deserialize, Debug)]
struct Paging<T> {
    items: Vec<T>,
}

impl<T> Default for Paging<T> {
    fn default() -> Self {
        Self { items: vec![] }
    }
}

#[derive(Deserialize, Debug)]
struct ApiSearch {
    #[serde(default)]
    tracks: Paging<Option<ApiTrack>>,
    #[serde(default)]
    albums: Paging<Option<ApiAlbum>>,
    #[serde(default)]
    playlists: Paging<Option<ApiPlaylist>>,
}

#[derive(Deserialize, Debug)]
struct ApiTracks {
    tracks: Vec<Option<ApiTrack>>,
}

#[derive(Deserialize, Debug)]
struct ApiMe {
    product: Option<String>,
}

fn artist_names(artists: &[ApiArtist]) -> Vec<String> {
    artists.iter().map(|artist| artist.name.clone()).collect()
}

fn owner_name(owner: &ApiOwner) -> String {
    owner.display_name.clone().unwrap_or_default().trim().to_string()
}

fn track_reference(item: ApiTrackItem) -> Option<TrackReference> {
    item.track
        .and_then(|track| track.id)
        .map(|id| TrackReference { id })
}

/// Blocking client for the catalog Web API. Every call is attempted once.
pub struct CatalogClient<'a> {
    http: Client,
    api_base: Url,
    tokens: &'a dyn TokenSource,
}

impl<'a> CatalogClient<'a> {
    pub fn new(api_base: Url, tokens: &'a dyn TokenSource, timeout: Duration) -> CatalogResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .into_report()
            .change_context(RemoteUnavailable)?;
        Ok(Self {
            http,
            api_base,
            tokens,
        })
    }

    fn get<T: DeserializeOwned>(&self, api: SpotifyAPI) -> CatalogResult<T> {
        let url = self
            .api_base
            .join(&api.path())
            .into_report()
            .change_context(RemoteUnavailable)?;
        let token = self
            .tokens
            .bearer_token()
            .change_context(RemoteUnavailable)?;
        log::debug!("GET {url}");
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .query(&api.query())
            .send()
            .into_report()
            .attach_printable(format!("Request to {url} failed"))
            .change_context(RemoteUnavailable)?
            .error_for_status()
            .into_report()
            .change_context(RemoteUnavailable)?;
        response
            .json::<T>()
            .into_report()
            .attach_printable(format!("Unexpected response from {url}"))
            .change_context(RemoteUnavailable)
    }

    pub fn search(&self, term: &str) -> CatalogResult<SearchResults> {
        let response: ApiSearch = self.get(SpotifyAPI::Search { term })?;
        let tracks = response
            .tracks
            .items
            .into_iter()
            .flatten()
            .filter_map(|track| {
                let id = track.id?;
                Some(TrackSummary {
                    id,
                    name: track.name,
                    artists: artist_names(&track.artists),
                })
            })
            .collect();
        let albums = response
            .albums
            .items
            .into_iter()
            .flatten()
            .filter_map(|album| {
                let id = album.id?;
                Some(AlbumSummary {
                    id,
                    name: album.name,
                    artists: artist_names(&album.artists),
                })
            })
            .collect();
        let playlists = response
            .playlists
            .items
            .into_iter()
            .flatten()
            .map(|playlist| PlaylistSummary {
                owner: owner_name(&playlist.owner),
                id: playlist.id,
                name: playlist.name.trim().to_string(),
            })
            .collect();
        Ok(SearchResults {
            tracks,
            albums,
            playlists,
        })
    }

    pub fn list_playlists(&self) -> CatalogResult<Vec<PlaylistSummary>> {
        let playlists = collect_pages(SpotifyAPI::MY_PLAYLISTS_LIMIT, |offset| {
            let page: Paging<ApiPlaylist> = self.get(SpotifyAPI::MyPlaylists { offset })?;
            Ok(page.items)
        })?;
        Ok(playlists
            .into_iter()
            .map(|playlist| PlaylistSummary {
                owner: owner_name(&playlist.owner),
                id: playlist.id,
                name: playlist.name.trim().to_string(),
            })
            .collect())
    }

    /// Tracks of a playlist. Entries without an id (local files) are left out.
    pub fn list_playlist_tracks(&self, playlist_id: &str) -> CatalogResult<Vec<TrackReference>> {
        let items = collect_pages(SpotifyAPI::PLAYLIST_TRACKS_LIMIT, |offset| {
            let page: Paging<ApiTrackItem> = self.get(SpotifyAPI::PlaylistTracks {
                playlist_id,
                offset,
            })?;
            Ok(page.items)
        })?;
        Ok(items.into_iter().filter_map(track_reference).collect())
    }

    /// Name and owner of a playlist.
    pub fn playlist_info(&self, playlist_id: &str) -> CatalogResult<(String, String)> {
        let info: ApiPlaylistInfo = self.get(SpotifyAPI::Playlist { playlist_id })?;
        Ok((info.name.trim().to_string(), owner_name(&info.owner)))
    }

    pub fn list_album_tracks(&self, album_id: &str) -> CatalogResult<Vec<TrackReference>> {
        let items = collect_pages(SpotifyAPI::ALBUM_TRACKS_LIMIT, |offset| {
            let page: Paging<ApiTrackId> =
                self.get(SpotifyAPI::AlbumTracks { album_id, offset })?;
            Ok(page.items)
        })?;
        Ok(items
            .into_iter()
            .filter_map(|track| track.id.map(|id| TrackReference { id }))
            .collect())
    }

    /// Primary artist and name of an album.
    pub fn album_info(&self, album_id: &str) -> CatalogResult<(String, String)> {
        let album: ApiAlbum = self.get(SpotifyAPI::Album { album_id })?;
        let artist = album
            .artists
            .first()
            .map(|artist| artist.name.clone())
            .unwrap_or_default();
        Ok((artist, album.name))
    }

    pub fn list_saved_tracks(&self) -> CatalogResult<Vec<TrackReference>> {
        let items = collect_pages(SpotifyAPI::MY_SAVED_TRACKS_LIMIT, |offset| {
            let page: Paging<ApiTrackItem> = self.get(SpotifyAPI::MySavedTracks { offset })?;
            Ok(page.items)
        })?;
        Ok(items.into_iter().filter_map(track_reference).collect())
    }

    /// `force_premium` short-circuits the lookup; the entitlement isn't checked remotely.
    pub fn is_premium_account(&self, force_premium: bool) -> CatalogResult<bool> {
        if force_premium {
            log::debug!("Premium forced by settings");
            return Ok(true);
        }
        let me: ApiMe = self.get(SpotifyAPI::Me)?;
        Ok(me.product.as_deref() == Some("premium"))
    }
}

impl<'a> TrackCatalog for CatalogClient<'a> {
    fn fetch_track_metadata(&self, track_id: &str) -> CatalogResult<TrackMetadata> {
        let response: ApiTracks = self.get(SpotifyAPI::Tracks { track_id })?;
        let track = response
            .tracks
            .into_iter()
            .next()
            .flatten()
            .ok_or(RemoteUnavailable)
            .into_report()
            .attach_printable(format!("Track {track_id} not found"))?;
        let album = track.album.ok_or_else(|| {
            Report::new(RemoteUnavailable)
                .attach_printable(format!("Track {track_id} has no album"))
        })?;
        Ok(TrackMetadata {
            artists: artist_names(&track.artists),
            album_name: album.name,
            title: track.name,
            artwork_url: album.images.into_iter().next().map(|image| image.url),
            release_year: album
                .release_date
                .split('-')
                .next()
                .unwrap_or_default()
                .to_string(),
            disc_number: track.disc_number,
            track_number: track.track_number,
            canonical_id: track.id.unwrap_or_else(|| track_id.to_string()),
            is_playable: track.is_playable.unwrap_or(false),
        })
    }

    fn fetch_artwork(&self, url: &str) -> CatalogResult<Vec<u8>> {
        let bytes = self
            .http
            .get(url)
            .send()
            .into_report()
            .attach_printable(format!("Request to {url} failed"))
            .change_context(RemoteUnavailable)?
            .error_for_status()
            .into_report()
            .change_context(RemoteUnavailable)?
            .bytes()
            .into_report()
            .change_context(RemoteUnavailable)?;
        Ok(bytes.to_vec())
    }
}
