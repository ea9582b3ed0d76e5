/// Catalog endpoints, relative to the API base URL.
pub enum SpotifyAPI<'a> {
    Search { term: &'a str },
    Tracks { track_id: &'a str },
    Me,
    MyPlaylists { offset: usize },
    MySavedTracks { offset: usize },
    Playlist { playlist_id: &'a str },
    PlaylistTracks { playlist_id: &'a str, offset: usize },
    Album { album_id: &'a str },
    AlbumTracks { album_id: &'a str, offset: usize },
}

impl<'a> SpotifyAPI<'a> {
    pub const SEARCH_LIMIT: usize = 10;
    pub const MY_PLAYLISTS_LIMIT: usize = 50;
    pub const MY_SAVED_TRACKS_LIMIT: usize = 50;
    pub const PLAYLIST_TRACKS_LIMIT: usize = 100;
    pub const ALBUM_TRACKS_LIMIT: usize = 50;

    pub fn path(&self) -> String {
        match self {
            SpotifyAPI::Search { .. } => "search".to_string(),
            SpotifyAPI::Tracks { .. } => "tracks".to_string(),
            SpotifyAPI::Me => "me".to_string(),
            SpotifyAPI::MyPlaylists { .. } => "me/playlists".to_string(),
            SpotifyAPI::MySavedTracks { .. } => "me/tracks".to_string(),
            SpotifyAPI::Playlist { playlist_id } => format!("playlists/{playlist_id}"),
            SpotifyAPI::PlaylistTracks { playlist_id, .. } => {
                format!("playlists/{playlist_id}/tracks")
            }
            SpotifyAPI::Album { album_id } => format!("albums/{album_id}"),
            SpotifyAPI::AlbumTracks { album_id, .. } => format!("albums/{album_id}/tracks"),
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            SpotifyAPI::Search { term } => vec![
                ("limit", Self::SEARCH_LIMIT.to_string()),
                ("offset", "0".to_string()),
                ("q", term.to_string()),
                ("type", "track,album,playlist".to_string()),
            ],
            SpotifyAPI::Tracks { track_id } => vec![
                ("ids", track_id.to_string()),
                ("market", "from_token".to_string()),
            ],
            SpotifyAPI::Me | SpotifyAPI::Album { .. } => vec![],
            SpotifyAPI::Playlist { .. } => vec![
                ("fields", "name,owner(display_name)".to_string()),
                ("market", "from_token".to_string()),
            ],
            SpotifyAPI::MyPlaylists { offset } => Self::page(Self::MY_PLAYLISTS_LIMIT, *offset),
            SpotifyAPI::MySavedTracks { offset } => {
                Self::page(Self::MY_SAVED_TRACKS_LIMIT, *offset)
            }
            SpotifyAPI::PlaylistTracks { offset, .. } => {
                Self::page(Self::PLAYLIST_TRACKS_LIMIT, *offset)
            }
            SpotifyAPI::AlbumTracks { offset, .. } => Self::page(Self::ALBUM_TRACKS_LIMIT, *offset),
        }
    }

    fn page(limit: usize, offset: usize) -> Vec<(&'static str, String)> {
        vec![("limit", limit.to_string()), ("offset", offset.to_string())]
    }
}
