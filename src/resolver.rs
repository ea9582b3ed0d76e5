use lazy_regex::regex_captures;

/// What a command-line argument points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Track(String),
    Album(String),
    Playlist(String),
    Search(String),
}

impl Resource {
    /// Parses a `spotify:<kind>:<id>` URI or an `open.spotify.com/<kind>/<id>` URL.
    /// Anything else, including links with a malformed id, becomes a search query.
    pub fn parse(input: &str) -> Self {
        if let Some(id) = Self::track_id(input) {
            return Resource::Track(id.to_string());
        }
        if let Some(id) = Self::album_id(input) {
            return Resource::Album(id.to_string());
        }
        if let Some(id) = Self::playlist_id(input) {
            return Resource::Playlist(id.to_string());
        }
        Resource::Search(input.to_string())
    }

    fn track_id(input: &str) -> Option<&str> {
        regex_captures!(r"^spotify:track:([0-9a-zA-Z]{22})$", input)
            .or_else(|| {
                regex_captures!(
                    r"^(?:https?://)?open\.spotify\.com/track/([0-9a-zA-Z]{22})(?:\?si=.+?)?$",
                    input
                )
            })
            .map(|(_, id)| id)
    }

    fn album_id(input: &str) -> Option<&str> {
        regex_captures!(r"^spotify:album:([0-9a-zA-Z]{22})$", input)
            .or_else(|| {
                regex_captures!(
                    r"^(?:https?://)?open\.spotify\.com/album/([0-9a-zA-Z]{22})(?:\?si=.+?)?$",
                    input
                )
            })
            .map(|(_, id)| id)
    }

    fn playlist_id(input: &str) -> Option<&str> {
        regex_captures!(r"^spotify:playlist:([0-9a-zA-Z]{22})$", input)
            .or_else(|| {
                regex_captures!(
                    r"^(?:https?://)?open\.spotify\.com/playlist/([0-9a-zA-Z]{22})(?:\?si=.+?)?$",
                    input
                )
            })
            .map(|(_, id)| id)
    }
}
