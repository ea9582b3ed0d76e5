use std::fmt;
use std::path::{Path, PathBuf};

use colored::Colorize;
use error_stack::ResultExt;

use crate::catalog::client::CatalogClient;
use crate::catalog::{SearchKind, TrackReference};
use crate::dialoguer::Dialoguer;
use crate::download::Downloader;
use crate::resolver::Resource;
use crate::sanitize::sanitize_data;

const LIKED_SONGS_DIRECTORY: &str = "Liked Songs";

#[derive(Debug)]
pub struct CommandError;

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Command error")
    }
}

impl std::error::Error for CommandError {}

pub type CommandResult<T> = error_stack::Result<T, CommandError>;

/// What a single run does, decided from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZSpotifyCommand {
    /// Ask for a search term, then pick one result.
    Search,
    /// Pick one of the account's playlists.
    UserPlaylist,
    LikedSongs,
    Resolve(Resource),
}

impl ZSpotifyCommand {
    pub fn from_args(input: Option<&str>, playlist: bool, liked_songs: bool) -> Self {
        if playlist {
            return ZSpotifyCommand::UserPlaylist;
        }
        if liked_songs {
            return ZSpotifyCommand::LikedSongs;
        }
        match input {
            Some(input) => ZSpotifyCommand::Resolve(Resource::parse(input)),
            None => ZSpotifyCommand::Search,
        }
    }
}

/// `<artist> - <album>`, used for every track of an album.
pub fn album_directory(artist: &str, album_name: &str) -> PathBuf {
    PathBuf::from(format!(
        "{} - {}",
        sanitize_data(artist),
        sanitize_data(album_name)
    ))
}

pub fn playlist_directory(playlist_name: &str) -> PathBuf {
    PathBuf::from(sanitize_data(playlist_name.trim()))
}

pub struct Commands<'a> {
    catalog: &'a CatalogClient<'a>,
    downloader: &'a Downloader<'a>,
}

impl<'a> Commands<'a> {
    pub fn new(catalog: &'a CatalogClient<'a>, downloader: &'a Downloader<'a>) -> Self {
        Self {
            catalog,
            downloader,
        }
    }

    pub fn execute(&self, command: ZSpotifyCommand) -> CommandResult<()> {
        match command {
            ZSpotifyCommand::Search => {
                let term =
                    Dialoguer::input("Enter search".to_string()).change_context(CommandError)?;
                self.search(&term)
            }
            ZSpotifyCommand::UserPlaylist => self.download_user_playlist(),
            ZSpotifyCommand::LikedSongs => self.download_liked_songs(),
            ZSpotifyCommand::Resolve(Resource::Track(track_id)) => {
                self.downloader.download_track(&track_id, Path::new(""));
                Ok(())
            }
            ZSpotifyCommand::Resolve(Resource::Album(album_id)) => self.download_album(&album_id),
            ZSpotifyCommand::Resolve(Resource::Playlist(playlist_id)) => {
                let (name, owner) = self
                    .catalog
                    .playlist_info(&playlist_id)
                    .change_context(CommandError)?;
                println!("Playlist {} by {}", name.cyan(), owner.cyan());
                self.download_playlist(&playlist_id, &name)
            }
            ZSpotifyCommand::Resolve(Resource::Search(term)) => self.search(&term),
        }
    }

    fn search(&self, term: &str) -> CommandResult<()> {
        let results = self.catalog.search(term).change_context(CommandError)?;
        if results.is_empty() {
            println!("{}", "No results found".yellow());
            return Ok(());
        }
        let entries = results.entries();
        let labels = entries
            .iter()
            .map(|entry| format!("[{}] {}", entry.kind, entry.label))
            .collect::<Vec<_>>();
        let selection = Dialoguer::select("Select an item".to_string(), &labels)
            .change_context(CommandError)?;
        let entry = &entries[selection];
        match entry.kind {
            SearchKind::Track => {
                self.downloader.download_track(&entry.id, Path::new(""));
                Ok(())
            }
            SearchKind::Album => self.download_album(&entry.id),
            SearchKind::Playlist => {
                let name = results
                    .playlists
                    .iter()
                    .find(|playlist| playlist.id == entry.id)
                    .map(|playlist| playlist.name.clone())
                    .unwrap_or_default();
                self.download_playlist(&entry.id, &name)
            }
        }
    }

    fn download_album(&self, album_id: &str) -> CommandResult<()> {
        let (artist, album_name) = self
            .catalog
            .album_info(album_id)
            .change_context(CommandError)?;
        println!("Album {} by {}", album_name.cyan(), artist.cyan());
        let tracks = self
            .catalog
            .list_album_tracks(album_id)
            .change_context(CommandError)?;
        self.download_batch(&tracks, &album_directory(&artist, &album_name));
        Ok(())
    }

    fn download_playlist(&self, playlist_id: &str, playlist_name: &str) -> CommandResult<()> {
        let tracks = self
            .catalog
            .list_playlist_tracks(playlist_id)
            .change_context(CommandError)?;
        self.download_batch(&tracks, &playlist_directory(playlist_name));
        Ok(())
    }

    fn download_user_playlist(&self) -> CommandResult<()> {
        let playlists = self
            .catalog
            .list_playlists()
            .change_context(CommandError)?;
        if playlists.is_empty() {
            println!("{}", "This account has no playlists".yellow());
            return Ok(());
        }
        let names = playlists
            .iter()
            .map(|playlist| playlist.name.clone())
            .collect::<Vec<_>>();
        let selection = Dialoguer::select("Select a playlist".to_string(), &names)
            .change_context(CommandError)?;
        let playlist = &playlists[selection];
        self.download_playlist(&playlist.id, &playlist.name)
    }

    fn download_liked_songs(&self) -> CommandResult<()> {
        let tracks = self
            .catalog
            .list_saved_tracks()
            .change_context(CommandError)?;
        self.download_batch(&tracks, Path::new(LIKED_SONGS_DIRECTORY));
        Ok(())
    }

    fn download_batch(&self, tracks: &[TrackReference], extra_path: &Path) {
        println!(
            "Downloading {} tracks into {}",
            tracks.len().to_string().cyan(),
            extra_path.display().to_string().cyan()
        );
        let outcomes = self.downloader.download_batch(tracks, extra_path);
        log::debug!(
            "Batch finished with {} failures",
            outcomes.iter().filter(|outcome| outcome.is_failure()).count()
        );
    }
}
