//! Tag writing backed by `lofty`, for both MP3 (ID3v2) and Ogg Vorbis (Vorbis comments).

use std::io::Cursor;
use std::path::Path;

use error_stack::{IntoReport, Report, ResultExt};
use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFile, TaggedFileExt};
use lofty::picture::{Picture, PictureType};
use lofty::tag::{ItemKey, Tag};

use crate::catalog::TrackMetadata;
use crate::postprocess::{TagWriteFailed, TagWriteResult, Tagger};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagger;

impl LoftyTagger {
    fn read(path: &Path) -> TagWriteResult<TaggedFile> {
        lofty::read_from_path(path)
            .into_report()
            .attach_printable(format!("Failed to read {}", path.display()))
            .change_context(TagWriteFailed)
    }

    fn primary_tag(tagged_file: &mut TaggedFile) -> TagWriteResult<&mut Tag> {
        if tagged_file.primary_tag().is_none() {
            let tag_type = tagged_file.primary_tag_type();
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        tagged_file
            .primary_tag_mut()
            .ok_or_else(|| Report::new(TagWriteFailed).attach_printable("File can't hold tags"))
    }

    /// Fails when the tag format has no field for `key`.
    fn set_text(tag: &mut Tag, key: ItemKey, value: String) -> TagWriteResult<()> {
        let field = format!("{key:?}");
        if tag.insert_text(key, value) {
            return Ok(());
        }
        Err(Report::new(TagWriteFailed).attach_printable(format!(
            "{:?} tags have no {field} field",
            tag.tag_type()
        )))
    }

    fn save(tagged_file: &TaggedFile, path: &Path) -> TagWriteResult<()> {
        tagged_file
            .save_to_path(path, WriteOptions::default())
            .into_report()
            .attach_printable(format!("Failed to save tags to {}", path.display()))
            .change_context(TagWriteFailed)
    }
}

impl Tagger for LoftyTagger {
    fn apply_tags(&self, path: &Path, metadata: &TrackMetadata) -> TagWriteResult<()> {
        let mut tagged_file = Self::read(path)?;
        let tag = Self::primary_tag(&mut tagged_file)?;
        Self::set_text(tag, ItemKey::TrackArtist, metadata.joined_artists())?;
        Self::set_text(tag, ItemKey::TrackTitle, metadata.title.clone())?;
        Self::set_text(tag, ItemKey::AlbumTitle, metadata.album_name.clone())?;
        // ID3v2 only stores the year as part of the recording date (TDRC).
        if !metadata.release_year.is_empty() {
            Self::set_text(tag, ItemKey::RecordingDate, metadata.release_year.clone())?;
        }
        Self::set_text(tag, ItemKey::DiscNumber, metadata.disc_number.to_string())?;
        Self::set_text(tag, ItemKey::TrackNumber, metadata.track_number.to_string())?;
        Self::save(&tagged_file, path)
    }

    fn embed_artwork(&self, path: &Path, image: &[u8]) -> TagWriteResult<()> {
        let mut picture = Picture::from_reader(&mut Cursor::new(image))
            .into_report()
            .attach_printable("Artwork isn't a supported image")
            .change_context(TagWriteFailed)?;
        picture.set_pic_type(PictureType::CoverFront);

        let mut tagged_file = Self::read(path)?;
        let tag = Self::primary_tag(&mut tagged_file)?;
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(picture);
        Self::save(&tagged_file, path)
    }
}
