//! Static `(field, container)` table mapping metadata to tool tag names.

use crate::item::{Container, Item, ItemMetadata};

use super::config::EmbedConfig;

/// Comment written when branding is enabled.
pub const BRANDING_COMMENT: &str = "Processed by finisher";

/// Every tag field the embed stage knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagField {
    Branding,
    ServiceId,
    Artist,
    Album,
    AlbumArtist,
    Title,
    Year,
    DiscNumber,
    TrackNumber,
    Genre,
    Performers,
    Producers,
    Writers,
    Label,
    Copyright,
    Description,
    Language,
    Isrc,
    Length,
    Bpm,
    Key,
    Compilation,
    Url,
    Lyrics,
    Explicit,
    Upc,
    TimeSignature,
    Acousticness,
    Danceability,
    Instrumentalness,
    Liveness,
    Loudness,
    Speechiness,
    Energy,
    Valence,
}

impl TagField {
    /// All fields, in the order their arguments are emitted.
    pub const ALL: [TagField; 35] = [
        TagField::Branding,
        TagField::ServiceId,
        TagField::Artist,
        TagField::Album,
        TagField::AlbumArtist,
        TagField::Title,
        TagField::Year,
        TagField::DiscNumber,
        TagField::TrackNumber,
        TagField::Genre,
        TagField::Performers,
        TagField::Producers,
        TagField::Writers,
        TagField::Label,
        TagField::Copyright,
        TagField::Description,
        TagField::Language,
        TagField::Isrc,
        TagField::Length,
        TagField::Bpm,
        TagField::Key,
        TagField::Compilation,
        TagField::Url,
        TagField::Lyrics,
        TagField::Explicit,
        TagField::Upc,
        TagField::TimeSignature,
        TagField::Acousticness,
        TagField::Danceability,
        TagField::Instrumentalness,
        TagField::Liveness,
        TagField::Loudness,
        TagField::Speechiness,
        TagField::Energy,
        TagField::Valence,
    ];

    /// Whether the configuration asks for this field.
    pub fn is_enabled(self, config: &EmbedConfig) -> bool {
        match self {
            Self::Branding => config.branding,
            Self::ServiceId => config.service_id,
            Self::Artist => config.artist,
            Self::Album => config.album,
            Self::AlbumArtist => config.album_artist,
            Self::Title => config.name,
            Self::Year => config.year,
            Self::DiscNumber => config.disc_number,
            Self::TrackNumber => config.track_number,
            Self::Genre => config.genre,
            Self::Performers => config.performers,
            Self::Producers => config.producers,
            Self::Writers => config.writers,
            Self::Label => config.label,
            Self::Copyright => config.copyright,
            Self::Description => config.description,
            Self::Language => config.language,
            Self::Isrc => config.isrc,
            Self::Length => config.length,
            Self::Bpm => config.bpm,
            Self::Key => config.key,
            Self::Compilation => config.compilation,
            Self::Url => config.url,
            Self::Lyrics => config.lyrics,
            Self::Explicit => config.explicit,
            Self::Upc => config.upc,
            Self::TimeSignature => config.time_signature,
            Self::Acousticness => config.acousticness,
            Self::Danceability => config.danceability,
            Self::Instrumentalness => config.instrumentalness,
            Self::Liveness => config.liveness,
            Self::Loudness => config.loudness,
            Self::Speechiness => config.speechiness,
            Self::Energy => config.energy,
            Self::Valence => config.valence,
        }
    }

    /// Tag value for this field, `None` when the metadata has nothing to write.
    pub fn value(self, item: &Item, metadata: &ItemMetadata, separator: &str) -> Option<String> {
        let value = match self {
            Self::Branding => Some(BRANDING_COMMENT.to_string()),
            Self::ServiceId => Some(item.item_id.clone()),
            Self::Artist => join(&metadata.artists, separator),
            Self::Album => metadata.album_name.clone(),
            Self::AlbumArtist => join(&metadata.album_artists, separator),
            Self::Title => metadata.title.clone(),
            Self::Year => metadata.release_year.clone(),
            Self::DiscNumber => metadata
                .disc_number
                .map(|n| with_total(n, metadata.total_discs)),
            Self::TrackNumber => metadata
                .track_number
                .map(|n| with_total(n, metadata.total_tracks)),
            Self::Genre => join(&metadata.genre, separator),
            Self::Performers => join(&metadata.performers, separator),
            Self::Producers => join(&metadata.producers, separator),
            Self::Writers => join(&metadata.writers, separator),
            Self::Label => metadata.label.clone(),
            Self::Copyright => metadata.copyright.clone(),
            Self::Description => metadata.description.clone(),
            Self::Language => metadata.language.clone(),
            Self::Isrc => metadata.isrc.clone(),
            Self::Length => metadata.length.map(|ms| ms.to_string()),
            Self::Bpm => metadata.bpm.map(|v| v.to_string()),
            Self::Key => metadata.key.clone(),
            Self::Compilation => metadata
                .album_type
                .as_deref()
                .map(|t| u8::from(t == "compilation").to_string()),
            Self::Url => metadata.item_url.clone(),
            Self::Lyrics => metadata.lyrics.clone(),
            Self::Explicit => metadata.explicit.map(|e| u8::from(e).to_string()),
            Self::Upc => metadata.upc.clone(),
            Self::TimeSignature => metadata.time_signature.map(|v| v.to_string()),
            Self::Acousticness => metadata.acousticness.map(|v| v.to_string()),
            Self::Danceability => metadata.danceability.map(|v| v.to_string()),
            Self::Instrumentalness => metadata.instrumentalness.map(|v| v.to_string()),
            Self::Liveness => metadata.liveness.map(|v| v.to_string()),
            Self::Loudness => metadata.loudness.map(|v| v.to_string()),
            Self::Speechiness => metadata.speechiness.map(|v| v.to_string()),
            Self::Energy => metadata.energy.map(|v| v.to_string()),
            Self::Valence => metadata.valence.map(|v| v.to_string()),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Tag name for `field` in `container`, `None` if the field is not written there.
///
/// MP3 uses ID3 frame ids where the tool needs them to land in the right frame.
pub fn tag_key(field: TagField, container: &Container, service: &str) -> Option<String> {
    use Container::{M4a, Mp3};
    use TagField::*;

    let key = match (field, container) {
        (ServiceId, _) => return Some(format!("{}id", service)),
        (Branding, Mp3) | (Description, Mp3) => "COMM",
        (Branding, _) | (Description, _) => "comment",
        (Artist, _) => "artist",
        (Album, _) => "album",
        (AlbumArtist, Mp3) => "TPE2",
        (AlbumArtist, _) => "album_artist",
        (Title, _) => "title",
        (Year, _) => "date",
        (DiscNumber, Mp3) => "TPOS",
        (DiscNumber, _) => "disc",
        (TrackNumber, _) => "track",
        (Genre, _) => "genre",
        (Performers, Mp3) => "TPE1",
        (Performers, _) => "performer",
        (Producers, Mp3) => "TIPL",
        (Producers, _) => "producer",
        (Writers, Mp3) => "TEXT",
        (Writers, _) => "author",
        (Label, Mp3) => "publisher",
        (Label, _) => return None,
        (Copyright, _) => "copyright",
        (Language, Mp3) => "TLAN",
        (Language, _) => "language",
        (Isrc, Mp3) => "TSRC",
        (Isrc, _) => "isrc",
        (Length, Mp3) => "TLEN",
        (Length, _) => "length",
        (Bpm, Mp3) => "TBPM",
        (Bpm, M4a) => "tmpo",
        (Bpm, _) => "bpm",
        (Key, Mp3) => "TKEY",
        (Key, _) => "initialkey",
        (Compilation, Mp3) => "TCMP",
        (Compilation, _) => "compilation",
        (Url, Mp3) => "WOAS",
        (Url, _) => "website",
        (Lyrics, Mp3) => "USLT",
        (Lyrics, _) => "lyrics",
        (Explicit, Mp3) => "ITUNESADVISORY",
        (Explicit, _) => "explicit",
        (Upc, _) => "upc",
        (TimeSignature, _) => "timesignature",
        (Acousticness, _) => "acousticness",
        (Danceability, _) => "danceability",
        (Instrumentalness, _) => "instrumentalness",
        (Liveness, _) => "liveness",
        (Loudness, _) => "loudness",
        (Speechiness, _) => "speechiness",
        (Energy, _) => "energy",
        (Valence, _) => "valence",
    };
    Some(key.to_string())
}

/// `-metadata key=value` pairs for every enabled field that has a value.
pub fn build_metadata_args(
    item: &Item,
    metadata: &ItemMetadata,
    config: &EmbedConfig,
    separator: &str,
) -> Vec<String> {
    let container = item.container();
    let mut args = Vec::new();

    for field in TagField::ALL {
        if !field.is_enabled(config) {
            continue;
        }
        let Some(key) = tag_key(field, &container, &item.item_service) else {
            continue;
        };
        if let Some(value) = field.value(item, metadata, separator) {
            args.push("-metadata".to_string());
            args.push(format!("{}={}", key, value));
        }
    }

    args
}

fn join(values: &[String], separator: &str) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(separator))
    }
}

fn with_total(number: u32, total: Option<u32>) -> String {
    match total {
        Some(total) => format!("{}/{}", number, total),
        None => number.to_string(),
    }
}
