use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ContentError, Result};
use crate::style::ContentStyle;

/// Id carried by the placeholder item that preview and live reset to.
pub const PLACEHOLDER_ID: &str = "placeholder";

/// Content type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Scripture,
    Song,
    Announcement,
    Slide,
    Media,
    Black,
    Logo,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Scripture => "scripture",
            ContentKind::Song => "song",
            ContentKind::Announcement => "announcement",
            ContentKind::Slide => "slide",
            ContentKind::Media => "media",
            ContentKind::Black => "black",
            ContentKind::Logo => "logo",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptureContent {
    pub reference: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verse: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SongContent {
    pub title: String,
    pub lyrics: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    /// 1-based verse currently shown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verse_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_verses: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnouncementContent {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlideContent {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaContent {
    pub media_url: String,
    pub media_type: MediaType,
    pub auto_play: bool,
    #[serde(rename = "loop")]
    pub looping: bool,
}

impl Default for MediaContent {
    fn default() -> Self {
        Self {
            media_url: String::new(),
            media_type: MediaType::Image,
            auto_play: true,
            looping: false,
        }
    }
}

/// Type-specific payload, tagged on `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBody {
    Scripture(ScriptureContent),
    Song(SongContent),
    Announcement(AnnouncementContent),
    Slide(SlideContent),
    Media(MediaContent),
    Black,
    Logo,
}

impl ContentBody {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentBody::Scripture(_) => ContentKind::Scripture,
            ContentBody::Song(_) => ContentKind::Song,
            ContentBody::Announcement(_) => ContentKind::Announcement,
            ContentBody::Slide(_) => ContentKind::Slide,
            ContentBody::Media(_) => ContentKind::Media,
            ContentBody::Black => ContentKind::Black,
            ContentBody::Logo => ContentKind::Logo,
        }
    }
}

/// A tagged unit of presentable material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(flatten)]
    pub body: ContentBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ContentStyle>,
}

impl ContentItem {
    /// Create an item with a fresh id, stamped now.
    pub fn new(body: ContentBody) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp_millis(),
            body,
            style: None,
        }
    }

    /// The item preview and live hold when nothing has been staged.
    pub fn placeholder() -> Self {
        Self {
            id: PLACEHOLDER_ID.to_string(),
            timestamp: 0,
            body: ContentBody::Black,
            style: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == PLACEHOLDER_ID
    }

    pub fn scripture(reference: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(ContentBody::Scripture(ScriptureContent {
            reference: reference.into(),
            text: text.into(),
            ..Default::default()
        }))
    }

    pub fn song(title: impl Into<String>, lyrics: impl Into<String>) -> Self {
        Self::new(ContentBody::Song(SongContent {
            title: title.into(),
            lyrics: lyrics.into(),
            ..Default::default()
        }))
    }

    pub fn announcement(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(ContentBody::Announcement(AnnouncementContent {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }))
    }

    pub fn slide(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(ContentBody::Slide(SlideContent {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }))
    }

    pub fn media(url: impl Into<String>, media_type: MediaType) -> Self {
        Self::new(ContentBody::Media(MediaContent {
            media_url: url.into(),
            media_type,
            ..Default::default()
        }))
    }

    pub fn black() -> Self {
        Self::new(ContentBody::Black)
    }

    pub fn logo() -> Self {
        Self::new(ContentBody::Logo)
    }

    /// Build a scripture item straight from a verse record.
    pub fn from_verse(verse: &Verse) -> Self {
        Self::new(ContentBody::Scripture(ScriptureContent {
            reference: verse.reference.clone(),
            text: verse.text.clone(),
            translation: verse.translation.clone(),
            book: verse.book.clone(),
            chapter: verse.chapter,
            verse: verse.verse,
        }))
    }

    pub fn with_style(mut self, style: ContentStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn kind(&self) -> ContentKind {
        self.body.kind()
    }

    /// Check that every field the type's template requires is present.
    pub fn validate(&self) -> Result<()> {
        let kind = self.kind();
        let missing = |field: &'static str| Err(ContentError::MissingField { kind, field });

        match &self.body {
            ContentBody::Scripture(s) => {
                if s.reference.trim().is_empty() {
                    return missing("reference");
                }
                if s.text.trim().is_empty() {
                    return missing("text");
                }
            }
            ContentBody::Song(s) => {
                if s.title.trim().is_empty() {
                    return missing("title");
                }
                if s.lyrics.trim().is_empty() {
                    return missing("lyrics");
                }
            }
            ContentBody::Announcement(a) => {
                if a.title.trim().is_empty() {
                    return missing("title");
                }
            }
            ContentBody::Slide(s) => {
                if s.title.trim().is_empty() && s.content.trim().is_empty() {
                    return missing("content");
                }
            }
            ContentBody::Media(m) => {
                if m.media_url.trim().is_empty() {
                    return missing("mediaUrl");
                }
            }
            ContentBody::Black | ContentBody::Logo => {}
        }

        Ok(())
    }

    /// Same content, ignoring identity and timestamp.
    pub fn same_content(&self, other: &ContentItem) -> bool {
        self.body == other.body && self.style == other.style
    }
}

impl Default for ContentItem {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// A verse record as handed over by the scripture lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Verse {
    pub reference: String,
    pub text: String,
    pub translation: Option<String>,
    pub book: Option<String>,
    pub chapter: Option<u32>,
    pub verse: Option<u32>,
}
