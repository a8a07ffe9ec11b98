//! Per-type layouts
//!
//! A [`Frame`] is everything a surface needs to draw one content item:
//! which template, its text blocks and the fully resolved style. Missing
//! fields never fail a render; the frame is marked degraded and drawn with
//! what is there.

use serde::Serialize;
use tracing::warn;

use lumen_content::{
    ContentBody, ContentItem, ContentKind, MediaType, ResolvedStyle, Theme, PLACEHOLDER_ID,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "template",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum Visual {
    /// Idle screen; the theme background and nothing else
    Placeholder,
    Scripture {
        reference: String,
        text: String,
        translation: Option<String>,
    },
    Song {
        title: String,
        lines: Vec<String>,
        artist: Option<String>,
        /// e.g. "2 / 4"
        verse_label: Option<String>,
    },
    Announcement {
        title: String,
        subtitle: Option<String>,
        content: String,
        category: Option<String>,
    },
    Slide {
        title: String,
        subtitle: Option<String>,
        content: String,
    },
    Media {
        url: String,
        media_type: MediaType,
        auto_play: bool,
        looping: bool,
    },
    Black,
    Logo {
        url: Option<String>,
    },
    /// Colour bars and display geometry for `testDisplay`
    TestPattern {
        display_id: u32,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Id of the item this frame was laid out from
    pub item_id: String,
    pub visual: Visual,
    pub style: ResolvedStyle,
    /// Required fields were missing; drawn with empty text
    pub degraded: bool,
}

impl Frame {
    pub fn placeholder(theme: &Theme) -> Self {
        Self {
            item_id: PLACEHOLDER_ID.to_string(),
            visual: Visual::Placeholder,
            style: ResolvedStyle::resolve(ContentKind::Black, None, theme),
            degraded: false,
        }
    }

    pub fn black() -> Self {
        Self {
            item_id: "black".to_string(),
            visual: Visual::Black,
            style: ContentKind::Black.default_style(),
            degraded: false,
        }
    }

    pub fn logo(theme: &Theme) -> Self {
        Self {
            item_id: "logo".to_string(),
            visual: Visual::Logo {
                url: theme.logo_url.clone(),
            },
            style: ResolvedStyle::resolve(ContentKind::Logo, None, theme),
            degraded: false,
        }
    }

    pub fn test_pattern(display_id: u32, width: u32, height: u32) -> Self {
        Self {
            item_id: format!("test-pattern-{}", display_id),
            visual: Visual::TestPattern {
                display_id,
                width,
                height,
            },
            style: ContentKind::Slide.default_style(),
            degraded: false,
        }
    }
}

/// Lay out `item` with its template, filling style gaps from `theme`.
pub fn layout(item: &ContentItem, theme: &Theme) -> Frame {
    if item.is_placeholder() {
        return Frame::placeholder(theme);
    }

    let degraded = match item.validate() {
        Ok(()) => false,
        Err(e) => {
            warn!("Rendering {} degraded: {}", item.id, e);
            true
        }
    };

    let visual = match &item.body {
        ContentBody::Scripture(s) => Visual::Scripture {
            reference: s.reference.clone(),
            text: s.text.clone(),
            translation: s.translation.clone(),
        },
        ContentBody::Song(s) => Visual::Song {
            title: s.title.clone(),
            lines: lyric_lines(&s.lyrics),
            artist: s.artist.clone(),
            verse_label: match (s.verse_number, s.total_verses) {
                (Some(n), Some(total)) => Some(format!("{} / {}", n, total)),
                (Some(n), None) => Some(n.to_string()),
                _ => None,
            },
        },
        ContentBody::Announcement(a) => Visual::Announcement {
            title: a.title.clone(),
            subtitle: a.subtitle.clone(),
            content: a.content.clone(),
            category: a.category.clone(),
        },
        ContentBody::Slide(s) => Visual::Slide {
            title: s.title.clone(),
            subtitle: s.subtitle.clone(),
            content: s.content.clone(),
        },
        ContentBody::Media(m) => Visual::Media {
            url: m.media_url.clone(),
            media_type: m.media_type,
            auto_play: m.auto_play,
            looping: m.looping,
        },
        ContentBody::Black => Visual::Black,
        ContentBody::Logo => Visual::Logo {
            url: theme.logo_url.clone(),
        },
    };

    let mut style = ResolvedStyle::resolve(item.kind(), item.style.as_ref(), theme);
    if style.background_image.is_none() {
        if let ContentBody::Slide(s) = &item.body {
            style.background_image = s.background_image.clone();
        }
    }

    Frame {
        item_id: item.id.clone(),
        visual,
        style,
        degraded,
    }
}

/// Lyrics keep their line breaks; blank lines between stanzas collapse.
fn lyric_lines(lyrics: &str) -> Vec<String> {
    lyrics
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_content::{ContentStyle, ScriptureContent, SongContent, TextAlign};

    #[test]
    fn test_visual_fields_are_camel_case() {
        let json = serde_json::to_value(Frame::test_pattern(2, 1920, 1080)).unwrap();
        assert_eq!(json["visual"]["template"], "test-pattern");
        assert_eq!(json["visual"]["displayId"], 2);
        assert!(json["visual"].get("display_id").is_none());

        let media = Visual::Media {
            url: "file:///intro.mp4".to_string(),
            media_type: lumen_content::MediaType::Video,
            auto_play: true,
            looping: false,
        };
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["autoPlay"], true);
        assert!(json.get("mediaType").is_some());
    }

    #[test]
    fn test_scripture_template() {
        let item = ContentItem::scripture("John 3:16", "For God so loved the world");
        let frame = layout(&item, &Theme::default());

        assert_eq!(frame.item_id, item.id);
        assert!(!frame.degraded);
        assert_eq!(
            frame.visual,
            Visual::Scripture {
                reference: "John 3:16".to_string(),
                text: "For God so loved the world".to_string(),
                translation: None,
            }
        );
        assert_eq!(frame.style.font_scale, 1.2);
        assert_eq!(frame.style.text_align, TextAlign::Center);
    }

    #[test]
    fn test_song_lines_and_verse_label() {
        let item = ContentItem::new(ContentBody::Song(SongContent {
            title: "Amazing Grace".to_string(),
            lyrics: "Amazing grace\nhow sweet the sound\n\nthat saved a wretch".to_string(),
            verse_number: Some(2),
            total_verses: Some(4),
            ..Default::default()
        }));

        match layout(&item, &Theme::default()).visual {
            Visual::Song {
                lines, verse_label, ..
            } => {
                assert_eq!(lines.len(), 3);
                assert_eq!(verse_label.as_deref(), Some("2 / 4"));
            }
            other => panic!("unexpected visual {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_degrade() {
        let item = ContentItem::new(ContentBody::Scripture(ScriptureContent {
            reference: "Psalm 23".to_string(),
            ..Default::default()
        }));
        let frame = layout(&item, &Theme::default());

        assert!(frame.degraded);
        assert!(matches!(frame.visual, Visual::Scripture { ref text, .. } if text.is_empty()));
    }

    #[test]
    fn test_item_style_and_theme_merge() {
        let mut theme = Theme::default();
        theme.font_family = "Georgia".to_string();
        theme.logo_url = Some("file:///logo.png".to_string());

        let item = ContentItem::announcement("Picnic", "Sunday after service").with_style(
            ContentStyle {
                text_color: Some("#ffcc00".to_string()),
                ..Default::default()
            },
        );
        let frame = layout(&item, &theme);
        assert_eq!(frame.style.text_color, "#ffcc00");
        assert_eq!(frame.style.font_family, "Georgia");
        assert_eq!(frame.style.text_align, TextAlign::Left);

        let logo = layout(&ContentItem::logo(), &theme);
        assert_eq!(
            logo.visual,
            Visual::Logo {
                url: Some("file:///logo.png".to_string())
            }
        );
    }

    #[test]
    fn test_placeholder_item_lays_out_idle() {
        let frame = layout(&ContentItem::placeholder(), &Theme::default());
        assert_eq!(frame.visual, Visual::Placeholder);
    }
}
