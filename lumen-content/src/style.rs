use serde::{Deserialize, Serialize};

use crate::item::ContentKind;
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Optional per-item styling; every field falls back to a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
}

/// Styling with every field filled in
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStyle {
    pub text_color: String,
    pub background_color: String,
    pub font_family: String,
    pub font_scale: f32,
    pub text_align: TextAlign,
    pub background_image: Option<String>,
}

pub const DEFAULT_TEXT_COLOR: &str = "#ffffff";
pub const DEFAULT_BACKGROUND_COLOR: &str = "#000000";
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

impl ContentKind {
    /// Font scale a type renders at when nothing overrides it.
    ///
    /// Scripture and songs are read from the back of the room; announcements
    /// carry more text per screen.
    pub fn default_font_scale(&self) -> f32 {
        match self {
            ContentKind::Scripture => 1.2,
            ContentKind::Song => 1.1,
            ContentKind::Announcement => 0.9,
            ContentKind::Slide => 1.0,
            ContentKind::Media | ContentKind::Black | ContentKind::Logo => 1.0,
        }
    }

    pub fn default_text_align(&self) -> TextAlign {
        match self {
            ContentKind::Announcement => TextAlign::Left,
            _ => TextAlign::Center,
        }
    }

    /// Per-type defaults with no theme applied.
    pub fn default_style(&self) -> ResolvedStyle {
        ResolvedStyle {
            text_color: DEFAULT_TEXT_COLOR.to_string(),
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_scale: self.default_font_scale(),
            text_align: self.default_text_align(),
            background_image: None,
        }
    }
}

impl ResolvedStyle {
    /// Fill gaps in `style` from the theme, then from per-type defaults.
    ///
    /// The theme's font scale multiplies the type default rather than
    /// replacing it, so songs stay larger than announcements.
    pub fn resolve(kind: ContentKind, style: Option<&ContentStyle>, theme: &Theme) -> Self {
        let empty = ContentStyle::default();
        let style = style.unwrap_or(&empty);

        ResolvedStyle {
            text_color: style
                .text_color
                .clone()
                .unwrap_or_else(|| theme.text_color.clone()),
            background_color: style
                .background_color
                .clone()
                .unwrap_or_else(|| theme.background_color.clone()),
            font_family: style
                .font_family
                .clone()
                .unwrap_or_else(|| theme.font_family.clone()),
            font_scale: style
                .font_scale
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or_else(|| kind.default_font_scale() * theme.font_scale),
            text_align: style.text_align.unwrap_or_else(|| kind.default_text_align()),
            background_image: style.background_image.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_overrides() {
        let resolved = ResolvedStyle::resolve(ContentKind::Scripture, None, &Theme::default());
        assert_eq!(resolved, ContentKind::Scripture.default_style());
        assert_eq!(resolved.text_color, "#ffffff");
    }

    #[test]
    fn test_item_style_wins_over_theme() {
        let mut theme = Theme::default();
        theme.text_color = "#eeeeee".to_string();
        let style = ContentStyle {
            text_color: Some("#ff0000".to_string()),
            ..Default::default()
        };
        let resolved = ResolvedStyle::resolve(ContentKind::Song, Some(&style), &theme);
        assert_eq!(resolved.text_color, "#ff0000");
        assert_eq!(resolved.background_color, theme.background_color);
    }

    #[test]
    fn test_theme_scale_multiplies_type_default() {
        let mut theme = Theme::default();
        theme.font_scale = 2.0;
        let resolved = ResolvedStyle::resolve(ContentKind::Announcement, None, &theme);
        assert!((resolved.font_scale - 1.8).abs() < f32::EPSILON);
        assert_eq!(resolved.text_align, TextAlign::Left);
    }

    #[test]
    fn test_invalid_font_scale_ignored() {
        let style = ContentStyle {
            font_scale: Some(-1.0),
            ..Default::default()
        };
        let resolved = ResolvedStyle::resolve(ContentKind::Slide, Some(&style), &Theme::default());
        assert_eq!(resolved.font_scale, 1.0);
    }
}
