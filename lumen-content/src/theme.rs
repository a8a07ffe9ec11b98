use serde::{Deserialize, Serialize};

use crate::style::{DEFAULT_BACKGROUND_COLOR, DEFAULT_FONT_FAMILY, DEFAULT_TEXT_COLOR};
use crate::transition::TransitionSpec;

/// Presentation theme applied on the output surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    pub background_color: String,
    pub text_color: String,
    pub font_family: String,
    /// Multiplier on every type's default font scale
    pub font_scale: f32,
    pub logo_url: Option<String>,
    /// Used when a content update carries no transition of its own
    pub transition: TransitionSpec,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            text_color: DEFAULT_TEXT_COLOR.to_string(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_scale: 1.0,
            logo_url: None,
            transition: TransitionSpec::default(),
        }
    }
}

/// Partial theme sent over the channel; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionSpec>,
}

impl ThemeUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ThemeUpdate::default()
    }
}

/// Every field set, so applying it reproduces `theme` exactly.
impl From<&Theme> for ThemeUpdate {
    fn from(theme: &Theme) -> Self {
        Self {
            background_color: Some(theme.background_color.clone()),
            text_color: Some(theme.text_color.clone()),
            font_family: Some(theme.font_family.clone()),
            font_scale: Some(theme.font_scale),
            logo_url: Some(theme.logo_url.clone().unwrap_or_default()),
            transition: Some(theme.transition),
        }
    }
}

impl Theme {
    /// Merge a partial update into this theme.
    pub fn apply(&mut self, update: &ThemeUpdate) {
        if let Some(color) = &update.background_color {
            self.background_color = color.clone();
        }
        if let Some(color) = &update.text_color {
            self.text_color = color.clone();
        }
        if let Some(family) = &update.font_family {
            self.font_family = family.clone();
        }
        if let Some(scale) = update.font_scale.filter(|s| s.is_finite() && *s > 0.0) {
            self.font_scale = scale;
        }
        if let Some(url) = &update.logo_url {
            self.logo_url = if url.is_empty() { None } else { Some(url.clone()) };
        }
        if let Some(transition) = update.transition {
            self.transition = transition;
        }
    }
}
