//! Content model for Lumen
//!
//! Everything the operator process and the output process must agree on:
//! the tagged [`ContentItem`] union, per-type styling defaults, transition
//! parameters and the presentation theme.
//!
//! The wire form of a content item is a flat JSON object discriminated on
//! `type`, with camelCase field names and millisecond epoch timestamps:
//!
//! ```json
//! {"id":"…","timestamp":1700000000000,"type":"scripture",
//!  "reference":"John 3:16","text":"For God so loved…","translation":"KJV"}
//! ```

pub mod error;
pub mod item;
pub mod style;
pub mod theme;
pub mod transition;

pub use error::{ContentError, Result};
pub use item::{
    AnnouncementContent, ContentBody, ContentItem, ContentKind, MediaContent, MediaType,
    ScriptureContent, SlideContent, SongContent, Verse, PLACEHOLDER_ID,
};
pub use style::{ContentStyle, ResolvedStyle, TextAlign};
pub use theme::{Theme, ThemeUpdate};
pub use transition::{Easing, SlideDirection, TransitionKind, TransitionSpec};

/// Version of the cross-process payload format.
///
/// Bumped whenever a change to [`ContentItem`] or the channel events would
/// make an older output process mis-render a newer operator's messages.
pub const WIRE_VERSION: u32 = 1;
