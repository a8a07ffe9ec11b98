//! Content distribution channel for Lumen
//!
//! The operator process owns a [`ContentBroadcaster`]: a Unix socket server
//! that fans newline-delimited JSON events out to every attached output
//! process. The output process attaches with an [`OutputReceiver`].
//!
//! # Delivery
//!
//! - One direction only, operator → output
//! - At-most-once, no acknowledgment, no retry
//! - FIFO per sender/receiver pair (one stream per receiver)
//! - No replay: a receiver that attaches late sees only what is sent after
//!   it attached. The operator re-promotes to resynchronise.
//!
//! # Event Types
//!
//! - `content-update` - render an item, optionally with its own transition
//! - `content-clear` - return to the idle placeholder
//! - `show-black` / `show-logo` - overlay modes
//! - `theme-update` - partial theme merge
//!
//! Every line is an [`Envelope`] carrying the wire version and a sequence
//! number; the receiver rejects versions it does not speak.
//!
//! # Example Usage
//!
//! ```no_run
//! use lumen_broadcaster::ContentBroadcaster;
//! use lumen_content::ContentItem;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broadcaster = ContentBroadcaster::new("/tmp/lumen_output.sock").await?;
//!     broadcaster.start().await?;
//!
//!     broadcaster
//!         .send_content(ContentItem::scripture("John 3:16", "For God so loved..."), None)
//!         .await;
//!     broadcaster.show_black().await;
//!
//!     broadcaster.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcaster;
pub mod client;
pub mod error;
pub mod events;
pub mod receiver;
pub mod window;

// Re-exports
pub use broadcaster::ContentBroadcaster;
pub use error::{BroadcasterError, Result};
pub use events::{decode_line, Envelope, OutputEvent};
pub use receiver::OutputReceiver;
pub use window::WindowCommand;
