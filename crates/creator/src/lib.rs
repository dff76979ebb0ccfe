//! Kit Creator - layered character composition over a kit server.
//!
//! This crate integrates the creator components:
//! - Kit structure loading and selection
//! - Compositing the selected layers
//! - The merge tool and file edits on the server
//! - Session observers for presentation layers

pub mod config;
pub mod observer;
pub mod session;

pub use config::CreatorConfig;
pub use observer::SessionObserver;
pub use session::{RenderHandle, Session};

/// Creator version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent string.
pub fn user_agent() -> String {
    format!("kit-creator/{} ({})", VERSION, std::env::consts::OS)
}
