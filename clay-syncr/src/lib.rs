//! clay-syncr - one-way synchronizers from third-party APIs into the site database
//!
//! Each syncr maps a remote XML/JSON schema onto local tables using
//! get-or-create upserts:
//! - `flickr`: photos, comments, photo sets and favorites
//! - `picasaweb`: Picasa Web Albums albums and photos
//! - `youtube`: users, videos, playlists, favorites and uploads
//! - `magnolia`: Ma.gnolia bookmarks
//! - `genericfeed`: any RSS 2.0 or Atom feed

pub mod error;
pub mod flickr;
pub mod genericfeed;
pub mod http;
pub mod magnolia;
pub mod picasaweb;
pub mod xml;
pub mod youtube;

pub use error::{Result, SyncError};
