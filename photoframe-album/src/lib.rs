//! Pick one random photo from a remote album and fit it to an e-paper panel.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod plugin;
pub mod sources;

pub use error::{AlbumError, Result};
pub use plugin::{ImageAlbum, Plugin};
