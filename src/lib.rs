//! Local reverse proxy for HLS playback.
//!
//! A player opens a `http://127.0.0.1:<port>/...` URL carrying the real
//! origin URL in a reserved query parameter. Playlists are fetched and
//! rewritten so every segment, key and variant reference also routes through
//! the proxy; media is passed through untouched.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod hls;
pub mod metrics;
pub mod proxy;
pub mod server;
pub mod url_codec;

pub use proxy::HlsProxy;
