//! Playlist loading: fetch the `.m3u8` text and turn it into an ordered URI list.
//!
//! Parsing rules belong to `m3u8-rs`; this module only fetches the document,
//! rejects what the pipeline cannot handle (master playlists) and hands back
//! the segment URIs in playlist order.

use m3u8_rs::{KeyMethod, Playlist};
use thiserror::Error;

use crate::http::{self, HttpOptions};
use crate::probe;

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("playlist URL not reachable: {0}")]
    Unreachable(String),
    #[error("playlist request failed: {0}")]
    Curl(#[from] curl::Error),
    #[error("playlist returned HTTP {0}")]
    Http(u32),
    #[error("malformed playlist: {0}")]
    Parse(String),
    #[error("{0} is a master playlist; pass a media playlist URL")]
    MasterPlaylist(String),
}

/// Source of ordered segment URIs for a playlist URL.
pub trait PlaylistSource: Send + Sync {
    fn load(&self, url: &str) -> Result<Vec<String>, PlaylistError>;
}

/// Loads playlists over HTTP with curl.
#[derive(Debug, Clone, Default)]
pub struct HttpPlaylistSource {
    opts: HttpOptions,
}

impl HttpPlaylistSource {
    pub fn new(opts: HttpOptions) -> Self {
        Self { opts }
    }

    fn fetch_text(&self, url: &str) -> Result<Vec<u8>, PlaylistError> {
        let mut body = Vec::new();
        let mut easy = http::short_request(url, &self.opts)?;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }
        let code = easy.response_code()?;
        if !http::is_success(code) {
            return Err(PlaylistError::Http(code));
        }
        Ok(body)
    }
}

impl PlaylistSource for HttpPlaylistSource {
    fn load(&self, url: &str) -> Result<Vec<String>, PlaylistError> {
        if !probe::probe(url, &self.opts) {
            return Err(PlaylistError::Unreachable(url.to_string()));
        }
        let body = self.fetch_text(url)?;
        let uris = parse_media_playlist(&body).map_err(|e| match e {
            PlaylistError::MasterPlaylist(_) => PlaylistError::MasterPlaylist(url.to_string()),
            other => other,
        })?;
        tracing::info!(url, segments = uris.len(), "loaded playlist");
        Ok(uris)
    }
}

/// Extract segment URIs, in order, from media playlist text.
pub fn parse_media_playlist(body: &[u8]) -> Result<Vec<String>, PlaylistError> {
    let playlist = m3u8_rs::parse_playlist_res(body)
        .map_err(|e| PlaylistError::Parse(short_parse_error(&e)))?;
    match playlist {
        Playlist::MasterPlaylist(_) => Err(PlaylistError::MasterPlaylist(String::new())),
        Playlist::MediaPlaylist(media) => {
            let encrypted = media.segments.iter().any(|s| {
                s.key
                    .as_ref()
                    .map_or(false, |k| !matches!(k.method, KeyMethod::None))
            });
            if encrypted {
                tracing::warn!("playlist declares encrypted segments; they are saved as-is");
            }
            Ok(media.segments.into_iter().map(|s| s.uri).collect())
        }
    }
}

fn short_parse_error<E: std::fmt::Debug>(e: &E) -> String {
    let mut s = format!("{:?}", e);
    if s.len() > 120 {
        let mut cut = 120;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push_str("...");
    }
    s
}
