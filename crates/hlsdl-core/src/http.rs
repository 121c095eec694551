//! Shared libcurl handle settings for probes, playlist fetches and segment GETs.

use std::time::Duration;

/// Transfer tuning applied to every curl `Easy` handle we create.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Hard timeout for HEAD probes and playlist downloads.
    pub probe_timeout: Duration,
    /// Segment GETs abort after staying under 1 KiB/s for this long.
    pub low_speed_time: Duration,
    /// Optional wall-clock cap on a segment GET.
    pub transfer_timeout: Option<Duration>,
    /// Receive buffer size; bounds the chunk handed to each write callback.
    pub buffer_size: usize,
    pub user_agent: Option<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(30),
            low_speed_time: Duration::from_secs(60),
            transfer_timeout: None,
            buffer_size: 8192,
            user_agent: None,
        }
    }
}

const DEFAULT_USER_AGENT: &str = concat!("hlsdl/", env!("CARGO_PKG_VERSION"));

/// New handle for `url` with redirects, connect timeout and user agent set.
pub(crate) fn easy_for(url: &str, opts: &HttpOptions) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.useragent(opts.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))?;
    Ok(easy)
}

/// Settings for a short request whose whole body is small (HEAD, playlist text).
pub(crate) fn short_request(url: &str, opts: &HttpOptions) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = easy_for(url, opts)?;
    easy.timeout(opts.probe_timeout)?;
    Ok(easy)
}

/// Settings for a streamed segment body.
pub(crate) fn body_request(url: &str, opts: &HttpOptions) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = easy_for(url, opts)?;
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(opts.low_speed_time)?;
    if let Some(limit) = opts.transfer_timeout {
        easy.timeout(limit)?;
    }
    easy.buffer_size(opts.buffer_size)?;
    Ok(easy)
}

/// Whether a final HTTP status means the resource was served.
pub(crate) fn is_success(code: u32) -> bool {
    (200..300).contains(&code)
}
