pub mod segment_server;

use hlsdl_core::config::{HlsdlConfig, RetryConfig};

/// Config tuned for loopback tests: short timeouts, near-instant retries.
#[allow(dead_code)]
pub fn fast_config(max_concurrency: usize) -> HlsdlConfig {
    HlsdlConfig {
        max_concurrency,
        connect_timeout_secs: 2,
        probe_timeout_secs: 5,
        low_speed_time_secs: 5,
        retry: Some(RetryConfig {
            max_attempts: 2,
            base_delay_secs: 0.01,
            max_delay_secs: 1,
        }),
        ..HlsdlConfig::default()
    }
}

/// A media playlist listing `names` as relative URIs.
#[allow(dead_code)]
pub fn media_playlist(names: &[String]) -> String {
    let mut s = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n#EXT-X-MEDIA-SEQUENCE:0\n");
    for name in names {
        s.push_str("#EXTINF:4.0,\n");
        s.push_str(name);
        s.push('\n');
    }
    s.push_str("#EXT-X-ENDLIST\n");
    s
}
