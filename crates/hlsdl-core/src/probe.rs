//! Reachability probing via HTTP HEAD.
//!
//! Reachability is advisory: any failure (DNS, refused connection, timeout,
//! non-2xx status) yields `false` and is logged, never propagated. Callers
//! decide whether an unreachable URL is terminal.

use crate::http::{self, HttpOptions};

/// Returns true when a HEAD request for `url`, following redirects, ends in a 2xx status.
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn probe(url: &str, opts: &HttpOptions) -> bool {
    match head_status(url, opts) {
        Ok(code) if http::is_success(code) => true,
        Ok(code) => {
            tracing::debug!(url, code, "probe: unexpected HTTP status");
            false
        }
        Err(e) => {
            tracing::debug!(url, error = %e, "probe: request failed");
            false
        }
    }
}

fn head_status(url: &str, opts: &HttpOptions) -> Result<u32, curl::Error> {
    let mut easy = http::short_request(url, opts)?;
    easy.nobody(true)?; // HEAD request
    easy.perform()?;
    easy.response_code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    #[test]
    fn invalid_url_is_unreachable() {
        assert!(!probe("not a url at all", &HttpOptions::default()));
    }

    #[test]
    fn refused_connection_is_unreachable() {
        // Bind then drop to get a port with nothing listening.
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let opts = HttpOptions {
            connect_timeout: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(5),
            ..HttpOptions::default()
        };
        assert!(!probe(&format!("http://127.0.0.1:{}/x.ts", port), &opts));
    }
}
