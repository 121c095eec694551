//! Mapping of transfer failures onto retry kinds.

use super::error::SegmentError;
use super::policy::ErrorKind;

impl ErrorKind {
    /// Kind for a final HTTP status that was not a success.
    pub fn from_http_status(code: u32) -> Self {
        match code {
            429 | 503 => ErrorKind::Throttled,
            500..=599 => ErrorKind::Http5xx(code as u16),
            _ => ErrorKind::Other,
        }
    }

    /// Kind for a libcurl failure. A body cut short (`CURLE_PARTIAL_FILE`) counts
    /// as a dropped connection.
    pub fn from_curl(e: &curl::Error) -> Self {
        if e.is_operation_timedout() {
            ErrorKind::Timeout
        } else if is_connection_failure(e) {
            ErrorKind::Connection
        } else {
            ErrorKind::Other
        }
    }
}

fn is_connection_failure(e: &curl::Error) -> bool {
    let checks: [fn(&curl::Error) -> bool; 8] = [
        curl::Error::is_couldnt_connect,
        curl::Error::is_couldnt_resolve_host,
        curl::Error::is_couldnt_resolve_proxy,
        curl::Error::is_read_error,
        curl::Error::is_recv_error,
        curl::Error::is_send_error,
        curl::Error::is_got_nothing,
        curl::Error::is_partial_file,
    ];
    checks.iter().any(|check| check(e))
}

impl SegmentError {
    /// How the retry policy should treat this failure. Local disk errors and
    /// cancellation never earn another attempt.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SegmentError::Curl(e) => ErrorKind::from_curl(e),
            SegmentError::Http(code) => ErrorKind::from_http_status(*code),
            SegmentError::Storage(_) | SegmentError::Cancelled => ErrorKind::Other,
        }
    }
}
