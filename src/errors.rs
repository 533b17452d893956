//! Semantic error kinds for the request pipeline.
//!
//! These map 1:1 onto the six outcomes the connection loop must distinguish:
//! a malformed request, a request over the configured limits, a panicking
//! handler, a transport that is already gone, and a plain I/O failure.
//! `NeedMoreData` is not represented here at all — it is the `Ok(None)`
//! returned by `HttpConnection::try_read`, never an error value.

use crate::{query, Version};
use std::{error, fmt, io};

#[derive(Debug, PartialEq)]
pub(crate) enum ErrorKind {
    BadRequest(BadRequest),
    UnsupportedVersion,

    RequestTooLarge,
    HandlerError,

    ServiceUnavailable,
    Io(IoError),
}

/// Sub-reasons for [`ErrorKind::BadRequest`], kept distinct only so the
/// JSON error body can name the offending part of the request.
#[derive(Debug, PartialEq)]
pub(crate) enum BadRequest {
    InvalidMethod,
    InvalidUrl,
    Query(query::Error),
    InvalidVersion,
    InvalidHeader,
    InvalidContentLength,
    InvalidConnection,
    InvalidChunk,
    BodyMismatch { expected: usize, available: usize },
}

macro_rules! http_errors {
    ($($name:ident: $status_code:expr, $len:literal => $json:literal; )*) => {
        pub(crate) const fn as_http(
            &self,
            version: Version,
            json: bool,
        ) -> &'static [u8] {
            match (json, self, version) { $(
                (true, Self::$name { .. }, Version::Http11) => concat!(
                    "HTTP/1.1 ", $status_code, "\r\n",
                    "connection: close\r\n",
                    "content-length: ", $len, "\r\n",
                    "content-type: application/json\r\n",
                    "\r\n",
                    $json
                ),
                (false, Self::$name { .. }, Version::Http11) => concat!(
                    "HTTP/1.1 ", $status_code, "\r\n",
                    "connection: close\r\n",
                    "content-length: 0\r\n\r\n",
                ),
                (true, Self::$name { .. }, Version::Http10) => concat!(
                    "HTTP/1.0 ", $status_code, "\r\n",
                    "connection: close\r\n",
                    "content-length: ", $len, "\r\n",
                    "content-type: application/json\r\n",
                    "\r\n",
                    $json
                ),
                (false, Self::$name { .. }, Version::Http10) => concat!(
                    "HTTP/1.0 ", $status_code, "\r\n",
                    "connection: close\r\n",
                    "content-length: 0\r\n\r\n",
                ),
                (_, Self::$name { .. }, Version::Http09) => concat!(
                    "ERROR: ", stringify!($status_code)
                ),
            )* }.as_bytes()
        }
    };
}

impl ErrorKind {
    http_errors! {
        BadRequest: "400 Bad Request", "55"
            => r#"{"error":"Malformed request","code":"BAD_REQUEST"}"#;
        UnsupportedVersion: "505 HTTP Version Not Supported", "67"
            => r#"{"error":"HTTP version not supported","code":"UNSUPPORTED_VERSION"}"#;

        RequestTooLarge: "413 Payload Too Large", "58"
            => r#"{"error":"Request exceeds configured limits","code":"REQUEST_TOO_LARGE"}"#;
        HandlerError: "500 Internal Server Error", "57"
            => r#"{"error":"Handler raised an error","code":"HANDLER_ERROR"}"#;

        ServiceUnavailable: "503 Service Unavailable", "72"
            => r#"{"error":"Service temporarily unavailable","code":"SERVICE_UNAVAILABLE"}"#;
        Io: "503 Service Unavailable", "48"
            => r#"{"error":"I/O error occurred","code":"IO_ERROR"}"#;
    }
}

impl error::Error for ErrorKind {}
impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<BadRequest> for ErrorKind {
    fn from(reason: BadRequest) -> Self {
        ErrorKind::BadRequest(reason)
    }
}
impl From<query::Error> for ErrorKind {
    fn from(err: query::Error) -> Self {
        ErrorKind::BadRequest(BadRequest::Query(err))
    }
}
impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        ErrorKind::Io(IoError(err))
    }
}

/// `TransportClosed` (peer gone, reset, aborted) never reaches `ErrorKind`:
/// the send path absorbs it at the source (see `http::response::send`) and
/// the read path maps it to a clean connection end, not a logged error.
#[derive(Debug)]
pub(crate) struct IoError(pub(crate) io::Error);

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

/// Returns `true` for the closed-peer family of I/O errors that the send
/// path must swallow rather than propagate, regardless of transport (TLS or
/// plain TCP) — see the resolved Open Question in DESIGN.md.
pub(crate) fn is_transport_closed(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}
