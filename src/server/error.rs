//! Error types for the HTTP server.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::parser::{request_line_of, Error as ParserError, HttpRequest};
use crate::server::response::StatusCode;

/// An error that is answered with an HTTP error response.
///
/// Carries the status and, when one was parsed, the request that caused it
/// so the error page and the transfer log can refer to it. A head that was
/// rejected while parsing still has its raw request line recorded.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub status: StatusCode,
    pub request: Option<HttpRequest>,
    pub request_line: Option<String>,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            request: None,
            request_line: None,
        }
    }

    pub fn for_request(status: StatusCode, request: &HttpRequest) -> Self {
        Self {
            status,
            request: Some(request.clone()),
            request_line: Some(request.request_line.clone()),
        }
    }

    /// Record the raw request line of a head that failed to parse.
    pub fn with_request_line(mut self, request_line: Option<String>) -> Self {
        self.request_line = request_line;
        self
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.status.reason_phrase())
    }
}

impl std::error::Error for HttpError {}

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// A request-level failure answered with an error page.
    #[error("HTTP error: {0}")]
    Http(HttpError),

    /// The peer closed the stream; there are no more requests.
    #[error("End of stream")]
    EndOfStream,

    /// The socket failed (reset, broken pipe, forced closure...).
    #[error("Transport error: {0}")]
    Transport(io::Error),

    /// Reading a resource from disk failed after its headers were sent.
    #[error("Resource read error on {path}: {source}")]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The listening socket could not be bound.
    #[error("Could not listen on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    /// The configuration could not be read or interpreted.
    #[error("The configuration file {path} could not be interpreted: {reason}")]
    Config { path: PathBuf, reason: String },

    /// Anything else.
    #[error("Internal server error: {0}")]
    Unexpected(String),
}

impl From<HttpError> for Error {
    fn from(err: HttpError) -> Self {
        Error::Http(err)
    }
}

impl Error {
    /// Convert a failure to parse `head` into a server error.
    ///
    /// HTTP errors keep the head's request line, when it has one, for the
    /// transfer log.
    pub fn from_rejected_head(err: ParserError, head: &[u8]) -> Self {
        match Error::from(err) {
            Error::Http(http) => Error::Http(http.with_request_line(request_line_of(head))),
            other => other,
        }
    }
}

impl From<ParserError> for Error {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::EndOfStream => Error::EndOfStream,
            ParserError::Io(e) => Error::Transport(e),
            other => match other.status() {
                Some(code) => Error::Http(HttpError::new(StatusCode(code))),
                None => Error::Unexpected(other.to_string()),
            },
        }
    }
}
