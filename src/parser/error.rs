//! Error types for the HTTP parser.

use thiserror::Error;

/// Errors that can occur while reading or parsing an HTTP request.
///
/// Most variants describe a protocol violation and map onto an HTTP status via
/// [`Error::status`]. [`Error::EndOfStream`] and [`Error::Io`] are different:
/// they mean there is no request to answer at all.
#[derive(Debug, Error)]
pub enum Error {
    /// The request line does not consist of exactly three space-separated tokens.
    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    /// The verb is syntactically fine but not one this server implements.
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The resource is empty or not root-relative.
    #[error("Invalid HTTP path: {0}")]
    InvalidPath(String),

    /// The version spec is not `HTTP/<int>.<int>`.
    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    /// A header line has no colon.
    #[error("Invalid header format: {0}")]
    InvalidHeaderFormat(String),

    /// A header name contains an RFC 2616 token separator.
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    /// The request head exceeded the size limit before its blank line arrived.
    #[error("Request head exceeds {0} bytes")]
    HeadTooLarge(usize),

    /// The request head is not valid UTF-8.
    #[error("Request head is not valid UTF-8")]
    InvalidEncoding,

    /// The stream ended before a complete request head was read.
    #[error("End of stream")]
    EndOfStream,

    /// Reading from the underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The HTTP status code this error should be answered with, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UnsupportedMethod(_) => Some(501),
            Error::MalformedRequestLine(_)
            | Error::InvalidPath(_)
            | Error::InvalidVersion(_)
            | Error::InvalidHeaderFormat(_)
            | Error::InvalidHeaderName(_)
            | Error::HeadTooLarge(_)
            | Error::InvalidEncoding => Some(400),
            Error::EndOfStream | Error::Io(_) => None,
        }
    }
}
