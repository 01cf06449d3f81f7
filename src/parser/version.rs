//! HTTP protocol versions.

use std::fmt;
use std::str::FromStr;

use crate::parser::error::Error;

/// An HTTP protocol version as `major.minor`.
///
/// Ordering is lexical over `(major, minor)`, so `HTTP/1.10 > HTTP/1.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HttpVersion {
    pub major: u32,
    pub minor: u32,
}

impl HttpVersion {
    pub const HTTP_1_0: HttpVersion = HttpVersion::new(1, 0);
    pub const HTTP_1_1: HttpVersion = HttpVersion::new(1, 1);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

fn version_part(part: &str, spec: &str) -> Result<u32, Error> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidVersion(spec.to_string()));
    }
    part.parse()
        .map_err(|_| Error::InvalidVersion(spec.to_string()))
}

impl FromStr for HttpVersion {
    type Err = Error;

    /// Parses `HTTP/<int>.<int>`: exactly one `/`, exactly one `.` after it,
    /// and nothing but ASCII digits on either side of the point.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidVersion(s.to_string());

        let mut parts = s.split('/');
        let (protocol, number) = match (parts.next(), parts.next(), parts.next()) {
            (Some(protocol), Some(number), None) => (protocol, number),
            _ => return Err(invalid()),
        };
        if protocol != "HTTP" {
            return Err(invalid());
        }

        let mut numbers = number.split('.');
        match (numbers.next(), numbers.next(), numbers.next()) {
            (Some(major), Some(minor), None) => Ok(HttpVersion::new(
                version_part(major, s)?,
                version_part(minor, s)?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}
