//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// Characters that may not appear in a header name (RFC 2616, section 2.2).
const TOKEN_SEPARATORS: &[char] = &[
    '(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=', '{', '}', ' ',
    '\t',
];

/// Upper bound on the size of a request head, blank line included.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Represents a parsed HTTP request head.
///
/// Requests are immutable once parsed. The method is always one of
/// [`Method::IMPLEMENTED`], the resource always starts with `/`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (always an implemented one)
    pub method: Method,
    /// The resource exactly as received, still percent-encoded
    pub resource: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// Headers keyed by lowercase name; repeated headers are comma-joined
    pub headers: HashMap<String, String>,
    /// Address of the peer that sent the request
    pub client: String,
    /// The raw request line, kept for logging
    pub request_line: String,
}

impl HttpRequest {
    /// Create a new HTTP request.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `resource` - The request target, as received
    /// * `version` - The HTTP version
    /// * `headers` - The HTTP headers, keyed by lowercase name
    ///
    /// # Returns
    ///
    /// A new HTTP request with an empty client address and a request line
    /// rebuilt from its parts
    pub fn new(
        method: Method,
        resource: String,
        version: HttpVersion,
        headers: HashMap<String, String>,
    ) -> Self {
        let request_line = format!("{method} {resource} {version}");
        Self {
            method,
            resource,
            version,
            headers,
            client: String::new(),
            request_line,
        }
    }

    /// Gets a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_ascii_lowercase())
    }

    /// Checks if the request has a specific header (case-insensitive).
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    /// The percent-decoded filesystem path named by the resource.
    ///
    /// Anything from the first `?` on is a query string and is not part of
    /// the path.
    pub fn path(&self) -> Result<String, Error> {
        let raw = self
            .resource
            .split_once('?')
            .map_or(self.resource.as_str(), |(path, _)| path);
        urlencoding::decode(raw)
            .map(|decoded| decoded.into_owned())
            .map_err(|_| Error::InvalidEncoding)
    }

    /// The value of the `Connection` header, if present.
    pub fn connection_type(&self) -> Option<&str> {
        self.get_header("connection").map(String::as_str)
    }

    /// Whether the connection should stay open after this request.
    ///
    /// An explicit `Connection: keep-alive` or `Connection: close` wins
    /// (compared case-insensitively). Otherwise HTTP/1.1 and later default to
    /// keep-alive and older versions to close.
    pub fn keep_alive(&self) -> bool {
        match self.connection_type() {
            Some(c) if c.eq_ignore_ascii_case("keep-alive") => true,
            Some(c) if c.eq_ignore_ascii_case("close") => false,
            _ => self.version >= HttpVersion::HTTP_1_1,
        }
    }
}

/// Parse an HTTP request head.
///
/// # Arguments
///
/// * `input` - A complete request head: CRLF-terminated lines ending with an
///   empty line (the blank line itself may be omitted)
/// * `client` - The peer address, recorded on the request for logging
///
/// # Returns
///
/// The parsed HTTP request, or an error if the head is invalid
pub fn parse_request(input: &[u8], client: &str) -> Result<HttpRequest, Error> {
    let text = std::str::from_utf8(input).map_err(|_| Error::InvalidEncoding)?;

    let mut lines = text.split("\r\n");
    let request_line = match lines.next() {
        Some(line) if !line.is_empty() => line,
        _ => return Err(Error::MalformedRequestLine(String::new())),
    };

    // Split on single spaces exactly, so doubled spaces yield empty tokens.
    let parts: Vec<&str> = request_line.split(' ').collect();
    let [verb, resource, version_spec] = parts.as_slice() else {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    };

    let method = Method::from_str(verb)?;

    if !resource.starts_with('/') {
        return Err(Error::InvalidPath(resource.to_string()));
    }

    let version = HttpVersion::from_str(version_spec)?;

    let mut headers: HashMap<String, String> = HashMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }

        // Only the first colon separates; values may contain more.
        let Some((name, value)) = line.split_once(':') else {
            return Err(Error::InvalidHeaderFormat(line.to_string()));
        };

        let name = name.to_ascii_lowercase();
        if name.contains(TOKEN_SEPARATORS) {
            return Err(Error::InvalidHeaderName(name));
        }
        let value = value.trim();

        headers
            .entry(name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    Ok(HttpRequest {
        method,
        resource: resource.to_string(),
        version,
        headers,
        client: client.to_string(),
        request_line: request_line.to_string(),
    })
}

/// Read the raw bytes of one request head from `reader`, blank line included.
///
/// Lines are delimited by CRLF; a bare LF does not end a line. Reading stops
/// at the first empty line. Never more than [`MAX_HEAD_BYTES`] + 1 bytes are
/// taken from the reader; past that the head is rejected with
/// [`Error::HeadTooLarge`], even if no line feed ever arrives. If the stream
/// ends before the blank line, the result is [`Error::EndOfStream`], which
/// means "no more requests on this connection" rather than a protocol
/// violation.
pub async fn read_head<R>(reader: &mut R) -> Result<Vec<u8>, Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut head: Vec<u8> = Vec::new();
    let mut line_start = 0;

    loop {
        let budget = (MAX_HEAD_BYTES + 1 - head.len()) as u64;
        let n = (&mut *reader).take(budget).read_until(b'\n', &mut head).await?;
        if n == 0 {
            return Err(Error::EndOfStream);
        }
        if head.len() > MAX_HEAD_BYTES {
            return Err(Error::HeadTooLarge(MAX_HEAD_BYTES));
        }
        if !head.ends_with(b"\r\n") {
            // Bare LF or a partial line, keep accumulating.
            continue;
        }

        let line = &head[line_start..head.len() - 2];
        if line.is_empty() {
            return Ok(head);
        }
        line_start = head.len();
    }
}

/// Read exactly one request head from `reader` and parse it.
///
/// See [`read_head`] for how the head is delimited and bounded.
pub async fn read_request<R>(reader: &mut R, client: &str) -> Result<HttpRequest, Error>
where
    R: AsyncBufRead + Unpin,
{
    let head = read_head(reader).await?;
    parse_request(&head, client)
}

/// The request line of a raw head, if it has a non-empty one.
///
/// Used to name a request in logs when the head as a whole failed to parse.
pub fn request_line_of(head: &[u8]) -> Option<String> {
    let end = head
        .windows(2)
        .position(|pair| pair == b"\r\n")
        .unwrap_or(head.len());
    let line = String::from_utf8_lossy(&head[..end]);
    (!line.is_empty()).then(|| line.into_owned())
}
