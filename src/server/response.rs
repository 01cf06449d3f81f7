//! HTTP response heads and the generic error page.

use std::fmt;
use std::time::SystemTime;

use crate::server::error::HttpError;

/// An HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    pub const NOT_IMPLEMENTED: StatusCode = StatusCode(501);

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Get the reason phrase for this status code.
    ///
    /// Codes outside the table read as "Unknown Status".
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            100 => "Continue",
            101 => "Switching Protocols",
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            203 => "Non-Authoritative Information",
            204 => "No Content",
            205 => "Reset Content",
            206 => "Partial Content",
            300 => "Multiple Choices",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            305 => "Use Proxy",
            307 => "Temporary Redirect",
            400 => "Bad Request",
            401 => "Unauthorized",
            402 => "Payment Required",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            406 => "Not Acceptable",
            407 => "Proxy Authentication Required",
            408 => "Request Time-out",
            409 => "Conflict",
            410 => "Gone",
            411 => "Length Required",
            412 => "Precondition Failed",
            413 => "Request Entity Too Large",
            414 => "Request-URI Too Large",
            415 => "Unsupported Media Type",
            416 => "Requested range not satisfiable",
            417 => "Expectation Failed",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Time-out",
            505 => "HTTP Version not supported",
            _ => "Unknown Status",
        }
    }

    /// A friendlier sentence shown on the error page, if there is one.
    ///
    /// `[[PATH]]` is replaced by the request path when rendered.
    pub fn extended_message(&self) -> Option<&'static str> {
        match self.0 {
            403 => Some("You are not allowed to look at [[PATH]]."),
            404 => Some("I looked everywhere, but I couldn't find [[PATH]]."),
            408 => Some("Request timed out. Please try again, and be quick about it."),
            500 => Some("Something went wrong on our end. Sorry for the trouble; please try again."),
            501 => Some("I don't know how to do that."),
            _ => None,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

/// The status line and headers of a response.
///
/// Headers are written in insertion order.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// The HTTP status code
    pub status: StatusCode,
    /// The HTTP headers, in the order they are written
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Create a response head carrying the `Server` header.
    pub fn new(status: StatusCode, server_name: &str) -> Self {
        Self {
            status,
            headers: vec![("Server".to_string(), server_name.to_string())],
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append `Content-Type` if one is known.
    pub fn with_content_type(self, content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) => self.with_header("Content-Type", ct),
            None => self,
        }
    }

    /// Append a `Date` header with the current time in HTTP-date format.
    pub fn with_date(self) -> Self {
        self.with_header("Date", httpdate::fmt_http_date(SystemTime::now()))
    }

    pub fn with_content_length(self, length: u64) -> Self {
        self.with_header("Content-Length", length.to_string())
    }

    /// Convert the head to bytes, blank line included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(256);

        let status_line = format!("HTTP/1.1 {} {}\r\n", self.status.as_u16(), self.status.reason_phrase());
        bytes.extend_from_slice(status_line.as_bytes());

        for (name, value) in &self.headers {
            let header_line = format!("{name}: {value}\r\n");
            bytes.extend_from_slice(header_line.as_bytes());
        }

        bytes.extend_from_slice(b"\r\n");
        bytes
    }
}

const ERROR_PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>

<head>
    <meta charset="UTF-8">
    <title>[[REASON]]</title>
</head>

<body>
    <h1>[[CODE]]: [[REASON]]</h1>
    <p>[[MESSAGE]]</p>
    <hr>
    <p style="color: #808080;">[[SERVER]]</p>
</body>

</html>
"#;

/// Render the generic HTML error page for `error`.
pub fn render_error_page(error: &HttpError, server_name: &str) -> String {
    let path = error
        .request
        .as_ref()
        .map(|req| escape_html(&req.path().unwrap_or_else(|_| req.resource.clone())))
        .unwrap_or_else(|| "the file".to_string());

    ERROR_PAGE_TEMPLATE
        .replace("[[CODE]]", &error.status.as_u16().to_string())
        .replace("[[REASON]]", error.status.reason_phrase())
        .replace("[[MESSAGE]]", error.status.extended_message().unwrap_or(""))
        .replace("[[SERVER]]", server_name)
        .replace("[[PATH]]", &path)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
