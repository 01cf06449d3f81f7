//! HTTP parser module.
//!
//! This module turns the bytes of an HTTP/1.x request head into an
//! [`HttpRequest`], validating the verb, the resource and the version, and
//! folding repeated headers together.

mod request;
mod method;
mod version;
mod error;
mod tests;

// Re-export public items
pub use request::{HttpRequest, MAX_HEAD_BYTES};
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;

// Re-export the parsing entry points
pub use request::{parse_request, read_head, read_request, request_line_of};
