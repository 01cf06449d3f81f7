//! A small concurrent HTTP/1.1 static-file server.
//!
//! microserve answers `GET` requests with files from a document root. It keeps
//! connections alive when the client asks for it, runs every connection on
//! its own task, and closes connections that stay idle past a fixed timeout.
//!
//! # Features
//!
//! - Strict request-head parsing with distinct errors for malformed requests,
//!   unsupported verbs, and end of stream
//! - Keep-alive negotiation from the HTTP version and `Connection` header
//! - Paths resolved under the document root, before and after symlinks, so no
//!   request can escape it
//! - In-memory caching of files up to 1 MiB; larger files are streamed
//! - Idle-connection pruning on a single serial lane
//!
//! # Examples
//!
//! ## Parsing a request
//!
//! ```
//! use microserve::{parse_request, HttpVersion};
//!
//! let request_bytes = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! let request = parse_request(request_bytes, "127.0.0.1").unwrap();
//!
//! assert_eq!(request.resource, "/index.html");
//! assert_eq!(request.version, HttpVersion::HTTP_1_1);
//! assert_eq!(request.get_header("Host").unwrap(), "example.com");
//! assert!(request.keep_alive());
//! ```
//!
//! ## Error handling
//!
//! ```
//! use microserve::{parse_request, ParserError};
//!
//! let invalid_request = b"POST /upload HTTP/1.1\r\n\r\n";
//!
//! match parse_request(invalid_request, "127.0.0.1") {
//!     Ok(_) => println!("Request parsed successfully"),
//!     Err(err @ ParserError::UnsupportedMethod(_)) => assert_eq!(err.status(), Some(501)),
//!     Err(err) => println!("Other error: {}", err),
//! }
//! ```
//!
//! ## Serving a directory
//!
//! ```no_run
//! use microserve::{AccessLog, HttpServer, ServerConfig};
//!
//! # async fn run() -> Result<(), microserve::ServerError> {
//! let mut config = ServerConfig::new("/srv/www");
//! config.port = Some(8080);
//! config.directory_default_document = Some("index.html".to_string());
//!
//! let server = HttpServer::new(config, AccessLog::new())?;
//! server.start().await
//! # }
//! ```

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{parse_request, read_request, Error as ParserError, HttpRequest, HttpVersion, Method};
pub use server::{
    AccessLog, ConnectionHandler, ConnectionState, Error as ServerError, HttpError, HttpServer, PruningLane,
    ResourceResolver, ServerConfig, StatusCode,
};
