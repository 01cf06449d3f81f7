//! HTTP server implementation for microserve.
//!
//! This module serves files from a document root over HTTP/1.1 with
//! keep-alive, one task per connection, and a single pruning lane that closes
//! connections left idle past the configured timeout.

mod response;
mod config;
mod error;
mod handler;
mod http_server;
mod liveness;
mod access_log;
mod resource;

// Re-export public items
pub use response::{render_error_page, ResponseHead, StatusCode};
pub use config::{configuration_file, is_config_file, ServerConfig, CONFIG_EXTENSIONS, DEFAULT_PORT, SERVER_NAME};
pub use error::{Error, HttpError};
pub use handler::ConnectionHandler;
pub use http_server::HttpServer;
pub use liveness::{next_connection_id, CheckOutcome, ConnectionId, ConnectionState, PruningLane};
pub use access_log::{AccessLog, ACCESS_TARGET};
pub use resource::{is_within, Resource, ResourceCache, ResourceResolver, Segments, CACHE_LIMIT, SEGMENT_SIZE};
