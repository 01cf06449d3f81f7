//! Server log sinks.

use log::{debug, error, info, warn};

use crate::server::error::HttpError;

/// Log target for transfer lines, so they can be filtered apart from the rest.
pub const ACCESS_TARGET: &str = "microserve::access";

/// The server's log sinks.
///
/// One instance is created at startup and handed to whatever needs it.
/// Everything goes through the `log` facade; where it ends up is decided by
/// whichever logger the binary installs.
#[derive(Debug, Clone, Default)]
pub struct AccessLog;

impl AccessLog {
    pub fn new() -> Self {
        Self
    }

    /// A completed transfer.
    pub fn transfer(&self, client: &str, request_line: &str, status: u16, bytes: u64) {
        info!(target: ACCESS_TARGET, "{client} \"{request_line}\" {status} {bytes}");
    }

    /// A transfer answered with an error page of `bytes` bytes.
    pub fn transfer_error(&self, client: &str, err: &HttpError, bytes: usize) {
        let status = err.status.as_u16();
        match &err.request_line {
            Some(request_line) => {
                info!(target: ACCESS_TARGET, "{client} \"{request_line}\" {status} {bytes}")
            }
            None => info!(target: ACCESS_TARGET, "{client} unspecified-request {status} {bytes}"),
        }
    }

    /// A server-level status change.
    pub fn status(&self, msg: &str) {
        info!("Status: {msg}");
    }

    pub fn error(&self, msg: &str, client: Option<&str>) {
        match client {
            Some(addr) => error!("Error {addr}: {msg}"),
            None => error!("Error: {msg}"),
        }
    }

    pub fn warning(&self, msg: &str) {
        warn!("Warning: {msg}");
    }

    pub fn debug(&self, msg: &str) {
        debug!("Debug: {msg}");
    }
}
