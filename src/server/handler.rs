//! The per-connection protocol loop.

use std::sync::Arc;

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};

use crate::parser::{parse_request, read_head, HttpRequest};
use crate::server::config::SERVER_NAME;
use crate::server::error::{Error, HttpError};
use crate::server::liveness::ConnectionState;
use crate::server::access_log::AccessLog;
use crate::server::resource::{Resource, ResourceResolver};
use crate::server::response::{render_error_page, ResponseHead, StatusCode};

/// Serves requests on accepted connections.
///
/// One handler is built at startup and shared by every connection task.
pub struct ConnectionHandler {
    resolver: ResourceResolver,
    log: AccessLog,
}

impl ConnectionHandler {
    pub fn new(resolver: ResourceResolver, log: AccessLog) -> Self {
        Self { resolver, log }
    }

    /// Handle a connection from its first request to its closure.
    ///
    /// Requests are answered one after another for as long as the client asks
    /// for keep-alive. The loop ends on end-of-stream, on a transport failure,
    /// after answering an HTTP error, or when the pruning lane closes the
    /// connection. The socket is always shut down on the way out, and no error
    /// escapes to the caller.
    pub async fn process<S>(&self, socket: S, client: String, connection: Arc<ConnectionState>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let id = connection.id();
        let mut stream = BufStream::new(socket);

        let outcome = tokio::select! {
            res = self.serve(&mut stream, &client, &connection) => res,
            _ = connection.closed() => Err(Error::Transport(connection.pruned_error())),
        };

        match outcome {
            Ok(()) => debug!("Connection {id} finished explicitly."),
            Err(Error::Http(err)) => {
                tokio::select! {
                    _ = self.write_error(&mut stream, &client, &err) => {}
                    _ = connection.closed() => {}
                }
                debug!("HTTP error {} on connection {id}.", err.status);
            }
            Err(Error::EndOfStream) => debug!("Connection {id} reached end of stream."),
            Err(Error::Transport(e)) => debug!("Transport failure on connection {id}: {e}"),
            Err(other) => self.log.error(&other.to_string(), Some(&client)),
        }

        if !connection.is_closed() {
            tokio::select! {
                _ = stream.shutdown() => {}
                _ = connection.closed() => {}
            }
        }
        self.log.debug(&format!("Socket closed for connection {id}."));
    }

    async fn serve<S>(
        &self,
        stream: &mut BufStream<S>,
        client: &str,
        connection: &ConnectionState,
    ) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            connection.bump_access();
            let head = read_head(stream).await?;
            let request =
                parse_request(&head, client).map_err(|err| Error::from_rejected_head(err, &head))?;

            connection.bump_access();
            let resource = self.resolver.resolve(&request).await?;

            connection.bump_access();
            self.respond(stream, &request, &resource, connection).await?;

            self.log.transfer(client, &request.request_line, StatusCode::OK.as_u16(), resource.size());
            debug!("Transfer of {} done on connection {}.", request.resource, connection.id());

            if !request.keep_alive() {
                return Ok(());
            }
        }
    }

    async fn respond<S>(
        &self,
        stream: &mut BufStream<S>,
        request: &HttpRequest,
        resource: &Resource,
        connection: &ConnectionState,
    ) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // Fetch content before the head goes out so a failed populate still
        // gets a proper error response.
        let mut segments = resource.segments().await.map_err(|e| {
            self.log.error(
                &format!("Could not read {}: {e}", resource.path().display()),
                Some(&request.client),
            );
            HttpError::for_request(StatusCode::INTERNAL_SERVER_ERROR, request)
        })?;

        let content_type = mime_guess::from_path(resource.path()).first_raw();
        let head = ResponseHead::new(StatusCode::OK, SERVER_NAME)
            .with_content_type(content_type)
            .with_date()
            .with_content_length(resource.size())
            .with_header("Connection", "keep-alive");

        stream.write_all(&head.to_bytes()).await.map_err(Error::Transport)?;

        loop {
            let chunk = segments.next().await.map_err(|source| Error::Resource {
                path: resource.path().to_path_buf(),
                source,
            })?;
            let Some(chunk) = chunk else { break };

            stream.write_all(&chunk).await.map_err(Error::Transport)?;
            connection.bump_access();
        }

        stream.flush().await.map_err(Error::Transport)
    }

    /// Write a complete error response. Failures are logged, never returned.
    async fn write_error<S>(&self, stream: &mut BufStream<S>, client: &str, err: &HttpError)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let page = render_error_page(err, SERVER_NAME);
        self.log.transfer_error(client, err, page.len());

        let head = ResponseHead::new(err.status, SERVER_NAME)
            .with_content_type(Some("text/html"))
            .with_date()
            .with_content_length(page.len() as u64)
            .with_header("Connection", "close");

        let written = async {
            stream.write_all(&head.to_bytes()).await?;
            stream.write_all(page.as_bytes()).await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = written {
            debug!("Could not write {} response to {client}: {e}", err.status);
        }
    }
}
