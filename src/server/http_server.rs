//! Connection acceptor and dispatcher.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use log::{debug, error};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::task::JoinSet;

use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::handler::ConnectionHandler;
use crate::server::liveness::{next_connection_id, ConnectionId, ConnectionState, PruningLane};
use crate::server::access_log::AccessLog;
use crate::server::resource::ResourceResolver;

/// An HTTP server.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    handler: Arc<ConnectionHandler>,
    log: AccessLog,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails if the document root cannot be canonicalized.
    pub fn new(config: ServerConfig, log: AccessLog) -> Result<Self, Error> {
        let resolver = ResourceResolver::new(&config)?;
        let handler = Arc::new(ConnectionHandler::new(resolver, log.clone()));
        Ok(Self { config, handler, log })
    }

    /// Bind the listening socket on the configured port, all interfaces.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let port = self.config.port();
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

        match TcpListener::bind(addr).await {
            Ok(listener) => {
                self.log.status(&format!("Server up on {port}"));
                Ok(listener)
            }
            Err(source) => {
                if source.kind() == io::ErrorKind::PermissionDenied {
                    self.log.error(&format!("Permission denied for port {port}: {source}"), None);
                } else {
                    self.log.error(&format!("Could not listen on port {port}: {source}"), None);
                }
                Err(Error::Bind { port, source })
            }
        }
    }

    /// Resolves when Ctrl+C is received.
    async fn ctrl_c() {
        match signal::ctrl_c().await {
            Ok(()) => debug!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => {
                error!("Error setting up Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    }

    /// Bind the configured port and serve until Ctrl+C.
    pub async fn start(&self) -> Result<(), Error> {
        let listener = self.setup_listener().await?;
        self.serve(listener, Self::ctrl_c()).await
    }

    /// Accept and dispatch connections on `listener` until `shutdown` resolves.
    ///
    /// Each connection gets the next id, a [`ConnectionState`], a task running
    /// its protocol loop, and a first liveness check on the pruning lane. A
    /// failing connection never stops the loop. On the way out the listener is
    /// closed and every connection task is aborted.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let (lane, lane_worker) = PruningLane::spawn();
        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut connection_id: ConnectionId = 0;

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    self.log.status("Shutting down server...");
                    break;
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            self.log.error(&format!("Connection task panicked: {e}"), None);
                        }
                    }
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            connection_id = next_connection_id(connection_id);
                            self.dispatch(socket, addr, connection_id, &lane, &mut tasks);
                        }
                        Err(e) => {
                            self.log.warning(&format!("Error accepting connection: {e}"));
                            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                        }
                    }
                }
            }
        }

        drop(listener);
        debug!("Stopping {} active connections.", tasks.len());
        tasks.shutdown().await;
        lane_worker.abort();
        self.log.status("Server gracefully down.");

        Ok(())
    }

    fn dispatch(
        &self,
        socket: TcpStream,
        addr: SocketAddr,
        id: ConnectionId,
        lane: &PruningLane,
        tasks: &mut JoinSet<()>,
    ) {
        debug!("Accepted connection {id} from {addr}");

        let connection = Arc::new(ConnectionState::new(id, self.config.idle_timeout()));
        let handler = Arc::clone(&self.handler);
        let task_connection = Arc::clone(&connection);
        let client = addr.ip().to_string();

        let handle = tasks.spawn(async move {
            handler.process(socket, client, task_connection).await;
        });

        connection.bind_task(handle);
        lane.schedule(connection);
    }
}
