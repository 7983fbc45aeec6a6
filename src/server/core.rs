use log::{error, info, warn};
use serde_json::Value;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::client::{ClientRegistry, handle_client};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::error::handlers::SERVER_ERROR;
use crate::middleware::logging::log_connection;
use crate::protocol::responses::{Response, encode};
use crate::storage::{FileStore, LockRegistry, PathResolver};

pub struct Server {
    client_registry: Arc<Mutex<ClientRegistry>>,
    store: Arc<FileStore>,
    listener: TcpListener,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Prepares the root directory, builds the file store and binds the listener.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let root = config.root_path();
        if let Err(e) = std::fs::create_dir_all(&root) {
            warn!("Failed to create root directory {}: {e}", root.display());
        }

        let resolver = PathResolver::new(&root)?;
        info!("Root directory: {}", resolver.root().display());

        let store = FileStore::new(
            resolver,
            Arc::new(LockRegistry::new()),
            config.lock_timeout(),
        );

        let listener = TcpListener::bind(config.socket_address()).await?;
        info!("Server bound to {}", listener.local_addr()?);

        Ok(Self {
            client_registry: Arc::new(Mutex::new(ClientRegistry::new(config.max_clients))),
            store: Arc::new(store),
            listener,
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, one task per client.
    pub async fn start(&self) {
        info!(
            "Starting RAX file server on {} (max {} clients)",
            self.config.socket_address(),
            self.config.max_clients
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let client_registry = Arc::clone(&self.client_registry);
                    let store = Arc::clone(&self.store);
                    let config = Arc::clone(&self.config);

                    // Spawn a task for each client so accept loop doesn't block
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_new_client(stream, addr, client_registry, store, config).await
                        {
                            warn!("Failed to handle client {addr}: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }
    }
}

/// Registers a new client, refusing it when the server is full, then runs its session.
async fn handle_new_client(
    mut stream: TcpStream,
    client_addr: SocketAddr,
    client_registry: Arc<Mutex<ClientRegistry>>,
    store: Arc<FileStore>,
    config: Arc<ServerConfig>,
) -> Result<(), io::Error> {
    {
        let mut clients = client_registry.lock().await;
        if !clients.try_insert(client_addr) {
            drop(clients);
            warn!("Refusing {client_addr}: too many connections");
            let refusal = Response::failure(
                Value::Null,
                SERVER_ERROR,
                "Too many connections. Try again later.",
            );
            let mut line = encode(&refusal);
            line.push('\n');
            stream.write_all(line.as_bytes()).await?;
            stream.shutdown().await?;
            return Ok(());
        }
        log_connection(&client_addr, clients.len(), clients.max_clients());
    }

    handle_client(stream, client_addr, client_registry, store, config).await;
    Ok(())
}
