use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::http::connection::{Connection, ConnectionLimits, Site};
use crate::http::resolver::PathResolver;
use crate::storage::{DocumentStore, LocalFs};

/// Bound listener plus everything connections need.
pub struct Server<S = LocalFs> {
    listener: TcpListener,
    site: Arc<Site<S>>,
    connections: Arc<Semaphore>,
}

impl<S: DocumentStore> Server<S> {
    /// Validate configuration, check the document root and start listening.
    ///
    /// Every failure here is a startup failure.
    pub async fn bind(cfg: &Config, store: S) -> anyhow::Result<Self> {
        cfg.validate()?;

        let root = &cfg.static_files.root;
        let meta = tokio::fs::metadata(root)
            .await
            .with_context(|| format!("Document root {} is not accessible", root.display()))?;
        if !meta.is_dir() {
            anyhow::bail!("Document root {} is not a directory", root.display());
        }

        let resolver = PathResolver::new(root, cfg.static_files.index.clone())
            .context("Failed to resolve document root")?;

        let addr = tokio::net::lookup_host(cfg.server.listen_addr())
            .await
            .with_context(|| format!("Failed to resolve {}", cfg.server.listen_addr()))?
            .next()
            .with_context(|| format!("No address for {}", cfg.server.listen_addr()))?;

        let listener = listen(addr, cfg.server.backlog)
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!(
            addr = %listener.local_addr()?,
            root = %resolver.root().display(),
            "Listening"
        );

        Ok(Self {
            listener,
            site: Arc::new(Site {
                resolver,
                store,
                limits: ConnectionLimits::from_config(cfg),
            }),
            connections: Arc::new(Semaphore::new(cfg.server.max_connections)),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept forever, one task per connection.
    ///
    /// A permit is taken before each accept, so at most `max_connections`
    /// connections are served at once; further clients wait in the backlog.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            let permit = self
                .connections
                .clone()
                .acquire_owned()
                .await
                .context("Connection limiter closed")?;

            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    continue;
                }
            };
            info!("Accepted connection from {}", peer);

            let site = self.site.clone();
            tokio::spawn(async move {
                let conn = Connection::new(socket, peer, site);
                if let Err(e) = conn.run().await {
                    error!("Connection error from {}: {:#}", peer, e);
                }
                drop(permit);
            });
        }
    }
}

fn listen(addr: SocketAddr, backlog: u32) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}

/// Serve the local filesystem with the given configuration.
pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    Server::bind(cfg, LocalFs).await?.run().await
}
