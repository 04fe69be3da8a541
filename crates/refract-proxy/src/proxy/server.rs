//! ProxyServer struct and main run loop.
//!
//! Each accepted connection is served on its own task. The filter is shared
//! read-only across every task through an `Arc`.

use super::client::{create_http_client, HttpClient};
use super::forwarding::proxy_request;
use super::tls::create_tls_acceptor;
use crate::config::{Config, Protocol};
use crate::filter::Filter;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{error, info};

/// The main proxy server struct.
pub struct ProxyServer {
    port: u16,
    filter: Arc<Filter>,
    http_client: HttpClient,
    tls_acceptor: Option<TlsAcceptor>,
}

impl ProxyServer {
    /// Create a new ProxyServer from configuration.
    pub fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let filter = Filter::from_config(config)?;

        let tls_acceptor = if config.listen.protocol == Protocol::Https {
            let tls_config =
                config.listen.tls.as_ref().ok_or_else(|| {
                    anyhow::anyhow!("TLS configuration required for HTTPS listener")
                })?;
            Some(create_tls_acceptor(
                &tls_config.cert_path,
                &tls_config.key_path,
            )?)
        } else {
            None
        };

        Ok(Self::with_filter(config, filter, tls_acceptor))
    }

    /// Create a server around an already built filter.
    pub fn with_filter(config: &Config, filter: Filter, tls_acceptor: Option<TlsAcceptor>) -> Self {
        Self {
            port: config.listen.port,
            filter: Arc::new(filter),
            http_client: create_http_client(&config.connection_pool),
            tls_acceptor,
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Bind the configured port on all interfaces and serve until the task is dropped.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Accept connections from `listener` forever.
    pub async fn serve(self, listener: TcpListener) -> Result<(), anyhow::Error> {
        let protocol = if self.tls_acceptor.is_some() {
            Protocol::Https
        } else {
            Protocol::Http
        };
        info!("Listening on {}://{}", protocol.as_str(), listener.local_addr()?);
        info!("Proxying to {}", self.filter.upstream_url());

        let server = Arc::new(self);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let server = Arc::clone(&server);

            tokio::spawn(async move {
                match server.tls_acceptor.clone() {
                    Some(acceptor) => match acceptor.accept(stream).await {
                        Ok(tls_stream) => {
                            Self::serve_connection(server, tls_stream, remote_addr).await
                        }
                        Err(err) => {
                            error!("TLS handshake failed from {}: {}", remote_addr, err);
                        }
                    },
                    None => Self::serve_connection(server, stream, remote_addr).await,
                }
            });
        }
    }

    async fn serve_connection<I>(server: Arc<Self>, io: I, remote_addr: SocketAddr)
    where
        I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let service = service_fn(move |req| {
            let server = Arc::clone(&server);
            async move {
                Ok::<_, Infallible>(
                    proxy_request(&server.filter, &server.http_client, req, remote_addr).await,
                )
            }
        });

        if let Err(err) = http1::Builder::new()
            .serve_connection(TokioIo::new(io), service)
            .await
        {
            error!("Error serving connection from {}: {}", remote_addr, err);
        }
    }
}
