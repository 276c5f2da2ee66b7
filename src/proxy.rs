//! Proxy lifecycle: owns the listening socket and the fetch client.

use crate::{
    config::Config,
    error::Result,
    fetcher::{FetchError, HttpFetcher, OriginFetcher},
    server::{build_router, state::AppState},
    url_codec::{ProxyConfig, ProxyUrlCodec},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use url::Url;

struct Listening {
    addr: SocketAddr,
    codec: ProxyUrlCodec,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

/// A local HLS reverse proxy.
///
/// [`start`](Self::start) and [`stop`](Self::stop) are idempotent, and
/// dropping the proxy stops it.
pub struct HlsProxy {
    config: Config,
    fetcher: Arc<dyn OriginFetcher>,
    listening: Option<Listening>,
}

impl HlsProxy {
    /// Create a proxy that fetches from origins over HTTP.
    pub fn new(config: Config) -> std::result::Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(config.origin_timeout)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(config: Config, fetcher: Arc<dyn OriginFetcher>) -> Self {
        Self {
            config,
            fetcher,
            listening: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.listening
            .as_ref()
            .is_some_and(|listening| !listening.task.is_finished())
    }

    /// Address the proxy is bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listening
            .as_ref()
            .filter(|_| self.is_running())
            .map(|listening| listening.addr)
    }

    /// Bind the configured address and start serving.
    ///
    /// Returns the bound address. A no-op when already running.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(listening) = &self.listening
            && !listening.task.is_finished()
        {
            return Ok(listening.addr);
        }

        let bind_addr = self.config.listen_addr();
        let listener = TcpListener::bind(bind_addr).await.inspect_err(|e| {
            error!("Failed to bind to address {}: {}", bind_addr, e);
        })?;
        let addr = listener.local_addr()?;

        // Proxy URLs must carry the real port when the config asked for port 0
        let codec = ProxyUrlCodec::new(ProxyConfig {
            port: addr.port(),
            ..self.config.proxy_config()
        });

        let state = AppState::new(codec.clone(), self.fetcher.clone());
        let shutdown = state.shutdown.clone();
        let app = build_router(state);

        let signal = shutdown.clone().cancelled_owned();
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await
            {
                error!("Server error: {}", e);
            }
        });

        info!("HLS proxy listening on http://{}", addr);

        self.listening = Some(Listening {
            addr,
            codec,
            shutdown,
            task,
        });

        Ok(addr)
    }

    /// Stop accepting requests and release the port. A no-op when stopped.
    ///
    /// Does not wait for in-flight requests; they observe the shutdown and
    /// answer 503 instead of finishing their origin fetch.
    pub fn stop(&mut self) {
        let Some(listening) = self.listening.take() else {
            return;
        };

        listening.shutdown.cancel();
        info!("HLS proxy on {} stopped", listening.addr);
    }

    /// Local URL a player should open to play `origin` through this proxy.
    pub fn reverse_proxy_url(&self, origin: &Url) -> Result<Url> {
        match &self.listening {
            Some(listening) => listening.codec.encode(origin),
            None => ProxyUrlCodec::new(self.config.proxy_config()).encode(origin),
        }
    }
}

impl Drop for HlsProxy {
    fn drop(&mut self) {
        self.stop();
    }
}
