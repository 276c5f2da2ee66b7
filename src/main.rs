use hls_proxy::{config::Config, metrics, proxy::HlsProxy};
use std::net::SocketAddr;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting HLS proxy");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(port) = config.metrics_port {
        let addr = SocketAddr::new(config.bind_addr, port);
        if let Err(e) = metrics::install_exporter(addr) {
            error!("Failed to start metrics exporter: {}", e);
            std::process::exit(1);
        }
        info!("Metrics available on http://{}/metrics", addr);
    }

    let mut proxy = match HlsProxy::new(config) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = proxy.start().await {
        error!("Failed to start proxy: {}", e);
        std::process::exit(1);
    }

    // Any arguments are origin URLs to print proxy URLs for
    for arg in std::env::args().skip(1) {
        let proxy_url = Url::parse(&arg)
            .map_err(|e| e.to_string())
            .and_then(|origin| proxy.reverse_proxy_url(&origin).map_err(|e| e.to_string()));

        match proxy_url {
            Ok(url) => info!("Play {} via {}", arg, url),
            Err(e) => warn!("Cannot proxy {}: {}", arg, e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down");
    proxy.stop();
}
