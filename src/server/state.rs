use crate::{fetcher::OriginFetcher, url_codec::ProxyUrlCodec};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Application state shared across all handlers.
///
/// Everything here is read-only for the lifetime of one listening session;
/// requests share no mutable state.
#[derive(Clone)]
pub struct AppState {
    /// Origin/proxy URL mapping, bound to the actual listening port
    pub codec: Arc<ProxyUrlCodec>,
    /// Origin fetcher, shared for connection pooling
    pub fetcher: Arc<dyn OriginFetcher>,
    /// Cancelled when the proxy stops; in-flight requests abandon their response
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(codec: ProxyUrlCodec, fetcher: Arc<dyn OriginFetcher>) -> Self {
        Self {
            codec: Arc::new(codec),
            fetcher,
            shutdown: CancellationToken::new(),
        }
    }
}
