use crate::{
    error::{ProxyError, Result},
    fetcher::FetchedItem,
    hls::rewrite_manifest,
    metrics,
    server::state::AppState,
    url_codec::OriginReference,
};
use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{debug, info};

/// How a decoded request is served.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Fetch, rewrite every reference, respond.
    Manifest,
    /// Fetch and respond with the origin bytes untouched.
    PassThrough,
}

impl Route {
    pub fn classify(origin: &OriginReference) -> Self {
        if origin.format.is_manifest() {
            Route::Manifest
        } else {
            Route::PassThrough
        }
    }

    fn metric_kind(self) -> &'static str {
        match self {
            Route::Manifest => "manifest",
            Route::PassThrough => "segment",
        }
    }
}

/// Proxy a manifest or media request to its origin.
///
/// An undecodable or non-media target is rejected with 400 before any fetch.
/// Fetch and rewrite failures become 500; nothing is retried.
pub async fn serve_proxy(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let start = Instant::now();

    let origin = state.codec.decode(query.as_deref()).inspect_err(|_| {
        metrics::record_request("invalid", 400);
    })?;

    let route = Route::classify(&origin);
    info!("Proxying {:?} request for {}", route, origin.url);

    let result = tokio::select! {
        biased;
        _ = state.shutdown.cancelled() => Err(ProxyError::ShuttingDown),
        result = respond(&state, &origin, route) => result,
    };

    let status = match &result {
        Ok(response) => response.status().as_u16(),
        Err(e) => e.status_code().as_u16(),
    };
    if matches!(result, Err(ProxyError::OriginFetch(_))) {
        metrics::record_origin_error();
    }
    metrics::record_request(route.metric_kind(), status);
    metrics::record_duration(route.metric_kind(), start);

    result
}

async fn respond(state: &AppState, origin: &OriginReference, route: Route) -> Result<Response> {
    let FetchedItem {
        body,
        mime_type,
        url: resolved,
    } = state.fetcher.fetch(&origin.url).await?;

    match route {
        Route::Manifest => {
            // Relative references resolve against the requested URL, even after a redirect
            if resolved != origin.url {
                debug!(
                    "Manifest {} redirected to {}; resolving against the requested URL",
                    origin.url, resolved
                );
            }

            let rewritten = rewrite_manifest(&body, &origin.url, &state.codec)?;
            Ok(media_response(&mime_type, Body::from(rewritten)))
        }
        Route::PassThrough => {
            debug!("Passing through {} bytes from {}", body.len(), resolved);
            Ok(media_response(&mime_type, Body::from(body)))
        }
    }
}

fn media_response(mime_type: &str, body: Body) -> Response {
    ([(header::CONTENT_TYPE, mime_type)], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url_codec::MediaFormat;
    use url::Url;

    fn reference(url: &str) -> OriginReference {
        let url = Url::parse(url).unwrap();
        let format = MediaFormat::from_url(&url).unwrap();
        OriginReference { url, format }
    }

    #[test]
    fn m3u8_routes_to_manifest() {
        assert_eq!(
            Route::classify(&reference("https://example.com/live/index.m3u8")),
            Route::Manifest
        );
    }

    #[test]
    fn media_routes_to_pass_through() {
        for ext in ["ts", "mp4", "m4s", "m4a", "m4v"] {
            let origin = reference(&format!("https://example.com/live/chunk.{ext}"));
            assert_eq!(Route::classify(&origin), Route::PassThrough);
        }
    }
}
