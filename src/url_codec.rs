//! Mapping between origin URLs and local proxy URLs.
//!
//! The whole origin URL travels percent-encoded in a single reserved query
//! parameter, so the proxy never has to interpret the request path.

use crate::error::{ProxyError, Result};
use std::fmt;
use url::Url;

/// Reserved query parameter carrying the percent-encoded origin URL.
pub const ORIGIN_URL_KEY: &str = "__hls_origin_url";

/// Host advertised in every proxy URL.
pub const PROXY_HOST: &str = "127.0.0.1";

/// Default local listening port.
pub const DEFAULT_PORT: u16 = 1234;

/// Media types the proxy agrees to fetch, keyed by path extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    M3u8,
    Ts,
    Mp4,
    M4s,
    M4a,
    M4v,
}

impl MediaFormat {
    pub const ALL: [MediaFormat; 6] = [
        MediaFormat::M3u8,
        MediaFormat::Ts,
        MediaFormat::Mp4,
        MediaFormat::M4s,
        MediaFormat::M4a,
        MediaFormat::M4v,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::M3u8 => "m3u8",
            MediaFormat::Ts => "ts",
            MediaFormat::Mp4 => "mp4",
            MediaFormat::M4s => "m4s",
            MediaFormat::M4a => "m4a",
            MediaFormat::M4v => "m4v",
        }
    }

    /// Exact, case-sensitive match against the allow-list.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.extension() == ext)
    }

    /// Classify a URL by the extension of its last path segment.
    pub fn from_url(url: &Url) -> Option<Self> {
        let file_name = url.path_segments()?.next_back()?;
        let (_, ext) = file_name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Playlists get rewritten; everything else is passed through.
    pub fn is_manifest(self) -> bool {
        self == MediaFormat::M3u8
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Construction-time proxy settings. Immutable for the lifetime of a proxy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyConfig {
    pub port: u16,
    pub origin_key: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            origin_key: ORIGIN_URL_KEY.to_string(),
        }
    }
}

/// A decoded, allow-listed origin target for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OriginReference {
    pub url: Url,
    pub format: MediaFormat,
}

/// Encodes origin URLs into proxy URLs and decodes incoming proxy queries.
#[derive(Clone, Debug)]
pub struct ProxyUrlCodec {
    config: ProxyConfig,
}

impl ProxyUrlCodec {
    pub fn new(config: ProxyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Build the local URL a player should request for `origin`.
    ///
    /// Scheme, host and port become `http://127.0.0.1:<port>`. The origin path
    /// and query are kept so players still see the media extension, and the
    /// full origin URL is appended as the reserved parameter.
    ///
    /// # Errors
    /// Returns [`ProxyError::Encode`] when `origin` is not an `http(s)` URL.
    pub fn encode(&self, origin: &Url) -> Result<Url> {
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ProxyError::Encode(format!(
                "Scheme '{}' cannot be proxied: {}",
                origin.scheme(),
                origin
            )));
        }

        let mut proxy = origin.clone();
        proxy.set_fragment(None);
        proxy
            .set_scheme("http")
            .map_err(|_| ProxyError::Encode(format!("Cannot switch scheme of {origin}")))?;
        proxy
            .set_username("")
            .and_then(|_| proxy.set_password(None))
            .map_err(|_| ProxyError::Encode(format!("Cannot strip credentials of {origin}")))?;
        proxy
            .set_host(Some(PROXY_HOST))
            .map_err(|e| ProxyError::Encode(format!("Cannot set proxy host: {e}")))?;
        proxy
            .set_port(Some(self.config.port))
            .map_err(|_| ProxyError::Encode(format!("Cannot set proxy port on {origin}")))?;

        let origin_param = format!(
            "{}={}",
            self.config.origin_key,
            urlencoding::encode(origin.as_str())
        );
        let query = match origin.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{origin_param}"),
            _ => origin_param,
        };
        proxy.set_query(Some(&query));

        Ok(proxy)
    }

    /// Recover the origin target from the raw query string of a local request.
    ///
    /// The last occurrence of the reserved key wins, since [`encode`](Self::encode)
    /// appends it after any query the origin URL already had.
    ///
    /// # Errors
    /// Returns [`ProxyError::InvalidRequest`] when the parameter is missing, is
    /// not valid percent-encoded UTF-8, does not parse as a URL, or names a
    /// resource whose extension is not allow-listed.
    pub fn decode(&self, query: Option<&str>) -> Result<OriginReference> {
        let key = self.config.origin_key.as_str();

        let encoded = query
            .into_iter()
            .flat_map(|q| q.split('&'))
            .filter_map(|pair| pair.split_once('='))
            .filter(|(name, _)| *name == key)
            .map(|(_, value)| value)
            .last()
            .ok_or_else(|| ProxyError::InvalidRequest(format!("Missing '{key}' parameter")))?;

        if has_malformed_escape(encoded) {
            return Err(ProxyError::InvalidRequest(format!(
                "Malformed percent escape in origin URL: {encoded}"
            )));
        }

        let decoded = urlencoding::decode(encoded)
            .map_err(|e| ProxyError::InvalidRequest(format!("Undecodable origin URL: {e}")))?;

        let url = Url::parse(&decoded).map_err(|e| {
            ProxyError::InvalidRequest(format!("Unparseable origin URL '{decoded}': {e}"))
        })?;

        let format = MediaFormat::from_url(&url).ok_or_else(|| {
            ProxyError::InvalidRequest(format!("Unsupported media extension: {url}"))
        })?;

        Ok(OriginReference { url, format })
    }
}

impl Default for ProxyUrlCodec {
    fn default() -> Self {
        Self::new(ProxyConfig::default())
    }
}

/// True when some `%` is not followed by two hex digits.
///
/// `urlencoding::decode` keeps such sequences verbatim instead of failing.
fn has_malformed_escape(encoded: &str) -> bool {
    let bytes = encoded.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    })
}
