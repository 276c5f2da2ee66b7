//! Resolution of manifest references against the manifest's own URL.

use url::Url;

/// Resolve a manifest reference to an absolute origin URL.
///
/// - `http://` / `https://` references are used as-is.
/// - References starting with `/` keep the base's scheme, host and port.
/// - Anything else is appended to the base's directory; `.` and `..`
///   segments are normalised by the URL parser.
///
/// Returns `None` for a blank reference, when the base has no host to
/// resolve against, or when the combined text does not parse as a URL.
pub fn resolve_reference(reference: &str, base: &Url) -> Option<Url> {
    if reference.trim().is_empty() {
        return None;
    }

    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Url::parse(reference).ok();
    }

    let host = base.host_str()?;
    let authority = match base.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let path = if reference.starts_with('/') {
        reference.to_string()
    } else {
        let directory = base
            .path()
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or_default();
        format!("{directory}/{reference}")
    };

    Url::parse(&format!("{}://{}{}", base.scheme(), authority, path)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/videos/stream/playlist.m3u8").unwrap()
    }

    fn resolve(reference: &str) -> Option<String> {
        resolve_reference(reference, &base()).map(|u| u.to_string())
    }

    #[test]
    fn relative_reference_uses_manifest_directory() {
        assert_eq!(
            resolve("segment1.ts").as_deref(),
            Some("https://example.com/videos/stream/segment1.ts")
        );
        assert_eq!(
            resolve("720p/index.m3u8").as_deref(),
            Some("https://example.com/videos/stream/720p/index.m3u8")
        );
    }

    #[test]
    fn absolute_path_keeps_scheme_and_host() {
        assert_eq!(
            resolve("/assets/key.bin").as_deref(),
            Some("https://example.com/assets/key.bin")
        );
    }

    #[test]
    fn explicit_scheme_used_verbatim() {
        assert_eq!(
            resolve("http://cdn.example.net/a/seg.ts?sig=1").as_deref(),
            Some("http://cdn.example.net/a/seg.ts?sig=1")
        );
    }

    #[test]
    fn dot_segments_are_normalised() {
        assert_eq!(
            resolve("../audio/./en/seg.m4s").as_deref(),
            Some("https://example.com/videos/audio/en/seg.m4s")
        );
        assert_eq!(
            resolve("../../../../seg.ts").as_deref(),
            Some("https://example.com/seg.ts")
        );
    }

    #[test]
    fn reference_query_is_kept() {
        assert_eq!(
            resolve("seg.ts?token=abc").as_deref(),
            Some("https://example.com/videos/stream/seg.ts?token=abc")
        );
    }

    #[test]
    fn base_query_is_dropped() {
        let base = Url::parse("https://example.com/live/index.m3u8?session=42").unwrap();
        let resolved = resolve_reference("seg.ts", &base).unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/live/seg.ts");
    }

    #[test]
    fn explicit_port_is_preserved() {
        let base = Url::parse("http://origin.local:8080/hls/index.m3u8").unwrap();
        assert_eq!(
            resolve_reference("seg.ts", &base).unwrap().as_str(),
            "http://origin.local:8080/hls/seg.ts"
        );
        assert_eq!(
            resolve_reference("/key.bin", &base).unwrap().as_str(),
            "http://origin.local:8080/key.bin"
        );
    }

    #[test]
    fn base_at_root() {
        let base = Url::parse("https://example.com/index.m3u8").unwrap();
        assert_eq!(
            resolve_reference("seg.ts", &base).unwrap().as_str(),
            "https://example.com/seg.ts"
        );
    }

    #[test]
    fn hostless_base_cannot_resolve_relative() {
        let base = Url::parse("file:///videos/playlist.m3u8").unwrap();
        assert!(resolve_reference("segment1.ts", &base).is_none());
        assert!(resolve_reference("/segment1.ts", &base).is_none());

        // Absolute references do not need the base at all
        assert!(resolve_reference("https://example.com/seg.ts", &base).is_some());
    }

    #[test]
    fn blank_reference_does_not_resolve() {
        for reference in ["", "   ", "\t", " \t "] {
            assert!(resolve(reference).is_none(), "{reference:?}");
        }
    }
}
