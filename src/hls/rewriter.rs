//! Line-oriented HLS manifest rewriting.
//!
//! Every reference in a manifest (plain URI lines and `URI="..."` tag
//! attributes) is resolved against the manifest URL and replaced with its
//! proxy equivalent. The manifest is never parsed as a playlist, so unknown
//! tags and formatting survive untouched.
//!
//! Lines that cannot be rewritten are kept verbatim: one bad reference must
//! not take down the whole playlist.
//!
//! Limitation: only the first `URI="..."` attribute of a tag is rewritten,
//! and quoted values may not contain escaped quotes.

use crate::{
    error::{ProxyError, Result},
    hls::resolve::resolve_reference,
    metrics,
    url_codec::ProxyUrlCodec,
};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

static URI_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"URI="([^"]*)""#).expect("URI attribute pattern is valid"));

/// One manifest line, classified for rewriting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManifestLine<'a> {
    Blank,
    /// `#EXT...` directive or comment.
    Tag(&'a str),
    /// Segment, sub-playlist or other resource reference.
    Uri(&'a str),
}

impl<'a> ManifestLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        if line.is_empty() {
            ManifestLine::Blank
        } else if line.starts_with('#') {
            ManifestLine::Tag(line)
        } else {
            ManifestLine::Uri(line)
        }
    }
}

/// Rewrite a fetched manifest so every reference routes back through the proxy.
///
/// `origin` is the URL the manifest was requested from and serves as the
/// base for relative references. Lines are split on `\n` (a trailing `\r`
/// is dropped) and rejoined with `\n`.
///
/// # Errors
/// Returns [`ProxyError::Rewrite`] if `body` is not valid UTF-8.
pub fn rewrite_manifest(body: &[u8], origin: &Url, codec: &ProxyUrlCodec) -> Result<String> {
    let text = std::str::from_utf8(body)
        .map_err(|e| ProxyError::Rewrite(format!("Manifest from {origin} is not UTF-8: {e}")))?;

    let mut rewritten = 0usize;
    let lines: Vec<Cow<'_, str>> = text
        .split('\n')
        .map(|raw| {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let output = rewrite_line(ManifestLine::classify(line), origin, codec);
            if matches!(output, Cow::Owned(_)) {
                rewritten += 1;
            }
            output
        })
        .collect();

    debug!("Rewrote {} references in manifest {}", rewritten, origin);
    metrics::record_rewritten_lines(rewritten);

    Ok(lines.join("\n"))
}

/// Rewrite a single classified line. Returns `Cow::Borrowed` when the line
/// is passed through unchanged.
pub fn rewrite_line<'a>(
    line: ManifestLine<'a>,
    origin: &Url,
    codec: &ProxyUrlCodec,
) -> Cow<'a, str> {
    match line {
        ManifestLine::Blank => Cow::Borrowed(""),
        ManifestLine::Tag(tag) => rewrite_tag(tag, origin, codec),
        ManifestLine::Uri(reference) => match proxy_reference(reference, origin, codec) {
            Some(proxy) => Cow::Owned(proxy.into()),
            None => {
                warn!("Leaving unresolvable reference as-is: {}", reference);
                Cow::Borrowed(reference)
            }
        },
    }
}

fn rewrite_tag<'a>(tag: &'a str, origin: &Url, codec: &ProxyUrlCodec) -> Cow<'a, str> {
    let Some(captures) = URI_ATTRIBUTE.captures(tag) else {
        return Cow::Borrowed(tag);
    };
    let (Some(attribute), Some(value)) = (captures.get(0), captures.get(1)) else {
        return Cow::Borrowed(tag);
    };

    let Some(proxy) = proxy_reference(value.as_str(), origin, codec) else {
        warn!("Leaving tag with unresolvable URI as-is: {}", tag);
        return Cow::Borrowed(tag);
    };

    let mut output = String::with_capacity(tag.len() + proxy.as_str().len());
    output.push_str(&tag[..attribute.start()]);
    output.push_str("URI=\"");
    output.push_str(proxy.as_str());
    output.push('"');
    output.push_str(&tag[attribute.end()..]);
    Cow::Owned(output)
}

fn proxy_reference(reference: &str, origin: &Url, codec: &ProxyUrlCodec) -> Option<Url> {
    let absolute = resolve_reference(reference, origin)?;
    codec.encode(&absolute).ok()
}
