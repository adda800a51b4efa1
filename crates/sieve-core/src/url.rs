//! Allocation-free URL slicing for the request path.
//!
//! Only the two pieces the engine needs are located: the scheme and the
//! authority's host. Everything else in the URL is left to the patterns.

use crate::types::SchemeMask;

const SCHEMES: &[(&str, SchemeMask)] = &[
    ("http", SchemeMask::HTTP),
    ("https", SchemeMask::HTTPS),
    ("ws", SchemeMask::WS),
    ("wss", SchemeMask::WSS),
    ("ftp", SchemeMask::FTP),
];

/// Scheme of `url`, or None for schemes the engine does not know.
pub fn extract_scheme(url: &str) -> Option<SchemeMask> {
    let (scheme, rest) = url.split_once(':')?;
    if scheme.eq_ignore_ascii_case("data") {
        return Some(SchemeMask::DATA);
    }
    if !rest.starts_with("//") {
        return None;
    }
    SCHEMES
        .iter()
        .find(|(name, _)| scheme.eq_ignore_ascii_case(name))
        .map(|&(_, mask)| mask)
}

/// Authority part of a hierarchical URL: everything between `://` and the
/// first `/`, `?` or `#`.
fn authority(url: &str) -> Option<&str> {
    let start = url.find("://")? + 3;
    let rest = &url[start..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Host of `url` as a slice of it, without userinfo or port.
pub fn extract_host(url: &str) -> Option<&str> {
    let authority = authority(url)?;
    let host_port = match authority.rfind('@') {
        Some(at) => &authority[at + 1..],
        None => authority,
    };

    // [::1]:8080
    if let Some(inner) = host_port.strip_prefix('[') {
        return inner.split_once(']').map(|(host, _)| host);
    }

    Some(match host_port.split_once(':') {
        Some((host, _port)) => host,
        None => host_port,
    })
}

/// Host of a full URL, or the input itself when it is already a bare host.
pub fn host_of(url_or_host: &str) -> &str {
    extract_host(url_or_host).unwrap_or_else(|| url_or_host.trim().trim_end_matches('/'))
}
