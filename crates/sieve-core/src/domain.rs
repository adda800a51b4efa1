//! Host and domain helpers
//!
//! Sieve deliberately does not consult the Public Suffix List. Registrable
//! domains are approximated by the last two labels of a host.
//!
//! # Examples
//!
//! ```
//! use sieve_core::domain::subdomain_chain;
//!
//! assert_eq!(
//!     subdomain_chain("a.b.example.com"),
//!     vec!["example.com", "b.example.com", "a.b.example.com"]
//! );
//! ```

/// Build the ordered list of domain suffixes used for element-hiding lookups.
///
/// The list runs from most general to most specific. It starts at the
/// two-label suffix (the bare top-level label is never included on its own)
/// and ends with the full host. A host that is already two labels long, or a
/// single label, yields just itself.
pub fn subdomain_chain(host: &str) -> Vec<&str> {
    let mut chain = Vec::new();
    if host.is_empty() {
        return chain;
    }

    let bytes = host.as_bytes();
    let mut dot = second_last_dot(bytes);

    while let Some(pos) = dot {
        chain.push(&host[pos + 1..]);
        dot = bytes[..pos].iter().rposition(|&b| b == b'.');
    }

    if chain.last() != Some(&host) {
        chain.push(host);
    }

    chain
}

fn second_last_dot(bytes: &[u8]) -> Option<usize> {
    let last = bytes.iter().rposition(|&b| b == b'.')?;
    bytes[..last].iter().rposition(|&b| b == b'.')
}

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Iterator for suffix-walking a host from the full host down to its last
/// two labels.
pub struct HostSuffixIter<'a> {
    current: Option<&'a str>,
}

impl<'a> Iterator for HostSuffixIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;

        self.current = get_parent_domain(result).filter(|parent| parent.contains('.'));

        Some(result)
    }
}

/// Walk host suffixes from most specific to least specific.
pub fn walk_host_suffixes(host: &str) -> HostSuffixIter<'_> {
    HostSuffixIter {
        current: if host.is_empty() { None } else { Some(host) },
    }
}

/// Lowercase a host literal taken from a filter and check its characters.
pub fn normalize_domain(host: &str) -> Option<String> {
    let trimmed = host.trim().trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_')
    {
        return None;
    }

    if trimmed.contains("..") {
        return None;
    }

    Some(trimmed.to_ascii_lowercase())
}
