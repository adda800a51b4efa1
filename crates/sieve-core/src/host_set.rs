//! Host fast path
//!
//! Most entries in production filter lists are plain `||host^` rules. They are
//! kept out of the pattern-rule scan and answered with a single hash lookup.

use std::borrow::Cow;
use std::collections::HashSet;
use std::net::IpAddr;

use crate::domain::{normalize_domain, walk_host_suffixes};

/// Host matcher for filters that reduce to "this host".
///
/// Every registered host is also registered with a `www.` prefix so that
/// `||example.com^` catches `www.example.com` as well. A set built with
/// [`HostMatchSet::with_subdomains`] additionally matches any host below a
/// registered entry, on label boundaries.
#[derive(Debug, Clone, Default)]
pub struct HostMatchSet {
    hosts: HashSet<String>,
    filters: usize,
    match_subdomains: bool,
}

impl HostMatchSet {
    /// Exact matching: the registered host and its `www.` alias.
    pub fn new() -> Self {
        Self::default()
    }

    /// Suffix matching: `ads.example.com` also matches `x.ads.example.com`.
    pub fn with_subdomains() -> Self {
        Self {
            match_subdomains: true,
            ..Self::default()
        }
    }

    pub fn matches_subdomains(&self) -> bool {
        self.match_subdomains
    }

    /// Register `filter` if it is host-reducible.
    ///
    /// Returns false, leaving the set untouched, when the filter needs the
    /// general pattern machinery.
    pub fn try_add(&mut self, filter: &str) -> bool {
        match reduce_to_host(filter) {
            Some(host) => {
                self.insert(host);
                true
            }
            None => false,
        }
    }

    /// Register an already-normalized host.
    pub fn insert(&mut self, host: String) {
        let alias = match host.strip_prefix("www.") {
            Some(_) => None,
            None => Some(format!("www.{host}")),
        };
        self.hosts.insert(host);
        if let Some(alias) = alias {
            self.hosts.insert(alias);
        }
        self.filters += 1;
    }

    /// True if `host` is a registered host or its `www.` alias, or, for a
    /// suffix-matching set, lies below one.
    #[inline]
    pub fn matches(&self, host: &str) -> bool {
        if host.is_empty() || self.hosts.is_empty() {
            return false;
        }
        let host: Cow<'_, str> = if host.bytes().any(|b| b.is_ascii_uppercase()) {
            Cow::Owned(host.to_ascii_lowercase())
        } else {
            Cow::Borrowed(host)
        };
        let host = host.trim_end_matches('.');

        if self.match_subdomains {
            walk_host_suffixes(host).any(|suffix| self.hosts.contains(suffix))
        } else {
            self.hosts.contains(host)
        }
    }

    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }

    /// Number of filters registered (aliases are not counted).
    pub fn len(&self) -> usize {
        self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters == 0
    }
}

/// Reduce a filter to the host it matches, if it is a pure host rule.
///
/// Accepted forms, after stripping a leading `@@`:
/// - `||host^` with no path, wildcard or option list
/// - hosts-file entries such as `0.0.0.0 ads.example.com`
pub fn reduce_to_host(filter: &str) -> Option<String> {
    let filter = filter.trim();
    let filter = filter.strip_prefix("@@").unwrap_or(filter);

    if filter.contains('$') {
        return None;
    }

    if let Some(rest) = filter.strip_prefix("||") {
        let host = rest.strip_suffix('^')?;
        if host.contains(['/', '*', '^', '|', ':', '?']) {
            return None;
        }
        return normalize_domain(host).filter(|h| h.contains('.'));
    }

    parse_hosts_file_domain(filter)
}

fn parse_hosts_file_domain(line: &str) -> Option<String> {
    let mut parts = line.split_whitespace();
    let first = parts.next()?;
    let second = parts.next()?;

    if parts.next().is_some() || first.parse::<IpAddr>().is_err() {
        return None;
    }

    normalize_domain(second).filter(|h| h.contains('.'))
}
