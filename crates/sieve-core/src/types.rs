//! Core type definitions for Sieve
//!
//! These types are shared by the parser, the request engine and the
//! element-hiding store.

use crate::url::{extract_host, extract_scheme};

// =============================================================================
// Rule Actions
// =============================================================================

/// Polarity of a network rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RuleAction {
    /// Exception rule (@@...) - allows the request
    Allow = 0,
    /// Block rule - cancels the request
    Block = 1,
}

impl RuleAction {
    /// Action for a raw filter line, judged by its `@@` prefix.
    pub fn of_filter(filter: &str) -> Self {
        if filter.starts_with("@@") {
            Self::Allow
        } else {
            Self::Block
        }
    }
}

// =============================================================================
// Rule Kinds
// =============================================================================

/// Executable variant a filter line was classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Registration inside a `HostMatchSet`
    Host,
    /// Wildcard or regex pattern with optional domain restriction
    StandardPattern,
    /// Pattern that also consults the `third-party` option
    ThirdPartyPattern,
    /// Neutralized resource-type filter, never matches
    NullPattern,
    /// `##` CSS selector rule
    ElementHiding,
}

// =============================================================================
// Party Masks
// =============================================================================

bitflags::bitflags! {
    /// Party (first-party / third-party) mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PartyMask: u8 {
        /// Matches first-party requests
        const FIRST_PARTY = 1 << 0;
        /// Matches third-party requests
        const THIRD_PARTY = 1 << 1;
        /// Matches both
        const ALL = Self::FIRST_PARTY.bits() | Self::THIRD_PARTY.bits();
    }
}

// =============================================================================
// Scheme Masks
// =============================================================================

bitflags::bitflags! {
    /// URL scheme mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SchemeMask: u8 {
        const HTTP = 1 << 0;
        const HTTPS = 1 << 1;
        const WS = 1 << 2;
        const WSS = 1 << 3;
        const DATA = 1 << 4;
        const FTP = 1 << 5;
        /// Schemes the request engine governs
        const FILTERED = Self::HTTP.bits() | Self::HTTPS.bits();
    }
}

// =============================================================================
// Request Context
// =============================================================================

/// Context for a request being matched.
///
/// The lowercase URL is computed once here so pattern rules do not case-fold
/// the URL again on every evaluation.
#[derive(Debug, Clone)]
pub struct RequestContext<'a> {
    /// Full request URL
    pub url: &'a str,
    /// `url` folded to lowercase
    pub url_lower: String,
    /// URL scheme (empty when unknown)
    pub scheme: SchemeMask,
    /// Request hostname (extracted from URL)
    pub host: &'a str,
    /// Referer header value, empty when absent
    pub referer: &'a str,
    /// Host of the top-level document, empty for navigations
    pub top_level_host: &'a str,
    /// Is this a third-party request?
    pub is_third_party: bool,
    /// Referer hosts whose requests are never blocked
    pub exempt_referers: &'a [String],
}

impl<'a> RequestContext<'a> {
    /// Build a context for `url` requested from a document at `top_level_host`.
    pub fn new(url: &'a str, top_level_host: &'a str) -> Self {
        let host = extract_host(url).unwrap_or("");
        let scheme = extract_scheme(url).unwrap_or(SchemeMask::empty());
        let is_third_party = !top_level_host.is_empty()
            && !host.is_empty()
            && !host.eq_ignore_ascii_case(top_level_host);

        Self {
            url,
            url_lower: url.to_lowercase(),
            scheme,
            host,
            referer: "",
            top_level_host,
            is_third_party,
            exempt_referers: &[],
        }
    }

    /// Attach the Referer header value.
    pub fn with_referer(mut self, referer: &'a str) -> Self {
        self.referer = referer;
        self
    }

    /// Attach the operator-configured exempt referer hosts.
    pub fn with_exempt_referers(mut self, hosts: &'a [String]) -> Self {
        self.exempt_referers = hosts;
        self
    }

    /// True when the referer mentions one of the exempt hosts.
    pub fn has_exempt_referer(&self) -> bool {
        !self.referer.is_empty()
            && self
                .exempt_referers
                .iter()
                .any(|host| !host.is_empty() && self.referer.contains(host.as_str()))
    }
}

// =============================================================================
// Match Result
// =============================================================================

/// Final decision for a matched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDecision {
    /// Request is allowed (no matching block rules, or exception matched)
    Allow,
    /// Request is blocked
    Block,
}

/// Which precedence step produced the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSource<'a> {
    Disabled,
    UnsupportedScheme,
    ExemptReferer,
    WhitelistHost,
    /// Source text of the whitelist pattern that matched
    WhitelistRule(&'a str),
    BlacklistHost,
    /// Source text of the blacklist pattern that matched
    BlacklistRule(&'a str),
    NoMatch,
}

/// Result of matching a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult<'a> {
    /// The final decision for this request
    pub decision: MatchDecision,
    /// Step that determined the decision (for logging)
    pub source: MatchSource<'a>,
}

impl<'a> MatchResult<'a> {
    pub fn allow(source: MatchSource<'a>) -> Self {
        Self {
            decision: MatchDecision::Allow,
            source,
        }
    }

    pub fn block(source: MatchSource<'a>) -> Self {
        Self {
            decision: MatchDecision::Block,
            source,
        }
    }

    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.decision == MatchDecision::Block
    }
}
