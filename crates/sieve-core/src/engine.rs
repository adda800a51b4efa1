//! Request Filter Engine
//!
//! This is the hot path - every request goes through here.
//! The engine only reads the `FilterSet`; it never allocates beyond what the
//! request context already carries.

use crate::filter_set::FilterSet;
use crate::types::{MatchResult, MatchSource, RequestContext, SchemeMask};

// =============================================================================
// Engine
// =============================================================================

/// Block/allow decisions over a borrowed `FilterSet`.
pub struct RequestFilterEngine<'a> {
    filter_set: &'a FilterSet,
    enabled: bool,
}

impl<'a> RequestFilterEngine<'a> {
    /// Create a new engine over the given filter set. Filtering starts enabled.
    pub fn new(filter_set: &'a FilterSet) -> Self {
        Self {
            filter_set,
            enabled: true,
        }
    }

    /// Turn filtering on or off globally.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Should the request be aborted?
    #[inline]
    pub fn is_blocked(&self, ctx: &RequestContext<'_>) -> bool {
        self.match_request(ctx).is_blocked()
    }

    /// Match a request and return the decision with the step that made it.
    ///
    /// Precedence is fixed and the first step that matches wins. Every
    /// whitelist step runs before any blacklist step, and within each
    /// polarity the host set is consulted before the pattern rules.
    pub fn match_request(&self, ctx: &RequestContext<'_>) -> MatchResult<'a> {
        if !self.enabled {
            return MatchResult::allow(MatchSource::Disabled);
        }

        if !ctx.scheme.intersects(SchemeMask::FILTERED) {
            return MatchResult::allow(MatchSource::UnsupportedScheme);
        }

        if ctx.has_exempt_referer() {
            return MatchResult::allow(MatchSource::ExemptReferer);
        }

        let set = self.filter_set;

        if set.whitelist_hosts.matches(ctx.host) {
            return MatchResult::allow(MatchSource::WhitelistHost);
        }

        if let Some(rule) = set.whitelist_rules.iter().find(|rule| rule.matches(ctx)) {
            return MatchResult::allow(MatchSource::WhitelistRule(rule.source_text()));
        }

        if set.blacklist_hosts.matches(ctx.host) {
            return MatchResult::block(MatchSource::BlacklistHost);
        }

        if let Some(rule) = set.blacklist_rules.iter().find(|rule| rule.matches(ctx)) {
            return MatchResult::block(MatchSource::BlacklistRule(rule.source_text()));
        }

        MatchResult::allow(MatchSource::NoMatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{DomainRestriction, Pattern, PatternFilter, PatternRule};
    use crate::types::{MatchDecision, PartyMask};

    fn rule(pattern: &str) -> PatternRule {
        PatternRule::Standard(PatternFilter::new(pattern, Pattern::compile(pattern).unwrap(), None))
    }

    fn sample_set() -> FilterSet {
        let mut set = FilterSet::new();
        set.add_blacklist_host("ads.example.com".to_string());
        set.add_blacklist_rule(rule("/banner/*"));
        set.add_whitelist_rule(rule("/banner/allowed"));
        set
    }

    #[test]
    fn test_empty_set_allows_everything() {
        let set = FilterSet::new();
        let engine = RequestFilterEngine::new(&set);
        let ctx = RequestContext::new("https://ads.example.com/banner.gif", "news.example");
        let result = engine.match_request(&ctx);
        assert_eq!(result.decision, MatchDecision::Allow);
        assert_eq!(result.source, MatchSource::NoMatch);
    }

    #[test]
    fn test_blacklist_host_blocks() {
        let set = sample_set();
        let engine = RequestFilterEngine::new(&set);
        let result = engine.match_request(&RequestContext::new("https://ads.example.com/x.js", ""));
        assert_eq!(result.decision, MatchDecision::Block);
        assert_eq!(result.source, MatchSource::BlacklistHost);
    }

    #[test]
    fn test_blacklist_host_covers_subdomains() {
        let mut set = FilterSet::new();
        set.add_blacklist_host("doubleclick.net".to_string());
        let engine = RequestFilterEngine::new(&set);

        let ctx = RequestContext::new("https://ad.doubleclick.net/x.js", "news.example");
        let result = engine.match_request(&ctx);
        assert_eq!(result.source, MatchSource::BlacklistHost);
        assert!(!engine.is_blocked(&RequestContext::new("https://notdoubleclick.net/x.js", "")));
    }

    #[test]
    fn test_whitelist_host_is_exact() {
        let mut set = FilterSet::new();
        set.add_whitelist_host("example.com".to_string());
        set.add_blacklist_host("ads.example.com".to_string());
        let engine = RequestFilterEngine::new(&set);

        let www = engine.match_request(&RequestContext::new("https://www.example.com/", ""));
        assert_eq!(www.source, MatchSource::WhitelistHost);
        assert!(engine.is_blocked(&RequestContext::new("https://ads.example.com/", "")));
    }

    #[test]
    fn test_whitelist_pattern_beats_blacklist_pattern() {
        let set = sample_set();
        let engine = RequestFilterEngine::new(&set);

        let blocked = RequestContext::new("https://cdn.example.org/banner/top.png", "");
        assert!(engine.is_blocked(&blocked));

        let allowed = RequestContext::new("https://cdn.example.org/banner/allowed.png", "");
        let result = engine.match_request(&allowed);
        assert_eq!(result.decision, MatchDecision::Allow);
        assert_eq!(result.source, MatchSource::WhitelistRule("/banner/allowed"));
    }

    #[test]
    fn test_whitelist_host_beats_blacklist_host() {
        let mut set = FilterSet::new();
        set.add_whitelist_host("ads.example.com".to_string());
        set.add_blacklist_host("ads.example.com".to_string());
        set.add_blacklist_rule(rule("/x.js"));
        let engine = RequestFilterEngine::new(&set);

        let result = engine.match_request(&RequestContext::new("https://ads.example.com/x.js", ""));
        assert_eq!(result.source, MatchSource::WhitelistHost);
        assert!(!result.is_blocked());
    }

    #[test]
    fn test_disabled_engine_allows() {
        let set = sample_set();
        let mut engine = RequestFilterEngine::new(&set);
        engine.set_enabled(false);
        let result = engine.match_request(&RequestContext::new("https://ads.example.com/x.js", ""));
        assert_eq!(result.source, MatchSource::Disabled);
    }

    #[test]
    fn test_non_http_schemes_are_not_filtered() {
        let set = sample_set();
        let engine = RequestFilterEngine::new(&set);
        for url in ["ftp://ads.example.com/banner/x", "data:text/html,banner/", "about:blank"] {
            let result = engine.match_request(&RequestContext::new(url, ""));
            assert_eq!(result.source, MatchSource::UnsupportedScheme, "{url}");
        }
    }

    #[test]
    fn test_exempt_referer_allows() {
        let set = sample_set();
        let engine = RequestFilterEngine::new(&set);
        let exempt = vec!["intranet.local".to_string()];
        let ctx = RequestContext::new("https://ads.example.com/x.js", "intranet.local")
            .with_referer("http://intranet.local/dashboard")
            .with_exempt_referers(&exempt);
        assert_eq!(engine.match_request(&ctx).source, MatchSource::ExemptReferer);
    }

    #[test]
    fn test_null_rule_never_blocks() {
        let mut set = FilterSet::new();
        set.add_blacklist_rule(PatternRule::Null {
            source: "/ads.js$script".to_string(),
        });
        let engine = RequestFilterEngine::new(&set);
        assert!(!engine.is_blocked(&RequestContext::new("https://example.com/ads.js", "")));
    }

    #[test]
    fn test_third_party_and_domain_options() {
        let pattern = Pattern::compile("/track.js").unwrap();
        let domains = DomainRestriction::parse("news.example");
        let mut set = FilterSet::new();
        set.add_blacklist_rule(PatternRule::ThirdPartyAware {
            filter: PatternFilter::new("/track.js", pattern, domains),
            party: PartyMask::THIRD_PARTY,
        });
        let engine = RequestFilterEngine::new(&set);

        let third = RequestContext::new("https://cdn.tracker.net/track.js", "news.example");
        assert!(engine.is_blocked(&third));

        let first = RequestContext::new("https://news.example/track.js", "news.example");
        assert!(!engine.is_blocked(&first));

        let elsewhere = RequestContext::new("https://cdn.tracker.net/track.js", "blog.example");
        assert!(!engine.is_blocked(&elsewhere));
    }
}
