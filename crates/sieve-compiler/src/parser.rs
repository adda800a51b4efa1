use log::{debug, warn};
use thiserror::Error;

use sieve_core::host_set::reduce_to_host;
use sieve_core::types::{PartyMask, RuleAction, RuleKind};
use sieve_core::{DomainRestriction, Pattern, PatternFilter, PatternRule};

/// A filter line the parser could not turn into a rule.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("dropping filter '{line}': {source}")]
    Pattern {
        line: String,
        #[source]
        source: sieve_core::Error,
    },
}

/// Element-hiding part of a filter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HidingRule {
    /// `##selector`
    Generic(String),
    /// `a.com,~b.a.com##selector` and `a.com#@#selector`
    Domains {
        selector: String,
        include: Vec<String>,
        exclude: Vec<String>,
    },
}

/// Typed result of classifying one filter-list line.
#[derive(Debug, Clone)]
pub enum ParsedRule {
    WhitelistHost(String),
    WhitelistPattern(PatternRule),
    BlacklistHost(String),
    BlacklistPattern(PatternRule),
    Hiding(HidingRule),
}

impl ParsedRule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::WhitelistHost(_) | Self::BlacklistHost(_) => RuleKind::Host,
            Self::WhitelistPattern(rule) | Self::BlacklistPattern(rule) => rule.kind(),
            Self::Hiding(_) => RuleKind::ElementHiding,
        }
    }

    /// Polarity of a network rule; None for element hiding.
    pub fn action(&self) -> Option<RuleAction> {
        match self {
            Self::WhitelistHost(_) | Self::WhitelistPattern(_) => Some(RuleAction::Allow),
            Self::BlacklistHost(_) | Self::BlacklistPattern(_) => Some(RuleAction::Block),
            Self::Hiding(_) => None,
        }
    }
}

/// Parse a whole filter list, dropping lines that fail to compile.
pub fn parse_filter_list(text: &str) -> Vec<ParsedRule> {
    let mut rules = Vec::new();

    for raw_line in text.lines() {
        match classify(raw_line) {
            Ok(Some(rule)) => rules.push(rule),
            Ok(None) => {}
            Err(e) => warn!("{e}"),
        }
    }

    rules
}

/// Classify one raw filter-list line.
///
/// `Ok(None)` means the line carries no rule: a comment, list metadata, an
/// empty line, or an exception with nothing after `@@`.
pub fn classify(raw_line: &str) -> Result<Option<ParsedRule>, ParseError> {
    let line = raw_line.trim();
    if line.is_empty() || is_comment_line(line) {
        return Ok(None);
    }

    if RuleAction::of_filter(line) == RuleAction::Allow {
        let filter = line[2..].trim_start();
        if filter.is_empty() {
            return Ok(None);
        }
        if let Some(host) = reduce_to_host(filter) {
            return Ok(Some(ParsedRule::WhitelistHost(host)));
        }
        return build_pattern_rule(filter, line)
            .map(|rule| Some(ParsedRule::WhitelistPattern(rule)));
    }

    if let Some((domains, selector)) = line.split_once("##") {
        return Ok(parse_hiding_rule(domains, selector, false).map(ParsedRule::Hiding));
    }

    if let Some((domains, selector)) = line.split_once("#@#") {
        return Ok(parse_hiding_rule(domains, selector, true).map(ParsedRule::Hiding));
    }

    if let Some(host) = reduce_to_host(line) {
        return Ok(Some(ParsedRule::BlacklistHost(host)));
    }

    build_pattern_rule(line, line).map(|rule| Some(ParsedRule::BlacklistPattern(rule)))
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('!') || line.starts_with('[')
}

// =============================================================================
// Element Hiding
// =============================================================================

fn parse_hiding_rule(domains: &str, selector: &str, is_exception: bool) -> Option<HidingRule> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }

    let domains = domains.trim();
    if domains.is_empty() {
        // A generic exception cannot be expressed; generic selectors are never suppressed.
        if is_exception {
            return None;
        }
        return Some(HidingRule::Generic(selector.to_string()));
    }

    let mut include = Vec::new();
    let mut exclude = Vec::new();

    for raw in domains.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match raw.strip_prefix('~') {
            Some(domain) if !domain.is_empty() => exclude.push(domain.to_ascii_lowercase()),
            Some(_) => {}
            None if is_exception => exclude.push(raw.to_ascii_lowercase()),
            None => include.push(raw.to_ascii_lowercase()),
        }
    }

    if include.is_empty() && exclude.is_empty() {
        return None;
    }

    Some(HidingRule::Domains {
        selector: selector.to_string(),
        include,
        exclude,
    })
}

// =============================================================================
// Pattern Rules
// =============================================================================

/// Resource types the engine cannot see. Filters restricted to them are
/// neutralized rather than guessed at.
const RESOURCE_TYPE_OPTIONS: &[&str] = &[
    "script",
    "image",
    "background",
    "stylesheet",
    "object",
    "xbl",
    "ping",
    "xmlhttprequest",
    "object-subrequest",
    "dtd",
    "subdocument",
    "document",
    "other",
    "collapse",
];

#[derive(Debug, Default)]
struct ParsedOptions {
    resource_type: bool,
    party: Option<PartyMask>,
    domains: Option<DomainRestriction>,
}

fn build_pattern_rule(filter: &str, line: &str) -> Result<PatternRule, ParseError> {
    let (pattern_text, options_text) = split_rule_options(filter);
    let options = options_text.map(parse_options).unwrap_or_default();

    if options.resource_type && options.party.is_none() {
        debug!("neutralizing resource-type filter '{line}'");
        return Ok(PatternRule::Null {
            source: filter.to_string(),
        });
    }

    let pattern = Pattern::compile(pattern_text).map_err(|source| ParseError::Pattern {
        line: line.to_string(),
        source,
    })?;
    let filter = PatternFilter::new(filter, pattern, options.domains);

    Ok(match options.party {
        Some(party) => PatternRule::ThirdPartyAware { filter, party },
        None => PatternRule::Standard(filter),
    })
}

/// Split at the last `$`, unless it is the first character.
fn split_rule_options(filter: &str) -> (&str, Option<&str>) {
    match filter.rfind('$') {
        Some(pos) if pos > 0 => (&filter[..pos], Some(&filter[pos + 1..])),
        _ => (filter, None),
    }
}

fn parse_options(text: &str) -> ParsedOptions {
    let mut options = ParsedOptions::default();

    for raw in text.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let raw_lower = raw.to_ascii_lowercase();
        let raw_lower = raw_lower.as_str();

        if let Some(domain_value) = raw_lower.strip_prefix("domain=") {
            if let Some(parsed) = DomainRestriction::parse(domain_value) {
                options.domains = Some(merge_restrictions(options.domains.take(), parsed));
            }
            continue;
        }

        let (negated, name) = match raw_lower.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw_lower),
        };

        if let Some(mask) = party_mask(name) {
            options.party = Some(if negated { PartyMask::ALL.difference(mask) } else { mask });
            continue;
        }

        if RESOURCE_TYPE_OPTIONS.contains(&name) {
            options.resource_type = true;
        }
    }

    options
}

fn merge_restrictions(
    existing: Option<DomainRestriction>,
    incoming: DomainRestriction,
) -> DomainRestriction {
    match existing {
        Some(mut current) => {
            current.include.extend(incoming.include);
            current.exclude.extend(incoming.exclude);
            current
        }
        None => incoming,
    }
}

fn party_mask(name: &str) -> Option<PartyMask> {
    match name {
        "third-party" | "thirdparty" | "3p" => Some(PartyMask::THIRD_PARTY),
        "first-party" | "firstparty" | "1p" => Some(PartyMask::FIRST_PARTY),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_core::RequestContext;

    fn parse(line: &str) -> ParsedRule {
        classify(line).expect("line should parse").expect("line should carry a rule")
    }

    #[test]
    fn skips_comments_metadata_and_empty_lines() {
        for line in ["", "   ", "! Title: EasyList", "[Adblock Plus 2.0]", "@@", "@@   ", "\r"] {
            assert!(classify(line).unwrap().is_none(), "{line:?}");
        }
    }

    #[test]
    fn classifies_host_rules() {
        assert!(matches!(
            parse("||ads.example.com^"),
            ParsedRule::BlacklistHost(h) if h == "ads.example.com"
        ));
        assert!(matches!(
            parse("@@||example.com^"),
            ParsedRule::WhitelistHost(h) if h == "example.com"
        ));
        assert!(matches!(parse("0.0.0.0 tracker.example.net"), ParsedRule::BlacklistHost(_)));
    }

    #[test]
    fn bare_hostname_stays_a_pattern_rule() {
        assert!(matches!(parse("ads.example.com"), ParsedRule::BlacklistPattern(_)));
        assert!(matches!(
            parse("0.0.0.0 ads.example.com"),
            ParsedRule::BlacklistHost(h) if h == "ads.example.com"
        ));
    }

    #[test]
    fn classifies_pattern_rules() {
        let rule = parse("/banner/*/img^");
        assert_eq!(rule.kind(), RuleKind::StandardPattern);
        assert_eq!(rule.action(), Some(RuleAction::Block));

        let rule = parse("@@||example.com/ads/allowed.js");
        assert_eq!(rule.kind(), RuleKind::StandardPattern);
        assert_eq!(rule.action(), Some(RuleAction::Allow));
    }

    #[test]
    fn neutralizes_resource_type_filters() {
        let lines = [
            "/ads.js$script",
            "||cdn.example.com^$image",
            "/pop$~subdocument",
            "/x$SCRIPT,domain=a.com",
        ];
        for line in lines {
            assert_eq!(parse(line).kind(), RuleKind::NullPattern, "{line}");
        }
    }

    #[test]
    fn third_party_takes_precedence_over_neutralization() {
        let rule = parse("||ads.example.com^$script,third-party");
        let ParsedRule::BlacklistPattern(PatternRule::ThirdPartyAware { party, .. }) = rule else {
            panic!("expected a third-party aware rule");
        };
        assert_eq!(party, PartyMask::THIRD_PARTY);

        let rule = parse("/widget.js$~third-party");
        let ParsedRule::BlacklistPattern(PatternRule::ThirdPartyAware { party, .. }) = rule else {
            panic!("expected a third-party aware rule");
        };
        assert_eq!(party, PartyMask::FIRST_PARTY);
    }

    #[test]
    fn options_split_at_last_dollar() {
        let ParsedRule::BlacklistPattern(rule) = parse("/price$5/offer$third-party") else {
            panic!("expected a pattern rule");
        };
        assert_eq!(rule.kind(), RuleKind::ThirdPartyPattern);
        let ctx = RequestContext::new("https://shop.example/price$5/offer", "news.example");
        assert!(rule.matches(&ctx));

        // A leading '$' is part of the pattern.
        let ParsedRule::BlacklistPattern(rule) = parse("$ads") else {
            panic!("expected a pattern rule");
        };
        assert_eq!(rule.kind(), RuleKind::StandardPattern);
    }

    #[test]
    fn applies_domain_option() {
        let line = "/track.gif$domain=news.example|~blog.news.example";
        let ParsedRule::BlacklistPattern(rule) = parse(line) else {
            panic!("expected a pattern rule");
        };
        assert!(rule.matches(&RequestContext::new("https://t.example/track.gif", "news.example")));
        let ctx = RequestContext::new("https://t.example/track.gif", "blog.news.example");
        assert!(!rule.matches(&ctx));
        let ctx = RequestContext::new("https://t.example/track.gif", "other.example");
        assert!(!rule.matches(&ctx));
    }

    #[test]
    fn ignores_unknown_options() {
        let rule = parse("/ad-frame$match-case,important");
        assert_eq!(rule.kind(), RuleKind::StandardPattern);
    }

    #[test]
    fn rejects_malformed_regex() {
        let err = classify("/ad(s/").unwrap_err();
        assert!(err.to_string().contains("/ad(s/"));
        assert!(classify("@@/ad[/").is_err());
    }

    #[test]
    fn classifies_generic_hiding() {
        assert!(matches!(
            parse("##.banner-ad"),
            ParsedRule::Hiding(HidingRule::Generic(s)) if s == ".banner-ad"
        ));
        assert!(classify("##").unwrap().is_none());
    }

    #[test]
    fn classifies_domain_hiding() {
        let rule = parse("Example.com,~partner.example.com, shop.example ##div[id=\"ad##x\"]");
        let ParsedRule::Hiding(HidingRule::Domains { selector, include, exclude }) = rule else {
            panic!("expected domain hiding rule");
        };
        assert_eq!(selector, "div[id=\"ad##x\"]");
        assert_eq!(include, vec!["example.com", "shop.example"]);
        assert_eq!(exclude, vec!["partner.example.com"]);
    }

    #[test]
    fn classifies_hiding_exceptions() {
        let rule = parse("partner.example.com#@#.promo");
        let ParsedRule::Hiding(HidingRule::Domains { include, exclude, .. }) = rule else {
            panic!("expected domain hiding rule");
        };
        assert!(include.is_empty());
        assert_eq!(exclude, vec!["partner.example.com"]);

        assert!(classify("#@#.promo").unwrap().is_none());
    }

    #[test]
    fn parse_filter_list_drops_bad_lines() {
        let rules = parse_filter_list("! comment\n||ads.example.com^\n/ad(s/\n##.ad\n");
        assert_eq!(rules.len(), 2);
    }
}
