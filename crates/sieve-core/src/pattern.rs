//! Pattern rules
//!
//! A pattern rule is any network filter that did not reduce to a plain host.
//! The variant is chosen once, at parse time, from the filter's option list:
//!
//! - `Standard`: wildcard or `/regex/` pattern, optional `domain=` restriction
//! - `ThirdPartyAware`: as `Standard`, plus the `third-party` option
//! - `Null`: resource-type filters the engine cannot evaluate; never matches

use regex::{Regex, RegexBuilder};

use crate::domain::{normalize_domain, walk_host_suffixes};
use crate::error::{Error, Result};
use crate::types::{PartyMask, RequestContext, RuleKind};

// =============================================================================
// Compiled Pattern
// =============================================================================

/// A filter pattern compiled to a regular expression.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Compile ABP pattern syntax. Matching is case-insensitive.
    ///
    /// Text wrapped in slashes is taken as a regular expression as is.
    /// Anything else is wildcard syntax: `*` matches any run of characters,
    /// `^` matches a separator or the end of the URL, a leading `||` anchors
    /// at a domain boundary, a leading or trailing `|` anchors at the start
    /// or end of the URL.
    pub fn compile(text: &str) -> Result<Self> {
        let source = if is_regex_literal(text) {
            text[1..text.len() - 1].to_string()
        } else {
            wildcard_to_regex(text)
        };

        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|source| Error::InvalidRegex {
                pattern: text.to_string(),
                source,
            })?;

        Ok(Self { regex })
    }

    /// Test the request URL. The regex folds case, so the lowercase form
    /// already held by the context is enough.
    #[inline]
    pub fn is_match(&self, ctx: &RequestContext<'_>) -> bool {
        self.regex.is_match(&ctx.url_lower)
    }
}

fn is_regex_literal(text: &str) -> bool {
    text.len() > 2 && text.starts_with('/') && text.ends_with('/')
}

const DOMAIN_ANCHOR: &str = r"^[a-zA-Z][a-zA-Z0-9+.\-]*://(?:[^/?#]*\.)?";
const SEPARATOR: &str = r"(?:[^\w\-.%]|$)";

fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    if let Some(stripped) = rest.strip_prefix("||") {
        out.push_str(DOMAIN_ANCHOR);
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('|') {
        out.push('^');
        rest = stripped;
    }

    let (body, end_anchor) = match rest.strip_suffix('|') {
        Some(body) => (body, true),
        None => (rest, false),
    };

    let mut last_was_star = false;
    let mut buf = [0u8; 4];
    for ch in body.chars() {
        match ch {
            '*' => {
                if !last_was_star {
                    out.push_str(".*");
                }
                last_was_star = true;
                continue;
            }
            '^' => out.push_str(SEPARATOR),
            c => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
        last_was_star = false;
    }

    if end_anchor {
        out.push('$');
    }

    out
}

// =============================================================================
// Domain Restriction
// =============================================================================

/// `domain=a.com|~b.com` option.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainRestriction {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl DomainRestriction {
    /// Parse the value of a `domain=` option. Returns None when no usable
    /// domain is listed.
    pub fn parse(value: &str) -> Option<Self> {
        let mut restriction = Self::default();

        for raw in value.split('|') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let (is_exclude, domain_raw) = match raw.strip_prefix('~') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };

            let Some(domain) = normalize_domain(domain_raw) else {
                continue;
            };

            if is_exclude {
                restriction.exclude.push(domain);
            } else {
                restriction.include.push(domain);
            }
        }

        if restriction.include.is_empty() && restriction.exclude.is_empty() {
            return None;
        }

        Some(restriction)
    }

    /// Check the top-level document host against the include and exclude
    /// lists. Parent domains of the host count as matches.
    pub fn allows(&self, top_level_host: &str) -> bool {
        let host = top_level_host.to_ascii_lowercase();

        if !self.include.is_empty()
            && !walk_host_suffixes(&host).any(|suffix| self.include.iter().any(|d| d == suffix))
        {
            return false;
        }

        !walk_host_suffixes(&host).any(|suffix| self.exclude.iter().any(|d| d == suffix))
    }
}

// =============================================================================
// Pattern Rules
// =============================================================================

/// Pattern plus the options every evaluable variant shares.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    source: String,
    pattern: Pattern,
    domains: Option<DomainRestriction>,
}

impl PatternFilter {
    pub fn new(
        source: impl Into<String>,
        pattern: Pattern,
        domains: Option<DomainRestriction>,
    ) -> Self {
        Self {
            source: source.into(),
            pattern,
            domains,
        }
    }

    #[inline]
    fn matches(&self, ctx: &RequestContext<'_>) -> bool {
        if let Some(domains) = &self.domains {
            if !domains.allows(ctx.top_level_host) {
                return false;
            }
        }
        self.pattern.is_match(ctx)
    }
}

/// Network filter evaluated against the request URL.
#[derive(Debug, Clone)]
pub enum PatternRule {
    Standard(PatternFilter),
    ThirdPartyAware {
        filter: PatternFilter,
        /// `THIRD_PARTY` for `$third-party`, `FIRST_PARTY` for `$~third-party`
        party: PartyMask,
    },
    Null {
        source: String,
    },
}

impl PatternRule {
    pub fn matches(&self, ctx: &RequestContext<'_>) -> bool {
        match self {
            Self::Standard(filter) => filter.matches(ctx),
            Self::ThirdPartyAware { filter, party } => {
                let request_party = if ctx.is_third_party {
                    PartyMask::THIRD_PARTY
                } else {
                    PartyMask::FIRST_PARTY
                };
                party.intersects(request_party) && filter.matches(ctx)
            }
            Self::Null { .. } => false,
        }
    }

    /// The filter text this rule was built from, without any `@@` prefix.
    pub fn source_text(&self) -> &str {
        match self {
            Self::Standard(filter) | Self::ThirdPartyAware { filter, .. } => &filter.source,
            Self::Null { source } => source,
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Standard(_) => RuleKind::StandardPattern,
            Self::ThirdPartyAware { .. } => RuleKind::ThirdPartyPattern,
            Self::Null { .. } => RuleKind::NullPattern,
        }
    }
}
