use log::warn;
use serde::Serialize;

use sieve_core::types::RuleKind;
use sieve_core::FilterSet;

use crate::parser::{classify, HidingRule, ParsedRule};

/// Counters collected while building a `FilterSet`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub lines: usize,
    /// Comments, metadata and empty lines
    pub skipped: usize,
    /// Lines that failed to compile
    pub dropped: usize,
    pub whitelist_hosts: usize,
    pub whitelist_rules: usize,
    pub blacklist_hosts: usize,
    pub blacklist_rules: usize,
    /// Resource-type filters neutralized into never-matching rules
    pub null_rules: usize,
    pub hiding_rules: usize,
}

impl BuildStats {
    /// Rules that made it into the set.
    pub fn rules(&self) -> usize {
        self.whitelist_hosts
            + self.whitelist_rules
            + self.blacklist_hosts
            + self.blacklist_rules
            + self.hiding_rules
    }

    fn record(&mut self, rule: &ParsedRule) {
        match rule {
            ParsedRule::WhitelistHost(_) => self.whitelist_hosts += 1,
            ParsedRule::WhitelistPattern(_) => self.whitelist_rules += 1,
            ParsedRule::BlacklistHost(_) => self.blacklist_hosts += 1,
            ParsedRule::BlacklistPattern(_) => self.blacklist_rules += 1,
            ParsedRule::Hiding(_) => self.hiding_rules += 1,
        }
        if rule.kind() == RuleKind::NullPattern {
            self.null_rules += 1;
        }
    }
}

impl std::ops::AddAssign for BuildStats {
    fn add_assign(&mut self, other: Self) {
        self.lines += other.lines;
        self.skipped += other.skipped;
        self.dropped += other.dropped;
        self.whitelist_hosts += other.whitelist_hosts;
        self.whitelist_rules += other.whitelist_rules;
        self.blacklist_hosts += other.blacklist_hosts;
        self.blacklist_rules += other.blacklist_rules;
        self.null_rules += other.null_rules;
        self.hiding_rules += other.hiding_rules;
    }
}

/// Feeds filter lines into a `FilterSet` under construction.
#[derive(Debug, Default)]
pub struct FilterSetBuilder {
    set: FilterSet,
    stats: BuildStats,
}

impl FilterSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from an existing set, e.g. a clone of the active one.
    pub fn from_set(set: FilterSet) -> Self {
        Self {
            set,
            stats: BuildStats::default(),
        }
    }

    /// Parse one line into the set. Returns true if a rule was registered.
    pub fn add_line(&mut self, line: &str) -> bool {
        self.stats.lines += 1;
        match classify(line) {
            Ok(Some(rule)) => {
                self.stats.record(&rule);
                insert_rule(&mut self.set, rule);
                true
            }
            Ok(None) => {
                self.stats.skipped += 1;
                false
            }
            Err(e) => {
                warn!("{e}");
                self.stats.dropped += 1;
                false
            }
        }
    }

    pub fn add_lines<I, S>(&mut self, lines: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.add_line(line.as_ref());
        }
        self
    }

    pub fn add_text(&mut self, text: &str) -> &mut Self {
        self.add_lines(text.lines())
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn build(self) -> FilterSet {
        self.set
    }

    pub fn finish(self) -> (FilterSet, BuildStats) {
        (self.set, self.stats)
    }
}

/// Route a parsed rule to its one container.
pub fn insert_rule(set: &mut FilterSet, rule: ParsedRule) {
    match rule {
        ParsedRule::WhitelistHost(host) => set.add_whitelist_host(host),
        ParsedRule::WhitelistPattern(rule) => set.add_whitelist_rule(rule),
        ParsedRule::BlacklistHost(host) => set.add_blacklist_host(host),
        ParsedRule::BlacklistPattern(rule) => set.add_blacklist_rule(rule),
        ParsedRule::Hiding(HidingRule::Generic(selector)) => set.hiding_mut().add_generic(selector),
        ParsedRule::Hiding(HidingRule::Domains {
            selector,
            include,
            exclude,
        }) => {
            let hiding = set.hiding_mut();
            for domain in include {
                hiding.add_domain_rule(domain, selector.clone());
            }
            for domain in exclude {
                hiding.add_whitelist_rule(domain, selector.clone());
            }
        }
    }
}

/// Build a `FilterSet` from the text of a filter list.
pub fn build_filter_set(text: &str) -> (FilterSet, BuildStats) {
    let mut builder = FilterSetBuilder::new();
    builder.add_text(text);
    builder.finish()
}
