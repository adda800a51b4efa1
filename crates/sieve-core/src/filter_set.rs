//! The complete rule state produced by one filter-list load.

use crate::hiding::ElementHidingStore;
use crate::host_set::HostMatchSet;
use crate::pattern::PatternRule;

/// Whitelist and blacklist rule containers plus the element-hiding store.
///
/// A set is populated once, then only read. Writers that need to change the
/// active rules build (or clone) a new set and publish it in one step.
///
/// Blacklisted hosts cover their subdomains. Whitelisted hosts match exactly
/// (plus `www.`), so `@@||example.com^` does not exempt `ads.example.com`.
#[derive(Debug, Clone)]
pub struct FilterSet {
    pub(crate) whitelist_hosts: HostMatchSet,
    pub(crate) whitelist_rules: Vec<PatternRule>,
    pub(crate) blacklist_hosts: HostMatchSet,
    pub(crate) blacklist_rules: Vec<PatternRule>,
    pub(crate) hiding: ElementHidingStore,
}

/// Entry counts per container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSetCounts {
    pub whitelist_hosts: usize,
    pub whitelist_rules: usize,
    pub blacklist_hosts: usize,
    pub blacklist_rules: usize,
    pub generic_selectors: usize,
    pub domain_selectors: usize,
    pub whitelisted_selectors: usize,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            whitelist_hosts: HostMatchSet::new(),
            whitelist_rules: Vec::new(),
            blacklist_hosts: HostMatchSet::with_subdomains(),
            blacklist_rules: Vec::new(),
            hiding: ElementHidingStore::new(),
        }
    }
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_whitelist_host(&mut self, host: String) {
        self.whitelist_hosts.insert(host);
    }

    pub fn add_whitelist_rule(&mut self, rule: PatternRule) {
        self.whitelist_rules.push(rule);
    }

    pub fn add_blacklist_host(&mut self, host: String) {
        self.blacklist_hosts.insert(host);
    }

    pub fn add_blacklist_rule(&mut self, rule: PatternRule) {
        self.blacklist_rules.push(rule);
    }

    pub fn hiding(&self) -> &ElementHidingStore {
        &self.hiding
    }

    pub fn hiding_mut(&mut self) -> &mut ElementHidingStore {
        &mut self.hiding
    }

    pub fn whitelist_hosts(&self) -> &HostMatchSet {
        &self.whitelist_hosts
    }

    pub fn blacklist_hosts(&self) -> &HostMatchSet {
        &self.blacklist_hosts
    }

    pub fn whitelist_rules(&self) -> &[PatternRule] {
        &self.whitelist_rules
    }

    pub fn blacklist_rules(&self) -> &[PatternRule] {
        &self.blacklist_rules
    }

    /// Selectors to hide on a document at `host`.
    pub fn selectors_to_hide_for(&self, host: &str) -> Vec<&str> {
        self.hiding.selectors_to_hide_for(host)
    }

    pub fn counts(&self) -> FilterSetCounts {
        FilterSetCounts {
            whitelist_hosts: self.whitelist_hosts.len(),
            whitelist_rules: self.whitelist_rules.len(),
            blacklist_hosts: self.blacklist_hosts.len(),
            blacklist_rules: self.blacklist_rules.len(),
            generic_selectors: self.hiding.generic_count(),
            domain_selectors: self.hiding.domain_rule_count(),
            whitelisted_selectors: self.hiding.whitelist_count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.whitelist_hosts.is_empty()
            && self.whitelist_rules.is_empty()
            && self.blacklist_hosts.is_empty()
            && self.blacklist_rules.is_empty()
            && self.hiding.is_empty()
    }
}
