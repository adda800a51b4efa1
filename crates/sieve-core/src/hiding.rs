//! Element hiding
//!
//! `##selector` rules apply to every document. `domains##selector` rules
//! apply to documents whose host has one of the domains in its subdomain
//! chain, and `~domain##selector` suppresses a selector for that domain.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::domain::subdomain_chain;

/// DOM collaborator used to remove hidden elements from a document.
pub trait HidingTarget {
    type Element;

    /// All elements matching a CSS selector.
    fn find_all(&self, selector: &str) -> Vec<Self::Element>;

    /// Detach an element from the document.
    fn remove(&mut self, element: Self::Element);
}

/// Store of element-hiding selectors.
///
/// Selectors are kept exactly as registered; the same selector text may sit
/// under several domains.
#[derive(Debug, Clone, Default)]
pub struct ElementHidingStore {
    generic: Vec<String>,
    domain_rules: HashMap<String, Vec<String>>,
    domain_whitelist: HashMap<String, Vec<String>>,
    domain_rule_count: usize,
    whitelist_count: usize,
}

impl ElementHidingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a selector applied on every document.
    pub fn add_generic(&mut self, selector: impl Into<String>) {
        self.generic.push(selector.into());
    }

    /// Register a selector for one domain.
    pub fn add_domain_rule(&mut self, domain: impl Into<String>, selector: impl Into<String>) {
        self.domain_rules
            .entry(domain.into())
            .or_default()
            .push(selector.into());
        self.domain_rule_count += 1;
    }

    /// Register a selector that must not be hidden on one domain.
    pub fn add_whitelist_rule(&mut self, domain: impl Into<String>, selector: impl Into<String>) {
        self.domain_whitelist
            .entry(domain.into())
            .or_default()
            .push(selector.into());
        self.whitelist_count += 1;
    }

    /// Selectors whose elements should be removed from a document on `host`.
    ///
    /// Generic selectors come first and are never suppressed. Domain-scoped
    /// selectors follow in chain order, skipping any selector text that is
    /// whitelisted anywhere in the chain. A selector is returned once even
    /// when several rules register it.
    pub fn selectors_to_hide_for(&self, host: &str) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut selectors: Vec<&str> = Vec::new();

        for selector in &self.generic {
            if seen.insert(selector) {
                selectors.push(selector);
            }
        }

        if self.domain_rules.is_empty() {
            return selectors;
        }

        let host = host.trim_end_matches('.').to_ascii_lowercase();
        let chain = subdomain_chain(&host);

        let mut whitelisted: HashSet<&str> = HashSet::new();
        for domain in &chain {
            if let Some(list) = self.domain_whitelist.get(*domain) {
                whitelisted.extend(list.iter().map(String::as_str));
            }
        }

        for domain in &chain {
            let Some(list) = self.domain_rules.get(*domain) else {
                continue;
            };
            for selector in list {
                if whitelisted.contains(selector.as_str()) {
                    continue;
                }
                if seen.insert(selector) {
                    selectors.push(selector);
                }
            }
        }

        selectors
    }

    /// Remove every element hidden for `host` from `target`.
    ///
    /// Returns the number of elements removed.
    pub fn apply<T: HidingTarget>(&self, target: &mut T, host: &str) -> usize {
        let mut removed = 0;
        for selector in self.selectors_to_hide_for(host) {
            let elements = target.find_all(selector);
            if !elements.is_empty() {
                debug!("hiding {} element(s) for '{}' on {}", elements.len(), selector, host);
            }
            for element in elements {
                target.remove(element);
                removed += 1;
            }
        }
        removed
    }

    pub fn generic_count(&self) -> usize {
        self.generic.len()
    }

    pub fn domain_rule_count(&self) -> usize {
        self.domain_rule_count
    }

    pub fn whitelist_count(&self) -> usize {
        self.whitelist_count
    }

    pub fn is_empty(&self) -> bool {
        self.generic.is_empty() && self.domain_rule_count == 0 && self.whitelist_count == 0
    }
}
