//! Sieve Core Library
//!
//! This crate provides the matching engine for the Sieve content filter:
//! block/allow decisions for network requests and element-hiding selectors
//! for loaded documents, both driven by Adblock Plus-style filter lists.
//!
//! # Architecture
//!
//! Filter lists are parsed (see `sieve-compiler`) into a [`FilterSet`]. The
//! set is immutable once built; request and document evaluation only read it,
//! so a single set can be shared by any number of threads.
//!
//! # Modules
//!
//! - `domain`: subdomain chains and host suffix walking
//! - `url`: Fast URL parsing without allocations
//! - `host_set`: exact host fast path
//! - `pattern`: wildcard/regex pattern rules and their options
//! - `hiding`: element-hiding selector store
//! - `filter_set`: the rule containers of one load
//! - `engine`: request block/allow precedence
//! - `types`: Shared type definitions

pub mod domain;
pub mod engine;
pub mod error;
pub mod filter_set;
pub mod hiding;
pub mod host_set;
pub mod pattern;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use domain::subdomain_chain;
pub use engine::RequestFilterEngine;
pub use error::{Error, Result};
pub use filter_set::{FilterSet, FilterSetCounts};
pub use hiding::{ElementHidingStore, HidingTarget};
pub use host_set::HostMatchSet;
pub use pattern::{DomainRestriction, Pattern, PatternFilter, PatternRule};
pub use types::{
    MatchDecision, MatchResult, MatchSource, PartyMask, RequestContext, RuleAction, RuleKind,
    SchemeMask,
};
