//! Sieve Filter List Compiler
//!
//! This crate classifies ABP filter-list lines and assembles them into a
//! `sieve_core::FilterSet`.

pub mod builder;
pub mod parser;

pub use builder::{build_filter_set, insert_rule, BuildStats, FilterSetBuilder};
pub use parser::{classify, parse_filter_list, HidingRule, ParseError, ParsedRule};
