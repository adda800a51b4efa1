//! Sieve Service
//!
//! Glue between the matching core and its host application: settings, filter
//! list sources, and the `FilterService` that owns the active `FilterSet`.
//!
//! Loading a set of lists builds a fresh `FilterSet` and publishes it with a
//! single atomic swap. Requests in flight keep evaluating against the set they
//! started with.

pub mod config;
pub mod error;
pub mod service;
pub mod source;

pub use config::{Settings, Subscription};
pub use error::{Result, ServiceError};
pub use service::FilterService;
pub use source::{FileSource, FilterListSource, TextSource};
