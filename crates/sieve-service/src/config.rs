//! Settings
//!
//! Settings are read from a TOML file. Every field has a default, so an
//! empty file (or none at all) gives a working configuration.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{debug, warn};
use serde::Deserialize;

use sieve_core::domain::walk_host_suffixes;

use crate::error::{Result, ServiceError};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Global switch for request blocking and element hiding
    pub enabled: bool,
    /// Element hiding on/off, independent of request blocking
    pub hide_elements: bool,
    /// Subscription refresh interval, read by the external scheduler
    pub update_interval_days: u32,
    /// Requests whose referer mentions one of these hosts are never blocked
    pub exempt_referers: Vec<String>,
    /// Sites on which filtering is switched off entirely
    pub trusted_hosts: Vec<String>,
    /// File holding rules added by the user
    pub local_rules: PathBuf,
    pub subscriptions: Vec<Subscription>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            hide_elements: true,
            update_interval_days: 7,
            exempt_referers: Vec::new(),
            trusted_hosts: Vec::new(),
            local_rules: PathBuf::from("adblockrules_local"),
            subscriptions: Vec::new(),
        }
    }
}

/// A filter list downloaded by the external subscription collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subscription {
    pub name: String,
    /// Where the scheduler fetches the list from
    #[serde(default)]
    pub url: Option<String>,
    /// Where the fetched list is stored
    pub path: PathBuf,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Settings {
    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read settings from `path`. Relative paths inside the file are taken
    /// relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ServiceError::io(path, e))?;
        let settings = Self::from_toml(&text).map_err(|source| ServiceError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(match path.parent() {
            Some(base) => settings.resolve_paths(base),
            None => settings,
        })
    }

    /// Like `load`, but a missing or malformed file yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(ServiceError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                debug!("no settings at '{}', using defaults", path.display());
                Self::default().resolve_paths(path.parent().unwrap_or_else(|| Path::new("")))
            }
            Err(e) => {
                warn!("{e}; using defaults");
                Self::default().resolve_paths(path.parent().unwrap_or_else(|| Path::new("")))
            }
        }
    }

    pub fn resolve_paths(mut self, base: &Path) -> Self {
        if self.local_rules.is_relative() {
            self.local_rules = base.join(&self.local_rules);
        }
        for subscription in &mut self.subscriptions {
            if subscription.path.is_relative() {
                subscription.path = base.join(&subscription.path);
            }
        }
        self
    }

    /// True when `host`, or one of its parent domains, is a trusted site.
    pub fn is_trusted(&self, host: &str) -> bool {
        if self.trusted_hosts.is_empty() || host.is_empty() {
            return false;
        }
        let host = host.to_ascii_lowercase();
        walk_host_suffixes(&host).any(|suffix| {
            self.trusted_hosts
                .iter()
                .any(|trusted| trusted.eq_ignore_ascii_case(suffix))
        })
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.update_interval_days) * SECS_PER_DAY)
    }

    /// Has the update interval elapsed since `last_update`?
    pub fn update_due(&self, last_update: SystemTime, now: SystemTime) -> bool {
        match now.duration_since(last_update) {
            Ok(elapsed) => elapsed >= self.update_interval(),
            Err(_) => false,
        }
    }

    pub fn enabled_subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.iter().filter(|s| s.enabled)
    }
}
