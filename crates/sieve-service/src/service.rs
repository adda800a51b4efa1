use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use log::{debug, info, warn};

use sieve_compiler::{classify, insert_rule, BuildStats, FilterSetBuilder};
use sieve_core::{FilterSet, FilterSetCounts, HidingTarget, RequestContext, RequestFilterEngine};

use crate::config::Settings;
use crate::error::{Result, ServiceError};
use crate::source::{FileSource, FilterListSource};

const LOCAL_RULES: &str = "local rules";

/// Lines of the last successful read, per source name.
type LineCache = HashMap<String, Vec<String>>;

/// Owner of the active rules.
///
/// Readers evaluate requests and documents against whatever `FilterSet` is
/// published at the moment of the call. Writers build a complete new set and
/// swap it in, so a reader never sees a half-loaded set. Writers run one at a
/// time.
pub struct FilterService {
    active: ArcSwap<FilterSet>,
    settings: ArcSwap<Settings>,
    /// Held for the whole of every write.
    writer: Mutex<LineCache>,
}

impl FilterService {
    /// A service with no rules loaded yet.
    pub fn new(settings: Settings) -> Self {
        Self::with_filter_set(settings, FilterSet::new())
    }

    pub fn with_filter_set(settings: Settings, set: FilterSet) -> Self {
        Self {
            active: ArcSwap::new(set.into()),
            settings: ArcSwap::new(settings.into()),
            writer: Mutex::new(LineCache::new()),
        }
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    pub fn update_settings(&self, settings: Settings) {
        self.settings.store(settings.into());
    }

    /// The currently published set.
    pub fn filter_set(&self) -> Arc<FilterSet> {
        self.active.load_full()
    }

    pub fn counts(&self) -> FilterSetCounts {
        self.active.load().counts()
    }

    fn lock_writer(&self) -> MutexGuard<'_, LineCache> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Rebuild from the enabled subscriptions and the local rule file.
    pub fn reload(&self) -> Result<BuildStats> {
        let mut cache = self.lock_writer();
        self.reload_configured(&mut cache)
    }

    /// Build a new set from `sources` and publish it.
    ///
    /// A source that cannot be read falls back to the lines of its last
    /// successful read, or contributes nothing if it was never read. If
    /// every source fails that way the current set stays active and an
    /// error is returned.
    pub fn reload_from(&self, sources: &[&dyn FilterListSource]) -> Result<BuildStats> {
        let mut cache = self.lock_writer();
        self.rebuild(&mut cache, sources)
    }

    fn reload_configured(&self, cache: &mut LineCache) -> Result<BuildStats> {
        let settings = self.settings.load();
        let mut sources: Vec<FileSource> = settings
            .enabled_subscriptions()
            .map(|s| FileSource::new(s.name.as_str(), s.path.as_path()))
            .collect();
        sources.push(FileSource::optional(LOCAL_RULES, settings.local_rules.as_path()));

        let sources: Vec<&dyn FilterListSource> =
            sources.iter().map(|s| s as &dyn FilterListSource).collect();
        self.rebuild(cache, &sources)
    }

    fn rebuild(
        &self,
        cache: &mut LineCache,
        sources: &[&dyn FilterListSource],
    ) -> Result<BuildStats> {
        let mut builder = FilterSetBuilder::new();
        let mut failures = 0usize;

        for source in sources {
            let name = source.name();
            let lines = match source.read_lines() {
                Ok(lines) => {
                    cache.insert(name.to_string(), lines);
                    cache.get(name)
                }
                Err(e) if cache.contains_key(name) => {
                    warn!("reusing the last copy of '{name}': {e}");
                    cache.get(name)
                }
                Err(e) => {
                    warn!("skipping '{name}': {e}");
                    None
                }
            };
            let Some(lines) = lines else {
                failures += 1;
                continue;
            };

            let before = builder.stats().rules();
            builder.add_lines(lines);
            let added = builder.stats().rules() - before;
            debug!("'{}': {} lines, {} rules", name, lines.len(), added);
        }

        if !sources.is_empty() && failures == sources.len() {
            return Err(ServiceError::NoUsableSource { count: failures });
        }

        let (set, stats) = builder.finish();
        let counts = set.counts();
        self.active.store(Arc::new(set));
        info!(
            "published filter set: {} whitelist hosts, {} whitelist rules, \
             {} blacklist hosts, {} blacklist rules, {} hiding selectors",
            counts.whitelist_hosts,
            counts.whitelist_rules,
            counts.blacklist_hosts,
            counts.blacklist_rules,
            counts.generic_selectors + counts.domain_selectors + counts.whitelisted_selectors,
        );

        Ok(stats)
    }

    // =========================================================================
    // Custom Rules
    // =========================================================================

    /// Persist a user rule and apply it to the active set right away.
    ///
    /// The line is appended to the local rule file first. A line already in
    /// the file is not added again. Returns whether the line produced a new
    /// rule.
    pub fn add_custom_rule(&self, line: &str) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(false);
        }

        let mut cache = self.lock_writer();
        let path = self.settings.load().local_rules.clone();

        if read_rule_file(&path)?.iter().any(|stored| stored.trim() == line) {
            debug!("custom rule '{line}' already present");
            return Ok(false);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ServiceError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ServiceError::io(&path, e))?;
        writeln!(file, "{line}").map_err(|e| ServiceError::io(&path, e))?;

        if let Some(lines) = cache.get_mut(LOCAL_RULES) {
            lines.push(line.to_string());
        }

        let rule = match classify(line) {
            Ok(Some(rule)) => rule,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!("{e}");
                return Ok(false);
            }
        };

        self.active.rcu(|current| {
            let mut set = FilterSet::clone(current);
            insert_rule(&mut set, rule.clone());
            set
        });
        debug!("added custom rule '{line}'");

        Ok(true)
    }

    /// Delete a user rule from the local rule file and reload.
    ///
    /// Returns false when the line was not in the file.
    pub fn remove_custom_rule(&self, line: &str) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(false);
        }

        let mut cache = self.lock_writer();
        let path = self.settings.load().local_rules.clone();

        let stored = read_rule_file(&path)?;
        let kept: Vec<&str> = stored
            .iter()
            .map(String::as_str)
            .filter(|stored| stored.trim() != line)
            .collect();
        if kept.len() == stored.len() {
            return Ok(false);
        }

        let mut text = kept.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        fs::write(&path, text).map_err(|e| ServiceError::io(&path, e))?;
        debug!("removed custom rule '{line}'");

        self.reload_configured(&mut cache)?;
        Ok(true)
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Should a request to `url`, made from a document on `top_level_host`,
    /// be aborted?
    pub fn should_block(&self, url: &str, top_level_host: &str, referer: &str) -> bool {
        let settings = self.settings.load();
        if settings.is_trusted(top_level_host) {
            return false;
        }

        let set = self.active.load();
        let mut engine = RequestFilterEngine::new(&set);
        engine.set_enabled(settings.enabled);

        let ctx = RequestContext::new(url, top_level_host)
            .with_referer(referer)
            .with_exempt_referers(&settings.exempt_referers);
        let result = engine.match_request(&ctx);
        if result.is_blocked() {
            debug!("blocked {url} ({:?})", result.source);
        }
        result.is_blocked()
    }

    /// Selectors to hide on a document at `host`, honoring the settings.
    pub fn selectors_to_hide_for(&self, host: &str) -> Vec<String> {
        if !self.hiding_active(host) {
            return Vec::new();
        }
        self.active
            .load()
            .selectors_to_hide_for(host)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Remove hidden elements from a loaded document. Returns the number of
    /// elements removed.
    pub fn apply_hiding<T: HidingTarget>(&self, document: &mut T, host: &str) -> usize {
        if !self.hiding_active(host) {
            return 0;
        }
        self.active.load().hiding().apply(document, host)
    }

    fn hiding_active(&self, host: &str) -> bool {
        let settings = self.settings.load();
        settings.enabled && settings.hide_elements && !settings.is_trusted(host)
    }
}

/// Lines of the local rule file; a missing file holds no rules.
fn read_rule_file(path: &Path) -> Result<Vec<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(ServiceError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TextSource;

    fn service_with(text: &str) -> FilterService {
        let service = FilterService::new(Settings::default());
        let source = TextSource::new("test", text);
        service.reload_from(&[&source]).unwrap();
        service
    }

    #[test]
    fn test_disabled_settings() {
        let service = service_with("||ads.example.com^\n##.ad");
        assert!(service.should_block("https://ads.example.com/", "", ""));
        assert_eq!(service.selectors_to_hide_for("example.com"), vec![".ad"]);

        service.update_settings(Settings {
            enabled: false,
            ..Settings::default()
        });
        assert!(!service.should_block("https://ads.example.com/", "", ""));
        assert!(service.selectors_to_hide_for("example.com").is_empty());
    }

    #[test]
    fn test_hide_elements_switch() {
        let service = service_with("||ads.example.com^\n##.ad");
        service.update_settings(Settings {
            hide_elements: false,
            ..Settings::default()
        });
        assert!(service.should_block("https://ads.example.com/", "", ""));
        assert!(service.selectors_to_hide_for("example.com").is_empty());
    }

    #[test]
    fn test_trusted_host_bypasses_filtering() {
        let service = service_with("||ads.example.com^\n##.ad");
        service.update_settings(Settings {
            trusted_hosts: vec!["bank.example".to_string()],
            ..Settings::default()
        });
        assert!(!service.should_block("https://ads.example.com/", "login.bank.example", ""));
        assert!(service.should_block("https://ads.example.com/", "news.example", ""));
        assert!(service.selectors_to_hide_for("bank.example").is_empty());
    }

    #[test]
    fn test_exempt_referers_from_settings() {
        let service = service_with("||ads.example.com^");
        service.update_settings(Settings {
            exempt_referers: vec!["intranet.local".to_string()],
            ..Settings::default()
        });
        let url = "https://ads.example.com/";
        assert!(!service.should_block(url, "intranet.local", "http://intranet.local/"));
        assert!(service.should_block(url, "news.example", "https://news.example/"));
    }

    #[test]
    fn test_failed_reload_keeps_active_set() {
        let service = service_with("||ads.example.com^");
        let missing = FileSource::new("missing", "/nonexistent/sieve/list.txt");

        let err = service.reload_from(&[&missing]).unwrap_err();
        assert!(matches!(err, ServiceError::NoUsableSource { count: 1 }));
        assert!(service.should_block("https://ads.example.com/", "", ""));
    }

    #[test]
    fn test_partial_reload_replaces_set() {
        let service = service_with("||ads.example.com^");
        let missing = FileSource::new("missing", "/nonexistent/sieve/list.txt");
        let fresh = TextSource::new("fresh", "||tracker.example.net^");

        let stats = service.reload_from(&[&missing, &fresh]).unwrap();
        assert_eq!(stats.blacklist_hosts, 1);
        assert!(!service.should_block("https://ads.example.com/", "", ""));
        assert!(service.should_block("https://tracker.example.net/", "", ""));
    }

    #[test]
    fn test_unreadable_source_reuses_last_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("easylist.txt");
        fs::write(&path, "||ads.example.com^\n").unwrap();
        let list = FileSource::new("easylist", &path);
        let local = FileSource::optional(LOCAL_RULES, dir.path().join("local.txt"));

        let service = FilterService::new(Settings::default());
        service.reload_from(&[&list, &local]).unwrap();
        fs::remove_file(&path).unwrap();

        let stats = service.reload_from(&[&list, &local]).unwrap();
        assert_eq!(stats.blacklist_hosts, 1);
        assert!(service.should_block("https://ads.example.com/", "", ""));
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let service = service_with("||ads.example.com^");
        let before = service.filter_set();

        service.reload_from(&[&TextSource::new("empty", "")]).unwrap();

        assert_eq!(before.counts().blacklist_hosts, 1);
        assert_eq!(service.counts().blacklist_hosts, 0);
    }
}
