//! Sieve CLI
//!
//! CLI tool for checking filter lists against URLs and sites.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use sieve_compiler::BuildStats;
use sieve_core::url::host_of;
use sieve_core::{RequestContext, RequestFilterEngine};
use sieve_service::{FileSource, FilterListSource, FilterService, Settings};

#[derive(Parser)]
#[command(name = "sieve-cli")]
#[command(about = "Sieve content filter tools")]
struct Cli {
    /// Log rule loading and matching details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether a request would be blocked
    Check {
        /// Filter list files
        #[arg(short, long, required = true)]
        list: Vec<PathBuf>,

        /// Request URL
        #[arg(short, long)]
        url: String,

        /// Host (or URL) of the page making the request
        #[arg(short, long, default_value = "")]
        site: String,

        /// Referer header value
        #[arg(short, long, default_value = "")]
        referer: String,
    },

    /// Print the selectors hidden on a site
    Hide {
        /// Filter list files
        #[arg(short, long, required = true)]
        list: Vec<PathBuf>,

        /// Document host or URL
        #[arg(long)]
        host: String,
    },

    /// Summarize what a set of filter lists loads into
    Stats {
        /// Filter list files
        #[arg(short, long, required = true)]
        list: Vec<PathBuf>,

        /// Print the counters as JSON
        #[arg(long)]
        json: bool,
    },

    /// Append a rule to the local rule file
    AddRule {
        /// Settings file
        #[arg(short, long, default_value = "sieve.toml")]
        config: PathBuf,

        /// Filter line to add
        rule: String,
    },

    /// Delete a rule from the local rule file
    RemoveRule {
        /// Settings file
        #[arg(short, long, default_value = "sieve.toml")]
        config: PathBuf,

        /// Filter line to remove
        rule: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let result = match cli.command {
        Commands::Check {
            list,
            url,
            site,
            referer,
        } => cmd_check(&list, &url, &site, &referer),
        Commands::Hide { list, host } => cmd_hide(&list, &host),
        Commands::Stats { list, json } => cmd_stats(&list, json),
        Commands::AddRule { config, rule } => cmd_add_rule(&config, &rule),
        Commands::RemoveRule { config, rule } => cmd_remove_rule(&config, &rule),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_lists(paths: &[PathBuf]) -> Result<(FilterService, BuildStats), String> {
    let sources: Vec<FileSource> = paths
        .iter()
        .map(|path| {
            let name = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
            FileSource::new(name, path.as_path())
        })
        .collect();
    let sources: Vec<&dyn FilterListSource> =
        sources.iter().map(|s| s as &dyn FilterListSource).collect();

    let service = FilterService::new(Settings::default());
    let stats = service.reload_from(&sources).map_err(|e| e.to_string())?;
    Ok((service, stats))
}

fn cmd_check(lists: &[PathBuf], url: &str, site: &str, referer: &str) -> Result<(), String> {
    let (service, _) = load_lists(lists)?;
    let set = service.filter_set();
    let engine = RequestFilterEngine::new(&set);

    let site = host_of(site);
    let ctx = RequestContext::new(url, site).with_referer(referer);
    let result = engine.match_request(&ctx);

    let verdict = if result.is_blocked() { "BLOCK" } else { "ALLOW" };
    println!("{verdict} {url}");
    println!("  Reason:      {:?}", result.source);
    if !site.is_empty() {
        println!("  Third-party: {}", ctx.is_third_party);
    }

    Ok(())
}

fn cmd_hide(lists: &[PathBuf], host: &str) -> Result<(), String> {
    let (service, _) = load_lists(lists)?;
    for selector in service.selectors_to_hide_for(host_of(host)) {
        println!("{selector}");
    }
    Ok(())
}

fn cmd_stats(lists: &[PathBuf], json: bool) -> Result<(), String> {
    let start = Instant::now();
    let (service, stats) = load_lists(lists)?;
    let elapsed = start.elapsed();

    if json {
        let text = serde_json::to_string_pretty(&stats).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }

    let counts = service.counts();
    println!("Loaded {} filter lists", lists.len());
    println!(
        "  Lines:       {} ({} skipped, {} dropped)",
        stats.lines, stats.skipped, stats.dropped
    );
    println!("  Whitelist:   {} hosts, {} rules", counts.whitelist_hosts, counts.whitelist_rules);
    println!(
        "  Blacklist:   {} hosts, {} rules ({} never match)",
        counts.blacklist_hosts, counts.blacklist_rules, stats.null_rules
    );
    println!(
        "  Hiding:      {} generic, {} per-domain, {} exceptions",
        counts.generic_selectors, counts.domain_selectors, counts.whitelisted_selectors
    );
    println!("  Time:        {:.1}ms", elapsed.as_secs_f64() * 1000.0);

    Ok(())
}

fn load_configured(config: &Path, rule: &str) -> Result<FilterService, String> {
    if rule.trim().is_empty() {
        return Err("Empty rule".to_string());
    }

    let service = FilterService::new(Settings::load_or_default(config));
    service.reload().map_err(|e| e.to_string())?;
    Ok(service)
}

fn cmd_add_rule(config: &Path, rule: &str) -> Result<(), String> {
    let service = load_configured(config, rule)?;
    let local_rules = service.settings().local_rules.display().to_string();

    let added = service.add_custom_rule(rule).map_err(|e| e.to_string())?;
    if added {
        println!("Added '{}' to '{}'", rule.trim(), local_rules);
    } else {
        println!(
            "No new rule from '{}' (already in '{}' or not a filter)",
            rule.trim(),
            local_rules
        );
    }

    Ok(())
}

fn cmd_remove_rule(config: &Path, rule: &str) -> Result<(), String> {
    let service = load_configured(config, rule)?;
    let local_rules = service.settings().local_rules.display().to_string();

    let removed = service.remove_custom_rule(rule).map_err(|e| e.to_string())?;
    if removed {
        println!("Removed '{}' from '{}'", rule.trim(), local_rules);
    } else {
        return Err(format!("'{}' is not in '{}'", rule.trim(), local_rules));
    }

    Ok(())
}
