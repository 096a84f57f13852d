use artifact_cache::{CacheManager, PolicyConfigLoader};
use clap::Subcommand;
use eyre::WrapErr;
use serde_json::json;
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Show index size, limits and mode
    Stats,
    /// List cached artifacts, least recently used first
    List,
    /// Drop records whose artifact vanished and fix recorded sizes
    Verify,
    /// Evict artifacts until the cache fits the given limit
    Evict {
        /// Size limit in kilobytes
        #[arg(long)]
        max_size_kb: i64,
    },
    /// Remove every cached artifact
    Clear,
    /// Write the index now, adopting records written by other processes
    Flush,
}

/// Build a manager from the loaded configuration, optionally on another root
pub fn open_manager(root: Option<PathBuf>) -> eyre::Result<CacheManager> {
    let config = PolicyConfigLoader::load().wrap_err("Failed to load cache configuration")?;
    let mut builder = CacheManager::builder().with_config(config);
    if let Some(root) = root {
        builder = builder.with_root(root);
    }
    let manager = builder.build();
    tracing::debug!(
        root = %manager.root_path().display(),
        entries = manager.entry_count(),
        "Opened artifact cache"
    );
    Ok(manager)
}

impl Commands {
    /// Run the command and render its output
    pub fn execute(self, manager: &CacheManager, json: bool) -> eyre::Result<String> {
        let output = match self {
            Commands::Stats => stats(manager, json)?,
            Commands::List => list(manager, json)?,
            Commands::Verify => {
                let report = manager.verify();
                persist(manager)?;
                if json {
                    serde_json::to_string_pretty(&report)?
                } else {
                    format!(
                        "Checked {} artifacts: {} missing, {} resized, {} unreadable",
                        report.checked,
                        report.missing.len(),
                        report.resized.len(),
                        report.errors
                    )
                }
            }
            Commands::Evict { max_size_kb } => {
                manager.set_max_size_kb(max_size_kb)?;
                persist(manager)?;
                let remaining = manager.total_size_bytes();
                if json {
                    serde_json::to_string_pretty(&json!({
                        "entries": manager.entry_count(),
                        "total_bytes": remaining,
                    }))?
                } else {
                    format!(
                        "✓ {} artifacts remain ({})",
                        manager.entry_count(),
                        human_size(remaining)
                    )
                }
            }
            Commands::Clear => {
                let removed = manager.clear();
                persist(manager)?;
                if json {
                    serde_json::to_string_pretty(&json!({ "removed": removed }))?
                } else {
                    format!("✓ Removed {removed} artifacts")
                }
            }
            Commands::Flush => {
                manager.mark_index_stale();
                persist(manager)?;
                if json {
                    serde_json::to_string_pretty(&json!({ "entries": manager.entry_count() }))?
                } else {
                    format!("✓ Flushed index with {} entries", manager.entry_count())
                }
            }
        };
        Ok(output)
    }
}

fn persist(manager: &CacheManager) -> eyre::Result<()> {
    if manager.read_only() {
        eyre::bail!(
            "Cache root {} is read-only, changes were not saved",
            manager.root_path().display()
        );
    }
    if !manager.shutdown() {
        eyre::bail!(
            "Failed to write the index under {}",
            manager.root_path().display()
        );
    }
    Ok(())
}

fn stats(manager: &CacheManager, json: bool) -> eyre::Result<String> {
    let policy = manager.policy();
    if json {
        return Ok(serde_json::to_string_pretty(&json!({
            "root": manager.root_path(),
            "entries": manager.entry_count(),
            "total_bytes": manager.total_size_bytes(),
            "max_size_kb": policy.max_size_kb(),
            "flush_interval_secs": policy.flush_interval_secs(),
            "read_only": policy.read_only(),
            "active": policy.active(),
        }))?);
    }

    let mut out = String::new();
    writeln!(out, "Artifact cache at {}", manager.root_path().display())?;
    writeln!(out, "  Entries: {}", manager.entry_count())?;
    writeln!(
        out,
        "  Size: {} of {}",
        human_size(manager.total_size_bytes()),
        human_size(policy.max_size_bytes())
    )?;
    writeln!(out, "  Flush interval: {}s", policy.flush_interval_secs())?;
    write!(
        out,
        "  Mode: {}",
        if policy.read_only() { "read-only" } else { "read-write" }
    )?;
    Ok(out)
}

fn list(manager: &CacheManager, json: bool) -> eyre::Result<String> {
    let entries = manager.entries();
    if json {
        return Ok(serde_json::to_string_pretty(&entries)?);
    }

    let mut out = String::new();
    for record in &entries {
        writeln!(
            out,
            "{:<20} {:>10}  {}",
            record.kind.to_string(),
            human_size(record.size),
            record.key
        )?;
    }
    write!(out, "{} artifacts", entries.len())?;
    Ok(out)
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
