//! `lidsweep clean|migrate|dedupe|run` and `lidsweep validate`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::{debug, info, warn};

use lidsweep_identity::model::GroupAction;
use lidsweep_identity::sink::ReportSink;
use lidsweep_identity::{
    sweep, IdentityResolver, StoreError, SweepConfig, SweepOptions, SweepPass, SweepReport,
    SweepSummary,
};
use lidsweep_io::{write_json, JsonSink, SessionDirMapping, SqliteContactStore};

use crate::exit_codes::{EXIT_RECORD_ERRORS, EXIT_STORAGE_UNAVAILABLE};
use crate::CliError;

#[derive(Args)]
pub struct SweepArgs {
    /// Path to a sweep .toml config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Contact database file (overrides config)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Directory holding lid-mapping-*_reverse.json files (overrides config)
    #[arg(long, env = "SESSION_PATH")]
    pub session_path: Option<PathBuf>,

    /// Decide everything, write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Output report JSON to stdout instead of only the human summary
    #[arg(long)]
    pub json: bool,

    /// Write report JSON to file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lidsweep").join("sweep.toml"))
}

fn read_config(path: &Path) -> Result<SweepConfig, CliError> {
    let text = fs::read_to_string(path).map_err(|e| {
        CliError::usage(format!("cannot read config {}: {e}", path.display()))
    })?;
    let config = SweepConfig::from_toml(&text).map_err(|e| {
        CliError::config(format!("{}: {e}", path.display()))
    })?;

    // Resolve file paths relative to config file's directory
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.rebase(base_dir))
}

/// `--config`, else the per-user config file if present, else defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<SweepConfig, CliError> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    match default_config_path().filter(|p| p.is_file()) {
        Some(path) => {
            debug!(path = %path.display(), "using user config");
            read_config(&path)
        }
        None => {
            debug!("no config file, using defaults");
            Ok(SweepConfig::default())
        }
    }
}

fn effective_config(args: &SweepArgs, pass: Option<SweepPass>) -> Result<SweepConfig, CliError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(database) = &args.database {
        config.database = database.clone();
    }
    if let Some(session_path) = &args.session_path {
        config.session_path = session_path.clone();
    }
    if let Some(pass) = pass {
        config.pass = pass;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    config.validate().map_err(|e| CliError::config(e.to_string()))?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

fn storage_err(e: impl std::fmt::Display) -> CliError {
    CliError::new(EXIT_STORAGE_UNAVAILABLE, e.to_string())
}

pub fn cmd_sweep(args: SweepArgs, pass: Option<SweepPass>) -> Result<(), CliError> {
    let config = effective_config(&args, pass)?;
    info!(
        database = %config.database.display(),
        session_path = %config.session_path.display(),
        pass = %config.pass,
        dry_run = config.dry_run,
        "starting sweep"
    );

    let mut store = SqliteContactStore::open(&config.database).map_err(|e| match e {
        StoreError::Unavailable(_) => storage_err(e).with_hint("check --database or `database` in the config"),
        other => storage_err(other),
    })?;
    let resolver = IdentityResolver::new(SessionDirMapping::new(&config.session_path));
    if !resolver.mapping().dir().is_dir() {
        warn!(
            dir = %resolver.mapping().dir().display(),
            "session directory not found, every LID will fall back to itself"
        );
    }

    let report = sweep(&mut store, &resolver, SweepOptions::from(&config)).map_err(storage_err)?;

    if let Some(ref path) = args.output {
        write_json(&report, path).map_err(|e| CliError::general(e.to_string()))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        JsonSink::new(io::stdout().lock())
            .emit(&report)
            .map_err(|e| CliError::general(e.to_string()))?;
    }

    // Human summary to stderr
    HumanSink::new(io::stderr().lock())
        .emit(&report)
        .map_err(|e| CliError::general(e.to_string()))?;

    if !config.dry_run && config.sample_size > 0 {
        match store.sample(config.sample_size) {
            Ok(sample) => {
                eprintln!("sample:");
                for record in sample {
                    eprintln!("  #{:<6} {:<24} {}", record.id, record.display_name, record.identity_value);
                }
            }
            Err(e) => warn!(error = %e, "cannot read sample"),
        }
    }

    exit_for(&report.summary)
}

fn exit_for(summary: &SweepSummary) -> Result<(), CliError> {
    if summary.errors > 0 {
        return Err(CliError::new(
            EXIT_RECORD_ERRORS,
            format!("{} record operation(s) failed", summary.errors),
        )
        .with_hint("see the report for the failing records; re-running the sweep is safe"));
    }
    Ok(())
}

/// Plain-text summary for a terminal.
pub struct HumanSink<W: Write> {
    out: W,
}

impl<W: Write> HumanSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ReportSink for HumanSink<W> {
    type Error = io::Error;

    fn emit(&mut self, report: &SweepReport) -> io::Result<()> {
        let s = &report.summary;
        let mode = if report.meta.dry_run { " (dry run)" } else { "" };
        writeln!(
            self.out,
            "{} pass{}: {} contacts in {} identities",
            report.meta.pass,
            mode,
            s.total,
            report.groups.len(),
        )?;

        for group in report.changes() {
            match &group.action {
                GroupAction::AlreadyClean => {}
                GroupAction::Migrated { from, to } => {
                    writeln!(self.out, "  migrated  #{} {from} -> {to}", group.keeper_id)?;
                }
                GroupAction::Merged { kept, removed, keeper_migrated } => {
                    let ids: Vec<String> = removed.iter().map(|r| format!("#{}", r.id)).collect();
                    let note = if *keeper_migrated { ", keeper rewritten" } else { "" };
                    writeln!(
                        self.out,
                        "  merged    {} kept #{}, removed {}{note}",
                        group.canonical,
                        kept.id,
                        if ids.is_empty() { "none".to_string() } else { ids.join(" ") },
                    )?;
                }
                GroupAction::Skipped { reason } => {
                    writeln!(self.out, "  skipped   {} ({reason})", group.canonical)?;
                }
            }
            for err in &group.errors {
                writeln!(
                    self.out,
                    "  error     #{} {}: {}",
                    err.record_id, err.operation, err.message
                )?;
            }
        }

        writeln!(
            self.out,
            "{} migrated, {} duplicates removed, {} already clean, {} skipped, {} errors",
            s.migrated, s.duplicates_removed, s.already_clean, s.skipped, s.errors,
        )?;
        if s.degraded > 0 {
            writeln!(
                self.out,
                "{} identities resolved without a LID mapping (LID kept as number)",
                s.degraded
            )?;
        }
        if let Some(n) = s.final_count {
            writeln!(self.out, "contacts remaining: {n}")?;
        }
        self.out.flush()
    }
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf, json: bool) -> Result<(), CliError> {
    let config = read_config(&config_path)?;

    if json {
        let json_str = serde_json::to_string_pretty(&config)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    eprintln!(
        "valid: {} pass on {} (mappings in {}){}",
        config.pass,
        config.database.display(),
        config.session_path.display(),
        if config.dry_run { ", dry run" } else { "" },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lidsweep_identity::{MemoryMapping, MemoryStore};

    #[test]
    fn test_record_errors_exit_code() {
        let ok = SweepSummary { total: 3, migrated: 1, ..SweepSummary::default() };
        assert!(exit_for(&ok).is_ok());

        let failed = SweepSummary { total: 3, errors: 2, ..SweepSummary::default() };
        let err = exit_for(&failed).unwrap_err();
        assert_eq!(err.code, EXIT_RECORD_ERRORS);
        assert!(err.message.contains('2'));
    }

    #[test]
    fn test_human_sink_lists_changes() {
        let mut store = MemoryStore::new();
        let ts = chrono::Utc::now();
        store.insert("Ana", "555111@lid", ts);
        store.insert("Ana", "15551234567", ts);
        store.insert("Bo", "999@lid", ts);
        store.fail_updates_for(3);
        let resolver = IdentityResolver::new(MemoryMapping::new().with_entry("555111", "15551234567"));
        let report = sweep(&mut store, &resolver, SweepOptions::default()).unwrap();

        let mut sink = HumanSink::new(Vec::new());
        sink.emit(&report).unwrap();
        let text = String::from_utf8(sink.out).unwrap();

        assert!(text.starts_with("full pass: 3 contacts in 2 identities"));
        assert!(text.contains("merged    15551234567 kept #2, removed #1"));
        assert!(text.contains("error     #3 update"));
        assert!(text.contains("1 duplicates removed"));
        assert!(text.contains("1 identities resolved without a LID mapping"));
        assert!(text.contains("contacts remaining: 2"));
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.toml");
        fs::write(&path, "database = \"bot.db\"\npass = \"migrate\"\n").unwrap();

        let args = SweepArgs {
            config: Some(path),
            database: None,
            session_path: Some(PathBuf::from("/srv/sessions")),
            dry_run: true,
            json: false,
            output: None,
        };
        let config = effective_config(&args, None).unwrap();
        assert_eq!(config.database, dir.path().join("bot.db"));
        assert_eq!(config.session_path, PathBuf::from("/srv/sessions"));
        assert_eq!(config.pass, SweepPass::Migrate);
        assert!(config.dry_run);

        let config = effective_config(&args, Some(SweepPass::Dedupe)).unwrap();
        assert_eq!(config.pass, SweepPass::Dedupe);
    }

    #[test]
    fn test_bad_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.toml");
        fs::write(&path, "databse = \"typo.db\"\n").unwrap();

        let err = read_config(&path).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_CONFIG_INVALID);

        let missing = read_config(&dir.path().join("nope.toml")).unwrap_err();
        assert_eq!(missing.code, crate::exit_codes::EXIT_USAGE);
    }
}
