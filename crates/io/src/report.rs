// JSON export of sweep reports

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use lidsweep_identity::sink::ReportSink;
use lidsweep_identity::SweepReport;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `report` as pretty JSON to `path`, replacing any existing file.
pub fn write_json(report: &SweepReport, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Sink that pretty-prints each report to any writer (stdout in the CLI).
pub struct JsonSink<W: Write> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    type Error = ExportError;

    fn emit(&mut self, report: &SweepReport) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(&mut self.out, report)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lidsweep_identity::{sweep, IdentityResolver, MemoryMapping, MemoryStore, SweepOptions};
    use std::fs;
    use tempfile::tempdir;

    fn report() -> SweepReport {
        let mut store = MemoryStore::new();
        let at = Utc.with_ymd_and_hms(2020, 3, 1, 12, 0, 0).unwrap();
        store.insert("Ana", "555111@lid", at);
        store.insert("Ana", "15551234567", at);
        store.insert("Bo", "16660000000", at);
        let resolver = IdentityResolver::new(MemoryMapping::new().with_entry("555111", "15551234567"));
        sweep(&mut store, &resolver, SweepOptions::default()).unwrap()
    }

    #[test]
    fn test_write_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");

        write_json(&report(), &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["total"], 3);
        assert_eq!(value["summary"]["duplicates_removed"], 1);
        assert_eq!(value["summary"]["already_clean"], 1);
        assert_eq!(value["meta"]["pass"], "full");
        assert_eq!(value["groups"].as_array().unwrap().len(), 2);
        assert_eq!(value["groups"][0]["action"]["kind"], "merged");
    }

    #[test]
    fn test_write_json_bad_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        assert!(matches!(write_json(&report(), &path), Err(ExportError::Io(_))));
    }

    #[test]
    fn test_json_sink_to_buffer() {
        let mut sink = JsonSink::new(Vec::new());
        sink.emit(&report()).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["summary"]["final_count"], 2);
    }
}
