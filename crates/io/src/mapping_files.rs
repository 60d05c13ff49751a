// LID mapping files written by the bot's WhatsApp session

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::trace;

use lidsweep_identity::{LookupError, MappingLookup};

/// Reads `lid-mapping-<lid>_reverse.json` from a session directory.
///
/// Each file holds a single JSON value: the phone number for that LID, as a
/// string or (from older sessions) a bare number.
#[derive(Debug, Clone)]
pub struct SessionDirMapping {
    dir: PathBuf,
}

impl SessionDirMapping {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_for(&self, local_id: &str) -> PathBuf {
        self.dir.join(format!("lid-mapping-{local_id}_reverse.json"))
    }
}

fn parse_entry(local_id: &str, raw: &str) -> Result<Option<String>, LookupError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| LookupError::Parse {
        lid: local_id.to_string(),
        message: e.to_string(),
    })?;
    match value {
        Value::String(s) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Null => Ok(None),
        other => Err(LookupError::Parse {
            lid: local_id.to_string(),
            message: format!("expected a string, got {other}"),
        }),
    }
}

impl MappingLookup for SessionDirMapping {
    fn lookup(&self, local_id: &str) -> Result<Option<String>, LookupError> {
        if local_id.is_empty()
            || local_id.contains(['/', '\\'])
            || local_id.contains("..")
        {
            return Err(LookupError::Parse {
                lid: local_id.to_string(),
                message: "not a valid file name".into(),
            });
        }

        let path = self.file_for(local_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(path = %path.display(), "no mapping file");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        parse_entry(local_id, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, lid: &str, body: &str) {
        fs::write(dir.join(format!("lid-mapping-{lid}_reverse.json")), body).unwrap();
    }

    #[test]
    fn test_string_entry() {
        let dir = tempdir().unwrap();
        write(dir.path(), "555111", "\"15551234567\"");

        let mapping = SessionDirMapping::new(dir.path());
        assert_eq!(mapping.dir(), dir.path());
        assert_eq!(mapping.lookup("555111").unwrap(), Some("15551234567".to_string()));
    }

    #[test]
    fn test_numeric_entry() {
        let dir = tempdir().unwrap();
        write(dir.path(), "42", "15550001111\n");

        let mapping = SessionDirMapping::new(dir.path());
        assert_eq!(mapping.lookup("42").unwrap(), Some("15550001111".to_string()));
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let mapping = SessionDirMapping::new(dir.path());
        assert_eq!(mapping.lookup("999").unwrap(), None);
    }

    #[test]
    fn test_missing_directory_is_none() {
        let dir = tempdir().unwrap();
        let mapping = SessionDirMapping::new(dir.path().join("gone"));
        assert_eq!(mapping.lookup("999").unwrap(), None);
    }

    #[test]
    fn test_empty_or_null_entry_is_none() {
        let dir = tempdir().unwrap();
        write(dir.path(), "1", "\"\"");
        write(dir.path(), "2", "null");

        let mapping = SessionDirMapping::new(dir.path());
        assert_eq!(mapping.lookup("1").unwrap(), None);
        assert_eq!(mapping.lookup("2").unwrap(), None);
    }

    #[test]
    fn test_malformed_entry_is_error() {
        let dir = tempdir().unwrap();
        write(dir.path(), "3", "{\"phone\": ");
        write(dir.path(), "4", "[1, 2]");

        let mapping = SessionDirMapping::new(dir.path());
        assert!(matches!(mapping.lookup("3"), Err(LookupError::Parse { .. })));
        assert!(matches!(mapping.lookup("4"), Err(LookupError::Parse { .. })));
    }

    #[test]
    fn test_path_like_lid_rejected() {
        let dir = tempdir().unwrap();
        let mapping = SessionDirMapping::new(dir.path());
        assert!(mapping.lookup("../etc").is_err());
        assert!(mapping.lookup("a/b").is_err());
        assert!(mapping.lookup("").is_err());
    }
}
