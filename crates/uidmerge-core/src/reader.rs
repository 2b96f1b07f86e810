use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use serde_json::Value;
use uidmerge_store::Record;

use crate::error::{MergeError, MergeResult};

/// Lazy reader over a JSONL file, yielding one [`Record`] per non-blank line.
///
/// Each line is stripped of surrounding whitespace, parsed as a single JSON
/// value, and keyed by the string form of its identifier field. The yielded
/// `line` is the stripped original text, not a re-serialization.
///
/// Line numbers in errors are 1-based and count every physical line,
/// blank ones included. The reader stops after the first error.
/// Re-opening the same path restarts the sequence from the top.
pub struct JsonlReader {
    path: PathBuf,
    file_name: String,
    key_field: String,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    done: bool,
}

impl JsonlReader {
    /// Open `path`, keying records by `key_field`.
    pub fn open(path: &Path, key_field: &str) -> MergeResult<Self> {
        let file = File::open(path).map_err(|e| MergeError::io(path, e))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            key_field: key_field.to_owned(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
            done: false,
        })
    }

    /// Physical line number of the last line read (0 before the first).
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    fn parse_line(&self, text: &str) -> MergeResult<Record> {
        let value: Value = serde_json::from_str(text).map_err(|source| MergeError::Parse {
            file: self.file_name.clone(),
            line: self.line_no,
            source,
        })?;

        let uid = value
            .as_object()
            .and_then(|object| object.get(&self.key_field))
            .map(coerce_uid)
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| MergeError::MissingKey {
                file: self.file_name.clone(),
                line: self.line_no,
                key: self.key_field.clone(),
            })?;

        Ok(Record::new(uid, text))
    }
}

impl Iterator for JsonlReader {
    type Item = MergeResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.done = true;
                    return Some(Err(MergeError::io(&self.path, e)));
                }
            };
            self.line_no += 1;

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            let result = self.parse_line(text);
            if result.is_err() {
                self.done = true;
            }
            return Some(result);
        }
    }
}

impl FusedIterator for JsonlReader {}

/// String form of an identifier value.
///
/// Strings contribute their contents; every other JSON value contributes its
/// compact JSON text. `1` and `"1"` therefore name the same record. Values
/// keep their JSON spelling rather than any host-language rendering:
/// `true` stays `"true"` and `null` stays `"null"`, so `true` collides with
/// `"true"` but not with `"True"`. Floats use serde_json's shortest
/// round-trip form, so `1e20` does not collide with `"1e+20"`.
pub fn coerce_uid(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn read_all(path: &Path) -> MergeResult<Vec<Record>> {
        JsonlReader::open(path, "uid")?.collect()
    }

    // -----------------------------------------------------------------------
    // Record extraction
    // -----------------------------------------------------------------------

    #[test]
    fn yields_uid_and_stripped_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "a.jsonl",
            b"  {\"v\": \"x  y\", \"uid\": 1}  \n{\"uid\":\"b\"}\n",
        );

        let records = read_all(&path).unwrap();
        assert_eq!(
            records,
            vec![
                Record::new("1", r#"{"v": "x  y", "uid": 1}"#),
                Record::new("b", r#"{"uid":"b"}"#),
            ]
        );
    }

    #[test]
    fn skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.jsonl", b"\n   \n{\"uid\":1}\n\t\n{\"uid\":2}");
        let records = read_all(&path).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn handles_crlf_line_endings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.jsonl", b"{\"uid\":1}\r\n{\"uid\":2}\r\n");
        let records = read_all(&path).unwrap();
        assert_eq!(records[0].line, r#"{"uid":1}"#);
        assert_eq!(records[1].line, r#"{"uid":2}"#);
    }

    #[test]
    fn empty_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "empty.jsonl", b"");
        assert!(read_all(&path).unwrap().is_empty());
    }

    #[test]
    fn custom_key_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.jsonl", b"{\"id\":42,\"uid\":1}\n");
        let records: Vec<Record> = JsonlReader::open(&path, "id")
            .unwrap()
            .collect::<MergeResult<_>>()
            .unwrap();
        assert_eq!(records[0].uid, "42");
    }

    #[test]
    fn reopen_restarts_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.jsonl", b"{\"uid\":1}\n{\"uid\":2}\n");

        let mut first = JsonlReader::open(&path, "uid").unwrap();
        assert_eq!(first.next().unwrap().unwrap().uid, "1");

        let again = read_all(&path).unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(again[0].uid, "1");
    }

    // -----------------------------------------------------------------------
    // Identifier coercion
    // -----------------------------------------------------------------------

    #[test]
    fn numeric_and_string_uids_coerce_equal() {
        assert_eq!(coerce_uid(&json!(1)), coerce_uid(&json!("1")));
    }

    #[test]
    fn coerce_non_string_values() {
        assert_eq!(coerce_uid(&json!(1.5)), "1.5");
        assert_eq!(coerce_uid(&json!(-3)), "-3");
        assert_eq!(coerce_uid(&json!(true)), "true");
        assert_eq!(coerce_uid(&json!(null)), "null");
        assert_eq!(coerce_uid(&json!([1, 2])), "[1,2]");
        assert_ne!(coerce_uid(&json!(1e20)), "1e+20");
        assert_ne!(coerce_uid(&json!(true)), "True");
    }

    #[test]
    fn string_uid_is_not_quoted() {
        assert_eq!(coerce_uid(&json!("abc")), "abc");
    }

    // -----------------------------------------------------------------------
    // Errors
    // -----------------------------------------------------------------------

    #[test]
    fn invalid_json_reports_physical_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bad.jsonl", b"{\"uid\":1}\n\n{not json}\n");

        let err = read_all(&path).unwrap_err();
        match err {
            MergeError::Parse { file, line, .. } => {
                assert_eq!(file, "bad.jsonl");
                assert_eq!(line, 3);
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn trailing_content_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bad.jsonl", b"{\"uid\":1} {\"uid\":2}\n");
        assert!(matches!(read_all(&path), Err(MergeError::Parse { line: 1, .. })));
    }

    #[test]
    fn missing_uid_counts_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "b.jsonl",
            b"{\"uid\":1}\n\n   \n{\"id\":2}\n",
        );

        let err = read_all(&path).unwrap_err();
        match &err {
            MergeError::MissingKey { file, line, key } => {
                assert_eq!(file, "b.jsonl");
                assert_eq!(*line, 4);
                assert_eq!(key, "uid");
            }
            other => panic!("expected MissingKey, got {other:?}"),
        }
        assert_eq!(err.to_string(), "b.jsonl: missing uid at line 4");
    }

    #[test]
    fn non_object_value_is_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.jsonl", b"[\"uid\"]\n");
        assert!(matches!(read_all(&path), Err(MergeError::MissingKey { line: 1, .. })));
    }

    #[test]
    fn empty_string_uid_is_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.jsonl", b"{\"uid\":\"\"}\n");
        assert!(matches!(read_all(&path), Err(MergeError::MissingKey { .. })));
    }

    #[test]
    fn reader_is_fused_after_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.jsonl", b"oops\n{\"uid\":1}\n");

        let mut reader = JsonlReader::open(&path, "uid").unwrap();
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
        assert_eq!(reader.line_number(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.jsonl");
        assert!(matches!(
            JsonlReader::open(&path, "uid"),
            Err(MergeError::Io { .. })
        ));
    }

    #[test]
    fn non_utf8_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "latin1.jsonl", b"{\"uid\":\"\xff\"}\n");
        assert!(matches!(read_all(&path), Err(MergeError::Io { .. })));
    }
}
