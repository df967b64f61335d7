use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: malformed JSON line: {source}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a JSON-lines file. Blank lines are skipped; line numbers in errors
/// are 1-based.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, JsonlError> {
    let content = std::fs::read_to_string(path).map_err(|source| JsonlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(line).map_err(|source| JsonlError::Malformed {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        out.push(item);
    }
    Ok(out)
}

/// Serialize `items` one per line, newline-terminated, and write atomically.
pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> anyhow::Result<()> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    crate::write_atomic(path, out.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn skips_blank_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("x.jsonl");
        std::fs::write(&path, "{\"a\":1}\n\n{\"a\":2}\r\n").unwrap();
        let rows: Vec<Value> = read_jsonl(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["a"], 2);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("x.jsonl");
        std::fs::write(&path, "{\"a\":1}\nnot json\n").unwrap();
        let err = read_jsonl::<Value>(&path).unwrap_err();
        assert!(matches!(err, JsonlError::Malformed { line: 2, .. }));
        assert!(err.to_string().contains(":2: malformed"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_jsonl::<Value>(&tmp.path().join("none.jsonl")).unwrap_err();
        assert!(matches!(err, JsonlError::Io { .. }));
    }

    #[test]
    fn write_then_read() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.jsonl");
        write_jsonl(&path, &[serde_json::json!({"k": "v"})]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"k\":\"v\"}\n");
        let empty: [Value; 0] = [];
        write_jsonl(&path, &empty).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
