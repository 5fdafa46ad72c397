//! JSON output formatting and writing.

use std::io::Write;
use std::path::Path;

/// Serialize a value as JSON, pretty-printed unless compact output is requested.
pub fn to_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<String, String> {
    let result = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    result.map_err(|e| format!("Failed to serialize results: {}", e))
}

/// Write a JSON document to the given path, or to stdout with a trailing newline.
pub fn write_output(json: &str, output_path: Option<&str>) -> Result<(), String> {
    match output_path {
        Some(path) => std::fs::write(Path::new(path), json)
            .map_err(|e| format!("Failed to write output file '{}': {}", path, e)),
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(json.as_bytes())
                .and_then(|_| handle.write_all(b"\n"))
                .map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Sample {
        name: &'static str,
        count: usize,
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&Sample { name: "dt", count: 3 }, false).unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("\"count\": 3"));
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&Sample { name: "dt", count: 3 }, true).unwrap();
        assert!(!json.contains('\n'));
        assert_eq!(json, r#"{"name":"dt","count":3}"#);
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        write_output("{\"ok\":true}", path.to_str()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"ok\":true}");
    }
}
