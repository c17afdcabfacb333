//! Builtin ids first, then JSON suite files on disk.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use super::builtin::builtin_suite;
use super::SuiteLoader;
use crate::domain::{BenchError, Result, Scenario, Suite};

/// Resolves builtin suite ids, then falls back to JSON files.
///
/// A suite file holds either a full suite object (`id`, `name`,
/// `scenarios`) or a bare array of scenarios, in which case the suite id
/// and name default to the file stem.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardSuiteLoader;

impl StandardSuiteLoader {
    pub fn new() -> Self {
        Self
    }
}

/// Parse suite file contents.
pub fn parse_suite_file(path: &Path, contents: &str) -> Result<Suite> {
    let invalid = |reason: String| BenchError::InvalidSuite {
        source_name: path.display().to_string(),
        reason,
    };
    let raw: Value = serde_json::from_str(contents).map_err(|e| invalid(e.to_string()))?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match raw {
        Value::Array(_) => {
            let scenarios: Vec<Scenario> =
                serde_json::from_value(raw).map_err(|e| invalid(e.to_string()))?;
            let mut suite = Suite::new(stem.as_str(), stem.as_str());
            suite.scenarios = scenarios;
            Ok(suite)
        }
        Value::Object(mut obj) => {
            obj.entry("id").or_insert_with(|| Value::String(stem.clone()));
            obj.entry("name").or_insert_with(|| Value::String(stem.clone()));
            serde_json::from_value(Value::Object(obj)).map_err(|e| invalid(e.to_string()))
        }
        _ => Err(invalid(
            "expected a suite object or an array of scenarios".to_string(),
        )),
    }
}

#[async_trait]
impl SuiteLoader for StandardSuiteLoader {
    async fn load_suite(&self, id_or_path: &str) -> Result<Suite> {
        let suite = match builtin_suite(id_or_path) {
            Some(suite) => suite,
            None => {
                let path = Path::new(id_or_path);
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Err(BenchError::UnknownSuite(id_or_path.to_string()));
                }
                debug!(path = %path.display(), "loading suite file");
                let contents = tokio::fs::read_to_string(path).await?;
                parse_suite_file(path, &contents)?
            }
        };
        suite.validate()?;
        Ok(suite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn resolves_builtin_toy() {
        let suite = StandardSuiteLoader.load_suite("toy").await.unwrap();
        assert_eq!(suite.id.as_str(), "toy");
        assert_eq!(suite.name, "Toy Suite");
        assert!(suite.scenarios.iter().all(|s| !s.prompt.is_empty()));
    }

    #[tokio::test]
    async fn unknown_suite_names_identifier() {
        let err = StandardSuiteLoader.load_suite("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown suite \"nope\"");
    }

    #[tokio::test]
    async fn loads_suite_object_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"id": "disk", "name": "Disk", "scenarios": [{{"id": "d-1", "prompt": "Return exactly: x", "expected": "x"}}]}}"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let suite = StandardSuiteLoader.load_suite(&path).await.unwrap();
        assert_eq!(suite.id.as_str(), "disk");
        assert_eq!(suite.scenarios[0].expected_text(), "x");
    }

    #[tokio::test]
    async fn bare_array_takes_id_from_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smoke.json");
        std::fs::write(&path, r#"[{"id": "s-1", "prompt": "p"}, {"id": "s-2", "prompt": "q"}]"#)
            .unwrap();

        let suite = StandardSuiteLoader
            .load_suite(&path.to_string_lossy())
            .await
            .unwrap();
        assert_eq!(suite.id.as_str(), "smoke");
        assert_eq!(suite.len(), 2);
    }

    #[tokio::test]
    async fn malformed_file_is_invalid_suite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = StandardSuiteLoader
            .load_suite(&path.to_string_lossy())
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::InvalidSuite { .. }));
    }

    #[test]
    fn scalar_file_is_rejected() {
        let err = parse_suite_file(Path::new("x.json"), "42").unwrap_err();
        assert!(err.to_string().contains("expected a suite object"));
    }
}
