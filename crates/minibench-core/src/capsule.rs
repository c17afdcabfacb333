//! Time capsule: a self-contained directory snapshot of one suite run.
//!
//! Layout under `<runs_root>/<stamp>_<slug>/`:
//!
//! | file             | contents                                   |
//! |------------------|--------------------------------------------|
//! | `args.json`      | the arguments the run was launched with    |
//! | `suite.json`     | the resolved suite                         |
//! | `config.json`    | runner / evaluator selection               |
//! | `results.json`   | the full [`SuiteRunResult`]                |
//! | `summary.json`   | the [`SuiteSummary`](crate::SuiteSummary)  |
//! | `results.ndjson` | one scenario result per line               |
//! | `metadata.json`  | run metadata, when present                 |
//! | `stdout.log`     | milestone log                              |
//! | `manifest.json`  | ids, counts, versions and SHA-256 hashes   |
//!
//! `<runs_root>/latest` points at the most recent capsule.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::{Suite, SuiteRunResult};

/// Name of the pointer to the newest capsule inside the runs root.
pub const LATEST_LINK: &str = "latest";

/// `YYYYMMDDTHHMMSSZ`; sorts lexicographically in time order.
pub fn utc_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Lowercase, runs of non-alphanumerics collapsed to `-`, no edge dashes.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

pub fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Requested vs. resolved suite id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSuite {
    pub requested_id: String,
    pub actual_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestCounts {
    pub scenarios: usize,
}

/// SHA-256 of the compact JSON text of each artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestIntegrity {
    pub suite_json_sha256: String,
    pub results_json_sha256: String,
    pub summary_json_sha256: String,
    pub results_ndjson_sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleManifest {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub suite: ManifestSuite,
    pub counts: ManifestCounts,
    pub runner: String,
    pub evaluator: String,
    pub versions: BTreeMap<String, String>,
    pub integrity: ManifestIntegrity,
}

/// A capsule directory being filled in.
#[derive(Debug, Clone)]
pub struct TimeCapsule {
    runs_root: PathBuf,
    dir_name: String,
    dir: PathBuf,
}

impl TimeCapsule {
    /// Create `<runs_root>/<stamp>_<slug(suite_name)>`.
    pub fn create(runs_root: &Path, suite_name: &str, stamp: &str) -> Result<Self> {
        let dir_name = format!("{}_{}", stamp, slugify(suite_name));
        let dir = runs_root.join(&dir_name);
        std::fs::create_dir_all(&dir).with_context(|| format!("create run dir {:?}", dir))?;
        Ok(Self {
            runs_root: runs_root.to_path_buf(),
            dir_name,
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn dir_name(&self) -> &str {
        &self.dir_name
    }

    /// Persist what the run was asked to do, before it starts.
    pub fn write_inputs(&self, args: &Value, suite: &Suite, config: &Value) -> Result<()> {
        self.write_json("args.json", args)?;
        self.write_json("suite.json", suite)?;
        self.write_json("config.json", config)?;
        self.append_log("Run started")
    }

    /// Persist the outcome, write the manifest and repoint `latest`.
    pub fn write_outputs(
        &self,
        requested_suite: &str,
        suite: &Suite,
        result: &SuiteRunResult,
        runner: &str,
        evaluator: &str,
    ) -> Result<CapsuleManifest> {
        self.write_json("results.json", result)?;
        self.write_json("summary.json", &result.summary)?;

        let ndjson = render_ndjson(result)?;
        self.write_text("results.ndjson", &ndjson)?;

        if let Some(metadata) = result.metadata.as_ref().filter(|m| !m.is_empty()) {
            self.write_json("metadata.json", metadata)?;
        }

        let integrity = ManifestIntegrity {
            suite_json_sha256: sha256_hex(&compact(suite)?),
            results_json_sha256: sha256_hex(&compact(result)?),
            summary_json_sha256: sha256_hex(&compact(&result.summary)?),
            results_ndjson_sha256: sha256_hex(&ndjson),
        };

        let mut versions = BTreeMap::new();
        versions.insert("minibench".to_string(), crate::VERSION.to_string());

        let manifest = CapsuleManifest {
            id: self.dir_name.clone(),
            created_at: Utc::now(),
            suite: ManifestSuite {
                requested_id: requested_suite.to_string(),
                actual_id: result.suite_id.to_string(),
            },
            counts: ManifestCounts {
                scenarios: result.results.len(),
            },
            runner: runner.to_string(),
            evaluator: evaluator.to_string(),
            versions,
            integrity,
        };
        self.write_json("manifest.json", &manifest)?;
        self.point_latest()?;
        self.append_log("Run finished")?;
        Ok(manifest)
    }

    /// Append one line to `stdout.log`.
    pub fn append_log(&self, line: &str) -> Result<()> {
        let path = self.dir.join("stdout.log");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {:?}", path))?;
        writeln!(file, "{}", line).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }

    /// Repoint `<runs_root>/latest` at this capsule.
    ///
    /// Uses a relative symlink where the platform allows it, otherwise a
    /// text file holding the directory name.
    pub fn point_latest(&self) -> Result<()> {
        let latest = self.runs_root.join(LATEST_LINK);
        if let Ok(meta) = std::fs::symlink_metadata(&latest) {
            if meta.is_dir() {
                std::fs::remove_dir_all(&latest)
            } else {
                std::fs::remove_file(&latest)
            }
            .with_context(|| format!("remove {:?}", latest))?;
        }

        #[cfg(unix)]
        {
            if std::os::unix::fs::symlink(&self.dir_name, &latest).is_ok() {
                return Ok(());
            }
        }

        std::fs::write(&latest, format!("{}\n", self.dir_name))
            .with_context(|| format!("write {:?}", latest))?;
        Ok(())
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(value)
            .with_context(|| format!("serialize {}", name))?;
        self.write_text(name, &(content + "\n"))
    }

    fn write_text(&self, name: &str, text: &str) -> Result<()> {
        let path = self.dir.join(name);
        std::fs::write(&path, text).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }
}

fn compact<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("serialize for integrity hash")
}

/// One compact JSON line per scenario result, newline terminated.
pub fn render_ndjson(result: &SuiteRunResult) -> Result<String> {
    let mut out = String::new();
    for r in &result.results {
        out.push_str(&compact(r)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RunnerResult, ScenarioRunResult, Score, SuiteId};
    use serde_json::json;

    fn sample_run() -> (Suite, SuiteRunResult) {
        let suite = crate::suite::builtin_suite("toy").unwrap();
        let results = vec![
            ScenarioRunResult::new("toy-1".into(), RunnerResult::text("hello world"), vec![Score::passed("exact_match")]),
            ScenarioRunResult::new(
                "toy-2".into(),
                RunnerResult::text("42"),
                vec![Score::failed("exact_match", json!({"expected": "0042", "received": "42"}))],
            ),
        ];
        let mut metadata = BTreeMap::new();
        metadata.insert("runId".to_string(), json!("abc"));
        let run = SuiteRunResult::new(SuiteId::from("toy"), results).with_metadata(metadata);
        (suite, run)
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Toy Suite"), "toy-suite");
        assert_eq!(slugify("  --Codefix__Toy!! "), "codefix-toy");
        assert_eq!(slugify("suites/my.json"), "suites-my-json");
    }

    #[test]
    fn utc_stamp_is_sortable() {
        let at = DateTime::parse_from_rfc3339("2099-01-01T00:00:00Z")
            .expect("parse RFC3339")
            .with_timezone(&Utc);
        assert_eq!(utc_stamp(at), "20990101T000000Z");
        assert!("20250101T000000Z" < "20250101T000001Z");
    }

    #[test]
    fn creates_stamped_dir_with_slug() {
        let root = tempfile::tempdir().unwrap();
        let capsule = TimeCapsule::create(root.path(), "Toy Suite", "20990101T000000Z").unwrap();
        assert!(capsule.dir().is_dir());
        assert!(capsule.dir().ends_with("20990101T000000Z_toy-suite"));
    }

    #[test]
    fn writes_all_artifacts_and_manifest() {
        let root = tempfile::tempdir().unwrap();
        let (suite, run) = sample_run();
        let capsule = TimeCapsule::create(root.path(), "toy", "20990101T000000Z").unwrap();

        capsule
            .write_inputs(&json!({"suite": "toy"}), &suite, &json!({"runner": "stub", "evaluator": "exact"}))
            .unwrap();
        let manifest = capsule.write_outputs("toy", &suite, &run, "stub", "exact").unwrap();

        for f in [
            "args.json",
            "suite.json",
            "config.json",
            "results.json",
            "summary.json",
            "results.ndjson",
            "metadata.json",
            "stdout.log",
            "manifest.json",
        ] {
            assert!(capsule.dir().join(f).is_file(), "{f} missing");
        }

        let ndjson = std::fs::read_to_string(capsule.dir().join("results.ndjson")).unwrap();
        let lines: Vec<&str> = ndjson.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["scenarioId"], json!("toy-1"));
        assert_eq!(manifest.integrity.results_ndjson_sha256, sha256_hex(&ndjson));

        let on_disk: CapsuleManifest = serde_json::from_str(
            &std::fs::read_to_string(capsule.dir().join("manifest.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(on_disk, manifest);
        assert_eq!(on_disk.counts.scenarios, 2);
        assert_eq!(on_disk.suite.actual_id, "toy");

        let log = std::fs::read_to_string(capsule.dir().join("stdout.log")).unwrap();
        assert_eq!(log, "Run started\nRun finished\n");
    }

    #[test]
    fn metadata_file_skipped_when_absent() {
        let root = tempfile::tempdir().unwrap();
        let (suite, mut run) = sample_run();
        run.metadata = None;
        let capsule = TimeCapsule::create(root.path(), "toy", "20990101T000000Z").unwrap();
        capsule.write_outputs("toy", &suite, &run, "stub", "exact").unwrap();
        assert!(!capsule.dir().join("metadata.json").exists());
    }

    #[test]
    fn latest_follows_newest_capsule() {
        let root = tempfile::tempdir().unwrap();
        let first = TimeCapsule::create(root.path(), "toy", "20990101T000000Z").unwrap();
        first.point_latest().unwrap();
        let second = TimeCapsule::create(root.path(), "toy", "20990101T000001Z").unwrap();
        second.point_latest().unwrap();

        let latest = root.path().join(LATEST_LINK);
        match std::fs::read_link(&latest) {
            Ok(target) => assert_eq!(target, PathBuf::from(second.dir_name())),
            Err(_) => {
                let pointer = std::fs::read_to_string(&latest).unwrap();
                assert_eq!(pointer.trim(), second.dir_name());
            }
        }
    }
}
