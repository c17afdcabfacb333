//! Literal find/replace patches proposed by a runner.

use serde_json::Value;

use crate::error::{PatchFailure, PatchResult};

/// A single literal substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub find: String,
    pub replace: String,
}

impl Patch {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }

    /// Parse runner output of the form `{"patch": {"find": ..., "replace": ...}}`.
    ///
    /// Both fields must be non-empty strings. Other top-level keys (such as
    /// `explanation`) are ignored.
    pub fn parse(output_text: &str) -> PatchResult<Self> {
        let parsed: Value =
            serde_json::from_str(output_text).map_err(|e| PatchFailure::BadPatchShape {
                parsed: None,
                reason: format!("output is not JSON: {}", e),
            })?;

        let field = |name: &str| {
            parsed
                .get("patch")
                .and_then(|p| p.get(name))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        match (field("find"), field("replace")) {
            (Some(find), Some(replace)) => Ok(Self { find, replace }),
            _ => Err(PatchFailure::BadPatchShape {
                reason: "patch.find and patch.replace must be non-empty strings".to_string(),
                parsed: Some(parsed),
            }),
        }
    }

    /// Enforce `constraints.allowedFinds`; an empty list allows anything.
    pub fn check_allowed(&self, allowed: &[String]) -> PatchResult<()> {
        if allowed.is_empty() || allowed.iter().any(|a| *a == self.find) {
            return Ok(());
        }
        Err(PatchFailure::FindNotAllowed {
            find: self.find.clone(),
            allowed: allowed.to_vec(),
        })
    }

    /// Replace the first literal occurrence of `find` in `source`.
    pub fn apply(&self, source: &str) -> PatchResult<String> {
        if !source.contains(&self.find) {
            return Err(PatchFailure::FindNotFound {
                find: self.find.clone(),
                original: source.to_string(),
            });
        }
        Ok(source.replacen(&self.find, &self.replace, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SOURCE: &str = "function add(a, b) { return 3; }";

    #[test]
    fn parses_patch_and_ignores_extra_keys() {
        let patch = Patch::parse(
            r#"{"explanation": "sum", "patch": {"find": "return 3;", "replace": "return a + b;"}}"#,
        )
        .unwrap();
        assert_eq!(patch, Patch::new("return 3;", "return a + b;"));
    }

    #[test]
    fn non_json_output_is_a_bad_shape() {
        let err = Patch::parse("Sure! Replace `return 3;`").unwrap_err();
        assert_eq!(err.code(), "bad-patch-shape");
        assert_eq!(err.details()["parsed"], Value::Null);
    }

    #[test]
    fn missing_or_empty_fields_are_a_bad_shape() {
        for text in [
            r#"{"patch": {"find": "return 3;"}}"#,
            r#"{"patch": {"find": "", "replace": "x"}}"#,
            r#"{"patch": {"find": 3, "replace": "x"}}"#,
            r#"{"find": "a", "replace": "b"}"#,
            "null",
        ] {
            let err = Patch::parse(text).unwrap_err();
            assert_eq!(err.code(), "bad-patch-shape", "input: {}", text);
        }
        let err = Patch::parse(r#"{"patch": {}}"#).unwrap_err();
        assert_eq!(err.details()["parsed"], json!({"patch": {}}));
    }

    #[test]
    fn constraints_gate_the_find_text() {
        let allowed = vec!["return 3;".to_string()];
        assert!(Patch::new("return 3;", "x").check_allowed(&allowed).is_ok());
        assert!(Patch::new("return 4;", "x").check_allowed(&[]).is_ok());

        let err = Patch::new("return 4;", "x").check_allowed(&allowed).unwrap_err();
        assert_eq!(
            err,
            PatchFailure::FindNotAllowed {
                find: "return 4;".into(),
                allowed,
            }
        );
    }

    #[test]
    fn replaces_only_the_first_occurrence() {
        let patch = Patch::new("x", "y");
        assert_eq!(patch.apply("x + x").unwrap(), "y + x");
    }

    #[test]
    fn replacement_is_literal() {
        let patch = Patch::new("a.b", "$1");
        assert_eq!(patch.apply("a.b + axb").unwrap(), "$1 + axb");
    }

    #[test]
    fn missing_find_reports_source_unchanged() {
        let err = Patch::new("return 99;", "return 0;").apply(SOURCE).unwrap_err();
        assert_eq!(err.code(), "find-not-found");
        assert_eq!(err.details()["source"], json!(SOURCE));
    }
}
