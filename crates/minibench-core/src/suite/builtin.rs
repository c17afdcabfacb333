//! Suites compiled into the binary.

use serde_json::json;

use crate::domain::{CodefixInput, Scenario, Suite};

/// Ids accepted by [`builtin_suite`].
pub const BUILTIN_SUITE_IDS: &[&str] = &["toy", "codefix-toy"];

const CODEFIX_PROMPT: &str = "Given a small JS function and a test table, return strict JSON ONLY:\n\
{ \"explanation\": string, \"patch\": { \"find\": string, \"replace\": string } }";

const ADD_SOURCE: &str = "function add(a, b) { return 3; }";

/// Look up a builtin suite by id.
pub fn builtin_suite(id: &str) -> Option<Suite> {
    match id {
        "toy" => Some(toy_suite()),
        "codefix-toy" => Some(codefix_toy_suite()),
        _ => None,
    }
}

/// Two exact-match scenarios; `toy-2` is wrong on purpose so echo runners
/// produce a mixed result.
fn toy_suite() -> Suite {
    Suite::new("toy", "Toy Suite")
        .add_scenario(
            Scenario::new("toy-1", "Echo a phrase", "Return exactly: hello world")
                .with_expected("hello world"),
        )
        .add_scenario(
            Scenario::new("toy-2", "Echo a number", "Return exactly: 42")
                .with_expected("0042")
                .with_metadata("note", json!("intentionally mismatched expectation")),
        )
}

fn add_input() -> CodefixInput {
    CodefixInput::new(ADD_SOURCE, "add")
        .with_test(vec![json!(1), json!(1)], json!(2))
        .with_test(vec![json!(2), json!(1)], json!(3))
        .with_test(vec![json!(2), json!(2)], json!(4))
}

/// The `add` bug in an unconstrained and a constrained variant.
fn codefix_toy_suite() -> Suite {
    let constrained_prompt = format!(
        "{CODEFIX_PROMPT}\nIMPORTANT: patch.find MUST be one of the following EXACT strings (copy verbatim):\n1) `return 3;`"
    );

    Suite::new("codefix-toy", "Codefix Toy Suite")
        .add_scenario(
            Scenario::new(
                "codefix-add-unconstrained",
                "Codefix: add (unconstrained)",
                CODEFIX_PROMPT,
            )
            .with_input(add_input().to_value())
            .with_expected("")
            .with_metadata("difficulty", json!("toy")),
        )
        .add_scenario(
            Scenario::new(
                "codefix-add-constrained",
                "Codefix: add (constrained)",
                constrained_prompt,
            )
            .with_input(add_input().with_allowed_finds(["return 3;"]).to_value())
            .with_expected("")
            .with_metadata("difficulty", json!("toy")),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CODEFIX_KIND;

    #[test]
    fn every_listed_id_resolves() {
        for id in BUILTIN_SUITE_IDS {
            let suite = builtin_suite(id).expect("builtin suite");
            assert_eq!(suite.id.as_str(), *id);
            assert!(suite.validate().is_ok());
            assert!(!suite.is_empty());
        }
    }

    #[test]
    fn toy_suite_has_two_exact_scenarios() {
        let suite = builtin_suite("toy").unwrap();
        let ids: Vec<_> = suite.scenarios.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["toy-1", "toy-2"]);
        assert_eq!(suite.scenarios[1].expected_text(), "0042");
    }

    #[test]
    fn codefix_suite_constrains_only_second_variant() {
        let suite = builtin_suite("codefix-toy").unwrap();
        let parse = |s: &Scenario| -> CodefixInput {
            serde_json::from_value(s.input.clone().unwrap()).unwrap()
        };
        let unconstrained = parse(&suite.scenarios[0]);
        let constrained = parse(&suite.scenarios[1]);

        assert_eq!(suite.scenarios[0].input_kind(), Some(CODEFIX_KIND));
        assert!(unconstrained.allowed_finds().is_empty());
        assert_eq!(constrained.allowed_finds(), ["return 3;".to_string()]);
        assert_eq!(constrained.tests.len(), 3);
    }

    #[test]
    fn unknown_id_is_none() {
        assert!(builtin_suite("nope").is_none());
    }
}
