//! Evaluator registry including the codefix evaluators.

use minibench_core::evaluator::registry::shared;
use minibench_core::EvaluatorRegistry;

use crate::config::CodefixConfig;
use crate::evaluator::CodefixEvaluator;
use crate::route::AutoEvaluator;

/// `exact`, `codefix` and `auto`, with codefix hosts built from `config`.
pub fn standard_evaluators(config: &CodefixConfig) -> EvaluatorRegistry {
    let codefix_config = config.clone();
    let auto_config = config.clone();
    EvaluatorRegistry::core()
        .register("codefix", move || {
            shared(CodefixEvaluator::from_config(&codefix_config))
        })
        .register("auto", move || {
            shared(AutoEvaluator::new(CodefixEvaluator::from_config(&auto_config)))
        })
}
