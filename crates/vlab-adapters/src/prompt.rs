//! Render del contexto de simulación a prompt.
use std::fmt::Write;

use vlab_core::SimulationContext;

pub const SYSTEM_PROMPT: &str = "You are a laboratory chemistry simulator. Given the samples being combined, \
propose the plausible resulting compositions. Percentages of each outcome must add up to exactly 100. \
Likelihoods are relative weights between 0 (exclusive) and 100.";

const ANSWER_FORMAT: &str = r#"Answer with one block per outcome, most likely first:

Outcome 1 (Likelihood <number>):
* <Entity>: <percentage>%
* <Entity>: <percentage>%

List every input entity, using 0% when it is fully consumed. Alternatively answer with JSON only:
{"outcomes": [{"likelihood": <number>, "composition_changes": {"<Entity>": <percentage>}}]}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn build_prompt(context: &SimulationContext) -> Prompt {
    let mut user = String::new();
    // write! sobre String no falla
    let _ = writeln!(user,
                     "Action: {} ({}) in container: {}",
                     context.action_name, context.action_type, context.container);
    let _ = writeln!(user, "Total volume: {}", context.total_volume);
    for input in &context.inputs {
        let _ = writeln!(user, "\nInput sample '{}' ({}):", input.sample_name, input.volume);
        for c in input.composition.components() {
            match c.entity.formula() {
                Some(formula) => {
                    let _ = writeln!(user, "* {} ({formula}): {}", c.entity.name(), c.quantity);
                }
                None => {
                    let _ = writeln!(user, "* {}: {}", c.entity.name(), c.quantity);
                }
            }
        }
    }
    let _ = write!(user, "\n{ANSWER_FORMAT}");
    Prompt { system: SYSTEM_PROMPT.to_string(),
             user }
}
