//! Simulated analysis collaborators
//!
//! Stand-ins for the remote analysis services: each sleeps for a scaled
//! version of its phase estimate and answers with a canned result built from
//! the input. Selected phases can be told to fail their first call, so a
//! retry succeeds.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vas_pipeline::{
    AnalysisCollaborator, CancellationToken, CollaboratorError, CollaboratorSet, PhaseInput,
    PhaseKey, PipelineConfig,
};

pub(crate) struct SimulatedCollaborator {
    key: PhaseKey,
    delay: Duration,
    fail_next: AtomicBool,
}

impl SimulatedCollaborator {
    fn respond(&self, input: &PhaseInput) -> Value {
        match (self.key, input) {
            (PhaseKey::Company, PhaseInput::Primary(primary)) => {
                let identifier = primary.identifier();
                let name = identifier
                    .trim_start_matches("www.")
                    .split(['.', '-', '_'])
                    .next()
                    .unwrap_or("Unknown");
                json!({
                    "company_name": capitalize(name),
                    "description": format!("Company behind {identifier}"),
                    "industry": "Software",
                })
            }
            (key, input) => {
                let basis = input.description().map_or(0, str::len);
                json!({
                    "phase": key.as_str(),
                    "score": (basis + key.index()) % 9 + 1,
                    "summary": format!("Simulated {} result", key.descriptor().display_name),
                })
            }
        }
    }
}

#[async_trait]
impl AnalysisCollaborator for SimulatedCollaborator {
    async fn analyze(
        &self,
        input: PhaseInput,
        cancel: CancellationToken,
    ) -> Result<Value, CollaboratorError> {
        tokio::select! {
            () = cancel.cancelled() => return Err(CollaboratorError::Cancelled),
            () = tokio::time::sleep(self.delay) => {}
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CollaboratorError::failed(format!(
                "simulated {} outage",
                self.key
            )));
        }
        Ok(self.respond(&input))
    }
}

/// One simulated collaborator per phase
pub(crate) fn collaborators(
    config: &PipelineConfig,
    scale_ms: u64,
    failing: &BTreeSet<PhaseKey>,
) -> CollaboratorSet {
    CollaboratorSet::from_fn(|key| {
        let estimate_secs = config.estimate(key).as_secs();
        Arc::new(SimulatedCollaborator {
            key,
            delay: Duration::from_millis(estimate_secs.saturating_mul(scale_ms)),
            fail_next: AtomicBool::new(failing.contains(&key)),
        })
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
