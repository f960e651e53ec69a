//! Progress estimation
//!
//! A run is modeled as three sequential stages: company, the concurrent
//! batch (costed at the largest estimate among its four phases), then
//! market. A finished stage contributes its full estimate; a running stage
//! contributes elapsed time capped at its estimate. Estimates are static, so
//! the figure drifts when real durations differ from them. A finished run
//! reads 100 whatever state its phases were left in.
//!
//! TODO: learn per-phase estimates from durations observed in earlier runs.

use crate::phase::{Phase, PhaseKey};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Percent shown while any work is outstanding never exceeds this
pub const IN_FLIGHT_CAP: u8 = 95;

/// Point-in-time progress view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// 0-100
    pub percent: u8,
    /// Time since the run started
    pub elapsed: Duration,
    /// Estimated time left
    pub estimated_remaining: Duration,
    /// Display names of active phases
    pub active_phases: Vec<&'static str>,
}

impl ProgressSnapshot {
    /// Active phase names joined for display
    #[must_use]
    pub fn active_label(&self) -> String {
        self.active_phases.join(", ")
    }
}

/// Estimate progress over the phase table
///
/// `phases` is indexed by [`PhaseKey::index`]. `finished` is set once the
/// run has ended (completed, failed or cancelled) and nothing is in flight.
pub(crate) fn estimate(
    phases: &[Phase],
    run_started: Option<Instant>,
    finished: bool,
    now: Instant,
) -> ProgressSnapshot {
    let stage = |keys: &[PhaseKey]| -> (Duration, Duration) {
        let members: Vec<&Phase> = keys.iter().map(|key| &phases[key.index()]).collect();
        let estimate = members
            .iter()
            .map(|phase| phase.estimated_duration)
            .max()
            .unwrap_or_default();
        let contributed = if members.iter().all(|phase| phase.status.is_terminal()) {
            estimate
        } else {
            members
                .iter()
                .filter_map(|phase| phase.started)
                .min()
                .map_or(Duration::ZERO, |start| {
                    now.saturating_duration_since(start).min(estimate)
                })
        };
        (estimate, contributed)
    };

    let stages = [
        stage(&[PhaseKey::Company]),
        stage(&PhaseKey::CONCURRENT),
        stage(&[PhaseKey::Market]),
    ];
    let total: Duration = stages.iter().map(|(estimate, _)| *estimate).sum();
    let contributed: Duration = stages.iter().map(|(_, done)| *done).sum();

    let percent = if finished {
        100
    } else if total.is_zero() {
        0
    } else {
        let raw = (contributed.as_secs_f64() / total.as_secs_f64() * 100.0).round();
        // bounded by IN_FLIGHT_CAP before the cast
        raw.min(f64::from(IN_FLIGHT_CAP)) as u8
    };

    ProgressSnapshot {
        percent,
        elapsed: run_started.map_or(Duration::ZERO, |start| now.saturating_duration_since(start)),
        estimated_remaining: if percent == 100 {
            Duration::ZERO
        } else {
            total.saturating_sub(contributed)
        },
        active_phases: phases
            .iter()
            .filter(|phase| phase.status == crate::phase::PhaseStatus::Active)
            .map(|phase| phase.display_name)
            .collect(),
    }
}
