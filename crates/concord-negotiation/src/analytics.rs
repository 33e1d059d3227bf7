//! Aggregate analytics over archived (terminal-state) negotiation sessions.

use serde::Serialize;

use crate::session::{NegotiationSession, SessionState};

#[derive(Debug, Clone, Serialize)]
pub struct NegotiationAnalytics {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub average_rounds: f64,
    pub average_duration_seconds: f64,
    pub success_rate: f64,
    pub top_contested_params: Vec<(String, u64)>,
}

pub fn compute(
    sessions: &[NegotiationSession],
    agent_id: Option<&str>,
    param_contests: &std::collections::HashMap<String, u64>,
) -> NegotiationAnalytics {
    let filtered: Vec<&NegotiationSession> = sessions
        .iter()
        .filter(|s| agent_id.map_or(true, |id| s.is_participant(id)))
        .collect();

    let total = filtered.len();
    let successful = filtered.iter().filter(|s| s.state == SessionState::Finalized).count();
    let failed = filtered.iter().filter(|s| s.state == SessionState::Failed).count();
    let timed_out = filtered.iter().filter(|s| s.state == SessionState::TimedOut).count();

    let average_rounds = if total == 0 {
        0.0
    } else {
        filtered.iter().map(|s| s.rounds.len() as f64).sum::<f64>() / total as f64
    };

    let average_duration_seconds = if total == 0 {
        0.0
    } else {
        filtered.iter().map(|s| s.duration().num_milliseconds() as f64 / 1000.0).sum::<f64>() / total as f64
    };

    let success_rate = if total == 0 { 0.0 } else { successful as f64 / total as f64 };

    let mut top_contested_params: Vec<(String, u64)> = param_contests.iter().map(|(k, v)| (k.clone(), *v)).collect();
    top_contested_params.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_contested_params.truncate(5);

    NegotiationAnalytics {
        total,
        successful,
        failed,
        timed_out,
        average_rounds,
        average_duration_seconds,
        success_rate,
        top_contested_params,
    }
}
