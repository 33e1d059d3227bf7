//! `concord analytics [--window N_MIN]`: print aggregate negotiation,
//! emergence, and observation metrics over a trailing window.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

pub fn run(state: &Arc<AppState>, window_minutes: i64) -> anyhow::Result<()> {
    let cutoff = Utc::now() - chrono::Duration::minutes(window_minutes.max(0));
    let events = state.observation.bus.since(cutoff, None);

    let negotiation_analytics = state.orchestrator.negotiation().get_analytics(None);
    let learning = state.orchestrator.emergence().get_learning_insights();
    let active_variants = state.orchestrator.emergence().list_variants(None).len();
    let active_collaborations = state.orchestrator.list_active_collaborations().len();

    let report = json!({
        "window_minutes": window_minutes,
        "events_in_window": events.len(),
        "active_collaborations": active_collaborations,
        "active_variants": active_variants,
        "negotiation": negotiation_analytics,
        "emergence_learning": learning,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
