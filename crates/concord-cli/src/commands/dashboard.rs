//! `concord dashboard` / `dash` / `observe`: a plain-text interactive
//! monitor over the observation bus.
//!
//! The interactive terminal *renderer* is out of scope for the core —
//! `concord-viz` only defines the render configuration and
//! presentation-agnostic summaries a renderer would consume. This
//! command is the minimal text renderer that satisfies the CLI
//! contract without pulling in a TUI dependency.

use std::collections::HashMap;
use std::sync::Arc;

use concord_viz::{severity_glyph, DashboardMode, RenderConfig};

use crate::state::AppState;

fn render_snapshot(state: &AppState, config: &RenderConfig) {
    let stats = state.observation.stats();
    println!("concord dashboard -- {} events observed (ring {}/{})", stats.total_published, stats.ring_size, stats.ring_capacity);
    println!("active collaborations: {}", state.orchestrator.list_active_collaborations().len());
    println!("active variants: {}", state.orchestrator.emergence().list_variants(None).len());

    let mut by_severity: HashMap<String, u64> = HashMap::new();
    for (k, v) in &stats.events_by_severity {
        *by_severity.entry(k.clone()).or_insert(0) += v;
    }
    for (flow_type, count) in &stats.events_by_type {
        println!("  {flow_type:<18} {count:>6}");
    }

    if let Some(alerts) = &state.observation.alerts {
        for alert in alerts.recent(5) {
            let glyph = severity_glyph(alert.severity, config.use_unicode);
            println!("  [{glyph}] {}: {}", alert.rule_name, alert.message);
        }
    }
}

pub async fn run(state: &Arc<AppState>, mode: &str, refresh_seconds: u64) -> anyhow::Result<()> {
    let config = match mode {
        "snapshot" => RenderConfig::snapshot(),
        _ => RenderConfig::terminal(refresh_seconds),
    };

    match config.mode {
        DashboardMode::Snapshot => {
            render_snapshot(state, &config);
            Ok(())
        }
        DashboardMode::Terminal => {
            let mut ticker = tokio::time::interval(config.refresh);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        render_snapshot(state, &config);
                    }
                    _ = tokio::signal::ctrl_c() => {
                        println!("concord dashboard stopped");
                        return Ok(());
                    }
                }
            }
        }
    }
}
