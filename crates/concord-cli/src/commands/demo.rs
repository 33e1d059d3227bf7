//! `concord demo`: a simulated-activity generator exercising
//! registration, alignment, negotiation, and protocol emergence against
//! a handful of synthetic agents, so operators can watch the
//! observation bus/dashboard without wiring up real agents.

use std::collections::HashMap;
use std::sync::Arc;

use concord_core::{AgentDescriptor, Goal};
use concord_emergence::PerformanceMetrics;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::state::AppState;

fn demo_agents() -> Vec<AgentDescriptor> {
    let specs: &[(&str, &[&str], &str)] = &[
        ("agent-alpha", &["python", "machine_learning", "nlp"], "assistance"),
        ("agent-beta", &["python", "data_science"], "analysis"),
        ("agent-gamma", &["rust", "systems"], "automation"),
        ("agent-delta", &["astronomy", "physics"], "research"),
    ];
    specs
        .iter()
        .map(|(id, domains, goal_type)| {
            let mut agent = AgentDescriptor::new(*id);
            agent.knowledge_domains = domains.iter().map(|d| d.to_string()).collect();
            agent.goals = vec![Goal::new(*goal_type)];
            agent.capabilities.insert("msgpack".to_string(), serde_json::json!(true));
            agent.context_params.insert("env".to_string(), serde_json::json!("demo"));
            agent
        })
        .collect()
}

pub async fn run(state: &Arc<AppState>, rounds: u64) -> anyhow::Result<()> {
    let agents = demo_agents();
    for agent in &agents {
        state.orchestrator.register_agent(agent.clone());
    }
    let ids: Vec<&str> = agents.iter().map(|a| a.agent_id.as_str()).collect();

    let mut rng = rand::thread_rng();
    for round in 1..=rounds {
        let mut pick = ids.clone();
        pick.shuffle(&mut rng);
        let (a_id, b_id) = (pick[0], pick[1]);

        match state.orchestrator.initiate_collaboration(a_id, b_id, None, None, HashMap::new()) {
            Ok(session) => {
                info!(round, session_id = %session.session_id, "demo collaboration active");
                println!("round {round}: collaboration {} between {a_id} and {b_id} -> {:?}", session.session_id, session.state);
            }
            Err(e) => {
                println!("round {round}: collaboration between {a_id} and {b_id} did not proceed: {e}");
                continue;
            }
        }

        if round % 3 == 0 {
            let variant = state.orchestrator.emergence().propose_variant(
                format!("demo variant round {round}"),
                HashMap::new(),
                None,
                vec!["demo".to_string()],
                HashMap::new(),
            );
            state.orchestrator.emergence().start_testing(&variant.variant_id)?;
            state.orchestrator.emergence().start_canary(&variant.variant_id, Some(0.1))?;
            let success_rate = rng.gen_range(0.85..=0.99);
            let latency = rng.gen_range(40.0..=400.0);
            let metrics = PerformanceMetrics::new(success_rate, latency, 0, 200);
            let variant = state.orchestrator.emergence().track_performance(&variant.variant_id, metrics)?;
            println!("round {round}: variant {} now {:?}", variant.variant_id, variant.status);
        }

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    println!("demo complete: {rounds} rounds simulated");
    Ok(())
}
