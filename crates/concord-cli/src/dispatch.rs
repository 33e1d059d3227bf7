//! The tool-RPC operation dispatcher: the single mapping from a named
//! operation plus a JSON argument map to a JSON result document, shared
//! by the stdio and HTTP transports (the core does not care which
//! transport carried the call).
//!
//! Every operation returns a JSON value; a `ConcordError` is rendered as
//! `{"error": "..."}` via `ConcordError::to_result_document` rather than
//! propagated as a transport fault.

use std::collections::HashMap;

use concord_core::{AgentDescriptor, ConcordError, ConcordResult};
use concord_emergence::{ExperimentSide, PerformanceMetrics, VariantStatus};
use concord_negotiation::{NegotiableParams, OptimizationPriority, TimeoutPolicy};
use concord_orchestrator::NegotiationResponse;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::state::AppState;

fn parse<T: DeserializeOwned>(args: Value) -> ConcordResult<T> {
    serde_json::from_value(args).map_err(|e| ConcordError::InvalidArgument(e.to_string()))
}

fn ok<T: serde::Serialize>(value: T) -> ConcordResult<Value> {
    Ok(serde_json::to_value(value).expect("result type always serializes"))
}

/// Dispatches one named tool-RPC operation. Unknown operation names are
/// themselves a (NotFound-shaped) caller error rather than a panic.
pub fn dispatch(state: &AppState, operation: &str, args: Value) -> Value {
    match dispatch_inner(state, operation, args) {
        Ok(value) => value,
        Err(e) => e.to_result_document(),
    }
}

fn dispatch_inner(state: &AppState, operation: &str, args: Value) -> ConcordResult<Value> {
    match operation {
        // --- Agent registry / alignment ---------------------------------
        "register_agent" => {
            #[derive(serde::Deserialize)]
            struct Args {
                descriptor: AgentDescriptor,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.register_agent(a.descriptor))
        }
        "verify_knowledge_alignment" => {
            let (a, b, required_domains) = agent_pair_with_domains(state, args)?;
            ok(state.orchestrator.scorer().verify_knowledge(&a, &b, required_domains.as_deref()))
        }
        "verify_goal_alignment" => {
            let (a, b) = agent_pair(state, args)?;
            ok(state.orchestrator.scorer().verify_goals(&a, &b))
        }
        "align_terminology" => {
            let (a, b) = agent_pair(state, args)?;
            ok(state.orchestrator.scorer().align_terminology(&a, &b))
        }
        "verify_assumptions" => {
            let (a, b) = agent_pair(state, args)?;
            ok(state.orchestrator.scorer().verify_assumptions(&a, &b))
        }
        "sync_context" => {
            #[derive(serde::Deserialize)]
            struct Args {
                agent_a_id: String,
                agent_b_id: String,
                #[serde(default)]
                required_params: Option<Vec<String>>,
            }
            let a: Args = parse(args)?;
            let agent_a = state.orchestrator.get_agent(&a.agent_a_id)?;
            let agent_b = state.orchestrator.get_agent(&a.agent_b_id)?;
            ok(state.orchestrator.scorer().sync_context(&agent_a, &agent_b, a.required_params.as_deref()))
        }
        "full_alignment_check" => {
            #[derive(serde::Deserialize)]
            struct Args {
                agent_a_id: String,
                agent_b_id: String,
                #[serde(default)]
                required_domains: Option<Vec<String>>,
                #[serde(default)]
                required_params: Option<Vec<String>>,
            }
            let a: Args = parse(args)?;
            let agent_a = state.orchestrator.get_agent(&a.agent_a_id)?;
            let agent_b = state.orchestrator.get_agent(&a.agent_b_id)?;
            ok(state.orchestrator.scorer().full_alignment_check(&agent_a, &agent_b, a.required_domains.as_deref(), a.required_params.as_deref()))
        }

        // --- Negotiation ------------------------------------------------
        "initiate_negotiation" => {
            #[derive(serde::Deserialize)]
            struct Args {
                initiator_id: String,
                responder_id: String,
                #[serde(default)]
                proposed_params: Option<NegotiableParams>,
                #[serde(default)]
                timeout_policy: Option<TimeoutPolicy>,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.negotiation().initiate_session(
                &a.initiator_id,
                &a.responder_id,
                a.proposed_params.unwrap_or_default(),
                a.timeout_policy.unwrap_or(TimeoutPolicy::Fail),
            )?)
        }
        "respond_to_negotiation" => {
            #[derive(serde::Deserialize)]
            struct Args {
                session_id: String,
                responder_id: String,
                response: String,
                #[serde(default)]
                counter_params: Option<NegotiableParams>,
                #[serde(default)]
                reason: Option<String>,
            }
            let a: Args = parse(args)?;
            let engine = state.orchestrator.negotiation();
            if engine.get_status(&a.session_id)?.state == concord_negotiation::SessionState::AwaitingResponse {
                engine.receive_proposal(&a.session_id, &a.responder_id)?;
            }
            let session = match a.response.as_str() {
                "accept" => engine.respond_accept(&a.session_id, &a.responder_id)?,
                "counter" => {
                    let counter = a.counter_params.ok_or_else(|| ConcordError::InvalidArgument("counter response requires counter_params".into()))?;
                    engine.respond_counter(&a.session_id, &a.responder_id, counter)?
                }
                "reject" => engine.respond_reject(&a.session_id, &a.responder_id, a.reason.unwrap_or_default())?,
                other => return Err(ConcordError::InvalidArgument(format!("unknown response '{other}'"))),
            };
            ok(session)
        }
        "accept_counter_proposal" => {
            #[derive(serde::Deserialize)]
            struct Args {
                session_id: String,
                initiator_id: String,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.negotiation().accept_counter(&a.session_id, &a.initiator_id)?)
        }
        "finalize_negotiation" => {
            #[derive(serde::Deserialize)]
            struct Args {
                session_id: String,
                initiator_id: String,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.negotiation().finalize_session(&a.session_id, &a.initiator_id)?)
        }
        "get_negotiation_status" => {
            let session_id = single_id(args, "session_id")?;
            ok(state.orchestrator.negotiation().get_status(&session_id)?)
        }
        "list_negotiations" => {
            #[derive(serde::Deserialize, Default)]
            struct Args {
                #[serde(default)]
                agent_id: Option<String>,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.negotiation().list_sessions(a.agent_id.as_deref()))
        }
        "get_negotiation_analytics" => {
            #[derive(serde::Deserialize, Default)]
            struct Args {
                #[serde(default)]
                agent_id: Option<String>,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.negotiation().get_analytics(a.agent_id.as_deref()))
        }
        "auto_resolve_negotiation_conflicts" => {
            let session_id = single_id(args, "session_id")?;
            ok(state.orchestrator.negotiation().auto_resolve(&session_id)?)
        }
        "suggest_optimal_negotiation_params" => {
            #[derive(serde::Deserialize)]
            struct Args {
                capabilities_a: HashMap<String, Value>,
                capabilities_b: HashMap<String, Value>,
                #[serde(default)]
                priority: Option<OptimizationPriority>,
            }
            let a: Args = parse(args)?;
            ok(concord_negotiation::NegotiationEngine::suggest_optimal_params(
                &a.capabilities_a,
                &a.capabilities_b,
                a.priority.unwrap_or(OptimizationPriority::Compatibility),
            ))
        }
        "check_negotiation_timeout" => {
            let session_id = single_id(args, "session_id")?;
            ok(state.orchestrator.negotiation().check_timeout(&session_id)?)
        }
        "get_negotiation_history" => {
            let session_id = single_id(args, "session_id")?;
            ok(state.orchestrator.negotiation().get_history(&session_id)?)
        }

        // --- Emergence ---------------------------------------------------
        "propose_protocol_variant" => {
            #[derive(serde::Deserialize)]
            struct Args {
                description: String,
                #[serde(default)]
                changes: HashMap<String, Value>,
                #[serde(default)]
                parent_variant_id: Option<String>,
                #[serde(default)]
                tags: Vec<String>,
                #[serde(default)]
                feature_flags: HashMap<String, Value>,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.emergence().propose_variant(a.description, a.changes, a.parent_variant_id, a.tags, a.feature_flags))
        }
        "start_variant_testing" => {
            let variant_id = single_id(args, "variant_id")?;
            ok(state.orchestrator.emergence().start_testing(&variant_id)?)
        }
        "start_canary_deployment" => {
            #[derive(serde::Deserialize)]
            struct Args {
                variant_id: String,
                #[serde(default)]
                initial_percentage: Option<f64>,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.emergence().start_canary(&a.variant_id, a.initial_percentage)?)
        }
        "ramp_canary" => {
            #[derive(serde::Deserialize)]
            struct Args {
                variant_id: String,
                #[serde(default)]
                force: bool,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.emergence().ramp_canary(&a.variant_id, a.force)?)
        }
        "track_variant_performance" => {
            #[derive(serde::Deserialize)]
            struct Args {
                variant_id: String,
                metrics: PerformanceMetrics,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.emergence().track_performance(&a.variant_id, a.metrics)?)
        }
        "get_variant_status" => {
            let variant_id = single_id(args, "variant_id")?;
            ok(state.orchestrator.emergence().get_variant_status(&variant_id)?)
        }
        "rollback_variant" => {
            #[derive(serde::Deserialize)]
            struct Args {
                variant_id: String,
                #[serde(default = "default_manual_reason")]
                reason: String,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.emergence().rollback(&a.variant_id, a.reason)?)
        }
        "resume_variant" => {
            let variant_id = single_id(args, "variant_id")?;
            ok(state.orchestrator.emergence().resume_variant(&variant_id)?)
        }
        "list_variants" => {
            #[derive(serde::Deserialize, Default)]
            struct Args {
                #[serde(default)]
                status: Option<VariantStatus>,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.emergence().list_variants(a.status))
        }
        "get_canary_status" => {
            let variant_id = single_id(args, "variant_id")?;
            ok(state.orchestrator.emergence().get_canary_status(&variant_id)?)
        }
        "analyze_variant_trend" => {
            #[derive(serde::Deserialize)]
            struct Args {
                variant_id: String,
                #[serde(default = "default_trend_metric")]
                metric: String,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.emergence().analyze_variant_trend(&a.variant_id, &a.metric)?)
        }
        "detect_variant_anomaly" => {
            #[derive(serde::Deserialize)]
            struct Args {
                variant_id: String,
                #[serde(default = "default_trend_metric")]
                metric: String,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.emergence().detect_variant_anomaly(&a.variant_id, &a.metric)?)
        }
        "start_ab_experiment" => {
            #[derive(serde::Deserialize)]
            struct Args {
                control_variant_id: String,
                treatment_variant_id: String,
                #[serde(default = "default_traffic_split")]
                traffic_split: f64,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.emergence().start_experiment(a.control_variant_id, a.treatment_variant_id, a.traffic_split))
        }
        "record_ab_experiment_metrics" => {
            #[derive(serde::Deserialize)]
            struct Args {
                experiment_id: String,
                side: ExperimentSide,
                metrics: PerformanceMetrics,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.emergence().record_experiment_metrics(&a.experiment_id, a.side, a.metrics)?)
        }
        "get_ab_experiment_status" => {
            let experiment_id = single_id(args, "experiment_id")?;
            ok(state.orchestrator.emergence().get_experiment_status(&experiment_id)?)
        }
        "end_ab_experiment" => {
            #[derive(serde::Deserialize)]
            struct Args {
                experiment_id: String,
                #[serde(default)]
                winner: Option<ExperimentSide>,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.emergence().end_experiment(&a.experiment_id, a.winner)?)
        }
        "predict_variant_success" => {
            #[derive(serde::Deserialize)]
            struct Args {
                #[serde(default)]
                changes: HashMap<String, Value>,
                #[serde(default)]
                tags: Option<Vec<String>>,
            }
            let a: Args = parse(args)?;
            ok(json!({ "predicted_success_rate": state.orchestrator.emergence().predict_success(&a.changes, a.tags.as_deref()) }))
        }
        "get_emergence_learning_insights" => ok(state.orchestrator.emergence().get_learning_insights()),

        // --- Orchestration / workflows ------------------------------------
        "initiate_collaboration" => {
            #[derive(serde::Deserialize)]
            struct Args {
                agent_a_id: String,
                agent_b_id: String,
                #[serde(default)]
                required_domains: Option<Vec<String>>,
                #[serde(default)]
                proposed_params: Option<NegotiableParams>,
                #[serde(default)]
                metadata: HashMap<String, Value>,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.initiate_collaboration(&a.agent_a_id, &a.agent_b_id, a.required_domains, a.proposed_params, a.metadata)?)
        }
        "complete_negotiation" => {
            #[derive(serde::Deserialize)]
            struct Args {
                session_id: String,
                responder_id: String,
                response: String,
                #[serde(default)]
                counter: Option<NegotiableParams>,
                #[serde(default)]
                reason: Option<String>,
            }
            let a: Args = parse(args)?;
            let response = match a.response.as_str() {
                "accept" => NegotiationResponse::Accept,
                "counter" => {
                    NegotiationResponse::Counter(a.counter.ok_or_else(|| ConcordError::InvalidArgument("counter response requires counter".into()))?)
                }
                "reject" => NegotiationResponse::Reject(a.reason.unwrap_or_default()),
                other => return Err(ConcordError::InvalidArgument(format!("unknown response '{other}'"))),
            };
            ok(state.orchestrator.complete_negotiation(&a.session_id, &a.responder_id, response)?)
        }
        "accept_counter_and_finalize" => {
            #[derive(serde::Deserialize)]
            struct Args {
                session_id: String,
                initiator_id: String,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.accept_counter_and_finalize(&a.session_id, &a.initiator_id)?)
        }
        "propose_protocol_evolution" => {
            #[derive(serde::Deserialize)]
            struct Args {
                session_id: String,
                description: String,
                #[serde(default)]
                changes: HashMap<String, Value>,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.propose_protocol_evolution(&a.session_id, a.description, a.changes)?)
        }
        "evolve_session_protocol" => {
            #[derive(serde::Deserialize)]
            struct Args {
                session_id: String,
                variant_id: String,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.evolve_session_protocol(&a.session_id, &a.variant_id)?)
        }
        "report_session_metrics" => {
            #[derive(serde::Deserialize)]
            struct Args {
                session_id: String,
                #[serde(default)]
                metrics: HashMap<String, Value>,
            }
            let a: Args = parse(args)?;
            ok(state.orchestrator.report_session_metrics(&a.session_id, a.metrics)?)
        }
        "get_collaboration_status" => {
            let session_id = single_id(args, "session_id")?;
            ok(state.orchestrator.get_collaboration_status(&session_id)?)
        }
        "list_active_collaborations" => ok(state.orchestrator.list_active_collaborations()),
        "suspend_collaboration" => {
            let session_id = single_id(args, "session_id")?;
            ok(state.orchestrator.suspend_session(&session_id)?)
        }
        "resume_collaboration" => {
            let session_id = single_id(args, "session_id")?;
            ok(state.orchestrator.resume_session(&session_id)?)
        }
        "close_collaboration" => {
            let session_id = single_id(args, "session_id")?;
            ok(state.orchestrator.close_session(&session_id)?)
        }
        "end_collaboration" => {
            let session_id = single_id(args, "session_id")?;
            ok(state.orchestrator.end_collaboration(&session_id)?)
        }
        "list_workflow_types" => ok(state.workflows.list_workflow_types()),
        "start_onboarding_workflow" => {
            #[derive(serde::Deserialize)]
            struct Args {
                agent_a: AgentDescriptor,
                agent_b: AgentDescriptor,
            }
            let a: Args = parse(args)?;
            ok(state.workflows.start_onboarding(a.agent_a, a.agent_b)?)
        }
        "start_protocol_evolution_workflow" => {
            #[derive(serde::Deserialize)]
            struct Args {
                description: String,
                #[serde(default)]
                changes: HashMap<String, Value>,
            }
            let a: Args = parse(args)?;
            ok(state.workflows.start_protocol_evolution(a.description, a.changes)?)
        }
        "start_error_recovery_workflow" => {
            #[derive(serde::Deserialize)]
            struct Args {
                error_type: String,
                #[serde(default)]
                context: HashMap<String, Value>,
            }
            let a: Args = parse(args)?;
            ok(state.workflows.start_error_recovery(a.error_type, a.context)?)
        }
        "start_conflict_resolution_workflow" => {
            let session_id = single_id(args, "session_id")?;
            ok(state.workflows.start_conflict_resolution(session_id)?)
        }
        "execute_workflow_step" => {
            let execution_id = single_id(args, "execution_id")?;
            ok(state.workflows.execute_step(&execution_id)?)
        }
        "execute_workflow_all_steps" => {
            let execution_id = single_id(args, "execution_id")?;
            ok(state.workflows.execute_all(&execution_id)?)
        }
        "get_workflow_status" => {
            let execution_id = single_id(args, "execution_id")?;
            ok(state.workflows.get_status(&execution_id)?)
        }
        "list_all_workflow_executions" => ok(state.workflows.list_executions()),

        // --- Observation ---------------------------------------------------
        "get_bus_stats" => ok(state.observation.stats()),
        "get_recent_events" => {
            #[derive(serde::Deserialize, Default)]
            struct Args {
                #[serde(default = "default_recent_n")]
                n: usize,
                #[serde(default)]
                flow_type: Option<concord_core::FlowType>,
            }
            let a: Args = parse(args)?;
            ok(state.observation.bus.recent(a.n, a.flow_type))
        }
        "get_recent_alerts" => {
            #[derive(serde::Deserialize, Default)]
            struct Args {
                #[serde(default = "default_recent_n")]
                n: usize,
            }
            let a: Args = parse(args)?;
            match &state.observation.alerts {
                Some(alerts) => ok(alerts.recent(a.n)),
                None => ok(Vec::<Value>::new()),
            }
        }

        other => Err(ConcordError::not_found(format!("tool-RPC operation '{other}'"))),
    }
}

fn default_manual_reason() -> String {
    "manual".to_string()
}

fn default_trend_metric() -> String {
    "success_rate".to_string()
}

fn default_traffic_split() -> f64 {
    0.5
}

fn default_recent_n() -> usize {
    50
}

fn single_id(args: Value, key: &str) -> ConcordResult<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ConcordError::InvalidArgument(format!("missing required argument '{key}'")))
}

fn agent_pair(state: &AppState, args: Value) -> ConcordResult<(AgentDescriptor, AgentDescriptor)> {
    #[derive(serde::Deserialize)]
    struct Args {
        agent_a_id: String,
        agent_b_id: String,
    }
    let a: Args = parse(args)?;
    Ok((state.orchestrator.get_agent(&a.agent_a_id)?, state.orchestrator.get_agent(&a.agent_b_id)?))
}

fn agent_pair_with_domains(state: &AppState, args: Value) -> ConcordResult<(AgentDescriptor, AgentDescriptor, Option<Vec<String>>)> {
    #[derive(serde::Deserialize)]
    struct Args {
        agent_a_id: String,
        agent_b_id: String,
        #[serde(default)]
        required_domains: Option<Vec<String>>,
    }
    let a: Args = parse(args)?;
    let agent_a = state.orchestrator.get_agent(&a.agent_a_id)?;
    let agent_b = state.orchestrator.get_agent(&a.agent_b_id)?;
    Ok((agent_a, agent_b, a.required_domains))
}

/// The full tool-RPC operation surface, for `list_workflow_types`-style
/// introspection and for the stdio/HTTP transports to validate a
/// request's `operation` field before dispatch.
pub const OPERATIONS: &[&str] = &[
    "register_agent",
    "verify_knowledge_alignment",
    "verify_goal_alignment",
    "align_terminology",
    "verify_assumptions",
    "sync_context",
    "full_alignment_check",
    "initiate_negotiation",
    "respond_to_negotiation",
    "accept_counter_proposal",
    "finalize_negotiation",
    "get_negotiation_status",
    "list_negotiations",
    "get_negotiation_analytics",
    "auto_resolve_negotiation_conflicts",
    "suggest_optimal_negotiation_params",
    "check_negotiation_timeout",
    "get_negotiation_history",
    "propose_protocol_variant",
    "start_variant_testing",
    "start_canary_deployment",
    "ramp_canary",
    "track_variant_performance",
    "get_variant_status",
    "rollback_variant",
    "resume_variant",
    "list_variants",
    "get_canary_status",
    "analyze_variant_trend",
    "detect_variant_anomaly",
    "start_ab_experiment",
    "record_ab_experiment_metrics",
    "get_ab_experiment_status",
    "end_ab_experiment",
    "predict_variant_success",
    "get_emergence_learning_insights",
    "initiate_collaboration",
    "complete_negotiation",
    "accept_counter_and_finalize",
    "propose_protocol_evolution",
    "evolve_session_protocol",
    "report_session_metrics",
    "get_collaboration_status",
    "list_active_collaborations",
    "suspend_collaboration",
    "resume_collaboration",
    "close_collaboration",
    "end_collaboration",
    "list_workflow_types",
    "start_onboarding_workflow",
    "start_protocol_evolution_workflow",
    "start_error_recovery_workflow",
    "start_conflict_resolution_workflow",
    "execute_workflow_step",
    "execute_workflow_all_steps",
    "get_workflow_status",
    "list_all_workflow_executions",
    "get_bus_stats",
    "get_recent_events",
    "get_recent_alerts",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn agent_json(id: &str, domains: &[&str], goal_type: &str) -> Value {
        json!({
            "agent_id": id,
            "knowledge_domains": domains,
            "goals": [{ "type": goal_type }],
        })
    }

    #[test]
    fn register_then_full_alignment_check_round_trips_through_json() {
        let state = AppState::new();
        dispatch(&state, "register_agent", json!({ "descriptor": agent_json("A", &["python", "ml"], "assistance") }));
        dispatch(&state, "register_agent", json!({ "descriptor": agent_json("B", &["python", "data_science"], "analysis") }));

        let result = dispatch(&state, "full_alignment_check", json!({ "agent_a_id": "A", "agent_b_id": "B" }));
        assert!(result.get("error").is_none(), "unexpected error: {result:?}");
        assert!(result.get("summary").is_some());
    }

    #[test]
    fn unknown_operation_is_a_not_found_error_document() {
        let state = AppState::new();
        let result = dispatch(&state, "does_not_exist", json!({}));
        assert!(result.get("error").is_some());
    }

    #[test]
    fn missing_agent_surfaces_as_error_document_not_a_panic() {
        let state = AppState::new();
        let result = dispatch(&state, "verify_goal_alignment", json!({ "agent_a_id": "ghost", "agent_b_id": "also-ghost" }));
        assert!(result.get("error").is_some());
    }

    #[test]
    fn full_onboarding_workflow_executes_to_completion_via_dispatch() {
        let state = AppState::new();
        let result = dispatch(
            &state,
            "start_onboarding_workflow",
            json!({
                "agent_a": { "agent_id": "A", "knowledge_domains": ["python"], "goals": [{"type": "assistance"}] },
                "agent_b": { "agent_id": "B", "knowledge_domains": ["python"], "goals": [{"type": "assistance"}] },
            }),
        );
        let execution_id = result["execution_id"].as_str().unwrap().to_string();
        let finished = dispatch(&state, "execute_workflow_all_steps", json!({ "execution_id": execution_id }));
        assert_eq!(finished["status"], json!("completed"));
    }
}
