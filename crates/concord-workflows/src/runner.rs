//! The Workflow Runner: four built-in step sequences driving the
//! coordination engines through the Orchestrator. Each step is a plain
//! function over `(&Orchestrator, &mut HashMap<String, Value>)` — no
//! handler retries and no automatic rollback of a prior step's side
//! effects, per the step-dispatch contract.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use concord_core::{AgentDescriptor, ConcordError, ConcordResult};
use concord_emergence::{PerformanceMetrics, VariantStatus};
use concord_negotiation::{NegotiableParams, OptimizationPriority, TimeoutPolicy};
use concord_orchestrator::{NegotiationResponse, Orchestrator};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::execution::{WorkflowExecution, WorkflowStatus, WorkflowStep};

type StepContext = HashMap<String, Value>;
type StepHandler = fn(&Orchestrator, &mut StepContext) -> ConcordResult<Value>;

struct StepDef {
    name: &'static str,
    description: &'static str,
    handler: StepHandler,
}

fn step(name: &'static str, description: &'static str, handler: StepHandler) -> StepDef {
    StepDef { name, description, handler }
}

fn ctx_str(ctx: &StepContext, key: &str) -> ConcordResult<String> {
    ctx.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ConcordError::InvalidArgument(format!("workflow context missing '{key}'")))
}

fn ctx_value(ctx: &StepContext, key: &str) -> ConcordResult<Value> {
    ctx.get(key).cloned().ok_or_else(|| ConcordError::InvalidArgument(format!("workflow context missing '{key}'")))
}

// --- Onboarding: register, alignment, negotiate, establish, verify --------

fn onboarding_register(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let agent_a: AgentDescriptor = serde_json::from_value(ctx_value(ctx, "agent_a")?)
        .map_err(|e| ConcordError::InvalidArgument(format!("agent_a: {e}")))?;
    let agent_b: AgentDescriptor = serde_json::from_value(ctx_value(ctx, "agent_b")?)
        .map_err(|e| ConcordError::InvalidArgument(format!("agent_b: {e}")))?;
    let a = orch.register_agent(agent_a);
    let b = orch.register_agent(agent_b);
    ctx.insert("agent_a_id".to_string(), json!(a.agent_id));
    ctx.insert("agent_b_id".to_string(), json!(b.agent_id));
    Ok(json!({ "agent_a_id": a.agent_id, "agent_b_id": b.agent_id }))
}

fn onboarding_alignment(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let a = orch.get_agent(&ctx_str(ctx, "agent_a_id")?)?;
    let b = orch.get_agent(&ctx_str(ctx, "agent_b_id")?)?;
    let check = orch.scorer().full_alignment_check(&a, &b, None, None);
    Ok(serde_json::to_value(&check.summary).expect("summary serializes"))
}

fn onboarding_negotiate(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let a_id = ctx_str(ctx, "agent_a_id")?;
    let b_id = ctx_str(ctx, "agent_b_id")?;
    let session = orch.initiate_collaboration(&a_id, &b_id, None, None, HashMap::new())?;
    ctx.insert("session_id".to_string(), json!(session.session_id));
    Ok(json!({ "session_id": session.session_id, "state": session.state }))
}

fn onboarding_establish(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let session_id = ctx_str(ctx, "session_id")?;
    let ready = orch.check_collaboration_readiness(&session_id)?;
    if !ready {
        return Err(ConcordError::illegal_transition(format!("session {session_id} not yet ready to establish")));
    }
    Ok(json!({ "ready": true }))
}

fn onboarding_verify(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let session = orch.get_collaboration_status(&ctx_str(ctx, "session_id")?)?;
    Ok(serde_json::to_value(&session).expect("session serializes"))
}

fn onboarding_steps() -> Vec<StepDef> {
    vec![
        step("register", "register both agents with the orchestrator", onboarding_register),
        step("alignment", "run a standalone full alignment check", onboarding_alignment),
        step("negotiate", "open a collaboration (alignment gate + negotiation)", onboarding_negotiate),
        step("establish", "confirm the collaboration session is ready", onboarding_establish),
        step("verify", "fetch the final collaboration status", onboarding_verify),
    ]
}

// --- Protocol evolution: propose, test, canary, monitor, decide -----------

fn evolution_propose(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let description = ctx.get("description").and_then(|v| v.as_str()).unwrap_or("workflow-proposed variant").to_string();
    let changes: HashMap<String, Value> =
        ctx.get("changes").and_then(|v| v.as_object()).map(|m| m.clone().into_iter().collect()).unwrap_or_default();
    let variant = orch.emergence().propose_variant(description, changes, None, vec!["workflow".to_string()], HashMap::new());
    ctx.insert("variant_id".to_string(), json!(variant.variant_id));
    Ok(json!({ "variant_id": variant.variant_id }))
}

fn evolution_test(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let variant = orch.emergence().start_testing(&ctx_str(ctx, "variant_id")?)?;
    Ok(json!({ "status": variant.status }))
}

fn evolution_canary(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let initial_percentage = ctx.get("canary_initial_percentage").and_then(|v| v.as_f64());
    let variant = orch.emergence().start_canary(&ctx_str(ctx, "variant_id")?, initial_percentage)?;
    Ok(json!({ "status": variant.status, "canary_percentage": variant.canary_percentage }))
}

fn evolution_monitor(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let variant_id = ctx_str(ctx, "variant_id")?;
    let metrics = match ctx.get("metrics") {
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| ConcordError::InvalidArgument(format!("metrics: {e}")))?,
        None => PerformanceMetrics::new(1.0, 50.0, 0, 100),
    };
    let variant = orch.emergence().track_performance(&variant_id, metrics)?;
    Ok(json!({ "status": variant.status, "rollback_count": variant.rollback_count }))
}

/// Per the decision contract: `should_rollback` first; if true, roll back
/// and the execution's final status becomes `rolled_back`. Otherwise ramp
/// with `force=true` until the variant reaches `active`.
fn evolution_decide(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let variant_id = ctx_str(ctx, "variant_id")?;
    if orch.emergence().should_rollback(&variant_id)? {
        let variant = orch.emergence().rollback(&variant_id, "decide_step_policy")?;
        return Ok(json!({ "status": variant.status, "workflow_outcome": "rolled_back" }));
    }
    let mut variant = orch.emergence().get_variant_status(&variant_id)?;
    let mut guard = 0;
    while variant.status != VariantStatus::Active && guard < 32 {
        variant = orch.emergence().ramp_canary(&variant_id, true)?;
        if variant.status == VariantStatus::RolledBack || variant.status == VariantStatus::Paused {
            break;
        }
        guard += 1;
    }
    Ok(json!({ "status": variant.status }))
}

fn evolution_steps() -> Vec<StepDef> {
    vec![
        step("propose", "propose a new protocol variant", evolution_propose),
        step("test", "move the variant into testing", evolution_test),
        step("canary", "start a canary rollout", evolution_canary),
        step("monitor", "record a performance observation", evolution_monitor),
        step("decide", "roll back or ramp to completion", evolution_decide),
    ]
}

// --- Error recovery: detect, isolate, recover, notify, resume -------------

fn recovery_detect(_orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let error_type = ctx_str(ctx, "error_type")?;
    Ok(json!({ "error_type": error_type }))
}

fn recovery_isolate(_orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    Ok(json!({ "isolated": ctx.get("affected_variant_id").or_else(|| ctx.get("session_id")).cloned() }))
}

fn recovery_recover(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let error_type = ctx_str(ctx, "error_type")?;
    match error_type.as_str() {
        "timeout" => {
            let changed = orch.negotiation().check_all_timeouts();
            Ok(json!({ "sessions_timed_out": changed.len() }))
        }
        "alignment_failure" => {
            let a = orch.get_agent(&ctx_str(ctx, "agent_a_id")?)?;
            let b = orch.get_agent(&ctx_str(ctx, "agent_b_id")?)?;
            let check = orch.scorer().full_alignment_check(&a, &b, None, None);
            Ok(serde_json::to_value(&check.summary).expect("summary serializes"))
        }
        "protocol_mismatch" => {
            let canaries = orch.emergence().list_variants(Some(VariantStatus::Canary));
            let mut rolled_back = Vec::new();
            for variant in &canaries {
                orch.emergence().rollback(&variant.variant_id, "protocol_mismatch_recovery")?;
                rolled_back.push(variant.variant_id.clone());
            }
            Ok(json!({ "rolled_back_variants": rolled_back }))
        }
        other => Err(ConcordError::InvalidArgument(format!("unknown error_type '{other}'"))),
    }
}

fn recovery_notify(_orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    // External notification channels are out of scope; this step records
    // the intent to notify so callers can observe it in the execution log.
    Ok(json!({ "notified": true, "error_type": ctx.get("error_type").cloned() }))
}

fn recovery_resume(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    match ctx.get("session_id").and_then(|v| v.as_str()) {
        Some(session_id) => match orch.resume_session(session_id) {
            Ok(session) => Ok(json!({ "resumed": true, "state": session.state })),
            Err(ConcordError::IllegalTransition(_)) => Ok(json!({ "resumed": false, "reason": "session was not suspended" })),
            Err(e) => Err(e),
        },
        None => Ok(json!({ "resumed": false, "reason": "no session to resume" })),
    }
}

fn recovery_steps() -> Vec<StepDef> {
    vec![
        step("detect", "record the reported error type", recovery_detect),
        step("isolate", "note the affected entity", recovery_isolate),
        step("recover", "dispatch recovery action by error type", recovery_recover),
        step("notify", "record notification intent", recovery_notify),
        step("resume", "resume a suspended session if any", recovery_resume),
    ]
}

// --- Conflict resolution: identify, analyze, propose, negotiate, document -

fn conflict_identify(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let session = orch.get_collaboration_status(&ctx_str(ctx, "session_id")?)?;
    let negotiation = session.negotiation_session.ok_or_else(|| ConcordError::InvalidArgument("session has no negotiation".to_string()))?;
    ctx.insert("agent_a_id".to_string(), json!(negotiation.initiator_id));
    ctx.insert("agent_b_id".to_string(), json!(negotiation.responder_id));
    ctx.insert("contested_params".to_string(), serde_json::to_value(&negotiation.proposed_params).expect("params serialize"));
    Ok(json!({ "rounds": negotiation.rounds.len(), "state": negotiation.state }))
}

fn conflict_analyze(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let a_id = ctx_str(ctx, "agent_a_id")?;
    let analytics = orch.negotiation().get_analytics(Some(&a_id));
    Ok(serde_json::to_value(&analytics).expect("analytics serializes"))
}

fn conflict_propose(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let a = orch.get_agent(&ctx_str(ctx, "agent_a_id")?)?;
    let b = orch.get_agent(&ctx_str(ctx, "agent_b_id")?)?;
    let proposed = concord_negotiation::NegotiationEngine::suggest_optimal_params(&a.capabilities, &b.capabilities, OptimizationPriority::Compatibility);
    ctx.insert("proposed_params".to_string(), serde_json::to_value(&proposed).expect("params serialize"));
    Ok(json!({ "proposed": proposed }))
}

fn conflict_negotiate(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let a_id = ctx_str(ctx, "agent_a_id")?;
    let b_id = ctx_str(ctx, "agent_b_id")?;
    let proposed: NegotiableParams =
        serde_json::from_value(ctx_value(ctx, "proposed_params")?).map_err(|e| ConcordError::InvalidArgument(format!("proposed_params: {e}")))?;
    let contested: NegotiableParams =
        serde_json::from_value(ctx_value(ctx, "contested_params")?).map_err(|e| ConcordError::InvalidArgument(format!("contested_params: {e}")))?;

    let session = orch.negotiation().initiate_session(&a_id, &b_id, proposed, TimeoutPolicy::Fail)?;
    orch.negotiation().receive_proposal(&session.session_id, &b_id)?;
    orch.negotiation().submit_counter_proposal(&session.session_id, &b_id, contested)?;
    let resolved = orch.negotiation().auto_resolve(&session.session_id)?;
    ctx.insert("conflict_negotiation_id".to_string(), json!(session.session_id));
    ctx.insert("resolved_params".to_string(), serde_json::to_value(&resolved).expect("params serialize"));
    Ok(serde_json::to_value(&resolved).expect("params serialize"))
}

fn conflict_document(orch: &Orchestrator, ctx: &mut StepContext) -> ConcordResult<Value> {
    let session_id = ctx_str(ctx, "conflict_negotiation_id")?;
    orch.negotiation().close_session(&session_id, &ctx_str(ctx, "agent_a_id")?)?;
    Ok(json!({
        "resolution": ctx.get("resolved_params").cloned(),
        "documented_at": Utc::now(),
    }))
}

fn conflict_steps() -> Vec<StepDef> {
    vec![
        step("identify", "pull contested-round data from the negotiation", conflict_identify),
        step("analyze", "compute negotiation analytics", conflict_analyze),
        step("propose", "suggest optimized params from both sides' capabilities", conflict_propose),
        step("negotiate", "open and auto-resolve a fresh negotiation round", conflict_negotiate),
        step("document", "close the resolution negotiation and record the outcome", conflict_document),
    ]
}

fn steps_for(workflow_name: &str) -> ConcordResult<Vec<StepDef>> {
    match workflow_name {
        "onboarding" => Ok(onboarding_steps()),
        "protocol_evolution" => Ok(evolution_steps()),
        "error_recovery" => Ok(recovery_steps()),
        "conflict_resolution" => Ok(conflict_steps()),
        other => Err(ConcordError::not_found(format!("workflow type {other}"))),
    }
}

pub const WORKFLOW_TYPES: &[&str] = &["onboarding", "protocol_evolution", "error_recovery", "conflict_resolution"];

struct Definitions {
    steps: HashMap<String, Vec<StepDef>>,
}

pub struct WorkflowRunner {
    orchestrator: Arc<Orchestrator>,
    definitions: Definitions,
    executions: Mutex<HashMap<String, WorkflowExecution>>,
}

impl WorkflowRunner {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        let mut steps = HashMap::new();
        for name in WORKFLOW_TYPES {
            steps.insert(name.to_string(), steps_for(name).expect("built-in workflow name"));
        }
        Self { orchestrator, definitions: Definitions { steps }, executions: Mutex::new(HashMap::new()) }
    }

    pub fn list_workflow_types(&self) -> Vec<&'static str> {
        WORKFLOW_TYPES.to_vec()
    }

    /// Creates a `pending->running` execution for `workflow_name` seeded
    /// with `context`. Fails if the name is not one of the four built-ins.
    #[instrument(skip(self, context))]
    pub fn start(&self, workflow_name: &str, context: HashMap<String, Value>) -> ConcordResult<WorkflowExecution> {
        let defs = self.definitions.steps.get(workflow_name).ok_or_else(|| ConcordError::not_found(format!("workflow type {workflow_name}")))?;
        let execution_id = Uuid::new_v4().to_string();
        let steps = defs
            .iter()
            .enumerate()
            .map(|(i, def)| WorkflowStep::new(format!("{execution_id}-{i}"), def.name, def.description))
            .collect();
        let execution = WorkflowExecution {
            execution_id: execution_id.clone(),
            workflow_name: workflow_name.to_string(),
            status: WorkflowStatus::Running,
            steps,
            current_step_index: 0,
            started_at: Some(Utc::now()),
            completed_at: None,
            context,
        };
        info!(execution_id, workflow_name, "workflow execution started");
        self.executions.lock().insert(execution_id, execution.clone());
        Ok(execution)
    }

    pub fn start_onboarding(&self, agent_a: AgentDescriptor, agent_b: AgentDescriptor) -> ConcordResult<WorkflowExecution> {
        let mut ctx = HashMap::new();
        ctx.insert("agent_a".to_string(), serde_json::to_value(&agent_a).expect("descriptor serializes"));
        ctx.insert("agent_b".to_string(), serde_json::to_value(&agent_b).expect("descriptor serializes"));
        self.start("onboarding", ctx)
    }

    pub fn start_protocol_evolution(&self, description: impl Into<String>, changes: HashMap<String, Value>) -> ConcordResult<WorkflowExecution> {
        let mut ctx = HashMap::new();
        ctx.insert("description".to_string(), json!(description.into()));
        ctx.insert("changes".to_string(), Value::Object(changes.into_iter().collect()));
        self.start("protocol_evolution", ctx)
    }

    pub fn start_error_recovery(&self, error_type: impl Into<String>, mut context: HashMap<String, Value>) -> ConcordResult<WorkflowExecution> {
        context.insert("error_type".to_string(), json!(error_type.into()));
        self.start("error_recovery", context)
    }

    pub fn start_conflict_resolution(&self, session_id: impl Into<String>) -> ConcordResult<WorkflowExecution> {
        let mut ctx = HashMap::new();
        ctx.insert("session_id".to_string(), json!(session_id.into()));
        self.start("conflict_resolution", ctx)
    }

    /// Runs the step at `current_step_index`: marks it `running`,
    /// dispatches to its handler, records success or failure, and on
    /// success advances the index — transitioning the execution to
    /// `completed` once past the last step (or `rolled_back` if the
    /// final step's result carries a `workflow_outcome: "rolled_back"`
    /// marker).
    #[instrument(skip(self))]
    pub fn execute_step(&self, execution_id: &str) -> ConcordResult<WorkflowExecution> {
        let mut executions = self.executions.lock();
        let execution = executions.get_mut(execution_id).ok_or_else(|| ConcordError::not_found(format!("workflow execution {execution_id}")))?;
        if execution.status.is_terminal() {
            return Err(ConcordError::illegal_transition(format!("execution {execution_id} already {:?}", execution.status)));
        }
        let index = execution.current_step_index;
        let defs = self.definitions.steps.get(&execution.workflow_name).expect("validated at start");
        let def = &defs[index];

        execution.steps[index].status = WorkflowStatus::Running;
        execution.steps[index].started_at = Some(Utc::now());

        let mut ctx = execution.context.clone();
        let result = (def.handler)(&self.orchestrator, &mut ctx);
        execution.context = ctx;

        match result {
            Ok(value) => {
                execution.steps[index].status = WorkflowStatus::Completed;
                execution.steps[index].completed_at = Some(Utc::now());
                let rolled_back = value.get("workflow_outcome").and_then(|v| v.as_str()) == Some("rolled_back");
                execution.steps[index].result = Some(value);
                execution.current_step_index += 1;

                if execution.current_step_index >= execution.steps.len() {
                    execution.status = if rolled_back { WorkflowStatus::RolledBack } else { WorkflowStatus::Completed };
                    execution.completed_at = Some(Utc::now());
                }
            }
            Err(e) => {
                warn!(execution_id, step = def.name, error = %e, "workflow step failed");
                execution.steps[index].status = WorkflowStatus::Failed;
                execution.steps[index].completed_at = Some(Utc::now());
                execution.steps[index].error = Some(e.to_string());
                execution.status = WorkflowStatus::Failed;
                execution.completed_at = Some(Utc::now());
            }
        }
        Ok(execution.clone())
    }

    /// Loops `execute_step` until the execution leaves `running`.
    pub fn execute_all(&self, execution_id: &str) -> ConcordResult<WorkflowExecution> {
        loop {
            let execution = self.execute_step(execution_id)?;
            if execution.status != WorkflowStatus::Running {
                return Ok(execution);
            }
        }
    }

    pub fn get_status(&self, execution_id: &str) -> ConcordResult<WorkflowExecution> {
        self.executions.lock().get(execution_id).cloned().ok_or_else(|| ConcordError::not_found(format!("workflow execution {execution_id}")))
    }

    pub fn list_executions(&self) -> Vec<WorkflowExecution> {
        self.executions.lock().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_orchestrator::OrchestratorConfig;

    fn runner() -> WorkflowRunner {
        WorkflowRunner::new(Arc::new(Orchestrator::new(OrchestratorConfig::default(), None)))
    }

    fn agent(id: &str, domains: &[&str]) -> AgentDescriptor {
        let mut a = AgentDescriptor::new(id);
        a.knowledge_domains = domains.iter().map(|s| s.to_string()).collect();
        a.goals = vec![concord_core::Goal::new("assistance")];
        a
    }

    #[test]
    fn onboarding_runs_to_completion() {
        let r = runner();
        let execution = r.start_onboarding(agent("A", &["python", "ml"]), agent("B", &["python", "data_science"])).unwrap();
        let finished = r.execute_all(&execution.execution_id).unwrap();
        assert_eq!(finished.status, WorkflowStatus::Completed);
        assert!(finished.steps.iter().all(|s| s.status == WorkflowStatus::Completed));
    }

    #[test]
    fn onboarding_fails_when_alignment_gate_rejects() {
        let r = runner();
        let execution = r.start_onboarding(agent("A", &["cooking"]), agent("B", &["astronomy"])).unwrap();
        let finished = r.execute_all(&execution.execution_id).unwrap();
        assert_eq!(finished.status, WorkflowStatus::Failed);
        assert_eq!(finished.steps[2].status, WorkflowStatus::Failed);
    }

    #[test]
    fn completed_execution_rejects_further_steps() {
        let r = runner();
        let execution = r.start_onboarding(agent("A", &["python"]), agent("B", &["python"])).unwrap();
        r.execute_all(&execution.execution_id).unwrap();
        let err = r.execute_step(&execution.execution_id).unwrap_err();
        assert!(matches!(err, ConcordError::IllegalTransition(_)));
    }

    #[test]
    fn protocol_evolution_rolls_back_on_bad_metrics() {
        let r = runner();
        let mut changes = HashMap::new();
        changes.insert("timeout_ms".to_string(), json!(5000));
        let execution = r.start_protocol_evolution("lower timeout", changes).unwrap();

        r.execute_step(&execution.execution_id).unwrap(); // propose
        r.execute_step(&execution.execution_id).unwrap(); // test
        r.execute_step(&execution.execution_id).unwrap(); // canary

        // Seed the monitor step with metrics bad enough to trigger rollback.
        {
            let mut executions = r.executions.lock();
            let exec = executions.get_mut(&execution.execution_id).unwrap();
            exec.context.insert("metrics".to_string(), serde_json::to_value(PerformanceMetrics::new(0.1, 9000.0, 50, 100)).unwrap());
        }
        let after_monitor = r.execute_step(&execution.execution_id).unwrap(); // monitor
        assert_eq!(after_monitor.status, WorkflowStatus::Running);

        let finished = r.execute_step(&execution.execution_id).unwrap(); // decide
        assert_eq!(finished.status, WorkflowStatus::RolledBack);
    }
}
