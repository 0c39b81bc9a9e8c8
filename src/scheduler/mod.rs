//! The process engine: orders a graph, runs its nodes one at a time and records the run.

mod guard;
mod order;
mod routes;

pub use crate::graph::validate;
pub use order::execution_order;

use crate::collaborator::{AssetCatalog, Collaborators, InferenceModel, TextCompletion};
use crate::config::{CyclePolicy, EngineConfig};
use crate::context::ExecutionContext;
use crate::error::{EngineError, GraphValidationError, NodeExecutionError};
use crate::executor::{Directive, ExecutorRegistry, NodeEnv, NodeExecutor, NodeOutcome};
use crate::graph::{FailurePolicy, ProcessGraph};
use crate::kpi::{KpiAlert, KpiBook};
use crate::tracker::{ExecutionTracker, ProcessExecution, RunStatus, SkipReason};
use chrono::Utc;
use futures::FutureExt;
use guard::RunRegistry;
use routes::RouteTable;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Called after every node with the execution as it stands, and once more with the
/// finished execution.
pub type ProgressCallback<'a> = Box<dyn FnMut(&ProcessExecution) + Send + 'a>;

/// Per-run options for [`ProcessEngine::execute_with`].
#[derive(Default)]
pub struct RunOptions<'a> {
    /// Execution id to use instead of a generated UUID, so callers can cancel a run
    /// they have not seen yet.
    pub execution_id: Option<String>,
    pub on_progress: Option<ProgressCallback<'a>>,
}

impl<'a> RunOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    pub fn on_progress(mut self, callback: impl FnMut(&ProcessExecution) + Send + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }
}

/// Runs process graphs.
///
/// An engine holds no per-run state besides the set of graphs currently executing, so
/// one instance can serve any number of graphs. A graph id may only have one run in
/// flight per engine.
pub struct ProcessEngine {
    config: EngineConfig,
    executors: ExecutorRegistry,
    collaborators: Collaborators,
    runs: RunRegistry,
}

pub struct ProcessEngineBuilder {
    config: EngineConfig,
    executors: ExecutorRegistry,
    collaborators: Collaborators,
}

impl ProcessEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            executors: ExecutorRegistry::with_defaults(),
            collaborators: Collaborators::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.config.cycle_policy = policy;
        self
    }

    /// Registers an executor, replacing the default for its node type.
    pub fn with_executor(mut self, executor: Box<dyn NodeExecutor>) -> Self {
        self.executors.register(executor);
        self
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn with_text_completion(mut self, completion: Arc<dyn TextCompletion>) -> Self {
        self.collaborators.completion = Some(completion);
        self
    }

    pub fn with_inference(mut self, model: Arc<dyn InferenceModel>) -> Self {
        self.collaborators.inference = Some(model);
        self
    }

    pub fn with_assets(mut self, assets: Arc<dyn AssetCatalog>) -> Self {
        self.collaborators.assets = Some(assets);
        self
    }

    pub fn build(self) -> ProcessEngine {
        ProcessEngine {
            config: self.config,
            executors: self.executors,
            collaborators: self.collaborators,
            runs: RunRegistry::default(),
        }
    }
}

impl Default for ProcessEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ProcessEngine {
    fn default() -> Self {
        ProcessEngineBuilder::new().build()
    }
}

impl ProcessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ProcessEngineBuilder {
        ProcessEngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn validate(&self, graph: &ProcessGraph) -> Result<(), GraphValidationError> {
        validate(graph)
    }

    /// Requests cooperative cancellation of a running execution. The run stops before
    /// its next node; a collaborator call already in flight is not interrupted.
    pub fn cancel(&self, execution_id: &str) -> bool {
        let accepted = self.runs.cancel(execution_id);
        if accepted {
            info!(execution_id, "cancellation requested");
        }
        accepted
    }

    pub fn is_executing(&self, graph_id: &str) -> bool {
        self.runs.is_executing(graph_id)
    }

    pub async fn execute(
        &self,
        graph: &ProcessGraph,
        initial_context: ExecutionContext,
    ) -> Result<ProcessExecution, EngineError> {
        self.execute_with(graph, initial_context, RunOptions::default())
            .await
    }

    /// Runs the graph to completion.
    ///
    /// Only validation failures, cycles under [`CyclePolicy::Fail`], a second
    /// concurrent run of the same graph and a reused in-flight execution id return
    /// `Err`. Node failures are recorded in the returned execution.
    pub async fn execute_with(
        &self,
        graph: &ProcessGraph,
        initial_context: ExecutionContext,
        options: RunOptions<'_>,
    ) -> Result<ProcessExecution, EngineError> {
        validate(graph)?;
        let order = execution_order(graph, self.config.cycle_policy)?;
        let RunOptions {
            execution_id,
            mut on_progress,
        } = options;
        let execution_id = execution_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let cancel = self.runs.register(&execution_id)?;
        let _running = self.runs.acquire(&graph.id)?;

        let mut tracker = ExecutionTracker::start(&execution_id, &graph.id, &order, Utc::now());
        let mut context = initial_context;
        let mut kpis = KpiBook::new(graph.kpis.clone());
        let mut routes = RouteTable::new(graph, self.config.cycle_policy == CyclePolicy::Append);
        let mut status = RunStatus::Completed;
        let mut run_error = None;

        info!(
            execution_id = %execution_id,
            graph_id = %graph.id,
            nodes = order.len(),
            "starting execution"
        );

        for (index, node) in order.iter().copied().enumerate() {
            if cancel.is_cancelled() {
                info!(execution_id = %execution_id, node_id = %node.id, "execution cancelled");
                tracker.skip_remaining(index, SkipReason::Cancelled);
                status = RunStatus::Cancelled;
                run_error = Some("execution was cancelled".to_string());
                break;
            }

            if !routes.is_live(&node.id) {
                debug!(node_id = %node.id, "skipping node on an unselected branch");
                tracker.skip(index, SkipReason::BranchNotTaken);
                routes.skipped(&node.id);
                notify(&mut on_progress, tracker.snapshot());
                continue;
            }

            debug!(node_id = %node.id, node_type = %node.kind(), "executing node");
            let started = Instant::now();
            let now = Utc::now();
            tracker.begin(index, now);
            let result = {
                let env = NodeEnv {
                    graph,
                    context: &context,
                    kpis: &kpis,
                    collaborators: &self.collaborators,
                    config: &self.config,
                    now,
                };
                AssertUnwindSafe(self.executors.dispatch(node, &env))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        Err(NodeExecutionError::ExecutorPanicked(panic_message(panic)))
                    })
            };
            let elapsed = started.elapsed();

            let mut halt = false;
            match result {
                Ok(NodeOutcome {
                    value,
                    routing,
                    directive,
                    kpi_change,
                }) => {
                    let selected = routing.selected().map(<[String]>::to_vec);
                    tracker.succeed(index, value.clone(), selected, elapsed);
                    context.set(node.output_name(), value);
                    routes.succeeded(&node.id, routing);

                    if let Some(change) = kpi_change {
                        kpis.apply(&change);
                        if let Some(level) = change.alert {
                            tracker.record_alert(KpiAlert {
                                kpi_id: change.kpi_id.clone(),
                                node_id: node.id.clone(),
                                level,
                                value: change.new_value,
                                raised_at: change.recorded_at,
                            });
                        }
                    }
                    debug!(
                        node_id = %node.id,
                        duration_ms = elapsed.as_millis() as u64,
                        "node completed"
                    );

                    if let Directive::Halt { failed } = directive {
                        halt = true;
                        if failed {
                            status = RunStatus::Failed;
                            run_error = Some(format!("node '{}' halted the run", node.id));
                        }
                    }
                }
                Err(error) => {
                    warn!(node_id = %node.id, error = %error, "node failed");
                    tracker.fail(index, error.to_string(), elapsed);
                    routes.failed(&node.id);
                    if node.on_error == FailurePolicy::Fail {
                        halt = true;
                        status = RunStatus::Failed;
                        run_error = Some(format!("node '{}' failed: {}", node.id, error));
                    }
                }
            }

            if halt {
                tracker.skip_remaining(index + 1, SkipReason::RunHalted);
            }
            notify(&mut on_progress, tracker.snapshot());
            if halt {
                break;
            }
        }

        let execution = tracker.finish(
            status,
            context.into_value(),
            kpis.into_inner(),
            run_error,
            Utc::now(),
        );
        let metrics = execution.metrics();
        info!(
            execution_id = %execution.id,
            status = ?execution.status,
            succeeded = metrics.succeeded,
            failed = metrics.failed,
            skipped = metrics.skipped,
            "execution finished"
        );
        notify(&mut on_progress, &execution);
        Ok(execution)
    }
}

fn notify(callback: &mut Option<ProgressCallback<'_>>, execution: &ProcessExecution) {
    if let Some(callback) = callback.as_mut() {
        callback(execution);
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "executor panicked".to_string()
    }
}
