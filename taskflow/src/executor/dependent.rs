//! The dependent-task orchestrator.

use super::ExecutorConfig;
use crate::core::{ExecutionResult, ExecutionResults, ExecutionStatus, NodeId, TaskOutput};
use crate::engine::{
    Completion, DefaultExecutionEngine, ExecutionEngine, SubmissionHandle, Work, WorkerPool,
};
use crate::errors::{EngineError, OrchestrationError, TaskError, TaskflowError};
use crate::graph::{Graph, Node};
use crate::task::Task;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, debug_span, info, info_span, warn, Instrument};
use uuid::Uuid;

/// What a worker hands back after running one task body.
#[derive(Debug, Clone)]
pub struct NodeOutcome<K, R> {
    /// The node the task belongs to.
    pub id: K,
    /// The value or error returned by `execute`.
    pub outcome: Result<R, TaskError>,
    /// When the body started.
    pub started_at: DateTime<Utc>,
    /// When the body returned.
    pub finished_at: DateTime<Utc>,
}

/// Drives a [`Graph`] to completion on an [`ExecutionEngine`].
///
/// Entry nodes are submitted first. Each completion settles the node's
/// status and then looks at every successor whose predecessors are now all
/// terminal:
///
/// 1. if any predecessor blocks (errored with a terminating behavior, or was
///    rejected or cascade-skipped), the successor is skipped and blocks too;
/// 2. if the successor's `should_execute` declines, it is skipped without
///    blocking its own successors;
/// 3. if the engine refuses the submission, the successor errors and blocks;
/// 4. otherwise it is submitted.
///
/// Skips are resolved in place, without a round trip through the engine.
pub struct DependentTasksExecutor<K, R, E = DefaultExecutionEngine<NodeOutcome<K, R>>> {
    engine: E,
    name: String,
    _types: PhantomData<fn() -> (K, R)>,
}

impl<K: NodeId, R: TaskOutput> DependentTasksExecutor<K, R> {
    /// Creates an executor running tasks on `pool`.
    #[must_use]
    pub fn with_pool(pool: WorkerPool) -> Self {
        Self::new(DefaultExecutionEngine::new(pool))
    }

    /// Creates an executor from a validated config on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or no tokio runtime is
    /// running.
    pub fn from_config(config: &ExecutorConfig) -> Result<Self, TaskflowError> {
        config.validate()?;
        let pool = WorkerPool::new(config.pool_size)?;
        Ok(Self::with_pool(pool).with_name(config.name.clone()))
    }
}

impl<K, R, E> DependentTasksExecutor<K, R, E>
where
    K: NodeId,
    R: TaskOutput,
    E: ExecutionEngine<NodeOutcome<K, R>>,
{
    /// Creates an executor on top of an engine.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            name: "taskflow".to_string(),
            _types: PhantomData,
        }
    }

    /// Sets the name reported on each run's span.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the executor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Runs every node of `graph` to a terminal status.
    ///
    /// Task failures do not fail the run; they are reported on the returned
    /// results.
    ///
    /// # Errors
    ///
    /// - [`OrchestrationError::NodeNotPending`] if a node already ran
    /// - [`OrchestrationError::RejectedSubmission`] if the engine refused work
    /// - [`OrchestrationError::IncompleteGraphExecution`] if nodes never
    ///   became ready
    /// - [`OrchestrationError::Engine`] if the engine's completion queue failed
    pub async fn execute(
        &mut self,
        graph: &Graph<K, R>,
    ) -> Result<ExecutionResults<K, R>, OrchestrationError<K, R>> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "graph_run",
            run_id = %run_id,
            executor = %self.name,
            nodes = graph.len()
        );
        self.run(graph).instrument(span).await
    }

    async fn run(
        &mut self,
        graph: &Graph<K, R>,
    ) -> Result<ExecutionResults<K, R>, OrchestrationError<K, R>> {
        if let Some(node) = graph.nodes().find(|n| n.status() != ExecutionStatus::Pending) {
            return Err(OrchestrationError::NodeNotPending {
                id: node.id().clone(),
                status: node.status(),
            });
        }

        info!("graph run started");
        let mut run = Run::new(graph);

        for id in graph.entry_nodes() {
            if self.schedule(&mut run, id) {
                self.release_successors(&mut run, id);
            }
        }

        while !run.in_flight.is_empty() {
            let Completion { handle, outcome } = self.engine.take().await?;
            let Some(id) = run.in_flight.remove(&handle) else {
                warn!(ticket = handle.ticket(), "completion for unknown submission");
                continue;
            };
            if let Some(node) = graph.node(&id) {
                Self::settle(&mut run, node, outcome);
                self.release_successors(&mut run, &id);
            }
        }

        run.finish()
    }

    /// Decides the fate of a node whose predecessors are all terminal.
    ///
    /// Returns true if the node was settled in place (skipped or rejected),
    /// in which case its successors are now up for evaluation.
    fn schedule(&mut self, run: &mut Run<'_, K, R>, id: &K) -> bool {
        if !run.scheduled.insert(id.clone()) {
            return false;
        }
        let graph = run.graph;
        let Some(node) = graph.node(id) else {
            return false;
        };
        let task = node.task();

        if let Some(blocker) = node.incoming().iter().find(|p| run.blocked.contains(*p)) {
            debug!(node = ?id, blocked_by = ?blocker, "cascading skip");
            transition(task.as_ref(), ExecutionStatus::Skipped);
            run.record(ExecutionResult::skipped(id.clone()));
            run.blocked.insert(id.clone());
            return true;
        }

        let predecessors = run.results.select(node.incoming());
        if !task.should_execute(&predecessors) {
            debug!(node = ?id, "task declined to execute");
            transition(task.as_ref(), ExecutionStatus::Skipped);
            run.record(ExecutionResult::skipped(id.clone()));
            return true;
        }

        let submitted = if self.engine.is_shutdown() {
            Err(EngineError::Rejected)
        } else {
            self.engine.submit(unit_of_work(node))
        };

        match submitted {
            Ok(handle) => {
                debug!(node = ?id, ticket = handle.ticket(), "task submitted");
                run.in_flight.insert(handle, id.clone());
                false
            }
            Err(err) => {
                Self::reject(run, node, &err);
                true
            }
        }
    }

    /// Schedules every successor made ready by `id`.
    ///
    /// Nodes settled in place are queued so their own successors are
    /// evaluated too, without going through the engine.
    fn release_successors(&mut self, run: &mut Run<'_, K, R>, id: &K) {
        let graph = run.graph;
        let mut settled = VecDeque::from([id.clone()]);

        while let Some(done) = settled.pop_front() {
            for successor in graph.nodes_ready_after(&done) {
                if self.schedule(run, successor) {
                    settled.push_back(successor.clone());
                }
            }
        }
    }

    /// Records the outcome of a unit the engine handed back.
    fn settle(
        run: &mut Run<'_, K, R>,
        node: &Node<K, R>,
        outcome: Result<NodeOutcome<K, R>, EngineError>,
    ) {
        let id = node.id();
        let task = node.task();

        match outcome {
            Ok(NodeOutcome {
                outcome: Ok(value),
                started_at,
                finished_at,
                ..
            }) => {
                debug!(node = ?id, "task succeeded");
                transition(task.as_ref(), ExecutionStatus::Success);
                node.set_result(value.clone());
                run.record(
                    ExecutionResult::success(id.clone(), value).with_timing(started_at, finished_at),
                );
            }
            Ok(NodeOutcome {
                outcome: Err(err),
                started_at,
                finished_at,
                ..
            }) => {
                let result = Self::task_failed(run, node, err);
                run.record(result.with_timing(started_at, finished_at));
            }
            Err(EngineError::Rejected) => Self::reject(run, node, &EngineError::Rejected),
            Err(err) => {
                let result = Self::task_failed(run, node, TaskError::from(err));
                run.record(result);
            }
        }
    }

    /// Applies the task's error policy to a failed execution.
    fn task_failed(
        run: &mut Run<'_, K, R>,
        node: &Node<K, R>,
        err: TaskError,
    ) -> ExecutionResult<K, R> {
        let id = node.id();
        let task = node.task();

        if !task.should_consider_execution_error() {
            debug!(node = ?id, error = %err, "task error suppressed");
            transition(task.as_ref(), ExecutionStatus::Success);
            return ExecutionResult::suppressed(id.clone(), err);
        }

        let behavior = task.execution_behavior();
        warn!(node = ?id, error = %err, ?behavior, "task errored");
        transition(task.as_ref(), ExecutionStatus::Errored);
        if behavior.is_terminating() {
            run.blocked.insert(id.clone());
        }
        ExecutionResult::errored(id.clone(), err)
    }

    fn reject(run: &mut Run<'_, K, R>, node: &Node<K, R>, err: &EngineError) {
        let id = node.id();
        warn!(node = ?id, error = %err, "submission rejected");
        transition(node.task().as_ref(), ExecutionStatus::Errored);
        run.record(ExecutionResult::errored(id.clone(), TaskError::Rejected));
        run.blocked.insert(id.clone());
        run.rejected.push(id.clone());
    }
}

impl<K, R, E: fmt::Debug> fmt::Debug for DependentTasksExecutor<K, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependentTasksExecutor")
            .field("name", &self.name)
            .field("engine", &self.engine)
            .finish()
    }
}

/// Bookkeeping for a single call to `execute`.
struct Run<'g, K, R> {
    graph: &'g Graph<K, R>,
    results: ExecutionResults<K, R>,
    in_flight: HashMap<SubmissionHandle, K>,
    scheduled: HashSet<K>,
    blocked: HashSet<K>,
    rejected: Vec<K>,
}

impl<'g, K: NodeId, R: TaskOutput> Run<'g, K, R> {
    fn new(graph: &'g Graph<K, R>) -> Self {
        Self {
            graph,
            results: ExecutionResults::new(),
            in_flight: HashMap::new(),
            scheduled: HashSet::new(),
            blocked: HashSet::new(),
            rejected: Vec::new(),
        }
    }

    fn record(&mut self, result: ExecutionResult<K, R>) {
        if !self.results.record(result) {
            warn!("node settled twice; keeping the first result");
        }
    }

    fn finish(self) -> Result<ExecutionResults<K, R>, OrchestrationError<K, R>> {
        let pending: Vec<K> = self
            .graph
            .nodes()
            .filter(|n| n.status() == ExecutionStatus::Pending)
            .map(|n| n.id().clone())
            .collect();

        info!(summary = %self.results.summary(), "graph run finished");

        if !pending.is_empty() {
            warn!(?pending, "nodes never became ready");
            return Err(OrchestrationError::IncompleteGraphExecution {
                pending,
                results: self.results,
            });
        }
        if !self.rejected.is_empty() {
            return Err(OrchestrationError::RejectedSubmission {
                rejected: self.rejected,
                results: self.results,
            });
        }
        Ok(self.results)
    }
}

/// Wraps a node's task into a unit the engine can run.
fn unit_of_work<K: NodeId, R: TaskOutput>(node: &Node<K, R>) -> Work<NodeOutcome<K, R>> {
    let task: Arc<dyn Task<K, R>> = Arc::clone(node.task());
    let id = node.id().clone();
    let span = debug_span!("task", node = ?id);

    Box::pin(
        async move {
            let started_at = Utc::now();
            let outcome = task.execute().await;
            NodeOutcome {
                id,
                outcome,
                started_at,
                finished_at: Utc::now(),
            }
        }
        .instrument(span),
    )
}

/// Moves a task to a terminal status, logging if it was already terminal.
fn transition<K: NodeId, R: TaskOutput>(task: &dyn Task<K, R>, status: ExecutionStatus) {
    if let Err(err) = task.transition_to(status) {
        warn!(task = ?task.id(), error = %err, "ignoring status change");
    }
}
