//! # Workflow Engine
//!
//! Runs one [`WorkflowDefinition`] on a dedicated tokio task. Callers talk to
//! the task through a bounded command channel; the task processes one event
//! to completion, including every remote call its actions make, before it
//! receives the next. Side effects of concurrent callers are therefore totally
//! ordered per engine, and engines for different app types run independently.
//!
//! Queued or running cycles cannot be cancelled and no timeout is applied.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::actions::ActionOutcome;
use super::context::ExtendedState;
use super::errors::{StateMachineError, StateMachineResult};
use super::events::{DeployEvent, EventHeaders, WorkflowMessage};
use super::states::DeployState;
use super::workflow::WorkflowDefinition;
use crate::error::DeployerResult;
use crate::logging::log_workflow_transition;
use crate::models::CloudAppType;

/// Type alias for cycle report channels
pub type CycleResponder = oneshot::Sender<CycleReport>;

#[derive(Debug)]
enum EngineCommand {
    Process {
        message: WorkflowMessage,
        resp: Option<CycleResponder>,
    },
    /// Answered once every previously queued command has been processed
    Flush { resp: oneshot::Sender<()> },
    Shutdown { resp: oneshot::Sender<()> },
}

/// One state change inside a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    pub from: DeployState,
    pub to: DeployState,
    /// Event that fired the transition; `None` for completion transitions
    pub event: Option<DeployEvent>,
}

/// Outcome of processing one event
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub app_type: CloudAppType,
    pub event: DeployEvent,
    pub accepted: bool,
    pub transitions: Vec<StateTransition>,
    pub final_state: DeployState,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl CycleReport {
    fn begin(app_type: CloudAppType, event: DeployEvent, state: DeployState) -> Self {
        let now = Utc::now();
        Self {
            cycle_id: Uuid::new_v4(),
            app_type,
            event,
            accepted: false,
            transitions: Vec::new(),
            final_state: state,
            error: None,
            started_at: now,
            completed_at: now,
        }
    }

    fn finish(mut self, state: DeployState) -> Self {
        self.final_state = state;
        self.completed_at = Utc::now();
        self
    }

    /// Accepted, error free and back in `READY`
    pub fn is_success(&self) -> bool {
        self.accepted && self.error.is_none() && self.final_state == DeployState::Ready
    }

    /// Target states in the order they were entered
    pub fn visited(&self) -> Vec<DeployState> {
        self.transitions.iter().map(|t| t.to).collect()
    }
}

struct WorkflowWorker {
    definition: WorkflowDefinition,
    state: DeployState,
    extended: ExtendedState,
    state_tx: watch::Sender<DeployState>,
}

impl WorkflowWorker {
    fn app_type(&self) -> CloudAppType {
        self.definition.app_type()
    }

    async fn run(mut self, mut command_rx: mpsc::Receiver<EngineCommand>) {
        debug!(app_type = %self.app_type(), "Workflow engine started");

        while let Some(command) = command_rx.recv().await {
            match command {
                EngineCommand::Process { message, resp } => {
                    let report = self.run_cycle(message).await;
                    if let Some(resp) = resp {
                        let _ = resp.send(report);
                    }
                }
                EngineCommand::Flush { resp } => {
                    let _ = resp.send(());
                }
                EngineCommand::Shutdown { resp } => {
                    let _ = resp.send(());
                    break;
                }
            }
        }

        debug!(app_type = %self.app_type(), "Workflow engine stopped");
    }

    async fn run_cycle(&mut self, message: WorkflowMessage) -> CycleReport {
        let mut report = CycleReport::begin(self.app_type(), message.event, self.state);

        let Some(first) = WorkflowDefinition::event_target(self.state, message.event) else {
            let rejected = StateMachineError::EventNotAccepted {
                state: self.state.to_string(),
                event: message.event.to_string(),
            };
            warn!(app_type = %self.app_type(), error = %rejected, "Event rejected");
            report.error = Some(rejected.to_string());
            return report.finish(self.state);
        };
        report.accepted = true;

        let headers = message.headers;
        let mut trigger = Some(message.event);
        let mut next = Some(first);

        while let Some(target) = next {
            let target = if target.is_pseudostate() {
                let resolved = self.definition.resolve_choice(target, &headers, &self.extended);
                debug!(
                    app_type = %self.app_type(),
                    choice = %target,
                    guard = self.definition.guard_description(),
                    resolved = %resolved,
                    "Choice resolved"
                );
                resolved
            } else {
                target
            };
            self.enter(target, trigger.take(), &mut report);

            next = match self.run_entry_action(target, &headers).await {
                Ok(ActionOutcome::Continue) => WorkflowDefinition::completion_target(target),
                Ok(ActionOutcome::Raise(raised)) => {
                    if let Some(reason) = raised.headers.error {
                        warn!(app_type = %self.app_type(), state = %target, error = %reason, "Action raised error");
                        report.error = Some(reason);
                    }
                    match WorkflowDefinition::event_target(target, raised.event) {
                        Some(to) => {
                            trigger = Some(raised.event);
                            Some(to)
                        }
                        None => {
                            warn!(
                                app_type = %self.app_type(),
                                state = %target,
                                event = %raised.event,
                                "Raised event not accepted, following completion transition"
                            );
                            WorkflowDefinition::completion_target(target)
                        }
                    }
                }
                Err(err) => {
                    error!(
                        app_type = %self.app_type(),
                        state = %target,
                        error = %err,
                        "Workflow cycle aborted, returning to READY"
                    );
                    report.error = Some(err.to_string());
                    self.extended.clear();
                    self.set_state(DeployState::Ready);
                    None
                }
            };
        }

        info!(
            app_type = %self.app_type(),
            event = %report.event,
            final_state = %self.state,
            transitions = report.transitions.len(),
            "Workflow cycle complete"
        );
        report.finish(self.state)
    }

    fn enter(&mut self, target: DeployState, event: Option<DeployEvent>, report: &mut CycleReport) {
        let from = self.state;
        log_workflow_transition(
            self.app_type(),
            event.map(|e| e.event_type()),
            &from.to_string(),
            &target.to_string(),
        );
        report.transitions.push(StateTransition {
            from,
            to: target,
            event,
        });
        self.set_state(target);
    }

    fn set_state(&mut self, state: DeployState) {
        self.state = state;
        self.state_tx.send_replace(state);
    }

    async fn run_entry_action(
        &mut self,
        state: DeployState,
        headers: &EventHeaders,
    ) -> StateMachineResult<ActionOutcome> {
        let Some(action) = self.definition.entry_action(state) else {
            return Ok(ActionOutcome::Continue);
        };

        debug!(app_type = %self.definition.app_type(), state = %state, action = action.description(), "Running entry action");
        action
            .execute(headers, &mut self.extended)
            .await
            .map_err(|e| StateMachineError::ActionFailed {
                action: action.description().to_string(),
                state: state.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Handle to a running workflow engine
pub struct WorkflowEngine {
    app_type: CloudAppType,
    command_tx: mpsc::Sender<EngineCommand>,
    state_rx: watch::Receiver<DeployState>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WorkflowEngine {
    /// Spawn the engine task. Must be called within a tokio runtime.
    pub fn start(definition: WorkflowDefinition, buffer_size: usize) -> Self {
        let app_type = definition.app_type();
        let (command_tx, command_rx) = mpsc::channel(buffer_size.max(1));
        let (state_tx, state_rx) = watch::channel(DeployState::Ready);

        let worker = WorkflowWorker {
            definition,
            state: DeployState::Ready,
            extended: ExtendedState::default(),
            state_tx,
        };
        let handle = tokio::spawn(worker.run(command_rx));

        Self {
            app_type,
            command_tx,
            state_rx,
            worker: Mutex::new(Some(handle)),
        }
    }

    pub fn app_type(&self) -> CloudAppType {
        self.app_type
    }

    pub fn current_state(&self) -> DeployState {
        *self.state_rx.borrow()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<DeployState> {
        self.state_rx.clone()
    }

    fn stopped(&self) -> StateMachineError {
        StateMachineError::EngineStopped {
            app_type: self.app_type.to_string(),
        }
    }

    async fn submit(&self, command: EngineCommand) -> DeployerResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| self.stopped().into())
    }

    /// Queue an event without waiting for its cycle
    pub async fn send_event(&self, message: WorkflowMessage) -> DeployerResult<()> {
        debug!(app_type = %self.app_type, event = %message.event, "Queueing workflow event");
        self.submit(EngineCommand::Process {
            message,
            resp: None,
        })
        .await
    }

    /// Queue an event and wait for its cycle report
    pub async fn dispatch(&self, message: WorkflowMessage) -> DeployerResult<CycleReport> {
        let (resp, rx) = oneshot::channel();
        self.submit(EngineCommand::Process {
            message,
            resp: Some(resp),
        })
        .await?;
        rx.await.map_err(|_| self.stopped().into())
    }

    /// Wait until every event queued before this call has been processed
    pub async fn flush(&self) -> DeployerResult<()> {
        let (resp, rx) = oneshot::channel();
        self.submit(EngineCommand::Flush { resp }).await?;
        rx.await.map_err(|_| self.stopped().into())
    }

    /// Stop the engine after the events already queued
    pub async fn shutdown(&self) -> DeployerResult<()> {
        let (resp, rx) = oneshot::channel();
        self.submit(EngineCommand::Shutdown { resp }).await?;
        rx.await.map_err(|_| self.stopped())?;

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(app_type = %self.app_type, error = %e, "Workflow engine task failed");
            }
        }
        info!(app_type = %self.app_type, "Workflow engine shut down");
        Ok(())
    }
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("app_type", &self.app_type)
            .field("state", &self.current_state())
            .finish()
    }
}
