//! # Workflow Definition
//!
//! Transition table and per-variant actions of the deployment workflow.
//!
//! ```text
//! READY --DEPLOY--> DEPLOYING[CHECK_APP -> PUSH_OR_SKIP -> (PUSH_APP) -> FINALIZE_DEPLOY] -> READY
//! READY --UNDEPLOY--> UNDEPLOYING[STOP_OR_KILL] -> READY
//! DEPLOYING --ERROR--> ERROR
//! DEPLOYING --CONTINUE--> READY
//! UNDEPLOYING --CONTINUE--> READY
//! ```
//!
//! Event transitions are looked up on the current state first and then on its
//! enclosing composite. Completion transitions fire once a state's entry
//! action has finished without raising an event.

use std::sync::Arc;

use super::actions::{
    CheckAppAction, PushAppAction, ResetVariablesAction, StateAction, StreamFinalizeAction,
    StreamStopPartitionAction, TaskKillAction, TaskStartInstanceAction,
};
use super::context::ExtendedState;
use super::events::{DeployEvent, EventHeaders};
use super::guards::{NeedsPushGuard, StateGuard};
use super::states::DeployState;
use crate::cluster::ClusterControlFacade;
use crate::config::StreamConfig;
use crate::models::CloudAppType;

use super::events::DeployEvent as E;
use super::states::DeployState as S;

const EVENT_TRANSITIONS: &[(DeployState, DeployEvent, DeployState)] = &[
    (S::Ready, E::Deploy, S::Deploying),
    (S::Ready, E::Undeploy, S::Undeploying),
    (S::Deploying, E::Error, S::Error),
    (S::Deploying, E::Continue, S::Ready),
    (S::Undeploying, E::Continue, S::Ready),
];

const COMPLETION_TRANSITIONS: &[(DeployState, DeployState)] = &[
    (S::CheckApp, S::PushOrSkip),
    (S::PushApp, S::FinalizeDeploy),
    (S::FinalizeDeploy, S::Ready),
    (S::StopOrKill, S::Ready),
];

/// Actions and guards of one workflow variant
pub struct WorkflowDefinition {
    app_type: CloudAppType,
    reset: Arc<dyn StateAction>,
    check_app: Arc<dyn StateAction>,
    push_app: Arc<dyn StateAction>,
    finalize: Arc<dyn StateAction>,
    stop_or_kill: Arc<dyn StateAction>,
    needs_push: Box<dyn StateGuard>,
}

impl WorkflowDefinition {
    /// Stream variant: shared application, one partition per module
    pub fn stream(facade: Arc<ClusterControlFacade>, settings: StreamConfig) -> Self {
        Self {
            app_type: CloudAppType::Stream,
            reset: Arc::new(ResetVariablesAction),
            check_app: Arc::new(CheckAppAction::new(facade.clone(), CloudAppType::Stream)),
            push_app: Arc::new(PushAppAction::new(facade.clone(), CloudAppType::Stream)),
            finalize: Arc::new(StreamFinalizeAction::new(facade.clone(), settings)),
            stop_or_kill: Arc::new(StreamStopPartitionAction::new(facade)),
            needs_push: Box::new(NeedsPushGuard),
        }
    }

    /// Task variant: one application per module
    pub fn task(facade: Arc<ClusterControlFacade>) -> Self {
        Self {
            app_type: CloudAppType::Task,
            reset: Arc::new(ResetVariablesAction),
            check_app: Arc::new(CheckAppAction::new(facade.clone(), CloudAppType::Task)),
            push_app: Arc::new(PushAppAction::new(facade.clone(), CloudAppType::Task)),
            finalize: Arc::new(TaskStartInstanceAction::new(facade.clone())),
            stop_or_kill: Arc::new(TaskKillAction::new(facade)),
            needs_push: Box::new(NeedsPushGuard),
        }
    }

    pub fn app_type(&self) -> CloudAppType {
        self.app_type
    }

    /// Target of `event` in `state`, falling back to the enclosing composite
    pub fn event_target(state: DeployState, event: DeployEvent) -> Option<DeployState> {
        let lookup = |source: DeployState| {
            EVENT_TRANSITIONS
                .iter()
                .find(|(from, on, _)| *from == source && *on == event)
                .map(|(_, _, to)| *to)
        };

        lookup(state).or_else(|| state.parent().and_then(lookup))
    }

    /// Target followed once `state` has finished its entry action
    pub fn completion_target(state: DeployState) -> Option<DeployState> {
        if let Some(initial) = state.initial_substate() {
            return Some(initial);
        }
        COMPLETION_TRANSITIONS
            .iter()
            .find(|(from, _)| *from == state)
            .map(|(_, to)| *to)
    }

    /// Evaluate a choice pseudostate into a real state; other states pass through
    pub fn resolve_choice(
        &self,
        target: DeployState,
        headers: &EventHeaders,
        extended: &ExtendedState,
    ) -> DeployState {
        match target {
            S::PushOrSkip => {
                if self.needs_push.check(headers, extended) {
                    S::PushApp
                } else {
                    S::FinalizeDeploy
                }
            }
            other => other,
        }
    }

    pub fn guard_description(&self) -> &'static str {
        self.needs_push.description()
    }

    /// Action run on entry to `state`
    pub fn entry_action(&self, state: DeployState) -> Option<&dyn StateAction> {
        let action = match state {
            S::Deploying | S::Undeploying => &self.reset,
            S::CheckApp => &self.check_app,
            S::PushApp => &self.push_app,
            S::FinalizeDeploy => &self.finalize,
            S::StopOrKill => &self.stop_or_kill,
            S::Ready | S::Error | S::PushOrSkip => return None,
        };
        Some(action.as_ref())
    }
}
