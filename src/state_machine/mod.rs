// State machine module for deployment workflows
//
// An explicit transition table with composite states and one choice
// pseudostate, interpreted by a single-consumer engine task per app type.

pub mod actions;
pub mod context;
pub mod engine;
pub mod errors;
pub mod events;
pub mod guards;
pub mod states;
pub mod workflow;

// Re-export main types for convenient access
pub use context::ExtendedState;
pub use engine::{CycleReport, StateTransition, WorkflowEngine};
pub use errors::{ActionError, StateMachineError};
pub use events::{DeployEvent, EventHeaders, WorkflowMessage};
pub use states::DeployState;
pub use workflow::WorkflowDefinition;

// Common traits and utilities
pub use actions::{ActionOutcome, StateAction};
pub use guards::StateGuard;
