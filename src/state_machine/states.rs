use serde::{Deserialize, Serialize};
use std::fmt;

/// Deployment workflow states, including the substates of the two composites
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeployState {
    /// Idle, waiting for the next deploy or undeploy request
    #[default]
    Ready,
    /// A deploy request could not be processed; no transition leaves this state
    Error,
    /// Composite state for the deploy sequence
    Deploying,
    /// Checks whether the bundle for the requested version is already stored
    CheckApp,
    /// Choice between pushing the bundle and going straight to finalize
    PushOrSkip,
    /// Pushes the bundle to durable storage
    PushApp,
    /// Launches or reuses the application and, for streams, starts the partition
    FinalizeDeploy,
    /// Composite state for the undeploy sequence
    Undeploying,
    /// Kills task instances or stops the stream partition
    StopOrKill,
}

impl DeployState {
    /// Enclosing composite state, if any
    pub fn parent(&self) -> Option<DeployState> {
        match self {
            Self::CheckApp | Self::PushOrSkip | Self::PushApp | Self::FinalizeDeploy => {
                Some(Self::Deploying)
            }
            Self::StopOrKill => Some(Self::Undeploying),
            Self::Ready | Self::Error | Self::Deploying | Self::Undeploying => None,
        }
    }

    /// Substate entered together with a composite state
    pub fn initial_substate(&self) -> Option<DeployState> {
        match self {
            Self::Deploying => Some(Self::CheckApp),
            Self::Undeploying => Some(Self::StopOrKill),
            _ => None,
        }
    }

    /// Pseudostates are evaluated on the way through and never rest as current state
    pub fn is_pseudostate(&self) -> bool {
        matches!(self, Self::PushOrSkip)
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "READY"),
            Self::Error => write!(f, "ERROR"),
            Self::Deploying => write!(f, "DEPLOYING"),
            Self::CheckApp => write!(f, "CHECK_APP"),
            Self::PushOrSkip => write!(f, "PUSH_OR_SKIP"),
            Self::PushApp => write!(f, "PUSH_APP"),
            Self::FinalizeDeploy => write!(f, "FINALIZE_DEPLOY"),
            Self::Undeploying => write!(f, "UNDEPLOYING"),
            Self::StopOrKill => write!(f, "STOP_OR_KILL"),
        }
    }
}

impl std::str::FromStr for DeployState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(Self::Ready),
            "ERROR" => Ok(Self::Error),
            "DEPLOYING" => Ok(Self::Deploying),
            "CHECK_APP" => Ok(Self::CheckApp),
            "PUSH_OR_SKIP" => Ok(Self::PushOrSkip),
            "PUSH_APP" => Ok(Self::PushApp),
            "FINALIZE_DEPLOY" => Ok(Self::FinalizeDeploy),
            "UNDEPLOYING" => Ok(Self::Undeploying),
            "STOP_OR_KILL" => Ok(Self::StopOrKill),
            _ => Err(format!("Invalid deploy state: {s}")),
        }
    }
}
