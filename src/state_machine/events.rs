//! # Workflow Events
//!
//! Events drive the deployment workflow. Each message carries one event and
//! a set of typed headers:
//!
//! | Header | Used by |
//! |--------|---------|
//! | `appVersion` | every deploy; stream undeploy |
//! | `appName` | task undeploy |
//! | `module` | artifact coordinates of the deployed module |
//! | `definitionParameters` | module parameters |
//! | `clusterId` | stream deploy and undeploy |
//! | `count` | stream deploy |
//! | `contextRunArgs` | task deploy |
//! | `error` | `ERROR` events only |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Events accepted by the deployment workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeployEvent {
    Deploy,
    Undeploy,
    /// Raised by an action when a request cannot be processed
    Error,
    /// Raised by an action to leave a composite state without further work
    Continue,
}

impl DeployEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Deploy => "DEPLOY",
            Self::Undeploy => "UNDEPLOY",
            Self::Error => "ERROR",
            Self::Continue => "CONTINUE",
        }
    }
}

impl fmt::Display for DeployEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_type())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeaders {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definition_parameters: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_run_args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An event plus the headers it was sent with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowMessage {
    pub event: DeployEvent,
    #[serde(default)]
    pub headers: EventHeaders,
}

impl WorkflowMessage {
    pub fn new(event: DeployEvent) -> Self {
        Self {
            event,
            headers: EventHeaders::default(),
        }
    }

    pub fn deploy() -> Self {
        Self::new(DeployEvent::Deploy)
    }

    pub fn undeploy() -> Self {
        Self::new(DeployEvent::Undeploy)
    }

    /// `ERROR` event carrying a message in the `error` header
    pub fn error(message: impl Into<String>) -> Self {
        let mut msg = Self::new(DeployEvent::Error);
        msg.headers.error = Some(message.into());
        msg
    }

    pub fn continue_event() -> Self {
        Self::new(DeployEvent::Continue)
    }

    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.headers.app_version = Some(version.into());
        self
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.headers.app_name = Some(name.into());
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.headers.module = Some(module.into());
        self
    }

    pub fn with_definition_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.headers.definition_parameters = parameters;
        self
    }

    pub fn with_cluster_id(mut self, cluster_id: impl Into<String>) -> Self {
        self.headers.cluster_id = Some(cluster_id.into());
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.headers.count = Some(count);
        self
    }

    pub fn with_context_run_args(mut self, args: Vec<String>) -> Self {
        self.headers.context_run_args = args;
        self
    }
}
