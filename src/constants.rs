//! # System Constants
//!
//! Header names, naming-convention prefixes and platform state strings shared
//! by the workflow engine, the cluster facade and the module deployers.

/// Names of the required workflow event headers, as reported in errors
pub mod headers {
    pub const APP_VERSION: &str = "appVersion";
    pub const APP_NAME: &str = "appName";
    pub const MODULE: &str = "module";
    pub const CLUSTER_ID: &str = "clusterId";
}

/// Application naming convention: `<kind>:<group>:<label>`
pub mod naming {
    pub const STREAM_KIND: &str = "scdstream";
    pub const TASK_KIND: &str = "scdtask";
    pub const DELIMITER: char = ':';
    /// Number of delimiter separated segments in a module instance name
    pub const SEGMENTS: usize = 3;
}

/// Instance and partition state strings reported by the platform
pub mod platform {
    pub const STATE_RUNNING: &str = "RUNNING";
    pub const STATE_STOPPED: &str = "STOPPED";
    pub const STATE_KILLED: &str = "KILLED";
    pub const STATE_INITIAL: &str = "INITIAL";

    /// Extra property naming the module coordinates hosted by a partition
    pub const CONTAINER_MODULES: &str = "containerModules";
    /// Prefix of the indexed extra properties carrying module parameters
    pub const CONTAINER_ARG_PREFIX: &str = "containerArg";
}

/// Launch arguments handed to sessions and task applications
pub mod launch {
    pub const CONFIG_NAME_ARG: &str = "--spring.config.name=";
    pub const APP_NAME_ARG: &str = "--spring.yarn.appName=";
    pub const MODULE_COORDINATES_ARG: &str =
        "--spring.yarn.client.launchcontext.arguments.--dataflow.module.coordinates=";
    pub const MODULE_PARAMETER_ARG_PREFIX: &str =
        "--spring.yarn.client.launchcontext.arguments.--dataflow.module.parameters.";
}

/// Instance status attribute keys
pub mod attributes {
    pub const APPLICATION_ID: &str = "applicationId";
    pub const ADDRESS: &str = "address";
    pub const STATE: &str = "state";
    pub const CLUSTER_ID: &str = "clusterId";
}

pub const DEFAULT_APP_VERSION: &str = "app";
pub const DEFAULT_CLUSTER_TEMPLATE: &str = "module-template";
pub const DEFAULT_PROJECTION: &str = "default";
