//! # Structured Logging Module
//!
//! Environment-aware structured logging for the deployment workflows. Console
//! output, plain by default and JSON when `DEPLOYER_LOG_FORMAT=json`.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::models::CloudAppType;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));
        let json = use_json_format();

        let result = if json {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_filter(filter),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_ansi(true)
                        .with_filter(filter),
                )
                .try_init()
        };

        // A global subscriber may already be installed by the host process
        if result.is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json = json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("DEPLOYER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn use_json_format() -> bool {
    std::env::var("DEPLOYER_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log structured data for a workflow state change
pub fn log_workflow_transition(
    app_type: CloudAppType,
    event: Option<&str>,
    from_state: &str,
    to_state: &str,
) {
    tracing::info!(
        app_type = %app_type,
        event = event,
        from_state = %from_state,
        to_state = %to_state,
        timestamp = %Utc::now().to_rfc3339(),
        "🔄 WORKFLOW_TRANSITION"
    );
}

/// Log structured data for cluster operations
pub fn log_cluster_operation(
    operation: &str,
    app_type: CloudAppType,
    application_id: Option<&str>,
    cluster_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        app_type = %app_type,
        application_id = application_id,
        cluster_id = cluster_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🌐 CLUSTER_OPERATION"
    );
}
