use super::context::ExtendedState;
use super::events::EventHeaders;

/// Trait for choice guards.
///
/// Guards are pure: they read the cycle headers and extended state and never
/// call out to the cluster.
pub trait StateGuard: Send + Sync {
    /// True selects the guarded branch of the choice
    fn check(&self, headers: &EventHeaders, extended: &ExtendedState) -> bool;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Selects the push branch unless the bundle check recorded the requested
/// version as already stored
pub struct NeedsPushGuard;

impl StateGuard for NeedsPushGuard {
    fn check(&self, headers: &EventHeaders, extended: &ExtendedState) -> bool {
        match headers.app_version.as_deref() {
            Some(version) => !extended.has_bundle(version),
            None => true,
        }
    }

    fn description(&self) -> &'static str {
        "Bundle for the requested version is not stored yet"
    }
}
